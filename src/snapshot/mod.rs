//! Snapshot system for periodic world checkpoints

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::ecs::{
    AnimationBinding, AnimationClip, Entity, EntityTag, EntityType, RenderBinding, Uuid, Velocity,
    World, WorldManager,
};

/// Snapshot metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub frame: u64,
    pub timestamp: DateTime<Local>,
    pub worlds: Vec<WorldSummary>,
    pub live_visuals: usize,
    pub free_visuals: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSummary {
    pub name: String,
    pub entity_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub uuid: Uuid,
    pub entity_type: EntityType,
    pub conf_id: Option<i32>,
    pub position: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub velocity: Option<Vec3>,
    pub clip: Option<AnimationClip>,
    pub has_visual: bool,
}

impl EntityRecord {
    fn capture(entity: &Entity) -> Self {
        Self {
            uuid: entity.uuid(),
            entity_type: entity.entity_type(),
            conf_id: entity.get::<EntityTag>().map(|tag| tag.conf_id),
            position: entity.position(),
            rotation: entity.rotation(),
            velocity: entity.get::<Velocity>().map(|v| v.0),
            clip: entity.get::<AnimationBinding>().map(|a| a.clip),
            has_visual: entity
                .get::<RenderBinding>()
                .is_some_and(|binding| binding.instance.is_some()),
        }
    }
}

/// Serialized state of one world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub name: String,
    pub frame: u64,
    pub systems: Vec<String>,
    pub entities: Vec<EntityRecord>,
}

impl WorldSnapshot {
    /// Entities are listed in uuid order.
    pub fn capture(world: &World, frame: u64) -> Self {
        let mut entities: Vec<EntityRecord> = world.entities().map(EntityRecord::capture).collect();
        entities.sort_by_key(|record| record.uuid);
        Self {
            name: world.name().to_string(),
            frame,
            systems: world.system_names().to_vec(),
            entities,
        }
    }

    pub fn count_of(&self, entity_type: EntityType) -> usize {
        self.entities
            .iter()
            .filter(|record| record.entity_type == entity_type)
            .count()
    }
}

/// Snapshot manager handles periodic checkpoints
pub struct SnapshotManager {
    output_dir: PathBuf,
    interval_frames: u64,
    last_snapshot_frame: u64,
}

impl SnapshotManager {
    pub fn new(output_dir: impl AsRef<Path>, interval_frames: u64) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create snapshot directory {}", output_dir.display())
        })?;

        Ok(Self {
            output_dir,
            interval_frames,
            last_snapshot_frame: 0,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Check if a snapshot should be taken this frame
    pub fn should_snapshot(&self, frame: u64) -> bool {
        if self.interval_frames == 0 {
            return false;
        }
        frame > 0 && frame - self.last_snapshot_frame >= self.interval_frames
    }

    /// Write `snapshot_<frame>/metadata.json` plus one `<world>.json` per world.
    pub fn take_snapshot(&mut self, manager: &WorldManager, frame: u64) -> Result<PathBuf> {
        let snapshot_dir = self.output_dir.join(format!("snapshot_{:08}", frame));
        fs::create_dir_all(&snapshot_dir)
            .with_context(|| format!("Failed to create {}", snapshot_dir.display()))?;

        let mut worlds = Vec::with_capacity(manager.len());
        for world in manager.worlds() {
            let snapshot = WorldSnapshot::capture(world, frame);
            write_json(&snapshot_dir.join(format!("{}.json", world.name())), &snapshot)?;
            worlds.push(WorldSummary {
                name: world.name().to_string(),
                entity_count: snapshot.entities.len(),
            });
        }

        let pool = manager.ctx().pool_ref();
        let metadata = SnapshotMetadata {
            frame,
            timestamp: Local::now(),
            worlds,
            live_visuals: pool.live_instances(),
            free_visuals: pool.free_instances(),
        };
        write_json(&snapshot_dir.join("metadata.json"), &metadata)?;

        log::debug!("snapshot for frame {} written to {}", frame, snapshot_dir.display());
        self.last_snapshot_frame = frame;
        Ok(snapshot_dir)
    }

    pub fn load_snapshot(&self, snapshot_dir: impl AsRef<Path>) -> Result<SnapshotMetadata> {
        read_json(&snapshot_dir.as_ref().join("metadata.json"))
    }

    pub fn load_world(&self, snapshot_dir: impl AsRef<Path>, world: &str) -> Result<WorldSnapshot> {
        read_json(&snapshot_dir.as_ref().join(format!("{world}.json")))
    }

    /// List available snapshots, oldest first
    pub fn list_snapshots(&self) -> Result<Vec<PathBuf>> {
        let mut snapshots = Vec::new();

        if !self.output_dir.exists() {
            return Ok(snapshots);
        }

        for entry in fs::read_dir(&self.output_dir)? {
            let path = entry?.path();
            let is_snapshot = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("snapshot_"));
            if path.is_dir() && is_snapshot {
                snapshots.push(path);
            }
        }

        snapshots.sort();
        Ok(snapshots)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}
