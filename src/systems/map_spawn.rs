//! Frustum-driven spawning and culling of level records.
//!
//! Each refresh projects the camera's viewport onto the ground plane, spawns
//! every unspawned record whose position falls inside the resulting
//! rectangle and destroys every spawned entity that has left it. Entry and
//! exit share the closed [`ViewRect::contains`] test, so an entity resting on
//! the boundary stays put.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use glam::{Quat, Vec3};
use serde::Serialize;

use crate::{
    ecs::{
        CameraEntity, CameraRig, EntityFilter, EntityType, MapObjectParams, MonsterEntity,
        MonsterParams, Stage, System, TrapEntity, TreasureBoxEntity, Uuid, World,
    },
    error::RuntimeError,
    level::{LevelExport, MapDataType, RecordId, RecordView},
    math::{CameraView, GroundPlane, ViewRect},
    nav::NavSurface,
    spatial::GridBuckets,
};

const DEFAULT_WANDER_RADIUS: f32 = 3.0;
const DEFAULT_WANDER_SPEED: f32 = 1.5;

/// Entities created and destroyed by one refresh, in the order it touched
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnReport {
    pub spawned: Vec<Uuid>,
    pub despawned: Vec<Uuid>,
}

impl SpawnReport {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.despawned.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpawnStats {
    pub spawned: u64,
    pub despawned: u64,
    pub refreshes: u64,
}

pub struct MapObjectSpawnSystem {
    level: Rc<LevelExport>,
    plane: GroundPlane,
    nav: Box<dyn NavSurface>,
    buckets: Option<GridBuckets<RecordId>>,
    spawned: BTreeMap<RecordId, Uuid>,
    by_uuid: HashMap<Uuid, RecordId>,
    view: Option<ViewRect>,
    last_pose: Option<(Vec3, Quat)>,
    camera_missing_reported: bool,
    wander_radius: f32,
    wander_speed: f32,
    stats: SpawnStats,
}

impl MapObjectSpawnSystem {
    pub const NAME: &'static str = "map_object_spawn";

    pub fn new(level: Rc<LevelExport>, nav: Box<dyn NavSurface>) -> Self {
        Self {
            level,
            plane: GroundPlane::default(),
            nav,
            buckets: None,
            spawned: BTreeMap::new(),
            by_uuid: HashMap::new(),
            view: None,
            last_pose: None,
            camera_missing_reported: false,
            wander_radius: DEFAULT_WANDER_RADIUS,
            wander_speed: DEFAULT_WANDER_SPEED,
            stats: SpawnStats::default(),
        }
    }

    pub fn spawned_uuid(&self, record: RecordId) -> Option<Uuid> {
        self.spawned.get(&record).copied()
    }

    pub fn record_of(&self, uuid: Uuid) -> Option<RecordId> {
        self.by_uuid.get(&uuid).copied()
    }

    pub fn spawned_count(&self) -> usize {
        self.spawned.len()
    }

    /// Rectangle used by the last refresh.
    pub fn view_rect(&self) -> Option<ViewRect> {
        self.view
    }

    pub fn stats(&self) -> SpawnStats {
        self.stats
    }

    fn entity_type_for(map_data_type: MapDataType) -> Option<EntityType> {
        match map_data_type {
            MapDataType::Monster => Some(EntityType::Monster),
            MapDataType::TreasureBox => Some(EntityType::TreasureBox),
            MapDataType::Trap => Some(EntityType::Trap),
            MapDataType::PlayerSpawn | MapDataType::Unknown => None,
        }
    }

    fn build_buckets(&mut self, world: &World) {
        let configured = world.ctx().config().grid.cell_size;
        let cell_size = if configured > 0.0 {
            configured
        } else {
            self.level.map_data.grid_size
        };
        let mut buckets = match GridBuckets::new(cell_size) {
            Ok(buckets) => buckets,
            Err(err) => {
                // Falls back to scanning every record.
                world.diagnostics().report(err);
                self.buckets = None;
                return;
            }
        };
        for record in self.level.records() {
            if Self::entity_type_for(record.map_data_type).is_some() {
                buckets.insert(record.position, record.id);
            }
        }
        log::debug!(
            "[{}] bucketed {} records into {} cells of {}",
            world.name(),
            self.level.record_count(),
            buckets.bucket_count(),
            cell_size
        );
        self.buckets = Some(buckets);
    }

    fn candidates(&self, rect: &ViewRect) -> Vec<RecordId> {
        match &self.buckets {
            Some(buckets) => buckets.candidates(rect),
            None => self
                .level
                .records()
                .filter(|record| Self::entity_type_for(record.map_data_type).is_some())
                .map(|record| record.id)
                .collect(),
        }
    }

    fn camera_pose(&mut self, world: &World) -> Option<(Vec3, Quat, CameraRig)> {
        let Some(camera) = world.get_first_entity_by_type::<CameraEntity>() else {
            if !self.camera_missing_reported {
                world
                    .diagnostics()
                    .report(RuntimeError::lookup("camera entity", world.name()));
                self.camera_missing_reported = true;
            }
            return None;
        };
        self.camera_missing_reported = false;
        Some((
            camera.position()?,
            camera.rotation()?,
            camera.get::<CameraRig>().copied()?,
        ))
    }

    /// Ground rectangle currently seen by the world's camera.
    pub fn compute_view_rect(&mut self, world: &World) -> Option<ViewRect> {
        let (position, rotation, rig) = self.camera_pose(world)?;
        let view = CameraView {
            position,
            rotation,
            fov_y_degrees: rig.fov_y_degrees,
            aspect: rig.aspect,
        };
        let quad = view.ground_quad(&self.plane);
        let missing = quad.missing_corners();
        if missing > 0 {
            log::debug!(
                "[{}] {} viewport corner ray(s) miss the ground plane",
                world.name(),
                missing
            );
        }
        quad.bounding_rect()
    }

    /// Recompute the view rectangle and apply it regardless of camera motion.
    pub fn refresh(&mut self, world: &mut World) -> SpawnReport {
        match self.compute_view_rect(world) {
            Some(rect) => self.apply_view_rect(world, rect),
            None => SpawnReport::default(),
        }
    }

    /// Spawn every record entering `rect`, then destroy every spawned entity
    /// outside it.
    pub fn apply_view_rect(&mut self, world: &mut World, rect: ViewRect) -> SpawnReport {
        let mut report = SpawnReport::default();
        self.view = Some(rect);
        self.stats.refreshes += 1;

        for id in self.candidates(&rect) {
            if self.spawned.contains_key(&id) {
                continue;
            }
            let Some(record) = self.level.record(id) else {
                world
                    .diagnostics()
                    .report(RuntimeError::lookup("level record", format!("{id:?}")));
                continue;
            };
            if !rect.contains_world(record.position) {
                continue;
            }
            if let Some(uuid) = self.spawn_record(world, &record, &rect) {
                self.spawned.insert(id, uuid);
                self.by_uuid.insert(uuid, id);
                self.stats.spawned += 1;
                report.spawned.push(uuid);
            }
        }

        let live: Vec<(RecordId, Uuid)> = self
            .spawned
            .iter()
            .map(|(id, uuid)| (*id, *uuid))
            .collect();
        for (id, uuid) in live {
            let position = world
                .get_entity_by_uuid(uuid)
                .and_then(|entity| entity.position());
            let Some(position) = position else {
                self.forget(id, uuid);
                continue;
            };
            if rect.contains_world(position) {
                continue;
            }
            self.forget(id, uuid);
            world.destroy_entity_by_uuid(uuid);
            self.stats.despawned += 1;
            report.despawned.push(uuid);
        }

        if !report.is_empty() {
            log::debug!(
                "[{}] view {:?}..{:?}: +{} -{} ({} live)",
                world.name(),
                rect.min(),
                rect.max(),
                report.spawned.len(),
                report.despawned.len(),
                self.spawned.len()
            );
        }
        report
    }

    fn spawn_record(
        &self,
        world: &mut World,
        record: &RecordView,
        rect: &ViewRect,
    ) -> Option<Uuid> {
        let entity_type = Self::entity_type_for(record.map_data_type)?;
        // A snap that would leave the rectangle would despawn on the next pass.
        let position = self
            .nav
            .snap(record.position)
            .filter(|snapped| rect.contains_world(*snapped))
            .unwrap_or(record.position);
        match entity_type {
            EntityType::Monster => world.create_entity::<MonsterEntity>(MonsterParams {
                conf_id: record.conf_id,
                position,
                rotation: record.rotation,
                group_id: record.group_id.unwrap_or_default(),
                wander_radius: self.wander_radius,
                wander_speed: self.wander_speed,
            }),
            EntityType::TreasureBox => world.create_entity::<TreasureBoxEntity>(MapObjectParams {
                conf_id: record.conf_id,
                position,
                rotation: record.rotation,
            }),
            EntityType::Trap => world.create_entity::<TrapEntity>(MapObjectParams {
                conf_id: record.conf_id,
                position,
                rotation: record.rotation,
            }),
            EntityType::Player | EntityType::Camera => None,
        }
    }

    fn forget(&mut self, id: RecordId, uuid: Uuid) {
        self.spawned.remove(&id);
        self.by_uuid.remove(&uuid);
    }
}

impl System for MapObjectSpawnSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn filter(&self) -> EntityFilter {
        EntityFilter::of_types([EntityType::Monster, EntityType::TreasureBox, EntityType::Trap])
    }

    fn stage(&self) -> Stage {
        Stage::Update
    }

    fn on_add_to_world(&mut self, world: &mut World) {
        self.plane = world.ctx().config().ground;
        self.build_buckets(world);
    }

    fn on_remove_from_world(&mut self, world: &mut World) {
        let owned: Vec<Uuid> = self.spawned.values().copied().collect();
        self.spawned.clear();
        self.by_uuid.clear();
        for uuid in owned {
            world.destroy_entity_by_uuid(uuid);
        }
    }

    /// Someone else destroyed a spawned entity: the record may spawn again.
    fn on_remove(&mut self, _world: &mut World, uuid: Uuid) {
        if let Some(id) = self.by_uuid.remove(&uuid) {
            self.spawned.remove(&id);
        }
    }

    fn update(&mut self, world: &mut World, _dt: f32) {
        let Some((position, rotation, _)) = self.camera_pose(world) else {
            return;
        };
        if self.last_pose == Some((position, rotation)) {
            return;
        }
        self.last_pose = Some((position, rotation));
        self.refresh(world);
    }
}
