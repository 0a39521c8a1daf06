//! Level export - the immutable map description produced by the authoring tool

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::euler_degrees_to_quat;

/// `{ "x", "y", "z" }` vector as written by the exporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl ExportVec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<ExportVec3> for Vec3 {
    fn from(value: ExportVec3) -> Self {
        Vec3::new(value.x, value.y, value.z)
    }
}

impl From<Vec3> for ExportVec3 {
    fn from(value: Vec3) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapDataType {
    Monster,
    TreasureBox,
    Trap,
    PlayerSpawn,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapData {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub start_pos: ExportVec3,
    #[serde(default = "default_grid_size")]
    pub grid_size: f32,
    #[serde(default)]
    pub birth_pos: Vec<ExportVec3>,
}

fn default_grid_size() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonsterMapData {
    pub map_data_type: MapDataType,
    pub conf_id: i32,
    pub position: ExportVec3,
    #[serde(default)]
    pub rotation: ExportVec3,
    #[serde(default)]
    pub group_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapObjectData {
    pub map_data_type: MapDataType,
    pub conf_id: i32,
    pub position: ExportVec3,
    #[serde(default)]
    pub rotation: ExportVec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LevelExport {
    pub map_data: MapData,
    #[serde(default)]
    pub all_monster_map_datas: Vec<MonsterMapData>,
    #[serde(default)]
    pub all_treasure_box_map_datas: Vec<MapObjectData>,
    #[serde(default)]
    pub all_trap_map_datas: Vec<MapObjectData>,
    #[serde(default)]
    pub all_other_map_datas: Vec<MapObjectData>,
}

/// Which list of the export a record lives in. Declaration order is export
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordList {
    Monster,
    TreasureBox,
    Trap,
    Other,
}

/// Stable identity of a record: its position in the immutable export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub list: RecordList,
    pub index: usize,
}

/// Flattened, read-only view of one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordView {
    pub id: RecordId,
    pub map_data_type: MapDataType,
    pub conf_id: i32,
    pub position: Vec3,
    pub rotation: Quat,
    pub group_id: Option<i32>,
}

impl MonsterMapData {
    fn view(&self, index: usize) -> RecordView {
        RecordView {
            id: RecordId {
                list: RecordList::Monster,
                index,
            },
            map_data_type: self.map_data_type,
            conf_id: self.conf_id,
            position: self.position.into(),
            rotation: euler_degrees_to_quat(self.rotation.into()),
            group_id: Some(self.group_id),
        }
    }
}

impl MapObjectData {
    fn view(&self, list: RecordList, index: usize) -> RecordView {
        RecordView {
            id: RecordId { list, index },
            map_data_type: self.map_data_type,
            conf_id: self.conf_id,
            position: self.position.into(),
            rotation: euler_degrees_to_quat(self.rotation.into()),
            group_id: None,
        }
    }
}

impl LevelExport {
    /// An empty `width × height` map.
    pub fn empty(width: i32, height: i32) -> Self {
        Self {
            map_data: MapData {
                width,
                height,
                start_pos: ExportVec3::default(),
                grid_size: default_grid_size(),
                birth_pos: Vec::new(),
            },
            all_monster_map_datas: Vec::new(),
            all_treasure_box_map_datas: Vec::new(),
            all_trap_map_datas: Vec::new(),
            all_other_map_datas: Vec::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse level export")
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize level export")
    }

    pub fn record(&self, id: RecordId) -> Option<RecordView> {
        match id.list {
            RecordList::Monster => self
                .all_monster_map_datas
                .get(id.index)
                .map(|record| record.view(id.index)),
            RecordList::TreasureBox => self
                .all_treasure_box_map_datas
                .get(id.index)
                .map(|record| record.view(id.list, id.index)),
            RecordList::Trap => self
                .all_trap_map_datas
                .get(id.index)
                .map(|record| record.view(id.list, id.index)),
            RecordList::Other => self
                .all_other_map_datas
                .get(id.index)
                .map(|record| record.view(id.list, id.index)),
        }
    }

    /// Every record in export order.
    pub fn records(&self) -> impl Iterator<Item = RecordView> + '_ {
        let monsters = self
            .all_monster_map_datas
            .iter()
            .enumerate()
            .map(|(index, record)| record.view(index));
        let objects = [
            (RecordList::TreasureBox, &self.all_treasure_box_map_datas),
            (RecordList::Trap, &self.all_trap_map_datas),
            (RecordList::Other, &self.all_other_map_datas),
        ]
        .into_iter()
        .flat_map(|(list, records)| {
            records
                .iter()
                .enumerate()
                .map(move |(index, record)| record.view(list, index))
        });
        monsters.chain(objects)
    }

    pub fn record_count(&self) -> usize {
        self.all_monster_map_datas.len()
            + self.all_treasure_box_map_datas.len()
            + self.all_trap_map_datas.len()
            + self.all_other_map_datas.len()
    }

    /// First `PlayerSpawn` record, falling back to `MapData.StartPos`.
    pub fn player_spawn(&self) -> Vec3 {
        self.records()
            .find(|record| record.map_data_type == MapDataType::PlayerSpawn)
            .map(|record| record.position)
            .unwrap_or_else(|| self.map_data.start_pos.into())
    }

    /// World-space extent of the map along X and Z.
    pub fn world_size(&self) -> (f32, f32) {
        let grid = self.map_data.grid_size;
        (
            self.map_data.width as f32 * grid,
            self.map_data.height as f32 * grid,
        )
    }
}

pub struct LevelLoader {
    base_dir: PathBuf,
}

impl LevelLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<LevelExport> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read level export {}", path.display()))?;
        let level: LevelExport = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        log::info!(
            "loaded level {} ({}x{}, {} records)",
            path.display(),
            level.map_data.width,
            level.map_data.height,
            level.record_count()
        );
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "MapData": {
            "Width": 10, "Height": 10,
            "StartPos": {"x": 1.0, "y": 0.0, "z": 2.0},
            "GridSize": 2.0,
            "BirthPos": [{"x": 0.0, "y": 0.0, "z": 0.0}]
        },
        "AllMonsterMapDatas": [
            {"MapDataType": "Monster", "ConfId": 2001,
             "Position": {"x": 4.0, "y": 0.0, "z": 4.0},
             "Rotation": {"x": 0.0, "y": 90.0, "z": 0.0}, "GroupId": 3}
        ],
        "AllTreasureBoxMapDatas": [
            {"MapDataType": "TreasureBox", "ConfId": 3001,
             "Position": {"x": -4.0, "y": 0.0, "z": 6.0},
             "Rotation": {"x": 0.0, "y": 0.0, "z": 0.0}}
        ],
        "AllTrapMapDatas": [],
        "AllOtherMapDatas": [
            {"MapDataType": "PlayerSpawn", "ConfId": 0,
             "Position": {"x": 5.0, "y": 0.0, "z": 5.0},
             "Rotation": {"x": 0.0, "y": 0.0, "z": 0.0}},
            {"MapDataType": "Decoration", "ConfId": 7,
             "Position": {"x": 0.0, "y": 0.0, "z": 0.0},
             "Rotation": {"x": 0.0, "y": 0.0, "z": 0.0}}
        ]
    }"#;

    #[test]
    fn test_parse_pascal_case_export() {
        let level = LevelExport::from_json_str(SAMPLE).unwrap();

        assert_eq!(level.map_data.width, 10);
        assert_eq!(level.map_data.grid_size, 2.0);
        assert_eq!(level.all_monster_map_datas[0].group_id, 3);
        assert_eq!(level.all_other_map_datas[1].map_data_type, MapDataType::Unknown);
        assert_eq!(level.record_count(), 4);
        assert_eq!(level.world_size(), (20.0, 20.0));
    }

    #[test]
    fn test_records_follow_export_order() {
        let level = LevelExport::from_json_str(SAMPLE).unwrap();
        let ids: Vec<RecordId> = level.records().map(|r| r.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(ids[0].list, RecordList::Monster);

        let monster = level.record(ids[0]).unwrap();
        assert_eq!(monster.position, Vec3::new(4.0, 0.0, 4.0));
        assert!((monster.rotation * Vec3::Z).abs_diff_eq(Vec3::X, 1e-5));
        assert!(level
            .record(RecordId {
                list: RecordList::Trap,
                index: 0
            })
            .is_none());
    }

    #[test]
    fn test_player_spawn_prefers_record() {
        let level = LevelExport::from_json_str(SAMPLE).unwrap();
        assert_eq!(level.player_spawn(), Vec3::new(5.0, 0.0, 5.0));

        let mut bare = level.clone();
        bare.all_other_map_datas.clear();
        assert_eq!(bare.player_spawn(), Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_loader_reads_file() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("level.json"), SAMPLE).unwrap();

        let level = LevelLoader::new(temp.path()).load("level.json").unwrap();
        assert_eq!(level.all_treasure_box_map_datas.len(), 1);

        let err = LevelLoader::new(temp.path()).load("missing.json").unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
