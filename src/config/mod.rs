//! Runtime configuration loaded from YAML

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ecs::CameraRig;
use crate::math::GroundPlane;

/// Top-level configuration for a runtime instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub name: String,
    #[serde(default = "default_seed")]
    pub random_seed: u64,
    #[serde(default)]
    pub ground: GroundPlane,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Cell edge used for record buckets; `0` falls back to the level's
    /// `GridSize`.
    #[serde(default)]
    pub cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { cell_size: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_fov")]
    pub fov_y_degrees: f32,
    #[serde(default = "default_aspect")]
    pub aspect: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Camera position relative to the followed player.
    #[serde(default = "default_follow_offset")]
    pub follow_offset: Vec3,
    #[serde(default = "default_pitch")]
    pub pitch_degrees: f32,
}

fn default_fov() -> f32 {
    60.0
}

fn default_aspect() -> f32 {
    16.0 / 9.0
}

fn default_near() -> f32 {
    0.3
}

fn default_far() -> f32 {
    1000.0
}

fn default_follow_offset() -> Vec3 {
    Vec3::new(0.0, 12.0, -8.0)
}

fn default_pitch() -> f32 {
    55.0
}

impl CameraConfig {
    pub fn rig(&self) -> CameraRig {
        CameraRig {
            fov_y_degrees: self.fov_y_degrees,
            aspect: self.aspect,
            near: self.near,
            far: self.far,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: default_fov(),
            aspect: default_aspect(),
            near: default_near(),
            far: default_far(),
            follow_offset: default_follow_offset(),
            pitch_degrees: default_pitch(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_logic_hz")]
    pub logic_hz: f32,
    #[serde(default = "default_fixed_hz")]
    pub fixed_hz: f32,
    /// Upper bound on fixed-cadence steps run in a single frame.
    #[serde(default = "default_max_catch_up")]
    pub max_catch_up_steps: u32,
}

fn default_logic_hz() -> f32 {
    10.0
}

fn default_fixed_hz() -> f32 {
    50.0
}

fn default_max_catch_up() -> u32 {
    5
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            logic_hz: default_logic_hz(),
            fixed_hz: default_fixed_hz(),
            max_catch_up_steps: default_max_catch_up(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Frames between snapshots; `0` disables them.
    #[serde(default)]
    pub every_frames: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    "snapshots".to_string()
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            every_frames: 0,
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// The stock single-battle configuration
    pub fn battle() -> Self {
        Self {
            name: "battle".to_string(),
            random_seed: default_seed(),
            ground: GroundPlane::default(),
            grid: GridConfig::default(),
            camera: CameraConfig::default(),
            timing: TimingConfig::default(),
            snapshot: SnapshotConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn logic_step(&self) -> f32 {
        step_for(self.timing.logic_hz)
    }

    pub fn fixed_step(&self) -> f32 {
        step_for(self.timing.fixed_hz)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::battle()
    }
}

fn step_for(hz: f32) -> f32 {
    if hz > 0.0 {
        1.0 / hz
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_config() {
        let config = RuntimeConfig::battle();

        assert_eq!(config.name, "battle");
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.ground, GroundPlane::horizontal(0.0));
        assert!((config.fixed_step() - 0.02).abs() < 1e-6);
        assert_eq!(config.snapshot.every_frames, 0);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: RuntimeConfig = serde_yaml::from_str("name: arena\n").unwrap();
        assert_eq!(config.name, "arena");
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let mut config = RuntimeConfig::battle();
        config.random_seed = 9;
        config.timing.logic_hz = 20.0;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("runtime.yaml");
        config.to_yaml(&path).unwrap();

        let loaded = RuntimeConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_zero_rate_disables_step() {
        let mut config = RuntimeConfig::battle();
        config.timing.logic_hz = 0.0;
        assert_eq!(config.logic_step(), 0.0);
    }
}
