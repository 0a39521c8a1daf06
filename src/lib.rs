pub mod battle;
pub mod config;
pub mod context;
pub mod ecs;
pub mod engine;
pub mod error;
pub mod level;
pub mod math;
pub mod nav;
pub mod pool;
pub mod rng;
pub mod snapshot;
pub mod spatial;
pub mod systems;

pub use battle::BattleBlueprint;
pub use config::RuntimeConfig;
pub use context::Context;
pub use ecs::{Entity, EntityType, System, Uuid, World, WorldBasicData, WorldManager};
pub use engine::{Engine, EngineSettings, FrameSummary};
pub use error::{Diagnostics, ErrorKind, RuntimeError};
pub use level::{LevelExport, LevelLoader};
