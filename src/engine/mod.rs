//! Frame driver: ticks a `WorldManager` through the four stages with
//! fixed-cadence catch-up and optional periodic snapshots.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::{
    config::RuntimeConfig,
    context::Context,
    ecs::WorldManager,
    snapshot::SnapshotManager,
};

pub struct EngineSettings {
    pub logic_step: f32,
    pub fixed_step: f32,
    pub max_catch_up_steps: u32,
    /// Frames between snapshots; `0` disables them.
    pub snapshot_interval_frames: u64,
    pub snapshot_dir: PathBuf,
}

impl EngineSettings {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            logic_step: config.logic_step(),
            fixed_step: config.fixed_step(),
            max_catch_up_steps: config.timing.max_catch_up_steps,
            snapshot_interval_frames: config.snapshot.every_frames,
            snapshot_dir: PathBuf::from(&config.snapshot.output_dir),
        }
    }
}

/// Accumulates frame time for one fixed cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cadence {
    step: f32,
    accumulator: f32,
}

impl Cadence {
    fn new(step: f32) -> Self {
        Self {
            step,
            accumulator: 0.0,
        }
    }

    fn advance(&mut self, dt: f32, max_steps: u32) -> u32 {
        if self.step <= 0.0 {
            return 0;
        }
        self.accumulator += dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if self.accumulator >= self.step {
            let dropped = (self.accumulator / self.step).floor();
            log::debug!("dropping {} step(s) of {}s behind", dropped, self.step);
            self.accumulator %= self.step;
        }
        steps
    }
}

/// Converts variable frame deltas into logic and fixed step counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    logic: Cadence,
    fixed: Cadence,
    max_steps: u32,
}

impl FrameClock {
    pub fn new(logic_step: f32, fixed_step: f32, max_steps: u32) -> Self {
        Self {
            logic: Cadence::new(logic_step),
            fixed: Cadence::new(fixed_step),
            max_steps,
        }
    }

    pub fn logic_step(&self) -> f32 {
        self.logic.step
    }

    pub fn fixed_step(&self) -> f32 {
        self.fixed.step
    }

    /// `(logic_steps, fixed_steps)` due after `dt` more seconds. Each count
    /// is capped; time beyond the cap is discarded.
    pub fn advance(&mut self, dt: f32) -> (u32, u32) {
        (
            self.logic.advance(dt, self.max_steps),
            self.fixed.advance(dt, self.max_steps),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    pub frame: u64,
    pub dt: f32,
    pub logic_steps: u32,
    pub fixed_steps: u32,
    pub entity_count: usize,
    pub live_visuals: usize,
    pub diagnostics: u64,
    pub snapshot_path: Option<PathBuf>,
    pub duration: Duration,
}

pub struct Engine {
    manager: WorldManager,
    clock: FrameClock,
    snapshots: Option<SnapshotManager>,
    frame: u64,
}

impl Engine {
    pub fn new(manager: WorldManager, settings: EngineSettings) -> Result<Self> {
        let snapshots = if settings.snapshot_interval_frames > 0 {
            Some(SnapshotManager::new(
                &settings.snapshot_dir,
                settings.snapshot_interval_frames,
            )?)
        } else {
            None
        };
        Ok(Self {
            manager,
            clock: FrameClock::new(
                settings.logic_step,
                settings.fixed_step,
                settings.max_catch_up_steps,
            ),
            snapshots,
            frame: 0,
        })
    }

    pub fn manager(&self) -> &WorldManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut WorldManager {
        &mut self.manager
    }

    pub fn ctx(&self) -> &Context {
        self.manager.ctx()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// update, logic × n, fixed × n, late update; then the snapshot check.
    pub fn frame(&mut self, dt: f32) -> Result<FrameSummary> {
        let start = Instant::now();
        self.frame += 1;
        let (logic_steps, fixed_steps) = self.clock.advance(dt);

        self.manager.update(dt);
        for _ in 0..logic_steps {
            self.manager.logic_update(self.clock.logic_step());
        }
        for _ in 0..fixed_steps {
            self.manager.fixed_update(self.clock.fixed_step());
        }
        self.manager.late_update(dt);

        let snapshot_path = match self.snapshots.as_mut() {
            Some(snapshots) if snapshots.should_snapshot(self.frame) => {
                Some(snapshots.take_snapshot(&self.manager, self.frame)?)
            }
            _ => None,
        };

        let ctx = self.manager.ctx();
        Ok(FrameSummary {
            frame: self.frame,
            dt,
            logic_steps,
            fixed_steps,
            entity_count: self.manager.worlds().map(|world| world.entity_count()).sum(),
            live_visuals: ctx.pool_ref().live_instances(),
            diagnostics: ctx.diagnostics().total(),
            snapshot_path,
            duration: start.elapsed(),
        })
    }

    /// Run `frames` frames of `dt`, returning the last summary.
    pub fn run(&mut self, frames: u64, dt: f32) -> Result<Option<FrameSummary>> {
        let mut last = None;
        self.run_with_hook(frames, dt, |summary| last = Some(summary.clone()))?;
        Ok(last)
    }

    pub fn run_with_hook<F>(&mut self, frames: u64, dt: f32, mut hook: F) -> Result<()>
    where
        F: FnMut(&FrameSummary),
    {
        for _ in 0..frames {
            let summary = self.frame(dt)?;
            hook(&summary);
        }
        Ok(())
    }

    /// Tear down every world; their visuals return to the shared pool.
    pub fn shutdown(&mut self) {
        self.manager.shutdown();
    }
}
