//! Runtime error taxonomy and the shared diagnostics sink.
//!
//! Nothing in the simulation core propagates these errors upward. A failing
//! operation reports into [`Diagnostics`] and hands back `false`/`None`, so a
//! single bad lookup costs one skipped operation instead of a whole frame.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use thiserror::Error;

use crate::ecs::{ComponentKind, Uuid};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("{what} `{key}` not found")]
    LookupFailure { what: &'static str, key: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("system `{system}` expected {component:?} on entity {uuid}")]
    CapabilityMissing {
        system: String,
        uuid: Uuid,
        component: ComponentKind,
    },
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
}

impl RuntimeError {
    pub fn lookup(what: &'static str, key: impl ToString) -> Self {
        RuntimeError::LookupFailure {
            what,
            key: key.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        RuntimeError::InvalidArgument(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        RuntimeError::PreconditionViolation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::LookupFailure { .. } => ErrorKind::LookupFailure,
            RuntimeError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RuntimeError::CapabilityMissing { .. } => ErrorKind::CapabilityMissing,
            RuntimeError::PreconditionViolation(_) => ErrorKind::PreconditionViolation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LookupFailure,
    InvalidArgument,
    CapabilityMissing,
    PreconditionViolation,
}

impl ErrorKind {
    const COUNT: usize = 4;

    fn index(self) -> usize {
        self as usize
    }
}

const DEFAULT_CAPACITY: usize = 64;

/// Bounded record of recently reported errors plus lifetime counters per kind.
pub struct Diagnostics {
    recent: RefCell<VecDeque<RuntimeError>>,
    counts: [Cell<u64>; ErrorKind::COUNT],
    capacity: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            recent: RefCell::new(VecDeque::with_capacity(capacity)),
            counts: Default::default(),
            capacity: capacity.max(1),
        }
    }

    /// Log the error and remember it.
    pub fn report(&self, error: RuntimeError) {
        log::warn!("{error}");
        let counter = &self.counts[error.kind().index()];
        counter.set(counter.get() + 1);
        let mut recent = self.recent.borrow_mut();
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(error);
    }

    pub fn count(&self, kind: ErrorKind) -> u64 {
        self.counts[kind.index()].get()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(Cell::get).sum()
    }

    pub fn last(&self) -> Option<RuntimeError> {
        self.recent.borrow().back().cloned()
    }

    pub fn recent(&self) -> Vec<RuntimeError> {
        self.recent.borrow().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.recent.borrow_mut().clear();
        for counter in &self.counts {
            counter.set(0);
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a `Result` into the report-and-continue convention of the core.
pub trait Reported<T> {
    fn reported(self, diagnostics: &Diagnostics) -> Option<T>;
}

impl<T> Reported<T> for Result<T, RuntimeError> {
    fn reported(self, diagnostics: &Diagnostics) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                diagnostics.report(error);
                None
            }
        }
    }
}
