//! Session run state, shared between the loop thread and observers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where a session is in its life. Only the loop thread transitions the
/// state; everyone else observes, or requests a transition through the stop
/// token. `Stopped` is terminal; a new session needs a fresh `ControlLoop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Calibrating = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
}

impl RunState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RunState::Idle,
            1 => RunState::Calibrating,
            2 => RunState::Running,
            3 => RunState::Stopping,
            _ => RunState::Stopped,
        }
    }

    /// A session in this state can still make progress.
    pub fn is_active(self) -> bool {
        !matches!(self, RunState::Stopped)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Calibrating => "calibrating",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
            RunState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Atomic cell carrying the current `RunState`.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(RunState::Idle as u8)))
    }

    pub(crate) fn set(&self, state: RunState) {
        let prev = RunState::from_u8(self.0.swap(state as u8, Ordering::Release));
        if prev != state {
            tracing::info!(from = %prev, to = %state, "run state transition");
        }
    }

    pub(crate) fn get(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_visible_to_observers() {
        let cell = StateCell::new();
        let observer = cell.clone();
        assert_eq!(observer.get(), RunState::Idle);
        cell.set(RunState::Running);
        assert_eq!(observer.get(), RunState::Running);
    }

    #[test]
    fn only_stopped_is_inactive() {
        for s in [
            RunState::Idle,
            RunState::Calibrating,
            RunState::Running,
            RunState::Stopping,
        ] {
            assert!(s.is_active());
        }
        assert!(!RunState::Stopped.is_active());
    }
}
