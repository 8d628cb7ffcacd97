//! Session lifecycle: the dedicated control thread, the cooperative stop
//! token, and the supervisor that holds the one-active-session rule.
//!
//! The operator context never touches the hardware; it only requests
//! transitions. Worst-case stop latency is one tick period, plus whatever
//! remains of calibration if the session has not reached `Running` yet.

use crate::control::ControlLoop;
use crate::error::ControlError;
use crate::state::{RunState, StateCell};
use exo_traits::{Actuator, TorqueSensor};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

/// Cloneable stop requester; safe to hand to signal handlers and UI threads.
/// Single logical writer semantics: setting it twice is the same as once.
#[derive(Debug, Clone)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn request_stop(&self) {
        if !self.0.swap(true, Ordering::Release) {
            tracing::info!("stop requested");
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What a finished session reports back to the operator.
#[derive(Debug)]
pub struct SessionReport {
    /// Control ticks fully executed.
    pub ticks: u64,
    /// Final observed state; `Stopped` unless the thread died abnormally.
    pub state: RunState,
    /// The fatal error that ended the session, if any.
    pub error: Option<ControlError>,
}

/// Owner's view of a running session. Dropping the handle requests a stop
/// and joins the thread, so sessions cannot leak.
pub struct SessionHandle {
    stop: StopToken,
    state: StateCell,
    ticks: Arc<AtomicU64>,
    join: Option<JoinHandle<SessionReport>>,
}

impl SessionHandle {
    /// Idempotent, non-blocking; the loop honors it at the next tick
    /// boundary.
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    pub fn state(&self) -> RunState {
        self.state.get()
    }

    /// Ticks executed so far; strictly increasing while `Running`.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }

    /// Wait for the session thread and collect its report.
    pub fn join(mut self) -> SessionReport {
        self.join_inner()
    }

    fn join_inner(&mut self) -> SessionReport {
        match self.join.take().map(JoinHandle::join) {
            Some(Ok(report)) => report,
            Some(Err(panic)) => {
                tracing::error!(?panic, "control thread panicked");
                SessionReport {
                    ticks: self.ticks.load(Ordering::Relaxed),
                    state: self.state.get(),
                    error: None,
                }
            }
            None => SessionReport {
                ticks: self.ticks.load(Ordering::Relaxed),
                state: self.state.get(),
                error: None,
            },
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.stop.request_stop();
            let _ = self.join_inner();
        }
    }
}

impl<A, S> ControlLoop<A, S>
where
    A: Actuator + Send + 'static,
    S: TorqueSensor + Send + 'static,
{
    /// Start the session on its own named thread and return immediately.
    pub fn spawn(mut self) -> crate::error::Result<SessionHandle> {
        let stop = StopToken(self.stop.clone());
        let state = self.state.clone();
        let ticks = self.ticks.clone();
        let join = std::thread::Builder::new()
            .name("exo-control".into())
            .spawn(move || {
                let error = self.run_blocking().err();
                SessionReport {
                    ticks: self.ticks.load(Ordering::Relaxed),
                    state: self.state.get(),
                    error,
                }
            })
            .map_err(|e| eyre::eyre!("failed to spawn control thread: {e}"))?;
        Ok(SessionHandle {
            stop,
            state,
            ticks,
            join: Some(join),
        })
    }
}

/// Result of a start request.
#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A session is active; the request was ignored, the session untouched.
    AlreadyRunning,
}

/// Holds at most one active session at a time. Lives on the operator side;
/// never blocks the control thread.
#[derive(Default)]
pub struct Supervisor {
    active: Option<SessionHandle>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `control` unless a session is already active. A refused start
    /// leaves the running session untouched.
    pub fn start<A, S>(&mut self, control: ControlLoop<A, S>) -> crate::error::Result<StartOutcome>
    where
        A: Actuator + Send + 'static,
        S: TorqueSensor + Send + 'static,
    {
        if let Some(handle) = &self.active {
            if handle.state().is_active() {
                tracing::warn!(state = %handle.state(), "start refused: session already active");
                return Ok(StartOutcome::AlreadyRunning);
            }
        }
        // Reap the previous, finished session before replacing it.
        if let Some(finished) = self.active.take() {
            let _ = finished.join();
        }
        self.active = Some(control.spawn()?);
        Ok(StartOutcome::Started)
    }

    /// Idempotent; does not wait for teardown (observe via `state`).
    pub fn stop(&self) {
        if let Some(handle) = &self.active {
            handle.request_stop();
        }
    }

    pub fn state(&self) -> RunState {
        self.active
            .as_ref()
            .map_or(RunState::Idle, SessionHandle::state)
    }

    pub fn handle(&self) -> Option<&SessionHandle> {
        self.active.as_ref()
    }

    /// Join the active session, if any, returning its report.
    pub fn join_active(&mut self) -> Option<SessionReport> {
        self.active.take().map(SessionHandle::join)
    }
}
