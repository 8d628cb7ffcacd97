//! Test doubles for driving the engine without hardware.
//!
//! Used by this crate's own tests and available to downstream crates for
//! integration testing.

use exo_traits::{Actuator, JointState, TorqueSensor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(feature = "hardware-errors")]
fn transient_error() -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(exo_hardware::HwError::FrameParse("mock frame".into()))
}

#[cfg(not(feature = "hardware-errors"))]
fn transient_error() -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        "mock frame parse failure",
    ))
}

#[cfg(feature = "hardware-errors")]
fn fatal_error() -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(exo_hardware::HwError::Disconnected("mock sensor".into()))
}

#[cfg(not(feature = "hardware-errors"))]
fn fatal_error() -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::other("mock sensor gone"))
}

/// One scripted sensor response.
#[derive(Debug, Clone, Copy)]
pub enum SensorStep {
    Value(f64),
    /// Malformed frame: costs one sample, session survives.
    Transient,
    /// Link failure: ends the session.
    Fatal,
}

/// Sensor that plays a fixed script, then repeats the last value forever.
pub struct ScriptedSensor {
    steps: Vec<SensorStep>,
    idx: usize,
    last_value: f64,
}

impl ScriptedSensor {
    pub fn new(steps: Vec<SensorStep>) -> Self {
        Self {
            steps,
            idx: 0,
            last_value: 0.0,
        }
    }

    /// Endless constant reading.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![SensorStep::Value(value)])
    }

    /// `lead` values of `before`, then `value` forever. Handy for scripting
    /// a quiet calibration window followed by a load.
    pub fn after_calibration(before: f64, lead: usize, value: f64) -> Self {
        let mut steps = vec![SensorStep::Value(before); lead];
        steps.push(SensorStep::Value(value));
        Self::new(steps)
    }
}

impl TorqueSensor for ScriptedSensor {
    fn read_raw(
        &mut self,
        _timeout: Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        let step = if self.idx < self.steps.len() {
            let s = self.steps[self.idx];
            self.idx += 1;
            s
        } else {
            SensorStep::Value(self.last_value)
        };
        match step {
            SensorStep::Value(v) => {
                self.last_value = v;
                Ok(v)
            }
            SensorStep::Transient => Err(transient_error()),
            SensorStep::Fatal => Err(fatal_error()),
        }
    }
}

/// A sensor that always errors; for paths that must not read it.
pub struct NoopSensor;

impl TorqueSensor for NoopSensor {
    fn read_raw(
        &mut self,
        _timeout: Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop sensor")))
    }
}

/// Shared view into a `SpyActuator`, alive after the loop consumes it.
#[derive(Debug, Clone, Default)]
pub struct SpyLog {
    commands: Arc<Mutex<Vec<f64>>>,
    disconnects: Arc<AtomicU64>,
    zeroed: Arc<AtomicU64>,
}

impl SpyLog {
    /// Every velocity handed to `command_velocity`, in order.
    pub fn commands(&self) -> Vec<f64> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn last_command(&self) -> Option<f64> {
        self.commands.lock().ok().and_then(|c| c.last().copied())
    }

    pub fn disconnect_count(&self) -> u64 {
        self.disconnects.load(Ordering::Relaxed)
    }

    pub fn zeroed_count(&self) -> u64 {
        self.zeroed.load(Ordering::Relaxed)
    }
}

/// Actuator double that records what the loop does to it. Reports a fixed
/// joint state; can be scripted to fail `read_state` after N reads or to
/// refuse the connection.
pub struct SpyActuator {
    log: SpyLog,
    state: JointState,
    connect_response: bool,
    fail_read_after: Option<u64>,
    reads: u64,
}

impl SpyActuator {
    pub fn new() -> Self {
        Self {
            log: SpyLog::default(),
            state: JointState::default(),
            connect_response: true,
            fail_read_after: None,
            reads: 0,
        }
    }

    pub fn with_state(mut self, state: JointState) -> Self {
        self.state = state;
        self
    }

    pub fn refusing_connection(mut self) -> Self {
        self.connect_response = false;
        self
    }

    /// `read_state` succeeds `n` times, then fails fatally.
    pub fn failing_reads_after(mut self, n: u64) -> Self {
        self.fail_read_after = Some(n);
        self
    }

    pub fn log(&self) -> SpyLog {
        self.log.clone()
    }
}

impl Default for SpyActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for SpyActuator {
    fn connect(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.connect_response)
    }

    fn zero_position(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.log.zeroed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn set_velocity_gains(
        &mut self,
        _kd: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn read_state(&mut self) -> Result<JointState, Box<dyn std::error::Error + Send + Sync>> {
        self.reads += 1;
        if let Some(n) = self.fail_read_after {
            if self.reads > n {
                return Err(Box::new(std::io::Error::other("mock actuator lost")));
            }
        }
        Ok(self.state)
    }

    fn command_velocity(
        &mut self,
        velocity: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut commands) = self.log.commands.lock() {
            commands.push(velocity);
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.log.disconnects.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
