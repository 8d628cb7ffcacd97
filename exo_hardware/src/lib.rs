pub mod error;
pub mod serial;
pub mod spin_clock;

pub use error::HwError;
pub use serial::LineTorqueSensor;
pub use spin_clock::SpinClock;

use exo_traits::{Actuator, JointState, TorqueSensor};
use std::time::{Duration, Instant};

/// Simulated joint motor: integrates the commanded velocity into position
/// in wall-clock time so a demo session produces plausible trajectories.
pub struct SimulatedJoint {
    state: JointState,
    commanded: f64,
    last_update: Instant,
    connected: bool,
}

impl SimulatedJoint {
    pub fn new() -> Self {
        Self {
            state: JointState::default(),
            commanded: 0.0,
            last_update: Instant::now(),
            connected: false,
        }
    }

    fn integrate(&mut self) {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        self.state.position += self.commanded * dt;
        self.state.velocity = self.commanded;
        self.state.current = 0.3 * self.commanded.abs();
    }
}

impl Default for SimulatedJoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for SimulatedJoint {
    fn connect(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        self.connected = true;
        self.last_update = Instant::now();
        tracing::debug!("simulated joint connected");
        Ok(true)
    }

    fn zero_position(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.state.position = 0.0;
        Ok(())
    }

    fn set_velocity_gains(
        &mut self,
        kd: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(kd, "simulated joint velocity gains set");
        Ok(())
    }

    fn read_state(&mut self) -> Result<JointState, Box<dyn std::error::Error + Send + Sync>> {
        if !self.connected {
            return Err(Box::new(HwError::Disconnected("simulated joint".into())));
        }
        self.integrate();
        Ok(self.state)
    }

    fn command_velocity(
        &mut self,
        velocity: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.connected {
            return Err(Box::new(HwError::Disconnected("simulated joint".into())));
        }
        self.integrate();
        self.commanded = velocity;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.connected = false;
        self.commanded = 0.0;
        tracing::debug!("simulated joint disconnected");
        Ok(())
    }
}

/// Simulated load cell: a static bias plus a slow sinusoidal push, enough
/// to exercise tare and the control law without hardware.
pub struct SimulatedLoadCell {
    bias_nm: f64,
    amplitude_nm: f64,
    period: Duration,
    epoch: Instant,
}

impl SimulatedLoadCell {
    pub fn new(bias_nm: f64, amplitude_nm: f64, period: Duration) -> Self {
        Self {
            bias_nm,
            amplitude_nm,
            period,
            epoch: Instant::now(),
        }
    }

    /// Quiet cell with only a static bias; what tare expects to see.
    pub fn at_rest(bias_nm: f64) -> Self {
        Self::new(bias_nm, 0.0, Duration::from_secs(1))
    }
}

impl TorqueSensor for SimulatedLoadCell {
    fn read_raw(
        &mut self,
        _timeout: Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        let phase = self.epoch.elapsed().as_secs_f64() / self.period.as_secs_f64();
        Ok(self.bias_nm + self.amplitude_nm * (phase * std::f64::consts::TAU).sin())
    }
}
