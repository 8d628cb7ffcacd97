//! The real-time control loop: fixed-period scheduling, the per-tick
//! read → filter → dynamics → command → record pipeline, and the session
//! state machine around it.

use crate::admittance::{Reference, desired_velocity};
use crate::calibrate;
use crate::error::{ControlError, SensorFault, classify_sensor_error};
use crate::filter::TorqueFilter;
use crate::params::ParameterStore;
use crate::record::{ControlRecord, SampleSink};
use crate::state::{RunState, StateCell};
use crate::util;
use exo_traits::{Actuator, Clock, TorqueSensor};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Loop configuration. Everything here is fixed for the lifetime of a
/// session; live-retunable coefficients live in the `ParameterStore`.
#[derive(Debug, Clone, Copy)]
pub struct LoopCfg {
    /// Tick rate in Hz.
    pub frequency_hz: u32,
    /// Hard clamp on the commanded velocity magnitude (rad/s). Hardware
    /// protection; applied after the admittance law, never bypassed.
    pub velocity_limit: f64,
    /// Velocity-mode damping gain handed to the actuator at startup.
    pub kd: f64,
    /// Max wait per raw sensor read. A miss costs one sample.
    pub sensor_timeout: Duration,
    /// Tare window: sample count and spacing.
    pub calibration_samples: u32,
    pub calibration_interval: Duration,
    /// Wait after zeroing the motor position before calibration.
    pub zero_settle: Duration,
    /// Equilibrium of the virtual spring/damper.
    pub reference: Reference,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self {
            frequency_hz: 1000,
            velocity_limit: 1.0,
            kd: 3.0,
            sensor_timeout: Duration::from_millis(150),
            calibration_samples: 1000,
            calibration_interval: Duration::from_millis(5),
            zero_settle: Duration::from_secs(3),
            reference: Reference::default(),
        }
    }
}

/// One control session over an exclusively-owned actuator and sensor.
///
/// Construct, then either drive it on the current thread via
/// [`ControlLoop::run_blocking`] or hand it to [`ControlLoop::spawn`]
/// for a dedicated thread. A finished session cannot be restarted; build
/// a fresh instance.
pub struct ControlLoop<A: Actuator, S: TorqueSensor> {
    actuator: A,
    sensor: S,
    cfg: LoopCfg,
    params: ParameterStore,
    sink: Arc<dyn SampleSink>,
    clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) state: StateCell,
    pub(crate) ticks: Arc<AtomicU64>,
    filter: TorqueFilter,
    offset: f64,
    period: Duration,
    missed_deadlines: u64,
}

impl<A: Actuator, S: TorqueSensor> std::fmt::Debug for ControlLoop<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("cfg", &self.cfg)
            .field("period", &self.period)
            .field("missed_deadlines", &self.missed_deadlines)
            .finish_non_exhaustive()
    }
}

impl<A: Actuator, S: TorqueSensor> ControlLoop<A, S> {
    pub fn new(
        actuator: A,
        sensor: S,
        cfg: LoopCfg,
        params: ParameterStore,
        sink: Arc<dyn SampleSink>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> crate::error::Result<Self> {
        if cfg.frequency_hz == 0 {
            return Err(eyre::Report::new(ControlError::Config(
                "frequency_hz must be > 0".into(),
            )));
        }
        if !(cfg.velocity_limit.is_finite() && cfg.velocity_limit > 0.0) {
            return Err(eyre::Report::new(ControlError::Config(
                "velocity_limit must be finite and > 0".into(),
            )));
        }
        if !(cfg.kd.is_finite() && cfg.kd >= 0.0) {
            return Err(eyre::Report::new(ControlError::Config(
                "kd must be finite and >= 0".into(),
            )));
        }
        if cfg.sensor_timeout.is_zero() {
            return Err(eyre::Report::new(ControlError::Config(
                "sensor_timeout must be > 0".into(),
            )));
        }
        if cfg.calibration_samples == 0 {
            return Err(eyre::Report::new(ControlError::Config(
                "calibration_samples must be >= 1".into(),
            )));
        }
        let period = Duration::from_micros(util::period_us(cfg.frequency_hz));
        Ok(Self {
            actuator,
            sensor,
            cfg,
            params,
            sink,
            clock,
            stop: Arc::new(AtomicBool::new(false)),
            state: StateCell::new(),
            ticks: Arc::new(AtomicU64::new(0)),
            filter: TorqueFilter::new(),
            offset: 0.0,
            period,
            missed_deadlines: 0,
        })
    }

    /// Observable session state.
    pub fn state(&self) -> RunState {
        self.state.get()
    }

    /// Calibration offset after a completed tare; 0 before.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Drive the whole session on the calling thread: calibrate, run the
    /// periodic loop until a stop request or fatal error, then release the
    /// hardware. Resources are released on every exit path.
    pub fn run_blocking(&mut self) -> Result<(), ControlError> {
        if self.state.get() != RunState::Idle {
            return Err(ControlError::Config(
                "this control loop already ran; build a fresh instance".into(),
            ));
        }
        let result = self.startup_and_tick();
        self.state.set(RunState::Stopping);
        self.shutdown();
        self.state.set(RunState::Stopped);
        if let Err(e) = &result {
            tracing::error!(error = %e, "session ended on fatal error");
        }
        result
    }

    fn startup_and_tick(&mut self) -> Result<(), ControlError> {
        self.state.set(RunState::Calibrating);
        match self.actuator.connect() {
            Ok(true) => {}
            Ok(false) => {
                return Err(ControlError::ActuatorIo(
                    "motor did not respond on connect".into(),
                ));
            }
            Err(e) => return Err(ControlError::ActuatorIo(e.to_string())),
        }
        self.actuator
            .zero_position()
            .map_err(|e| ControlError::ActuatorIo(e.to_string()))?;
        self.clock.sleep(self.cfg.zero_settle);
        tracing::info!("motor connected and zeroed");

        self.offset = calibrate::tare(
            &mut self.sensor,
            &*self.clock,
            self.cfg.calibration_samples,
            self.cfg.calibration_interval,
            self.cfg.sensor_timeout,
        )?;

        self.actuator
            .set_velocity_gains(self.cfg.kd)
            .map_err(|e| ControlError::ActuatorIo(e.to_string()))?;

        // A stop that arrived during calibration ends the session before
        // the first control tick.
        if self.stop.load(Ordering::Acquire) {
            tracing::info!("stop requested before the loop started");
            return Ok(());
        }
        self.state.set(RunState::Running);
        self.tick_loop()
    }

    fn tick_loop(&mut self) -> Result<(), ControlError> {
        let dt = util::period_secs(self.cfg.frequency_hz);
        let period_us = util::period_us(self.cfg.frequency_hz);
        let start = self.clock.now();
        let mut k: u64 = 0;
        loop {
            k += 1;
            // Tick k targets start + k*period, computed by multiplication:
            // per-tick latency cannot accumulate into schedule drift.
            let deadline = start + Duration::from_micros(period_us.saturating_mul(k));
            self.clock.sleep_until(deadline);

            // Cooperative cancellation, checked once per tick boundary.
            if self.stop.load(Ordering::Acquire) {
                tracing::info!(ticks = k - 1, "stop requested");
                return Ok(());
            }
            if self.clock.now().saturating_duration_since(deadline) > self.period {
                self.missed_deadlines += 1;
            }

            let joint = self
                .actuator
                .read_state()
                .map_err(|e| ControlError::ActuatorIo(e.to_string()))?;

            let corrected = match self.sensor.read_raw(self.cfg.sensor_timeout) {
                Ok(raw) => Some(raw - self.offset),
                Err(e) => match classify_sensor_error(&*e) {
                    SensorFault::Transient(msg) => {
                        tracing::debug!(error = %msg, tick = k, "bad sensor frame, holding filtered torque");
                        None
                    }
                    SensorFault::Fatal(msg) => return Err(ControlError::SensorIo(msg)),
                },
            };

            let gains = self.params.snapshot();
            let filtered = match corrected {
                Some(raw) => self.filter.update(raw, gains.filter_alpha),
                None => self.filter.last().unwrap_or_default(),
            };

            let desired = desired_velocity(filtered, &joint, self.cfg.reference, &gains, dt);
            let command = desired.clamp(-self.cfg.velocity_limit, self.cfg.velocity_limit);
            self.actuator
                .command_velocity(command)
                .map_err(|e| ControlError::ActuatorIo(e.to_string()))?;

            self.sink.push(ControlRecord {
                t: k as f64 * dt,
                position: joint.position,
                velocity: joint.velocity,
                filtered_torque: filtered,
                commanded_velocity: command,
            });
            self.ticks.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                tick = k,
                position = joint.position,
                velocity = joint.velocity,
                torque = filtered,
                command,
                "tick"
            );
        }
    }

    /// Best-effort safe-state and release; runs on every exit path.
    fn shutdown(&mut self) {
        if let Err(e) = self.actuator.command_velocity(0.0) {
            tracing::warn!(error = %e, "final zero-velocity command failed");
        }
        if let Err(e) = self.actuator.disconnect() {
            tracing::warn!(error = %e, "actuator disconnect failed");
        }
        let ticks = self.ticks.load(Ordering::Relaxed);
        if self.missed_deadlines > 0 {
            tracing::warn!(
                ticks,
                missed = self.missed_deadlines,
                "some ticks missed their deadline by more than one period"
            );
        } else {
            tracing::debug!(ticks, "all ticks met their deadline");
        }
    }
}
