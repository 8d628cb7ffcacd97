use thiserror::Error;

/// Session-level failures. Only `SensorIo` and `ActuatorIo` end a running
/// session; configuration problems are rejected before the loop starts and
/// `AlreadyRunning` is an outcome the operator sees, not a fault.
#[derive(Debug, Error, Clone)]
pub enum ControlError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("sensor failure: {0}")]
    SensorIo(String),
    #[error("actuator failure: {0}")]
    ActuatorIo(String),
    #[error("a control session is already active")]
    AlreadyRunning,
}

/// Invalid admittance parameter domains. Values are rejected, never clamped,
/// so the operator sees exactly what was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum GainError {
    #[error("mass must be finite and > 0 (got {0})")]
    NonPositiveMass(f64),
    #[error("damping must be finite and >= 0 (got {0})")]
    NegativeDamping(f64),
    #[error("stiffness must be finite and >= 0 (got {0})")]
    NegativeStiffness(f64),
    #[error("filter gain must lie in [0, 1] (got {0})")]
    AlphaOutOfRange(f64),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// How a failed hardware call affects the session.
#[derive(Debug)]
pub(crate) enum SensorFault {
    /// Costs one sample; the tick reuses the previous filtered value.
    Transient(String),
    /// Ends the session.
    Fatal(String),
}

// Classify a boxed hardware error, preferring the typed path.
pub(crate) fn classify_sensor_error(e: &(dyn std::error::Error + 'static)) -> SensorFault {
    #[cfg(feature = "hardware-errors")]
    if let Some(hw) = e.downcast_ref::<exo_hardware::HwError>() {
        return if hw.is_transient() {
            SensorFault::Transient(hw.to_string())
        } else {
            SensorFault::Fatal(hw.to_string())
        };
    }
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("parse") || lower.contains("timeout") || lower.contains("malformed") {
        SensorFault::Transient(s)
    } else {
        SensorFault::Fatal(s)
    }
}
