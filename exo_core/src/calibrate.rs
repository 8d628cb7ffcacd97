//! Tare: the static sensor offset measured before the loop starts.
//!
//! The sensor must be unloaded and at rest; the operator guarantees that.
//! No outlier rejection: the offset is the plain mean of the window.

use crate::error::{ControlError, SensorFault, classify_sensor_error};
use exo_traits::{Clock, TorqueSensor};
use std::time::Duration;

/// Collect `samples` raw readings spaced `interval` apart and return their
/// mean. Blocks the calling context; runs once per session, before
/// real-time operation begins.
///
/// Malformed frames are skipped and retried without counting toward the
/// window. A fatal sensor failure aborts with no partial offset.
pub fn tare<S: TorqueSensor + ?Sized>(
    sensor: &mut S,
    clock: &dyn Clock,
    samples: u32,
    interval: Duration,
    read_timeout: Duration,
) -> Result<f64, ControlError> {
    let samples = samples.max(1);
    tracing::info!(samples, ?interval, "taring torque sensor");
    let mut sum = 0.0;
    let mut collected: u32 = 0;
    while collected < samples {
        match sensor.read_raw(read_timeout) {
            Ok(raw) => {
                sum += raw;
                collected += 1;
                if collected < samples {
                    clock.sleep(interval);
                }
            }
            Err(e) => match classify_sensor_error(&*e) {
                SensorFault::Transient(msg) => {
                    tracing::debug!(error = %msg, "skipping bad frame during tare");
                }
                SensorFault::Fatal(msg) => {
                    return Err(ControlError::SensorIo(msg));
                }
            },
        }
    }
    let offset = sum / f64::from(samples);
    tracing::info!(offset_nm = offset, "tare complete");
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{ScriptedSensor, SensorStep};
    use exo_traits::MonotonicClock;

    #[test]
    fn constant_signal_yields_that_offset() {
        let mut sensor = ScriptedSensor::constant(0.37);
        let offset = tare(
            &mut sensor,
            &MonotonicClock::new(),
            25,
            Duration::ZERO,
            Duration::from_millis(10),
        )
        .unwrap();
        assert!((offset - 0.37).abs() < 1e-12);
    }

    #[test]
    fn bad_frames_do_not_bias_the_mean() {
        let mut sensor = ScriptedSensor::new(vec![
            SensorStep::Value(2.0),
            SensorStep::Transient,
            SensorStep::Transient,
            SensorStep::Value(2.0),
            SensorStep::Value(2.0),
        ]);
        let offset = tare(
            &mut sensor,
            &MonotonicClock::new(),
            3,
            Duration::ZERO,
            Duration::from_millis(10),
        )
        .unwrap();
        assert!((offset - 2.0).abs() < 1e-12);
    }

    #[test]
    fn fatal_failure_aborts_with_no_offset() {
        let mut sensor = ScriptedSensor::new(vec![SensorStep::Value(1.0), SensorStep::Fatal]);
        let err = tare(
            &mut sensor,
            &MonotonicClock::new(),
            10,
            Duration::ZERO,
            Duration::from_millis(10),
        )
        .unwrap_err();
        assert!(matches!(err, ControlError::SensorIo(_)));
    }
}
