//! Line-oriented load-cell reader.
//!
//! The cell's microcontroller streams one ASCII weight per line. This reader
//! extracts the first numeric token from each line and converts weight to
//! joint torque via the lever arm. Anything unparseable is a transient
//! `FrameParse`; end-of-stream is a fatal `Disconnected`.
//!
//! The reader works over any `BufRead`, so tests drive it with in-memory
//! buffers and the CLI hands it an opened tty. Per-read deadlines are only
//! enforced between lines; the underlying port is expected to be configured
//! (VMIN/VTIME) so blocked reads return.

use crate::error::HwError;
use exo_traits::TorqueSensor;
use std::io::BufRead;
use std::time::{Duration, Instant};

pub struct LineTorqueSensor<R: BufRead> {
    reader: R,
    arm_length_m: f64,
    line: String,
}

impl<R: BufRead> LineTorqueSensor<R> {
    pub fn new(reader: R, arm_length_m: f64) -> Self {
        Self {
            reader,
            arm_length_m,
            line: String::new(),
        }
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<f64, HwError> {
        let deadline = Instant::now() + timeout;
        loop {
            self.line.clear();
            let n = self.reader.read_line(&mut self.line)?;
            if n == 0 {
                return Err(HwError::Disconnected("sensor stream ended".into()));
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                // Blank keep-alive lines are common between frames.
                if Instant::now() >= deadline {
                    return Err(HwError::Timeout);
                }
                continue;
            }
            return match parse_weight(trimmed) {
                Some(weight) => Ok(weight * self.arm_length_m),
                None => Err(HwError::FrameParse(trimmed.to_string())),
            };
        }
    }
}

/// First numeric token on the line, tolerating unit suffixes like "12.5 g".
fn parse_weight(line: &str) -> Option<f64> {
    for token in line.split_whitespace() {
        let token = token.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        if let Ok(v) = token.parse::<f64>() {
            if v.is_finite() {
                return Some(v);
            }
        }
    }
    None
}

impl<R: BufRead> TorqueSensor for LineTorqueSensor<R> {
    fn read_raw(
        &mut self,
        timeout: Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        self.read_frame(timeout).map_err(|e| {
            let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
            boxed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    fn sensor(data: &str, arm: f64) -> LineTorqueSensor<Cursor<Vec<u8>>> {
        LineTorqueSensor::new(Cursor::new(data.as_bytes().to_vec()), arm)
    }

    #[rstest]
    #[case("10.0\n", 0.15, 1.5)]
    #[case("-4.2g\n", 1.0, -4.2)]
    #[case("\n\n 7.5 g\n", 0.2, 1.5)]
    #[case("w: 3.0\n", 1.0, 3.0)]
    fn frames_scale_by_arm_length(#[case] data: &str, #[case] arm: f64, #[case] expected: f64) {
        let mut s = sensor(data, arm);
        let v = s.read_raw(Duration::from_millis(50)).unwrap();
        assert!((v - expected).abs() < 1e-12, "got {v}, want {expected}");
    }

    #[test]
    fn garbage_line_is_a_transient_parse_error() {
        let mut s = sensor("ERR:overload\n5.0\n", 1.0);
        let err = s.read_raw(Duration::from_millis(50)).unwrap_err();
        let hw = err.downcast_ref::<HwError>().expect("HwError");
        assert!(hw.is_transient());
        // Next frame is fine.
        let v = s.read_raw(Duration::from_millis(50)).unwrap();
        assert!((v - 5.0).abs() < 1e-12);
    }

    #[test]
    fn end_of_stream_is_fatal() {
        let mut s = sensor("", 1.0);
        let err = s.read_raw(Duration::from_millis(50)).unwrap_err();
        let hw = err.downcast_ref::<HwError>().expect("HwError");
        assert!(!hw.is_transient());
    }
}
