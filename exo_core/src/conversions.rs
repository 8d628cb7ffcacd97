//! Mappings from the TOML config schema to engine types.

use crate::admittance::Reference;
use crate::control::LoopCfg;
use crate::error::GainError;
use crate::params::AdmittanceGains;
use std::time::Duration;

impl TryFrom<&exo_config::Admittance> for AdmittanceGains {
    type Error = GainError;

    fn try_from(a: &exo_config::Admittance) -> Result<Self, Self::Error> {
        AdmittanceGains::new(a.mass, a.damping, a.stiffness, a.filter_alpha)
    }
}

impl From<&exo_config::Config> for LoopCfg {
    fn from(cfg: &exo_config::Config) -> Self {
        LoopCfg {
            frequency_hz: cfg.control.frequency_hz,
            velocity_limit: cfg.control.velocity_limit,
            kd: cfg.control.kd,
            sensor_timeout: Duration::from_millis(cfg.sensor.read_timeout_ms),
            calibration_samples: cfg.calibration.samples,
            calibration_interval: Duration::from_millis(cfg.calibration.interval_ms),
            zero_settle: Duration::from_millis(cfg.control.zero_settle_ms),
            reference: Reference::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_map_onto_loop_defaults() {
        let cfg = exo_config::Config::default();
        let loop_cfg = LoopCfg::from(&cfg);
        assert_eq!(loop_cfg.frequency_hz, 1000);
        assert!((loop_cfg.velocity_limit - 1.0).abs() < 1e-12);
        assert_eq!(loop_cfg.sensor_timeout, Duration::from_millis(150));
        assert_eq!(loop_cfg.calibration_samples, 1000);
    }

    #[test]
    fn invalid_admittance_section_is_rejected_at_conversion() {
        let mut cfg = exo_config::Config::default();
        cfg.admittance.mass = 0.0;
        assert!(AdmittanceGains::try_from(&cfg.admittance).is_err());
    }
}
