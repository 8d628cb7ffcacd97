//! Virtual mass-spring-damper law.
//!
//! The joint behaves as if the external torque drove a virtual second-order
//! system:
//!
//! ```text
//! accel = (tau - B*(omega - omega_ref) - K*(theta - theta_ref)) / M
//! omega_desired = omega + accel * dt
//! ```
//!
//! One explicit Euler step per tick; no state beyond the inputs.

use crate::params::AdmittanceGains;
use exo_traits::JointState;

/// Equilibrium the virtual spring/damper pulls toward. Zero for the baseline
/// policy (the zeroed position at rest); exposed for extension.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reference {
    pub position: f64,
    pub velocity: f64,
}

/// Desired joint velocity for this tick. `gains.mass > 0` is guaranteed by
/// `AdmittanceGains` construction, so the division is well-defined.
#[inline]
pub fn desired_velocity(
    filtered_torque: f64,
    state: &JointState,
    reference: Reference,
    gains: &AdmittanceGains,
    dt: f64,
) -> f64 {
    let accel = (filtered_torque
        - gains.damping * (state.velocity - reference.velocity)
        - gains.stiffness * (state.position - reference.position))
        / gains.mass;
    state.velocity + accel * dt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gains(mass: f64, damping: f64, stiffness: f64) -> AdmittanceGains {
        AdmittanceGains::new(mass, damping, stiffness, 0.1).unwrap()
    }

    #[test]
    fn unit_mass_free_joint_is_unperturbed_by_zero_torque() {
        let state = JointState {
            velocity: 0.73,
            ..JointState::default()
        };
        for dt in [1e-4, 1e-3, 0.5] {
            let v = desired_velocity(0.0, &state, Reference::default(), &gains(1.0, 0.0, 0.0), dt);
            assert!((v - 0.73).abs() < 1e-12, "dt={dt} v={v}");
        }
    }

    #[test]
    fn torque_step_integrates_through_the_virtual_mass() {
        // accel = 5.0 / 0.001 = 5000; omega_desired = 5000 * 0.001 = 5.0
        let state = JointState::default();
        let v = desired_velocity(
            5.0,
            &state,
            Reference::default(),
            &gains(0.001, 0.2, 20.0),
            0.001,
        );
        assert!((v - 5.0).abs() < 1e-9);
    }

    #[test]
    fn spring_pulls_back_toward_reference() {
        let state = JointState {
            position: 0.5,
            ..JointState::default()
        };
        let v = desired_velocity(0.0, &state, Reference::default(), &gains(1.0, 0.0, 2.0), 0.1);
        assert!(v < 0.0, "displaced joint should be pushed back, got {v}");
    }

    #[test]
    fn damper_opposes_velocity_error() {
        let state = JointState {
            velocity: 1.0,
            ..JointState::default()
        };
        let v = desired_velocity(0.0, &state, Reference::default(), &gains(1.0, 3.0, 0.0), 0.1);
        assert!(v < 1.0, "damping should bleed off velocity, got {v}");
    }
}
