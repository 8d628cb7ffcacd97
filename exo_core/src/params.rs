//! Retunable admittance coefficients.
//!
//! The operator writes single fields from its own thread while the control
//! tick reads the whole set once per tick. Reads must never see a torn mix
//! of old and new fields and must never block, so the store swaps immutable
//! snapshots atomically instead of locking per field.

use crate::error::GainError;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Virtual dynamics coefficients plus the torque filter gain. Constructed
/// validated; an instance in hand is always in-domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmittanceGains {
    /// Virtual mass (kg·m²), strictly positive.
    pub mass: f64,
    /// Virtual damping (N·m·s/rad), non-negative.
    pub damping: f64,
    /// Virtual stiffness (N·m/rad), non-negative.
    pub stiffness: f64,
    /// EMA gain for the torque filter, in [0, 1].
    pub filter_alpha: f64,
}

impl AdmittanceGains {
    pub fn new(mass: f64, damping: f64, stiffness: f64, filter_alpha: f64) -> Result<Self, GainError> {
        GainField::Mass.check(mass)?;
        GainField::Damping.check(damping)?;
        GainField::Stiffness.check(stiffness)?;
        GainField::FilterAlpha.check(filter_alpha)?;
        Ok(Self {
            mass,
            damping,
            stiffness,
            filter_alpha,
        })
    }
}

impl Default for AdmittanceGains {
    /// The tuning the source system shipped with.
    fn default() -> Self {
        Self {
            mass: 0.001,
            damping: 0.2,
            stiffness: 20.0,
            filter_alpha: 0.1,
        }
    }
}

/// One settable coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainField {
    Mass,
    Damping,
    Stiffness,
    FilterAlpha,
}

impl GainField {
    /// Domain check for a candidate value. Field domains are independent of
    /// one another, so a value valid now stays valid regardless of racing
    /// writes to other fields.
    fn check(self, value: f64) -> Result<(), GainError> {
        let ok = match self {
            GainField::Mass => value.is_finite() && value > 0.0,
            GainField::Damping | GainField::Stiffness => value.is_finite() && value >= 0.0,
            GainField::FilterAlpha => value.is_finite() && (0.0..=1.0).contains(&value),
        };
        if ok {
            Ok(())
        } else {
            Err(match self {
                GainField::Mass => GainError::NonPositiveMass(value),
                GainField::Damping => GainError::NegativeDamping(value),
                GainField::Stiffness => GainError::NegativeStiffness(value),
                GainField::FilterAlpha => GainError::AlphaOutOfRange(value),
            })
        }
    }

    fn apply(self, gains: &mut AdmittanceGains, value: f64) {
        match self {
            GainField::Mass => gains.mass = value,
            GainField::Damping => gains.damping = value,
            GainField::Stiffness => gains.stiffness = value,
            GainField::FilterAlpha => gains.filter_alpha = value,
        }
    }
}

impl std::str::FromStr for GainField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mass" | "m" => Ok(GainField::Mass),
            "damping" | "b" => Ok(GainField::Damping),
            "stiffness" | "k" => Ok(GainField::Stiffness),
            "alpha" | "filter_alpha" => Ok(GainField::FilterAlpha),
            other => Err(format!("unknown gain field: {other}")),
        }
    }
}

/// Shared, concurrently mutable gain store. Cloning shares the same cell.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    inner: Arc<ArcSwap<AdmittanceGains>>,
}

impl ParameterStore {
    pub fn new(gains: AdmittanceGains) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(gains)),
        }
    }

    /// Consistent snapshot; wait-free, safe from the control tick.
    pub fn snapshot(&self) -> Arc<AdmittanceGains> {
        self.inner.load_full()
    }

    /// Update one field. Out-of-domain values are rejected, not clamped.
    pub fn set(&self, field: GainField, value: f64) -> Result<(), GainError> {
        field.check(value)?;
        self.inner.rcu(|cur| {
            let mut next = **cur;
            field.apply(&mut next, value);
            next
        });
        tracing::info!(?field, value, "admittance gain updated");
        Ok(())
    }

    /// Replace the whole set (already validated by construction).
    pub fn store(&self, gains: AdmittanceGains) {
        self.inner.store(Arc::new(gains));
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(AdmittanceGains::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_rejects_non_positive_mass() {
        assert_eq!(
            AdmittanceGains::new(0.0, 0.0, 0.0, 0.5).unwrap_err(),
            GainError::NonPositiveMass(0.0)
        );
        assert!(AdmittanceGains::new(f64::NAN, 0.0, 0.0, 0.5).is_err());
    }

    #[test]
    fn set_rejects_out_of_range_alpha_without_touching_the_store() {
        let store = ParameterStore::default();
        let before = *store.snapshot();
        assert!(store.set(GainField::FilterAlpha, 1.5).is_err());
        assert_eq!(*store.snapshot(), before);
    }

    #[test]
    fn set_updates_a_single_field() {
        let store = ParameterStore::default();
        store.set(GainField::Damping, 0.35).unwrap();
        let g = store.snapshot();
        assert_eq!(g.damping, 0.35);
        assert_eq!(g.mass, AdmittanceGains::default().mass);
    }

    #[test]
    fn field_names_parse_case_insensitively() {
        assert_eq!("Mass".parse::<GainField>().unwrap(), GainField::Mass);
        assert_eq!("K".parse::<GainField>().unwrap(), GainField::Stiffness);
        assert!("spring".parse::<GainField>().is_err());
    }
}
