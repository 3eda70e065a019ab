//! Score damping.
//!
//! Pulls raw scores that sit near 0 or 1 back towards the middle so end
//! users never see flat 0% / 100% readings. Rank order is approximately
//! preserved; a small random jitter is added at each boundary.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Raw scores at or below this are lifted.
pub const LOW_KNEE: f64 = 0.3;
/// Raw scores at or above this are lowered.
pub const HIGH_KNEE: f64 = 0.93;
const SLOPE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Smoother {
    /// Upper bound of the uniform draw added below [`LOW_KNEE`].
    pub low_jitter: f64,
    /// Upper bound of the uniform draw subtracted above [`HIGH_KNEE`].
    pub high_jitter: f64,
}

impl Default for Smoother {
    fn default() -> Self {
        Self {
            low_jitter: 0.07,
            high_jitter: 0.03,
        }
    }
}

impl Smoother {
    pub const fn new(low_jitter: f64, high_jitter: f64) -> Self {
        Self {
            low_jitter,
            high_jitter,
        }
    }

    /// No jitter: the remap is a pure function of the raw value.
    pub const fn deterministic() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn apply(&self, raw: f64, rng: &mut dyn RngCore) -> f64 {
        if raw <= LOW_KNEE {
            LOW_KNEE + SLOPE * raw + rng.gen::<f64>() * self.low_jitter
        } else if raw >= HIGH_KNEE {
            HIGH_KNEE - SLOPE * (1.0 - raw) - rng.gen::<f64>() * self.high_jitter
        } else {
            raw
        }
    }
}
