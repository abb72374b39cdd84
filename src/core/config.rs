//! Simulation parameters supplied by the particle source.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Arena size and run length.
///
/// The arena spans `[0, width] x [0, height]`. Validated when a simulation is built;
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub width: f64,
    pub height: f64,
    /// Simulated time at which the run terminates.
    pub duration: f64,
}

impl SimConfig {
    pub fn new(width: f64, height: f64, duration: f64) -> Self {
        Self {
            width,
            height,
            duration,
        }
    }

    /// Square arena of side `width`.
    pub fn square(width: f64, duration: f64) -> Self {
        Self::new(width, width, duration)
    }

    /// Errors with `Error::InvalidParam` unless every value is finite and > 0.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("duration", self.duration),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidParam(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}
