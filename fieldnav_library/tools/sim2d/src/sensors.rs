//! Sensor noise for sim2d
//!
//! Noise is drawn from a caller-owned seeded generator so every run with the
//! same seed reproduces exactly.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Noise model configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseModel {
    /// Standard deviation for Gaussian noise
    pub std_dev: f64,
    /// Mean offset (bias)
    pub mean: f64,
    /// Enable/disable noise
    pub enabled: bool,
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self {
            std_dev: 0.0,
            mean: 0.0,
            enabled: false,
        }
    }
}

impl NoiseModel {
    /// Create a noise model with given standard deviation
    pub fn with_std_dev(std_dev: f64) -> Self {
        Self {
            std_dev,
            mean: 0.0,
            enabled: std_dev > 0.0,
        }
    }

    /// Create a noise model with bias
    pub fn with_bias(std_dev: f64, mean: f64) -> Self {
        Self {
            std_dev,
            mean,
            enabled: std_dev > 0.0 || mean != 0.0,
        }
    }

    /// Draw one noise value, zero when disabled
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        if self.std_dev <= 0.0 {
            return self.mean;
        }
        match Normal::new(self.mean, self.std_dev) {
            Ok(normal) => normal.sample(rng),
            Err(_) => self.mean,
        }
    }

    /// Apply noise to a value
    pub fn apply<R: Rng + ?Sized>(&self, value: f64, rng: &mut R) -> f64 {
        value + self.sample(rng)
    }
}
