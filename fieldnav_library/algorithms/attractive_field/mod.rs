//! Attractive Field
//!
//! Goal-seeking force laws. The law is chosen once from configuration and
//! its magnitude doubles as the requested forward speed.
//!
//! # Features
//!
//! - Linear, quadratic, conic (saturating) and exponential laws
//! - Runtime gain scaling, used to weaken attraction while trapped
//! - Zero force inside the arrival tolerance
//!
//! # Example
//!
//! ```rust
//! use fieldnav_library::algorithms::attractive_field::AttractiveLaw;
//!
//! let law = AttractiveLaw::Linear { k: 0.25 };
//! assert_eq!(law.magnitude(100.0, 1.0), 25.0);
//! assert_eq!(law.magnitude(100.0, 0.5), 12.5);
//! ```

use crate::messages::{Force2D, Pose2D, Waypoint};
use serde::{Deserialize, Serialize};

/// Attractive force law
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "law", rename_all = "snake_case")]
pub enum AttractiveLaw {
    /// `k·d`
    Linear { k: f64 },
    /// `k·d²/c`
    Quadratic { k: f64, c: f64 },
    /// `k·min(d, d_sat)·c`
    Conic { k: f64, d_sat: f64, c: f64 },
    /// `k·(1 − e^(−d/λ))·c`
    Exponential { k: f64, lambda: f64, c: f64 },
}

impl Default for AttractiveLaw {
    fn default() -> Self {
        AttractiveLaw::Linear { k: 0.25 }
    }
}

impl AttractiveLaw {
    pub fn quadratic() -> Self {
        AttractiveLaw::Quadratic { k: 0.05, c: 10.0 }
    }

    pub fn conic() -> Self {
        AttractiveLaw::Conic {
            k: 0.15,
            d_sat: 100.0,
            c: 2.0,
        }
    }

    pub fn exponential() -> Self {
        AttractiveLaw::Exponential {
            k: 2.5,
            lambda: 50.0,
            c: 20.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttractiveLaw::Linear { .. } => "linear",
            AttractiveLaw::Quadratic { .. } => "quadratic",
            AttractiveLaw::Conic { .. } => "conic",
            AttractiveLaw::Exponential { .. } => "exponential",
        }
    }

    /// Force magnitude at distance `d` with the gain multiplied by `gain_scale`
    pub fn magnitude(&self, d: f64, gain_scale: f64) -> f64 {
        let d = d.max(0.0);
        match *self {
            AttractiveLaw::Linear { k } => k * gain_scale * d,
            AttractiveLaw::Quadratic { k, c } => k * gain_scale * d * d / c,
            AttractiveLaw::Conic { k, d_sat, c } => k * gain_scale * d.min(d_sat) * c,
            AttractiveLaw::Exponential { k, lambda, c } => {
                k * gain_scale * (1.0 - (-d / lambda).exp()) * c
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        match *self {
            AttractiveLaw::Linear { k } => positive(k),
            AttractiveLaw::Quadratic { k, c } => positive(k) && positive(c),
            AttractiveLaw::Conic { k, d_sat, c } => positive(k) && positive(d_sat) && positive(c),
            AttractiveLaw::Exponential { k, lambda, c } => {
                positive(k) && positive(lambda) && positive(c)
            }
        }
    }
}

/// Attractive force for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attraction {
    pub force: Force2D,
    /// World-frame bearing to the goal
    pub bearing: f64,
    pub distance: f64,
    pub magnitude: f64,
}

/// Pull toward `goal`, zero once within `tolerance`
pub fn attract(
    law: &AttractiveLaw,
    pose: &Pose2D,
    goal: &Waypoint,
    tolerance: f64,
    gain_scale: f64,
) -> Attraction {
    let distance = pose.distance_to(goal);
    let bearing = pose.bearing_to(goal);
    let magnitude = if distance < tolerance {
        0.0
    } else {
        law.magnitude(distance, gain_scale)
    };
    Attraction {
        force: Force2D::from_polar(magnitude, bearing),
        bearing,
        distance,
        magnitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_law_magnitudes() {
        assert_relative_eq!(AttractiveLaw::default().magnitude(40.0, 1.0), 10.0);
        assert_relative_eq!(AttractiveLaw::quadratic().magnitude(20.0, 1.0), 2.0);
        assert_relative_eq!(AttractiveLaw::conic().magnitude(50.0, 1.0), 15.0);
        assert_relative_eq!(AttractiveLaw::conic().magnitude(500.0, 1.0), 30.0);
        assert_relative_eq!(
            AttractiveLaw::exponential().magnitude(50.0, 1.0),
            50.0 * (1.0 - (-1.0f64).exp()),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_gain_scale() {
        let law = AttractiveLaw::exponential();
        assert_relative_eq!(
            law.magnitude(80.0, 0.3),
            0.3 * law.magnitude(80.0, 1.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zero_inside_tolerance() {
        let a = attract(
            &AttractiveLaw::default(),
            &Pose2D::origin(),
            &Waypoint::new(3.0, 0.0),
            5.0,
            1.0,
        );
        assert_eq!(a.magnitude, 0.0);
        assert!(a.force.is_zero());
        assert_relative_eq!(a.distance, 3.0);
    }

    #[test]
    fn test_direction_points_at_goal() {
        let a = attract(
            &AttractiveLaw::default(),
            &Pose2D::new(0.0, 0.0, 1.0),
            &Waypoint::new(0.0, 100.0),
            5.0,
            1.0,
        );
        assert_relative_eq!(a.bearing, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(a.force.y, 25.0, epsilon = 1e-9);
        assert_relative_eq!(a.force.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_law_from_yaml() {
        let law: AttractiveLaw = serde_yaml::from_str("law: conic\nk: 0.2\nd_sat: 80\nc: 1.5\n").unwrap();
        assert_eq!(
            law,
            AttractiveLaw::Conic {
                k: 0.2,
                d_sat: 80.0,
                c: 1.5
            }
        );
        assert_eq!(law.name(), "conic");
        assert!(law.is_valid());
        assert!(!AttractiveLaw::Linear { k: -1.0 }.is_valid());
    }
}
