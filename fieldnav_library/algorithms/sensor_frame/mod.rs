//! Proximity Sensor Frame
//!
//! Turns the seven raw infrared intensities into calibrated distance
//! estimates with fixed bearings.
//!
//! # Features
//!
//! - Per-sensor sensitivity normalization
//! - Piecewise power-law distance model with two exponent bands
//! - Bearing-dependent compensation for oblique sensors
//! - Out-of-range readings clamped and flagged, never fatal
//! - Frontal / lateral / corner queries used by the governor and steering
//!
//! # Example
//!
//! ```rust
//! use fieldnav_library::algorithms::sensor_frame::{ProximityThresholds, SensorCalibration, SensorFrame};
//!
//! let calibration = SensorCalibration::default();
//! let thresholds = ProximityThresholds::default();
//!
//! // Middle sensor sees something close, the rest see nothing
//! let raw = [0.0, 0.0, 0.0, 1045.0, 0.0, 0.0, 0.0];
//! let frame = SensorFrame::build(&calibration, &thresholds, &raw);
//!
//! assert_eq!(frame.obstacle_count(), 1);
//! assert!((frame.min_frontal_distance() - 5.0).abs() < 1e-9);
//! ```

use crate::messages::{wrap_angle, Pose2D, ProximityScan, SensorFault, SENSOR_COUNT};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Sensors facing forward, used for braking
pub const FRONTAL: [usize; 3] = [2, 3, 4];
/// Side-facing sensors, used for lateral slowdown
pub const LATERAL: [usize; 4] = [0, 1, 5, 6];
/// Left side pair
pub const LEFT_SIDE: [usize; 2] = [0, 1];
/// Right side pair
pub const RIGHT_SIDE: [usize; 2] = [5, 6];
/// Outermost sensors
pub const CORNERS: [usize; 2] = [0, SENSOR_COUNT - 1];

/// Multiplier applied to estimates from sensors beyond a bearing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompensationBand {
    pub above_deg: f64,
    pub factor: f64,
}

/// Piecewise power-law model from normalized intensity to distance (cm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceModel {
    /// Normalized reading observed at `ref_distance`; saturation above it
    pub ref_reading: f64,
    pub ref_distance: f64,
    /// Readings at or above this use `exponent_near`
    pub band_threshold: f64,
    pub exponent_near: f64,
    pub exponent_far: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    /// Below this normalized value the sensor sees nothing in range
    pub no_signal_floor: f64,
    /// Largest raw value the hardware can produce
    pub max_raw_reading: f64,
    /// Checked in order, first match applies
    pub compensation: Vec<CompensationBand>,
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self {
            ref_reading: 1000.0,
            ref_distance: 5.0,
            band_threshold: 60.0,
            exponent_near: 0.65,
            exponent_far: 0.70,
            min_distance: 4.0,
            max_distance: 60.0,
            no_signal_floor: 25.0,
            max_raw_reading: 4095.0,
            compensation: vec![
                CompensationBand { above_deg: 50.0, factor: 1.15 },
                CompensationBand { above_deg: 30.0, factor: 1.08 },
                CompensationBand { above_deg: 15.0, factor: 1.03 },
            ],
        }
    }
}

impl DistanceModel {
    /// Distance for a normalized reading, before bearing compensation
    pub fn base_distance(&self, normalized: f64) -> f64 {
        if normalized < self.no_signal_floor {
            return self.max_distance;
        }
        let distance = if normalized >= self.ref_reading {
            self.ref_distance
        } else {
            let exponent = if normalized >= self.band_threshold {
                self.exponent_near
            } else {
                self.exponent_far
            };
            self.ref_distance * (self.ref_reading / normalized).powf(exponent)
        };
        distance.clamp(self.min_distance, self.max_distance)
    }

    /// Normalized reading that decodes to `distance` (inverse of `base_distance`)
    ///
    /// Distances inside the gap between the two exponent bands map to the
    /// edge of the far band.
    pub fn normalized_for(&self, distance: f64) -> f64 {
        if !distance.is_finite() || distance >= self.max_distance {
            return 0.0;
        }
        if distance <= self.ref_distance {
            return self.ref_reading;
        }
        let ratio = self.ref_distance / distance;
        let near = self.ref_reading * ratio.powf(1.0 / self.exponent_near);
        if near >= self.band_threshold {
            return near;
        }
        let far = self.ref_reading * ratio.powf(1.0 / self.exponent_far);
        if far < self.band_threshold {
            far.max(self.no_signal_floor)
        } else {
            self.band_threshold * (1.0 - 1e-9)
        }
    }

    pub fn compensation_for(&self, bearing_deg: f64) -> f64 {
        let abs_bearing = bearing_deg.abs();
        self.compensation
            .iter()
            .find(|band| abs_bearing > band.above_deg)
            .map(|band| band.factor)
            .unwrap_or(1.0)
    }
}

/// Normalized-intensity thresholds shared by the whole pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityThresholds {
    pub detect: f64,
    pub caution: f64,
    pub warning: f64,
    pub critical: f64,
    pub emergency: f64,
}

impl Default for ProximityThresholds {
    fn default() -> Self {
        Self {
            detect: 30.0,
            caution: 90.0,
            warning: 180.0,
            critical: 350.0,
            emergency: 700.0,
        }
    }
}

impl ProximityThresholds {
    pub fn is_ascending(&self) -> bool {
        self.detect > 0.0
            && self.detect < self.caution
            && self.caution < self.warning
            && self.warning < self.critical
            && self.critical < self.emergency
    }
}

/// Fixed per-sensor calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorCalibration {
    /// Sensitivity factor per sensor, `normalized = raw / factor`
    pub factors: [f64; SENSOR_COUNT],
    /// Bearing from the forward axis in degrees, positive to the left
    pub bearings_deg: [f64; SENSOR_COUNT],
    pub model: DistanceModel,
}

impl Default for SensorCalibration {
    fn default() -> Self {
        Self {
            factors: [1.382, 1.121, 0.270, 1.045, 0.896, 0.672, 0.901],
            bearings_deg: [65.3, 38.0, 20.0, -3.0, -14.25, -34.0, -65.3],
            model: DistanceModel::default(),
        }
    }
}

/// Distance estimate for one raw reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEstimate {
    pub normalized: f64,
    pub distance: f64,
    pub fault: Option<SensorFault>,
}

impl SensorCalibration {
    /// Bearing of a sensor in radians
    pub fn bearing(&self, index: usize) -> f64 {
        self.bearings_deg[index].to_radians()
    }

    pub fn normalize(&self, index: usize, raw: f64) -> f64 {
        raw / self.factors[index]
    }

    /// Decode one raw reading
    pub fn estimate_distance(&self, index: usize, raw: f64) -> SensorEstimate {
        if !raw.is_finite() {
            return SensorEstimate {
                normalized: 0.0,
                distance: f64::INFINITY,
                fault: Some(SensorFault::NonFinite),
            };
        }
        if raw < 0.0 {
            return SensorEstimate {
                normalized: 0.0,
                distance: f64::INFINITY,
                fault: Some(SensorFault::Negative { raw }),
            };
        }
        if raw == 0.0 {
            return SensorEstimate {
                normalized: 0.0,
                distance: f64::INFINITY,
                fault: None,
            };
        }

        let (raw, fault) = if raw > self.model.max_raw_reading {
            (self.model.max_raw_reading, Some(SensorFault::OutOfRange { raw }))
        } else {
            (raw, None)
        };

        let normalized = self.normalize(index, raw);
        let distance = self.model.base_distance(normalized)
            * self.model.compensation_for(self.bearings_deg[index]);

        SensorEstimate {
            normalized,
            distance,
            fault,
        }
    }

    /// Raw reading a sensor would report for an obstacle at `distance`
    pub fn reading_for_distance(&self, index: usize, distance: f64) -> f64 {
        let compensation = self.model.compensation_for(self.bearings_deg[index]);
        self.model.normalized_for(distance / compensation) * self.factors[index]
    }
}

/// One calibrated sensor sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub raw: f64,
    pub normalized: f64,
    /// Estimated distance from the robot centre, infinite when nothing is seen
    pub distance: f64,
    /// Robot-frame bearing in radians
    pub bearing: f64,
    pub detected: bool,
    pub fault: Option<SensorFault>,
}

impl SensorReading {
    pub fn clearance(&self, robot_radius: f64) -> f64 {
        self.distance - robot_radius
    }
}

/// Calibrated view of one tick's proximity scan
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFrame {
    readings: [SensorReading; SENSOR_COUNT],
}

impl SensorFrame {
    pub fn build(
        calibration: &SensorCalibration,
        thresholds: &ProximityThresholds,
        raw: &ProximityScan,
    ) -> Self {
        let readings = std::array::from_fn(|index| {
            let estimate = calibration.estimate_distance(index, raw[index]);
            SensorReading {
                raw: raw[index],
                normalized: estimate.normalized,
                distance: estimate.distance,
                bearing: calibration.bearing(index),
                detected: estimate.distance.is_finite() && estimate.normalized >= thresholds.detect,
                fault: estimate.fault,
            }
        });
        Self { readings }
    }

    pub fn readings(&self) -> &[SensorReading; SENSOR_COUNT] {
        &self.readings
    }

    pub fn reading(&self, index: usize) -> &SensorReading {
        &self.readings[index]
    }

    pub fn obstacle_count(&self) -> usize {
        self.readings.iter().filter(|r| r.detected).count()
    }

    pub fn fault_count(&self) -> usize {
        self.readings.iter().filter(|r| r.fault.is_some()).count()
    }

    /// Sensors whose normalized reading is at or above `threshold`
    pub fn blocked_count(&self, threshold: f64) -> usize {
        self.readings.iter().filter(|r| r.normalized >= threshold).count()
    }

    pub fn max_normalized(&self) -> f64 {
        self.max_normalized_of(&[0, 1, 2, 3, 4, 5, 6])
    }

    pub fn max_frontal_normalized(&self) -> f64 {
        self.max_normalized_of(&FRONTAL)
    }

    pub fn max_corner_normalized(&self) -> f64 {
        self.max_normalized_of(&CORNERS)
    }

    pub fn max_left_normalized(&self) -> f64 {
        self.max_normalized_of(&LEFT_SIDE)
    }

    pub fn max_right_normalized(&self) -> f64 {
        self.max_normalized_of(&RIGHT_SIDE)
    }

    fn max_normalized_of(&self, indices: &[usize]) -> f64 {
        indices
            .iter()
            .map(|&i| self.readings[i].normalized)
            .fold(0.0, f64::max)
    }

    fn min_detected_distance(&self, indices: &[usize]) -> f64 {
        indices
            .iter()
            .map(|&i| &self.readings[i])
            .filter(|r| r.detected)
            .map(|r| r.distance)
            .fold(f64::INFINITY, f64::min)
    }

    /// Closest detected frontal obstacle, infinite when none
    pub fn min_frontal_distance(&self) -> f64 {
        self.min_detected_distance(&FRONTAL)
    }

    pub fn min_frontal_clearance(&self, robot_radius: f64) -> f64 {
        self.min_frontal_distance() - robot_radius
    }

    pub fn min_lateral_clearance(&self, robot_radius: f64) -> f64 {
        self.min_detected_distance(&LATERAL) - robot_radius
    }

    /// World-frame points of detected obstacles
    pub fn obstacle_points(&self, pose: &Pose2D) -> Vec<[f64; 2]> {
        self.readings
            .iter()
            .filter(|r| r.detected)
            .map(|r| {
                let direction = pose.theta + r.bearing;
                [
                    pose.x + r.distance * direction.cos(),
                    pose.y + r.distance * direction.sin(),
                ]
            })
            .collect()
    }

    /// Robot-frame bearing with the best mix of free space and goal alignment
    ///
    /// Each sensor scores `0.7·freedom − 0.3·|bearing − goal|/π`, where
    /// freedom falls linearly from 1 at the detect threshold to 0 at the
    /// emergency threshold. Returns the winning bearing and its freedom.
    pub fn best_free_bearing(
        &self,
        goal_bearing: f64,
        thresholds: &ProximityThresholds,
    ) -> (f64, f64) {
        let span = thresholds.emergency - thresholds.detect;
        let goal_bearing = wrap_angle(goal_bearing);

        let mut best = (0.0, 1.0);
        let mut best_score = f64::NEG_INFINITY;
        for reading in self.readings.iter() {
            let freedom = if reading.normalized < thresholds.detect {
                1.0
            } else {
                (1.0 - (reading.normalized - thresholds.detect) / span).clamp(0.0, 1.0)
            };
            let misalignment = wrap_angle(reading.bearing - goal_bearing).abs();
            let score = 0.7 * freedom - 0.3 * misalignment / PI;
            if score > best_score {
                best_score = score;
                best = (reading.bearing, freedom);
            }
        }
        best
    }
}
