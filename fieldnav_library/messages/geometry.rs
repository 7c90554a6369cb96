use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Mul};

/// Wrap an angle into (-π, π]
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut wrapped = angle % (2.0 * PI);
    if wrapped <= -PI {
        wrapped += 2.0 * PI;
    } else if wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    wrapped
}

/// Planar pose in centimetres and radians
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    /// Euclidean distance to a point
    pub fn distance_to(&self, target: &Waypoint) -> f64 {
        (target.x - self.x).hypot(target.y - self.y)
    }

    /// World-frame bearing from this pose to a point
    pub fn bearing_to(&self, target: &Waypoint) -> f64 {
        (target.y - self.y).atan2(target.x - self.x)
    }

    /// Travel distance between two poses, ignoring heading
    pub fn planar_distance(&self, other: &Pose2D) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.theta.is_finite()
    }
}

/// Navigation target
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Waypoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// 2D force vector, tick-scoped
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Force2D {
    pub x: f64,
    pub y: f64,
}

impl Force2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_polar(magnitude: f64, angle: f64) -> Self {
        Self {
            x: magnitude * angle.cos(),
            y: magnitude * angle.sin(),
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Force2D {
    type Output = Force2D;

    fn add(self, rhs: Force2D) -> Force2D {
        Force2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Force2D {
    fn add_assign(&mut self, rhs: Force2D) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Mul<f64> for Force2D {
    type Output = Force2D;

    fn mul(self, rhs: f64) -> Force2D {
        Force2D::new(self.x * rhs, self.y * rhs)
    }
}
