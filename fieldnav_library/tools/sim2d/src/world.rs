//! World geometry and robot kinematics for sim2d
//!
//! Obstacles are circles, axis-aligned rectangles and wall segments. The
//! robot is a disc driven by differential kinematics; motion that would
//! overlap an obstacle is cut short at the point of contact.

use crate::sensors::NoiseModel;
use fieldnav_library::algorithms::differential_drive::{DifferentialDrive, RobotConfig};
use fieldnav_library::algorithms::sensor_frame::SensorCalibration;
use fieldnav_library::messages::{wrap_angle, BumperState, Pose2D, ProximityScan, SENSOR_COUNT};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

type Point = [f64; 2];

fn sub(a: Point, b: Point) -> Point {
    [a[0] - b[0], a[1] - b[1]]
}

fn dot(a: Point, b: Point) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

fn cross(a: Point, b: Point) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

fn norm(a: Point) -> f64 {
    a[0].hypot(a[1])
}

fn ray_segment(origin: Point, dir: Point, a: Point, b: Point) -> Option<f64> {
    let edge = sub(b, a);
    let denom = cross(dir, edge);
    if denom.abs() < 1e-12 {
        return None;
    }
    let w = sub(a, origin);
    let t = cross(w, edge) / denom;
    let s = cross(w, dir) / denom;
    (t >= 0.0 && (0.0..=1.0).contains(&s)).then_some(t)
}

fn closest_on_segment(p: Point, a: Point, b: Point) -> Point {
    let edge = sub(b, a);
    let len2 = dot(edge, edge);
    if len2 == 0.0 {
        return a;
    }
    let s = (dot(sub(p, a), edge) / len2).clamp(0.0, 1.0);
    [a[0] + s * edge[0], a[1] + s * edge[1]]
}

/// Static obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Obstacle {
    Circle { center: Point, radius: f64 },
    Rect { min: Point, max: Point },
    Segment { from: Point, to: Point },
}

impl Obstacle {
    pub fn circle(x: f64, y: f64, radius: f64) -> Self {
        Obstacle::Circle {
            center: [x, y],
            radius,
        }
    }

    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Obstacle::Rect {
            min: [min_x.min(max_x), min_y.min(max_y)],
            max: [min_x.max(max_x), min_y.max(max_y)],
        }
    }

    pub fn wall(from: Point, to: Point) -> Self {
        Obstacle::Segment { from, to }
    }

    fn corners(min: Point, max: Point) -> [Point; 4] {
        [min, [max[0], min[1]], max, [min[0], max[1]]]
    }

    /// Distance along a unit ray to the first surface hit
    pub fn ray_hit(&self, origin: Point, dir: Point) -> Option<f64> {
        match *self {
            Obstacle::Circle { center, radius } => {
                let oc = sub(origin, center);
                let c = dot(oc, oc) - radius * radius;
                if c <= 0.0 {
                    return Some(0.0);
                }
                let b = dot(oc, dir);
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let t = -b - disc.sqrt();
                (t >= 0.0).then_some(t)
            }
            Obstacle::Rect { min, max } => {
                if (min[0]..=max[0]).contains(&origin[0]) && (min[1]..=max[1]).contains(&origin[1])
                {
                    return Some(0.0);
                }
                let c = Self::corners(min, max);
                (0..4)
                    .filter_map(|i| ray_segment(origin, dir, c[i], c[(i + 1) % 4]))
                    .reduce(f64::min)
            }
            Obstacle::Segment { from, to } => ray_segment(origin, dir, from, to),
        }
    }

    /// Nearest point of the obstacle, `p` itself when inside
    pub fn closest_point(&self, p: Point) -> Point {
        match *self {
            Obstacle::Circle { center, radius } => {
                let d = sub(p, center);
                let dist = norm(d);
                if dist <= radius {
                    p
                } else {
                    [center[0] + d[0] * radius / dist, center[1] + d[1] * radius / dist]
                }
            }
            Obstacle::Rect { min, max } => [p[0].clamp(min[0], max[0]), p[1].clamp(min[1], max[1])],
            Obstacle::Segment { from, to } => closest_on_segment(p, from, to),
        }
    }

    pub fn distance_to(&self, p: Point) -> f64 {
        norm(sub(self.closest_point(p), p))
    }
}

/// World description loaded from a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// True starting pose in the world frame
    pub start: Pose2D,
    /// Pose the odometry reports at start
    pub odom_origin: Pose2D,
    pub obstacles: Vec<Obstacle>,
    /// Additive noise on raw proximity intensities
    pub proximity_noise: NoiseModel,
    /// Fractional wheel slip, drives odometry drift
    pub wheel_slip: NoiseModel,
    pub seed: u64,
    /// Contact distance beyond the robot radius that closes a bumper (cm)
    pub bumper_margin: f64,
    /// Total angular width covered by the bumpers (degrees)
    pub bumper_arc_deg: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start: Pose2D::origin(),
            odom_origin: Pose2D::origin(),
            obstacles: Vec::new(),
            proximity_noise: NoiseModel::default(),
            wheel_slip: NoiseModel::default(),
            seed: 42,
            bumper_margin: 0.5,
            bumper_arc_deg: 180.0,
        }
    }
}

impl SimConfig {
    pub fn with_obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }
}

/// Simulated robot and world state
#[derive(Debug, Clone)]
pub struct SimWorld {
    config: SimConfig,
    calibration: SensorCalibration,
    drive: DifferentialDrive,
    radius: f64,
    pose: Pose2D,
    odom: Pose2D,
    rng: StdRng,
    time: f64,
    steps: u64,
    contacts: u64,
    closest_approach: f64,
    trajectory: Vec<Pose2D>,
}

impl SimWorld {
    pub fn new(config: SimConfig, robot: &RobotConfig, calibration: SensorCalibration) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let mut world = Self {
            calibration,
            drive: robot.drive(),
            radius: robot.radius,
            pose: config.start,
            odom: config.odom_origin,
            rng,
            time: 0.0,
            steps: 0,
            contacts: 0,
            closest_approach: f64::INFINITY,
            trajectory: vec![config.start],
            config,
        };
        world.closest_approach = world.clearance_at(&world.pose);
        world
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// True pose in the world frame
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Pose as the drive's odometry reports it
    pub fn odometry(&self) -> Pose2D {
        self.odom
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Steps on which motion was cut short by an obstacle
    pub fn contacts(&self) -> u64 {
        self.contacts
    }

    pub fn trajectory(&self) -> &[Pose2D] {
        &self.trajectory
    }

    /// Smallest clearance seen over the whole run
    pub fn closest_approach(&self) -> f64 {
        self.closest_approach
    }

    /// Gap between the robot body and the nearest obstacle at `pose`
    pub fn clearance_at(&self, pose: &Pose2D) -> f64 {
        self.config
            .obstacles
            .iter()
            .map(|o| o.distance_to([pose.x, pose.y]))
            .fold(f64::INFINITY, f64::min)
            - self.radius
    }

    pub fn clearance(&self) -> f64 {
        self.clearance_at(&self.pose)
    }

    /// Advance the world by `dt` with the given wheel commands
    pub fn step(&mut self, left: f64, right: f64, dt: f64) {
        let (left, right) = self.drive.saturate_wheel_speeds(left, right);
        let true_left = left * (1.0 + self.config.wheel_slip.sample(&mut self.rng));
        let true_right = right * (1.0 + self.config.wheel_slip.sample(&mut self.rng));

        let current = self.clearance_at(&self.pose);
        let blocked = |world: &Self, fraction: f64| {
            let next = world
                .drive
                .update_odometry(&world.pose, true_left, true_right, dt * fraction);
            let clearance = world.clearance_at(&next);
            clearance < 0.0 && clearance < current
        };

        let fraction = if blocked(self, 1.0) {
            self.contacts += 1;
            let (mut lo, mut hi) = (0.0, 1.0);
            for _ in 0..16 {
                let mid = 0.5 * (lo + hi);
                if blocked(self, mid) {
                    hi = mid;
                } else {
                    lo = mid;
                }
            }
            lo
        } else {
            1.0
        };

        self.pose = self
            .drive
            .update_odometry(&self.pose, true_left, true_right, dt * fraction);
        self.odom = self.drive.update_odometry(&self.odom, left, right, dt * fraction);
        self.time += dt;
        self.steps += 1;
        self.closest_approach = self.closest_approach.min(self.clearance());
        self.trajectory.push(self.pose);
    }

    /// Raw intensities the proximity ring would report
    pub fn proximity(&mut self) -> ProximityScan {
        let origin = [self.pose.x, self.pose.y];
        let max_range = self.calibration.model.max_distance;
        let mut scan = [0.0; SENSOR_COUNT];
        for (index, raw) in scan.iter_mut().enumerate() {
            let angle = self.pose.theta + self.calibration.bearing(index);
            let dir = [angle.cos(), angle.sin()];
            let hit = self
                .config
                .obstacles
                .iter()
                .filter_map(|o| o.ray_hit(origin, dir))
                .fold(f64::INFINITY, f64::min);
            let clean = if hit < max_range {
                self.calibration.reading_for_distance(index, hit)
            } else {
                0.0
            };
            *raw = (clean + self.config.proximity_noise.sample(&mut self.rng)).max(0.0);
        }
        scan
    }

    /// Bumper switches closed by obstacles in contact ahead
    pub fn bumpers(&self) -> BumperState {
        let half_arc = (self.config.bumper_arc_deg / 2.0).to_radians();
        let reach = self.radius + self.config.bumper_margin;
        let p = [self.pose.x, self.pose.y];
        let mut state = BumperState::released();
        for obstacle in &self.config.obstacles {
            let q = obstacle.closest_point(p);
            let d = sub(q, p);
            if norm(d) > reach {
                continue;
            }
            let angle = wrap_angle(d[1].atan2(d[0]) - self.pose.theta);
            if angle.abs() > half_arc {
                continue;
            }
            state.left |= angle >= -0.1;
            state.right |= angle <= 0.1;
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn world(config: SimConfig) -> SimWorld {
        SimWorld::new(config, &RobotConfig::default(), SensorCalibration::default())
    }

    #[test]
    fn test_ray_hits() {
        let circle = Obstacle::circle(50.0, 0.0, 5.0);
        assert_relative_eq!(circle.ray_hit([0.0, 0.0], [1.0, 0.0]).unwrap(), 45.0, epsilon = 1e-9);
        assert!(circle.ray_hit([0.0, 0.0], [-1.0, 0.0]).is_none());

        let rect = Obstacle::rect(10.0, -5.0, 20.0, 5.0);
        assert_relative_eq!(rect.ray_hit([0.0, 0.0], [1.0, 0.0]).unwrap(), 10.0, epsilon = 1e-9);

        let wall = Obstacle::wall([0.0, 30.0], [10.0, 30.0]);
        assert_relative_eq!(wall.ray_hit([5.0, 0.0], [0.0, 1.0]).unwrap(), 30.0, epsilon = 1e-9);
        assert!(wall.ray_hit([50.0, 0.0], [0.0, 1.0]).is_none());
    }

    #[test]
    fn test_closest_points() {
        let rect = Obstacle::rect(10.0, -5.0, 20.0, 5.0);
        assert_eq!(rect.closest_point([0.0, 0.0]), [10.0, 0.0]);
        assert_eq!(rect.distance_to([15.0, 0.0]), 0.0);
        let wall = Obstacle::wall([0.0, 0.0], [10.0, 0.0]);
        assert_relative_eq!(wall.distance_to([20.0, 0.0]), 10.0);
    }

    #[test]
    fn test_free_motion_matches_odometry() {
        let config = SimConfig {
            odom_origin: Pose2D::new(10.0, 10.0, 0.0),
            ..SimConfig::default()
        };
        let mut w = world(config);
        for _ in 0..20 {
            w.step(10.0, 10.0, 0.05);
        }
        assert_relative_eq!(w.pose().x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(w.odometry().x, 20.0, epsilon = 1e-9);
        assert_eq!(w.trajectory().len(), 21);
    }

    #[test]
    fn test_contact_stops_motion_and_closes_bumpers() {
        let config = SimConfig::default().with_obstacle(Obstacle::circle(30.0, 0.0, 5.0));
        let mut w = world(config);
        for _ in 0..100 {
            w.step(20.0, 20.0, 0.05);
        }
        assert!(w.contacts() > 0);
        assert!(w.clearance() >= 0.0);
        assert!(w.clearance() < 0.5);
        assert_eq!(w.bumpers(), BumperState::new(true, true));

        // Reversing out is never blocked
        w.step(-10.0, -10.0, 0.05);
        assert!(w.clearance() > 0.4);
    }

    #[test]
    fn test_proximity_decodes_to_distance() {
        let calibration = SensorCalibration::default();
        let config = SimConfig::default().with_obstacle(Obstacle::wall([40.0, -50.0], [40.0, 50.0]));
        let mut w = world(config);
        let scan = w.proximity();
        // Sensor 3 looks 3 degrees right of straight ahead
        let expected = 40.0 / (-3.0f64).to_radians().cos();
        assert_relative_eq!(scan[3], calibration.reading_for_distance(3, expected), epsilon = 1e-9);
        assert_eq!(scan[0], 0.0);
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let config = SimConfig {
            wheel_slip: NoiseModel::with_std_dev(0.05),
            seed: 7,
            ..SimConfig::default()
        };
        let mut a = world(config.clone());
        let mut b = world(config);
        for _ in 0..50 {
            a.step(15.0, 14.0, 0.05);
            b.step(15.0, 14.0, 0.05);
        }
        assert_eq!(a.pose(), b.pose());
        assert_ne!(a.pose(), a.odometry());
    }
}
