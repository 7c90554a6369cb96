//! End-to-end navigation scenarios against the simulated robot

use approx::assert_relative_eq;
use fieldnav_library::algorithms::gap::{detect_gaps, Gap};
use fieldnav_library::algorithms::repulsive_field::{repel, RepulsionContext};
use fieldnav_library::algorithms::sensor_frame::{SensorCalibration, SensorFrame};
use fieldnav_library::config::NavConfig;
use fieldnav_library::messages::{
    wrap_angle, AbortReason, BumperState, DriveMode, Feedback, MissionPlan, MissionState, Pose2D,
    TickRecord, Waypoint, SENSOR_COUNT,
};
use fieldnav_library::nodes::{ControlLoop, TickInputs};
use sim2d::{MissionRun, MissionRunner, NoiseModel, Obstacle, SimConfig};

fn straight_plan() -> MissionPlan {
    MissionPlan::new(Pose2D::origin(), vec![Waypoint::new(100.0, 0.0)])
}

fn navigating(records: &[TickRecord]) -> impl Iterator<Item = &TickRecord> {
    records.iter().filter(|r| r.mode == DriveMode::Navigate)
}

fn assert_speed_invariants(nav: &NavConfig, run: &MissionRun) {
    let limit = nav.robot.max_wheel_speed + 1e-9;
    for record in &run.records {
        assert!(
            record.command.v_left.abs() <= limit && record.command.v_right.abs() <= limit,
            "tick {} exceeds wheel limit: {:?}",
            record.tick,
            record.command
        );
    }
    for record in navigating(&run.records) {
        assert!(
            record.command.v_linear <= record.speed_ceiling + 1e-9,
            "tick {} above ceiling {}",
            record.tick,
            record.speed_ceiling
        );
        if record.feedback == Feedback::Seeking
            && record.distance_to_goal > record.arrival_tolerance
        {
            let floor = nav.steering.min_wheel_speed(record.distance_to_goal);
            let slower = record.command.slower_wheel();
            assert!(slower >= -1e-9, "tick {} spins a wheel backwards", record.tick);
            assert!(
                slower >= floor - 1e-9,
                "tick {} slower wheel {} below {}",
                record.tick,
                slower,
                floor
            );
        }
    }
}

#[test]
fn test_free_run_reaches_goal_despite_odometry_offset() {
    let nav = NavConfig::default();
    let world = SimConfig {
        odom_origin: Pose2D::new(10.0, -5.0, 0.5),
        ..SimConfig::default()
    };
    let plan = straight_plan();
    let run = MissionRunner::new(nav.clone(), plan.clone(), world)
        .max_ticks(400)
        .run()
        .unwrap();

    assert!(run.report.succeeded(), "ended in {}", run.report.state);
    assert_eq!(run.report.waypoints_reached, 1);
    assert_eq!(run.report.collisions, 0);
    assert!(
        run.final_distance(&plan) <= 5.0,
        "stopped {:.2} cm short",
        run.final_distance(&plan)
    );
    assert!(run
        .records
        .iter()
        .any(|r| r.mode == DriveMode::FineApproach));

    let distances: Vec<f64> = navigating(&run.records).map(|r| r.distance_to_goal).collect();
    assert!(!distances.is_empty());
    for pair in distances.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9, "distance grew: {:?}", pair);
    }
    assert_speed_invariants(&nav, &run);
}

#[test]
fn test_obstacle_ahead_bends_heading() {
    let nav = NavConfig::default();
    let world = SimConfig::default().with_obstacle(Obstacle::circle(50.0, 0.0, 5.0));
    let run = MissionRunner::new(nav.clone(), straight_plan(), world)
        .max_ticks(600)
        .run()
        .unwrap();

    let deviation = navigating(&run.records)
        .filter(|r| r.weight_repulsive > 0.0)
        .map(|r| wrap_angle(r.desired_heading - r.goal_bearing).abs())
        .fold(0.0, f64::max);
    assert!(deviation > 5f64.to_radians(), "max deviation {}", deviation);

    let lateral = run.trajectory.iter().map(|p| p.y.abs()).fold(0.0, f64::max);
    assert!(lateral > 1.0);
    assert_speed_invariants(&nav, &run);
}

#[test]
fn test_cluttered_course_keeps_speed_invariants() {
    let nav = NavConfig::default();
    let world = SimConfig::default()
        .with_obstacle(Obstacle::circle(60.0, 25.0, 6.0))
        .with_obstacle(Obstacle::rect(110.0, -40.0, 125.0, -5.0))
        .with_obstacle(Obstacle::wall([0.0, -60.0], [220.0, -60.0]));
    let plan = MissionPlan::new(
        Pose2D::origin(),
        vec![Waypoint::new(90.0, 0.0), Waypoint::new(180.0, 10.0)],
    );
    let run = MissionRunner::new(nav.clone(), plan, world)
        .max_ticks(1500)
        .run()
        .unwrap();
    assert!(run.records.len() as u64 == run.report.ticks);
    assert_speed_invariants(&nav, &run);
}

#[test]
fn test_surrounded_robot_is_trapped_but_keeps_moving() {
    let nav = NavConfig::default();
    let calibration = SensorCalibration::default();
    let mut proximity = [0.0; SENSOR_COUNT];
    for (i, raw) in proximity.iter_mut().enumerate().take(6).skip(1) {
        *raw = calibration.reading_for_distance(i, 21.0);
    }
    let mut control = ControlLoop::new(nav, straight_plan()).unwrap();
    let output = control
        .step(&TickInputs {
            raw_pose: Pose2D::origin(),
            proximity,
            bumpers: BumperState::released(),
            dt: 0.05,
            halted: false,
        })
        .unwrap();

    assert_eq!(output.record.mode, DriveMode::Navigate);
    assert!(output.record.trapped);
    assert_eq!(output.record.navigable_gaps, 0);
    assert!(output.record.attractive_gain_scale < 1.0);
    assert!(output.command.v_linear >= 4.0 - 1e-9);
    assert_eq!(output.feedback, Feedback::Avoiding);
    assert_eq!(control.report().trap_episodes, 1);
}

#[test]
fn test_repeated_bumper_contact_aborts() {
    let mut control = ControlLoop::new(NavConfig::default(), straight_plan()).unwrap();
    let pressed = TickInputs {
        raw_pose: Pose2D::origin(),
        proximity: [0.0; SENSOR_COUNT],
        bumpers: BumperState::new(true, false),
        dt: 0.05,
        halted: false,
    };

    let mut last = None;
    for _ in 0..3 {
        last = Some(control.step(&pressed).unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.state, MissionState::Aborted(AbortReason::CollisionLimit));
    assert!(last.command.is_stopped());
    assert_eq!(control.collisions(), 3);

    // Terminal: further ticks keep the robot still
    let after = control.step(&pressed).unwrap();
    assert!(after.command.is_stopped());
    assert_eq!(control.collisions(), 3);
}

fn context<'a>(nav: &NavConfig, gaps: &'a [Gap]) -> RepulsionContext<'a> {
    RepulsionContext {
        robot_radius: nav.robot.radius,
        heading: 0.0,
        gain_scale: 1.0,
        gaps,
        gap_scale: nav.gap.repulsion_scale,
    }
}

#[test]
fn test_navigable_gap_weakens_bounding_sensors() {
    let mut nav = NavConfig::default();
    nav.robot.radius = 2.0;
    nav.gap.margin = 5.0;

    let calibration = &nav.sensors;
    let mut raw = [0.0; SENSOR_COUNT];
    raw[2] = 150.0 * calibration.factors[2];
    raw[4] = 150.0 * calibration.factors[4];
    let frame = SensorFrame::build(calibration, &nav.thresholds, &raw);

    let gaps = detect_gaps(&frame, &nav.gap, nav.robot.diameter(), 0.0);
    assert_eq!(gaps.len(), 1);
    assert!(gaps[0].navigable, "gap width {}", gaps[0].width);
    assert!(gaps[0].bounds(2) && gaps[0].bounds(4));

    let plain = repel(&nav.repulsive, &nav.thresholds, &frame, &context(&nav, &[]));
    let weakened = repel(&nav.repulsive, &nav.thresholds, &frame, &context(&nav, &gaps));

    for i in [2, 4] {
        assert!(plain.contributions[i].magnitude() > 0.0);
        assert_relative_eq!(
            weakened.contributions[i].magnitude(),
            0.3 * plain.contributions[i].magnitude(),
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_seeded_noise_runs_are_identical() {
    let world = SimConfig {
        proximity_noise: NoiseModel::with_std_dev(3.0),
        wheel_slip: NoiseModel::with_std_dev(0.02),
        seed: 11,
        ..SimConfig::default()
    }
    .with_obstacle(Obstacle::circle(60.0, 20.0, 8.0));

    let run = || {
        MissionRunner::new(NavConfig::default(), straight_plan(), world.clone())
            .max_ticks(300)
            .run()
            .unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.report, b.report);
    assert_eq!(a.records, b.records);
    assert_eq!(a.trajectory, b.trajectory);
}

#[test]
fn test_link_loss_aborts_with_hardware_fault() {
    let run = MissionRunner::new(NavConfig::default(), straight_plan(), SimConfig::default())
        .max_ticks(400)
        .fail_transport_after(Some(10))
        .run()
        .unwrap();
    assert_eq!(
        run.report.state,
        MissionState::Aborted(AbortReason::HardwareFault)
    );
    assert_eq!(run.report.ticks, 10);
    assert_eq!(run.records.len(), 10);
}

#[test]
fn test_persistent_safety_halt_aborts() {
    let mut nav = NavConfig::default();
    nav.mission.halt_abort_ticks = Some(20);
    let world = SimConfig::default().with_obstacle(Obstacle::circle(0.0, 300.0, 5.0));
    let run = MissionRunner::new(nav, straight_plan(), world)
        .max_ticks(400)
        .halt_below_clearance(Some(1000.0))
        .run()
        .unwrap();

    assert_eq!(run.report.state, MissionState::Aborted(AbortReason::SafetyHalt));
    assert_eq!(run.report.ticks, 21);
    let (last, halted) = run.records.split_last().unwrap();
    assert!(halted.iter().all(|r| r.halted && r.command.is_stopped()));
    assert!(last.command.is_stopped());
    assert_eq!(*run.trajectory.last().unwrap(), Pose2D::origin());
}

#[test]
fn test_demo_files_load() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../demos");
    let nav = NavConfig::load(&demos.join("nav.yaml")).unwrap();
    assert_eq!(nav.mission.settle_ticks, 10);
    let plan = MissionPlan::load(&demos.join("mission.yaml")).unwrap();
    assert_eq!(plan.waypoints.len(), 4);
    let world: SimConfig = fieldnav_core::params::load(&demos.join("world.yaml")).unwrap();
    assert_eq!(world.obstacles.len(), 6);
    assert!(world.proximity_noise.enabled);
}
