pub mod overlay;
pub mod snapshot;

use std::time::Duration;

use crate::{
    config::Config,
    exit_pose::{ExitPoseOutcome, ExitPoseTimer},
    histogram::DepthHistogram,
    lifecycle::{LifecycleEvent, UserLifecycleTracker},
    motor::MotorLink,
    sampler::JointSampler,
    sensor::{FrameSource, SensorError},
    steering::{SteeringCommand, SteeringStrategy, build_strategy},
    types::{SkeletonState, TrackerFrame, UserId},
};

use overlay::OverlayOptions;
use snapshot::SnapshotWriter;

/// What happened while processing one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub events: Vec<(UserId, LifecycleEvent)>,
    /// Users that appeared this frame and need tracking started.
    pub new_users: Vec<UserId>,
    /// Directives sent to the motors for the driver, if any.
    pub command: Option<SteeringCommand>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Continue(FrameReport),
    /// The exit pose was held long enough. The report covers the users
    /// processed before the countdown completed.
    Exit(FrameReport),
}

impl FrameOutcome {
    pub fn report(&self) -> &FrameReport {
        match self {
            FrameOutcome::Continue(report) | FrameOutcome::Exit(report) => report,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    ExitPose,
    EndOfStream,
}

/// Owns all per-frame decision state: depth normalization, user lifecycle,
/// the driver's posture and the exit countdown.
pub struct FrameProcessor<M: MotorLink> {
    histogram: DepthHistogram,
    lifecycle: UserLifecycleTracker,
    sampler: JointSampler,
    strategy: Box<dyn SteeringStrategy>,
    exit_pose: ExitPoseTimer,
    motor: M,
    driver: UserId,
    /// Whether the driver steered on the previous frame.
    driving: bool,
}

impl<M: MotorLink> FrameProcessor<M> {
    pub fn new(config: &Config, motor: M) -> Self {
        let strategy = build_strategy(&config.steering);
        log::info!(
            "steering with the {} strategy, driver is user #{}",
            strategy.name(),
            config.tracking.driver_user_id
        );
        Self {
            histogram: DepthHistogram::default(),
            lifecycle: UserLifecycleTracker::new(config.tracking.max_users),
            sampler: JointSampler::new(config.tracking.confidence_threshold),
            strategy,
            exit_pose: ExitPoseTimer::new(Duration::from_millis(config.exit_pose.hold_ms)),
            motor,
            driver: config.tracking.driver_user_id,
            driving: false,
        }
    }

    pub fn histogram(&self) -> &DepthHistogram {
        &self.histogram
    }

    pub fn lifecycle(&self) -> &UserLifecycleTracker {
        &self.lifecycle
    }

    pub fn exit_pose(&self) -> &ExitPoseTimer {
        &self.exit_pose
    }

    #[cfg(test)]
    pub fn motor(&self) -> &M {
        &self.motor
    }

    pub fn process_frame(&mut self, frame: &TrackerFrame) -> FrameOutcome {
        let mut report = FrameReport {
            frame_index: frame.frame_index,
            ..Default::default()
        };

        if let Some(depth) = &frame.depth {
            self.histogram.update(&depth.pixels);
        }

        let mut steered = false;
        for user in &frame.users {
            let events = self.lifecycle.update(user, frame.timestamp);
            report
                .events
                .extend(events.into_iter().map(|event| (user.id, event)));

            if user.is_new {
                report.new_users.push(user.id);
                if user.id == self.driver {
                    self.sampler.reset();
                }
            } else if user.is_lost {
                if user.id == self.driver {
                    self.sampler.reset();
                }
                if self.exit_pose.owner() == Some(user.id) {
                    log::info!("user #{}: lost while holding the exit pose", user.id);
                    self.exit_pose.reset();
                }
                continue;
            } else if user.id == self.driver
                && user.skeleton.state == SkeletonState::Tracked
                && self.motor.is_open()
            {
                let table = self.sampler.sample(&user.skeleton, frame.frame_index);
                let command = self.strategy.decide(table);
                self.send(command);
                report.command = Some(command);
                steered = true;
            }

            let outcome = self
                .exit_pose
                .evaluate(user.id, user.crossed_hands, frame.timestamp);
            if outcome == ExitPoseOutcome::Exit {
                self.release_driver(steered, &mut report);
                return FrameOutcome::Exit(report);
            }
        }

        self.release_driver(steered, &mut report);
        FrameOutcome::Continue(report)
    }

    /// Brakes once when the driver stops qualifying, so the robot never keeps
    /// the last motion after tracking is gone.
    fn release_driver(&mut self, steered: bool, report: &mut FrameReport) {
        if self.driving && !steered && self.motor.is_open() {
            log::info!("user #{}: no longer steering, braking", self.driver);
            let command = self.strategy.brake();
            self.send(command);
            report.command = Some(command);
        }
        self.driving = steered;
    }

    fn send(&mut self, command: SteeringCommand) {
        for (port, directive) in command.directives() {
            if let Err(err) = self.motor.apply(port, directive) {
                log::warn!("motor {} rejected {directive:?}: {err}", port.label());
            }
        }
    }

    /// Stops the motors and releases the link. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Err(err) = self.motor.shutdown() {
            log::warn!("failed to shut down motor link: {err}");
        }
    }
}

/// Drives `processor` from `source` until the exit pose completes or the
/// stream ends. Frames the sensor fails to deliver are skipped.
pub fn run<S: FrameSource, M: MotorLink>(
    source: &mut S,
    processor: &mut FrameProcessor<M>,
    overlay_options: &OverlayOptions,
    snapshots: Option<&SnapshotWriter>,
) -> Result<ExitReason, SensorError> {
    loop {
        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(SensorError::EndOfStream) => return Ok(ExitReason::EndOfStream),
            Err(err) if err.is_terminal() => return Err(err),
            Err(err) => {
                log::warn!("skipping frame: {err}");
                continue;
            }
        };

        let outcome = processor.process_frame(&frame);
        let report = outcome.report();
        log::trace!(
            "frame {}: {} lifecycle event(s), command {:?}",
            report.frame_index,
            report.events.len(),
            report.command
        );

        for &user in &report.new_users {
            if let Err(err) = source.start_skeleton_tracking(user) {
                log::warn!("user #{user}: could not start skeleton tracking: {err}");
            }
            if let Err(err) = source.start_pose_detection(user) {
                log::warn!("user #{user}: could not start pose detection: {err}");
            }
        }

        if let Some(writer) = snapshots.filter(|writer| writer.wants(frame.frame_index)) {
            if let Some(image) = overlay::render(
                &frame,
                processor.histogram(),
                processor.lifecycle(),
                processor.exit_pose().message(),
                overlay_options,
            ) {
                writer.submit(image);
            }
        }

        if let FrameOutcome::Exit(_) = outcome {
            return Ok(ExitReason::ExitPose);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        motor::{DryRunLink, MotorDirective, MotorPort},
        sensor::ReplaySource,
        types::{DepthFrame, Joint, JointKind, Point3, PoseState, Skeleton, UserData},
    };

    fn joint(x: f32, y: f32, z: f32) -> Joint {
        Joint {
            position: Point3::new(x, y, z),
            projected: (0.0, 0.0),
            confidence: 1.0,
        }
    }

    fn steering_user(id: UserId) -> UserData {
        let mut skeleton = Skeleton {
            state: SkeletonState::Tracked,
            ..Default::default()
        };
        skeleton.joints.insert(JointKind::RightHand, joint(150.0, 1.0, 0.0));
        skeleton.joints.insert(JointKind::RightShoulder, joint(0.0, 0.0, 0.0));
        skeleton.joints.insert(JointKind::LeftHand, joint(-200.0, -300.0, 0.0));
        skeleton.joints.insert(JointKind::LeftShoulder, joint(-200.0, 0.0, 0.0));
        UserData {
            id,
            is_visible: true,
            skeleton,
            ..Default::default()
        }
    }

    fn frame(frame_index: u64, timestamp: u64, users: Vec<UserData>) -> TrackerFrame {
        TrackerFrame {
            frame_index,
            timestamp,
            users,
            depth: Some(DepthFrame {
                width: 2,
                height: 2,
                pixels: vec![0, 800, 1600, 2400],
                labels: vec![0, 1, 1, 0],
            }),
        }
    }

    fn processor() -> FrameProcessor<DryRunLink> {
        FrameProcessor::new(&Config::default(), DryRunLink::new())
    }

    #[test]
    fn identical_frames_give_identical_decisions() {
        let mut processor = processor();
        let input = frame(7, 1_000, vec![steering_user(1)]);

        let first = processor.process_frame(&input);
        let first_table = processor.histogram().table().to_vec();
        let second = processor.process_frame(&input);

        assert_eq!(first.report().command, second.report().command);
        assert_eq!(processor.histogram().table(), first_table.as_slice());
        assert_eq!(
            second.report().command,
            Some(SteeringCommand::pivot_b_back(40))
        );
    }

    #[test]
    fn only_the_driver_steers() {
        let mut processor = processor();
        let outcome = processor.process_frame(&frame(1, 0, vec![steering_user(2)]));
        assert_eq!(outcome.report().command, None);
        assert_eq!(processor.motor().last_directive(MotorPort::B), None);

        let outcome = processor.process_frame(&frame(2, 0, vec![steering_user(1)]));
        assert!(outcome.report().command.is_some());
        assert_eq!(
            processor.motor().last_directive(MotorPort::B),
            Some(MotorDirective::Reverse(40))
        );
    }

    #[test]
    fn losing_the_driver_brakes_once() {
        let mut processor = processor();
        let mut driver = steering_user(1);
        driver
            .skeleton
            .joints
            .insert(JointKind::RightHand, joint(0.0, 100.0, 0.0));
        let outcome = processor.process_frame(&frame(1, 0, vec![driver]));
        assert_eq!(outcome.report().command, Some(SteeringCommand::forward(40)));

        let lost = UserData {
            id: 1,
            is_lost: true,
            ..Default::default()
        };
        let outcome = processor.process_frame(&frame(2, 100, vec![lost]));
        assert_eq!(outcome.report().command, Some(SteeringCommand::brake_drive()));
        let braked = Some(MotorDirective::Stop { brake: true });
        assert_eq!(processor.motor().last_directive(MotorPort::B), braked);
        assert_eq!(processor.motor().last_directive(MotorPort::C), braked);

        let outcome = processor.process_frame(&frame(3, 200, Vec::new()));
        assert_eq!(outcome.report().command, None);
        assert_eq!(processor.motor().last_directive(MotorPort::B), braked);
    }

    #[test]
    fn driver_leaving_tracked_state_brakes() {
        let mut processor = processor();
        processor.process_frame(&frame(1, 0, vec![steering_user(1)]));

        let mut calibrating = steering_user(1);
        calibrating.skeleton.state = SkeletonState::Calibrating;
        let outcome = processor.process_frame(&frame(2, 100, vec![calibrating]));
        assert_eq!(outcome.report().command, Some(SteeringCommand::brake_drive()));
    }

    #[test]
    fn untracked_driver_does_not_steer() {
        let mut processor = processor();
        let mut user = steering_user(1);
        user.skeleton.state = SkeletonState::Calibrating;
        let outcome = processor.process_frame(&frame(1, 0, vec![user]));
        assert_eq!(outcome.report().command, None);
    }

    #[test]
    fn new_users_are_reported() {
        let mut processor = processor();
        let user = UserData {
            id: 3,
            is_new: true,
            ..Default::default()
        };
        let outcome = processor.process_frame(&frame(1, 0, vec![user]));
        assert_eq!(outcome.report().new_users, vec![3]);
        assert_eq!(outcome.report().events, vec![(3, LifecycleEvent::New)]);
    }

    #[test]
    fn losing_the_owner_cancels_the_countdown() {
        let mut processor = processor();
        let mut user = steering_user(1);
        user.crossed_hands = PoseState {
            entered: true,
            held: true,
            exited: false,
        };
        processor.process_frame(&frame(1, 0, vec![user]));
        assert_eq!(processor.exit_pose().owner(), Some(1));

        let lost = UserData {
            id: 1,
            is_lost: true,
            ..Default::default()
        };
        processor.process_frame(&frame(2, 100, vec![lost]));
        assert_eq!(processor.exit_pose().owner(), None);
    }

    fn line(frame: &TrackerFrame) -> String {
        serde_json::to_string(frame).unwrap()
    }

    #[test]
    fn run_stops_after_exit_pose_is_held() {
        let held = |entered| PoseState {
            entered,
            held: true,
            exited: false,
        };
        let mut frames = Vec::new();
        let script = [
            (1, 0, true),
            (2, 1_000_000, false),
            (3, 2_500_000, false),
            (4, 3_000_000, false),
        ];
        for (index, timestamp, entered) in script {
            let mut user = steering_user(1);
            user.crossed_hands = held(entered);
            frames.push(line(&frame(index, timestamp, vec![user])));
        }
        let mut source = ReplaySource::from_reader(Cursor::new(frames.join("\n")));
        let mut processor = processor();

        let reason = run(&mut source, &mut processor, &OverlayOptions::default(), None).unwrap();
        assert_eq!(reason, ExitReason::ExitPose);
        // Frame 4 is never read.
        assert_eq!(source.read_frame().unwrap().frame_index, 4);
    }

    #[test]
    fn run_skips_bad_lines_and_requests_tracking() {
        let user = UserData {
            id: 2,
            is_new: true,
            ..Default::default()
        };
        let input = format!("garbage\n{}\n", line(&frame(1, 0, vec![user])));
        let mut source = ReplaySource::from_reader(Cursor::new(input));
        let mut processor = processor();

        let reason = run(&mut source, &mut processor, &OverlayOptions::default(), None).unwrap();
        assert_eq!(reason, ExitReason::EndOfStream);
        assert!(source.is_tracking(2));
        assert!(source.is_watching_pose(2));
    }

    #[test]
    fn shutdown_closes_the_link() {
        let mut processor = processor();
        processor.shutdown();
        assert!(!processor.motor().is_open());
        processor.shutdown();
    }
}
