use super::{Deadband, Joints, SteeringCommand, SteeringStrategy};
use crate::{
    sampler::{PositionTable, StalePolicy},
    types::JointKind,
};

/// Raise the right hand to drive (and point sideways to turn), raise the
/// left hand to back up.
pub struct SimpleSteering {
    deadband: Deadband,
    speed: u8,
    policy: StalePolicy,
}

impl SimpleSteering {
    pub fn new(deadband: Deadband, speed: u8, policy: StalePolicy) -> Self {
        Self {
            deadband,
            speed,
            policy,
        }
    }

    fn right_hand_raised(&self, joints: &Joints) -> Option<SteeringCommand> {
        let hand = joints.get(JointKind::RightHand)?;
        let shoulder = joints.get(JointKind::RightShoulder)?;
        if hand.y <= shoulder.y {
            return None;
        }

        Some(if hand.x > shoulder.x + self.deadband.x {
            SteeringCommand::pivot_b_back(self.speed)
        } else if hand.x < shoulder.x - self.deadband.x {
            SteeringCommand::pivot_c_back(self.speed)
        } else {
            SteeringCommand::forward(self.speed)
        })
    }

    fn left_hand_raised(&self, joints: &Joints) -> Option<SteeringCommand> {
        let hand = joints.get(JointKind::LeftHand)?;
        let shoulder = joints.get(JointKind::LeftShoulder)?;
        (hand.y > shoulder.y).then(|| SteeringCommand::backward(self.speed))
    }
}

impl SteeringStrategy for SimpleSteering {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn decide(&self, table: &PositionTable) -> SteeringCommand {
        let joints = Joints::new(table, self.policy);
        self.right_hand_raised(&joints)
            .or_else(|| self.left_hand_raised(&joints))
            .unwrap_or_else(SteeringCommand::brake_drive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        motor::MotorDirective,
        sampler::JointObservation,
        steering::testing::table,
        types::Point3,
    };

    fn strategy() -> SimpleSteering {
        SimpleSteering::new(Deadband { x: 100.0, y: 50.0 }, 40, StalePolicy::Reject)
    }

    #[test]
    fn hand_right_of_deadband_pivots() {
        let table = table(&[
            (JointKind::RightHand, (150.0, 1.0, 0.0)),
            (JointKind::RightShoulder, (0.0, 0.0, 0.0)),
        ]);
        let command = strategy().decide(&table);
        assert_eq!(command.b, Some(MotorDirective::Reverse(40)));
        assert_eq!(command.c, Some(MotorDirective::Forward(40)));
        assert_eq!(command.a, None);
    }

    #[test]
    fn hand_left_of_deadband_pivots_the_other_way() {
        let table = table(&[
            (JointKind::RightHand, (-101.0, 300.0, 0.0)),
            (JointKind::RightShoulder, (0.0, 200.0, 0.0)),
        ]);
        assert_eq!(strategy().decide(&table), SteeringCommand::pivot_c_back(40));
    }

    #[test]
    fn hand_within_deadband_drives_forward() {
        let table = table(&[
            (JointKind::RightHand, (100.0, 300.0, 0.0)),
            (JointKind::RightShoulder, (0.0, 200.0, 0.0)),
        ]);
        assert_eq!(strategy().decide(&table), SteeringCommand::forward(40));
    }

    #[test]
    fn right_hand_wins_over_left_hand() {
        let table = table(&[
            (JointKind::RightHand, (0.0, 300.0, 0.0)),
            (JointKind::RightShoulder, (0.0, 200.0, 0.0)),
            (JointKind::LeftHand, (0.0, 300.0, 0.0)),
            (JointKind::LeftShoulder, (0.0, 200.0, 0.0)),
        ]);
        assert_eq!(strategy().decide(&table), SteeringCommand::forward(40));
    }

    #[test]
    fn left_hand_raised_backs_up() {
        let table = table(&[
            (JointKind::RightHand, (0.0, 100.0, 0.0)),
            (JointKind::RightShoulder, (0.0, 200.0, 0.0)),
            (JointKind::LeftHand, (0.0, 300.0, 0.0)),
            (JointKind::LeftShoulder, (0.0, 200.0, 0.0)),
        ]);
        assert_eq!(strategy().decide(&table), SteeringCommand::backward(40));
    }

    #[test]
    fn hands_down_brakes() {
        let table = table(&[
            (JointKind::RightHand, (150.0, 0.0, 0.0)),
            (JointKind::RightShoulder, (0.0, 0.0, 0.0)),
            (JointKind::LeftHand, (0.0, -20.0, 0.0)),
            (JointKind::LeftShoulder, (0.0, 0.0, 0.0)),
        ]);
        let command = strategy().decide(&table);
        assert_eq!(command, SteeringCommand::brake_drive());
        assert_eq!(command.b, Some(MotorDirective::Stop { brake: true }));
        assert_eq!(command.c, Some(MotorDirective::Stop { brake: true }));
    }

    #[test]
    fn missing_shoulder_never_reads_as_origin() {
        // With the shoulder at a defaulted (0, 0, 0) this would pivot.
        let table = table(&[(JointKind::RightHand, (150.0, 10.0, 0.0))]);
        assert_eq!(strategy().decide(&table), SteeringCommand::brake_drive());
    }

    #[test]
    fn stale_joints_follow_policy() {
        let mut table = table(&[(JointKind::RightShoulder, (0.0, 200.0, 0.0))]);
        table.set(
            JointKind::RightHand,
            JointObservation::Stale {
                position: Point3::new(0.0, 300.0, 0.0),
                frame: 0,
            },
        );

        assert_eq!(strategy().decide(&table), SteeringCommand::brake_drive());

        let lenient = SimpleSteering::new(Deadband::default(), 40, StalePolicy::MaxAge(1));
        assert_eq!(lenient.decide(&table), SteeringCommand::forward(40));
    }
}
