use super::{Deadband, Joints, SteeringCommand, SteeringStrategy};
use crate::{
    sampler::{PositionTable, StalePolicy},
    types::JointKind,
};

/// Push one hand towards the sensor to drive, reach sideways between hip
/// and shoulder height to pivot.
///
/// Needs torso and hip joints on top of the arms, so it falls back to
/// braking more often than [`super::SimpleSteering`] under occlusion.
pub struct DepthSteering {
    deadband: Deadband,
    speed: u8,
    policy: StalePolicy,
}

impl DepthSteering {
    pub fn new(deadband: Deadband, speed: u8, policy: StalePolicy) -> Self {
        Self {
            deadband,
            speed,
            policy,
        }
    }

    fn right_hand_pushed(&self, joints: &Joints) -> Option<SteeringCommand> {
        let left = joints.get(JointKind::LeftHand)?;
        let right = joints.get(JointKind::RightHand)?;
        let torso = joints.get(JointKind::Torso)?;
        (left.z > right.z + self.deadband.x && right.y > torso.y + self.deadband.y)
            .then(|| SteeringCommand::forward(self.speed))
    }

    fn left_hand_pushed(&self, joints: &Joints) -> Option<SteeringCommand> {
        let left = joints.get(JointKind::LeftHand)?;
        let right = joints.get(JointKind::RightHand)?;
        let torso = joints.get(JointKind::Torso)?;
        (right.z > left.z + self.deadband.x && left.y > torso.y + self.deadband.y)
            .then(|| SteeringCommand::backward(self.speed))
    }

    fn right_hand_out(&self, joints: &Joints) -> Option<SteeringCommand> {
        let hand = joints.get(JointKind::RightHand)?;
        let shoulder = joints.get(JointKind::RightShoulder)?;
        let hip = joints.get(JointKind::LeftHip)?;
        (hand.x > shoulder.x + self.deadband.x
            && hand.y < shoulder.y - self.deadband.y
            && hand.y > hip.y + self.deadband.y)
            .then(|| SteeringCommand::pivot_b_back(self.speed))
    }

    fn left_hand_out(&self, joints: &Joints) -> Option<SteeringCommand> {
        let hand = joints.get(JointKind::LeftHand)?;
        let shoulder = joints.get(JointKind::LeftShoulder)?;
        let hip = joints.get(JointKind::LeftHip)?;
        (hand.x < shoulder.x - self.deadband.x
            && hand.y < shoulder.y - self.deadband.y
            && hand.y > hip.y + self.deadband.y)
            .then(|| SteeringCommand::pivot_c_back(self.speed))
    }
}

impl SteeringStrategy for DepthSteering {
    fn name(&self) -> &'static str {
        "depth"
    }

    fn decide(&self, table: &PositionTable) -> SteeringCommand {
        let joints = Joints::new(table, self.policy);
        self.right_hand_pushed(&joints)
            .or_else(|| self.left_hand_pushed(&joints))
            .or_else(|| self.right_hand_out(&joints))
            .or_else(|| self.left_hand_out(&joints))
            .unwrap_or_else(SteeringCommand::brake_drive)
    }
}
