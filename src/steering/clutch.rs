use super::{Deadband, Joints, SteeringCommand, SteeringStrategy};
use crate::{
    motor::MotorDirective,
    sampler::{PositionTable, StalePolicy},
    types::JointKind,
};

/// Raised hands work the auxiliary (clutch) motor on port A; hands held out
/// past the hips drive the wheels.
///
/// A raised-hand rule only commands port A, so the wheels keep whatever
/// they were last told until a wheel rule or the fallback brake runs.
pub struct ClutchSteering {
    deadband: Deadband,
    speed: u8,
    hip_offset: f32,
    policy: StalePolicy,
}

impl ClutchSteering {
    pub fn new(deadband: Deadband, speed: u8, hip_offset: f32, policy: StalePolicy) -> Self {
        Self {
            deadband,
            speed,
            hip_offset,
            policy,
        }
    }

    fn right_hand_raised(&self, joints: &Joints) -> Option<SteeringCommand> {
        let hand = joints.get(JointKind::RightHand)?;
        let shoulder = joints.get(JointKind::RightShoulder)?;
        (hand.y > shoulder.y)
            .then(|| SteeringCommand::auxiliary(MotorDirective::Forward(self.speed)))
    }

    fn left_hand_raised(&self, joints: &Joints) -> Option<SteeringCommand> {
        let hand = joints.get(JointKind::LeftHand)?;
        let shoulder = joints.get(JointKind::LeftShoulder)?;
        (hand.y > shoulder.y - self.deadband.x)
            .then(|| SteeringCommand::auxiliary(MotorDirective::Reverse(self.speed)))
    }

    fn right_hand_out(&self, joints: &Joints) -> Option<SteeringCommand> {
        let hand = joints.get(JointKind::RightHand)?;
        let hip = joints.get(JointKind::RightHip)?;
        (hand.x > hip.x + self.hip_offset).then(|| SteeringCommand::forward(self.speed))
    }

    fn left_hand_out(&self, joints: &Joints) -> Option<SteeringCommand> {
        let hand = joints.get(JointKind::LeftHand)?;
        let hip = joints.get(JointKind::LeftHip)?;
        (hand.x + self.hip_offset < hip.x).then(|| SteeringCommand::backward(self.speed))
    }
}

impl SteeringStrategy for ClutchSteering {
    fn name(&self) -> &'static str {
        "clutch"
    }

    fn decide(&self, table: &PositionTable) -> SteeringCommand {
        let joints = Joints::new(table, self.policy);
        self.right_hand_raised(&joints)
            .or_else(|| self.left_hand_raised(&joints))
            .or_else(|| self.right_hand_out(&joints))
            .or_else(|| self.left_hand_out(&joints))
            .unwrap_or_else(SteeringCommand::brake_all)
    }

    fn brake(&self) -> SteeringCommand {
        SteeringCommand::brake_all()
    }
}
