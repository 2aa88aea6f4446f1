use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sensor-assigned user id. Ids are small and recycled once a user is lost;
/// `0` never names a real user.
pub type UserId = u16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    #[cfg(test)]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    Head,
    Neck,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftHand,
    RightHand,
    Torso,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftFoot,
    RightFoot,
}

impl JointKind {
    pub const COUNT: usize = 15;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            JointKind::Head => "head",
            JointKind::Neck => "neck",
            JointKind::LeftShoulder => "left_shoulder",
            JointKind::RightShoulder => "right_shoulder",
            JointKind::LeftElbow => "left_elbow",
            JointKind::RightElbow => "right_elbow",
            JointKind::LeftHand => "left_hand",
            JointKind::RightHand => "right_hand",
            JointKind::Torso => "torso",
            JointKind::LeftHip => "left_hip",
            JointKind::RightHip => "right_hip",
            JointKind::LeftKnee => "left_knee",
            JointKind::RightKnee => "right_knee",
            JointKind::LeftFoot => "left_foot",
            JointKind::RightFoot => "right_foot",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Real-world position in sensor space (millimetres).
    pub position: Point3,
    /// Position projected into depth image pixels, used only for drawing.
    #[serde(default)]
    pub projected: (f32, f32),
    pub confidence: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationError {
    NotInPose,
    Hands,
    Legs,
    Head,
    Torso,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonState {
    #[default]
    None,
    Calibrating,
    Tracked,
    CalibrationError(CalibrationError),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    #[serde(default)]
    pub state: SkeletonState,
    #[serde(default)]
    pub joints: BTreeMap<JointKind, Joint>,
}

impl Skeleton {
    /// Joints the sensor did not report read back with zero confidence.
    pub fn joint(&self, kind: JointKind) -> Joint {
        self.joints.get(&kind).copied().unwrap_or_default()
    }
}

/// Per-frame state of the crossed-hands pose for one user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseState {
    #[serde(default)]
    pub entered: bool,
    #[serde(default)]
    pub held: bool,
    #[serde(default)]
    pub exited: bool,
}

impl PoseState {
    pub fn is_entered(&self) -> bool {
        self.entered
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }
}

/// Axis-aligned user extent in depth image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: (f32, f32),
    pub max: (f32, f32),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: UserId,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub is_lost: bool,
    #[serde(default)]
    pub skeleton: Skeleton,
    #[serde(default)]
    pub crossed_hands: PoseState,
    /// Centre of mass projected into depth image pixels.
    #[serde(default)]
    pub center_of_mass: (f32, f32),
    #[serde(default)]
    pub bounding_box: BoundingBox,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    /// Raw depth per pixel, row-major. `0` marks an invalid reading.
    pub pixels: Vec<u16>,
    /// Per-pixel user label (`0` = background). May be empty.
    #[serde(default)]
    pub labels: Vec<UserId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerFrame {
    pub frame_index: u64,
    /// Monotonic sensor timestamp in microseconds.
    pub timestamp: u64,
    #[serde(default)]
    pub users: Vec<UserData>,
    #[serde(default)]
    pub depth: Option<DepthFrame>,
}
