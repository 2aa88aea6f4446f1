use serde::{Deserialize, Serialize};

use crate::types::{JointKind, Point3, Skeleton};

/// Joints the steering strategies read.
pub const SAMPLED_JOINTS: [JointKind; 9] = [
    JointKind::RightHand,
    JointKind::RightShoulder,
    JointKind::LeftHand,
    JointKind::LeftShoulder,
    JointKind::RightElbow,
    JointKind::LeftElbow,
    JointKind::Torso,
    JointKind::LeftHip,
    JointKind::RightHip,
];

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum JointObservation {
    /// Never confidently observed since the last reset.
    #[default]
    Unknown,
    /// Not confident this frame; `frame` is where `position` was last fresh.
    Stale { position: Point3, frame: u64 },
    Fresh(Point3),
}

/// How strategies treat joints that were not confident this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    #[default]
    Reject,
    /// Accept a stale position last seen at most this many frames ago.
    MaxAge(u64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PositionTable {
    frame: u64,
    entries: [JointObservation; JointKind::COUNT],
}

impl PositionTable {
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            entries: [JointObservation::Unknown; JointKind::COUNT],
        }
    }

    pub fn get(&self, kind: JointKind) -> JointObservation {
        self.entries[kind.index()]
    }

    pub fn set(&mut self, kind: JointKind, observation: JointObservation) {
        self.entries[kind.index()] = observation;
    }

    /// Position usable for a decision this frame, or `None` when the joint
    /// is unknown or too stale under `policy`.
    pub fn position(&self, kind: JointKind, policy: StalePolicy) -> Option<Point3> {
        match (self.get(kind), policy) {
            (JointObservation::Fresh(position), _) => Some(position),
            (JointObservation::Stale { position, frame }, StalePolicy::MaxAge(max_age))
                if self.frame.saturating_sub(frame) <= max_age =>
            {
                Some(position)
            }
            _ => None,
        }
    }
}

/// Builds the driver's position table frame by frame, remembering where
/// each joint was last confidently seen.
pub struct JointSampler {
    threshold: f32,
    table: PositionTable,
}

impl JointSampler {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            table: PositionTable::new(0),
        }
    }

    /// Forgets every observation, e.g. when the driver id is handed to a new user.
    pub fn reset(&mut self) {
        self.table = PositionTable::new(0);
    }

    pub fn sample(&mut self, skeleton: &Skeleton, frame: u64) -> &PositionTable {
        let previous_frame = self.table.frame;

        for kind in SAMPLED_JOINTS {
            let joint = skeleton.joint(kind);
            let observation = if joint.confidence > self.threshold {
                JointObservation::Fresh(joint.position)
            } else {
                match self.table.get(kind) {
                    JointObservation::Fresh(position) => {
                        log::trace!("{} dropped below confidence at frame {frame}", kind.name());
                        JointObservation::Stale {
                            position,
                            frame: previous_frame,
                        }
                    }
                    other => other,
                }
            };
            self.table.set(kind, observation);
        }

        self.table.frame = frame;
        &self.table
    }
}

impl Default for JointSampler {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}
