mod replay;

use std::io;

use thiserror::Error;

use crate::types::{TrackerFrame, UserId};

pub use replay::ReplaySource;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed frame on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("sensor stream ended")]
    EndOfStream,
    #[error("sensor reported failure: {0}")]
    Status(String),
}

impl SensorError {
    /// Whether the frame loop has to stop. Everything else only costs the
    /// current frame.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SensorError::Io(_) | SensorError::EndOfStream)
    }
}

/// Per-frame skeleton tracking output from the depth sensor.
pub trait FrameSource {
    /// Blocks until the next frame is available.
    fn read_frame(&mut self) -> Result<TrackerFrame, SensorError>;

    fn start_skeleton_tracking(&mut self, user: UserId) -> Result<(), SensorError>;

    /// Starts detection of the crossed-hands (exit) pose for `user`.
    fn start_pose_detection(&mut self, user: UserId) -> Result<(), SensorError>;

    fn shutdown(&mut self);
}
