use std::{
    collections::BTreeSet,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use serde::Deserialize;

use super::{FrameSource, SensorError};
use crate::types::{TrackerFrame, UserId};

/// A recorded line is either a frame or a failed read, `{"error": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Record {
    Failure { error: String },
    Frame(TrackerFrame),
}

/// Plays back recorded tracker frames, one JSON object per line.
pub struct ReplaySource<R: BufRead> {
    reader: Option<R>,
    line: usize,
    buffer: Vec<u8>,
    tracked: BTreeSet<UserId>,
    pose_watched: BTreeSet<UserId>,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SensorError> {
        let file = File::open(path)?;
        log::info!("replaying tracker frames from {}", path.display());
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: Some(reader),
            line: 0,
            buffer: Vec::new(),
            tracked: BTreeSet::new(),
            pose_watched: BTreeSet::new(),
        }
    }

    #[cfg(test)]
    pub fn is_tracking(&self, user: UserId) -> bool {
        self.tracked.contains(&user)
    }

    #[cfg(test)]
    pub fn is_watching_pose(&self, user: UserId) -> bool {
        self.pose_watched.contains(&user)
    }
}

impl<R: BufRead> FrameSource for ReplaySource<R> {
    fn read_frame(&mut self) -> Result<TrackerFrame, SensorError> {
        let reader = self.reader.as_mut().ok_or(SensorError::EndOfStream)?;

        loop {
            self.buffer.clear();
            // Raw bytes, so a corrupt line costs one frame instead of the stream.
            if reader.read_until(b'\n', &mut self.buffer)? == 0 {
                return Err(SensorError::EndOfStream);
            }
            self.line += 1;

            let text = self.buffer.trim_ascii();
            if text.is_empty() {
                continue;
            }

            let record = serde_json::from_slice(text).map_err(|source| SensorError::Parse {
                line: self.line,
                source,
            })?;
            return match record {
                Record::Frame(frame) => Ok(frame),
                Record::Failure { error } => Err(SensorError::Status(error)),
            };
        }
    }

    fn start_skeleton_tracking(&mut self, user: UserId) -> Result<(), SensorError> {
        log::debug!("replay: skeleton tracking requested for user #{user}");
        self.tracked.insert(user);
        Ok(())
    }

    fn start_pose_detection(&mut self, user: UserId) -> Result<(), SensorError> {
        log::debug!("replay: exit pose detection requested for user #{user}");
        self.pose_watched.insert(user);
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.reader.take().is_some() {
            log::info!("replay closed after {} lines", self.line);
        }
    }
}
