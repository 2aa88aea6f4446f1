use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{PoseState, UserId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitPoseConfig {
    /// How long the crossed-hands pose must be held before shutting down.
    pub hold_ms: u64,
}

impl Default for ExitPoseConfig {
    fn default() -> Self {
        Self { hold_ms: 2_000 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitPoseOutcome {
    /// Nothing changed for this user (or it does not own the countdown).
    Idle,
    CountdownStarted,
    Holding { elapsed_us: u64 },
    Interrupted,
    /// The pose was held long enough; the caller should shut down.
    Exit,
}

/// Countdown to shutdown while one user holds the exit pose.
///
/// Only one user owns the countdown at a time. Others are ignored until the
/// owner leaves the pose.
pub struct ExitPoseTimer {
    hold: Duration,
    owner: Option<UserId>,
    started_at: u64,
    message: Option<String>,
}

impl ExitPoseTimer {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            owner: None,
            started_at: 0,
            message: None,
        }
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    /// Countdown banner for the overlay while a countdown is running.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Feeds one user's pose state for the frame stamped `timestamp` (µs).
    pub fn evaluate(&mut self, user: UserId, pose: PoseState, timestamp: u64) -> ExitPoseOutcome {
        if self.owner.is_some_and(|owner| owner != user) {
            return ExitPoseOutcome::Idle;
        }

        if pose.is_entered() {
            let seconds = self.hold.as_secs();
            self.message = Some(format!(
                "In exit pose. Keep it for {seconds} second{} to exit",
                if seconds == 1 { "" } else { "s" }
            ));
            log::info!("user #{user}: counting down {seconds} second(s) to exit");
            self.owner = Some(user);
            self.started_at = timestamp;
            ExitPoseOutcome::CountdownStarted
        } else if pose.is_exited() {
            let was_counting = self.owner.is_some();
            self.reset();
            if was_counting {
                log::info!("user #{user}: count-down interrupted");
                ExitPoseOutcome::Interrupted
            } else {
                ExitPoseOutcome::Idle
            }
        } else if pose.is_held() && self.owner == Some(user) {
            let elapsed_us = timestamp.saturating_sub(self.started_at);
            let hold_us = u64::try_from(self.hold.as_micros()).unwrap_or(u64::MAX);
            if elapsed_us > hold_us {
                log::info!("user #{user}: count down complete, exiting");
                ExitPoseOutcome::Exit
            } else {
                ExitPoseOutcome::Holding { elapsed_us }
            }
        } else {
            ExitPoseOutcome::Idle
        }
    }

    /// Releases the countdown, e.g. when the owner is lost mid-pose.
    pub fn reset(&mut self) {
        self.owner = None;
        self.started_at = 0;
        self.message = None;
    }
}
