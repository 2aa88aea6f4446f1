use std::fmt;

use crate::types::{SkeletonState, UserData, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    New,
    Visible,
    OutOfScene,
    Lost,
    StoppedTracking,
    Calibrating,
    Tracking,
    CalibrationFailed,
}

impl LifecycleEvent {
    pub fn message(&self) -> &'static str {
        match self {
            LifecycleEvent::New => "New",
            LifecycleEvent::Visible => "Visible",
            LifecycleEvent::OutOfScene => "Out of Scene",
            LifecycleEvent::Lost => "Lost",
            LifecycleEvent::StoppedTracking => "Stopped tracking.",
            LifecycleEvent::Calibrating => "Calibrating...",
            LifecycleEvent::Tracking => "Tracking!",
            LifecycleEvent::CalibrationFailed => "Calibration Failed... :|",
        }
    }

    /// Visibility changes are only logged; everything else becomes the
    /// user's status label.
    fn sets_label(&self) -> bool {
        !matches!(self, LifecycleEvent::Visible | LifecycleEvent::OutOfScene)
    }

    fn for_skeleton(state: SkeletonState) -> Self {
        match state {
            SkeletonState::None => LifecycleEvent::StoppedTracking,
            SkeletonState::Calibrating => LifecycleEvent::Calibrating,
            SkeletonState::Tracked => LifecycleEvent::Tracking,
            SkeletonState::CalibrationError(_) => LifecycleEvent::CalibrationFailed,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Clone, Debug, Default)]
struct UserSlot {
    visible: bool,
    skeleton: SkeletonState,
    lost: bool,
    status_label: String,
}

/// Last reported state per user id, used to turn the sensor's per-frame
/// flags into edge-triggered events.
pub struct UserLifecycleTracker {
    slots: Vec<UserSlot>,
}

impl UserLifecycleTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![UserSlot::default(); capacity],
        }
    }

    /// Compares `user` against its slot and returns the transitions observed
    /// this frame. Ids outside the tracker's capacity are ignored.
    pub fn update(&mut self, user: &UserData, timestamp: u64) -> Vec<LifecycleEvent> {
        let Some(slot) = self.slots.get_mut(user.id as usize) else {
            log::warn!(
                "user #{} exceeds lifecycle capacity {}, ignoring",
                user.id,
                self.slots.len()
            );
            return Vec::new();
        };

        let mut events = Vec::new();

        if user.is_new {
            // Ids are recycled; whatever the previous holder left is stale.
            *slot = UserSlot::default();
            events.push(LifecycleEvent::New);
        } else if user.is_visible != slot.visible {
            events.push(if user.is_visible {
                LifecycleEvent::Visible
            } else {
                LifecycleEvent::OutOfScene
            });
        } else if user.is_lost && !slot.lost {
            slot.lost = true;
            events.push(LifecycleEvent::Lost);
        }
        slot.visible = user.is_visible;

        let skeleton = user.skeleton.state;
        if skeleton != slot.skeleton {
            slot.skeleton = skeleton;
            events.push(LifecycleEvent::for_skeleton(skeleton));
        }

        for event in &events {
            if event.sets_label() {
                slot.status_label = event.message().to_string();
            }
            log::info!("[{timestamp:08}] User #{}:\t{event}", user.id);
        }

        if user.is_lost {
            slot.visible = false;
            slot.skeleton = SkeletonState::None;
        }

        events
    }

    pub fn status_label(&self, user: UserId) -> Option<&str> {
        self.slots
            .get(user as usize)
            .map(|slot| slot.status_label.as_str())
            .filter(|label| !label.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CalibrationError;

    fn user(id: UserId, visible: bool, state: SkeletonState) -> UserData {
        let mut user = UserData {
            id,
            is_visible: visible,
            ..Default::default()
        };
        user.skeleton.state = state;
        user
    }

    #[test]
    fn new_user_reports_new_then_nothing() {
        let mut tracker = UserLifecycleTracker::new(5);
        let mut first = user(1, true, SkeletonState::None);
        first.is_new = true;
        assert_eq!(tracker.update(&first, 0), vec![LifecycleEvent::New]);
        assert_eq!(tracker.status_label(1), Some("New"));

        let steady = user(1, true, SkeletonState::None);
        assert!(tracker.update(&steady, 1).is_empty());
        assert!(tracker.update(&steady, 2).is_empty());
    }

    #[test]
    fn events_fire_once_per_transition() {
        let mut tracker = UserLifecycleTracker::new(5);
        let sequence = [
            (false, SkeletonState::None),
            (true, SkeletonState::None),
            (true, SkeletonState::None),
            (true, SkeletonState::Calibrating),
            (true, SkeletonState::Calibrating),
            (true, SkeletonState::Tracked),
            (false, SkeletonState::Tracked),
            (false, SkeletonState::Tracked),
            (true, SkeletonState::None),
        ];

        let fired: Vec<Vec<LifecycleEvent>> = sequence
            .iter()
            .enumerate()
            .map(|(ts, &(visible, state))| tracker.update(&user(2, visible, state), ts as u64))
            .collect();

        assert_eq!(
            fired,
            vec![
                vec![],
                vec![LifecycleEvent::Visible],
                vec![],
                vec![LifecycleEvent::Calibrating],
                vec![],
                vec![LifecycleEvent::Tracking],
                vec![LifecycleEvent::OutOfScene],
                vec![],
                vec![LifecycleEvent::Visible, LifecycleEvent::StoppedTracking],
            ]
        );
    }

    #[test]
    fn calibration_errors_collapse_to_one_message() {
        let mut tracker = UserLifecycleTracker::new(5);
        let hands = SkeletonState::CalibrationError(CalibrationError::Hands);
        let torso = SkeletonState::CalibrationError(CalibrationError::Torso);

        assert_eq!(
            tracker.update(&user(1, false, hands), 0),
            vec![LifecycleEvent::CalibrationFailed]
        );
        // A different sub-reason is still a state change.
        assert_eq!(
            tracker.update(&user(1, false, torso), 1),
            vec![LifecycleEvent::CalibrationFailed]
        );
        assert_eq!(tracker.status_label(1), Some("Calibration Failed... :|"));
    }

    #[test]
    fn visibility_changes_do_not_touch_the_label() {
        let mut tracker = UserLifecycleTracker::new(5);
        tracker.update(&user(3, false, SkeletonState::Calibrating), 0);
        tracker.update(&user(3, true, SkeletonState::Calibrating), 1);
        assert_eq!(tracker.status_label(3), Some("Calibrating..."));
    }

    #[test]
    fn lost_fires_once_and_reused_id_starts_clean() {
        let mut tracker = UserLifecycleTracker::new(5);
        tracker.update(&user(1, false, SkeletonState::Tracked), 0);

        let mut lost = user(1, false, SkeletonState::Tracked);
        lost.is_lost = true;
        assert_eq!(tracker.update(&lost, 1), vec![LifecycleEvent::Lost]);
        assert_eq!(tracker.status_label(1), Some("Lost"));

        let mut lost_again = user(1, false, SkeletonState::None);
        lost_again.is_lost = true;
        assert!(tracker.update(&lost_again, 2).is_empty());

        let mut reused = user(1, true, SkeletonState::None);
        reused.is_new = true;
        assert_eq!(tracker.update(&reused, 3), vec![LifecycleEvent::New]);
        assert!(tracker.update(&user(1, true, SkeletonState::None), 4).is_empty());
    }

    #[test]
    fn ids_beyond_capacity_are_ignored() {
        let mut tracker = UserLifecycleTracker::new(2);
        let mut far = user(7, true, SkeletonState::Tracked);
        far.is_new = true;
        assert!(tracker.update(&far, 0).is_empty());
        assert_eq!(tracker.status_label(7), None);
    }
}
