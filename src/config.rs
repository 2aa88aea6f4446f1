use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    exit_pose::ExitPoseConfig,
    motor::LinkKind,
    pipeline::overlay::OverlayOptions,
    sampler::DEFAULT_CONFIDENCE_THRESHOLD,
    steering::SteeringConfig,
    types::UserId,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub steering: SteeringConfig,
    pub tracking: TrackingConfig,
    pub exit_pose: ExitPoseConfig,
    pub motor: MotorConfig,
    pub overlay: OverlayOptions,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// The only user whose posture drives the motors.
    pub driver_user_id: UserId,
    /// Number of user id slots kept by the lifecycle tracker.
    pub max_users: usize,
    pub confidence_threshold: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            driver_user_id: 1,
            max_users: 16,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub link: LinkKind,
    /// Serial device of the brick, e.g. `/dev/rfcomm0`. Required for `nxt`.
    pub device: Option<PathBuf>,
    /// Program started on the brick when the link opens.
    pub program: String,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            link: LinkKind::DryRun,
            device: None,
            program: "program1".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }
}
