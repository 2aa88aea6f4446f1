mod clutch;
mod depth;
mod simple;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    motor::{MotorDirective, MotorPort},
    sampler::{PositionTable, StalePolicy},
    types::{JointKind, Point3},
};

pub use clutch::ClutchSteering;
pub use depth::DepthSteering;
pub use simple::SimpleSteering;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SteeringMode {
    #[default]
    Simple,
    Depth,
    Clutch,
}

impl SteeringMode {
    pub fn label(&self) -> &'static str {
        match self {
            SteeringMode::Simple => "simple steering",
            SteeringMode::Depth => "depth steering",
            SteeringMode::Clutch => "steering with clutch support",
        }
    }
}

/// Tolerance around the neutral pose, in sensor millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Deadband {
    pub x: f32,
    pub y: f32,
}

impl Default for Deadband {
    fn default() -> Self {
        Self { x: 100.0, y: 50.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    pub mode: SteeringMode,
    pub precision_x: f32,
    pub precision_y: f32,
    pub speed: u8,
    pub clutch_speed: u8,
    pub clutch_hip_offset: f32,
    pub stale_policy: StalePolicy,
}

impl SteeringConfig {
    pub fn deadband(&self) -> Deadband {
        Deadband {
            x: self.precision_x,
            y: self.precision_y,
        }
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            mode: SteeringMode::Simple,
            precision_x: 100.0,
            precision_y: 50.0,
            speed: 40,
            clutch_speed: 10,
            clutch_hip_offset: 100.0,
            stale_policy: StalePolicy::Reject,
        }
    }
}

/// Motor directives for one frame. `None` leaves a port as it was.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SteeringCommand {
    pub a: Option<MotorDirective>,
    pub b: Option<MotorDirective>,
    pub c: Option<MotorDirective>,
}

impl SteeringCommand {
    pub fn drive(b: MotorDirective, c: MotorDirective) -> Self {
        Self {
            a: None,
            b: Some(b),
            c: Some(c),
        }
    }

    pub fn auxiliary(a: MotorDirective) -> Self {
        Self {
            a: Some(a),
            ..Default::default()
        }
    }

    pub fn forward(speed: u8) -> Self {
        Self::drive(MotorDirective::Forward(speed), MotorDirective::Forward(speed))
    }

    pub fn backward(speed: u8) -> Self {
        Self::drive(MotorDirective::Reverse(speed), MotorDirective::Reverse(speed))
    }

    /// B backwards, C forwards.
    pub fn pivot_b_back(speed: u8) -> Self {
        Self::drive(MotorDirective::Reverse(speed), MotorDirective::Forward(speed))
    }

    /// B forwards, C backwards.
    pub fn pivot_c_back(speed: u8) -> Self {
        Self::drive(MotorDirective::Forward(speed), MotorDirective::Reverse(speed))
    }

    pub fn brake_drive() -> Self {
        let stop = MotorDirective::Stop { brake: true };
        Self::drive(stop, stop)
    }

    pub fn brake_all() -> Self {
        let stop = MotorDirective::Stop { brake: true };
        Self {
            a: Some(stop),
            b: Some(stop),
            c: Some(stop),
        }
    }

    pub fn get(&self, port: MotorPort) -> Option<MotorDirective> {
        match port {
            MotorPort::A => self.a,
            MotorPort::B => self.b,
            MotorPort::C => self.c,
        }
    }

    pub fn directives(&self) -> impl Iterator<Item = (MotorPort, MotorDirective)> + '_ {
        MotorPort::ALL
            .into_iter()
            .filter_map(|port| self.get(port).map(|directive| (port, directive)))
    }
}

pub trait SteeringStrategy {
    fn name(&self) -> &'static str;

    /// Maps a posture snapshot to motor directives. Rules are tried in order
    /// and the first one whose joints are all usable and whose condition
    /// holds wins.
    fn decide(&self, table: &PositionTable) -> SteeringCommand;

    /// Sent once when the driver stops steering, e.g. lost or untracked.
    fn brake(&self) -> SteeringCommand {
        SteeringCommand::brake_drive()
    }
}

pub fn build_strategy(config: &SteeringConfig) -> Box<dyn SteeringStrategy> {
    match config.mode {
        SteeringMode::Simple => Box::new(SimpleSteering::new(
            config.deadband(),
            config.speed,
            config.stale_policy,
        )),
        SteeringMode::Depth => Box::new(DepthSteering::new(
            config.deadband(),
            config.speed,
            config.stale_policy,
        )),
        SteeringMode::Clutch => Box::new(ClutchSteering::new(
            config.deadband(),
            config.clutch_speed,
            config.clutch_hip_offset,
            config.stale_policy,
        )),
    }
}

/// Joint lookup used by the rules; anything unknown or too stale is `None`.
struct Joints<'a> {
    table: &'a PositionTable,
    policy: StalePolicy,
}

impl<'a> Joints<'a> {
    fn new(table: &'a PositionTable, policy: StalePolicy) -> Self {
        Self { table, policy }
    }

    fn get(&self, kind: JointKind) -> Option<Point3> {
        self.table.position(kind, self.policy)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::{
        sampler::{JointObservation, PositionTable},
        types::{JointKind, Point3},
    };

    pub fn table(joints: &[(JointKind, (f32, f32, f32))]) -> PositionTable {
        let mut table = PositionTable::new(1);
        for &(kind, (x, y, z)) in joints {
            table.set(kind, JointObservation::Fresh(Point3::new(x, y, z)));
        }
        table
    }
}
