mod dry_run;
mod nxt;

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dry_run::DryRunLink;
pub use nxt::NxtLink;

/// Output ports on the brick. `B` and `C` drive the wheels, `A` is the
/// auxiliary (clutch) motor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MotorPort {
    A,
    B,
    C,
}

impl MotorPort {
    pub const ALL: [MotorPort; 3] = [MotorPort::A, MotorPort::B, MotorPort::C];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            MotorPort::A => "A",
            MotorPort::B => "B",
            MotorPort::C => "C",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotorDirective {
    Forward(u8),
    Reverse(u8),
    Stop { brake: bool },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    #[default]
    DryRun,
    Nxt,
}

#[derive(Debug, Error)]
pub enum MotorLinkError {
    #[error("motor link i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("motor link is not connected")]
    NotConnected,
    #[error("{0:?} is not a valid brick program name")]
    ProgramName(String),
}

/// Fire-and-forget command channel to the robot.
pub trait MotorLink {
    fn set_motor(
        &mut self,
        port: MotorPort,
        direction: Direction,
        speed: u8,
    ) -> Result<(), MotorLinkError>;

    fn stop_motor(&mut self, port: MotorPort, brake: bool) -> Result<(), MotorLinkError>;

    fn is_open(&self) -> bool;

    /// Brakes every motor and releases the link. Calling it again is a no-op.
    fn shutdown(&mut self) -> Result<(), MotorLinkError>;

    fn apply(&mut self, port: MotorPort, directive: MotorDirective) -> Result<(), MotorLinkError> {
        match directive {
            MotorDirective::Forward(speed) => self.set_motor(port, Direction::Forward, speed),
            MotorDirective::Reverse(speed) => self.set_motor(port, Direction::Reverse, speed),
            MotorDirective::Stop { brake } => self.stop_motor(port, brake),
        }
    }
}

impl<L: MotorLink + ?Sized> MotorLink for Box<L> {
    fn set_motor(
        &mut self,
        port: MotorPort,
        direction: Direction,
        speed: u8,
    ) -> Result<(), MotorLinkError> {
        (**self).set_motor(port, direction, speed)
    }

    fn stop_motor(&mut self, port: MotorPort, brake: bool) -> Result<(), MotorLinkError> {
        (**self).stop_motor(port, brake)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn shutdown(&mut self) -> Result<(), MotorLinkError> {
        (**self).shutdown()
    }
}
