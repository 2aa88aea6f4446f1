use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use super::{Direction, MotorLink, MotorLinkError, MotorPort};

// Direct-command telegram layout of the NXT firmware.
const DIRECT_COMMAND_NO_REPLY: u8 = 0x80;
const START_PROGRAM: u8 = 0x00;
const STOP_PROGRAM: u8 = 0x01;
const SET_OUTPUT_STATE: u8 = 0x04;

const MODE_MOTOR_ON: u8 = 0x01;
const MODE_BRAKE: u8 = 0x02;
const MODE_REGULATED: u8 = 0x04;
const REGULATION_IDLE: u8 = 0x00;
const REGULATION_MOTOR_SPEED: u8 = 0x01;
const RUN_STATE_IDLE: u8 = 0x00;
const RUN_STATE_RUNNING: u8 = 0x20;

const PROGRAM_NAME_LEN: usize = 20;
const MAX_POWER: u8 = 100;

/// Drives a LEGO NXT brick with direct commands over a byte stream, usually
/// a Bluetooth serial device such as `/dev/rfcomm0`.
pub struct NxtLink<W: Write> {
    writer: Option<W>,
    touched: [bool; 3],
}

impl NxtLink<File> {
    pub fn open(device: &Path, program: &str) -> Result<Self, MotorLinkError> {
        let file = OpenOptions::new().write(true).open(device)?;
        log::info!("opened NXT link on {}", device.display());
        Self::connect(file, program)
    }
}

impl<W: Write> NxtLink<W> {
    /// Starts `program` on the brick and returns the ready link.
    pub fn connect(writer: W, program: &str) -> Result<Self, MotorLinkError> {
        let start = start_program_payload(program)?;
        let mut link = Self {
            writer: Some(writer),
            touched: [false; 3],
        };
        link.send(&start)?;
        log::info!("started brick program {program:?}");
        Ok(link)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), MotorLinkError> {
        let writer = self.writer.as_mut().ok_or(MotorLinkError::NotConnected)?;
        writer.write_all(&frame(payload))?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write> MotorLink for NxtLink<W> {
    fn set_motor(
        &mut self,
        port: MotorPort,
        direction: Direction,
        speed: u8,
    ) -> Result<(), MotorLinkError> {
        let power = speed.min(MAX_POWER) as i8;
        let power = match direction {
            Direction::Forward => power,
            Direction::Reverse => -power,
        };
        self.send(&output_state_payload(
            port,
            power,
            MODE_MOTOR_ON | MODE_REGULATED,
            REGULATION_MOTOR_SPEED,
            RUN_STATE_RUNNING,
        ))?;
        self.touched[port.index()] = true;
        log::debug!("nxt motor {} {direction:?} at {speed}", port.label());
        Ok(())
    }

    fn stop_motor(&mut self, port: MotorPort, brake: bool) -> Result<(), MotorLinkError> {
        let payload = if brake {
            output_state_payload(
                port,
                0,
                MODE_MOTOR_ON | MODE_BRAKE | MODE_REGULATED,
                REGULATION_MOTOR_SPEED,
                RUN_STATE_RUNNING,
            )
        } else {
            output_state_payload(port, 0, 0, REGULATION_IDLE, RUN_STATE_IDLE)
        };
        self.send(&payload)?;
        self.touched[port.index()] = true;
        log::debug!("nxt motor {} stop (brake: {brake})", port.label());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn shutdown(&mut self) -> Result<(), MotorLinkError> {
        if self.writer.is_none() {
            return Ok(());
        }

        for port in MotorPort::ALL {
            let drive = matches!(port, MotorPort::B | MotorPort::C);
            if drive || self.touched[port.index()] {
                self.stop_motor(port, true)?;
            }
        }
        self.send(&[DIRECT_COMMAND_NO_REPLY, STOP_PROGRAM])?;
        self.writer = None;
        log::info!("NXT link closed");
        Ok(())
    }
}

impl<W: Write> Drop for NxtLink<W> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::warn!("failed to stop NXT cleanly: {err}");
        }
    }
}

/// Prefixes a telegram with its little-endian length, as the Bluetooth
/// transport expects.
fn frame(payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u16;
    let mut bytes = Vec::with_capacity(payload.len() + 2);
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

fn start_program_payload(program: &str) -> Result<Vec<u8>, MotorLinkError> {
    let name = if program.contains('.') {
        program.to_string()
    } else {
        format!("{program}.rxe")
    };
    if name.is_empty() || !name.is_ascii() || name.len() >= PROGRAM_NAME_LEN {
        return Err(MotorLinkError::ProgramName(program.to_string()));
    }

    let mut payload = vec![DIRECT_COMMAND_NO_REPLY, START_PROGRAM];
    payload.extend_from_slice(name.as_bytes());
    payload.resize(2 + PROGRAM_NAME_LEN, 0);
    Ok(payload)
}

fn output_state_payload(
    port: MotorPort,
    power: i8,
    mode: u8,
    regulation: u8,
    run_state: u8,
) -> Vec<u8> {
    let turn_ratio = 0u8;
    let tacho_limit = 0u32;
    let mut payload = vec![
        DIRECT_COMMAND_NO_REPLY,
        SET_OUTPUT_STATE,
        port.index() as u8,
        power as u8,
        mode,
        regulation,
        turn_ratio,
        run_state,
    ];
    payload.extend_from_slice(&tacho_limit.to_le_bytes());
    payload
}
