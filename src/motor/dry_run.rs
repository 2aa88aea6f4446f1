use super::{Direction, MotorDirective, MotorLink, MotorLinkError, MotorPort};

/// Logs commands instead of sending them. Remembers the last directive per
/// port so a repeated command is only logged once.
#[derive(Debug)]
pub struct DryRunLink {
    open: bool,
    last: [Option<MotorDirective>; 3],
}

impl DryRunLink {
    pub fn new() -> Self {
        Self {
            open: true,
            last: [None; 3],
        }
    }

    #[cfg(test)]
    pub fn last_directive(&self, port: MotorPort) -> Option<MotorDirective> {
        self.last[port.index()]
    }
}

impl Default for DryRunLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorLink for DryRunLink {
    fn set_motor(
        &mut self,
        port: MotorPort,
        direction: Direction,
        speed: u8,
    ) -> Result<(), MotorLinkError> {
        if !self.open {
            return Err(MotorLinkError::NotConnected);
        }
        let directive = match direction {
            Direction::Forward => MotorDirective::Forward(speed),
            Direction::Reverse => MotorDirective::Reverse(speed),
        };
        if self.last[port.index()] != Some(directive) {
            log::info!("motor {}: {directive:?}", port.label());
        }
        self.last[port.index()] = Some(directive);
        Ok(())
    }

    fn stop_motor(&mut self, port: MotorPort, brake: bool) -> Result<(), MotorLinkError> {
        if !self.open {
            return Err(MotorLinkError::NotConnected);
        }
        let directive = MotorDirective::Stop { brake };
        if self.last[port.index()] != Some(directive) {
            log::info!("motor {}: {directive:?}", port.label());
        }
        self.last[port.index()] = Some(directive);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn shutdown(&mut self) -> Result<(), MotorLinkError> {
        if !self.open {
            return Ok(());
        }
        for port in MotorPort::ALL {
            self.stop_motor(port, true)?;
        }
        self.open = false;
        log::info!("dry-run motor link closed");
        Ok(())
    }
}
