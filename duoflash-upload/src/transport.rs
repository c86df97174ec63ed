// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! USB-serial adapter as bootloader link and reset lines.
//!
//! The adapter's DTR output drives the secondary controller reset line and
//! RTS drives boot-select. Both modem lines are active low on common
//! adapters: asserting a line pulls it low.

use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin, StatefulOutputPin};
use serialport::{ClearBuffer, SerialPort};

use duoflash_common::protocol::SHORT_TIMEOUT_MS;
use duoflash_common::{ResetController, SerialLink};

/// Reset controller built from the adapter's modem lines.
pub type HostResetController = ResetController<ModemLine, ModemLine, StdDelay>;

/// Open `port` at `baud`, returning the data link and the reset lines.
pub fn open(port: &str, baud: u32, settle_ms: u32) -> Result<(Transport, HostResetController)> {
    let serial = serialport::new(port, baud)
        .timeout(Duration::from_millis(SHORT_TIMEOUT_MS as u64))
        .open()
        .with_context(|| format!("Failed to open serial port {port}"))?;

    let reset = ModemLine::new(
        serial.try_clone().context("Failed to clone serial port")?,
        Line::Dtr,
    );
    let boot = ModemLine::new(
        serial.try_clone().context("Failed to clone serial port")?,
        Line::Rts,
    );
    let ctrl = ResetController::new(reset, boot, StdDelay).with_settle_ms(settle_ms);

    Ok((
        Transport {
            port: serial,
            name: port.to_string(),
        },
        ctrl,
    ))
}

/// Serial port implementing the bootloader link.
pub struct Transport {
    port: Box<dyn SerialPort>,
    name: String,
}

impl Transport {
    pub fn port_name(&self) -> &str {
        &self.name
    }
}

impl embedded_io::ErrorType for Transport {
    type Error = io::Error;
}

impl embedded_io::Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl SerialLink for Transport {
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: u32) -> io::Result<usize> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms.max(1) as u64);
        let mut len = 0;
        while len < buf.len() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.port.set_timeout(deadline - now)?;
            match self.port.read(&mut buf[len..]) {
                Ok(0) => break,
                Ok(n) => len += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }
        Ok(len)
    }

    fn baud_rate(&mut self) -> io::Result<u32> {
        Ok(self.port.baud_rate()?)
    }

    fn set_baud_rate(&mut self, baud: u32) -> io::Result<()> {
        Ok(self.port.set_baud_rate(baud)?)
    }

    fn clear(&mut self) -> io::Result<()> {
        self.port.flush()?;
        Ok(self.port.clear(ClearBuffer::Input)?)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Line {
    Dtr,
    Rts,
}

#[derive(Debug)]
pub struct LineError(serialport::Error);

impl digital::Error for LineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One modem control line seen as an output pin.
pub struct ModemLine {
    port: Box<dyn SerialPort>,
    line: Line,
    high: bool,
}

impl ModemLine {
    fn new(port: Box<dyn SerialPort>, line: Line) -> Self {
        Self {
            port,
            line,
            high: true,
        }
    }

    fn drive(&mut self, high: bool) -> Result<(), LineError> {
        let asserted = !high;
        match self.line {
            Line::Dtr => self.port.write_data_terminal_ready(asserted),
            Line::Rts => self.port.write_request_to_send(asserted),
        }
        .map_err(LineError)?;
        self.high = high;
        Ok(())
    }
}

impl ErrorType for ModemLine {
    type Error = LineError;
}

impl OutputPin for ModemLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

impl StatefulOutputPin for ModemLine {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// Blocking delay on the host thread.
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}
