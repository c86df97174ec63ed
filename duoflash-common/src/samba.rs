// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! SAM-BA bootloader client over the shared UART.
//!
//! Strictly request/response; nothing is retried. A timeout or a wrong
//! acknowledgment is returned to the caller, which must abort the session
//! and start over (remote flash contents are then indeterminate).

use heapless::String;

use crate::ctrl::ModeControl;
use crate::error::{Result, UpdateError};
use crate::fmt::{debug, error, info, warn};
use crate::link::SerialLink;
use crate::protocol::{trim_reply, Command, LinkConfig, MAX_REPLY_LEN, STAGING_BUFFER_ADDR};

/// Identity strings reported by the bootloader at connect time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootloaderInfo {
    pub chip_id: String<MAX_REPLY_LEN>,
    pub version: String<MAX_REPLY_LEN>,
}

pub struct SambaClient<U, C> {
    uart: U,
    ctrl: C,
    config: LinkConfig,
    saved_baud: Option<u32>,
}

impl<U, C> SambaClient<U, C>
where
    U: SerialLink,
    C: ModeControl,
{
    pub fn new(uart: U, ctrl: C, config: LinkConfig) -> Self {
        Self {
            uart,
            ctrl,
            config,
            saved_baud: None,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn ctrl_mut(&mut self) -> &mut C {
        &mut self.ctrl
    }

    pub fn is_connected(&self) -> bool {
        self.saved_baud.is_some()
    }

    pub fn release(self) -> (U, C) {
        (self.uart, self.ctrl)
    }

    /// Force the secondary controller into its bootloader and open the link.
    pub fn connect(&mut self) -> Result<BootloaderInfo> {
        self.ctrl.enter_programming();
        self.ctrl.settle();

        let saved = self.uart.baud_rate().map_err(|_| {
            error!("Unable to read UART baud rate");
            UpdateError::WriteFailed
        })?;
        self.uart
            .set_baud_rate(self.config.bootloader_baud)
            .map_err(|_| {
                error!("Unable to switch UART to {} baud", self.config.bootloader_baud);
                UpdateError::WriteFailed
            })?;
        self.saved_baud = Some(saved);
        self.uart.clear().ok();

        // Binary mode: no '>' prompt. Only the framing comes back.
        self.send(Command::SetBinaryMode)?;
        let mut reply = [0u8; MAX_REPLY_LEN];
        self.read_line(&mut reply, self.config.short_timeout_ms)?;

        let chip_id = self.query(Command::ChipId)?;
        info!("ChipId: {}", chip_id.as_str());
        let version = self.query(Command::Version)?;
        info!("Bootloader: {}", version.as_str());

        Ok(BootloaderInfo { chip_id, version })
    }

    /// Erase flash from `addr` to the end of the device.
    pub fn erase(&mut self, addr: u32) -> Result<()> {
        self.exchange(Command::Erase { addr })
    }

    /// Stream `data` into the staging buffer at offset 0.
    pub fn load_buffer(&mut self, data: &[u8]) -> Result<()> {
        self.send(Command::LoadBuffer {
            addr: STAGING_BUFFER_ADDR,
            size: data.len() as u32,
        })?;
        self.uart.write_all(data).map_err(|_| {
            error!("Unable to load {} bytes into staging buffer", data.len());
            UpdateError::WriteFailed
        })
    }

    /// Commit `size` staged bytes to flash at `dst`.
    pub fn write_buffer(&mut self, dst: u32, size: u32) -> Result<()> {
        self.exchange(Command::SetCopySource {
            addr: STAGING_BUFFER_ADDR,
        })?;
        self.exchange(Command::CopyToFlash { dst, size })
    }

    /// Boot the application again and restore the steady-state link.
    pub fn disconnect(&mut self) -> Result<()> {
        self.ctrl.exit_programming();
        let Some(saved) = self.saved_baud.take() else {
            return Ok(());
        };
        let restored = self.uart.set_baud_rate(saved);
        self.uart.clear().ok();
        restored.map_err(|_| {
            warn!("Unable to restore UART baud rate {}", saved);
            UpdateError::WriteFailed
        })
    }

    fn send(&mut self, cmd: Command) -> Result<()> {
        let text = cmd.encode();
        debug!("SAM-BA >> {}", text.as_str());
        self.uart.write_all(text.as_bytes()).map_err(|_| {
            error!("Unable to send {}", text.as_str());
            UpdateError::WriteFailed
        })?;
        self.uart.flush().map_err(|_| UpdateError::WriteFailed)
    }

    /// Send a command and check its three-byte acknowledgment.
    fn exchange(&mut self, cmd: Command) -> Result<()> {
        self.send(cmd)?;
        let timeout = self.config.timeout_ms(cmd.deadline());
        let mut ack = [0u8; 3];
        let n = self
            .uart
            .read_timeout(&mut ack, timeout)
            .map_err(|_| UpdateError::ProtocolTimeout)?;
        if n == 0 {
            error!("{} timed out after {} ms", cmd.encode().as_str(), timeout);
            return Err(UpdateError::ProtocolTimeout);
        }
        match cmd.expected_ack() {
            Some(letter) if ack[0] != letter => {
                error!(
                    "{} answered 0x{:02x}, expected 0x{:02x}",
                    cmd.encode().as_str(),
                    ack[0],
                    letter
                );
                Err(UpdateError::ProtocolNack)
            }
            _ => Ok(()),
        }
    }

    fn query(&mut self, cmd: Command) -> Result<String<MAX_REPLY_LEN>> {
        self.send(cmd)?;
        let mut raw = [0u8; MAX_REPLY_LEN];
        let n = self.read_line(&mut raw, self.config.short_timeout_ms)?;
        let mut out = String::new();
        for &b in trim_reply(&raw[..n]) {
            // Identity lines are ASCII; anything else is shown as '?'.
            let c = if b.is_ascii() { b as char } else { '?' };
            if out.push(c).is_err() {
                break;
            }
        }
        if out.is_empty() {
            warn!("No reply to {}", cmd.encode().as_str());
        }
        Ok(out)
    }

    /// Read until the `\n\r` terminator, a full buffer, or a silent deadline.
    fn read_line(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        let mut len = 0;
        while len < buf.len() {
            let n = self
                .uart
                .read_timeout(&mut buf[len..len + 1], timeout_ms)
                .map_err(|_| UpdateError::ProtocolTimeout)?;
            if n == 0 {
                break;
            }
            len += n;
            if len >= 2 && buf[len - 2] == b'\n' && buf[len - 1] == b'\r' {
                break;
            }
        }
        Ok(len)
    }
}
