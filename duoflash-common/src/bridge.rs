// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Steady-state byte forwarding between the host side and the secondary
//! controller application. Silent while the bootloader owns the UART.

use crate::ctrl::ModeFlag;
use crate::link::SerialLink;

pub struct UartBridge<U> {
    uart: U,
    mode: ModeFlag,
    rx_timeout_ms: u32,
}

impl<U: SerialLink> UartBridge<U> {
    /// `mode` comes from [`ResetController::mode_flag`](crate::ResetController::mode_flag).
    pub fn new(uart: U, mode: ModeFlag) -> Self {
        Self {
            uart,
            mode,
            rx_timeout_ms: 0,
        }
    }

    pub fn with_rx_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.rx_timeout_ms = timeout_ms;
        self
    }

    pub fn is_suspended(&self) -> bool {
        self.mode.is_programming()
    }

    /// Bytes received from the secondary controller application.
    ///
    /// Returns `Ok(0)` without touching the UART while programming.
    pub fn forward_rx(&mut self, buf: &mut [u8]) -> Result<usize, U::Error> {
        if self.is_suspended() {
            return Ok(0);
        }
        self.uart.read_timeout(buf, self.rx_timeout_ms)
    }

    /// Send bytes to the secondary controller application.
    ///
    /// Drops them and returns `Ok(0)` while programming.
    pub fn forward_tx(&mut self, bytes: &[u8]) -> Result<usize, U::Error> {
        if self.is_suspended() {
            return Ok(0);
        }
        self.uart.write_all(bytes)?;
        Ok(bytes.len())
    }

    pub fn release(self) -> U {
        self.uart
    }
}
