// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Reset and boot-mode control of the secondary controller.
//!
//! A single low pulse on the reset line boots the application. Two pulses
//! separated by the settle delay start the bootloader instead.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, StatefulOutputPin};

use crate::fmt::info;
use crate::protocol::SETTLE_DELAY_MS;

/// Shared "bootloader owns the UART" flag.
///
/// Cloned into the UART forwarding path, which must stay silent while set.
#[derive(Clone, Debug, Default)]
pub struct ModeFlag(Arc<AtomicBool>);

impl ModeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_programming(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, programming: bool) {
        self.0.store(programming, Ordering::Release);
    }
}

/// Operations the bootloader client needs from the reset lines.
pub trait ModeControl {
    /// Single reset pulse.
    fn restart(&mut self);
    /// Double reset pulse; the secondary controller comes up in its bootloader.
    fn enter_programming(&mut self);
    /// Single reset pulse back into the application.
    fn exit_programming(&mut self);
    fn is_programming(&self) -> bool;
    /// Wait one settle delay.
    fn settle(&mut self);
}

impl<T: ModeControl + ?Sized> ModeControl for &mut T {
    fn restart(&mut self) {
        T::restart(self)
    }

    fn enter_programming(&mut self) {
        T::enter_programming(self)
    }

    fn exit_programming(&mut self) {
        T::exit_programming(self)
    }

    fn is_programming(&self) -> bool {
        T::is_programming(self)
    }

    fn settle(&mut self) {
        T::settle(self)
    }
}

/// Drives the reset and boot-select lines.
pub struct ResetController<R, B, D> {
    reset: R,
    boot: B,
    delay: D,
    settle_ms: u32,
    mode: ModeFlag,
}

impl<R, B, D> ResetController<R, B, D>
where
    R: StatefulOutputPin,
    B: OutputPin,
    D: DelayNs,
{
    /// Take the lines: boot-select high, reset held low until the first
    /// [`restart`](ModeControl::restart).
    pub fn new(mut reset: R, mut boot: B, delay: D) -> Self {
        boot.set_high().ok();
        reset.set_low().ok();
        Self {
            reset,
            boot,
            delay,
            settle_ms: SETTLE_DELAY_MS,
            mode: ModeFlag::new(),
        }
    }

    pub fn with_settle_ms(mut self, settle_ms: u32) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    /// Handle for the forwarding path.
    pub fn mode_flag(&self) -> ModeFlag {
        self.mode.clone()
    }

    /// Current level of the reset line.
    pub fn reset_is_high(&mut self) -> bool {
        self.reset.is_set_high().unwrap_or(false)
    }

    pub fn set_boot_select(&mut self, high: bool) {
        if high {
            self.boot.set_high().ok();
        } else {
            self.boot.set_low().ok();
        }
    }

    pub fn toggle_reset(&mut self) {
        self.reset.toggle().ok();
    }

    pub fn release(self) -> (R, B, D) {
        (self.reset, self.boot, self.delay)
    }
}

impl<R, B, D> ModeControl for ResetController<R, B, D>
where
    R: StatefulOutputPin,
    B: OutputPin,
    D: DelayNs,
{
    fn restart(&mut self) {
        info!("Reset secondary controller");
        self.reset.set_low().ok();
        self.delay.delay_ms(self.settle_ms);
        self.reset.set_high().ok();
    }

    fn enter_programming(&mut self) {
        info!("Enter programming mode");
        self.mode.set(true);
        self.restart();
        self.delay.delay_ms(self.settle_ms);
        self.restart();
    }

    fn exit_programming(&mut self) {
        info!("Exit programming mode");
        self.restart();
        self.mode.set(false);
    }

    fn is_programming(&self) -> bool {
        self.mode.is_programming()
    }

    fn settle(&mut self) {
        self.delay.delay_ms(self.settle_ms);
    }
}
