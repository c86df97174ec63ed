// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! SAM-BA serial bootloader command set and link constants.
//!
//! Commands are ASCII, `#`-terminated, with addresses and sizes as eight
//! upper-case hex digits. Flash-touching commands answer with their own
//! command letter followed by `\n\r`.

use core::fmt::Write as _;
use heapless::String;
use serde::{Deserialize, Serialize};

// --- Secondary controller flash layout ---

pub const SECONDARY_FLASH_PAGE_SIZE: u32 = 2048;
pub const SECONDARY_FLASH_NUM_PAGES: u32 = 128;
pub const SECONDARY_FLASH_SIZE: u32 = SECONDARY_FLASH_NUM_PAGES * SECONDARY_FLASH_PAGE_SIZE; // 256KB

/// Bootloader staging buffer size; every load/commit moves exactly this much.
pub const STAGING_UNIT_SIZE: usize = 4096;
/// Staging buffer offset inside the bootloader (no applet loaded).
pub const STAGING_BUFFER_ADDR: u32 = 0;

// --- Link parameters ---

pub const APPLICATION_BAUD_RATE: u32 = 115_200;
pub const BOOTLOADER_BAUD_RATE: u32 = 230_400;

pub const SHORT_TIMEOUT_MS: u32 = 1000;
pub const LONG_TIMEOUT_MS: u32 = 5000;
/// Reset pulse width and bootloader start-up wait.
pub const SETTLE_DELAY_MS: u32 = 100;

/// Longest reply line kept from identity queries.
pub const MAX_REPLY_LEN: usize = 64;

// --- Provisioning ---

pub const FIRST_BOOT_SENTINEL: &str = "/littlefs/firstBoot";
pub const DEFAULT_FIRMWARE_IMAGE: &str = "/littlefs/firmware.bin";

/// Runtime link parameters, defaulting to the constants above.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    pub bootloader_baud: u32,
    pub short_timeout_ms: u32,
    pub long_timeout_ms: u32,
    pub settle_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bootloader_baud: BOOTLOADER_BAUD_RATE,
            short_timeout_ms: SHORT_TIMEOUT_MS,
            long_timeout_ms: LONG_TIMEOUT_MS,
            settle_ms: SETTLE_DELAY_MS,
        }
    }
}

/// Longest encoded command: `S` + 8 hex + `,` + 8 hex + `#`.
pub const MAX_COMMAND_LEN: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `N#`: binary mode, no `>` prompt.
    SetBinaryMode,
    /// `I#`: chip identity line.
    ChipId,
    /// `V#`: bootloader version line.
    Version,
    /// `X{addr}#`: erase flash from `addr` to the end.
    Erase { addr: u32 },
    /// `S{addr},{size}#` followed by `size` raw bytes into the staging buffer.
    LoadBuffer { addr: u32, size: u32 },
    /// `Y{addr},0#`: select the staging buffer offset to copy from.
    SetCopySource { addr: u32 },
    /// `Y{dst},{size}#`: copy `size` staged bytes into flash at `dst`.
    CopyToFlash { dst: u32, size: u32 },
}

/// Which deadline an exchange uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    Short,
    Long,
}

impl Command {
    /// Render the command text.
    pub fn encode(&self) -> String<MAX_COMMAND_LEN> {
        let mut out = String::new();
        // Every variant fits MAX_COMMAND_LEN, so the write cannot overflow.
        let _ = match *self {
            Self::SetBinaryMode => out.write_str("N#"),
            Self::ChipId => out.write_str("I#"),
            Self::Version => out.write_str("V#"),
            Self::Erase { addr } => write!(out, "X{:08X}#", addr),
            Self::LoadBuffer { addr, size } => write!(out, "S{:08X},{:08X}#", addr, size),
            Self::SetCopySource { addr } => write!(out, "Y{:08X},0#", addr),
            Self::CopyToFlash { dst, size } => write!(out, "Y{:08X},{:08X}#", dst, size),
        };
        out
    }

    /// Leading byte of the acknowledgment, for commands that send one.
    pub fn expected_ack(&self) -> Option<u8> {
        match self {
            Self::Erase { .. } => Some(b'X'),
            Self::SetCopySource { .. } | Self::CopyToFlash { .. } => Some(b'Y'),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Deadline {
        match self {
            Self::Erase { .. } | Self::CopyToFlash { .. } => Deadline::Long,
            _ => Deadline::Short,
        }
    }
}

impl LinkConfig {
    pub fn timeout_ms(&self, deadline: Deadline) -> u32 {
        match deadline {
            Deadline::Short => self.short_timeout_ms,
            Deadline::Long => self.long_timeout_ms,
        }
    }
}

/// Strip the `\n\r` framing (in either order) and surrounding blanks.
pub fn trim_reply(raw: &[u8]) -> &[u8] {
    let start = raw
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(raw.len());
    let end = raw
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &raw[start..end]
}
