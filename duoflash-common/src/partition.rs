// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Partition descriptors and update target selectors.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::UpdateError;
use crate::protocol::{SECONDARY_FLASH_PAGE_SIZE, SECONDARY_FLASH_SIZE};

/// Filesystem image flavour held by a data partition.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FsKind {
    LittleFs,
    Spiffs,
}

impl FsKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LittleFs => "littlefs",
            Self::Spiffs => "spiffs",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PartitionKind {
    /// Application slot (`ota_N`).
    App { slot: u8 },
    /// Filesystem data partition.
    Data(FsKind),
    /// Secondary controller flash, reached over the bootloader link.
    Secondary,
}

/// A contiguous region of persistent storage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Partition {
    pub kind: PartitionKind,
    /// Absolute offset on the medium.
    pub offset: u32,
    pub size: u32,
    pub erase_size: u32,
}

impl Partition {
    /// Virtual descriptor of the secondary controller flash.
    pub const SECONDARY: Partition = Partition {
        kind: PartitionKind::Secondary,
        offset: 0,
        size: SECONDARY_FLASH_SIZE,
        erase_size: SECONDARY_FLASH_PAGE_SIZE,
    };

    /// Whether `len` more bytes fit after `cursor`.
    pub fn fits(&self, cursor: u32, len: usize) -> bool {
        (cursor as u64) + (len as u64) <= self.size as u64
    }
}

/// What an update writes to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    Application,
    Filesystem(FsKind),
    Secondary,
}

impl Target {
    pub const ALL: [Target; 4] = [
        Target::Application,
        Target::Filesystem(FsKind::LittleFs),
        Target::Filesystem(FsKind::Spiffs),
        Target::Secondary,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Application => "app",
            Self::Filesystem(kind) => kind.as_str(),
            Self::Secondary => "mcu",
        }
    }

    /// Dense index, one slot per target.
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Application => 0,
            Self::Filesystem(FsKind::LittleFs) => 1,
            Self::Filesystem(FsKind::Spiffs) => 2,
            Self::Secondary => 3,
        }
    }
}

impl TryFrom<u8> for Target {
    type Error = UpdateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Application),
            1 => Ok(Self::Filesystem(FsKind::LittleFs)),
            2 => Ok(Self::Secondary),
            3 => Ok(Self::Filesystem(FsKind::Spiffs)),
            _ => Err(UpdateError::InvalidTarget),
        }
    }
}

impl From<Target> for u8 {
    fn from(target: Target) -> u8 {
        match target {
            Target::Application => 0,
            Target::Filesystem(FsKind::LittleFs) => 1,
            Target::Secondary => 2,
            Target::Filesystem(FsKind::Spiffs) => 3,
        }
    }
}

impl FromStr for Target {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(UpdateError::InvalidTarget)
    }
}
