// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update failure reasons shared by every writer.

use core::fmt;
use serde::{Deserialize, Serialize};

pub type Result<T, E = UpdateError> = core::result::Result<T, E>;

/// Machine-readable reason an update operation failed.
///
/// User-facing text is the transport's job; the core only reports the
/// reason (see [`UpdateError::reason_code`]) and logs one diagnostic line.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateError {
    /// Unknown target selector.
    InvalidTarget,
    /// No partition available to receive the image.
    NoUpdatePartition,
    /// Declared image length exceeds the target partition.
    ImageTooLarge,
    /// A write would run past the end of the partition.
    OutOfSpace,
    /// First application chunk does not hold the whole image header.
    HeaderTooShort,
    /// Image version matches the last image that failed to boot.
    KnownBadVersion,
    /// Image version matches the running firmware.
    NoChange,
    /// Bootloader did not answer before the deadline.
    ProtocolTimeout,
    /// Bootloader answered with an unexpected acknowledgment.
    ProtocolNack,
    /// Erasing the medium failed.
    EraseFailed,
    /// Writing the medium (or the link carrying it) failed.
    WriteFailed,
    /// Image committed but the boot pointer was not updated; retry `end`.
    BootPartitionNotSet,
    /// A session is already open on this target.
    SessionActive,
    /// The session was already ended or aborted.
    SessionClosed,
    /// Local image file missing or unreadable.
    ImageUnreadable,
}

impl UpdateError {
    /// Stable numeric code reported to the transport.
    pub const fn reason_code(self) -> u8 {
        match self {
            Self::InvalidTarget => 1,
            Self::NoUpdatePartition => 2,
            Self::ImageTooLarge => 3,
            Self::OutOfSpace => 4,
            Self::HeaderTooShort => 5,
            Self::KnownBadVersion => 6,
            Self::NoChange => 7,
            Self::ProtocolTimeout => 8,
            Self::ProtocolNack => 9,
            Self::EraseFailed => 10,
            Self::WriteFailed => 11,
            Self::BootPartitionNotSet => 12,
            Self::SessionActive => 13,
            Self::SessionClosed => 14,
            Self::ImageUnreadable => 15,
        }
    }

    /// Stable snake_case name, suitable for JSON status replies.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTarget => "invalid_target",
            Self::NoUpdatePartition => "no_update_partition",
            Self::ImageTooLarge => "image_too_large",
            Self::OutOfSpace => "out_of_space",
            Self::HeaderTooShort => "header_too_short",
            Self::KnownBadVersion => "known_bad_version",
            Self::NoChange => "no_change",
            Self::ProtocolTimeout => "protocol_timeout",
            Self::ProtocolNack => "protocol_nack",
            Self::EraseFailed => "erase_failed",
            Self::WriteFailed => "write_failed",
            Self::BootPartitionNotSet => "boot_partition_not_set",
            Self::SessionActive => "session_active",
            Self::SessionClosed => "session_closed",
            Self::ImageUnreadable => "image_unreadable",
        }
    }

    /// Whether the failure happened before anything touched flash.
    pub const fn is_precondition(self) -> bool {
        matches!(
            self,
            Self::InvalidTarget
                | Self::NoUpdatePartition
                | Self::ImageTooLarge
                | Self::OutOfSpace
                | Self::HeaderTooShort
                | Self::KnownBadVersion
                | Self::NoChange
                | Self::SessionActive
                | Self::SessionClosed
        )
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.reason_code())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UpdateError {}
