// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware update core for a WiFi main controller paired with a secondary
//! microcontroller reached through a SAM-BA style serial bootloader.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` + `alloc`, for the main controller firmware
//! - `std` feature: Enables `std` support (host tools, std-hosted firmware)
//! - `defmt` / `log` features: select the logging backend
//!
//! Four update targets share one `begin`/`write`/`end`/`abort` lifecycle:
//! the application slot ([`app`]), two filesystem partitions ([`fs_writer`])
//! and the secondary controller flash ([`secondary`]). The
//! [`dispatcher`] picks one by [`Target`] and streams chunks through it.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub(crate) mod fmt;

pub mod app;
pub mod bridge;
pub mod ctrl;
pub mod dispatcher;
pub mod error;
pub mod fs_writer;
pub mod link;
pub mod partition;
pub mod protocol;
pub mod provision;
pub mod samba;
pub mod secondary;
mod unit_buffer;
pub mod writer;

// Re-export commonly used types
pub use app::{AppUpdater, ImageState, ImageVersion, OtaPlatform, Validation};
pub use bridge::UartBridge;
pub use ctrl::{ModeControl, ModeFlag, ResetController};
pub use dispatcher::{ProgressCallbacks, UpdateDispatcher, UpdateSession};
pub use error::{Result, UpdateError};
pub use fs_writer::{MountControl, PartitionWriter};
pub use link::SerialLink;
pub use partition::{FsKind, Partition, PartitionKind, Target};
pub use protocol::{LinkConfig, SECONDARY_FLASH_SIZE, STAGING_UNIT_SIZE};
pub use samba::{BootloaderInfo, SambaClient};
pub use secondary::SecondaryWriter;
pub use writer::UpdateWriter;
