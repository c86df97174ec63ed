// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! One-time provisioning of the secondary controller on first boot.
//!
//! An empty sentinel file marks the first boot. The default image is then
//! flashed once and the sentinel removed, whether flashing worked or not.

use crate::ctrl::ModeControl;
use crate::error::{Result, UpdateError};
use crate::fmt::{error, info, warn};
use crate::link::SerialLink;
use crate::secondary::SecondaryWriter;

/// Storage holding the sentinel and the default image.
pub trait ProvisionStore {
    type Image: embedded_io::Read;

    fn sentinel_present(&mut self) -> bool;
    /// Open the default image, returning it with its length in bytes.
    fn open_image(&mut self) -> Option<(Self::Image, u32)>;
    fn remove_sentinel(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Provisioning {
    /// Not a first boot; the secondary controller was restarted.
    Skipped,
    Flashed,
    Failed(UpdateError),
}

/// Start-up handling of the secondary controller.
pub fn first_boot<S, U, C>(store: &mut S, writer: &mut SecondaryWriter<U, C>) -> Provisioning
where
    S: ProvisionStore,
    U: SerialLink,
    C: ModeControl,
{
    if !store.sentinel_present() {
        writer.restart();
        return Provisioning::Skipped;
    }

    info!("First boot, flashing default secondary controller image");
    let result = flash_default(store, writer);
    if !store.remove_sentinel() {
        warn!("Unable to remove first boot sentinel");
    }
    match result {
        Ok(()) => Provisioning::Flashed,
        Err(e) => {
            error!("First boot flashing failed: {}", e.as_str());
            Provisioning::Failed(e)
        }
    }
}

fn flash_default<S, U, C>(store: &mut S, writer: &mut SecondaryWriter<U, C>) -> Result<()>
where
    S: ProvisionStore,
    U: SerialLink,
    C: ModeControl,
{
    let (mut image, len) = store.open_image().ok_or_else(|| {
        error!("Unable to open default image");
        UpdateError::ImageUnreadable
    })?;
    info!("Default image is {} bytes", len);
    writer.flash_image(&mut image, len, &mut ())
}

#[cfg(feature = "std")]
pub use self::fs::FsProvisionStore;

#[cfg(feature = "std")]
mod fs {
    use std::fs::File;
    use std::path::PathBuf;

    use embedded_io_adapters::std::FromStd;

    use super::ProvisionStore;
    use crate::protocol::{DEFAULT_FIRMWARE_IMAGE, FIRST_BOOT_SENTINEL};

    /// Sentinel and image as plain files.
    pub struct FsProvisionStore {
        sentinel: PathBuf,
        image: PathBuf,
    }

    impl FsProvisionStore {
        pub fn new(sentinel: impl Into<PathBuf>, image: impl Into<PathBuf>) -> Self {
            Self {
                sentinel: sentinel.into(),
                image: image.into(),
            }
        }
    }

    impl Default for FsProvisionStore {
        fn default() -> Self {
            Self::new(FIRST_BOOT_SENTINEL, DEFAULT_FIRMWARE_IMAGE)
        }
    }

    impl ProvisionStore for FsProvisionStore {
        type Image = FromStd<File>;

        fn sentinel_present(&mut self) -> bool {
            self.sentinel.exists()
        }

        fn open_image(&mut self) -> Option<(Self::Image, u32)> {
            let file = File::open(&self.image).ok()?;
            let len = u32::try_from(file.metadata().ok()?.len()).ok()?;
            Some((FromStd::new(file), len))
        }

        fn remove_sentinel(&mut self) -> bool {
            std::fs::remove_file(&self.sentinel).is_ok()
        }
    }
}
