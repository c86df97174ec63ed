// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Main controller application update into the inactive boot slot.
//!
//! Session states: `HeaderPending -> Writing -> {Committed | Aborted}`.
//! The first chunk must carry the whole image header so the new version
//! can be checked before anything is written:
//! - equal to the last image that failed to boot: [`UpdateError::KnownBadVersion`]
//! - equal to the running image: [`UpdateError::NoChange`]
//!
//! Committing means switching the boot partition; if that fails after the
//! image was closed, `end` reports [`UpdateError::BootPartitionNotSet`] and
//! may be called again.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdateError};
use crate::fmt::{debug, error, info, warn};
use crate::partition::Partition;
use crate::unit_buffer::UnitBuffer;
use crate::writer::UpdateWriter;

/// Image header layout: image header, first segment header, app descriptor.
pub const IMAGE_HEADER_LEN: usize = 24;
pub const SEGMENT_HEADER_LEN: usize = 8;
pub const APP_DESC_LEN: usize = 256;
pub const HEADER_PROBE_LEN: usize = IMAGE_HEADER_LEN + SEGMENT_HEADER_LEN + APP_DESC_LEN;

/// `version` field of the app descriptor (after magic, secure version, reserved).
pub const APP_DESC_VERSION_OFFSET: usize = 16;
pub const VERSION_LEN: usize = 32;
const VERSION_OFFSET: usize = IMAGE_HEADER_LEN + SEGMENT_HEADER_LEN + APP_DESC_VERSION_OFFSET;

/// Fixed-width, NUL padded version field of an app descriptor.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ImageVersion([u8; VERSION_LEN]);

impl ImageVersion {
    pub fn from_bytes(raw: &[u8]) -> Self {
        let mut field = [0u8; VERSION_LEN];
        let n = raw.len().min(VERSION_LEN);
        field[..n].copy_from_slice(&raw[..n]);
        Self(field)
    }

    /// Read the version out of the leading bytes of an image.
    pub fn from_image(image: &[u8]) -> Option<Self> {
        if image.len() < HEADER_PROBE_LEN {
            return None;
        }
        Some(Self::from_bytes(
            &image[VERSION_OFFSET..VERSION_OFFSET + VERSION_LEN],
        ))
    }

    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(VERSION_LEN);
        core::str::from_utf8(&self.0[..end]).unwrap_or("?")
    }
}

impl fmt::Debug for ImageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageVersion({:?})", self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ImageVersion {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// Boot state of an application slot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageState {
    New,
    PendingVerify,
    Valid,
    Invalid,
    Aborted,
    Undefined,
}

/// Outcome of the start-up diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Validation {
    /// Running image was not awaiting verification.
    NotPending,
    /// Rollback cancelled, running image kept.
    Confirmed,
    /// Running image marked invalid; the platform reboots into the previous one.
    RolledBack,
}

/// Partition table and OTA services of the main controller.
pub trait OtaPlatform {
    type Handle;

    /// Application slot that is not the current boot slot.
    fn next_update_partition(&mut self) -> Option<Partition>;
    fn running_partition(&mut self) -> Option<Partition>;
    /// Slot whose image last failed to boot and was rolled back.
    fn last_invalid_partition(&mut self) -> Option<Partition>;
    fn partition_version(&mut self, partition: &Partition) -> Option<ImageVersion>;

    fn ota_begin(&mut self, partition: &Partition) -> Result<Self::Handle>;
    fn ota_write(&mut self, handle: &mut Self::Handle, data: &[u8]) -> Result<()>;
    fn ota_end(&mut self, handle: Self::Handle) -> Result<()>;
    fn ota_abort(&mut self, handle: Self::Handle);
    fn set_boot_partition(&mut self, partition: &Partition) -> Result<()>;

    fn running_state(&mut self) -> Option<ImageState>;
    fn mark_valid_cancel_rollback(&mut self);
    fn mark_invalid_rollback_and_reboot(&mut self);
}

enum AppState<H> {
    HeaderPending,
    Writing(H),
    /// Image closed, boot partition still to be switched.
    BootPending,
    Closed,
}

pub struct AppSession<H> {
    partition: Partition,
    state: AppState<H>,
    buffer: Option<UnitBuffer>,
}

impl<H> AppSession<H> {
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Whether the header passed and the write path is open.
    pub fn is_writing(&self) -> bool {
        matches!(self.state, AppState::Writing(_))
    }

    pub fn cursor(&self) -> u32 {
        self.buffer.as_ref().map_or(0, UnitBuffer::cursor)
    }
}

pub struct AppUpdater<P> {
    platform: P,
}

impl<P: OtaPlatform> AppUpdater<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Start-up check of a freshly booted image, run once per boot.
    pub fn validate(&mut self, diagnostic_passed: bool) -> Validation {
        if self.platform.running_state() != Some(ImageState::PendingVerify) {
            return Validation::NotPending;
        }
        if diagnostic_passed {
            info!("Diagnostics completed successfully! Continuing execution ...");
            self.platform.mark_valid_cancel_rollback();
            Validation::Confirmed
        } else {
            error!("Diagnostics failed! Start rollback to the previous version ...");
            self.platform.mark_invalid_rollback_and_reboot();
            Validation::RolledBack
        }
    }

    fn check_header(&mut self, chunk: &[u8]) -> Result<()> {
        let Some(new_version) = ImageVersion::from_image(chunk) else {
            error!(
                "Not enough data received to check header ({} < {})",
                chunk.len(),
                HEADER_PROBE_LEN
            );
            return Err(UpdateError::HeaderTooShort);
        };
        info!("New firmware version: {}", new_version.as_str());

        let running_version = self
            .platform
            .running_partition()
            .and_then(|p| self.platform.partition_version(&p));
        if let Some(v) = &running_version {
            info!("Running firmware version: {}", v.as_str());
        }

        if let Some(invalid) = self.platform.last_invalid_partition() {
            if let Some(bad) = self.platform.partition_version(&invalid) {
                info!("Last invalid firmware version: {}", bad.as_str());
                if bad == new_version {
                    warn!("New version is the same as the one that was rolled back");
                    return Err(UpdateError::KnownBadVersion);
                }
            }
        }

        if running_version == Some(new_version) {
            warn!("Running version is the same as the new one, not updating");
            return Err(UpdateError::NoChange);
        }
        Ok(())
    }

    fn commit(&mut self, session: &mut AppSession<P::Handle>) -> Result<()> {
        self.platform
            .set_boot_partition(&session.partition)
            .map_err(|_| {
                error!("Unable to set boot partition @ 0x{:08x}", session.partition.offset);
                UpdateError::BootPartitionNotSet
            })?;
        session.state = AppState::Closed;
        info!("Application update succeeded");
        Ok(())
    }
}

impl<P: OtaPlatform> UpdateWriter for AppUpdater<P> {
    type Session = AppSession<P::Handle>;

    fn partition(&mut self) -> Result<Partition> {
        self.platform.next_update_partition().ok_or_else(|| {
            error!("Unable to identify an update partition");
            UpdateError::NoUpdatePartition
        })
    }

    fn begin(&mut self) -> Result<Self::Session> {
        let partition = self.partition()?;
        info!("Writing to application partition at offset 0x{:08x}", partition.offset);
        Ok(AppSession {
            partition,
            state: AppState::HeaderPending,
            buffer: Some(UnitBuffer::new(partition.erase_size as usize)),
        })
    }

    fn write(&mut self, session: &mut Self::Session, data: &[u8]) -> Result<()> {
        let cursor = match (&session.state, &session.buffer) {
            (AppState::HeaderPending | AppState::Writing(_), Some(buffer)) => buffer.cursor(),
            _ => return Err(UpdateError::SessionClosed),
        };
        if !session.partition.fits(cursor, data.len()) {
            error!("Not enough space left in application partition");
            return Err(UpdateError::OutOfSpace);
        }

        if matches!(session.state, AppState::HeaderPending) {
            self.check_header(data)?;
            let handle = self.platform.ota_begin(&session.partition).map_err(|e| {
                error!("ota_begin failed");
                e
            })?;
            session.state = AppState::Writing(handle);
        }

        let (AppState::Writing(handle), Some(buffer)) = (&mut session.state, &mut session.buffer)
        else {
            return Err(UpdateError::SessionClosed);
        };
        let platform = &mut self.platform;
        buffer.push(data, |_, unit| platform.ota_write(handle, unit))?;
        debug!("Written image length {}", buffer.cursor());
        Ok(())
    }

    fn end(&mut self, session: &mut Self::Session) -> Result<()> {
        match core::mem::replace(&mut session.state, AppState::Closed) {
            AppState::Writing(mut handle) => {
                let mut buffer = session.buffer.take();
                let flushed = match buffer.as_mut().and_then(|b| b.padded_tail()) {
                    Some((_, unit)) => self.platform.ota_write(&mut handle, unit),
                    None => Ok(()),
                };
                drop(buffer);
                if let Err(e) = flushed {
                    self.platform.ota_abort(handle);
                    return Err(e);
                }
                self.platform.ota_end(handle).map_err(|e| {
                    error!("ota_end failed");
                    e
                })?;
                session.state = AppState::BootPending;
                self.commit(session)
            }
            AppState::BootPending => {
                session.state = AppState::BootPending;
                self.commit(session)
            }
            // No write path was ever opened: nothing to commit.
            AppState::HeaderPending | AppState::Closed => {
                session.buffer = None;
                Ok(())
            }
        }
    }

    fn abort(&mut self, session: &mut Self::Session) {
        session.buffer = None;
        if let AppState::Writing(handle) = core::mem::replace(&mut session.state, AppState::Closed)
        {
            self.platform.ota_abort(handle);
            info!("Application update aborted");
        }
    }
}
