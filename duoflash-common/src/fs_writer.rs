// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Raw image writer for local filesystem partitions.
//!
//! Writes are regrouped into erase-sector sized units; each unit is erased
//! then programmed in place. The final partial unit is only padded up to the
//! flash write granularity, with the erased value.

use embedded_storage::nor_flash::NorFlash;

use crate::error::{Result, UpdateError};
use crate::fmt::{error, info};
use crate::partition::{FsKind, Partition};
use crate::unit_buffer::UnitBuffer;
use crate::writer::UpdateWriter;

/// Value of an erased NOR flash byte.
const ERASED: u8 = 0xFF;

/// Mount collaborator of a filesystem partition.
pub trait MountControl {
    /// The medium is about to be overwritten.
    fn unmount(&mut self, kind: FsKind);
    fn remount(&mut self, kind: FsKind);
}

pub struct PartitionSession {
    partition: Partition,
    buffer: Option<UnitBuffer>,
}

impl PartitionSession {
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Bytes accepted so far.
    pub fn cursor(&self) -> u32 {
        self.buffer.as_ref().map_or(0, UnitBuffer::cursor)
    }

    pub fn is_open(&self) -> bool {
        self.buffer.is_some()
    }
}

pub struct PartitionWriter<F, M> {
    kind: FsKind,
    partition: Option<Partition>,
    flash: F,
    mount: M,
}

impl<F, M> PartitionWriter<F, M>
where
    F: NorFlash,
    M: MountControl,
{
    /// `partition` is the table entry for `kind`, `None` if the table has none.
    pub fn new(kind: FsKind, partition: Option<Partition>, flash: F, mount: M) -> Self {
        Self {
            kind,
            partition,
            flash,
            mount,
        }
    }

    pub fn kind(&self) -> FsKind {
        self.kind
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn mount(&self) -> &M {
        &self.mount
    }

    fn program(flash: &mut F, partition: &Partition, offset: u32, data: &[u8]) -> Result<()> {
        let addr = partition.offset + offset;
        flash
            .erase(addr, addr + partition.erase_size)
            .map_err(|_| {
                error!("Unable to erase sector @ 0x{:08x}", addr);
                UpdateError::EraseFailed
            })?;
        flash.write(addr, data).map_err(|_| {
            error!("Unable to write sector @ 0x{:08x}", addr);
            UpdateError::WriteFailed
        })
    }
}

impl<F, M> UpdateWriter for PartitionWriter<F, M>
where
    F: NorFlash,
    M: MountControl,
{
    type Session = PartitionSession;

    fn partition(&mut self) -> Result<Partition> {
        self.partition.ok_or_else(|| {
            error!("No {} partition found", self.kind.as_str());
            UpdateError::NoUpdatePartition
        })
    }

    fn begin(&mut self) -> Result<PartitionSession> {
        let partition = self.partition()?;
        let buffer = UnitBuffer::new(partition.erase_size as usize);
        self.mount.unmount(self.kind);
        info!(
            "Writing {} partition at offset 0x{:08x} (size = 0x{:08x})",
            self.kind.as_str(),
            partition.offset,
            partition.size
        );
        Ok(PartitionSession {
            partition,
            buffer: Some(buffer),
        })
    }

    fn write(&mut self, session: &mut PartitionSession, data: &[u8]) -> Result<()> {
        let partition = session.partition;
        let buffer = session.buffer.as_mut().ok_or(UpdateError::SessionClosed)?;
        if !partition.fits(buffer.cursor(), data.len()) {
            error!("Not enough space left on {} partition", self.kind.as_str());
            return Err(UpdateError::OutOfSpace);
        }
        let flash = &mut self.flash;
        buffer
            .push(data, |offset, unit| {
                Self::program(flash, &partition, offset, unit)
            })
            .map_err(|e| {
                error!(
                    "{} write stopped at 0x{:08x} with {} bytes pending",
                    self.kind.as_str(),
                    buffer.offset(),
                    buffer.fill()
                );
                e
            })
    }

    fn end(&mut self, session: &mut PartitionSession) -> Result<()> {
        let Some(mut buffer) = session.buffer.take() else {
            return Ok(());
        };
        let result = match buffer.tail(F::WRITE_SIZE, ERASED) {
            Some((offset, tail)) => {
                Self::program(&mut self.flash, &session.partition, offset, tail)
            }
            None => Ok(()),
        };
        drop(buffer);
        self.mount.remount(self.kind);
        if result.is_ok() {
            info!("{} update succeeded", self.kind.as_str());
        }
        result
    }

    fn abort(&mut self, session: &mut PartitionSession) {
        if session.buffer.take().is_some() {
            self.mount.remount(self.kind);
            info!("{} update aborted", self.kind.as_str());
        }
    }
}
