// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Secondary controller flash writer.
//!
//! Same buffering as the partition writer, with the bootloader staging
//! buffer as unit. The remote side only accepts full units, so the final
//! partial unit is zero-padded.

use alloc::vec;

use crate::ctrl::ModeControl;
use crate::dispatcher::ProgressCallbacks;
use crate::error::{Result, UpdateError};
use crate::fmt::{error, info};
use crate::link::SerialLink;
use crate::partition::Partition;
use crate::protocol::{LinkConfig, STAGING_UNIT_SIZE};
use crate::samba::SambaClient;
use crate::unit_buffer::UnitBuffer;
use crate::writer::UpdateWriter;

pub struct SecondarySession {
    buffer: Option<UnitBuffer>,
}

impl SecondarySession {
    /// Bytes accepted so far.
    pub fn cursor(&self) -> u32 {
        self.buffer.as_ref().map_or(0, UnitBuffer::cursor)
    }

    pub fn is_open(&self) -> bool {
        self.buffer.is_some()
    }
}

pub struct SecondaryWriter<U, C> {
    client: SambaClient<U, C>,
}

impl<U, C> SecondaryWriter<U, C>
where
    U: SerialLink,
    C: ModeControl,
{
    pub fn new(uart: U, ctrl: C, config: LinkConfig) -> Self {
        Self {
            client: SambaClient::new(uart, ctrl, config),
        }
    }

    pub fn client_mut(&mut self) -> &mut SambaClient<U, C> {
        &mut self.client
    }

    pub fn release(self) -> (U, C) {
        self.client.release()
    }

    /// Single reset pulse so the secondary controller runs its application.
    pub fn restart(&mut self) {
        self.client.ctrl_mut().restart();
    }

    fn flush_unit(client: &mut SambaClient<U, C>, offset: u32, unit: &[u8]) -> Result<()> {
        client.load_buffer(unit).map_err(|e| {
            error!("Unable to load buffer @ 0x{:08x}", offset);
            e
        })?;
        client.write_buffer(offset, unit.len() as u32).map_err(|e| {
            error!("Unable to write buffer to flash @ 0x{:08x}", offset);
            e
        })
    }

    /// Flash a whole image read from `image`, `len` bytes long.
    ///
    /// Reads one staging unit at a time; a short read is the last chunk.
    pub fn flash_image<R, P>(&mut self, image: &mut R, len: u32, progress: &mut P) -> Result<()>
    where
        R: embedded_io::Read,
        P: ProgressCallbacks,
    {
        if len > Partition::SECONDARY.size {
            error!("Image too large: {} bytes", len);
            return Err(UpdateError::ImageTooLarge);
        }
        let mut session = self.begin()?;
        info!(
            "About to write {} bytes to flash ({} bytes)",
            len,
            Partition::SECONDARY.size
        );

        progress.init(len);

        let mut chunk = vec![0u8; STAGING_UNIT_SIZE];
        let result = loop {
            let read = match read_full(image, &mut chunk) {
                Ok(n) => n,
                Err(e) => break Err(e),
            };
            if read > 0 {
                if let Err(e) = self.write(&mut session, &chunk[..read]) {
                    break Err(e);
                }
                progress.update(session.cursor());
                if len > 0 {
                    info!("{} %", (session.cursor() as u64 * 100) / len as u64);
                }
            }
            if read < chunk.len() {
                break self.end(&mut session);
            }
        };

        match result {
            Ok(()) => progress.finish(),
            Err(_) => self.abort(&mut session),
        }
        result
    }
}

/// Fill `buf` from `reader`, stopping early only at end of file.
fn read_full<R: embedded_io::Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut len = 0;
    while len < buf.len() {
        match reader.read(&mut buf[len..]) {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(_) => {
                error!("Unable to read firmware image");
                return Err(UpdateError::ImageUnreadable);
            }
        }
    }
    Ok(len)
}

impl<U, C> UpdateWriter for SecondaryWriter<U, C>
where
    U: SerialLink,
    C: ModeControl,
{
    type Session = SecondarySession;

    fn partition(&mut self) -> Result<Partition> {
        Ok(Partition::SECONDARY)
    }

    fn begin(&mut self) -> Result<SecondarySession> {
        let connected = self.client.connect().and_then(|_| {
            info!("Programming flash");
            self.client.erase(0)
        });
        if let Err(e) = connected {
            error!("Flash erase failed");
            self.client.disconnect().ok();
            return Err(e);
        }
        info!("Flash erased");
        self.client.ctrl_mut().settle();

        Ok(SecondarySession {
            buffer: Some(UnitBuffer::new(STAGING_UNIT_SIZE)),
        })
    }

    fn write(&mut self, session: &mut SecondarySession, data: &[u8]) -> Result<()> {
        let buffer = session.buffer.as_mut().ok_or(UpdateError::SessionClosed)?;
        if !Partition::SECONDARY.fits(buffer.cursor(), data.len()) {
            error!("Not enough space left on flash");
            return Err(UpdateError::OutOfSpace);
        }
        let client = &mut self.client;
        buffer
            .push(data, |offset, unit| Self::flush_unit(client, offset, unit))
            .map_err(|e| {
                error!(
                    "Write stopped at unit 0x{:08x} with {} bytes pending",
                    buffer.offset(),
                    buffer.fill()
                );
                e
            })
    }

    fn end(&mut self, session: &mut SecondarySession) -> Result<()> {
        let Some(mut buffer) = session.buffer.take() else {
            return Ok(());
        };
        let result = match buffer.padded_tail() {
            Some((offset, unit)) => Self::flush_unit(&mut self.client, offset, unit),
            None => Ok(()),
        };
        drop(buffer);
        let disconnected = self.client.disconnect();
        result?;
        disconnected?;
        info!("Secondary controller update succeeded");
        Ok(())
    }

    fn abort(&mut self, session: &mut SecondarySession) {
        if session.buffer.take().is_some() {
            self.client.disconnect().ok();
            info!("Secondary controller update aborted");
        }
    }
}
