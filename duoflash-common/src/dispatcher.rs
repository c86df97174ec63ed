// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Target selection and the shared update lifecycle.
//!
//! The dispatcher owns one writer per target and keeps at most one open
//! session per target. Sessions on different targets are not serialized
//! against each other.

use alloc::vec;

use crate::error::{Result, UpdateError};
use crate::fmt::{error, info};
use crate::partition::{FsKind, Partition, Target};
use crate::writer::UpdateWriter;

/// Largest chunk handed to a writer by [`UpdateDispatcher::stream`].
pub const STREAM_CHUNK_SIZE: usize = 8192;

/// Progress reporting for [`UpdateDispatcher::stream`].
pub trait ProgressCallbacks {
    /// Called once with the declared image length.
    fn init(&mut self, total: u32);
    /// Called after each chunk with the number of bytes written so far.
    fn update(&mut self, current: u32);
    fn finish(&mut self);
}

impl ProgressCallbacks for () {
    fn init(&mut self, _total: u32) {}
    fn update(&mut self, _current: u32) {}
    fn finish(&mut self) {}
}

enum Slot<AS, FS, SS> {
    Application(AS),
    Filesystem(FsKind, FS),
    Secondary(SS),
}

/// An update in flight, handed out by [`UpdateDispatcher::begin`].
pub struct UpdateSession<AS, FS, SS> {
    slot: Slot<AS, FS, SS>,
    declared_len: u32,
    received: u32,
    open: bool,
}

impl<AS, FS, SS> UpdateSession<AS, FS, SS> {
    pub fn target(&self) -> Target {
        match self.slot {
            Slot::Application(_) => Target::Application,
            Slot::Filesystem(kind, _) => Target::Filesystem(kind),
            Slot::Secondary(_) => Target::Secondary,
        }
    }

    pub fn declared_len(&self) -> u32 {
        self.declared_len
    }

    /// Bytes accepted so far.
    pub fn received(&self) -> u32 {
        self.received
    }

    /// False once the session was ended or aborted.
    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// Session type produced by a dispatcher over writers `A`, `F` and `S`.
pub type SessionOf<A, F, S> = UpdateSession<
    <A as UpdateWriter>::Session,
    <F as UpdateWriter>::Session,
    <S as UpdateWriter>::Session,
>;

pub struct UpdateDispatcher<A, F, S> {
    app: A,
    littlefs: F,
    spiffs: F,
    secondary: S,
    active: [bool; 4],
}

impl<A, F, S> UpdateDispatcher<A, F, S>
where
    A: UpdateWriter,
    F: UpdateWriter,
    S: UpdateWriter,
{
    pub fn new(app: A, littlefs: F, spiffs: F, secondary: S) -> Self {
        Self {
            app,
            littlefs,
            spiffs,
            secondary,
            active: [false; 4],
        }
    }

    pub fn application_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn filesystem_mut(&mut self, kind: FsKind) -> &mut F {
        match kind {
            FsKind::LittleFs => &mut self.littlefs,
            FsKind::Spiffs => &mut self.spiffs,
        }
    }

    pub fn secondary_mut(&mut self) -> &mut S {
        &mut self.secondary
    }

    /// Whether `target` has an open session.
    pub fn is_active(&self, target: Target) -> bool {
        self.active[target.index()]
    }

    pub fn partition(&mut self, target: Target) -> Result<Partition> {
        match target {
            Target::Application => self.app.partition(),
            Target::Filesystem(kind) => self.filesystem_mut(kind).partition(),
            Target::Secondary => self.secondary.partition(),
        }
    }

    /// Open a session on `target` for an image of `declared_len` bytes.
    pub fn begin(&mut self, target: Target, declared_len: u32) -> Result<SessionOf<A, F, S>> {
        if self.is_active(target) {
            error!("An update of {} is already in progress", target.as_str());
            return Err(UpdateError::SessionActive);
        }
        let partition = self.partition(target)?;
        if declared_len > partition.size {
            error!(
                "Image too large for {}: {} > {}",
                target.as_str(),
                declared_len,
                partition.size
            );
            return Err(UpdateError::ImageTooLarge);
        }

        let slot = match target {
            Target::Application => Slot::Application(self.app.begin()?),
            Target::Filesystem(kind) => Slot::Filesystem(kind, self.filesystem_mut(kind).begin()?),
            Target::Secondary => Slot::Secondary(self.secondary.begin()?),
        };
        self.active[target.index()] = true;
        info!("Receiving {} bytes for {}", declared_len, target.as_str());
        Ok(UpdateSession {
            slot,
            declared_len,
            received: 0,
            open: true,
        })
    }

    /// Pass one chunk to the session's writer. A failed write aborts the session.
    ///
    /// A chunk that would carry the image past its declared length fails
    /// [`UpdateError::OutOfSpace`] before the writer sees any of it.
    pub fn write(&mut self, session: &mut SessionOf<A, F, S>, data: &[u8]) -> Result<()> {
        if !session.open {
            return Err(UpdateError::SessionClosed);
        }
        if data.is_empty() {
            return Ok(());
        }
        let fits = u32::try_from(data.len())
            .ok()
            .and_then(|len| session.received.checked_add(len))
            .filter(|&total| total <= session.declared_len);
        let Some(total) = fits else {
            error!(
                "Write to {} past declared length: {} + {} > {}",
                session.target().as_str(),
                session.received,
                data.len(),
                session.declared_len
            );
            self.abort(session);
            return Err(UpdateError::OutOfSpace);
        };
        let result = match &mut session.slot {
            Slot::Application(s) => self.app.write(s, data),
            Slot::Filesystem(kind, s) => self.filesystem_mut(*kind).write(s, data),
            Slot::Secondary(s) => self.secondary.write(s, data),
        };
        if let Err(e) = result {
            error!("Write to {} failed: {}", session.target().as_str(), e.as_str());
            self.abort(session);
            return Err(e);
        }
        session.received = total;
        Ok(())
    }

    /// Flush and commit.
    ///
    /// [`UpdateError::BootPartitionNotSet`] leaves the session open so that
    /// `end` can be retried; any other failure closes it.
    pub fn end(&mut self, session: &mut SessionOf<A, F, S>) -> Result<()> {
        if !session.open {
            return Ok(());
        }
        let result = match &mut session.slot {
            Slot::Application(s) => self.app.end(s),
            Slot::Filesystem(kind, s) => self.filesystem_mut(*kind).end(s),
            Slot::Secondary(s) => self.secondary.end(s),
        };
        match result {
            Err(UpdateError::BootPartitionNotSet) => Err(UpdateError::BootPartitionNotSet),
            Err(e) => {
                self.abort(session);
                Err(e)
            }
            Ok(()) => {
                self.close(session);
                Ok(())
            }
        }
    }

    pub fn abort(&mut self, session: &mut SessionOf<A, F, S>) {
        if !session.open {
            return;
        }
        match &mut session.slot {
            Slot::Application(s) => self.app.abort(s),
            Slot::Filesystem(kind, s) => self.filesystem_mut(*kind).abort(s),
            Slot::Secondary(s) => self.secondary.abort(s),
        }
        self.close(session);
    }

    fn close(&mut self, session: &mut SessionOf<A, F, S>) {
        session.open = false;
        self.active[session.target().index()] = false;
    }

    /// Run a whole update from `reader`: begin, chunked writes, end.
    ///
    /// Reads at most `declared_len` bytes. A reader that runs dry early
    /// still ends the session; length mismatches are left to the consumer
    /// of the image.
    pub fn stream<R, P>(
        &mut self,
        target: Target,
        declared_len: u32,
        reader: &mut R,
        progress: &mut P,
    ) -> Result<()>
    where
        R: embedded_io::Read,
        P: ProgressCallbacks,
    {
        let mut session = self.begin(target, declared_len)?;
        progress.init(declared_len);

        let mut chunk = vec![0u8; STREAM_CHUNK_SIZE];
        let mut received: u32 = 0;
        while received < declared_len {
            let want = STREAM_CHUNK_SIZE.min((declared_len - received) as usize);
            let read = match reader.read(&mut chunk[..want]) {
                Ok(0) => {
                    info!("Image ended after {} of {} bytes", received, declared_len);
                    break;
                }
                Ok(n) => n,
                Err(_) => {
                    error!("Unable to read image for {}", target.as_str());
                    self.abort(&mut session);
                    return Err(UpdateError::ImageUnreadable);
                }
            };
            self.write(&mut session, &chunk[..read])?;
            received += read as u32;
            progress.update(received);
        }

        if let Err(e) = self.end(&mut session) {
            self.abort(&mut session);
            return Err(e);
        }
        progress.finish();
        info!("Update of {} done ({} bytes)", target.as_str(), received);
        Ok(())
    }
}
