// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Uniform update lifecycle implemented by every target.

use crate::error::Result;
use crate::partition::Partition;

/// One update target.
///
/// `begin` hands out an owned session; the caller threads it through
/// `write` calls and closes it with `end` or `abort`. Operations on one
/// session are sequential and never concurrent.
pub trait UpdateWriter {
    type Session;

    /// Partition the next `begin` would write to.
    fn partition(&mut self) -> Result<Partition>;

    fn begin(&mut self) -> Result<Self::Session>;

    /// Append `data` to the image. After an error the session must be aborted.
    fn write(&mut self, session: &mut Self::Session, data: &[u8]) -> Result<()>;

    /// Flush and commit. Ending a session that is already closed is a no-op.
    fn end(&mut self, session: &mut Self::Session) -> Result<()>;

    /// Drop the session, releasing its buffer whatever failed before.
    fn abort(&mut self, session: &mut Self::Session);
}
