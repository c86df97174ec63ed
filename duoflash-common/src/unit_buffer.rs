// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use alloc::vec;
use alloc::vec::Vec;

use crate::error::Result;

/// Regroups arbitrary writes into fixed-size units.
///
/// `fill < unit` holds between calls; `offset` only advances after a unit
/// was flushed successfully.
pub(crate) struct UnitBuffer {
    buf: Vec<u8>,
    fill: usize,
    offset: u32,
}

impl UnitBuffer {
    pub(crate) fn new(unit: usize) -> Self {
        Self {
            buf: vec![0u8; unit],
            fill: 0,
            offset: 0,
        }
    }

    /// Offset of the next unit to flush.
    pub(crate) fn offset(&self) -> u32 {
        self.offset
    }

    pub(crate) fn fill(&self) -> usize {
        self.fill
    }

    /// Bytes accepted so far, flushed or pending.
    pub(crate) fn cursor(&self) -> u32 {
        self.offset + self.fill as u32
    }

    /// Append `data`, calling `flush(offset, unit)` for every full unit.
    pub(crate) fn push<F>(&mut self, data: &[u8], mut flush: F) -> Result<()>
    where
        F: FnMut(u32, &[u8]) -> Result<()>,
    {
        let unit = self.buf.len();
        let mut rest = data;
        while self.fill + rest.len() >= unit {
            let take = unit - self.fill;
            self.buf[self.fill..].copy_from_slice(&rest[..take]);
            self.fill = unit;
            flush(self.offset, &self.buf)?;
            rest = &rest[take..];
            self.fill = 0;
            self.offset += unit as u32;
        }
        self.buf[self.fill..self.fill + rest.len()].copy_from_slice(rest);
        self.fill += rest.len();
        Ok(())
    }

    /// Pending tail zero-padded to a full unit.
    pub(crate) fn padded_tail(&mut self) -> Option<(u32, &[u8])> {
        let unit = self.buf.len();
        self.tail(unit, 0)
    }

    /// Pending tail, if any, padded with `filler` up to a multiple of `align`.
    ///
    /// Passing the unit size as `align` yields a full unit.
    pub(crate) fn tail(&mut self, align: usize, filler: u8) -> Option<(u32, &[u8])> {
        if self.fill == 0 {
            return None;
        }
        let len = self.fill.next_multiple_of(align.max(1)).min(self.buf.len());
        self.buf[self.fill..len].fill(filler);
        Some((self.offset, &self.buf[..len]))
    }
}
