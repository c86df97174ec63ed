// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UART seam shared by the bootloader client and the forwarding bridge.

use embedded_io::Write;

/// A serial port with deadline reads and runtime baud switching.
pub trait SerialLink: Write {
    /// Read into `buf`, waiting at most `timeout_ms` in total.
    ///
    /// Returns once `buf` is full or the deadline passes; `Ok(0)` means
    /// nothing arrived. A zero timeout returns whatever is already buffered.
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    fn baud_rate(&mut self) -> Result<u32, Self::Error>;

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error>;

    /// Drop buffered input and drain pending output.
    fn clear(&mut self) -> Result<(), Self::Error>;
}

impl<T: SerialLink + ?Sized> SerialLink for &mut T {
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        T::read_timeout(self, buf, timeout_ms)
    }

    fn baud_rate(&mut self) -> Result<u32, Self::Error> {
        T::baud_rate(self)
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error> {
        T::set_baud_rate(self, baud)
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        T::clear(self)
    }
}
