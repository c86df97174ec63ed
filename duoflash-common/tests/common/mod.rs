// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Simulated collaborators shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use duoflash_common::app::{ImageState, ImageVersion, OtaPlatform, HEADER_PROBE_LEN};
use duoflash_common::fs_writer::MountControl;
use duoflash_common::partition::{FsKind, Partition, PartitionKind};
use duoflash_common::protocol::SECONDARY_FLASH_SIZE;
use duoflash_common::{ModeControl, Result, SerialLink, UpdateError};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin, StatefulOutputPin};
use embedded_storage::nor_flash::{
    check_write, ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
};

// ---------------------------------------------------------------------------
// Local NOR flash
// ---------------------------------------------------------------------------

pub const FLASH_SECTOR: u32 = 4096;

pub const LITTLEFS: Partition = Partition {
    kind: PartitionKind::Data(FsKind::LittleFs),
    offset: 0x1_0000,
    size: 0x2_0000,
    erase_size: FLASH_SECTOR,
};

pub const SPIFFS: Partition = Partition {
    kind: PartitionKind::Data(FsKind::Spiffs),
    offset: 0x3_0000,
    size: 0x1_0000,
    erase_size: FLASH_SECTOR,
};

/// RAM-backed NOR flash recording every erase and write.
pub struct RamFlash {
    pub mem: Vec<u8>,
    pub erases: Vec<(u32, u32)>,
    pub writes: Vec<(u32, usize)>,
    pub fail_erase_at: Option<u32>,
    pub fail_write_at: Option<u32>,
}

impl RamFlash {
    pub fn new(size: usize) -> Self {
        Self {
            mem: vec![0xFF; size],
            erases: Vec::new(),
            writes: Vec::new(),
            fail_erase_at: None,
            fail_write_at: None,
        }
    }

    pub fn region(&self, partition: &Partition, len: usize) -> &[u8] {
        let start = partition.offset as usize;
        &self.mem[start..start + len]
    }
}

impl ErrorType for RamFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for RamFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> core::result::Result<(), Self::Error> {
        let start = offset as usize;
        let src = self
            .mem
            .get(start..start + bytes.len())
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.mem.len()
    }
}

impl NorFlash for RamFlash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = FLASH_SECTOR as usize;

    fn erase(&mut self, from: u32, to: u32) -> core::result::Result<(), Self::Error> {
        if self.fail_erase_at == Some(from) {
            return Err(NorFlashErrorKind::Other);
        }
        let region = self
            .mem
            .get_mut(from as usize..to as usize)
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        region.fill(0xFF);
        self.erases.push((from, to));
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> core::result::Result<(), Self::Error> {
        if self.fail_write_at == Some(offset) {
            return Err(NorFlashErrorKind::Other);
        }
        let start = offset as usize;
        let region = self
            .mem
            .get_mut(start..start + bytes.len())
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        region.copy_from_slice(bytes);
        self.writes.push((offset, bytes.len()));
        Ok(())
    }
}

/// RAM flash that only accepts word-aligned writes, like the ESP flash driver.
pub struct WordFlash(pub RamFlash);

impl WordFlash {
    pub fn new(size: usize) -> Self {
        Self(RamFlash::new(size))
    }
}

impl ErrorType for WordFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for WordFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> core::result::Result<(), Self::Error> {
        self.0.read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.0.capacity()
    }
}

impl NorFlash for WordFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = FLASH_SECTOR as usize;

    fn erase(&mut self, from: u32, to: u32) -> core::result::Result<(), Self::Error> {
        self.0.erase(from, to)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> core::result::Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        self.0.write(offset, bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountEvent {
    Unmount(FsKind),
    Remount(FsKind),
}

#[derive(Default)]
pub struct RecordingMount {
    pub events: Vec<MountEvent>,
}

impl MountControl for RecordingMount {
    fn unmount(&mut self, kind: FsKind) {
        self.events.push(MountEvent::Unmount(kind));
    }

    fn remount(&mut self, kind: FsKind) {
        self.events.push(MountEvent::Remount(kind));
    }
}

// ---------------------------------------------------------------------------
// Application slots
// ---------------------------------------------------------------------------

pub const OTA_0: Partition = Partition {
    kind: PartitionKind::App { slot: 0 },
    offset: 0x10_0000,
    size: 0x4_0000,
    erase_size: FLASH_SECTOR,
};

pub const OTA_1: Partition = Partition {
    kind: PartitionKind::App { slot: 1 },
    offset: 0x14_0000,
    size: 0x4_0000,
    erase_size: FLASH_SECTOR,
};

/// Build an application image of `len` bytes carrying `version`.
pub fn app_image(version: &str, len: usize) -> Vec<u8> {
    assert!(len >= HEADER_PROBE_LEN);
    let mut image: Vec<u8> = (0..len).map(|i| (i % 251) as u8 | 1).collect();
    let field = &mut image[48..80];
    field.fill(0);
    field[..version.len()].copy_from_slice(version.as_bytes());
    image
}

/// Two-slot OTA platform.
pub struct SimOta {
    pub slots: [Partition; 2],
    pub running: usize,
    pub boot: usize,
    pub versions: [Option<ImageVersion>; 2],
    pub last_invalid: Option<usize>,
    pub has_update_slot: bool,
    pub images: [Vec<u8>; 2],
    pub begun: u32,
    pub write_calls: Vec<usize>,
    pub ended: u32,
    pub aborted: u32,
    pub fail_set_boot: u32,
    pub state: Option<ImageState>,
    pub marked_valid: bool,
    pub rolled_back: bool,
}

impl SimOta {
    /// Running `running_version` from slot 0.
    pub fn new(running_version: &str) -> Self {
        Self {
            slots: [OTA_0, OTA_1],
            running: 0,
            boot: 0,
            versions: [Some(ImageVersion::from_bytes(running_version.as_bytes())), None],
            last_invalid: None,
            has_update_slot: true,
            images: [Vec::new(), Vec::new()],
            begun: 0,
            write_calls: Vec::new(),
            ended: 0,
            aborted: 0,
            fail_set_boot: 0,
            state: Some(ImageState::Valid),
            marked_valid: false,
            rolled_back: false,
        }
    }

    fn slot_of(&self, partition: &Partition) -> Option<usize> {
        self.slots.iter().position(|p| p.offset == partition.offset)
    }

    pub fn written_bytes(&self) -> usize {
        self.write_calls.iter().sum()
    }
}

impl OtaPlatform for SimOta {
    type Handle = usize;

    fn next_update_partition(&mut self) -> Option<Partition> {
        self.has_update_slot.then(|| self.slots[1 - self.running])
    }

    fn running_partition(&mut self) -> Option<Partition> {
        Some(self.slots[self.running])
    }

    fn last_invalid_partition(&mut self) -> Option<Partition> {
        self.last_invalid.map(|i| self.slots[i])
    }

    fn partition_version(&mut self, partition: &Partition) -> Option<ImageVersion> {
        self.slot_of(partition).and_then(|i| self.versions[i])
    }

    fn ota_begin(&mut self, partition: &Partition) -> Result<usize> {
        let slot = self.slot_of(partition).ok_or(UpdateError::NoUpdatePartition)?;
        self.images[slot].clear();
        self.begun += 1;
        Ok(slot)
    }

    fn ota_write(&mut self, handle: &mut usize, data: &[u8]) -> Result<()> {
        self.images[*handle].extend_from_slice(data);
        self.write_calls.push(data.len());
        Ok(())
    }

    fn ota_end(&mut self, handle: usize) -> Result<()> {
        self.ended += 1;
        self.versions[handle] = ImageVersion::from_image(&self.images[handle]);
        Ok(())
    }

    fn ota_abort(&mut self, _handle: usize) {
        self.aborted += 1;
    }

    fn set_boot_partition(&mut self, partition: &Partition) -> Result<()> {
        if self.fail_set_boot > 0 {
            self.fail_set_boot -= 1;
            return Err(UpdateError::WriteFailed);
        }
        self.boot = self.slot_of(partition).ok_or(UpdateError::NoUpdatePartition)?;
        Ok(())
    }

    fn running_state(&mut self) -> Option<ImageState> {
        self.state
    }

    fn mark_valid_cancel_rollback(&mut self) {
        self.marked_valid = true;
        self.state = Some(ImageState::Valid);
    }

    fn mark_invalid_rollback_and_reboot(&mut self) {
        self.rolled_back = true;
        self.state = Some(ImageState::Invalid);
    }
}

// ---------------------------------------------------------------------------
// SAM-BA bootloader on the other end of the UART
// ---------------------------------------------------------------------------

pub const CHIP_ID: &str = "R7FA4M1AB";
pub const BOOTLOADER_VERSION: &str = "v1.0.2";

/// Bootloader simulator speaking the command set over an in-memory UART.
pub struct SimSamba {
    pub flash: Vec<u8>,
    pub staging: Vec<u8>,
    pub commands: Vec<String>,
    pub erases: Vec<u32>,
    pub loads: Vec<usize>,
    pub commits: Vec<(u32, u32)>,
    pub baud: u32,
    pub baud_history: Vec<u32>,
    pub nak_erase: bool,
    pub silent: bool,
    pub tx_log: Vec<u8>,
    line: Vec<u8>,
    payload_left: usize,
    copy_src: u32,
    reply: VecDeque<u8>,
}

impl SimSamba {
    pub fn new() -> Self {
        Self {
            flash: vec![0xAA; SECONDARY_FLASH_SIZE as usize],
            staging: Vec::new(),
            commands: Vec::new(),
            erases: Vec::new(),
            loads: Vec::new(),
            commits: Vec::new(),
            baud: 115_200,
            baud_history: Vec::new(),
            nak_erase: false,
            silent: false,
            tx_log: Vec::new(),
            line: Vec::new(),
            payload_left: 0,
            copy_src: 0,
            reply: VecDeque::new(),
        }
    }

    /// Queue bytes as if sent by the secondary controller application.
    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.reply.extend(bytes);
    }

    fn answer(&mut self, text: &str) {
        if !self.silent {
            self.reply.extend(text.as_bytes());
        }
    }

    fn on_byte(&mut self, b: u8) {
        if self.payload_left > 0 {
            self.staging.push(b);
            self.payload_left -= 1;
            if self.payload_left == 0 {
                self.loads.push(self.staging.len());
            }
            return;
        }
        self.line.push(b);
        if b == b'#' {
            let cmd = String::from_utf8_lossy(&self.line).into_owned();
            self.line.clear();
            self.on_command(&cmd);
        }
    }

    fn on_command(&mut self, cmd: &str) {
        self.commands.push(cmd.to_string());
        let body = &cmd[1..cmd.len() - 1];
        let mut args = body.split(',');
        let mut hex = || args.next().map(|a| (a.to_string(), u32::from_str_radix(a, 16).unwrap_or(0)));
        match &cmd[..1] {
            "N" => self.answer("\n\r"),
            "I" => self.answer(&format!("{CHIP_ID}\n\r")),
            "V" => self.answer(&format!("{BOOTLOADER_VERSION}\n\r")),
            "X" => {
                let (_, addr) = hex().unwrap_or_default();
                self.erases.push(addr);
                if self.nak_erase {
                    self.answer("E\n\r");
                } else {
                    self.flash[addr as usize..].fill(0xFF);
                    self.answer("X\n\r");
                }
            }
            "S" => {
                hex();
                let (_, size) = hex().unwrap_or_default();
                self.staging.clear();
                self.payload_left = size as usize;
            }
            "Y" => {
                let (_, addr) = hex().unwrap_or_default();
                let (size_text, size) = hex().unwrap_or_default();
                if size_text == "0" {
                    self.copy_src = addr;
                } else {
                    let src = self.copy_src as usize;
                    let dst = addr as usize;
                    let len = size as usize;
                    self.flash[dst..dst + len].copy_from_slice(&self.staging[src..src + len]);
                    self.commits.push((addr, size));
                }
                self.answer("Y\n\r");
            }
            _ => {}
        }
    }
}

impl embedded_io::ErrorType for SimSamba {
    type Error = Infallible;
}

impl embedded_io::Write for SimSamba {
    fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, Self::Error> {
        self.tx_log.extend_from_slice(buf);
        for &b in buf {
            self.on_byte(b);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }
}

impl SerialLink for SimSamba {
    fn read_timeout(
        &mut self,
        buf: &mut [u8],
        _timeout_ms: u32,
    ) -> core::result::Result<usize, Self::Error> {
        let n = buf.len().min(self.reply.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.reply.pop_front().unwrap_or(0);
        }
        Ok(n)
    }

    fn baud_rate(&mut self) -> core::result::Result<u32, Self::Error> {
        Ok(self.baud)
    }

    fn set_baud_rate(&mut self, baud: u32) -> core::result::Result<(), Self::Error> {
        self.baud = baud;
        self.baud_history.push(baud);
        Ok(())
    }

    fn clear(&mut self) -> core::result::Result<(), Self::Error> {
        self.reply.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlEvent {
    Restart,
    EnterProgramming,
    ExitProgramming,
    Settle,
}

/// Mode control double recording the call sequence.
#[derive(Default)]
pub struct FakeCtrl {
    pub events: Vec<CtrlEvent>,
    pub programming: bool,
}

impl ModeControl for FakeCtrl {
    fn restart(&mut self) {
        self.events.push(CtrlEvent::Restart);
    }

    fn enter_programming(&mut self) {
        self.programming = true;
        self.events.push(CtrlEvent::EnterProgramming);
    }

    fn exit_programming(&mut self) {
        self.programming = false;
        self.events.push(CtrlEvent::ExitProgramming);
    }

    fn is_programming(&self) -> bool {
        self.programming
    }

    fn settle(&mut self) {
        self.events.push(CtrlEvent::Settle);
    }
}

// ---------------------------------------------------------------------------
// Reset lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    Reset(bool),
    Boot(bool),
    DelayMs(u32),
}

pub type LineLog = Rc<RefCell<Vec<LineEvent>>>;

pub struct RecordingPin {
    log: LineLog,
    high: bool,
    is_reset: bool,
}

impl RecordingPin {
    pub fn reset(log: &LineLog) -> Self {
        Self {
            log: log.clone(),
            high: true,
            is_reset: true,
        }
    }

    pub fn boot(log: &LineLog) -> Self {
        Self {
            log: log.clone(),
            high: false,
            is_reset: false,
        }
    }

    fn set(&mut self, high: bool) {
        self.high = high;
        let event = if self.is_reset {
            LineEvent::Reset(high)
        } else {
            LineEvent::Boot(high)
        };
        self.log.borrow_mut().push(event);
    }
}

impl PinErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

impl StatefulOutputPin for RecordingPin {
    fn is_set_high(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

pub struct RecordingDelay(pub LineLog);

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().push(LineEvent::DelayMs(ms));
    }
}
