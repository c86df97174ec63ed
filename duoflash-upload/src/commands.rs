// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for bootloader operations.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use indicatif::{ProgressBar, ProgressStyle};

use duoflash_common::provision::{first_boot, FsProvisionStore, Provisioning};
use duoflash_common::{
    LinkConfig, ModeControl, ProgressCallbacks, SambaClient, SecondaryWriter, SECONDARY_FLASH_SIZE,
};

use crate::transport::{HostResetController, Transport};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Progress bar driven by the flashing loop.
struct BarProgress {
    bar: Option<ProgressBar>,
}

impl ProgressCallbacks for BarProgress {
    fn init(&mut self, total: u32) {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        self.bar = Some(bar);
    }

    fn update(&mut self, current: u32) {
        if let Some(bar) = &self.bar {
            bar.set_position(current as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message("Flash complete");
        }
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
    }
}

/// Enter the bootloader and print what it reports.
pub fn info(link: Transport, ctrl: HostResetController, config: LinkConfig) -> Result<()> {
    let port = link.port_name().to_string();
    let mut client = SambaClient::new(link, ctrl, config);

    let identity = client.connect();
    client.disconnect()?;
    let identity = identity.with_context(|| format!("No bootloader answered on {port}"))?;

    println!("Bootloader:");
    println!("  Chip ID: {}", identity.chip_id);
    println!("  Version: {}", identity.version);
    println!("  Flash:   {} bytes", SECONDARY_FLASH_SIZE);
    Ok(())
}

/// Erase the flash and write `file` from offset 0.
pub fn flash(
    link: Transport,
    ctrl: HostResetController,
    config: LinkConfig,
    file: &Path,
) -> Result<()> {
    let firmware =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let size = firmware.len() as u32;
    if size > SECONDARY_FLASH_SIZE {
        bail!(
            "{} is {} bytes, flash holds {} bytes",
            file.display(),
            size,
            SECONDARY_FLASH_SIZE
        );
    }
    println!(
        "Firmware: {} ({} bytes, CRC32: 0x{:08x})",
        file.display(),
        size,
        CRC32.checksum(&firmware)
    );

    println!("Erasing and flashing...");
    let mut writer = SecondaryWriter::new(link, ctrl, config);
    let mut progress = BarProgress { bar: None };
    let mut reader = &firmware[..];
    writer
        .flash_image(&mut reader, size, &mut progress)
        .context("Flashing failed")?;

    println!();
    println!("Firmware flashed successfully!");
    Ok(())
}

/// Erase the whole flash, leaving the bootloader in control on next reset.
pub fn erase(link: Transport, ctrl: HostResetController, config: LinkConfig) -> Result<()> {
    let mut client = SambaClient::new(link, ctrl, config);

    print!("Erasing flash... ");
    std::io::stdout().flush()?;
    let erased = client.connect().and_then(|_| client.erase(0));
    client.disconnect()?;
    erased.context("Erase failed")?;
    println!("OK");
    Ok(())
}

/// Single reset pulse into the application.
pub fn reset(mut ctrl: HostResetController) -> Result<()> {
    print!("Resetting secondary controller... ");
    std::io::stdout().flush()?;
    ctrl.restart();
    println!("OK");
    Ok(())
}

/// First boot flow: flash `image` if `sentinel` exists, then remove it.
pub fn provision(
    link: Transport,
    ctrl: HostResetController,
    config: LinkConfig,
    sentinel: PathBuf,
    image: PathBuf,
) -> Result<()> {
    let mut store = FsProvisionStore::new(sentinel, image);
    let mut writer = SecondaryWriter::new(link, ctrl, config);
    match first_boot(&mut store, &mut writer) {
        Provisioning::Skipped => println!("No first boot sentinel, secondary controller restarted"),
        Provisioning::Flashed => println!("Default image flashed"),
        Provisioning::Failed(e) => bail!("Provisioning failed: {e}"),
    }
    Ok(())
}
