// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use duoflash_common::protocol::{
    APPLICATION_BAUD_RATE, BOOTLOADER_BAUD_RATE, DEFAULT_FIRMWARE_IMAGE, FIRST_BOOT_SENTINEL,
    LONG_TIMEOUT_MS, SETTLE_DELAY_MS, SHORT_TIMEOUT_MS,
};
use duoflash_common::LinkConfig;

use crate::commands;
use crate::transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "duoflash-upload")]
#[command(about = "Flash the secondary controller through its SAM-BA bootloader")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyUSB0)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Application baud rate, restored after programming
    #[arg(short, long, default_value_t = APPLICATION_BAUD_RATE)]
    pub baud: u32,

    /// Bootloader baud rate
    #[arg(long, default_value_t = BOOTLOADER_BAUD_RATE)]
    pub bootloader_baud: u32,

    /// Reset pulse width and settle delay in milliseconds
    #[arg(long, default_value_t = SETTLE_DELAY_MS)]
    pub settle_ms: u32,

    /// Timeout for flash erase and commit acknowledgments in milliseconds
    #[arg(long, default_value_t = LONG_TIMEOUT_MS)]
    pub long_timeout_ms: u32,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Enter the bootloader and print its identity
    Info,

    /// Erase the flash and write a firmware image
    Flash {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Erase the whole flash
    Erase,

    /// Reset the secondary controller into its application
    Reset,

    /// Run the first boot provisioning flow against local files
    Provision {
        /// Sentinel file marking the first boot
        #[arg(long, default_value = FIRST_BOOT_SENTINEL)]
        sentinel: PathBuf,

        /// Default firmware image
        #[arg(long, default_value = DEFAULT_FIRMWARE_IMAGE)]
        image: PathBuf,
    },
}

impl Cli {
    fn link_config(&self) -> LinkConfig {
        LinkConfig {
            bootloader_baud: self.bootloader_baud,
            short_timeout_ms: SHORT_TIMEOUT_MS,
            long_timeout_ms: self.long_timeout_ms,
            settle_ms: self.settle_ms,
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let port = cli
        .port
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--port is required"))?;
    let config = cli.link_config();
    let (link, ctrl) = transport::open(port, cli.baud, config.settle_ms)?;

    match cli.command {
        Commands::Info => commands::info(link, ctrl, config),
        Commands::Flash { file } => commands::flash(link, ctrl, config, &file),
        Commands::Erase => commands::erase(link, ctrl, config),
        Commands::Reset => commands::reset(ctrl),
        Commands::Provision { sentinel, image } => {
            commands::provision(link, ctrl, config, sentinel, image)
        }
    }
}
