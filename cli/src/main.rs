// This file is part of bramxfer, a host-side driver that streams frames to and from the block memory of a PCIe-attached FPGA.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// bramxfer is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// bramxfer is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! `bramxfer` - send frame files to an XDMA card's BRAM and receive them back.
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`, `error`
//!   or `off`). Defaults to `info`, or `debug` with `--verbose`
//!
//! # Exit status
//!
//! `0` on success, otherwise the negative errno-style code of the failure.

mod receive;
mod send;

use crate::receive::receive_handler;
use crate::send::send_handler;
use bramxfer::config::TransferConfig;
use bramxfer::device::completion::{CompletionStrategy, DEFAULT_POLL_INTERVAL};
use bramxfer::error::XferError;
use bramxfer::frames::codec::ByteOrder;
use bramxfer::frames::file::FrameFormat;
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, error};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bramxfer")]
#[command(bin_name = "bramxfer")]
#[command(about = "Stream 64-bit frames to and from the BRAM of an XDMA FPGA card")]
struct Cli {
    #[arg(long, global = true, help = "host-to-card DMA device (default /dev/xdma0_h2c_0)")]
    h2c: Option<PathBuf>,
    #[arg(long, global = true, help = "card-to-host DMA device (default /dev/xdma0_c2h_0)")]
    c2h: Option<PathBuf>,
    #[arg(
        long = "user-registers",
        global = true,
        help = "user register device (default /dev/xdma0_user)"
    )]
    user_registers: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "user interrupt event device (default /dev/xdma0_events_0)"
    )]
    events: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = r#"configuration file layered above
/usr/lib/bramxfer/config.toml and /etc/bramxfer/config.toml.
        "#
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, help = "how window completion is observed")]
    completion: Option<CompletionArg>,
    #[arg(long = "timeout-secs", global = true, help = "longest wait for one window")]
    timeout_secs: Option<u64>,
    #[arg(long, global = true, value_enum, help = "frame file format")]
    format: Option<FormatArg>,
    #[arg(
        long = "byte-order",
        global = true,
        value_enum,
        help = "byte order of binary frame files"
    )]
    byte_order: Option<ByteOrderArg>,
    #[arg(short, long, global = true, help = "log every window")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a frame file to the card
    Send {
        #[arg(long, value_enum, help = "mode the card runs the frames in")]
        mode: ModeArg,
        #[arg(
            long,
            help = "frame file (default ./test/config.txt or ./test/input.txt per mode)"
        )]
        frames: Option<PathBuf>,
    },
    /// Receive the upstream window into a frame file
    Receive {
        #[arg(long, help = "output frame file (default ./test/output.txt)")]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Config,
    Work,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CompletionArg {
    Poll,
    Event,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Text,
    Binary,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ByteOrderArg {
    Little,
    Big,
}

/// Load the configuration files and apply the command line flags on top.
fn resolve_config(cli: &Cli) -> Result<TransferConfig, XferError> {
    let mut config = TransferConfig::load(cli.config.as_deref())?;
    if let Some(h2c) = &cli.h2c {
        config.paths.h2c = h2c.clone();
    }
    if let Some(c2h) = &cli.c2h {
        config.paths.c2h = c2h.clone();
    }
    if let Some(user_registers) = &cli.user_registers {
        config.paths.user_registers = user_registers.clone();
    }
    if let Some(events) = &cli.events {
        config.paths.events = events.clone();
    }
    match (cli.completion, config.completion) {
        (Some(CompletionArg::Event), _) => config.completion = CompletionStrategy::Event,
        (Some(CompletionArg::Poll), CompletionStrategy::Event) => {
            config.completion = CompletionStrategy::Poll {
                interval: DEFAULT_POLL_INTERVAL,
            }
        }
        _ => {}
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(format) = cli.format {
        config.frame_format = match format {
            FormatArg::Text => FrameFormat::Text,
            FormatArg::Binary => FrameFormat::Binary,
        };
    }
    if let Some(order) = cli.byte_order {
        config.byte_order = match order {
            ByteOrderArg::Little => ByteOrder::Little,
            ByteOrderArg::Big => ByteOrder::Big,
        };
    }
    config.verbose = cli.verbose;
    debug!("resolved config {config:?}");
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    debug!("parsed cli command with {cli:?}");

    let result = resolve_config(&cli).and_then(|config| match &cli.command {
        Commands::Send { mode, frames } => send_handler(&config, *mode, frames.as_deref()),
        Commands::Receive { output } => receive_handler(&config, output.as_deref()),
    });
    match result {
        Ok(msg) => println!("{msg}"),
        Err(e) => {
            error!("{e}");
            std::process::exit(e.code());
        }
    }
}
