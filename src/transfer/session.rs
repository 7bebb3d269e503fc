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

//! Complete transfers between a frame file and the card.
//!
//! Each call opens the devices it needs, runs the engine and releases everything when it
//! returns, whether it succeeded or not. Descriptors, the register mapping and buffers are
//! all owned values, so an early `?` return cleans up the same way as the happy path.

use crate::config::TransferConfig;
use crate::device::mapped::MappedRegisters;
use crate::device::mode::{DeviceMode, ModeSequencer};
use crate::device::registers::Registers;
use crate::error::XferError;
use crate::frames::file::{FrameWriter, load_frames};
use crate::system_io::{DeviceAccess, fs_create_output, fs_open_device};
use crate::transfer::engine::{ReceiveReport, TransferEngine, TransferReport};
use crate::transfer::window::{DOWNSTREAM_CH1, UPSTREAM_CH1};
use log::info;
use std::path::Path;

/// Map the user register block named by `config`.
pub fn open_registers(config: &TransferConfig) -> Result<Registers, XferError> {
    let space = MappedRegisters::map(&config.paths.user_registers)?;
    Registers::new(Box::new(space), config.layout)
}

/// Send the frames of `frames_file` to the card, running them in `mode`.
///
/// # Arguments
///
/// * `config` - Devices, register layout and transfer settings
/// * `frames_file` - Text or binary frame file, per `config.frame_format`
/// * `mode` - `CONFIG` or `WORK`
///
/// # Returns: `Result<TransferReport, XferError>`
/// * `Ok(TransferReport)` - All frames were consumed by the card
/// * `Err(XferError)` - The first failure, see [`TransferEngine::send`]
pub fn frames_file_to_device(
    config: &TransferConfig,
    frames_file: &Path,
    mode: DeviceMode,
) -> Result<TransferReport, XferError> {
    let mut buffer = load_frames(frames_file, config.frame_format, config.byte_order)?;
    info!(
        "Loaded {} frames from {frames_file:?}",
        buffer.frame_count()
    );
    if buffer.is_empty() {
        return Err(XferError::Argument(format!(
            "{frames_file:?} contains no frames"
        )));
    }

    let mut h2c = fs_open_device(&config.paths.h2c, DeviceAccess::ReadWrite)?;
    let registers = open_registers(config)?;
    let mut monitor = config.completion.open(&config.paths.events)?;

    let mut engine = TransferEngine::new(
        &registers,
        monitor.as_mut(),
        ModeSequencer::new(config.settle_delay),
        config.timeout,
    )
    .verbose(config.verbose);
    engine.send(&mut h2c, &config.paths.h2c, &mut buffer, DOWNSTREAM_CH1, mode)
}

/// Fetch the upstream window from the card and write its frames to `output`.
///
/// `output` is created, or truncated, before the card is asked for data.
///
/// # Returns: `Result<ReceiveReport, XferError>`
/// * `Ok(ReceiveReport)` - The frames written to `output`
/// * `Err(XferError)` - The first failure, see [`TransferEngine::receive`]
pub fn device_to_frames_file(
    config: &TransferConfig,
    output: &Path,
) -> Result<ReceiveReport, XferError> {
    let mut c2h = fs_open_device(&config.paths.c2h, DeviceAccess::ReadOnly)?;
    let registers = open_registers(config)?;
    let mut monitor = config.completion.open(&config.paths.events)?;
    let mut out = fs_create_output(output)?;
    let mut writer = FrameWriter::new(&mut out, output, config.frame_format, config.byte_order);

    let mut engine = TransferEngine::new(
        &registers,
        monitor.as_mut(),
        ModeSequencer::new(config.settle_delay),
        config.timeout,
    )
    .verbose(config.verbose);
    let report = engine.receive(&mut c2h, &config.paths.c2h, &mut writer, UPSTREAM_CH1)?;
    info!("Wrote {} frames to {output:?}", report.frames);
    Ok(report)
}
