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

use crate::ModeArg;
use bramxfer::config::{CONFIG_FRAMES, TransferConfig, WORK_FRAMES};
use bramxfer::device::mode::DeviceMode;
use bramxfer::error::XferError;
use bramxfer::transfer::session::frames_file_to_device;
use std::path::Path;

/// Runs the send command, defaulting the frame file per mode
pub fn send_handler(
    config: &TransferConfig,
    mode: ModeArg,
    frames: Option<&Path>,
) -> Result<String, XferError> {
    let (device_mode, default_frames) = match mode {
        ModeArg::Config => (DeviceMode::Config, CONFIG_FRAMES),
        ModeArg::Work => (DeviceMode::Work, WORK_FRAMES),
    };
    let frames = frames.unwrap_or(Path::new(default_frames));
    let report = frames_file_to_device(config, frames, device_mode)?;
    Ok(format!(
        "Sent {:#x} bytes from {frames:?} in {} windows ({} announced), mode {device_mode}",
        report.bytes, report.windows, report.register_window_count
    ))
}
