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

use bramxfer::config::{OUTPUT_FRAMES, TransferConfig};
use bramxfer::error::XferError;
use bramxfer::transfer::session::device_to_frames_file;
use std::path::Path;

/// Runs the receive command
pub fn receive_handler(config: &TransferConfig, output: Option<&Path>) -> Result<String, XferError> {
    let output = output.unwrap_or(Path::new(OUTPUT_FRAMES));
    let report = device_to_frames_file(config, output)?;
    let ending = if report.sentinel_found {
        "stop frame reached"
    } else {
        "no stop frame in the window"
    };
    Ok(format!(
        "Received {} frames into {output:?}, {ending}",
        report.frames
    ))
}
