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

use crate::device::mode::DeviceMode;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum XferError {
    #[error("XferError::DeviceUnavailable: Failed to open {device:?}: {e}")]
    DeviceUnavailable { device: PathBuf, e: std::io::Error },
    #[error("XferError::MappingFailed: Failed to map registers of {device:?}: {reason}")]
    MappingFailed { device: PathBuf, reason: String },
    #[error(
        "XferError::ModeMismatch: Requested mode {requested} but the device reports {actual} (raw value {raw:#x})"
    )]
    ModeMismatch {
        requested: DeviceMode,
        actual: DeviceMode,
        raw: u32,
    },
    #[error("XferError::FileNotFound: Could not open {file:?}: {e}")]
    FileNotFound { file: PathBuf, e: std::io::Error },
    #[error("XferError::FileIO: {op} {file:?} at {offset:#x} failed: {e}")]
    FileIO {
        op: &'static str,
        file: PathBuf,
        offset: u64,
        e: std::io::Error,
    },
    #[error("XferError::Format: {0}")]
    Format(String),
    #[error("XferError::Timeout: {what} was not observed within {timeout:?}")]
    Timeout { what: String, timeout: Duration },
    #[error("XferError::IncompleteTransfer: {0}")]
    IncompleteTransfer(String),
    #[error("XferError::OutOfMemory: Could not allocate {bytes} bytes for {what}")]
    OutOfMemory { what: &'static str, bytes: usize },
    #[error("XferError::Argument: {0}")]
    Argument(String),
    #[error("XferError::TomlDe: Failed to parse config {toml_string:?}: {e}")]
    TomlDe {
        toml_string: String,
        e: toml::de::Error,
    },
    #[error("XferError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}

impl XferError {
    /// The negative errno-style code the command line exits with for this error.
    pub fn code(&self) -> i32 {
        const ENOENT: i32 = 2;
        const EIO: i32 = 5;
        const ENXIO: i32 = 6;
        const ENOMEM: i32 = 12;
        const EFAULT: i32 = 14;
        const EINVAL: i32 = 22;
        const ETIMEDOUT: i32 = 110;

        -match self {
            XferError::DeviceUnavailable { .. } => ENXIO,
            XferError::MappingFailed { .. } => ENOMEM,
            XferError::ModeMismatch { .. } => EINVAL,
            XferError::FileNotFound { .. } => ENOENT,
            XferError::FileIO { .. } => EIO,
            XferError::Format(..) => EINVAL,
            XferError::Timeout { .. } => ETIMEDOUT,
            XferError::IncompleteTransfer(..) => EIO,
            XferError::OutOfMemory { .. } => ENOMEM,
            XferError::Argument(..) => EINVAL,
            XferError::TomlDe { .. } => EINVAL,
            XferError::Internal(..) => EFAULT,
        }
    }
}
