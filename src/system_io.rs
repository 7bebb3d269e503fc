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

//! Error Wrapping File System I/O Helpers
//!
//! This module provides thin wrappers around the file operations the transfer path needs,
//! with automatic conversion to `XferError` types. All functions include trace logging
//! and attach the path, operation and offset to any error.
//!
//! Short reads and short writes are reported as errors. A device that accepts fewer bytes
//! than requested has not taken the window, so nothing here retries or pads.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use bramxfer::system_io::{fs_open_device, fs_write_at, DeviceAccess};
//! # use std::path::Path;
//! # fn example() -> Result<(), bramxfer::error::XferError> {
//! let path = Path::new("/dev/xdma0_h2c_0");
//! let mut h2c = fs_open_device(path, DeviceAccess::ReadWrite)?;
//! fs_write_at(&mut h2c, path, 0xC000_0000, &[0u8; 8])?;
//! # Ok(())
//! # }
//! ```

use crate::error::XferError;
use log::trace;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// How a character device is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAccess {
    /// `O_RDONLY`, used for the card-to-host channel.
    ReadOnly,
    /// `O_RDWR`, used for the host-to-card channel and the event channel.
    ReadWrite,
    /// `O_RDWR | O_SYNC`, used for the user register block before mapping it.
    ReadWriteSync,
}

/// Read the contents of a file to a String.
///
/// # Returns: `Result<String, XferError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(XferError::FileNotFound)` - The file does not exist
/// * `Err(XferError::FileIO)` - Any other read failure
pub fn fs_read(file_path: &Path) -> Result<String, XferError> {
    trace!("Attempting to read from {file_path:?}");
    let mut buf = String::new();
    let mut file = fs_open_input(file_path)?;
    match file.read_to_string(&mut buf) {
        Ok(_) => {
            trace!("Reading done");
            Ok(buf)
        }
        Err(e) => Err(XferError::FileIO {
            op: "read",
            file: file_path.into(),
            offset: 0,
            e,
        }),
    }
}

/// Open a character device of the XDMA driver.
///
/// # Arguments
///
/// * `device` - Path of the device node, e.g. `/dev/xdma0_h2c_0`
/// * `access` - Open mode, see [`DeviceAccess`]
///
/// # Returns: `Result<File, XferError>`
/// * `Ok(File)` - The open descriptor, closed when dropped
/// * `Err(XferError::DeviceUnavailable)` - The device could not be opened
pub fn fs_open_device(device: &Path, access: DeviceAccess) -> Result<File, XferError> {
    trace!("Opening device {device:?} as {access:?}");
    let mut options = OpenOptions::new();
    options.read(true);
    match access {
        DeviceAccess::ReadOnly => {}
        DeviceAccess::ReadWrite => {
            options.write(true);
        }
        DeviceAccess::ReadWriteSync => {
            options
                .write(true)
                .custom_flags(rustix::fs::OFlags::SYNC.bits() as i32);
        }
    }
    options.open(device).map_err(|e| XferError::DeviceUnavailable {
        device: device.into(),
        e,
    })
}

/// Open an existing frame file for reading.
///
/// # Returns: `Result<File, XferError>`
/// * `Ok(File)` - The open file
/// * `Err(XferError::FileNotFound)` - The file is missing or cannot be opened
pub fn fs_open_input(file_path: &Path) -> Result<File, XferError> {
    trace!("Opening input {file_path:?}");
    OpenOptions::new()
        .read(true)
        .open(file_path)
        .map_err(|e| XferError::FileNotFound {
            file: file_path.into(),
            e,
        })
}

/// Create (or truncate) an output frame file with mode `0666` before the umask.
pub fn fs_create_output(file_path: &Path) -> Result<File, XferError> {
    trace!("Creating output {file_path:?}");
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o666)
        .open(file_path)
        .map_err(|e| XferError::FileNotFound {
            file: file_path.into(),
            e,
        })
}

/// Size of an open file in bytes.
pub fn fs_file_size(file: &File, file_path: &Path) -> Result<u64, XferError> {
    file.metadata()
        .map(|m| m.len())
        .map_err(|e| XferError::FileIO {
            op: "stat",
            file: file_path.into(),
            offset: 0,
            e,
        })
}

fn seek_to<S: Seek>(target: &mut S, file_path: &Path, offset: u64) -> Result<(), XferError> {
    match target.seek(SeekFrom::Start(offset)) {
        Ok(pos) if pos == offset => Ok(()),
        Ok(pos) => Err(XferError::FileIO {
            op: "seek",
            file: file_path.into(),
            offset,
            e: std::io::Error::other(format!("landed at {pos:#x} instead")),
        }),
        Err(e) => Err(XferError::FileIO {
            op: "seek",
            file: file_path.into(),
            offset,
            e,
        }),
    }
}

/// Seek to `offset` and write `data` with a single write call.
///
/// # Arguments
///
/// * `target` - The open device or file
/// * `file_path` - Path used for error context only
/// * `offset` - Absolute offset, for DMA channels this is the card address
/// * `data` - Bytes to write
///
/// # Returns: `Result<(), XferError>`
/// * `Ok(())` - Every byte was accepted
/// * `Err(XferError::FileIO)` - The seek failed, the write failed or it was short
pub fn fs_write_at<W: Write + Seek>(
    target: &mut W,
    file_path: &Path,
    offset: u64,
    data: &[u8],
) -> Result<(), XferError> {
    trace!(
        "Writing {:#x} bytes to {file_path:?} at {offset:#x}",
        data.len()
    );
    seek_to(target, file_path, offset)?;
    match target.write(data) {
        Ok(n) if n == data.len() => {
            trace!("Write done.");
            Ok(())
        }
        Ok(n) => Err(XferError::FileIO {
            op: "write",
            file: file_path.into(),
            offset,
            e: std::io::Error::new(
                ErrorKind::WriteZero,
                format!("short write {n:#x}/{:#x}", data.len()),
            ),
        }),
        Err(e) => Err(XferError::FileIO {
            op: "write",
            file: file_path.into(),
            offset,
            e,
        }),
    }
}

/// Seek to `offset` and fill `buf` with a single read call.
///
/// # Returns: `Result<(), XferError>`
/// * `Ok(())` - `buf` was filled completely
/// * `Err(XferError::FileIO)` - The seek failed, the read failed or it was short
pub fn fs_read_exact_at<R: Read + Seek>(
    source: &mut R,
    file_path: &Path,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), XferError> {
    trace!(
        "Reading {:#x} bytes from {file_path:?} at {offset:#x}",
        buf.len()
    );
    seek_to(source, file_path, offset)?;
    match source.read(buf) {
        Ok(n) if n == buf.len() => {
            trace!("Reading done");
            Ok(())
        }
        Ok(n) => Err(XferError::FileIO {
            op: "read",
            file: file_path.into(),
            offset,
            e: std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("short read {n:#x}/{:#x}", buf.len()),
            ),
        }),
        Err(e) => Err(XferError::FileIO {
            op: "read",
            file: file_path.into(),
            offset,
            e,
        }),
    }
}
