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

//! The user register block mapped into the process.
//!
//! All raw pointer access of the crate lives here. The mapping is shared and backed by the
//! device node opened `O_RDWR | O_SYNC`, so every volatile store reaches the card.

use crate::device::registers::{MAP_SIZE, RegisterSpace};
use crate::error::XferError;
use crate::system_io::{DeviceAccess, fs_open_device};
use log::{debug, trace};
use rustix::mm::{MapFlags, ProtFlags, mmap, munmap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// A shared mapping of the first [`MAP_SIZE`] bytes of a register device.
///
/// The device stays open for as long as the mapping exists; both are released on drop.
pub struct MappedRegisters {
    ptr: NonNull<u8>,
    size: usize,
    device: PathBuf,
    _file: File,
}

impl std::fmt::Debug for MappedRegisters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegisters")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("size", &self.size)
            .field("device", &self.device)
            .finish()
    }
}

impl MappedRegisters {
    /// Open `device` and map its register block.
    ///
    /// # Returns: `Result<MappedRegisters, XferError>`
    /// * `Ok(MappedRegisters)` - The block, unmapped and closed when dropped
    /// * `Err(XferError::DeviceUnavailable)` - The device could not be opened
    /// * `Err(XferError::MappingFailed)` - `mmap` failed
    pub fn map(device: &Path) -> Result<Self, XferError> {
        let file = fs_open_device(device, DeviceAccess::ReadWriteSync)?;

        // SAFETY: a fresh shared mapping chosen by the kernel, so it cannot alias any Rust
        // allocation. The pointer is only used through bounds-checked volatile accesses.
        let raw = unsafe {
            mmap(
                std::ptr::null_mut(),
                MAP_SIZE,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &file,
                0,
            )
        }
        .map_err(|e| XferError::MappingFailed {
            device: device.into(),
            reason: format!("mmap of {MAP_SIZE:#x} bytes failed: {e}"),
        })?;

        let ptr = NonNull::new(raw.cast::<u8>()).ok_or_else(|| XferError::MappingFailed {
            device: device.into(),
            reason: "mmap returned a null mapping".into(),
        })?;
        debug!("Mapped {device:?} at {ptr:p}, size={MAP_SIZE:#x}");

        Ok(MappedRegisters {
            ptr,
            size: MAP_SIZE,
            device: device.into(),
            _file: file,
        })
    }

    fn register_ptr(&self, offset: usize) -> *mut u32 {
        assert!(
            offset % 4 == 0 && offset + 4 <= self.size,
            "register offset {offset:#x} outside the {:#x} byte block",
            self.size
        );
        // SAFETY: offset + 4 <= size, so the result stays inside the mapping.
        unsafe { self.ptr.as_ptr().add(offset).cast::<u32>() }
    }
}

impl RegisterSpace for MappedRegisters {
    fn source(&self) -> &Path {
        &self.device
    }

    fn size(&self) -> usize {
        self.size
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let reg = self.register_ptr(offset);
        // SAFETY: reg is aligned and inside the live mapping. Volatile because the card
        // changes the value behind our back.
        u32::from_le(unsafe { std::ptr::read_volatile(reg) })
    }

    fn write_u32(&self, offset: usize, value: u32) {
        let reg = self.register_ptr(offset);
        // SAFETY: reg is aligned and inside the live mapping. The store is a hardware side
        // effect and must not be elided.
        unsafe { std::ptr::write_volatile(reg, value.to_le()) }
    }
}

impl Drop for MappedRegisters {
    fn drop(&mut self) {
        // SAFETY: ptr and size come from the successful mmap in map(), and drop runs once.
        if let Err(e) = unsafe { munmap(self.ptr.as_ptr().cast(), self.size) } {
            debug!("munmap of {:?} failed: {e}", self.device);
            return;
        }
        trace!("Unmapped {:?}", self.device);
    }
}
