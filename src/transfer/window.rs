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

//! BRAM windows on the card.
//!
//! A payload larger than a window is sent as a series of windows that all land at the same
//! card addresses; the card drains each one before the next is written.

use crate::error::XferError;
use crate::frames::FRAME_BYTES;

/// Size of one channel's BRAM window.
pub const BRAM_WINDOW_BYTES: usize = 0x40000;

/// A region of card memory reachable through a DMA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferWindow {
    /// Card address of the first byte.
    pub base: u64,
    /// Bytes of payload one window holds.
    pub capacity: usize,
}

/// Host-to-card window of channel 1.
pub const DOWNSTREAM_CH1: TransferWindow = TransferWindow::new(0xC000_0000, BRAM_WINDOW_BYTES);
/// Card-to-host window of channel 1.
pub const UPSTREAM_CH1: TransferWindow = TransferWindow::new(0xC200_0000, BRAM_WINDOW_BYTES);

impl TransferWindow {
    /// # Panics
    ///
    /// Panics if `capacity` is zero or not a whole number of frames.
    pub const fn new(base: u64, capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity % FRAME_BYTES == 0,
            "window capacity must be a non-zero number of frames"
        );
        TransferWindow { base, capacity }
    }

    /// Number of windows the engine writes for a `size` byte payload.
    pub fn windows_needed(&self, size: usize) -> usize {
        size.div_ceil(self.capacity)
    }

    /// Window count announced to the card for a `size` byte payload.
    ///
    /// The card rounds to the nearest window, not up, so this can differ from
    /// [`TransferWindow::windows_needed`] by one.
    ///
    /// # Returns: `Result<u8, XferError>`
    /// * `Ok(u8)` - The count for the transaction info register
    /// * `Err(XferError::Argument)` - The count does not fit the 8-bit field
    pub fn register_window_count(&self, size: usize) -> Result<u8, XferError> {
        let count = (size + self.capacity / 2) / self.capacity;
        u8::try_from(count).map_err(|_| {
            XferError::Argument(format!(
                "{size:#x} bytes need {count} windows of {:#x} bytes, the card counts at most {}",
                self.capacity,
                u8::MAX
            ))
        })
    }

    /// Card address one past the last byte of the window.
    pub fn end(&self) -> u64 {
        self.base + self.capacity as u64
    }
}
