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

//! Page-aligned frame storage.
//!
//! The XDMA driver can DMA straight out of (and into) a user buffer when it is page aligned,
//! so the storage is a vector of 4 KiB aligned pages viewed as frames or bytes through
//! `bytemuck`. The buffer also carries a cursor, used by the send path to walk the payload
//! one window at a time.

use crate::error::XferError;
use crate::frames::{FRAME_BYTES, Frame};
use bytemuck::{Pod, Zeroable};
use log::trace;

/// Alignment of the storage in bytes.
pub const PAGE_BYTES: usize = 4096;

const FRAMES_PER_PAGE: usize = PAGE_BYTES / FRAME_BYTES;

#[derive(Clone, Copy)]
#[repr(C, align(4096))]
struct Page([Frame; FRAMES_PER_PAGE]);

// SAFETY: Page is a plain array of u64 whose size equals its alignment, so it has no padding
// and every bit pattern is a valid value.
unsafe impl Zeroable for Page {}
// SAFETY: see above.
unsafe impl Pod for Page {}

/// An owned, contiguous, page-aligned array of frames with a byte length and a cursor.
///
/// The byte length is always a multiple of [`FRAME_BYTES`].
pub struct FrameBuffer {
    pages: Vec<Page>,
    len_bytes: usize,
    offset: usize,
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("ptr", &format_args!("{:p}", self.pages.as_ptr()))
            .field("len_bytes", &self.len_bytes)
            .field("offset", &self.offset)
            .finish()
    }
}

impl FrameBuffer {
    /// Allocate a zeroed buffer of `len_bytes` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `len_bytes` is not a multiple of [`FRAME_BYTES`].
    ///
    /// # Returns: `Result<FrameBuffer, XferError>`
    /// * `Ok(FrameBuffer)` - Zero-filled buffer with its cursor at the start
    /// * `Err(XferError::OutOfMemory)` - The allocation failed
    pub fn with_len(len_bytes: usize) -> Result<FrameBuffer, XferError> {
        assert!(
            len_bytes % FRAME_BYTES == 0,
            "frame buffer length {len_bytes} is not a multiple of {FRAME_BYTES}"
        );
        let page_count = len_bytes.div_ceil(PAGE_BYTES);
        let mut pages = Vec::new();
        pages
            .try_reserve_exact(page_count)
            .map_err(|_| XferError::OutOfMemory {
                what: "frame buffer",
                bytes: page_count * PAGE_BYTES,
            })?;
        pages.resize(page_count, Page::zeroed());
        trace!("Allocated {page_count} pages for a {len_bytes:#x} byte frame buffer");
        Ok(FrameBuffer {
            pages,
            len_bytes,
            offset: 0,
        })
    }

    /// Allocate a buffer holding a copy of `frames`.
    pub fn from_frames(frames: &[Frame]) -> Result<FrameBuffer, XferError> {
        let mut buffer = FrameBuffer::with_len(frames.len() * FRAME_BYTES)?;
        buffer.frames_mut().copy_from_slice(frames);
        Ok(buffer)
    }

    pub fn len_bytes(&self) -> usize {
        self.len_bytes
    }

    pub fn frame_count(&self) -> usize {
        self.len_bytes / FRAME_BYTES
    }

    pub fn is_empty(&self) -> bool {
        self.len_bytes == 0
    }

    pub fn frames(&self) -> &[Frame] {
        &bytemuck::cast_slice::<Page, Frame>(&self.pages)[..self.frame_count()]
    }

    pub fn frames_mut(&mut self) -> &mut [Frame] {
        let count = self.frame_count();
        &mut bytemuck::cast_slice_mut::<Page, Frame>(&mut self.pages)[..count]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<Page, u8>(&self.pages)[..self.len_bytes]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len_bytes;
        &mut bytemuck::cast_slice_mut::<Page, u8>(&mut self.pages)[..len]
    }

    /// Shrink the buffer to its first `count` frames. The allocation is kept.
    pub fn truncate_frames(&mut self, count: usize) {
        self.len_bytes = self.len_bytes.min(count * FRAME_BYTES);
        self.offset = self.offset.min(self.len_bytes);
    }

    /// Bytes between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.len_bytes - self.offset
    }

    /// The next at most `max` bytes after the cursor, without moving it.
    pub fn chunk(&self, max: usize) -> &[u8] {
        let end = self.offset + max.min(self.remaining());
        &self.as_bytes()[self.offset..end]
    }

    /// Move the cursor forward by `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if this would move the cursor past the end of the buffer.
    pub fn advance(&mut self, bytes: usize) {
        assert!(
            bytes <= self.remaining(),
            "advancing {bytes} bytes past the end of the frame buffer"
        );
        self.offset += bytes;
    }

    pub fn rewind(&mut self) {
        self.offset = 0;
    }
}
