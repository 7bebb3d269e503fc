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

//! Frames and everything that holds them on the host side.
//!
//! - [`codec`] converts a single frame to and from its text line or raw binary form
//! - [`buffer`] is the page-aligned storage a transfer works on
//! - [`file`] loads frame files into a buffer and writes received frames back out

pub mod buffer;
pub mod codec;
pub mod file;

/// A 64-bit data word, the atomic unit of transfer.
pub type Frame = u64;

/// Reserved frame marking end-of-stream in both directions.
pub const STOP_FRAME: Frame = 0xFFFF_FFFF_FFFF_FFFF;

/// Size of one frame in bytes.
pub const FRAME_BYTES: usize = std::mem::size_of::<Frame>();
