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

//! Access to the card's user register block and its completion signals.
//!
//! The XDMA driver exposes the card as a handful of character devices:
//! ```text
//! /dev/xdma0_h2c_0      host-to-card DMA channel, seek to the card address then write
//! /dev/xdma0_c2h_0      card-to-host DMA channel, seek to the card address then read
//! /dev/xdma0_user       4 KiB user register block, mmap'd
//! /dev/xdma0_events_0   user interrupt 0, a blocking read returns a 4-byte word
//! ```
//! The DMA channels are plain files as far as this crate is concerned. This module covers
//! the other two:
//!
//! - [`registers`] - typed access to the control registers over any [`registers::RegisterSpace`]
//! - [`mapped`] - the mmap-backed register space of `/dev/xdma0_user`
//! - [`completion`] - waiting for a window to be consumed or produced
//! - [`mode`] - bringing the card into the configure or work mode

pub mod completion;
pub mod mapped;
pub mod mode;
pub mod registers;
