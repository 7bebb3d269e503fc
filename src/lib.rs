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

//! bramxfer - moving 64-bit frames between host files and the BRAM of an XDMA FPGA card.
//!
//! The card exposes a 256 KiB block memory window per direction. Sending a frame file
//! resets the card, brings it into `CONFIG` or `WORK` mode and streams the frames through
//! the downstream window one window at a time, waiting for the card to drain each window
//! before writing the next. The last window carries an all-ones stop frame right after the
//! payload. Receiving reads the upstream window once and writes every frame in front of the
//! stop frame to a file.
//!
//! # Layout
//!
//! - [`frames`] - frame codec, page-aligned frame buffers and frame files
//! - [`device`] - user registers, completion monitors and the mode sequencer
//! - [`transfer`] - BRAM windows, the send and receive engine, and complete sessions
//! - [`config`] - layered TOML configuration resolved into a [`config::TransferConfig`]
//! - [`system_io`] - file and device helpers that attach context to every error
//! - [`error`] - the crate error type, [`error::XferError`]
//!
//! # Logging
//!
//! Everything logs through the `log` facade. File and register accesses are logged at
//! `trace`, protocol milestones at `debug` and `info`, configuration fallbacks at `warn`.
//! Installing a logger is left to the binary.

pub mod config;
pub mod device;
pub mod error;
pub mod frames;
pub mod system_io;
pub mod transfer;
