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

//! The windowed send and receive protocols.
//!
//! Send, for a payload of `S` bytes and windows of `C` bytes:
//! ```text
//! reset, enter mode ─▶ announce window count ─┐
//!                                             ▼
//!          ┌─▶ write ≤C bytes at offset (+ stop frame after the last one)
//!          │   request send ─▶ wait TX_CH1_DONE ─▶ clear
//!          └── advance offset, wrapping to the base at the window end
//!                                             │ ceil(S/C) times
//!                                             ▼
//!                 card reports 0 pending, S bytes were written
//! ```
//! Receive arms the upstream channel, waits for RX_CH1_DONE, reads one full window and
//! writes out the frames in front of the stop frame.
//!
//! The engine only sees abstract channels (`Read`/`Write` + `Seek`), a [`Registers`] view and
//! a [`CompletionMonitor`]; opening the real devices is the job of
//! [`session`](crate::transfer::session).

use crate::device::completion::CompletionMonitor;
use crate::device::mode::{DeviceMode, ModeSequencer};
use crate::device::registers::{Irq, Registers};
use crate::error::XferError;
use crate::frames::buffer::FrameBuffer;
use crate::frames::codec::is_stop;
use crate::frames::file::FrameWriter;
use crate::frames::{FRAME_BYTES, STOP_FRAME};
use crate::system_io::{fs_read_exact_at, fs_write_at};
use crate::transfer::window::TransferWindow;
use log::{debug, info};
use std::io::{Read, Seek, Write};
use std::path::Path;
use std::time::Duration;

/// Outcome of a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Windows written.
    pub windows: usize,
    /// Window count announced to the card.
    pub register_window_count: u8,
    /// Payload bytes written, not counting the stop frame.
    pub bytes: usize,
}

/// Outcome of a successful receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Frames written to the output.
    pub frames: usize,
    /// Whether the window ended with a stop frame rather than at its last byte.
    pub sentinel_found: bool,
}

/// Runs transfers over one register block and one completion monitor.
pub struct TransferEngine<'a, M: CompletionMonitor + ?Sized> {
    registers: &'a Registers,
    monitor: &'a mut M,
    sequencer: ModeSequencer,
    timeout: Duration,
    verbose: bool,
}

impl<'a, M: CompletionMonitor + ?Sized> TransferEngine<'a, M> {
    /// # Arguments
    ///
    /// * `registers` - The card's control registers
    /// * `monitor` - How window completion is observed
    /// * `sequencer` - Mode setup done before every send
    /// * `timeout` - Longest wait for a single window
    pub fn new(
        registers: &'a Registers,
        monitor: &'a mut M,
        sequencer: ModeSequencer,
        timeout: Duration,
    ) -> Self {
        TransferEngine {
            registers,
            monitor,
            sequencer,
            timeout,
            verbose: false,
        }
    }

    /// Log per-window progress at info level instead of debug.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn progress(&self, msg: std::fmt::Arguments<'_>) {
        if self.verbose {
            info!("{msg}");
        } else {
            debug!("{msg}");
        }
    }

    /// Stream `buffer` into `window` through the host-to-card channel `h2c`.
    ///
    /// Nothing is retried: the first failure aborts the transfer and is returned as is.
    ///
    /// # Arguments
    ///
    /// * `h2c` - The host-to-card channel, addressed by card address
    /// * `h2c_path` - Path of the channel, for error context
    /// * `buffer` - The frames to send, consumed from the start
    /// * `window` - Card window receiving the frames
    /// * `mode` - Mode the card runs the frames in
    ///
    /// # Returns: `Result<TransferReport, XferError>`
    /// * `Ok(TransferReport)` - Every window was consumed by the card
    /// * `Err(XferError::Argument)` - The buffer is empty or needs too many windows
    /// * `Err(XferError::ModeMismatch)` - The card did not enter `mode`
    /// * `Err(XferError::FileIO)` - A window could not be written
    /// * `Err(XferError::Timeout)` - A window was not consumed in time
    /// * `Err(XferError::IncompleteTransfer)` - The card still expects windows afterwards
    pub fn send<W: Write + Seek>(
        &mut self,
        h2c: &mut W,
        h2c_path: &Path,
        buffer: &mut FrameBuffer,
        window: TransferWindow,
        mode: DeviceMode,
    ) -> Result<TransferReport, XferError> {
        if buffer.is_empty() {
            return Err(XferError::Argument("no frames to send".into()));
        }
        let size = buffer.len_bytes();
        let register_window_count = window.register_window_count(size)?;

        self.sequencer.enter(self.registers, mode)?;
        self.registers.set_window_count(register_window_count);

        let windows = window.windows_needed(size);
        info!(
            "Sending {} frames ({size:#x} bytes) in {windows} windows of {:#x} bytes, \
             {register_window_count} announced",
            buffer.frame_count(),
            window.capacity
        );

        buffer.rewind();
        let mut offset = window.base;
        let mut written = 0;
        for index in 0..windows {
            let chunk = buffer.chunk(window.capacity);
            let len = chunk.len();
            fs_write_at(h2c, h2c_path, offset, chunk)?;
            if index + 1 == windows {
                fs_write_at(
                    h2c,
                    h2c_path,
                    offset + len as u64,
                    &STOP_FRAME.to_ne_bytes(),
                )?;
            }

            self.registers.request_send();
            self.monitor
                .wait_for(self.registers, Irq::TxCh1Done, self.timeout)?;
            self.monitor.clear(self.registers, Irq::TxCh1Done);

            buffer.advance(len);
            written += len;
            self.progress(format_args!(
                "window {}/{windows}: {len:#x} bytes at {offset:#x}",
                index + 1
            ));
            offset += len as u64;
            if offset >= window.end() {
                offset = window.base;
            }
        }

        let residual = self.registers.pending_window_count();
        if residual != 0 || written != size {
            return Err(XferError::IncompleteTransfer(format!(
                "{residual} windows still pending on the card, {written:#x} of {size:#x} bytes written"
            )));
        }

        Ok(TransferReport {
            windows,
            register_window_count,
            bytes: written,
        })
    }

    /// Fetch one window from the card-to-host channel `c2h` and write its frames to `out`.
    ///
    /// # Arguments
    ///
    /// * `c2h` - The card-to-host channel, addressed by card address
    /// * `c2h_path` - Path of the channel, for error context
    /// * `out` - Destination of the frames in front of the stop frame
    /// * `window` - Card window to read
    ///
    /// # Returns: `Result<ReceiveReport, XferError>`
    /// * `Ok(ReceiveReport)` - The frames written and whether a stop frame ended them
    /// * `Err(XferError::IncompleteTransfer)` - The card did not produce a window in time
    /// * `Err(XferError::FileIO)` - Reading the window or writing the output failed
    /// * `Err(XferError::OutOfMemory)` - The window buffer could not be allocated
    pub fn receive<R: Read + Seek, O: Write + Seek>(
        &mut self,
        c2h: &mut R,
        c2h_path: &Path,
        out: &mut FrameWriter<'_, O>,
        window: TransferWindow,
    ) -> Result<ReceiveReport, XferError> {
        self.registers.request_receive();
        match self
            .monitor
            .wait_for(self.registers, Irq::RxCh1Done, self.timeout)
        {
            Ok(()) => {}
            Err(XferError::Timeout { what, timeout }) => {
                return Err(XferError::IncompleteTransfer(format!(
                    "no upstream window, {what} was not observed within {timeout:?}"
                )));
            }
            Err(e) => return Err(e),
        }

        let drained = self.drain_window(c2h, c2h_path, out, window);
        self.monitor.clear(self.registers, Irq::RxCh1Done);
        let sentinel_found = drained?;

        let frames = out.frames_written();
        info!(
            "Received {frames} frames ({:#x} bytes){}",
            frames * FRAME_BYTES,
            if sentinel_found {
                ""
            } else {
                ", no stop frame in the window"
            }
        );
        Ok(ReceiveReport {
            frames,
            sentinel_found,
        })
    }

    /// Copy the frames in front of the stop frame of one upstream window to `out`.
    ///
    /// # Returns: `Result<bool, XferError>`
    /// * `Ok(bool)` - Whether a stop frame ended the window
    /// * `Err(XferError)` - Reading the window or writing the output failed
    fn drain_window<R: Read + Seek, O: Write + Seek>(
        &self,
        c2h: &mut R,
        c2h_path: &Path,
        out: &mut FrameWriter<'_, O>,
        window: TransferWindow,
    ) -> Result<bool, XferError> {
        let mut buffer = FrameBuffer::with_len(window.capacity)?;
        fs_read_exact_at(c2h, c2h_path, window.base, buffer.as_bytes_mut())?;
        self.progress(format_args!(
            "window: {:#x} bytes from {:#x}",
            window.capacity, window.base
        ));

        for &frame in buffer.frames() {
            if is_stop(frame) {
                return Ok(true);
            }
            out.write_frame(frame)?;
        }
        Ok(false)
    }
}
