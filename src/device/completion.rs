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

//! Waiting for the card to finish with a window.
//!
//! Two strategies implement [`CompletionMonitor`]:
//!
//! - [`PollMonitor`] re-reads the TX done register at a fixed interval.
//! - [`EventMonitor`] blocks on the user interrupt device and checks each 4-byte event word.
//!
//! Which one is used is a configuration choice, see [`CompletionStrategy`]. Both measure the
//! timeout on the monotonic clock and report [`XferError::Timeout`] when it runs out.

use crate::device::registers::{Irq, Registers};
use crate::error::XferError;
use crate::system_io::{DeviceAccess, fs_open_device};
use log::{debug, trace};
use rustix::event::{PollFd, PollFlags, poll};
use rustix::io::Errno;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default interval between two reads of the TX done register.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const EVENT_WORD_BYTES: usize = 4;

/// How completion is observed, as named in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    #[default]
    Event,
    Poll,
}

impl fmt::Display for CompletionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionKind::Event => write!(f, "event"),
            CompletionKind::Poll => write!(f, "poll"),
        }
    }
}

/// Resolved completion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStrategy {
    Event,
    Poll { interval: Duration },
}

impl CompletionStrategy {
    /// Build the monitor for this strategy.
    ///
    /// # Arguments
    ///
    /// * `events` - The user interrupt device, only opened for [`CompletionStrategy::Event`]
    pub fn open(&self, events: &Path) -> Result<Box<dyn CompletionMonitor>, XferError> {
        match *self {
            CompletionStrategy::Poll { interval } => Ok(Box::new(PollMonitor::new(interval))),
            CompletionStrategy::Event => Ok(Box::new(EventMonitor::open(events)?)),
        }
    }
}

/// Observes and acknowledges completion of a window.
pub trait CompletionMonitor {
    /// Block until `irq` is signalled or `timeout` has passed.
    ///
    /// # Returns: `Result<(), XferError>`
    /// * `Ok(())` - `irq` was observed
    /// * `Err(XferError::Timeout)` - `irq` was not observed in time
    fn wait_for(
        &mut self,
        registers: &Registers,
        irq: Irq,
        timeout: Duration,
    ) -> Result<(), XferError>;

    /// Acknowledge `irq` so the next window starts from a cleared bit.
    fn clear(&mut self, registers: &Registers, irq: Irq);
}

fn elapsed_since(start: Instant) -> Result<Duration, XferError> {
    Instant::now()
        .checked_duration_since(start)
        .ok_or_else(|| XferError::Internal("monotonic clock went backwards".into()))
}

/// Completion by reading the TX done register.
#[derive(Debug, Clone, Copy)]
pub struct PollMonitor {
    interval: Duration,
}

impl PollMonitor {
    pub fn new(interval: Duration) -> Self {
        PollMonitor { interval }
    }
}

impl CompletionMonitor for PollMonitor {
    fn wait_for(
        &mut self,
        registers: &Registers,
        irq: Irq,
        timeout: Duration,
    ) -> Result<(), XferError> {
        let start = Instant::now();
        loop {
            let status = registers.completion_status();
            if status & irq.mask() != 0 {
                debug!("{irq} set in TX done register ({status:#x})");
                return Ok(());
            }
            let elapsed = elapsed_since(start)?;
            if elapsed >= timeout {
                return Err(XferError::Timeout {
                    what: irq.to_string(),
                    timeout,
                });
            }
            std::thread::sleep(self.interval.min(timeout - elapsed));
        }
    }

    fn clear(&mut self, registers: &Registers, irq: Irq) {
        registers.clear_completion(irq);
    }
}

/// Completion by reading event words from the user interrupt device.
#[derive(Debug)]
pub struct EventMonitor {
    file: File,
    path: PathBuf,
}

impl EventMonitor {
    /// Open the interrupt device at `path`.
    pub fn open(path: &Path) -> Result<Self, XferError> {
        let file = fs_open_device(path, DeviceAccess::ReadWrite)?;
        Ok(EventMonitor::from_file(file, path))
    }

    /// Wrap an already open event source.
    pub fn from_file(file: File, path: &Path) -> Self {
        EventMonitor {
            file,
            path: path.into(),
        }
    }

    fn io_error(&self, op: &'static str, e: std::io::Error) -> XferError {
        XferError::FileIO {
            op,
            file: self.path.clone(),
            offset: 0,
            e,
        }
    }

    /// Wait up to `remaining` for the device to become readable.
    fn readable_within(&self, remaining: Duration) -> Result<bool, XferError> {
        let timeout_ms = i32::try_from(remaining.as_millis()).unwrap_or(i32::MAX);
        let mut fds = [PollFd::new(&self.file, PollFlags::IN)];
        match poll(&mut fds, timeout_ms) {
            Ok(0) => Ok(false),
            Ok(_) => Ok(true),
            Err(Errno::INTR) => Ok(false),
            Err(e) => Err(self.io_error("poll", e.into())),
        }
    }

    fn read_word(&mut self) -> Result<u32, XferError> {
        let mut word = [0u8; EVENT_WORD_BYTES];
        let n = self
            .file
            .read(&mut word)
            .map_err(|e| self.io_error("read", e))?;
        if n != EVENT_WORD_BYTES {
            return Err(self.io_error(
                "read",
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("short read {n}/{EVENT_WORD_BYTES} of event word"),
                ),
            ));
        }
        Ok(u32::from_le_bytes(word))
    }
}

impl CompletionMonitor for EventMonitor {
    fn wait_for(
        &mut self,
        _registers: &Registers,
        irq: Irq,
        timeout: Duration,
    ) -> Result<(), XferError> {
        let start = Instant::now();
        loop {
            let elapsed = elapsed_since(start)?;
            if elapsed >= timeout {
                return Err(XferError::Timeout {
                    what: irq.to_string(),
                    timeout,
                });
            }
            if !self.readable_within(timeout - elapsed)? {
                continue;
            }
            let word = self.read_word()?;
            if word & irq.mask() != 0 {
                debug!("{irq} triggered (event word {word:#x})");
                return Ok(());
            }
            trace!("Event word {word:#x} from {:?} without {irq}", self.path);
        }
    }

    fn clear(&mut self, registers: &Registers, irq: Irq) {
        registers.clear_irq(irq);
    }
}
