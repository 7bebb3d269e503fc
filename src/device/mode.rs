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

//! Device modes and the sequencer that moves the card between them.
//!
//! ```text
//! RESET ──▶ CONFIG ──▶ WORK
//!   ▲          │         │
//!   └──────────┴─────────┘   every transfer starts with a reset
//! ```
//! Any read-back the sequencer does not recognise is [`DeviceMode::Unknown`]. The sequencer
//! keeps no state of its own: the hardware register is the only source of truth, and it is
//! re-read on every entry.

use crate::device::registers::Registers;
use crate::error::XferError;
use log::{debug, info};
use std::fmt;
use std::time::Duration;

/// Operating mode of the card, as encoded in the mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Reset = 0,
    Config = 1,
    Work = 2,
    Unknown = 3,
}

impl DeviceMode {
    pub fn from_raw(raw: u32) -> DeviceMode {
        match raw {
            0 => DeviceMode::Reset,
            1 => DeviceMode::Config,
            2 => DeviceMode::Work,
            _ => DeviceMode::Unknown,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceMode::Reset => "RESET",
            DeviceMode::Config => "CONFIG",
            DeviceMode::Work => "WORK",
            DeviceMode::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

/// Resets the card and brings it into a target mode, verifying the read-back.
#[derive(Debug, Clone, Copy)]
pub struct ModeSequencer {
    settle: Duration,
}

impl ModeSequencer {
    /// # Arguments
    ///
    /// * `settle` - How long the card gets to switch modes before the read-back
    pub fn new(settle: Duration) -> Self {
        ModeSequencer { settle }
    }

    /// Reset the card, request `target`, and verify the card reports it after the settle
    /// delay. The reset gets the same delay before it is verified.
    ///
    /// # Returns: `Result<(), XferError>`
    /// * `Ok(())` - The card reports `target`
    /// * `Err(XferError::Argument)` - `target` is not `CONFIG` or `WORK`
    /// * `Err(XferError::ModeMismatch)` - The card did not reset, or reports another mode
    pub fn enter(&self, registers: &Registers, target: DeviceMode) -> Result<(), XferError> {
        if !matches!(target, DeviceMode::Config | DeviceMode::Work) {
            return Err(XferError::Argument(format!(
                "{target} is not a mode a transfer can run in"
            )));
        }

        registers.set_mode(DeviceMode::Reset);
        std::thread::sleep(self.settle);
        verify(registers, DeviceMode::Reset)?;
        debug!("Device reset");

        registers.set_mode(target);
        std::thread::sleep(self.settle);
        verify(registers, target)?;
        info!("Hardware now is in mode {target}");
        Ok(())
    }
}

fn verify(registers: &Registers, expected: DeviceMode) -> Result<(), XferError> {
    let raw = registers.mode_raw();
    let actual = DeviceMode::from_raw(raw);
    if actual != expected {
        return Err(XferError::ModeMismatch {
            requested: expected,
            actual,
            raw,
        });
    }
    Ok(())
}
