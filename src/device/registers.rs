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

//! Register interface of the user register block.
//!
//! The block is 4 KiB of 32-bit little-endian registers. Their offsets are not fixed across
//! board revisions, so they are carried in a [`RegisterLayout`] resolved from configuration
//! at startup. [`Registers`] checks every offset of its layout against the size of the
//! underlying [`RegisterSpace`] when it is built; after that, the typed operations cannot
//! address memory outside the block.
//!
//! # Default register map
//!
//! ```text
//! 0x00  interrupt status      RO
//! 0x04  interrupt control     RW  one bit per Irq, cleared by the host
//! 0x08  mode                  RW  RESET=0 CONFIG=1 WORK=2
//! 0x0C  TX status/control     RW  READY=0 SENDING=1 DONE=2
//! 0x10  RX status/control     RW  READY=0 RECEIVING=1 DONE=2
//! 0x14  transaction info      RW  bits 0..8 window count, the rest flags
//! 0x18  TX done / byte count  RW  bit per Irq, polled by the host
//! ```

use crate::device::mode::DeviceMode;
use crate::error::XferError;
use log::trace;
use std::fmt;
use std::path::Path;

/// Size of the mapped user register block.
pub const MAP_SIZE: usize = 4 * 1024;

const REGISTER_BYTES: usize = 4;

/// TX status value requesting the card to consume the downstream window.
pub const TX_STATUS_SENDING: u32 = 1;
/// RX status value telling the card the host is ready for the upstream window.
pub const RX_STATUS_RECEIVING: u32 = 1;

const WINDOW_COUNT_MASK: u32 = 0xFF;

/// Byte offsets of the control registers inside the user register block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    pub irq_status: usize,
    pub irq_control: usize,
    pub mode: usize,
    pub tx_status: usize,
    pub rx_status: usize,
    pub trans_info: usize,
    pub tx_done: usize,
}

impl Default for RegisterLayout {
    fn default() -> Self {
        RegisterLayout {
            irq_status: 0x00,
            irq_control: 0x04,
            mode: 0x08,
            tx_status: 0x0C,
            rx_status: 0x10,
            trans_info: 0x14,
            tx_done: 0x18,
        }
    }
}

impl RegisterLayout {
    fn named_offsets(&self) -> [(&'static str, usize); 7] {
        [
            ("irq_status", self.irq_status),
            ("irq_control", self.irq_control),
            ("mode", self.mode),
            ("tx_status", self.tx_status),
            ("rx_status", self.rx_status),
            ("trans_info", self.trans_info),
            ("tx_done", self.tx_done),
        ]
    }
}

/// Named completion interrupts. The discriminant is the bit index, both in the event word
/// and in the interrupt control and TX done registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Irq {
    TxCh1Done = 0,
    RxCh1Done = 1,
    TxCh2Done = 2,
    RxCh2Done = 3,
}

impl Irq {
    pub fn mask(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Irq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Irq::TxCh1Done => "TX_CH1_DONE",
            Irq::RxCh1Done => "RX_CH1_DONE",
            Irq::TxCh2Done => "TX_CH2_DONE",
            Irq::RxCh2Done => "RX_CH2_DONE",
        };
        write!(f, "{name}")
    }
}

/// A block of 32-bit registers addressed by byte offset.
///
/// Implementations own whatever backs the block (a device mapping, or memory in tests).
/// `write_u32` takes `&self`: register writes are hardware side effects, not mutations of
/// host-side state.
pub trait RegisterSpace {
    /// Device or description of the backing store, for error messages.
    fn source(&self) -> &Path;

    /// Size of the block in bytes.
    fn size(&self) -> usize;

    /// Load the register at `offset`, converted to host order.
    fn read_u32(&self, offset: usize) -> u32;

    /// Store `value` to the register at `offset`, converted from host order.
    fn write_u32(&self, offset: usize, value: u32);
}

/// Typed access to the control registers through a validated [`RegisterLayout`].
pub struct Registers {
    space: Box<dyn RegisterSpace>,
    layout: RegisterLayout,
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registers")
            .field("source", &self.space.source())
            .field("size", &self.space.size())
            .field("layout", &self.layout)
            .finish()
    }
}

impl Registers {
    /// Wrap a register space, rejecting a layout that does not fit inside it.
    ///
    /// # Returns: `Result<Registers, XferError>`
    /// * `Ok(Registers)` - Every register of `layout` is aligned and inside `space`
    /// * `Err(XferError::MappingFailed)` - An offset is out of range or misaligned
    pub fn new(space: Box<dyn RegisterSpace>, layout: RegisterLayout) -> Result<Self, XferError> {
        for (name, offset) in layout.named_offsets() {
            if offset % REGISTER_BYTES != 0 || offset + REGISTER_BYTES > space.size() {
                return Err(XferError::MappingFailed {
                    device: space.source().into(),
                    reason: format!(
                        "register {name} at {offset:#x} does not fit a {:#x} byte block",
                        space.size()
                    ),
                });
            }
        }
        Ok(Registers { space, layout })
    }

    pub fn write_register(&self, offset: usize, value: u32) {
        trace!("reg[{offset:#04x}] <- {value:#x}");
        self.space.write_u32(offset, value);
    }

    pub fn read_register(&self, offset: usize) -> u32 {
        let value = self.space.read_u32(offset);
        trace!("reg[{offset:#04x}] -> {value:#x}");
        value
    }

    pub fn set_mode(&self, mode: DeviceMode) {
        self.write_register(self.layout.mode, mode.raw());
    }

    /// Raw content of the mode register.
    pub fn mode_raw(&self) -> u32 {
        self.read_register(self.layout.mode)
    }

    /// Mode reported by the hardware, [`DeviceMode::Unknown`] for unrecognised values.
    pub fn get_mode(&self) -> DeviceMode {
        DeviceMode::from_raw(self.mode_raw())
    }

    pub fn request_send(&self) {
        self.write_register(self.layout.tx_status, TX_STATUS_SENDING);
    }

    pub fn request_receive(&self) {
        self.write_register(self.layout.rx_status, RX_STATUS_RECEIVING);
    }

    /// Windows the card still expects for the current transaction.
    pub fn pending_window_count(&self) -> u8 {
        (self.read_register(self.layout.trans_info) & WINDOW_COUNT_MASK) as u8
    }

    /// Record the window count of a new transaction, leaving the flag bits alone.
    pub fn set_window_count(&self, count: u8) {
        let flags = self.read_register(self.layout.trans_info) & !WINDOW_COUNT_MASK;
        self.write_register(self.layout.trans_info, flags | u32::from(count));
    }

    /// Acknowledge `irq` in the interrupt control register.
    pub fn clear_irq(&self, irq: Irq) {
        let value = self.read_register(self.layout.irq_control);
        self.write_register(self.layout.irq_control, value & !irq.mask());
    }

    /// Content of the TX done register polled for completion.
    pub fn completion_status(&self) -> u32 {
        self.read_register(self.layout.tx_done)
    }

    /// Acknowledge `irq` in the TX done register.
    pub fn clear_completion(&self, irq: Irq) {
        let value = self.completion_status();
        self.write_register(self.layout.tx_done, value & !irq.mask());
    }
}
