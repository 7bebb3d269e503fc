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

//! An in-memory card: register block, DMA channels and an event log shared between them.

use bramxfer::device::completion::{CompletionMonitor, PollMonitor};
use bramxfer::device::mode::ModeSequencer;
use bramxfer::device::registers::{Irq, RegisterLayout, RegisterSpace, Registers};
use bramxfer::error::XferError;
use bramxfer::transfer::engine::TransferEngine;
use rstest::*;
use std::cell::{Cell, RefCell};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_millis(50);

const BLOCK_BYTES: usize = 0x20;
const MODE: usize = 0x08;
const TX_STATUS: usize = 0x0C;
const RX_STATUS: usize = 0x10;
pub const TRANS_INFO: usize = 0x14;
pub const TX_DONE: usize = 0x18;

/// Everything the host did to the card, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Write { offset: u64, bytes: Vec<u8> },
    RequestSend,
    RequestReceive,
    Waited(Irq),
    Cleared(Irq),
}

/// Card state behind the fake register block and channels.
#[derive(Debug, Default)]
pub struct Card {
    regs: RefCell<[u32; BLOCK_BYTES / 4]>,
    pub events: RefCell<Vec<Event>>,
    /// Mode register reads return this instead of what was written.
    pub stuck_mode: Cell<Option<u32>>,
    /// Never signals completion.
    pub silent: Cell<bool>,
    /// Never counts down the pending windows.
    pub keeps_pending: Cell<bool>,
}

impl Card {
    pub fn register(&self, offset: usize) -> u32 {
        self.regs.borrow()[offset / 4]
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Every channel write as (card address, bytes).
    pub fn writes(&self) -> Vec<(u64, Vec<u8>)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Write { offset, bytes } => Some((*offset, bytes.clone())),
                _ => None,
            })
            .collect()
    }

    fn consume_window(&self, regs: &mut [u32; BLOCK_BYTES / 4]) {
        if !self.keeps_pending.get() {
            let info = regs[TRANS_INFO / 4];
            let pending = (info & 0xFF).saturating_sub(1);
            regs[TRANS_INFO / 4] = (info & !0xFF) | pending;
        }
        if !self.silent.get() {
            regs[TX_DONE / 4] |= Irq::TxCh1Done.mask();
        }
    }
}

pub struct CardRegisters(pub Rc<Card>);

impl RegisterSpace for CardRegisters {
    fn source(&self) -> &Path {
        Path::new("fake-user")
    }

    fn size(&self) -> usize {
        BLOCK_BYTES
    }

    fn read_u32(&self, offset: usize) -> u32 {
        match (offset, self.0.stuck_mode.get()) {
            (MODE, Some(raw)) => raw,
            _ => self.0.register(offset),
        }
    }

    fn write_u32(&self, offset: usize, value: u32) {
        let mut regs = self.0.regs.borrow_mut();
        regs[offset / 4] = value;
        match (offset, value) {
            (TX_STATUS, 1) => {
                self.0.push(Event::RequestSend);
                self.0.consume_window(&mut regs);
            }
            (RX_STATUS, 1) => {
                self.0.push(Event::RequestReceive);
                if !self.0.silent.get() {
                    regs[TX_DONE / 4] |= Irq::RxCh1Done.mask();
                }
            }
            _ => {}
        }
    }
}

/// Host-to-card channel that records every write with its card address.
pub struct H2cChannel {
    card: Rc<Card>,
    pos: u64,
}

impl Write for H2cChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.card.push(Event::Write {
            offset: self.pos,
            bytes: buf.to_vec(),
        });
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for H2cChannel {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match pos {
            SeekFrom::Start(offset) => {
                self.pos = offset;
                Ok(offset)
            }
            other => Err(std::io::Error::other(format!("unsupported seek {other:?}"))),
        }
    }
}

/// Card-to-host channel serving `data` at card address `base`.
pub struct C2hChannel {
    base: u64,
    data: Vec<u8>,
    pos: u64,
}

impl C2hChannel {
    pub fn new(base: u64, data: Vec<u8>) -> Self {
        C2hChannel { base, data, pos: 0 }
    }
}

impl Read for C2hChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pos != self.base {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for C2hChannel {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match pos {
            SeekFrom::Start(offset) => {
                self.pos = offset;
                Ok(offset)
            }
            other => Err(std::io::Error::other(format!("unsupported seek {other:?}"))),
        }
    }
}

/// Polls the fake card and records when completion was observed and cleared.
pub struct RecordingMonitor {
    inner: PollMonitor,
    card: Rc<Card>,
}

impl CompletionMonitor for RecordingMonitor {
    fn wait_for(
        &mut self,
        registers: &Registers,
        irq: Irq,
        timeout: Duration,
    ) -> Result<(), XferError> {
        self.inner.wait_for(registers, irq, timeout)?;
        self.card.push(Event::Waited(irq));
        Ok(())
    }

    fn clear(&mut self, registers: &Registers, irq: Irq) {
        self.inner.clear(registers, irq);
        self.card.push(Event::Cleared(irq));
    }
}

pub struct Bench {
    pub card: Rc<Card>,
    pub registers: Registers,
    pub monitor: RecordingMonitor,
}

impl Bench {
    pub fn engine(&mut self) -> TransferEngine<'_, RecordingMonitor> {
        TransferEngine::new(
            &self.registers,
            &mut self.monitor,
            ModeSequencer::new(Duration::ZERO),
            TIMEOUT,
        )
    }

    pub fn h2c(&self) -> H2cChannel {
        H2cChannel {
            card: self.card.clone(),
            pos: 0,
        }
    }
}

#[fixture]
pub fn bench() -> Bench {
    let card = Rc::new(Card::default());
    let registers = Registers::new(
        Box::new(CardRegisters(card.clone())),
        RegisterLayout::default(),
    )
    .unwrap_or_else(|e| panic!("bench: fake register block rejected: {e}"));
    let monitor = RecordingMonitor {
        inner: PollMonitor::new(Duration::from_millis(1)),
        card: card.clone(),
    };
    Bench {
        card,
        registers,
        monitor,
    }
}

/// Native-order bytes of `frames`, as they sit in card memory.
pub fn frame_bytes(frames: &[u64]) -> Vec<u8> {
    frames.iter().flat_map(|f| f.to_ne_bytes()).collect()
}
