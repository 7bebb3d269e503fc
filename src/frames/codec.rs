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

//! Frame codec.
//!
//! A text frame file is a sequence of 65-byte lines: 64 ASCII `'0'`/`'1'` characters, most
//! significant bit first, followed by `'\n'`. A binary frame file is a sequence of 8-byte
//! words in the byte order set in the configuration.
//!
//! ```text
//! 0000000000000000000000000000000000000000000000000000000000000100\n  -> 0x4
//! ```

use crate::error::XferError;
use crate::frames::{FRAME_BYTES, Frame, STOP_FRAME};
use serde::Deserialize;
use std::fmt;

/// Length of one text line including its terminator.
pub const TEXT_LINE_BYTES: usize = 65;

/// Number of digit characters in a text line.
pub const TEXT_DIGITS: usize = 64;

const LINE_TERMINATOR: u8 = b'\n';

/// Byte order of a binary frame stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little"),
            ByteOrder::Big => write!(f, "big"),
        }
    }
}

/// Decode one text line into a frame.
///
/// # Arguments
///
/// * `line` - At least [`TEXT_LINE_BYTES`] bytes; only the first 65 are looked at
///
/// # Returns: `Result<Frame, XferError>`
/// * `Ok(Frame)` - The decoded value
/// * `Err(XferError::Format)` - The line is short, a digit is not `'0'`/`'1'`, or the
///   65th byte is not a line terminator
pub fn decode_text_line(line: &[u8]) -> Result<Frame, XferError> {
    if line.len() < TEXT_LINE_BYTES {
        return Err(XferError::Format(format!(
            "text frame line is {} bytes, expected {TEXT_LINE_BYTES}",
            line.len()
        )));
    }

    let mut frame: Frame = 0;
    for (i, byte) in line[..TEXT_DIGITS].iter().enumerate() {
        let bit = match byte {
            b'0' => 0,
            b'1' => 1,
            other => {
                return Err(XferError::Format(format!(
                    "byte {other:#04x} at column {i} is not a binary digit"
                )));
            }
        };
        frame = (frame << 1) | bit;
    }

    if line[TEXT_DIGITS] != LINE_TERMINATOR {
        return Err(XferError::Format(format!(
            "text frame line ends with {:#04x} instead of a newline",
            line[TEXT_DIGITS]
        )));
    }
    Ok(frame)
}

/// Encode a frame as a text line, most significant bit first, terminator included.
pub fn encode_text_line(frame: Frame) -> [u8; TEXT_LINE_BYTES] {
    let mut line = [b'0'; TEXT_LINE_BYTES];
    for (i, digit) in line[..TEXT_DIGITS].iter_mut().enumerate() {
        if frame & (1 << (TEXT_DIGITS - 1 - i)) != 0 {
            *digit = b'1';
        }
    }
    line[TEXT_DIGITS] = LINE_TERMINATOR;
    line
}

/// Load a raw 64-bit word in the declared byte order.
pub fn decode_binary(bytes: [u8; FRAME_BYTES], order: ByteOrder) -> Frame {
    match order {
        ByteOrder::Little => Frame::from_le_bytes(bytes),
        ByteOrder::Big => Frame::from_be_bytes(bytes),
    }
}

/// Store a frame as a raw 64-bit word in the declared byte order.
pub fn encode_binary(frame: Frame, order: ByteOrder) -> [u8; FRAME_BYTES] {
    match order {
        ByteOrder::Little => frame.to_le_bytes(),
        ByteOrder::Big => frame.to_be_bytes(),
    }
}

/// Whether `frame` is the end-of-stream marker.
pub fn is_stop(frame: Frame) -> bool {
    frame == STOP_FRAME
}
