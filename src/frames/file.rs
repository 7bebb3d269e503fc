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

//! Frame files on the host side.
//!
//! [`load_frames`] reads a whole text or binary frame file into a [`FrameBuffer`] sized from
//! the file length, and [`FrameWriter`] appends received frames to an output file, one record
//! at a time at sequential offsets.
//!
//! A record cut short by the end of the file marks the end of input; it is skipped with a
//! warning rather than decoded.

use crate::error::XferError;
use crate::frames::buffer::FrameBuffer;
use crate::frames::codec::{
    ByteOrder, TEXT_LINE_BYTES, decode_binary, decode_text_line, encode_binary, encode_text_line,
    is_stop,
};
use crate::frames::{FRAME_BYTES, Frame};
use crate::system_io::{fs_file_size, fs_open_input, fs_write_at};
use log::{debug, trace, warn};
use serde::Deserialize;
use std::fmt;
use std::io::{BufReader, ErrorKind, Read, Seek, Write};
use std::path::Path;

/// On-disk representation of a frame file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// 65-byte ASCII binary lines.
    #[default]
    Text,
    /// Raw 8-byte words.
    Binary,
}

impl FrameFormat {
    /// Size of one record of this format in bytes.
    pub fn record_bytes(self) -> usize {
        match self {
            FrameFormat::Text => TEXT_LINE_BYTES,
            FrameFormat::Binary => FRAME_BYTES,
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameFormat::Text => write!(f, "text"),
            FrameFormat::Binary => write!(f, "binary"),
        }
    }
}

/// Fill `record` from `reader`, returning how many bytes were read before end of file.
fn read_record<R: Read>(
    reader: &mut R,
    record: &mut [u8],
    path: &Path,
    offset: u64,
) -> Result<usize, XferError> {
    let mut filled = 0;
    while filled < record.len() {
        match reader.read(&mut record[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(XferError::FileIO {
                    op: "read",
                    file: path.into(),
                    offset,
                    e,
                });
            }
        }
    }
    Ok(filled)
}

/// Read a frame file into a freshly allocated buffer.
///
/// The buffer holds one frame per complete record. A record that decodes to the stop
/// frame is rejected: it would otherwise end the stream early on the card.
///
/// # Arguments
///
/// * `path` - The frame file
/// * `format` - Text or binary records
/// * `order` - Byte order of binary records, ignored for text
///
/// # Returns: `Result<FrameBuffer, XferError>`
/// * `Ok(FrameBuffer)` - The frames, cursor at the start
/// * `Err(XferError::FileNotFound)` - The file cannot be opened
/// * `Err(XferError::FileIO)` - Reading failed
/// * `Err(XferError::Format)` - A record is malformed or holds the stop frame
/// * `Err(XferError::OutOfMemory)` - The buffer could not be allocated
pub fn load_frames(
    path: &Path,
    format: FrameFormat,
    order: ByteOrder,
) -> Result<FrameBuffer, XferError> {
    let file = fs_open_input(path)?;
    let file_size = fs_file_size(&file, path)?;
    let record_bytes = format.record_bytes();
    let expected = usize::try_from(file_size)
        .map_err(|_| XferError::Argument(format!("{path:?} is too large to buffer")))?
        / record_bytes;
    debug!("{path:?}: {file_size} bytes, {expected} {format} frames");

    let mut buffer = FrameBuffer::with_len(expected * FRAME_BYTES)?;
    let mut reader = BufReader::new(file);
    let mut record = [0u8; TEXT_LINE_BYTES];
    let mut loaded = 0;

    for index in 0..expected {
        let offset = (index * record_bytes) as u64;
        let record = &mut record[..record_bytes];
        let got = read_record(&mut reader, record, path, offset)?;
        if got < record_bytes {
            if got > 0 {
                warn!("{path:?}: ignoring {got} trailing bytes at {offset:#x}");
            }
            break;
        }

        let frame = match format {
            FrameFormat::Text => decode_text_line(record).map_err(|e| match e {
                XferError::Format(msg) => {
                    XferError::Format(format!("{path:?} line {}: {msg}", index + 1))
                }
                other => other,
            })?,
            FrameFormat::Binary => {
                let mut word = [0u8; FRAME_BYTES];
                word.copy_from_slice(record);
                decode_binary(word, order)
            }
        };
        if is_stop(frame) {
            return Err(XferError::Format(format!(
                "{path:?} record {} holds the reserved stop frame {frame:#x}",
                index + 1
            )));
        }
        trace!("#{index}: {frame:#x}");
        buffer.frames_mut()[index] = frame;
        loaded += 1;
    }

    if loaded != expected {
        buffer.truncate_frames(loaded);
    }
    Ok(buffer)
}

/// Writes frames to an output file at sequential record offsets.
pub struct FrameWriter<'a, W: Write + Seek> {
    out: &'a mut W,
    path: &'a Path,
    format: FrameFormat,
    order: ByteOrder,
    offset: u64,
    written: usize,
}

impl<'a, W: Write + Seek> FrameWriter<'a, W> {
    pub fn new(out: &'a mut W, path: &'a Path, format: FrameFormat, order: ByteOrder) -> Self {
        FrameWriter {
            out,
            path,
            format,
            order,
            offset: 0,
            written: 0,
        }
    }

    /// Encode `frame` and write it at the next record offset.
    pub fn write_frame(&mut self, frame: Frame) -> Result<(), XferError> {
        let len = match self.format {
            FrameFormat::Text => {
                fs_write_at(self.out, self.path, self.offset, &encode_text_line(frame))?;
                TEXT_LINE_BYTES
            }
            FrameFormat::Binary => {
                fs_write_at(
                    self.out,
                    self.path,
                    self.offset,
                    &encode_binary(frame, self.order),
                )?;
                FRAME_BYTES
            }
        };
        self.offset += len as u64;
        self.written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.written
    }
}
