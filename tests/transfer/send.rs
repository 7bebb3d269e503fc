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

use crate::transfer::common::{Bench, Event, TRANS_INFO, bench, frame_bytes};
use bramxfer::device::mode::DeviceMode;
use bramxfer::device::registers::Irq;
use bramxfer::frames::STOP_FRAME;
use bramxfer::frames::buffer::FrameBuffer;
use bramxfer::frames::codec::ByteOrder;
use bramxfer::frames::file::{FrameFormat, load_frames};
use bramxfer::transfer::engine::TransferReport;
use bramxfer::transfer::window::TransferWindow;
use googletest::prelude::*;
use rstest::*;
use std::path::Path;

const BASE: u64 = 0xC000_0000;

fn h2c_path() -> &'static Path {
    Path::new("fake-h2c")
}

fn stop_bytes() -> Vec<u8> {
    STOP_FRAME.to_ne_bytes().to_vec()
}

#[gtest]
#[rstest]
fn two_text_lines_fit_one_window(mut bench: Bench) {
    let dir = tempfile::tempdir().unwrap();
    let frames_file = dir.path().join("config.txt");
    let mut text = String::new();
    text.push_str(&"0".repeat(61));
    text.push_str("100\n");
    text.push_str(&"0".repeat(61));
    text.push_str("101\n");
    std::fs::write(&frames_file, text).unwrap();

    let mut buffer = load_frames(&frames_file, FrameFormat::Text, ByteOrder::Little).unwrap();
    assert_eq!(buffer.frames(), &[0x4, 0x5]);

    let mut h2c = bench.h2c();
    let report = bench
        .engine()
        .send(
            &mut h2c,
            h2c_path(),
            &mut buffer,
            TransferWindow::new(BASE, 16),
            DeviceMode::Config,
        )
        .unwrap();

    assert_eq!(
        report,
        TransferReport {
            windows: 1,
            register_window_count: 1,
            bytes: 16,
        }
    );
    assert_eq!(
        bench.card.writes(),
        vec![(BASE, frame_bytes(&[0x4, 0x5])), (BASE + 16, stop_bytes())]
    );
    assert_that!(bench.card.register(0x08), eq(DeviceMode::Config.raw()));
}

#[gtest]
#[rstest]
fn windows_wait_for_completion_in_order(mut bench: Bench) {
    let mut buffer = FrameBuffer::from_frames(&[1, 2, 3, 4, 5]).unwrap();
    let mut h2c = bench.h2c();
    bench
        .engine()
        .send(
            &mut h2c,
            h2c_path(),
            &mut buffer,
            TransferWindow::new(BASE, 16),
            DeviceMode::Work,
        )
        .unwrap();

    let window = |bytes: Vec<u8>| {
        vec![
            Event::Write {
                offset: BASE,
                bytes,
            },
            Event::RequestSend,
            Event::Waited(Irq::TxCh1Done),
            Event::Cleared(Irq::TxCh1Done),
        ]
    };
    let mut expected = Vec::new();
    expected.extend(window(frame_bytes(&[1, 2])));
    expected.extend(window(frame_bytes(&[3, 4])));
    expected.push(Event::Write {
        offset: BASE,
        bytes: frame_bytes(&[5]),
    });
    expected.push(Event::Write {
        offset: BASE + 8,
        bytes: stop_bytes(),
    });
    expected.extend([
        Event::RequestSend,
        Event::Waited(Irq::TxCh1Done),
        Event::Cleared(Irq::TxCh1Done),
    ]);
    assert_eq!(bench.card.events(), expected);
}

#[gtest]
#[rstest]
#[case::single_frame(1, 4, 1, 0)]
#[case::exactly_full(4, 4, 1, 1)]
#[case::one_frame_over(5, 4, 2, 1)]
#[case::three_halves(6, 4, 2, 2)]
#[case::many(33, 4, 9, 8)]
fn payload_is_partitioned_into_windows(
    mut bench: Bench,
    #[case] frame_count: u64,
    #[case] frames_per_window: usize,
    #[case] windows: usize,
    #[case] announced: u8,
) {
    let frames: Vec<u64> = (1..=frame_count).collect();
    let mut buffer = FrameBuffer::from_frames(&frames).unwrap();
    let mut h2c = bench.h2c();
    let report = bench
        .engine()
        .send(
            &mut h2c,
            h2c_path(),
            &mut buffer,
            TransferWindow::new(BASE, frames_per_window * 8),
            DeviceMode::Work,
        )
        .unwrap();

    assert_that!(report.windows, eq(windows));
    assert_that!(report.register_window_count, eq(announced));
    assert_that!(report.bytes, eq(frames.len() * 8));

    let writes = bench.card.writes();
    let stops: Vec<_> = writes.iter().filter(|(_, b)| *b == stop_bytes()).collect();
    assert_that!(stops.len(), eq(1));

    let payload: Vec<u8> = writes[..writes.len() - 1]
        .iter()
        .flat_map(|(_, b)| b.clone())
        .collect();
    assert_eq!(payload, frame_bytes(&frames));

    let (last_offset, last_payload) = &writes[writes.len() - 2];
    assert_that!(
        writes[writes.len() - 1].0,
        eq(last_offset + last_payload.len() as u64)
    );
}

#[gtest]
#[rstest]
fn silent_card_times_out(mut bench: Bench) {
    bench.card.silent.set(true);
    let mut buffer = FrameBuffer::from_frames(&[1, 2, 3]).unwrap();
    let mut h2c = bench.h2c();
    let result = bench.engine().send(
        &mut h2c,
        h2c_path(),
        &mut buffer,
        TransferWindow::new(BASE, 8),
        DeviceMode::Work,
    );

    expect_that!(
        result,
        err(displays_as(contains_substring("XferError::Timeout")))
    );
    // the second window is never written
    assert_that!(bench.card.writes().len(), eq(1));
}

#[gtest]
#[rstest]
fn wrong_mode_read_back_writes_nothing(mut bench: Bench) {
    bench.card.stuck_mode.set(Some(3));
    let mut buffer = FrameBuffer::from_frames(&[1]).unwrap();
    let mut h2c = bench.h2c();
    let result = bench.engine().send(
        &mut h2c,
        h2c_path(),
        &mut buffer,
        TransferWindow::new(BASE, 16),
        DeviceMode::Config,
    );

    expect_that!(
        result,
        err(displays_as(contains_substring("XferError::ModeMismatch")))
    );
    assert!(bench.card.writes().is_empty());
}

#[gtest]
#[rstest]
fn pending_windows_after_send_are_incomplete(mut bench: Bench) {
    bench.card.keeps_pending.set(true);
    let mut buffer = FrameBuffer::from_frames(&[1, 2]).unwrap();
    let mut h2c = bench.h2c();
    let result = bench.engine().send(
        &mut h2c,
        h2c_path(),
        &mut buffer,
        TransferWindow::new(BASE, 16),
        DeviceMode::Work,
    );

    expect_that!(
        result,
        err(displays_as(contains_substring("1 windows still pending")))
    );
    assert_that!(bench.card.register(TRANS_INFO) & 0xFF, eq(1));
}

#[gtest]
#[rstest]
#[case::empty(0, "XferError::Argument: no frames")]
#[case::too_many_windows(256, "the card counts at most 255")]
fn rejected_before_any_write(
    mut bench: Bench,
    #[case] frame_count: u64,
    #[case] message: &str,
) {
    let frames: Vec<u64> = (1..=frame_count).collect();
    let mut buffer = FrameBuffer::from_frames(&frames).unwrap();
    let mut h2c = bench.h2c();
    let result = bench.engine().send(
        &mut h2c,
        h2c_path(),
        &mut buffer,
        TransferWindow::new(BASE, 8),
        DeviceMode::Work,
    );

    expect_that!(result, err(displays_as(contains_substring(message))));
    assert!(bench.card.events().is_empty());
}
