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

use crate::transfer::common::{Bench, C2hChannel, Event, TX_DONE, bench, frame_bytes};
use bramxfer::device::registers::Irq;
use bramxfer::frames::STOP_FRAME;
use bramxfer::frames::codec::ByteOrder;
use bramxfer::frames::file::{FrameFormat, FrameWriter};
use bramxfer::transfer::engine::ReceiveReport;
use bramxfer::transfer::window::TransferWindow;
use googletest::prelude::*;
use rstest::*;
use std::io::Cursor;
use std::path::Path;

const BASE: u64 = 0xC200_0000;

fn c2h_path() -> &'static Path {
    Path::new("fake-c2h")
}

fn out_path() -> &'static Path {
    Path::new("output.txt")
}

#[gtest]
#[rstest]
fn stops_at_the_stop_frame(mut bench: Bench) {
    let mut c2h = C2hChannel::new(BASE, frame_bytes(&[0x7, STOP_FRAME, 0x1234]));
    let mut out = Cursor::new(Vec::new());
    let mut writer = FrameWriter::new(&mut out, out_path(), FrameFormat::Text, ByteOrder::Little);

    let report = bench
        .engine()
        .receive(
            &mut c2h,
            c2h_path(),
            &mut writer,
            TransferWindow::new(BASE, 24),
        )
        .unwrap();

    assert_eq!(
        report,
        ReceiveReport {
            frames: 1,
            sentinel_found: true,
        }
    );
    let mut line = "0".repeat(61);
    line.push_str("111\n");
    assert_eq!(String::from_utf8(out.into_inner()).unwrap(), line);
    assert_eq!(
        bench.card.events(),
        vec![
            Event::RequestReceive,
            Event::Waited(Irq::RxCh1Done),
            Event::Cleared(Irq::RxCh1Done),
        ]
    );
}

#[gtest]
#[rstest]
#[case::no_stop_frame(&[1, 2, 3], 3, false)]
#[case::stop_frame_first(&[STOP_FRAME, 2, 3], 0, true)]
#[case::stop_frame_last(&[1, 2, STOP_FRAME], 2, true)]
fn frames_in_front_of_the_stop_frame(
    mut bench: Bench,
    #[case] window: &[u64],
    #[case] frames: usize,
    #[case] sentinel_found: bool,
) {
    let mut c2h = C2hChannel::new(BASE, frame_bytes(window));
    let mut out = Cursor::new(Vec::new());
    let mut writer =
        FrameWriter::new(&mut out, out_path(), FrameFormat::Binary, ByteOrder::Little);

    let report = bench
        .engine()
        .receive(
            &mut c2h,
            c2h_path(),
            &mut writer,
            TransferWindow::new(BASE, window.len() * 8),
        )
        .unwrap();

    assert_that!(report.frames, eq(frames));
    assert_that!(report.sentinel_found, eq(sentinel_found));
    let expected: Vec<u8> = window[..frames]
        .iter()
        .flat_map(|f| f.to_le_bytes())
        .collect();
    assert_eq!(out.into_inner(), expected);
}

#[gtest]
#[rstest]
fn silent_card_is_incomplete(mut bench: Bench) {
    bench.card.silent.set(true);
    let mut c2h = C2hChannel::new(BASE, frame_bytes(&[1, STOP_FRAME]));
    let mut out = Cursor::new(Vec::new());
    let mut writer = FrameWriter::new(&mut out, out_path(), FrameFormat::Text, ByteOrder::Little);

    let result = bench.engine().receive(
        &mut c2h,
        c2h_path(),
        &mut writer,
        TransferWindow::new(BASE, 16),
    );

    expect_that!(
        result,
        err(displays_as(contains_substring(
            "XferError::IncompleteTransfer: no upstream window"
        )))
    );
    assert!(out.into_inner().is_empty());
}

#[gtest]
#[rstest]
fn short_window_read_is_file_io(mut bench: Bench) {
    let mut c2h = C2hChannel::new(BASE, frame_bytes(&[1]));
    let mut out = Cursor::new(Vec::new());
    let mut writer = FrameWriter::new(&mut out, out_path(), FrameFormat::Text, ByteOrder::Little);

    let result = bench.engine().receive(
        &mut c2h,
        c2h_path(),
        &mut writer,
        TransferWindow::new(BASE, 16),
    );

    expect_that!(
        result,
        err(displays_as(contains_substring("short read")))
    );
    assert_eq!(
        bench.card.events(),
        vec![
            Event::RequestReceive,
            Event::Waited(Irq::RxCh1Done),
            Event::Cleared(Irq::RxCh1Done),
        ]
    );
    assert_that!(bench.card.register(TX_DONE) & Irq::RxCh1Done.mask(), eq(0));
}
