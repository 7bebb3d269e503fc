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

//! Resolved transfer configuration.
//!
//! Values come from, in increasing priority:
//! 1. the hardcoded defaults in this module
//! 2. the vendor file [`VENDOR_CONFIG`]
//! 3. the user file [`USER_CONFIG`]
//! 4. an explicitly requested file, then command line flags applied by the caller
//!
//! The result is a plain [`TransferConfig`] value handed to the transfer session.

pub mod config_files;

use crate::config::config_files::{
    DevicesToml, Merge, RegistersToml, TomlConfig, config_from_file,
};
use crate::device::completion::{CompletionKind, CompletionStrategy, DEFAULT_POLL_INTERVAL};
use crate::device::registers::RegisterLayout;
use crate::error::XferError;
use crate::frames::codec::ByteOrder;
use crate::frames::file::FrameFormat;
use log::{trace, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub static VENDOR_CONFIG: &str = "/usr/lib/bramxfer/config.toml";
pub static USER_CONFIG: &str = "/etc/bramxfer/config.toml";

// Hardcoded fallbacks used when no configuration file provides a value
pub static H2C_DEVICE: &str = "/dev/xdma0_h2c_0";
pub static C2H_DEVICE: &str = "/dev/xdma0_c2h_0";
pub static USER_REGISTERS_DEVICE: &str = "/dev/xdma0_user";
pub static EVENTS_DEVICE: &str = "/dev/xdma0_events_0";

pub static CONFIG_FRAMES: &str = "./test/config.txt";
pub static WORK_FRAMES: &str = "./test/input.txt";
pub static OUTPUT_FRAMES: &str = "./test/output.txt";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(1);

/// Device nodes of one XDMA card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePaths {
    pub h2c: PathBuf,
    pub c2h: PathBuf,
    pub user_registers: PathBuf,
    pub events: PathBuf,
}

impl Default for DevicePaths {
    fn default() -> Self {
        DevicePaths {
            h2c: H2C_DEVICE.into(),
            c2h: C2H_DEVICE.into(),
            user_registers: USER_REGISTERS_DEVICE.into(),
            events: EVENTS_DEVICE.into(),
        }
    }
}

/// Everything a transfer needs to know besides the frame file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub paths: DevicePaths,
    pub layout: RegisterLayout,
    pub completion: CompletionStrategy,
    pub timeout: Duration,
    pub settle_delay: Duration,
    pub frame_format: FrameFormat,
    pub byte_order: ByteOrder,
    /// Per-window progress at info level.
    pub verbose: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TomlConfig::default().into()
    }
}

impl From<DevicesToml> for DevicePaths {
    fn from(value: DevicesToml) -> Self {
        let defaults = DevicePaths::default();
        DevicePaths {
            h2c: value.h2c.unwrap_or(defaults.h2c),
            c2h: value.c2h.unwrap_or(defaults.c2h),
            user_registers: value.user_registers.unwrap_or(defaults.user_registers),
            events: value.events.unwrap_or(defaults.events),
        }
    }
}

impl From<RegistersToml> for RegisterLayout {
    fn from(value: RegistersToml) -> Self {
        let defaults = RegisterLayout::default();
        RegisterLayout {
            irq_status: value.irq_status.unwrap_or(defaults.irq_status),
            irq_control: value.irq_control.unwrap_or(defaults.irq_control),
            mode: value.mode.unwrap_or(defaults.mode),
            tx_status: value.tx_status.unwrap_or(defaults.tx_status),
            rx_status: value.rx_status.unwrap_or(defaults.rx_status),
            trans_info: value.trans_info.unwrap_or(defaults.trans_info),
            tx_done: value.tx_done.unwrap_or(defaults.tx_done),
        }
    }
}

impl From<TomlConfig> for TransferConfig {
    fn from(value: TomlConfig) -> Self {
        trace!("Resolving transfer config from {value:?}");
        let transfer = value.transfer.unwrap_or_default();
        let completion = match transfer.completion.unwrap_or_default() {
            CompletionKind::Event => CompletionStrategy::Event,
            CompletionKind::Poll => CompletionStrategy::Poll {
                interval: transfer
                    .poll_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_POLL_INTERVAL),
            },
        };
        TransferConfig {
            paths: value.devices.unwrap_or_default().into(),
            layout: value.registers.unwrap_or_default().into(),
            completion,
            timeout: transfer
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            settle_delay: transfer
                .settle_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SETTLE),
            frame_format: transfer.frame_format.unwrap_or_default(),
            byte_order: transfer.byte_order.unwrap_or_default(),
            verbose: false,
        }
    }
}

/// Parse an optional layer, falling back to an empty one with a warning.
fn optional_layer(file_path: &Path) -> TomlConfig {
    match config_from_file(file_path) {
        Ok(config) => {
            trace!("Loaded config layer {file_path:?}: {config:?}");
            config
        }
        Err(e) => {
            warn!("Using hardcoded values because failed to load config: {e}");
            TomlConfig::default()
        }
    }
}

impl TransferConfig {
    /// Resolve the configuration from the system configuration files.
    ///
    /// A missing or broken vendor or user file is skipped with a warning. A file named
    /// through `explicit` was asked for, so failing to load it is an error.
    ///
    /// # Arguments
    ///
    /// * `explicit` - Optional file layered above the user file
    ///
    /// # Returns: `Result<TransferConfig, XferError>`
    /// * `Ok(TransferConfig)` - The layered configuration with defaults filled in
    /// * `Err(XferError::Internal)` - `explicit` does not exist
    /// * `Err(XferError::TomlDe)` - `explicit` is not valid configuration TOML
    pub fn load(explicit: Option<&Path>) -> Result<TransferConfig, XferError> {
        TransferConfig::load_layers(
            Path::new(VENDOR_CONFIG),
            Path::new(USER_CONFIG),
            explicit,
        )
    }

    /// [`TransferConfig::load`] with the vendor and user locations given explicitly.
    pub fn load_layers(
        vendor: &Path,
        user: &Path,
        explicit: Option<&Path>,
    ) -> Result<TransferConfig, XferError> {
        let mut layered = optional_layer(user).merge(optional_layer(vendor));
        if let Some(path) = explicit {
            layered = config_from_file(path)?.merge(layered);
        }
        Ok(layered.into())
    }
}
