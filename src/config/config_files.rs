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

//! Parsing and layering of the TOML configuration files.
//!
//! Every key is optional. Files are layered with [`TomlConfig::merge`], the more specific
//! file winning key by key, and whatever is still unset after layering takes its hardcoded
//! default when converted into a [`TransferConfig`](crate::config::TransferConfig).

use crate::device::completion::CompletionKind;
use crate::error::XferError;
use crate::frames::codec::ByteOrder;
use crate::frames::file::FrameFormat;
use crate::system_io::fs_read;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Key by key layering of two optional values of the same section.
pub trait Merge {
    /// Keep every value set in `self`, take the rest from `fallback`.
    fn merge(self, fallback: Self) -> Self;
}

impl<T: Merge> Merge for Option<T> {
    fn merge(self, fallback: Self) -> Self {
        match (self, fallback) {
            (Some(preferred), Some(fallback)) => Some(preferred.merge(fallback)),
            (preferred, fallback) => preferred.or(fallback),
        }
    }
}

/// This is the top level struct which holds all sections
#[derive(Debug, Default, Deserialize)]
pub struct TomlConfig {
    pub devices: Option<DevicesToml>,
    pub transfer: Option<TransferToml>,
    pub registers: Option<RegistersToml>,
}

/// The `[devices]` section
#[derive(Debug, Default, Deserialize)]
pub struct DevicesToml {
    pub h2c: Option<PathBuf>,
    pub c2h: Option<PathBuf>,
    pub user_registers: Option<PathBuf>,
    pub events: Option<PathBuf>,
}

/// The `[transfer]` section
#[derive(Debug, Default, Deserialize)]
pub struct TransferToml {
    pub completion: Option<CompletionKind>,
    pub timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub frame_format: Option<FrameFormat>,
    pub byte_order: Option<ByteOrder>,
}

/// The `[registers]` section, byte offsets into the user register block
#[derive(Debug, Default, Deserialize)]
pub struct RegistersToml {
    pub irq_status: Option<usize>,
    pub irq_control: Option<usize>,
    pub mode: Option<usize>,
    pub tx_status: Option<usize>,
    pub rx_status: Option<usize>,
    pub trans_info: Option<usize>,
    pub tx_done: Option<usize>,
}

impl Merge for TomlConfig {
    fn merge(self, fallback: TomlConfig) -> TomlConfig {
        TomlConfig {
            devices: self.devices.merge(fallback.devices),
            transfer: self.transfer.merge(fallback.transfer),
            registers: self.registers.merge(fallback.registers),
        }
    }
}

impl Merge for DevicesToml {
    fn merge(self, fallback: DevicesToml) -> DevicesToml {
        DevicesToml {
            h2c: self.h2c.or(fallback.h2c),
            c2h: self.c2h.or(fallback.c2h),
            user_registers: self.user_registers.or(fallback.user_registers),
            events: self.events.or(fallback.events),
        }
    }
}

impl Merge for TransferToml {
    fn merge(self, fallback: TransferToml) -> TransferToml {
        TransferToml {
            completion: self.completion.or(fallback.completion),
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
            poll_interval_ms: self.poll_interval_ms.or(fallback.poll_interval_ms),
            settle_ms: self.settle_ms.or(fallback.settle_ms),
            frame_format: self.frame_format.or(fallback.frame_format),
            byte_order: self.byte_order.or(fallback.byte_order),
        }
    }
}

impl Merge for RegistersToml {
    fn merge(self, fallback: RegistersToml) -> RegistersToml {
        RegistersToml {
            irq_status: self.irq_status.or(fallback.irq_status),
            irq_control: self.irq_control.or(fallback.irq_control),
            mode: self.mode.or(fallback.mode),
            tx_status: self.tx_status.or(fallback.tx_status),
            rx_status: self.rx_status.or(fallback.rx_status),
            trans_info: self.trans_info.or(fallback.trans_info),
            tx_done: self.tx_done.or(fallback.tx_done),
        }
    }
}

pub(crate) fn toml_str_to_config(toml_string: &str) -> Result<TomlConfig, XferError> {
    toml::from_str(toml_string).map_err(|e| XferError::TomlDe {
        toml_string: toml_string.into(),
        e,
    })
}

/// Parse the configuration file at `file_path`.
///
/// # Returns: `Result<TomlConfig, XferError>`
/// * `Ok(TomlConfig)` - The sections present in the file
/// * `Err(XferError::Internal)` - There is no file at `file_path`
/// * `Err(XferError::TomlDe)` - The file is not valid configuration TOML
pub fn config_from_file(file_path: &Path) -> Result<TomlConfig, XferError> {
    if !file_path.is_file() {
        return Err(XferError::Internal(format!(
            "Config file not found in {file_path:?}"
        )));
    }
    toml_str_to_config(&fs_read(file_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_section_is_optional() {
        let config = toml_str_to_config("").unwrap();
        assert!(config.devices.is_none());
        assert!(config.transfer.is_none());
        assert!(config.registers.is_none());
    }

    #[test]
    fn test_parse_full_file() {
        let config = toml_str_to_config(
            r#"
            [devices]
            h2c = "/dev/xdma1_h2c_0"

            [transfer]
            completion = "poll"
            timeout_secs = 5
            frame_format = "binary"
            byte_order = "big"

            [registers]
            mode = 0x20
            "#,
        )
        .unwrap();
        let devices = config.devices.unwrap();
        assert_eq!(devices.h2c, Some(PathBuf::from("/dev/xdma1_h2c_0")));
        assert_eq!(devices.c2h, None);
        let transfer = config.transfer.unwrap();
        assert_eq!(transfer.completion, Some(CompletionKind::Poll));
        assert_eq!(transfer.timeout_secs, Some(5));
        assert_eq!(transfer.frame_format, Some(FrameFormat::Binary));
        assert_eq!(transfer.byte_order, Some(ByteOrder::Big));
        assert_eq!(config.registers.unwrap().mode, Some(0x20));
    }

    #[test]
    fn test_merge_prefers_self_key_by_key() {
        let user = toml_str_to_config("[transfer]\ntimeout_secs = 9\n").unwrap();
        let vendor =
            toml_str_to_config("[transfer]\ntimeout_secs = 3\nsettle_ms = 10\n[registers]\nmode = 4\n")
                .unwrap();
        let merged = user.merge(vendor);
        let transfer = merged.transfer.unwrap();
        assert_eq!(transfer.timeout_secs, Some(9));
        assert_eq!(transfer.settle_ms, Some(10));
        assert_eq!(merged.registers.unwrap().mode, Some(4));
    }

    #[test]
    fn test_bad_value_is_toml_error() {
        let err = toml_str_to_config("[transfer]\ncompletion = \"irq\"\n").unwrap_err();
        assert!(matches!(err, XferError::TomlDe { .. }), "{err}");
    }

    #[test]
    fn test_missing_file() {
        let err = config_from_file(Path::new("/nonexistent/bramxfer.toml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"), "{err}");
    }
}
