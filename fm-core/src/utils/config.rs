//! Board configuration.
//!
//! Every field has a firmware default; hosts may override any subset from JSON.

use serde::{Deserialize, Serialize};

use crate::utils::timing::{COMMAND_MIN_INTERVAL_US, DISPLAY_MIN_INTERVAL_US};

/// 7-bit bus address of the bottom board (0xA0 on the 8-bit wire).
pub const DEFAULT_ADDRESS: u8 = 0xA0 >> 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlymouseConfig {
    /// 7-bit peer address.
    pub address: u8,
    /// Spacing between general read/write frames.
    pub command_interval_us: u64,
    /// Spacing between display frames.
    pub display_interval_us: u64,
    /// Brake hold before a motor changes direction.
    pub reversal_brake_ms: u32,
    /// Pause between failed handshake attempts.
    pub handshake_retry_ms: u32,
    /// Settle time after triggering color calibration.
    pub calibration_settle_ms: u32,
    /// Printed on the last banner line when set.
    pub device_id: Option<u32>,
}

impl Default for FlymouseConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            command_interval_us: COMMAND_MIN_INTERVAL_US,
            display_interval_us: DISPLAY_MIN_INTERVAL_US,
            reversal_brake_ms: 10,
            handshake_retry_ms: 200,
            calibration_settle_ms: 200,
            device_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_address_is_shifted_wire_address() {
        assert_eq!(FlymouseConfig::default().address, 0x50);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: FlymouseConfig =
            serde_json::from_str(r#"{"device_id": 1234, "reversal_brake_ms": 25}"#).unwrap();
        assert_eq!(cfg.device_id, Some(1234));
        assert_eq!(cfg.reversal_brake_ms, 25);
        assert_eq!(cfg.handshake_retry_ms, 200);
        assert_eq!(cfg.display_interval_us, 50_000);
    }
}
