//! Decode rules for raw sensor replies.
//!
//! None of these touch the bus. Replies are trusted as received, so out-of-range
//! raw values decode to out-of-range results instead of failing.
//!
//! # Example
//! ```rust
//! use flymouse_core::utils::math::decode::{calc_rgb, pack_rgb, RgbChannel};
//! let data = pack_rgb(0x12, 0x34, 0x56);
//! assert_eq!(calc_rgb(RgbChannel::G, data), 0x34);
//! ```

use serde::{Deserialize, Serialize};

use crate::utils::protocol::{Decode, ReadRegister};

/// Full-scale value of the board's 12-bit analog channels.
pub const ANALOG_FULL_SCALE: i32 = 0xFFF;

/// Encoder pulses per motor shaft revolution.
pub const ENCODER_BASE_PULSE: i32 = 7;
/// Gearbox reduction between motor shaft and wheel.
pub const MOTOR_DECELERATION_RATIO: i32 = 30;
/// Encoder pulses per wheel revolution.
pub const PULSES_PER_REVOLUTION: i32 = ENCODER_BASE_PULSE * MOTOR_DECELERATION_RATIO;

/// One channel of a packed color-sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RgbChannel {
    R,
    G,
    B,
}

/// Flip a 12-bit analog reply so that closer, louder or brighter reads larger.
pub fn inverted_analog(raw: u16) -> i32 {
    ANALOG_FULL_SCALE - i32::from(raw)
}

/// A digital input is set only when the board replies exactly 1.
pub fn flag(raw: u8) -> bool {
    raw == 1
}

/// Pack three channels the way the color sensor reply is laid out.
pub fn pack_rgb(
    r: u8,
    g: u8,
    b: u8,
) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Color reply bytes arrive blue first; the result is `0xRRGGBB`.
pub fn packed_color(bytes: [u8; 3]) -> u32 {
    pack_rgb(bytes[2], bytes[1], bytes[0])
}

/// Extract one channel from a packed `0xRRGGBB` value.
pub fn calc_rgb(
    channel: RgbChannel,
    data: u32,
) -> u8 {
    let shift = match channel {
        RgbChannel::R => 16,
        RgbChannel::G => 8,
        RgbChannel::B => 0,
    };
    ((data >> shift) & 0xFF) as u8
}

/// Convert a signed pulse count to whole wheel revolutions, truncating toward zero.
///
/// The board's counter is only reliable up to about ±32767 pulses; larger counts
/// come back wrapped and convert to wrong revolutions.
pub fn revolutions(pulses: i32) -> i32 {
    pulses / PULSES_PER_REVOLUTION
}

/// A decoded register value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reading {
    Raw(u32),
    Level(i32),
    Flag(bool),
    Voltage(f32),
    Color(u32),
    Revolutions(i32),
}

/// Apply a register's decode rule to its little-endian reply.
///
/// Bytes past the register's reply width must already be zero.
pub fn decode_reply(
    register: ReadRegister,
    raw: u32,
) -> Reading {
    let bytes = raw.to_le_bytes();
    match register.decode() {
        Decode::Raw => Reading::Raw(raw),
        Decode::Inverted => Reading::Level(inverted_analog(raw as u16)),
        Decode::Flag => Reading::Flag(flag(bytes[0])),
        Decode::Float => Reading::Voltage(f32::from_bits(raw)),
        Decode::Packed => Reading::Color(packed_color([bytes[0], bytes[1], bytes[2]])),
        Decode::Revolutions => Reading::Revolutions(revolutions(raw as i32)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_analog_law_holds_over_range() {
        for raw in 0..=0xFFFu16 {
            assert_eq!(inverted_analog(raw), 0xFFF - raw as i32);
        }
        assert_eq!(inverted_analog(0), 4095);
        assert_eq!(inverted_analog(0xFFF), 0);
    }

    #[test]
    fn inverted_analog_passes_garbage_through() {
        assert_eq!(inverted_analog(0xFFFF), 0xFFF - 0xFFFF);
    }

    #[test]
    fn flag_is_strictly_one() {
        assert!(flag(1));
        assert!(!flag(0));
        assert!(!flag(2));
        assert!(!flag(0xFF));
    }

    #[test]
    fn calc_rgb_recovers_each_channel() {
        for &(r, g, b) in &[(0, 0, 0), (255, 0, 0), (1, 2, 3), (0xAB, 0xCD, 0xEF), (255, 255, 255)] {
            let data = pack_rgb(r, g, b);
            assert_eq!(calc_rgb(RgbChannel::R, data), r);
            assert_eq!(calc_rgb(RgbChannel::G, data), g);
            assert_eq!(calc_rgb(RgbChannel::B, data), b);
        }
    }

    #[test]
    fn packed_color_reverses_wire_order() {
        assert_eq!(packed_color([0x56, 0x34, 0x12]), 0x123456);
    }

    #[test]
    fn decode_reply_follows_register_table() {
        assert_eq!(decode_reply(ReadRegister::Ir3, 0x0100), Reading::Level(0xEFF));
        assert_eq!(decode_reply(ReadRegister::Ultrasonic, 0x0100), Reading::Raw(0x0100));
        assert_eq!(decode_reply(ReadRegister::Touch, 1), Reading::Flag(true));
        assert_eq!(decode_reply(ReadRegister::PowerKey, 0), Reading::Flag(false));
        assert_eq!(decode_reply(ReadRegister::Battery, 3.7f32.to_bits()), Reading::Voltage(3.7));
        assert_eq!(decode_reply(ReadRegister::Color, 0x0012_3456), Reading::Color(0x12_34_56));
        assert_eq!(decode_reply(ReadRegister::Encoder1, 2100), Reading::Revolutions(10));
        assert_eq!(
            decode_reply(ReadRegister::Encoder2, (-4200i32) as u32),
            Reading::Revolutions(-20)
        );
    }

    #[test]
    fn revolutions_truncate_toward_zero() {
        assert_eq!(revolutions(2100), 10);
        assert_eq!(revolutions(2309), 10);
        assert_eq!(revolutions(-2309), -10);
        assert_eq!(revolutions(209), 0);
        assert_eq!(revolutions(-209), 0);
    }
}
