//! Wire protocol of the bottom board.
//!
//! Every transaction starts with a one-byte mode marker followed by a one-byte
//! register opcode (or a length byte for display text). The register table below
//! is the single source of opcodes, reply widths and decode rules.

pub mod codec;

use serde::{Deserialize, Serialize};

pub use codec::CommandCodec;

/// Begin a read transaction.
pub const MARKER_READ: u8 = 0x80;
/// Begin a write transaction.
pub const MARKER_WRITE: u8 = 0x81;
/// Begin a display transaction.
pub const MARKER_DISPLAY: u8 = 0x82;

/// Longest payload the board accepts; longer display text is cut to this length.
pub const MAX_PAYLOAD_LEN: usize = 18;

/// Reply to a [`ReadRegister::Test`] read when the board is alive.
pub const TEST_ACK: u8 = 0xCA;

/// Transaction kind, selected by the leading marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
    Display,
}

impl Mode {
    pub const fn marker(self) -> u8 {
        match self {
            Mode::Read => MARKER_READ,
            Mode::Write => MARKER_WRITE,
            Mode::Display => MARKER_DISPLAY,
        }
    }
}

/// How a raw reply becomes a caller-facing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// Returned unchanged.
    Raw,
    /// `0xFFF - raw`, so closer/louder/brighter reads larger.
    Inverted,
    /// `raw == 1`.
    Flag,
    /// IEEE-754 single precision.
    Float,
    /// Three bytes packed into a 24-bit RGB value.
    Packed,
    /// Signed pulse count scaled to wheel revolutions.
    Revolutions,
}

/// Readable sensor channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadRegister {
    Test,
    Ir1,
    Ir2,
    Ir3,
    Ir4,
    Ir5,
    Ir6,
    Battery,
    Sound,
    Light,
    Touch,
    Color,
    Encoder1,
    Encoder2,
    Ultrasonic,
    PowerKey,
}

impl ReadRegister {
    pub const fn opcode(self) -> u8 {
        match self {
            ReadRegister::Test => 0x00,
            ReadRegister::Ir1 => 0x01,
            ReadRegister::Ir2 => 0x02,
            ReadRegister::Ir3 => 0x03,
            ReadRegister::Ir4 => 0x04,
            ReadRegister::Ir5 => 0x05,
            ReadRegister::Ir6 => 0x06,
            ReadRegister::Battery => 0x07,
            ReadRegister::Sound => 0x08,
            ReadRegister::Light => 0x09,
            ReadRegister::Touch => 0x0A,
            ReadRegister::Color => 0x0B,
            ReadRegister::Encoder1 => 0x0C,
            ReadRegister::Encoder2 => 0x0D,
            ReadRegister::Ultrasonic => 0x0E,
            ReadRegister::PowerKey => 0x0F,
        }
    }

    /// Number of reply bytes the board sends for this register.
    ///
    /// The IR and ultrasonic widths are taken from the board vendor's driver and
    /// have not been checked against every firmware revision.
    pub const fn reply_width(self) -> usize {
        match self {
            ReadRegister::Test | ReadRegister::Touch | ReadRegister::PowerKey => 1,
            ReadRegister::Ir1
            | ReadRegister::Ir2
            | ReadRegister::Ir3
            | ReadRegister::Ir4
            | ReadRegister::Ir5
            | ReadRegister::Ir6
            | ReadRegister::Sound
            | ReadRegister::Light
            | ReadRegister::Ultrasonic => 2,
            ReadRegister::Color => 3,
            ReadRegister::Battery | ReadRegister::Encoder1 | ReadRegister::Encoder2 => 4,
        }
    }

    pub const fn decode(self) -> Decode {
        match self {
            ReadRegister::Test | ReadRegister::Ultrasonic => Decode::Raw,
            ReadRegister::Ir1
            | ReadRegister::Ir2
            | ReadRegister::Ir3
            | ReadRegister::Ir4
            | ReadRegister::Ir5
            | ReadRegister::Ir6
            | ReadRegister::Sound
            | ReadRegister::Light => Decode::Inverted,
            ReadRegister::Touch | ReadRegister::PowerKey => Decode::Flag,
            ReadRegister::Battery => Decode::Float,
            ReadRegister::Color => Decode::Packed,
            ReadRegister::Encoder1 | ReadRegister::Encoder2 => Decode::Revolutions,
        }
    }
}

/// The six downward/forward infrared distance sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrSensor {
    Ir1,
    Ir2,
    Ir3,
    Ir4,
    Ir5,
    Ir6,
}

impl IrSensor {
    pub const fn register(self) -> ReadRegister {
        match self {
            IrSensor::Ir1 => ReadRegister::Ir1,
            IrSensor::Ir2 => ReadRegister::Ir2,
            IrSensor::Ir3 => ReadRegister::Ir3,
            IrSensor::Ir4 => ReadRegister::Ir4,
            IrSensor::Ir5 => ReadRegister::Ir5,
            IrSensor::Ir6 => ReadRegister::Ir6,
        }
    }
}

/// Writable actuator channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRegister {
    Led1,
    Led2,
    Led3,
    Led4,
    Motor1,
    Motor2,
    MotorBrake,
    ColorCalibrate,
    FillLight,
    EncoderReset,
}

impl WriteRegister {
    pub const fn opcode(self) -> u8 {
        match self {
            WriteRegister::Led1 => 0x00,
            WriteRegister::Led2 => 0x01,
            WriteRegister::Led3 => 0x02,
            WriteRegister::Led4 => 0x03,
            WriteRegister::Motor1 => 0x04,
            WriteRegister::Motor2 => 0x05,
            WriteRegister::MotorBrake => 0x06,
            WriteRegister::ColorCalibrate => 0x07,
            WriteRegister::FillLight => 0x08,
            WriteRegister::EncoderReset => 0x09,
        }
    }

    /// Payload length the board expects after the opcode.
    pub const fn payload_len(self) -> usize {
        match self {
            WriteRegister::Led1
            | WriteRegister::Led2
            | WriteRegister::Led3
            | WriteRegister::Led4 => 3,
            WriteRegister::Motor1 | WriteRegister::Motor2 => 2,
            WriteRegister::MotorBrake
            | WriteRegister::ColorCalibrate
            | WriteRegister::FillLight
            | WriteRegister::EncoderReset => 1,
        }
    }
}
