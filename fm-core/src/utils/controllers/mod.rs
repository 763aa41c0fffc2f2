//! Module Exports
//!
//! This file exports the board-facing controllers.
//!
//! - `i2c`: the bottom board driver over the shared I2C bus.
//! - `leds`: RGB LED registers and the named color palette.
//! - `motor`: motor registers and the direction reversal guard.
//! - `gamepad`: passthrough for the PS2 gamepad driver.

/// Module for the bottom board driver.
pub mod i2c;
pub mod gamepad;
pub mod leds;
pub mod motor;

use core::cell::RefCell;

use embassy_sync::{
    blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex},
    channel::{Channel, Receiver},
};
use embedded_hal::delay::DelayNs;
use heapless::String;
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};

pub use i2c::{DeviceError, Flymouse};
pub use leds::{Color, LedState, Rgbled};
pub use motor::Motor;

use crate::utils::{
    config::FlymouseConfig,
    math::decode::Reading,
    protocol::ReadRegister,
    timing::Clock,
};

/// Channel used to receive board commands from other tasks.
pub static BOARD_CHANNEL: Channel<CriticalSectionRawMutex, BoardCommand, 16> = Channel::new();

/// Every board operation as a serializable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardCommand {
    /// Handshake and reset the board.
    Init,
    /// Read and decode a sensor register.
    Read { r: ReadRegister },
    /// Set an LED to an RGB color.
    Led { l: Rgbled, r: u8, g: u8, b: u8 },
    /// Set an LED to a named color.
    LedColor { l: Rgbled, c: Color },
    /// Switch the color-sensor fill light.
    Fill { s: LedState },
    /// Calibrate the color sensor white balance.
    Calibrate,
    /// Set a motor speed.
    Motor { m: Motor, s: i32 },
    /// Brake both motors.
    Brake,
    /// Zero both encoder counters.
    ResetEncoders,
    /// Write a line of text to the display. Text past the buffer is dropped here and
    /// the driver cuts the rest to one display line.
    Display {
        #[serde(deserialize_with = "truncated")]
        t: String<64>,
    },
    /// Write `"<t>=<n>"` to the display.
    DisplayNumber {
        #[serde(deserialize_with = "truncated")]
        t: String<32>,
        n: f64,
    },
}

/// Deserialize a string into a bounded buffer, keeping as many whole characters as
/// fit instead of rejecting the value.
fn truncated<'de, D, const N: usize>(deserializer: D) -> Result<String<N>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Truncate<const N: usize>;

    impl<'de, const N: usize> Visitor<'de> for Truncate<N> {
        type Value = String<N>;

        fn expecting(
            &self,
            f: &mut core::fmt::Formatter<'_>,
        ) -> core::fmt::Result {
            f.write_str("a string")
        }

        fn visit_str<E: de::Error>(
            self,
            v: &str,
        ) -> Result<Self::Value, E> {
            let mut out = String::new();
            for c in v.chars() {
                if out.push(c).is_err() {
                    break;
                }
            }
            Ok(out)
        }
    }

    deserializer.deserialize_str(Truncate::<N>)
}

/// Owns the board driver and executes commands on the single control flow.
pub struct BoardController<'a, I2C, T> {
    pub board: Flymouse<'a, I2C, T>,
}

impl<'a, I2C, T, E> BoardController<'a, I2C, T>
where
    I2C: embedded_hal::i2c::I2c<Error = E>,
    T: Clock + DelayNs,
    E: core::fmt::Debug,
{
    /// Create the driver and block until the board is up.
    pub fn new(
        i2c_bus: &'a RefCell<I2C>,
        timer: T,
        config: FlymouseConfig,
    ) -> Self {
        let mut board = Flymouse::new(i2c_bus, timer, config);
        if let Err(e) = board.initialize() {
            tracing::error!(?e, "board reset after handshake failed");
        }
        BoardController { board }
    }

    /// Execute one command, logging the outcome.
    pub fn handle(
        &mut self,
        command: BoardCommand,
    ) -> Option<Reading> {
        tracing::info!(?command, "received board command");
        match self.board.execute_command(command) {
            Ok(Some(reading)) => {
                tracing::info!(?reading, "board reading");
                Some(reading)
            }
            Ok(None) => {
                tracing::debug!("board command executed");
                None
            }
            Err(e) => {
                tracing::error!(?e, "board command failed");
                None
            }
        }
    }

    /// Drain every queued command without waiting. Returns how many ran.
    pub fn poll<M: RawMutex, const N: usize>(
        &mut self,
        receiver: Receiver<'_, M, BoardCommand, N>,
    ) -> usize {
        let mut handled = 0;
        while let Ok(command) = receiver.try_receive() {
            self.handle(command);
            handled += 1;
        }
        handled
    }

    /// Execute commands as they arrive, forever.
    pub async fn run<M: RawMutex, const N: usize>(
        &mut self,
        receiver: Receiver<'_, M, BoardCommand, N>,
    ) -> ! {
        loop {
            let command = receiver.receive().await;
            self.handle(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_display_text_is_kept_up_to_capacity() {
        let json = r#"{"display":{"t":"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"}}"#;
        let command: BoardCommand = serde_json::from_str(json).unwrap();
        match command {
            BoardCommand::Display { t } => {
                assert_eq!(t.len(), 64);
                assert!(t.chars().all(|c| c == 'x'));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn truncation_keeps_whole_characters() {
        let json = r#"{"display_number":{"t":"éééééééééééééééééééé","n":3.5}}"#;
        let command: BoardCommand = serde_json::from_str(json).unwrap();
        match command {
            BoardCommand::DisplayNumber { t, n } => {
                assert_eq!(t.chars().count(), 16);
                assert!(t.chars().all(|c| c == '\u{e9}'));
                assert_eq!(n, 3.5);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
