//! RGB LEDs and the color-sensor fill light.
//!
//! The bottom board carries four RGB LEDs, each on its own write register. Colors
//! travel blue first on the wire.

use serde::{Deserialize, Serialize};
use smart_leds_trait::{SmartLedsWrite, RGB8};

use super::i2c::{DeviceError, Flymouse};
use crate::utils::{protocol::WriteRegister, timing::Clock};

/// Number of LEDs on the board.
pub const LED_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rgbled {
    Led1,
    Led2,
    Led3,
    Led4,
}

impl Rgbled {
    pub const ALL: [Rgbled; LED_COUNT] = [Rgbled::Led1, Rgbled::Led2, Rgbled::Led3, Rgbled::Led4];

    pub const fn register(self) -> WriteRegister {
        match self {
            Rgbled::Led1 => WriteRegister::Led1,
            Rgbled::Led2 => WriteRegister::Led2,
            Rgbled::Led3 => WriteRegister::Led3,
            Rgbled::Led4 => WriteRegister::Led4,
        }
    }
}

/// Named colors, as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red = 0xFF0000,
    Orange = 0xFFA500,
    Yellow = 0xFFFF00,
    Green = 0x00FF00,
    Blue = 0x0000FF,
    Indigo = 0x4B0082,
    Violet = 0x8A2BE2,
    Purple = 0xFF00FF,
    White = 0xFFFFFF,
    Black = 0x000000,
}

impl Color {
    pub const fn rgb(self) -> RGB8 {
        let v = self as u32;
        RGB8 {
            r: ((v >> 16) & 0xFF) as u8,
            g: ((v >> 8) & 0xFF) as u8,
            b: (v & 0xFF) as u8,
        }
    }
}

/// Fill light switch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedState {
    Off,
    On,
}

impl LedState {
    pub const fn flag(self) -> u8 {
        match self {
            LedState::Off => 0,
            LedState::On => 1,
        }
    }
}

impl From<bool> for LedState {
    fn from(on: bool) -> Self {
        if on {
            LedState::On
        } else {
            LedState::Off
        }
    }
}

/// Wire payload for an LED color.
pub fn bgr_payload(color: RGB8) -> [u8; 3] {
    [color.b, color.g, color.r]
}

/// Writes colors to LED1..LED4 in order; extra colors are ignored.
impl<I2C, T, E> SmartLedsWrite for Flymouse<'_, I2C, T>
where
    I2C: embedded_hal::i2c::I2c<Error = E>,
    T: Clock + embedded_hal::delay::DelayNs,
    E: core::fmt::Debug,
{
    type Color = RGB8;
    type Error = DeviceError<E>;

    fn write<It, C>(
        &mut self,
        iterator: It,
    ) -> Result<(), Self::Error>
    where
        It: IntoIterator<Item = C>,
        C: Into<Self::Color>,
    {
        for (led, color) in Rgbled::ALL.into_iter().zip(iterator) {
            self.set_pixel(led, color.into())?;
        }
        Ok(())
    }
}
