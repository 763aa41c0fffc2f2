//! PS2 gamepad passthrough.
//!
//! The gamepad hangs off its own pins and has its own driver; the board driver only
//! polls it and reports when a poll fails.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitalButton {
    Select,
    L3,
    R3,
    Start,
    Up,
    Right,
    Down,
    Left,
    L2,
    R2,
    L1,
    R1,
    Triangle,
    Circle,
    Cross,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalogButton {
    RightX,
    RightY,
    LeftX,
    LeftY,
}

/// A polled gamepad. `read` latches a fresh sample; the button accessors read the
/// latched sample.
pub trait Gamepad {
    fn read(&mut self) -> bool;
    fn button_digital(
        &self,
        button: DigitalButton,
    ) -> bool;
    fn button_analog(
        &self,
        button: AnalogButton,
    ) -> u8;
}

/// Poll the gamepad, logging a diagnostic when no sample came back.
pub fn read_gamepad<G: Gamepad>(pad: &mut G) -> bool {
    let ok = pad.read();
    if !ok {
        tracing::warn!("ps2 x");
    }
    ok
}
