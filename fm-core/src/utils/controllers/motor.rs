//! Motor direction guard.
//!
//! Reversing a running motor straight from forward to backward draws a current
//! spike through the driver. The guard remembers the last commanded speed of each
//! motor and asks for a short brake whenever the sign flips.

use serde::{Deserialize, Serialize};

use crate::utils::protocol::{ReadRegister, WriteRegister};

/// Largest speed magnitude the board accepts.
pub const MAX_SPEED: i16 = 1023;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motor {
    M1,
    M2,
}

impl Motor {
    pub const ALL: [Motor; 2] = [Motor::M1, Motor::M2];

    pub const fn speed_register(self) -> WriteRegister {
        match self {
            Motor::M1 => WriteRegister::Motor1,
            Motor::M2 => WriteRegister::Motor2,
        }
    }

    pub const fn encoder_register(self) -> ReadRegister {
        match self {
            Motor::M1 => ReadRegister::Encoder1,
            Motor::M2 => ReadRegister::Encoder2,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Motor::M1 => 0,
            Motor::M2 => 1,
        }
    }
}

/// Clamp a requested speed into `[-MAX_SPEED, MAX_SPEED]`.
pub fn clamp_speed(requested: i32) -> i16 {
    requested.clamp(-i32::from(MAX_SPEED), i32::from(MAX_SPEED)) as i16
}

/// What to put on the wire for one speed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedPlan {
    pub speed: i16,
    /// Brake and settle before sending `speed`.
    pub brake_first: bool,
}

impl SpeedPlan {
    pub fn payload(&self) -> [u8; 2] {
        self.speed.to_le_bytes()
    }
}

/// Per-motor direction state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorGuard {
    last_speed: i16,
}

impl MotorGuard {
    pub const fn new() -> Self {
        MotorGuard { last_speed: 0 }
    }

    pub fn last_speed(&self) -> i16 {
        self.last_speed
    }

    /// Clamp the request and decide whether it reverses the motor.
    ///
    /// Only a strict positive/negative flip counts; starting from or stopping at
    /// zero never brakes.
    pub fn plan(
        &self,
        requested: i32,
    ) -> SpeedPlan {
        let speed = clamp_speed(requested);
        let brake_first = (speed > 0 && self.last_speed < 0) || (speed < 0 && self.last_speed > 0);
        SpeedPlan { speed, brake_first }
    }

    /// Record a speed once it has been sent.
    pub fn commit(
        &mut self,
        plan: SpeedPlan,
    ) {
        self.last_speed = plan.speed;
    }
}
