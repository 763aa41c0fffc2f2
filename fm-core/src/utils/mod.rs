//! Utility re-exports for the Flymouse bottom board driver.
//!
//! This module re-exports the driver, protocol, timing and decode helpers:
//!
//! - `config`: board configuration with firmware defaults
//! - `controllers`: the board driver, LED palette, motor guard and command dispatch
//! - `math`: pure decode rules for sensor replies
//! - `protocol`: wire constants, register table and the command codec
//! - `timing`: clocks and the per-channel rate limiter

pub mod config;
pub mod controllers;
pub mod math;
pub mod protocol;
pub mod timing;

pub use config::FlymouseConfig;
pub use controllers::{BoardCommand, BoardController, DeviceError, Flymouse};
pub use timing::{Clock, EmbassyTimer, ManualTimer};
