//! Protocol driver for the Flymouse robot bottom board on no-std embedded platforms.
//!
//! For a host-side bench setup, see the `mock-mcu` crate in `fm-app/`.
#![no_std]

pub mod utils;
