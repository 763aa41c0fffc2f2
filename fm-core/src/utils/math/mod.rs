//! Math utilities for the Flymouse bottom board.
//!
//! This module provides the pure decode rules applied to raw register replies.

pub mod decode;
