//! Frame encoding and bus exchange.
//!
//! A frame goes out as separate bus writes: the mode marker, the opcode (or the
//! text length for display frames), then the payload. Reads follow with a single bus
//! read of the register's reply width. Nothing on the wire is checksummed, so replies
//! are decoded as received.

use embedded_hal::{delay::DelayNs, i2c::I2c};
use heapless::Vec;

use super::{Mode, ReadRegister, WriteRegister, MAX_PAYLOAD_LEN};
use crate::utils::{
    config::FlymouseConfig,
    timing::{Clock, RateLimiter},
};

/// One logical transaction as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub mode: Mode,
    /// Register opcode, or the text length for display frames.
    pub opcode: u8,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl Frame {
    pub fn read(register: ReadRegister) -> Self {
        Frame {
            mode: Mode::Read,
            opcode: register.opcode(),
            payload: Vec::new(),
        }
    }

    /// Payload bytes past [`MAX_PAYLOAD_LEN`] are dropped.
    pub fn write(
        register: WriteRegister,
        payload: &[u8],
    ) -> Self {
        Frame {
            mode: Mode::Write,
            opcode: register.opcode(),
            payload: payload.iter().copied().take(MAX_PAYLOAD_LEN).collect(),
        }
    }

    /// Display text, cut to the first [`MAX_PAYLOAD_LEN`] characters.
    ///
    /// Each character is sent as one byte; characters outside Latin-1 become `?`.
    pub fn display(text: &str) -> Self {
        let payload: Vec<u8, MAX_PAYLOAD_LEN> = text
            .chars()
            .take(MAX_PAYLOAD_LEN)
            .map(|c| u8::try_from(c).unwrap_or(b'?'))
            .collect();
        Frame {
            mode: Mode::Display,
            opcode: payload.len() as u8,
            payload,
        }
    }
}

/// Frames commands onto the bus, spacing them through two independent gates.
pub struct CommandCodec<I2C, T> {
    bus: I2C,
    address: u8,
    timer: T,
    general: RateLimiter,
    display: RateLimiter,
}

impl<I2C, T, E> CommandCodec<I2C, T>
where
    I2C: I2c<Error = E>,
    T: Clock + DelayNs,
{
    pub fn new(
        bus: I2C,
        timer: T,
        config: &FlymouseConfig,
    ) -> Self {
        CommandCodec {
            bus,
            address: config.address,
            timer,
            general: RateLimiter::new(config.command_interval_us),
            display: RateLimiter::new(config.display_interval_us),
        }
    }

    /// Read a register and return its reply bytes as a little-endian integer.
    ///
    /// Only the low `reply_width()` bytes are meaningful.
    pub fn send_read(
        &mut self,
        register: ReadRegister,
    ) -> Result<u32, E> {
        self.general.gate(&mut self.timer);
        self.transmit(&Frame::read(register))?;

        let mut reply = [0u8; 4];
        let width = register.reply_width();
        self.bus.read(self.address, &mut reply[..width])?;
        tracing::debug!(?register, ?reply, width, "read reply");
        Ok(u32::from_le_bytes(reply))
    }

    pub fn send_write(
        &mut self,
        register: WriteRegister,
        payload: &[u8],
    ) -> Result<(), E> {
        self.general.gate(&mut self.timer);
        self.transmit(&Frame::write(register, payload))
    }

    /// Write a line of text to the OLED; gated on the display channel only.
    pub fn send_display(
        &mut self,
        text: &str,
    ) -> Result<(), E> {
        self.display.gate(&mut self.timer);
        self.transmit(&Frame::display(text))
    }

    fn transmit(
        &mut self,
        frame: &Frame,
    ) -> Result<(), E> {
        tracing::debug!(
            mode = ?frame.mode,
            opcode = frame.opcode,
            len = frame.payload.len(),
            "frame"
        );
        self.bus.write(self.address, &[frame.mode.marker()])?;
        self.bus.write(self.address, &[frame.opcode])?;
        if !frame.payload.is_empty() {
            self.bus.write(self.address, &frame.payload)?;
        }
        Ok(())
    }

    /// Block the control flow; used for settle delays owned by callers.
    pub fn pause_ms(
        &mut self,
        ms: u32,
    ) {
        self.timer.delay_ms(ms);
    }

    /// Release the bus and timer.
    pub fn release(self) -> (I2C, T) {
        (self.bus, self.timer)
    }
}
