//! Simulated bottom board.
//!
//! Decodes the wire framing byte stream the way the real board does and answers
//! reads with plausible sensor values.

use std::convert::Infallible;

use embedded_hal::i2c::{ErrorType, I2c, Operation};
use flymouse_core::utils::protocol::{MARKER_DISPLAY, MARKER_READ, MARKER_WRITE, TEST_ACK};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Marker,
    ReadOpcode,
    WriteOpcode,
    Payload(u8),
    Length,
    Text,
}

pub struct SimulatedBoard {
    address: u8,
    expect: Expect,
    pending_read: Option<u8>,
    handshakes_to_fail: u32,
    pub leds: [[u8; 3]; 4],
    pub motors: [i16; 2],
    pub encoders: [i32; 2],
    pub fill_light: bool,
    pub display: Vec<String>,
}

impl SimulatedBoard {
    pub fn new(
        address: u8,
        handshakes_to_fail: u32,
    ) -> Self {
        SimulatedBoard {
            address,
            expect: Expect::Marker,
            pending_read: None,
            handshakes_to_fail,
            leds: [[0; 3]; 4],
            motors: [0; 2],
            encoders: [0; 2],
            fill_light: false,
            display: Vec::new(),
        }
    }

    fn receive(
        &mut self,
        bytes: &[u8],
    ) {
        let first = bytes.first().copied().unwrap_or(0);
        let state = self.expect;
        self.expect = match state {
            Expect::Marker => match first {
                MARKER_READ => Expect::ReadOpcode,
                MARKER_WRITE => Expect::WriteOpcode,
                MARKER_DISPLAY => Expect::Length,
                other => {
                    warn!("unexpected byte 0x{:02X} outside a frame", other);
                    Expect::Marker
                }
            },
            Expect::ReadOpcode => {
                self.pending_read = Some(first);
                Expect::Marker
            }
            Expect::WriteOpcode => Expect::Payload(first),
            Expect::Payload(opcode) => {
                self.apply_write(opcode, bytes);
                Expect::Marker
            }
            Expect::Length if first == 0 => {
                self.show(String::new());
                Expect::Marker
            }
            Expect::Length => Expect::Text,
            Expect::Text => {
                self.show(bytes.iter().map(|&b| char::from(b)).collect());
                Expect::Marker
            }
        };
    }

    fn show(
        &mut self,
        line: String,
    ) {
        info!("OLED: {}", line);
        self.display.push(line);
    }

    fn apply_write(
        &mut self,
        opcode: u8,
        payload: &[u8],
    ) {
        let byte = |i: usize| payload.get(i).copied().unwrap_or(0);
        match opcode {
            0x00..=0x03 => {
                let led = opcode as usize;
                self.leds[led] = [byte(2), byte(1), byte(0)];
                info!(led = led + 1, rgb = ?self.leds[led], "LED set");
            }
            0x04 | 0x05 => {
                let motor = (opcode - 0x04) as usize;
                self.motors[motor] = i16::from_le_bytes([byte(0), byte(1)]);
                info!(motor = motor + 1, speed = self.motors[motor], "motor speed");
            }
            0x06 => {
                self.motors = [0; 2];
                info!("motors braked");
            }
            0x07 => info!("color sensor calibrating"),
            0x08 => {
                self.fill_light = byte(0) == 1;
                info!(on = self.fill_light, "fill light");
            }
            0x09 => {
                self.encoders = [0; 2];
                info!("encoders reset");
            }
            other => warn!("unknown write register 0x{:02X}", other),
        }
    }

    fn reply(
        &mut self,
        opcode: u8,
    ) -> [u8; 4] {
        let value: u32 = match opcode {
            0x00 if self.handshakes_to_fail > 0 => {
                self.handshakes_to_fail -= 1;
                0xFF
            }
            0x00 => u32::from(TEST_ACK),
            0x01..=0x06 => 0xFFF - 300 * u32::from(opcode),
            0x07 => 3.9f32.to_bits(),
            0x08 => 0xF00,
            0x09 => 0x800,
            0x0A | 0x0F => 0,
            0x0B => 0x00C0_8040,
            0x0C | 0x0D => {
                let i = (opcode - 0x0C) as usize;
                // The hardware counter wraps.
                self.encoders[i] = self.encoders[i].wrapping_add(i32::from(self.motors[i]) / 4);
                self.encoders[i] as u32
            }
            0x0E => 120,
            other => {
                warn!("unknown read register 0x{:02X}", other);
                0
            }
        };
        value.to_le_bytes()
    }
}

impl ErrorType for SimulatedBoard {
    type Error = Infallible;
}

impl I2c for SimulatedBoard {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            debug!("ignoring traffic for 0x{:02X}", address);
            return Ok(());
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => self.receive(bytes),
                Operation::Read(buf) => {
                    let reply = match self.pending_read.take() {
                        Some(opcode) => self.reply(opcode),
                        None => {
                            warn!("read without a read frame");
                            [0; 4]
                        }
                    };
                    for (dst, src) in buf.iter_mut().zip(reply) {
                        *dst = src;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_counter_wraps() {
        let mut board = SimulatedBoard::new(0x50, 0);
        board.motors = [1023, 0];
        board.encoders = [i32::MAX, 0];
        let reply = board.reply(0x0C);
        assert_eq!(i32::from_le_bytes(reply), i32::MAX.wrapping_add(255));
    }

    #[test]
    fn handshake_answers_after_configured_failures() {
        let mut board = SimulatedBoard::new(0x50, 1);
        assert_eq!(board.reply(0x00)[0], 0xFF);
        assert_eq!(board.reply(0x00)[0], TEST_ACK);
    }
}
