//! Bottom board driver for the Flymouse robot.
//!
//! This module owns the command codec, both rate-limit gates and the per-motor
//! direction guards, and exposes one method per board operation. Commands can also
//! arrive as [`BoardCommand`](super::BoardCommand) values via `BOARD_CHANNEL`.

use core::{
    cell::RefCell,
    fmt::{self, Display, Write},
};

use embedded_hal::{delay::DelayNs, i2c::I2c};
use embedded_hal_bus::i2c::RefCellDevice;
use heapless::String;
use smart_leds_trait::RGB8;

use super::{
    leds::{bgr_payload, Color, LedState, Rgbled},
    motor::{Motor, MotorGuard},
    BoardCommand,
};
use crate::utils::{
    config::FlymouseConfig,
    math::decode::{self, Reading},
    protocol::{CommandCodec, IrSensor, ReadRegister, WriteRegister, MAX_PAYLOAD_LEN, TEST_ACK},
    timing::Clock,
};

/// Lines shown on the display once the board is up.
pub const BANNER: [&str; 4] = [
    " ",
    "+----------------+",
    "| Microbit Onine |",
    "+----------------+",
];

/// Errors that can occur when talking to the bottom board.
///
/// The protocol itself never fails: out-of-range speeds are clamped, long text is
/// cut and replies are trusted. Only the bus can report an error.
#[derive(Debug)]
pub enum DeviceError<E: core::fmt::Debug> {
    Bus(E),
}

impl<E: core::fmt::Debug> core::fmt::Display for DeviceError<E> {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            DeviceError::Bus(e) => write!(f, "i2c bus error: {:?}", e),
        }
    }
}

/// Formatter sink that keeps the first [`MAX_PAYLOAD_LEN`] characters and drops
/// the rest without failing.
#[derive(Default)]
struct DisplayLine {
    text: String<{ MAX_PAYLOAD_LEN * 4 }>,
    chars: usize,
}

impl Write for DisplayLine {
    fn write_str(
        &mut self,
        s: &str,
    ) -> fmt::Result {
        for c in s.chars() {
            if self.chars == MAX_PAYLOAD_LEN || self.text.push(c).is_err() {
                break;
            }
            self.chars += 1;
        }
        Ok(())
    }
}

/// High-level driver for the bottom board over a shared I2C bus.
pub struct Flymouse<'a, I2C, T> {
    codec: CommandCodec<RefCellDevice<'a, I2C>, T>,
    motors: [MotorGuard; 2],
    config: FlymouseConfig,
}

impl<'a, I2C, T, E> Flymouse<'a, I2C, T>
where
    I2C: I2c<Error = E>,
    T: Clock + DelayNs,
    E: core::fmt::Debug,
{
    /// Create a driver for the board on `i2c_bus`. No bus traffic happens until
    /// [`initialize`](Self::initialize) or the first command.
    pub fn new(
        i2c_bus: &'a RefCell<I2C>,
        timer: T,
        config: FlymouseConfig,
    ) -> Self {
        Flymouse {
            codec: CommandCodec::new(RefCellDevice::new(i2c_bus), timer, &config),
            motors: [MotorGuard::new(); 2],
            config,
        }
    }

    pub fn config(&self) -> &FlymouseConfig {
        &self.config
    }

    /// Last speed sent to `motor`.
    pub fn motor_speed(
        &self,
        motor: Motor,
    ) -> i16 {
        self.motors[motor.index()].last_speed()
    }

    /// One handshake attempt. A bus error counts as no answer.
    pub fn check_i2c(&mut self) -> bool {
        match self.codec.send_read(ReadRegister::Test) {
            Ok(reply) => reply == u32::from(TEST_ACK),
            Err(e) => {
                tracing::debug!(?e, "handshake read failed");
                false
            }
        }
    }

    /// Wait for the board to answer, then put every actuator in a known state.
    ///
    /// Blocks until the board acknowledges; it never gives up. Returns the number of
    /// handshake attempts it took.
    pub fn initialize(&mut self) -> Result<u32, DeviceError<E>> {
        let mut attempts = 1u32;
        while !self.check_i2c() {
            tracing::warn!(attempts, "bottom board not answering, retrying");
            self.codec.pause_ms(self.config.handshake_retry_ms);
            attempts += 1;
        }
        tracing::info!(attempts, "bottom board acknowledged");

        self.reset_board()?;
        tracing::info!("bottom board initialized");
        Ok(attempts)
    }

    /// LEDs off, motors braked, fill light off, banner on the display.
    pub fn reset_board(&mut self) -> Result<(), DeviceError<E>> {
        for led in Rgbled::ALL {
            self.set_pixel_color(led, Color::Black)?;
        }
        self.set_motor_brake()?;
        self.set_fill_light(LedState::Off)?;
        self.write_banner()
    }

    pub fn write_banner(&mut self) -> Result<(), DeviceError<E>> {
        for line in BANNER {
            self.write_display(line)?;
        }
        if let Some(id) = self.config.device_id {
            let mut line: String<MAX_PAYLOAD_LEN> = String::new();
            // "ID " plus at most ten digits always fits.
            let _ = write!(line, "ID {}", id);
            self.write_display(&line)?;
        }
        Ok(())
    }

    // Actuators

    pub fn set_pixel(
        &mut self,
        led: Rgbled,
        color: RGB8,
    ) -> Result<(), DeviceError<E>> {
        self.codec
            .send_write(led.register(), &bgr_payload(color))
            .map_err(DeviceError::Bus)
    }

    pub fn set_pixel_rgb(
        &mut self,
        led: Rgbled,
        red: u8,
        green: u8,
        blue: u8,
    ) -> Result<(), DeviceError<E>> {
        self.set_pixel(
            led,
            RGB8 {
                r: red,
                g: green,
                b: blue,
            },
        )
    }

    pub fn set_pixel_color(
        &mut self,
        led: Rgbled,
        color: Color,
    ) -> Result<(), DeviceError<E>> {
        self.set_pixel(led, color.rgb())
    }

    pub fn set_fill_light(
        &mut self,
        state: LedState,
    ) -> Result<(), DeviceError<E>> {
        self.codec
            .send_write(WriteRegister::FillLight, &[state.flag()])
            .map_err(DeviceError::Bus)
    }

    /// Trigger white-balance calibration and wait for the sensor to settle.
    pub fn calibrate_color_sensor(&mut self) -> Result<(), DeviceError<E>> {
        self.codec
            .send_write(WriteRegister::ColorCalibrate, &[1])
            .map_err(DeviceError::Bus)?;
        self.codec.pause_ms(self.config.calibration_settle_ms);
        Ok(())
    }

    /// Brake both motors.
    pub fn set_motor_brake(&mut self) -> Result<(), DeviceError<E>> {
        self.codec
            .send_write(WriteRegister::MotorBrake, &[1])
            .map_err(DeviceError::Bus)
    }

    /// Set a motor's speed in `[-1023, 1023]`; larger magnitudes are clamped.
    ///
    /// Flipping direction brakes first and holds the brake for
    /// `reversal_brake_ms` before the new speed goes out.
    pub fn set_motor_speed(
        &mut self,
        motor: Motor,
        speed: i32,
    ) -> Result<(), DeviceError<E>> {
        let plan = self.motors[motor.index()].plan(speed);
        if plan.brake_first {
            tracing::debug!(
                ?motor,
                from = self.motor_speed(motor),
                to = plan.speed,
                "direction reversal, braking"
            );
            self.set_motor_brake()?;
            self.codec.pause_ms(self.config.reversal_brake_ms);
        }

        self.codec
            .send_write(motor.speed_register(), &plan.payload())
            .map_err(DeviceError::Bus)?;
        self.motors[motor.index()].commit(plan);
        Ok(())
    }

    pub fn reset_encoders(&mut self) -> Result<(), DeviceError<E>> {
        self.codec
            .send_write(WriteRegister::EncoderReset, &[1])
            .map_err(DeviceError::Bus)
    }

    // Display

    /// Show a line of text; anything past 18 characters is dropped.
    pub fn write_display(
        &mut self,
        text: &str,
    ) -> Result<(), DeviceError<E>> {
        self.codec.send_display(text).map_err(DeviceError::Bus)
    }

    /// Show `"<label>=<value>"`, cut to one display line.
    pub fn write_display_number(
        &mut self,
        label: &str,
        value: impl Display,
    ) -> Result<(), DeviceError<E>> {
        let mut line = DisplayLine::default();
        let _ = write!(line, "{}={}", label, value);
        self.write_display(&line.text)
    }

    // Sensors

    /// Read any register and decode it by the register table.
    pub fn read(
        &mut self,
        register: ReadRegister,
    ) -> Result<Reading, DeviceError<E>> {
        let raw = self.codec.send_read(register).map_err(DeviceError::Bus)?;
        Ok(decode::decode_reply(register, raw))
    }

    fn read_raw(
        &mut self,
        register: ReadRegister,
    ) -> Result<u32, DeviceError<E>> {
        self.codec.send_read(register).map_err(DeviceError::Bus)
    }

    pub fn read_touch(&mut self) -> Result<bool, DeviceError<E>> {
        Ok(decode::flag(self.read_raw(ReadRegister::Touch)? as u8))
    }

    pub fn read_power_key(&mut self) -> Result<bool, DeviceError<E>> {
        Ok(decode::flag(self.read_raw(ReadRegister::PowerKey)? as u8))
    }

    /// 0..=4095, larger means closer.
    pub fn read_ir(
        &mut self,
        sensor: IrSensor,
    ) -> Result<i32, DeviceError<E>> {
        Ok(decode::inverted_analog(self.read_raw(sensor.register())? as u16))
    }

    /// 0..=4095, larger means louder.
    pub fn read_sound(&mut self) -> Result<i32, DeviceError<E>> {
        Ok(decode::inverted_analog(self.read_raw(ReadRegister::Sound)? as u16))
    }

    /// 0..=4095, larger means brighter.
    pub fn read_light(&mut self) -> Result<i32, DeviceError<E>> {
        Ok(decode::inverted_analog(self.read_raw(ReadRegister::Light)? as u16))
    }

    pub fn read_ultrasonic(&mut self) -> Result<u16, DeviceError<E>> {
        Ok(self.read_raw(ReadRegister::Ultrasonic)? as u16)
    }

    pub fn read_battery_volt(&mut self) -> Result<f32, DeviceError<E>> {
        Ok(f32::from_bits(self.read_raw(ReadRegister::Battery)?))
    }

    /// Packed `0xRRGGBB`; split it with [`decode::calc_rgb`].
    pub fn read_color(&mut self) -> Result<u32, DeviceError<E>> {
        let bytes = self.read_raw(ReadRegister::Color)?.to_le_bytes();
        Ok(decode::packed_color([bytes[0], bytes[1], bytes[2]]))
    }

    /// Whole wheel turns since the last encoder reset.
    pub fn read_turns_of_wheel(
        &mut self,
        motor: Motor,
    ) -> Result<i32, DeviceError<E>> {
        Ok(decode::revolutions(
            self.read_raw(motor.encoder_register())? as i32,
        ))
    }

    /// Execute a [`BoardCommand`], returning a reading for sensor commands.
    pub fn execute_command(
        &mut self,
        command: BoardCommand,
    ) -> Result<Option<Reading>, DeviceError<E>> {
        match command {
            BoardCommand::Init => {
                self.initialize()?;
                Ok(None)
            }
            BoardCommand::Read { r } => Ok(Some(self.read(r)?)),
            BoardCommand::Led { l, r, g, b } => {
                self.set_pixel_rgb(l, r, g, b)?;
                Ok(None)
            }
            BoardCommand::LedColor { l, c } => {
                self.set_pixel_color(l, c)?;
                Ok(None)
            }
            BoardCommand::Fill { s } => {
                self.set_fill_light(s)?;
                Ok(None)
            }
            BoardCommand::Calibrate => {
                self.calibrate_color_sensor()?;
                Ok(None)
            }
            BoardCommand::Motor { m, s } => {
                self.set_motor_speed(m, s)?;
                Ok(None)
            }
            BoardCommand::Brake => {
                self.set_motor_brake()?;
                Ok(None)
            }
            BoardCommand::ResetEncoders => {
                self.reset_encoders()?;
                Ok(None)
            }
            BoardCommand::Display { t } => {
                self.write_display(&t)?;
                Ok(None)
            }
            BoardCommand::DisplayNumber { t, n } => {
                self.write_display_number(&t, n)?;
                Ok(None)
            }
        }
    }

    /// Release the timer; the bus stays with its `RefCell` owner.
    pub fn release(self) -> T {
        self.codec.release().1
    }
}
