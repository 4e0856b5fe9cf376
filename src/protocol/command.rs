use std::fmt;

use crate::color::Rgb;
use crate::protocol::frame::{build_frame, Frame, FrameFields};

pub const CMD_SET_STATIC: u8 = 0x28;
pub const FLAG_SET_STATIC: u8 = 0x0F;
pub const TAIL_SET_STATIC: u8 = 0x29;

pub const CMD_ANIMATE: u8 = 0x66;
pub const SUB_ANIMATE: u16 = 0x25;
pub const ANIMATE_CONST: u16 = 0x64;
pub const TAIL_ANIMATE: u8 = 0x99;

pub const CMD_POWER: u8 = 0xFA;
pub const SUB_POWER_ON: u16 = 0x23;
pub const SUB_POWER_OFF: u16 = 0x24;
pub const TAIL_POWER: u8 = 0xFB;

pub const CMD_UPDATE: u8 = 0xA9;
pub const SUB_UPDATE: u16 = 0xF0;
pub const TAIL_UPDATE: u8 = 0x9A;

/// Full-scale channel level at 100% brightness
pub const LEVEL_MAX: f64 = 10000.0;

/// A device command. Inputs are expected to be in range already:
/// `brightness` in `[0.0, 1.0]`, `speed` in `[1, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    PowerOn,
    PowerOff,
    SetStatic { color: Rgb, brightness: f64 },
    Animate { speed: u8 },
    RequestUpdate,
}

impl Command {
    /// Nominal field values for this command, before checksumming.
    pub fn fields(&self) -> FrameFields {
        match *self {
            Command::PowerOn => simple(CMD_POWER, SUB_POWER_ON, TAIL_POWER),
            Command::PowerOff => simple(CMD_POWER, SUB_POWER_OFF, TAIL_POWER),
            Command::SetStatic { color, brightness } => FrameFields {
                cmd: CMD_SET_STATIC,
                words: [
                    channel_level(color.red, brightness),
                    channel_level(color.green, brightness),
                    channel_level(color.blue, brightness),
                    0,
                    0,
                    brightness_percent(brightness),
                ],
                flag: FLAG_SET_STATIC,
                reserved: 0,
                tail: TAIL_SET_STATIC,
            },
            Command::Animate { speed } => FrameFields {
                cmd: CMD_ANIMATE,
                words: [SUB_ANIMATE, device_speed(speed), ANIMATE_CONST, 0, 0, 0],
                flag: 0,
                reserved: 0,
                tail: TAIL_ANIMATE,
            },
            Command::RequestUpdate => simple(CMD_UPDATE, SUB_UPDATE, TAIL_UPDATE),
        }
    }

    /// Encode into a wire-ready frame.
    pub fn encode(&self) -> Frame {
        build_frame(&self.fields())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PowerOn => write!(f, "power on"),
            Command::PowerOff => write!(f, "power off"),
            Command::SetStatic { color, brightness } => write!(
                f,
                "static #{:02x}{:02x}{:02x} @ {}%",
                color.red,
                color.green,
                color.blue,
                brightness_percent(*brightness)
            ),
            Command::Animate { speed } => write!(f, "animate speed {}", speed),
            Command::RequestUpdate => write!(f, "request update"),
        }
    }
}

fn simple(cmd: u8, sub: u16, tail: u8) -> FrameFields {
    FrameFields {
        cmd,
        words: [sub, 0, 0, 0, 0, 0],
        flag: 0,
        reserved: 0,
        tail,
    }
}

/// Scale an 8-bit channel into the device's 0..=10000 range at the given brightness.
pub fn channel_level(channel: u8, brightness: f64) -> u16 {
    (f64::from(channel) * LEVEL_MAX * brightness).div_euclid(255.0) as u16
}

pub fn brightness_percent(brightness: f64) -> u16 {
    (100.0 * brightness).round() as u16
}

/// Inverted and rescaled: dial 100 maps to 0, dial 1 maps to 252.
pub fn device_speed(speed: u8) -> u16 {
    100u16.saturating_sub(u16::from(speed)) * 255 / 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{checksum, CHECKSUM_OFFSET, FRAME_LEN};

    const WHITE: Rgb = Rgb::new(255, 255, 255);
    const RED: Rgb = Rgb::new(255, 0, 0);

    fn all_commands() -> Vec<Command> {
        vec![
            Command::PowerOn,
            Command::PowerOff,
            Command::SetStatic { color: WHITE, brightness: 1.0 },
            Command::SetStatic { color: Rgb::new(12, 200, 77), brightness: 0.33 },
            Command::SetStatic { color: RED, brightness: 0.0 },
            Command::Animate { speed: 1 },
            Command::Animate { speed: 99 },
            Command::Animate { speed: 100 },
            Command::RequestUpdate,
        ]
    }

    #[test]
    fn test_every_frame_has_fixed_length_and_valid_checksum() {
        for command in all_commands() {
            let frame = command.encode();
            assert_eq!(frame.len(), FRAME_LEN, "{}", command);
            assert_eq!(frame[CHECKSUM_OFFSET], checksum(&frame), "{}", command);
        }
    }

    #[test]
    fn test_power_on_frame() {
        assert_eq!(
            Command::PowerOn.encode(),
            [0xFA, 0x23, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x23, 0xFB]
        );
    }

    #[test]
    fn test_power_off_frame() {
        assert_eq!(
            Command::PowerOff.encode(),
            [0xFA, 0x24, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x24, 0xFB]
        );
    }

    #[test]
    fn test_request_update_frame() {
        assert_eq!(
            Command::RequestUpdate.encode(),
            [0xA9, 0xF0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xF0, 0x9A]
        );
    }

    #[test]
    fn test_animate_frame() {
        // dial 99 -> device speed 2
        assert_eq!(
            Command::Animate { speed: 99 }.encode(),
            [0x66, 0x25, 0, 0x02, 0, 0x64, 0, 0, 0, 0, 0, 0, 0, 0, 0x43, 0x99]
        );
    }

    #[test]
    fn test_static_white_full_brightness() {
        let frame = Command::SetStatic { color: WHITE, brightness: 1.0 }.encode();
        assert_eq!(
            frame,
            [0x28, 0x10, 0x27, 0x10, 0x27, 0x10, 0x27, 0, 0, 0, 0, 0x64, 0, 0x0F, 0x5C, 0x29]
        );
    }

    #[test]
    fn test_static_red_half_brightness() {
        let fields = Command::SetStatic { color: RED, brightness: 0.5 }.fields();
        assert_eq!(fields.words, [5000, 0, 0, 0, 0, 50]);
        assert_eq!(fields.flag, FLAG_SET_STATIC);
        assert_eq!(fields.tail, TAIL_SET_STATIC);
    }

    #[test]
    fn test_channel_level_floors() {
        assert_eq!(channel_level(255, 1.0), 10000);
        assert_eq!(channel_level(0, 1.0), 0);
        assert_eq!(channel_level(1, 1.0), 39);
        assert_eq!(channel_level(128, 1.0), 5019);
        assert_eq!(channel_level(255, 0.29), 2900);
        assert_eq!(channel_level(128, 0.5), 2509);
    }

    #[test]
    fn test_brightness_percent_rounds() {
        assert_eq!(brightness_percent(0.29), 29);
        assert_eq!(brightness_percent(0.0), 0);
        assert_eq!(brightness_percent(1.0), 100);
    }

    #[test]
    fn test_device_speed_is_inverted() {
        assert_eq!(device_speed(100), 0);
        assert_eq!(device_speed(1), 252);
        assert_eq!(device_speed(50), 127);
    }
}
