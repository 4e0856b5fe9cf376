use log::{debug, trace};

use crate::color::{ColorInput, ColorResolver, CssColorResolver, Rgb, WHITE};
use crate::error::{ControllerError, TransportError};
use crate::protocol::{hex, Command};
use crate::transport::Transport;

pub const DEFAULT_BRIGHTNESS: f64 = 1.0;
pub const DEFAULT_ANIMATION_SPEED: u8 = 99;
pub const MIN_ANIMATION_SPEED: i64 = 1;
pub const MAX_ANIMATION_SPEED: i64 = 100;

/// Client-side view of the device. Values are always in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceState {
    /// Last commanded power state (the device never acknowledges)
    pub power: bool,
    pub color: Rgb,
    /// Fraction in `[0.0, 1.0]`
    pub brightness: f64,
    /// User-facing dial in `[1, 100]`
    pub animation_speed: u8,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            power: false,
            color: WHITE,
            brightness: DEFAULT_BRIGHTNESS,
            animation_speed: DEFAULT_ANIMATION_SPEED,
        }
    }
}

/// Drives one device: keeps its state and sends one frame per mutating operation.
///
/// Every operation takes `&mut self`; callers sharing a controller across
/// threads wrap it in a `Mutex`.
pub struct DeviceController<T: Transport, R: ColorResolver = CssColorResolver> {
    transport: T,
    resolver: R,
    topic: String,
    qos: u8,
    state: DeviceState,
}

impl<T: Transport> DeviceController<T> {
    pub fn new(transport: T, topic: impl Into<String>, qos: u8) -> Self {
        Self::with_resolver(transport, CssColorResolver, topic, qos)
    }
}

impl<T: Transport, R: ColorResolver> DeviceController<T, R> {
    pub fn with_resolver(transport: T, resolver: R, topic: impl Into<String>, qos: u8) -> Self {
        DeviceController {
            transport,
            resolver,
            topic: topic.into(),
            qos,
            state: DeviceState::default(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn connect(&mut self) -> Result<(), TransportError> {
        self.transport.connect()
    }

    pub fn close(&mut self) -> Result<(), TransportError> {
        self.transport.close()
    }

    pub fn power_on(&mut self) -> Result<(), ControllerError> {
        self.send(Command::PowerOn)?;
        self.state.power = true;
        Ok(())
    }

    pub fn power_off(&mut self) -> Result<(), ControllerError> {
        self.send(Command::PowerOff)?;
        self.state.power = false;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.state.power
    }

    /// Resolve and store a color, then show it at the current brightness.
    /// On an unresolvable input nothing is stored or sent.
    pub fn set_color(&mut self, color: impl Into<ColorInput>) -> Result<(), ControllerError> {
        let input = color.into();
        let rgb = self
            .resolver
            .resolve(&input)
            .map_err(|source| ControllerError::InvalidColor {
                input: input.to_string(),
                source,
            })?;

        self.state.color = rgb;
        self.apply_static()
    }

    /// Set brightness in percent; values outside 0..=100 are clamped.
    pub fn set_brightness(&mut self, percent: i64) -> Result<(), ControllerError> {
        let percent = percent.clamp(0, 100);
        self.state.brightness = percent as f64 / 100.0;
        self.apply_static()
    }

    pub fn get_brightness(&self) -> u8 {
        (self.state.brightness * 100.0).round() as u8
    }

    /// Store the animation speed (clamped to 1..=100). Takes effect on the next `animate(true)`.
    pub fn set_animation_speed(&mut self, speed: i64) {
        self.state.animation_speed = speed.clamp(MIN_ANIMATION_SPEED, MAX_ANIMATION_SPEED) as u8;
    }

    pub fn animation_speed(&self) -> u8 {
        self.state.animation_speed
    }

    /// Start the built-in animation, or fall back to the static color.
    pub fn animate(&mut self, enabled: bool) -> Result<(), ControllerError> {
        if enabled {
            self.send(Command::Animate {
                speed: self.state.animation_speed,
            })
        } else {
            self.apply_static()
        }
    }

    /// Ask the device to refresh; it is assumed to be on afterwards.
    pub fn request_update(&mut self) -> Result<(), ControllerError> {
        self.send(Command::RequestUpdate)?;
        self.state.power = true;
        Ok(())
    }

    fn apply_static(&mut self) -> Result<(), ControllerError> {
        self.send(Command::SetStatic {
            color: self.state.color,
            brightness: self.state.brightness,
        })
    }

    fn send(&mut self, command: Command) -> Result<(), ControllerError> {
        let frame = command.encode();
        debug!("device: {} -> {}", command, self.topic);
        trace!("device: frame {}", hex(&frame));

        self.transport.send(&self.topic, &frame, self.qos)?;
        Ok(())
    }
}
