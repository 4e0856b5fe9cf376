//! Client-side controller for Techlife LED strips.
//!
//! Operations on a [`DeviceController`] update the locally held device state and
//! publish one fixed-size binary frame per change through a [`Transport`].

pub mod color;
pub mod config;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod transport;

pub use color::{ColorInput, ColorResolver, CssColorResolver, Rgb};
pub use config::{Config, DeviceConfig, MqttConfig};
pub use controller::{DeviceController, DeviceState};
pub use error::{ColorError, ControllerError, TransportError};
pub use protocol::{Command, Frame, FRAME_LEN};
pub use transport::{DryRunTransport, MqttTransport, Transport};
