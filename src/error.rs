use thiserror::Error;

/// Failure to resolve a color-like input into RGB channels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("unrecognised color {0:?}")]
    Unrecognized(String),
    #[error("malformed color function {0:?}")]
    Malformed(String),
    #[error("channel value {0} outside 0..=255")]
    ChannelOutOfRange(i64),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,
    #[error("Broker refused connection: {0}")]
    Refused(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("No answer from broker within {0:?}")]
    Timeout(std::time::Duration),
    #[error("Invalid QoS level {0} (expected 0, 1 or 2)")]
    InvalidQos(u8),
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Send failed: {0}")]
    Send(String),
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Invalid color: {input}")]
    InvalidColor {
        input: String,
        #[source]
        source: ColorError,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
}
