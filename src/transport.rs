use log::{debug, info, trace, warn};
use rumqttc::{Client, ConnectReturnCode, Connection, Event, MqttOptions, Outgoing, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::MqttConfig;
use crate::error::TransportError;
use crate::protocol::hex;

/// Capacity of the client's outgoing request queue
const REQUEST_CAPACITY: usize = 16;

/// Pause after a connection error before polling again (rumqttc reconnects on poll)
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// How long `connect` waits for the broker's first answer
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can deliver a payload to a destination.
///
/// Sends are fire-and-forget: `Ok` means the payload was handed over, not
/// that the device received it.
pub trait Transport {
    fn connect(&mut self) -> Result<(), TransportError>;

    fn close(&mut self) -> Result<(), TransportError>;

    fn send(&mut self, destination: &str, payload: &[u8], qos: u8) -> Result<(), TransportError>;
}

/// Map the integer delivery-quality marker onto MQTT QoS.
pub fn mqtt_qos(qos: u8) -> Result<QoS, TransportError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(TransportError::InvalidQos(other)),
    }
}

/// MQTT transport with a background event-loop thread
pub struct MqttTransport {
    options: MqttOptions,
    client: Option<Client>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    worker_handle: Option<thread::JoinHandle<()>>,
    connect_timeout: Duration,
}

impl MqttTransport {
    pub fn new(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(config.client_id(), config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keepalive));

        if let Some(username) = config.username.as_deref().filter(|u| !u.is_empty()) {
            options.set_credentials(username, config.password.clone().unwrap_or_default());
        }

        MqttTransport {
            options,
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            worker_handle: None,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Whether the broker has acknowledged the current session
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Get a clone of the connection flag (for observers on other threads)
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }
}

impl Transport for MqttTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.client.is_some() {
            debug!("mqtt: already started");
            return Ok(());
        }

        let (host, port) = self.options.broker_address();
        info!("mqtt: connecting to {}:{}", host, port);

        let (client, connection) = Client::new(self.options.clone(), REQUEST_CAPACITY);
        let (ready_tx, ready_rx) = mpsc::channel();

        self.running.store(true, Ordering::Relaxed);
        let worker_connected = Arc::clone(&self.connected);
        let worker_running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("mqtt-event-loop".to_string())
            .spawn(move || event_loop(connection, worker_connected, worker_running, ready_tx))?;

        self.client = Some(client);
        self.worker_handle = Some(handle);

        // Block until the broker answers, so a dead broker fails here and not silently later
        let outcome = match ready_rx.recv_timeout(self.connect_timeout) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(TransportError::Timeout(self.connect_timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(TransportError::Connection("event loop exited".to_string()))
            }
        };

        if outcome.is_err() {
            self.stop_event_loop();
        }
        outcome
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.running.store(false, Ordering::Relaxed);

        let result = match self.client.take() {
            Some(client) => client.disconnect().map_err(TransportError::from),
            None => Ok(()),
        };

        self.join_worker();
        result
    }

    fn send(&mut self, destination: &str, payload: &[u8], qos: u8) -> Result<(), TransportError> {
        let qos = mqtt_qos(qos)?;
        let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        client.publish(destination, qos, false, payload.to_vec())?;
        Ok(())
    }
}

impl MqttTransport {
    /// Tear down after a failed connect: no DISCONNECT, the session never started.
    fn stop_event_loop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        // Dropping the client closes the request queue, which ends the loop
        self.client = None;
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker_handle.take() {
            if handle.join().is_err() {
                warn!("mqtt: event loop thread panicked");
            }
        }
        self.connected.store(false, Ordering::Relaxed);
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if self.client.is_some() {
            let _ = self.close();
        }
    }
}

/// Worker thread function - drives the MQTT connection and tracks its status.
///
/// The first CONNACK or connection error is reported once through `ready`.
fn event_loop(
    mut connection: Connection,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    ready: Sender<Result<(), TransportError>>,
) {
    let mut ready = Some(ready);
    let mut report = |outcome: Result<(), TransportError>| {
        if let Some(ready) = ready.take() {
            let _ = ready.send(outcome);
        }
    };

    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                let accepted = ack.code == ConnectReturnCode::Success;
                connected.store(accepted, Ordering::Relaxed);
                if accepted {
                    info!("mqtt: connected");
                    report(Ok(()));
                } else {
                    warn!("mqtt: broker refused connection: {:?}", ack.code);
                    report(Err(TransportError::Refused(format!("{:?}", ack.code))));
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.store(false, Ordering::Relaxed);
                debug!("mqtt: disconnected");
                break;
            }
            Ok(event) => trace!("mqtt: {:?}", event),
            Err(e) => {
                connected.store(false, Ordering::Relaxed);
                report(Err(TransportError::Connection(e.to_string())));
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                warn!("mqtt: connection error: {}", e);
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
}

/// Logs every frame instead of delivering it
#[derive(Debug, Default)]
pub struct DryRunTransport {
    frames_sent: u64,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

impl Transport for DryRunTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        info!("dry-run: connect");
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        info!("dry-run: close after {} frame(s)", self.frames_sent);
        Ok(())
    }

    fn send(&mut self, destination: &str, payload: &[u8], qos: u8) -> Result<(), TransportError> {
        mqtt_qos(qos)?;
        info!("dry-run: {} (qos {}) <- {}", destination, qos, hex(payload));
        self.frames_sent += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mqtt_config() -> MqttConfig {
        serde_json::from_str(r#"{ "host": "127.0.0.1", "port": 1, "client_id": "test" }"#).unwrap()
    }

    #[test]
    fn test_qos_mapping() {
        assert_eq!(mqtt_qos(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(mqtt_qos(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(mqtt_qos(2).unwrap(), QoS::ExactlyOnce);
        assert!(matches!(mqtt_qos(3), Err(TransportError::InvalidQos(3))));
    }

    #[test]
    fn test_send_before_connect_fails() {
        let mut transport = MqttTransport::new(&mqtt_config());
        let result = transport.send("dev_sub_x", &[0u8; 4], 0);
        assert!(matches!(result, Err(TransportError::NotConnected)));
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_connect_to_closed_port_fails() {
        // Nothing listens on port 1
        let mut transport = MqttTransport::new(&mqtt_config()).with_connect_timeout(Duration::from_secs(8));
        let result = transport.connect();
        assert!(
            matches!(result, Err(TransportError::Connection(_)) | Err(TransportError::Timeout(_))),
            "unexpected result: {:?}",
            result
        );
        assert!(!transport.is_connected());
        assert!(transport.worker_handle.is_none());
        assert!(matches!(
            transport.send("dev_sub_x", &[0u8; 4], 0),
            Err(TransportError::NotConnected)
        ));
        assert!(transport.close().is_ok());
    }

    #[test]
    fn test_join_survives_panicked_worker() {
        let mut transport = MqttTransport::new(&mqtt_config());
        transport.worker_handle = Some(thread::spawn(|| panic!("event loop died")));
        transport.join_worker();
        assert!(transport.worker_handle.is_none());
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_close_without_connect_is_noop() {
        let mut transport = MqttTransport::new(&mqtt_config());
        assert!(transport.close().is_ok());
    }

    #[test]
    fn test_options_from_config() {
        let transport = MqttTransport::new(&mqtt_config());
        assert_eq!(transport.options.broker_address(), ("127.0.0.1".to_string(), 1));
        assert_eq!(transport.options.client_id(), "test");
        assert_eq!(transport.options.keep_alive(), Duration::from_secs(60));
        assert!(transport.options.credentials().is_none());
    }

    #[test]
    fn test_dry_run_counts_frames() {
        let mut transport = DryRunTransport::new();
        transport.connect().unwrap();
        transport.send("dev_sub_x", &[0xFA, 0x23], 0).unwrap();
        assert!(transport.send("dev_sub_x", &[0xFA, 0x23], 7).is_err());
        transport.close().unwrap();
        assert_eq!(transport.frames_sent(), 1);
    }
}
