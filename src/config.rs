use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Generated from the process id when absent
    pub client_id: Option<String>,
    /// Keepalive interval in seconds
    #[serde(default = "default_keepalive")]
    pub keepalive: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Device identifier as printed on the bulb / strip controller
    pub mac: String,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    /// Delivery-quality marker handed to the transport (0, 1 or 2)
    #[serde(default)]
    pub qos: u8,
}

impl Config {
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}

impl MqttConfig {
    pub fn client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("techlife-{}", std::process::id()))
    }
}

impl DeviceConfig {
    /// Destination address: prefix followed by the device identifier
    pub fn topic(&self) -> String {
        format!("{}{}", self.topic_prefix, self.mac)
    }
}

fn default_port() -> u16 {
    1883
}

fn default_keepalive() -> u64 {
    60
}

fn default_topic_prefix() -> String {
    "dev_sub_".to_string()
}
