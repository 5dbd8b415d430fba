//! Node configuration.
//!
//! Every credential, topic, pin, and timing parameter of a node lives in one
//! immutable [`NodeConfig`], built once at startup and passed by reference
//! into the components.  Values are fixed at build time: a per-variant preset
//! selected by `VTMS_NODE_VARIANT`, individual `VTMS_*` overrides, or a full
//! JSON document in `VTMS_NODE_CONFIG`.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::drivers::actuator_bank::Level;
use crate::error::ConfigError;
use crate::net::identity;
use crate::pins::{self, PinId};
use crate::routing::{TopicPattern, filter_covers};

/// Topic namespace shared by the pit crew dashboard and the OBD2 client.
pub const NAMESPACE: &str = "lemons";

// ───────────────────────────────────────────────────────────────
// Sections
// ───────────────────────────────────────────────────────────────

/// Station-mode WiFi credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: String,
    /// Empty for an open network.
    #[serde(default)]
    pub passphrase: String,
}

/// Broker endpoint and session parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Client identity is this prefix followed by the node's MAC.
    pub client_id_prefix: String,
    pub keep_alive_secs: u16,
}

/// What the router does with a message on a subscribed pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    /// Log topic and payload.
    Log,
    /// `true` / `false` switches verbose logging.
    Debug,
}

/// One router entry, optionally backed by a broker subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub pattern: String,
    pub handler: HandlerKind,
    /// `false` for router-only entries already covered by a wider filter.
    #[serde(default = "default_true")]
    pub subscribe: bool,
}

fn default_true() -> bool {
    true
}

/// A boolean-commanded output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorBinding {
    pub pin: PinId,
    pub topic: String,
    #[serde(default)]
    pub initial: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempUnit {
    Celsius,
    Fahrenheit,
}

/// Sensor hardware variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorKind {
    /// Linear 0..`v_ref` voltage on an ADC1 channel.
    AnalogVoltage {
        adc_channel: u32,
        v_ref: f32,
        /// Number of ADC counts spanning `v_ref` (4096 for 12-bit).
        full_scale: u16,
    },
    /// MAX6675 K-type thermocouple converter.
    Thermocouple { unit: TempUnit },
}

/// A sampled sensor and the topic its readings go to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorBinding {
    pub id: String,
    pub kind: SensorKind,
    pub topic: String,
    pub interval_ms: u32,
}

/// Retry spacing and budget for a blocking startup stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub delay_ms: u32,
    /// `None` retries until the startup hook aborts.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// `true` once `attempts` failed attempts use up the budget.
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

// ───────────────────────────────────────────────────────────────
// Node variants
// ───────────────────────────────────────────────────────────────

/// Board presets, one per deployed sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeVariant {
    /// Four flag/pit/box outputs, no sensors.
    Flags,
    /// Transmission temperature sender on the ADC.
    Analog,
    /// Oil temperature thermocouple.
    Thermo,
}

impl FromStr for NodeVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flags" | "led" => Ok(Self::Flags),
            "analog" | "temp" => Ok(Self::Analog),
            "thermo" | "thermoprobe" => Ok(Self::Thermo),
            _ => Err(ConfigError::UnknownVariant),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// NodeConfig
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub wifi: WifiCredentials,
    pub broker: BrokerConfig,
    /// Hello and catch-all topic.
    pub root_topic: String,
    /// Published once to `root_topic` after the first handshake.
    #[serde(default)]
    pub hello: Option<String>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub actuators: Vec<ActuatorBinding>,
    #[serde(default)]
    pub sensors: Vec<SensorBinding>,
    pub link_retry: RetryPolicy,
    pub broker_retry: RetryPolicy,
    /// Sleep at the end of every loop iteration.
    pub loop_yield_ms: u32,
    /// Publish sensor faults on `<topic>/fault`.
    #[serde(default = "default_true")]
    pub publish_faults: bool,
}

/// Build-time overrides for a preset.  `None` keeps the preset value.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides<'a> {
    pub ssid: Option<&'a str>,
    pub passphrase: Option<&'a str>,
    pub broker_host: Option<&'a str>,
    pub broker_port: Option<&'a str>,
    pub broker_user: Option<&'a str>,
    pub broker_pass: Option<&'a str>,
}

impl NodeConfig {
    /// Configuration for one of the deployed boards.
    pub fn preset(variant: NodeVariant) -> Self {
        let root_topic = String::from("emqx/esp32");
        let base = Self {
            wifi: WifiCredentials {
                ssid: String::from("vtms"),
                passphrase: String::from("vtms-pitlane"),
            },
            broker: BrokerConfig {
                host: String::from("192.168.50.24"),
                port: 1883,
                username: None,
                password: None,
                client_id_prefix: String::from("esp32-client-"),
                keep_alive_secs: 60,
            },
            subscriptions: vec![Subscription {
                pattern: root_topic.clone(),
                handler: HandlerKind::Log,
                subscribe: true,
            }],
            root_topic,
            hello: Some(String::from("Hi, I'm VTMS MQTT Sensor")),
            actuators: Vec::new(),
            sensors: Vec::new(),
            link_retry: RetryPolicy {
                delay_ms: 500,
                max_attempts: Some(120),
            },
            broker_retry: RetryPolicy {
                delay_ms: 2_000,
                max_attempts: Some(30),
            },
            loop_yield_ms: 10,
            publish_faults: true,
        };

        match variant {
            NodeVariant::Flags => {
                let mut cfg = base;
                cfg.hello = Some(String::from("Hi, I'm VTMS LED Controller"));
                cfg.subscriptions.push(Subscription {
                    pattern: format!("{NAMESPACE}/#"),
                    handler: HandlerKind::Log,
                    subscribe: true,
                });
                cfg.subscriptions.push(Subscription {
                    pattern: format!("{NAMESPACE}/debug"),
                    handler: HandlerKind::Debug,
                    subscribe: false,
                });
                cfg.actuators = vec![
                    actuator(pins::BLACK_FLAG_GPIO, "flag/black"),
                    actuator(pins::RED_FLAG_GPIO, "flag/red"),
                    actuator(pins::PIT_SOON_GPIO, "pit"),
                    actuator(pins::BOX_BOX_GPIO, "box"),
                ];
                cfg
            }
            NodeVariant::Analog => {
                let mut cfg = base;
                cfg.sensors.push(SensorBinding {
                    id: String::from("transmission"),
                    kind: SensorKind::AnalogVoltage {
                        adc_channel: pins::SENSOR_ADC1_CHANNEL,
                        v_ref: 3.3,
                        full_scale: 4096,
                    },
                    topic: format!("{NAMESPACE}/temp/transmission"),
                    interval_ms: 500,
                });
                cfg
            }
            NodeVariant::Thermo => {
                let mut cfg = base;
                cfg.link_retry.delay_ms = 1_000;
                cfg.link_retry.max_attempts = Some(60);
                cfg.broker_retry.delay_ms = 3_000;
                cfg.broker_retry.max_attempts = Some(20);
                cfg.sensors.push(SensorBinding {
                    id: String::from("oil_F"),
                    kind: SensorKind::Thermocouple {
                        unit: TempUnit::Fahrenheit,
                    },
                    topic: format!("{NAMESPACE}/temp/oil_F"),
                    interval_ms: 500,
                });
                cfg
            }
        }
    }

    /// Parse a complete configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|_| ConfigError::Parse)
    }

    /// Configuration baked in at build time, validated.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        let cfg = if let Some(json) = option_env!("VTMS_NODE_CONFIG") {
            Self::from_json(json)?
        } else {
            let variant: NodeVariant = option_env!("VTMS_NODE_VARIANT")
                .unwrap_or("flags")
                .parse()?;
            let mut cfg = Self::preset(variant);
            cfg.apply_overrides(&Overrides {
                ssid: option_env!("VTMS_WIFI_SSID"),
                passphrase: option_env!("VTMS_WIFI_PASS"),
                broker_host: option_env!("VTMS_BROKER_HOST"),
                broker_port: option_env!("VTMS_BROKER_PORT"),
                broker_user: option_env!("VTMS_BROKER_USER"),
                broker_pass: option_env!("VTMS_BROKER_PASS"),
            })?;
            cfg
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_overrides(&mut self, o: &Overrides<'_>) -> Result<(), ConfigError> {
        if let Some(ssid) = o.ssid {
            self.wifi.ssid = ssid.into();
        }
        if let Some(pass) = o.passphrase {
            self.wifi.passphrase = pass.into();
        }
        if let Some(host) = o.broker_host {
            self.broker.host = host.into();
        }
        if let Some(port) = o.broker_port {
            self.broker.port = port.parse().map_err(|_| ConfigError::InvalidBroker)?;
        }
        if let Some(user) = o.broker_user {
            self.broker.username = Some(user.into()).filter(|u: &String| !u.is_empty());
        }
        if let Some(pass) = o.broker_pass {
            self.broker.password = Some(pass.into()).filter(|p: &String| !p.is_empty());
        }
        Ok(())
    }

    /// Reject values the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ssid(&self.wifi.ssid)?;
        validate_passphrase(&self.wifi.passphrase)?;

        if self.broker.host.is_empty()
            || self.broker.port == 0
            || self.broker.client_id_prefix.len() > identity::MAX_PREFIX_LEN
        {
            return Err(ConfigError::InvalidBroker);
        }

        validate_topic(&self.root_topic)?;
        for sub in &self.subscriptions {
            TopicPattern::parse(&sub.pattern).map_err(|_| ConfigError::InvalidPattern)?;
        }

        for (i, a) in self.actuators.iter().enumerate() {
            validate_topic(&a.topic)?;
            if self.actuators[..i].iter().any(|b| b.pin == a.pin) {
                return Err(ConfigError::DuplicatePin(a.pin));
            }
            if self.actuators[..i].iter().any(|b| b.topic == a.topic) {
                return Err(ConfigError::DuplicateTopic);
            }
        }

        // Anything routed must reach the node through some SUBSCRIBE.
        let routed = self
            .actuators
            .iter()
            .map(|a| a.topic.as_str())
            .chain(
                self.subscriptions
                    .iter()
                    .filter(|s| !s.subscribe)
                    .map(|s| s.pattern.as_str()),
            );
        for topic in routed {
            if !self.broker_subscriptions().any(|f| filter_covers(f, topic)) {
                return Err(ConfigError::UnsubscribedTopic);
            }
        }

        for s in &self.sensors {
            validate_topic(&s.topic)?;
            if s.interval_ms == 0 {
                return Err(ConfigError::InvalidInterval);
            }
        }
        Ok(())
    }

    /// Patterns to SUBSCRIBE to, in configuration order.
    pub fn broker_subscriptions(&self) -> impl Iterator<Item = &str> {
        self.subscriptions
            .iter()
            .filter(|s| s.subscribe)
            .map(|s| s.pattern.as_str())
    }
}

fn actuator(pin: PinId, leaf: &str) -> ActuatorBinding {
    ActuatorBinding {
        pin,
        topic: format!("{NAMESPACE}/{leaf}"),
        initial: Level::Low,
    }
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConfigError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConfigError::InvalidSsid);
    }
    Ok(())
}

fn validate_passphrase(passphrase: &str) -> Result<(), ConfigError> {
    if passphrase.is_empty() {
        return Ok(());
    }
    if passphrase.len() < 8 || passphrase.len() > 64 {
        return Err(ConfigError::InvalidPassphrase);
    }
    Ok(())
}

/// Publish topics and actuator topics must be concrete names.
fn validate_topic(topic: &str) -> Result<(), ConfigError> {
    match TopicPattern::parse(topic) {
        Ok(TopicPattern::Exact(_)) => Ok(()),
        _ => Err(ConfigError::InvalidPattern),
    }
}
