//! Concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements           | Connects to              |
//! |-------------|----------------------|--------------------------|
//! | `device_id` | (identity)           | eFuse factory MAC        |
//! | `hardware`  | PinWriter            | ESP32 GPIO               |
//! |             | AnalogInput          | ESP32 ADC1 (oneshot)     |
//! | `log_sink`  | EventSink            | Serial log output        |
//! | `mqtt`      | MqttTransport        | ESP-IDF MQTT client      |
//! | `time`      | Clock                | ESP32 system timer       |
//! | `wifi`      | LinkPort             | ESP-IDF WiFi STA         |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
