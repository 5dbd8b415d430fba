//! VTMS node firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiAdapter   MqttAdapter     GpioOutputs   OneshotAdc        │
//! │  (LinkPort)    (MqttTransport) (PinWriter)   (AnalogInput)     │
//! │  Max6675 on HSPI (SpiDevice)   LogEventSink  MonotonicClock    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              NodeLoop (pure logic)                     │    │
//! │  │  NetworkLink · BrokerSession · TopicRouter · Actuators │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Result, bail};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::config::Config as SpiConfig;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriverConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::{error, info};

use vtms_node::adapters::device_id;
use vtms_node::adapters::hardware::{GpioOutputs, OneshotAdc};
use vtms_node::adapters::log_sink::LogEventSink;
use vtms_node::adapters::mqtt::MqttAdapter;
use vtms_node::adapters::time::MonotonicClock;
use vtms_node::adapters::wifi::WifiAdapter;
use vtms_node::app::node::NodeLoop;
use vtms_node::app::ports::Clock;
use vtms_node::config::{NodeConfig, SensorKind};
use vtms_node::drivers::watchdog::Watchdog;
use vtms_node::pins;
use vtms_node::sensors::analog::AnalogVoltageSensor;
use vtms_node::sensors::thermocouple::Max6675;
use vtms_node::sensors::{SensorChannel, SensorSource};

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  VTMS node v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let mut watchdog = Watchdog::new();

    // ── 2. Configuration (baked in at build time) ─────────────
    let config = NodeConfig::from_build_env().map_err(vtms_node::error::Error::from)?;
    info!(
        "Config: {} actuators, {} sensors, broker {}:{}",
        config.actuators.len(),
        config.sensors.len(),
        config.broker.host,
        config.broker.port
    );

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let wifi = WifiAdapter::new(EspWifi::new(peripherals.modem, sysloop, Some(nvs))?);

    // The MAX6675 sits on HSPI; only one thermocouple per board.
    let pins_io = peripherals.pins;
    let mut hspi = Some((
        peripherals.spi2,
        pins_io.gpio14,
        pins_io.gpio13,
        pins_io.gpio12,
        pins_io.gpio15,
    ));

    let mut sensors = Vec::with_capacity(config.sensors.len());
    for binding in &config.sensors {
        let source: Box<dyn SensorSource> = match binding.kind {
            SensorKind::AnalogVoltage { adc_channel, v_ref, full_scale } => Box::new(
                AnalogVoltageSensor::new(OneshotAdc::new(adc_channel)?, v_ref, full_scale),
            ),
            SensorKind::Thermocouple { unit } => {
                let Some((spi, sclk, sdo, sdi, cs)) = hspi.take() else {
                    bail!("sensor '{}': HSPI already in use", binding.id);
                };
                let device = SpiDeviceDriver::new_single(
                    spi,
                    sclk,
                    sdo,
                    Some(sdi),
                    Some(cs),
                    &SpiDriverConfig::new(),
                    &SpiConfig::new().baudrate(Hertz(pins::THERMO_SPI_BAUD_HZ)),
                )?;
                Box::new(Max6675::new(device, unit))
            }
        };
        info!("Sensor '{}' -> {} every {} ms", binding.id, binding.topic, binding.interval_ms);
        sensors.push(SensorChannel::new(binding, source));
    }

    // ── 4. Node ───────────────────────────────────────────────
    let client_id = device_id::board_client_id(&config.broker.client_id_prefix);
    let loop_yield_ms = config.loop_yield_ms;
    let mut node = NodeLoop::new(
        config,
        client_id,
        wifi,
        MqttAdapter::new(),
        GpioOutputs::new(),
        sensors,
    )?;

    let mut log_sink = LogEventSink::new();
    if let Err(e) = node.start(&mut FreeRtos, &mut watchdog, &mut log_sink) {
        error!("Startup failed: {e}; restarting");
        FreeRtos::delay_ms(1_000);
        esp_idf_hal::reset::restart();
    }

    // ── 5. Steady state ───────────────────────────────────────
    let clock = MonotonicClock::new();
    loop {
        node.iterate(clock.now_ms(), &mut log_sink);
        watchdog.feed();
        FreeRtos::delay_ms(loop_yield_ms);
    }
}
