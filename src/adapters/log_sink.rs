//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing node events to the ESP-IDF logger
//! (UART in production).  Routine traffic goes out at `debug`, so the
//! `lemons/debug` toggle controls how chatty the console is.

use log::{debug, error, info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;
use crate::net::session::PublishOutcome;

/// Adapter that logs every [`NodeEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent<'_>) {
        match event {
            NodeEvent::Started { client_id } => {
                info!("START | client_id={client_id}");
            }
            NodeEvent::StartupFailed(e) => {
                error!("START | failed: {e}");
            }
            NodeEvent::ConnectionChanged { from, to } => {
                info!("STATE | {} -> {}", from.as_str(), to.as_str());
            }
            NodeEvent::ActuatorSet { topic, pin, level, changed } => {
                if *changed {
                    info!("OUT   | {topic} -> GPIO{pin} {level:?}");
                } else {
                    debug!("OUT   | {topic} -> GPIO{pin} {level:?} (unchanged)");
                }
            }
            NodeEvent::MessageLogged { topic, payload } => {
                info!("Message arrived in topic: {topic}");
                info!("Message:{payload}");
            }
            NodeEvent::MessageDropped { topic, reason } => {
                debug!("DROP  | {topic}: {reason}");
            }
            NodeEvent::VerbosityChanged { verbose } => {
                info!("DEBUG | verbose={verbose}");
            }
            NodeEvent::ReadingPublished { sensor, payload, outcome } => match outcome {
                PublishOutcome::Sent => debug!("TELEM | {sensor}={payload}"),
                PublishOutcome::Dropped => debug!("TELEM | {sensor}={payload} (not sent)"),
            },
            NodeEvent::SensorFaulted { sensor, fault } => {
                warn!("FAULT | {sensor}: {fault}");
            }
        }
    }
}
