//! Network side of the node: WiFi association, broker session, and the
//! inbound message types that flow between the transport and the router.

pub mod identity;
pub mod inbox;
pub mod link;
pub mod session;

use crate::error::DropReason;
use crate::routing::MAX_TOPIC_LEN;

/// Largest inbound payload kept; longer messages are dropped.
pub const MAX_PAYLOAD_LEN: usize = 256;

pub type TopicBuf = heapless::String<MAX_TOPIC_LEN>;
pub type PayloadBuf = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

/// One inbound delivery.  Lives only until the router has handled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: TopicBuf,
    pub payload: PayloadBuf,
}

impl Message {
    pub fn new(topic: &str, payload: &[u8]) -> Result<Self, DropReason> {
        let mut t = TopicBuf::new();
        t.push_str(topic).map_err(|_| DropReason::Oversized)?;
        let payload = PayloadBuf::from_slice(payload).map_err(|_| DropReason::Oversized)?;
        Ok(Self { topic: t, payload })
    }

    /// Payload as text for logging.
    pub fn payload_str(&self) -> &str {
        core::str::from_utf8(&self.payload).unwrap_or("<binary>")
    }
}

/// What a transport hands to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(Message),
    /// The broker connection dropped.
    Disconnected,
}
