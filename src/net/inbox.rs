//! Bounded hand-off from the MQTT client task to the control loop.
//!
//! The ESP-IDF MQTT client delivers events on its own task.  Its callback
//! only pushes into this channel; [`BrokerSession::poll`] drains it on the
//! control loop, so routing and GPIO writes never run on the client task.
//!
//! ```text
//! ┌──────────────┐  TransportEvent  ┌──────────────┐
//! │  MQTT task   │─────────────────▶│ Control loop │
//! │  (callback)  │    try_send      │  (poll)      │
//! └──────────────┘                  └──────────────┘
//! ```
//!
//! [`BrokerSession::poll`]: super::session::BrokerSession::poll

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use super::TransportEvent;

/// Events buffered between two polls.
pub const INBOX_DEPTH: usize = 16;

pub struct Inbox {
    channel: Channel<CriticalSectionRawMutex, TransportEvent, INBOX_DEPTH>,
    dropped: AtomicU32,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue without blocking.  Returns `false` (and counts the drop) when full.
    pub fn push(&self, event: TransportEvent) -> bool {
        if self.channel.try_send(event).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn pop(&self) -> Option<TransportEvent> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Events lost to a full channel since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
