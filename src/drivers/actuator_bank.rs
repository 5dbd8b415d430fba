//! Topic-bound digital outputs (flag lights, pit and box warnings).
//!
//! Applying a command is split in two: [`ActuatorBank::command_for`] is a
//! pure lookup + payload parse that yields a [`PinCommand`], and
//! [`ActuatorBank::execute`] records the new level and performs the write
//! through a [`PinWriter`].  Routing is therefore testable without hardware.
//!
//! Commands are fire-and-forget: nothing is acknowledged on the bus.
//! Re-applying the same command repeats the hardware write but changes no
//! state.

use serde::{Deserialize, Serialize};

use crate::app::ports::PinWriter;
use crate::config::ActuatorBinding;
use crate::pins::PinId;
use crate::routing::command::decode_bool;

/// Logical output level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for Level {
    fn from(on: bool) -> Self {
        if on { Self::High } else { Self::Low }
    }
}

/// Current state of one bound output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorState {
    pub topic: String,
    pub pin: PinId,
    pub level: Level,
}

/// A resolved write: which entry, which pin, which level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinCommand {
    pub index: usize,
    pub pin: PinId,
    pub level: Level,
}

pub struct ActuatorBank {
    entries: Vec<ActuatorState>,
}

impl ActuatorBank {
    pub fn new(bindings: &[ActuatorBinding]) -> Self {
        let entries = bindings
            .iter()
            .map(|b| ActuatorState {
                topic: b.topic.clone(),
                pin: b.pin,
                level: b.initial,
            })
            .collect();
        Self { entries }
    }

    /// Drive every pin to its configured initial level.
    pub fn init(&self, pins: &mut impl PinWriter) {
        for e in &self.entries {
            pins.configure_output(e.pin);
            pins.write(e.pin, e.level);
        }
    }

    pub fn entries(&self) -> &[ActuatorState] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, topic: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.topic == topic)
    }

    pub fn level(&self, topic: &str) -> Option<Level> {
        self.index_of(topic).map(|i| self.entries[i].level)
    }

    /// Pure step: the write a `(topic, payload)` pair asks for, if any.
    ///
    /// `None` when the topic is not bound or the payload is not exactly
    /// `true` / `false`.
    pub fn command_for(&self, topic: &str, payload: &[u8]) -> Option<PinCommand> {
        let index = self.index_of(topic)?;
        self.command_at(index, payload)
    }

    /// Same as [`command_for`](Self::command_for) for an already-routed entry.
    pub fn command_at(&self, index: usize, payload: &[u8]) -> Option<PinCommand> {
        let entry = self.entries.get(index)?;
        let on = decode_bool(payload)?;
        Some(PinCommand {
            index,
            pin: entry.pin,
            level: Level::from(on),
        })
    }

    /// Hardware step: record the level and write the pin.
    ///
    /// Returns `true` when the logical level changed.
    pub fn execute(&mut self, cmd: PinCommand, pins: &mut impl PinWriter) -> bool {
        let Some(entry) = self.entries.get_mut(cmd.index) else {
            return false;
        };
        let changed = entry.level != cmd.level;
        entry.level = cmd.level;
        pins.write(cmd.pin, cmd.level);
        changed
    }

    /// Apply a boolean command to the output bound to `topic`.
    ///
    /// Returns the resulting level, or `None` if no output is bound.
    pub fn apply(&mut self, topic: &str, command: bool, pins: &mut impl PinWriter) -> Option<Level> {
        let index = self.index_of(topic)?;
        let cmd = PinCommand {
            index,
            pin: self.entries[index].pin,
            level: Level::from(command),
        };
        self.execute(cmd, pins);
        Some(cmd.level)
    }
}
