//! Transaction log events
//!
//! Defines the structure of individual log records.

use serde::{Deserialize, Serialize};

use crate::error::{KvError, Result};

/// Kind of mutation an event records
///
/// Stored as a small integer in both media. Zero is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventType {
    Put = 1,
    Delete = 2,
}

impl EventType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for EventType {
    type Error = KvError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            1 => Ok(EventType::Put),
            2 => Ok(EventType::Delete),
            other => Err(KvError::InvalidEventType(other)),
        }
    }
}

/// A single entry in the transaction log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned by the backend when persisted; 0 until then
    pub sequence: u64,

    pub event_type: EventType,

    pub key: String,

    /// Empty for deletes
    pub value: String,
}

impl Event {
    /// An unpersisted PUT event
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            event_type: EventType::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// An unpersisted DELETE event
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            event_type: EventType::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Copy of this event carrying the sequence the backend assigned
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.sequence != 0
    }
}
