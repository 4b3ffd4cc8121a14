//! Node configuration.

use crate::transport::Delivery;
use crate::transport::Priority;
use crate::transport::Reliability;
use crate::types::ServiceId;
use crate::types::SlotId;

/// Outer byte that marks this protocol's packets for the transport demux.
pub const DEFAULT_TAG: u8 = 0x86;

/// Ids below this are reserved.
pub const FIRST_SERVICE_ID: ServiceId = 2;

pub const FIRST_SLOT_ID: SlotId = 42;

/// Tunables for a [`Node`](crate::Node).
///
/// ```
/// use svcrpc::{Config, Reliability};
///
/// let config = Config::new()
///     .with_tag(0x90)
///     .with_channel(3)
///     .with_reliability(Reliability::Reliable);
/// assert_eq!(config.delivery().channel, 3);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub tag: u8,
    pub channel: u8,
    pub reliability: Reliability,
    pub priority: Priority,
    pub first_service_id: ServiceId,
    pub first_slot_id: SlotId,
}

impl Config {
    pub fn new() -> Self {
        Self {
            tag: DEFAULT_TAG,
            channel: 0,
            reliability: Reliability::ReliableOrdered,
            priority: Priority::High,
            first_service_id: FIRST_SERVICE_ID,
            first_slot_id: FIRST_SLOT_ID,
        }
    }

    pub fn with_tag(mut self, tag: u8) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_reliability(mut self, reliability: Reliability) -> Self {
        self.reliability = reliability;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the first id handed out to a local service. Must stay above the
    /// reserved range.
    pub fn with_first_service_id(mut self, id: ServiceId) -> Self {
        self.first_service_id = id.max(FIRST_SERVICE_ID);
        self
    }

    pub fn with_first_slot_id(mut self, id: SlotId) -> Self {
        self.first_slot_id = id;
        self
    }

    /// The delivery hints attached to every outbound message.
    pub fn delivery(&self) -> Delivery {
        Delivery {
            reliability: self.reliability,
            priority: self.priority,
            channel: self.channel,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
