//! The `kafka` interface.
//!
//! Kafka units each publish their own address, so this interface is unit
//! scoped: the first unit that published wins.

use super::common::{RelationClient, RelationProtocol, Resolution};
use crate::host::RelationBus;

/// Broker address, published by each kafka unit.
pub static KAFKA: RelationProtocol = RelationProtocol {
    interface: "kafka",
    mandatory_fields: &["host", "port"],
    resolution: Resolution::UnitScoped,
};

/// Requires side of the kafka interface.
#[derive(Debug, Clone)]
pub struct KafkaClient(RelationClient);

impl KafkaClient {
    /// Speak kafka on endpoint `relation_name`.
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self(RelationClient::new(relation_name, &KAFKA))
    }

    /// The underlying generic client.
    pub fn client(&self) -> &RelationClient {
        &self.0
    }

    /// The `host` field.
    pub fn host<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "host")
    }

    /// The raw `port` field.
    pub fn port<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "port")
    }

    /// Whether `host` or `port` is still unpublished.
    pub fn is_missing_data<B: RelationBus + ?Sized>(&self, bus: &B) -> bool {
        self.0.is_missing_data(bus)
    }
}
