//! Protocol-independent relation client and server.

use anyhow::{ensure, Result};

use crate::host::{Relation, RelationBus, RelationEvent, RelationEventKind, Scope};

/// Where a client looks for the fields of a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Each remote unit publishes its own copy; the first non-empty value
    /// across the remote units (in host order) wins.
    UnitScoped,
    /// The remote application's leader publishes one shared copy.
    AppScoped,
}

/// The shape of a relation interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationProtocol {
    /// Interface name, e.g. `keystone`.
    pub interface: &'static str,
    /// Fields that must all be present for the data to be usable.
    pub mandatory_fields: &'static [&'static str],
    /// Where the fields are read from.
    pub resolution: Resolution,
}

/// The requiring side of a relation: reads what the remote side published.
#[derive(Debug, Clone)]
pub struct RelationClient {
    relation_name: String,
    protocol: &'static RelationProtocol,
}

impl RelationClient {
    /// A client for endpoint `relation_name` speaking `protocol`.
    pub fn new(relation_name: impl Into<String>, protocol: &'static RelationProtocol) -> Self {
        Self {
            relation_name: relation_name.into(),
            protocol,
        }
    }

    /// The relation endpoint name.
    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    /// The protocol spoken.
    pub fn protocol(&self) -> &'static RelationProtocol {
        self.protocol
    }

    /// The relation this client reads from, if established.
    pub fn relation<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<Relation> {
        bus.relation(&self.relation_name)
    }

    /// Look up `key` according to the protocol's [`Resolution`]. Empty
    /// values are treated as absent.
    pub fn get<B: RelationBus + ?Sized>(&self, bus: &B, key: &str) -> Option<String> {
        let relation = self.relation(bus)?;
        let nonempty = |v: &String| !v.is_empty();
        match self.protocol.resolution {
            Resolution::UnitScoped => relation.units.iter().find_map(|unit| {
                bus.read(&relation, &Scope::Unit(unit.clone()), key)
                    .filter(nonempty)
            }),
            Resolution::AppScoped => {
                let app = relation.app.clone()?;
                bus.read(&relation, &Scope::App(app), key).filter(nonempty)
            }
        }
    }

    /// Mandatory fields which are currently absent.
    pub fn missing_fields<B: RelationBus + ?Sized>(&self, bus: &B) -> Vec<&'static str> {
        self.protocol
            .mandatory_fields
            .iter()
            .copied()
            .filter(|field| self.get(bus, field).is_none())
            .collect()
    }

    /// Whether any mandatory field is currently absent.
    pub fn is_missing_data<B: RelationBus + ?Sized>(&self, bus: &B) -> bool {
        let missing = self.missing_fields(bus);
        if !missing.is_empty() {
            tracing::debug!(
                "Relation {} is missing fields: {}",
                self.relation_name,
                missing.join(", ")
            );
        }
        !missing.is_empty()
    }

    /// Whether `event` changes what this client would read.
    ///
    /// Broken relations always count. For app scoped protocols, changes
    /// originating from a remote unit's data bag are ignored, since they
    /// cannot affect the application's data.
    pub fn should_signal(&self, event: &RelationEvent) -> bool {
        if event.relation.name != self.relation_name {
            return false;
        }
        match (event.kind, self.protocol.resolution) {
            (RelationEventKind::Broken, _) => true,
            (RelationEventKind::Changed, Resolution::AppScoped) => event.app.is_some(),
            (RelationEventKind::Changed | RelationEventKind::Departed, Resolution::UnitScoped) => {
                true
            }
            _ => false,
        }
    }
}

/// The providing side of a relation: publishes application data.
#[derive(Debug, Clone)]
pub struct RelationServer {
    relation_name: String,
    protocol: &'static RelationProtocol,
}

impl RelationServer {
    /// A server for endpoint `relation_name` speaking `protocol`.
    pub fn new(relation_name: impl Into<String>, protocol: &'static RelationProtocol) -> Self {
        Self {
            relation_name: relation_name.into(),
            protocol,
        }
    }

    /// The relation endpoint name.
    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    /// Write `fields` into the local application data of every relation on
    /// this endpoint.
    ///
    /// Only the leader may write application data; on other units this does
    /// nothing and returns `false`.
    pub fn publish<B: RelationBus + ?Sized>(
        &self,
        bus: &mut B,
        fields: &[(&str, String)],
    ) -> Result<bool> {
        for mandatory in self.protocol.mandatory_fields {
            ensure!(
                fields.iter().any(|(k, _)| k == mandatory),
                "Missing field {mandatory} for {} interface",
                self.protocol.interface
            );
        }
        if !bus.is_leader() {
            tracing::debug!("Not leader; skipping publish on {}", self.relation_name);
            return Ok(false);
        }
        for relation in bus.relations(&self.relation_name) {
            tracing::debug!(
                "Publishing {} fields on {}:{}",
                fields.len(),
                relation.name,
                relation.id
            );
            for (key, value) in fields {
                bus.write(&relation, key, value)?;
            }
        }
        Ok(true)
    }
}
