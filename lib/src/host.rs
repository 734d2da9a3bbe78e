//! Capabilities provided by the host operator framework.
//!
//! The library never talks to the host directly: relation interfaces need a
//! [`RelationBus`], and the reconcile pass in [`crate::charm`] needs a full
//! [`Host`]. The host's dispatch loop turns its hooks into [`HookEvent`]s.

use serde_json::{Map, Value};

use crate::error::ImageFetchError;
use crate::pod_spec::{ImageDetails, PodSpec};

/// One established relation, as seen from the local unit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Host-assigned relation id.
    pub id: u32,
    /// Endpoint name from the charm metadata, e.g. `keystone`.
    pub name: String,
    /// The remote application, once known.
    pub app: Option<String>,
    /// Remote units, in host order.
    pub units: Vec<String>,
}

/// Whose data bag to read on a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A single remote unit, e.g. `keystone/0`.
    Unit(String),
    /// The remote application.
    App(String),
}

/// Read and write access to relation data.
pub trait RelationBus {
    /// Whether the local unit is the leader of its application.
    fn is_leader(&self) -> bool;

    /// All relations established on endpoint `name`.
    fn relations(&self, name: &str) -> Vec<Relation>;

    /// The first relation on endpoint `name`, if any.
    fn relation(&self, name: &str) -> Option<Relation> {
        self.relations(name).into_iter().next()
    }

    /// Read `key` from the remote data bag selected by `scope`.
    fn read(&self, relation: &Relation, scope: &Scope, key: &str) -> Option<String>;

    /// Write `key` into the local application's data bag.
    fn write(&mut self, relation: &Relation, key: &str, value: &str) -> anyhow::Result<()>;
}

/// The status reported for the local unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// Work is in progress.
    Maintenance(String),
    /// Human intervention is required.
    Blocked(String),
    /// Waiting on something outside the unit's control.
    Waiting(String),
    /// Operating normally.
    Active(String),
}

impl UnitStatus {
    /// The status message.
    pub fn message(&self) -> &str {
        match self {
            UnitStatus::Maintenance(m)
            | UnitStatus::Blocked(m)
            | UnitStatus::Waiting(m)
            | UnitStatus::Active(m) => m,
        }
    }
}

/// Everything the reconcile pass needs from the host.
pub trait Host: RelationBus {
    /// Current charm configuration.
    fn config(&self) -> Map<String, Value>;

    /// Report the unit status.
    fn set_status(&mut self, status: UnitStatus);

    /// Resolve the OCI image resource named `resource`.
    fn fetch_image(&self, resource: &str) -> Result<ImageDetails, ImageFetchError>;

    /// Hand a pod spec to the host.
    fn set_pod_spec(&mut self, spec: &PodSpec) -> anyhow::Result<()>;

    /// The pod spec recorded by the last successful apply.
    fn last_applied(&self) -> Option<PodSpec>;

    /// Record `spec` as the last successfully applied pod spec.
    fn set_last_applied(&mut self, spec: PodSpec);
}

/// What happened on a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationEventKind {
    /// A remote unit joined.
    Joined,
    /// Remote data changed.
    Changed,
    /// A remote unit left.
    Departed,
    /// The relation is being torn down.
    Broken,
}

/// A relation hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEvent {
    /// What happened.
    pub kind: RelationEventKind,
    /// The relation it happened on.
    pub relation: Relation,
    /// Remote application that triggered the event, if the change is
    /// application scoped.
    pub app: Option<String>,
    /// Remote unit that triggered the event.
    pub unit: Option<String>,
}

/// Hooks the host dispatches to a charm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    /// Charm configuration changed.
    ConfigChanged,
    /// The local unit became leader.
    LeaderElected,
    /// The charm was upgraded.
    UpgradeCharm,
    /// A relation hook.
    Relation(RelationEvent),
}
