//! An in-memory [`Host`], for exercising charms without a host framework.
//!
//! Relation data, leadership, configuration and the image resource are set
//! directly; statuses and applied pod specs are recorded for inspection.
//! Mutators taking a relation id panic if no such relation exists.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ImageFetchError;
use crate::host::{Host, Relation, RelationBus, Scope, UnitStatus};
use crate::pod_spec::{ImageDetails, PodSpec};

type DataBag = BTreeMap<String, String>;

#[derive(Debug, Default)]
struct RelationRecord {
    relation: Relation,
    local_app: DataBag,
    remote_app: DataBag,
    remote_units: BTreeMap<String, DataBag>,
}

/// An in-memory host. The local unit starts as a follower with no image.
#[derive(Debug, Default)]
pub struct MemoryHost {
    leader: bool,
    config: Map<String, Value>,
    image: Option<ImageDetails>,
    relations: Vec<RelationRecord>,
    next_relation_id: u32,
    statuses: Vec<UnitStatus>,
    applied: Vec<PodSpec>,
    last_applied: Option<PodSpec>,
    apply_error: Option<String>,
}

fn update_bag<I, K, V>(bag: &mut DataBag, data: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    bag.extend(data.into_iter().map(|(k, v)| (k.into(), v.into())));
}

impl MemoryHost {
    /// A follower with no relations, config or image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the local unit the leader, or a follower.
    pub fn set_leader(&mut self, leader: bool) {
        self.leader = leader;
    }

    /// Replace the whole charm configuration.
    pub fn set_config(&mut self, config: Map<String, Value>) {
        self.config = config;
    }

    /// Merge `values` into the charm configuration.
    pub fn update_config<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.config
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Set the image resource; `None` makes fetching fail.
    pub fn set_image(&mut self, image: Option<ImageDetails>) {
        self.image = image;
    }

    /// Make the next pod spec applies fail with `error`.
    pub fn set_apply_error(&mut self, error: Option<&str>) {
        self.apply_error = error.map(ToOwned::to_owned);
    }

    /// Establish a relation on endpoint `name` with `remote_app`, returning its id.
    pub fn add_relation(&mut self, name: &str, remote_app: &str) -> u32 {
        let id = self.next_relation_id;
        self.next_relation_id += 1;
        self.relations.push(RelationRecord {
            relation: Relation {
                id,
                name: name.to_owned(),
                app: Some(remote_app.to_owned()),
                units: Vec::new(),
            },
            ..Default::default()
        });
        id
    }

    /// Tear down a relation and all its data.
    pub fn remove_relation(&mut self, id: u32) {
        self.relations.retain(|r| r.relation.id != id);
    }

    fn record(&self, id: u32) -> Option<&RelationRecord> {
        self.relations.iter().find(|r| r.relation.id == id)
    }

    fn record_mut(&mut self, id: u32) -> &mut RelationRecord {
        self.relations
            .iter_mut()
            .find(|r| r.relation.id == id)
            .unwrap_or_else(|| panic!("No relation with id {id}"))
    }

    /// Add remote `unit` to relation `id`, with an empty data bag.
    pub fn add_relation_unit(&mut self, id: u32, unit: &str) {
        let record = self.record_mut(id);
        record.relation.units.push(unit.to_owned());
        record.remote_units.entry(unit.to_owned()).or_default();
    }

    /// Remove remote `unit` and its data from relation `id`.
    pub fn remove_relation_unit(&mut self, id: u32, unit: &str) {
        let record = self.record_mut(id);
        record.relation.units.retain(|u| u != unit);
        record.remote_units.remove(unit);
    }

    /// Merge `data` into the data bag of remote unit `unit`.
    pub fn update_unit_data<I, K, V>(&mut self, id: u32, unit: &str, data: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let record = self.record_mut(id);
        if !record.relation.units.iter().any(|u| u == unit) {
            record.relation.units.push(unit.to_owned());
        }
        update_bag(record.remote_units.entry(unit.to_owned()).or_default(), data);
    }

    /// Merge `data` into the remote application's data bag.
    pub fn update_app_data<I, K, V>(&mut self, id: u32, data: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        update_bag(&mut self.record_mut(id).remote_app, data);
    }

    /// What the local application published on relation `id`.
    pub fn local_app_data(&self, id: u32) -> DataBag {
        self.record(id)
            .map(|r| r.local_app.clone())
            .unwrap_or_default()
    }

    /// Every status set so far, oldest first.
    pub fn statuses(&self) -> &[UnitStatus] {
        &self.statuses
    }

    /// The most recent status.
    pub fn status(&self) -> Option<&UnitStatus> {
        self.statuses.last()
    }

    /// Every pod spec handed to [`Host::set_pod_spec`], oldest first.
    pub fn applied_specs(&self) -> &[PodSpec] {
        &self.applied
    }
}

impl RelationBus for MemoryHost {
    fn is_leader(&self) -> bool {
        self.leader
    }

    fn relations(&self, name: &str) -> Vec<Relation> {
        self.relations
            .iter()
            .filter(|r| r.relation.name == name)
            .map(|r| r.relation.clone())
            .collect()
    }

    fn read(&self, relation: &Relation, scope: &Scope, key: &str) -> Option<String> {
        let record = self.record(relation.id)?;
        let bag = match scope {
            Scope::Unit(unit) => record.remote_units.get(unit)?,
            Scope::App(app) if record.relation.app.as_ref() == Some(app) => &record.remote_app,
            Scope::App(_) => return None,
        };
        bag.get(key).cloned()
    }

    fn write(&mut self, relation: &Relation, key: &str, value: &str) -> anyhow::Result<()> {
        let Some(record) = self.relations.iter_mut().find(|r| r.relation.id == relation.id) else {
            anyhow::bail!("Relation {}:{} is gone", relation.name, relation.id);
        };
        record.local_app.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

impl Host for MemoryHost {
    fn config(&self) -> Map<String, Value> {
        self.config.clone()
    }

    fn set_status(&mut self, status: UnitStatus) {
        self.statuses.push(status);
    }

    fn fetch_image(&self, resource: &str) -> Result<ImageDetails, ImageFetchError> {
        self.image
            .clone()
            .ok_or_else(|| ImageFetchError::new(resource, "resource not attached"))
    }

    fn set_pod_spec(&mut self, spec: &PodSpec) -> anyhow::Result<()> {
        if let Some(e) = self.apply_error.as_deref() {
            anyhow::bail!("{e}");
        }
        self.applied.push(spec.clone());
        Ok(())
    }

    fn last_applied(&self) -> Option<PodSpec> {
        self.last_applied.clone()
    }

    fn set_last_applied(&mut self, spec: PodSpec) {
        self.last_applied = Some(spec);
    }
}
