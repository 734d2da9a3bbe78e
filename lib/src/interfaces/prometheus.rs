//! The `prometheus` interface: where to scrape or query a Prometheus server.

use anyhow::Result;

use super::common::{RelationClient, RelationProtocol, RelationServer, Resolution};
use crate::error::Error;
use crate::host::{RelationBus, RelationEvent};

/// Port assumed when the server did not publish one.
pub const DEFAULT_PORT: u16 = 9091;

/// Server address, published by the prometheus application leader.
pub static PROMETHEUS: RelationProtocol = RelationProtocol {
    interface: "prometheus",
    mandatory_fields: &["hostname", "port"],
    resolution: Resolution::AppScoped,
};

/// Provides side of the prometheus interface.
#[derive(Debug, Clone)]
pub struct PrometheusServer(RelationServer);

impl PrometheusServer {
    /// Speak prometheus on endpoint `relation_name`.
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self(RelationServer::new(relation_name, &PROMETHEUS))
    }

    /// Publish `hostname` and `port` on every prometheus relation, if leader.
    pub fn publish_info<B: RelationBus + ?Sized>(
        &self,
        bus: &mut B,
        hostname: &str,
        port: u16,
    ) -> Result<bool> {
        let fields = [
            ("hostname", hostname.to_owned()),
            ("port", port.to_string()),
        ];
        self.0.publish(bus, &fields)
    }
}

/// Requires side of the prometheus interface.
#[derive(Debug, Clone)]
pub struct PrometheusClient(RelationClient);

impl PrometheusClient {
    /// Speak prometheus on endpoint `relation_name`.
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self(RelationClient::new(relation_name, &PROMETHEUS))
    }

    /// The underlying generic client.
    pub fn client(&self) -> &RelationClient {
        &self.0
    }

    /// The `hostname` field.
    pub fn hostname<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "hostname")
    }

    /// The published port, or [`DEFAULT_PORT`] if none was published.
    pub fn port<B: RelationBus + ?Sized>(&self, bus: &B) -> crate::Result<u16> {
        let Some(port) = self.0.get(bus, "port") else {
            return Ok(DEFAULT_PORT);
        };
        port.parse().map_err(|_| Error::InvalidRelationData {
            relation: self.0.relation_name().to_owned(),
            field: "port".into(),
            value: port,
        })
    }

    /// Whether `hostname` or `port` is still unpublished.
    pub fn is_missing_data<B: RelationBus + ?Sized>(&self, bus: &B) -> bool {
        self.0.is_missing_data(bus)
    }

    /// Whether `event` is a change the charm should react to.
    pub fn changed(&self, event: &RelationEvent) -> bool {
        self.0.should_signal(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::MemoryHost;
    use crate::host::RelationEventKind;

    #[test]
    fn test_client_defaults() {
        let mut host = MemoryHost::new();
        let client = PrometheusClient::new("prometheus");
        assert_eq!(client.hostname(&host), None);
        assert_eq!(client.port(&host).unwrap(), DEFAULT_PORT);

        let id = host.add_relation("prometheus", "prometheus");
        host.update_app_data(id, [("hostname", "prometheus-k8s")]);
        assert_eq!(client.hostname(&host).as_deref(), Some("prometheus-k8s"));
        assert_eq!(client.port(&host).unwrap(), DEFAULT_PORT);
        assert!(client.is_missing_data(&host));

        host.update_app_data(id, [("port", "9090")]);
        assert_eq!(client.port(&host).unwrap(), 9090);
        assert!(!client.is_missing_data(&host));

        host.update_app_data(id, [("port", "ninety")]);
        assert!(client.port(&host).is_err());
    }

    #[test]
    fn test_server_publish() {
        let mut host = MemoryHost::new();
        let id = host.add_relation("prometheus", "grafana");
        host.set_leader(true);
        let server = PrometheusServer::new("prometheus");
        assert!(server.publish_info(&mut host, "prometheus", DEFAULT_PORT).unwrap());
        let data = host.local_app_data(id);
        assert_eq!(data["hostname"], "prometheus");
        assert_eq!(data["port"], "9091");
    }

    #[test]
    fn test_unit_changes_are_ignored() {
        let mut host = MemoryHost::new();
        host.add_relation("prometheus", "prometheus");
        let relation = host.relation("prometheus").unwrap();
        let client = PrometheusClient::new("prometheus");
        let mut event = RelationEvent {
            kind: RelationEventKind::Changed,
            relation,
            app: None,
            unit: Some("prometheus/0".into()),
        };
        assert!(!client.changed(&event));
        event.app = Some("prometheus".into());
        assert!(client.changed(&event));
        event.app = None;
        event.kind = RelationEventKind::Broken;
        assert!(client.changed(&event));
    }
}
