//! The `keystone` interface: identity service credentials.

use anyhow::Result;

use super::common::{RelationClient, RelationProtocol, RelationServer, Resolution};
use crate::error::Error;
use crate::host::RelationBus;

/// Identity credentials, published by the keystone application leader.
pub static KEYSTONE: RelationProtocol = RelationProtocol {
    interface: "keystone",
    mandatory_fields: &[
        "host",
        "port",
        "user_domain_name",
        "project_domain_name",
        "username",
        "password",
        "service",
    ],
    resolution: Resolution::AppScoped,
};

/// Credentials published by the keystone charm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoneInfo {
    /// Keystone API host.
    pub host: String,
    /// Keystone API port.
    pub port: u16,
    /// Domain of the service user.
    pub user_domain_name: String,
    /// Domain of the service project.
    pub project_domain_name: String,
    /// Service user name.
    pub username: String,
    /// Service user password.
    pub password: String,
    /// Service project name.
    pub service: String,
}

/// Provides side of the keystone interface.
#[derive(Debug, Clone)]
pub struct KeystoneServer(RelationServer);

impl KeystoneServer {
    /// Speak keystone on endpoint `relation_name`.
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self(RelationServer::new(relation_name, &KEYSTONE))
    }

    /// Publish `info` on every keystone relation, if leader.
    pub fn publish_info<B: RelationBus + ?Sized>(
        &self,
        bus: &mut B,
        info: &KeystoneInfo,
    ) -> Result<bool> {
        let fields = [
            ("host", info.host.clone()),
            ("port", info.port.to_string()),
            ("user_domain_name", info.user_domain_name.clone()),
            ("project_domain_name", info.project_domain_name.clone()),
            ("username", info.username.clone()),
            ("password", info.password.clone()),
            ("service", info.service.clone()),
        ];
        self.0.publish(bus, &fields)
    }
}

/// Requires side of the keystone interface.
#[derive(Debug, Clone)]
pub struct KeystoneClient(RelationClient);

impl KeystoneClient {
    /// Speak keystone on endpoint `relation_name`.
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self(RelationClient::new(relation_name, &KEYSTONE))
    }

    /// The underlying generic client.
    pub fn client(&self) -> &RelationClient {
        &self.0
    }

    /// Whether any mandatory field is still unpublished.
    pub fn is_missing_data<B: RelationBus + ?Sized>(&self, bus: &B) -> bool {
        self.0.is_missing_data(bus)
    }

    /// The `host` field.
    pub fn host<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "host")
    }

    /// The raw `port` field.
    pub fn port<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "port")
    }

    /// The `user_domain_name` field.
    pub fn user_domain_name<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "user_domain_name")
    }

    /// The `project_domain_name` field.
    pub fn project_domain_name<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "project_domain_name")
    }

    /// The `username` field.
    pub fn username<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "username")
    }

    /// The `password` field.
    pub fn password<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "password")
    }

    /// The `service` field.
    pub fn service<B: RelationBus + ?Sized>(&self, bus: &B) -> Option<String> {
        self.0.get(bus, "service")
    }

    /// All fields at once; `None` while any is missing.
    pub fn info<B: RelationBus + ?Sized>(&self, bus: &B) -> crate::Result<Option<KeystoneInfo>> {
        let get = |key| self.0.get(bus, key);
        let (
            Some(host),
            Some(port),
            Some(user_domain_name),
            Some(project_domain_name),
            Some(username),
            Some(password),
            Some(service),
        ) = (
            get("host"),
            get("port"),
            get("user_domain_name"),
            get("project_domain_name"),
            get("username"),
            get("password"),
            get("service"),
        )
        else {
            return Ok(None);
        };
        let port = port.parse().map_err(|_| Error::InvalidRelationData {
            relation: self.0.relation_name().to_owned(),
            field: "port".into(),
            value: port.clone(),
        })?;
        Ok(Some(KeystoneInfo {
            host,
            port,
            user_domain_name,
            project_domain_name,
            username,
            password,
            service,
        }))
    }
}
