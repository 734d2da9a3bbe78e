//! # The reconcile pass shared by OSM charms
//!
//! [`CharmedOsmBase`] reacts to configuration, leadership and relation
//! hooks by rebuilding the pod spec through the charm's [`OsmCharm`]
//! implementation and handing it to the host when it changed. Every pass
//! ends with a unit status; failures never escape it.

use serde_json::{Map, Value};

use crate::error::{Error, SpecBuildError};
use crate::host::{HookEvent, Host, RelationBus, UnitStatus};
use crate::interfaces::RelationClient;
use crate::pod_spec::{ImageDetails, PodSpec};
use crate::validator::Validator;

/// Status message of a unit that finished a pass.
pub const READY: &str = "ready";
/// Status message while the spec is being built.
pub const ASSEMBLING: &str = "Assembling pod spec";
/// Status message when the image resource is unavailable.
pub const IMAGE_FETCH_ERROR: &str = "Error fetching image information";

/// Inputs available while building a pod spec.
pub struct SpecContext<'a> {
    /// The resolved OCI image.
    pub image: &'a ImageDetails,
    /// Charm configuration as provided by the host.
    pub config: &'a Map<String, Value>,
    /// Read access to relation data.
    pub relations: &'a dyn RelationBus,
}

impl std::fmt::Debug for SpecContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecContext")
            .field("image", &self.image.image_path)
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl SpecContext<'_> {
    /// Validate the charm configuration into `T`.
    pub fn validate_config<T: Validator>(&self) -> Result<T, SpecBuildError> {
        Ok(T::validate(self.config)?)
    }
}

impl From<Error> for SpecBuildError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(e) => SpecBuildError::Validation(e),
            e => SpecBuildError::Other(e.into()),
        }
    }
}

/// Charm specific logic.
pub trait OsmCharm {
    /// Build the pod spec for the current configuration and relation data.
    fn build_pod_spec(&self, ctx: &SpecContext<'_>) -> Result<PodSpec, SpecBuildError>;
}

/// Drives an [`OsmCharm`] from host hooks.
#[derive(Debug)]
pub struct CharmedOsmBase<C> {
    charm: C,
    oci_image: String,
    watched: Vec<RelationClient>,
}

impl<C: OsmCharm> CharmedOsmBase<C> {
    /// Wrap `charm`, using the image resource named `image`.
    pub fn new(charm: C) -> Self {
        Self {
            charm,
            oci_image: "image".into(),
            watched: Vec::new(),
        }
    }

    /// Use a different image resource name.
    pub fn with_oci_image(mut self, resource: impl Into<String>) -> Self {
        self.oci_image = resource.into();
        self
    }

    /// The wrapped charm.
    pub fn charm(&self) -> &C {
        &self.charm
    }

    /// Reconfigure whenever `client` signals a relation change.
    pub fn watch_relation(&mut self, client: RelationClient) -> &mut Self {
        self.watched.push(client);
        self
    }

    /// Dispatch a hook. Returns the final status if a pass ran.
    pub fn handle<H: Host>(&self, host: &mut H, event: &HookEvent) -> Option<UnitStatus> {
        match event {
            HookEvent::ConfigChanged | HookEvent::LeaderElected | HookEvent::UpgradeCharm => {
                Some(self.configure_pod(host))
            }
            HookEvent::Relation(ev) => {
                if self.watched.iter().any(|c| c.should_signal(ev)) {
                    Some(self.configure_pod(host))
                } else {
                    tracing::trace!("Ignoring {:?} on {}", ev.kind, ev.relation.name);
                    None
                }
            }
        }
    }

    /// Assemble the pod spec and apply it, if possible.
    pub fn configure_pod<H: Host>(&self, host: &mut H) -> UnitStatus {
        let status = self.reconcile(host);
        host.set_status(status.clone());
        status
    }

    fn reconcile<H: Host>(&self, host: &mut H) -> UnitStatus {
        if !host.is_leader() {
            return UnitStatus::Active(READY.into());
        }

        host.set_status(UnitStatus::Maintenance(ASSEMBLING.into()));

        let image = match host.fetch_image(&self.oci_image) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("{e}");
                return UnitStatus::Blocked(IMAGE_FETCH_ERROR.into());
            }
        };

        let config = host.config();
        let ctx = SpecContext {
            image: &image,
            config: &config,
            relations: &*host,
        };
        let spec = match self.charm.build_pod_spec(&ctx) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::error!("Config data validation error: {e}");
                return UnitStatus::Blocked(e.to_string());
            }
        };

        if host.last_applied().as_ref() == Some(&spec) {
            tracing::debug!("Pod spec unchanged");
        } else {
            if let Err(e) = host.set_pod_spec(&spec) {
                tracing::error!("Applying pod spec: {e:#}");
                return UnitStatus::Blocked(format!("Error applying pod spec: {e}"));
            }
            tracing::info!("Applied pod spec");
            host.set_last_applied(spec);
        }

        UnitStatus::Active(READY.into())
    }
}
