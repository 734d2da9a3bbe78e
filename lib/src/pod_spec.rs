//! The version 3 pod spec document handed to the host.
//!
//! These mirror the subset of the Kubernetes API the host understands for
//! charm-managed pods; field names serialize in camelCase.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The only pod spec version produced.
pub const POD_SPEC_VERSION: u32 = 3;

/// A complete pod specification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Always [`POD_SPEC_VERSION`].
    pub version: u32,
    /// Containers run to completion before `containers` start.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<Container>,
    /// Application containers, in insertion order.
    pub containers: Vec<Container>,
    /// Extra Kubernetes resources.
    pub kubernetes_resources: KubernetesResources,
}

impl PodSpec {
    /// Render the document as JSON.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Kubernetes resources attached to the pod.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesResources {
    /// Ingress resources, in insertion order.
    pub ingress_resources: Vec<IngressResource>,
}

/// Credentials and location of a container image.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    /// Registry path of the image.
    pub image_path: String,
    /// Registry user, for private images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Registry password, for private images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ImageDetails {
    /// Details for a public image.
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            ..Default::default()
        }
    }
}

/// When to pull the image.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePullPolicy {
    /// Pull on every pod start.
    #[default]
    Always,
    /// Pull only if the image is not cached on the node.
    IfNotPresent,
    /// Never pull; the image must already be present.
    Never,
}

/// Transport protocol of a container port.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// `TCP`
    #[default]
    Tcp,
    /// `UDP`
    Udp,
    /// `SCTP`
    Sctp,
}

/// A port exposed by a container.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port name, e.g. `http`.
    pub name: String,
    /// Port number inside the container.
    pub container_port: u16,
    /// Transport protocol.
    pub protocol: Protocol,
}

/// A file rendered into a volume.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// Path relative to the mount point.
    pub path: String,
    /// File contents.
    pub content: String,
}

/// A volume of files mounted into a container.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeConfig {
    /// Volume name.
    pub name: String,
    /// Where the volume is mounted in the container.
    pub mount_path: String,
    /// Files rendered into the volume.
    pub files: Vec<FileContent>,
}

/// What a probe checks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProbeHandler {
    /// An HTTP GET to `path` must succeed.
    HttpGet {
        /// URL path.
        path: String,
        /// Container port.
        port: u16,
    },
    /// A TCP connection to `port` must be accepted.
    TcpSocket {
        /// Container port.
        port: u16,
    },
}

/// A readiness or liveness probe.
///
/// Every field is optional so that both the legacy and extended renderings
/// (see [`crate::builder::ProbeSchema`]) share one type. The default value
/// renders as `{}`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    /// The check performed; rendered inline as `httpGet` or `tcpSocket`.
    #[serde(flatten)]
    pub handler: Option<ProbeHandler>,
    /// Seconds after container start before the first check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<u32>,
    /// Seconds after which a check times out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
    /// Consecutive successes needed after a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<u32>,
    /// Consecutive failures before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,
    /// Seconds between checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<u32>,
}

/// Kubernetes specific container settings.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerKubernetes {
    /// Gates traffic to the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<Probe>,
    /// Restarts the container when failing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<Probe>,
}

/// A container in the pod.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name, unique within the pod.
    pub name: String,
    /// Image to run.
    pub image_details: ImageDetails,
    /// When to pull the image.
    pub image_pull_policy: ImagePullPolicy,
    /// Exposed ports.
    pub ports: Vec<ContainerPort>,
    /// Environment; values may be strings, numbers or booleans.
    pub env_config: IndexMap<String, serde_json::Value>,
    /// Mounted file volumes.
    pub volume_config: Vec<VolumeConfig>,
    /// Probes.
    pub kubernetes: ContainerKubernetes,
    /// Entrypoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

/// A Kubernetes ingress resource.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IngressResource {
    /// Resource name.
    pub name: String,
    /// Annotations, e.g. for the ingress controller.
    pub annotations: BTreeMap<String, String>,
    /// Routing rules.
    pub spec: IngressSpec,
}

/// Rules and TLS settings of an ingress.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct IngressSpec {
    /// Host rules, in insertion order.
    pub rules: Vec<IngressRule>,
    /// TLS blocks; omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tls: Vec<IngressTls>,
}

/// Routes traffic for one host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    /// Host name matched by the rule.
    pub host: String,
    /// HTTP routes for the host.
    pub http: HttpIngressRuleValue,
}

/// HTTP routes of an [`IngressRule`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HttpIngressRuleValue {
    /// Path routes.
    pub paths: Vec<HttpIngressPath>,
}

/// Routes one URL path to a backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HttpIngressPath {
    /// URL path prefix.
    pub path: String,
    /// Where matching requests go.
    pub backend: IngressBackend,
}

/// A service and port receiving ingress traffic.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngressBackend {
    /// Kubernetes service name.
    pub service_name: String,
    /// Service port.
    pub service_port: u16,
}

/// TLS termination for a set of hosts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngressTls {
    /// Hosts covered by the certificate.
    pub hosts: Vec<String>,
    /// Secret holding the certificate; the controller default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_probe_shapes() {
        let probe = Probe {
            handler: Some(ProbeHandler::TcpSocket { port: 8080 }),
            initial_delay_seconds: Some(5),
            ..Default::default()
        };
        similar_asserts::assert_eq!(
            serde_json::to_value(&probe).unwrap(),
            json!({"tcpSocket": {"port": 8080}, "initialDelaySeconds": 5})
        );
        assert_eq!(serde_json::to_value(Probe::default()).unwrap(), json!({}));

        let parsed: Probe = serde_json::from_value(json!({
            "httpGet": {"path": "/", "port": 80},
            "timeoutSeconds": 1,
        }))
        .unwrap();
        assert_eq!(
            parsed.handler,
            Some(ProbeHandler::HttpGet {
                path: "/".into(),
                port: 80
            })
        );
        assert_eq!(parsed.timeout_seconds, Some(1));
    }

    #[test]
    fn test_enum_spelling() {
        assert_eq!(serde_json::to_value(Protocol::Udp).unwrap(), json!("UDP"));
        assert_eq!(
            serde_json::to_value(ImagePullPolicy::IfNotPresent).unwrap(),
            json!("IfNotPresent")
        );
        let image = ImageDetails::new("registry/prometheus:latest");
        assert_eq!(
            serde_json::to_value(&image).unwrap(),
            json!({"imagePath": "registry/prometheus:latest"})
        );
    }
}
