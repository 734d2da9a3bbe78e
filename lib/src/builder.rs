//! # Builders for pod spec documents
//!
//! Each builder accumulates fragments through `add_*` calls and renders them
//! with `build()`. Building never fails and never mutates the builder, so it
//! may be called any number of times.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::pod_spec::{
    Container, ContainerKubernetes, ContainerPort, FileContent, HttpIngressPath,
    HttpIngressRuleValue, ImageDetails, ImagePullPolicy, IngressBackend, IngressResource,
    IngressRule, IngressSpec, IngressTls, KubernetesResources, PodSpec, Probe, ProbeHandler,
    Protocol, VolumeConfig, POD_SPEC_VERSION,
};

/// Rendering of container probes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSchema {
    /// Probes only carry `initialDelaySeconds` and `timeoutSeconds`, and
    /// unset probes render as `{}`.
    Legacy,
    /// Probes carry the full set of Kubernetes timing and threshold fields;
    /// unset probes are left out.
    #[default]
    Extended,
}

/// Timing and threshold settings of a probe.
///
/// Fields which the selected [`ProbeSchema`] does not know about are dropped
/// when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Seconds after container start before the first check.
    pub initial_delay_seconds: u32,
    /// Seconds after which a check times out.
    pub timeout_seconds: u32,
    /// Seconds between checks.
    pub period_seconds: u32,
    /// Consecutive successes needed after a failure.
    pub success_threshold: u32,
    /// Consecutive failures before giving up.
    pub failure_threshold: u32,
}

impl ProbeSettings {
    /// The defaults used when a probe is added without explicit settings.
    pub const fn defaults(schema: ProbeSchema) -> Self {
        match schema {
            ProbeSchema::Legacy => Self {
                initial_delay_seconds: 10,
                timeout_seconds: 30,
                period_seconds: 10,
                success_threshold: 1,
                failure_threshold: 3,
            },
            ProbeSchema::Extended => Self {
                initial_delay_seconds: 0,
                timeout_seconds: 1,
                period_seconds: 10,
                success_threshold: 1,
                failure_threshold: 3,
            },
        }
    }

    fn render(&self, schema: ProbeSchema, handler: ProbeHandler) -> Probe {
        let mut probe = Probe {
            handler: Some(handler),
            initial_delay_seconds: Some(self.initial_delay_seconds),
            timeout_seconds: Some(self.timeout_seconds),
            ..Default::default()
        };
        if schema == ProbeSchema::Extended {
            probe.period_seconds = Some(self.period_seconds);
            probe.success_threshold = Some(self.success_threshold);
            probe.failure_threshold = Some(self.failure_threshold);
        }
        probe
    }
}

/// Builds an [`IngressResource`].
#[derive(Debug, Clone)]
pub struct IngressResourceV3Builder {
    name: String,
    annotations: BTreeMap<String, String>,
    rules: Vec<IngressRule>,
    tls: Vec<IngressTls>,
}

impl IngressResourceV3Builder {
    /// Start an ingress named `name`.
    pub fn new(name: impl Into<String>, annotations: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            annotations,
            rules: Vec::new(),
            tls: Vec::new(),
        }
    }

    /// Route `path` on `hostname` to `service_name:port`.
    ///
    /// Only one path is supported per rule; add more rules for more paths.
    pub fn add_rule(
        &mut self,
        hostname: impl Into<String>,
        service_name: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> &mut Self {
        self.rules.push(IngressRule {
            host: hostname.into(),
            http: HttpIngressRuleValue {
                paths: vec![HttpIngressPath {
                    path: path.into(),
                    backend: IngressBackend {
                        service_name: service_name.into(),
                        service_port: port,
                    },
                }],
            },
        });
        self
    }

    /// [`Self::add_rule`] for the `/` path.
    pub fn add_rule_default_path(
        &mut self,
        hostname: impl Into<String>,
        service_name: impl Into<String>,
        port: u16,
    ) -> &mut Self {
        self.add_rule(hostname, service_name, port, "/")
    }

    /// Terminate TLS for `hosts`. An empty secret name is left out.
    pub fn add_tls<I, S>(&mut self, hosts: I, secret_name: Option<&str>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tls.push(IngressTls {
            hosts: hosts.into_iter().map(Into::into).collect(),
            secret_name: secret_name.filter(|s| !s.is_empty()).map(ToOwned::to_owned),
        });
        self
    }

    /// Render the ingress resource.
    pub fn build(&self) -> IngressResource {
        IngressResource {
            name: self.name.clone(),
            annotations: self.annotations.clone(),
            spec: IngressSpec {
                rules: self.rules.clone(),
                tls: self.tls.clone(),
            },
        }
    }
}

/// Collects files for a [`VolumeConfig`].
#[derive(Debug, Default, Clone)]
pub struct FilesV3Builder {
    files: Vec<FileContent>,
}

impl FilesV3Builder {
    /// An empty file list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at `path`, relative to the mount point.
    pub fn add_file(&mut self, path: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.files.push(FileContent {
            path: path.into(),
            content: content.into(),
        });
        self
    }

    /// The files added so far.
    pub fn build(&self) -> Vec<FileContent> {
        self.files.clone()
    }
}

/// Builds a [`Container`].
#[derive(Debug, Clone)]
pub struct ContainerV3Builder {
    name: String,
    image_details: ImageDetails,
    image_pull_policy: ImagePullPolicy,
    probe_schema: ProbeSchema,
    readiness_probe: Option<ProbeHandler>,
    readiness_settings: Option<ProbeSettings>,
    liveness_probe: Option<ProbeHandler>,
    liveness_settings: Option<ProbeSettings>,
    volume_config: Vec<VolumeConfig>,
    ports: Vec<ContainerPort>,
    envs: IndexMap<String, serde_json::Value>,
    command: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum ProbeSlot {
    Readiness,
    Liveness,
}

impl ContainerV3Builder {
    /// Start a container named `name` running the given image, with the
    /// `Always` pull policy and [`ProbeSchema::Extended`] probes.
    pub fn new(name: impl Into<String>, image_details: ImageDetails) -> Self {
        Self {
            name: name.into(),
            image_details,
            image_pull_policy: ImagePullPolicy::default(),
            probe_schema: ProbeSchema::default(),
            readiness_probe: None,
            readiness_settings: None,
            liveness_probe: None,
            liveness_settings: None,
            volume_config: Vec::new(),
            ports: Vec::new(),
            envs: IndexMap::new(),
            command: Vec::new(),
        }
    }

    /// Set the image pull policy.
    pub fn with_image_pull_policy(mut self, policy: ImagePullPolicy) -> Self {
        self.image_pull_policy = policy;
        self
    }

    /// Select how probes are rendered.
    pub fn with_probe_schema(mut self, schema: ProbeSchema) -> Self {
        self.probe_schema = schema;
        self
    }

    /// Expose a TCP port.
    pub fn add_port(&mut self, name: impl Into<String>, port: u16) -> &mut Self {
        self.add_port_with_protocol(name, port, Protocol::Tcp)
    }

    /// Expose a port using `protocol`.
    pub fn add_port_with_protocol(
        &mut self,
        name: impl Into<String>,
        port: u16,
        protocol: Protocol,
    ) -> &mut Self {
        self.ports.push(ContainerPort {
            name: name.into(),
            container_port: port,
            protocol,
        });
        self
    }

    /// Mount `files` (see [`FilesV3Builder`]) at `mount_path`.
    pub fn add_volume_config(
        &mut self,
        name: impl Into<String>,
        mount_path: impl Into<String>,
        files: Vec<FileContent>,
    ) -> &mut Self {
        self.volume_config.push(VolumeConfig {
            name: name.into(),
            mount_path: mount_path.into(),
            files,
        });
        self
    }

    /// Override the image entrypoint. An empty command is not rendered.
    pub fn add_command<I, S>(&mut self, command: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set one environment variable, replacing any previous value.
    pub fn add_env(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> &mut Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    /// Merge `envs` into the environment; later values win.
    pub fn add_envs<I, K, V>(&mut self, envs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        for (k, v) in envs {
            self.add_env(k, v);
        }
        self
    }

    fn set_probe(
        &mut self,
        slot: ProbeSlot,
        handler: ProbeHandler,
        settings: Option<ProbeSettings>,
    ) -> &mut Self {
        let (probe, probe_settings) = match slot {
            ProbeSlot::Readiness => (&mut self.readiness_probe, &mut self.readiness_settings),
            ProbeSlot::Liveness => (&mut self.liveness_probe, &mut self.liveness_settings),
        };
        *probe = Some(handler);
        *probe_settings = settings;
        self
    }

    /// HTTP GET readiness probe with default settings.
    pub fn add_http_readiness_probe(&mut self, path: impl Into<String>, port: u16) -> &mut Self {
        let handler = ProbeHandler::HttpGet {
            path: path.into(),
            port,
        };
        self.set_probe(ProbeSlot::Readiness, handler, None)
    }

    /// HTTP GET readiness probe with explicit settings.
    pub fn add_http_readiness_probe_with(
        &mut self,
        path: impl Into<String>,
        port: u16,
        settings: ProbeSettings,
    ) -> &mut Self {
        let handler = ProbeHandler::HttpGet {
            path: path.into(),
            port,
        };
        self.set_probe(ProbeSlot::Readiness, handler, Some(settings))
    }

    /// HTTP GET liveness probe with default settings.
    pub fn add_http_liveness_probe(&mut self, path: impl Into<String>, port: u16) -> &mut Self {
        let handler = ProbeHandler::HttpGet {
            path: path.into(),
            port,
        };
        self.set_probe(ProbeSlot::Liveness, handler, None)
    }

    /// HTTP GET liveness probe with explicit settings.
    pub fn add_http_liveness_probe_with(
        &mut self,
        path: impl Into<String>,
        port: u16,
        settings: ProbeSettings,
    ) -> &mut Self {
        let handler = ProbeHandler::HttpGet {
            path: path.into(),
            port,
        };
        self.set_probe(ProbeSlot::Liveness, handler, Some(settings))
    }

    /// TCP readiness probe with default settings.
    pub fn add_tcpsocket_readiness_probe(&mut self, port: u16) -> &mut Self {
        self.set_probe(ProbeSlot::Readiness, ProbeHandler::TcpSocket { port }, None)
    }

    /// TCP readiness probe with explicit settings.
    pub fn add_tcpsocket_readiness_probe_with(
        &mut self,
        port: u16,
        settings: ProbeSettings,
    ) -> &mut Self {
        let handler = ProbeHandler::TcpSocket { port };
        self.set_probe(ProbeSlot::Readiness, handler, Some(settings))
    }

    /// TCP liveness probe with default settings.
    pub fn add_tcpsocket_liveness_probe(&mut self, port: u16) -> &mut Self {
        self.set_probe(ProbeSlot::Liveness, ProbeHandler::TcpSocket { port }, None)
    }

    /// TCP liveness probe with explicit settings.
    pub fn add_tcpsocket_liveness_probe_with(
        &mut self,
        port: u16,
        settings: ProbeSettings,
    ) -> &mut Self {
        let handler = ProbeHandler::TcpSocket { port };
        self.set_probe(ProbeSlot::Liveness, handler, Some(settings))
    }

    fn render_probe(
        &self,
        handler: &Option<ProbeHandler>,
        settings: &Option<ProbeSettings>,
    ) -> Option<Probe> {
        let schema = self.probe_schema;
        let probe = handler.clone().map(|handler| {
            settings
                .unwrap_or_else(|| ProbeSettings::defaults(schema))
                .render(schema, handler)
        });
        match schema {
            ProbeSchema::Legacy => Some(probe.unwrap_or_default()),
            ProbeSchema::Extended => probe,
        }
    }

    /// Render the container.
    pub fn build(&self) -> Container {
        Container {
            name: self.name.clone(),
            image_details: self.image_details.clone(),
            image_pull_policy: self.image_pull_policy,
            ports: self.ports.clone(),
            env_config: self.envs.clone(),
            volume_config: self.volume_config.clone(),
            kubernetes: ContainerKubernetes {
                readiness_probe: self.render_probe(&self.readiness_probe, &self.readiness_settings),
                liveness_probe: self.render_probe(&self.liveness_probe, &self.liveness_settings),
            },
            command: (!self.command.is_empty()).then(|| self.command.clone()),
        }
    }
}

/// Builds a [`PodSpec`].
#[derive(Debug, Default, Clone)]
pub struct PodSpecV3Builder {
    init_containers: Vec<Container>,
    containers: Vec<Container>,
    ingress_resources: Vec<IngressResource>,
}

impl PodSpecV3Builder {
    /// An empty pod spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container run before the application containers.
    pub fn add_init_container(&mut self, container: Container) -> &mut Self {
        self.init_containers.push(container);
        self
    }

    /// Add an application container.
    pub fn add_container(&mut self, container: Container) -> &mut Self {
        self.containers.push(container);
        self
    }

    /// Attach an ingress resource.
    pub fn add_ingress_resource(&mut self, ingress_resource: IngressResource) -> &mut Self {
        self.ingress_resources.push(ingress_resource);
        self
    }

    /// Render the pod spec.
    pub fn build(&self) -> PodSpec {
        PodSpec {
            version: POD_SPEC_VERSION,
            init_containers: self.init_containers.clone(),
            containers: self.containers.clone(),
            kubernetes_resources: KubernetesResources {
                ingress_resources: self.ingress_resources.clone(),
            },
        }
    }
}
