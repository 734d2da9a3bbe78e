//! Drive a complete charm through the in-memory host.

use std::collections::BTreeMap;

use indoc::indoc;
use serde::Deserialize;
use serde_json::json;

use opslib_osm::builder::{
    ContainerV3Builder, FilesV3Builder, IngressResourceV3Builder, PodSpecV3Builder,
};
use opslib_osm::charm::{CharmedOsmBase, OsmCharm, SpecContext, READY};
use opslib_osm::config::ConfigOptions;
use opslib_osm::error::SpecBuildError;
use opslib_osm::harness::MemoryHost;
use opslib_osm::host::{HookEvent, Host, RelationBus, RelationEvent, RelationEventKind, UnitStatus};
use opslib_osm::interfaces::prometheus::{PrometheusClient, PrometheusServer};
use opslib_osm::pod_spec::{ImageDetails, PodSpec};
use opslib_osm::validator::{Field, FieldType, Validator};

static_assertions::assert_impl_all!(PodSpec: Send, Sync, Clone);
static_assertions::assert_impl_all!(MemoryHost: Send);

const CONFIG_YAML: &str = indoc! {"
    options:
      port:
        type: int
        default: 3000
      site-url:
        type: string
      log-level:
        type: string
        default: INFO
"};

#[derive(Debug, Deserialize)]
struct GrafanaConfig {
    port: u16,
    site_url: Option<String>,
    log_level: String,
}

impl Validator for GrafanaConfig {
    const FIELDS: &'static [Field<'static>] = &[
        Field::new("port", FieldType::Integer),
        Field::new("site-url", FieldType::Optional(&FieldType::String)),
        Field::new("log-level", FieldType::String),
    ];
}

#[derive(Debug)]
struct Grafana {
    options: ConfigOptions,
    prometheus: PrometheusClient,
}

impl OsmCharm for Grafana {
    fn build_pod_spec(&self, ctx: &SpecContext<'_>) -> Result<PodSpec, SpecBuildError> {
        let config = GrafanaConfig::validate(&self.options.resolve(ctx.config))?;
        if self.prometheus.is_missing_data(ctx.relations) {
            return Err(SpecBuildError::Config("Need prometheus relation".into()));
        }
        let hostname = self.prometheus.hostname(ctx.relations).unwrap_or_default();
        let port = self.prometheus.port(ctx.relations)?;

        let mut files = FilesV3Builder::new();
        files.add_file(
            "datasource.yaml",
            format!("url: http://{hostname}:{port}\n"),
        );

        let mut container = ContainerV3Builder::new("grafana", ctx.image.clone());
        container
            .add_port("http", config.port)
            .add_envs([("GF_LOG_LEVEL", json!(config.log_level)), ("GF_PORT", json!(config.port))])
            .add_volume_config("datasources", "/etc/grafana/provisioning", files.build())
            .add_http_readiness_probe("/api/health", config.port)
            .add_tcpsocket_liveness_probe(config.port);

        let mut spec = PodSpecV3Builder::new();
        spec.add_container(container.build());
        if let Some(site_url) = config.site_url {
            let mut ingress = IngressResourceV3Builder::new("grafana-ingress", BTreeMap::new());
            ingress.add_rule_default_path(site_url, "grafana", config.port);
            spec.add_ingress_resource(ingress.build());
        }
        Ok(spec.build())
    }
}

fn setup() -> (CharmedOsmBase<Grafana>, MemoryHost, u32) {
    let charm = Grafana {
        options: ConfigOptions::from_yaml(CONFIG_YAML).unwrap(),
        prometheus: PrometheusClient::new("prometheus"),
    };
    let mut base = CharmedOsmBase::new(charm);
    base.watch_relation(base.charm().prometheus.client().clone());

    let mut host = MemoryHost::new();
    host.set_leader(true);
    host.set_image(Some(ImageDetails::new("grafana/grafana:latest")));
    let id = host.add_relation("prometheus", "prometheus");
    (base, host, id)
}

fn changed(host: &MemoryHost, app: Option<&str>) -> HookEvent {
    HookEvent::Relation(RelationEvent {
        kind: RelationEventKind::Changed,
        relation: host.relation("prometheus").unwrap(),
        app: app.map(ToOwned::to_owned),
        unit: Some("prometheus/0".into()),
    })
}

#[test]
fn test_blocked_until_related() {
    let (base, mut host, _) = setup();
    let status = base.handle(&mut host, &HookEvent::ConfigChanged);
    assert_eq!(
        status,
        Some(UnitStatus::Blocked("Need prometheus relation".into()))
    );
    assert!(host.applied_specs().is_empty());
}

#[test]
fn test_full_pod_spec() {
    let (base, mut host, id) = setup();
    host.update_app_data(id, [("hostname", "prometheus-k8s"), ("port", "9090")]);
    host.update_config([("site-url", "grafana.example.com")]);

    // Data published by a single unit is not an application change
    let unit_change = changed(&host, None);
    assert_eq!(base.handle(&mut host, &unit_change), None);
    let app_change = changed(&host, Some("prometheus"));
    assert_eq!(
        base.handle(&mut host, &app_change),
        Some(UnitStatus::Active(READY.into()))
    );

    let spec = host.last_applied().unwrap();
    similar_asserts::assert_eq!(
        spec.to_json().unwrap(),
        json!({
            "version": 3,
            "containers": [{
                "name": "grafana",
                "imageDetails": {"imagePath": "grafana/grafana:latest"},
                "imagePullPolicy": "Always",
                "ports": [{"name": "http", "containerPort": 3000, "protocol": "TCP"}],
                "envConfig": {"GF_LOG_LEVEL": "INFO", "GF_PORT": 3000},
                "volumeConfig": [{
                    "name": "datasources",
                    "mountPath": "/etc/grafana/provisioning",
                    "files": [{
                        "path": "datasource.yaml",
                        "content": "url: http://prometheus-k8s:9090\n",
                    }],
                }],
                "kubernetes": {
                    "readinessProbe": {
                        "httpGet": {"path": "/api/health", "port": 3000},
                        "initialDelaySeconds": 0,
                        "timeoutSeconds": 1,
                        "periodSeconds": 10,
                        "successThreshold": 1,
                        "failureThreshold": 3,
                    },
                    "livenessProbe": {
                        "tcpSocket": {"port": 3000},
                        "initialDelaySeconds": 0,
                        "timeoutSeconds": 1,
                        "periodSeconds": 10,
                        "successThreshold": 1,
                        "failureThreshold": 3,
                    },
                },
            }],
            "kubernetesResources": {
                "ingressResources": [{
                    "name": "grafana-ingress",
                    "annotations": {},
                    "spec": {
                        "rules": [{
                            "host": "grafana.example.com",
                            "http": {
                                "paths": [{
                                    "path": "/",
                                    "backend": {"serviceName": "grafana", "servicePort": 3000},
                                }],
                            },
                        }],
                    },
                }],
            },
        })
    );
    let env = spec.containers[0].env_config.keys().collect::<Vec<_>>();
    assert_eq!(env, ["GF_LOG_LEVEL", "GF_PORT"]);
    assert!(!spec.to_json().unwrap().as_object().unwrap().contains_key("initContainers"));
}

#[test]
fn test_reconfigure_and_break() {
    let (base, mut host, id) = setup();
    host.update_app_data(id, [("hostname", "prometheus-k8s"), ("port", "9090")]);
    base.handle(&mut host, &HookEvent::ConfigChanged);
    assert_eq!(host.applied_specs().len(), 1);
    let content = &host.applied_specs()[0].containers[0].volume_config[0].files[0].content;
    assert_eq!(content, "url: http://prometheus-k8s:9090\n");

    // Same inputs, same spec: nothing is re-applied
    base.handle(&mut host, &HookEvent::UpgradeCharm);
    assert_eq!(host.applied_specs().len(), 1);

    host.update_config([("port", json!("3000"))]);
    let status = base.configure_pod(&mut host);
    assert_eq!(status, UnitStatus::Blocked("Error found in port".into()));

    host.update_config([("port", json!(3001))]);
    base.configure_pod(&mut host);
    assert_eq!(host.applied_specs().len(), 2);

    let relation = host.relation("prometheus").unwrap();
    host.remove_relation(id);
    let broken = HookEvent::Relation(RelationEvent {
        kind: RelationEventKind::Broken,
        relation,
        app: None,
        unit: None,
    });
    let status = base.handle(&mut host, &broken);
    assert_eq!(
        status,
        Some(UnitStatus::Blocked("Need prometheus relation".into()))
    );
    assert_eq!(host.applied_specs().len(), 2);
}

#[test]
fn test_provider_side() {
    let mut host = MemoryHost::new();
    let id = host.add_relation("prometheus", "grafana");
    let server = PrometheusServer::new("prometheus");

    assert!(!server.publish_info(&mut host, "prometheus-k8s", 9090).unwrap());
    assert!(host.local_app_data(id).is_empty());

    host.set_leader(true);
    assert!(server.publish_info(&mut host, "prometheus-k8s", 9090).unwrap());
    let published = host.local_app_data(id);
    assert_eq!(published["hostname"], "prometheus-k8s");
    assert_eq!(published["port"], "9090");
}

#[test]
fn test_config_options_check() {
    let options = ConfigOptions::from_yaml(CONFIG_YAML).unwrap();
    let err = options
        .check(json!({"port": true, "nope": 1}).as_object().unwrap())
        .unwrap_err();
    assert_eq!(err.to_string(), "Errors found in port nope");
    assert!(GrafanaConfig::check(&options.defaults()).is_ok());
}
