//! Desired Deployment for a Hello
//!
//! Pure construction and inspection of the Deployment managed on behalf of
//! a `Hello`. Nothing here talks to the API server.
//!
//! The label set returned by [`labels_for`] is used three times: as the
//! Deployment's own labels, as its pod selector, and by the controller to
//! list the pods whose names are mirrored into `status.nodes`. All three
//! must come from the same function.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use hello_common::crd::{Hello, HelloSpec};

/// Value of the `app` label on every managed object
pub const APP_LABEL_VALUE: &str = "hello";

/// Label key carrying the owning Hello's name
pub const OWNER_LABEL_KEY: &str = "hello_cr";

/// Name of the single container in the managed pod template
pub const CONTAINER_NAME: &str = "hello";

/// Environment variable carrying `spec.world`
pub const WORLD_ENV: &str = "WORLD";

/// Longest value Kubernetes accepts for a label. Hello names are only
/// limited to 253 characters, so longer names cannot be labelled.
pub const MAX_LABEL_VALUE_LEN: usize = 63;

/// Image the managed Deployment runs unless overridden
pub const DEFAULT_IMAGE: &str = "docker.io/agreene/hello-go";

/// Port the hello container listens on
pub const DEFAULT_CONTAINER_PORT: i32 = 8000;

/// Container-level settings that do not come from the Hello spec
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadTemplate {
    /// Container image
    pub image: String,
    /// Container entrypoint
    pub command: Vec<String>,
    /// Port the container listens on
    pub container_port: i32,
}

impl Default for WorkloadTemplate {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            command: vec!["go".to_string(), "run".to_string(), "main.go".to_string()],
            container_port: DEFAULT_CONTAINER_PORT,
        }
    }
}

impl WorkloadTemplate {
    /// Template with the default command and port running `image`
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }
}

/// Identity of the Hello that owns a Deployment
#[derive(Clone, Debug, PartialEq)]
pub struct ParentRef {
    /// Hello name, also the Deployment name
    pub name: String,
    /// Namespace shared by the Hello and its Deployment
    pub namespace: String,
    /// Controller owner reference pointing at the Hello
    pub owner: OwnerReference,
}

impl ParentRef {
    /// Extract the owner identity from a Hello.
    ///
    /// Returns `None` for objects that were never persisted (no uid) or are
    /// missing a namespace.
    pub fn from_hello(hello: &Hello) -> Option<Self> {
        let namespace = hello.namespace()?;
        let owner = OwnerReference {
            block_owner_deletion: Some(true),
            ..hello.controller_owner_ref(&())?
        };
        Some(Self {
            name: hello.name_any(),
            namespace,
            owner,
        })
    }
}

/// Labels selecting the resources that belong to the Hello named `name`
pub fn labels_for(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), APP_LABEL_VALUE.to_string()),
        (OWNER_LABEL_KEY.to_string(), name.to_string()),
    ])
}

/// Render a label map as an equality-based selector (`k1=v1,k2=v2`)
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the Deployment a Hello should own.
///
/// Deterministic: equal inputs give structurally equal Deployments.
pub fn build_deployment(
    parent: &ParentRef,
    spec: &HelloSpec,
    template: &WorkloadTemplate,
) -> Deployment {
    let labels = labels_for(&parent.name);

    Deployment {
        metadata: ObjectMeta {
            name: Some(parent.name.clone()),
            namespace: Some(parent.namespace.clone()),
            labels: Some(labels.clone()),
            owner_references: Some(vec![parent.owner.clone()]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(spec.size),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![hello_container(&spec.world, template)],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

fn hello_container(world: &str, template: &WorkloadTemplate) -> Container {
    Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(template.image.clone()),
        command: Some(template.command.clone()),
        ports: Some(vec![ContainerPort {
            container_port: template.container_port,
            name: Some(CONTAINER_NAME.to_string()),
            ..Default::default()
        }]),
        env: Some(vec![world_env(world)]),
        ..Default::default()
    }
}

fn world_env(world: &str) -> EnvVar {
    EnvVar {
        name: WORLD_ENV.to_string(),
        value: Some(world.to_string()),
        ..Default::default()
    }
}

/// Replica count recorded on a persisted Deployment
pub fn observed_replicas(deployment: &Deployment) -> Option<i32> {
    deployment.spec.as_ref().and_then(|s| s.replicas)
}

/// `WORLD` value recorded on a persisted Deployment.
///
/// `None` when the hello container or the variable is missing. A variable
/// present without a value reads as the empty string, since the API server
/// drops empty values.
pub fn observed_world(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .iter()
        .find(|c| c.name == CONTAINER_NAME)?
        .env
        .as_ref()?
        .iter()
        .find(|e| e.name == WORLD_ENV)
        .map(|e| e.value.as_deref().unwrap_or_default())
}

/// Whether a persisted Deployment disagrees with the Hello spec on replica
/// count or `WORLD`
pub fn has_drifted(deployment: &Deployment, spec: &HelloSpec) -> bool {
    observed_replicas(deployment) != Some(spec.size)
        || observed_world(deployment) != Some(spec.world.as_str())
}

/// Overwrite replica count and `WORLD` on a persisted Deployment.
///
/// Everything else on the object is left untouched. A missing hello
/// container is restored from `template`.
pub fn apply_spec(deployment: &mut Deployment, spec: &HelloSpec, template: &WorkloadTemplate) {
    let deployment_spec = deployment.spec.get_or_insert_with(Default::default);
    deployment_spec.replicas = Some(spec.size);

    let pod_spec = deployment_spec
        .template
        .spec
        .get_or_insert_with(Default::default);

    match pod_spec
        .containers
        .iter_mut()
        .find(|c| c.name == CONTAINER_NAME)
    {
        Some(container) => {
            let env = container.env.get_or_insert_with(Vec::new);
            match env.iter_mut().find(|e| e.name == WORLD_ENV) {
                Some(var) => *var = world_env(&spec.world),
                None => env.push(world_env(&spec.world)),
            }
        }
        None => pod_spec
            .containers
            .push(hello_container(&spec.world, template)),
    }
}
