//! Hello CRD types
//!
//! A `Hello` declares a replicated workload: how many pods to run (`size`)
//! and the value handed to each of them through the `WORLD` environment
//! variable (`world`). The controller owns `status.nodes`, the names of the
//! pods currently backing the resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the Hello CRD
pub const HELLO_API_GROUP: &str = "github.awgreene.com";

/// Full CRD name (`<plural>.<group>`), used when installing the CRD
pub const HELLO_CRD_NAME: &str = "hellos.github.awgreene.com";

/// Desired state of a Hello workload.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "github.awgreene.com",
    version = "v1alpha1",
    kind = "Hello",
    plural = "hellos",
    namespaced,
    status = "HelloStatus",
    printcolumn = r#"{"name":"Size","type":"integer","jsonPath":".spec.size"}"#,
    printcolumn = r#"{"name":"World","type":"string","jsonPath":".spec.world"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HelloSpec {
    /// Number of replicas of the hello Deployment
    #[schemars(range(min = 0))]
    pub size: i32,

    /// Value injected into every pod as the `WORLD` environment variable
    #[serde(default)]
    pub world: String,
}

/// Observed state of a Hello workload
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelloStatus {
    /// Names of the pods currently carrying this Hello's labels
    #[serde(default)]
    pub nodes: Vec<String>,
}

impl Hello {
    /// Pod names last recorded in status, empty when no status was written yet
    pub fn observed_nodes(&self) -> &[String] {
        self.status
            .as_ref()
            .map(|s| s.nodes.as_slice())
            .unwrap_or_default()
    }

    /// Whether the object is being deleted
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube::CustomResourceExt;

    #[test]
    fn spec_uses_wire_field_names() {
        let json = r#"{"size": 3, "world": "earth"}"#;
        let spec: HelloSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.size, 3);
        assert_eq!(spec.world, "earth");

        let back = serde_json::to_value(&spec).unwrap();
        assert_eq!(back["size"], 3);
        assert_eq!(back["world"], "earth");
    }

    #[test]
    fn world_defaults_to_empty() {
        let spec: HelloSpec = serde_json::from_str(r#"{"size": 0}"#).unwrap();
        assert_eq!(spec.size, 0);
        assert!(spec.world.is_empty());
    }

    #[test]
    fn status_without_nodes_deserializes_empty() {
        let status: HelloStatus = serde_json::from_str("{}").unwrap();
        assert!(status.nodes.is_empty());
    }

    #[test]
    fn observed_nodes_handles_missing_status() {
        let mut hello = Hello::new("example", HelloSpec::default());
        assert!(hello.observed_nodes().is_empty());

        hello.status = Some(HelloStatus {
            nodes: vec!["example-abc".to_string()],
        });
        assert_eq!(hello.observed_nodes(), ["example-abc".to_string()]);
    }

    #[test]
    fn deletion_timestamp_marks_deleting() {
        let mut hello = Hello::new("example", HelloSpec::default());
        assert!(!hello.is_deleting());

        hello.metadata.deletion_timestamp = Some(Time(Default::default()));
        assert!(hello.is_deleting());
    }

    #[test]
    fn crd_is_namespaced_with_status_subresource() {
        let crd = Hello::crd();
        assert_eq!(crd.metadata.name.as_deref(), Some(HELLO_CRD_NAME));
        assert_eq!(crd.spec.group, HELLO_API_GROUP);
        assert_eq!(crd.spec.scope, "Namespaced");

        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1alpha1");
        assert!(version
            .subresources
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .is_some());
    }

    #[test]
    fn crd_renders_as_yaml() {
        let yaml = serde_yaml::to_string(&Hello::crd()).unwrap();
        assert!(yaml.contains("kind: Hello"));
        assert!(yaml.contains("hellos"));
    }
}
