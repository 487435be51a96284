//! Kubernetes access for the Hello controller
//!
//! The reconciler only talks to the API server through [`HelloKubeClient`],
//! so tests can substitute a mock or an in-memory store.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};

#[cfg(test)]
use mockall::automock;

use hello_common::crd::{Hello, HelloStatus};
use hello_common::{Error, FIELD_MANAGER};

/// Operations the reconciler performs against the API server
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HelloKubeClient: Send + Sync {
    /// Create a Deployment.
    ///
    /// Returns [`Error::AlreadyExists`] when a Deployment with the same
    /// namespace and name exists.
    async fn create_deployment(&self, deployment: &Deployment) -> Result<(), Error>;

    /// Read the persisted Deployment `namespace/name`
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, Error>;

    /// Replace a Deployment, guarded by its `resourceVersion`
    async fn replace_deployment(&self, deployment: &Deployment) -> Result<(), Error>;

    /// List pods in `namespace` matching an equality label selector
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, Error>;

    /// Write the status of the Hello `namespace/name`
    async fn patch_hello_status(
        &self,
        namespace: &str,
        name: &str,
        status: &HelloStatus,
    ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct HelloKubeClientImpl {
    client: Client,
}

impl HelloKubeClientImpl {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HelloKubeClient for HelloKubeClientImpl {
    async fn create_deployment(&self, deployment: &Deployment) -> Result<(), Error> {
        let namespace = deployment.namespace().unwrap_or_default();
        let name = deployment.name_any();
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);

        api.create(&PostParams::default(), deployment)
            .await
            .map_err(|e| Error::from_kube("Deployment", &namespace, &name, e))?;
        Ok(())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| Error::from_kube("Deployment", namespace, name, e))
    }

    async fn replace_deployment(&self, deployment: &Deployment) -> Result<(), Error> {
        let namespace = deployment.namespace().unwrap_or_default();
        let name = deployment.name_any();
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);

        api.replace(&name, &PostParams::default(), deployment)
            .await
            .map_err(|e| Error::from_kube("Deployment", &namespace, &name, e))?;
        Ok(())
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| Error::from_kube("Pod", namespace, label_selector, e))?;
        Ok(list.items)
    }

    async fn patch_hello_status(
        &self,
        namespace: &str,
        name: &str,
        status: &HelloStatus,
    ) -> Result<(), Error> {
        let api: Api<Hello> = Api::namespaced(self.client.clone(), namespace);
        let status_patch = serde_json::json!({ "status": status });

        api.patch_status(
            name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&status_patch),
        )
        .await
        .map_err(|e| Error::from_kube("Hello", namespace, name, e))?;
        Ok(())
    }
}
