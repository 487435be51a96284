//! Controller runner - wires the Hello reconciler into `kube::runtime::Controller`

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::NamespaceResourceScope;
use kube::runtime::controller::{Action, Error as ControllerError};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{Config as WatcherConfig, Error as WatcherError};
use kube::runtime::Controller;
use kube::{Api, Client, Resource, ResourceExt};

use hello_common::crd::Hello;
use hello_controller::deployment::{APP_LABEL_VALUE, OWNER_LABEL_KEY};
use hello_controller::{error_policy, reconcile, Context};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Build the Hello controller future.
///
/// Besides Hello itself, owned Deployments and labelled pods trigger a
/// reconcile of their Hello, so drift and pod churn are picked up without
/// waiting for the resync period.
pub fn build_hello_controller(
    client: Client,
    namespace: Option<&str>,
    ctx: Arc<Context>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let hellos: Api<Hello> = scoped_api(client.clone(), namespace);
    let deployments: Api<Deployment> = scoped_api(client.clone(), namespace);
    let pods: Api<Pod> = scoped_api(client, namespace);

    let managed = format!("app={}", APP_LABEL_VALUE);

    tracing::info!(namespace = namespace.unwrap_or("<all>"), "- Hello controller");

    Box::pin(
        Controller::new(hellos, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
            .owns(
                deployments,
                WatcherConfig::default()
                    .labels(&managed)
                    .timeout(WATCH_TIMEOUT_SECS),
            )
            .watches(
                pods,
                WatcherConfig::default()
                    .labels(&managed)
                    .timeout(WATCH_TIMEOUT_SECS),
                hello_for_pod,
            )
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_pass),
    )
}

/// Map a labelled pod to the Hello it belongs to
pub fn hello_for_pod(pod: Pod) -> Option<ObjectRef<Hello>> {
    let namespace = pod.namespace()?;
    let owner = pod.labels().get(OWNER_LABEL_KEY)?;
    Some(ObjectRef::new(owner).within(&namespace))
}

fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Log one item of the controller's output stream.
///
/// Reconcile failures were already logged by the error policy, so they
/// only show up here at debug level; watcher and queue errors are warnings.
async fn log_pass<E>(result: Result<(ObjectRef<Hello>, Action), ControllerError<E, WatcherError>>)
where
    E: std::error::Error + 'static,
{
    match result {
        Ok((hello, action)) => tracing::debug!(
            hello = %hello.name,
            namespace = hello.namespace.as_deref().unwrap_or_default(),
            ?action,
            "Hello pass finished"
        ),
        Err(ControllerError::ReconcilerFailed(e, hello)) => tracing::debug!(
            hello = %hello.name,
            error = %e,
            "Hello pass failed"
        ),
        Err(e) => tracing::warn!(error = %e, "Hello controller stream error"),
    }
}
