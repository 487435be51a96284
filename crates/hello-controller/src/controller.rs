//! Hello controller implementation
//!
//! Each reconcile pass drives one Hello toward its spec:
//! - create the managed Deployment if it does not exist
//! - re-read the persisted Deployment and correct replica or `WORLD` drift
//! - mirror the names of the Hello's pods into `status.nodes`
//!
//! Passes are idempotent. Every write is conditional on observed drift, so
//! re-running a pass against converged state issues no writes. Deletion
//! needs no work: the Deployment carries a controller owner reference and
//! is garbage collected with its Hello.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::controller::Action;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use hello_common::crd::{Hello, HelloStatus};
use hello_common::{EventPublisher, HelloEvent, KubeEventPublisher, OperatorMetrics};

use crate::deployment::{
    apply_spec, build_deployment, has_drifted, label_selector, labels_for, observed_replicas,
    observed_world, ParentRef, WorkloadTemplate, MAX_LABEL_VALUE_LEN,
};
use crate::error::{ReconcileError, Step};
use crate::store::{HelloKubeClient, HelloKubeClientImpl};

/// Name reported on Events and used as field manager
pub const CONTROLLER_NAME: &str = "hello-controller";

/// Requeue delay after a retryable failure
const ERROR_REQUEUE_SECS: u64 = 30;

/// A change delivered for one of the watched kinds
#[derive(Debug, Clone)]
pub enum Change<K> {
    /// The object was created or updated; carries its current state
    Applied(Arc<K>),
    /// The object is being deleted
    Deleted(Arc<K>),
}

/// Notification handed to the reconciler, tagged by resource kind
#[derive(Debug, Clone)]
pub enum Notification {
    /// A Hello changed
    Hello(Change<Hello>),
}

impl Notification {
    /// Classify a Hello delivered by the controller runtime.
    ///
    /// An object with a deletion timestamp is a deletion signal.
    pub fn for_hello(hello: Arc<Hello>) -> Self {
        if hello.is_deleting() {
            Self::Hello(Change::Deleted(hello))
        } else {
            Self::Hello(Change::Applied(hello))
        }
    }

    /// Whether this notification is a deletion signal
    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::Hello(Change::Deleted(_)))
    }
}

/// Writes performed by one reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The managed Deployment did not exist and was created
    pub created: bool,
    /// The persisted Deployment drifted and was rewritten
    pub deployment_updated: bool,
    /// `status.nodes` was rewritten
    pub status_updated: bool,
}

impl ReconcileOutcome {
    /// Number of drift-correcting writes (Deployment update and status update)
    pub fn corrective_writes(&self) -> usize {
        usize::from(self.deployment_updated) + usize::from(self.status_updated)
    }

    /// Whether the pass changed nothing in the store
    pub fn is_noop(&self) -> bool {
        !self.created && self.corrective_writes() == 0
    }
}

/// The reconcile loop body.
///
/// Holds no per-object state; everything it knows about a Hello comes from
/// the notification and the store.
pub struct Reconciler {
    kube: Arc<dyn HelloKubeClient>,
    events: Arc<dyn EventPublisher>,
    metrics: OperatorMetrics,
    template: WorkloadTemplate,
}

impl Reconciler {
    /// Create a reconciler with its collaborators
    pub fn new(
        kube: Arc<dyn HelloKubeClient>,
        events: Arc<dyn EventPublisher>,
        metrics: OperatorMetrics,
        template: WorkloadTemplate,
    ) -> Self {
        Self {
            kube,
            events,
            metrics,
            template,
        }
    }

    /// Metrics handle shared with the rest of the process
    pub fn metrics(&self) -> &OperatorMetrics {
        &self.metrics
    }

    /// Run one reconcile pass for a notification.
    ///
    /// A failed pass increments the reconcile error counter once and is
    /// returned unrecovered; the caller decides when to redeliver.
    pub async fn handle(
        &self,
        notification: Notification,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match notification {
            Notification::Hello(Change::Deleted(hello)) => {
                debug!(
                    hello = %hello.name_any(),
                    "Hello deleted, owned Deployment is garbage collected"
                );
                Ok(ReconcileOutcome::default())
            }
            Notification::Hello(Change::Applied(hello)) => {
                let result = self.reconcile_hello(&hello).await;
                if let Err(e) = &result {
                    self.metrics.record_reconcile_error();
                    self.publish(
                        &hello,
                        HelloEvent::ReconcileFailed {
                            error: e.to_string(),
                        },
                    )
                    .await;
                }
                result
            }
        }
    }

    async fn reconcile_hello(&self, hello: &Hello) -> Result<ReconcileOutcome, ReconcileError> {
        let name = hello.name_any();
        let parent = ParentRef::from_hello(hello).ok_or_else(|| ReconcileError::InvalidParent {
            name: name.clone(),
            message: "Hello must have a namespace and uid to own a Deployment".to_string(),
        })?;
        // the name doubles as a label value on the Deployment and its pods
        if name.len() > MAX_LABEL_VALUE_LEN {
            return Err(ReconcileError::InvalidParent {
                name,
                message: format!(
                    "name is longer than {} characters and cannot be used as a label value",
                    MAX_LABEL_VALUE_LEN
                ),
            });
        }
        let deployment_ref = format!("Deployment {}/{}", parent.namespace, parent.name);

        let mut outcome = ReconcileOutcome::default();

        let desired = build_deployment(&parent, &hello.spec, &self.template);
        match self.kube.create_deployment(&desired).await {
            Ok(()) => {
                info!(
                    hello = %name,
                    namespace = %parent.namespace,
                    replicas = hello.spec.size,
                    "created Deployment"
                );
                outcome.created = true;
                self.publish(
                    hello,
                    HelloEvent::DeploymentCreated {
                        deployment: format!("{}/{}", parent.namespace, parent.name),
                    },
                )
                .await;
            }
            Err(e) if e.is_already_exists() => {
                debug!(hello = %name, "Deployment already exists");
            }
            Err(source) => {
                return Err(ReconcileError::StoreWrite {
                    step: Step::CreateDeployment,
                    object: deployment_ref,
                    source,
                })
            }
        }

        let mut current = self
            .kube
            .get_deployment(&parent.namespace, &parent.name)
            .await
            .map_err(|source| ReconcileError::StoreRead {
                step: Step::GetDeployment,
                object: deployment_ref.clone(),
                source,
            })?;

        if !is_controlled_by(&current, &parent) {
            warn!(
                hello = %name,
                namespace = %parent.namespace,
                "Deployment is not controlled by this Hello"
            );
        }

        if has_drifted(&current, &hello.spec) {
            let detail = format!(
                "replicas {:?} -> {}, WORLD {:?} -> {:?}",
                observed_replicas(&current),
                hello.spec.size,
                observed_world(&current),
                hello.spec.world
            );

            apply_spec(&mut current, &hello.spec, &self.template);
            self.kube
                .replace_deployment(&current)
                .await
                .map_err(|source| ReconcileError::StoreWrite {
                    step: Step::UpdateDeployment,
                    object: deployment_ref.clone(),
                    source,
                })?;

            info!(hello = %name, namespace = %parent.namespace, drift = %detail, "corrected Deployment drift");
            outcome.deployment_updated = true;
            self.publish(hello, HelloEvent::DriftCorrected { detail })
                .await;
        }

        let selector = label_selector(&labels_for(&parent.name));
        let pods = self
            .kube
            .list_pods(&parent.namespace, &selector)
            .await
            .map_err(|source| ReconcileError::List {
                namespace: parent.namespace.clone(),
                selector: selector.clone(),
                source,
            })?;

        let nodes = pod_names(&pods);
        if nodes.as_slice() != hello.observed_nodes() {
            let count = nodes.len();
            let status = HelloStatus { nodes };
            self.kube
                .patch_hello_status(&parent.namespace, &parent.name, &status)
                .await
                .map_err(|source| ReconcileError::StoreWrite {
                    step: Step::UpdateStatus,
                    object: format!("Hello {}/{}", parent.namespace, parent.name),
                    source,
                })?;

            debug!(hello = %name, pods = count, "synced status.nodes");
            outcome.status_updated = true;
            self.publish(hello, HelloEvent::StatusSynced { pods: count })
                .await;
        }

        Ok(outcome)
    }

    async fn publish(&self, hello: &Hello, event: HelloEvent) {
        self.events.publish(&hello.object_ref(&()), event).await;
    }
}

/// Names of `pods`, sorted so that listing order never reads as drift
pub fn pod_names(pods: &[Pod]) -> Vec<String> {
    let mut names: Vec<String> = pods.iter().filter_map(|p| p.metadata.name.clone()).collect();
    names.sort();
    names
}

fn is_controlled_by(deployment: &Deployment, parent: &ParentRef) -> bool {
    deployment
        .owner_references()
        .iter()
        .any(|o| o.uid == parent.owner.uid && o.controller == Some(true))
}

/// Shared context for the Hello controller
pub struct Context {
    /// Reconcile loop body
    pub reconciler: Reconciler,
    /// Requeue delay after a successful pass
    pub resync_interval: Duration,
}

impl Context {
    /// Create a context around an existing reconciler
    pub fn new(reconciler: Reconciler, resync_interval: Duration) -> Self {
        Self {
            reconciler,
            resync_interval,
        }
    }

    /// Create a context backed by the Kubernetes API
    pub fn from_client(
        client: Client,
        metrics: OperatorMetrics,
        template: WorkloadTemplate,
        resync_interval: Duration,
    ) -> Self {
        let events = Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME));
        let kube = Arc::new(HelloKubeClientImpl::new(client));
        Self::new(
            Reconciler::new(kube, events, metrics, template),
            resync_interval,
        )
    }

    /// Create a context for unit tests with a mock client and no events
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn HelloKubeClient>) -> Self {
        let metrics = OperatorMetrics::new().expect("metrics registration should succeed");
        Self::new(
            Reconciler::new(
                kube,
                Arc::new(hello_common::NoopEventPublisher),
                metrics,
                WorkloadTemplate::default(),
            ),
            Duration::from_secs(hello_common::DEFAULT_RESYNC_SECS),
        )
    }
}

/// Reconcile a Hello delivered by `kube::runtime::Controller`
#[instrument(skip(hello, ctx), fields(hello = %hello.name_any(), namespace = %hello.namespace().unwrap_or_default()))]
pub async fn reconcile(hello: Arc<Hello>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let notification = Notification::for_hello(hello);
    let deleting = notification.is_deletion();

    let outcome = ctx.reconciler.handle(notification).await?;
    debug!(?outcome, "reconcile pass finished");

    if deleting {
        Ok(Action::await_change())
    } else {
        Ok(Action::requeue(ctx.resync_interval))
    }
}

/// Error policy for Hello reconciliation.
///
/// Store failures are retried after a fixed delay; a Hello that cannot own
/// a Deployment waits for the next change to the object.
pub fn error_policy(hello: Arc<Hello>, error: &ReconcileError, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        hello = %hello.name_any(),
        "hello reconciliation failed"
    );
    if error.is_retryable() {
        Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
    } else {
        Action::await_change()
    }
}
