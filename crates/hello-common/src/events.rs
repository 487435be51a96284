//! Kubernetes Events emitted on Hello objects
//!
//! Every write the reconciler makes, and every failed pass, leaves an Event
//! on the Hello so `kubectl describe hello <name>` shows the history.
//! Publishing never fails a pass; a rejected Event is only logged.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Something the reconciler did to, or failed to do for, a Hello
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelloEvent {
    /// The managed Deployment was created
    DeploymentCreated {
        /// `namespace/name` of the Deployment
        deployment: String,
    },
    /// Replicas or `WORLD` were rewritten on the managed Deployment
    DriftCorrected {
        /// Old and new values
        detail: String,
    },
    /// `status.nodes` was rewritten
    StatusSynced {
        /// Number of pod names now recorded
        pods: usize,
    },
    /// The pass returned an error
    ReconcileFailed {
        /// Rendered error
        error: String,
    },
}

impl HelloEvent {
    /// Value of the REASON column
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DeploymentCreated { .. } => "DeploymentCreated",
            Self::DriftCorrected { .. } => "DriftCorrected",
            Self::StatusSynced { .. } => "StatusSynced",
            Self::ReconcileFailed { .. } => "ReconcileFailed",
        }
    }

    /// The controller action that produced the event
    pub fn action(&self) -> &'static str {
        match self {
            Self::DeploymentCreated { .. } => "Create",
            Self::DriftCorrected { .. } => "Update",
            Self::StatusSynced { .. } => "SyncStatus",
            Self::ReconcileFailed { .. } => "Reconcile",
        }
    }

    /// Failures are warnings, writes are normal
    pub fn event_type(&self) -> EventType {
        match self {
            Self::ReconcileFailed { .. } => EventType::Warning,
            _ => EventType::Normal,
        }
    }

    /// Human-readable message
    pub fn note(&self) -> String {
        match self {
            Self::DeploymentCreated { deployment } => format!("Created Deployment {}", deployment),
            Self::DriftCorrected { detail } => format!("Corrected Deployment drift: {}", detail),
            Self::StatusSynced { pods } => format!("{} pod(s) observed", pods),
            Self::ReconcileFailed { error } => error.clone(),
        }
    }
}

/// Sink for [`HelloEvent`]s
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Record `event` against the Hello referenced by `hello`
    async fn publish(&self, hello: &ObjectReference, event: HelloEvent);
}

/// Publishes through the Kubernetes Events API
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// `controller_name` becomes the reporting component. The pod name, when
    /// the downward API provides `POD_NAME`, becomes the reporting instance.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, hello: &ObjectReference, event: HelloEvent) {
        let record = Event {
            type_: event.event_type(),
            reason: event.reason().to_string(),
            note: Some(event.note()),
            action: event.action().to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&record, hello).await {
            warn!(
                hello = hello.name.as_deref().unwrap_or_default(),
                reason = event.reason(),
                error = %e,
                "dropping Event"
            );
        }
    }
}

/// Discards everything
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _hello: &ObjectReference, _event: HelloEvent) {}
}
