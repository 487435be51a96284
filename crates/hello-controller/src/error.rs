//! Reconcile error types
//!
//! Every store failure is wrapped with the reconcile step that hit it and
//! the object it was operating on.

use std::fmt;

/// Reconcile step that touched the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Initial create of the managed Deployment
    CreateDeployment,
    /// Re-read of the persisted Deployment
    GetDeployment,
    /// Corrective write after drift
    UpdateDeployment,
    /// Write of `status.nodes`
    UpdateStatus,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateDeployment => "create deployment",
            Self::GetDeployment => "get deployment",
            Self::UpdateDeployment => "update deployment",
            Self::UpdateStatus => "update status",
        })
    }
}

/// Error returned from a failed reconcile pass
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Reading an object from the store failed
    #[error("failed to {step} {object}: {source}")]
    StoreRead {
        step: Step,
        object: String,
        source: hello_common::Error,
    },

    /// Writing an object to the store failed
    #[error("failed to {step} {object}: {source}")]
    StoreWrite {
        step: Step,
        object: String,
        source: hello_common::Error,
    },

    /// Listing the Hello's pods failed
    #[error("failed to list pods in {namespace} matching '{selector}': {source}")]
    List {
        namespace: String,
        selector: String,
        source: hello_common::Error,
    },

    /// The Hello cannot own a Deployment (no namespace or uid)
    #[error("invalid Hello {name}: {message}")]
    InvalidParent { name: String, message: String },
}

impl ReconcileError {
    /// Whether redelivering the same object can succeed without a spec change
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidParent { .. })
    }

    /// The step that failed, if the failure came from a read or write
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::StoreRead { step, .. } | Self::StoreWrite { step, .. } => Some(*step),
            Self::List { .. } | Self::InvalidParent { .. } => None,
        }
    }
}
