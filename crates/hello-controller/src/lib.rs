//! Hello reconciliation for the hello operator
//!
//! - **Deployment**: synthesizes the managed Deployment from a Hello spec
//! - **Store**: the Kubernetes API seam the reconciler writes through
//! - **Controller**: the idempotent reconcile pass and its runtime adapters

pub mod controller;
pub mod deployment;
pub mod error;
pub mod store;

pub use controller::{
    error_policy, reconcile, Change, Context, Notification, ReconcileOutcome, Reconciler,
    CONTROLLER_NAME,
};
pub use deployment::WorkloadTemplate;
pub use error::{ReconcileError, Step};
pub use store::{HelloKubeClient, HelloKubeClientImpl};
