//! Common types for the hello operator: CRDs, errors, metrics, events and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod metrics;
pub mod telemetry;

pub use error::Error;
pub use events::{EventPublisher, HelloEvent, KubeEventPublisher, NoopEventPublisher};
pub use metrics::OperatorMetrics;

/// Field manager used for server-side apply and status patches
pub const FIELD_MANAGER: &str = "hello-operator";

/// Default port for the metrics and health HTTP server
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default period between successful reconciles of the same Hello
pub const DEFAULT_RESYNC_SECS: u64 = 300;
