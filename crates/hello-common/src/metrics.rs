//! Prometheus metrics for the hello operator
//!
//! Metrics live in an explicit `Registry` owned by the process rather than
//! in the prometheus default registry. `OperatorMetrics` is created once at
//! startup and handed to the reconciler; clones share the same counters.

use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

use crate::Error;

/// Name of the reconcile error counter
pub const RECONCILE_ERRORS_METRIC: &str = "hello_operator_reconcile_errors_total";

/// Handle to the operator's metrics
#[derive(Clone)]
pub struct OperatorMetrics {
    registry: Registry,
    reconcile_errors: IntCounter,
}

impl OperatorMetrics {
    /// Create the operator metrics and register them into a fresh registry
    pub fn new() -> Result<Self, Error> {
        Self::with_registry(Registry::new())
    }

    /// Create the operator metrics and register them into `registry`
    pub fn with_registry(registry: Registry) -> Result<Self, Error> {
        let reconcile_errors = IntCounter::with_opts(Opts::new(
            RECONCILE_ERRORS_METRIC,
            "Number of errors that occurred while reconciling Hello resources",
        ))?;
        registry.register(Box::new(reconcile_errors.clone()))?;

        Ok(Self {
            registry,
            reconcile_errors,
        })
    }

    /// Record one failed reconcile pass
    pub fn record_reconcile_error(&self) {
        self.reconcile_errors.inc();
    }

    /// Total failed reconcile passes recorded so far
    pub fn reconcile_errors(&self) -> u64 {
        self.reconcile_errors.get()
    }

    /// Render all registered metrics in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
