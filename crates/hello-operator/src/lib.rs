//! Hello operator process: configuration, controller wiring and metrics endpoint

#![deny(missing_docs)]

/// Command line and environment configuration
pub mod config;
/// Controller construction
pub mod controller_runner;
/// Prometheus and health HTTP server
pub mod metrics_server;
