//! Command line and environment configuration

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};

use hello_common::telemetry::LogFormat;
use hello_common::{DEFAULT_METRICS_PORT, DEFAULT_RESYNC_SECS};
use hello_controller::deployment::DEFAULT_IMAGE;
use hello_controller::WorkloadTemplate;

/// Hello operator - keeps a Deployment and its pod list in sync with each Hello
#[derive(Parser, Debug)]
#[command(name = "hello-operator", version, about, long_about = None)]
pub struct Cli {
    /// Print the Hello CRD manifest and exit
    #[arg(long)]
    pub crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Operator modes
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Hello controller (default mode)
    Controller(ControllerArgs),
}

impl Cli {
    /// Controller settings, falling back to environment and defaults when no
    /// subcommand was given
    pub fn controller_args(self) -> ControllerArgs {
        match self.command {
            Some(Commands::Controller(args)) => args,
            None => ControllerArgs::parse_from(["controller"]),
        }
    }
}

/// Settings for the controller subcommand
#[derive(Parser, Debug, Clone)]
pub struct ControllerArgs {
    /// Namespace to watch; empty watches all namespaces
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Image run by managed Deployments
    #[arg(long, env = "HELLO_IMAGE", default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Port serving /metrics and /healthz
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Seconds between resyncs of a converged Hello
    #[arg(long, env = "RESYNC_SECS", default_value_t = DEFAULT_RESYNC_SECS)]
    pub resync_secs: u64,

    /// Install or update the Hello CRD on startup
    #[arg(long, env = "INSTALL_CRDS")]
    pub install_crds: bool,

    /// Log line format (json or text)
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
}

/// Resolved runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorConfig {
    /// Watched namespace, `None` for cluster-wide
    pub namespace: Option<String>,
    /// Container settings for managed Deployments
    pub template: WorkloadTemplate,
    /// Bind address of the metrics server
    pub metrics_addr: SocketAddr,
    /// Requeue delay after a successful reconcile
    pub resync_interval: Duration,
    /// Whether to apply the CRD before starting
    pub install_crds: bool,
    /// Log line format
    pub log_format: LogFormat,
}

impl From<ControllerArgs> for OperatorConfig {
    fn from(args: ControllerArgs) -> Self {
        let namespace = Some(args.namespace.trim().to_string()).filter(|ns| !ns.is_empty());
        Self {
            namespace,
            template: WorkloadTemplate::with_image(args.image),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], args.metrics_port)),
            resync_interval: Duration::from_secs(args.resync_secs),
            install_crds: args.install_crds,
            log_format: args.log_format,
        }
    }
}
