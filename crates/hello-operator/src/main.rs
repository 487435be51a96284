//! Hello Operator - reconciles Hello resources into Deployments

use std::sync::Arc;

use clap::Parser;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, CustomResourceExt};

use hello_common::crd::{Hello, HELLO_CRD_NAME};
use hello_common::telemetry::{init_telemetry, TelemetryConfig};
use hello_common::{OperatorMetrics, FIELD_MANAGER};
use hello_controller::Context;
use hello_operator::config::{Cli, OperatorConfig};
use hello_operator::controller_runner::build_hello_controller;
use hello_operator::metrics_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&Hello::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    let config = OperatorConfig::from(cli.controller_args());
    init_telemetry(TelemetryConfig {
        format: config.log_format,
        ..Default::default()
    })?;

    run_controller(config).await
}

/// Install the Hello CRD with server-side apply so its schema always
/// matches the running operator
async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    tracing::info!("Installing Hello CRD...");
    crds.patch(HELLO_CRD_NAME, &params, &Patch::Apply(&Hello::crd()))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to install Hello CRD: {}", e))?;

    tracing::info!("Hello CRD installed/updated");
    Ok(())
}

async fn run_controller(config: OperatorConfig) -> anyhow::Result<()> {
    tracing::info!(
        namespace = config.namespace.as_deref().unwrap_or("<all>"),
        image = %config.template.image,
        resync_secs = config.resync_interval.as_secs(),
        "Starting Hello operator"
    );

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if config.install_crds {
        ensure_crds_installed(&client).await?;
    }

    let metrics = OperatorMetrics::new()?;
    let server = tokio::spawn(metrics_server::serve(config.metrics_addr, metrics.clone()));

    let ctx = Arc::new(Context::from_client(
        client.clone(),
        metrics,
        config.template.clone(),
        config.resync_interval,
    ));

    tracing::info!("Starting controllers:");
    build_hello_controller(client, config.namespace.as_deref(), ctx).await;

    tracing::info!("Hello controller stopped, shutting down");
    server.abort();
    Ok(())
}
