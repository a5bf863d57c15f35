use kube::Client;
use tokio::signal;
use tracing::info;

use entando_operator::{OperatorConfig, run_controller, run_database_controller};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("entando_operator=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .init();

    info!("Starting entando-operator");

    // A malformed compliance mode is a startup error, never a silent default
    let config = OperatorConfig::from_env()?;
    info!(
        compliance_mode = %config.compliance_mode,
        scope = config.watch_namespace.as_deref().unwrap_or("cluster-wide"),
        "Loaded operator configuration"
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Watching EntandoKeycloakServer resources (apiVersion: entando.org/v1)");
    info!("Watching EntandoDatabaseService resources (apiVersion: entando.org/v1)");

    let server_controller = {
        let client = client.clone();
        let config = config.clone();
        tokio::spawn(async move {
            run_controller(client, config).await;
        })
    };

    let database_controller = {
        let client = client.clone();
        let config = config.clone();
        tokio::spawn(async move {
            run_database_controller(client, config).await;
        })
    };

    // Wait for any controller to exit, or a shutdown signal
    tokio::select! {
        result = server_controller => {
            if let Err(e) = result {
                tracing::error!("Server controller task panicked: {}", e);
            }
        }
        result = database_controller => {
            if let Err(e) = result {
                tracing::error!("Database controller task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down");
        }
    }

    info!("Operator stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
