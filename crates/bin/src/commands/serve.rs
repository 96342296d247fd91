//! Serve command: exposes a data model over the native and HTTP transports.
//!
//! The served provider stack, from the outside in:
//!
//! - a [`DelegatingProvider`] that forwards chained addresses to their next hop,
//! - a [`NodeProvider`] splitting off the `directory` prefix,
//! - an [`ObservableProvider`] logging every mutation,
//! - a [`ConsistencyProvider`] exposing the clock and freeze flag,
//! - the data store itself (JSON file, file-system tree or empty memory).

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Json, Router, extract::State, routing::get};
use tokio::signal::unix::{SignalKind, signal};
use vab::{
    ModelProvider, Value,
    consistency::ConsistencyProvider,
    directory::{DirectoryProvider, InMemoryDirectory},
    gateway::DelegatingProvider,
    hooks::{MutationEvent, ObservableProvider},
    provider::{FileSystemProvider, MapProvider},
    transport::{
        RawProvider,
        http::{self, HttpServer},
        json::JsonProvider,
        native::{NativeServer, NativeTransportConfig},
    },
};

use crate::{cli::ServeArgs, node::NodeProvider};

type DataProvider = ObservableProvider<ConsistencyProvider<Arc<dyn ModelProvider>>>;

/// Where the served data lives.
enum Store {
    /// In memory, optionally persisted to a JSON file on shutdown.
    Memory {
        provider: Arc<MapProvider>,
        file: Option<PathBuf>,
    },
    /// A directory tree on disk.
    Files(Arc<FileSystemProvider>),
}

impl Store {
    async fn open(data: Option<&PathBuf>) -> vab::Result<Self> {
        let Some(path) = data else {
            tracing::info!("No data path given, serving an empty in-memory model");
            return Ok(Store::Memory {
                provider: Arc::new(MapProvider::default()),
                file: None,
            });
        };

        if tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
        {
            tracing::info!("Serving directory {}", path.display());
            return Ok(Store::Files(Arc::new(FileSystemProvider::open(path).await?)));
        }

        let provider = if tokio::fs::try_exists(path).await? {
            let provider = MapProvider::load_from_file(path).await?;
            tracing::info!("Loaded model from {}", path.display());
            provider
        } else {
            tracing::warn!("{} does not exist yet, starting with an empty model", path.display());
            MapProvider::new(Value::structure())
        };
        Ok(Store::Memory {
            provider: Arc::new(provider),
            file: Some(path.clone()),
        })
    }

    fn provider(&self) -> Arc<dyn ModelProvider> {
        match self {
            Store::Memory { provider, .. } => provider.clone(),
            Store::Files(provider) => provider.clone(),
        }
    }

    async fn persist(&self) {
        let Store::Memory {
            provider,
            file: Some(file),
        } = self
        else {
            return;
        };
        match provider.save_to_file(file).await {
            Ok(()) => {
                tracing::info!("Model saved to {}", file.display());
                println!("\nModel saved successfully");
            }
            Err(e) => {
                tracing::error!("Failed to save model: {e}");
                eprintln!("Failed to save model: {e}");
            }
        }
    }
}

#[derive(Clone)]
struct HealthState {
    data: Arc<DataProvider>,
    native_address: String,
}

/// Handler for GET /health
async fn handle_health(State(state): State<HealthState>) -> Json<serde_json::Value> {
    let consistency = state.data.inner();
    Json(serde_json::json!({
        "status": "healthy",
        "clock": consistency.clock(),
        "frozen": consistency.is_frozen(),
        "native": state.native_address,
    }))
}

fn log_mutation(event: &MutationEvent) -> vab::Result<()> {
    tracing::info!(kind = ?event.kind, path = %event.path, "Model changed");
    Ok(())
}

async fn wait_for_shutdown() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
    }
    Ok(())
}

/// Run the serve command
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(args.timeout);
    let store = Store::open(args.data.as_ref()).await?;

    let data = Arc::new(ObservableProvider::new(ConsistencyProvider::with_state_element(
        store.provider(),
        args.state_element.clone(),
    )));
    data.subscribe(Arc::new(log_mutation));

    let directory = DirectoryProvider::new(Arc::new(InMemoryDirectory::new()));
    let node = NodeProvider::new(directory, data.clone());
    let gateway = DelegatingProvider::with_local(super::network_resolver(timeout)?, Arc::new(node));
    let handler: Arc<dyn RawProvider> = Arc::new(JsonProvider::new(Arc::new(gateway)));

    let mut native = NativeServer::new(NativeTransportConfig::default().with_timeout(timeout));
    native
        .start_server(&format!("{}:{}", args.host, args.native_port), handler.clone())
        .await?;
    let native_address = native.get_server_address()?;

    let app = Router::new()
        .route("/health", get(handle_health))
        .with_state(HealthState {
            data,
            native_address: native_address.clone(),
        })
        .merge(http::router(handler));
    let mut web = HttpServer::new();
    web.start_router(&format!("{}:{}", args.host, args.http_port), app)
        .await?;
    let http_address = web.get_server_address()?;

    println!("VAB server started");
    println!();
    println!("  native: vab://{native_address}");
    println!("  http:   http://{http_address}");
    println!();
    println!("Available endpoints:");
    println!("  GET    /health       - Server health, clock and freeze state");
    println!("  GET    /<path>       - Read");
    println!("  PUT    /<path>       - Write");
    println!("  POST   /<path>       - Create");
    println!("  POST   /<path>?{}  - Invoke", http::INVOKE_QUERY);
    println!("  DELETE /<path>       - Delete");
    println!("  PATCH  /<path>       - Delete a collection member");
    println!();
    println!("Press Ctrl+C to shutdown");

    wait_for_shutdown().await?;

    native.stop_server().await?;
    web.stop_server().await?;
    store.persist().await;

    println!("Server shut down");
    Ok(())
}
