use anyhow::{Context, Result};
use clap::Parser;
use easel_core::{load_pipeline, EditService, GenerationService};
use easel_server::{config::Args, router, AppState};
use tokio::{net::TcpListener, signal};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easel_server=info,easel_core=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    // --- Load both pipelines once at startup ---
    let generation = load_pipeline(&args.generation_location, args.device_map(), args.dtype)
        .await
        .context("failed to load generation pipeline")?;
    let edit = load_pipeline(&args.edit_location, args.device_map(), args.dtype)
        .await
        .context("failed to load edit pipeline")?;
    let state = AppState::new(EditService::new(edit), GenerationService::new(generation));

    let app = router(state.clone(), args.body_limit);

    // --- Start the server ---
    let bind_address = args.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!("Started server on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.release();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}
