use anyhow::Result;
use clap::Parser;
use matbakh_server::ai::{GeminiRecipeClient, PromptComposer};
use matbakh_server::image::ImageNormalizer;
use matbakh_server::models::Config;
use matbakh_server::pipeline::{PipelineServices, RecipePipeline};
use matbakh_server::server::{create_router, AppState};
use matbakh_server::storage::{BlobStore, S3BlobStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "matbakh-server")]
#[command(about = "Recipe generation API server")]
struct CliArgs {
    /// Address to bind, e.g. 0.0.0.0:8787
    #[arg(long, default_value = "0.0.0.0:8787")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matbakh_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting matbakh-server");

    let args = CliArgs::parse();
    let config = Config::from_env()?;

    let state = build_state(&config).await;
    let app = create_router(state, config.max_body_bytes);

    let listener = TcpListener::bind(args.bind).await?;
    info!("Listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn build_state(config: &Config) -> AppState {
    let Some(api_key) = config.gemini_api_key.clone() else {
        warn!("GEMINI_API_KEY not set; requests will be rejected until it is configured");
        return AppState { pipeline: None };
    };

    let generation = Box::new(GeminiRecipeClient::new(
        api_key,
        config.gemini_model.clone(),
        Duration::from_secs(config.generation_timeout_secs),
    ));
    info!("Generation model: {}", config.gemini_model);

    let storage: Option<Box<dyn BlobStore>> = match &config.storage {
        Some(storage_config) => match S3BlobStore::new(storage_config).await {
            Ok(store) => {
                info!("Blob storage configured (bucket: {})", storage_config.bucket);
                Some(Box::new(store))
            }
            Err(e) => {
                warn!("Blob storage unavailable: {}; images will be sent inline", e);
                None
            }
        },
        None => None,
    };

    let pipeline = RecipePipeline::with_services(
        PipelineServices {
            generation,
            storage,
        },
        PromptComposer::new(config.structured_output),
        ImageNormalizer::new(config.image_edge_bound, config.image_jpeg_quality),
        config.image_transport,
    );

    AppState {
        pipeline: Some(Arc::new(pipeline)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
