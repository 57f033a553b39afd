//! VTO Server - Main Entry Point
//!
//! Serves the product catalog and the virtual try-on API.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use vto_server::api::{run_server, AppState};
use vto_server::catalog::{load_catalog_file, seed_if_empty, seed_products, MemoryStore};
use vto_server::generation::{GeminiClient, ImageGenerator};
use vto_server::segmentation::configured_handle;
use vto_server::settings::ServerSettings;
use vto_server::telemetry::{init_logging, LogConfig};

#[derive(Debug, Parser)]
#[command(name = "vto-server", version, about = "Storefront and virtual try-on API server")]
struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, short)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// JSON file with the product catalog
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Do not seed the built-in products
    #[arg(long)]
    no_seed: bool,

    /// Disable photo-based torso detection
    #[arg(long)]
    no_segmentation: bool,

    /// ONNX body-part segmentation model
    #[arg(long)]
    model: Option<PathBuf>,

    /// JSON log output
    #[arg(long)]
    log_json: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, settings: &mut ServerSettings) {
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(bind) = &self.bind {
            settings.bind_address = bind.clone();
        }
        if let Some(catalog) = &self.catalog {
            settings.catalog_path = Some(catalog.display().to_string());
        }
        if self.no_seed {
            settings.seed_catalog = false;
        }
        if self.no_segmentation {
            settings.segmentation.enabled = false;
        }
        if let Some(model) = &self.model {
            settings.segmentation.model_path = Some(model.display().to_string());
        }
        if self.log_json {
            settings.logging.json = true;
        }
        if let Some(log_file) = &self.log_file {
            settings.logging.file = Some(log_file.display().to_string());
        }
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<ServerSettings> {
    let settings = match &cli.config {
        Some(path) => ServerSettings::load_from_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => ServerSettings::load_or_default(),
    };
    Ok(settings)
}

fn build_state(settings: &ServerSettings) -> anyhow::Result<AppState> {
    let store = Arc::new(MemoryStore::new());

    if let Some(path) = &settings.catalog_path {
        let products = load_catalog_file(Path::new(path))
            .with_context(|| format!("failed to load catalog from {}", path))?;
        let count = seed_if_empty(store.as_ref(), products)?;
        tracing::info!(count, path = %path, "Loaded catalog file");
    } else if settings.seed_catalog {
        seed_if_empty(store.as_ref(), seed_products())?;
    }

    if !settings.segmentation.enabled {
        tracing::info!("Segmentation disabled; placement is manual only");
    } else if settings.segmentation.model_path().is_none()
        && !settings.segmentation.silhouette_fallback
    {
        tracing::warn!("No segmentation model configured; auto-placement will answer 503");
    }
    let segmenter = configured_handle(&settings.segmentation);

    let mut state = AppState::new(store, segmenter)
        .with_placement(
            settings.placement.placement_config(),
            settings.placement.step_config(),
        )
        .with_calibration(settings.calibration);

    match ServerSettings::generation_api_key() {
        Some(api_key) => {
            let client = GeminiClient::new(
                api_key,
                settings.generation_base_url(),
                settings.generation.model.clone(),
                Duration::from_secs(settings.generation.timeout_secs),
            )?;
            let generator: Arc<dyn ImageGenerator> = Arc::new(client);
            state = state.with_generator(generator);
            tracing::info!(model = %settings.generation.model, "Image generation enabled");
        }
        None => tracing::warn!("No image model API key set; image generation disabled"),
    }

    Ok(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Settings come first so they can configure logging
    let loaded = load_settings(&cli);
    let mut settings = loaded.as_ref().cloned().unwrap_or_default();
    cli.apply(&mut settings);

    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&LogConfig::from_settings(&settings.logging)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("VTO Server v{}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = loaded {
        tracing::error!("{:#}", e);
        return Err(e);
    }

    if cli.save_config {
        let path = match &cli.config {
            Some(path) => {
                settings.save_to_file(path)?;
                path.clone()
            }
            None => settings.save()?,
        };
        tracing::info!("Settings saved to {}", path.display());
    }

    let state = build_state(&settings)?.into_handle();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            // Dropping the sender would stop the server
            std::future::pending::<()>().await;
        }
        let _ = shutdown_tx.send(true);
    });

    run_server(&settings, state, shutdown_rx)
        .await
        .context("server error")?;

    Ok(())
}
