// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use smart_menu_node::{
    api::{serve, AppState},
    catalog::{seed_catalog, spawn_reconcile_task, MenuCatalog},
    cli::Cli,
    config::NodeConfig,
    embeddings::{Encoder, HashingEncoder, OnnxEncoder},
    inference::{Generator, OpenAiCompatGenerator},
    rag::{ensure_dimensions, ChatPipeline, IndexSynchronizer, Retriever},
    vector::{InMemoryVectorStore, VectorStore},
};
use std::{env, sync::Arc, time::Duration};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.env_file {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("{}", smart_menu_node::version::get_version_string());

    let mut config = NodeConfig::from_env();
    cli.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    // Encoder and generator handles live for the whole process and are
    // dropped after the server stops
    let encoder = build_encoder(&config).await?;
    let store: Arc<dyn VectorStore> =
        Arc::new(InMemoryVectorStore::new(config.embedding_dimension));
    ensure_dimensions(encoder.as_ref(), store.as_ref())
        .context("Encoder output does not match the configured embedding dimension")?;

    let synchronizer = Arc::new(IndexSynchronizer::new(encoder.clone(), store.clone()));
    let catalog = Arc::new(MenuCatalog::new(synchronizer));

    if config.seed_demo_menu {
        let added = seed_catalog(&catalog)
            .await
            .context("Failed to seed demo menu")?;
        info!(items = added, "demo menu ready");
    }
    let report = catalog
        .reconcile()
        .await
        .context("Startup index consistency check failed")?;
    if report.violations() > 0 {
        warn!(repaired = report.violations(), "index drift repaired at startup");
    }

    let generator: Arc<dyn Generator> =
        Arc::new(OpenAiCompatGenerator::new(config.generator_config())?);
    let retriever = Retriever::new(encoder, store).with_top_k(config.top_k);
    let pipeline = Arc::new(ChatPipeline::new(retriever, generator));

    let shutdown = CancellationToken::new();
    let reconcile_task = (config.reconcile_interval_secs > 0).then(|| {
        spawn_reconcile_task(
            catalog.clone(),
            Duration::from_secs(config.reconcile_interval_secs),
            shutdown.clone(),
        )
    });

    let state = AppState::new(catalog, pipeline, config.session_config());
    let addr = config.socket_addr().map_err(|e| anyhow!(e))?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let server_token = shutdown.clone();
    serve(addr, state, async move { server_token.cancelled().await }).await?;

    shutdown.cancel();
    if let Some(task) = reconcile_task {
        let _ = task.await;
    }
    info!("Smart menu node stopped");
    Ok(())
}

async fn build_encoder(config: &NodeConfig) -> Result<Arc<dyn Encoder>> {
    match (&config.encoder.model_path, &config.encoder.tokenizer_path) {
        (Some(model_path), Some(tokenizer_path)) => {
            let encoder =
                OnnxEncoder::new(&config.encoder.model_name, model_path, tokenizer_path).await?;
            Ok(Arc::new(encoder))
        }
        _ => {
            warn!(
                dimension = config.embedding_dimension,
                "No ONNX model configured, using the hashing encoder"
            );
            Ok(Arc::new(HashingEncoder::new(config.embedding_dimension)))
        }
    }
}
