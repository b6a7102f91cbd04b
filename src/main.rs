mod adapters;
mod application;
mod config;
mod domain;
#[cfg(test)]
mod test_support;

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::{
    http::{router, state::{ConnectionTracker, HttpState}},
    onnx::{
        model_catalog::OnnxModelCatalog,
        ort_engine::{EngineOptions, OrtEngine},
        pipeline::FramePipeline,
    },
};
use crate::application::buffer_pool::BufferPools;
use crate::application::services::{ModelService, PipelineService};
use crate::config::ServerConfig;
use crate::domain::model::ModelId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logs (RUST_LOG=info por defecto)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServerConfig::from_env()?;
    let model = ModelId::from_path(&cfg.model_path);

    // 2. Metadatos del modelo: sin nombres de clase seguimos con `cls<id>`
    let metadata = ModelService::new(Arc::new(OnnxModelCatalog::new()))
        .metadata(&model)
        .await
        .context("model artifact unavailable")?;
    if let Some(task) = metadata.prop("task") {
        info!(task, "model task");
    }
    if let Some(description) = metadata.prop("description") {
        info!(description, "model description");
    }

    // 3. Motor ONNX: cualquier fallo aquí es fatal
    let engine = OrtEngine::load(
        &model.onnx_path,
        &EngineOptions { intra_threads: cfg.intra_threads, use_cuda: cfg.use_cuda },
    )?;
    info!(path = %model.onnx_path.display(), classes = metadata.class_names.len(), "model loaded");

    // 4. Pools y pipeline compartidos por todas las conexiones
    let pools = Arc::new(BufferPools::new(cfg.params.input_size as usize, cfg.pool_max_idle));
    let pipeline = Arc::new(FramePipeline::new(
        Arc::new(engine),
        Arc::clone(&pools),
        Arc::new(metadata.class_names),
        cfg.params,
    ));
    let pipeline_service = Arc::new(PipelineService::new(pipeline));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let connections = Arc::new(ConnectionTracker::default());
    let state = HttpState {
        pipeline: Arc::clone(&pipeline_service),
        pools: Arc::clone(&pools),
        shutdown: shutdown_rx,
        connections: Arc::clone(&connections),
    };

    // 5. Servidor
    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, "server started");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutting down, draining streams");
            pipeline_service.mark_unloaded();
            let _ = shutdown_tx.send(true);
        })
        .await?;

    // 6. Dar a las conexiones vivas la oportunidad de terminar su frame
    if tokio::time::timeout(cfg.shutdown_grace, connections.drained()).await.is_err() {
        warn!(live = connections.live(), "grace period elapsed with streams still open");
    }
    info!(
        tensor_buffers = pools.tensors.allocated(),
        tensors_idle = pools.tensors.idle(),
        reply_buffers = pools.bytes.allocated(),
        replies_idle = pools.bytes.idle(),
        "server stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
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
}
