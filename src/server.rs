//! Process wiring for the two services: build state, bind, serve.

use crate::{
    config::{AnalyticsConfig, GatewayConfig},
    routes::routes::{analytics_routes, gateway_routes},
    services::{
        analytics_client::HttpAnalyticsClient, gateway_service::GatewayService,
        object_store::ObjectStore, s3_store::S3ObjectStore,
    },
};
use anyhow::{Context, Result};
use axum::Router;
use std::{
    io::ErrorKind,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::net::TcpListener;

/// Bind `addr`. Binding a wildcard address without permission falls back
/// to loopback on the same port.
pub async fn bind_listener(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            let Some(fallback_addr) = loopback_fallback(addr) else {
                return Err(err).with_context(|| format!("binding {}", addr));
            };
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(fallback_addr)
                .await
                .with_context(|| format!("binding {}", fallback_addr))
        }
        Err(err) => Err(err).with_context(|| format!("binding {}", addr)),
    }
}

/// Loopback on the same port, for wildcard addresses only.
fn loopback_fallback(addr: &str) -> Option<SocketAddr> {
    let addr: SocketAddr = addr.parse().ok()?;
    addr.ip()
        .is_unspecified()
        .then(|| SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port())))
}

/// Serve `app` until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Gateway router with its state attached.
pub fn gateway_app(service: GatewayService, max_upload_bytes: usize) -> Router {
    gateway_routes(max_upload_bytes).with_state(service)
}

pub fn analytics_app(max_upload_bytes: usize) -> Router {
    analytics_routes(max_upload_bytes)
}

/// Connect to the store, make sure the bucket exists, then serve the gateway.
/// Any failure before serving aborts startup.
pub async fn run_gateway(cfg: GatewayConfig) -> Result<()> {
    tracing::info!("Starting gateway with config: {:?}", cfg);

    let store = S3ObjectStore::new(&cfg.storage).context("creating object store client")?;
    store
        .ensure_bucket(&cfg.bucket)
        .await
        .with_context(|| format!("initializing bucket `{}` at {}", cfg.bucket, store.location()))?;
    tracing::info!("Bucket `{}` ready at {}", cfg.bucket, store.location());

    let analytics = HttpAnalyticsClient::new(cfg.analytics_url.clone(), cfg.analytics_timeout)
        .context("creating analytics client")?;

    let service = GatewayService::new(Arc::new(store), Arc::new(analytics), cfg.bucket.clone());
    let listener = bind_listener(&cfg.addr()).await?;
    serve(listener, gateway_app(service, cfg.max_upload_bytes)).await
}

pub async fn run_analytics(cfg: AnalyticsConfig) -> Result<()> {
    tracing::info!("Starting analytics worker with config: {:?}", cfg);
    let listener = bind_listener(&cfg.addr()).await?;
    serve(listener, analytics_app(cfg.max_upload_bytes)).await
}
