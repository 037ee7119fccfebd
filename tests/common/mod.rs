#![allow(dead_code)]

use axum::Router;
use dataset_gateway::{
    server::{analytics_app, gateway_app},
    services::{
        analytics_client::HttpAnalyticsClient, gateway_service::GatewayService,
        memory_store::MemoryObjectStore,
    },
};
use reqwest::multipart::{Form, Part};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;

pub const BUCKET: &str = "datasets";
pub const MAX_UPLOAD: usize = 1024 * 1024;

/// Serve `app` on an ephemeral loopback port and return its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// URL of a loopback port nobody listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// URL of a loopback port that accepts connections and never answers.
pub async fn silent_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

pub async fn spawn_analytics() -> String {
    spawn(analytics_app(MAX_UPLOAD)).await
}

/// Gateway backed by an in-memory store and the worker at `analytics_url`.
pub async fn spawn_gateway_with(
    analytics_url: &str,
    max_upload: usize,
) -> (String, Arc<MemoryObjectStore>) {
    spawn_gateway_with_timeout(analytics_url, max_upload, Duration::from_secs(5)).await
}

pub async fn spawn_gateway_with_timeout(
    analytics_url: &str,
    max_upload: usize,
    timeout: Duration,
) -> (String, Arc<MemoryObjectStore>) {
    let store = Arc::new(MemoryObjectStore::with_bucket(BUCKET));
    let analytics = HttpAnalyticsClient::new(analytics_url, timeout).unwrap();
    let service = GatewayService::new(store.clone(), Arc::new(analytics), BUCKET);
    (spawn(gateway_app(service, max_upload)).await, store)
}

/// Gateway wired to a live analytics worker.
pub async fn spawn_stack() -> (String, Arc<MemoryObjectStore>) {
    let analytics = spawn_analytics().await;
    spawn_gateway_with(&analytics, MAX_UPLOAD).await
}

pub fn file_form(name: &str, content_type: &str, body: &[u8]) -> Form {
    let part = Part::bytes(body.to_vec())
        .file_name(name.to_string())
        .mime_str(content_type)
        .unwrap();
    Form::new().part("file", part)
}
