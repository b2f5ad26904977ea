use anyhow::Result;
use log::info;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::api;
use crate::cache::DocumentCache;
use crate::core::config::NportConfig;
use crate::core::service::HoldingsService;
use crate::edgar::client::EdgarClient;

/// Serves the holdings API until `shutdown` resolves, then removes the
/// document cache.
///
/// The listener is bound before the cache directory is created, so a
/// failed bind leaves nothing behind.
pub async fn run(
    config: &NportConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let client = EdgarClient::new(
        &config.user_agent,
        config.http_timeout,
        config.edgar_data_url.clone(),
        config.edgar_archives_url.clone(),
    )?;

    let listener = TcpListener::bind(config.bind_addr).await?;

    let cache = Arc::new(DocumentCache::open(
        config.cache_dir.clone(),
        config.cache_capacity,
    )?);
    info!(
        "Document cache at {:?} (capacity {})",
        cache.root(),
        cache.capacity()
    );

    let app = api::router(HoldingsService::new(Arc::new(client), Arc::clone(&cache)));
    info!("Starting server on {}", listener.local_addr()?);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    // Runs once the server has stopped accepting requests, whether or not
    // it stopped cleanly.
    cache.teardown().await?;
    served?;

    info!("Server shut down gracefully");
    Ok(())
}
