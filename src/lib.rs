pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod ports;
pub mod push;
pub mod registry;
pub mod state;
pub mod subscription;
pub mod types;

pub use app::app;
pub use push::VapidCredentials;

use tracing::info;

pub async fn serve(config: config::AppConfig) -> std::io::Result<()> {
    let addr = config.bind;
    if config.supabase.is_none() {
        info!("no durable store configured, subscriptions are kept in memory only");
    }
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app(config)).await
}
