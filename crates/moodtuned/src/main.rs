use anyhow::Result;
use moodtune_music::SearchClient;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod glyphs;
mod overlay;
mod poller;
mod session;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("moodtuned starting");

    let config = Config::from_env();

    let music = config
        .search_token
        .clone()
        .map(|token| SearchClient::new(config.search_endpoint.clone(), token, config.search_limit));
    if music.is_none() {
        tracing::warn!("MOODTUNE_SEARCH_TOKEN not set, recommendations disabled");
    }

    let session = session::spawn_session(config);
    let service = dbus_interface::MoodtuneService::new(session.clone(), music);

    let _conn = zbus::connection::Builder::session()?
        .name("org.moodtune.Moodtune1")?
        .serve_at("/org/moodtune/Moodtune1", service)?
        .build()
        .await?;

    tracing::info!("moodtuned ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("moodtuned shutting down");

    let _ = session.stop().await;

    Ok(())
}
