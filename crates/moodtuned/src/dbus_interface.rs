use moodtune_core::Expression;
use moodtune_music::{genres, grid, SearchClient};
use zbus::interface;

use crate::session::SessionHandle;

/// D-Bus interface for the Moodtune daemon.
///
/// Bus name: org.moodtune.Moodtune1
/// Object path: /org/moodtune/Moodtune1
pub struct MoodtuneService {
    session: SessionHandle,
    music: Option<SearchClient>,
}

impl MoodtuneService {
    pub fn new(session: SessionHandle, music: Option<SearchClient>) -> Self {
        Self { session, music }
    }
}

#[interface(name = "org.moodtune.Moodtune1")]
impl MoodtuneService {
    /// Acquire the camera and start the detection loop.
    async fn start(&self) -> zbus::fdo::Result<()> {
        tracing::info!("start requested");
        self.session
            .start()
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Stop the detection loop and release the camera.
    async fn stop(&self) -> zbus::fdo::Result<()> {
        tracing::info!("stop requested");
        self.session
            .stop()
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let status = self
            .session
            .status()
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "active": status.active,
            "control_label": status.control_label,
            "expression": status.expression,
        })
        .to_string())
    }

    /// Last dominant expression, or the empty string before any detection.
    async fn expression(&self) -> zbus::fdo::Result<String> {
        Ok(self
            .session
            .expression()
            .map(|e| e.to_string())
            .unwrap_or_default())
    }

    /// Search tracks for a label and return the result grid as JSON rows.
    ///
    /// An empty label means "use the last detected expression". A label
    /// matching a known expression is routed through the genre mapping;
    /// anything else is sent as free text. A failed search renders nothing
    /// and is not retried.
    async fn recommend(&self, label: &str) -> zbus::fdo::Result<String> {
        let Some(music) = &self.music else {
            return Err(zbus::fdo::Error::Failed(
                "no search credential configured".into(),
            ));
        };

        let label = if label.is_empty() {
            self.session
                .expression()
                .map(|e| e.to_string())
                .ok_or_else(|| zbus::fdo::Error::Failed("no face detected".into()))?
        } else {
            label.to_string()
        };

        let query = match label.parse::<Expression>() {
            Ok(expression) => genres::search_query(expression).to_string(),
            Err(_) => label.clone(),
        };

        tracing::info!(label, query, "recommend requested");

        let tracks = music.search(&query).await.map_err(|e| {
            tracing::warn!(error = %e, "search failed, rendering nothing");
            zbus::fdo::Error::Failed(e.to_string())
        })?;

        let rows = grid::layout(&tracks);
        serde_json::to_string(&rows).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }
}
