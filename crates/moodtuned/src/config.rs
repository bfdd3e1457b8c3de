use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing the ONNX model file.
    pub model_dir: PathBuf,
    /// Detection loop period in milliseconds.
    pub poll_interval_ms: u64,
    /// Number of warmup frames to discard after camera open (AGC/AE
    /// stabilization).
    pub warmup_frames: usize,
    /// Track-search endpoint.
    pub search_endpoint: String,
    /// Maximum number of tracks per search.
    pub search_limit: u32,
    /// Bearer token for the search endpoint; recommendations are disabled
    /// without it.
    pub search_token: Option<String>,
}

impl Config {
    /// Load configuration from `MOODTUNE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("MOODTUNE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| moodtune_core::default_model_dir());

        Self {
            camera_device: std::env::var("MOODTUNE_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir,
            poll_interval_ms: env_u64("MOODTUNE_POLL_INTERVAL_MS", 100),
            warmup_frames: env_usize("MOODTUNE_WARMUP_FRAMES", 4),
            search_endpoint: std::env::var("MOODTUNE_SEARCH_URL")
                .unwrap_or_else(|_| moodtune_music::DEFAULT_SEARCH_ENDPOINT.to_string()),
            search_limit: env_u32("MOODTUNE_SEARCH_LIMIT", 50),
            search_token: std::env::var("MOODTUNE_SEARCH_TOKEN").ok(),
        }
    }

    /// Path to the fused face-analysis model.
    pub fn model_path(&self) -> String {
        self.model_dir
            .join("face_analysis.onnx")
            .to_string_lossy()
            .into_owned()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
