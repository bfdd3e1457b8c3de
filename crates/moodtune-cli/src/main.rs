use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[zbus::proxy(
    interface = "org.moodtune.Moodtune1",
    default_service = "org.moodtune.Moodtune1",
    default_path = "/org/moodtune/Moodtune1"
)]
trait Moodtune {
    async fn start(&self) -> zbus::Result<()>;
    async fn stop(&self) -> zbus::Result<()>;
    async fn status(&self) -> zbus::Result<String>;
    async fn expression(&self) -> zbus::Result<String>;
    async fn recommend(&self, label: &str) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "moodtune", about = "Moodtune expression-to-music CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the camera and detection loop
    Start,
    /// Stop the camera
    Stop,
    /// Show daemon status
    Status,
    /// Print the last detected dominant expression
    Expression,
    /// Fetch track recommendations for an emotion label
    Recommend {
        /// Emotion label (e.g., "happy"); omit to use the last detected expression
        label: Option<String>,
    },
    /// List available camera devices
    Devices,
    /// Capture a single frame and save it as PNG (bypasses the daemon)
    Snapshot {
        /// Camera device path
        #[arg(short, long, default_value = "/dev/video0")]
        device: String,
        /// Output file
        #[arg(short, long, default_value = "snapshot.png")]
        output: PathBuf,
    },
}

#[derive(serde::Deserialize)]
struct TrackItem {
    name: String,
    #[allow(dead_code)]
    album_image_url: Option<String>,
    external_url: String,
}

async fn proxy() -> Result<MoodtuneProxy<'static>> {
    let conn = zbus::Connection::session()
        .await
        .context("connect to session bus")?;
    MoodtuneProxy::new(&conn)
        .await
        .context("connect to moodtuned")
}

fn print_grid(raw: &str) -> Result<()> {
    let rows: Vec<Vec<TrackItem>> =
        serde_json::from_str(raw).context("parse recommendation grid")?;
    if rows.is_empty() {
        println!("no tracks found");
        return Ok(());
    }
    for (i, row) in rows.iter().enumerate() {
        println!("row {}:", i + 1);
        for track in row {
            println!("  {}  {}", track.name, track.external_url);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            proxy().await?.start().await?;
            println!("camera started");
        }
        Commands::Stop => {
            proxy().await?.stop().await?;
            println!("camera stopped");
        }
        Commands::Status => {
            let raw = proxy().await?.status().await?;
            let status: serde_json::Value = serde_json::from_str(&raw)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Expression => {
            let expression = proxy().await?.expression().await?;
            if expression.is_empty() {
                println!("no face detected yet");
            } else {
                println!("{expression}");
            }
        }
        Commands::Recommend { label } => {
            let raw = proxy()
                .await?
                .recommend(label.as_deref().unwrap_or_default())
                .await?;
            print_grid(&raw)?;
        }
        Commands::Devices => {
            let devices = moodtune_hw::Camera::list_devices();
            if devices.is_empty() {
                println!("no capture devices found");
            }
            for d in devices {
                println!("{}  {} ({})", d.path, d.name, d.driver);
            }
        }
        Commands::Snapshot { device, output } => {
            let camera = moodtune_hw::Camera::open(&device)?;
            let frame = camera.capture_frame()?;
            let image = image::RgbImage::from_raw(frame.width, frame.height, frame.data)
                .context("frame buffer size mismatch")?;
            image
                .save(&output)
                .with_context(|| format!("write {}", output.display()))?;
            println!(
                "saved {}x{} snapshot to {}",
                frame.width,
                frame.height,
                output.display()
            );
        }
    }

    Ok(())
}
