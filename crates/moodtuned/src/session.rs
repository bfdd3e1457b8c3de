//! Capture session lifecycle.
//!
//! A dedicated worker thread owns the camera handle and the poller, so
//! blocking device and inference work never lands on the async runtime.
//! Async callers hold a clone-safe [`SessionHandle`] and talk to the worker
//! over channels.

use std::sync::Arc;

use moodtune_core::{AnalyzerError, Expression, OnnxAnalyzer};
use moodtune_hw::{Camera, CameraError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::Config;
use crate::poller::Poller;

const LABEL_ACTIVE: &str = "Stop Camera";
const LABEL_INACTIVE: &str = "Start Camera";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),
    #[error("session already active")]
    AlreadyActive,
    #[error("session thread exited")]
    ChannelClosed,
}

/// Snapshot of the session state.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub active: bool,
    pub control_label: &'static str,
    pub expression: Option<Expression>,
}

/// Messages sent from async handlers to the session worker thread.
enum SessionRequest {
    Start {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
}

/// Clone-safe handle to the session worker thread.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
    expression: watch::Receiver<Option<Expression>>,
}

impl SessionHandle {
    /// Acquire the camera and start the detection poller.
    pub async fn start(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Start { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Stop the poller and release the camera. Returns after the poller's
    /// final overlay clear. Safe to call when already inactive.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Stop { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Status { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Last dominant expression, without a round-trip to the worker.
    pub fn expression(&self) -> Option<Expression> {
        *self.expression.borrow()
    }
}

/// Spawn the session worker on a dedicated OS thread.
pub fn spawn_session(config: Config) -> SessionHandle {
    let (tx, mut rx) = mpsc::channel::<SessionRequest>(4);
    let (expression_tx, expression_rx) = watch::channel(None);

    std::thread::Builder::new()
        .name("moodtune-session".into())
        .spawn(move || {
            let mut worker = SessionWorker {
                config,
                expression: Arc::new(expression_tx),
                active: None,
                poller: None,
            };
            tracing::info!("session worker started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    SessionRequest::Start { reply } => {
                        let _ = reply.send(worker.start());
                    }
                    SessionRequest::Stop { reply } => {
                        worker.stop();
                        let _ = reply.send(());
                    }
                    SessionRequest::Status { reply } => {
                        let _ = reply.send(worker.status());
                    }
                }
            }
            // All handles dropped: release the camera before exiting.
            worker.stop();
            tracing::info!("session worker exiting");
        })
        .expect("failed to spawn session thread");

    SessionHandle {
        tx,
        expression: expression_rx,
    }
}

struct SessionWorker {
    config: Config,
    expression: Arc<watch::Sender<Option<Expression>>>,
    /// Present exactly while a poller is running; dropping it to `None`
    /// is what "inactive" means.
    active: Option<watch::Sender<bool>>,
    poller: Option<std::thread::JoinHandle<()>>,
}

impl SessionWorker {
    fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Acquire the camera, load the analyzer and start polling.
    ///
    /// Camera denial or a missing model aborts the start and leaves the
    /// session inactive; the error is reported to the caller, never
    /// retried here.
    fn start(&mut self) -> Result<(), SessionError> {
        if self.is_active() {
            return Err(SessionError::AlreadyActive);
        }

        let camera = Camera::open(&self.config.camera_device)?;
        tracing::info!(
            device = %camera.device_path,
            width = camera.width,
            height = camera.height,
            fourcc = ?camera.fourcc,
            "camera acquired"
        );

        // Discard warmup frames for camera AGC/AE stabilization.
        for _ in 0..self.config.warmup_frames {
            let _ = camera.capture_frame();
        }

        let analyzer = OnnxAnalyzer::load(&self.config.model_path())?;

        let (active_tx, active_rx) = watch::channel(true);
        let poller = Poller::new(
            camera,
            analyzer,
            self.config.poll_interval(),
            active_rx,
            self.expression.clone(),
        );
        let handle = std::thread::Builder::new()
            .name("moodtune-poller".into())
            .spawn(move || poller.run())
            .expect("failed to spawn poller thread");

        self.active = Some(active_tx);
        self.poller = Some(handle);
        tracing::info!("session active");
        Ok(())
    }

    /// Drop the active flag and wait for the poller to halt; the camera is
    /// released when the poller thread finishes. Idempotent.
    fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.send_replace(false);
        if let Some(handle) = self.poller.take() {
            let _ = handle.join();
        }
        tracing::info!("session inactive");
    }

    fn status(&self) -> SessionStatus {
        let active = self.is_active();
        SessionStatus {
            active,
            control_label: if active { LABEL_ACTIVE } else { LABEL_INACTIVE },
            expression: *self.expression.borrow(),
        }
    }
}
