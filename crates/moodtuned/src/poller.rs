//! Timer-driven detection loop.
//!
//! Runs on a dedicated OS thread at a fixed period. A single thread means
//! ticks can never overlap; a tick that overruns its slot skips the missed
//! ticks instead of queueing them. Stopping the session takes effect at the
//! next tick boundary: an in-flight tick finishes its draw, the following
//! boundary observes the inactive flag, clears the overlay in full and
//! halts. Nothing is drawn after that.

use std::sync::Arc;
use std::time::Instant;

use moodtune_core::{AnalyzerError, Dimensions, Expression, FaceAnalyzer};
use moodtune_hw::{CameraError, FrameSource};
use thiserror::Error;
use tokio::sync::watch;

use crate::overlay::Overlay;

/// A single tick's failure. Logged and swallowed; a faulty tick never
/// kills the loop.
#[derive(Error, Debug)]
pub enum TickError {
    #[error("capture: {0}")]
    Capture(#[from] CameraError),
    #[error("analyze: {0}")]
    Analyze(#[from] AnalyzerError),
}

pub struct Poller<S, A> {
    source: S,
    analyzer: A,
    overlay: Overlay,
    period: std::time::Duration,
    active: watch::Receiver<bool>,
    expression: Arc<watch::Sender<Option<Expression>>>,
}

impl<S: FrameSource, A: FaceAnalyzer> Poller<S, A> {
    /// Set up a poller with a fresh overlay sized to the source's natural
    /// frame dimensions. Any previous overlay belonged to a previous poller
    /// and is gone with it.
    pub fn new(
        source: S,
        analyzer: A,
        period: std::time::Duration,
        active: watch::Receiver<bool>,
        expression: Arc<watch::Sender<Option<Expression>>>,
    ) -> Self {
        let (width, height) = source.dimensions();
        Self {
            source,
            analyzer,
            overlay: Overlay::new(Dimensions::new(width, height)),
            period,
            active,
            expression,
        }
    }

    /// Drive the loop until the active flag drops. Consumes the poller; the
    /// frame source is released when this returns.
    pub fn run(mut self) {
        tracing::info!(
            period_ms = self.period.as_millis() as u64,
            width = self.overlay.dimensions().width,
            height = self.overlay.dimensions().height,
            "detection poller running"
        );

        let mut next = Instant::now() + self.period;
        loop {
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            }
            next += self.period;
            let now = Instant::now();
            if next <= now {
                // The previous tick overran; drop the missed slots rather
                // than running them back to back.
                tracing::debug!("tick overran its period, skipping missed slots");
                next = now + self.period;
            }

            if !*self.active.borrow() {
                break;
            }

            if let Err(err) = self.tick() {
                tracing::warn!(error = %err, "detection tick failed, continuing");
            }
        }

        // Final full clear; nothing is drawn once the loop goes idle.
        self.overlay.clear();
        tracing::info!("detection poller stopped");
    }

    /// One detection pass, in strict order: capture, one batched inference
    /// call, clear the overlay, rescale to surface coordinates, draw,
    /// publish the dominant label.
    fn tick(&mut self) -> Result<(), TickError> {
        let frame = self.source.capture()?;
        let detections = self
            .analyzer
            .analyze(&frame.data, frame.width, frame.height)?;

        self.overlay.clear();

        let working = self.analyzer.working_size();
        let display = self.overlay.dimensions();
        for detection in &detections {
            let scaled = detection.scaled_to(working, display);
            self.overlay.draw_face(&scaled);
            if let Ok(dominant) = scaled.expressions.dominant() {
                // Last face in detection order wins. A tick with no faces
                // leaves the previous value in place.
                self.expression.send_replace(Some(dominant));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodtune_core::{ExpressionScores, FaceDetection, Gender, Point, Rect};
    use moodtune_hw::Frame;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const TEST_DIMS: (u32, u32) = (64, 48);
    const PERIOD: Duration = Duration::from_millis(5);

    struct TestSource;

    impl FrameSource for TestSource {
        fn dimensions(&self) -> (u32, u32) {
            TEST_DIMS
        }

        fn capture(&mut self) -> Result<Frame, CameraError> {
            Ok(Frame {
                data: vec![0; (TEST_DIMS.0 * TEST_DIMS.1 * 3) as usize],
                width: TEST_DIMS.0,
                height: TEST_DIMS.1,
                timestamp: Instant::now(),
                sequence: 0,
            })
        }
    }

    struct ScriptedAnalyzer {
        calls: Arc<AtomicUsize>,
        delay: Duration,
        faces: Vec<FaceDetection>,
    }

    impl FaceAnalyzer for ScriptedAnalyzer {
        fn working_size(&self) -> Dimensions {
            Dimensions::new(TEST_DIMS.0, TEST_DIMS.1)
        }

        fn analyze(
            &mut self,
            _rgb: &[u8],
            _width: u32,
            _height: u32,
        ) -> Result<Vec<FaceDetection>, AnalyzerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            Ok(self.faces.clone())
        }
    }

    fn happy_face() -> FaceDetection {
        FaceDetection {
            rect: Rect {
                x: 10.0,
                y: 10.0,
                width: 20.0,
                height: 20.0,
            },
            confidence: 0.9,
            landmarks: vec![Point { x: 12.0, y: 12.0 }],
            expressions: ExpressionScores::from_pairs([
                (Expression::Happy, 0.9),
                (Expression::Sad, 0.1),
            ]),
            age: 30.0,
            gender: Gender::Male,
        }
    }

    fn spawn_poller(
        faces: Vec<FaceDetection>,
        delay: Duration,
    ) -> (
        Arc<AtomicUsize>,
        watch::Sender<bool>,
        watch::Receiver<Option<Expression>>,
        std::thread::JoinHandle<()>,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let (active_tx, active_rx) = watch::channel(true);
        let (expression_tx, expression_rx) = watch::channel(None);
        let analyzer = ScriptedAnalyzer {
            calls: calls.clone(),
            delay,
            faces,
        };
        let poller = Poller::new(
            TestSource,
            analyzer,
            PERIOD,
            active_rx,
            Arc::new(expression_tx),
        );
        let handle = std::thread::spawn(move || poller.run());
        (calls, active_tx, expression_rx, handle)
    }

    #[test]
    fn test_ticks_repeat_while_active() {
        let (calls, active_tx, expression_rx, handle) =
            spawn_poller(vec![happy_face()], Duration::ZERO);

        std::thread::sleep(Duration::from_millis(60));
        active_tx.send_replace(false);
        handle.join().unwrap();

        assert!(
            calls.load(Ordering::SeqCst) >= 2,
            "expected repeated ticks, got {}",
            calls.load(Ordering::SeqCst)
        );
        assert_eq!(*expression_rx.borrow(), Some(Expression::Happy));
    }

    #[test]
    fn test_stop_allows_at_most_one_more_tick() {
        let (calls, active_tx, _expression_rx, handle) =
            spawn_poller(vec![happy_face()], Duration::from_millis(30));

        // Let the first (slow) tick get in flight, then stop mid-tick.
        std::thread::sleep(Duration::from_millis(10));
        let before = calls.load(Ordering::SeqCst);
        active_tx.send_replace(false);
        handle.join().unwrap();
        let after = calls.load(Ordering::SeqCst);

        assert!(
            after <= before + 1,
            "in-flight tick may finish but no new tick may start: before={before}, after={after}"
        );
    }

    #[test]
    fn test_no_ticks_after_halt() {
        let (calls, active_tx, _expression_rx, handle) =
            spawn_poller(vec![happy_face()], Duration::ZERO);

        std::thread::sleep(Duration::from_millis(20));
        active_tx.send_replace(false);
        handle.join().unwrap();

        let settled = calls.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(calls.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn test_no_faces_retains_previous_expression() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (active_tx, active_rx) = watch::channel(true);
        let (expression_tx, expression_rx) = watch::channel(Some(Expression::Sad));
        let analyzer = ScriptedAnalyzer {
            calls: calls.clone(),
            delay: Duration::ZERO,
            faces: vec![],
        };
        let poller = Poller::new(
            TestSource,
            analyzer,
            PERIOD,
            active_rx,
            Arc::new(expression_tx),
        );
        let handle = std::thread::spawn(move || poller.run());

        std::thread::sleep(Duration::from_millis(30));
        active_tx.send_replace(false);
        handle.join().unwrap();

        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(*expression_rx.borrow(), Some(Expression::Sad));
    }
}
