//! Analyzer boundary — one batched inference call per frame.

use thiserror::Error;

use crate::geometry::Dimensions;
use crate::types::FaceDetection;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// A pretrained face-analysis backend.
///
/// One `analyze` call returns bounding boxes, 68-point landmarks, expression
/// scores, age and gender for every face in the frame; implementations must
/// not require one round-trip per attribute. Coordinates are reported in
/// [`working_size`] resolution; callers rescale before drawing.
///
/// Implementations may be stateful, hence `&mut self`.
///
/// [`working_size`]: FaceAnalyzer::working_size
pub trait FaceAnalyzer: Send {
    /// Resolution the analyzer reports coordinates in.
    fn working_size(&self) -> Dimensions;

    /// Analyze one RGB frame (`width * height * 3` bytes).
    fn analyze(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceDetection>, AnalyzerError>;
}
