//! moodtune-core — Face-analysis domain model.
//!
//! Detection, 68-point landmarks, expression scores, age and gender all come
//! from one pretrained model running via ONNX Runtime for CPU inference.
//! This crate owns the result types, the analyzer boundary, geometry
//! rescaling and dominant-expression extraction.

use std::path::PathBuf;

pub mod analyzer;
pub mod geometry;
pub mod onnx;
pub mod types;

pub use analyzer::{AnalyzerError, FaceAnalyzer};
pub use geometry::{Dimensions, Point, Rect};
pub use onnx::OnnxAnalyzer;
pub use types::{Expression, ExpressionScores, FaceDetection, Gender, NoFaceDetected};

/// Default directory for the bundled ONNX model.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("moodtune/models")
}
