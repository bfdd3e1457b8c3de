//! ONNX Runtime face-analysis backend.
//!
//! Runs a fused face-analysis model that reports detection boxes, 68-point
//! landmarks, expression scores, age and gender for every face in a single
//! forward pass. The model is a black box; this module only prepares the
//! input tensor and slices the per-face output records.

use crate::analyzer::{AnalyzerError, FaceAnalyzer};
use crate::geometry::{Dimensions, Point, Rect};
use crate::types::{Expression, ExpressionScores, FaceDetection, Gender};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

// --- Named constants (no magic numbers) ---
const INPUT_WIDTH: usize = 640;
const INPUT_HEIGHT: usize = 480;
const INPUT_MEAN: f32 = 127.5;
const INPUT_STD: f32 = 128.0;
const CONFIDENCE_THRESHOLD: f32 = 0.5;
/// Per-face record widths in the flat output tensors.
const BOX_FIELDS: usize = 5; // x, y, w, h, confidence
const LANDMARK_POINTS: usize = 68;
const EXPRESSION_FIELDS: usize = 7; // classifier output order, see Expression::ALL
const ATTRIBUTE_FIELDS: usize = 3; // age, male score, female score

/// Expected output tensor names, with positional fallback.
const OUTPUT_NAMES: [&str; 4] = ["boxes", "landmarks", "expressions", "attributes"];

/// Fused-model face analyzer.
pub struct OnnxAnalyzer {
    session: Session,
    /// Output indices for [boxes, landmarks, expressions, attributes].
    /// Discovered by name at load time; falls back to positional ordering.
    output_indices: [usize; 4],
}

impl OnnxAnalyzer {
    /// Load the fused face-analysis ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, AnalyzerError> {
        if !Path::new(model_path).exists() {
            return Err(AnalyzerError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?output_names,
            "loaded face-analysis model"
        );

        if output_names.len() < OUTPUT_NAMES.len() {
            return Err(AnalyzerError::InferenceFailed(format!(
                "model requires {} outputs (boxes/landmarks/expressions/attributes), got {}",
                OUTPUT_NAMES.len(),
                output_names.len()
            )));
        }

        let output_indices = discover_output_indices(&output_names);
        tracing::debug!(?output_indices, "output tensor mapping");

        Ok(Self {
            session,
            output_indices,
        })
    }

    /// Preprocess an RGB frame into a normalized NCHW tensor at working
    /// resolution. The frame is stretched per axis, so the inverse mapping
    /// back to display coordinates is the linear per-axis rescale the
    /// caller applies to the results.
    fn preprocess(&self, rgb: &[u8], width: usize, height: usize) -> Array4<f32> {
        let resized = resize_rgb_bilinear(rgb, width, height, INPUT_WIDTH, INPUT_HEIGHT);

        let mut tensor = Array4::<f32>::zeros((1, 3, INPUT_HEIGHT, INPUT_WIDTH));
        for y in 0..INPUT_HEIGHT {
            for x in 0..INPUT_WIDTH {
                let at = (y * INPUT_WIDTH + x) * 3;
                for c in 0..3 {
                    tensor[[0, c, y, x]] = (resized[at + c] as f32 - INPUT_MEAN) / INPUT_STD;
                }
            }
        }
        tensor
    }
}

impl FaceAnalyzer for OnnxAnalyzer {
    fn working_size(&self) -> Dimensions {
        Dimensions::new(INPUT_WIDTH as u32, INPUT_HEIGHT as u32)
    }

    fn analyze(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceDetection>, AnalyzerError> {
        let expected = width as usize * height as usize * 3;
        if rgb.len() < expected {
            return Err(AnalyzerError::InferenceFailed(format!(
                "frame buffer too short: expected {expected}, got {}",
                rgb.len()
            )));
        }

        let input = self.preprocess(rgb, width as usize, height as usize);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let [boxes_idx, landmarks_idx, expressions_idx, attributes_idx] = self.output_indices;

        let (_, boxes) = outputs[boxes_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("boxes: {e}")))?;
        let (_, landmarks) = outputs[landmarks_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("landmarks: {e}")))?;
        let (_, expressions) = outputs[expressions_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("expressions: {e}")))?;
        let (_, attributes) = outputs[attributes_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("attributes: {e}")))?;

        Ok(decode_faces(boxes, landmarks, expressions, attributes))
    }
}

/// Discover output tensor ordering by name.
///
/// Falls back to positional ordering [boxes, landmarks, expressions,
/// attributes] when the exported names are not recognized (some exports use
/// generic numeric names).
fn discover_output_indices(names: &[String]) -> [usize; 4] {
    let positions: Vec<Option<usize>> = OUTPUT_NAMES
        .iter()
        .map(|wanted| names.iter().position(|n| n == wanted))
        .collect();

    if positions.iter().all(|p| p.is_some()) {
        tracing::info!("using name-based output tensor mapping");
        std::array::from_fn(|i| positions[i].unwrap())
    } else {
        tracing::info!(
            ?names,
            "output names not recognized, using positional mapping [boxes, landmarks, expressions, attributes]"
        );
        [0, 1, 2, 3]
    }
}

/// Slice the flat per-face output tensors into [`FaceDetection`] records.
///
/// Faces below the confidence threshold are dropped. A face whose landmark,
/// expression or attribute record is truncated is dropped too; the model
/// contract is one complete record per detected face.
fn decode_faces(
    boxes: &[f32],
    landmarks: &[f32],
    expressions: &[f32],
    attributes: &[f32],
) -> Vec<FaceDetection> {
    let count = boxes.len() / BOX_FIELDS;
    let mut faces = Vec::new();

    for i in 0..count {
        let at = i * BOX_FIELDS;
        let confidence = boxes[at + 4];
        if confidence <= CONFIDENCE_THRESHOLD {
            continue;
        }

        let lm_at = i * LANDMARK_POINTS * 2;
        let ex_at = i * EXPRESSION_FIELDS;
        let attr_at = i * ATTRIBUTE_FIELDS;
        if lm_at + LANDMARK_POINTS * 2 > landmarks.len()
            || ex_at + EXPRESSION_FIELDS > expressions.len()
            || attr_at + ATTRIBUTE_FIELDS > attributes.len()
        {
            tracing::debug!(face = i, "truncated output record, dropping face");
            continue;
        }

        let rect = Rect {
            x: boxes[at],
            y: boxes[at + 1],
            width: boxes[at + 2],
            height: boxes[at + 3],
        };

        let points = (0..LANDMARK_POINTS)
            .map(|p| Point {
                x: landmarks[lm_at + p * 2],
                y: landmarks[lm_at + p * 2 + 1],
            })
            .collect();

        let scores = ExpressionScores::from_pairs(
            Expression::ALL
                .iter()
                .enumerate()
                .map(|(j, &e)| (e, expressions[ex_at + j])),
        );

        let age = attributes[attr_at];
        let gender = if attributes[attr_at + 1] >= attributes[attr_at + 2] {
            Gender::Male
        } else {
            Gender::Female
        };

        faces.push(FaceDetection {
            rect,
            confidence,
            landmarks: points,
            expressions: scores,
            age,
            gender,
        });
    }

    faces
}

/// Bilinear RGB resize (3 bytes per pixel).
fn resize_rgb_bilinear(
    rgb: &[u8],
    width: usize,
    height: usize,
    new_w: usize,
    new_h: usize,
) -> Vec<u8> {
    let mut resized = vec![0u8; new_w * new_h * 3];
    if width == 0 || height == 0 {
        return resized;
    }

    let inv_x = width as f32 / new_w as f32;
    let inv_y = height as f32 / new_h as f32;

    for y in 0..new_h {
        let src_y = (y as f32 + 0.5) * inv_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, height as i32 - 1) as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..new_w {
            let src_x = (x as f32 + 0.5) * inv_x - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, width as i32 - 1) as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            for c in 0..3 {
                let tl = rgb[(y0 * width + x0) * 3 + c] as f32;
                let tr = rgb[(y0 * width + x1) * 3 + c] as f32;
                let bl = rgb[(y1 * width + x0) * 3 + c] as f32;
                let br = rgb[(y1 * width + x1) * 3 + c] as f32;

                let val = tl * (1.0 - fx) * (1.0 - fy)
                    + tr * fx * (1.0 - fy)
                    + bl * (1.0 - fx) * fy
                    + br * fx * fy;

                resized[(y * new_w + x) * 3 + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    resized
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build flat output tensors for `n` faces with the given box records.
    fn outputs_for(
        boxes: Vec<[f32; 5]>,
    ) -> (Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>) {
        let n = boxes.len();
        let flat_boxes: Vec<f32> = boxes.into_iter().flatten().collect();
        let landmarks = vec![1.0f32; n * LANDMARK_POINTS * 2];
        let mut expressions = vec![0.0f32; n * EXPRESSION_FIELDS];
        for i in 0..n {
            // happy wins for every face
            expressions[i * EXPRESSION_FIELDS + 1] = 0.9;
        }
        let mut attributes = vec![0.0f32; n * ATTRIBUTE_FIELDS];
        for i in 0..n {
            attributes[i * ATTRIBUTE_FIELDS] = 30.0;
            attributes[i * ATTRIBUTE_FIELDS + 1] = 0.2;
            attributes[i * ATTRIBUTE_FIELDS + 2] = 0.8;
        }
        (flat_boxes, landmarks, expressions, attributes)
    }

    #[test]
    fn test_decode_single_face() {
        let (boxes, landmarks, expressions, attributes) =
            outputs_for(vec![[10.0, 20.0, 100.0, 120.0, 0.92]]);
        let faces = decode_faces(&boxes, &landmarks, &expressions, &attributes);

        assert_eq!(faces.len(), 1);
        let face = &faces[0];
        assert_eq!(face.rect.x, 10.0);
        assert_eq!(face.rect.height, 120.0);
        assert!((face.confidence - 0.92).abs() < 1e-6);
        assert_eq!(face.landmarks.len(), LANDMARK_POINTS);
        assert_eq!(face.expressions.dominant(), Ok(Expression::Happy));
        assert_eq!(face.age, 30.0);
        assert_eq!(face.gender, Gender::Female);
    }

    #[test]
    fn test_decode_threshold_filters_low_confidence() {
        let (boxes, landmarks, expressions, attributes) = outputs_for(vec![
            [0.0, 0.0, 10.0, 10.0, 0.4],
            [50.0, 50.0, 10.0, 10.0, 0.8],
        ]);
        let faces = decode_faces(&boxes, &landmarks, &expressions, &attributes);

        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].rect.x, 50.0);
    }

    #[test]
    fn test_decode_truncated_record_dropped() {
        let (boxes, landmarks, expressions, _) =
            outputs_for(vec![[0.0, 0.0, 10.0, 10.0, 0.9]]);
        // attributes tensor is short by one field
        let attributes = vec![30.0, 0.9];
        let faces = decode_faces(&boxes, &landmarks, &expressions, &attributes);
        assert!(faces.is_empty());
    }

    #[test]
    fn test_decode_empty_outputs() {
        assert!(decode_faces(&[], &[], &[], &[]).is_empty());
    }

    #[test]
    fn test_decode_expression_output_order() {
        let (boxes, landmarks, mut expressions, attributes) =
            outputs_for(vec![[0.0, 0.0, 10.0, 10.0, 0.9]]);
        // index 5 in the classifier output order is "disgusted"
        expressions.fill(0.1);
        expressions[5] = 0.7;
        let faces = decode_faces(&boxes, &landmarks, &expressions, &attributes);
        assert_eq!(faces[0].expressions.dominant(), Ok(Expression::Disgusted));
    }

    #[test]
    fn test_decode_gender_argmax_tie_is_male() {
        let (boxes, landmarks, expressions, mut attributes) =
            outputs_for(vec![[0.0, 0.0, 10.0, 10.0, 0.9]]);
        attributes[1] = 0.5;
        attributes[2] = 0.5;
        let faces = decode_faces(&boxes, &landmarks, &expressions, &attributes);
        assert_eq!(faces[0].gender, Gender::Male);
    }

    #[test]
    fn test_discover_output_indices_named() {
        let names: Vec<String> = ["landmarks", "attributes", "boxes", "expressions"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(discover_output_indices(&names), [2, 0, 3, 1]);
    }

    #[test]
    fn test_discover_output_indices_positional_fallback() {
        let names: Vec<String> = (0..4).map(|i: usize| i.to_string()).collect();
        assert_eq!(discover_output_indices(&names), [0, 1, 2, 3]);
    }

    #[test]
    fn test_bilinear_resize_uniform() {
        let frame = vec![128u8; 100 * 100 * 3];
        let resized = resize_rgb_bilinear(&frame, 100, 100, 200, 150);
        assert_eq!(resized.len(), 200 * 150 * 3);
        assert!(
            resized.iter().all(|&p| p == 128),
            "uniform resize should stay uniform"
        );
    }

    #[test]
    fn test_bilinear_resize_preserves_channels() {
        // Solid orange frame: R=255, G=128, B=0.
        let mut frame = Vec::with_capacity(8 * 8 * 3);
        for _ in 0..(8 * 8) {
            frame.extend_from_slice(&[255, 128, 0]);
        }
        let resized = resize_rgb_bilinear(&frame, 8, 8, 16, 16);
        for px in resized.chunks(3) {
            assert_eq!(px, [255, 128, 0]);
        }
    }
}
