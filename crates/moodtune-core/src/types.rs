use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{scale_point, scale_rect, Dimensions, Point, Rect};

/// The seven expression labels the classifier emits, in its fixed output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Expression {
    /// Classifier output order.
    pub const ALL: [Expression; 7] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown expression label: {0}")]
pub struct UnknownExpression(String);

impl std::str::FromStr for Expression {
    type Err = UnknownExpression;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neutral" => Ok(Expression::Neutral),
            "happy" => Ok(Expression::Happy),
            "sad" => Ok(Expression::Sad),
            "angry" => Ok(Expression::Angry),
            "fearful" => Ok(Expression::Fearful),
            "disgusted" => Ok(Expression::Disgusted),
            // "surprise" is what the preset buttons historically sent.
            "surprised" | "surprise" => Ok(Expression::Surprised),
            other => Err(UnknownExpression(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
        })
    }
}

/// Requested a dominant expression from an empty score set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no face detected")]
pub struct NoFaceDetected;

/// Per-face expression confidences in [0, 1].
///
/// Keeps insertion order: a tied maximum resolves to the label inserted
/// first, deterministically for a given input order. Callers must not
/// assume stability across differently-ordered inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpressionScores {
    entries: Vec<(Expression, f32)>,
}

impl ExpressionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Expression, f32)>) -> Self {
        let mut scores = Self::new();
        for (expression, score) in pairs {
            scores.insert(expression, score);
        }
        scores
    }

    /// Insert or update a score. Updating keeps the label's original position.
    pub fn insert(&mut self, expression: Expression, score: f32) {
        if let Some(entry) = self.entries.iter_mut().find(|(e, _)| *e == expression) {
            entry.1 = score;
        } else {
            self.entries.push((expression, score));
        }
    }

    pub fn get(&self, expression: Expression) -> Option<f32> {
        self.entries
            .iter()
            .find(|(e, _)| *e == expression)
            .map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Expression, f32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The label with the maximum score; ties go to the first inserted.
    pub fn dominant(&self) -> Result<Expression, NoFaceDetected> {
        let mut max = f32::NEG_INFINITY;
        for &(_, score) in &self.entries {
            if score > max {
                max = score;
            }
        }
        self.entries
            .iter()
            .find(|&&(_, score)| score == max)
            .map(|&(expression, _)| expression)
            .ok_or(NoFaceDetected)
    }
}

/// Everything the analyzer reports for one detected face in one pass.
///
/// Recomputed every tick; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDetection {
    pub rect: Rect,
    pub confidence: f32,
    /// 68-point landmark contour, in model order.
    pub landmarks: Vec<Point>,
    pub expressions: ExpressionScores,
    pub age: f32,
    pub gender: Gender,
}

impl FaceDetection {
    /// Rescale all geometry from `from` resolution into `to` resolution.
    ///
    /// Scores, age and gender are resolution-independent and carried over.
    pub fn scaled_to(&self, from: Dimensions, to: Dimensions) -> FaceDetection {
        FaceDetection {
            rect: scale_rect(self.rect, from, to),
            confidence: self.confidence,
            landmarks: self
                .landmarks
                .iter()
                .map(|&p| scale_point(p, from, to))
                .collect(),
            expressions: self.expressions.clone(),
            age: self.age,
            gender: self.gender,
        }
    }

    /// Label of the form "34 year old male".
    pub fn age_gender_label(&self) -> String {
        format!("{} year old {}", self.age.round() as i64, self.gender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_unique_maximum() {
        let scores = ExpressionScores::from_pairs([
            (Expression::Happy, 0.9),
            (Expression::Sad, 0.1),
        ]);
        assert_eq!(scores.dominant(), Ok(Expression::Happy));
    }

    #[test]
    fn test_dominant_tie_first_inserted_wins() {
        let scores = ExpressionScores::from_pairs([
            (Expression::Happy, 0.5),
            (Expression::Neutral, 0.5),
        ]);
        assert_eq!(scores.dominant(), Ok(Expression::Happy));

        // Same values, opposite insertion order.
        let scores = ExpressionScores::from_pairs([
            (Expression::Neutral, 0.5),
            (Expression::Happy, 0.5),
        ]);
        assert_eq!(scores.dominant(), Ok(Expression::Neutral));
    }

    #[test]
    fn test_dominant_empty_is_error() {
        let scores = ExpressionScores::new();
        assert_eq!(scores.dominant(), Err(NoFaceDetected));
    }

    #[test]
    fn test_dominant_full_classifier_output() {
        let scores = ExpressionScores::from_pairs(
            Expression::ALL
                .iter()
                .map(|&e| (e, if e == Expression::Angry { 0.62 } else { 0.05 })),
        );
        assert_eq!(scores.dominant(), Ok(Expression::Angry));
    }

    #[test]
    fn test_insert_update_keeps_position() {
        let mut scores = ExpressionScores::from_pairs([
            (Expression::Happy, 0.3),
            (Expression::Sad, 0.3),
        ]);
        // Raising sad then re-inserting happy at the same value must not
        // move happy behind sad.
        scores.insert(Expression::Happy, 0.5);
        scores.insert(Expression::Sad, 0.5);
        assert_eq!(scores.dominant(), Ok(Expression::Happy));
        assert_eq!(scores.len(), 2);
    }

    #[test]
    fn test_expression_parse_alias() {
        assert_eq!(
            "surprised".parse::<Expression>().unwrap(),
            Expression::Surprised
        );
        assert_eq!(
            "surprise".parse::<Expression>().unwrap(),
            Expression::Surprised
        );
        assert!("joyful".parse::<Expression>().is_err());
    }

    #[test]
    fn test_age_gender_label() {
        let detection = FaceDetection {
            rect: Rect {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
            confidence: 0.9,
            landmarks: vec![],
            expressions: ExpressionScores::new(),
            age: 33.7,
            gender: Gender::Male,
        };
        assert_eq!(detection.age_gender_label(), "34 year old male");
    }

    #[test]
    fn test_scaled_to_rescales_rect_and_landmarks() {
        let detection = FaceDetection {
            rect: Rect {
                x: 64.0,
                y: 48.0,
                width: 128.0,
                height: 96.0,
            },
            confidence: 0.8,
            landmarks: vec![Point { x: 64.0, y: 48.0 }, Point { x: 128.0, y: 96.0 }],
            expressions: ExpressionScores::from_pairs([(Expression::Happy, 1.0)]),
            age: 30.0,
            gender: Gender::Female,
        };

        let scaled = detection.scaled_to(Dimensions::new(640, 480), Dimensions::new(1280, 960));
        assert_eq!(scaled.rect.x, 128.0);
        assert_eq!(scaled.rect.height, 192.0);
        assert_eq!(scaled.landmarks[0], Point { x: 128.0, y: 96.0 });
        assert_eq!(scaled.landmarks[1], Point { x: 256.0, y: 192.0 });
        assert_eq!(scaled.expressions.dominant(), Ok(Expression::Happy));
    }
}
