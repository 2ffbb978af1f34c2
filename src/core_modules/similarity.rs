// THEORY:
// The `SimilarityScorer` collapses three independent judgements into one
// confidence number in [0, 100]:
//
//   similarity = 100 · (w_c·S_color + w_s·S_shape + w_z·S_size) / (w_c + w_s + w_z)
//
// Each sub-score is in [0, 1] and the weights are non-negative, so the result
// is a convex combination and cannot leave [0, 100]. The color-adjacency and
// shape-strength rules are plain lookup tables so they can be extended without
// touching the scoring code.

use crate::config::{SimilarityWeights, SizeBuckets};
use crate::core_modules::classifier::{ColorClass, ColorConfidence, Shape, SizeLabel};
use crate::error::{Result, VisionError};

/// Score for a color that neighbors the expected one on the wheel.
pub const ADJACENT_COLOR_SCORE: f64 = 0.6;
/// Ratio distance from the bucket center at which the size score reaches 0.
pub const SIZE_SCORE_SPAN: f64 = 0.20;

/// Colors that are easily confused with each other.
const COLOR_ADJACENCY: &[(&str, &[&str])] = &[
    ("red", &["orange", "pink"]),
    ("orange", &["red", "yellow", "brown"]),
    ("yellow", &["orange", "green"]),
    ("green", &["yellow", "blue"]),
    ("blue", &["green", "purple"]),
    ("purple", &["blue", "pink"]),
    ("pink", &["purple", "red"]),
    ("brown", &["orange"]),
    ("black", &["gray"]),
    ("white", &["gray"]),
    ("gray", &["black", "white"]),
];

/// How convincing each shape label is on its own.
const SHAPE_STRENGTH: &[(Shape, f64)] = &[
    (Shape::Circle, 1.0),
    (Shape::Triangle, 1.0),
    (Shape::Rectangle, 1.0),
    (Shape::Polygon, 0.7),
    (Shape::Unknown, 0.4),
];

/// Confidence carried by each color classification outcome.
const COLOR_CONFIDENCE: &[(ColorConfidence, f64)] = &[
    (ColorConfidence::Exact, 1.0),
    (ColorConfidence::Borderline, ADJACENT_COLOR_SCORE),
    (ColorConfidence::Unlabeled, 0.0),
];

/// The three normalized sub-scores of one detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub color: f64,
    pub shape: f64,
    pub size: f64,
}

pub fn are_adjacent(a: &str, b: &str) -> bool {
    COLOR_ADJACENCY
        .iter()
        .find(|(name, _)| *name == a)
        .is_some_and(|(_, neighbors)| neighbors.contains(&b))
}

/// Color score against an expected color when one is given, otherwise the
/// confidence of the classification itself.
pub fn color_score(class: &ColorClass, target: Option<&str>) -> f64 {
    match target {
        Some(expected) if class.name == expected => 1.0,
        Some(expected) if are_adjacent(expected, &class.name) => ADJACENT_COLOR_SCORE,
        Some(_) => 0.0,
        None => COLOR_CONFIDENCE
            .iter()
            .find(|(confidence, _)| *confidence == class.confidence)
            .map_or(0.0, |(_, score)| *score),
    }
}

pub fn shape_score(shape: Shape) -> f64 {
    SHAPE_STRENGTH
        .iter()
        .find(|(s, _)| *s == shape)
        .map_or(0.0, |(_, score)| *score)
}

pub fn size_score(ratio: f64, size: SizeLabel, buckets: &SizeBuckets) -> f64 {
    (1.0 - (ratio - size.center(buckets)).abs() / SIZE_SCORE_SPAN).clamp(0.0, 1.0)
}

/// Weighted similarity in [0, 100], rounded to one decimal.
pub fn similarity(scores: &SubScores, weights: &SimilarityWeights) -> Result<f64> {
    let weights = weights.normalized().ok_or(VisionError::ZeroWeights)?;
    let total = weights.total();
    let weighted = weights.color * scores.color + weights.shape * scores.shape + weights.size * scores.size;
    let percent = (100.0 * weighted / total).clamp(0.0, 100.0);
    Ok((percent * 10.0).round() / 10.0)
}
