// THEORY:
// Configuration comes in two layers.
//
// 1. `FrameConfig` arrives with every frame. It is the wire form, parsed with
//    wide numeric types so a client can send anything; `validated()` clamps
//    each tunable into its legal range (logging every clamp) and produces an
//    `EffectiveConfig`. The only value that cannot be repaired is a set of
//    weights that sums to zero, which rejects the frame.
// 2. `DetectorSettings` is fixed for a session: the color palette, size
//    buckets, morphology and blur strengths, and tracker timing. Defaults
//    reproduce the stock detector; a JSON file can override any subset.

use crate::core_modules::color_segmenter::{ColorRange, default_palette};
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

pub const DEFAULT_MIN_AREA_PX: i64 = 500;
pub const DEFAULT_MIN_SIMILARITY: f64 = 70.0;
pub const DEFAULT_SPEAK_COOLDOWN_MS: i64 = 2000;
pub const DEFAULT_MAX_FPS: i64 = 15;
pub const DEFAULT_DOWNSCALE_WIDTH: i64 = 640;

/// Relative importance of the three similarity sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub color: f64,
    pub shape: f64,
    pub size: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            color: 0.45,
            shape: 0.45,
            size: 0.10,
        }
    }
}

impl SimilarityWeights {
    pub fn total(&self) -> f64 {
        self.color + self.shape + self.size
    }

    /// Scales the weights so the largest is 1. Ratios are unchanged and the
    /// total stays finite. `None` when no weight is positive.
    pub fn normalized(&self) -> Option<Self> {
        let largest = self.color.max(self.shape).max(self.size);
        if !(largest > 0.0 && largest.is_finite()) {
            return None;
        }
        Some(Self {
            color: self.color / largest,
            shape: self.shape / largest,
            size: self.size / largest,
        })
    }
}

/// Per-frame tunables as received from the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub min_area_px: i64,
    pub min_similarity: f64,
    pub speak_cooldown_ms: i64,
    pub max_fps: i64,
    pub downscale_width: i64,
    pub weights: SimilarityWeights,
    /// Expected color for a "find the red thing" use case. When absent the
    /// color score reflects classification confidence instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_color: Option<String>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            min_area_px: DEFAULT_MIN_AREA_PX,
            min_similarity: DEFAULT_MIN_SIMILARITY,
            speak_cooldown_ms: DEFAULT_SPEAK_COOLDOWN_MS,
            max_fps: DEFAULT_MAX_FPS,
            downscale_width: DEFAULT_DOWNSCALE_WIDTH,
            weights: SimilarityWeights::default(),
            target_color: None,
        }
    }
}

/// Per-frame tunables after clamping; every field is in range.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub min_area_px: u32,
    pub min_similarity: f64,
    pub speak_cooldown_ms: u64,
    pub max_fps: u32,
    pub downscale_width: u32,
    pub weights: SimilarityWeights,
    pub target_color: Option<String>,
}

impl EffectiveConfig {
    /// Processing budget for one frame at the configured rate.
    pub fn frame_budget_ms(&self) -> u64 {
        1000 / self.max_fps as u64
    }
}

fn clamp_int(name: &str, value: i64, min: i64, max: i64) -> i64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(field = name, value, clamped, "config value out of range, clamping");
    }
    clamped
}

fn clamp_float(name: &str, value: f64, min: f64, max: f64) -> f64 {
    let clamped = if value.is_nan() { min } else { value.clamp(min, max) };
    if clamped != value {
        warn!(field = name, value, clamped, "config value out of range, clamping");
    }
    clamped
}

impl FrameConfig {
    /// Clamps every tunable into range. Fails only when the weights sum to zero.
    pub fn validated(&self) -> Result<EffectiveConfig> {
        let weights = SimilarityWeights {
            color: clamp_float("weights.color", self.weights.color, 0.0, f64::MAX),
            shape: clamp_float("weights.shape", self.weights.shape, 0.0, f64::MAX),
            size: clamp_float("weights.size", self.weights.size, 0.0, f64::MAX),
        }
        .normalized()
        .ok_or(VisionError::ZeroWeights)?;

        Ok(EffectiveConfig {
            min_area_px: clamp_int("min_area_px", self.min_area_px, 1, u32::MAX as i64) as u32,
            min_similarity: clamp_float("min_similarity", self.min_similarity, 0.0, 100.0),
            speak_cooldown_ms: clamp_int("speak_cooldown_ms", self.speak_cooldown_ms, 0, i64::MAX) as u64,
            max_fps: clamp_int("max_fps", self.max_fps, 1, 1000) as u32,
            downscale_width: clamp_int("downscale_width", self.downscale_width, 1, u32::MAX as i64) as u32,
            weights,
            target_color: self.target_color.as_ref().map(|c| c.trim().to_lowercase()),
        })
    }
}

/// Boundaries of the small / medium / large buckets, as fractions of the
/// frame area covered by a blob's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeBuckets {
    /// Ratios below this are small.
    pub small_max: f64,
    /// Ratios below this (and at least `small_max`) are medium.
    pub medium_max: f64,
    /// Reference ratio for the open-ended large bucket.
    pub large_center: f64,
}

impl Default for SizeBuckets {
    fn default() -> Self {
        Self {
            small_max: 0.03,
            medium_max: 0.12,
            large_center: 0.20,
        }
    }
}

/// Identity tracking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Maximum centroid displacement between frames, as a fraction of frame width.
    pub gate_width_fraction: f64,
    /// Unmatched frames before an identity is considered lost.
    pub grace_frames: u32,
    /// Further unmatched frames before a lost identity is retired.
    pub retirement_frames: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            gate_width_fraction: 60.0 / 640.0,
            grace_frames: 3,
            retirement_frames: 12,
        }
    }
}

/// Static, per-session detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub palette: Vec<ColorRange>,
    /// Largest normalized HSV distance still accepted as a borderline color match.
    pub color_tolerance: f32,
    pub size_buckets: SizeBuckets,
    /// Radius of the square structuring element (2 gives a 5x5 element).
    pub morphology_radius: u32,
    /// Gaussian sigma applied by the preprocessor; 0 disables smoothing.
    pub blur_sigma: f32,
    /// Polygon simplification tolerance as a fraction of contour perimeter.
    pub polygon_tolerance: f64,
    pub tracker: TrackerSettings,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            color_tolerance: 0.08,
            size_buckets: SizeBuckets::default(),
            morphology_radius: 2,
            blur_sigma: 1.0,
            polygon_tolerance: 0.02,
            tracker: TrackerSettings::default(),
        }
    }
}

impl DetectorSettings {
    /// Loads settings from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: DetectorSettings = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.palette.is_empty() {
            return Err(VisionError::Settings("palette is empty".to_string()));
        }
        for range in &self.palette {
            if range.bounds.is_empty() {
                return Err(VisionError::Settings(format!("color '{}' has no bounds", range.name)));
            }
            if range.bounds.iter().any(|b| !b.is_ordered()) {
                return Err(VisionError::Settings(format!("color '{}' has inverted bounds", range.name)));
            }
        }
        let buckets = &self.size_buckets;
        if !(0.0 < buckets.small_max && buckets.small_max < buckets.medium_max && buckets.medium_max <= 1.0) {
            return Err(VisionError::Settings("size buckets must satisfy 0 < small_max < medium_max <= 1".to_string()));
        }
        if self.tracker.gate_width_fraction <= 0.0 {
            return Err(VisionError::Settings("tracker gate must be positive".to_string()));
        }
        if self.polygon_tolerance <= 0.0 {
            return Err(VisionError::Settings("polygon tolerance must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_unchanged() {
        let effective = FrameConfig::default().validated().unwrap();
        assert_eq!(effective.min_area_px, 500);
        assert_eq!(effective.min_similarity, 70.0);
        assert_eq!(effective.speak_cooldown_ms, 2000);
        assert_eq!(effective.frame_budget_ms(), 66);
        assert!(DetectorSettings::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = FrameConfig {
            min_area_px: -5,
            min_similarity: 250.0,
            speak_cooldown_ms: -1,
            max_fps: 0,
            downscale_width: 0,
            weights: SimilarityWeights { color: -1.0, shape: 1.0, size: 0.0 },
            target_color: Some(" Red ".to_string()),
        };
        let effective = config.validated().unwrap();
        assert_eq!(effective.min_area_px, 1);
        assert_eq!(effective.min_similarity, 100.0);
        assert_eq!(effective.speak_cooldown_ms, 0);
        assert_eq!(effective.max_fps, 1);
        assert_eq!(effective.downscale_width, 1);
        assert_eq!(effective.weights.color, 0.0);
        assert_eq!(effective.target_color.as_deref(), Some("red"));
    }

    #[test]
    fn zero_weights_reject_the_frame() {
        let config = FrameConfig {
            weights: SimilarityWeights { color: 0.0, shape: 0.0, size: 0.0 },
            ..FrameConfig::default()
        };
        assert!(matches!(config.validated(), Err(VisionError::ZeroWeights)));

        let negative = FrameConfig {
            weights: SimilarityWeights { color: -1.0, shape: -2.0, size: 0.0 },
            ..FrameConfig::default()
        };
        assert!(matches!(negative.validated(), Err(VisionError::ZeroWeights)));
    }

    #[test]
    fn huge_finite_weights_are_accepted() {
        let config = FrameConfig {
            weights: SimilarityWeights { color: 1e308, shape: 1e308, size: 0.0 },
            ..FrameConfig::default()
        };
        let effective = config.validated().unwrap();
        assert_eq!(effective.weights, SimilarityWeights { color: 1.0, shape: 1.0, size: 0.0 });
        assert!(effective.weights.total().is_finite());
    }

    #[test]
    fn normalization_keeps_ratios() {
        let effective = FrameConfig::default().validated().unwrap();
        let w = effective.weights;
        assert_eq!(w.color, 1.0);
        assert!((w.size / w.shape - 0.10 / 0.45).abs() < 1e-12);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: FrameConfig = serde_json::from_str(r#"{"min_area_px": 40, "weights": {"size": 0.5}}"#).unwrap();
        assert_eq!(config.min_area_px, 40);
        assert_eq!(config.weights.size, 0.5);
        assert_eq!(config.weights.color, 0.45);
        assert_eq!(config.downscale_width, DEFAULT_DOWNSCALE_WIDTH);

        let settings: DetectorSettings = serde_json::from_str(r#"{"tracker": {"grace_frames": 5}}"#).unwrap();
        assert_eq!(settings.tracker.grace_frames, 5);
        assert_eq!(settings.tracker.retirement_frames, 12);
        assert_eq!(settings.palette.len(), 11);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut settings = DetectorSettings::default();
        settings.size_buckets.small_max = 0.5;
        assert!(settings.validate().is_err());

        let empty = DetectorSettings { palette: Vec::new(), ..DetectorSettings::default() };
        assert!(matches!(empty.validate(), Err(VisionError::Settings(_))));
    }
}
