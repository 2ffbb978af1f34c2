// THEORY:
// The `Classifier` gives every blob three human-readable labels.
//
// - Shape comes from (circularity, solidity, edge count) through an ordered
//   rule table; the first rule that matches wins, so a region that also meets
//   the polygon rule is still a circle.
// - Color comes from the median HSV sample of the pixels inside the region
//   (not its bounding box), matched against the palette. A sample inside some
//   range is an exact match; one just outside is a borderline match; anything
//   else is unlabeled. This is where overlapping color masks get resolved.
// - Size comes from the fraction of the frame covered by the bounding box.

use crate::config::SizeBuckets;
use crate::core_modules::blob_detector::Blob;
use crate::core_modules::color_segmenter::{ColorRange, HsvImage};
use crate::core_modules::pixel::pixel::{HUE_SCALE, HsvPixel};
use std::fmt;

/// Color name reported when no palette entry is close enough.
pub const UNLABELED_COLOR: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Circle,
    Triangle,
    Rectangle,
    Polygon,
    Unknown,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Circle => "circle",
            Shape::Triangle => "triangle",
            Shape::Rectangle => "rectangle",
            Shape::Polygon => "polygon",
            Shape::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SizeLabel {
    Small,
    Medium,
    Large,
}

impl SizeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeLabel::Small => "small",
            SizeLabel::Medium => "medium",
            SizeLabel::Large => "large",
        }
    }

    /// Representative ratio of the bucket: the midpoint of its range, or the
    /// configured reference for the open-ended large bucket.
    pub fn center(&self, buckets: &SizeBuckets) -> f64 {
        match self {
            SizeLabel::Small => buckets.small_max / 2.0,
            SizeLabel::Medium => (buckets.small_max + buckets.medium_max) / 2.0,
            SizeLabel::Large => buckets.large_center,
        }
    }
}

impl fmt::Display for SizeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How well the sampled color fits its palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorConfidence {
    /// The sample lies inside one of the color's ranges.
    Exact,
    /// The sample lies just outside, within the configured tolerance.
    Borderline,
    /// No palette entry was close enough.
    Unlabeled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorClass {
    pub name: String,
    pub confidence: ColorConfidence,
}

/// Geometric descriptors used for shape classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeFeatures {
    pub circularity: f64,
    pub solidity: f64,
    pub edges: usize,
}

impl From<&Blob> for ShapeFeatures {
    fn from(blob: &Blob) -> Self {
        Self {
            circularity: blob.circularity,
            solidity: blob.solidity,
            edges: blob.edges,
        }
    }
}

fn is_circle(f: &ShapeFeatures) -> bool {
    f.circularity >= 0.80 && f.solidity >= 0.90 && f.edges >= 6
}

fn is_triangle(f: &ShapeFeatures) -> bool {
    f.edges == 3 && f.solidity >= 0.85
}

fn is_rectangle(f: &ShapeFeatures) -> bool {
    f.edges == 4 && f.solidity >= 0.85
}

fn is_polygon(f: &ShapeFeatures) -> bool {
    f.edges >= 5 && f.solidity >= 0.80
}

type ShapeRule = (Shape, fn(&ShapeFeatures) -> bool);

/// Evaluated top to bottom; the first match wins.
const SHAPE_RULES: [ShapeRule; 4] = [
    (Shape::Circle, is_circle),
    (Shape::Triangle, is_triangle),
    (Shape::Rectangle, is_rectangle),
    (Shape::Polygon, is_polygon),
];

pub fn classify_shape(features: &ShapeFeatures) -> Shape {
    SHAPE_RULES
        .iter()
        .find(|(_, rule)| rule(features))
        .map(|(shape, _)| *shape)
        .unwrap_or(Shape::Unknown)
}

pub fn classify_size(ratio: f64, buckets: &SizeBuckets) -> SizeLabel {
    if ratio < buckets.small_max {
        SizeLabel::Small
    } else if ratio < buckets.medium_max {
        SizeLabel::Medium
    } else {
        SizeLabel::Large
    }
}

fn lower_median(values: &mut [u8]) -> u8 {
    let middle = (values.len() - 1) / 2;
    *values.select_nth_unstable(middle).1
}

/// Median hue that respects the wheel: the hues are cut open at the widest
/// empty arc, so a red region straddling 0/179 has a red median.
fn circular_median_hue(hues: &[u8]) -> u8 {
    let mut histogram = [0u32; HUE_SCALE as usize];
    for &h in hues {
        histogram[h as usize] += 1;
    }

    let scale = HUE_SCALE as usize;
    let (mut best_end, mut best_len, mut run) = (0usize, 0usize, 0usize);
    // Two laps so runs crossing the 179 -> 0 seam are measured whole.
    for i in 0..2 * scale {
        if histogram[i % scale] == 0 {
            run += 1;
            if run > best_len && run <= scale {
                best_len = run;
                best_end = (i + 1) % scale;
            }
        } else {
            run = 0;
        }
    }

    let offset = if best_len == 0 { 0 } else { best_end };
    let mut rotated: Vec<u8> = hues
        .iter()
        .map(|&h| ((h as usize + scale - offset) % scale) as u8)
        .collect();
    let median = lower_median(&mut rotated) as usize;
    ((median + offset) % scale) as u8
}

/// Median HSV of the region's own pixels.
pub fn median_sample(blob: &Blob, hsv: &HsvImage) -> HsvPixel {
    let samples: Vec<HsvPixel> = blob.pixels.iter().map(|p| hsv.get(p.x as u32, p.y as u32)).collect();
    if samples.is_empty() {
        return HsvPixel::default();
    }

    let hues: Vec<u8> = samples.iter().map(|s| s.hue).collect();
    let mut saturations: Vec<u8> = samples.iter().map(|s| s.saturation).collect();
    let mut values: Vec<u8> = samples.iter().map(|s| s.value).collect();

    HsvPixel {
        hue: circular_median_hue(&hues),
        saturation: lower_median(&mut saturations),
        value: lower_median(&mut values),
    }
}

/// Maps a sample to the nearest palette color.
pub fn classify_color(sample: HsvPixel, palette: &[ColorRange], tolerance: f32) -> ColorClass {
    let containing = palette
        .iter()
        .filter_map(|range| {
            range
                .bounds
                .iter()
                .filter(|b| b.contains(sample))
                .map(|b| b.distance_to_center(sample))
                .min_by(f32::total_cmp)
                .map(|d| (range, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1));

    if let Some((range, _)) = containing {
        return ColorClass {
            name: range.name.clone(),
            confidence: ColorConfidence::Exact,
        };
    }

    let nearest = palette
        .iter()
        .filter_map(|range| {
            range
                .bounds
                .iter()
                .map(|b| b.distance_outside(sample))
                .min_by(f32::total_cmp)
                .map(|d| (range, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        Some((range, distance)) if distance <= tolerance => ColorClass {
            name: range.name.clone(),
            confidence: ColorConfidence::Borderline,
        },
        _ => ColorClass {
            name: UNLABELED_COLOR.to_string(),
            confidence: ColorConfidence::Unlabeled,
        },
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "<Color> <Shape> (<Size>)", e.g. "Red Circle (Medium)".
pub fn compose_label(color: &str, shape: Shape, size: SizeLabel) -> String {
    format!("{} {} ({})", capitalize(color), capitalize(shape.as_str()), capitalize(size.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_segmenter::default_palette;

    fn features(circularity: f64, solidity: f64, edges: usize) -> ShapeFeatures {
        ShapeFeatures { circularity, solidity, edges }
    }

    fn hsv(hue: u8, saturation: u8, value: u8) -> HsvPixel {
        HsvPixel { hue, saturation, value }
    }

    #[test]
    fn shape_rules_follow_precedence() {
        // Meets both circle and polygon criteria: circle wins.
        assert_eq!(classify_shape(&features(0.85, 0.95, 8)), Shape::Circle);
        assert_eq!(classify_shape(&features(0.60, 0.95, 8)), Shape::Polygon);
        assert_eq!(classify_shape(&features(0.60, 0.95, 3)), Shape::Triangle);
        assert_eq!(classify_shape(&features(0.78, 0.99, 4)), Shape::Rectangle);
        assert_eq!(classify_shape(&features(0.78, 0.70, 4)), Shape::Unknown);
        assert_eq!(classify_shape(&features(0.90, 0.99, 2)), Shape::Unknown);
    }

    #[test]
    fn size_buckets_are_monotonic() {
        let buckets = SizeBuckets::default();
        assert_eq!(classify_size(0.0, &buckets), SizeLabel::Small);
        assert_eq!(classify_size(0.0299, &buckets), SizeLabel::Small);
        assert_eq!(classify_size(0.03, &buckets), SizeLabel::Medium);
        assert_eq!(classify_size(0.12, &buckets), SizeLabel::Large);

        let mut previous = SizeLabel::Small;
        for step in 0..=1000 {
            let label = classify_size(step as f64 / 1000.0, &buckets);
            assert!(label >= previous);
            previous = label;
        }
    }

    #[test]
    fn bucket_centers_are_midpoints() {
        let buckets = SizeBuckets::default();
        assert!((SizeLabel::Small.center(&buckets) - 0.015).abs() < 1e-12);
        assert!((SizeLabel::Medium.center(&buckets) - 0.075).abs() < 1e-12);
        assert!((SizeLabel::Large.center(&buckets) - 0.20).abs() < 1e-12);
    }

    #[test]
    fn exact_color_matches() {
        let palette = default_palette();
        let class = classify_color(hsv(2, 220, 220), &palette, 0.08);
        assert_eq!(class.name, "red");
        assert_eq!(class.confidence, ColorConfidence::Exact);

        let class = classify_color(hsv(100, 200, 200), &palette, 0.08);
        assert_eq!(class.name, "blue");
    }

    #[test]
    fn overlapping_ranges_pick_the_nearest_center() {
        // Dim orange-ish sample: inside both "orange" and "brown"; brown's
        // value range is centered much closer.
        let palette = default_palette();
        let class = classify_color(hsv(15, 200, 110), &palette, 0.08);
        assert_eq!(class.name, "brown");
        let class = classify_color(hsv(18, 220, 250), &palette, 0.08);
        assert_eq!(class.name, "orange");
    }

    #[test]
    fn near_misses_are_borderline_and_far_misses_unlabeled() {
        let palette = vec![ColorRange::new(
            "green",
            vec![crate::core_modules::color_segmenter::HsvBounds::new([36, 50, 50], [85, 255, 255])],
        )];
        let class = classify_color(hsv(33, 200, 200), &palette, 0.08);
        assert_eq!(class.confidence, ColorConfidence::Borderline);
        assert_eq!(class.name, "green");

        let class = classify_color(hsv(120, 200, 200), &palette, 0.08);
        assert_eq!(class.confidence, ColorConfidence::Unlabeled);
        assert_eq!(class.name, UNLABELED_COLOR);
    }

    #[test]
    fn circular_median_stays_red_across_the_seam() {
        let hues = [178, 179, 179, 0, 1, 2, 2];
        let median = circular_median_hue(&hues);
        assert!(median >= 178 || median <= 2, "median {median}");
        assert_eq!(circular_median_hue(&[40, 50, 60]), 50);
    }

    #[test]
    fn labels_are_capitalized() {
        assert_eq!(compose_label("red", Shape::Circle, SizeLabel::Medium), "Red Circle (Medium)");
        assert_eq!(compose_label(UNLABELED_COLOR, Shape::Unknown, SizeLabel::Small), "Unknown Unknown (Small)");
    }
}
