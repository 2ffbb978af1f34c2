// THEORY:
// The `ColorSegmenter` turns a preprocessed frame into one binary mask per
// configured color. The frame is converted to HSV exactly once; every color
// in the palette is then tested against that shared `HsvImage`.
//
// A color may own several (low, high) bound pairs. Red needs two because it
// sits on both ends of the hue axis, so masks from sub-ranges are OR-ed
// together. Colors are never made mutually exclusive here: an orange-ish
// object can light up both the "orange" and "red" masks, and the classifier
// later decides what the region really looks like by sampling its pixels.

use crate::core_modules::frame::Frame;
use crate::core_modules::pixel::pixel::{HUE_SCALE, HsvPixel};
use serde::{Deserialize, Serialize};

/// Inclusive HSV bounds on the 8-bit scale (H 0..=179, S/V 0..=255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvBounds {
    pub low: [u8; 3],
    pub high: [u8; 3],
}

impl HsvBounds {
    pub const fn new(low: [u8; 3], high: [u8; 3]) -> Self {
        Self { low, high }
    }

    /// True iff every channel lies within its bounds.
    pub fn contains(&self, hsv: HsvPixel) -> bool {
        let sample = [hsv.hue, hsv.saturation, hsv.value];
        (0..3).all(|c| self.low[c] <= sample[c] && sample[c] <= self.high[c])
    }

    pub fn is_ordered(&self) -> bool {
        (0..3).all(|c| self.low[c] <= self.high[c])
    }

    /// Normalized distance from a sample to the box (0.0 when inside).
    /// Hue distance wraps around the wheel; the result is the worst channel.
    pub fn distance_outside(&self, hsv: HsvPixel) -> f32 {
        let hue_gap = if hsv.hue < self.low[0] || hsv.hue > self.high[0] {
            hue_distance(hsv.hue, self.low[0]).min(hue_distance(hsv.hue, self.high[0]))
        } else {
            0
        };
        let saturation_gap = channel_gap(hsv.saturation, self.low[1], self.high[1]);
        let value_gap = channel_gap(hsv.value, self.low[2], self.high[2]);

        (hue_gap as f32 / (HUE_SCALE / 2) as f32)
            .max(saturation_gap as f32 / 255.0)
            .max(value_gap as f32 / 255.0)
    }

    /// Normalized distance from a sample to the center of the box, used to
    /// break ties between overlapping ranges.
    pub fn distance_to_center(&self, hsv: HsvPixel) -> f32 {
        let sample = [hsv.hue, hsv.saturation, hsv.value];
        (0..3)
            .map(|c| {
                let half_width = (self.high[c] as f32 - self.low[c] as f32) / 2.0 + 1.0;
                let center = (self.high[c] as f32 + self.low[c] as f32) / 2.0;
                (sample[c] as f32 - center).abs() / half_width
            })
            .sum()
    }
}

fn channel_gap(sample: u8, low: u8, high: u8) -> u8 {
    if sample < low {
        low - sample
    } else if sample > high {
        sample - high
    } else {
        0
    }
}

/// Shortest distance between two hues on the 180-step wheel.
pub fn hue_distance(a: u8, b: u8) -> u16 {
    let direct = (a as i16 - b as i16).unsigned_abs();
    direct.min(HUE_SCALE - direct.min(HUE_SCALE))
}

/// A named color and the HSV boxes that define it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub name: String,
    pub bounds: Vec<HsvBounds>,
}

impl ColorRange {
    pub fn new(name: &str, bounds: Vec<HsvBounds>) -> Self {
        Self {
            name: name.to_string(),
            bounds,
        }
    }

    pub fn contains(&self, hsv: HsvPixel) -> bool {
        self.bounds.iter().any(|b| b.contains(hsv))
    }
}

/// The default eleven-color palette.
pub fn default_palette() -> Vec<ColorRange> {
    let b = HsvBounds::new;
    vec![
        ColorRange::new("red", vec![b([0, 100, 100], [10, 255, 255]), b([170, 100, 100], [179, 255, 255])]),
        ColorRange::new("orange", vec![b([11, 100, 100], [25, 255, 255])]),
        ColorRange::new("yellow", vec![b([26, 100, 100], [35, 255, 255])]),
        ColorRange::new("green", vec![b([36, 50, 50], [85, 255, 255])]),
        ColorRange::new("blue", vec![b([86, 50, 50], [125, 255, 255])]),
        ColorRange::new("purple", vec![b([126, 50, 50], [150, 255, 255])]),
        ColorRange::new("pink", vec![b([151, 50, 100], [169, 255, 255])]),
        ColorRange::new("brown", vec![b([10, 100, 20], [20, 255, 150])]),
        ColorRange::new("black", vec![b([0, 0, 0], [179, 255, 50])]),
        ColorRange::new("white", vec![b([0, 0, 200], [179, 30, 255])]),
        ColorRange::new("gray", vec![b([0, 0, 51], [179, 30, 199])]),
    ]
}

/// The whole frame converted to HSV, row-major.
#[derive(Debug, Clone)]
pub struct HsvImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<HsvPixel>,
}

impl HsvImage {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            pixels: frame.pixels().map(|p| p.to_hsv()).collect(),
        }
    }

    pub fn get(&self, x: u32, y: u32) -> HsvPixel {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// A binary image: `true` marks a foreground pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; (width * height) as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.data[(y as u32 * self.width + x as u32) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.data[(y * self.width + x) as usize] = on;
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&on| on).count()
    }
}

/// The mask produced for one palette color.
#[derive(Debug, Clone)]
pub struct ColorMask {
    pub color: String,
    pub mask: Mask,
}

/// Output of segmentation: the shared HSV image and one mask per color.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub hsv: HsvImage,
    pub masks: Vec<ColorMask>,
}

pub mod color_segmenter {
    use super::*;

    /// Builds the mask for a single color: OR across all of its sub-ranges.
    pub fn mask_for(hsv: &HsvImage, range: &ColorRange) -> Mask {
        Mask {
            width: hsv.width,
            height: hsv.height,
            data: hsv.pixels.iter().map(|&p| range.contains(p)).collect(),
        }
    }

    /// Converts the frame to HSV once and masks every palette color.
    pub fn segment(frame: &Frame, palette: &[ColorRange]) -> Segmentation {
        let hsv = HsvImage::from_frame(frame);
        let masks = palette
            .iter()
            .map(|range| ColorMask {
                color: range.name.clone(),
                mask: mask_for(&hsv, range),
            })
            .collect();
        Segmentation { hsv, masks }
    }
}
