// Synthetic frames for the integration tests.
#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hue_vision::{FrameConfig, FrameRequest};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Low-saturation pink that no palette color claims, so only the drawn
/// shapes produce detections.
pub const BACKGROUND: [u8; 3] = [200, 170, 170];
pub const RED: [u8; 3] = [220, 30, 30];
pub const BLUE: [u8; 3] = [30, 60, 220];

pub fn canvas(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(BACKGROUND))
}

pub fn fill(image: &mut RgbImage, color: [u8; 3], inside: impl Fn(i64, i64) -> bool) {
    for y in 0..image.height() {
        for x in 0..image.width() {
            if inside(x as i64, y as i64) {
                image.put_pixel(x, y, Rgb(color));
            }
        }
    }
}

pub fn disc(image: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: [u8; 3]) {
    fill(image, color, |x, y| (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius);
}

pub fn rect(image: &mut RgbImage, x0: i64, y0: i64, w: i64, h: i64, color: [u8; 3]) {
    fill(image, color, |x, y| x >= x0 && x < x0 + w && y >= y0 && y < y0 + h);
}

/// Filled triangle with counter-clockwise or clockwise vertices.
pub fn triangle(image: &mut RgbImage, a: (i64, i64), b: (i64, i64), c: (i64, i64), color: [u8; 3]) {
    let edge = |p: (i64, i64), q: (i64, i64), x: i64, y: i64| (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0);
    fill(image, color, |x, y| {
        let d1 = edge(a, b, x, y);
        let d2 = edge(b, c, x, y);
        let d3 = edge(c, a, x, y);
        (d1 >= 0 && d2 >= 0 && d3 >= 0) || (d1 <= 0 && d2 <= 0 && d3 <= 0)
    });
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> String {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    STANDARD.encode(bytes)
}

pub fn png_request(image: &RgbImage, config: FrameConfig) -> FrameRequest {
    FrameRequest::new(encode(image, ImageFormat::Png), config)
}

pub fn red_disc_frame(cx: i64, cy: i64) -> RgbImage {
    let mut image = canvas(640, 480);
    disc(&mut image, cx, cy, 60, RED);
    image
}
