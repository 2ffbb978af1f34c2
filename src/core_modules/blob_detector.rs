// THEORY:
// The `BlobDetector` is the engine of the spatial grouping stage. It takes one
// binary color mask and turns it into a list of `Blob`s, one per connected
// region that is large enough to matter.
//
// Key steps:
// 1.  **Cleanup**: morphological opening (drop speckles) then closing (fill
//     pinholes) with a small square element.
// 2.  **Region growing**: a raster scan seeds a flood fill at every unvisited
//     foreground pixel. The seed is therefore the top-most, left-most pixel of
//     its region, which is exactly the start the contour tracer needs.
//     Regions are 8-connected, matching the tracer.
// 3.  **Feature extraction**: outer contour, contour area (shoelace), perimeter,
//     convex hull area, and the vertex count of a Douglas-Peucker
//     simplification whose tolerance scales with the perimeter.
// 4.  **Filtering**: regions whose geometry is degenerate (no perimeter or no
//     hull area, e.g. a one pixel wide line) are dropped first, with a trace
//     event. Regions below the minimum area are discarded next.
// 5.  **Stateless utility**: no memory of previous frames, and no merging of
//     blobs coming from different color masks.

use crate::core_modules::color_segmenter::Mask;
use crate::core_modules::geometry::{self, Point};
use crate::core_modules::morphology::morphology;
use std::f64::consts::PI;
use tracing::trace;

/// Axis-aligned box in pixels: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// One connected region of a color mask, with its geometric descriptors.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Name of the color mask this region came from.
    pub mask_color: String,
    pub bounding_box: BoundingBox,
    /// Mean position of the region's pixels.
    pub centroid: (f64, f64),
    /// Area enclosed by the outer contour.
    pub area: f64,
    pub perimeter: f64,
    /// 4π·area / perimeter², 1.0 for a perfect disc.
    pub circularity: f64,
    /// area / convex hull area.
    pub solidity: f64,
    /// Vertex count of the simplified outline.
    pub edges: usize,
    /// Every pixel of the region, used for color sampling.
    pub pixels: Vec<Point>,
}

/// Tunables for a single extraction pass.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionParams {
    pub min_area: f64,
    pub morphology_radius: u32,
    pub polygon_tolerance: f64,
}

pub mod blob_detector {
    use super::*;

    /// The main function of the spatial stage: cleans the mask and returns
    /// every surviving region as a `Blob`.
    pub fn find_blobs(mask: &Mask, mask_color: &str, params: &ExtractionParams) -> Vec<Blob> {
        if mask.count() == 0 {
            return Vec::new();
        }
        let cleaned = morphology::clean(mask, params.morphology_radius);
        let width = cleaned.width as usize;
        let mut visited = vec![false; cleaned.data.len()];
        let mut blobs = Vec::new();

        for y in 0..cleaned.height {
            for x in 0..cleaned.width {
                let index = y as usize * width + x as usize;
                if !cleaned.data[index] || visited[index] {
                    continue;
                }

                let seed = Point::new(x as i32, y as i32);
                let region = grow_region(seed, &cleaned, &mut visited);
                if let Some(blob) = describe_region(seed, region, &cleaned, mask_color, params) {
                    blobs.push(blob);
                }
            }
        }

        blobs
    }

    /// Flood fill over 8-connected foreground pixels.
    fn grow_region(seed: Point, mask: &Mask, visited: &mut [bool]) -> Vec<Point> {
        let width = mask.width as usize;
        let mut region = Vec::new();
        let mut stack = vec![seed];
        visited[seed.y as usize * width + seed.x as usize] = true;

        while let Some(current) = stack.pop() {
            region.push(current);

            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = current.x + dx;
                    let ny = current.y + dy;
                    if !mask.get(nx as i64, ny as i64) {
                        continue;
                    }
                    let index = ny as usize * width + nx as usize;
                    if !visited[index] {
                        visited[index] = true;
                        stack.push(Point::new(nx, ny));
                    }
                }
            }
        }

        region
    }

    /// Computes descriptors for a region, or `None` if it is too small or
    /// geometrically degenerate.
    fn describe_region(
        seed: Point,
        pixels: Vec<Point>,
        mask: &Mask,
        mask_color: &str,
        params: &ExtractionParams,
    ) -> Option<Blob> {
        // The region is the connected component of the seed, so following the
        // mask boundary from the seed stays on this region.
        let contour = geometry::trace_outer_contour(
            seed,
            |x, y| mask.get(x as i64, y as i64),
            4 * pixels.len() + 8,
        );

        let area = geometry::polygon_area(&contour);
        let perimeter = geometry::perimeter(&contour);
        let hull_area = geometry::polygon_area(&geometry::convex_hull(&contour));
        if perimeter <= 0.0 || hull_area <= 0.0 {
            trace!(mask_color, pixels = pixels.len(), perimeter, hull_area, "dropping degenerate region");
            return None;
        }
        if area < params.min_area {
            return None;
        }

        let polygon = geometry::simplify_closed(&contour, params.polygon_tolerance * perimeter);

        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        let (mut sum_x, mut sum_y) = (0.0, 0.0);
        for p in &pixels {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
            sum_x += p.x as f64;
            sum_y += p.y as f64;
        }
        let count = pixels.len() as f64;

        Some(Blob {
            mask_color: mask_color.to_string(),
            bounding_box: BoundingBox {
                x: min_x as u32,
                y: min_y as u32,
                width: (max_x - min_x + 1) as u32,
                height: (max_y - min_y + 1) as u32,
            },
            centroid: (sum_x / count, sum_y / count),
            area,
            perimeter,
            circularity: (4.0 * PI * area / (perimeter * perimeter)).min(1.0),
            solidity: (area / hull_area).min(1.0),
            edges: polygon.len(),
            pixels,
        })
    }
}
