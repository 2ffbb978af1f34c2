// THEORY:
// Shared plane geometry for the blob extractor. Everything here works on the
// integer pixel lattice (x right, y down) and knows nothing about colors.
//
// - `trace_outer_contour`: radial-sweep boundary following. Starting from the
//   top-most, left-most pixel of a region, it walks the 8-connected outer
//   boundary clockwise and stops when it is about to repeat its first move
//   from the start pixel (Jacob's stopping criterion).
// - `perimeter` / `polygon_area`: closed polyline length and shoelace area.
// - `convex_hull`: Andrew's monotone chain.
// - `simplify_closed`: Douglas-Peucker on a closed contour, split at the
//   vertex farthest from the start so both halves are open chains.

/// A point on the pixel lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Clockwise neighbor offsets (y grows downward): E, SE, S, SW, W, NW, N, NE.
const NEIGHBORS: [(i32, i32); 8] = [(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)];
const WEST: usize = 4;

fn sweep(current: Point, back: usize, is_foreground: &impl Fn(i32, i32) -> bool) -> Option<(Point, usize)> {
    (1..=8).map(|i| (back + i) % 8).find_map(|d| {
        let (dx, dy) = NEIGHBORS[d];
        let next = Point::new(current.x + dx, current.y + dy);
        is_foreground(next.x, next.y).then_some((next, d))
    })
}

/// Traces the outer boundary of the 8-connected region containing `start`.
/// `start` must be the region's first pixel in raster order, so its west,
/// north-west, north and north-east neighbors are background.
pub fn trace_outer_contour(start: Point, is_foreground: impl Fn(i32, i32) -> bool, max_steps: usize) -> Vec<Point> {
    let mut contour = vec![start];
    let Some((mut current, first_direction)) = sweep(start, WEST, &is_foreground) else {
        return contour;
    };
    let mut direction = first_direction;

    for _ in 0..max_steps {
        let back = (direction + 4) % 8;
        let Some((next, next_direction)) = sweep(current, back, &is_foreground) else {
            break;
        };
        if current == start && next_direction == first_direction {
            break;
        }
        contour.push(current);
        current = next;
        direction = next_direction;
    }

    contour
}

/// Length of the closed polyline through `points`.
pub fn perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.distance(b))
        .sum()
}

/// Unsigned shoelace area of the closed polygon through `points`.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice_area.unsigned_abs() as f64 / 2.0
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
}

/// Convex hull via Andrew's monotone chain. Collinear points are dropped.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted = points.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let length = a.distance(&b);
    if length == 0.0 {
        return p.distance(&a);
    }
    cross(a, b, p).unsigned_abs() as f64 / length
}

fn douglas_peucker(points: &[Point], epsilon: f64, keep: &mut Vec<Point>) {
    let (first, last) = (points[0], points[points.len() - 1]);
    let farthest = points[1..points.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, &p)| (i + 1, distance_to_segment(p, first, last)))
        .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
            Some((_, best_d)) if best_d >= d => best,
            _ => Some((i, d)),
        });

    match farthest {
        Some((index, d)) if d > epsilon => {
            douglas_peucker(&points[..=index], epsilon, keep);
            douglas_peucker(&points[index..], epsilon, keep);
        }
        _ => keep.push(first),
    }
}

/// Simplifies a closed contour with tolerance `epsilon`, returning the
/// vertices of the approximating polygon.
pub fn simplify_closed(contour: &[Point], epsilon: f64) -> Vec<Point> {
    if contour.len() < 3 {
        return contour.to_vec();
    }

    let start = contour[0];
    let split = contour
        .iter()
        .enumerate()
        .fold((0, 0.0), |best, (i, p)| {
            let d = p.distance(&start);
            if d > best.1 { (i, d) } else { best }
        })
        .0;
    if split == 0 {
        return vec![start];
    }

    // Two open chains: start..=split and split..=start (wrapping).
    let mut closing: Vec<Point> = contour[split..].to_vec();
    closing.push(start);

    let mut vertices = Vec::new();
    douglas_peucker(&contour[..=split], epsilon, &mut vertices);
    douglas_peucker(&closing, epsilon, &mut vertices);

    // The start pixel is an arbitrary boundary point; drop it when it lies on
    // the edge between its neighbors.
    if vertices.len() > 3 {
        let previous = vertices[vertices.len() - 1];
        if distance_to_segment(vertices[0], previous, vertices[1]) <= epsilon {
            vertices.remove(0);
        }
    }
    vertices
}
