//! Planar geometry used by grid construction and layer intersection.
//!
//! Grid cells are always convex, so overlap areas are computed by clipping the
//! (possibly concave) subject ring against the convex cell with the
//! Sutherland-Hodgman algorithm and measuring the result with the shoelace
//! formula. Rings are open: the last vertex is not repeated.

use serde::{Deserialize, Serialize};

/// Planar coordinate `[x, y]`.
pub type Point = [f64; 2];

/// Axis aligned bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Minimum x coordinate.
    pub min_x: f64,
    /// Minimum y coordinate.
    pub min_y: f64,
    /// Maximum x coordinate.
    pub max_x: f64,
    /// Maximum y coordinate.
    pub max_y: f64,
}

impl Envelope {
    /// Creates an envelope from its corners.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Returns the envelope of the points, or `None` when empty.
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut env = Envelope::new(first[0], first[1], first[0], first[1]);
        for point in iter {
            env.expand_to(point);
        }
        Some(env)
    }

    /// Grows the envelope to contain `point`.
    pub fn expand_to(&mut self, point: &Point) {
        self.min_x = self.min_x.min(point[0]);
        self.min_y = self.min_y.min(point[1]);
        self.max_x = self.max_x.max(point[0]);
        self.max_y = self.max_y.max(point[1]);
    }

    /// Returns the smallest envelope containing both.
    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Returns the overlap of two envelopes when it has positive area.
    pub fn intersection(&self, other: &Envelope) -> Option<Envelope> {
        let env = Envelope::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        );
        (env.min_x < env.max_x && env.min_y < env.max_y).then_some(env)
    }

    /// Width along x.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height along y.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns the corners as a clockwise ring starting at the top left.
    pub fn to_ring(&self) -> Vec<Point> {
        vec![
            [self.min_x, self.max_y],
            [self.max_x, self.max_y],
            [self.max_x, self.min_y],
            [self.min_x, self.min_y],
        ]
    }
}

/// Signed shoelace area; positive for counter-clockwise rings.
pub fn signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (idx, a) in ring.iter().enumerate() {
        let b = &ring[(idx + 1) % ring.len()];
        twice += a[0] * b[1] - b[0] * a[1];
    }
    twice / 2.0
}

/// Unsigned area of a ring.
pub fn ring_area(ring: &[Point]) -> f64 {
    signed_area(ring).abs()
}

/// Arithmetic mean of the ring vertices.
///
/// Equals the area centroid for the regular cells produced by the grid
/// builder.
pub fn vertex_centroid(ring: &[Point]) -> Point {
    let n = ring.len().max(1) as f64;
    let (sx, sy) = ring
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    [sx / n, sy / n]
}

/// Returns true when the ring has at least three finite vertices.
pub fn is_valid_ring(ring: &[Point]) -> bool {
    ring.len() >= 3 && ring.iter().all(|p| p[0].is_finite() && p[1].is_finite())
}

fn cross(a: &Point, b: &Point, p: &Point) -> f64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn segment_line_intersection(p: &Point, q: &Point, a: &Point, b: &Point) -> Point {
    let dp = [q[0] - p[0], q[1] - p[1]];
    let db = [b[0] - a[0], b[1] - a[1]];
    let denom = dp[0] * db[1] - dp[1] * db[0];
    if denom == 0.0 {
        return *q;
    }
    let t = ((a[0] - p[0]) * db[1] - (a[1] - p[1]) * db[0]) / denom;
    [p[0] + t * dp[0], p[1] + t * dp[1]]
}

/// Clips `subject` against the convex ring `clip`.
///
/// The clip ring may be wound either way. The result may contain degenerate
/// edges when the subject is concave, which does not affect its area.
pub fn clip_to_convex(subject: &[Point], clip: &[Point]) -> Vec<Point> {
    if subject.len() < 3 || clip.len() < 3 {
        return Vec::new();
    }
    let orientation = if signed_area(clip) >= 0.0 { 1.0 } else { -1.0 };
    let mut output = subject.to_vec();
    for (idx, a) in clip.iter().enumerate() {
        let b = &clip[(idx + 1) % clip.len()];
        let input = std::mem::take(&mut output);
        if input.is_empty() {
            break;
        }
        let inside = |p: &Point| orientation * cross(a, b, p) >= 0.0;
        let mut prev = input[input.len() - 1];
        for current in input {
            match (inside(&current), inside(&prev)) {
                (true, true) => output.push(current),
                (true, false) => {
                    output.push(segment_line_intersection(&prev, &current, a, b));
                    output.push(current);
                }
                (false, true) => output.push(segment_line_intersection(&prev, &current, a, b)),
                (false, false) => {}
            }
            prev = current;
        }
    }
    output
}

/// Area of a polygon with holes that falls inside the convex ring `cell`.
pub fn overlap_area(exterior: &[Point], interiors: &[Vec<Point>], cell: &[Point]) -> f64 {
    let outer = ring_area(&clip_to_convex(exterior, cell));
    if outer == 0.0 {
        return 0.0;
    }
    let holes: f64 = interiors
        .iter()
        .map(|hole| ring_area(&clip_to_convex(hole, cell)))
        .sum();
    (outer - holes).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_square_area_is_orientation_independent() {
        let ccw = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let mut cw = ccw.clone();
        cw.reverse();
        assert_eq!(signed_area(&ccw), 1.0);
        assert_eq!(signed_area(&cw), -1.0);
        assert_eq!(ring_area(&cw), 1.0);
    }

    #[test]
    fn clipping_half_overlapping_squares() {
        let cell = Envelope::new(0.0, 0.0, 2.0, 2.0).to_ring();
        let subject = vec![[1.0, -1.0], [3.0, -1.0], [3.0, 1.0], [1.0, 1.0]];
        let area = ring_area(&clip_to_convex(&subject, &cell));
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn concave_subject_keeps_correct_area() {
        let cell = Envelope::new(0.0, 0.0, 4.0, 4.0).to_ring();
        // U shape opening upwards, fully inside the cell.
        let subject = vec![
            [0.0, 0.0],
            [3.0, 0.0],
            [3.0, 3.0],
            [2.0, 3.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 3.0],
            [0.0, 3.0],
        ];
        let area = ring_area(&clip_to_convex(&subject, &cell));
        assert!((area - 7.0).abs() < 1e-12);
    }

    #[test]
    fn holes_are_subtracted() {
        let cell = Envelope::new(0.0, 0.0, 10.0, 10.0).to_ring();
        let outer = Envelope::new(0.0, 0.0, 4.0, 4.0).to_ring();
        let hole = Envelope::new(1.0, 1.0, 2.0, 2.0).to_ring();
        assert!((overlap_area(&outer, &[hole], &cell) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_envelopes_do_not_intersect() {
        let a = Envelope::new(0.0, 0.0, 1.0, 1.0);
        let b = Envelope::new(1.0, 0.0, 2.0, 1.0);
        assert!(a.intersection(&b).is_none());
        assert_eq!(a.union(&b), Envelope::new(0.0, 0.0, 2.0, 1.0));
    }
}
