//! Paths, polygon soups, and exact boundary queries.
//!
//! A [`Path`] is a non-empty vertex sequence. Closed contours are implicit:
//! the segment from the last vertex back to the first is part of the
//! boundary and is never stored as a duplicate vertex. A [`Paths`] value is
//! a polygon soup whose filled region is decided by a [`FillRule`]; outer
//! contours have positive signed area, holes negative.

use crate::point::{orient, BoundingBox, Point};
use serde::{Deserialize, Serialize};

/// An ordered sequence of grid points.
pub type Path = Vec<Point>;

/// A polygon soup.
pub type Paths = Vec<Path>;

/// How a polygon soup fills the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRule {
    EvenOdd,
    NonZero,
}

impl Default for FillRule {
    fn default() -> Self {
        Self::EvenOdd
    }
}

/// Where a point sits relative to a filled region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    OnBoundary,
    Outside,
}

/// Twice the signed area of a closed contour.
///
/// Positive for outer contours, negative for holes.
pub fn signed_area2(path: &[Point]) -> i128 {
    let n = path.len();
    if n < 3 {
        return 0;
    }
    let mut sum = 0i128;
    for i in 0..n {
        sum += path[i].cross(path[(i + 1) % n]);
    }
    sum
}

/// Area-weighted centroid of a closed contour.
///
/// Falls back to the vertex average when the contour has no area.
pub fn centroid(path: &[Point]) -> Point {
    let n = path.len();
    if n == 0 {
        return Point::new(0, 0);
    }
    let mut area = 0.0f64;
    let mut cx = 0.0f64;
    let mut cy = 0.0f64;
    for i in 0..n {
        let p = path[i];
        let q = path[(i + 1) % n];
        let c = p.cross(q) as f64;
        area += c;
        cx += (p.x as f64 + q.x as f64) * c;
        cy += (p.y as f64 + q.y as f64) * c;
    }
    if area.abs() < 1.0 {
        let sx: f64 = path.iter().map(|p| p.x as f64).sum();
        let sy: f64 = path.iter().map(|p| p.y as f64).sum();
        return Point::new(
            (sx / n as f64).round() as i64,
            (sy / n as f64).round() as i64,
        );
    }
    Point::new(
        (cx / (3.0 * area)).round() as i64,
        (cy / (3.0 * area)).round() as i64,
    )
}

/// Removes consecutive duplicate vertices, including a trailing copy of the
/// first vertex.
pub fn dedup_vertices(path: &mut Path) {
    path.dedup();
    while path.len() > 1 && path.first() == path.last() {
        path.pop();
    }
}

/// Normalises one contour for boolean work: duplicates removed, at least
/// three vertices, non-zero area.
pub fn clean_contour(path: &[Point]) -> Option<Path> {
    let mut out = path.to_vec();
    dedup_vertices(&mut out);
    if out.len() < 3 || signed_area2(&out) == 0 {
        None
    } else {
        Some(out)
    }
}

/// The bounding box of a soup, or `None` when it has no vertices.
pub fn paths_bounds(paths: &[Path]) -> Option<BoundingBox> {
    BoundingBox::from_points(paths.iter().flatten().copied())
}

/// Locates `p` relative to the region filled by `paths` under `rule`.
///
/// Exact: winding and crossing parity are accumulated in one pass over the
/// closed contours with i128 predicates.
pub fn locate_point(paths: &[Path], p: Point, rule: FillRule) -> PointLocation {
    let mut winding = 0i64;
    let mut crossings = 0u64;
    for path in paths {
        let n = path.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            let a = path[i];
            let b = path[(i + 1) % n];
            if a == b {
                continue;
            }
            let o = orient(a, b, p);
            if o == 0
                && p.x >= a.x.min(b.x)
                && p.x <= a.x.max(b.x)
                && p.y >= a.y.min(b.y)
                && p.y <= a.y.max(b.y)
            {
                return PointLocation::OnBoundary;
            }
            // Half-open span rule keeps vertex touches unambiguous.
            if (a.y <= p.y) != (b.y <= p.y) {
                if b.y > a.y && o > 0 {
                    winding += 1;
                    crossings += 1;
                } else if b.y < a.y && o < 0 {
                    winding -= 1;
                    crossings += 1;
                }
            }
        }
    }
    let inside = match rule {
        FillRule::EvenOdd => crossings % 2 == 1,
        FillRule::NonZero => winding != 0,
    };
    if inside {
        PointLocation::Inside
    } else {
        PointLocation::Outside
    }
}

/// True when `p` is strictly inside the region. Boundary points count as
/// outside.
pub fn contains_point(paths: &[Path], p: Point, rule: FillRule) -> bool {
    locate_point(paths, p, rule) == PointLocation::Inside
}

/// Intersection of the open segments `a-b` and `c-d` when they properly
/// cross (strict sign changes on both sides). Touches, shared endpoints,
/// and collinear overlap yield `None`.
pub fn proper_crossing(a: Point, b: Point, c: Point, d: Point) -> Option<Point> {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);
    if o1 == 0 || o2 == 0 || o3 == 0 || o4 == 0 {
        return None;
    }
    if (o1 > 0) == (o2 > 0) || (o3 > 0) == (o4 > 0) {
        return None;
    }
    // o3 and o4 are the signed offsets of a and b from line c-d, so the
    // crossing parameter along a-b is o3 / (o3 - o4). The parameter is
    // computed in f64 and the vertex rounded back onto the grid; every
    // decision above stays exact.
    let t = o3 as f64 / (o3 - o4) as f64;
    let x = a.x as f64 + (b.x - a.x) as f64 * t;
    let y = a.y as f64 + (b.y - a.y) as f64 * t;
    Some(Point::new(x.round() as i64, y.round() as i64))
}

/// All proper crossings of segment `a-b` with the closed contours of
/// `paths`, ordered by distance from `a`, duplicates removed.
pub fn segment_path_crossings(a: Point, b: Point, paths: &[Path]) -> Vec<Point> {
    let d = b - a;
    let mut hits: Vec<(i128, Point)> = Vec::new();
    for path in paths {
        let n = path.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            let c = path[i];
            let e = path[(i + 1) % n];
            if let Some(p) = proper_crossing(a, b, c, e) {
                hits.push(((p - a).dot(d), p));
            }
        }
    }
    hits.sort();
    hits.dedup_by_key(|h| h.1);
    hits.into_iter().map(|h| h.1).collect()
}

/// Does the open segment `a-b` cross the boundary of `bounds`?
///
/// Collinear overlap and endpoint touches do not count as crossings, so a
/// chord running along the boundary is "safe".
pub fn crosses(bounds: &[Path], a: Point, b: Point) -> bool {
    if a == b {
        return false;
    }
    !segment_path_crossings(a, b, bounds).is_empty()
}
