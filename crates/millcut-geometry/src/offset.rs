//! Minkowski offset of polygon soups.
//!
//! The offset of a region by a disk is assembled from its boundary bloat:
//! every edge contributes a convex capsule (the hull of the two endpoint
//! disks), the capsules are unioned under the non-zero rule, and the bloat
//! is unioned with the input (grow) or subtracted from it (shrink). End
//! disks give round joins for free; mitre and square joins are not
//! supported. Contours that collapse under a negative delta simply vanish
//! from the result.

use crate::clip::{clip_with_rules, simplify, ClipOp};
use crate::path::{dedup_vertices, FillRule, Path, Paths};
use crate::point::{orient, Point};
use std::f64::consts::TAU;

/// Offsets an even-odd soup by `delta` (positive grows, negative shrinks).
pub fn offset(paths: &[Path], delta: i64) -> Paths {
    offset_with_rule(paths, delta, FillRule::EvenOdd)
}

/// Offset with an explicit fill rule for the input soup.
pub fn offset_with_rule(paths: &[Path], delta: i64, rule: FillRule) -> Paths {
    if delta == 0 {
        return simplify(paths, rule);
    }
    let r = delta.unsigned_abs() as i64;
    let steps = arc_steps(r);

    let mut capsules: Paths = Vec::new();
    for path in paths {
        let mut contour = path.clone();
        dedup_vertices(&mut contour);
        match contour.len() {
            0 => continue,
            1 => {
                let disk = convex_hull(circle_points(contour[0], r, steps));
                if disk.len() >= 3 {
                    capsules.push(disk);
                }
            }
            n => {
                for i in 0..n {
                    let a = contour[i];
                    let b = contour[(i + 1) % n];
                    if a == b {
                        continue;
                    }
                    let mut pts = circle_points(a, r, steps);
                    pts.extend(circle_points(b, r, steps));
                    let hull = convex_hull(pts);
                    if hull.len() >= 3 {
                        capsules.push(hull);
                    }
                }
            }
        }
    }
    if capsules.is_empty() {
        return simplify(paths, rule);
    }
    let bloat = simplify(&capsules, FillRule::NonZero);
    if delta > 0 {
        clip_with_rules(paths, rule, &bloat, FillRule::EvenOdd, ClipOp::Union)
    } else {
        clip_with_rules(paths, rule, &bloat, FillRule::EvenOdd, ClipOp::Difference)
    }
}

/// Segments per full circle for radius `r`, from the chord tolerance
/// `max(1, r / 256)`.
fn arc_steps(r: i64) -> usize {
    let r = r as f64;
    let tol = (r / 256.0).max(1.0);
    if tol >= r {
        return 8;
    }
    let step = 2.0 * (1.0 - tol / r).acos();
    ((TAU / step).ceil() as usize).max(8)
}

fn circle_points(c: Point, r: i64, steps: usize) -> Vec<Point> {
    (0..steps)
        .map(|k| {
            let th = k as f64 * TAU / steps as f64;
            Point::new(
                c.x + (r as f64 * th.cos()).round() as i64,
                c.y + (r as f64 * th.sin()).round() as i64,
            )
        })
        .collect()
}

/// Monotone-chain convex hull, counter-clockwise (positive area).
fn convex_hull(mut pts: Vec<Point>) -> Path {
    pts.sort();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let mut lower: Vec<Point> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && orient(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && orient(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}
