//! Boolean operations on integer polygon soups.
//!
//! The engine works in three stages. Every edge of both inputs is split at
//! every crossing, endpoint touch, and collinear overlap, so afterwards two
//! sub-segments only ever meet at shared endpoints. Each unique geometric
//! sub-segment is then classified: the fill of each input immediately left
//! and right of the segment is measured with a vertical ray cast from the
//! segment midpoint, symbolically perturbed along the segment normal so
//! every comparison has a definite answer. A sub-segment survives when the
//! operation's fill differs across it, oriented with the filled side on
//! the left. Surviving segments are stitched into closed faces with a
//! tightest-left-turn rule at junction vertices.
//!
//! The result is even-odd normalised: outers positive, holes negative,
//! contours closed and disjoint. Degenerate input produces empty output,
//! never an error; callers cannot tell "legitimately empty" from
//! "numerically collapsed".

use crate::path::{clean_contour, signed_area2, FillRule, Path, Paths};
use crate::point::{orient, BoundingBox, Point};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A boolean operation over two soups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOp {
    Union,
    Difference,
    Intersection,
    Xor,
}

/// Applies `op` to `subject` and `clip`, both read under `rule`.
pub fn clip(subject: &[Path], clip: &[Path], op: ClipOp, rule: FillRule) -> Paths {
    clip_with_rules(subject, rule, clip, rule, op)
}

/// Normalises a soup: union with nothing.
pub fn simplify(paths: &[Path], rule: FillRule) -> Paths {
    clip_with_rules(paths, rule, &[], FillRule::EvenOdd, ClipOp::Union)
}

/// Full form with an independent fill rule per side.
pub(crate) fn clip_with_rules(
    subject: &[Path],
    subject_rule: FillRule,
    clip: &[Path],
    clip_rule: FillRule,
    op: ClipOp,
) -> Paths {
    let mut edges = collect_edges(subject, 0);
    edges.extend(collect_edges(clip, 1));
    if edges.is_empty() {
        return Vec::new();
    }
    let edges = subdivide(edges);
    let kept = classify(&edges, subject_rule, clip_rule, op);
    stitch(kept)
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    a: Point,
    b: Point,
    set: usize,
}

fn collect_edges(paths: &[Path], set: usize) -> Vec<Edge> {
    let mut edges = Vec::new();
    for path in paths {
        let Some(contour) = clean_contour(path) else {
            continue;
        };
        let n = contour.len();
        for i in 0..n {
            edges.push(Edge {
                a: contour[i],
                b: contour[(i + 1) % n],
                set,
            });
        }
    }
    edges
}

/// Splits every edge at every incidence with every other edge.
fn subdivide(edges: Vec<Edge>) -> Vec<Edge> {
    let boxes: Vec<BoundingBox> = edges
        .iter()
        .map(|e| {
            let mut bb = BoundingBox::of_point(e.a);
            bb.expand(e.b);
            bb
        })
        .collect();
    let mut splits: Vec<Vec<Point>> = vec![Vec::new(); edges.len()];
    for i in 0..edges.len() {
        for j in i + 1..edges.len() {
            if !boxes[i].overlaps(&boxes[j]) {
                continue;
            }
            let (head, tail) = splits.split_at_mut(j);
            edge_splits(&edges[i], &edges[j], &mut head[i], &mut tail[0]);
        }
    }

    let mut out = Vec::new();
    for (edge, mut pts) in edges.into_iter().zip(splits) {
        let d = edge.b - edge.a;
        pts.sort_by_key(|p| (*p - edge.a).dot(d));
        pts.dedup();
        let mut prev = edge.a;
        for p in pts.into_iter().chain(std::iter::once(edge.b)) {
            if p != prev {
                out.push(Edge { a: prev, b: p, set: edge.set });
                prev = p;
            }
        }
    }
    out
}

fn edge_splits(e: &Edge, f: &Edge, se: &mut Vec<Point>, sf: &mut Vec<Point>) {
    let o1 = orient(e.a, e.b, f.a);
    let o2 = orient(e.a, e.b, f.b);
    let o3 = orient(f.a, f.b, e.a);
    let o4 = orient(f.a, f.b, e.b);

    if o1 == 0 && o2 == 0 {
        // Collinear: overlapping parts break at each other's endpoints.
        for p in [f.a, f.b] {
            if strictly_between(e.a, e.b, p) {
                se.push(p);
            }
        }
        for p in [e.a, e.b] {
            if strictly_between(f.a, f.b, p) {
                sf.push(p);
            }
        }
        return;
    }

    let straddle_f = o1 != 0 && o2 != 0 && (o1 > 0) != (o2 > 0);
    let straddle_e = o3 != 0 && o4 != 0 && (o3 > 0) != (o4 > 0);
    if straddle_f && straddle_e {
        let t = o3 as f64 / (o3 - o4) as f64;
        let x = e.a.x as f64 + (e.b.x - e.a.x) as f64 * t;
        let y = e.a.y as f64 + (e.b.y - e.a.y) as f64 * t;
        let p = Point::new(x.round() as i64, y.round() as i64);
        if p != e.a && p != e.b {
            se.push(p);
        }
        if p != f.a && p != f.b {
            sf.push(p);
        }
        return;
    }

    // T-touches: an endpoint landing on the other edge's interior.
    if o1 == 0 && strictly_between(e.a, e.b, f.a) {
        se.push(f.a);
    }
    if o2 == 0 && strictly_between(e.a, e.b, f.b) {
        se.push(f.b);
    }
    if o3 == 0 && strictly_between(f.a, f.b, e.a) {
        sf.push(e.a);
    }
    if o4 == 0 && strictly_between(f.a, f.b, e.b) {
        sf.push(e.b);
    }
}

/// `p` lies strictly inside segment `a-b`; callers guarantee collinearity.
fn strictly_between(a: Point, b: Point, p: Point) -> bool {
    let d = b - a;
    let t = (p - a).dot(d);
    t > 0 && t < d.length_sq()
}

fn apply_op(op: ClipOp, a: bool, b: bool) -> bool {
    match op {
        ClipOp::Union => a | b,
        ClipOp::Difference => a & !b,
        ClipOp::Intersection => a & b,
        ClipOp::Xor => a ^ b,
    }
}

/// Keeps every unique sub-segment across which the operation's fill
/// changes, oriented with the filled side on the left.
fn classify(
    edges: &[Edge],
    subject_rule: FillRule,
    clip_rule: FillRule,
    op: ClipOp,
) -> Vec<(Point, Point)> {
    let keys: BTreeSet<(Point, Point)> = edges
        .iter()
        .map(|e| if e.a < e.b { (e.a, e.b) } else { (e.b, e.a) })
        .collect();

    let mut kept = Vec::new();
    for &(a, b) in &keys {
        let d = b - a;
        let left = Point::new(-d.y, d.x);
        let right = Point::new(d.y, -d.x);
        let (sub_l, clip_l) = side_fills(edges, a, b, left, subject_rule, clip_rule);
        let (sub_r, clip_r) = side_fills(edges, a, b, right, subject_rule, clip_rule);
        let inside_l = apply_op(op, sub_l, clip_l);
        let inside_r = apply_op(op, sub_r, clip_r);
        if inside_l != inside_r {
            kept.push(if inside_l { (a, b) } else { (b, a) });
        }
    }
    kept
}

/// Fill of each input on one side of segment `a-b`.
///
/// The query point is the segment midpoint (kept exact by doubling all
/// coordinates) displaced an infinitesimal along `n`; a vertical ray from
/// there is cast through every edge of the arrangement. Ties against the
/// unperturbed point are broken by the sign of the displacement, so the
/// count is exact for every input the subdivision stage has resolved.
fn side_fills(
    edges: &[Edge],
    a: Point,
    b: Point,
    n: Point,
    subject_rule: FillRule,
    clip_rule: FillRule,
) -> (bool, bool) {
    let qx = a.x as i128 + b.x as i128;
    let qy = a.y as i128 + b.y as i128;
    let mut crossings = [0u64; 2];
    let mut winding = [0i64; 2];
    for e in edges {
        if let Some(sign) = ray_hit(e, qx, qy, n) {
            crossings[e.set] += 1;
            winding[e.set] += sign;
        }
    }
    let fill = |rule: FillRule, set: usize| match rule {
        FillRule::EvenOdd => crossings[set] % 2 == 1,
        FillRule::NonZero => winding[set] != 0,
    };
    (fill(subject_rule, 0), fill(clip_rule, 1))
}

/// Does the upward ray from the perturbed query point cross edge `e`?
/// Returns the winding contribution when it does.
fn ray_hit(e: &Edge, qx: i128, qy: i128, n: Point) -> Option<i64> {
    let ax = 2 * e.a.x as i128;
    let ay = 2 * e.a.y as i128;
    let bx = 2 * e.b.x as i128;
    let by = 2 * e.b.y as i128;
    let a_right = perturbed_gt(ax, qx, n.x);
    let b_right = perturbed_gt(bx, qx, n.x);
    if a_right == b_right {
        return None;
    }
    let dx = bx - ax;
    let dy = by - ay;
    let primary = dx * (qy - ay) - dy * (qx - ax);
    let sign = if primary != 0 {
        primary.signum()
    } else {
        (dx * n.y as i128 - dy * n.x as i128).signum()
    };
    if !a_right {
        // Left-to-right span: crossed when the edge passes above the point.
        (sign < 0).then_some(1)
    } else {
        (sign > 0).then_some(-1)
    }
}

/// `v > q + eps * nx` with an infinitesimal eps.
fn perturbed_gt(v: i128, q: i128, nx: i64) -> bool {
    if v != q {
        v > q
    } else {
        nx < 0
    }
}

/// Chains directed segments into closed contours.
fn stitch(mut segs: Vec<(Point, Point)>) -> Paths {
    segs.sort();
    let mut by_start: BTreeMap<Point, Vec<usize>> = BTreeMap::new();
    for (i, s) in segs.iter().enumerate() {
        by_start.entry(s.0).or_default().push(i);
    }
    let mut used = vec![false; segs.len()];
    let mut out = Vec::new();

    for i in 0..segs.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let start = segs[i].0;
        let mut contour = vec![start];
        let mut cur = segs[i];
        loop {
            if cur.1 == start {
                if let Some(path) = finish_contour(contour) {
                    out.push(path);
                }
                break;
            }
            contour.push(cur.1);
            match pick_next(&segs, &by_start, &used, cur.1, cur.1 - cur.0) {
                Some(j) => {
                    used[j] = true;
                    cur = segs[j];
                }
                None => {
                    // Rounding left an open chain; drop it.
                    debug!(vertices = contour.len(), "dropping open chain");
                    break;
                }
            }
        }
    }
    out
}

/// Among the unused segments leaving `v`, picks the tightest left turn
/// relative to the incoming direction. This separates contours that touch
/// at a vertex instead of fusing them into a figure-eight.
fn pick_next(
    segs: &[(Point, Point)],
    by_start: &BTreeMap<Point, Vec<usize>>,
    used: &[bool],
    v: Point,
    d_in: Point,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    for &j in by_start.get(&v)? {
        if used[j] {
            continue;
        }
        match best {
            None => best = Some(j),
            Some(k) => {
                if turn_tighter(d_in, segs[j].1 - v, segs[k].1 - v) {
                    best = Some(j);
                }
            }
        }
    }
    best
}

/// True when `u` turns further left from `d_in` than `w` does.
fn turn_tighter(d_in: Point, u: Point, w: Point) -> bool {
    fn class(d_in: Point, u: Point) -> u8 {
        let c = d_in.cross(u);
        if c > 0 {
            2
        } else if c < 0 {
            0
        } else if d_in.dot(u) < 0 {
            3
        } else {
            1
        }
    }
    let cu = class(d_in, u);
    let cw = class(d_in, w);
    if cu != cw {
        cu > cw
    } else {
        w.cross(u) > 0
    }
}

/// Cleans a closed walk: collapses duplicates and straight-through
/// vertices, discards contours without area.
fn finish_contour(mut pts: Vec<Point>) -> Option<Path> {
    pts.dedup();
    while pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    loop {
        let n = pts.len();
        if n < 3 {
            return None;
        }
        let mut removed = false;
        let mut keep = Vec::with_capacity(n);
        for i in 0..n {
            let prev = pts[(i + n - 1) % n];
            let cur = pts[i];
            let next = pts[(i + 1) % n];
            let straight = orient(prev, cur, next) == 0 && (cur - prev).dot(next - cur) > 0;
            if straight {
                removed = true;
            } else {
                keep.push(cur);
            }
        }
        pts = keep;
        if !removed {
            break;
        }
    }
    if pts.len() < 3 || signed_area2(&pts) == 0 {
        None
    } else {
        Some(pts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{contains_point, locate_point, PointLocation};

    fn square(x0: i64, y0: i64, side: i64) -> Path {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ]
    }

    fn total_area2(paths: &[Path]) -> i128 {
        paths.iter().map(|p| signed_area2(p)).sum()
    }

    #[test]
    fn test_union_overlapping_squares() {
        let a = vec![square(0, 0, 100)];
        let b = vec![square(50, 50, 100)];
        let u = clip(&a, &b, ClipOp::Union, FillRule::EvenOdd);
        assert_eq!(u.len(), 1);
        // 2 * (10000 + 10000 - 2500)
        assert_eq!(total_area2(&u), 35_000);
        assert!(contains_point(&u, Point::new(75, 75), FillRule::EvenOdd));
        assert!(!contains_point(&u, Point::new(120, 20), FillRule::EvenOdd));
    }

    #[test]
    fn test_intersection_overlapping_squares() {
        let a = vec![square(0, 0, 100)];
        let b = vec![square(50, 50, 100)];
        let i = clip(&a, &b, ClipOp::Intersection, FillRule::EvenOdd);
        assert_eq!(i.len(), 1);
        assert_eq!(total_area2(&i), 5_000);
        let mut verts = i[0].clone();
        verts.sort();
        assert_eq!(
            verts,
            vec![
                Point::new(50, 50),
                Point::new(50, 100),
                Point::new(100, 50),
                Point::new(100, 100),
            ]
        );
    }

    #[test]
    fn test_difference_and_xor() {
        let a = vec![square(0, 0, 100)];
        let b = vec![square(50, 50, 100)];
        let d = clip(&a, &b, ClipOp::Difference, FillRule::EvenOdd);
        assert_eq!(total_area2(&d), 15_000);
        assert!(contains_point(&d, Point::new(25, 25), FillRule::EvenOdd));
        assert!(!contains_point(&d, Point::new(75, 75), FillRule::EvenOdd));
        let x = clip(&a, &b, ClipOp::Xor, FillRule::EvenOdd);
        assert_eq!(total_area2(&x), 30_000);
        assert!(!contains_point(&x, Point::new(75, 75), FillRule::EvenOdd));
    }

    #[test]
    fn test_difference_creates_hole() {
        let outer = vec![square(0, 0, 200)];
        let inner = vec![square(50, 50, 100)];
        let d = clip(&outer, &inner, ClipOp::Difference, FillRule::EvenOdd);
        assert_eq!(d.len(), 2);
        assert_eq!(total_area2(&d), 2 * (40_000 - 10_000));
        let pos = d.iter().filter(|p| signed_area2(p) > 0).count();
        let neg = d.iter().filter(|p| signed_area2(p) < 0).count();
        assert_eq!((pos, neg), (1, 1));
        assert_eq!(
            locate_point(&d, Point::new(100, 100), FillRule::EvenOdd),
            PointLocation::Outside
        );
        assert!(contains_point(&d, Point::new(25, 100), FillRule::EvenOdd));
    }

    #[test]
    fn test_union_disjoint() {
        let a = vec![square(0, 0, 10)];
        let b = vec![square(100, 100, 10)];
        let u = clip(&a, &b, ClipOp::Union, FillRule::EvenOdd);
        assert_eq!(u.len(), 2);
        assert_eq!(total_area2(&u), 400);
    }

    #[test]
    fn test_union_shared_edge_fuses() {
        let a = vec![square(0, 0, 10)];
        let b = vec![square(10, 0, 10)];
        let u = clip(&a, &b, ClipOp::Union, FillRule::EvenOdd);
        assert_eq!(u.len(), 1);
        assert_eq!(total_area2(&u), 400);
        // The shared edge and its collinear stubs are gone.
        assert_eq!(u[0].len(), 4);
    }

    #[test]
    fn test_union_corner_touch_stays_separate() {
        let a = vec![square(0, 0, 10)];
        let b = vec![square(10, 10, 10)];
        let u = clip(&a, &b, ClipOp::Union, FillRule::EvenOdd);
        assert_eq!(u.len(), 2);
        assert_eq!(total_area2(&u), 400);
        for path in &u {
            assert!(signed_area2(path) > 0);
            assert_ne!(path.first(), path.last());
        }
    }

    #[test]
    fn test_intersection_disjoint_is_empty() {
        let a = vec![square(0, 0, 10)];
        let b = vec![square(100, 0, 10)];
        assert!(clip(&a, &b, ClipOp::Intersection, FillRule::EvenOdd).is_empty());
    }

    #[test]
    fn test_degenerate_inputs() {
        let a = vec![square(0, 0, 10)];
        assert!(clip(&[], &[], ClipOp::Union, FillRule::EvenOdd).is_empty());
        let flat: Paths = vec![vec![Point::new(0, 0), Point::new(10, 0), Point::new(20, 0)]];
        assert!(clip(&flat, &[], ClipOp::Union, FillRule::EvenOdd).is_empty());
        let u = clip(&a, &flat, ClipOp::Union, FillRule::EvenOdd);
        assert_eq!(total_area2(&u), 200);
    }

    #[test]
    fn test_simplify_reorients_input() {
        let mut cw = square(0, 0, 10);
        cw.reverse();
        let s = simplify(&[cw], FillRule::EvenOdd);
        assert_eq!(s.len(), 1);
        assert_eq!(signed_area2(&s[0]), 200);
        assert_ne!(s[0].first(), s[0].last());
    }

    #[test]
    fn test_simplify_self_intersecting_bowtie() {
        // Figure-eight under even-odd: two triangles.
        let bowtie = vec![vec![
            Point::new(0, 0),
            Point::new(100, 100),
            Point::new(100, 0),
            Point::new(0, 100),
        ]];
        let s = simplify(&bowtie, FillRule::EvenOdd);
        assert_eq!(s.len(), 2);
        for p in &s {
            assert!(signed_area2(p) > 0);
        }
        assert!(contains_point(&s, Point::new(25, 50), FillRule::EvenOdd));
        assert!(contains_point(&s, Point::new(75, 50), FillRule::EvenOdd));
        assert!(!contains_point(&s, Point::new(50, 25), FillRule::EvenOdd));
    }

    #[test]
    fn test_nonzero_rule_keeps_overlap() {
        // Two overlapping same-direction squares in one soup.
        let soup = vec![square(0, 0, 100), square(50, 50, 100)];
        let nz = simplify(&soup, FillRule::NonZero);
        assert_eq!(total_area2(&nz), 35_000);
        let eo = simplify(&soup, FillRule::EvenOdd);
        assert_eq!(total_area2(&eo), 30_000);
    }
}
