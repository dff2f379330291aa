//! Operation compilers: from geometry to 2-D cutter-centre paths.
//!
//! Every compiler returns a list of [`CamPath`]s in machining order. The
//! cutter direction convention: the polygon algebra orients outers
//! positive, which is the conventional direction; `climb` reverses it.

use crate::error::{CamError, Result};
use crate::ops::{OpKind, Operation};
use millcut_geometry::{
    centroid, clip, crosses, dedup_vertices, locate_point, offset, offset_with_rule, ClipOp,
    FillRule, Path, Paths, Point, PointLocation,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A tool path plus the safety of its implicit closing segment.
///
/// `safe_to_close` is true when moving straight from the last point back to
/// the first cannot leave the operation's machinable region; the emitter
/// uses it to skip retracts between passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CamPath {
    pub path: Path,
    pub safe_to_close: bool,
}

/// Compiles one operation into its ordered tool paths.
///
/// An empty result means the geometry collapsed under cutter compensation;
/// the caller records that and skips the operation.
pub fn compile_operation(op: &Operation) -> Result<Vec<CamPath>> {
    match op.kind {
        OpKind::Pocket => Ok(pocket(op)),
        OpKind::OutlineInside => Ok(outline(op, true)),
        OpKind::OutlineOutside => Ok(outline(op, false)),
        OpKind::Engrave => Ok(engrave(op)),
        OpKind::Perforate | OpKind::Drill => Ok(drill(op)),
        OpKind::VCarve => Err(CamError::Unsupported {
            name: op.name.clone(),
            kind: op.kind,
        }),
    }
}

/// Clears the interior with rings shrinking by one step-over at a time.
/// Rings are accumulated innermost-first so the cutter finishes at the
/// outermost boundary, where a retract is cheapest.
fn pocket(op: &Operation) -> Vec<CamPath> {
    let start = offset_with_rule(&op.geometry, -op.cutter_diameter / 2, op.fill_rule);
    let bounds = start.clone();
    let step = op.step_over();
    let mut all: Paths = Vec::new();
    let mut current = start;
    while !current.is_empty() {
        prepend(&mut all, &current, op.climb);
        current = offset(&current, -step);
    }
    debug!(op = %op.name, rings = all.len(), "pocket rings generated");
    merge_paths(&bounds, all)
}

/// Cuts a band of `width` starting half a cutter inside or outside the
/// outline. The bounds annulus between the first and last offsets guards
/// the merge joins.
fn outline(op: &Operation, inside: bool) -> Vec<CamPath> {
    let cutter = op.cutter_diameter;
    let width = op.width.max(cutter);
    let each = op.step_over();
    let (mut current, bounds, sign, need_reverse) = if inside {
        let start = offset_with_rule(&op.geometry, -cutter / 2, op.fill_rule);
        let limit = offset_with_rule(&op.geometry, -(width - cutter / 2), op.fill_rule);
        let bounds = clip(&start, &limit, ClipOp::Difference, FillRule::EvenOdd);
        (start, bounds, -1i64, op.climb)
    } else {
        let start = offset_with_rule(&op.geometry, cutter / 2, op.fill_rule);
        let limit = offset_with_rule(&op.geometry, width - cutter / 2, op.fill_rule);
        let bounds = clip(&limit, &start, ClipOp::Difference, FillRule::EvenOdd);
        (start, bounds, 1i64, !op.climb)
    };

    let mut all: Paths = Vec::new();
    let mut current_width = cutter;
    while !current.is_empty() {
        prepend(&mut all, &current, need_reverse);
        if current_width >= width {
            break;
        }
        let next_width = current_width + each;
        if next_width > width {
            // Final correcting pass at exactly the remaining width.
            current = offset(&current, sign * (width - current_width));
            if !current.is_empty() {
                prepend(&mut all, &current, need_reverse);
            }
            break;
        }
        current_width = next_width;
        current = offset(&current, sign * each);
    }
    debug!(op = %op.name, rings = all.len(), "outline rings generated");
    merge_paths(&bounds, all)
}

/// Follows each contour literally, closing it so the cutter returns to the
/// start. The cutter diameter plays no part.
fn engrave(op: &Operation) -> Vec<CamPath> {
    let mut out = Vec::new();
    for contour in &op.geometry {
        let mut path = contour.clone();
        dedup_vertices(&mut path);
        if path.is_empty() {
            continue;
        }
        if op.climb {
            path.reverse();
        }
        if path.len() > 1 {
            path.push(path[0]);
        }
        out.push(CamPath {
            path,
            safe_to_close: true,
        });
    }
    out
}

/// One zero-length plunge path at the centroid of each contour.
fn drill(op: &Operation) -> Vec<CamPath> {
    op.geometry
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| {
            let p = centroid(c);
            CamPath {
                path: vec![p, p],
                safe_to_close: true,
            }
        })
        .collect()
}

fn prepend(all: &mut Paths, rings: &Paths, reverse: bool) {
    let mut block: Paths = rings.clone();
    if reverse {
        for p in &mut block {
            p.reverse();
        }
    }
    block.extend(all.drain(..));
    *all = block;
}

/// Merges closed paths into continuous tool paths.
///
/// Inputs are taken in order. Each candidate is rotated to the vertex
/// nearest the open end of the path under construction and appended (with
/// its closing vertex) when the connecting segment stays inside `bounds`:
/// it must not cross the boundary and its midpoint must lie in the filled
/// region, so paths over disjoint regions are never welded across the gap
/// between them. A candidate that fails the test starts a new output path.
/// Each output records whether its own closing segment is safe.
pub fn merge_paths(bounds: &[Path], paths: Paths) -> Vec<CamPath> {
    let mut iter = paths.into_iter().filter(|p| !p.is_empty());
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let mut merged: Vec<Path> = Vec::new();
    let mut current = close_ring(&first, 0);
    for next in iter {
        let end = *current.last().unwrap();
        let k = nearest_vertex(&next, end);
        if join_is_safe(bounds, end, next[k]) {
            for p in close_ring(&next, k) {
                if *current.last().unwrap() != p {
                    current.push(p);
                }
            }
        } else {
            merged.push(std::mem::replace(&mut current, close_ring(&next, k)));
        }
    }
    merged.push(current);
    merged
        .into_iter()
        .map(|path| {
            let safe = !crosses(bounds, path[0], *path.last().unwrap());
            CamPath {
                path,
                safe_to_close: safe,
            }
        })
        .collect()
}

/// A join segment is machinable only when it stays inside `bounds`: it may
/// not cross the boundary transversally, and its midpoint must sit in the
/// filled region (a segment through the open gap between two disjoint
/// regions crosses nothing, so absence of crossings alone proves nothing).
/// Boundary contact counts as inside: the bounds are a cutter-centre locus,
/// so their rim is machined.
fn join_is_safe(bounds: &[Path], a: Point, b: Point) -> bool {
    if a == b {
        return true;
    }
    if crosses(bounds, a, b) {
        return false;
    }
    let mid = Point::new((a.x + b.x) / 2, (a.y + b.y) / 2);
    locate_point(bounds, mid, FillRule::EvenOdd) != PointLocation::Outside
}

/// The ring rotated to start at vertex `k`, with the start repeated at the
/// end so a traversal cuts the full loop.
fn close_ring(path: &[Point], k: usize) -> Path {
    let mut out: Path = path[k..].to_vec();
    out.extend_from_slice(&path[..k]);
    if out.len() > 1 {
        out.push(out[0]);
    }
    out
}

fn nearest_vertex(path: &[Point], to: Point) -> usize {
    let mut best = 0;
    let mut best_d = i128::MAX;
    for (i, p) in path.iter().enumerate() {
        let d = p.distance_sq(to);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}
