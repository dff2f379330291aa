//! G-code emission.
//!
//! [`compile`] turns a job plus an operation list into a flat sequence of
//! RS-274 lines: preamble, one section per operation with pass layering,
//! ramp entries and tab lift-overs, and a postamble. Output is absolute
//! positioning only, `G0`/`G1` motion, ASCII, one line per string, byte
//! identical across runs for identical inputs.

use crate::error::{CamError, Warning};
use crate::ops::Operation;
use crate::tabs::separate_tabs;
use crate::toolpath::{compile_operation, CamPath};
use crate::units::GcodeUnits;
use millcut_geometry::{offset, paths_bounds, simplify, BoundingBox, FillRule, Path, Paths, Point};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn as log_warn};

/// Machine and material profile for one G-code program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub gunits: GcodeUnits,
    /// Z of the material top, G-code units.
    pub top_z: f64,
    /// Absolute floor; no operation cuts below it.
    pub bot_z: f64,
    /// Height for collision-free rapids. Must be above `top_z`.
    pub safe_z: f64,
    /// Maximum Z descent per cutting layer; 0 disables layering.
    pub pass_depth: f64,
    pub plunge_feed: f64,
    pub cut_feed: f64,
    pub rapid_feed: f64,
    pub retract_feed: f64,
    /// Fractional digits for every coordinate and feed.
    pub decimal: usize,
    pub offset_x: f64,
    pub offset_y: f64,
    /// G-code units per internal unit.
    pub x_scale: f64,
    /// Negative: G-code Y points up, the internal Y points down.
    pub y_scale: f64,
    /// End the program over the origin.
    pub return_to_00: bool,
    /// Raw holding-tab polygons in internal units; bloated by half the
    /// cutter diameter per operation.
    pub tab_geometry: Paths,
    /// Height the cutter rides at over tabs. At or below `top_z`.
    pub tab_z: f64,
}

impl Job {
    /// A job with sensible defaults for the given unit system.
    pub fn new(gunits: GcodeUnits) -> Self {
        let scale = gunits.per_internal_unit();
        let mm = gunits == GcodeUnits::Mm;
        Self {
            gunits,
            top_z: 0.0,
            bot_z: -1.0e9,
            safe_z: if mm { 2.5 } else { 0.1 },
            pass_depth: if mm { 1.0 } else { 0.04 },
            plunge_feed: if mm { 100.0 } else { 4.0 },
            cut_feed: if mm { 400.0 } else { 16.0 },
            rapid_feed: if mm { 2500.0 } else { 100.0 },
            retract_feed: if mm { 500.0 } else { 20.0 },
            decimal: gunits.default_decimal(),
            offset_x: 0.0,
            offset_y: 0.0,
            x_scale: scale,
            y_scale: -scale,
            return_to_00: false,
            tab_geometry: Vec::new(),
            tab_z: 0.0,
        }
    }
}

/// The compiled program plus whatever went wrong per operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    /// One G-code line per element, no trailing newlines.
    pub lines: Vec<String>,
    pub errors: Vec<CamError>,
}

/// Compiles every operation and emits the full program.
///
/// Warnings stream through `warn`; per-operation errors are collected on
/// the output while the rest of the program is still produced. The
/// preamble and postamble are always present.
pub fn compile<F: FnMut(Warning)>(
    job: &Job,
    operations: &[Operation],
    mut warn: F,
) -> CompileOutput {
    let mut errors = Vec::new();

    let mut pass_depth = job.pass_depth;
    if pass_depth < 0.0 {
        log_warn!(value = pass_depth, "pass depth below zero, clamping");
        warn(Warning::PassDepthTooSmall { value: pass_depth });
        errors.push(CamError::Clamped {
            param: "pass_depth",
            value: pass_depth,
            clamped: 0.0,
        });
        pass_depth = 0.0;
    }

    let mut compiled: Vec<(usize, f64, Vec<CamPath>, Paths)> = Vec::new();
    for (i, op) in operations.iter().enumerate() {
        let mut cut_depth = op.cut_depth;
        if cut_depth < 0.0 {
            log_warn!(op = %op.name, value = cut_depth, "cut depth below zero, clamping");
            warn(Warning::CutDepthTooSmall { value: cut_depth });
            errors.push(CamError::Clamped {
                param: "cut_depth",
                value: cut_depth,
                clamped: 0.0,
            });
            cut_depth = 0.0;
        }
        match compile_operation(op) {
            Ok(paths) if paths.is_empty() => {
                debug!(op = %op.name, "skipping operation with collapsed geometry");
                errors.push(CamError::DegenerateGeometry {
                    name: op.name.clone(),
                });
            }
            Ok(paths) => {
                let tabs = if job.tab_geometry.is_empty() {
                    Vec::new()
                } else {
                    offset(
                        &simplify(&job.tab_geometry, FillRule::EvenOdd),
                        op.cutter_diameter / 2,
                    )
                };
                compiled.push((i, cut_depth, paths, tabs));
            }
            Err(e) => {
                if let CamError::Unsupported { kind, .. } = e {
                    warn(Warning::UnsupportedOperation { kind });
                }
                errors.push(e);
            }
        }
    }

    let bounds = paths_bounds(
        &operations
            .iter()
            .flat_map(|op| op.geometry.iter().cloned())
            .collect::<Paths>(),
    );

    let mut em = Emitter::new(job, pass_depth);
    em.preamble(bounds);
    for (i, cut_depth, paths, tabs) in &compiled {
        em.operation(*i, &operations[*i], *cut_depth, paths, tabs);
    }
    em.postamble();
    CompileOutput {
        lines: em.lines,
        errors,
    }
}

struct Emitter<'a> {
    job: &'a Job,
    pass_depth: f64,
    lines: Vec<String>,
    current_z: f64,
    current_xy: Option<Point>,
}

impl<'a> Emitter<'a> {
    fn new(job: &'a Job, pass_depth: f64) -> Self {
        Self {
            job,
            pass_depth,
            lines: Vec::new(),
            current_z: job.safe_z,
            current_xy: None,
        }
    }

    fn comment(&mut self, text: &str) {
        self.lines.push(format!("; {}", text));
    }

    fn coord(&self, v: f64) -> String {
        let v = if v == 0.0 { 0.0 } else { v };
        format!("{:.*}", self.job.decimal, v)
    }

    fn gx(&self, p: Point) -> f64 {
        p.x as f64 * self.job.x_scale + self.job.offset_x
    }

    fn gy(&self, p: Point) -> f64 {
        p.y as f64 * self.job.y_scale + self.job.offset_y
    }

    fn xy(&self, p: Point) -> String {
        format!("X{} Y{}", self.coord(self.gx(p)), self.coord(self.gy(p)))
    }

    fn seg_len(&self, a: Point, b: Point) -> f64 {
        let dx = self.gx(b) - self.gx(a);
        let dy = self.gy(b) - self.gy(a);
        (dx * dx + dy * dy).sqrt()
    }

    fn g1_z(&mut self, z: f64, feed: f64) {
        let line = format!("G1 Z{} F{}", self.coord(z), self.coord(feed));
        self.lines.push(line);
        self.current_z = z;
    }

    fn retract(&mut self) {
        self.comment("Retract");
        self.g1_z(self.job.safe_z, self.job.retract_feed);
    }

    fn preamble(&mut self, bounds: Option<BoundingBox>) {
        self.comment("Generated by millcut");
        if let Some(bb) = bounds {
            let xs = [self.gx(bb.min), self.gx(bb.max)];
            let ys = [self.gy(bb.min), self.gy(bb.max)];
            self.comment(&format!(
                "Bounds: X{} Y{} to X{} Y{}",
                self.coord(xs[0].min(xs[1])),
                self.coord(ys[0].min(ys[1])),
                self.coord(xs[0].max(xs[1])),
                self.coord(ys[0].max(ys[1])),
            ));
        }
        self.comment(&format!(
            "Offset: X{} Y{}",
            self.coord(self.job.offset_x),
            self.coord(self.job.offset_y)
        ));
        self.lines.push(self.job.gunits.directive().to_string());
        self.lines.push("G90 ; Absolute positioning".to_string());
        self.lines.push(format!(
            "G0 Z{} F{} ; Move to clearance level",
            self.coord(self.job.safe_z),
            self.coord(self.job.rapid_feed)
        ));
        self.current_z = self.job.safe_z;
    }

    fn postamble(&mut self) {
        self.lines.push(String::new());
        if self.job.return_to_00 {
            self.lines
                .push(format!("G0 X0 Y0 F{}", self.coord(self.job.rapid_feed)));
        }
        self.lines.push("M2".to_string());
    }

    fn pass_count(&self, depth: f64) -> usize {
        if depth <= 0.0 || self.pass_depth <= 0.0 {
            return 1;
        }
        (depth / self.pass_depth).ceil().max(1.0) as usize
    }

    fn operation(
        &mut self,
        idx: usize,
        op: &Operation,
        cut_depth: f64,
        paths: &[CamPath],
        tabs: &[Path],
    ) {
        let bot_z = (self.job.top_z - cut_depth).max(self.job.bot_z);
        let depth = self.job.top_z - bot_z;
        let passes = if op.kind.precalculated_z() {
            1
        } else {
            self.pass_count(depth)
        };
        self.lines.push(String::new());
        self.comment(&format!("Operation {}: {} ({})", idx, op.name, op.kind));
        self.comment(&format!(
            "Direction: {}  Cutter dia: {}",
            op.direction_name(),
            self.coord(op.cutter_diameter as f64 * self.job.x_scale.abs())
        ));
        self.comment(&format!(
            "Depth: top {} bottom {} passes {}",
            self.coord(self.job.top_z),
            self.coord(bot_z),
            passes
        ));
        self.comment(&format!(
            "Feeds: cut {} plunge {} retract {}",
            self.coord(self.job.cut_feed),
            self.coord(self.job.plunge_feed),
            self.coord(self.job.retract_feed)
        ));

        if op.kind.precalculated_z() {
            for cp in paths {
                self.emit_drill(cp, bot_z);
            }
        } else {
            for (pi, cp) in paths.iter().enumerate() {
                let next_start = paths.get(pi + 1).and_then(|n| n.path.first()).copied();
                self.emit_path(op, cp, pi, bot_z, passes, tabs, next_start);
            }
        }
        if self.current_z < self.job.safe_z {
            self.retract();
        }
    }

    /// A plunge-and-retract cycle at the path's single point. Pass
    /// layering is bypassed: one plunge to full depth.
    fn emit_drill(&mut self, cp: &CamPath, bot_z: f64) {
        let Some(&p) = cp.path.first() else { return };
        if self.current_z < self.job.safe_z {
            self.retract();
        }
        self.comment("Drill");
        self.lines.push(format!(
            "G0 {} F{}",
            self.xy(p),
            self.coord(self.job.rapid_feed)
        ));
        self.current_xy = Some(p);
        self.comment("Plunge");
        self.g1_z(bot_z, self.job.plunge_feed);
        self.retract();
    }

    fn emit_path(
        &mut self,
        op: &Operation,
        cp: &CamPath,
        idx: usize,
        bot_z: f64,
        passes: usize,
        tabs: &[Path],
        next_start: Option<Point>,
    ) {
        let path = &cp.path;
        if path.is_empty() {
            return;
        }
        let top = self.job.top_z;
        let has_tabs = !tabs.is_empty();
        let separated = if has_tabs {
            separate_tabs(path, tabs)
        } else {
            Vec::new()
        };
        let step = (top - bot_z) / passes as f64;

        self.lines.push(String::new());
        self.comment(&format!("Path {}", idx));
        let mut finished_z = top;
        for pass in 1..=passes {
            let next_z = (top - step * pass as f64).max(bot_z);
            if self.current_z < self.job.safe_z && (has_tabs || !cp.safe_to_close) {
                self.retract();
            }
            let entry_z = if has_tabs {
                finished_z.max(self.job.tab_z)
            } else {
                finished_z
            };
            self.comment("Rapid to initial position");
            self.lines.push(format!(
                "G0 {} F{}",
                self.xy(path[0]),
                self.coord(self.job.rapid_feed)
            ));
            self.current_xy = Some(path[0]);
            self.lines.push(format!("G0 Z{}", self.coord(entry_z)));
            self.current_z = entry_z;

            let whole = std::slice::from_ref(path);
            let selected: &[Path] = if !has_tabs || next_z >= self.job.tab_z {
                whole
            } else {
                &separated
            };

            for (si, sub) in selected.iter().enumerate() {
                if sub.is_empty() {
                    continue;
                }
                let mut start_idx = 1;
                if si == 0 {
                    let ramped = if op.ramp {
                        self.ramp_entry(sub, next_z)
                    } else {
                        None
                    };
                    match ramped {
                        Some(resume) => start_idx = resume,
                        None => {
                            self.comment("Plunge");
                            self.g1_z(next_z, self.job.plunge_feed);
                        }
                    }
                } else if si % 2 == 1 {
                    self.comment("Retract for tab");
                    self.g1_z(self.job.tab_z, self.job.retract_feed);
                } else {
                    self.comment("Plunge after tab");
                    self.g1_z(next_z, self.job.plunge_feed);
                }
                let mut first_cut = true;
                for &p in sub.iter().skip(start_idx) {
                    let feed = if first_cut {
                        format!(" F{}", self.coord(self.job.cut_feed))
                    } else {
                        String::new()
                    };
                    self.lines.push(format!("G1 {}{}", self.xy(p), feed));
                    first_cut = false;
                    self.current_xy = Some(p);
                }
            }
            finished_z = next_z;
        }

        let stay = cp.safe_to_close
            && match (self.current_xy, next_start) {
                (Some(cur), Some(next)) => close_enough(cur, next, op.cutter_diameter),
                _ => false,
            };
        if !stay && self.current_z < self.job.safe_z {
            self.retract();
        }
    }

    /// Descends to `next_z` along the leading segments of `sub` at plunge
    /// feed. The ramp length is the distance the cutter covers at cut feed
    /// during the plunge time, capped at the path length. Returns the
    /// vertex index cutting resumes from, or `None` when no ramp fits.
    fn ramp_entry(&mut self, sub: &[Point], next_z: f64) -> Option<usize> {
        let dz = self.current_z - next_z;
        if dz <= 0.0 || sub.len() < 2 {
            return None;
        }
        let total: f64 = sub.windows(2).map(|w| self.seg_len(w[0], w[1])).sum();
        if total <= 0.0 {
            return None;
        }
        let ideal = self.job.cut_feed * dz / self.job.plunge_feed.max(1e-9);
        let ramp_len = ideal.min(total);
        self.comment("Ramp");
        let from_z = self.current_z;
        let mut cum = 0.0;
        let mut i = 1;
        let mut first = true;
        while i < sub.len() {
            cum += self.seg_len(sub[i - 1], sub[i]);
            let frac = (cum / ramp_len).min(1.0);
            let z = from_z - dz * frac;
            let feed = if first {
                format!(" F{}", self.coord(self.job.plunge_feed))
            } else {
                String::new()
            };
            self.lines
                .push(format!("G1 {} Z{}{}", self.xy(sub[i]), self.coord(z), feed));
            first = false;
            self.current_xy = Some(sub[i]);
            self.current_z = z;
            i += 1;
            if frac >= 1.0 {
                break;
            }
        }
        Some(i)
    }
}

fn close_enough(a: Point, b: Point, cutter_diameter: i64) -> bool {
    let tol = (cutter_diameter / 1000) as i128;
    a.distance_sq(b) <= tol * tol
}
