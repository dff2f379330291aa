//! # millcut cam
//!
//! The CAM core: operation compilation, holding-tab handling, and G-code
//! emission for a three-axis router. Geometry comes in as integer polygon
//! soups (see `millcut-geometry`), operations and the job profile as plain
//! value types, and the result is a flat sequence of G-code lines plus any
//! per-operation errors.
//!
//! The whole surface is a pure function of its inputs: no I/O, no shared
//! state, no threads. `compile` may be called concurrently on disjoint
//! inputs, and identical inputs produce byte-identical output.

pub mod error;
pub mod gcode;
pub mod ops;
pub mod tabs;
pub mod toolpath;
pub mod units;

pub use error::{CamError, Result, Warning};
pub use gcode::{compile, CompileOutput, Job};
pub use ops::{OpKind, Operation};
pub use tabs::separate_tabs;
pub use toolpath::{compile_operation, merge_paths, CamPath};
pub use units::GcodeUnits;
