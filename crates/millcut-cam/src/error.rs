//! Error and warning types for toolpath compilation.
//!
//! Per-operation failures never abort a compilation: they are collected on
//! the output while the remaining operations proceed. Warnings are plain
//! tagged data delivered through a host callback; the host localises and
//! formats them.

use crate::ops::OpKind;
use thiserror::Error;

/// A per-operation compilation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CamError {
    /// The operation kind cannot be compiled. Fatal for that operation
    /// only.
    #[error("operation '{name}': {kind} is not supported")]
    Unsupported {
        /// The operation's display name.
        name: String,
        /// The refused kind.
        kind: OpKind,
    },

    /// The geometry collapsed to nothing after cutter-diameter
    /// compensation. The operation contributes no output.
    #[error("operation '{name}': geometry collapsed after cutter compensation")]
    DegenerateGeometry {
        /// The operation's display name.
        name: String,
    },

    /// A numeric input was out of range and clamped.
    #[error("parameter {param} clamped from {value} to {clamped}")]
    Clamped {
        /// Which parameter was clamped.
        param: &'static str,
        /// The rejected value.
        value: f64,
        /// The value used instead.
        clamped: f64,
    },
}

/// Host-facing warnings. The core never formats warning text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Warning {
    PassDepthTooSmall { value: f64 },
    CutDepthTooSmall { value: f64 },
    UnsupportedOperation { kind: OpKind },
}

/// Result type for operation compilation.
pub type Result<T> = std::result::Result<T, CamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CamError::Unsupported {
            name: "vee".to_string(),
            kind: OpKind::VCarve,
        };
        assert_eq!(err.to_string(), "operation 'vee': v-carve is not supported");

        let err = CamError::DegenerateGeometry {
            name: "slot".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'slot': geometry collapsed after cutter compensation"
        );

        let err = CamError::Clamped {
            param: "pass_depth",
            value: -1.0,
            clamped: 0.0,
        };
        assert_eq!(err.to_string(), "parameter pass_depth clamped from -1 to 0");
    }
}
