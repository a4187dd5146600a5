//! Error types for the canvas engine

use thiserror::Error;

use crate::shapes::ShapeId;

/// Why a shape description was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown shape type {0:?}")]
    UnknownShapeType(String),
    #[error("unknown color {0:?}")]
    UnknownColor(String),
    #[error("{0:?} is not a number")]
    NotANumber(String),
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("dimension {value} outside {min}..={max}")]
    DimensionOutOfRange { value: i32, min: i32, max: i32 },
    #[error("position ({x}, {y}) outside the canvas")]
    OutsideCanvas { x: i32, y: i32 },
    #[error("malformed shape record {0:?}")]
    MalformedRecord(String),
}

/// Failure of a canvas operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanvasError {
    #[error("shape {0} not found")]
    ShapeNotFound(ShapeId),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
