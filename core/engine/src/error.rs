//! FILENAME: core/engine/src/error.rs

use tabula_parser::{ParseError, Position};
use thiserror::Error;

/// Errors surfaced by sheet-level operations. These abort the operation and
/// leave the sheet unchanged; per-cell runtime errors (#REF! and friends) are
/// values, not errors, and live in `CellValue`.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("invalid position: ({}, {})", .0.row, .0.col)]
    InvalidPosition(Position),

    #[error("formula error: {0}")]
    Parse(#[from] ParseError),

    #[error("assignment to {0:?} would create a circular dependency")]
    CircularDependency(Position),
}
