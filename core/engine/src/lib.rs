//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the Tabula spreadsheet engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//!
//! The engine is a sparse grid of cells. A cell is empty, literal text, or a
//! formula over other cells; reading a formula cell evaluates it lazily and
//! caches the result until a dependency changes. Edits keep a dependency
//! graph consistent, reject assignments that would create reference cycles,
//! and invalidate downstream caches through reverse edges.
//!
//! Everything runs single-threaded: reads may fill per-cell caches, so even
//! concurrent reads need external serialization.

pub mod cell;
pub mod dependency_graph;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod sheet;

// Re-export commonly used types at the crate root
pub use cell::{Cell, CellValue, FormulaError};
pub use dependency_graph::DependencyGraph;
pub use error::SheetError;
pub use evaluator::{EvalResult, Evaluator};
pub use formula::{parse_formula, Formula};
pub use sheet::{Sheet, Size};

// The formula language, re-exported so embedders need only this crate
pub use tabula_parser::{parse, Expression, ParseError, Position, MAX_COLS, MAX_ROWS};
