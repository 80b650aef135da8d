//! FILENAME: core/engine/src/formula.rs
//! PURPOSE: The public formula object: parsed expression plus its references.
//! CONTEXT: `parse_formula` is the entry point for formula text (without the
//! leading '='). The resulting `Formula` can be evaluated against any cell
//! lookup, printed back with minimal parentheses, and asked for the cells it
//! references. The reference list is collected once, at construction.

use crate::cell::{CellValue, FormulaError};
use crate::evaluator::Evaluator;
use tabula_parser::{parse, Expression, ParseError, Position};

/// A parsed formula expression over numbers and cell references.
#[derive(Debug, Clone)]
pub struct Formula {
    ast: Expression,
    referenced: Vec<Position>,
}

/// Parses formula text (without the leading '=') into a [`Formula`].
pub fn parse_formula(expression: &str) -> Result<Formula, ParseError> {
    let ast = parse(expression)?;

    let mut referenced = Vec::new();
    collect_references(&ast, &mut referenced);
    referenced.sort();
    referenced.dedup();

    Ok(Formula { ast, referenced })
}

/// Walks the tree and records every in-bounds cell reference.
/// Out-of-bounds references (`Position::NONE`) are evaluation-time errors,
/// not dependencies.
fn collect_references(expr: &Expression, out: &mut Vec<Position>) {
    match expr {
        Expression::Number(_) => {}
        Expression::CellRef(pos) => {
            if pos.is_valid() {
                out.push(*pos);
            }
        }
        Expression::UnaryOp { operand, .. } => collect_references(operand, out),
        Expression::BinaryOp { left, right, .. } => {
            collect_references(left, out);
            collect_references(right, out);
        }
    }
}

impl Formula {
    /// Evaluates the formula. `lookup` resolves a position to the referenced
    /// cell's current value; `None` means the cell does not exist.
    ///
    /// Runtime failures (#REF!, #VALUE!, #DIV/0!) come back as the `Err`
    /// variant; they are ordinary values for the caller to store.
    pub fn evaluate<F>(&self, lookup: F) -> Result<f64, FormulaError>
    where
        F: Fn(Position) -> Option<CellValue>,
    {
        Evaluator::new(&lookup).evaluate(&self.ast)
    }

    /// Returns the expression text with minimal parentheses, no leading '='.
    pub fn expression(&self) -> String {
        self.ast.to_string()
    }

    /// Returns the referenced positions: valid ones only, sorted
    /// lexicographically by (row, col), without duplicates.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.referenced
    }
}
