//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: This file contains the `Cell` variant and the `CellValue` /
//! `FormulaError` enums. A cell is Empty, literal Text, or a Formula; a
//! formula cell separates the user's input (the parsed expression) from the
//! calculated result (a one-slot value cache, refilled on demand).

use crate::formula::{parse_formula, Formula};
use crate::sheet::Sheet;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use tabula_parser::{ParseError, Position};

/// Marks formula input: "=1+2".
pub const FORMULA_SIGN: char = '=';
/// Escapes text that would otherwise look like a formula: "'=not a formula".
pub const ESCAPE_SIGN: char = '\'';

/// Represents the runtime errors a cell can hold (e.g., #DIV/0!).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormulaError {
    Ref,   // Reference outside the grid
    Value, // Operand that is not usable as a number
    Div0,  // Non-finite arithmetic result
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::Ref => write!(f, "#REF!"),
            FormulaError::Value => write!(f, "#VALUE!"),
            FormulaError::Div0 => write!(f, "#DIV/0!"),
        }
    }
}

/// Represents the calculated result or raw data within a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

/// The atomic unit of the spreadsheet.
#[derive(Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    Formula(FormulaCell),
}

/// A formula cell: the parsed expression plus a one-slot result cache.
/// `None` means the cache is invalid and the next read recomputes.
#[derive(Debug, Clone)]
pub struct FormulaCell {
    formula: Formula,
    cache: RefCell<Option<CellValue>>,
}

impl Cell {
    /// Builds a cell from raw input text.
    ///
    /// Empty input produces an Empty cell. Input starting with '=' (and at
    /// least one more character) is parsed as a formula; a parse failure
    /// propagates and the caller's existing cell stays untouched. Everything
    /// else, including a lone "=", is stored as literal text.
    pub fn parse(text: &str) -> Result<Cell, ParseError> {
        if text.is_empty() {
            return Ok(Cell::Empty);
        }

        match text.strip_prefix(FORMULA_SIGN) {
            Some(expression) if !expression.is_empty() => {
                let formula = parse_formula(expression)?;
                Ok(Cell::Formula(FormulaCell {
                    formula,
                    cache: RefCell::new(None),
                }))
            }
            _ => Ok(Cell::Text(text.to_string())),
        }
    }

    /// Returns the cell's current value, evaluating a formula if its cache
    /// is invalid. Cell lookups during evaluation go through `sheet`.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        match self {
            Cell::Empty => CellValue::Empty,
            Cell::Text(text) => {
                let value = text.strip_prefix(ESCAPE_SIGN).unwrap_or(text);
                CellValue::Text(value.to_string())
            }
            Cell::Formula(formula_cell) => formula_cell.value(sheet),
        }
    }

    /// Returns the cell's text as the user would re-enter it. Formula cells
    /// render as '=' plus the minimal-parentheses expression.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Formula(formula_cell) => {
                format!("{}{}", FORMULA_SIGN, formula_cell.formula.expression())
            }
        }
    }

    /// Returns the positions this cell's formula references, sorted and
    /// deduplicated. Empty and Text cells reference nothing.
    pub fn referenced_cells(&self) -> &[Position] {
        match self {
            Cell::Formula(formula_cell) => formula_cell.formula.referenced_cells(),
            _ => &[],
        }
    }

    /// Drops the cached formula result so the next read recomputes.
    /// Empty and Text values are pure functions of the stored text, so
    /// there is nothing to invalidate.
    pub fn invalidate_cache(&self) {
        if let Cell::Formula(formula_cell) = self {
            formula_cell.cache.borrow_mut().take();
        }
    }

    #[cfg(test)]
    pub(crate) fn cache_is_valid(&self) -> bool {
        match self {
            Cell::Formula(formula_cell) => formula_cell.cache.borrow().is_some(),
            _ => false,
        }
    }
}

impl FormulaCell {
    fn value(&self, sheet: &Sheet) -> CellValue {
        {
            let cache = self.cache.borrow();
            if let Some(value) = cache.as_ref() {
                return value.clone();
            }
        }

        let value = match self.formula.evaluate(|pos| sheet.cell_value(pos)) {
            Ok(number) => CellValue::Number(number),
            Err(error) => CellValue::Error(error),
        };

        *self.cache.borrow_mut() = Some(value.clone());
        value
    }
}
