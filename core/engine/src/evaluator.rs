//! FILENAME: core/engine/src/evaluator.rs
//! PURPOSE: Evaluates AST expressions to compute cell values.
//! CONTEXT: After a formula is parsed into an AST, this module traverses the
//! tree and computes the numeric result. Cell lookups go through a caller
//! supplied function, so the evaluator does not care how cells are stored.
//!
//! COERCION RULES (applied when a formula reads another cell):
//! - absent or empty cell        --> 0.0
//! - numeric value               --> the number
//! - text                        --> parsed as a number if the entire string
//!                                   is numeric, otherwise #VALUE!
//! - error value                 --> #VALUE! (the category is not forwarded)
//!
//! Any non-finite arithmetic result (division by zero, overflow) becomes
//! #DIV/0!.

use crate::cell::{CellValue, FormulaError};
use tabula_parser::{BinaryOperator, Expression, Position, UnaryOperator};

/// The outcome of evaluating an expression: a finite number, or the error
/// that the owning cell will hold as its value.
pub type EvalResult = Result<f64, FormulaError>;

/// The formula evaluator. Holds a cell lookup function for reference nodes.
pub struct Evaluator<'a> {
    lookup: &'a dyn Fn(Position) -> Option<CellValue>,
}

impl<'a> Evaluator<'a> {
    pub fn new(lookup: &'a dyn Fn(Position) -> Option<CellValue>) -> Self {
        Evaluator { lookup }
    }

    /// Evaluates an AST expression and returns the result.
    pub fn evaluate(&self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Number(n) => Ok(*n),
            Expression::CellRef(pos) => self.eval_cell_ref(*pos),
            Expression::UnaryOp { op, operand } => self.eval_unary_op(*op, operand),
            Expression::BinaryOp { op, left, right } => self.eval_binary_op(*op, left, right),
        }
    }

    /// Evaluates a cell reference by looking up and coercing its value.
    fn eval_cell_ref(&self, pos: Position) -> EvalResult {
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }

        match (self.lookup)(pos) {
            // Missing cells read as zero
            None | Some(CellValue::Empty) => Ok(0.0),
            Some(CellValue::Number(n)) => Ok(n),
            Some(CellValue::Error(_)) => Err(FormulaError::Value),
            Some(CellValue::Text(text)) => {
                if text.is_empty() {
                    return Ok(0.0);
                }
                // The whole string must be numeric; trailing garbage fails
                text.parse::<f64>().map_err(|_| FormulaError::Value)
            }
        }
    }

    fn eval_unary_op(&self, op: UnaryOperator, operand: &Expression) -> EvalResult {
        let value = self.evaluate(operand)?;
        match op {
            UnaryOperator::Plus => Ok(value),
            UnaryOperator::Negate => Ok(-value),
        }
    }

    fn eval_binary_op(&self, op: BinaryOperator, left: &Expression, right: &Expression) -> EvalResult {
        let lhs = self.evaluate(left)?;
        let rhs = self.evaluate(right)?;

        let result = match op {
            BinaryOperator::Add => lhs + rhs,
            BinaryOperator::Subtract => lhs - rhs,
            BinaryOperator::Multiply => lhs * rhs,
            BinaryOperator::Divide => lhs / rhs,
        };

        // NaN and infinities all surface as #DIV/0!
        if result.is_finite() {
            Ok(result)
        } else {
            Err(FormulaError::Div0)
        }
    }
}
