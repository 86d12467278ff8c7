//! FILENAME: engine/src/evaluator.rs
//! PURPOSE: Evaluates AST expressions to compute cell values.
//! CONTEXT: After a formula is parsed into an AST, this module traverses
//! the tree and computes the final result. Cell references are resolved
//! through a callback, so the evaluator stays ignorant of sheet storage;
//! the sheet supplies a resolver that reads (and lazily computes) other
//! cells.
//!
//! NUMERIC MODEL:
//! - All arithmetic is double precision.
//! - Any binary result outside the finite range is a #DIV/0!.
//! - A label that names no grid position is a #REF!.
//! - An error raised by the resolver aborts the walk and becomes the
//!   formula's result.

use crate::cell::FormulaError;
use crate::position::Position;
use parser::{BinaryOperator, Expression, UnaryOperator};

/// The outcome of evaluating a formula: a finite double or an error value.
pub type EvalValue = Result<f64, FormulaError>;

/// The formula evaluator. Holds the resolver used for cell lookups.
pub struct Evaluator<'a> {
    resolve: &'a dyn Fn(Position) -> EvalValue,
}

impl<'a> Evaluator<'a> {
    pub fn new(resolve: &'a dyn Fn(Position) -> EvalValue) -> Self {
        Evaluator { resolve }
    }

    /// Evaluates an expression tree.
    pub fn evaluate(&self, expr: &Expression) -> EvalValue {
        match expr {
            Expression::Number(n) => Ok(*n),
            Expression::CellRef(label) => self.eval_reference(label),
            Expression::UnaryOp { op, operand } => self.eval_unary(*op, operand),
            Expression::BinaryOp { left, op, right } => self.eval_binary(left, *op, right),
        }
    }

    fn eval_reference(&self, label: &str) -> EvalValue {
        let pos = Position::from_a1(label);
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }
        (self.resolve)(pos)
    }

    fn eval_unary(&self, op: UnaryOperator, operand: &Expression) -> EvalValue {
        let value = self.evaluate(operand)?;
        Ok(match op {
            UnaryOperator::Plus => value,
            UnaryOperator::Negate => -value,
        })
    }

    fn eval_binary(&self, left: &Expression, op: BinaryOperator, right: &Expression) -> EvalValue {
        let lhs = self.evaluate(left)?;
        let rhs = self.evaluate(right)?;
        let result = match op {
            BinaryOperator::Add => lhs + rhs,
            BinaryOperator::Subtract => lhs - rhs,
            BinaryOperator::Multiply => lhs * rhs,
            BinaryOperator::Divide => lhs / rhs,
        };
        if result.is_finite() {
            Ok(result)
        } else {
            Err(FormulaError::Div0)
        }
    }
}
