//! FILENAME: engine/src/formula.rs
//! PURPOSE: Couples a parsed formula AST with the positions it references.
//! CONTEXT: The parser crate works on textual labels; this module is the one
//! place that turns AST reference nodes into engine coordinates. The full
//! reference list keeps source order, duplicates and unresolvable labels
//! (as Position::NONE) for diagnostics; the deduplicated valid subset is
//! what the dependency graph consumes.

use crate::cell::FormulaError;
use crate::evaluator::{EvalValue, Evaluator};
use crate::position::Position;
use parser::{Expression, ParseError};

/// A parsed formula: the expression tree plus its reference list.
#[derive(Debug)]
pub struct Formula {
    expr: Expression,
    refs: Vec<Position>,
}

impl Formula {
    /// Parses an expression string (without the leading '=').
    pub fn parse(expression: &str) -> Result<Formula, ParseError> {
        let expr = parser::parse(expression)?;
        let mut refs = Vec::new();
        collect_references(&expr, &mut refs);
        Ok(Formula { expr, refs })
    }

    /// The canonical text of the expression: only the parentheses required
    /// by precedence and associativity survive.
    pub fn expression(&self) -> String {
        self.expr.to_string()
    }

    /// Evaluates the formula against a resolver that maps positions to
    /// numbers. An error raised by the resolver becomes the result.
    pub fn evaluate(&self, resolve: &dyn Fn(Position) -> Result<f64, FormulaError>) -> EvalValue {
        Evaluator::new(resolve).evaluate(&self.expr)
    }

    /// Every referenced position in source order, duplicates and
    /// unresolvable labels (as NONE) included. Callers filter and
    /// deduplicate to taste.
    pub fn reference_list(&self) -> &[Position] {
        &self.refs
    }

    /// The distinct valid referenced positions, in first-mention order.
    pub fn referenced_cells(&self) -> Vec<Position> {
        let mut distinct = Vec::new();
        for &pos in &self.refs {
            if pos.is_valid() && !distinct.contains(&pos) {
                distinct.push(pos);
            }
        }
        distinct
    }

    /// True when the expression mentions at least one cell label.
    pub fn has_depends(&self) -> bool {
        !self.refs.is_empty()
    }
}

/// Walks the tree in source order, collecting one entry per reference node.
fn collect_references(expr: &Expression, refs: &mut Vec<Position>) {
    match expr {
        Expression::Number(_) => {}
        Expression::CellRef(label) => refs.push(Position::from_a1(label)),
        Expression::UnaryOp { operand, .. } => collect_references(operand, refs),
        Expression::BinaryOp { left, right, .. } => {
            collect_references(left, refs);
            collect_references(right, refs);
        }
    }
}
