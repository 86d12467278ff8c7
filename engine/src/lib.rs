//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the spreadsheet engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//!
//! The engine is a sparse grid of cells addressed by Position. Cells hold
//! text or formulas; formulas reference other cells, form a dependency
//! graph that is kept acyclic, and memoize their results until a mutation
//! somewhere upstream invalidates them.

pub mod cell;
mod dependency;
pub mod evaluator;
pub mod formula;
pub mod position;
pub mod sheet;

// Re-export commonly used types at the crate root
pub use cell::{Cell, CellValue, FormulaError, ESCAPE_SIGN, FORMULA_SIGN};
pub use evaluator::{EvalValue, Evaluator};
pub use formula::Formula;
pub use position::{col_from_letters, letters_from_col, Position, Size};
pub use sheet::{Sheet, SheetError};
