//! FILENAME: engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: A cell holds one of four content kinds (raw, empty, text or
//! formula), the raw input string it was set from, the memoized result of
//! its formula, and the two edge lists that make it a node of the
//! dependency graph. The content kind is a tagged enum; which variant a
//! cell gets is decided once, when the input string is dispatched.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;

use crate::evaluator::EvalValue;
use crate::formula::Formula;
use crate::position::Position;
use crate::sheet::Sheet;
use parser::ParseError;

/// Leading character that marks a formula cell ("=1+2").
pub const FORMULA_SIGN: char = '=';
/// Leading character that keeps a text cell literal ("'=not a formula").
pub const ESCAPE_SIGN: char = '\'';

/// Represents the evaluation-time errors a cell can hold (e.g. #DIV/0!).
/// These are ordinary cell values, not operational failures: a formula that
/// consumes an erroneous cell takes the error as its own result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormulaError {
    /// A formula mentions a label that names no position inside the grid.
    Ref,
    /// A referenced text cell does not read as a number.
    Value,
    /// A computation left the finite range of a double.
    Div0,
}

impl FormulaError {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#DIV/0!",
        }
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
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

impl CellValue {
    /// Returns the display value as a String.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => {
                // Format without unnecessary decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Error(e) => e.to_string(),
        }
    }
}

/// What a cell currently holds.
#[derive(Debug)]
pub(crate) enum CellContent {
    /// Never given data. Reads as 0.0 / "" and prints as nothing.
    Raw,
    /// Explicitly set to the empty string.
    Empty,
    /// Literal text, stored as entered (including any escape sign).
    Text(String),
    /// A parsed formula plus the memoized result of its last evaluation.
    Formula {
        formula: Formula,
        cache: RefCell<Option<EvalValue>>,
    },
}

impl CellContent {
    /// Dispatches an input string: empty -> Empty, "=" followed by at least
    /// one character -> parsed Formula, anything else -> Text. A lone "=" is
    /// text, as entered.
    pub(crate) fn from_input(text: &str) -> Result<CellContent, ParseError> {
        if text.is_empty() {
            return Ok(CellContent::Empty);
        }
        if let Some(expression) = text.strip_prefix(FORMULA_SIGN) {
            if !expression.is_empty() {
                let formula = Formula::parse(expression)?;
                return Ok(CellContent::Formula {
                    formula,
                    cache: RefCell::new(None),
                });
            }
        }
        Ok(CellContent::Text(text.to_string()))
    }
}

/// The atomic unit of the spreadsheet.
#[derive(Debug)]
pub struct Cell {
    /// The raw input string the cell was last set from.
    text: String,
    content: CellContent,
    /// Positions this cell references (outgoing edges), duplicate-free.
    depends_on: Vec<Position>,
    /// Positions whose formulas mention this cell (incoming edges),
    /// duplicate-free.
    dependents: Vec<Position>,
}

impl Cell {
    pub fn new() -> Self {
        Cell {
            text: String::new(),
            content: CellContent::Raw,
            depends_on: Vec::new(),
            dependents: Vec::new(),
        }
    }

    /// Installs already-dispatched content together with its raw input
    /// string and outgoing edge list. The protocol around this call (cycle
    /// check, cache invalidation, edge repair) is driven by the sheet;
    /// incoming edges survive the rewrite.
    pub(crate) fn install(&mut self, text: String, content: CellContent, depends_on: Vec<Position>) {
        self.text = text;
        self.content = content;
        self.depends_on = depends_on;
    }

    /// Releases content, raw text and outgoing edges, leaving the cell Raw.
    /// Incoming edges stay so invalidation keeps reaching former readers.
    pub(crate) fn release(&mut self) {
        self.text.clear();
        self.content = CellContent::Raw;
        self.depends_on.clear();
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.content, CellContent::Raw)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    pub fn is_text(&self) -> bool {
        matches!(self.content, CellContent::Text(_))
    }

    pub fn is_formula(&self) -> bool {
        matches!(self.content, CellContent::Formula { .. })
    }

    /// True when this cell references at least one other cell.
    pub fn is_reference(&self) -> bool {
        !self.depends_on.is_empty()
    }

    /// True when at least one other cell references this one.
    pub fn is_root(&self) -> bool {
        !self.dependents.is_empty()
    }

    /// The raw input string the cell was last set from.
    pub fn raw_text(&self) -> &str {
        &self.text
    }

    /// The typed value of the cell: "" for empty, the escaped-stripped text
    /// for text cells, the evaluation result for formulas and 0.0 for raw
    /// cells. Formula results are memoized; a cache miss triggers a lazy
    /// evaluation that resolves references through the sheet.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        match &self.content {
            CellContent::Raw => CellValue::Number(0.0),
            CellContent::Empty => CellValue::Empty,
            CellContent::Text(text) => match text.strip_prefix(ESCAPE_SIGN) {
                Some(stripped) => CellValue::Text(stripped.to_string()),
                None => CellValue::Text(text.clone()),
            },
            CellContent::Formula { formula, cache } => {
                let cached = *cache.borrow();
                let result = match cached {
                    Some(result) => result,
                    None => {
                        let result = formula.evaluate(&|pos| sheet.resolve_reference(pos));
                        *cache.borrow_mut() = Some(result);
                        result
                    }
                };
                match result {
                    Ok(n) => CellValue::Number(n),
                    Err(e) => CellValue::Error(e),
                }
            }
        }
    }

    /// The canonical textual representation: "" for empty and raw cells,
    /// the original text for text cells (escape sign retained), "=" plus
    /// the canonically printed expression for formulas.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Raw | CellContent::Empty => String::new(),
            CellContent::Text(text) => text.clone(),
            CellContent::Formula { formula, .. } => {
                format!("{}{}", FORMULA_SIGN, formula.expression())
            }
        }
    }

    /// Distinct valid positions referenced by the formula, in first-mention
    /// order. Empty for non-formula cells.
    pub fn referenced_cells(&self) -> Vec<Position> {
        match &self.content {
            CellContent::Formula { formula, .. } => formula.referenced_cells(),
            _ => Vec::new(),
        }
    }

    /// Outgoing edges: the cells this one depends on.
    pub fn depends_on(&self) -> &[Position] {
        &self.depends_on
    }

    /// Incoming edges: the cells that depend on this one.
    pub fn dependents(&self) -> &[Position] {
        &self.dependents
    }

    /// Records an incoming edge; duplicates are dropped.
    pub(crate) fn add_dependent(&mut self, pos: Position) {
        if !self.dependents.contains(&pos) {
            self.dependents.push(pos);
        }
    }

    /// Drops the memoized result, if any. Walking the dependents
    /// transitively is the dependency module's job.
    pub(crate) fn clear_own_cache(&self) {
        if let CellContent::Formula { cache, .. } = &self.content {
            cache.borrow_mut().take();
        }
    }

    /// True when a formula cell currently holds a memoized result.
    pub fn is_cached(&self) -> bool {
        match &self.content {
            CellContent::Formula { cache, .. } => cache.borrow().is_some(),
            _ => false,
        }
    }

    /// Value equality: two cells are equal when their canonical texts
    /// agree. Raw cells equal each other and nothing else.
    pub fn is_equal(&self, other: &Cell) -> bool {
        if self.is_raw() && other.is_raw() {
            return true;
        }
        if !self.is_raw() && !other.is_raw() {
            return self.text() == other.text();
        }
        false
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_from(text: &str) -> Cell {
        let mut cell = Cell::new();
        let content = CellContent::from_input(text).unwrap();
        let depends_on = match &content {
            CellContent::Formula { formula, .. } => formula.referenced_cells(),
            _ => Vec::new(),
        };
        cell.install(text.to_string(), content, depends_on);
        cell
    }

    #[test]
    fn test_input_dispatch() {
        assert!(cell_from("").is_empty());
        assert!(cell_from("hello").is_text());
        assert!(cell_from("=1+2").is_formula());
        // a lone '=' is just text
        assert!(cell_from("=").is_text());
        assert!(Cell::new().is_raw());
    }

    #[test]
    fn test_parse_failure_is_reported() {
        assert!(CellContent::from_input("=1+").is_err());
        assert!(CellContent::from_input("=(1").is_err());
    }

    #[test]
    fn test_escape_sign_strips_on_value_only() {
        let sheet = Sheet::new();
        let cell = cell_from("'=looks like a formula");
        assert_eq!(
            cell.value(&sheet),
            CellValue::Text("=looks like a formula".to_string())
        );
        assert_eq!(cell.text(), "'=looks like a formula");
        assert_eq!(cell.raw_text(), "'=looks like a formula");
    }

    #[test]
    fn test_raw_cell_reads_zero_and_empty_text() {
        let sheet = Sheet::new();
        let cell = Cell::new();
        assert_eq!(cell.value(&sheet), CellValue::Number(0.0));
        assert_eq!(cell.text(), "");
    }

    #[test]
    fn test_formula_text_is_canonical() {
        assert_eq!(cell_from("=1+(2*3)").text(), "=1+2*3");
        assert_eq!(cell_from("=(1+2)*3").text(), "=(1+2)*3");
    }

    #[test]
    fn test_referenced_cells_are_distinct_and_valid() {
        let cell = cell_from("=A1+B2+A1+ZZZ1");
        assert_eq!(
            cell.referenced_cells(),
            vec![Position::from_a1("A1"), Position::from_a1("B2")]
        );
        assert_eq!(cell.depends_on().len(), 2);
    }

    #[test]
    fn test_add_dependent_deduplicates() {
        let mut cell = Cell::new();
        let pos = Position::from_a1("A1");
        cell.add_dependent(pos);
        cell.add_dependent(pos);
        assert_eq!(cell.dependents(), &[pos]);
        assert!(cell.is_root());
    }

    #[test]
    fn test_value_equality() {
        assert!(Cell::new().is_equal(&Cell::new()));
        assert!(cell_from("5").is_equal(&cell_from("5")));
        // same canonical form, different spelling
        assert!(cell_from("=1+(2*3)").is_equal(&cell_from("=1+2*3")));
        assert!(!cell_from("5").is_equal(&Cell::new()));
        assert!(!cell_from("5").is_equal(&cell_from("6")));
    }

    #[test]
    fn test_display_value_formatting() {
        assert_eq!(CellValue::Number(9.0).display_value(), "9");
        assert_eq!(CellValue::Number(2.5).display_value(), "2.5");
        assert_eq!(CellValue::Empty.display_value(), "");
        assert_eq!(CellValue::Error(FormulaError::Div0).display_value(), "#DIV/0!");
    }

    #[test]
    fn test_formula_error_wire_forms() {
        assert_eq!(FormulaError::Ref.to_string(), "#REF!");
        assert_eq!(FormulaError::Value.to_string(), "#VALUE!");
        assert_eq!(FormulaError::Div0.to_string(), "#DIV/0!");
    }
}
