//! FILENAME: engine/src/sheet.rs
//! PURPOSE: Manages the collection of cells (the spreadsheet itself).
//! CONTEXT: This module defines the `Sheet` struct, a sparse container
//! (HashMap keyed by Position) so massive sheets with mostly-empty space
//! stay cheap. The sheet also owns everything a single cell cannot decide
//! on its own: the write protocol for formulas, the printable rectangle,
//! the pool of references to cells that do not exist yet, and printing.
//!
//! WRITE PROTOCOL (set_cell), strictly ordered:
//!   1. parse            -- failure leaves the cell unchanged
//!   2. cycle check      -- failure leaves the cell unchanged, no edges
//!   3. invalidate       -- memoized results along the reverse-reachable
//!                          set are dropped
//!   4. repair edges     -- populated targets learn their new dependent;
//!                          missing targets go into the pending pool
//!   5. publish          -- content and raw text are installed
//!   6. resolve pending  -- formulas that were waiting for this position
//!                          wire up and recompute lazily

use log::{debug, trace};
use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};

use crate::cell::{Cell, CellContent, CellValue, FormulaError};
use crate::dependency;
use crate::evaluator::EvalValue;
use crate::position::{Position, Size};
use parser::ParseError;

/// Operational failures raised by mutating sheet operations.
/// Unlike `FormulaError` values these never become cell data.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// The operation was handed a position outside the grid.
    InvalidPosition(Position),
    /// Formula text that does not conform to the grammar.
    Parse(ParseError),
    /// The write would have made the dependency graph cyclic.
    CircularDependency(Position),
    /// Copy or move from a position with no cell behind it.
    MissingCell(Position),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::InvalidPosition(pos) => {
                write!(f, "invalid position ({}, {})", pos.row, pos.col)
            }
            SheetError::Parse(e) => write!(f, "{}", e),
            SheetError::CircularDependency(pos) => {
                write!(f, "circular dependency through {}", pos)
            }
            SheetError::MissingCell(pos) => write!(f, "no cell at {}", pos),
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for SheetError {
    fn from(e: ParseError) -> Self {
        SheetError::Parse(e)
    }
}

/// The Sheet struct holds the state of the spreadsheet.
#[derive(Debug)]
pub struct Sheet {
    /// Sparse storage: only populated positions are present.
    cells: HashMap<Position, Cell>,
    /// The printable rectangle; kept tight across every mutation.
    print: Size,
    /// Pending references: target position -> formula cells that mention it
    /// although it is not populated (yet, or anymore).
    pending_refs: HashMap<Position, HashSet<Position>>,
    /// Stable empty cell returned for reads of pending positions.
    dummy: OnceCell<Cell>,
}

impl Sheet {
    /// Creates a new, empty sheet.
    pub fn new() -> Self {
        Sheet {
            cells: HashMap::new(),
            print: Size::new(0, 0),
            pending_refs: HashMap::new(),
            dummy: OnceCell::new(),
        }
    }

    /// Sets the cell at `pos` from an input string, dispatching between
    /// empty, text and formula content. Re-setting a cell to its current
    /// raw text is a no-op.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        if let Some(cell) = self.cells.get(&pos) {
            if cell.raw_text() == text {
                return Ok(());
            }
        }

        // 1. only the formula path can fail to parse
        let content = CellContent::from_input(text)?;

        // 2. refuse the write before anything is touched
        let depends_on = match &content {
            CellContent::Formula { formula, .. } => formula.referenced_cells(),
            _ => Vec::new(),
        };
        if !depends_on.is_empty() && dependency::creates_cycle(&self.cells, pos, &depends_on) {
            debug!("rejected write to {}: would close a dependency cycle", pos);
            return Err(SheetError::CircularDependency(pos));
        }

        trace!("set {} = {:?}", pos, text);

        // 3. readers of the old content hold stale results now
        dependency::invalidate(&self.cells, pos);

        // pending registrations made for the old content are void
        self.withdraw_pending(pos);

        // 4. repair outgoing edges
        for &target in &depends_on {
            match self.cells.get_mut(&target) {
                Some(cell) => cell.add_dependent(pos),
                None => {
                    trace!("{} waits for {}", pos, target);
                    self.pending_refs.entry(target).or_default().insert(pos);
                }
            }
        }

        // 5. publish; an existing cell keeps its incoming edges
        self.cells
            .entry(pos)
            .or_default()
            .install(text.to_string(), content, depends_on);

        // the printable rectangle can only grow on insertion
        if self.print.rows <= pos.row {
            self.print.rows = pos.row + 1;
        }
        if self.print.cols <= pos.col {
            self.print.cols = pos.col + 1;
        }

        // 6. formulas that referenced this position before it existed
        self.resolve_pending(pos);

        Ok(())
    }

    /// Returns the cell at `pos`. A position that is referenced by some
    /// formula but not populated reads as the shared DUMMY empty cell, so
    /// the formula side sees a stable 0.0-valued cell; anything else
    /// unpopulated (including invalid positions) is None.
    pub fn get_cell(&self, pos: Position) -> Option<&Cell> {
        if let Some(cell) = self.cells.get(&pos) {
            return Some(cell);
        }
        if self.pending_refs.contains_key(&pos) {
            return Some(self.dummy());
        }
        None
    }

    /// Removes the cell at `pos`. Readers see their memoized results
    /// dropped first; the entry then disappears, its incoming edges move
    /// into the pending pool (so a repopulation re-wires them), and the
    /// printable rectangle is retightened if the cell sat on its boundary.
    /// Clearing an unpopulated position does nothing.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        let Some(cell) = self.cells.get(&pos) else {
            return Ok(());
        };

        trace!("clear {}", pos);

        // cells still naming `pos` in a formula go back to waiting for it
        let waiters: Vec<Position> = cell
            .dependents()
            .iter()
            .copied()
            .filter(|q| {
                self.cells
                    .get(q)
                    .is_some_and(|c| c.depends_on().contains(&pos))
            })
            .collect();

        dependency::invalidate(&self.cells, pos);
        self.withdraw_pending(pos);
        self.cells.remove(&pos);

        if !waiters.is_empty() {
            self.pending_refs.entry(pos).or_default().extend(waiters);
        }

        // a boundary clear means the rectangle may no longer be tight
        if pos.row + 1 >= self.print.rows || pos.col + 1 >= self.print.cols {
            self.recalculate_print_size();
        }
        Ok(())
    }

    /// Copies a cell by re-running its raw text through the write protocol
    /// at the destination; the destination therefore gets its own parse,
    /// cycle check and edge set.
    pub fn copy_cell(&mut self, from: Position, to: Position) -> Result<(), SheetError> {
        if !from.is_valid() {
            return Err(SheetError::InvalidPosition(from));
        }
        let text = match self.cells.get(&from) {
            Some(cell) => cell.raw_text().to_string(),
            None => return Err(SheetError::MissingCell(from)),
        };
        self.set_cell(to, &text)
    }

    /// Moves a cell: installs the source's raw text at the destination,
    /// then degrades the source to a raw cell (readers of the source see
    /// 0.0 and their memoized results are dropped). The source entry stays
    /// populated, so the printable rectangle does not shrink. Fails without
    /// side effects when the install at the destination fails.
    pub fn move_cell(&mut self, from: Position, to: Position) -> Result<(), SheetError> {
        if !from.is_valid() {
            return Err(SheetError::InvalidPosition(from));
        }
        if from == to {
            return Ok(());
        }
        let text = match self.cells.get(&from) {
            Some(cell) => cell.raw_text().to_string(),
            None => return Err(SheetError::MissingCell(from)),
        };
        self.set_cell(to, &text)?;

        trace!("move {} -> {}", from, to);
        dependency::invalidate(&self.cells, from);
        self.withdraw_pending(from);
        if let Some(cell) = self.cells.get_mut(&from) {
            cell.release();
        }
        Ok(())
    }

    /// The minimal bounding rectangle of populated cells, (0, 0) when the
    /// sheet is empty.
    pub fn printable_size(&self) -> Size {
        self.print
    }

    /// Prints the printable rectangle row by row: cell values, a tab
    /// between columns, a newline after every row. Empty, raw and absent
    /// cells contribute nothing but their separators; an empty sheet
    /// prints nothing at all.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell, sheet| {
            if cell.is_raw() {
                String::new()
            } else {
                cell.value(sheet).display_value()
            }
        })
    }

    /// Prints canonical texts instead of values; formulas keep their
    /// leading '=' and text cells keep their escape sign.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell, _| cell.text())
    }

    fn print_with<W: Write>(
        &self,
        out: &mut W,
        render: impl Fn(&Cell, &Sheet) -> String,
    ) -> io::Result<()> {
        let print = self.printable_size();
        for row in 0..print.rows {
            for col in 0..print.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    write!(out, "{}", render(cell, self))?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// True when some formula is waiting for `pos` to be populated.
    pub fn has_pending_reference(&self, pos: Position) -> bool {
        self.pending_refs.contains_key(&pos)
    }

    /// Reconciles the whole pending pool: entries whose target has been
    /// populated since are resolved, the rest stay in place. Normally
    /// resolution happens at write time; this is the periodic sweep.
    pub fn update_future_references(&mut self) {
        let ready: Vec<Position> = self
            .pending_refs
            .keys()
            .copied()
            .filter(|pos| self.cells.contains_key(pos))
            .collect();
        for pos in ready {
            self.resolve_pending(pos);
        }
    }

    /// True when no position is populated.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The number of populated positions.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Iterates over the populated positions and their cells, in no
    /// particular order.
    pub fn cells(&self) -> impl Iterator<Item = (&Position, &Cell)> {
        self.cells.iter()
    }

    /// Clears all cells, pending references and the printable rectangle.
    pub fn erase(&mut self) {
        debug!("erasing sheet ({} cells)", self.cells.len());
        self.cells.clear();
        self.pending_refs.clear();
        self.print = Size::new(0, 0);
    }

    /// Value equality: equal printable sizes and equal canonical texts at
    /// every populated, non-raw position.
    pub fn is_equal(&self, other: &Sheet) -> bool {
        if self.printable_size() != other.printable_size() {
            return false;
        }
        let texts = |sheet: &Sheet| -> HashMap<Position, String> {
            sheet
                .cells
                .iter()
                .filter(|(_, cell)| !cell.is_raw())
                .map(|(&pos, cell)| (pos, cell.text()))
                .collect()
        };
        texts(self) == texts(other)
    }

    /// Resolves one formula reference to a number: missing, raw and empty
    /// cells are 0.0; text must read as a number in full or the reference
    /// is a #VALUE!; formula cells contribute their (possibly memoized)
    /// result, errors included.
    pub(crate) fn resolve_reference(&self, pos: Position) -> EvalValue {
        let Some(cell) = self.cells.get(&pos) else {
            return Ok(0.0);
        };
        match cell.value(self) {
            CellValue::Empty => Ok(0.0),
            CellValue::Number(n) => Ok(n),
            CellValue::Text(text) => {
                if text.is_empty() {
                    Ok(0.0)
                } else {
                    text.parse::<f64>().map_err(|_| FormulaError::Value)
                }
            }
            CellValue::Error(e) => Err(e),
        }
    }

    /// The backing map, exposed for the dependency-traversal tests.
    #[cfg(test)]
    pub(crate) fn cell_map(&self) -> &HashMap<Position, Cell> {
        &self.cells
    }

    /// The lazily created virtual empty cell behind reads of pending
    /// positions.
    fn dummy(&self) -> &Cell {
        self.dummy.get_or_init(|| {
            let mut cell = Cell::new();
            cell.install(String::new(), CellContent::Empty, Vec::new());
            cell
        })
    }

    /// Removes every pending registration owned by `pos`; they described
    /// the cell's previous content.
    fn withdraw_pending(&mut self, pos: Position) {
        self.pending_refs.retain(|_, waiters| {
            waiters.remove(&pos);
            !waiters.is_empty()
        });
    }

    /// Wires up every formula cell that referenced `pos` while it was not
    /// populated: the new cell learns its dependents, whose memoized
    /// results are dropped transitively.
    fn resolve_pending(&mut self, pos: Position) {
        if let Some(waiters) = self.pending_refs.remove(&pos) {
            debug!("resolving {} pending reference(s) to {}", waiters.len(), pos);
            if let Some(cell) = self.cells.get_mut(&pos) {
                for &waiter in &waiters {
                    cell.add_dependent(waiter);
                }
            }
            for &waiter in &waiters {
                dependency::invalidate(&self.cells, waiter);
            }
        }
    }

    /// Rescans the populated positions for the tight bounding rectangle.
    /// O(n) in the number of populated cells.
    fn recalculate_print_size(&mut self) {
        let mut print = Size::new(0, 0);
        for pos in self.cells.keys() {
            if print.rows <= pos.row {
                print.rows = pos.row + 1;
            }
            if print.cols <= pos.col {
                print.cols = pos.col + 1;
            }
        }
        trace!(
            "printable area recomputed to {}x{}",
            print.rows,
            print.cols
        );
        self.print = print;
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}
