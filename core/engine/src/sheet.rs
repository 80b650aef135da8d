//! FILENAME: core/engine/src/sheet.rs
//! PURPOSE: Manages the collection of cells (the spreadsheet itself).
//! CONTEXT: The `Sheet` owns every cell in a sparse map and orchestrates
//! edits: parsing input, rejecting cyclic formulas before anything changes,
//! auto-creating referenced cells, rewriting the dependency graph, and
//! invalidating downstream caches. It also computes the printable area and
//! renders the grid as tab-separated text.

use crate::cell::{Cell, CellValue};
use crate::dependency_graph::DependencyGraph;
use crate::error::SheetError;
use std::collections::HashMap;
use std::io::{self, Write};
use tabula_parser::Position;

/// Dimensions of the printable area: the smallest rectangle anchored at
/// (0, 0) containing every occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub rows: i32,
    pub cols: i32,
}

/// The sheet: a sparse map from position to cell plus the dependency graph
/// that keeps formula caches coherent.
#[derive(Debug, Default, Clone)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
    graph: DependencyGraph,
}

impl Sheet {
    /// Creates a new, empty sheet.
    pub fn new() -> Self {
        Sheet {
            cells: HashMap::new(),
            graph: DependencyGraph::new(),
        }
    }

    /// Sets the content of the cell at `pos` from raw input text.
    ///
    /// Empty text makes the cell Empty, a leading '=' makes it a formula,
    /// anything else is literal text. On any error — invalid position,
    /// malformed formula, or a formula that would close a reference loop —
    /// the sheet is left exactly as it was.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }

        let cell = Cell::parse(text)?;
        let references: Vec<Position> = cell.referenced_cells().to_vec();

        // The cycle check runs against the tentative references while the
        // graph still describes the previous state; nothing is committed yet.
        if matches!(cell, Cell::Formula(_)) {
            let precedents = references.iter().copied().collect();
            if self.graph.would_create_cycle(pos, &precedents) {
                return Err(SheetError::CircularDependency(pos));
            }
        }

        self.cells.insert(pos, cell);

        // A formula may reference cells that do not exist yet. They are
        // created Empty so that later edits to them invalidate this formula.
        for &reference in &references {
            self.cells.entry(reference).or_insert(Cell::Empty);
        }

        self.graph
            .set_dependencies(pos, references.into_iter().collect());

        self.invalidate_dependents(pos);
        Ok(())
    }

    /// Clears the cell at `pos`. The slot is removed outright; cells that
    /// reference it keep their edges and subsequently read it as empty.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }

        if self.cells.contains_key(&pos) {
            self.invalidate_dependents(pos);
            self.cells.remove(&pos);
            self.graph.clear_dependencies(pos);
        }

        Ok(())
    }

    /// Returns the cell at `pos`, or None if the slot is unoccupied.
    pub fn cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.cells.get(&pos))
    }

    /// Returns the current value of the cell at `pos`, if the slot is
    /// occupied. This is the lookup formulas evaluate through.
    pub fn cell_value(&self, pos: Position) -> Option<CellValue> {
        self.cells.get(&pos).map(|cell| cell.value(self))
    }

    /// Returns true if any formula on the sheet references `pos`.
    pub fn is_referenced(&self, pos: Position) -> bool {
        self.graph
            .get_dependents(pos)
            .is_some_and(|deps| !deps.is_empty())
    }

    /// Marks the caches of every formula transitively depending on `pos` as
    /// dirty. Their next read recomputes against the current sheet.
    fn invalidate_dependents(&self, pos: Position) {
        for dependent in self.graph.get_all_dependents(pos) {
            if let Some(cell) = self.cells.get(&dependent) {
                cell.invalidate_cache();
            }
        }
    }

    /// Computes the printable area. Auto-created empty cells occupy slots
    /// and count toward the bounds.
    pub fn printable_size(&self) -> Size {
        let mut size = Size::default();
        for pos in self.cells.keys() {
            size.rows = size.rows.max(pos.row + 1);
            size.cols = size.cols.max(pos.col + 1);
        }
        size
    }

    /// Prints every cell's value: fields separated by tabs, one line per
    /// row, a newline after every row, absent cells empty.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |sheet, pos| {
            sheet
                .cell_value(pos)
                .map(|value| value.to_string())
                .unwrap_or_default()
        })
    }

    /// Prints every cell's text (formulas in canonical form), in the same
    /// layout as `print_values`.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |sheet, pos| {
            sheet
                .cells
                .get(&pos)
                .map(|cell| cell.text())
                .unwrap_or_default()
        })
    }

    fn print_with<W: Write>(
        &self,
        out: &mut W,
        field: impl Fn(&Sheet, Position) -> String,
    ) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                write!(out, "{}", field(self, Position::new(row, col)))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::FormulaError;
    use pretty_assertions::assert_eq;

    fn pos(s: &str) -> Position {
        Position::parse(s)
    }

    fn value_at(sheet: &Sheet, s: &str) -> CellValue {
        sheet.cell_value(pos(s)).expect("cell should exist")
    }

    #[test]
    fn set_and_read_back_text_and_numbers() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "hello").unwrap();
        sheet.set_cell(pos("B1"), "42").unwrap();

        assert_eq!(value_at(&sheet, "A1"), CellValue::Text("hello".to_string()));
        assert_eq!(value_at(&sheet, "B1"), CellValue::Text("42".to_string()));
        assert_eq!(sheet.cell(pos("A1")).unwrap().unwrap().text(), "hello");
    }

    #[test]
    fn invalid_positions_are_rejected_everywhere() {
        let mut sheet = Sheet::new();

        assert!(matches!(
            sheet.set_cell(Position::NONE, "1"),
            Err(SheetError::InvalidPosition(_))
        ));
        assert!(matches!(
            sheet.clear_cell(Position::new(-1, 0)),
            Err(SheetError::InvalidPosition(_))
        ));
        assert!(matches!(
            sheet.cell(Position::new(0, 20000)),
            Err(SheetError::InvalidPosition(_))
        ));
    }

    #[test]
    fn malformed_formula_leaves_cell_unchanged() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "5").unwrap();

        assert!(matches!(
            sheet.set_cell(pos("A1"), "=1+"),
            Err(SheetError::Parse(_))
        ));
        assert_eq!(sheet.cell(pos("A1")).unwrap().unwrap().text(), "5");
    }

    #[test]
    fn formula_references_auto_create_empty_cells() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B2+C3").unwrap();

        for s in ["B2", "C3"] {
            let cell = sheet.cell(pos(s)).unwrap().expect("auto-created");
            assert!(matches!(cell, Cell::Empty));
        }
        assert!(sheet.is_referenced(pos("B2")));
        assert!(!sheet.is_referenced(pos("A1")));
    }

    #[test]
    fn self_reference_is_rejected_and_cell_stays_absent() {
        let mut sheet = Sheet::new();

        assert!(matches!(
            sheet.set_cell(pos("A1"), "=A1"),
            Err(SheetError::CircularDependency(_))
        ));
        assert!(sheet.cell(pos("A1")).unwrap().is_none());
    }

    #[test]
    fn two_cell_cycle_is_rejected_and_state_preserved() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();

        assert!(matches!(
            sheet.set_cell(pos("B1"), "=A1"),
            Err(SheetError::CircularDependency(_))
        ));

        // B1 is still the auto-created empty cell; A1 still evaluates
        assert!(matches!(
            sheet.cell(pos("B1")).unwrap().unwrap(),
            Cell::Empty
        ));
        assert_eq!(value_at(&sheet, "A1"), CellValue::Number(0.0));
    }

    #[test]
    fn longer_cycles_are_caught_too() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("B1"), "=C1").unwrap();

        assert!(matches!(
            sheet.set_cell(pos("C1"), "=A1/2"),
            Err(SheetError::CircularDependency(_))
        ));
    }

    #[test]
    fn replacing_a_formula_may_break_the_old_chain() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        // A1 no longer references B1, so B1 = A1 becomes legal
        sheet.set_cell(pos("A1"), "10").unwrap();
        sheet.set_cell(pos("B1"), "=A1").unwrap();

        assert_eq!(value_at(&sheet, "B1"), CellValue::Number(10.0));
    }

    #[test]
    fn edits_invalidate_downstream_caches() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("B1"), "2").unwrap();
        sheet.set_cell(pos("A1"), "=B1+1").unwrap();

        assert_eq!(value_at(&sheet, "A1"), CellValue::Number(3.0));
        assert!(sheet.cell(pos("A1")).unwrap().unwrap().cache_is_valid());

        sheet.set_cell(pos("B1"), "5").unwrap();
        assert!(!sheet.cell(pos("A1")).unwrap().unwrap().cache_is_valid());
        assert_eq!(value_at(&sheet, "A1"), CellValue::Number(6.0));
    }

    #[test]
    fn invalidation_travels_the_whole_chain() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "1").unwrap();
        sheet.set_cell(pos("B1"), "=A1*10").unwrap();
        sheet.set_cell(pos("C1"), "=B1*10").unwrap();

        assert_eq!(value_at(&sheet, "C1"), CellValue::Number(100.0));

        sheet.set_cell(pos("A1"), "2").unwrap();
        assert!(!sheet.cell(pos("B1")).unwrap().unwrap().cache_is_valid());
        assert!(!sheet.cell(pos("C1")).unwrap().unwrap().cache_is_valid());
        assert_eq!(value_at(&sheet, "C1"), CellValue::Number(200.0));
    }

    #[test]
    fn cleared_cells_read_as_zero_downstream() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("B1"), "2").unwrap();
        sheet.set_cell(pos("A1"), "=B1+1").unwrap();
        assert_eq!(value_at(&sheet, "A1"), CellValue::Number(3.0));

        sheet.clear_cell(pos("B1")).unwrap();

        assert!(sheet.cell(pos("B1")).unwrap().is_none());
        assert_eq!(value_at(&sheet, "A1"), CellValue::Number(1.0));
    }

    #[test]
    fn clearing_an_absent_cell_is_a_no_op() {
        let mut sheet = Sheet::new();
        sheet.clear_cell(pos("Q99")).unwrap();
        assert_eq!(sheet.printable_size(), Size::default());
    }

    #[test]
    fn printable_size_tracks_occupied_slots() {
        let mut sheet = Sheet::new();
        assert_eq!(sheet.printable_size(), Size { rows: 0, cols: 0 });

        sheet.set_cell(pos("B2"), "x").unwrap();
        assert_eq!(sheet.printable_size(), Size { rows: 2, cols: 2 });

        // Auto-created references widen the area
        sheet.set_cell(pos("A1"), "=D5").unwrap();
        assert_eq!(sheet.printable_size(), Size { rows: 5, cols: 4 });
    }

    #[test]
    fn print_values_renders_the_grid() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "1").unwrap();
        sheet.set_cell(pos("B1"), "=A1*2").unwrap();
        sheet.set_cell(pos("A2"), "text").unwrap();

        let mut out = Vec::new();
        sheet.print_values(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1\t2\ntext\t\n");
    }

    #[test]
    fn print_texts_renders_canonical_formulas() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=(1+2)").unwrap();
        sheet.set_cell(pos("B1"), "'=quoted").unwrap();

        let mut out = Vec::new();
        sheet.print_texts(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "=1+2\t'=quoted\n");
    }

    #[test]
    fn print_values_renders_errors() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=1/0").unwrap();

        assert_eq!(
            value_at(&sheet, "A1"),
            CellValue::Error(FormulaError::Div0)
        );

        let mut out = Vec::new();
        sheet.print_values(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "#DIV/0!\n");
    }
}
