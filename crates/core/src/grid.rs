use serde::{Deserialize, Serialize};

use crate::value::{normalize, CellValue};

/// Zero-based sheet coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(R:{}, C:{})", self.row, self.col)
    }
}

/// Snapshot of a sheet's used range.
///
/// `cells[r][c]` sits at sheet coordinate `origin + (r, c)`. Rows may be
/// ragged; missing trailing cells read as `CellValue::Empty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    cells: Vec<Vec<CellValue>>,
    origin: Coord,
    width: usize,
}

static EMPTY: CellValue = CellValue::Empty;

impl Grid {
    pub fn new(cells: Vec<Vec<CellValue>>, origin: Coord) -> Self {
        let width = cells.iter().map(Vec::len).max().unwrap_or(0);
        Self { cells, origin, width }
    }

    /// Grid anchored at A1.
    pub fn from_rows(cells: Vec<Vec<CellValue>>) -> Self {
        Self::new(cells, Coord::default())
    }

    pub fn origin(&self) -> Coord {
        self.origin
    }

    pub fn height(&self) -> usize {
        self.cells.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width == 0
    }

    /// Cell at array index (not sheet coordinate). Out of range reads empty.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Cell at a sheet coordinate, empty when outside the snapshot.
    pub fn at(&self, coord: Coord) -> &CellValue {
        match (
            coord.row.checked_sub(self.origin.row),
            coord.col.checked_sub(self.origin.col),
        ) {
            (Some(r), Some(c)) => self.get(r, c),
            _ => &EMPTY,
        }
    }

    /// Translate an array index into a sheet coordinate.
    pub fn to_sheet(&self, row: usize, col: usize) -> Coord {
        Coord::new(self.origin.row + row, self.origin.col + col)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.cells.iter().map(Vec::as_slice)
    }

    pub fn row(&self, row: usize) -> &[CellValue] {
        self.cells.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Normalized text of one row, padded to the grid width.
    pub fn normalized_row(&self, row: usize) -> Vec<String> {
        (0..self.width).map(|c| normalize(self.get(row, c))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_read_as_empty() {
        let grid = Grid::from_rows(vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec!["d".into()],
        ]);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(1, 2), &CellValue::Empty);
        assert_eq!(grid.get(9, 9), &CellValue::Empty);
        assert_eq!(grid.normalized_row(1), vec!["d", "", ""]);
    }

    #[test]
    fn origin_offset_translates_coordinates() {
        let grid = Grid::new(vec![vec!["x".into(), "y".into()]], Coord::new(4, 2));
        assert_eq!(grid.to_sheet(0, 1), Coord::new(4, 3));
        assert_eq!(grid.at(Coord::new(4, 3)), &CellValue::from("y"));
        assert_eq!(grid.at(Coord::new(0, 0)), &CellValue::Empty);
    }

    #[test]
    fn from_rows_is_anchored_at_a1() {
        let grid = Grid::from_rows(vec![vec!["x".into()]]);
        assert_eq!(grid.origin(), Coord::default());
        assert_eq!(grid.at(Coord::new(0, 0)), &CellValue::from("x"));
    }

    #[test]
    fn empty_grid() {
        assert!(Grid::default().is_empty());
        assert!(Grid::from_rows(vec![vec![]]).is_empty());
    }
}
