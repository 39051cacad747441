//! Anchor search over a sheet snapshot.
//!
//! Two independent scans over the same grid:
//! - the row anchor is searched column by column (left-most column wins, then
//!   top-most row within it) with a case-insensitive regex search;
//! - the column anchor is searched row by row (top-most row wins, then
//!   left-most column within it) with a case-insensitive substring test.
//!
//! The drill target combines the row of the first with the column of the
//! second, so the two anchors may come from different cells.

use recap_core::{normalize, Coord, Grid};
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Anchors {
    pub row_anchor: Coord,
    pub col_anchor: Coord,
}

impl Anchors {
    /// The cell to drill into.
    pub fn target(&self) -> Coord {
        Coord::new(self.row_anchor.row, self.col_anchor.col)
    }
}

/// Both anchors, or `None` when either scan finds nothing.
pub fn resolve_anchors(grid: &Grid, row_pattern: &Regex, col_keyword: &str) -> Option<Anchors> {
    let row_anchor = find_row_anchor(grid, row_pattern);
    let col_anchor = find_col_anchor(grid, col_keyword);
    match (row_anchor, col_anchor) {
        (Some(row_anchor), Some(col_anchor)) => Some(Anchors { row_anchor, col_anchor }),
        _ => None,
    }
}

/// Column-major scan. `pattern` is expected to be case-insensitive.
pub fn find_row_anchor(grid: &Grid, pattern: &Regex) -> Option<Coord> {
    for c in 0..grid.width() {
        for r in 0..grid.height() {
            if pattern.is_match(&normalize(grid.get(r, c))) {
                let at = grid.to_sheet(r, c);
                log::info!("row anchor found at {at}");
                return Some(at);
            }
        }
    }
    None
}

/// Row-major scan with a case-insensitive substring test.
pub fn find_col_anchor(grid: &Grid, keyword: &str) -> Option<Coord> {
    let needle = keyword.to_lowercase();
    for r in 0..grid.height() {
        for c in 0..grid.width() {
            if normalize(grid.get(r, c)).to_lowercase().contains(&needle) {
                let at = grid.to_sheet(r, c);
                log::info!("column anchor found at {at}");
                return Some(at);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_core::CellValue;
    use regex::RegexBuilder;

    fn pattern(p: &str) -> Regex {
        RegexBuilder::new(p).case_insensitive(true).build().unwrap()
    }

    fn text_grid(rows: &[&[&str]]) -> Grid {
        Grid::from_rows(
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|s| if s.is_empty() { CellValue::Empty } else { CellValue::from(*s) })
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn combines_independent_anchors() {
        let grid = text_grid(&[
            &["", "", "", "Grand Total"],
            &["", "Region", "", ""],
            &["", "Bandar Lampung", "", "12"],
        ]);
        let anchors = resolve_anchors(&grid, &pattern("bandar.*lampung"), "Grand Total").unwrap();
        assert_eq!(anchors.row_anchor, Coord::new(2, 1));
        assert_eq!(anchors.col_anchor, Coord::new(0, 3));
        assert_eq!(anchors.target(), Coord::new(2, 3));
    }

    #[test]
    fn row_anchor_prefers_left_column_over_earlier_row() {
        let grid = text_grid(&[
            &["", "", "KC Bandar Lampung"],
            &["", "", ""],
            &["", "Bandar Lampung Utara", ""],
        ]);
        let at = find_row_anchor(&grid, &pattern("bandar.*lampung")).unwrap();
        assert_eq!(at, Coord::new(2, 1));
    }

    #[test]
    fn col_anchor_prefers_top_row_then_left() {
        let grid = text_grid(&[
            &["", "", ""],
            &["", "grand total A", "GRAND TOTAL B"],
            &["Grand Total C", "", ""],
        ]);
        let at = find_col_anchor(&grid, "Grand Total").unwrap();
        assert_eq!(at, Coord::new(1, 1));
    }

    #[test]
    fn regex_is_a_search_not_a_full_match() {
        let grid = text_grid(&[&["Kanwil Bandar  Lampung (2)"]]);
        assert!(find_row_anchor(&grid, &pattern("bandar.*lampung")).is_some());
    }

    #[test]
    fn numbers_are_matched_in_normalized_form() {
        let grid = Grid::from_rows(vec![vec![CellValue::Number(8204.0)]]);
        assert_eq!(find_row_anchor(&grid, &pattern("^8204$")), Some(Coord::new(0, 0)));
        assert_eq!(find_col_anchor(&grid, "8204"), Some(Coord::new(0, 0)));
    }

    #[test]
    fn either_scan_missing_is_unresolved() {
        let grid = text_grid(&[&["Bandar Lampung", "Subtotal"]]);
        assert!(resolve_anchors(&grid, &pattern("bandar.*lampung"), "Grand Total").is_none());
        assert!(resolve_anchors(&grid, &pattern("palembang"), "Subtotal").is_none());
    }

    #[test]
    fn coordinates_include_origin_offset() {
        let grid = Grid::new(
            vec![
                vec![CellValue::Empty, CellValue::from("Grand Total")],
                vec![CellValue::from("Bandar Lampung"), CellValue::Number(3.0)],
            ],
            Coord::new(5, 2),
        );
        let anchors = resolve_anchors(&grid, &pattern("lampung"), "grand").unwrap();
        assert_eq!(anchors.row_anchor, Coord::new(6, 2));
        assert_eq!(anchors.col_anchor, Coord::new(5, 3));
        assert_eq!(anchors.target(), Coord::new(6, 3));
    }
}
