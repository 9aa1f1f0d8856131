use std::collections::BTreeSet;

use crate::grid::{Cell, Grid, Position};

/// Positions matched by one detection pass, deduplicated and row-major ordered.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct MatchSet {
    positions: BTreeSet<Position>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pos: Position) -> bool {
        self.positions.insert(pos)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.positions.contains(&pos)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions.iter().copied()
    }
}

impl FromIterator<Position> for MatchSet {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MatchSet {
    type Item = Position;
    type IntoIter = std::collections::btree_set::IntoIter<Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.into_iter()
    }
}

/// Window length that counts as a match.
pub const RUN_LENGTH: usize = 3;

fn same_candy(cells: [Cell; RUN_LENGTH]) -> bool {
    match cells[0] {
        Cell::Empty => false,
        first => cells.iter().all(|c| *c == first),
    }
}

/// Every 3-window (horizontal, then vertical) holding three equal candies.
fn windows(grid: &Grid) -> impl Iterator<Item = [Position; RUN_LENGTH]> + '_ {
    let rows = grid.rows();
    let cols = grid.cols();

    let horizontal = (0..rows).flat_map(move |row| {
        (0..cols.saturating_sub(RUN_LENGTH - 1)).map(move |col| {
            [
                Position::new(row, col),
                Position::new(row, col + 1),
                Position::new(row, col + 2),
            ]
        })
    });
    let vertical = (0..cols).flat_map(move |col| {
        (0..rows.saturating_sub(RUN_LENGTH - 1)).map(move |row| {
            [
                Position::new(row, col),
                Position::new(row + 1, col),
                Position::new(row + 2, col),
            ]
        })
    });

    horizontal.chain(vertical).filter(move |window| {
        let cells = (*window).map(|pos| grid.get(pos).unwrap_or(Cell::Empty));
        same_candy(cells)
    })
}

/// All cells belonging to a run of three or more equal candies. Longer runs
/// come out as the union of their overlapping windows.
pub fn detect(grid: &Grid) -> MatchSet {
    windows(grid).flatten().collect()
}

/// Stops at the first matching window.
pub fn has_any_match(grid: &Grid) -> bool {
    windows(grid).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::grid_from_text;

    #[test]
    fn crossing_runs_share_their_corner_once() {
        let grid = grid_from_text(&[
            "RRR", //
            "RGB", //
            "RBG",
        ]);
        let matches = detect(&grid);
        assert_eq!(matches.len(), 5);
        assert!(matches.contains(Position::new(0, 0)));
    }

    #[test]
    fn empty_cells_never_match() {
        let grid = grid_from_text(&["...", "...", "..."]);
        assert!(detect(&grid).is_empty());
        assert!(!has_any_match(&grid));
    }

    #[test]
    fn narrow_grids_have_no_windows() {
        let grid = grid_from_text(&["RR", "RR"]);
        assert!(!has_any_match(&grid));
    }
}
