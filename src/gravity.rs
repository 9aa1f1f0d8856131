use crate::grid::{Cell, Grid, Position};

/// Drops every candy to the bottom of its column, keeping the order of the
/// survivors and leaving empties at the top. Returns how many cells moved.
pub fn apply_gravity(grid: &mut Grid) -> usize {
    let mut moved = 0;
    for col in 0..grid.cols() {
        let column = grid.column(col);
        let candies: Vec<Cell> = column.iter().copied().filter(|c| !c.is_empty()).collect();
        let gap = column.len() - candies.len();

        let settled = std::iter::repeat(Cell::Empty).take(gap).chain(candies);
        for (row, (cell, before)) in settled.zip(column.iter()).enumerate() {
            if cell != *before {
                if !cell.is_empty() {
                    moved += 1;
                }
                grid.put(Position::new(row, col), cell);
            }
        }
    }
    moved
}

/// True when no empty cell sits below a candy in any column.
pub fn is_settled(grid: &Grid) -> bool {
    (0..grid.cols()).all(|col| {
        grid.column(col)
            .windows(2)
            .all(|pair| pair[0].is_empty() || !pair[1].is_empty())
    })
}
