use crate::grid::{Grid, GridError, Position};
use crate::matcher::{detect, MatchSet};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SwapOutcome {
    /// The cells are not 4-neighbours. Nothing was touched.
    Rejected,
    /// The swap formed no match and was undone.
    Reverted,
    /// The swap stands; these are the matches it produced.
    Committed(MatchSet),
}

impl SwapOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SwapOutcome::Committed(_))
    }
}

pub fn is_adjacent(a: Position, b: Position) -> bool {
    a.manhattan_distance(b) == 1
}

/// Swaps `a` and `b` tentatively and keeps the swap only if it creates a match.
pub fn propose(grid: &mut Grid, a: Position, b: Position) -> Result<SwapOutcome, GridError> {
    grid.get(a)?;
    grid.get(b)?;
    if !is_adjacent(a, b) {
        return Ok(SwapOutcome::Rejected);
    }

    grid.swap(a, b)?;
    let matches = detect(grid);
    if matches.is_empty() {
        grid.swap(a, b)?;
        return Ok(SwapOutcome::Reverted);
    }
    Ok(SwapOutcome::Committed(matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::grid_from_text;

    #[test]
    fn diagonal_and_self_swaps_are_rejected() {
        let mut grid = grid_from_text(&["RGB", "GBR", "BRG"]);
        let before = grid.clone();
        let origin = Position::new(1, 1);
        assert_eq!(propose(&mut grid, origin, Position::new(0, 0)), Ok(SwapOutcome::Rejected));
        assert_eq!(propose(&mut grid, origin, origin), Ok(SwapOutcome::Rejected));
        assert_eq!(grid, before);
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let mut grid = grid_from_text(&["RGB", "GBR", "BRG"]);
        let before = grid.clone();
        assert!(propose(&mut grid, Position::new(2, 2), Position::new(2, 3)).is_err());
        assert_eq!(grid, before);
    }
}
