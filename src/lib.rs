//! Match-3 engine: a grid of candies, swap validation, match detection and
//! cascade resolution, wrapped in a session with a move or time budget.
//!
//! Rendering and input are left to the caller, which drives a
//! [`GameSession`] and polls its [`GameEvent`]s.

pub mod cascade;
pub mod config;
pub mod gravity;
pub mod grid;
pub mod matcher;
pub mod refill;
pub mod session;
pub mod swap;

pub use cascade::{resolve, Cascade, CascadeResult, ScoringRules, Wave};
pub use config::{ConfigError, GameConfig, Mode};
pub use grid::{Alphabet, Cell, Grid, GridError, Position, Token};
pub use matcher::{detect, has_any_match, MatchSet};
pub use refill::{RandomTokenSource, SequenceTokenSource, TokenSource};
pub use session::{GameEvent, GameSession, GameState, SessionError};
pub use swap::SwapOutcome;

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use crate::grid::{Cell, Grid, Token};

    /// Builds a grid from one string per row: token letters, `.` for empty.
    pub fn grid_from_text(rows: &[&str]) -> Grid {
        let rows = rows
            .iter()
            .map(|line| {
                line.chars()
                    .map(|ch| match ch {
                        '.' => Cell::Empty,
                        other => Cell::Candy(
                            Token::from_symbol(other)
                                .unwrap_or_else(|| panic!("unknown token symbol {other:?}")),
                        ),
                    })
                    .collect()
            })
            .collect();
        Grid::from_rows(rows).expect("rows must be non-empty and equally long")
    }

    /// A board with no match, built from Blue, Orange, Green and Yellow only,
    /// so Red and Purple are free for carving runs in tests.
    ///
    /// ```text
    /// BOGYBO
    /// GYBOGY
    /// BOGYBO
    /// ```
    pub fn stable_grid(rows: usize, cols: usize) -> Grid {
        const STRIPES: [Token; 4] = [Token::Blue, Token::Orange, Token::Green, Token::Yellow];
        let mut grid = Grid::new(rows, cols);
        for pos in grid.positions().collect::<Vec<_>>() {
            let token = STRIPES[(pos.col + 2 * pos.row) % 4];
            grid.set(pos, Cell::Candy(token)).expect("position comes from the grid");
        }
        grid
    }
}
