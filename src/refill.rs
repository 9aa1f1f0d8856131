use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::grid::{Alphabet, Cell, Grid, Token};
use crate::matcher::detect;

// ============================================================================
// Token Source Trait
// ============================================================================

/// Where new candies come from. Injected into sessions so tests can script
/// or seed the board.
pub trait TokenSource {
    fn next_token(&mut self, alphabet: &Alphabet) -> Token;
}

/// Uniform draw over the alphabet.
#[derive(Debug, Clone)]
pub struct RandomTokenSource {
    rng: StdRng,
}

impl RandomTokenSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for RandomTokenSource {
    fn next_token(&mut self, alphabet: &Alphabet) -> Token {
        let tokens = alphabet.tokens();
        tokens[self.rng.gen_range(0..tokens.len())]
    }
}

/// Cycles through a fixed list. Tokens outside the alphabet wrap onto it.
#[derive(Debug, Clone)]
pub struct SequenceTokenSource {
    tokens: Vec<Token>,
    index: usize,
}

impl SequenceTokenSource {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }
}

impl TokenSource for SequenceTokenSource {
    fn next_token(&mut self, alphabet: &Alphabet) -> Token {
        let allowed = alphabet.tokens();
        if self.tokens.is_empty() {
            return allowed[0];
        }
        let token = self.tokens[self.index % self.tokens.len()];
        self.index += 1;
        if alphabet.contains(token) {
            token
        } else {
            allowed[(token as usize) % allowed.len()]
        }
    }
}

// ============================================================================
// Refill
// ============================================================================

/// Puts a fresh candy in every empty cell. Returns how many were filled.
pub fn fill(grid: &mut Grid, alphabet: &Alphabet, source: &mut dyn TokenSource) -> usize {
    let empties: Vec<_> = grid
        .positions()
        .filter(|pos| matches!(grid.get(*pos), Ok(Cell::Empty)))
        .collect();
    for pos in &empties {
        grid.put(*pos, Cell::Candy(source.next_token(alphabet)));
    }
    trace!(filled = empties.len(), "refilled empty cells");
    empties.len()
}

/// Fills the grid, then re-rolls matched cells until no match is left.
/// Returns the number of re-roll rounds.
pub fn fill_without_matches(
    grid: &mut Grid,
    alphabet: &Alphabet,
    source: &mut dyn TokenSource,
) -> usize {
    fill(grid, alphabet, source);
    let mut rounds = 0;
    loop {
        let matches = detect(grid);
        if matches.is_empty() {
            break;
        }
        rounds += 1;
        for pos in matches {
            grid.put(pos, Cell::Candy(source.next_token(alphabet)));
        }
    }
    trace!(rounds, "rerolled initial board");
    rounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::has_any_match;

    #[test]
    fn seeded_source_is_deterministic() {
        let alphabet = Alphabet::full();
        let mut a = RandomTokenSource::seeded(7);
        let mut b = RandomTokenSource::seeded(7);
        let left: Vec<_> = (0..32).map(|_| a.next_token(&alphabet)).collect();
        let right: Vec<_> = (0..32).map(|_| b.next_token(&alphabet)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn random_source_stays_in_alphabet() {
        let alphabet = Alphabet::new(3).unwrap();
        let mut source = RandomTokenSource::seeded(99);
        for _ in 0..200 {
            assert!(alphabet.contains(source.next_token(&alphabet)));
        }
    }

    #[test]
    fn sequence_source_wraps_foreign_tokens() {
        let alphabet = Alphabet::new(3).unwrap();
        let mut source = SequenceTokenSource::new(vec![Token::Blue, Token::Purple]);
        assert_eq!(source.next_token(&alphabet), Token::Blue);
        assert!(alphabet.contains(source.next_token(&alphabet)));
        assert_eq!(source.next_token(&alphabet), Token::Blue);
    }

    #[test]
    fn fill_only_touches_empty_cells() {
        let mut grid = Grid::new(3, 3);
        let pos = crate::grid::Position::new(1, 1);
        grid.set(pos, Cell::Candy(Token::Red)).unwrap();
        let mut source = SequenceTokenSource::new(vec![Token::Blue]);

        assert_eq!(fill(&mut grid, &Alphabet::full(), &mut source), 8);
        assert_eq!(grid.get(pos).unwrap(), Cell::Candy(Token::Red));
        assert_eq!(grid.empty_count(), 0);
    }

    #[test]
    fn initial_fill_has_no_matches() {
        for seed in 0..20 {
            let mut grid = Grid::new(9, 9);
            let mut source = RandomTokenSource::seeded(seed);
            fill_without_matches(&mut grid, &Alphabet::full(), &mut source);
            assert!(!has_any_match(&grid));
            assert_eq!(grid.empty_count(), 0);
        }
    }
}
