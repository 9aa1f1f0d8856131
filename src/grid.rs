use std::fmt;

use thiserror::Error;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum Token {
    Blue,
    Orange,
    Green,
    Yellow,
    Red,
    Purple,
}

impl Token {
    pub const ALL: [Token; 6] = [
        Token::Blue,
        Token::Orange,
        Token::Green,
        Token::Yellow,
        Token::Red,
        Token::Purple,
    ];

    /// One-letter form used by text boards.
    pub fn symbol(&self) -> char {
        match self {
            Token::Blue => 'B',
            Token::Orange => 'O',
            Token::Green => 'G',
            Token::Yellow => 'Y',
            Token::Red => 'R',
            Token::Purple => 'P',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        Token::ALL
            .into_iter()
            .find(|token| token.symbol() == symbol.to_ascii_uppercase())
    }
}

/// The tokens a session plays with: a prefix of [`Token::ALL`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Alphabet {
    size: usize,
}

impl Alphabet {
    pub const MIN_SIZE: usize = 3;
    pub const MAX_SIZE: usize = Token::ALL.len();

    pub fn new(size: usize) -> Result<Self, GridError> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&size) {
            return Err(GridError::AlphabetSize(size));
        }
        Ok(Self { size })
    }

    pub fn full() -> Self {
        Self {
            size: Self::MAX_SIZE,
        }
    }

    pub fn tokens(&self) -> &'static [Token] {
        &Token::ALL[..self.size]
    }

    pub fn contains(&self, token: Token) -> bool {
        self.tokens().contains(&token)
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

// ============================================================================
// Cells and positions
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Cell {
    #[default]
    Empty,
    Candy(Token),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn token(&self) -> Option<Token> {
        match self {
            Cell::Empty => None,
            Cell::Candy(token) => Some(*token),
        }
    }
}

impl From<Token> for Cell {
    fn from(token: Token) -> Self {
        Cell::Candy(token)
    }
}

/// Grid coordinate. Row 0 is the top row; ordering is row-major.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn manhattan_distance(&self, other: Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("position {pos} is outside the {rows}x{cols} grid")]
    OutOfBounds {
        pos: Position,
        rows: usize,
        cols: usize,
    },
    #[error("grid must have at least one row and one column")]
    Empty,
    #[error("row {row} has {len} cells, expected {expected}")]
    Ragged {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("alphabet size {0} is outside 3..=6")]
    AlphabetSize(usize),
}

// ============================================================================
// Grid
// ============================================================================

/// Fixed-size board of cells, stored row-major.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// An all-empty grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, GridError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return Err(GridError::Empty);
        }
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (row, line) in rows.iter().enumerate() {
            if line.len() != cols {
                return Err(GridError::Ragged {
                    row,
                    len: line.len(),
                    expected: cols,
                });
            }
            cells.extend_from_slice(line);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    fn index(&self, pos: Position) -> Result<usize, GridError> {
        if !self.contains(pos) {
            return Err(GridError::OutOfBounds {
                pos,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(pos.row * self.cols + pos.col)
    }

    pub fn get(&self, pos: Position) -> Result<Cell, GridError> {
        let idx = self.index(pos)?;
        Ok(self.cells[idx])
    }

    pub fn set(&mut self, pos: Position, cell: Cell) -> Result<(), GridError> {
        let idx = self.index(pos)?;
        self.cells[idx] = cell;
        Ok(())
    }

    /// Exchanges the contents of two cells. Both positions are checked before
    /// anything moves.
    pub fn swap(&mut self, a: Position, b: Position) -> Result<(), GridError> {
        let ia = self.index(a)?;
        let ib = self.index(b)?;
        self.cells.swap(ia, ib);
        Ok(())
    }

    /// Unchecked write for positions the engine derived from this grid.
    /// Panics on a position outside the grid.
    pub(crate) fn put(&mut self, pos: Position, cell: Cell) {
        debug_assert!(self.contains(pos), "{pos} outside {}x{}", self.rows, self.cols);
        self.cells[pos.row * self.cols + pos.col] = cell;
    }

    pub fn is_empty(&self, pos: Position) -> Result<bool, GridError> {
        Ok(self.get(pos)?.is_empty())
    }

    /// All positions, row by row.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Position::new(row, col)))
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, col: usize) -> Vec<Cell> {
        if col >= self.cols {
            return Vec::new();
        }
        (0..self.rows)
            .map(|row| self.cells[row * self.cols + col])
            .collect()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_empty()).count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cols == 0 {
            return Ok(());
        }
        for (i, row) in self.cells.chunks(self.cols).enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for cell in row {
                let symbol = cell.token().map(|t| t.symbol()).unwrap_or('.');
                write!(f, "{symbol}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_is_its_own_inverse() {
        let mut grid = Grid::new(2, 2);
        grid.set(Position::new(0, 0), Cell::Candy(Token::Red)).unwrap();
        grid.set(Position::new(0, 1), Cell::Candy(Token::Blue)).unwrap();
        let before = grid.clone();

        grid.swap(Position::new(0, 0), Position::new(0, 1)).unwrap();
        assert_eq!(grid.get(Position::new(0, 0)).unwrap(), Cell::Candy(Token::Blue));
        grid.swap(Position::new(0, 0), Position::new(0, 1)).unwrap();
        assert_eq!(grid, before);
    }

    #[test]
    fn out_of_bounds_swap_leaves_grid_untouched() {
        let mut grid = Grid::new(3, 3);
        grid.set(Position::new(2, 2), Cell::Candy(Token::Green)).unwrap();
        let before = grid.clone();

        let err = grid.swap(Position::new(2, 2), Position::new(3, 2)).unwrap_err();
        assert_eq!(
            err,
            GridError::OutOfBounds {
                pos: Position::new(3, 2),
                rows: 3,
                cols: 3
            }
        );
        assert_eq!(grid, before);
    }

    #[test]
    fn put_writes_like_set() {
        let mut via_put = Grid::new(3, 3);
        let mut via_set = Grid::new(3, 3);
        via_put.put(Position::new(2, 1), Cell::Candy(Token::Red));
        via_set.set(Position::new(2, 1), Cell::Candy(Token::Red)).unwrap();
        assert_eq!(via_put, via_set);
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let rows = vec![vec![Cell::Empty; 3], vec![Cell::Empty; 2]];
        assert_eq!(
            Grid::from_rows(rows).unwrap_err(),
            GridError::Ragged {
                row: 1,
                len: 2,
                expected: 3
            }
        );
        assert_eq!(Grid::from_rows(Vec::new()).unwrap_err(), GridError::Empty);
    }

    #[test]
    fn alphabet_is_a_prefix_of_all_tokens() {
        let alphabet = Alphabet::new(5).unwrap();
        assert_eq!(alphabet.tokens(), &Token::ALL[..5]);
        assert!(!alphabet.contains(Token::Purple));
        assert!(Alphabet::new(2).is_err());
        assert!(Alphabet::new(7).is_err());
    }

    #[test]
    fn display_uses_token_symbols() {
        let mut grid = Grid::new(2, 3);
        grid.set(Position::new(0, 1), Cell::Candy(Token::Yellow)).unwrap();
        grid.set(Position::new(1, 2), Cell::Candy(Token::Purple)).unwrap();
        assert_eq!(grid.to_string(), ".Y.\n..P");
    }
}
