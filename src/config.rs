use std::time::Duration;

use thiserror::Error;

use crate::cascade::{ScoringRules, COMBO_BONUS_FACTOR, PER_CANDY_SCORE};
use crate::grid::{Alphabet, GridError};

// ============================================================================
// Configuration
// ============================================================================

pub const MIN_BOARD_SIDE: usize = 3;

/// How the session budget is spent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Budget is seconds, counted down by the clock. No target.
    Realtime,
    /// Budget is moves, one per committed swap. Reaching the target wins.
    Turns,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub alphabet_size: usize,
    pub mode: Mode,
    pub initial_budget: u32,
    pub target_score: Option<u32>,
    pub per_candy_score: u32,
    pub combo_bonus_factor: u32,
    /// Realtime only: period of the automatic crush pass.
    pub tick_interval: Duration,
    /// Realtime only: period of one budget unit.
    pub countdown_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("board must be at least 3x3, got {rows}x{cols}")]
    BoardTooSmall { rows: usize, cols: usize },
    #[error(transparent)]
    Alphabet(#[from] GridError),
    #[error("initial budget must be positive")]
    ZeroBudget,
    #[error("realtime intervals must be non-zero")]
    ZeroInterval,
    #[error("realtime mode has no target score")]
    TargetInRealtime,
    #[error("target score must be positive")]
    ZeroTarget,
    #[error("prepared grid is {actual_rows}x{actual_cols}, config expects {rows}x{cols}")]
    GridMismatch {
        rows: usize,
        cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },
    #[error("prepared grid holds an empty cell or a token outside the alphabet")]
    GridContents,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::realtime()
    }
}

impl GameConfig {
    /// 9x9, six candies, one minute on the clock.
    pub fn realtime() -> Self {
        Self {
            rows: 9,
            cols: 9,
            alphabet_size: 6,
            mode: Mode::Realtime,
            initial_budget: 60,
            target_score: None,
            per_candy_score: PER_CANDY_SCORE,
            combo_bonus_factor: COMBO_BONUS_FACTOR,
            tick_interval: Duration::from_millis(100),
            countdown_interval: Duration::from_secs(1),
        }
    }

    /// 8x8, five candies, twenty moves to reach 1000 points.
    pub fn turns() -> Self {
        Self {
            rows: 8,
            cols: 8,
            alphabet_size: 5,
            mode: Mode::Turns,
            initial_budget: 20,
            target_score: Some(1000),
            ..Self::realtime()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < MIN_BOARD_SIDE || self.cols < MIN_BOARD_SIDE {
            return Err(ConfigError::BoardTooSmall {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Alphabet::new(self.alphabet_size)?;
        if self.initial_budget == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        match self.mode {
            Mode::Realtime => {
                if self.tick_interval.is_zero() || self.countdown_interval.is_zero() {
                    return Err(ConfigError::ZeroInterval);
                }
                if self.target_score.is_some() {
                    return Err(ConfigError::TargetInRealtime);
                }
            }
            Mode::Turns => {
                if self.target_score == Some(0) {
                    return Err(ConfigError::ZeroTarget);
                }
            }
        }
        Ok(())
    }

    pub fn alphabet(&self) -> Result<Alphabet, ConfigError> {
        Ok(Alphabet::new(self.alphabet_size)?)
    }

    pub fn scoring(&self) -> ScoringRules {
        ScoringRules {
            per_candy: self.per_candy_score,
            combo_bonus_factor: self.combo_bonus_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert_eq!(GameConfig::realtime().validate(), Ok(()));
        assert_eq!(GameConfig::turns().validate(), Ok(()));
    }

    #[test]
    fn realtime_rejects_a_target() {
        let config = GameConfig {
            target_score: Some(500),
            ..GameConfig::realtime()
        };
        assert_eq!(config.validate(), Err(ConfigError::TargetInRealtime));
    }

    #[test]
    fn bad_shapes_are_rejected() {
        let tiny = GameConfig {
            rows: 2,
            ..GameConfig::turns()
        };
        assert!(matches!(tiny.validate(), Err(ConfigError::BoardTooSmall { .. })));

        let mono = GameConfig {
            alphabet_size: 1,
            ..GameConfig::turns()
        };
        assert!(matches!(mono.validate(), Err(ConfigError::Alphabet(_))));

        let broke = GameConfig {
            initial_budget: 0,
            ..GameConfig::turns()
        };
        assert_eq!(broke.validate(), Err(ConfigError::ZeroBudget));
    }

    #[test]
    fn turns_without_target_is_allowed() {
        let config = GameConfig {
            target_score: None,
            ..GameConfig::turns()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
