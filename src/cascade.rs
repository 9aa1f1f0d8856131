//! Cascade resolution: remove matched candies, let the rest fall, refill, and
//! look again until the board is stable.

use tracing::{debug, trace, warn};

use crate::gravity::apply_gravity;
use crate::grid::{Alphabet, Cell, Grid};
use crate::matcher::{detect, MatchSet};
use crate::refill::{fill, TokenSource};

/// Default points per removed candy.
pub const PER_CANDY_SCORE: u32 = 10;
/// Default bonus multiplier for waves after the first.
pub const COMBO_BONUS_FACTOR: u32 = 10;

/// Cascades longer than this are logged. They are not stopped.
pub const LONG_CASCADE_WAVES: u32 = 50;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScoringRules {
    pub per_candy: u32,
    pub combo_bonus_factor: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            per_candy: PER_CANDY_SCORE,
            combo_bonus_factor: COMBO_BONUS_FACTOR,
        }
    }
}

impl ScoringRules {
    /// Points for one wave. The first wave of a cascade earns no bonus.
    /// Saturates at `u32::MAX`.
    pub fn wave_score(&self, matched: usize, wave: u32) -> u32 {
        let matched = u32::try_from(matched).unwrap_or(u32::MAX);
        let base = matched.saturating_mul(self.per_candy);
        let bonus = if wave > 1 {
            wave.saturating_mul(self.combo_bonus_factor)
        } else {
            0
        };
        base.saturating_add(bonus)
    }
}

/// One remove-gravity-refill cycle.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Wave {
    /// 1-based combo depth.
    pub index: u32,
    pub matched: MatchSet,
    pub score_gain: u32,
    /// The board `matched` was detected on, before removal.
    pub board: Grid,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CascadeResult {
    pub total_score: u32,
    pub waves: u32,
    pub wave_reports: Vec<Wave>,
}

/// A cascade that can be advanced one wave at a time.
#[derive(Clone, Debug)]
pub struct Cascade {
    pending: MatchSet,
    waves: u32,
    total_score: u32,
}

impl Cascade {
    pub fn new(initial: MatchSet) -> Self {
        Self {
            pending: initial,
            waves: 0,
            total_score: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn waves(&self) -> u32 {
        self.waves
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    /// Resolves the pending matches and looks for the next ones. Returns
    /// `None` once the board is stable.
    pub fn step(
        &mut self,
        grid: &mut Grid,
        scoring: &ScoringRules,
        alphabet: &Alphabet,
        source: &mut dyn TokenSource,
    ) -> Option<Wave> {
        if self.pending.is_empty() {
            return None;
        }
        let matched = std::mem::take(&mut self.pending);
        let board = grid.clone();

        self.waves += 1;
        let score_gain = scoring.wave_score(matched.len(), self.waves);
        self.total_score = self.total_score.saturating_add(score_gain);

        for pos in matched.iter() {
            grid.put(pos, Cell::Empty);
        }
        let fallen = apply_gravity(grid);
        let filled = fill(grid, alphabet, source);
        trace!(fallen, filled, "wave settled");

        self.pending = detect(grid);
        debug!(
            wave = self.waves,
            matched = matched.len(),
            score_gain,
            next = self.pending.len(),
            "cascade wave"
        );
        if self.waves == LONG_CASCADE_WAVES {
            warn!(waves = self.waves, "cascade is unusually long");
        }

        Some(Wave {
            index: self.waves,
            matched,
            score_gain,
            board,
        })
    }
}

/// Runs a cascade to completion starting from `initial`.
pub fn resolve(
    grid: &mut Grid,
    initial: MatchSet,
    scoring: &ScoringRules,
    alphabet: &Alphabet,
    source: &mut dyn TokenSource,
) -> CascadeResult {
    let mut cascade = Cascade::new(initial);
    let mut wave_reports = Vec::new();
    while let Some(wave) = cascade.step(grid, scoring, alphabet, source) {
        wave_reports.push(wave);
    }
    CascadeResult {
        total_score: cascade.total_score(),
        waves: cascade.waves(),
        wave_reports,
    }
}
