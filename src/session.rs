//! Game session: owns the board, score and budget, and serializes every grid
//! mutation behind a single in-flight resolution.
//!
//! A resolution (player swap or automatic crush) works on a private copy of
//! the grid. Observers keep seeing the last committed grid, score, budget and
//! state until the final wave lands, at which point everything is committed
//! together.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::cascade::{Cascade, CascadeResult, ScoringRules, Wave};
use crate::config::{ConfigError, GameConfig, Mode};
use crate::grid::{Alphabet, Grid, GridError, Position};
use crate::matcher::{detect, MatchSet};
use crate::refill::{fill_without_matches, RandomTokenSource, TokenSource};
use crate::swap::{self, SwapOutcome};

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameState {
    Idle,
    Running,
    Won,
    Lost,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GameEvent {
    SessionStarted,
    SwapRejected { a: Position, b: Position },
    SwapReverted { a: Position, b: Position },
    SwapCommitted { a: Position, b: Position },
    CascadeWave {
        wave: u32,
        matched: MatchSet,
        score_gain: u32,
    },
    BudgetChanged { remaining: u32 },
    GameWon { final_score: u32 },
    GameLost { final_score: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("a swap or cascade is already being resolved")]
    Busy,
    #[error("session is not running (state: {0:?})")]
    NotRunning(GameState),
    #[error("session is already running")]
    AlreadyRunning,
    #[error("operation is only available in {expected:?} mode")]
    WrongMode { expected: Mode },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Trigger {
    Swap,
    Crush,
}

struct Resolution {
    working: Grid,
    cascade: Cascade,
    trigger: Trigger,
}

// ============================================================================
// Session
// ============================================================================

pub struct GameSession {
    config: GameConfig,
    alphabet: Alphabet,
    scoring: ScoringRules,
    state: GameState,
    grid: Grid,
    score: u32,
    budget: u32,
    combo: u32,
    resolution: Option<Resolution>,
    source: Box<dyn TokenSource>,
    events: Vec<GameEvent>,
    crush_elapsed: Duration,
    countdown_elapsed: Duration,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_source(config, Box::new(RandomTokenSource::new()))
    }

    pub fn with_source(
        config: GameConfig,
        source: Box<dyn TokenSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let alphabet = config.alphabet()?;
        Ok(Self {
            alphabet,
            scoring: config.scoring(),
            state: GameState::Idle,
            grid: Grid::new(config.rows, config.cols),
            score: 0,
            budget: config.initial_budget,
            combo: 0,
            resolution: None,
            source,
            events: Vec::new(),
            crush_elapsed: Duration::ZERO,
            countdown_elapsed: Duration::ZERO,
            config,
        })
    }

    /// A running session on a prepared board. Existing matches are kept; the
    /// next crush pass or swap resolves them.
    pub fn with_grid(
        config: GameConfig,
        grid: Grid,
        source: Box<dyn TokenSource>,
    ) -> Result<Self, ConfigError> {
        let mut session = Self::with_source(config, source)?;
        if grid.rows() != session.config.rows || grid.cols() != session.config.cols {
            return Err(ConfigError::GridMismatch {
                rows: session.config.rows,
                cols: session.config.cols,
                actual_rows: grid.rows(),
                actual_cols: grid.cols(),
            });
        }
        let alphabet = session.alphabet;
        let valid = grid
            .cells()
            .iter()
            .all(|cell| cell.token().is_some_and(|t| alphabet.contains(t)));
        if !valid {
            return Err(ConfigError::GridContents);
        }
        session.grid = grid;
        session.state = GameState::Running;
        session.events.push(GameEvent::SessionStarted);
        Ok(session)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn target(&self) -> Option<u32> {
        self.config.target_score
    }

    /// Wave count of the last completed resolution.
    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn is_busy(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, GameState::Won | GameState::Lost)
    }

    /// Takes and clears all pending events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if self.state == GameState::Running {
            return Err(SessionError::AlreadyRunning);
        }
        self.begin_session();
        Ok(())
    }

    /// Restarts from any state, dropping an in-flight resolution.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.resolution = None;
        self.events.clear();
        self.begin_session();
    }

    fn begin_session(&mut self) {
        let mut grid = Grid::new(self.config.rows, self.config.cols);
        let rerolls = fill_without_matches(&mut grid, &self.alphabet, self.source.as_mut());
        debug!(rerolls, "generated board");

        self.grid = grid;
        self.score = 0;
        self.budget = self.config.initial_budget;
        self.combo = 0;
        self.crush_elapsed = Duration::ZERO;
        self.countdown_elapsed = Duration::ZERO;
        self.state = GameState::Running;
        self.events.push(GameEvent::SessionStarted);
        info!(mode = ?self.config.mode, budget = self.budget, "session started");
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if self.state != GameState::Running {
            return Err(SessionError::NotRunning(self.state));
        }
        Ok(())
    }

    fn ensure_mode(&self, expected: Mode) -> Result<(), SessionError> {
        if self.config.mode != expected {
            return Err(SessionError::WrongMode { expected });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Swaps and cascades
    // ------------------------------------------------------------------------

    /// Validates a swap and, when it commits, leaves its cascade in flight.
    /// Drive it with [`GameSession::step_resolution`].
    #[instrument(skip(self))]
    pub fn begin_swap(&mut self, a: Position, b: Position) -> Result<SwapOutcome, SessionError> {
        self.ensure_running()?;

        let mut working = self.grid.clone();
        let outcome = swap::propose(&mut working, a, b)?;
        match &outcome {
            SwapOutcome::Rejected => self.events.push(GameEvent::SwapRejected { a, b }),
            SwapOutcome::Reverted => self.events.push(GameEvent::SwapReverted { a, b }),
            SwapOutcome::Committed(matches) => {
                debug!(matched = matches.len(), "swap committed");
                self.events.push(GameEvent::SwapCommitted { a, b });
                self.open_resolution(working, matches.clone(), Trigger::Swap);
            }
        }
        Ok(outcome)
    }

    /// Swaps and resolves the whole cascade before returning.
    pub fn attempt_swap(&mut self, a: Position, b: Position) -> Result<SwapOutcome, SessionError> {
        let outcome = self.begin_swap(a, b)?;
        if outcome.is_committed() {
            self.drain()?;
        }
        Ok(outcome)
    }

    /// Starts resolving whatever matches sit on the board without a player
    /// swap. Returns false when the board is already stable.
    #[instrument(skip(self))]
    pub fn begin_crush(&mut self) -> Result<bool, SessionError> {
        self.ensure_running()?;
        let matches = detect(&self.grid);
        if matches.is_empty() {
            return Ok(false);
        }
        debug!(matched = matches.len(), "crush pass found matches");
        let working = self.grid.clone();
        self.open_resolution(working, matches, Trigger::Crush);
        Ok(true)
    }

    /// Automatic crush pass, resolved to completion.
    pub fn crush(&mut self) -> Result<Option<CascadeResult>, SessionError> {
        if !self.begin_crush()? {
            return Ok(None);
        }
        self.drain().map(Some)
    }

    fn open_resolution(&mut self, working: Grid, matches: MatchSet, trigger: Trigger) {
        self.combo = 0;
        self.resolution = Some(Resolution {
            working,
            cascade: Cascade::new(matches),
            trigger,
        });
    }

    /// Runs one wave of the in-flight resolution. The last wave commits the
    /// result to the session. Returns `None` when nothing is in flight.
    pub fn step_resolution(&mut self) -> Result<Option<Wave>, SessionError> {
        let Some(resolution) = self.resolution.as_mut() else {
            return Ok(None);
        };
        let wave = resolution.cascade.step(
            &mut resolution.working,
            &self.scoring,
            &self.alphabet,
            self.source.as_mut(),
        );
        if let Some(wave) = &wave {
            self.events.push(GameEvent::CascadeWave {
                wave: wave.index,
                matched: wave.matched.clone(),
                score_gain: wave.score_gain,
            });
        }
        if resolution.cascade.is_finished() {
            if let Some(done) = self.resolution.take() {
                self.finish(done);
            }
        }
        Ok(wave)
    }

    fn drain(&mut self) -> Result<CascadeResult, SessionError> {
        let mut result = CascadeResult::default();
        while let Some(wave) = self.step_resolution()? {
            result.total_score += wave.score_gain;
            result.waves = wave.index;
            result.wave_reports.push(wave);
        }
        Ok(result)
    }

    fn finish(&mut self, resolution: Resolution) {
        let Resolution {
            working,
            cascade,
            trigger,
        } = resolution;
        self.grid = working;
        self.score = self.score.saturating_add(cascade.total_score());
        self.combo = cascade.waves();
        info!(
            gained = cascade.total_score(),
            waves = cascade.waves(),
            score = self.score,
            "resolution complete"
        );

        if self.config.mode != Mode::Turns {
            return;
        }
        if trigger == Trigger::Swap {
            self.budget = self.budget.saturating_sub(1);
            self.events.push(GameEvent::BudgetChanged {
                remaining: self.budget,
            });
        }
        if self.config.target_score.is_some_and(|target| self.score >= target) {
            self.end(GameState::Won);
        } else if self.budget == 0 {
            self.end(GameState::Lost);
        }
    }

    fn end(&mut self, state: GameState) {
        self.state = state;
        self.crush_elapsed = Duration::ZERO;
        self.countdown_elapsed = Duration::ZERO;
        let final_score = self.score;
        match state {
            GameState::Won => self.events.push(GameEvent::GameWon { final_score }),
            GameState::Lost => self.events.push(GameEvent::GameLost { final_score }),
            GameState::Idle | GameState::Running => {}
        }
        info!(?state, final_score, "session over");
    }

    // ------------------------------------------------------------------------
    // Clock (realtime)
    // ------------------------------------------------------------------------

    /// Spends one unit of the countdown. Running out loses the game whatever
    /// the score.
    #[instrument(skip(self))]
    pub fn tick(&mut self) -> Result<(), SessionError> {
        self.ensure_mode(Mode::Realtime)?;
        self.ensure_running()?;

        self.budget = self.budget.saturating_sub(1);
        self.events.push(GameEvent::BudgetChanged {
            remaining: self.budget,
        });
        if self.budget == 0 {
            self.end(GameState::Lost);
        }
        Ok(())
    }

    /// Feeds wall-clock time to the periodic crush pass and the countdown.
    /// Time keeps accumulating while a resolution is in flight; the due work
    /// runs on the first call after it completes.
    pub fn advance_clock(&mut self, elapsed: Duration) -> Result<(), SessionError> {
        self.ensure_mode(Mode::Realtime)?;
        if self.state != GameState::Running {
            return Ok(());
        }
        self.crush_elapsed = self.crush_elapsed.saturating_add(elapsed);
        self.countdown_elapsed = self.countdown_elapsed.saturating_add(elapsed);
        if self.is_busy() {
            return Ok(());
        }

        // Missed crush passes collapse into one.
        let crush_every = self.config.tick_interval;
        if self.crush_elapsed >= crush_every {
            self.crush_elapsed = remainder(self.crush_elapsed, crush_every);
            self.crush()?;
        }

        let count_every = self.config.countdown_interval;
        let due = self.countdown_elapsed.as_nanos() / count_every.as_nanos();
        self.countdown_elapsed = remainder(self.countdown_elapsed, count_every);
        let due = u32::try_from(due).unwrap_or(u32::MAX).min(self.budget);
        for _ in 0..due {
            self.tick()?;
        }
        Ok(())
    }
}

/// `elapsed` modulo `period`. `period` must be non-zero.
fn remainder(elapsed: Duration, period: Duration) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let nanos = elapsed.as_nanos() % period.as_nanos();
    Duration::new(
        (nanos / NANOS_PER_SEC) as u64,
        (nanos % NANOS_PER_SEC) as u32,
    )
}
