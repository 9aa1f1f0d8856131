use std::{
    fs::File,
    io::{stdout, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use candy_crush::{
    Cell, GameConfig, GameEvent, GameSession, GameState, Grid, MatchSet, Mode, Position,
    RandomTokenSource, SessionError, SwapOutcome, Token,
};

// ============================================================================
// Command Line
// ============================================================================

/// Match-3 candy puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "candy-crush",
    version,
    about = "Swap neighbouring candies to line up three or more of a kind."
)]
struct Args {
    /// realtime: score as much as you can before the clock runs out.
    /// turns: reach the target score within a move budget.
    #[arg(short, long, value_enum, default_value_t = ModeArg::Realtime)]
    mode: ModeArg,

    /// Board rows (default depends on mode).
    #[arg(long, value_name = "N")]
    rows: Option<usize>,

    /// Board columns (default depends on mode).
    #[arg(long, value_name = "N")]
    cols: Option<usize>,

    /// Number of candy kinds, 3 to 6.
    #[arg(long, value_name = "N")]
    tokens: Option<usize>,

    /// Seconds (realtime) or moves (turns).
    #[arg(long, value_name = "N")]
    budget: Option<u32>,

    /// Target score, turns mode only.
    #[arg(long, value_name = "POINTS")]
    target: Option<u32>,

    /// Seed for a reproducible board.
    #[arg(long)]
    seed: Option<u64>,

    /// Write logs to this file. Filter with RUST_LOG.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Realtime,
    Turns,
}

impl Args {
    fn config(&self) -> GameConfig {
        let base = match self.mode {
            ModeArg::Realtime => GameConfig::realtime(),
            ModeArg::Turns => GameConfig::turns(),
        };
        GameConfig {
            rows: self.rows.unwrap_or(base.rows),
            cols: self.cols.unwrap_or(base.cols),
            alphabet_size: self.tokens.unwrap_or(base.alphabet_size),
            initial_budget: self.budget.unwrap_or(base.initial_budget),
            target_score: self.target.or(base.target_score),
            ..base
        }
    }
}

fn init_logging(path: Option<&Path>) -> Result<()> {
    // Without a file the TUI owns the terminal, so logs are dropped.
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// ============================================================================
// Visual Constants
// ============================================================================

const CELL_WIDTH: u16 = 3;
const CANDY_CHAR: &str = " ● ";
const EMPTY_CHAR: &str = "   ";
const CRUSHED_CHAR: &str = " ✸ ";

const FRAME: Duration = Duration::from_millis(33);
const WAVE_DELAY: Duration = Duration::from_millis(250);

fn candy_color(token: Token) -> Color {
    match token {
        Token::Blue => Color::Blue,
        Token::Orange => Color::Rgb(255, 165, 0),
        Token::Green => Color::Green,
        Token::Yellow => Color::Yellow,
        Token::Red => Color::Red,
        Token::Purple => Color::Magenta,
    }
}

// ============================================================================
// App State
// ============================================================================

struct App {
    session: GameSession,
    cursor: Position,
    selected: Option<Position>,
    /// Board of the wave being animated. The session only exposes the
    /// committed board until the cascade is over.
    wave_board: Option<Grid>,
    crushed: MatchSet,
    next_wave_at: Option<Instant>,
    message: String,
}

impl App {
    fn new(session: GameSession) -> Self {
        Self {
            session,
            cursor: Position::new(0, 0),
            selected: None,
            wave_board: None,
            crushed: MatchSet::new(),
            next_wave_at: None,
            message: String::new(),
        }
    }

    fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let grid = self.session.grid();
        let row = self.cursor.row.saturating_add_signed(d_row).min(grid.rows() - 1);
        let col = self.cursor.col.saturating_add_signed(d_col).min(grid.cols() - 1);
        self.cursor = Position::new(row, col);
    }

    fn select(&mut self, now: Instant) {
        let Some(first) = self.selected.take() else {
            self.selected = Some(self.cursor);
            return;
        };
        if first == self.cursor {
            return;
        }
        match self.session.begin_swap(first, self.cursor) {
            Ok(SwapOutcome::Committed(_)) => self.next_wave_at = Some(now),
            Ok(SwapOutcome::Reverted) => self.message = "No match there".into(),
            Ok(SwapOutcome::Rejected) => self.selected = Some(self.cursor),
            // input during a cascade is dropped
            Err(SessionError::Busy) => {}
            Err(err) => {
                warn!(%err, "swap failed");
                self.message = err.to_string();
            }
        }
    }

    fn restart(&mut self) {
        self.session.reset();
        self.selected = None;
        self.wave_board = None;
        self.crushed = MatchSet::new();
        self.next_wave_at = None;
        self.message.clear();
    }

    fn update(&mut self, now: Instant, elapsed: Duration) -> Result<()> {
        if self.next_wave_at.is_some_and(|at| now >= at) {
            match self.session.step_resolution()? {
                Some(wave) => {
                    self.wave_board = Some(wave.board);
                    self.crushed = wave.matched;
                    self.next_wave_at = Some(now + WAVE_DELAY);
                }
                None => {
                    self.wave_board = None;
                    self.crushed = MatchSet::new();
                    self.next_wave_at = None;
                }
            }
        }

        if self.session.mode() == Mode::Realtime {
            self.session.advance_clock(elapsed)?;
        }

        for event in self.session.take_events() {
            match event {
                GameEvent::CascadeWave { wave, .. } if wave > 1 => {
                    self.message = format!("Combo x{wave}!");
                }
                GameEvent::GameWon { final_score } => info!(final_score, "player won"),
                GameEvent::GameLost { final_score } => info!(final_score, "player lost"),
                _ => {}
            }
        }
        Ok(())
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, app: &App) {
    let area = frame.size();
    render_game(frame, app, area);

    match app.session.state() {
        GameState::Won => render_game_over(frame, app, area, "YOU WIN", Color::Green),
        GameState::Lost => render_game_over(frame, app, area, "GAME OVER", Color::Red),
        GameState::Idle | GameState::Running => {}
    }
}

fn render_game(frame: &mut Frame, app: &App, area: Rect) {
    let grid = app.session.grid();
    let grid_display_width = (grid.cols() as u16 * CELL_WIDTH) + 2;
    let grid_display_height = grid.rows() as u16 + 2;
    let info_width = 18;
    let total_width = grid_display_width + info_width + 2;
    let total_height = grid_display_height + 3;

    let main_area = centered_rect(total_width, total_height, area);

    let vertical = Layout::vertical([
        Constraint::Length(grid_display_height),
        Constraint::Fill(1),
    ])
    .split(main_area);

    let game_row = vertical[0];

    // Layout: [Grid][Info]
    let horizontal = Layout::horizontal([
        Constraint::Length(grid_display_width),
        Constraint::Length(info_width),
    ])
    .split(game_row);

    render_grid(frame, app, horizontal[0]);
    render_info(frame, app, horizontal[1]);

    let controls_area = Rect {
        x: area.x,
        y: game_row.y + game_row.height,
        width: area.width,
        height: 2,
    };

    if controls_area.y + 1 < area.height {
        let controls = Paragraph::new(vec![Line::from(
            "Arrows/WASD/HJKL: Move | Space/Enter: Select & swap | R: Restart | Q/ESC: Quit",
        )])
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(controls, controls_area);
    }
}

fn render_grid(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Candy Crush ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let grid = app.wave_board.as_ref().unwrap_or(app.session.grid());
    let mut lines: Vec<Line> = Vec::new();

    for row in 0..grid.rows() {
        let mut spans: Vec<Span> = Vec::new();

        for col in 0..grid.cols() {
            let pos = Position::new(row, col);
            let cell = grid.get(pos).unwrap_or(Cell::Empty);
            let (symbol, mut style) = match cell {
                _ if app.crushed.contains(pos) => {
                    (CRUSHED_CHAR, Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
                }
                Cell::Empty => (EMPTY_CHAR, Style::default()),
                Cell::Candy(token) => (CANDY_CHAR, Style::default().fg(candy_color(token))),
            };
            if app.selected == Some(pos) {
                style = style.bg(Color::Gray);
            } else if app.cursor == pos {
                style = style.bg(Color::DarkGray);
            }

            spans.push(Span::styled(symbol, style));
        }

        lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, inner);
}

fn render_info(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Info ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let session = &app.session;
    let budget_label = match session.mode() {
        Mode::Realtime => "Time",
        Mode::Turns => "Moves",
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("Score", Style::default().fg(Color::Yellow))),
        Line::from(format!("{}", session.score())),
        Line::from(""),
        Line::from(Span::styled(budget_label, Style::default().fg(Color::Cyan))),
        Line::from(format!("{}", session.budget())),
    ];
    if let Some(target) = session.target() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Target", Style::default().fg(Color::Green))));
        lines.push(Line::from(format!("{target}")));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        app.message.as_str(),
        Style::default().fg(Color::Magenta),
    )));

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

fn render_game_over(frame: &mut Frame, app: &App, area: Rect, title: &str, color: Color) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(title.to_string(), Style::default().fg(color))),
        Line::from(""),
        Line::from(format!("Score: {}", app.session.score())),
        Line::from(""),
        Line::from(Span::styled(
            "Press R to play again",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Press ESC to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Game Over ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(Color::Black)),
    );

    let popup_area = centered_rect(26, 10, area);
    frame.render_widget(paragraph, popup_area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .split(area);

    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    vertical[1]
}

// ============================================================================
// Main Loop
// ============================================================================

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let mut last_update = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, app))?;

        let timeout = FRAME.checked_sub(last_update.elapsed()).unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => break,
                        KeyCode::Char('r') | KeyCode::Char('R') => app.restart(),
                        _ if app.session.state() == GameState::Running => match key.code {
                            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('k') => {
                                app.move_cursor(-1, 0)
                            }
                            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('j') => {
                                app.move_cursor(1, 0)
                            }
                            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('h') => {
                                app.move_cursor(0, -1)
                            }
                            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('l') => {
                                app.move_cursor(0, 1)
                            }
                            KeyCode::Char(' ') | KeyCode::Enter => app.select(Instant::now()),
                            _ => {}
                        },
                        _ => {}
                    }
                }
            }
        }

        let now = Instant::now();
        app.update(now, now - last_update)?;
        last_update = now;
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let source = match args.seed {
        Some(seed) => RandomTokenSource::seeded(seed),
        None => RandomTokenSource::new(),
    };
    let mut session = GameSession::with_source(args.config(), Box::new(source))
        .context("invalid game configuration")?;
    session.start()?;
    let mut app = App::new(session);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}
