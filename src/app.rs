//! App: terminal init, main loop, step pacing and key handling.

use crate::GameConfig;
use crate::input::{Action, key_to_action};
use crate::score::Scoreboard;
use crate::theme::Theme;
use anyhow::{Context, Result};
use crossterm::event::{self, Event as TermEvent, KeyEventKind};
use fruitmatch::{Direction, Engine, EngineConfig, Event, LevelLayout, Pos, Resolution};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Restart,
    Exit,
}

/// Everything the renderer reads. Owned by [`App`], borrowed by `ui::draw`.
pub struct View {
    pub engine: Engine,
    pub level_name: String,
    pub score: Scoreboard,
    pub cursor: Pos,
    pub selected: Option<Pos>,
    pub hint: Option<(Pos, Direction)>,
    /// Cells whose tiles were just eliminated; drawn flashing while the fade runs.
    pub clearing: Vec<Pos>,
    pub paused: bool,
    pub dead_board: bool,
    pub message: Option<String>,
}

pub struct App {
    layout: LevelLayout,
    engine_config: EngineConfig,
    config: GameConfig,
    theme: Theme,
    view: View,
    screen: Screen,
    quit_selected: QuitOption,
    restarts: u64,
    /// When the step currently on screen started animating.
    step_started: Option<Instant>,
    /// TachyonFX fade over the eliminated cells.
    clear_effect: Option<Effect>,
    clear_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(
        layout: LevelLayout,
        engine_config: EngineConfig,
        config: GameConfig,
        theme: Theme,
    ) -> Result<Self> {
        let engine = Engine::load_level(&layout, &engine_config).context("failed to load level")?;
        let view = View::new(engine, &layout);
        Ok(Self {
            layout,
            engine_config,
            config,
            theme,
            view,
            screen: Screen::Playing,
            quit_selected: QuitOption::Resume,
            restarts: 0,
            step_started: None,
            clear_effect: None,
            clear_effect_process_time: None,
        })
    }

    /// New board from the same level with the next seed.
    fn restart(&mut self) -> Result<()> {
        self.restarts += 1;
        let config = EngineConfig {
            seed: self.engine_config.seed.wrapping_add(self.restarts),
            ..self.engine_config.clone()
        };
        let engine = Engine::load_level(&self.layout, &config).context("failed to reload level")?;
        info!(seed = config.seed, "restarted");
        self.view = View::new(engine, &self.layout);
        self.screen = Screen::Playing;
        self.step_started = None;
        self.clear_effect = None;
        self.clear_effect_process_time = None;
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.view,
                    &self.theme,
                    &mut self.clear_effect,
                    &mut self.clear_effect_process_time,
                    now,
                    self.config.no_animation,
                    (self.screen == Screen::QuitMenu).then_some(self.quit_selected),
                );
            })?;

            self.advance(now);

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let TermEvent::Key(key) = event::read()? else {
                        continue;
                    };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if !self.handle(key_to_action(key), Instant::now())? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Release the engine barrier once the current step has been shown, and let the
    /// watchdog catch a resolution that stalled anyway.
    fn advance(&mut self, now: Instant) {
        let engine = &mut self.view.engine;
        if engine.is_idle() {
            return;
        }
        if engine.check_watchdog(now) {
            self.view.message = Some("Resolution stalled; board settled".to_string());
            self.absorb_events(now);
            return;
        }
        if self.step_shown(now) {
            let phase = self.view.engine.complete_step(now);
            debug!(?phase, "step complete");
            self.absorb_events(now);
        }
    }

    fn step_shown(&self, now: Instant) -> bool {
        if self.config.no_animation {
            return true;
        }
        if let Some(effect) = &self.clear_effect {
            return effect.done();
        }
        self.step_started
            .is_none_or(|t| now.saturating_duration_since(t) >= Duration::from_millis(self.config.step_ms))
    }

    /// Drain engine events into the score and the animation state.
    fn absorb_events(&mut self, now: Instant) {
        let events = self.view.engine.drain_events();
        if events.is_empty() {
            return;
        }
        self.view.score.record_all(&events);
        self.view.clearing.clear();
        self.clear_effect = None;
        self.clear_effect_process_time = None;
        for event in &events {
            match event {
                Event::TilesEliminated { cells, .. } => self.view.clearing.clone_from(cells),
                Event::ResolutionComplete { resolution } => {
                    if *resolution == Resolution::Reverted {
                        self.view.message = Some("No match; swapped back".to_string());
                    }
                    self.view.dead_board = self.view.engine.is_dead_board();
                    if self.view.dead_board {
                        self.view.message = Some("No moves left; press R to restart".to_string());
                    }
                }
                _ => {}
            }
        }
        self.step_started = Some(now);
    }

    /// Returns false when the app should exit.
    fn handle(&mut self, action: Action, now: Instant) -> Result<bool> {
        match self.screen {
            Screen::QuitMenu => match action {
                Action::Down | Action::Right => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Restart,
                        QuitOption::Restart => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::Up | Action::Left => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::Restart => QuitOption::Resume,
                        QuitOption::Exit => QuitOption::Restart,
                    };
                }
                Action::Select => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::Restart => self.restart()?,
                    QuitOption::Exit => return Ok(false),
                },
                Action::Quit | Action::Pause => self.screen = Screen::Playing,
                _ => {}
            },
            Screen::Playing => {
                if self.view.paused {
                    match action {
                        Action::Pause => self.view.paused = false,
                        Action::Quit => self.open_quit_menu(),
                        _ => {}
                    }
                    return Ok(true);
                }
                match action {
                    Action::Up => self.steer(Direction::Up, now),
                    Action::Down => self.steer(Direction::Down, now),
                    Action::Left => self.steer(Direction::Left, now),
                    Action::Right => self.steer(Direction::Right, now),
                    Action::Select => self.toggle_select(),
                    Action::Hint => {
                        self.view.hint = self.view.engine.hint();
                        if let Some((from, _)) = self.view.hint {
                            self.view.cursor = from;
                        }
                    }
                    Action::Restart => self.restart()?,
                    // Pausing mid-resolution would stall the barrier.
                    Action::Pause if self.view.engine.is_idle() => self.view.paused = true,
                    Action::Quit => self.open_quit_menu(),
                    Action::Pause | Action::None => {}
                }
            }
        }
        Ok(true)
    }

    fn open_quit_menu(&mut self) {
        self.screen = Screen::QuitMenu;
        self.quit_selected = QuitOption::Resume;
    }

    fn toggle_select(&mut self) {
        let cursor = self.view.cursor;
        self.view.selected = match self.view.selected {
            Some(p) if p == cursor => None,
            _ => self.view.engine.board().is_occupied(cursor).then_some(cursor),
        };
    }

    /// Arrow keys move the cursor, or swap when a tile is selected.
    fn steer(&mut self, dir: Direction, now: Instant) {
        let Some(from) = self.view.selected.take() else {
            if let Some(next) = self.view.cursor.step(dir) {
                if self.view.engine.board().in_bounds(next) {
                    self.view.cursor = next;
                }
            }
            return;
        };
        self.view.hint = None;
        match self.view.engine.request_move(from, dir, now) {
            Ok(()) => {
                self.view.message = None;
                if let Some(to) = from.step(dir) {
                    self.view.cursor = to;
                }
                self.absorb_events(now);
            }
            Err(reason) => {
                debug!(%from, ?dir, %reason, "move refused");
                self.view.message = Some(format!("Can't swap: {reason}"));
            }
        }
    }
}

impl View {
    fn new(engine: Engine, layout: &LevelLayout) -> Self {
        let board = engine.board();
        let centre = Pos::new(board.rows() / 2, board.cols() / 2);
        let dead_board = engine.is_dead_board();
        Self {
            engine,
            level_name: layout.name.clone(),
            score: Scoreboard::default(),
            cursor: centre,
            selected: None,
            hint: None,
            clearing: Vec::new(),
            paused: false,
            dead_board,
            message: None,
        }
    }
}
