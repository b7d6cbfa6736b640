//! Layout and drawing: board, sidebar, pause overlay and quit menu.

use crate::app::{QuitOption, Screen, View};
use crate::theme::Theme;
use fruitmatch::{CellState, Phase, Pos};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns per board cell (glyph + gap).
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 28;
const CLEAR_FADE_MS: u32 = 220;

/// One glyph per tile kind so kinds stay distinguishable without colour.
const TILE_GLYPHS: [&str; 12] = ["●", "◆", "▲", "■", "♥", "♣", "♠", "♦", "✚", "○", "◇", "△"];

/// Board size in terminal cells including the border.
fn board_outer_size(view: &View) -> (u16, u16) {
    let board = view.engine.board();
    (board.cols() as u16 * CELL_WIDTH + 2, board.rows() as u16 + 2)
}

/// Split the screen into the centred board and the sidebar next to it.
fn game_layout(area: Rect, view: &View) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size(view);
    let total_w = bw + SIDEBAR_WIDTH;
    let total_h = bh.max(20);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board = Rect {
        height: bh.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1])
}

/// Inner board rect (no border).
fn board_rect(area: Rect, view: &View) -> Rect {
    let (outer, _) = game_layout(area, view);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    }
}

fn cell_origin(board_rect: Rect, pos: Pos) -> (u16, u16) {
    (
        board_rect.x + pos.col as u16 * CELL_WIDTH,
        board_rect.y + pos.row as u16,
    )
}

/// Buffer positions covered by the cells being cleared.
fn clearing_buffer_positions(board_rect: Rect, cells: &[Pos]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &pos in cells {
        let (x0, y) = cell_origin(board_rect, pos);
        for x in x0..(x0 + CELL_WIDTH).min(board_rect.x + board_rect.width) {
            set.insert((x, y));
        }
    }
    set
}

/// Fade the cleared cells to the background. The effect is built on the first frame of a
/// clear and advanced by the frame delta after that.
fn apply_clear_effect(
    frame: &mut Frame,
    view: &View,
    theme: &Theme,
    area: Rect,
    clear_effect: &mut Option<Effect>,
    process_time: &mut Option<Instant>,
    now: Instant,
) {
    let rect = board_rect(area, view);
    let delta = process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or_default();
    let tfx_delta = TfxDuration::from_millis(delta.as_millis().min(u128::from(u32::MAX)) as u32);
    *process_time = Some(now);

    if clear_effect.is_none() {
        let clearing = clearing_buffer_positions(rect, &view.clearing);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_to(theme.bg, theme.bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(rect);
        *clear_effect = Some(effect);
    }
    if let Some(effect) = clear_effect {
        frame.render_effect(effect, rect, tfx_delta);
    }
}

pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    view: &View,
    theme: &Theme,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
    quit_selected: Option<QuitOption>,
) {
    let area = frame.area();
    let (board_area, sidebar_area) = game_layout(area, view);
    draw_board(frame, view, theme, board_area);
    draw_sidebar(frame, view, theme, sidebar_area);

    if !view.clearing.is_empty() && !no_animation {
        apply_clear_effect(frame, view, theme, area, clear_effect, clear_process_time, now);
    }
    match screen {
        Screen::Playing if view.paused => draw_pause_overlay(frame, theme, area),
        Screen::Playing => {}
        Screen::QuitMenu => {
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
    }
}

fn draw_board(frame: &mut Frame, view: &View, theme: &Theme, area: Rect) {
    let title = if view.level_name.is_empty() {
        " fruitmatch ".to_string()
    } else {
        format!(" {} ", view.level_name)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let clearing: HashSet<Pos> = view.clearing.iter().copied().collect();
    let hinted: Option<(Pos, Pos)> = view
        .hint
        .and_then(|(from, dir)| from.step(dir).map(|to| (from, to)));
    let board = view.engine.board();
    let buf = frame.buffer_mut();

    for pos in board.positions() {
        let (x, y) = cell_origin(inner, pos);
        if x + CELL_WIDTH > inner.x + inner.width || y >= inner.y + inner.height {
            continue;
        }
        let base = Style::default().bg(theme.bg);
        let (symbol, mut style) = match board.cell_state(pos) {
            Some(CellState::Tile(t)) if clearing.contains(&pos) => {
                (TILE_GLYPHS[t.index() as usize % TILE_GLYPHS.len()].to_string(), base.fg(Color::White))
            }
            Some(CellState::Tile(t)) => (
                TILE_GLYPHS[t.index() as usize % TILE_GLYPHS.len()].to_string(),
                base.fg(theme.tile_color(t.index())),
            ),
            Some(CellState::Empty) if clearing.contains(&pos) => ("✦".to_string(), base.fg(Color::White)),
            Some(CellState::Empty) => ("·".to_string(), base.fg(theme.div_line)),
            Some(CellState::Obstacle { remaining_hits, .. }) => {
                let mark = if remaining_hits > 1 {
                    format!("▓{}", remaining_hits.min(9))
                } else {
                    "▓▓".to_string()
                };
                (mark, base.fg(theme.inactive_fg))
            }
            Some(CellState::Void) | None => ("  ".to_string(), Style::default()),
        };

        if hinted.is_some_and(|(a, b)| a == pos || b == pos) {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if view.selected == Some(pos) {
            style = style.bg(theme.main_fg).add_modifier(Modifier::BOLD);
        } else if view.cursor == pos {
            style = style.bg(theme.div_line).add_modifier(Modifier::BOLD);
        }
        buf.set_string(x, y, format!("{symbol:<2}"), style);
    }
}

fn status_line(view: &View) -> String {
    if view.paused {
        return "Paused".to_string();
    }
    match view.engine.phase() {
        Phase::Idle if view.dead_board => "No moves left".to_string(),
        Phase::Idle if view.selected.is_some() => "Pick a direction".to_string(),
        Phase::Idle => "Your move".to_string(),
        Phase::Swapped | Phase::Validating => "Swapping…".to_string(),
        Phase::Matching | Phase::Eliminating => "Clearing…".to_string(),
        Phase::Falling => "Falling…".to_string(),
    }
}

fn section(frame: &mut Frame, area: Rect, theme: &Theme, title: &str, lines: Vec<Line<'_>>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {title} "), Style::default().fg(theme.title)));
    Paragraph::new(lines).block(block).render(area, frame.buffer_mut());
}

fn draw_sidebar(frame: &mut Frame, view: &View, theme: &Theme, area: Rect) {
    let label = Style::default().fg(theme.title);
    let value = Style::default().fg(theme.main_fg);
    let stat = |name: &'static str, v: String| {
        Line::from(vec![Span::styled(name, label), Span::styled(v, value)])
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // stats
            Constraint::Length(4), // status
            Constraint::Length(8), // keys
        ])
        .split(area);

    let score = &view.score;
    let left = view.engine.board().regions().count();
    section(
        frame,
        chunks[0],
        theme,
        "Score",
        vec![
            stat("Score:     ", score.score.to_string()),
            stat("Moves:     ", score.moves.to_string()),
            stat("Cleared:   ", score.tiles_cleared.to_string()),
            stat("Cascade:   ", score.best_cascade.to_string()),
            stat(
                "Obstacles: ",
                format!("{} open, {left} left", score.obstacles_cleared),
            ),
            stat("Reverted:  ", score.reverted.to_string()),
        ],
    );

    let mut status = vec![Line::from(Span::styled(status_line(view), value))];
    if let Some(msg) = &view.message {
        status.push(Line::from(Span::styled(msg.clone(), Style::default().fg(theme.inactive_fg))));
    }
    let trips = view.engine.diagnostics().watchdog_trips;
    if trips > 0 {
        status.push(Line::from(Span::styled(
            format!("watchdog: {trips}"),
            Style::default().fg(Color::Yellow),
        )));
    }
    section(frame, chunks[1], theme, "Status", status);

    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("{k:<8}"), label),
            Span::styled(what, Style::default().fg(theme.inactive_fg)),
        ])
    };
    section(
        frame,
        chunks[2],
        theme,
        "Keys",
        vec![
            key("←↑↓→", "move / swap"),
            key("Enter", "select"),
            key("?", "hint"),
            key("R", "restart"),
            key("P", "pause"),
            key("Q", "quit"),
        ],
    );
}

fn popup_rect(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let rect = popup_rect(frame.area(), 24, 8);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            frame.buffer_mut()[(x, y)]
                .set_symbol(" ")
                .set_style(Style::default().bg(theme.bg));
        }
    }
    let inner = block.inner(rect);
    block.render(rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::Restart, " Restart "),
        (QuitOption::Exit, " Exit "),
    ];
    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let x = inner.x + inner.width.saturating_sub(label.len() as u16) / 2;
        let y = inner.y + 1 + i as u16 * 2;
        if y < inner.y + inner.height {
            frame.buffer_mut().set_string(x, y, label, style);
        }
    }
}
