use crate::config::Config;
use crate::drag::DragState;
use crate::layout::{HoverTarget, TaskBlock, TimelineLayout};
use crate::locale::Locale;
use crate::model::{DraftPatch, Swatch, Task, TaskDraft, ValidationError, HOURS_PER_DAY};
use crate::store::TimelineStore;
use anyhow::Result;
use chrono::{Local, Timelike};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::info;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::Duration;

/// Width of the `23:00 ` gutter left of the grid.
const LABEL_WIDTH: u16 = 6;

pub fn run(store: TimelineStore, config: &Config) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(store, config);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    store: TimelineStore,
    layout: TimelineLayout,
    locale: Locale,
    drag: DragState,
    mode: Mode,
    cursor_hour: u32,
    selected_task: Option<usize>,
    /// First visible hour.
    scroll: u32,
    follow_cursor: bool,
    status: String,
    hits: HitAreas,
}

enum Mode {
    Normal,
    Composing(DraftForm),
}

/// Screen areas from the last frame, used to route mouse clicks.
#[derive(Default)]
struct HitAreas {
    prev: Rect,
    next: Rect,
    timeline: Rect,
    form: FormHits,
}

#[derive(Default)]
struct FormHits {
    dialog: Rect,
    swatches: Vec<(Swatch, Rect)>,
    submit: Rect,
    cancel: Rect,
}

struct DraftForm {
    name: FieldValue,
    start: FieldValue,
    duration: FieldValue,
    field: FormField,
    error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Name,
    Start,
    Duration,
    Color,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_grapheme(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_grapheme(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_grapheme(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl DraftForm {
    fn from_draft(draft: &TaskDraft) -> Self {
        DraftForm {
            name: FieldValue::new(&draft.name),
            start: FieldValue::new(&draft.start.to_string()),
            duration: FieldValue::new(&draft.duration.to_string()),
            field: FormField::Name,
            error: None,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Name => FormField::Start,
            FormField::Start => FormField::Duration,
            FormField::Duration => FormField::Color,
            FormField::Color => FormField::Name,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Name => FormField::Color,
            FormField::Start => FormField::Name,
            FormField::Duration => FormField::Start,
            FormField::Color => FormField::Duration,
        };
    }

    fn active_text_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            FormField::Name => Some(&mut self.name),
            FormField::Start => Some(&mut self.start),
            FormField::Duration => Some(&mut self.duration),
            FormField::Color => None,
        }
    }

    fn accepts(&self, ch: char) -> bool {
        match self.field {
            FormField::Name => true,
            FormField::Start | FormField::Duration => ch.is_ascii_digit() || ch == '-',
            FormField::Color => false,
        }
    }

    /// Patch for the field being edited. Unparsable numbers leave the draft as is.
    fn patch(&self) -> DraftPatch {
        match self.field {
            FormField::Name => DraftPatch::name(self.name.value.clone()),
            FormField::Start => DraftPatch {
                start: self.start.value.trim().parse().ok(),
                ..DraftPatch::default()
            },
            FormField::Duration => DraftPatch {
                duration: self.duration.value.trim().parse().ok(),
                ..DraftPatch::default()
            },
            FormField::Color => DraftPatch::default(),
        }
    }

    /// Shows the clamped numbers the store actually kept.
    fn refresh_numbers(&mut self, draft: &TaskDraft) {
        self.start = FieldValue::new(&draft.start.to_string());
        self.duration = FieldValue::new(&draft.duration.to_string());
    }
}

impl App {
    fn new(store: TimelineStore, config: &Config) -> Self {
        let selected_task = if store.tasks().is_empty() {
            None
        } else {
            Some(0)
        };
        let cursor_hour = store
            .tasks()
            .first()
            .map(|t| t.start)
            .unwrap_or_else(|| Local::now().hour());
        let status = format!("{} task(s) on the timeline", store.tasks().len());
        App {
            store,
            layout: TimelineLayout::new(config.unit_height),
            locale: config.locale,
            drag: DragState::default(),
            mode: Mode::Normal,
            cursor_hour,
            selected_task,
            scroll: 0,
            follow_cursor: true,
            status,
            hits: HitAreas::default(),
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Composing(_) => {
                self.handle_form_key(key);
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => self.finish_drag(),
            KeyCode::Left | KeyCode::Char('h') => self.shift_date(-1),
            KeyCode::Right | KeyCode::Char('l') => self.shift_date(1),
            KeyCode::Char('t') => self.jump_to_today(),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-6),
            KeyCode::PageDown => self.move_cursor(6),
            KeyCode::Enter | KeyCode::Char('n') => self.open_draft(self.cursor_hour),
            KeyCode::Tab => self.cycle_task(1),
            KeyCode::BackTab => self.cycle_task(-1),
            KeyCode::Char('K') => self.nudge_selected(-1),
            KeyCode::Char('J') => self.nudge_selected(1),
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close_form = match &mut mode {
            Mode::Composing(form) => self.process_form_key(form, key),
            Mode::Normal => true,
        };
        self.mode = if close_form { Mode::Normal } else { mode };
    }

    fn process_form_key(&mut self, form: &mut DraftForm, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.store.cancel_draft();
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Enter => return self.try_submit(form),
            KeyCode::Tab | KeyCode::BackTab => {
                if key.code == KeyCode::Tab {
                    form.next_field();
                } else {
                    form.prev_field();
                }
                if let Some(draft) = self.store.draft() {
                    form.refresh_numbers(draft);
                }
            }
            KeyCode::Left if form.field == FormField::Color => {
                let color = self.draft_color().prev();
                self.store.update_draft(DraftPatch::color(color));
            }
            KeyCode::Right if form.field == FormField::Color => {
                let color = self.draft_color().next();
                self.store.update_draft(DraftPatch::color(color));
            }
            KeyCode::Left => {
                if let Some(field) = form.active_text_mut() {
                    field.move_left();
                }
            }
            KeyCode::Right => {
                if let Some(field) = form.active_text_mut() {
                    field.move_right();
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = form.active_text_mut() {
                    field.backspace();
                    form.error = None;
                    self.store.update_draft(form.patch());
                }
            }
            KeyCode::Char(c) => {
                if key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    || !form.accepts(c)
                {
                    return false;
                }
                if let Some(field) = form.active_text_mut() {
                    field.insert_char(c);
                    form.error = None;
                    self.store.update_draft(form.patch());
                }
            }
            _ => {}
        }
        false
    }

    fn try_submit(&mut self, form: &mut DraftForm) -> bool {
        match self.store.commit_draft() {
            Ok(task) => {
                self.selected_task = Some(self.store.tasks().len().saturating_sub(1));
                self.cursor_hour = task.start;
                self.follow_cursor = true;
                self.status = format!("Added {} at {}:00", task.name, task.start);
                true
            }
            Err(ValidationError::EmptyName) => {
                form.error = Some(self.locale.dialog().name_required.to_string());
                self.status = format!("Could not add: {}", ValidationError::EmptyName);
                false
            }
            Err(err) => {
                self.status = format!("Could not add: {}", err);
                true
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match self.mode {
            Mode::Normal => self.handle_timeline_mouse(mouse),
            Mode::Composing(_) => self.handle_form_mouse(mouse),
        }
    }

    fn handle_timeline_mouse(&mut self, mouse: MouseEvent) {
        let (col, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if inside(self.hits.prev, col, row) {
                    self.shift_date(-1);
                } else if inside(self.hits.next, col, row) {
                    self.shift_date(1);
                } else if inside(self.hits.timeline, col, row) {
                    let y = self.content_row(row);
                    let on_grid = col >= self.hits.timeline.x + LABEL_WIDTH;
                    if on_grid && self.drag.begin(&self.store, &self.layout, y) {
                        self.select_dragged();
                    } else {
                        self.click_timeline(y);
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.drag.dragged_id().is_none() {
                    return;
                }
                self.autoscroll(row);
                let y = self.content_row(row);
                self.drag.hover(&mut self.store, &self.layout, y);
            }
            MouseEventKind::Up(MouseButton::Left) => self.finish_drag(),
            MouseEventKind::ScrollUp => self.scroll_by(-1),
            MouseEventKind::ScrollDown => self.scroll_by(1),
            _ => {}
        }
    }

    fn handle_form_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let (col, row) = (mouse.column, mouse.row);
        let swatch = self
            .hits
            .form
            .swatches
            .iter()
            .find(|(_, rect)| inside(*rect, col, row))
            .map(|(swatch, _)| *swatch);
        if let Some(swatch) = swatch {
            self.store.update_draft(DraftPatch::color(swatch));
        } else if inside(self.hits.form.submit, col, row) {
            self.handle_form_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        } else if inside(self.hits.form.cancel, col, row) {
            self.handle_form_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        } else if !inside(self.hits.form.dialog, col, row)
            && inside(self.hits.timeline, col, row)
        {
            let y = self.content_row(row);
            self.click_timeline(y);
        }
    }

    /// An hour row was clicked. Ignored while the dialog is already open.
    fn click_timeline(&mut self, y: i32) {
        let hour = self.layout.hour_from_vertical_position(y);
        if self.store.begin_draft(hour as i64) {
            self.cursor_hour = hour;
            self.open_form();
        }
    }

    fn open_draft(&mut self, hour: u32) {
        if self.store.begin_draft(hour as i64) {
            self.open_form();
        }
    }

    fn open_form(&mut self) {
        self.finish_drag();
        if let Some(draft) = self.store.draft() {
            self.status = format!(
                "New task at {}:00 (Tab move, Enter save, Esc cancel)",
                draft.start
            );
            self.mode = Mode::Composing(DraftForm::from_draft(draft));
        }
    }

    fn select_dragged(&mut self) {
        let id = match self.drag.dragged_id() {
            Some(id) => id,
            None => return,
        };
        self.selected_task = self.store.tasks().iter().position(|t| t.id == id);
        if let Some(task) = self.store.task(id) {
            self.status = format!("Dragging {}", task.name);
        }
    }

    fn finish_drag(&mut self) {
        let id = match self.drag.dragged_id() {
            Some(id) => id.to_string(),
            None => return,
        };
        self.drag.end();
        if let Some(task) = self.store.task(&id) {
            info!("task {} dropped at {}", task.id, task.start);
            self.status = format!("Moved {} to {}:00", task.name, task.start);
            self.cursor_hour = task.start;
        }
    }

    fn shift_date(&mut self, days: i64) {
        self.store.change_date(days);
        self.status = format!("Viewing {}", self.locale.format_date(self.store.date()));
    }

    fn jump_to_today(&mut self) {
        let today = Local::now().date_naive();
        let delta = today.signed_duration_since(self.store.date()).num_days();
        self.shift_date(delta);
    }

    fn move_cursor(&mut self, delta: i64) {
        let max = HOURS_PER_DAY as i64 - 1;
        self.cursor_hour = (self.cursor_hour as i64 + delta).clamp(0, max) as u32;
        self.follow_cursor = true;
    }

    fn cycle_task(&mut self, delta: i64) {
        let len = self.store.tasks().len();
        if len == 0 {
            self.status = "No tasks yet".into();
            return;
        }
        let current = self.selected_task.unwrap_or(0) as i64;
        let idx = (current + delta).rem_euclid(len as i64) as usize;
        self.selected_task = Some(idx);
        if let Some(task) = self.store.tasks().get(idx) {
            self.cursor_hour = task.start;
            self.status = format!("Selected {}", task.name);
        }
        self.follow_cursor = true;
    }

    fn nudge_selected(&mut self, delta: i64) {
        let task = match self.selected_task.and_then(|idx| self.store.tasks().get(idx)) {
            Some(task) => task,
            None => {
                self.status = "No task selected to move".into();
                return;
            }
        };
        let id = task.id.clone();
        let target = task.start as i64 + delta;
        self.store.reposition_task(&id, target);
        if let Some(task) = self.store.task(&id) {
            self.cursor_hour = task.start;
            self.status = format!("Moved {} to {}:00", task.name, task.start);
        }
        self.follow_cursor = true;
    }

    fn content_row(&self, screen_row: u16) -> i32 {
        screen_row as i32 - self.hits.timeline.y as i32
            + self.layout.offset_for(self.scroll) as i32
    }

    fn viewport_hours(&self) -> u32 {
        self.hits.timeline.height as u32 / self.layout.unit_height() as u32
    }

    fn max_scroll(&self) -> u32 {
        HOURS_PER_DAY.saturating_sub(self.viewport_hours().max(1))
    }

    fn scroll_by(&mut self, delta: i64) {
        let max = self.max_scroll() as i64;
        self.scroll = (self.scroll as i64 + delta).clamp(0, max) as u32;
    }

    fn autoscroll(&mut self, row: u16) {
        let area = self.hits.timeline;
        if row <= area.y {
            self.scroll_by(-1);
        } else if row + 1 >= area.y + area.height {
            self.scroll_by(1);
        }
    }

    fn draft_color(&self) -> Swatch {
        self.store.draft().map(|d| d.color).unwrap_or_default()
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_timeline(f, layout[1]);
        self.draw_footer(f, layout[2]);

        self.hits.form = match &self.mode {
            Mode::Composing(form) if self.store.is_drafting() => self.draw_form(f, form),
            _ => FormHits::default(),
        };
    }

    fn draw_header(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        f.render_widget(block, area);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(5),
                Constraint::Min(10),
                Constraint::Length(5),
            ])
            .split(inner);
        self.hits.prev = chunks[0];
        self.hits.next = chunks[2];

        let button = Style::default()
            .fg(Color::LightCyan)
            .add_modifier(Modifier::BOLD);
        f.render_widget(
            Paragraph::new(Span::styled(" < ", button)).alignment(Alignment::Center),
            chunks[0],
        );
        let title = Line::from(vec![
            Span::styled(
                "dayline ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(
                self.locale.format_date(self.store.date()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]);
        f.render_widget(
            Paragraph::new(title).alignment(Alignment::Center),
            chunks[1],
        );
        f.render_widget(
            Paragraph::new(Span::styled(" > ", button)).alignment(Alignment::Center),
            chunks[2],
        );
    }

    fn draw_timeline(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Span::styled(
                format!("Timeline ({})", self.store.tasks().len()),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(Color::Rgb(16, 18, 24)));
        let inner = block.inner(area);
        f.render_widget(block, area);
        self.hits.timeline = inner;

        let viewport = self.viewport_hours() as usize;
        if self.follow_cursor {
            self.scroll = adjust_offset(
                self.cursor_hour as usize,
                self.scroll as usize,
                viewport,
                1,
                HOURS_PER_DAY as usize,
            ) as u32;
            self.follow_cursor = false;
        }
        self.scroll = self.scroll.min(self.max_scroll());

        let first_row = self.layout.offset_for(self.scroll);
        f.render_widget(Paragraph::new(self.grid_lines(inner, first_row)), inner);

        let grid = Rect {
            x: inner.x + LABEL_WIDTH.min(inner.width),
            width: inner.width.saturating_sub(LABEL_WIDTH),
            ..inner
        };
        let blocks = self.layout.layout_tasks(self.store.tasks());
        let hovered = self.drag.hover_target().and_then(|h| h.task_id());
        for (idx, (task, block)) in self.store.tasks().iter().zip(&blocks).enumerate() {
            let rect = match visible_rect(grid, block, first_row) {
                Some(rect) => rect,
                None => continue,
            };
            let mut style = Style::default()
                .bg(swatch_color(task.color))
                .fg(swatch_text_color(task.color));
            if self.selected_task == Some(idx) {
                style = style.add_modifier(Modifier::BOLD);
            }
            if self.drag.dragged_id() == Some(task.id.as_str()) {
                style = style.add_modifier(Modifier::DIM);
            }
            if hovered == Some(task.id.as_str()) {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            f.render_widget(Clear, rect);
            f.render_widget(
                Paragraph::new(task_line(task, rect.width)).style(style),
                rect,
            );
        }
    }

    fn grid_lines(&self, inner: Rect, first_row: u32) -> Vec<Line<'static>> {
        let unit = self.layout.unit_height() as u32;
        let hover_row = match self.drag.hover_target() {
            Some(HoverTarget::Row(hour)) => Some(*hour),
            _ => None,
        };
        let rule = "─".repeat(inner.width.saturating_sub(LABEL_WIDTH) as usize);
        let mut lines = Vec::new();
        for offset in 0..inner.height as u32 {
            let y = first_row + offset;
            if y >= self.layout.content_height() {
                break;
            }
            let hour = y / unit;
            let label_style = if Some(hour) == hover_row {
                Style::default()
                    .fg(Color::LightYellow)
                    .add_modifier(Modifier::BOLD)
            } else if hour == self.cursor_hour {
                Style::default()
                    .fg(Color::LightCyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            if y % unit == 0 {
                lines.push(Line::from(vec![
                    Span::styled(format!("{:>5} ", format!("{}:00", hour)), label_style),
                    Span::styled(rule.clone(), Style::default().fg(Color::DarkGray)),
                ]));
            } else {
                lines.push(Line::from(Span::styled(
                    " ".repeat(LABEL_WIDTH as usize),
                    label_style,
                )));
            }
        }
        lines
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let selected = self
            .selected_task
            .and_then(|idx| self.store.tasks().get(idx))
            .map(selected_task_detail)
            .unwrap_or_else(|| Line::from("No task selected"));
        let detail = Paragraph::new(selected).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .title("Selected"),
        );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        match self.mode {
            Mode::Normal => Line::from(vec![
                Span::styled("←→", Style::default().fg(Color::LightCyan)),
                Span::raw(" day  "),
                Span::styled("↑↓", Style::default().fg(Color::LightCyan)),
                Span::raw(" hour  "),
                Span::styled("Enter/click", Style::default().fg(Color::LightMagenta)),
                Span::raw(" new  "),
                Span::styled("Tab", Style::default().fg(Color::LightCyan)),
                Span::raw(" select  "),
                Span::styled("J/K/drag", Style::default().fg(Color::LightGreen)),
                Span::raw(" move  "),
                Span::styled("t", Style::default().fg(Color::LightYellow)),
                Span::raw(" today  "),
                Span::styled("q", Style::default().fg(Color::LightRed)),
                Span::raw(" quit"),
            ]),
            Mode::Composing(_) => Line::from(vec![
                Span::styled("Tab/Shift-Tab", Style::default().fg(Color::LightCyan)),
                Span::raw(" field  "),
                Span::styled("←→", Style::default().fg(Color::LightCyan)),
                Span::raw(" color  "),
                Span::styled("Enter", Style::default().fg(Color::LightGreen)),
                Span::raw(" add  "),
                Span::styled("Esc", Style::default().fg(Color::LightRed)),
                Span::raw(" cancel"),
            ]),
        }
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, form: &DraftForm) -> FormHits {
        let text = self.locale.dialog();
        let color = self.draft_color();
        let area = centered_rect(60, 50, f.size());
        let block = Block::default()
            .title(Span::styled(
                text.title,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        f.render_widget(Clear, area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        let fields = [
            (text.name, &form.name, FormField::Name),
            (text.start, &form.start, FormField::Start),
            (text.duration, &form.duration, FormField::Duration),
        ];
        for (row, (label, value, field)) in fields.into_iter().enumerate() {
            f.render_widget(
                Paragraph::new(field_line(label, value, form.field == field)),
                rows[row],
            );
        }

        let color_label = Span::styled(format!("{}: ", text.color), label_style());
        let mut constraints = vec![Constraint::Length(color_label.width() as u16)];
        constraints.extend(Swatch::ALL.iter().map(|_| Constraint::Length(4)));
        constraints.push(Constraint::Min(0));
        let swatch_row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(rows[3]);
        f.render_widget(Paragraph::new(color_label), swatch_row[0]);
        let mut swatches = Vec::new();
        for (idx, swatch) in Swatch::ALL.iter().enumerate() {
            let rect = swatch_row[idx + 1];
            let chosen = *swatch == color;
            let mark = if chosen { "[■]" } else { " ■ " };
            let mut style = Style::default().fg(swatch_color(*swatch));
            if chosen && form.field == FormField::Color {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            f.render_widget(Paragraph::new(Span::styled(mark, style)), rect);
            swatches.push((*swatch, rect));
        }

        let submit = Span::styled(
            format!("[ {} ]", text.submit),
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        );
        let cancel = Span::styled(
            format!("[ {} ]", text.cancel),
            Style::default().fg(Color::Gray),
        );
        let buttons = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(submit.width() as u16),
                Constraint::Length(2),
                Constraint::Length(cancel.width() as u16),
                Constraint::Min(0),
            ])
            .split(rows[5]);
        f.render_widget(Paragraph::new(submit), buttons[0]);
        f.render_widget(Paragraph::new(cancel), buttons[2]);

        if let Some(error) = &form.error {
            f.render_widget(
                Paragraph::new(Span::styled(
                    error.clone(),
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                )),
                rows[6],
            );
        }
        f.render_widget(
            Paragraph::new(Span::styled(
                "Enter to add • Esc to cancel • Tab/Shift-Tab to move • ←→ picks a color",
                Style::default().fg(Color::Gray),
            ))
            .wrap(Wrap { trim: true }),
            rows[7],
        );

        FormHits {
            dialog: area,
            swatches,
            submit: buttons[0],
            cancel: buttons[2],
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn inside(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x
        && col < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

/// Screen rect for the part of `block` inside the scrolled grid.
fn visible_rect(grid: Rect, block: &TaskBlock, first_row: u32) -> Option<Rect> {
    let top = block.top.max(first_row);
    let bottom = block.bottom().min(first_row + grid.height as u32);
    if top >= bottom || grid.width == 0 {
        return None;
    }
    Some(Rect {
        x: grid.x,
        y: grid.y + (top - first_row) as u16,
        width: grid.width,
        height: (bottom - top) as u16,
    })
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn swatch_color(swatch: Swatch) -> Color {
    match swatch {
        Swatch::Blue => Color::Rgb(59, 130, 246),
        Swatch::Green => Color::Rgb(34, 197, 94),
        Swatch::Yellow => Color::Rgb(234, 179, 8),
        Swatch::Red => Color::Rgb(239, 68, 68),
        Swatch::Purple => Color::Rgb(168, 85, 247),
        Swatch::Pink => Color::Rgb(236, 72, 153),
    }
}

fn swatch_text_color(swatch: Swatch) -> Color {
    match swatch {
        Swatch::Yellow => Color::Black,
        _ => Color::White,
    }
}

fn prev_grapheme(cursor: usize, text: &str) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_grapheme(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out.chars().take(max).collect()
}

fn task_line(task: &Task, width: u16) -> Line<'static> {
    let hours = format!("  {}:00-{}:00", task.start, task.end());
    let room = (width as usize).saturating_sub(hours.chars().count() + 1);
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            truncate_text(&task.name, room),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(hours),
    ])
}

fn label_style() -> Style {
    Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM)
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style()),
        Span::styled(text, value_style),
    ])
}

fn selected_task_detail(task: &Task) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            task.name.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{}:00-{}:00", task.start, task.end()),
            Style::default().fg(Color::LightCyan),
        ),
        Span::raw("  "),
        Span::styled(
            task.color.label(),
            Style::default().fg(swatch_color(task.color)),
        ),
        Span::styled(
            format!("  #{}", task.id),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskSeed;
    use crate::store::SequentialIds;
    use chrono::NaiveDate;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        let config = Config {
            locale: Locale::En,
            ..Config::default()
        };
        let store = TimelineStore::new(
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            TaskSeed::defaults(),
            config.default_color,
            Box::new(SequentialIds::default()),
        );
        App::new(store, &config)
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 60)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn mouse(app: &mut App, kind: MouseEventKind, column: u16, row: u16) {
        app.handle_mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        });
    }

    /// Screen row of a content row in the grid, assuming no scroll.
    fn screen_row(app: &App, content_row: u32) -> u16 {
        app.hits.timeline.y + content_row as u16
    }

    fn grid_col(app: &App) -> u16 {
        app.hits.timeline.x + LABEL_WIDTH + 4
    }

    #[test]
    fn renders_hour_labels_tasks_and_date() {
        let mut app = app();
        let screen = render(&mut app);
        assert!(screen.contains("Sun, Mar 10"));
        assert!(screen.contains(" 0:00"));
        assert!(screen.contains("9:00"));
        assert!(screen.contains("23:00"));
        assert!(screen.contains("Meeting"));
        assert!(screen.contains("Coding"));
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn click_on_hour_twenty_and_commit_review() {
        let mut app = app();
        render(&mut app);
        let col = grid_col(&app);
        let row = screen_row(&app, app.layout.offset_for(20));
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), col, row);
        assert!(matches!(app.mode, Mode::Composing(_)));
        assert_eq!(app.store.draft().unwrap().start, 20);

        type_text(&mut app, "Review");
        assert_eq!(app.store.draft().unwrap().name, "Review");
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert!(!app.store.is_drafting());
        let last = app.store.tasks().last().unwrap();
        assert_eq!(app.store.tasks().len(), 4);
        assert_eq!((last.name.as_str(), last.start, last.duration), ("Review", 20, 1));
        assert_eq!(app.selected_task, Some(3));
    }

    #[test]
    fn empty_name_keeps_dialog_open() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "  ");
        press(&mut app, KeyCode::Enter);
        match &app.mode {
            Mode::Composing(form) => assert_eq!(form.error.as_deref(), Some("Enter a task name")),
            Mode::Normal => panic!("dialog closed on empty name"),
        }
        assert_eq!(app.store.tasks().len(), 3);
        let screen = render(&mut app);
        assert!(screen.contains("Enter a task name"));
    }

    #[test]
    fn clicks_behind_open_dialog_do_not_reset_draft() {
        let mut app = app();
        render(&mut app);
        let col = grid_col(&app);
        let row = screen_row(&app, app.layout.offset_for(20));
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), col, row);
        render(&mut app);
        let behind = screen_row(&app, app.layout.offset_for(1));
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 2, behind);
        assert_eq!(app.store.draft().unwrap().start, 20);
    }

    #[test]
    fn form_edits_flow_into_draft() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "Gym");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "x7");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "0");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        let draft = app.store.draft().unwrap().clone();
        assert_eq!(draft.name, "Gym");
        assert_eq!(draft.start, 7);
        assert_eq!(draft.duration, 1);
        assert_eq!(draft.color, Swatch::Pink);
        press(&mut app, KeyCode::Esc);
        assert!(!app.store.is_drafting());
        assert_eq!(app.store.tasks().len(), 3);
    }

    #[test]
    fn swatch_and_submit_buttons_are_clickable() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "Walk");
        render(&mut app);
        let (swatch, rect) = app.hits.form.swatches[0];
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), rect.x + 1, rect.y);
        assert_eq!(app.store.draft().unwrap().color, swatch);
        let submit = app.hits.form.submit;
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), submit.x, submit.y);
        assert_eq!(app.store.tasks().last().unwrap().color, Swatch::Blue);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn dragging_meeting_onto_coding_top_edge() {
        let mut app = app();
        render(&mut app);
        let col = grid_col(&app);
        let meeting_last_row = screen_row(&app, app.layout.offset_for(11) - 1);
        let coding_top = screen_row(&app, app.layout.offset_for(13));
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), col, meeting_last_row);
        assert_eq!(app.drag.dragged_id(), Some("1"));
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), col, coding_top);
        assert_eq!(app.store.task("1").unwrap().start, 13);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), col, coding_top);
        assert_eq!(app.drag, DragState::Idle);
        assert_eq!(app.status, "Moved Meeting to 13:00");
        assert!(!app.store.is_drafting());
    }

    #[test]
    fn header_buttons_and_keys_change_date() {
        let mut app = app();
        render(&mut app);
        let prev = app.hits.prev;
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), prev.x + 1, prev.y);
        assert_eq!(app.store.date(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.store.date(), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.store.date(), Local::now().date_naive());
    }

    #[test]
    fn keyboard_nudge_clamps_at_midnight() {
        let mut app = app();
        for _ in 0..12 {
            press(&mut app, KeyCode::Char('K'));
        }
        assert_eq!(app.store.task("1").unwrap().start, 0);
        press(&mut app, KeyCode::Tab);
        for _ in 0..30 {
            press(&mut app, KeyCode::Char('J'));
        }
        let coding = app.store.task("2").unwrap();
        assert_eq!((coding.start, coding.duration), (23, 3));
    }

    #[test]
    fn small_terminal_scrolls_to_cursor() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        for _ in 0..12 {
            press(&mut app, KeyCode::Down);
        }
        terminal.draw(|f| app.draw(f)).unwrap();
        assert_eq!(app.cursor_hour, 21);
        let first = app.scroll;
        let last = first + app.viewport_hours();
        assert!(first <= 21 && 21 < last);
        assert!(app.scroll <= app.max_scroll());
    }

    #[test]
    fn huge_duration_commits_and_renders() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "Huge");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "9999999999");
        press(&mut app, KeyCode::Enter);
        let task = app.store.tasks().last().unwrap().clone();
        assert_eq!((task.name.as_str(), task.duration), ("Huge", u32::MAX));
        assert_eq!(task.end(), u32::MAX);
        let screen = render(&mut app);
        assert!(screen.contains("Huge"));
    }

    #[test]
    fn opening_dialog_mid_drag_releases_the_block() {
        let mut app = app();
        render(&mut app);
        let col = grid_col(&app);
        let meeting_top = screen_row(&app, app.layout.offset_for(9));
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), col, meeting_top);
        assert_eq!(app.drag.dragged_id(), Some("1"));
        press(&mut app, KeyCode::Char('n'));
        assert!(matches!(app.mode, Mode::Composing(_)));
        assert_eq!(app.drag, DragState::Idle);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.drag, DragState::Idle);
        assert_eq!(app.store.task("1").unwrap().start, 9);
    }

    #[test]
    fn header_draws_date_buttons() {
        let mut app = app();
        let screen = render(&mut app);
        assert!(screen.contains(" < "));
        assert!(screen.contains(" > "));
    }

    #[test]
    fn quit_key_ends_loop() {
        let mut app = app();
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_text("Break", 10), "Break");
        assert_eq!(truncate_text("A very long task name", 10), "A very ...");
        assert_eq!(truncate_text("abc", 0), "");
    }
}
