use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use crossterm::{event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Frame, Terminal, widgets::{Block, Borders, List, ListItem, Paragraph, ListState, Wrap}, layout::{Layout, Constraint, Direction}, style::{Style, Modifier, Color}};

use taskmaster::{
    application::task_service::{start_session, TaskService, TaskServiceImpl},
    config::Config,
    domain::{
        store::TaskStore,
        task::{NewTask, Priority, Task, TaskChanges, TaskId, TaskStatus},
        view::{Criteria, TaskStats},
    },
    infrastructure::{kv::{prepare_sqlite_file, SqliteKeyValue}, local_identity::LocalIdentityProvider, sqlite_store::SqliteTaskStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(&config)?;

    prepare_sqlite_file(&config.database_url)?;
    let kv = SqliteKeyValue::connect(&config.database_url).await?;
    let store = SqliteTaskStore::new(kv.clone());
    store.init().await?;
    let service = TaskServiceImpl::new(store, LocalIdentityProvider::new(kv));
    let notice = start_session(&service, config.local_user.clone()).await?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, service, notice).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

/// Logs go to a file or nowhere; stdout belongs to the UI.
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = &config.log_file else { return Ok(()) };
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[derive(Clone, PartialEq, Eq)]
enum Mode { View, Search, Create, Edit(TaskId) }

#[derive(Clone, Copy, PartialEq, Eq)]
enum ActiveField { Title, Description, Priority, Due }

impl ActiveField {
    fn next(self) -> Self {
        match self { Self::Title => Self::Description, Self::Description => Self::Priority, Self::Priority => Self::Due, Self::Due => Self::Title }
    }

    fn label(self) -> &'static str {
        match self { Self::Title => "Title", Self::Description => "Desc", Self::Priority => "Priority", Self::Due => "Due" }
    }
}

#[derive(Default)]
struct Draft {
    title: String,
    description: String,
    priority: Priority,
    due: String,
    // Text the due field was filled with; left as is, the stored due date is kept.
    seeded_due: String,
}

impl Draft {
    fn from_task(task: &Task) -> Self {
        let due = task.due_date.map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default();
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            priority: task.priority,
            seeded_due: due.clone(),
            due,
        }
    }

    fn new_task(&self) -> Result<NewTask, String> {
        Ok(NewTask {
            title: self.title.clone(),
            description: Some(self.description.clone()),
            priority: Some(self.priority),
            due_date: parse_due(&self.due)?,
            status: None,
        })
    }

    fn changes(&self) -> Result<TaskChanges, String> {
        let due_date = if self.due == self.seeded_due { None } else { Some(parse_due(&self.due)?) };
        Ok(TaskChanges {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            status: None,
            priority: Some(self.priority),
            due_date,
        })
    }

    fn text_mut(&mut self, field: ActiveField) -> Option<&mut String> {
        match field {
            ActiveField::Title => Some(&mut self.title),
            ActiveField::Description => Some(&mut self.description),
            ActiveField::Due => Some(&mut self.due),
            ActiveField::Priority => None,
        }
    }
}

struct App<S: TaskService> {
    service: S,
    items: Vec<Task>,
    stats: TaskStats,
    criteria: Criteria,
    selected: usize,
    last_tick: Instant,
    mode: Mode,
    list_state: ListState,
    field: ActiveField,
    draft: Draft,
    message: Option<String>,
}

impl<S: TaskService> App<S> {
    async fn load(&mut self) {
        match self.service.snapshot(self.criteria.clone()).await {
            Ok(snapshot) => { self.items = snapshot.items; self.stats = snapshot.stats; }
            Err(e) => { self.items.clear(); self.message = Some(format!("Could not load tasks: {e}")); }
        }
        // Clamp selection within the derived view
        let len = self.items.len();
        if len == 0 { self.selected = 0; self.list_state.select(None); }
        else { if self.selected >= len { self.selected = len - 1; } self.list_state.select(Some(self.selected)); }
    }

    fn selected_task(&self) -> Option<&Task> { self.items.get(self.selected) }

    fn report<T>(&mut self, action: &str, result: taskmaster::domain::error::TaskResult<T>) {
        if let Err(e) = result { self.message = Some(format!("Could not {action}: {e}")); }
    }

    fn start_form(&mut self, mode: Mode, draft: Draft) {
        self.mode = mode;
        self.field = ActiveField::Title;
        self.draft = draft;
        self.message = None;
    }

    /// Returns false when the submission is rejected and the form stays open.
    async fn submit(&mut self) -> bool {
        if self.draft.title.trim().is_empty() {
            self.message = Some("Please enter a task title.".into());
            return false;
        }
        let res = match self.mode.clone() {
            Mode::Create => match self.draft.new_task() {
                Ok(input) => self.service.create(input).await,
                Err(e) => { self.message = Some(e); return false; }
            },
            Mode::Edit(id) => match self.draft.changes() {
                Ok(changes) => self.service.update(id, changes).await,
                Err(e) => { self.message = Some(e); return false; }
            },
            Mode::View | Mode::Search => return true,
        };
        self.report("save task", res);
        true
    }
}

async fn run_app<S: TaskService>(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, service: S, notice: Option<String>) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut app = App {
        service,
        items: vec![],
        stats: TaskStats::default(),
        criteria: Criteria::default(),
        selected: 0,
        last_tick: Instant::now(),
        mode: Mode::View,
        list_state: ListState::default(),
        field: ActiveField::Title,
        draft: Draft::default(),
        message: notice,
    };
    app.load().await;

    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        let timeout = tick_rate.saturating_sub(app.last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Only act on key presses; ignore repeats and releases to prevent duplicate input
                if key.kind != KeyEventKind::Press { continue; }
                match app.mode.clone() {
                    Mode::View => match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::Up => { if app.selected > 0 { app.selected -= 1; } }
                        KeyCode::Down => { if app.selected + 1 < app.items.len() { app.selected += 1; } }
                        KeyCode::Enter => {
                            if let Some(id) = app.selected_task().map(|t| t.id.clone()) {
                                let res = app.service.toggle(id).await;
                                app.report("update task", res);
                                app.load().await;
                            }
                        }
                        KeyCode::Char('n') => app.start_form(Mode::Create, Draft::default()),
                        KeyCode::Char('e') => {
                            if let Some(task) = app.selected_task().cloned() {
                                app.start_form(Mode::Edit(task.id.clone()), Draft::from_task(&task));
                            }
                        }
                        KeyCode::Char('d') => {
                            if let Some(id) = app.selected_task().map(|t| t.id.clone()) {
                                let res = app.service.delete(id).await;
                                app.report("delete task", res);
                                if app.selected > 0 { app.selected -= 1; }
                                app.load().await;
                            }
                        }
                        KeyCode::Char('f') => { app.criteria.status_filter = app.criteria.status_filter.next(); app.load().await; }
                        KeyCode::Char('p') => { app.criteria.priority_filter = app.criteria.priority_filter.next(); app.load().await; }
                        KeyCode::Char('/') => { app.mode = Mode::Search; app.message = None; }
                        KeyCode::Char('r') => {
                            let res = app.service.refresh().await;
                            app.report("load tasks", res);
                            app.load().await;
                        }
                        _ => {}
                    },
                    Mode::Search => match key.code {
                        KeyCode::Esc => { app.criteria.search_text.clear(); app.mode = Mode::View; app.load().await; }
                        KeyCode::Enter => { app.mode = Mode::View; }
                        KeyCode::Backspace => { app.criteria.search_text.pop(); app.load().await; }
                        KeyCode::Char(c) => { app.criteria.search_text.push(c); app.load().await; }
                        _ => {}
                    },
                    Mode::Create | Mode::Edit(_) => match key.code {
                        KeyCode::Esc => { app.mode = Mode::View; app.draft = Draft::default(); app.message = None; }
                        KeyCode::Enter => {
                            if app.submit().await {
                                app.mode = Mode::View;
                                app.draft = Draft::default();
                                app.load().await;
                            }
                        }
                        KeyCode::Tab => { app.field = app.field.next(); }
                        KeyCode::Left if app.field == ActiveField::Priority => { app.draft.priority = app.draft.priority.prev(); }
                        KeyCode::Right if app.field == ActiveField::Priority => { app.draft.priority = app.draft.priority.next(); }
                        KeyCode::Backspace => { if let Some(text) = app.draft.text_mut(app.field) { text.pop(); } }
                        KeyCode::Char(c) => { if let Some(text) = app.draft.text_mut(app.field) { text.push(c); } }
                        _ => {}
                    },
                }
            }
        }
        if app.last_tick.elapsed() >= tick_rate {
            app.last_tick = Instant::now();
        }
    }
    Ok(())
}

fn ui<S: TaskService>(f: &mut Frame, app: &mut App<S>) {
    let now = Utc::now();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(1), Constraint::Length(3)])
        .split(f.size());

    let header = Paragraph::new(format!(
        "Total {}  |  Completed {}  |  Pending {}  |  Overdue {}\nEnter: toggle, n: new, e: edit, d: delete, f: status, p: priority, /: search, r: refresh, q: quit",
        app.stats.total, app.stats.completed, app.stats.pending, app.stats.overdue
    ))
    .block(Block::default().borders(Borders::ALL).title("taskmaster"));
    f.render_widget(header, chunks[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let list_items: Vec<ListItem> = app.items.iter().map(|t| {
        let mark = match t.status { TaskStatus::Open => "[ ]", TaskStatus::Complete => "[x]" };
        let due = t.due_date.map(|d| format!("  ({})", format_due(d, now))).unwrap_or_default();
        let style = if t.is_overdue(now) { Style::default().fg(Color::Red) } else { Style::default().fg(priority_color(t.priority)) };
        ListItem::new(format!("{} {:<6} {}{}", mark, t.priority.as_str(), t.title, due)).style(style)
    }).collect();
    if app.items.is_empty() { app.list_state.select(None); } else { app.list_state.select(Some(app.selected)); }
    let list = List::new(list_items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            "tasks [status={} priority={}{}]",
            app.criteria.status_filter,
            app.criteria.priority_filter,
            if app.criteria.search_text.is_empty() { String::new() } else { format!(" search=\"{}\"", app.criteria.search_text) },
        )))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, middle[0], &mut app.list_state);

    let detail = app.selected_task().map(|t| {
        let desc = t.description.clone().unwrap_or_else(|| "(no description)".to_string());
        let due = t.due_date.map(|d| format_due(d, now)).unwrap_or_else(|| "none".to_string());
        let overdue = if t.is_overdue(now) { "  (overdue)" } else { "" };
        format!("Title:\n{}\n\nStatus: {}\nPriority: {}\nDue: {}{}\n\nDescription:\n{}", t.title, t.status, t.priority, due, overdue, desc)
    }).unwrap_or_default();
    let details = Paragraph::new(detail)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("details"));
    f.render_widget(details, middle[1]);

    let footer_text = match &app.mode {
        Mode::View => app.message.clone().unwrap_or_else(|| "Ready".to_string()),
        Mode::Search => format!("Search: {}_  |  (Enter to keep, Esc to clear)", app.criteria.search_text),
        Mode::Create | Mode::Edit(_) => {
            let value = match app.field {
                ActiveField::Title => app.draft.title.clone(),
                ActiveField::Description => app.draft.description.clone(),
                ActiveField::Priority => format!("< {} >", app.draft.priority),
                ActiveField::Due => app.draft.due.clone(),
            };
            let hint = app.message.clone().unwrap_or_else(|| "Tab to switch, Enter to save, Esc to cancel".to_string());
            format!("{}: {}_  |  {}", app.field.label(), value, hint)
        }
    };
    let footer_title = match app.mode { Mode::View => "info", Mode::Search => "search", Mode::Create => "create", Mode::Edit(_) => "edit" };
    let footer = Paragraph::new(footer_text)
        .block(Block::default().borders(Borders::ALL).title(footer_title));
    f.render_widget(footer, chunks[2]);
}

fn priority_color(priority: Priority) -> Color {
    match priority { Priority::High => Color::LightRed, Priority::Medium => Color::Yellow, Priority::Low => Color::Gray }
}

/// `Today, 14:30`, `Tomorrow, 09:00`, `Mar 4, 18:00` or `Mar 4, 2023, 18:00`, in local time.
fn format_due(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let due = due.with_timezone(&Local);
    let today = now.with_timezone(&Local).date_naive();
    let day = due.date_naive();
    if day == today {
        format!("Today, {}", due.format("%H:%M"))
    } else if today.succ_opt() == Some(day) {
        format!("Tomorrow, {}", due.format("%H:%M"))
    } else if day.year() != today.year() {
        due.format("%b %-d, %Y, %H:%M").to_string()
    } else {
        due.format("%b %-d, %H:%M").to_string()
    }
}

/// Accepts `YYYY-MM-DD HH:MM`, or `YYYY-MM-DD` meaning the end of that day, in
/// local time. Blank means no due date.
fn parse_due(input: &str) -> Result<Option<DateTime<Utc>>, String> {
    let input = input.trim();
    if input.is_empty() { return Ok(None); }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(input, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(23, 59, 0)))
        .ok_or_else(|| format!("Invalid due date \"{input}\", use YYYY-MM-DD or YYYY-MM-DD HH:MM"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|d| Some(d.with_timezone(&Utc)))
        .ok_or_else(|| format!("{input} does not exist in the local time zone"))
}
