use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ecospend::{report, ExpenseLedger, Submission};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Ledger,
    DailyTrend,
    Categories,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Ledger => Page::DailyTrend,
            Page::DailyTrend => Page::Categories,
            Page::Categories => Page::Ledger,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Ledger => Page::Categories,
            Page::DailyTrend => Page::Ledger,
            Page::Categories => Page::DailyTrend,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Ledger => "Ledger",
            Page::DailyTrend => "Daily Trend",
            Page::Categories => "Categories",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Category,
    Amount,
}

impl Field {
    fn next(&self) -> Self {
        match self {
            Field::Date => Field::Category,
            Field::Category => Field::Amount,
            Field::Amount => Field::Date,
        }
    }

    fn previous(&self) -> Self {
        match self {
            Field::Date => Field::Amount,
            Field::Category => Field::Date,
            Field::Amount => Field::Category,
        }
    }
}

/// Input form state: raw text until submitted
#[derive(Debug, Clone)]
pub struct FormState {
    pub date: String,
    pub category_index: usize,
    pub amount: String,
    pub focus: Field,
    pub message: Option<StatusMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusMessage {
    Added(String),
    Rejected(String),
}

impl FormState {
    fn new(today: NaiveDate) -> Self {
        FormState {
            date: today.format("%Y-%m-%d").to_string(),
            category_index: 0,
            amount: String::new(),
            focus: Field::Amount,
            message: None,
        }
    }
}

pub struct App {
    pub ledger: ExpenseLedger,
    pub state: TableState,
    pub current_page: Page,
    pub form: FormState,
    pub categories: Vec<&'static str>,
}

impl App {
    pub fn new(ledger: ExpenseLedger) -> Self {
        Self::with_date(ledger, Local::now().date_naive())
    }

    /// App whose date field starts at `today`
    pub fn with_date(ledger: ExpenseLedger, today: NaiveDate) -> Self {
        let categories = ledger.factors().categories().collect();
        let mut state = TableState::default();
        if !ledger.is_empty() {
            state.select(Some(0));
        }

        Self {
            ledger,
            state,
            current_page: Page::Ledger,
            form: FormState::new(today),
            categories,
        }
    }

    pub fn selected_category(&self) -> &'static str {
        self.categories[self.form.category_index % self.categories.len()]
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next_category(&mut self) {
        self.form.category_index = (self.form.category_index + 1) % self.categories.len();
    }

    pub fn previous_category(&mut self) {
        let len = self.categories.len();
        self.form.category_index = (self.form.category_index + len - 1) % len;
    }

    /// Validate the form and append it to the ledger.
    ///
    /// A rejected submission leaves the ledger and the typed amount untouched.
    pub fn submit(&mut self) {
        let category = self.selected_category();
        match Submission::parse(&self.form.date, category, &self.form.amount) {
            Ok(submission) => {
                let entry = submission.apply(&mut self.ledger);
                let message = format!(
                    "Added {} {} {:.2} → {:.3} kg CO₂",
                    entry.date, entry.category, entry.amount, entry.carbon_kg
                );
                self.form.amount.clear();
                self.form.message = Some(StatusMessage::Added(message));
                self.state.select(Some(self.ledger.len() - 1));
            }
            Err(err) => {
                tracing::debug!(error = %err, "submission rejected");
                self.form.message = Some(StatusMessage::Rejected(err.to_string()));
            }
        }
    }

    fn type_char(&mut self, c: char) {
        match self.form.focus {
            Field::Date if c.is_ascii_digit() || c == '-' => self.form.date.push(c),
            Field::Amount if c.is_ascii_digit() || c == '.' => self.form.amount.push(c),
            _ => {}
        }
    }

    fn backspace(&mut self) {
        match self.form.focus {
            Field::Date => {
                self.form.date.pop();
            }
            Field::Amount => {
                self.form.amount.pop();
            }
            Field::Category => {}
        }
    }

    pub fn next(&mut self) {
        let len = self.ledger.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.ledger.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    /// Apply one key press. Returns false when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => return false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Char('q') => return false,
            KeyCode::Tab => self.next_page(),
            KeyCode::BackTab => self.previous_page(),
            _ if self.current_page != Page::Ledger => {}
            KeyCode::Enter => self.submit(),
            KeyCode::Down => self.form.focus = self.form.focus.next(),
            KeyCode::Up => self.form.focus = self.form.focus.previous(),
            KeyCode::Right if self.form.focus == Field::Category => self.next_category(),
            KeyCode::Left if self.form.focus == Field::Category => self.previous_category(),
            KeyCode::Char(c) => self.type_char(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::PageDown => self.next(),
            KeyCode::PageUp => self.previous(),
            KeyCode::Home if !self.ledger.is_empty() => self.state.select(Some(0)),
            KeyCode::End if !self.ledger.is_empty() => self.state.select(Some(self.ledger.len() - 1)),
            _ => {}
        }
        true
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Ledger => {
            let content_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(5), Constraint::Min(0)])
                .split(chunks[1]);

            render_form(f, content_chunks[0], app);
            if app.ledger.is_empty() {
                render_placeholder(f, content_chunks[1], " Expenses ");
            } else {
                render_table(f, content_chunks[1], app);
            }
        }
        Page::DailyTrend if app.ledger.is_empty() => render_placeholder(f, chunks[1], " Daily Trend "),
        Page::DailyTrend => render_daily_chart(f, chunks[1], app),
        Page::Categories if app.ledger.is_empty() => render_placeholder(f, chunks[1], " Categories "),
        Page::Categories => render_categories(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Ledger, Page::DailyTrend, Page::Categories];

    let mut tab_spans = vec![Span::styled(
        "🌱 EcoSpend  ",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Entries: {}", app.ledger.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Total: {:.2} kg CO₂", app.ledger.grand_total()),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn field_style(app: &App, field: Field) -> Style {
    if app.form.focus == field {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let category = app.selected_category();
    let factor = app.ledger.factors().lookup(category);

    let content = vec![
        Line::from(vec![
            Span::styled("  Date: ", label),
            Span::styled(format!(" {} ", app.form.date), field_style(app, Field::Date)),
            Span::raw("   "),
            Span::styled("Category: ", label),
            Span::styled(
                format!(" ◀ {} ▶ ", report::category_display(&app.ledger, category)),
                field_style(app, Field::Category),
            ),
            Span::styled(format!(" ×{}", factor), Style::default().fg(Color::DarkGray)),
            Span::raw("   "),
            Span::styled("Amount: ", label),
            Span::styled(format!(" {:<10}", app.form.amount), field_style(app, Field::Amount)),
        ]),
        Line::from(""),
        match &app.form.message {
            Some(StatusMessage::Added(msg)) => Line::from(Span::styled(
                format!("  ✓ {}", msg),
                Style::default().fg(Color::Green),
            )),
            Some(StatusMessage::Rejected(msg)) => Line::from(Span::styled(
                format!("  ✗ {}", msg),
                Style::default().fg(Color::Red),
            )),
            None => Line::from(Span::styled(
                "  Enter an expense and press Enter to add it",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        },
    ];

    let form = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" New Expense "),
    );

    f.render_widget(form, area);
}

fn render_placeholder(f: &mut Frame, area: Rect, title: &str) {
    let placeholder = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            report::EMPTY_MESSAGE,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title.to_string()),
    );

    f.render_widget(placeholder, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let header_cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header = header_row(&["Date", "Category", "Amount", "kg CO₂"]);

    let rows = app.ledger.iter().map(|entry| {
        let color = if entry.carbon_kg > 0.0 {
            Color::Green
        } else {
            Color::DarkGray
        };

        Row::new(vec![
            Cell::from(entry.date.format("%Y-%m-%d").to_string()),
            Cell::from(report::category_display(&app.ledger, &entry.category)),
            Cell::from(format!("{:.2}", entry.amount)),
            Cell::from(format!("{:.3}", entry.carbon_kg)).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(22),
            Constraint::Length(14),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Expenses & Carbon Footprint "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_daily_chart(f: &mut Frame, area: Rect, app: &App) {
    let daily = app.ledger.daily_totals();

    let points: Vec<(f64, f64)> = daily
        .iter()
        .enumerate()
        .map(|(i, d)| (i as f64, d.carbon_kg))
        .collect();

    let max_y = daily.iter().map(|d| d.carbon_kg).fold(0.0_f64, f64::max);
    let y_top = if max_y > 0.0 { max_y * 1.1 } else { 1.0 };
    let x_right = (daily.len().saturating_sub(1)).max(1) as f64;

    let date_label = |i: usize| Span::raw(daily[i].date.format("%m-%d").to_string());
    let x_labels = match daily.len() {
        1 => vec![date_label(0)],
        2 => vec![date_label(0), date_label(1)],
        n => vec![date_label(0), date_label(n / 2), date_label(n - 1)],
    };

    let datasets = vec![
        Dataset::default()
            .name("kg CO₂")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(&points),
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Yellow))
            .data(&points),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Daily Carbon Footprint (kg CO₂) "),
        )
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_right])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("kg CO₂")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, y_top])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.1}", y_top / 2.0)),
                    Span::raw(format!("{:.1}", y_top)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_categories(f: &mut Frame, area: Rect, app: &App) {
    let header = header_row(&["Category", "kg CO₂", "Share", ""]);

    let rows: Vec<Row> = app
        .ledger
        .category_shares()
        .into_iter()
        .map(|share| {
            Row::new(vec![
                Cell::from(report::category_display(&app.ledger, &share.category)),
                Cell::from(format!("{:.3}", share.carbon_kg)),
                Cell::from(format!("{:.1}%", share.percent)).style(Style::default().fg(Color::Yellow)),
                Cell::from(report::share_bar(share.percent, 30)).style(Style::default().fg(Color::Green)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(32),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Carbon Footprint by Category "),
    );

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![Span::styled(
        format!(" {} ", report::total_line(&app.ledger)),
        Style::default().fg(Color::Cyan),
    )];

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    if app.current_page == Page::Ledger {
        status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Field | "));
        status_spans.push(Span::styled("←/→", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Category | "));
        status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Add | "));
        status_spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Rows | "));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecospend::logging;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::EnvFilter;

    /// In-memory log sink standing in for stderr
    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Submit a below-minimum amount under a subscriber using `directives`
    /// and return whatever it logged.
    fn logs_for_rejected_submission(directives: &str) -> String {
        let capture = CaptureWriter::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(directives))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mut app = create_test_app();
        tracing::subscriber::with_default(subscriber, || {
            type_str(&mut app, "0.5");
            app.handle_key(key(KeyCode::Enter));
        });
        assert!(app.ledger.is_empty());
        assert!(matches!(app.form.message, Some(StatusMessage::Rejected(_))));

        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn create_test_app() -> App {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        App::with_date(ExpenseLedger::new(), today)
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_form_defaults() {
        let app = create_test_app();

        assert_eq!(app.form.date, "2024-01-01");
        assert_eq!(app.selected_category(), "飲食");
        assert_eq!(app.form.focus, Field::Amount);
        assert!(app.ledger.is_empty());
    }

    #[test]
    fn test_submit_appends_entry() {
        let mut app = create_test_app();
        type_str(&mut app, "1000");
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.ledger.len(), 1);
        assert!((app.ledger.grand_total() - 20.0).abs() < 1e-9);
        assert!(app.form.amount.is_empty());
        assert!(matches!(app.form.message, Some(StatusMessage::Added(_))));
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_below_minimum_is_rejected() {
        let mut app = create_test_app();
        type_str(&mut app, "0.5");
        app.handle_key(key(KeyCode::Enter));

        assert!(app.ledger.is_empty());
        assert_eq!(app.form.amount, "0.5");
        assert!(matches!(app.form.message, Some(StatusMessage::Rejected(_))));
    }

    #[test]
    fn test_category_cycling() {
        let mut app = create_test_app();
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.form.focus, Field::Category);

        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.selected_category(), "交通");
        app.handle_key(key(KeyCode::Left));
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.selected_category(), "娛樂");
    }

    #[test]
    fn test_edit_date_field() {
        let mut app = create_test_app();
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.form.focus, Field::Date);

        for _ in 0..2 {
            app.handle_key(key(KeyCode::Backspace));
        }
        type_str(&mut app, "02x");
        assert_eq!(app.form.date, "2024-01-02");

        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.form.focus, Field::Amount);
        type_str(&mut app, "200");
        app.handle_key(key(KeyCode::Enter));

        // 200 × 0.02 for the default category
        let daily = app.ledger.daily_totals();
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!((daily[0].carbon_kg - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_date_rejected() {
        let mut app = create_test_app();
        app.form.date = "2024-02-30".to_string();
        type_str(&mut app, "10");
        app.handle_key(key(KeyCode::Enter));

        assert!(app.ledger.is_empty());
        assert!(matches!(app.form.message, Some(StatusMessage::Rejected(_))));
    }

    #[test]
    fn test_page_navigation_and_quit() {
        let mut app = create_test_app();

        assert!(app.handle_key(key(KeyCode::Tab)));
        assert_eq!(app.current_page, Page::DailyTrend);
        // Form keys are ignored away from the ledger page
        type_str(&mut app, "5");
        assert!(app.form.amount.is_empty());

        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.current_page, Page::Ledger);
        assert!(!app.handle_key(key(KeyCode::Char('q'))));
        assert!(!app.handle_key(key(KeyCode::Esc)));
    }

    #[test]
    fn test_rejection_silent_at_tui_default_filter() {
        assert_eq!(logs_for_rejected_submission(logging::TUI_DEFAULT_FILTER), "");
    }

    #[test]
    fn test_rejection_logged_when_debugging() {
        let logs = logs_for_rejected_submission("debug");
        assert!(logs.contains("submission rejected"));
    }
}
