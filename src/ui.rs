use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use donation_trace::{DonationMatch, MatchReport, Transaction, TransactionType};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Matches,
    Ledger,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Matches => Page::Ledger,
            Page::Ledger => Page::Matches,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Matches => "Matches",
            Page::Ledger => "Ledger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    All,
    /// Matches that occurred more than once (scaled amounts)
    Repeated,
}

pub struct App {
    pub report: MatchReport,
    pub transactions: Vec<Transaction>,
    pub visible_matches: Vec<DonationMatch>,
    pub state: TableState,
    pub ledger_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub filter: FilterType,
}

impl App {
    pub fn new(report: MatchReport, transactions: Vec<Transaction>) -> Self {
        let mut state = TableState::default();
        if !report.matches.is_empty() {
            state.select(Some(0));
        }

        let mut ledger_state = TableState::default();
        if !transactions.is_empty() {
            ledger_state.select(Some(0));
        }

        let visible_matches = report.matches.clone();

        Self {
            report,
            transactions,
            visible_matches,
            state,
            ledger_state,
            current_page: Page::Matches,
            show_detail: false,
            filter: FilterType::All,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn selected_match(&self) -> Option<&DonationMatch> {
        self.state.selected().and_then(|i| self.visible_matches.get(i))
    }

    pub fn apply_filter(&mut self, filter: FilterType) {
        self.filter = filter;
        self.visible_matches = match filter {
            FilterType::All => self.report.matches.clone(),
            FilterType::Repeated => self
                .report
                .matches
                .iter()
                .filter(|m| m.occurrences > 1)
                .cloned()
                .collect(),
        };

        let selection = if self.visible_matches.is_empty() { None } else { Some(0) };
        self.state.select(selection);
    }

    pub fn toggle_filter(&mut self) {
        let next = match self.filter {
            FilterType::All => FilterType::Repeated,
            FilterType::Repeated => FilterType::All,
        };
        self.apply_filter(next);
    }

    fn active_len(&self) -> usize {
        match self.current_page {
            Page::Matches => self.visible_matches.len(),
            Page::Ledger => self.transactions.len(),
        }
    }

    fn active_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Matches => &mut self.state,
            Page::Ledger => &mut self.ledger_state,
        }
    }

    fn move_selection(&mut self, step: impl Fn(usize, usize) -> usize) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(i) => step(i, len),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn next(&mut self) {
        self.move_selection(|i, len| if i >= len - 1 { 0 } else { i + 1 });
    }

    pub fn previous(&mut self) {
        self.move_selection(|i, len| if i == 0 { len - 1 } else { i - 1 });
    }

    pub fn page_down(&mut self) {
        self.move_selection(|i, len| (i + PAGE_SIZE).min(len - 1));
    }

    pub fn page_up(&mut self) {
        self.move_selection(|i, _| i.saturating_sub(PAGE_SIZE));
    }

    pub fn first(&mut self) {
        self.move_selection(|_, _| 0);
    }

    pub fn last(&mut self) {
        self.move_selection(|_, len| len - 1);
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

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => app.next_page(),
                KeyCode::Char('f') => app.toggle_filter(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Matches if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);

            render_matches(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::Matches => render_matches(f, chunks[1], app),
        Page::Ledger => render_ledger(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];
    for (i, page) in [Page::Matches, Page::Ledger].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    let window = &app.report.window;
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!(
            "{} → {} (+{}d)",
            window.start_date, window.end_date, window.extension_days
        ),
        Style::default().fg(Color::White),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("↓ {}", app.report.deposit_count),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("↑ {}", app.report.withdrawal_count),
        Style::default().fg(Color::Red),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Flagged: Rs. {}", app.report.total_flagged),
        Style::default().fg(Color::Magenta),
    ));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_matches(f: &mut Frame, area: Rect, app: &mut App) {
    let header = header_row(&["Depositor", "Deposited", "Recipient", "Withdrew", "Amount", "×"]);

    let rows = app.visible_matches.iter().map(|m| {
        let color = if m.occurrences > 1 { Color::Magenta } else { Color::White };
        Row::new(vec![
            Cell::from(truncate(&m.key.deposit_party, 24)),
            Cell::from(m.key.deposit_date.to_string()),
            Cell::from(truncate(&m.key.withdrawal_party, 24)),
            Cell::from(m.key.withdrawal_date.to_string()),
            Cell::from(format!("{}", m.donated_amount)).style(Style::default().fg(Color::Green)),
            Cell::from(m.occurrences.to_string()).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let title = match app.filter {
        FilterType::All => format!(" Matches ({}) ", app.visible_matches.len()),
        FilterType::Repeated => format!(" Repeated matches ({}) ", app.visible_matches.len()),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(12),
            Constraint::Length(26),
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Length(4),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_ledger(f: &mut Frame, area: Rect, app: &mut App) {
    let header = header_row(&["Line", "Date", "Party", "Amount", "Type"]);

    let rows = app.transactions.iter().map(|tx| {
        let color = match tx.transaction_type {
            TransactionType::Deposit => Color::Green,
            TransactionType::Withdrawal => Color::Red,
        };
        let in_window = app.report.window.contains(tx.date);
        let row_style = if in_window {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };

        Row::new(vec![
            Cell::from(tx.line_number.to_string()),
            Cell::from(tx.date.to_string()),
            Cell::from(truncate(&tx.party, 30)),
            Cell::from(format!("{}", tx.amount)).style(Style::default().fg(color)),
            Cell::from(tx.transaction_type.tag()).style(Style::default().fg(color)),
        ])
        .style(row_style)
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(32),
            Constraint::Length(14),
            Constraint::Length(11),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Ledger ({} rows, dimmed = outside window) ", app.transactions.len())),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.ledger_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = match app.current_page {
        Page::Matches => app.state.selected(),
        Page::Ledger => app.ledger_state.selected(),
    };
    let selected = selected.map(|i| i + 1).unwrap_or(0);

    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, app.active_len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        key("Enter"),
        Span::raw(" Details | "),
        key("Tab"),
        Span::raw(" Page | "),
        key("f"),
        Span::raw(" Repeated only | "),
        key("↑/↓"),
        Span::raw(" Nav | "),
        key("PgUp/PgDn"),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Match Details ");

    let Some(m) = app.selected_match() else {
        f.render_widget(Paragraph::new("No match selected").block(block), area);
        return;
    };

    let label = |text: &'static str| {
        Span::styled(text, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    };
    let section = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ))
    };

    let content = vec![
        Line::from(""),
        Line::from(vec![label("  Depositor: "), Span::raw(m.key.deposit_party.clone())]),
        Line::from(vec![label("  Deposited on: "), Span::raw(m.key.deposit_date.to_string())]),
        Line::from(""),
        Line::from(vec![label("  Recipient: "), Span::raw(m.key.withdrawal_party.clone())]),
        Line::from(vec![label("  Withdrew on: "), Span::raw(m.key.withdrawal_date.to_string())]),
        Line::from(""),
        Line::from(vec![label("  Unit amount: "), Span::raw(format!("Rs. {}", m.key.amount))]),
        Line::from(vec![label("  Occurrences: "), Span::raw(m.occurrences.to_string())]),
        Line::from(vec![
            label("  Donated: "),
            Span::styled(format!("Rs. {}", m.donated_amount), Style::default().fg(Color::Green)),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        section("  SUMMARY"),
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", m.summary()),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
        section("  FINGERPRINT"),
        Line::from(Span::styled(format!("  {}", m.fingerprint()), Style::default().fg(Color::Green))),
        Line::from(""),
        Line::from(Span::styled(
            "  Press Enter to close",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let detail_panel = Paragraph::new(content).block(block).wrap(Wrap { trim: false });
    f.render_widget(detail_panel, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
