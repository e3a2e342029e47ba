//! Main application state and TUI event loop for the portfolio dashboard.
//!
//! [`App`] owns the theme, the active tab and the export target. The report
//! itself lives in a [`ReportSession`] passed into the loop, which recomputes
//! it whenever the client selection or the cost formula changes.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Paragraph, Tabs},
    Frame, Terminal,
};

use portfolio_core::error::Result;
use portfolio_core::metrics::CostFormula;
use portfolio_data::pipeline::PortfolioReport;
use portfolio_runtime::session::ReportSession;

use crate::components::bar_chart::BarChart;
use crate::components::header::Header;
use crate::export::{export_document, ChartImage, DocumentLayout, ExportFormat, SummaryDocument};
use crate::report_view::{self, chart_width};
use crate::table_view::{self, TableData};
use crate::text::no_data_detail;
use crate::themes::Theme;

// ── ViewMode ──────────────────────────────────────────────────────────────────

/// Which view is rendered, as a dashboard tab or a printed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// KPIs plus ranking and monthly charts.
    Summary,
    Clients,
    Products,
    Monthly,
}

impl ViewMode {
    /// Tab order.
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Summary,
        ViewMode::Clients,
        ViewMode::Products,
        ViewMode::Monthly,
    ];

    /// Parse a `--view` value. `"dashboard"` is not a view.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "summary" => Some(ViewMode::Summary),
            "clients" => Some(ViewMode::Clients),
            "products" => Some(ViewMode::Products),
            "monthly" => Some(ViewMode::Monthly),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewMode::Summary => "Overview",
            ViewMode::Clients => "Clients",
            ViewMode::Products => "Products",
            ViewMode::Monthly => "Monthly",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|v| *v == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

// ── ExportTarget ──────────────────────────────────────────────────────────────

/// Where the `e` key writes the summary document.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub charts: Vec<PathBuf>,
    pub layout: DocumentLayout,
}

impl ExportTarget {
    pub fn new(path: PathBuf, format: ExportFormat, charts: Vec<PathBuf>) -> Self {
        Self {
            path,
            format,
            charts,
            layout: DocumentLayout::default(),
        }
    }

    /// Write the summary document for `report`.
    pub fn write(&self, report: &PortfolioReport) -> Result<()> {
        let charts = self
            .charts
            .iter()
            .cloned()
            .map(ChartImage::from_path)
            .collect();
        let doc = SummaryDocument::from_report(report, charts);
        export_document(&self.path, self.format, &doc, &self.layout)
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the dashboard.
pub struct App {
    pub theme: Theme,
    pub view_mode: ViewMode,
    /// Rows shown in the ranking charts.
    pub top: usize,
    pub export: ExportTarget,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
    /// Outcome of the last action, shown in the footer.
    pub status: Option<String>,
}

impl App {
    pub fn new(theme_name: &str, view_mode: ViewMode, top: usize, export: ExportTarget) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            view_mode,
            top,
            export,
            should_quit: false,
            status: None,
        }
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the dashboard until `q`, `Q` or `Ctrl+C`.
    ///
    /// Input is polled synchronously with a 250 ms timeout; every key that
    /// changes the selection triggers a recomputation through the session.
    pub fn run(mut self, session: &mut ReportSession) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            let report = match session.report() {
                Ok(report) => report,
                Err(e) => break Err(io::Error::other(e.to_string())),
            };
            if let Err(e) = terminal.draw(|frame| self.render(frame, report)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key, session);
                    }
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent, session: &mut ReportSession) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right => self.view_mode = self.view_mode.next(),
            KeyCode::BackTab | KeyCode::Left => self.view_mode = self.view_mode.prev(),
            KeyCode::Char(d @ '1'..='4') => {
                let index = d as usize - '1' as usize;
                self.view_mode = ViewMode::ALL[index];
            }
            KeyCode::Char('c') => {
                session.cycle_client(true);
                self.status = None;
            }
            KeyCode::Char('C') => {
                session.cycle_client(false);
                self.status = None;
            }
            KeyCode::Char('f') => {
                let next = match session.cost_formula() {
                    CostFormula::Supplier => CostFormula::SupplierPlusTaxes,
                    CostFormula::SupplierPlusTaxes => CostFormula::Supplier,
                };
                session.set_cost_formula(next);
                self.status = Some(format!("Cost formula: {}", next));
            }
            KeyCode::Char('e') => self.export_current(session),
            _ => {}
        }
    }

    fn export_current(&mut self, session: &mut ReportSession) {
        let outcome = session
            .report()
            .and_then(|report| self.export.write(report));
        self.status = Some(match outcome {
            Ok(()) => format!("Exported to {}", self.export.path.display()),
            Err(e) => {
                tracing::warn!(error = %e, "Export failed");
                format!("Export failed: {}", e)
            }
        });
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render `report` into `frame`.
    pub fn render(&self, frame: &mut Frame, report: &PortfolioReport) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let header = Header::new(report.client(), report.metadata.cost_formula, &self.theme);
        frame.render_widget(Paragraph::new(Text::from(header.to_lines())), chunks[0]);

        let tabs = Tabs::new(
            ViewMode::ALL
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{} {}", i + 1, v.title())),
        )
        .select(self.view_mode.index())
        .style(self.theme.tab_inactive)
        .highlight_style(self.theme.tab_active)
        .divider("|");
        frame.render_widget(tabs, chunks[1]);

        self.render_body(frame, chunks[2], report);

        let footer = match &self.status {
            Some(msg) => Line::from(Span::styled(msg.clone(), self.theme.info)),
            None => Line::from(Span::styled(
                "Tab: view  c/C: client  f: cost formula  e: export  q: quit",
                self.theme.dim,
            )),
        };
        frame.render_widget(Paragraph::new(footer), chunks[3]);
    }

    fn render_body(&self, frame: &mut Frame, area: Rect, report: &PortfolioReport) {
        if report.is_empty() {
            table_view::render_no_data(frame, area, &no_data_detail(report), &self.theme);
            return;
        }

        let (title, data, chart) = match self.view_mode {
            ViewMode::Summary => {
                report_view::render_overview(frame, area, report, self.top, &self.theme);
                return;
            }
            ViewMode::Clients => (
                "Clients",
                TableData::clients(&report.clients),
                BarChart::clients(&report.clients, self.top, &self.theme),
            ),
            ViewMode::Products => (
                "Products",
                TableData::products(&report.products),
                BarChart::products(&report.products, self.top, &self.theme),
            ),
            ViewMode::Monthly => (
                "Revenue by billing month",
                TableData::monthly(&report.monthly),
                BarChart::monthly(&report.monthly, &self.theme),
            ),
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);
        table_view::render_table_view(frame, chunks[0], title, &data, &self.theme);

        let width = chart_width(chart.label_width(), chunks[1].width);
        let chart = chart.with_width(width);
        frame.render_widget(Paragraph::new(Text::from(chart.to_lines())), chunks[1]);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
