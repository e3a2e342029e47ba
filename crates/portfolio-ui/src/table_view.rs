//! Aggregate table views (clients / products / months).
//!
//! Each aggregate is first turned into a [`TableData`] of formatted cells,
//! which the dashboard renders as a bordered [`ratatui::widgets::Table`]
//! and the text output prints as aligned columns.

use ratatui::{
    layout::{Alignment, Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use portfolio_core::formatting::{self, format_currency, format_month};
use portfolio_data::aggregator::{ClientSummary, MonthlySummary, ProductSummary};

use crate::themes::Theme;

/// One column of a [`TableData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub title: &'static str,
    /// Width in terminal columns.
    pub width: u16,
    /// Numeric columns are right-aligned.
    pub numeric: bool,
}

const fn text_column(title: &'static str, width: u16) -> ColumnSpec {
    ColumnSpec {
        title,
        width,
        numeric: false,
    }
}

const fn numeric_column(title: &'static str, width: u16) -> ColumnSpec {
    ColumnSpec {
        title,
        width,
        numeric: true,
    }
}

/// Formatted cells of an aggregate table plus an optional totals row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<String>>,
    pub total: Option<Vec<String>>,
}

impl TableData {
    /// Per-client table, in the order given.
    pub fn clients(clients: &[ClientSummary]) -> Self {
        let rows = clients
            .iter()
            .map(|c| {
                vec![
                    c.client.clone(),
                    count(c.events),
                    format_currency(c.revenue),
                    format_currency(c.gross_profit),
                    format_currency(c.commission),
                ]
            })
            .collect();
        let total = vec![
            "TOTAL".to_string(),
            count(clients.iter().map(|c| c.events).sum()),
            format_currency(clients.iter().map(|c| c.revenue).sum()),
            format_currency(clients.iter().map(|c| c.gross_profit).sum()),
            format_currency(clients.iter().map(|c| c.commission).sum()),
        ];
        Self {
            columns: vec![
                text_column("Client", 28),
                numeric_column("Events", 8),
                numeric_column("Revenue", 18),
                numeric_column("Gross profit", 18),
                numeric_column("Commission", 16),
            ],
            rows,
            total: Some(total),
        }
    }

    /// Per-product table, in the order given.
    pub fn products(products: &[ProductSummary]) -> Self {
        let rows = products
            .iter()
            .map(|p| vec![p.product.clone(), count(p.sales), format_currency(p.revenue)])
            .collect();
        let total = vec![
            "TOTAL".to_string(),
            count(products.iter().map(|p| p.sales).sum()),
            format_currency(products.iter().map(|p| p.revenue).sum()),
        ];
        Self {
            columns: vec![
                text_column("Product", 28),
                numeric_column("Sales", 8),
                numeric_column("Revenue", 18),
            ],
            rows,
            total: Some(total),
        }
    }

    /// Per-month table with each month's share of the listed revenue.
    pub fn monthly(months: &[MonthlySummary]) -> Self {
        let total_revenue: f64 = months.iter().map(|m| m.revenue).sum();
        let rows = months
            .iter()
            .map(|m| {
                vec![
                    format_month(m.month),
                    format_currency(m.revenue),
                    format!(
                        "{:.1}%",
                        formatting::percentage(m.revenue, total_revenue, 1)
                    ),
                ]
            })
            .collect();
        let total = vec![
            "TOTAL".to_string(),
            format_currency(total_revenue),
            format!("{} months", months.len()),
        ];
        Self {
            columns: vec![
                text_column("Billing month", 16),
                numeric_column("Revenue", 18),
                numeric_column("Share", 10),
            ],
            rows,
            total: Some(total),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn count(n: usize) -> String {
    formatting::format_number(n as f64, 0)
}

fn aligned(value: &str, spec: &ColumnSpec) -> Cell<'static> {
    let line = Line::from(value.to_string());
    if spec.numeric {
        Cell::from(line.alignment(Alignment::Right))
    } else {
        Cell::from(line)
    }
}

/// Render `data` into `area` as a bordered table titled `title`.
///
/// Data rows alternate styles; the totals row is drawn in the value style.
pub fn render_table_view(frame: &mut Frame, area: Rect, title: &str, data: &TableData, theme: &Theme) {
    let header_cells = data
        .columns
        .iter()
        .map(|c| aligned(c.title, c).style(theme.table_header));
    let header = Row::new(header_cells).height(1);

    let mut all_rows: Vec<Row> = data
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            Row::new(
                row.iter()
                    .zip(&data.columns)
                    .map(|(value, spec)| aligned(value, spec)),
            )
            .style(theme.row_style(i))
        })
        .collect();

    if let Some(total) = &data.total {
        all_rows.push(
            Row::new(
                total
                    .iter()
                    .zip(&data.columns)
                    .map(|(value, spec)| aligned(value, spec)),
            )
            .style(theme.value),
        );
    }

    let widths: Vec<Constraint> = data
        .columns
        .iter()
        .map(|c| Constraint::Length(c.width))
        .collect();

    let table = Table::new(all_rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", title)),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Render a "no data" placeholder explaining why nothing is shown.
pub fn render_no_data(frame: &mut Frame, area: Rect, detail: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No data", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(detail.to_string(), theme.dim)),
        Line::from(Span::styled(
            "Press 'c' to change client, 'q' or Ctrl+C to exit",
            theme.dim,
        )),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Portfolio Report "),
        ),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
