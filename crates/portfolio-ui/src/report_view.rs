//! Overview screen of the dashboard: KPIs, the revenue ranking in scope and
//! the monthly revenue series, drawn as one [`Paragraph`].

use ratatui::{
    layout::Rect,
    text::{Line, Span, Text},
    widgets::Paragraph,
    Frame,
};

use portfolio_data::pipeline::PortfolioReport;

use crate::components::bar_chart::BarChart;
use crate::components::indicators::KpiPanel;
use crate::themes::Theme;

/// Columns a chart row needs besides its bar: indent, label gap, value.
const CHART_CHROME: usize = 14;

/// Bar width that fits a chart with `label_width` into `area_width` columns.
pub fn chart_width(label_width: usize, area_width: u16) -> usize {
    (area_width as usize)
        .saturating_sub(label_width + CHART_CHROME)
        .clamp(10, 60)
}

fn fitted<'a>(chart: BarChart<'a>, area_width: u16) -> BarChart<'a> {
    let width = chart_width(chart.label_width(), area_width);
    chart.with_width(width)
}

/// Build the overview lines (extracted for testability).
pub fn build_overview_lines<'a>(
    report: &'a PortfolioReport,
    top: usize,
    area_width: u16,
    theme: &'a Theme,
) -> Vec<Line<'a>> {
    let mut lines: Vec<Line<'a>> = Vec::with_capacity(top * 2 + 24);

    // ── KPIs ──────────────────────────────────────────────────────────────────
    lines.extend(KpiPanel::new(&report.kpis, theme).to_lines());
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "─".repeat((area_width as usize).min(78)),
        theme.separator,
    )));

    // ── Ranking ───────────────────────────────────────────────────────────────
    let ranking = match report.client() {
        None => BarChart::clients(&report.clients, top, theme),
        Some(_) => BarChart::products(&report.products, top, theme),
    };
    lines.extend(fitted(ranking, area_width).to_lines());
    lines.push(Line::from(""));

    // ── Monthly ───────────────────────────────────────────────────────────────
    lines.extend(fitted(BarChart::monthly(&report.monthly, theme), area_width).to_lines());

    lines
}

pub fn render_overview(
    frame: &mut Frame,
    area: Rect,
    report: &PortfolioReport,
    top: usize,
    theme: &Theme,
) {
    let lines = build_overview_lines(report, top, area.width, theme);
    frame.render_widget(Paragraph::new(Text::from(lines)), area);
}
