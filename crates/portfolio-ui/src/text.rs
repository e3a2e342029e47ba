//! Plain-text rendering of the report views for stdout and text exports.
//!
//! The same components that feed the dashboard are flattened here with
//! their styles dropped, so the printed output and the terminal UI never
//! drift apart.

use ratatui::text::Line;
use unicode_width::UnicodeWidthStr;

use portfolio_data::pipeline::PortfolioReport;

use crate::app::ViewMode;
use crate::components::bar_chart::BarChart;
use crate::components::header::Header;
use crate::components::indicators::KpiPanel;
use crate::table_view::TableData;
use crate::themes::Theme;

/// Concatenate the span contents of `line`.
pub fn line_to_plain(line: &Line) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

/// Flatten `lines` to text, one line each, trailing spaces trimmed.
pub fn lines_to_plain(lines: &[Line]) -> Vec<String> {
    lines
        .iter()
        .map(|l| line_to_plain(l).trim_end().to_string())
        .collect()
}

/// Explanation shown when a report has no rows.
pub fn no_data_detail(report: &PortfolioReport) -> String {
    match report.client() {
        Some(client) => format!("No sales recorded for client {}", client),
        None => "No sales found in the input files".to_string(),
    }
}

/// Lay `data` out as aligned text columns, padded by display width.
pub fn format_table(data: &TableData) -> Vec<String> {
    let widths: Vec<usize> = data
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            data.rows
                .iter()
                .chain(data.total.iter())
                .filter_map(|row| row.get(i))
                .map(|cell| cell.width())
                .chain(std::iter::once(col.title.width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1));
    let mut out = vec![
        format_row(data.columns.iter().map(|c| c.title), data, &widths),
        rule.clone(),
    ];
    for row in &data.rows {
        out.push(format_row(row.iter().map(String::as_str), data, &widths));
    }
    if let Some(total) = &data.total {
        out.push(rule);
        out.push(format_row(total.iter().map(String::as_str), data, &widths));
    }
    out
}

fn format_row<'a>(
    cells: impl Iterator<Item = &'a str>,
    data: &TableData,
    widths: &[usize],
) -> String {
    cells
        .zip(&data.columns)
        .zip(widths)
        .map(|((cell, col), width)| {
            let pad = " ".repeat(width.saturating_sub(cell.width()));
            if col.numeric {
                format!("{}{}", pad, cell)
            } else {
                format!("{}{}", cell, pad)
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Render one view of `report` as text. `top` bounds the ranked charts.
pub fn render_view(report: &PortfolioReport, view: ViewMode, top: usize) -> String {
    let theme = Theme::classic();
    let mut out = lines_to_plain(
        &Header::new(report.client(), report.metadata.cost_formula, &theme).to_lines(),
    );

    if report.is_empty() {
        out.push("No data".to_string());
        out.push(no_data_detail(report));
        return out.join("\n") + "\n";
    }

    match view {
        ViewMode::Summary => {
            out.extend(lines_to_plain(&KpiPanel::new(&report.kpis, &theme).to_lines()));
            out.push(String::new());
            let ranking = match report.client() {
                None => BarChart::clients(&report.clients, top, &theme),
                Some(_) => BarChart::products(&report.products, top, &theme),
            };
            out.extend(lines_to_plain(&ranking.to_lines()));
            out.push(String::new());
            out.extend(lines_to_plain(
                &BarChart::monthly(&report.monthly, &theme).to_lines(),
            ));
        }
        ViewMode::Clients => {
            out.extend(format_table(&TableData::clients(&report.clients)));
            out.push(String::new());
            out.extend(lines_to_plain(
                &BarChart::clients(&report.clients, top, &theme).to_lines(),
            ));
        }
        ViewMode::Products => {
            out.extend(format_table(&TableData::products(&report.products)));
            out.push(String::new());
            out.extend(lines_to_plain(
                &BarChart::products(&report.products, top, &theme).to_lines(),
            ));
        }
        ViewMode::Monthly => {
            out.extend(format_table(&TableData::monthly(&report.monthly)));
            out.push(String::new());
            out.extend(lines_to_plain(
                &BarChart::monthly(&report.monthly, &theme).to_lines(),
            ));
        }
    }
    out.join("\n") + "\n"
}
