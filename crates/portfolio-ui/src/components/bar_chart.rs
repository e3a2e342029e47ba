use portfolio_core::formatting::{format_compact, format_month};
use portfolio_data::aggregator::{top_n, ClientSummary, MonthlySummary, ProductSummary};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::themes::Theme;

/// Labels longer than this are truncated with an ellipsis.
const MAX_LABEL_WIDTH: usize = 24;

/// Visual appearance of a bar chart.
#[derive(Debug, Clone, Copy)]
pub struct BarConfig {
    /// Width in terminal columns of the bar portion of each row.
    pub width: usize,
    pub filled_char: char,
    pub empty_char: char,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            width: 40,
            filled_char: '\u{2588}', // █  FULL BLOCK
            empty_char: '\u{2591}',  // ░  LIGHT SHADE
        }
    }
}

// ── BarChart ──────────────────────────────────────────────────────────────────

/// Horizontal bar chart of labelled revenue figures.
///
/// Bars are scaled against the largest positive value; zero and negative
/// values draw an empty bar. Every row ends with a compact value label
/// (`1.2k`, `3.4M`).
pub struct BarChart<'a> {
    pub title: String,
    pub items: Vec<(String, f64)>,
    pub config: BarConfig,
    pub theme: &'a Theme,
}

impl<'a> BarChart<'a> {
    pub fn new(title: impl Into<String>, items: Vec<(String, f64)>, theme: &'a Theme) -> Self {
        Self {
            title: title.into(),
            items,
            config: BarConfig::default(),
            theme,
        }
    }

    /// Top `n` clients by revenue. `clients` must already be ranked.
    pub fn clients(clients: &[ClientSummary], n: usize, theme: &'a Theme) -> Self {
        let items = top_n(clients, n)
            .iter()
            .map(|c| (c.client.clone(), c.revenue))
            .collect();
        Self::new(format!("Top {} clients by revenue", n), items, theme)
    }

    /// Top `n` products by revenue. `products` must already be ranked.
    pub fn products(products: &[ProductSummary], n: usize, theme: &'a Theme) -> Self {
        let items = top_n(products, n)
            .iter()
            .map(|p| (p.product.clone(), p.revenue))
            .collect();
        Self::new(format!("Top {} products by revenue", n), items, theme)
    }

    /// Every month in chronological order, the null month last.
    pub fn monthly(months: &[MonthlySummary], theme: &'a Theme) -> Self {
        let items = months
            .iter()
            .map(|m| (format_month(m.month), m.revenue))
            .collect();
        Self::new("Monthly revenue", items, theme)
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.config.width = width;
        self
    }

    /// Display width every label is padded to.
    pub fn label_width(&self) -> usize {
        self.items
            .iter()
            .map(|(label, _)| label.width())
            .max()
            .unwrap_or(0)
            .min(MAX_LABEL_WIDTH)
    }

    /// Number of filled cells for `value`.
    pub fn filled_cells(&self, value: f64) -> usize {
        let max = self
            .items
            .iter()
            .map(|(_, v)| *v)
            .fold(0.0_f64, f64::max);
        if max <= 0.0 || value <= 0.0 || !value.is_finite() {
            return 0;
        }
        let cells = ((value / max) * self.config.width as f64).round() as usize;
        cells.min(self.config.width)
    }

    /// Title line followed by one line per item, or a "No data" line.
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let t = self.theme;
        let mut lines = vec![Line::from(Span::styled(self.title.clone(), t.label))];
        if self.items.is_empty() {
            lines.push(Line::from(Span::styled("  No data", t.dim)));
            return lines;
        }

        let label_width = self.label_width();
        for (label, value) in &self.items {
            let filled = self.filled_cells(*value);
            let empty = self.config.width - filled;
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", fit_label(label, label_width)), t.bar_label),
                Span::styled(
                    std::iter::repeat_n(self.config.filled_char, filled).collect::<String>(),
                    t.bar_fill,
                ),
                Span::styled(
                    std::iter::repeat_n(self.config.empty_char, empty).collect::<String>(),
                    t.bar_empty,
                ),
                Span::styled(format!(" {}", format_compact(*value)), t.value),
            ]));
        }
        lines
    }
}

// ── Label fitting ─────────────────────────────────────────────────────────────

/// Pad or truncate `label` to exactly `width` display columns.
pub fn fit_label(label: &str, width: usize) -> String {
    let label_width = label.width();
    if label_width <= width {
        return format!("{}{}", label, " ".repeat(width - label_width));
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in label.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width - used));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn chart(theme: &Theme) -> BarChart<'_> {
        BarChart::new(
            "Revenue",
            vec![
                ("Acme".to_string(), 200.0),
                ("Globex".to_string(), 100.0),
                ("Initech".to_string(), 0.0),
            ],
            theme,
        )
        .with_width(10)
    }

    // ── Scaling ───────────────────────────────────────────────────────────────

    #[test]
    fn test_bars_scale_against_max() {
        let theme = Theme::dark();
        let c = chart(&theme);
        assert_eq!(c.filled_cells(200.0), 10);
        assert_eq!(c.filled_cells(100.0), 5);
        assert_eq!(c.filled_cells(0.0), 0);
        assert_eq!(c.filled_cells(-50.0), 0);
    }

    #[test]
    fn test_all_zero_values_draw_empty_bars() {
        let theme = Theme::dark();
        let c = BarChart::new("x", vec![("a".to_string(), 0.0)], &theme).with_width(10);
        let lines = c.to_lines();
        assert_eq!(lines[1].spans[1].content.chars().count(), 0);
        assert_eq!(lines[1].spans[2].content.chars().count(), 10);
    }

    #[test]
    fn test_row_layout() {
        let theme = Theme::dark();
        let lines = chart(&theme).to_lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(plain(&lines[0]), "Revenue");
        assert_eq!(lines[1].spans[1].content.chars().count(), 10);
        assert_eq!(lines[2].spans[1].content.chars().count(), 5);
        assert_eq!(lines[2].spans[2].content.chars().count(), 5);
        assert_eq!(plain(&lines[2]), "  Globex  █████░░░░░ 100");
    }

    #[test]
    fn test_empty_chart_says_no_data() {
        let theme = Theme::dark();
        let lines = BarChart::new("Revenue", vec![], &theme).to_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(plain(&lines[1]).trim(), "No data");
    }

    // ── Constructors ──────────────────────────────────────────────────────────

    #[test]
    fn test_clients_takes_top_n() {
        let theme = Theme::dark();
        let clients: Vec<ClientSummary> = (0..5)
            .map(|i| ClientSummary {
                client: format!("C{}", i),
                events: 1,
                revenue: 100.0 - i as f64,
                gross_profit: 0.0,
                commission: 0.0,
            })
            .collect();
        let c = BarChart::clients(&clients, 3, &theme);
        assert_eq!(c.items.len(), 3);
        assert_eq!(c.items[0].0, "C0");
        assert_eq!(c.title, "Top 3 clients by revenue");
    }

    #[test]
    fn test_monthly_labels_null_month() {
        let theme = Theme::dark();
        let months = vec![MonthlySummary {
            month: None,
            revenue: 5.0,
        }];
        let c = BarChart::monthly(&months, &theme);
        assert_eq!(c.items[0].0, "No billing date");
    }

    // ── Labels ────────────────────────────────────────────────────────────────

    #[test]
    fn test_fit_label_pads_and_truncates() {
        assert_eq!(fit_label("Acme", 6), "Acme  ");
        assert_eq!(fit_label("Acme Corporation", 6), "Acme …");
        assert_eq!(fit_label("São Paulo", 9), "São Paulo");
        assert_eq!(fit_label("abc", 0), "");
    }

    #[test]
    fn test_fit_label_wide_chars() {
        // CJK characters take two columns each.
        let fitted = fit_label("東京東京", 5);
        assert_eq!(fitted.width(), 5);
        assert!(fitted.starts_with("東京"));
    }

    #[test]
    fn test_label_width_is_capped() {
        let theme = Theme::dark();
        let c = BarChart::new("x", vec![("a".repeat(60), 1.0)], &theme);
        assert_eq!(c.label_width(), MAX_LABEL_WIDTH);
    }
}
