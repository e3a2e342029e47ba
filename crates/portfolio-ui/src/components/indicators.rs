use portfolio_core::formatting::{format_currency, format_number, percentage};
use portfolio_data::pipeline::Kpis;
use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::themes::Theme;

/// Width the KPI labels are padded to so the values line up.
const LABEL_WIDTH: usize = 20;

// ── KpiIndicator ──────────────────────────────────────────────────────────────

/// One `label: value` row of the KPI block.
pub struct KpiIndicator<'a> {
    pub label: &'static str,
    pub value: String,
    pub value_style: Style,
    /// Dimmed text appended after the value.
    pub note: Option<String>,
    pub theme: &'a Theme,
}

impl<'a> KpiIndicator<'a> {
    pub fn new(label: &'static str, value: String, theme: &'a Theme) -> Self {
        Self {
            label,
            value,
            value_style: theme.value,
            note: None,
            theme,
        }
    }

    pub fn styled(mut self, style: Style) -> Self {
        self.value_style = style;
        self
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }

    /// Format: `"Total revenue:      R$ 1,234.56"`
    pub fn to_line(&self) -> Line<'a> {
        let mut spans = vec![
            Span::styled(
                format!("{:<width$}", format!("{}:", self.label), width = LABEL_WIDTH),
                self.theme.label,
            ),
            Span::styled(self.value.clone(), self.value_style),
        ];
        if let Some(note) = &self.note {
            spans.push(Span::styled(format!("  ({})", note), self.theme.dim));
        }
        Line::from(spans)
    }
}

// ── KpiPanel ──────────────────────────────────────────────────────────────────

/// The five headline figures of a report.
///
/// Gross profit is coloured by sign and annotated with its margin over
/// revenue.
pub struct KpiPanel<'a> {
    pub kpis: &'a Kpis,
    pub theme: &'a Theme,
}

impl<'a> KpiPanel<'a> {
    pub fn new(kpis: &'a Kpis, theme: &'a Theme) -> Self {
        Self { kpis, theme }
    }

    /// Profit as a percentage of revenue, one decimal.
    pub fn margin(&self) -> f64 {
        percentage(self.kpis.total_gross_profit, self.kpis.total_revenue, 1)
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let k = self.kpis;
        let t = self.theme;
        vec![
            KpiIndicator::new("Total revenue", format_currency(k.total_revenue), t).to_line(),
            KpiIndicator::new("Gross profit", format_currency(k.total_gross_profit), t)
                .styled(t.profit_style(k.total_gross_profit))
                .with_note(format!("{:.1}% margin", self.margin()))
                .to_line(),
            KpiIndicator::new("Total commission", format_currency(k.total_commission), t)
                .to_line(),
            KpiIndicator::new("Events", format_number(k.event_count as f64, 0), t).to_line(),
            KpiIndicator::new("Active clients", format_number(k.client_count as f64, 0), t)
                .to_line(),
        ]
    }
}
