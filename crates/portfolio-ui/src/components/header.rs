use ratatui::text::{Line, Span};

use portfolio_core::metrics::CostFormula;

use crate::themes::Theme;

/// Title printed at the top of every view and export.
pub const TITLE: &str = "CLIENT PORTFOLIO REPORT";

const SEPARATOR_WIDTH: usize = 60;

/// Scope label for a client selection.
pub fn scope_label(client: Option<&str>) -> String {
    client.unwrap_or("all clients").to_string()
}

/// Report header: title, separator, and a `[ scope | cost ]` line.
pub struct Header<'a> {
    pub scope: String,
    pub cost_formula: CostFormula,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(client: Option<&str>, cost_formula: CostFormula, theme: &'a Theme) -> Self {
        Self {
            scope: scope_label(client),
            cost_formula,
            theme,
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let t = self.theme;
        vec![
            Line::from(Span::styled(TITLE, t.header)),
            Line::from(Span::styled("=".repeat(SEPARATOR_WIDTH), t.separator)),
            Line::from(vec![
                Span::styled("[ ", t.dim),
                Span::styled(self.scope.clone(), t.info),
                Span::styled(" | ", t.dim),
                Span::styled(format!("cost: {}", self.cost_formula), t.info),
                Span::styled(" ]", t.dim),
            ]),
            Line::from(""),
        ]
    }
}
