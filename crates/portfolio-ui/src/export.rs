//! Exportable summary document.
//!
//! A [`SummaryDocument`] is an explicit snapshot of everything the export
//! shows: KPIs, a top-5 revenue ranking and optional chart images.
//! [`render_document`] lays it out into fixed-height pages without touching
//! the pipeline; the writers only serialise the result.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use portfolio_core::error::{ReportError, Result};
use portfolio_core::formatting::format_currency;
use portfolio_core::metrics::CostFormula;
use portfolio_data::aggregator::top_n;
use portfolio_data::pipeline::{Kpis, PortfolioReport, ReportMetadata};

use crate::components::header::{scope_label, TITLE};
use crate::components::indicators::KpiPanel;
use crate::text::lines_to_plain;
use crate::themes::Theme;

/// Entries in the exported ranking.
pub const RANKING_SIZE: usize = 5;

/// Lines reserved on the page for each embedded chart.
pub const CHART_HEIGHT: usize = 20;

/// Page separator in text exports (form feed).
pub const PAGE_BREAK: char = '\x0c';

// ── Document model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingKind {
    Clients,
    Products,
}

impl RankingKind {
    pub fn title(&self) -> String {
        let subject = match self {
            RankingKind::Clients => "clients",
            RankingKind::Products => "products",
        };
        format!("Top {} {} by revenue", RANKING_SIZE, subject)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub label: String,
    pub revenue: f64,
}

/// A chart image embedded by reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartImage {
    pub path: PathBuf,
    pub caption: String,
    /// Lines reserved for the image on the page.
    pub height: usize,
}

impl ChartImage {
    /// Chart captioned with the file stem.
    pub fn from_path(path: PathBuf) -> Self {
        let caption = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            caption,
            height: CHART_HEIGHT,
        }
    }
}

/// Everything an export shows.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryDocument {
    pub title: String,
    pub generated_at: String,
    pub scope: String,
    pub cost_formula: CostFormula,
    pub kpis: Kpis,
    pub ranking_kind: RankingKind,
    pub ranking: Vec<RankedEntry>,
    pub charts: Vec<ChartImage>,
    pub metadata: ReportMetadata,
}

impl SummaryDocument {
    /// Snapshot `report`. The ranking is clients portfolio-wide and products
    /// when the report is restricted to one client.
    pub fn from_report(report: &PortfolioReport, charts: Vec<ChartImage>) -> Self {
        let (ranking_kind, ranked): (RankingKind, Vec<(String, f64)>) = match report.client() {
            None => (
                RankingKind::Clients,
                top_n(&report.clients, RANKING_SIZE)
                    .iter()
                    .map(|c| (c.client.clone(), c.revenue))
                    .collect(),
            ),
            Some(_) => (
                RankingKind::Products,
                top_n(&report.products, RANKING_SIZE)
                    .iter()
                    .map(|p| (p.product.clone(), p.revenue))
                    .collect(),
            ),
        };

        Self {
            title: TITLE.to_string(),
            generated_at: report.metadata.generated_at.clone(),
            scope: scope_label(report.client()),
            cost_formula: report.metadata.cost_formula,
            kpis: report.kpis.clone(),
            ranking_kind,
            ranking: ranked
                .into_iter()
                .enumerate()
                .map(|(i, (label, revenue))| RankedEntry {
                    rank: i + 1,
                    label,
                    revenue,
                })
                .collect(),
            charts,
            metadata: report.metadata.clone(),
        }
    }
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// Page geometry, in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLayout {
    pub page_height: usize,
    /// A new page starts once fewer lines than this remain.
    pub bottom_margin: usize,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self {
            page_height: 60,
            bottom_margin: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub lines: Vec<String>,
}

/// Lines that must stay on the same page.
type Block = Vec<String>;

fn document_blocks(doc: &SummaryDocument) -> Vec<Block> {
    let mut blocks = vec![vec![
        doc.title.clone(),
        "=".repeat(60),
        format!("Scope: {} | cost: {}", doc.scope, doc.cost_formula),
        format!("Generated: {}", doc.generated_at),
        String::new(),
    ]];

    blocks.push(vec!["Key figures".to_string()]);
    let theme = Theme::classic();
    for line in lines_to_plain(&KpiPanel::new(&doc.kpis, &theme).to_lines()) {
        blocks.push(vec![format!("  {}", line)]);
    }
    blocks.push(vec![String::new(), doc.ranking_kind.title()]);

    if doc.ranking.is_empty() {
        blocks.push(vec!["  No data".to_string()]);
    }
    for entry in &doc.ranking {
        blocks.push(vec![format!(
            "  {}. {}  {}",
            entry.rank,
            entry.label,
            format_currency(entry.revenue)
        )]);
    }

    for chart in &doc.charts {
        let mut block = vec![
            String::new(),
            format!("Chart: {}", chart.caption),
            format!("  image: {}", chart.path.display()),
        ];
        block.resize(block.len().max(chart.height), String::new());
        blocks.push(block);
    }
    blocks
}

/// Lay `doc` out into pages.
///
/// Before each block, a new page starts when the space left on the current
/// page falls below the bottom margin or cannot hold the block. A block taller
/// than a page gets a page of its own.
pub fn render_document(doc: &SummaryDocument, layout: &DocumentLayout) -> Vec<Page> {
    let mut pages = vec![Page {
        number: 1,
        lines: Vec::new(),
    }];

    for block in document_blocks(doc) {
        let used = pages.last().map(|p| p.lines.len()).unwrap_or(0);
        let remaining = layout.page_height.saturating_sub(used);
        if used > 0 && (remaining < layout.bottom_margin || remaining < block.len()) {
            pages.push(Page {
                number: pages.len() + 1,
                lines: Vec::new(),
            });
        }
        if let Some(page) = pages.last_mut() {
            page.lines.extend(block);
        }
    }
    pages
}

// ── Writers ───────────────────────────────────────────────────────────────────

/// Output format of [`export_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
}

impl ExportFormat {
    /// `"json"` selects JSON; anything else is text.
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => ExportFormat::Json,
            _ => ExportFormat::Text,
        }
    }
}

/// Pages joined by form feeds.
pub fn pages_to_text(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|p| p.lines.join("\n") + "\n")
        .collect::<Vec<_>>()
        .join(&PAGE_BREAK.to_string())
}

pub fn write_text(path: &Path, doc: &SummaryDocument, layout: &DocumentLayout) -> Result<()> {
    let pages = render_document(doc, layout);
    fs::write(path, pages_to_text(&pages)).map_err(|e| ReportError::Export {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    info!("Exported {} page(s) to {}", pages.len(), path.display());
    Ok(())
}

pub fn write_json(path: &Path, doc: &SummaryDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    fs::write(path, json).map_err(|e| ReportError::Export {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    info!("Exported summary document to {}", path.display());
    Ok(())
}

/// Write `doc` to `path` in `format`.
pub fn export_document(
    path: &Path,
    format: ExportFormat,
    doc: &SummaryDocument,
    layout: &DocumentLayout,
) -> Result<()> {
    match format {
        ExportFormat::Text => write_text(path, doc, layout),
        ExportFormat::Json => write_json(path, doc),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
