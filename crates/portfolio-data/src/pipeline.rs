//! Report pipeline for the portfolio report.
//!
//! Loads both tables, joins and enriches the sales, applies the optional
//! client filter and computes every aggregate view, returning a
//! [`PortfolioReport`] ready for the presentation layer.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use chrono::Local;
use portfolio_core::error::{ReportError, Result};
use portfolio_core::metrics::{CostFormula, MetricDeriver};
use portfolio_core::models::{EnrichedRecord, EventTable, SaleTable};
use portfolio_core::schema::ColumnNames;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::{
    Aggregator, ClientProductSummary, ClientSummary, Measure, MonthlySummary, ProductSummary,
};
use crate::filter::{filter_by_client, validate_client};
use crate::join::{FlatLayout, Joiner};
use crate::loader::{load_events, load_sales, LoadOptions};

// ── Public types ──────────────────────────────────────────────────────────────

/// Both loaded tables plus the column mapping they were read with.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub events: EventTable,
    pub sales: SaleTable,
    pub columns: ColumnNames,
}

/// Selections that shape one report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Restrict every view to this client.
    pub client: Option<String>,
    pub cost_formula: CostFormula,
}

/// Headline figures of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_revenue: f64,
    pub total_gross_profit: f64,
    pub total_commission: f64,
    /// Distinct events in the event table (for the selected client).
    pub event_count: usize,
    /// Distinct clients in the event table (1 when a client is selected).
    pub client_count: usize,
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    /// ISO-8601 timestamp when this report was generated.
    pub generated_at: String,
    pub client: Option<String>,
    pub cost_formula: CostFormula,
    pub event_rows: usize,
    pub sale_rows: usize,
    /// Rows in scope after the client filter.
    pub joined_rows: usize,
    /// Sales in scope whose event reference matched nothing.
    pub unmatched_sales: usize,
    /// Sales in scope without a billing date.
    pub null_billing_dates: usize,
    /// Wall-clock seconds spent joining and deriving metrics.
    pub join_time_seconds: f64,
    /// Wall-clock seconds spent filtering and aggregating.
    pub aggregate_time_seconds: f64,
}

/// The complete output of [`build_report`].
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub kpis: Kpis,
    /// Revenue descending.
    pub clients: Vec<ClientSummary>,
    /// Revenue descending.
    pub products: Vec<ProductSummary>,
    /// Chronological, trailing row for sales without a billing date.
    pub monthly: Vec<MonthlySummary>,
    pub metadata: ReportMetadata,
    /// Enriched rows in scope, in sale order.
    #[serde(skip)]
    pub rows: Vec<EnrichedRecord>,
}

impl PortfolioReport {
    /// `true` when no sale is in scope.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The client the report is restricted to, if any.
    pub fn client(&self) -> Option<&str> {
        self.metadata.client.as_deref()
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Load both tables. Nothing is computed unless both load.
pub fn load_inputs(
    events_path: &Path,
    sales_path: &Path,
    options: &LoadOptions,
) -> Result<ReportInputs> {
    let start = Instant::now();
    let events = load_events(events_path, options)?;
    let sales = load_sales(sales_path, options)?;
    debug!(
        "Loaded inputs in {:.3}s ({} events, {} sales)",
        start.elapsed().as_secs_f64(),
        events.len(),
        sales.len()
    );
    Ok(ReportInputs {
        events,
        sales,
        columns: options.columns.clone(),
    })
}

/// Join, enrich and derive metrics for every sale.
pub fn enrich(inputs: &ReportInputs, cost_formula: CostFormula) -> Result<Vec<EnrichedRecord>> {
    Joiner::enrich(
        &inputs.events,
        &inputs.sales,
        &MetricDeriver::new(cost_formula),
    )
}

/// Run the full pipeline.
///
/// 1. Validate the selected client against the event table.
/// 2. Join sales onto events and derive the metrics.
/// 3. Restrict the rows to the selected client.
/// 4. Compute the KPIs and the client, product and monthly views.
pub fn build_report(inputs: &ReportInputs, options: &ReportOptions) -> Result<PortfolioReport> {
    // ── Step 1: Selection ─────────────────────────────────────────────────────
    if let Some(client) = &options.client {
        validate_client(&inputs.events, client)?;
    }

    // ── Step 2: Join ──────────────────────────────────────────────────────────
    let join_start = Instant::now();
    let enriched = enrich(inputs, options.cost_formula)?;
    let join_time = join_start.elapsed().as_secs_f64();

    // ── Step 3: Filter ────────────────────────────────────────────────────────
    let aggregate_start = Instant::now();
    let rows = match &options.client {
        Some(client) => filter_by_client(&enriched, client),
        None => enriched,
    };

    // ── Step 4: Aggregates ────────────────────────────────────────────────────
    let kpis = compute_kpis(&inputs.events, &rows, options.client.as_deref());
    let clients = Aggregator::client_summary(&rows);
    let products = Aggregator::product_summary(&rows);
    let monthly = Aggregator::monthly_summary(&rows);
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    let metadata = ReportMetadata {
        generated_at: Local::now().to_rfc3339(),
        client: options.client.clone(),
        cost_formula: options.cost_formula,
        event_rows: inputs.events.len(),
        sale_rows: inputs.sales.len(),
        joined_rows: rows.len(),
        unmatched_sales: rows.iter().filter(|r| !r.is_matched()).count(),
        null_billing_dates: rows.iter().filter(|r| r.billing_month.is_none()).count(),
        join_time_seconds: join_time,
        aggregate_time_seconds: aggregate_time,
    };

    info!(
        "Report built: {} rows, {} clients, {} products, {} months{}",
        metadata.joined_rows,
        clients.len(),
        products.len(),
        monthly.len(),
        options
            .client
            .as_ref()
            .map(|c| format!(" (client {})", c))
            .unwrap_or_default()
    );

    Ok(PortfolioReport {
        kpis,
        clients,
        products,
        monthly,
        metadata,
        rows,
    })
}

/// Per (client, product) view of the whole portfolio.
pub fn client_product_breakdown(
    inputs: &ReportInputs,
    cost_formula: CostFormula,
) -> Result<Vec<ClientProductSummary>> {
    Ok(Aggregator::client_product_summary(&enrich(
        inputs,
        cost_formula,
    )?))
}

/// Write `rows` as a flattened CSV with derived columns.
pub fn write_enriched_csv(
    path: &Path,
    inputs: &ReportInputs,
    rows: &[EnrichedRecord],
) -> Result<()> {
    let export_err = |reason: String| ReportError::Export {
        path: path.to_path_buf(),
        reason,
    };

    let layout = FlatLayout::new(&inputs.columns, &inputs.events, &inputs.sales);
    let mut writer = csv::Writer::from_path(path).map_err(|e| export_err(e.to_string()))?;
    writer
        .write_record(layout.headers())
        .map_err(|e| export_err(e.to_string()))?;
    for row in rows {
        writer
            .write_record(layout.row(row))
            .map_err(|e| export_err(e.to_string()))?;
    }
    writer.flush()?;

    info!("Wrote {} enriched rows to {}", rows.len(), path.display());
    Ok(())
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Counts come from the event table; money comes from the enriched rows,
/// unmatched sales included.
fn compute_kpis(events: &EventTable, rows: &[EnrichedRecord], client: Option<&str>) -> Kpis {
    let scoped = events
        .records
        .iter()
        .filter(|e| client.is_none() || e.client.as_deref() == client);

    let mut event_ids: HashSet<&str> = HashSet::new();
    let mut clients: HashSet<&str> = HashSet::new();
    for event in scoped {
        if !event.id.is_empty() {
            event_ids.insert(event.id.as_str());
        }
        if let Some(c) = event.client.as_deref() {
            clients.insert(c);
        }
    }

    Kpis {
        total_revenue: Aggregator::total(rows, Measure::Revenue),
        total_gross_profit: Aggregator::total(rows, Measure::GrossProfit),
        total_commission: Aggregator::total(rows, Measure::Commission),
        event_count: event_ids.len(),
        client_count: clients.len(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
