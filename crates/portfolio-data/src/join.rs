//! Left join of sales onto events and the flattened column view of its output.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDateTime, Timelike};
use portfolio_core::error::{ReportError, Result};
use portfolio_core::metrics::{billing_month, MetricDeriver};
use portfolio_core::models::{
    EnrichedRecord, EventRecord, EventTable, ExtraCells, SaleRecord, SaleTable,
};
use portfolio_core::schema::{ColumnNames, TableKind};
use tracing::debug;

// ── Joiner ────────────────────────────────────────────────────────────────────

/// Joins the sale table onto the event table by event identifier.
pub struct Joiner;

impl Joiner {
    /// Build the event lookup, rejecting identifiers that appear twice.
    ///
    /// Rows with a blank identifier can never be matched and are left out.
    pub fn index_events(events: &EventTable) -> Result<HashMap<&str, &EventRecord>> {
        let mut index: HashMap<&str, &EventRecord> = HashMap::with_capacity(events.len());
        for event in &events.records {
            if event.id.is_empty() {
                continue;
            }
            if let Some(first) = index.insert(event.id.as_str(), event) {
                return Err(ReportError::DuplicateEventId {
                    id: event.id.clone(),
                    first_row: first.row,
                    second_row: event.row,
                });
            }
        }
        Ok(index)
    }

    /// One enriched record per sale, in sale order.
    ///
    /// Sales whose event reference is blank or unknown keep `event: None`.
    pub fn enrich(
        events: &EventTable,
        sales: &SaleTable,
        deriver: &MetricDeriver,
    ) -> Result<Vec<EnrichedRecord>> {
        let index = Self::index_events(events)?;

        let enriched: Vec<EnrichedRecord> = sales
            .records
            .iter()
            .map(|sale| EnrichedRecord {
                event: index.get(sale.event_id.as_str()).map(|e| (*e).clone()),
                metrics: deriver.derive(sale),
                billing_month: billing_month(sale),
                sale: sale.clone(),
            })
            .collect();

        let unmatched = enriched.iter().filter(|r| !r.is_matched()).count();
        debug!(
            "Joiner: {} sales joined onto {} events ({} unmatched)",
            enriched.len(),
            events.len(),
            unmatched
        );
        Ok(enriched)
    }
}

// ── FlatLayout ────────────────────────────────────────────────────────────────

/// Column names of the derived fields in the flattened view.
pub const DERIVED_HEADERS: [&str; 5] = [
    "receita_total",
    "custo_total",
    "lucro_bruto",
    "comissao",
    "mes_faturamento",
];

/// Flattened, single-header view of the join output used for CSV export.
///
/// Sale columns come first, then event columns, then the derived fields.
/// When the sale's event reference and the event identifier share a header
/// the key appears once. Any other header present on both sides is suffixed
/// with `_venda` / `_evento`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatLayout {
    headers: Vec<String>,
    with_taxes: bool,
    shared_key: bool,
    event_extra_count: usize,
}

impl FlatLayout {
    pub fn new(columns: &ColumnNames, events: &EventTable, sales: &SaleTable) -> Self {
        let sc = &columns.sales;
        let ec = &columns.events;
        let with_taxes = sales.headers.iter().any(|h| *h == sc.taxes);
        let shared_key = ec.id == sc.event_id;

        let mut sale_names: Vec<String> = vec![
            sc.id.clone(),
            sc.event_id.clone(),
            sc.product.clone(),
            sc.issue_date.clone(),
            sc.start_date.clone(),
            sc.end_date.clone(),
            sc.billing_date.clone(),
            sc.supplier_payment_date.clone(),
            sc.client_receipt_date.clone(),
            sc.markup.clone(),
            sc.fees.clone(),
            sc.supplier_cost.clone(),
        ];
        if with_taxes {
            sale_names.push(sc.taxes.clone());
        }
        sale_names.push(sc.commission_pct.clone());
        let mut consumed: Vec<&str> = sale_names.iter().map(String::as_str).collect();
        if !with_taxes {
            consumed.push(sc.taxes.as_str());
        }
        let sale_extras = extra_headers(&sales.headers, &consumed);
        sale_names.extend(sale_extras);

        let mut event_names: Vec<String> = Vec::new();
        if !shared_key {
            event_names.push(ec.id.clone());
        }
        event_names.extend([
            ec.client.clone(),
            ec.start_date.clone(),
            ec.end_date.clone(),
            ec.request_date.clone(),
        ]);
        let event_extras = extra_headers(&events.headers, &ec.required());
        let event_extra_count = event_extras.len();
        event_names.extend(event_extras);

        let sale_set: HashSet<&String> = sale_names.iter().collect();
        let event_set: HashSet<&String> = event_names.iter().collect();

        let mut headers: Vec<String> = sale_names
            .iter()
            .map(|h| suffixed(h, event_set.contains(h), TableKind::Sales))
            .collect();
        headers.extend(
            event_names
                .iter()
                .map(|h| suffixed(h, sale_set.contains(h), TableKind::Events)),
        );
        headers.extend(DERIVED_HEADERS.iter().map(|h| h.to_string()));

        Self {
            headers,
            with_taxes,
            shared_key,
            event_extra_count,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Cells of one record, aligned with [`FlatLayout::headers`].
    pub fn row(&self, record: &EnrichedRecord) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.headers.len());
        self.push_sale(&mut cells, &record.sale);
        self.push_event(&mut cells, record.event.as_ref());

        let m = &record.metrics;
        cells.push(amount_cell(m.revenue));
        cells.push(amount_cell(m.cost));
        cells.push(amount_cell(m.gross_profit));
        cells.push(amount_cell(m.commission_amount));
        cells.push(
            record
                .billing_month
                .map(|ym| ym.to_string())
                .unwrap_or_default(),
        );
        cells
    }

    fn push_sale(&self, cells: &mut Vec<String>, sale: &SaleRecord) {
        cells.push(sale.id.clone());
        cells.push(sale.event_id.clone());
        cells.push(sale.product.clone().unwrap_or_default());
        for date in [
            sale.issue_date,
            sale.start_date,
            sale.end_date,
            sale.billing_date,
            sale.supplier_payment_date,
            sale.client_receipt_date,
        ] {
            cells.push(date_cell(date));
        }
        cells.push(amount_cell(sale.markup));
        cells.push(amount_cell(sale.fees));
        cells.push(amount_cell(sale.supplier_cost));
        if self.with_taxes {
            cells.push(amount_cell(sale.taxes));
        }
        cells.push(amount_cell(sale.commission_pct));
        push_extras(cells, &sale.extra);
    }

    fn push_event(&self, cells: &mut Vec<String>, event: Option<&EventRecord>) {
        let Some(event) = event else {
            let width = (if self.shared_key { 4 } else { 5 }) + self.event_extra_count;
            cells.extend(std::iter::repeat(String::new()).take(width));
            return;
        };
        if !self.shared_key {
            cells.push(event.id.clone());
        }
        cells.push(event.client.clone().unwrap_or_default());
        cells.push(date_cell(event.start_date));
        cells.push(date_cell(event.end_date));
        cells.push(date_cell(event.request_date));
        push_extras(cells, &event.extra);
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Headers that are not consumed by a typed field, in source order. A
/// repeated header is only consumed at its first occurrence.
fn extra_headers(headers: &[String], consumed: &[&str]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    headers
        .iter()
        .filter(|h| {
            let first = seen.insert(h.as_str());
            !(first && consumed.contains(&h.as_str()))
        })
        .cloned()
        .collect()
}

fn suffixed(header: &str, collides: bool, table: TableKind) -> String {
    if collides {
        format!("{}{}", header, table.collision_suffix())
    } else {
        header.to_string()
    }
}

fn push_extras(cells: &mut Vec<String>, extra: &ExtraCells) {
    cells.extend(extra.iter().map(|(_, value)| value.to_string()));
}

fn date_cell(value: Option<NaiveDateTime>) -> String {
    match value {
        Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => String::new(),
    }
}

fn amount_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
