//! Grouping of enriched rows by client, product or billing month.
//!
//! [`Aggregator::group_by`] is the generic driver: one [`GroupSummary`] per
//! distinct key, in key order, carrying the requested aggregates. The typed
//! views on top of it are what the presenters consume.

use std::collections::{BTreeMap, HashSet};

use portfolio_core::models::{EnrichedRecord, YearMonth};
use serde::Serialize;

// ── Specs ─────────────────────────────────────────────────────────────────────

/// What rows are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Client of the matched event.
    Client,
    Product,
    /// Month of the billing date.
    Month,
}

impl Dimension {
    /// The grouping key of `row` along this dimension.
    pub fn key(self, row: &EnrichedRecord) -> GroupKey {
        let key = match self {
            Dimension::Client => row.client().map(|c| GroupKey::Text(c.to_string())),
            Dimension::Product => row.product().map(|p| GroupKey::Text(p.to_string())),
            Dimension::Month => row.billing_month.map(GroupKey::Month),
        };
        key.unwrap_or(GroupKey::Null)
    }
}

/// A grouping key. Null keys sort after every other key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Text(String),
    Month(YearMonth),
    Null,
}

impl GroupKey {
    pub fn is_null(&self) -> bool {
        matches!(self, GroupKey::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            GroupKey::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_month(&self) -> Option<YearMonth> {
        match self {
            GroupKey::Month(m) => Some(*m),
            _ => None,
        }
    }
}

/// Identifier columns that can be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdField {
    Event,
    Sale,
}

impl IdField {
    fn value(self, row: &EnrichedRecord) -> Option<&str> {
        match self {
            IdField::Event => row.event_id(),
            IdField::Sale => row.sale_id(),
        }
    }
}

/// Numeric columns that can be summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Revenue,
    GrossProfit,
    Commission,
}

impl Measure {
    pub fn value(self, row: &EnrichedRecord) -> Option<f64> {
        let m = &row.metrics;
        match self {
            Measure::Revenue => m.revenue,
            Measure::GrossProfit => m.gross_profit,
            Measure::Commission => m.commission_amount,
        }
    }
}

/// One aggregate to compute per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Distinct non-blank identifiers.
    DistinctCount(IdField),
    /// Rows with a non-blank identifier.
    Count(IdField),
    /// Sum of a measure; null cells contribute zero.
    Sum(Measure),
}

/// Whether the group of rows without a key is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullKeys {
    #[default]
    Keep,
    Drop,
}

/// The computed value of one [`Aggregation`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregateValue {
    Count(usize),
    Sum(f64),
}

impl AggregateValue {
    pub fn as_count(self) -> usize {
        match self {
            AggregateValue::Count(n) => n,
            AggregateValue::Sum(_) => 0,
        }
    }

    pub fn as_sum(self) -> f64 {
        match self {
            AggregateValue::Sum(v) => v,
            AggregateValue::Count(n) => n as f64,
        }
    }
}

/// Aggregates of one group; `values` is aligned with the requested specs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: GroupKey,
    pub values: Vec<AggregateValue>,
}

// ── Accumulator ───────────────────────────────────────────────────────────────

enum Accumulator<'a> {
    Distinct(IdField, HashSet<&'a str>),
    Count(IdField, usize),
    Sum(Measure, f64),
}

impl<'a> Accumulator<'a> {
    fn new(spec: Aggregation) -> Self {
        match spec {
            Aggregation::DistinctCount(field) => Accumulator::Distinct(field, HashSet::new()),
            Aggregation::Count(field) => Accumulator::Count(field, 0),
            Aggregation::Sum(measure) => Accumulator::Sum(measure, 0.0),
        }
    }

    fn add(&mut self, row: &'a EnrichedRecord) {
        match self {
            Accumulator::Distinct(field, seen) => {
                if let Some(id) = field.value(row) {
                    seen.insert(id);
                }
            }
            Accumulator::Count(field, n) => {
                if field.value(row).is_some() {
                    *n += 1;
                }
            }
            Accumulator::Sum(measure, total) => {
                *total += measure.value(row).unwrap_or(0.0);
            }
        }
    }

    fn finish(self) -> AggregateValue {
        match self {
            Accumulator::Distinct(_, seen) => AggregateValue::Count(seen.len()),
            Accumulator::Count(_, n) => AggregateValue::Count(n),
            Accumulator::Sum(_, total) => AggregateValue::Sum(total),
        }
    }
}

// ── Typed views ───────────────────────────────────────────────────────────────

/// One row of the per-client table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSummary {
    pub client: String,
    /// Distinct events with at least one sale.
    pub events: usize,
    pub revenue: f64,
    pub gross_profit: f64,
    pub commission: f64,
}

/// One row of the per-product table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub product: String,
    pub sales: usize,
    pub revenue: f64,
}

/// One row of the per-month table; `month` is `None` for sales without a
/// billing date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: Option<YearMonth>,
    pub revenue: f64,
}

/// Sales of one product for one client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientProductSummary {
    pub client: String,
    pub product: String,
    pub sales: usize,
    pub revenue: f64,
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper that groups enriched rows.
pub struct Aggregator;

impl Aggregator {
    /// Group `rows` along `dimension` and compute `specs` for every group.
    ///
    /// Groups come back in key order with the null group, when kept, last.
    /// If no row has a non-null key the result is empty.
    pub fn group_by(
        rows: &[EnrichedRecord],
        dimension: Dimension,
        specs: &[Aggregation],
        nulls: NullKeys,
    ) -> Vec<GroupSummary> {
        let groups = Self::group_with(rows, |row| Some(dimension.key(row)), specs);
        if groups.keys().all(GroupKey::is_null) {
            return Vec::new();
        }

        groups
            .into_iter()
            .filter(|(key, _)| nulls == NullKeys::Keep || !key.is_null())
            .map(|(key, values)| GroupSummary { key, values })
            .collect()
    }

    /// Per-client events, revenue, profit and commission, revenue descending.
    /// Sales without a client are left out.
    pub fn client_summary(rows: &[EnrichedRecord]) -> Vec<ClientSummary> {
        let specs = [
            Aggregation::DistinctCount(IdField::Event),
            Aggregation::Sum(Measure::Revenue),
            Aggregation::Sum(Measure::GrossProfit),
            Aggregation::Sum(Measure::Commission),
        ];
        let mut out: Vec<ClientSummary> =
            Self::group_by(rows, Dimension::Client, &specs, NullKeys::Drop)
                .into_iter()
                .filter_map(|g| {
                    Some(ClientSummary {
                        client: g.key.as_text()?.to_string(),
                        events: g.values[0].as_count(),
                        revenue: g.values[1].as_sum(),
                        gross_profit: g.values[2].as_sum(),
                        commission: g.values[3].as_sum(),
                    })
                })
                .collect();
        sort_desc_by(&mut out, |c| c.revenue);
        out
    }

    /// Per-product sale count and revenue, revenue descending.
    pub fn product_summary(rows: &[EnrichedRecord]) -> Vec<ProductSummary> {
        let specs = [
            Aggregation::Count(IdField::Sale),
            Aggregation::Sum(Measure::Revenue),
        ];
        let mut out: Vec<ProductSummary> =
            Self::group_by(rows, Dimension::Product, &specs, NullKeys::Drop)
                .into_iter()
                .filter_map(|g| {
                    Some(ProductSummary {
                        product: g.key.as_text()?.to_string(),
                        sales: g.values[0].as_count(),
                        revenue: g.values[1].as_sum(),
                    })
                })
                .collect();
        sort_desc_by(&mut out, |p| p.revenue);
        out
    }

    /// Revenue per billing month, chronological, with sales lacking a
    /// billing date in a trailing `month: None` row.
    pub fn monthly_summary(rows: &[EnrichedRecord]) -> Vec<MonthlySummary> {
        let specs = [Aggregation::Sum(Measure::Revenue)];
        Self::group_by(rows, Dimension::Month, &specs, NullKeys::Keep)
            .into_iter()
            .map(|g| MonthlySummary {
                month: g.key.as_month(),
                revenue: g.values[0].as_sum(),
            })
            .collect()
    }

    /// Sale count and revenue per (client, product) pair, in key order.
    /// Rows missing either key are left out.
    pub fn client_product_summary(rows: &[EnrichedRecord]) -> Vec<ClientProductSummary> {
        let specs = [
            Aggregation::Count(IdField::Sale),
            Aggregation::Sum(Measure::Revenue),
        ];
        Self::group_with(
            rows,
            |row| Some((row.client()?.to_string(), row.product()?.to_string())),
            &specs,
        )
        .into_iter()
        .map(|((client, product), values)| ClientProductSummary {
            client,
            product,
            sales: values[0].as_count(),
            revenue: values[1].as_sum(),
        })
        .collect()
    }

    /// Sum of `measure` over all rows; nulls contribute zero.
    pub fn total(rows: &[EnrichedRecord], measure: Measure) -> f64 {
        rows.iter()
            .filter_map(|r| measure.value(r))
            .fold(0.0, |acc, v| acc + v)
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Grouping driver. Rows for which `key_fn` returns `None` are skipped.
    fn group_with<'a, K: Ord>(
        rows: &'a [EnrichedRecord],
        key_fn: impl Fn(&'a EnrichedRecord) -> Option<K>,
        specs: &[Aggregation],
    ) -> BTreeMap<K, Vec<AggregateValue>> {
        let mut map: BTreeMap<K, Vec<Accumulator<'a>>> = BTreeMap::new();

        for row in rows {
            let Some(key) = key_fn(row) else {
                continue;
            };
            let accs = map
                .entry(key)
                .or_insert_with(|| specs.iter().copied().map(Accumulator::new).collect());
            for acc in accs.iter_mut() {
                acc.add(row);
            }
        }

        map.into_iter()
            .map(|(key, accs)| (key, accs.into_iter().map(Accumulator::finish).collect()))
            .collect()
    }
}

// ── Ranking ───────────────────────────────────────────────────────────────────

/// Sort descending by `key`. The sort is stable, so ties keep their
/// current (group-key) order.
pub fn sort_desc_by<T>(items: &mut [T], key: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| key(b).total_cmp(&key(a)));
}

/// The first `n` items, or all of them when there are fewer.
pub fn top_n<T>(items: &[T], n: usize) -> &[T] {
    &items[..n.min(items.len())]
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use portfolio_core::metrics::MetricDeriver;
    use portfolio_core::models::{EventRecord, SaleRecord};

    fn make_row(
        sale_id: &str,
        event: Option<(&str, &str)>,
        product: Option<&str>,
        revenue: Option<f64>,
        billing: Option<(i32, u32)>,
    ) -> EnrichedRecord {
        let event_id = event.map(|(id, _)| id).unwrap_or("E-unknown");
        let sale = SaleRecord {
            row: 1,
            id: sale_id.to_string(),
            event_id: event_id.to_string(),
            product: product.map(str::to_string),
            issue_date: None,
            start_date: None,
            end_date: None,
            billing_date: billing.and_then(|(y, m)| {
                NaiveDate::from_ymd_opt(y, m, 10).and_then(|d| d.and_hms_opt(0, 0, 0))
            }),
            supplier_payment_date: None,
            client_receipt_date: None,
            markup: revenue,
            fees: Some(0.0),
            supplier_cost: Some(0.0),
            taxes: None,
            commission_pct: Some(10.0),
            extra: Vec::new(),
        };
        let event = event.map(|(id, client)| EventRecord {
            row: 1,
            id: id.to_string(),
            client: Some(client.to_string()),
            start_date: None,
            end_date: None,
            request_date: None,
            extra: Vec::new(),
        });
        EnrichedRecord {
            metrics: MetricDeriver::default().derive(&sale),
            billing_month: portfolio_core::metrics::billing_month(&sale),
            sale,
            event,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sample_rows() -> Vec<EnrichedRecord> {
        vec![
            make_row("S1", Some(("E1", "Acme")), Some("Hotel"), Some(100.0), Some((2024, 2))),
            make_row("S2", Some(("E1", "Acme")), Some("Aereo"), Some(50.0), Some((2024, 1))),
            make_row("S3", Some(("E2", "Globex")), Some("Hotel"), Some(300.0), None),
            make_row("S4", None, Some("Hotel"), Some(7.0), Some((2024, 1))),
            make_row("S5", Some(("E3", "Acme")), None, None, Some((2024, 2))),
        ]
    }

    // ── group_by ──────────────────────────────────────────────────────────────

    #[test]
    fn test_group_by_client_keeps_null_group_last() {
        let groups = Aggregator::group_by(
            &sample_rows(),
            Dimension::Client,
            &[Aggregation::Sum(Measure::Revenue)],
            NullKeys::Keep,
        );
        let keys: Vec<&GroupKey> = groups.iter().map(|g| &g.key).collect();
        assert_eq!(
            keys,
            vec![
                &GroupKey::Text("Acme".into()),
                &GroupKey::Text("Globex".into()),
                &GroupKey::Null
            ]
        );
        assert!(approx(groups[2].values[0].as_sum(), 7.0));
    }

    #[test]
    fn test_group_by_drop_nulls() {
        let groups = Aggregator::group_by(
            &sample_rows(),
            Dimension::Client,
            &[Aggregation::Sum(Measure::Revenue)],
            NullKeys::Drop,
        );
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| !g.key.is_null()));
    }

    #[test]
    fn test_group_by_distinct_and_row_counts() {
        let groups = Aggregator::group_by(
            &sample_rows(),
            Dimension::Client,
            &[
                Aggregation::DistinctCount(IdField::Event),
                Aggregation::Count(IdField::Sale),
            ],
            NullKeys::Drop,
        );
        // Acme: events E1, E3; sales S1, S2, S5.
        assert_eq!(groups[0].values[0], AggregateValue::Count(2));
        assert_eq!(groups[0].values[1], AggregateValue::Count(3));
    }

    #[test]
    fn test_group_by_null_measure_counts_as_zero() {
        let rows = vec![make_row("S1", Some(("E1", "Acme")), Some("Hotel"), None, None)];
        let groups = Aggregator::group_by(
            &rows,
            Dimension::Client,
            &[Aggregation::Sum(Measure::Revenue)],
            NullKeys::Drop,
        );
        assert_eq!(groups[0].values[0], AggregateValue::Sum(0.0));
    }

    #[test]
    fn test_group_by_all_null_dimension_is_empty() {
        let rows = vec![
            make_row("S1", None, Some("Hotel"), Some(1.0), None),
            make_row("S2", None, Some("Hotel"), Some(2.0), None),
        ];
        for nulls in [NullKeys::Keep, NullKeys::Drop] {
            assert!(Aggregator::group_by(
                &rows,
                Dimension::Month,
                &[Aggregation::Sum(Measure::Revenue)],
                nulls
            )
            .is_empty());
        }
    }

    #[test]
    fn test_group_by_empty_input() {
        let groups = Aggregator::group_by(
            &[],
            Dimension::Product,
            &[Aggregation::Count(IdField::Sale)],
            NullKeys::Keep,
        );
        assert!(groups.is_empty());
    }

    // ── typed views ───────────────────────────────────────────────────────────

    #[test]
    fn test_client_summary_sorted_by_revenue() {
        let clients = Aggregator::client_summary(&sample_rows());
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].client, "Globex");
        assert!(approx(clients[0].revenue, 300.0));
        assert_eq!(clients[1].client, "Acme");
        assert_eq!(clients[1].events, 2);
        assert!(approx(clients[1].revenue, 150.0));
    }

    #[test]
    fn test_product_summary_excludes_blank_product() {
        let products = Aggregator::product_summary(&sample_rows());
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product, "Hotel");
        assert_eq!(products[0].sales, 3);
        assert!(approx(products[0].revenue, 407.0));
        assert_eq!(products[1].product, "Aereo");
    }

    #[test]
    fn test_monthly_summary_chronological_with_null_month_last() {
        let months = Aggregator::monthly_summary(&sample_rows());
        let labels: Vec<Option<String>> =
            months.iter().map(|m| m.month.map(|ym| ym.to_string())).collect();
        assert_eq!(
            labels,
            vec![Some("2024-01".to_string()), Some("2024-02".to_string()), None]
        );
        assert!(approx(months[0].revenue, 57.0));
        assert!(approx(months[2].revenue, 300.0));
    }

    #[test]
    fn test_client_product_summary_skips_missing_keys() {
        let pairs = Aggregator::client_product_summary(&sample_rows());
        let keys: Vec<(&str, &str)> = pairs
            .iter()
            .map(|p| (p.client.as_str(), p.product.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("Acme", "Aereo"), ("Acme", "Hotel"), ("Globex", "Hotel")]
        );
    }

    #[test]
    fn test_total_ignores_nulls() {
        assert!(approx(
            Aggregator::total(&sample_rows(), Measure::Revenue),
            457.0
        ));
    }

    #[test]
    fn test_total_of_only_nulls_is_positive_zero() {
        let rows = vec![make_row("S1", Some(("E1", "Acme")), Some("Hotel"), None, None)];
        let total = Aggregator::total(&rows, Measure::Revenue);
        assert_eq!(total, 0.0);
        assert!(total.is_sign_positive());
        assert!(Aggregator::total(&[], Measure::Revenue).is_sign_positive());
    }

    // ── ranking ───────────────────────────────────────────────────────────────

    #[test]
    fn test_sort_desc_is_stable_for_ties() {
        let mut items = vec![("a", 1.0), ("b", 5.0), ("c", 1.0), ("d", 5.0)];
        sort_desc_by(&mut items, |i| i.1);
        let names: Vec<&str> = items.iter().map(|i| i.0).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_top_n_slices_without_reordering() {
        let items = [3, 2, 1];
        assert_eq!(top_n(&items, 2), &[3, 2]);
        assert_eq!(top_n(&items, 10), &[3, 2, 1]);
        assert!(top_n(&items, 0).is_empty());
    }
}
