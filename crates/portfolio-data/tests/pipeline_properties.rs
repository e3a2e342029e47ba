//! End-to-end properties of the report pipeline over in-memory CSV inputs.

use portfolio_core::metrics::CostFormula;
use portfolio_core::schema::ColumnNames;
use portfolio_data::aggregator::{
    Aggregation, Aggregator, Dimension, GroupKey, Measure, NullKeys,
};
use portfolio_data::filter::filter_by_client;
use portfolio_data::loader::{read_events, read_sales, LoadOptions};
use portfolio_data::pipeline::{
    build_report, client_product_breakdown, enrich, ReportInputs, ReportOptions,
};

const SALE_HEADER: &str = "id_venda,id_evento,produto,data_emissao,data_inicio,data_fim,data_faturamento,data_pagamento_fornecedor,data_recebimento_cliente,valor_markup,valor_taxas,valor_fornecedor,pct_comissao";
const EVENT_HEADER: &str = "id_evento,empresa_cliente,data_inicio,data_fim,data_solicitacao";

fn inputs(events: &[&str], sales: &[&str]) -> ReportInputs {
    let options = LoadOptions::default();
    let events_csv = std::iter::once(EVENT_HEADER)
        .chain(events.iter().copied())
        .collect::<Vec<_>>()
        .join("\n");
    let sales_csv = std::iter::once(SALE_HEADER)
        .chain(sales.iter().copied())
        .collect::<Vec<_>>()
        .join("\n");
    ReportInputs {
        events: read_events(events_csv.as_bytes(), &options).expect("events"),
        sales: read_sales(sales_csv.as_bytes(), &options).expect("sales"),
        columns: ColumnNames::default(),
    }
}

fn acme() -> ReportInputs {
    inputs(
        &["E1,Acme,2024-01-10,2024-01-12,2023-12-01"],
        &[
            "S1,E1,Hotel,,,,2024-01-15,,,100,10,60,10",
            "S2,E1,Aereo,,,,2024-01-20,,,50,5,20,10",
        ],
    )
}

fn portfolio() -> ReportInputs {
    inputs(
        &[
            "E1,Acme,2024-01-10,,",
            "E2,Globex,2024-02-01,,",
            "E3,Initech,2024-03-01,,",
            "E4,Globex,2024-03-05,,",
        ],
        &[
            "S1,E1,Hotel,,,,2024-01-15,,,100,10,60,10",
            "S2,E1,Aereo,,,,2024-02-15,,,50,5,20,10",
            "S3,E2,Hotel,,,,2024-02-20,,,200,20,150,5",
            "S4,E3,Carro,,,,2024-03-02,,,30,3,10,15",
            "S5,E4,Aereo,,,,,,,80,8,40,10",
            "S6,E4,Hotel,,,,2024-03-09,,,0,0,0,0",
            "S7,E2,Carro,,,,2024-01-31,,,30,3,10,15",
        ],
    )
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Derived metrics ───────────────────────────────────────────────────────────

#[test]
fn test_derived_metric_formulas_hold_per_row() {
    let inputs = portfolio();
    for row in enrich(&inputs, CostFormula::Supplier).unwrap() {
        let sale = &row.sale;
        let m = &row.metrics;
        let revenue = sale.markup.unwrap() + sale.fees.unwrap();
        assert!(approx(m.revenue.unwrap(), revenue));
        assert!(approx(
            m.gross_profit.unwrap(),
            revenue - sale.supplier_cost.unwrap()
        ));
        assert!(approx(
            m.commission_amount.unwrap(),
            revenue * sale.commission_pct.unwrap() / 100.0
        ));
    }
}

#[test]
fn test_enriched_row_count_matches_sales() {
    let inputs = portfolio();
    assert_eq!(
        enrich(&inputs, CostFormula::Supplier).unwrap().len(),
        inputs.sales.len()
    );

    let with_orphans = self::inputs(
        &["E1,Acme,,,"],
        &[
            "S1,E9,Hotel,,,,,,,1,1,1,1",
            "S2,E1,Hotel,,,,,,,1,1,1,1",
            "S3,,Hotel,,,,,,,1,1,1,1",
        ],
    );
    assert_eq!(
        enrich(&with_orphans, CostFormula::Supplier).unwrap().len(),
        3
    );
}

// ── Aggregation consistency ───────────────────────────────────────────────────

#[test]
fn test_per_client_revenue_sums_to_total() {
    let report = build_report(&portfolio(), &ReportOptions::default()).unwrap();
    let per_client: f64 = report.clients.iter().map(|c| c.revenue).sum();
    assert!(approx(per_client, report.kpis.total_revenue));
}

#[test]
fn test_filter_then_product_matches_client_product_slice() {
    let inputs = portfolio();
    let rows = enrich(&inputs, CostFormula::Supplier).unwrap();
    let pairs = client_product_breakdown(&inputs, CostFormula::Supplier).unwrap();

    for client in ["Acme", "Globex", "Initech"] {
        let filtered = filter_by_client(&rows, client);
        let by_product = Aggregator::group_by(
            &filtered,
            Dimension::Product,
            &[
                Aggregation::Count(portfolio_data::aggregator::IdField::Sale),
                Aggregation::Sum(Measure::Revenue),
            ],
            NullKeys::Drop,
        );
        let slice: Vec<_> = pairs.iter().filter(|p| p.client == client).collect();

        assert_eq!(by_product.len(), slice.len(), "client {client}");
        for (group, pair) in by_product.iter().zip(slice) {
            assert_eq!(group.key, GroupKey::Text(pair.product.clone()));
            assert_eq!(group.values[0].as_count(), pair.sales);
            assert!(approx(group.values[1].as_sum(), pair.revenue));
        }
    }
}

#[test]
fn test_two_runs_give_identical_aggregates() {
    let inputs = portfolio();
    let first = build_report(&inputs, &ReportOptions::default()).unwrap();
    let second = build_report(&inputs, &ReportOptions::default()).unwrap();

    assert_eq!(first.kpis, second.kpis);
    assert_eq!(first.clients, second.clients);
    assert_eq!(first.products, second.products);
    assert_eq!(first.monthly, second.monthly);
}

#[test]
fn test_revenue_ties_keep_key_order() {
    let inputs = inputs(
        &["E1,Zeta,,,", "E2,Alpha,,,", "E3,Mid,,,"],
        &[
            "S1,E1,Hotel,,,,,,,10,0,0,0",
            "S2,E2,Hotel,,,,,,,10,0,0,0",
            "S3,E3,Hotel,,,,,,,20,0,0,0",
        ],
    );
    let report = build_report(&inputs, &ReportOptions::default()).unwrap();
    let names: Vec<&str> = report.clients.iter().map(|c| c.client.as_str()).collect();
    assert_eq!(names, vec!["Mid", "Alpha", "Zeta"]);
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn test_acme_scenario() {
    let inputs = acme();
    let rows = enrich(&inputs, CostFormula::Supplier).unwrap();

    let revenue: Vec<f64> = rows.iter().map(|r| r.metrics.revenue.unwrap()).collect();
    let profit: Vec<f64> = rows
        .iter()
        .map(|r| r.metrics.gross_profit.unwrap())
        .collect();
    let commission: Vec<f64> = rows
        .iter()
        .map(|r| r.metrics.commission_amount.unwrap())
        .collect();
    assert!(approx(revenue[0], 110.0) && approx(revenue[1], 55.0));
    assert!(approx(profit[0], 50.0) && approx(profit[1], 35.0));
    assert!(approx(commission[0], 11.0) && approx(commission[1], 5.5));

    let report = build_report(&inputs, &ReportOptions::default()).unwrap();
    assert_eq!(report.clients.len(), 1);
    let acme = &report.clients[0];
    assert_eq!(acme.client, "Acme");
    assert_eq!(acme.events, 1);
    assert!(approx(acme.revenue, 165.0));
    assert!(approx(acme.gross_profit, 85.0));
    assert!(approx(acme.commission, 16.5));
}

#[test]
fn test_unknown_event_scenario() {
    let inputs = inputs(
        &["E1,Acme,,,"],
        &[
            "S1,E1,Hotel,,,,2024-01-15,,,100,10,60,10",
            "S2,E404,Hotel,,,,2024-01-15,,,40,0,10,10",
        ],
    );
    let report = build_report(&inputs, &ReportOptions::default()).unwrap();

    let orphan = &report.rows[1];
    assert!(orphan.event.is_none());
    assert_eq!(orphan.client(), None);

    assert_eq!(report.clients.len(), 1);
    assert!(approx(report.clients[0].revenue, 110.0));
    assert!(approx(report.kpis.total_revenue, 150.0));
    assert_eq!(report.metadata.unmatched_sales, 1);
}

#[test]
fn test_invalid_date_scenario() {
    let inputs = inputs(
        &["E1,Acme,not-a-date,,"],
        &[
            "S1,E1,Hotel,,,,2024-01-15,,,100,10,60,10",
            "S2,E1,Hotel,,,,31/31/2024,,,50,5,20,10",
        ],
    );
    assert!(inputs.events.records[0].start_date.is_none());
    assert!(inputs.sales.records[1].billing_date.is_none());

    let report = build_report(&inputs, &ReportOptions::default()).unwrap();
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.monthly.len(), 2);
    let last = report.monthly.last().unwrap();
    assert_eq!(last.month, None);
    assert!(approx(last.revenue, 55.0));
}

#[test]
fn test_supplier_plus_taxes_changes_profit_only() {
    let options = LoadOptions::default();
    let sales_csv = format!("{SALE_HEADER},valor_impostos\nS1,E1,Hotel,,,,,,,100,10,60,10,5\n");
    let inputs = ReportInputs {
        events: read_events(format!("{EVENT_HEADER}\nE1,Acme,,,\n").as_bytes(), &options)
            .unwrap(),
        sales: read_sales(sales_csv.as_bytes(), &options).unwrap(),
        columns: ColumnNames::default(),
    };

    let plain = build_report(&inputs, &ReportOptions::default()).unwrap();
    let taxed = build_report(
        &inputs,
        &ReportOptions {
            cost_formula: CostFormula::SupplierPlusTaxes,
            ..ReportOptions::default()
        },
    )
    .unwrap();

    assert!(approx(plain.kpis.total_revenue, taxed.kpis.total_revenue));
    assert!(approx(plain.kpis.total_gross_profit, 50.0));
    assert!(approx(taxed.kpis.total_gross_profit, 45.0));
}
