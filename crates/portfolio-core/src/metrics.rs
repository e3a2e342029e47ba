use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::{SaleRecord, YearMonth};

/// Interface for any record carrying the monetary inputs of a sale.
pub trait SaleAmounts {
    fn markup(&self) -> Option<f64>;
    fn fees(&self) -> Option<f64>;
    fn supplier_cost(&self) -> Option<f64>;
    fn taxes(&self) -> Option<f64>;
    /// Commission as a percentage in `[0, 100]`.
    fn commission_pct(&self) -> Option<f64>;
}

impl SaleAmounts for SaleRecord {
    fn markup(&self) -> Option<f64> {
        self.markup
    }

    fn fees(&self) -> Option<f64> {
        self.fees
    }

    fn supplier_cost(&self) -> Option<f64> {
        self.supplier_cost
    }

    fn taxes(&self) -> Option<f64> {
        self.taxes
    }

    fn commission_pct(&self) -> Option<f64> {
        self.commission_pct
    }
}

/// How the cost of a sale is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum CostFormula {
    /// cost = supplier value.
    #[default]
    #[serde(rename = "supplier")]
    Supplier,
    /// cost = supplier value + taxes (a missing tax value adds nothing).
    #[value(name = "supplier+taxes")]
    #[serde(rename = "supplier+taxes")]
    SupplierPlusTaxes,
}

impl CostFormula {
    /// Command-line spelling of the formula.
    pub fn as_str(&self) -> &'static str {
        match self {
            CostFormula::Supplier => "supplier",
            CostFormula::SupplierPlusTaxes => "supplier+taxes",
        }
    }
}

impl std::fmt::Display for CostFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-row derived figures. Every field is `None` when one of its inputs is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    /// markup + fees
    pub revenue: Option<f64>,
    pub cost: Option<f64>,
    /// revenue − cost
    pub gross_profit: Option<f64>,
    /// revenue × commission% / 100
    pub commission_amount: Option<f64>,
}

// ── MetricDeriver ─────────────────────────────────────────────────────────────

/// Stateless computation of the derived metrics for one sale.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricDeriver {
    formula: CostFormula,
}

impl MetricDeriver {
    pub fn new(formula: CostFormula) -> Self {
        Self { formula }
    }

    /// Compute all derived figures for `sale`.
    pub fn derive<S: SaleAmounts>(&self, sale: &S) -> DerivedMetrics {
        let revenue = Self::revenue(sale.markup(), sale.fees());
        let cost = self.cost(sale.supplier_cost(), sale.taxes());
        DerivedMetrics {
            revenue,
            cost,
            gross_profit: Self::gross_profit(revenue, cost),
            commission_amount: Self::commission(revenue, sale.commission_pct()),
        }
    }

    pub fn revenue(markup: Option<f64>, fees: Option<f64>) -> Option<f64> {
        Some(markup? + fees?)
    }

    pub fn cost(&self, supplier: Option<f64>, taxes: Option<f64>) -> Option<f64> {
        match self.formula {
            CostFormula::Supplier => supplier,
            CostFormula::SupplierPlusTaxes => Some(supplier? + taxes.unwrap_or(0.0)),
        }
    }

    pub fn gross_profit(revenue: Option<f64>, cost: Option<f64>) -> Option<f64> {
        Some(revenue? - cost?)
    }

    pub fn commission(revenue: Option<f64>, pct: Option<f64>) -> Option<f64> {
        Some(revenue? * (pct? / 100.0))
    }
}

/// Month of the sale's billing date, `None` without one.
pub fn billing_month(sale: &SaleRecord) -> Option<YearMonth> {
    sale.billing_date.map(|dt| YearMonth::from_date(dt.date()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
