//! Interactive report session.
//!
//! Owns the loaded tables and the current client selection, and caches the
//! [`PortfolioReport`] for that selection. Any change to the selection
//! invalidates the cache; the next [`ReportSession::report`] call recomputes
//! the whole pipeline from the in-memory tables.

use std::path::Path;
use std::time::{Duration, Instant};

use portfolio_core::error::Result;
use portfolio_core::metrics::CostFormula;
use portfolio_data::filter::{client_choices, validate_client};
use portfolio_data::loader::LoadOptions;
use portfolio_data::pipeline::{
    build_report, load_inputs, write_enriched_csv, PortfolioReport, ReportInputs, ReportOptions,
};

// ── ReportSession ─────────────────────────────────────────────────────────────

/// Loaded inputs, the current selection and the cached report for it.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use portfolio_runtime::session::ReportSession;
/// use portfolio_data::loader::LoadOptions;
/// use portfolio_core::metrics::CostFormula;
///
/// let mut session = ReportSession::load(
///     Path::new("bd_eventos.csv"),
///     Path::new("bd_vendas.csv"),
///     &LoadOptions::default(),
///     CostFormula::Supplier,
/// )?;
/// session.select_client(Some("Acme".to_string()))?;
/// println!("revenue: {}", session.report()?.kpis.total_revenue);
/// # Ok::<(), portfolio_core::error::ReportError>(())
/// ```
pub struct ReportSession {
    inputs: ReportInputs,
    /// Valid client selections, sorted.
    choices: Vec<String>,
    options: ReportOptions,
    /// Report for `options`, `None` after an invalidation.
    cache: Option<PortfolioReport>,
    /// When the cache was last populated.
    cache_timestamp: Option<Instant>,
    /// Number of times the pipeline has run.
    builds: usize,
}

impl ReportSession {
    /// Start a session over already loaded inputs, with no client selected.
    pub fn new(inputs: ReportInputs, cost_formula: CostFormula) -> Self {
        let choices = client_choices(&inputs.events);
        Self {
            inputs,
            choices,
            options: ReportOptions {
                client: None,
                cost_formula,
            },
            cache: None,
            cache_timestamp: None,
            builds: 0,
        }
    }

    /// Load both tables and start a session over them.
    pub fn load(
        events_path: &Path,
        sales_path: &Path,
        load_options: &LoadOptions,
        cost_formula: CostFormula,
    ) -> Result<Self> {
        let inputs = load_inputs(events_path, sales_path, load_options)?;
        Ok(Self::new(inputs, cost_formula))
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// The report for the current selection, computed on first use after
    /// any change.
    pub fn report(&mut self) -> Result<&PortfolioReport> {
        let report = match self.cache.take() {
            Some(report) => report,
            None => {
                let report = build_report(&self.inputs, &self.options)?;
                tracing::debug!(
                    client = ?self.options.client,
                    rows = report.rows.len(),
                    "report cache updated"
                );
                self.cache_timestamp = Some(Instant::now());
                self.builds += 1;
                report
            }
        };
        Ok(&*self.cache.insert(report))
    }

    /// Select a client (or `None` for the whole portfolio).
    ///
    /// An unknown client is rejected and leaves the selection unchanged.
    pub fn select_client(&mut self, client: Option<String>) -> Result<()> {
        if let Some(name) = &client {
            validate_client(&self.inputs.events, name)?;
        }
        if client != self.options.client {
            self.options.client = client;
            self.invalidate_cache();
        }
        Ok(())
    }

    /// Move the selection to the next client, wrapping through "all
    /// clients" after the last one. `forward = false` walks backwards.
    pub fn cycle_client(&mut self, forward: bool) {
        let n = self.choices.len();
        if n == 0 {
            return;
        }
        // Position n stands for "all clients".
        let current = self
            .options
            .client
            .as_ref()
            .and_then(|c| self.choices.iter().position(|x| x == c))
            .unwrap_or(n);
        let next = if forward {
            (current + 1) % (n + 1)
        } else {
            (current + n) % (n + 1)
        };
        self.options.client = self.choices.get(next).cloned();
        self.invalidate_cache();
    }

    /// Switch the cost formula.
    pub fn set_cost_formula(&mut self, formula: CostFormula) {
        if formula != self.options.cost_formula {
            self.options.cost_formula = formula;
            self.invalidate_cache();
        }
    }

    /// Discard the cached report, forcing the next [`Self::report`] to recompute.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
        self.cache_timestamp = None;
        tracing::debug!("report cache invalidated");
    }

    /// Write the enriched rows of the current selection as CSV.
    pub fn export_enriched(&mut self, path: &Path) -> Result<()> {
        self.report()?;
        let rows = self.cache.as_ref().map(|r| r.rows.as_slice()).unwrap_or(&[]);
        write_enriched_csv(path, &self.inputs, rows)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn selected_client(&self) -> Option<&str> {
        self.options.client.as_deref()
    }

    pub fn client_choices(&self) -> &[String] {
        &self.choices
    }

    pub fn cost_formula(&self) -> CostFormula {
        self.options.cost_formula
    }

    /// Age of the cached report, or `None` if nothing is cached.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache_timestamp.map(|ts| ts.elapsed())
    }

    /// How many times the pipeline has been run in this session.
    pub fn builds(&self) -> usize {
        self.builds
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
