mod bootstrap;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use portfolio_core::error::ReportError;
use portfolio_core::metrics::CostFormula;
use portfolio_core::parsing::DateParser;
use portfolio_core::schema::ColumnNames;
use portfolio_core::settings::Settings;
use portfolio_data::loader::LoadOptions;
use portfolio_runtime::session::ReportSession;
use portfolio_ui::app::{App, ExportTarget, ViewMode};
use portfolio_ui::export::ExportFormat;
use portfolio_ui::text::render_view;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    let app_dir = bootstrap::app_dir();
    bootstrap::ensure_directories(&app_dir)?;

    // The dashboard owns the terminal, so its logs always go to a file.
    let dashboard = settings.view == "dashboard";
    let log_file = settings
        .log_file
        .clone()
        .or_else(|| dashboard.then(|| bootstrap::dashboard_log_file(&app_dir)));
    bootstrap::setup_logging(&settings.log_level, log_file.as_deref())?;

    tracing::info!("Portfolio report v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Theme: {}, Cost formula: {}",
        settings.view,
        settings.theme,
        settings.cost_formula
    );

    // ── Load ──────────────────────────────────────────────────────────────────
    let (events_path, sales_path) = settings.input_paths()?;
    let load_options = LoadOptions {
        columns: load_columns(settings.columns.as_deref())?,
        date_parser: DateParser::new(settings.day_first),
        delimiter: settings.delimiter_byte()?,
    };
    let mut session = prepare_session(
        &events_path,
        &sales_path,
        &load_options,
        settings.cost_formula,
        settings.client.clone(),
    )
    .map_err(classify_input_error)?;

    // ── Exports ───────────────────────────────────────────────────────────────
    if let Some(path) = &settings.export_enriched {
        session
            .export_enriched(path)
            .with_context(|| format!("failed to export enriched rows to {}", path.display()))?;
    }

    let export_format = ExportFormat::from_name(&settings.export_format);
    if let Some(path) = &settings.export {
        ExportTarget::new(path.clone(), export_format, settings.charts.clone())
            .write(session.report()?)
            .with_context(|| format!("failed to export summary to {}", path.display()))?;
    }

    // ── Render ────────────────────────────────────────────────────────────────
    let top = settings.top as usize;
    if dashboard {
        let target = ExportTarget::new(
            settings
                .export
                .clone()
                .unwrap_or_else(|| default_export_path(export_format)),
            export_format,
            settings.charts.clone(),
        );
        tracing::info!("Starting dashboard...");
        App::new(&settings.theme, ViewMode::Summary, top, target).run(&mut session)?;
    } else {
        let view = ViewMode::from_name(&settings.view).unwrap_or(ViewMode::Summary);
        print!("{}", render_view(session.report()?, view, top));
    }

    Ok(())
}

/// Load both tables, apply the client selection and build the report once,
/// so input errors halt the run before anything renders.
fn prepare_session(
    events_path: &Path,
    sales_path: &Path,
    load_options: &LoadOptions,
    cost_formula: CostFormula,
    client: Option<String>,
) -> portfolio_core::error::Result<ReportSession> {
    let mut session = ReportSession::load(events_path, sales_path, load_options, cost_formula)?;
    session.select_client(client)?;
    session.report()?;
    Ok(session)
}

/// Label an input failure by kind. Data-quality problems such as a
/// duplicated event id read differently from a missing column or file.
fn classify_input_error(err: ReportError) -> anyhow::Error {
    let label = if err.is_data_quality() {
        "data-quality error in the input tables"
    } else if err.is_structural() {
        "structural error in the input tables"
    } else {
        "failed to prepare the report"
    };
    tracing::error!(error = %err, "{}", label);
    anyhow::Error::new(err).context(label)
}

/// Column names from `--columns`, or the defaults.
fn load_columns(path: Option<&Path>) -> Result<ColumnNames> {
    match path {
        Some(p) => ColumnNames::load_from(p)
            .with_context(|| format!("failed to read column mapping {}", p.display())),
        None => Ok(ColumnNames::default()),
    }
}

/// Where the dashboard's export key writes when `--export` is not given.
fn default_export_path(format: ExportFormat) -> PathBuf {
    match format {
        ExportFormat::Json => PathBuf::from("portfolio-summary.json"),
        ExportFormat::Text => PathBuf::from("portfolio-summary.txt"),
    }
}
