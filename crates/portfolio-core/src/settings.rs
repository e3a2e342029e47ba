use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReportError, Result};
use crate::metrics::CostFormula;

/// File name of the event export inside `--data-dir`.
pub const EVENTS_FILE_NAME: &str = "bd_eventos.csv";
/// File name of the sales export inside `--data-dir`.
pub const SALES_FILE_NAME: &str = "bd_vendas.csv";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Client portfolio reports from event and sales CSV exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "portfolio-report",
    about = "Client portfolio reports from event and sales CSV exports",
    version
)]
pub struct Settings {
    /// Event table CSV
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Sales table CSV
    #[arg(long)]
    pub sales: Option<PathBuf>,

    /// Directory containing bd_eventos.csv and bd_vendas.csv
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Restrict every view to one client
    #[arg(long)]
    pub client: Option<String>,

    /// View to render
    #[arg(long, default_value = "summary", value_parser = ["summary", "clients", "products", "monthly", "dashboard"])]
    pub view: String,

    /// Rows shown in rankings and bar charts (1-100)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub top: u32,

    /// Write the summary document to this path
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Summary document format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub export_format: String,

    /// Write the joined and enriched table as CSV to this path
    #[arg(long)]
    pub export_enriched: Option<PathBuf>,

    /// Chart image to reference in the summary document (repeatable)
    #[arg(long = "chart")]
    pub charts: Vec<PathBuf>,

    /// How the cost of a sale is computed
    #[arg(long, value_enum, default_value_t = CostFormula::Supplier)]
    pub cost_formula: CostFormula,

    /// Read ambiguous NN/NN/YYYY dates as day/month
    #[arg(long)]
    pub day_first: bool,

    /// Field delimiter of both CSV inputs
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// JSON file overriding input column names
    #[arg(long)]
    pub columns: Option<PathBuf>,

    /// Dashboard theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.portfolio-report/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,
}

impl LastUsedParams {
    /// Default path of the persisted file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// The config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".portfolio-report").join("last_used.json")
    }

    /// Load persisted params; `Default` when the file is absent or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the file at `path` if it exists.
    pub fn clear_at(path: &Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with an explicit argument list
    /// and config path.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("could not clear {}: {}", config_path.display(), e);
            }
            return Self::apply_debug_flag(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // Inputs are remembered as a unit: any explicit input flag wins over
        // all persisted paths.
        let inputs_given = ["events", "sales", "data_dir"]
            .iter()
            .any(|name| is_arg_explicitly_set(&matches, name));
        if !inputs_given {
            settings.events = last.events;
            settings.sales = last.sales;
            settings.data_dir = last.data_dir;
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top") {
            if let Some(v) = last.top {
                settings.top = v;
            }
        }

        settings = Self::apply_debug_flag(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::debug!("could not persist {}: {}", config_path.display(), e);
        }

        settings
    }

    /// Resolve the two input files.
    ///
    /// Explicit `--events` / `--sales` win; otherwise both are looked up in
    /// `--data-dir`. Both inputs are required before anything is computed.
    pub fn input_paths(&self) -> Result<(PathBuf, PathBuf)> {
        let events = self
            .events
            .clone()
            .or_else(|| self.data_dir.as_ref().map(|d| d.join(EVENTS_FILE_NAME)));
        let sales = self
            .sales
            .clone()
            .or_else(|| self.data_dir.as_ref().map(|d| d.join(SALES_FILE_NAME)));

        match (events, sales) {
            (Some(e), Some(s)) => Ok((e, s)),
            (None, _) => Err(ReportError::Config(
                "no events file: pass --events or --data-dir".to_string(),
            )),
            (_, None) => Err(ReportError::Config(
                "no sales file: pass --sales or --data-dir".to_string(),
            )),
        }
    }

    /// The CSV delimiter as a byte.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ReportError::Config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )))
        }
    }

    /// `--debug` overrides the log level.
    fn apply_debug_flag(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            events: s.events.clone(),
            sales: s.sales.clone(),
            data_dir: s.data_dir.clone(),
            view: Some(s.view.clone()),
            theme: Some(s.theme.clone()),
            top: Some(s.top),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
