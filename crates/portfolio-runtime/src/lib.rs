//! Runtime layer for the portfolio report.
//!
//! Holds the interactive session state (loaded tables, client selection,
//! cached report) between the data layer and the UI.

pub mod session;

pub use portfolio_core as core;
pub use portfolio_data as data;
