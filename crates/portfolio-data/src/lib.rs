//! Data layer for the portfolio report.
//!
//! Loads the event and sale CSV exports, joins sales onto events, derives
//! the per-sale metrics, filters by client and aggregates the result into
//! the client, product and monthly views.

pub mod aggregator;
pub mod filter;
pub mod join;
pub mod loader;
pub mod pipeline;

pub use portfolio_core as core;
