//! Presentation layer for the portfolio report.
//!
//! Provides themes, header, KPI and bar-chart components, table and overview
//! views, the plain-text renderer, the paginated export document, and the
//! interactive dashboard built on top of [`ratatui`].

pub mod app;
pub mod components;
pub mod export;
pub mod report_view;
pub mod table_view;
pub mod text;
pub mod themes;

pub use portfolio_core as core;
