//! Core types for the portfolio report.
//!
//! Record models, column schema, cell parsing, derived metrics, number
//! formatting, error types and CLI settings shared by every other crate.

pub mod error;
pub mod formatting;
pub mod metrics;
pub mod models;
pub mod parsing;
pub mod schema;
pub mod settings;
