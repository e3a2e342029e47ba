//! Line-level building blocks shared by the dashboard and the text output.

pub mod bar_chart;
pub mod header;
pub mod indicators;
