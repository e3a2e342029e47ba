//! Column mapping for the two input tables.
//!
//! Every logical field the pipeline reads is looked up by header name exactly
//! once, at load time. The defaults match the `bd_eventos.csv` /
//! `bd_vendas.csv` exports; a JSON file can override any subset of them.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Which of the two input sources a column or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Events,
    Sales,
}

impl TableKind {
    /// Suffix appended to a flattened column name when both tables carry a
    /// column with the same header.
    pub fn collision_suffix(self) -> &'static str {
        match self {
            TableKind::Events => "_evento",
            TableKind::Sales => "_venda",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Events => write!(f, "events"),
            TableKind::Sales => write!(f, "sales"),
        }
    }
}

/// Header names for the event table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventColumns {
    pub id: String,
    pub client: String,
    pub start_date: String,
    pub end_date: String,
    pub request_date: String,
}

impl Default for EventColumns {
    fn default() -> Self {
        Self {
            id: "id_evento".to_string(),
            client: "empresa_cliente".to_string(),
            start_date: "data_inicio".to_string(),
            end_date: "data_fim".to_string(),
            request_date: "data_solicitacao".to_string(),
        }
    }
}

impl EventColumns {
    /// Every header that must be present in the event source.
    pub fn required(&self) -> [&str; 5] {
        [
            self.id.as_str(),
            self.client.as_str(),
            self.start_date.as_str(),
            self.end_date.as_str(),
            self.request_date.as_str(),
        ]
    }
}

/// Header names for the sale table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleColumns {
    pub id: String,
    pub event_id: String,
    pub product: String,
    pub issue_date: String,
    pub start_date: String,
    pub end_date: String,
    pub billing_date: String,
    pub supplier_payment_date: String,
    pub client_receipt_date: String,
    pub markup: String,
    pub fees: String,
    pub supplier_cost: String,
    /// Optional: read when present, never required.
    pub taxes: String,
    pub commission_pct: String,
}

impl Default for SaleColumns {
    fn default() -> Self {
        Self {
            id: "id_venda".to_string(),
            event_id: "id_evento".to_string(),
            product: "produto".to_string(),
            issue_date: "data_emissao".to_string(),
            start_date: "data_inicio".to_string(),
            end_date: "data_fim".to_string(),
            billing_date: "data_faturamento".to_string(),
            supplier_payment_date: "data_pagamento_fornecedor".to_string(),
            client_receipt_date: "data_recebimento_cliente".to_string(),
            markup: "valor_markup".to_string(),
            fees: "valor_taxas".to_string(),
            supplier_cost: "valor_fornecedor".to_string(),
            taxes: "valor_impostos".to_string(),
            commission_pct: "pct_comissao".to_string(),
        }
    }
}

impl SaleColumns {
    /// Every header that must be present in the sale source.
    pub fn required(&self) -> [&str; 13] {
        [
            self.id.as_str(),
            self.event_id.as_str(),
            self.product.as_str(),
            self.issue_date.as_str(),
            self.start_date.as_str(),
            self.end_date.as_str(),
            self.billing_date.as_str(),
            self.supplier_payment_date.as_str(),
            self.client_receipt_date.as_str(),
            self.markup.as_str(),
            self.fees.as_str(),
            self.supplier_cost.as_str(),
            self.commission_pct.as_str(),
        ]
    }
}

/// Column mapping for both tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub events: EventColumns,
    pub sales: SaleColumns,
}

impl ColumnNames {
    /// Load a mapping from a JSON file. Keys absent from the file keep their
    /// default header names.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
