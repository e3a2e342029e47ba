//! CSV loading for the event and sale exports.
//!
//! Each source is read fully into memory. Headers are resolved once into
//! column indices; date columns go through [`DateParser`] and monetary
//! columns through [`parse_amount`], so a bad cell becomes `None` instead of
//! failing the load. Only an unreadable file or a missing required column is
//! fatal.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::StringRecord;
use portfolio_core::error::{ReportError, Result};
use portfolio_core::models::{EventRecord, EventTable, ExtraCells, SaleRecord, SaleTable};
use portfolio_core::parsing::{infer_cell, normalize_key, parse_amount, parse_text, DateParser};
use portfolio_core::schema::{ColumnNames, TableKind};
use tracing::{debug, warn};

/// Everything that controls how the two sources are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub columns: ColumnNames,
    pub date_parser: DateParser,
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            date_parser: DateParser::default(),
            delimiter: b',',
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the event table from a CSV file.
pub fn load_events(path: &Path, options: &LoadOptions) -> Result<EventTable> {
    let table = read_events(open(path)?, options)?;
    debug!("Loaded {} events from {}", table.len(), path.display());
    Ok(table)
}

/// Load the sale table from a CSV file.
pub fn load_sales(path: &Path, options: &LoadOptions) -> Result<SaleTable> {
    let table = read_sales(open(path)?, options)?;
    debug!("Loaded {} sales from {}", table.len(), path.display());
    Ok(table)
}

/// Parse an event table from any CSV byte stream.
pub fn read_events<R: Read>(source: R, options: &LoadOptions) -> Result<EventTable> {
    let table = TableKind::Events;
    let cols = &options.columns.events;
    let mut reader = csv_reader(source, options.delimiter);
    let index = HeaderIndex::from_reader(&mut reader, table)?;

    let id = index.required(table, &cols.id)?;
    let client = index.required(table, &cols.client)?;
    let start = index.required(table, &cols.start_date)?;
    let end = index.required(table, &cols.end_date)?;
    let request = index.required(table, &cols.request_date)?;
    let extras = index.remaining(&[id, client, start, end, request]);

    let mut log = CoercionLog::new(table);
    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|source| ReportError::Csv { table, source })?;
        let row = i + 1;
        index.check_width(table, row, &record);

        let mut date = |col: usize| log.date(&options.date_parser, &index, &record, col, row);
        let start_date = date(start);
        let end_date = date(end);
        let request_date = date(request);

        records.push(EventRecord {
            row,
            id: normalize_key(cell(&record, id)),
            client: parse_text(cell(&record, client)),
            start_date,
            end_date,
            request_date,
            extra: extra_cells(&index, &record, &extras),
        });
    }

    log.report();
    Ok(EventTable::new(index.headers, records))
}

/// Parse a sale table from any CSV byte stream.
pub fn read_sales<R: Read>(source: R, options: &LoadOptions) -> Result<SaleTable> {
    let table = TableKind::Sales;
    let cols = &options.columns.sales;
    let mut reader = csv_reader(source, options.delimiter);
    let index = HeaderIndex::from_reader(&mut reader, table)?;

    let id = index.required(table, &cols.id)?;
    let event_id = index.required(table, &cols.event_id)?;
    let product = index.required(table, &cols.product)?;
    let issue = index.required(table, &cols.issue_date)?;
    let start = index.required(table, &cols.start_date)?;
    let end = index.required(table, &cols.end_date)?;
    let billing = index.required(table, &cols.billing_date)?;
    let supplier_payment = index.required(table, &cols.supplier_payment_date)?;
    let client_receipt = index.required(table, &cols.client_receipt_date)?;
    let markup = index.required(table, &cols.markup)?;
    let fees = index.required(table, &cols.fees)?;
    let supplier_cost = index.required(table, &cols.supplier_cost)?;
    let commission_pct = index.required(table, &cols.commission_pct)?;
    let taxes = index.optional(&cols.taxes);

    let mut consumed = vec![
        id,
        event_id,
        product,
        issue,
        start,
        end,
        billing,
        supplier_payment,
        client_receipt,
        markup,
        fees,
        supplier_cost,
        commission_pct,
    ];
    consumed.extend(taxes);
    let extras = index.remaining(&consumed);

    let mut log = CoercionLog::new(table);
    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|source| ReportError::Csv { table, source })?;
        let row = i + 1;
        index.check_width(table, row, &record);

        let parser = &options.date_parser;
        let issue_date = log.date(parser, &index, &record, issue, row);
        let start_date = log.date(parser, &index, &record, start, row);
        let end_date = log.date(parser, &index, &record, end, row);
        let billing_date = log.date(parser, &index, &record, billing, row);
        let supplier_payment_date = log.date(parser, &index, &record, supplier_payment, row);
        let client_receipt_date = log.date(parser, &index, &record, client_receipt, row);

        records.push(SaleRecord {
            row,
            id: normalize_key(cell(&record, id)),
            event_id: normalize_key(cell(&record, event_id)),
            product: parse_text(cell(&record, product)),
            issue_date,
            start_date,
            end_date,
            billing_date,
            supplier_payment_date,
            client_receipt_date,
            markup: log.amount(&index, &record, markup, row),
            fees: log.amount(&index, &record, fees, row),
            supplier_cost: log.amount(&index, &record, supplier_cost, row),
            taxes: taxes.and_then(|col| log.amount(&index, &record, col, row)),
            commission_pct: log.amount(&index, &record, commission_pct, row),
            extra: extra_cells(&index, &record, &extras),
        });
    }

    log.report();
    Ok(SaleTable::new(index.headers, records))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| ReportError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_reader<R: Read>(source: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source)
}

/// The cell at `col`, empty when the row is short.
fn cell(record: &StringRecord, col: usize) -> &str {
    record.get(col).unwrap_or("")
}

fn extra_cells(index: &HeaderIndex, record: &StringRecord, extras: &[usize]) -> ExtraCells {
    extras
        .iter()
        .map(|&col| (index.headers[col].clone(), infer_cell(cell(record, col))))
        .collect()
}

/// Header names of one source and the position of each.
struct HeaderIndex {
    headers: Vec<String>,
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    fn from_reader<R: Read>(reader: &mut csv::Reader<R>, table: TableKind) -> Result<Self> {
        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| ReportError::Csv { table, source })?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        // A repeated header resolves to its first occurrence; the rest are
        // kept as extra cells.
        let mut positions = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            positions.entry(h.clone()).or_insert(i);
        }

        Ok(Self { headers, positions })
    }

    fn required(&self, table: TableKind, name: &str) -> Result<usize> {
        self.optional(name).ok_or_else(|| ReportError::MissingColumn {
            table,
            column: name.to_string(),
        })
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Indices of every column not in `consumed`, in header order.
    fn remaining(&self, consumed: &[usize]) -> Vec<usize> {
        let consumed: HashSet<usize> = consumed.iter().copied().collect();
        (0..self.headers.len())
            .filter(|i| !consumed.contains(i))
            .collect()
    }

    fn check_width(&self, table: TableKind, row: usize, record: &StringRecord) {
        if record.len() != self.headers.len() {
            warn!(
                "{} row {} has {} fields, header has {}",
                table,
                row,
                record.len(),
                self.headers.len()
            );
        }
    }
}

/// Per-column tally of non-empty cells that could not be read, reported
/// once per load instead of once per cell.
struct CoercionLog {
    table: TableKind,
    /// column → (count, first row)
    dates: BTreeMap<String, (usize, usize)>,
    amounts: BTreeMap<String, (usize, usize)>,
}

impl CoercionLog {
    fn new(table: TableKind) -> Self {
        Self {
            table,
            dates: BTreeMap::new(),
            amounts: BTreeMap::new(),
        }
    }

    fn date(
        &mut self,
        parser: &DateParser,
        index: &HeaderIndex,
        record: &StringRecord,
        col: usize,
        row: usize,
    ) -> Option<NaiveDateTime> {
        let raw = cell(record, col);
        let parsed = parser.parse(raw);
        if parsed.is_none() && !raw.is_empty() {
            Self::note(&mut self.dates, &index.headers[col], row);
        }
        parsed
    }

    fn amount(
        &mut self,
        index: &HeaderIndex,
        record: &StringRecord,
        col: usize,
        row: usize,
    ) -> Option<f64> {
        let raw = cell(record, col);
        let parsed = parse_amount(raw);
        if parsed.is_none() && !raw.is_empty() {
            Self::note(&mut self.amounts, &index.headers[col], row);
        }
        parsed
    }

    fn note(tally: &mut BTreeMap<String, (usize, usize)>, column: &str, row: usize) {
        tally
            .entry(column.to_string())
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, row));
    }

    fn report(&self) {
        for (column, (count, first_row)) in &self.dates {
            debug!(
                "{}: {} unparseable dates in \"{}\" set to null (first at row {})",
                self.table, count, column, first_row
            );
        }
        for (column, (count, first_row)) in &self.amounts {
            warn!(
                table = %self.table,
                column = %column,
                count,
                first_row,
                "non-numeric amounts set to null"
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use portfolio_core::models::CellValue;
    use std::io::Write;
    use tempfile::TempDir;

    const EVENTS_CSV: &str = "\
id_evento,empresa_cliente,data_inicio,data_fim,data_solicitacao,cidade
E1,Acme,2024-01-10,2024-01-12,2023-12-01,Recife
E2,Globex,2024-02-01,not a date,,Natal
";

    const SALES_CSV: &str = "\
id_venda,id_evento,produto,data_emissao,data_inicio,data_fim,data_faturamento,data_pagamento_fornecedor,data_recebimento_cliente,valor_markup,valor_taxas,valor_fornecedor,pct_comissao,canal
S1,E1,Hotel,2024-01-01,2024-01-10,2024-01-12,2024-01-15,2024-01-20,2024-01-25,100,10,60,10,web
S2,E1,Aereo,2024-01-01,2024-01-10,2024-01-12,garbage,,,50,5,20,10,
";

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    // ── events ────────────────────────────────────────────────────────────────

    #[test]
    fn test_read_events_basic() {
        let table = read_events(EVENTS_CSV.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.headers.len(), 6);

        let e1 = &table.records[0];
        assert_eq!(e1.row, 1);
        assert_eq!(e1.id, "E1");
        assert_eq!(e1.client.as_deref(), Some("Acme"));
        assert_eq!(e1.start_date.unwrap().day(), 10);
        assert_eq!(
            e1.extra,
            vec![("cidade".to_string(), CellValue::Text("Recife".into()))]
        );
    }

    #[test]
    fn test_read_events_invalid_date_becomes_null() {
        let table = read_events(EVENTS_CSV.as_bytes(), &LoadOptions::default()).unwrap();
        let e2 = &table.records[1];
        assert!(e2.start_date.is_some());
        assert!(e2.end_date.is_none());
        assert!(e2.request_date.is_none());
    }

    #[test]
    fn test_read_events_missing_column() {
        let csv = "id_evento,data_inicio,data_fim,data_solicitacao\nE1,,,\n";
        let err = read_events(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        match err {
            ReportError::MissingColumn { table, column } => {
                assert_eq!(table, TableKind::Events);
                assert_eq!(column, "empresa_cliente");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_events_header_only() {
        let csv = "id_evento,empresa_cliente,data_inicio,data_fim,data_solicitacao\n";
        let table = read_events(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_read_events_strips_bom_and_normalizes_ids() {
        let csv = "\u{feff}id_evento,empresa_cliente,data_inicio,data_fim,data_solicitacao\n17.0,Acme,,,\n";
        let table = read_events(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.records[0].id, "17");
    }

    #[test]
    fn test_read_events_custom_columns_and_delimiter() {
        let mut options = LoadOptions {
            delimiter: b';',
            ..LoadOptions::default()
        };
        options.columns.events.client = "cliente".to_string();
        let csv = "id_evento;cliente;data_inicio;data_fim;data_solicitacao\nE1;Acme;;;\n";

        let table = read_events(csv.as_bytes(), &options).unwrap();
        assert_eq!(table.records[0].client.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_read_events_day_first() {
        let csv = "id_evento,empresa_cliente,data_inicio,data_fim,data_solicitacao\nE1,Acme,02/03/2024,,\n";
        let options = LoadOptions {
            date_parser: DateParser::new(true),
            ..LoadOptions::default()
        };
        let table = read_events(csv.as_bytes(), &options).unwrap();
        assert_eq!(table.records[0].start_date.unwrap().month(), 3);
    }

    // ── sales ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_read_sales_basic() {
        let table = read_sales(SALES_CSV.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);

        let s1 = &table.records[0];
        assert_eq!(s1.id, "S1");
        assert_eq!(s1.event_id, "E1");
        assert_eq!(s1.product.as_deref(), Some("Hotel"));
        assert_eq!(s1.markup, Some(100.0));
        assert_eq!(s1.fees, Some(10.0));
        assert_eq!(s1.supplier_cost, Some(60.0));
        assert_eq!(s1.commission_pct, Some(10.0));
        assert_eq!(s1.taxes, None);
        assert_eq!(s1.billing_date.unwrap().month(), 1);
        assert_eq!(
            s1.extra,
            vec![("canal".to_string(), CellValue::Text("web".into()))]
        );
    }

    #[test]
    fn test_read_sales_invalid_billing_date_kept_as_null() {
        let table = read_sales(SALES_CSV.as_bytes(), &LoadOptions::default()).unwrap();
        let s2 = &table.records[1];
        assert!(s2.billing_date.is_none());
        assert!(s2.supplier_payment_date.is_none());
        assert_eq!(s2.markup, Some(50.0));
        assert_eq!(s2.extra[0].1, CellValue::Null);
    }

    #[test]
    fn test_read_sales_optional_taxes_column() {
        let csv = "\
id_venda,id_evento,produto,data_emissao,data_inicio,data_fim,data_faturamento,data_pagamento_fornecedor,data_recebimento_cliente,valor_markup,valor_taxas,valor_fornecedor,pct_comissao,valor_impostos
S1,E1,Hotel,,,,,,,100,10,60,10,7.5
";
        let table = read_sales(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.records[0].taxes, Some(7.5));
        assert!(table.records[0].extra.is_empty());
    }

    #[test]
    fn test_read_sales_non_numeric_amount_is_null() {
        let csv = "\
id_venda,id_evento,produto,data_emissao,data_inicio,data_fim,data_faturamento,data_pagamento_fornecedor,data_recebimento_cliente,valor_markup,valor_taxas,valor_fornecedor,pct_comissao
S1,E1,Hotel,,,,,,,abc,,60,10
";
        let table = read_sales(csv.as_bytes(), &LoadOptions::default()).unwrap();
        let s1 = &table.records[0];
        assert_eq!(s1.markup, None);
        assert_eq!(s1.fees, None);
        assert_eq!(s1.supplier_cost, Some(60.0));
    }

    #[test]
    fn test_read_sales_short_row_fills_nulls() {
        let csv = "\
id_venda,id_evento,produto,data_emissao,data_inicio,data_fim,data_faturamento,data_pagamento_fornecedor,data_recebimento_cliente,valor_markup,valor_taxas,valor_fornecedor,pct_comissao
S1,E1,Hotel
";
        let table = read_sales(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.records[0].product.as_deref(), Some("Hotel"));
        assert_eq!(table.records[0].commission_pct, None);
    }

    #[test]
    fn test_read_sales_missing_column_names_source() {
        let csv = "id_venda,id_evento\nS1,E1\n";
        let err = read_sales(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("sales"));
        assert!(err.to_string().contains("produto"));
    }

    // ── files ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_load_from_files() {
        let dir = TempDir::new().unwrap();
        let events = write_file(dir.path(), "bd_eventos.csv", EVENTS_CSV);
        let sales = write_file(dir.path(), "bd_vendas.csv", SALES_CSV);

        let options = LoadOptions::default();
        assert_eq!(load_events(&events, &options).unwrap().len(), 2);
        assert_eq!(load_sales(&sales, &options).unwrap().len(), 2);
    }

    #[test]
    fn test_load_missing_file_is_file_read_error() {
        let dir = TempDir::new().unwrap();
        let err = load_events(&dir.path().join("nope.csv"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ReportError::FileRead { .. }));
    }
}
