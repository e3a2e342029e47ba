use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::metrics::DerivedMetrics;

/// A pass-through cell whose primitive type was inferred from its text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty cell.
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Columns of a source that the pipeline does not interpret, in header order.
pub type ExtraCells = Vec<(String, CellValue)>;

/// A calendar month, ordered chronologically. Displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of the event table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// 1-based position of the row among the data rows of its source.
    pub row: usize,
    /// Event identifier; unique within the table.
    pub id: String,
    /// Client company that owns the event.
    pub client: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    /// When the client requested the event.
    pub request_date: Option<NaiveDateTime>,
    /// Remaining descriptive columns.
    pub extra: ExtraCells,
}

/// One row of the sale table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRecord {
    /// 1-based position of the row among the data rows of its source.
    pub row: usize,
    /// Sale identifier.
    pub id: String,
    /// Foreign key to [`EventRecord::id`]; may reference no event.
    pub event_id: String,
    pub product: Option<String>,
    pub issue_date: Option<NaiveDateTime>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub billing_date: Option<NaiveDateTime>,
    pub supplier_payment_date: Option<NaiveDateTime>,
    pub client_receipt_date: Option<NaiveDateTime>,
    /// Markup charged to the client.
    pub markup: Option<f64>,
    /// Fees charged to the client.
    pub fees: Option<f64>,
    /// Amount owed to the supplier.
    pub supplier_cost: Option<f64>,
    /// Taxes, when the source carries the column.
    pub taxes: Option<f64>,
    /// Commission as a percentage in `[0, 100]`.
    pub commission_pct: Option<f64>,
    /// Remaining columns.
    pub extra: ExtraCells,
}

/// A loaded table: its header row plus typed records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table<R> {
    pub headers: Vec<String>,
    pub records: Vec<R>,
}

impl<R> Table<R> {
    pub fn new(headers: Vec<String>, records: Vec<R>) -> Self {
        Self { headers, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub type EventTable = Table<EventRecord>;
pub type SaleTable = Table<SaleRecord>;

/// A sale joined with its event (if any) and carrying the derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub sale: SaleRecord,
    /// `None` when the sale references an unknown event.
    pub event: Option<EventRecord>,
    pub metrics: DerivedMetrics,
    /// Month of [`SaleRecord::billing_date`].
    pub billing_month: Option<YearMonth>,
}

impl EnrichedRecord {
    /// Client of the matched event; `None` for unmatched sales or blank cells.
    pub fn client(&self) -> Option<&str> {
        self.event.as_ref().and_then(|e| e.client.as_deref())
    }

    /// The sale's event reference, `None` when blank.
    pub fn event_id(&self) -> Option<&str> {
        non_empty(&self.sale.event_id)
    }

    pub fn sale_id(&self) -> Option<&str> {
        non_empty(&self.sale.id)
    }

    pub fn product(&self) -> Option<&str> {
        self.sale.product.as_deref()
    }

    /// `true` when the sale found its event.
    pub fn is_matched(&self) -> bool {
        self.event.is_some()
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
