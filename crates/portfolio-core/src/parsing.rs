use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::CellValue;

// ── DateParser ────────────────────────────────────────────────────────────────

/// Coerces date cells from the variety of formats found in spreadsheet
/// exports. Anything it cannot read becomes `None`; it never fails the load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateParser {
    /// Read ambiguous `NN/NN/YYYY` values as day/month instead of month/day.
    day_first: bool,
}

impl DateParser {
    pub fn new(day_first: bool) -> Self {
        Self { day_first }
    }

    /// Parse one cell.
    ///
    /// Handles:
    /// * empty / whitespace → `None`
    /// * RFC 3339 with offset (wall-clock time is kept)
    /// * ISO dates and date-times with `T` or space separators
    /// * `YYYY/MM/DD`
    /// * slash-separated dates, month-first unless built with `day_first`
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.naive_local());
        }

        const ISO_FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%d",
            "%Y/%m/%d",
        ];
        const MONTH_FIRST: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%m/%d/%Y"];
        const DAY_FIRST: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%d/%m/%Y"];

        let (preferred, fallback) = if self.day_first {
            (DAY_FIRST, MONTH_FIRST)
        } else {
            (MONTH_FIRST, DAY_FIRST)
        };

        for fmt in ISO_FORMATS.iter().chain(preferred).chain(fallback) {
            if let Some(dt) = Self::try_format(s, fmt) {
                return Some(dt);
            }
        }

        debug!("DateParser: could not parse date \"{}\"", s);
        None
    }

    fn try_format(s: &str, fmt: &str) -> Option<NaiveDateTime> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive);
        }
        // date-only patterns use NaiveDate.
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}

// ── Numeric cells ─────────────────────────────────────────────────────────────

/// Parse a monetary or percentage cell. Empty, non-numeric and non-finite
/// values become `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Infer the primitive type of a pass-through cell.
pub fn infer_cell(raw: &str) -> CellValue {
    let s = raw.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => CellValue::Float(f),
        _ => CellValue::Text(s.to_string()),
    }
}

/// Text cell: trimmed, `None` when empty.
pub fn parse_text(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Canonical form of an identifier used as a join key.
///
/// Integral floats such as `"17.0"` (what spreadsheet tools write for an
/// integer column with gaps) become `"17"`, so the same identifier matches
/// across both tables.
pub fn normalize_key(raw: &str) -> String {
    let s = raw.trim();
    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                return format!("{}", f as i64);
            }
        }
    }
    s.to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    // ── DateParser ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_iso_date() {
        let dt = DateParser::default().parse("2024-01-15").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 15));
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parse_iso_datetime_variants() {
        let parser = DateParser::default();
        for raw in [
            "2024-01-15T10:30:00",
            "2024-01-15 10:30:00",
            "2024-01-15 10:30",
            "2024-01-15T10:30:00.250",
        ] {
            let dt = parser.parse(raw).unwrap_or_else(|| panic!("failed: {raw}"));
            assert_eq!(dt.hour(), 10, "{raw}");
            assert_eq!(dt.minute(), 30, "{raw}");
        }
    }

    #[test]
    fn test_parse_rfc3339_keeps_wall_clock() {
        let dt = DateParser::default()
            .parse("2024-01-15T23:00:00-03:00")
            .unwrap();
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 23);
    }

    #[test]
    fn test_parse_zulu_suffix() {
        let dt = DateParser::default().parse("2024-02-01T08:00:00Z").unwrap();
        assert_eq!(dt.month(), 2);
    }

    #[test]
    fn test_parse_slash_month_first_by_default() {
        let dt = DateParser::default().parse("02/03/2024").unwrap();
        assert_eq!((dt.month(), dt.day()), (2, 3));
    }

    #[test]
    fn test_parse_slash_day_first() {
        let dt = DateParser::new(true).parse("02/03/2024").unwrap();
        assert_eq!((dt.month(), dt.day()), (3, 2));
    }

    #[test]
    fn test_parse_unambiguous_slash_falls_back() {
        // 25 cannot be a month, so month-first falls back to day-first.
        let dt = DateParser::default().parse("25/12/2024").unwrap();
        assert_eq!((dt.month(), dt.day()), (12, 25));
    }

    #[test]
    fn test_parse_invalid_returns_none() {
        let parser = DateParser::default();
        assert!(parser.parse("").is_none());
        assert!(parser.parse("   ").is_none());
        assert!(parser.parse("not a date").is_none());
        assert!(parser.parse("2024-13-45").is_none());
    }

    // ── numeric / text cells ──────────────────────────────────────────────────

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100"), Some(100.0));
        assert_eq!(parse_amount(" 12.5 "), Some(12.5));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn test_parse_amount_rejects_localized_separators() {
        assert_eq!(parse_amount("1234.56"), Some(1234.56));
        assert_eq!(parse_amount("1.234,56"), None);
        assert_eq!(parse_amount("1,234.56"), None);
    }

    #[test]
    fn test_infer_cell() {
        assert_eq!(infer_cell("42"), CellValue::Integer(42));
        assert_eq!(infer_cell("4.2"), CellValue::Float(4.2));
        assert_eq!(infer_cell("São Paulo"), CellValue::Text("São Paulo".into()));
        assert_eq!(infer_cell(""), CellValue::Null);
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(parse_text("  Acme "), Some("Acme".to_string()));
        assert_eq!(parse_text("   "), None);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("17.0"), "17");
        assert_eq!(normalize_key(" 17 "), "17");
        assert_eq!(normalize_key("E-1.5"), "E-1.5");
        assert_eq!(normalize_key("1.5"), "1.5");
        assert_eq!(normalize_key("EVT001"), "EVT001");
    }
}
