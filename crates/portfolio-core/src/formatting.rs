//! Number and money formatting shared by the terminal views and the export
//! documents.

use crate::models::YearMonth;

/// Prefix for every monetary amount.
pub const CURRENCY_SYMBOL: &str = "R$";

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use portfolio_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge exact binary midpoints (1.005 is stored as 1.00499…) upwards.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let fixed = format!("{:.prec$}", rounded, prec = decimals as usize);
    let (int_digits, frac_digits) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    if negative && rounded != 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(int_digits));
    if let Some(frac) = frac_digits {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a monetary amount: currency symbol, thousands separators, two
/// decimals.
///
/// # Examples
///
/// ```
/// use portfolio_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56), "R$ 1,234.56");
/// assert_eq!(format_currency(0.0),     "R$ 0.00");
/// assert_eq!(format_currency(-9.99),   "R$ -9.99");
/// ```
pub fn format_currency(amount: f64) -> String {
    format!("{} {}", CURRENCY_SYMBOL, format_number(amount, 2))
}

/// Short label for chart bars: `950`, `1.2k`, `3.4M`, `1.1B`.
///
/// # Examples
///
/// ```
/// use portfolio_core::formatting::format_compact;
///
/// assert_eq!(format_compact(950.0), "950");
/// assert_eq!(format_compact(1_250.0), "1.3k");
/// assert_eq!(format_compact(-3_400_000.0), "-3.4M");
/// ```
pub fn format_compact(value: f64) -> String {
    const UNITS: &[(f64, &str)] = &[(1e9, "B"), (1e6, "M"), (1e3, "k")];

    let abs_value = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };
    for (scale, suffix) in UNITS {
        if abs_value >= *scale {
            return format!("{}{}{}", sign, format_number(abs_value / scale, 1), suffix);
        }
    }
    format!("{}{}", sign, format_number(abs_value, 0))
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

/// Label for a billing-month group; the null group reads "No billing date".
pub fn format_month(month: Option<YearMonth>) -> String {
    match month {
        Some(m) => m.to_string(),
        None => "No billing date".to_string(),
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
