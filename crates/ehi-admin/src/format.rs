//! Display formatting for record fields.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::store::Record;

/// Formats an ISO date (`2025-03-28`) or RFC 3339 timestamp as `Mar 28, 2025`.
///
/// Anything else is returned unchanged.
#[must_use]
pub fn format_date(input: &str) -> String {
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|d| d.date_naive()));
    match date {
        Some(date) => date.format("%b %-d, %Y").to_string(),
        None => input.to_string(),
    }
}

/// Formats an amount with thousands separators and two decimals.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

/// Copy of `record` with its `date` and `amount` fields formatted for display.
#[must_use]
pub fn display_record(record: &Record) -> Record {
    let mut out = record.clone();
    if let Some(Value::String(date)) = record.get("date") {
        out.insert("date".into(), Value::String(format_date(date)));
    }
    if let Some(amount) = record.get("amount").and_then(Value::as_f64) {
        out.insert("amount".into(), Value::String(format_amount(amount)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2025-03-28"), "Mar 28, 2025");
        assert_eq!(format_date("2024-11-05T09:30:00Z"), "Nov 5, 2024");
        assert_eq!(format_date("last tuesday"), "last tuesday");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(950.5), "950.50");
        assert_eq!(format_amount(12_500.0), "12,500.00");
        assert_eq!(format_amount(1_234_567.891), "1,234,567.89");
        assert_eq!(format_amount(-4200.0), "-4,200.00");
    }

    #[test]
    fn test_display_record() {
        let record = json!({"id": 1, "date": "2025-01-09", "amount": 1500, "name": "Rice"});
        let shown = display_record(record.as_object().unwrap());
        assert_eq!(shown["date"], "Jan 9, 2025");
        assert_eq!(shown["amount"], "1,500.00");
        assert_eq!(shown["name"], "Rice");
        assert_eq!(shown["id"], 1);
    }
}
