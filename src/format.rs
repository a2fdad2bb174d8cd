//! Number and date formatting shared by the CLI tables and both renderers.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::money;

pub fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

/// Two decimals with thousands grouping: `1234.5` -> `1,234.50`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = format!("{:.2}", money::round(value));
    let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let negative = whole.starts_with('-');
    let digits = whole.trim_start_matches('-');
    let grouped = format_grouped_int(digits.parse::<i64>().unwrap_or(0));

    if negative && (grouped != "0" || frac != "00") {
        format!("-{}.{}", grouped, frac)
    } else {
        format!("{}.{}", grouped, frac)
    }
}

pub fn format_money(value: Decimal, currency_symbol: &str) -> String {
    format!("{} {}", currency_symbol, format_amount(value))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn format_datetime(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

/// Date cell text; an absent value renders as `-`.
pub fn format_optional_date(at: Option<NaiveDateTime>) -> String {
    match at {
        Some(at) => format_date(at.date()),
        None => "-".to_string(),
    }
}
