//! Monetary value normalization
//!
//! Dashboards render amounts as display text (`$1,234.56`, `N/A`, empty
//! cells). Records keep display strings; these helpers turn them into
//! summable numbers and back.

use crate::constants::CURRENCY_SYMBOL;

/// Convert a display token to a number, falling back to zero.
///
/// Keeps digits, decimal points and a leading minus sign, then parses.
/// Never fails: empty or malformed input yields `0.0`.
pub fn to_amount(token: &str) -> f64 {
    let mut cleaned = String::with_capacity(token.len());
    for ch in token.chars() {
        match ch {
            '0'..='9' | '.' => cleaned.push(ch),
            '-' if cleaned.is_empty() => cleaned.push(ch),
            _ => {}
        }
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Currency symbol written before the first digit of a token.
///
/// `"£1.00"` gives `Some("£")`. Tokens without a digit (`N/A`) or without a
/// prefix (`0.00`) give `None`.
pub fn currency_prefix(token: &str) -> Option<&str> {
    let trimmed = token.trim_start();
    let end = trimmed.find(|c: char| c.is_ascii_digit() || c == '-' || c == '.')?;
    if !trimmed[end..].chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(trimmed[..end].trim_end()).filter(|prefix| !prefix.is_empty())
}

/// Format an amount with two decimals behind `symbol` (which may be empty)
pub fn format_amount(amount: f64, symbol: &str) -> String {
    let digits = format!("{:.2}", amount.abs());
    if amount < 0.0 && digits != "0.00" {
        format!("-{}{}", symbol, digits)
    } else {
        format!("{}{}", symbol, digits)
    }
}

/// Format a USD amount
pub fn format_usd(amount: f64) -> String {
    format_amount(amount, CURRENCY_SYMBOL)
}

/// Sum display tokens using [`to_amount`]
pub fn sum_amounts<'a, I>(tokens: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    tokens.into_iter().map(to_amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_amount_strips_currency_and_separators() {
        assert_eq!(to_amount("$1,234.56"), 1234.56);
        assert_eq!(to_amount("  $0.79 "), 0.79);
        assert_eq!(to_amount("€12"), 12.0);
    }

    #[test]
    fn test_to_amount_falls_back_to_zero() {
        assert_eq!(to_amount(""), 0.0);
        assert_eq!(to_amount("N/A"), 0.0);
        assert_eq!(to_amount("-"), 0.0);
        assert_eq!(to_amount("1.2.3"), 0.0);
        assert_eq!(to_amount("."), 0.0);
    }

    #[test]
    fn test_to_amount_negative() {
        assert_eq!(to_amount("-$5.25"), -5.25);
        assert_eq!(to_amount("$-5.25"), -5.25);
        // Only a leading minus counts
        assert_eq!(to_amount("5-25"), 525.0);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(3.5), "$3.50");
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(1234.567), "$1234.57");
        assert_eq!(format_usd(-1.0), "-$1.00");
        assert_eq!(format_usd(-0.001), "$0.00");
    }

    #[test]
    fn test_currency_prefix() {
        assert_eq!(currency_prefix("£1.00"), Some("£"));
        assert_eq!(currency_prefix(" $1,234.56"), Some("$"));
        assert_eq!(currency_prefix("CA$ 12"), Some("CA$"));
        assert_eq!(currency_prefix("0.00"), None);
        assert_eq!(currency_prefix("N/A"), None);
        assert_eq!(currency_prefix(""), None);
    }

    #[test]
    fn test_format_amount_keeps_symbol() {
        assert_eq!(format_amount(3.5, "£"), "£3.50");
        assert_eq!(format_amount(-2.0, "€"), "-€2.00");
        assert_eq!(format_amount(7.0, ""), "7.00");
    }

    #[test]
    fn test_sum_amounts() {
        assert_eq!(format_usd(sum_amounts(["$1.00", "$2.50"])), "$3.50");
        assert_eq!(sum_amounts(["N/A", "$4.00", ""]), 4.0);
    }
}
