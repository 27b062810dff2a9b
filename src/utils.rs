use crate::error::{ConsolidationError, Result};
use chrono::{Datelike, Days, NaiveDate};

/// Shown wherever a ratio has no defined value.
pub const PLACEHOLDER: &str = "—";

/// Indian fiscal years end in March.
pub const FISCAL_YEAR_END_MONTH: u32 = 3;

/// Formats rupees with Indian digit grouping (lakhs and crores), rounded to
/// the nearest rupee: `14961990.0` becomes `₹1,49,61,990`.
pub fn format_inr(amount: f64) -> String {
    if !amount.is_finite() {
        return PLACEHOLDER.to_string();
    }

    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());

    format!("{}₹{}", sign, group_indian(&digits))
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// `7.5` becomes `7.50%`; `None` becomes the placeholder.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v),
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => PLACEHOLDER.to_string(),
    }
}

/// `None` when the month falls outside chrono's representable range.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

/// The year in which the fiscal year containing `date` starts.
pub fn fiscal_year_start_year(date: NaiveDate) -> i32 {
    if date.month() > FISCAL_YEAR_END_MONTH {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Fiscal-year label such as `2024-25` for any date from April 2024 to March 2025.
pub fn fiscal_year_label(date: NaiveDate) -> String {
    let start = fiscal_year_start_year(date);
    format!("{}-{:02}", start, (start + 1).rem_euclid(100))
}

/// Parses a label like `2024-25` (or `2024-2025`) into its first and last day.
pub fn parse_fiscal_year_label(label: &str) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || ConsolidationError::InvalidFiscalYear(label.to_string());

    let (start_str, end_str) = label.trim().split_once('-').ok_or_else(invalid)?;
    let start_year: i32 = start_str.trim().parse().map_err(|_| invalid())?;
    let end_suffix: i32 = end_str.trim().parse().map_err(|_| invalid())?;

    let expected_end = start_year.checked_add(1).ok_or_else(invalid)?;
    let matches = match end_str.trim().len() {
        2 => end_suffix == expected_end.rem_euclid(100),
        4 => end_suffix == expected_end,
        _ => false,
    };
    if !matches {
        return Err(invalid());
    }

    let start =
        NaiveDate::from_ymd_opt(start_year, FISCAL_YEAR_END_MONTH + 1, 1).ok_or_else(invalid)?;
    let end = last_day_of_month(expected_end, FISCAL_YEAR_END_MONTH).ok_or_else(invalid)?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_inr_uses_indian_grouping() {
        assert_eq!(format_inr(0.0), "₹0");
        assert_eq!(format_inr(999.0), "₹999");
        assert_eq!(format_inr(1000.0), "₹1,000");
        assert_eq!(format_inr(100000.0), "₹1,00,000");
        assert_eq!(format_inr(149_961_990.0), "₹14,99,61,990");
        assert_eq!(format_inr(-346_269.4), "-₹3,46,269");
        assert_eq!(format_inr(f64::NAN), PLACEHOLDER);
    }

    #[test]
    fn test_format_percent_and_ratio() {
        assert_eq!(format_percent(Some(7.5)), "7.50%");
        assert_eq!(format_percent(None), PLACEHOLDER);
        assert_eq!(format_percent(Some(f64::INFINITY)), PLACEHOLDER);
        assert_eq!(format_ratio(Some(2.0)), "2.00");
        assert_eq!(format_ratio(None), PLACEHOLDER);
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2024, 2), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(last_day_of_month(2025, 3), NaiveDate::from_ymd_opt(2025, 3, 31));
        assert_eq!(last_day_of_month(2024, 12), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(last_day_of_month(i32::MAX, 12), None);
    }

    #[test]
    fn test_fiscal_year_label() {
        let april = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let march = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let december_1999 = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();

        assert_eq!(fiscal_year_label(april), "2024-25");
        assert_eq!(fiscal_year_label(march), "2024-25");
        assert_eq!(fiscal_year_label(december_1999), "1999-00");
    }

    #[test]
    fn test_parse_fiscal_year_label() {
        let (start, end) = parse_fiscal_year_label("2024-25").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());

        assert!(parse_fiscal_year_label("2024-2025").is_ok());
        assert!(parse_fiscal_year_label("2024-26").is_err());
        assert!(parse_fiscal_year_label("FY24").is_err());
    }

    #[test]
    fn test_parse_fiscal_year_label_out_of_range() {
        assert!(matches!(
            parse_fiscal_year_label("2147483647-48"),
            Err(ConsolidationError::InvalidFiscalYear(_))
        ));
        assert!(parse_fiscal_year_label("-2147483648-47").is_err());
    }
}
