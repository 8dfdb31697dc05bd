// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" CSV/number handling so the
// rest of the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (this also rules out
///   `NaN` and `inf`).
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

/// Parse a year, also accepting the `2024.0` form pandas writes for
/// integer columns that once held a missing value.
pub fn parse_year(s: Option<&str>) -> Option<i32> {
    if let Some(y) = parse_i32_safe(s) {
        return Some(y);
    }
    let f = parse_f64_safe(s)?;
    if f.fract() == 0.0 && f.abs() < i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Parse a whole, non-negative count such as a number of workers.
pub fn parse_count(s: Option<&str>) -> Option<u32> {
    let f = parse_f64_safe(s)?;
    if f < 0.0 || f.fract() != 0.0 || f > u32::MAX as f64 {
        return None;
    }
    Some(f as u32)
}

/// Parse a yes/no column into an adoption rate of `1.0` or `0.0`.
///
/// `Ok(None)` means the cell was empty; `Err` carries the offending text.
pub fn parse_yes_no(s: Option<&str>) -> Result<Option<f64>, String> {
    let Some(s) = s.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match s.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(Some(1.0)),
        "no" | "n" | "false" | "0" => Ok(Some(0.0)),
        _ => Err(s.to_string()),
    }
}

/// Trimmed text, `None` when blank.
pub fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn median(v: Vec<f64>) -> f64 {
    quantile(v, 0.5)
}

/// Quantile by linear interpolation between closest ranks, the same
/// convention spreadsheet tools and pandas use by default.
///
/// Takes the `Vec` by value so it can be sorted in place. Returns 0 for an
/// empty input.
pub fn quantile(mut v: Vec<f64>, q: f64) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q.clamp(0.0, 1.0) * (v.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return v[lo];
    }
    v[lo] + (v[hi] - v[lo]) * (pos - lo as f64)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let Ok(int_val) = int_part.parse::<i64>() else {
        // Past i64 range: keep every digit, without separators.
        return format!("{:.*}", decimals, n);
    };
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `1,204 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_handles_separators_and_text() {
        assert_eq!(parse_f64_safe(Some(" 1,250.5 ")), Some(1250.5));
        assert_eq!(parse_f64_safe(Some("12 kg")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parse_year_accepts_float_form() {
        assert_eq!(parse_year(Some("2023")), Some(2023));
        assert_eq!(parse_year(Some("2023.0")), Some(2023));
        assert_eq!(parse_year(Some("2023.5")), None);
    }

    #[test]
    fn parse_count_rejects_fractions_and_negatives() {
        assert_eq!(parse_count(Some("20")), Some(20));
        assert_eq!(parse_count(Some("20.0")), Some(20));
        assert_eq!(parse_count(Some("2.5")), None);
        assert_eq!(parse_count(Some("-1")), None);
    }

    #[test]
    fn parse_yes_no_variants() {
        assert_eq!(parse_yes_no(Some("Yes")), Ok(Some(1.0)));
        assert_eq!(parse_yes_no(Some("false")), Ok(Some(0.0)));
        assert_eq!(parse_yes_no(Some("  ")), Ok(None));
        assert_eq!(parse_yes_no(Some("maybe")), Err("maybe".to_string()));
    }

    #[test]
    fn quantiles_interpolate() {
        let v = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(v.clone()), 2.5);
        assert_eq!(quantile(v.clone(), 0.25), 1.75);
        assert_eq!(quantile(v.clone(), 0.75), 3.25);
        assert_eq!(quantile(v, 1.0), 4.0);
        assert_eq!(median(vec![]), 0.0);
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_int(9855), "9,855");
    }

    #[test]
    fn format_number_keeps_huge_values() {
        assert_eq!(format_number(1e20, 0), "100000000000000000000");
        assert_eq!(format_number(-1e20, 1), "-100000000000000000000.0");
        assert_eq!(format_number(f64::INFINITY, 1), "inf");
    }
}
