use crate::error::{
    Error,
    Result,
};
use std::cmp::Ordering;

/// Exponent the wider ecosystem assumes when none is configured. Token
/// registry entries carry their own precision; callers pass it through.
pub const DEFAULT_DECIMALS: u32 = 18;

/// Display precision used by the tables: whole tokens only.
pub const DEFAULT_DISPLAY_DP: usize = 0;

/// Convert a smallest-unit integer string into a display amount.
///
/// The conversion is pure digit shuffling (insert a decimal point `decimals`
/// places from the right), so amounts of any magnitude convert exactly.
/// `dp` fractional digits are kept by truncation; no rounding.
pub fn format_units(raw: &str, decimals: u32, dp: usize) -> Result<String> {
    let digits = canonical_digits(raw)?;
    let decimals = decimals as usize;

    let (int_part, frac_part) = if digits.len() <= decimals {
        let mut frac = String::with_capacity(decimals);
        for _ in 0..(decimals - digits.len()) {
            frac.push('0');
        }
        frac.push_str(&digits);
        ("0".to_string(), frac)
    } else {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    };

    if dp == 0 {
        return Ok(int_part);
    }

    let mut frac: String = frac_part.chars().take(dp).collect();
    while frac.len() < dp {
        frac.push('0');
    }
    Ok(format!("{int_part}.{frac}"))
}

/// Convert a display amount ("1.25") into a smallest-unit integer string.
///
/// Rejects anything that is not a plain non-negative decimal number and any
/// fractional part finer than `decimals`.
pub fn parse_units(display: &str, decimals: u32) -> Result<String> {
    let display = display.trim();
    if display.is_empty() {
        return Err(Error::validation("amount is empty"));
    }
    let mut parts = display.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(Error::validation("amount is empty"));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(Error::validation(format!(
            "'{display}' is not a non-negative decimal amount"
        )));
    }
    let decimals = decimals as usize;
    if frac_part.len() > decimals {
        return Err(Error::validation(format!(
            "amount '{display}' has more than {decimals} decimal places"
        )));
    }

    let mut raw = String::with_capacity(int_part.len() + decimals);
    raw.push_str(int_part);
    raw.push_str(frac_part);
    for _ in 0..(decimals - frac_part.len()) {
        raw.push('0');
    }

    let trimmed = raw.trim_start_matches('0');
    if trimmed.is_empty() {
        Ok("0".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

/// Numeric ordering of two smallest-unit strings without big-integer math:
/// canonical non-negative integers compare by length, then lexicographically.
/// Strings that are not amounts sort as zero.
pub fn cmp_amounts(a: &str, b: &str) -> Ordering {
    let a = canonical_digits(a).unwrap_or_else(|_| "0".to_string());
    let b = canonical_digits(b).unwrap_or_else(|_| "0".to_string());
    a.len().cmp(&b.len()).then_with(|| a.cmp(&b))
}

/// `true` when the wallet holds at least `needed` (both smallest-unit).
pub fn covers(balance: &str, needed: &str) -> bool {
    cmp_amounts(balance, needed) != Ordering::Less
}

fn canonical_digits(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "'{raw}' is not a smallest-unit integer amount"
        )));
    }
    let trimmed = raw.trim_start_matches('0');
    if trimmed.is_empty() {
        Ok("0".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn format_units__zero_is_zero() {
        assert_eq!(format_units("0", 18, 0).unwrap(), "0");
        assert_eq!(format_units("000", 18, 2).unwrap(), "0.00");
    }

    #[test]
    fn format_units__inserts_decimal_point() {
        // given
        let raw = "1250000000000000000";

        // when / then
        assert_eq!(format_units(raw, 18, 0).unwrap(), "1");
        assert_eq!(format_units(raw, 18, 2).unwrap(), "1.25");
        assert_eq!(format_units(raw, 18, 4).unwrap(), "1.2500");
    }

    #[test]
    fn format_units__handles_amounts_far_beyond_machine_integers() {
        // given: 40 digits, well past u128
        let raw = "1234567890123456789012345678901234567890";

        // when
        let display = format_units(raw, 18, 0).unwrap();

        // then
        assert_eq!(display, "1234567890123456789012");
    }

    #[test]
    fn format_units__sub_unit_amounts_render_as_zero_point() {
        assert_eq!(format_units("5", 9, 0).unwrap(), "0");
        assert_eq!(format_units("5", 9, 9).unwrap(), "0.000000005");
    }

    #[test]
    fn format_units__rejects_non_digit_input() {
        assert!(format_units("12a3", 18, 0).unwrap_err().is_validation());
        assert!(format_units("-5", 18, 0).unwrap_err().is_validation());
        assert!(format_units("", 18, 0).unwrap_err().is_validation());
    }

    #[test]
    fn parse_units__scales_by_decimals() {
        assert_eq!(parse_units("1.25", 18).unwrap(), "1250000000000000000");
        assert_eq!(parse_units("42", 9).unwrap(), "42000000000");
        assert_eq!(parse_units(".5", 2).unwrap(), "50");
        assert_eq!(parse_units("0", 18).unwrap(), "0");
    }

    #[test]
    fn parse_units__rejects_excess_precision_and_garbage() {
        assert!(parse_units("1.123", 2).unwrap_err().is_validation());
        assert!(parse_units("1,5", 18).unwrap_err().is_validation());
        assert!(parse_units("-1", 18).unwrap_err().is_validation());
        assert!(parse_units("", 18).unwrap_err().is_validation());
        assert!(parse_units(".", 18).unwrap_err().is_validation());
    }

    #[test]
    fn cmp_amounts__orders_numerically_not_lexicographically() {
        assert_eq!(cmp_amounts("9", "10"), Ordering::Less);
        assert_eq!(cmp_amounts("0010", "10"), Ordering::Equal);
        assert_eq!(
            cmp_amounts("100000000000000000000", "99999999999999999999"),
            Ordering::Greater
        );
    }

    #[test]
    fn covers__is_inclusive() {
        assert!(covers("100", "100"));
        assert!(covers("101", "100"));
        assert!(!covers("99", "100"));
    }

    proptest! {
        #[test]
        fn format_units__is_deterministic_and_unsigned(
            raw in "[0-9]{1,60}",
            dp in 0usize..6,
        ) {
            let first = format_units(&raw, DEFAULT_DECIMALS, dp).unwrap();
            let second = format_units(&raw, DEFAULT_DECIMALS, dp).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(!first.starts_with('-'));
            prop_assert!(first.chars().all(|c| c.is_ascii_digit() || c == '.'));
        }

        #[test]
        fn parse_units__round_trips_whole_token_amounts(amount in 1u64..1_000_000) {
            let raw = parse_units(&amount.to_string(), DEFAULT_DECIMALS).unwrap();
            let display = format_units(&raw, DEFAULT_DECIMALS, 0).unwrap();
            prop_assert_eq!(display, amount.to_string());
        }
    }
}
