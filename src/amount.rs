//! Exact decimal-string formatting for balances, prices and sizes
//!
//! Amounts arrive as decimal strings (wallet balances, token prices) and are
//! rounded digit by digit. Nothing in this module converts an amount to a
//! binary float, so values with more significant digits than an `f64` can
//! hold still round exactly.

use std::fmt;

/// Default number of fractional digits shown for wallet balances.
pub const BALANCE_DECIMALS: usize = 4;

/// A signed decimal number held as two digit arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalAmount {
    negative: bool,
    whole: Vec<u8>,
    fraction: Vec<u8>,
}

impl DecimalAmount {
    /// Parse a decimal string. Characters other than ASCII digits are skipped,
    /// so malformed input degrades to a best-effort value instead of failing.
    ///
    /// Exponent notation (`1e-7`, `2.5E3`) is expanded into plain digits.
    pub fn parse(input: &str) -> Self {
        let (negative, unsigned) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };

        let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => (mantissa, parse_exponent(exponent)),
            None => (unsigned, 0),
        };

        let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));

        Self {
            negative,
            whole: to_digits(whole),
            fraction: to_digits(fraction),
        }
        .shift(exponent)
    }

    /// Move the decimal point `places` digits to the right (left when negative).
    fn shift(mut self, places: i32) -> Self {
        if places == 0 {
            return self;
        }

        let point = self.whole.len() as i64 + i64::from(places);
        let mut digits = std::mem::take(&mut self.whole);
        digits.append(&mut self.fraction);

        if point <= 0 {
            self.fraction = vec![0; point.unsigned_abs() as usize];
            self.fraction.extend(digits);
        } else if point as usize >= digits.len() {
            digits.resize(point as usize, 0);
            self.whole = digits;
        } else {
            self.fraction = digits.split_off(point as usize);
            self.whole = digits;
        }

        self
    }

    /// Exact product of two amounts.
    pub fn multiply(&self, other: &DecimalAmount) -> DecimalAmount {
        let lhs: Vec<u8> = self.whole.iter().chain(&self.fraction).copied().collect();
        let rhs: Vec<u8> = other.whole.iter().chain(&other.fraction).copied().collect();

        // Schoolbook multiplication, least significant digit last.
        let mut product = vec![0u32; lhs.len() + rhs.len()];
        for (i, a) in lhs.iter().enumerate().rev() {
            for (j, b) in rhs.iter().enumerate().rev() {
                product[i + j + 1] += u32::from(*a) * u32::from(*b);
            }
        }
        for k in (1..product.len()).rev() {
            let carry = product[k] / 10;
            product[k] %= 10;
            product[k - 1] += carry;
        }

        let mut digits: Vec<u8> = product.into_iter().map(|d| d as u8).collect();
        let fraction_len = self.fraction.len() + other.fraction.len();
        let fraction = digits.split_off(digits.len() - fraction_len);
        let first_significant = digits.iter().position(|d| *d != 0).unwrap_or(digits.len());

        DecimalAmount {
            negative: self.negative != other.negative,
            whole: digits.split_off(first_significant),
            fraction,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.whole.iter().chain(self.fraction.iter()).all(|d| *d == 0)
    }

    /// Drop the fractional part without rounding.
    pub fn truncate(mut self) -> Self {
        self.fraction.clear();
        self
    }

    /// Round to `max_decimals` fractional digits, half-up on the first dropped
    /// digit. A carry out of the fraction moves into the integer part and can
    /// add a new leading digit.
    pub fn round_half_up(mut self, max_decimals: usize) -> Self {
        if self.fraction.len() <= max_decimals {
            return self;
        }

        let round_up = self.fraction[max_decimals] >= 5;
        self.fraction.truncate(max_decimals);

        if round_up && increment(&mut self.fraction) && increment(&mut self.whole) {
            self.whole.insert(0, 1);
        }

        self
    }
}

impl fmt::Display for DecimalAmount {
    /// Canonical display form: leading integer zeros and trailing fractional
    /// zeros stripped, no dangling separator, and no sign on a zero magnitude.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative && !self.is_zero() {
            f.write_str("-")?;
        }

        match self.whole.iter().position(|d| *d != 0) {
            Some(first) => {
                for d in &self.whole[first..] {
                    write!(f, "{}", d)?;
                }
            }
            None => f.write_str("0")?,
        }

        let significant = self
            .fraction
            .iter()
            .rposition(|d| *d != 0)
            .map_or(0, |last| last + 1);

        if significant > 0 {
            f.write_str(".")?;
            for d in &self.fraction[..significant] {
                write!(f, "{}", d)?;
            }
        }

        Ok(())
    }
}

/// Adds one unit in the last place. Returns true when the carry runs off the
/// most significant digit.
fn increment(digits: &mut [u8]) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return false;
        }
    }
    true
}

/// Exponents are clamped; anything beyond this is not a displayable amount.
const MAX_EXPONENT: i32 = 1024;

fn parse_exponent(s: &str) -> i32 {
    s.trim()
        .parse::<i32>()
        .unwrap_or(0)
        .clamp(-MAX_EXPONENT, MAX_EXPONENT)
}

fn to_digits(s: &str) -> Vec<u8> {
    s.bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect()
}

/// Format a decimal string for display.
///
/// `max_decimals == 0` truncates at the separator; any other value rounds
/// half-up. Negative values that round to zero are shown as `"0"`.
pub fn format_amount(input: &str, max_decimals: usize) -> String {
    if input.is_empty() {
        return String::new();
    }

    let amount = DecimalAmount::parse(input);
    let rounded = if max_decimals == 0 {
        amount.truncate()
    } else {
        amount.round_half_up(max_decimals)
    };

    rounded.to_string()
}

/// Format a wallet balance (already converted to whole-token units).
pub fn format_balance(decimal: &str) -> String {
    format_amount(decimal, BALANCE_DECIMALS)
}

/// `numerator / denominator` as a decimal string rounded to `decimals` places,
/// using integer long division. A zero denominator yields `"0"`.
pub fn format_ratio(numerator: u64, denominator: u64, decimals: usize) -> String {
    long_divide(u128::from(numerator), denominator, decimals)
}

/// `part` as a percentage of `whole`.
pub fn format_percent(part: u64, whole: u64, decimals: usize) -> String {
    long_divide(u128::from(part) * 100, whole, decimals)
}

/// `input * 10^exponent` rounded to `decimals` places, for unit changes such
/// as milliseconds to seconds.
pub fn format_scaled(input: &str, exponent: i32, decimals: usize) -> String {
    if input.is_empty() {
        return String::new();
    }

    DecimalAmount::parse(input)
        .shift(exponent.clamp(-MAX_EXPONENT, MAX_EXPONENT))
        .round_half_up(decimals)
        .to_string()
}

/// `a * b` rounded to `decimals` places, both given as decimal strings.
pub fn format_product(a: &str, b: &str, decimals: usize) -> String {
    if a.is_empty() || b.is_empty() {
        return String::new();
    }

    DecimalAmount::parse(a)
        .multiply(&DecimalAmount::parse(b))
        .round_half_up(decimals)
        .to_string()
}

// The remainder stays below a u64 denominator, so `remainder * 10` fits in u128.
fn long_divide(numerator: u128, denominator: u64, decimals: usize) -> String {
    if denominator == 0 {
        return "0".to_string();
    }
    let denominator = u128::from(denominator);

    let mut out = (numerator / denominator).to_string();
    let mut remainder = numerator % denominator;

    // One guard digit past the requested precision drives the rounding.
    out.push('.');
    for _ in 0..=decimals {
        remainder *= 10;
        out.push(char::from(b'0' + (remainder / denominator) as u8));
        remainder %= denominator;
    }

    DecimalAmount::parse(&out).round_half_up(decimals).to_string()
}

const BYTE_UNITS: [(u64, &str); 5] = [
    (1_000_000_000_000_000, "PB"),
    (1_000_000_000_000, "TB"),
    (1_000_000_000, "GB"),
    (1_000_000, "MB"),
    (1_000, "KB"),
];

/// Human readable size in decimal units, two fractional digits at most.
pub fn format_bytes(bytes: u64) -> String {
    for (scale, unit) in BYTE_UNITS {
        if bytes >= scale {
            return format!("{} {}", format_ratio(bytes, scale, 2), unit);
        }
    }
    format!("{} B", bytes)
}

const COUNT_UNITS: [(u64, &str); 4] = [
    (1_000_000_000_000, "T"),
    (1_000_000_000, "B"),
    (1_000_000, "M"),
    (1_000, "K"),
];

/// Compact large counts: `1234567` becomes `1.23M`.
pub fn format_compact(count: u64) -> String {
    for (scale, suffix) in COUNT_UNITS {
        if count >= scale {
            return format!("{}{}", format_ratio(count, scale, 2), suffix);
        }
    }
    count.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carry_into_new_leading_digit() {
        assert_eq!(format_amount("9.9996", 3), "10");
        assert_eq!(format_amount("99.999", 2), "100");
        assert_eq!(format_amount(".96", 1), "1");
    }

    #[test]
    fn test_round_half_up_on_first_dropped_digit() {
        assert_eq!(format_amount("100.004999", 4), "100.005");
        assert_eq!(format_amount("1.2345", 3), "1.235");
        assert_eq!(format_amount("1.2344999", 3), "1.234");
        assert_eq!(format_amount("0.125", 2), "0.13");
    }

    #[test]
    fn test_zero_decimals_truncates() {
        assert_eq!(format_amount("123", 0), "123");
        assert_eq!(format_amount("123.999", 0), "123");
        assert_eq!(format_amount("-7.9", 0), "-7");
    }

    #[test]
    fn test_negative_zero_is_unsigned() {
        assert_eq!(format_amount("-0.0049", 2), "0");
        assert_eq!(format_amount("-0.4", 0), "0");
        assert_eq!(format_amount("-0.006", 2), "-0.01");
    }

    #[test]
    fn test_edge_inputs() {
        assert_eq!(format_amount("", 4), "");
        assert_eq!(format_amount("42", 4), "42");
        assert_eq!(format_amount("0.00001", 4), "0");
        assert_eq!(format_amount("1.5000", 4), "1.5");
        assert_eq!(format_amount("+3.14159", 2), "3.14");
    }

    #[test]
    fn test_precision_beyond_f64() {
        assert_eq!(
            format_amount("123456789012345678901234567890.123456789", 4),
            "123456789012345678901234567890.1235"
        );
        assert_eq!(format_balance("0.999999999999999999"), "1");
    }

    #[test]
    fn test_garbage_input_does_not_panic() {
        assert_eq!(format_amount("abc", 2), "0");
        assert_eq!(format_amount("-", 2), "0");
        assert_eq!(format_amount("1.2.3", 2), "1.23");
        assert_eq!(format_amount("1,5", 2), "15");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "9.9996", "-0.0049", "123", "100.004999", "0.5", "-12.3456", "7.000",
            "999.9999", "-0.00005", "31415.92653589793238",
        ];
        for sample in samples {
            for decimals in 0..6 {
                let once = format_amount(sample, decimals);
                assert_eq!(format_amount(&once, decimals), once, "{} @ {}", sample, decimals);
            }
        }
    }

    #[test]
    fn test_ratio_and_percent() {
        assert_eq!(format_ratio(1, 3, 2), "0.33");
        assert_eq!(format_ratio(2, 3, 2), "0.67");
        assert_eq!(format_ratio(5, 0, 2), "0");
        assert_eq!(format_ratio(5, 2, 0), "3");
        assert_eq!(format_percent(1, 8, 1), "12.5");
        assert_eq!(format_percent(3, 4, 0), "75");
    }

    #[test]
    fn test_bytes_and_compact() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1_500), "1.5 KB");
        assert_eq!(format_bytes(2_345_678_901), "2.35 GB");
        assert_eq!(format_bytes(3_000_000_000_000_000), "3 PB");
        assert_eq!(format_compact(999), "999");
        assert_eq!(format_compact(1_234_567), "1.23M");
        assert_eq!(format_compact(4_999_999), "5M");
    }

    #[test]
    fn test_parse_reports_sign() {
        let amount = DecimalAmount::parse("-0.000");
        assert!(amount.is_negative());
        assert!(amount.is_zero());
        assert_eq!(amount.to_string(), "0");
    }

    #[test]
    fn test_exponent_notation_is_expanded() {
        assert_eq!(format_amount("1e-7", 8), "0.0000001");
        assert_eq!(format_amount("1e-7", 4), "0");
        assert_eq!(format_amount("1.5e3", 2), "1500");
        assert_eq!(format_amount("2.5E-3", 3), "0.003");
        assert_eq!(format_amount("-4.2e1", 0), "-42");
        assert_eq!(format_amount("123.456e-2", 4), "1.2346");
        assert_eq!(format_amount("7e", 2), "7");
        assert_eq!(format_amount("0.05e1", 2), "0.5");
    }

    #[test]
    fn test_huge_exponent_is_clamped() {
        let formatted = format_amount("1e999999999", 0);
        assert_eq!(formatted.len(), MAX_EXPONENT as usize + 1);
        assert_eq!(format_amount("1e-999999999", 4), "0");
    }

    #[test]
    fn test_product_is_exact() {
        assert_eq!(format_product("335.54", "0.0424", 2), "14.23");
        assert_eq!(format_product("335.54", "1", 2), "335.54");
        assert_eq!(format_product("0.5", "0.5", 4), "0.25");
        assert_eq!(format_product("-2", "0.001", 2), "0");
        assert_eq!(format_product("99.99", "99.99", 1), "9998");
        assert_eq!(format_product("", "3", 2), "");
    }

    #[test]
    fn test_scaled_units() {
        assert_eq!(format_scaled("6000", -3, 1), "6");
        assert_eq!(format_scaled("6250.0", -3, 1), "6.3");
        assert_eq!(format_scaled("6e3", -3, 1), "6");
        assert_eq!(format_scaled("1.5", 2, 0), "150");
    }

    #[test]
    fn test_ratio_with_full_width_operands() {
        assert_eq!(format_ratio(u64::MAX, u64::MAX - 1, 2), "1");
        assert_eq!(format_ratio(1, u64::MAX, 4), "0");
        assert_eq!(format_percent(u64::MAX, u64::MAX, 0), "100");
    }
}
