//! Display formatting for run statistics.
//!
//! Every function here is total: invalid or degenerate input never panics and
//! never returns an error, it falls back to a plain rendering instead.

/// SI prefixes for powers of 1000, starting at 10⁰.
const SI_PREFIXES: [&str; 5] = ["", "k", "M", "G", "T"];

/// Upper bound on the mantissa precision in exponential notation.
const MAX_EXP_DIGITS: i32 = 100;

/// Format a count with an SI prefix, keeping three significant digits.
///
/// ```
/// use madboard::data::format::format_si_prefix;
///
/// assert_eq!(format_si_prefix(999.0), "999");
/// assert_eq!(format_si_prefix(12_345.0), "12.3k");
/// assert_eq!(format_si_prefix(2_500_000.0), "2.50M");
/// ```
pub fn format_si_prefix(value: f64) -> String {
    let rounded = value.round();
    if !rounded.is_finite() || rounded <= 0.0 {
        return plain(value);
    }

    let power = rounded.log10().floor() as i32;
    let power3 = (power / 3).min(SI_PREFIXES.len() as i32 - 1);
    let decimals = if power3 == 0 {
        0
    } else {
        (2 - (power - 3 * power3)).max(0) as usize
    };
    let scaled = rounded / 10f64.powi(power3 * 3);

    format!("{}{}", to_fixed(scaled, decimals), SI_PREFIXES[power3 as usize])
}

/// Format a value with its uncertainty in parenthesis notation.
///
/// The value is rounded to the decimal place of the error's second
/// significant digit, and the error digits follow in parentheses.
/// Large or tiny magnitudes switch to exponential notation.
///
/// ```
/// use madboard::data::format::format_with_error;
///
/// assert_eq!(format_with_error(1.2345, 0.0067), "1.2345(67)");
/// assert_eq!(format_with_error(12.34, 2.5), "12.3(2.5)");
/// assert_eq!(format_with_error(0.0, 0.0), "0 +- 0");
/// ```
pub fn format_with_error(value: f64, error: f64) -> String {
    try_format_with_error(value, error).unwrap_or_else(|| format!("{} +- {}", value, error))
}

fn try_format_with_error(value: f64, error: f64) -> Option<String> {
    if !value.is_finite() || !error.is_finite() || value <= 0.0 || error <= 0.0 {
        return None;
    }

    let sig_power = 1 - error.log10().floor() as i32;

    if (0..=5).contains(&sig_power) {
        let err_prec = if sig_power == 1 { 1 } else { 0 };
        let err_digits = error * 10f64.powi(sig_power - err_prec);
        return Some(format!(
            "{}({})",
            to_fixed(value, sig_power as usize),
            to_fixed(err_digits, err_prec as usize)
        ));
    }

    let value_power = value.log10().floor() as i32;
    let mantissa_digits = value_power + sig_power;
    if !(0..=MAX_EXP_DIGITS).contains(&mantissa_digits) {
        return None;
    }

    let exp_str = to_exponential(value, mantissa_digits as usize);
    let (mantissa, exponent) = exp_str.split_once('e')?;
    let exponent: i32 = exponent.parse().ok()?;
    let err_digits = error * 10f64.powi(sig_power);

    Some(format!("{}({})e{:+}", mantissa, to_fixed(err_digits, 0), exponent))
}

/// Format a relative standard deviation with three decimals.
pub fn format_rsd(rel_std_dev: f64) -> String {
    to_fixed(rel_std_dev, 3)
}

/// Format an unweighting efficiency as a five-decimal ratio.
///
/// Returns `"N/A"` when the denominator is zero.
pub fn format_efficiency(numerator: f64, denominator: f64) -> String {
    if denominator == 0.0 {
        return "N/A".to_string();
    }
    to_fixed(numerator / denominator, 5)
}

fn plain(value: f64) -> String {
    format!("{}", value)
}

/// Fixed-point formatting that rounds an exact tie away from zero.
///
/// `{:.N}` rounds a tie to even, so `0.015625` would print as `0.01562`.
fn to_fixed(value: f64, decimals: usize) -> String {
    let value = if fractional_digits(value) == decimals + 1 {
        away_from_zero(value)
    } else {
        value
    };
    format!("{:.*}", decimals, value)
}

/// Exponential formatting (`1.235e4`) that rounds an exact tie away from zero.
fn to_exponential(value: f64, digits: usize) -> String {
    let value = if is_significant_tie(value, digits) {
        away_from_zero(value)
    } else {
        value
    };
    format!("{:.*e}", digits, value)
}

/// Number of digits after the decimal point in the exact expansion.
///
/// A double with `k` binary fraction bits has exactly `k` decimal fraction
/// digits, the last of which is a 5. A value sits exactly halfway between two
/// `N`-decimal roundings iff it has `N + 1` of them.
fn fractional_digits(value: f64) -> usize {
    if !value.is_finite() || value == 0.0 {
        return 0;
    }
    let bits = value.abs().to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);
    let (mantissa, exponent) = if exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), exponent - 1075)
    };
    (-(exponent + mantissa.trailing_zeros() as i32)).max(0) as usize
}

/// Whether rounding to `digits` decimals after the leading digit is a tie.
fn is_significant_tie(value: f64, digits: usize) -> bool {
    if !value.is_finite() || value == 0.0 {
        return false;
    }
    let exact = format!("{:.*}", fractional_digits(value), value.abs());
    let significant: String = exact.chars().filter(char::is_ascii_digit).collect();
    let significant = significant.trim_start_matches('0').trim_end_matches('0');
    significant.len() == digits + 2 && significant.ends_with('5')
}

/// The next representable value further from zero.
fn away_from_zero(value: f64) -> f64 {
    f64::from_bits(value.to_bits() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_si_prefix_scale_boundaries() {
        assert_eq!(format_si_prefix(999.0), "999");
        assert_eq!(format_si_prefix(1000.0), "1.00k");
        assert_eq!(format_si_prefix(1_000_000.0), "1.00M");
        assert_eq!(format_si_prefix(1_000_000_000.0), "1.00G");
        assert_eq!(format_si_prefix(3_000_000_000_000.0), "3.00T");
    }

    #[test]
    fn test_si_prefix_three_significant_digits() {
        assert_eq!(format_si_prefix(1.0), "1");
        assert_eq!(format_si_prefix(42.0), "42");
        assert_eq!(format_si_prefix(12_345.0), "12.3k");
        assert_eq!(format_si_prefix(123_456.0), "123k");
        assert_eq!(format_si_prefix(7_654_321.0), "7.65M");
    }

    #[test]
    fn test_si_prefix_rounds_before_scaling() {
        assert_eq!(format_si_prefix(998.6), "999");
        assert_eq!(format_si_prefix(999.6), "1.00k");
    }

    #[test]
    fn test_si_prefix_beyond_tera_stays_tera() {
        assert_eq!(format_si_prefix(5e15), "5000T");
    }

    #[test]
    fn test_si_prefix_falls_back_for_non_positive() {
        assert_eq!(format_si_prefix(0.0), "0");
        assert_eq!(format_si_prefix(-5.0), "-5");
        assert_eq!(format_si_prefix(0.2), "0.2");
        assert_eq!(format_si_prefix(f64::NAN), "NaN");
        assert_eq!(format_si_prefix(f64::INFINITY), "inf");
    }

    #[test]
    fn test_with_error_fixed_notation() {
        assert_eq!(format_with_error(1.2345, 0.0067), "1.2345(67)");
        assert_eq!(format_with_error(3.0, 0.2236), "3.00(22)");
        assert_eq!(format_with_error(0.5, 0.013), "0.500(13)");
    }

    #[test]
    fn test_with_error_single_digit_error_keeps_one_decimal() {
        // sig_power == 1: the error straddles the decimal point
        assert_eq!(format_with_error(12.34, 2.5), "12.3(2.5)");
    }

    #[test]
    fn test_with_error_integer_precision() {
        // error in [10, 100): zero value decimals
        assert_eq!(format_with_error(1234.6, 12.0), "1235(12)");
    }

    #[test]
    fn test_with_error_exponential_large() {
        assert_eq!(format_with_error(12346.0, 120.0), "1.235(12)e+4");
    }

    #[test]
    fn test_with_error_exponential_small() {
        assert_eq!(format_with_error(1.234e-5, 5.6e-8), "1.2340(56)e-5");
    }

    #[test]
    fn test_with_error_degenerate_inputs() {
        assert_eq!(format_with_error(0.0, 0.0), "0 +- 0");
        assert_eq!(format_with_error(1.5, 0.0), "1.5 +- 0");
        assert_eq!(format_with_error(-1.0, 0.1), "-1 +- 0.1");
        assert_eq!(format_with_error(f64::NAN, 0.1), "NaN +- 0.1");
        // error far larger than the value: no valid mantissa precision
        assert_eq!(format_with_error(1.0, 1000.0), "1 +- 1000");
    }

    #[test]
    fn test_rsd() {
        assert_eq!(format_rsd(0.12345), "0.123");
        assert_eq!(format_rsd(2.0), "2.000");
        assert_eq!(format_rsd(f64::NAN), "NaN");
    }

    #[test]
    fn test_efficiency() {
        assert_eq!(format_efficiency(1.0, 3.0), "0.33333");
        assert_eq!(format_efficiency(50.0, 100.0), "0.50000");
        assert_eq!(format_efficiency(7.0, 0.0), "N/A");
        assert_eq!(format_efficiency(0.0, 0.0), "N/A");
    }

    #[test]
    fn test_exact_ties_round_up() {
        assert_eq!(format_efficiency(1.0, 64.0), "0.01563");
        assert_eq!(format_si_prefix(12_250.0), "12.3k");
        assert_eq!(format_si_prefix(124_500.0), "125k");
        assert_eq!(format_rsd(0.0625), "0.063");
        assert_eq!(format_with_error(0.125, 0.25), "0.13(25)");
        assert_eq!(format_with_error(12_350.0, 1200.0), "1.24(12)e+4");
    }

    #[test]
    fn test_near_ties_are_not_ties() {
        // 0.0155 is stored slightly below the midpoint
        assert_eq!(format_rsd(0.0155), "0.015");
        assert_eq!(format_efficiency(-1.0, 64.0), "-0.01563");
    }
}
