//! Number formatting shared by file names and the fragment library files
//!
//! The external codes expect C-style exponents (`2.53e-08`, `1.00e+00`),
//! Rust's `{:e}` writes `2.53e-8`.

/// Rewrite a Rust exponent suffix into a signed, two-digit one
fn pad_exponent(formatted: String) -> String {
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    }
}

/// Scientific notation with `precision` fraction digits, `1.2346e+02`
#[must_use]
pub fn scientific(value: f64, precision: usize) -> String {
    pad_exponent(format!("{value:.precision$e}"))
}

/// Format an energy the way the generator names its files: integral values
/// without a fraction, values outside [1e-4, 1e16) in shortest exponent
/// form, everything else in shortest decimal form.
#[must_use]
pub fn format_energy(value: f64) -> String {
    let magnitude = value.abs();
    if value != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        return pad_exponent(format!("{value:e}"));
    }
    format!("{value}")
}

/// Energy as a float literal, always with a fraction or exponent (`14.0`)
#[must_use]
pub fn float_literal(value: f64) -> String {
    let formatted = format_energy(value);
    if formatted.contains(['.', 'e']) {
        formatted
    } else {
        format!("{formatted}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_energy() {
        assert_eq!(format_energy(2.53e-8), "2.53e-08");
        assert_eq!(format_energy(14.0), "14");
        assert_eq!(format_energy(0.5), "0.5");
        assert_eq!(format_energy(1.25), "1.25");
        assert_eq!(format_energy(0.0), "0");
        assert_eq!(format_energy(1e-10), "1e-10");
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(float_literal(14.0), "14.0");
        assert_eq!(float_literal(2.53e-8), "2.53e-08");
        assert_eq!(float_literal(0.5), "0.5");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(scientific(2.53e-8, 2), "2.53e-08");
        assert_eq!(scientific(0.555_555_6, 4), "5.5556e-01");
        assert_eq!(scientific(170.25, 4), "1.7025e+02");
        assert_eq!(scientific(0.0, 4), "0.0000e+00");
        assert_eq!(scientific(-3.5, 1), "-3.5e+00");
    }
}
