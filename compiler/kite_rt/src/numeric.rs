//! Number parsing and formatting with the language's string rules.
//!
//! Numeric strings look like `[ws][+-](digits[.digits]|.digits)[(e|E)[+-]digits]`.
//! A *prefix* parse accepts the longest such run at the start of the string
//! and ignores the rest; a *whole* parse requires the run to cover it all.

/// Bytes skipped before a number.
const WHITESPACE: &[u8] = b" \t\n\r\x0b\x0c";

/// A number read from a string.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }
}

/// Extent of the numeric run at the start of a byte string.
#[derive(Clone, Copy, Debug)]
struct Scan {
    /// First byte after leading whitespace.
    start: usize,
    /// One past the last byte of the number; `start` when there is none.
    end: usize,
    /// No fraction and no exponent.
    integral: bool,
}

fn digits(bytes: &[u8], mut at: usize) -> usize {
    while at < bytes.len() && bytes[at].is_ascii_digit() {
        at += 1;
    }
    at
}

fn scan(bytes: &[u8]) -> Scan {
    let mut at = 0;
    while at < bytes.len() && WHITESPACE.contains(&bytes[at]) {
        at += 1;
    }
    let start = at;
    let none = Scan {
        start,
        end: start,
        integral: true,
    };

    if at < bytes.len() && (bytes[at] == b'+' || bytes[at] == b'-') {
        at += 1;
    }
    let int_end = digits(bytes, at);
    let mut end = int_end;
    let mut integral = true;
    let mut any_digit = int_end > at;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_end = digits(bytes, end + 1);
        if frac_end > end + 1 || any_digit {
            any_digit |= frac_end > end + 1;
            end = frac_end;
            integral = false;
        }
    }
    if !any_digit {
        return none;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let exp_end = digits(bytes, exp);
        if exp_end > exp {
            end = exp_end;
            integral = false;
        }
    }
    Scan {
        start,
        end,
        integral,
    }
}

/// Parse an optionally signed run of ASCII digits; `None` on overflow.
fn checked_int(text: &[u8]) -> Option<i64> {
    let (negative, body) = match text.first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    body.iter().try_fold(0i64, |value, &b| {
        let digit = i64::from(b - b'0');
        let value = value.checked_mul(10)?;
        if negative {
            value.checked_sub(digit)
        } else {
            value.checked_add(digit)
        }
    })
}

fn saturating_int(text: &[u8]) -> i64 {
    checked_int(text).unwrap_or(if text.first() == Some(&b'-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn float_of(text: &[u8]) -> f64 {
    std::str::from_utf8(text)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Integer value of the leading digits (after whitespace and sign), or 0.
pub fn parse_int_prefix(bytes: &[u8]) -> i64 {
    let s = scan(bytes);
    let mut end = s.start;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let end = digits(bytes, end);
    saturating_int(&bytes[s.start..end])
}

/// Float value of the numeric prefix, or 0.
pub fn parse_float_prefix(bytes: &[u8]) -> f64 {
    let s = scan(bytes);
    float_of(&bytes[s.start..s.end])
}

/// The numeric prefix as an int when it has no fraction or exponent and fits,
/// as a float otherwise.
pub fn parse_numeric_prefix(bytes: &[u8]) -> Numeric {
    let s = scan(bytes);
    to_numeric(&bytes[s.start..s.end], s.integral)
}

fn to_numeric(text: &[u8], integral: bool) -> Numeric {
    if text.is_empty() {
        return Numeric::Int(0);
    }
    if integral {
        if let Some(value) = checked_int(text) {
            return Numeric::Int(value);
        }
    }
    Numeric::Float(float_of(text))
}

/// The value of a string that is entirely a number, if it is one.
pub fn parse_numeric(bytes: &[u8]) -> Option<Numeric> {
    let s = scan(bytes);
    if s.end == s.start || s.end != bytes.len() {
        return None;
    }
    Some(to_numeric(&bytes[s.start..s.end], s.integral))
}

pub fn is_numeric(bytes: &[u8]) -> bool {
    parse_numeric(bytes).is_some()
}

/// Format a float like the language's `%.14G` conversion.
pub fn format_float(value: f64) -> String {
    const PRECISION: i32 = 14;

    if value.is_nan() {
        return "NAN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    // Exponent after rounding to PRECISION significant digits.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, magnitude);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..PRECISION).contains(&exponent) {
        let decimals = (PRECISION - 1 - exponent) as usize;
        let fixed = format!("{magnitude:.decimals$}");
        format!("{sign}{}", trim_fraction(&fixed))
    } else {
        let mut mantissa = trim_fraction(mantissa).to_owned();
        if !mantissa.contains('.') {
            mantissa.push_str(".0");
        }
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{sign}{mantissa}E{exp_sign}{}", exponent.abs())
    }
}

/// Drop trailing zeros of a fraction, and the dot if nothing remains.
fn trim_fraction(text: &str) -> &str {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.')
}
