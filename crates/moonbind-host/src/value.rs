//! Values held on the host stack and in host globals

use std::fmt;
use std::rc::Rc;

use moonbind::ValueKind;

use crate::state::HostState;

/// Signature of a native host function.
///
/// The callee sees its arguments at indices `1..=n` of its own frame,
/// pushes its results and returns how many it pushed. `Err` raises a
/// runtime error with the given message.
pub type HostFn = dyn Fn(&HostState) -> Result<usize, String>;

/// Reference-counted native function stored in a global.
#[derive(Clone)]
pub struct HostFunction(Rc<HostFn>);

impl HostFunction {
    /// Wrap a closure
    pub fn new(f: impl Fn(&HostState) -> Result<usize, String> + 'static) -> Self {
        HostFunction(Rc::new(f))
    }

    pub(crate) fn invoke(&self, state: &HostState) -> Result<usize, String> {
        (self.0)(state)
    }
}

impl PartialEq for HostFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunction({:p})", Rc::as_ptr(&self.0))
    }
}

/// A host runtime value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// nil
    #[default]
    Nil,
    /// true / false
    Boolean(bool),
    /// Integer number
    Integer(i64),
    /// Float number
    Number(f64),
    /// Byte string
    String(Vec<u8>),
    /// Native function
    Function(HostFunction),
}

impl Value {
    /// Runtime type of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) | Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Function(_) => ValueKind::Function,
        }
    }

    /// Only nil and false are false
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Integer conversion: exact floats and numeric strings convert.
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) => float_to_integer(*n),
            Value::String(bytes) => match parse_numeral(bytes)? {
                Numeral::Integer(i) => Some(i),
                Numeral::Float(n) => float_to_integer(n),
            },
            _ => None,
        }
    }

    /// Float conversion: integers and numeric strings convert.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            Value::String(bytes) => match parse_numeral(bytes)? {
                Numeral::Integer(i) => Some(i as f64),
                Numeral::Float(n) => Some(n),
            },
            _ => None,
        }
    }

    /// String conversion: numbers are formatted, other types do not convert.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Value::String(bytes) => Some(bytes.clone()),
            Value::Integer(i) => Some(i.to_string().into_bytes()),
            Value::Number(n) => Some(format_number(*n).into_bytes()),
            _ => None,
        }
    }
}

fn float_to_integer(n: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or above it does not fit.
    if n.fract() == 0.0 && n >= -9_223_372_036_854_775_808.0 && n < 9_223_372_036_854_775_808.0 {
        Some(n as i64)
    } else {
        None
    }
}

/// Format a float the way the runtime prints it: `%.14g`, plus a trailing
/// `.0` when the result would otherwise read as an integer.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let mut text = format_general(n, 14);
    if text.bytes().all(|b| b == b'-' || b.is_ascii_digit()) {
        text.push_str(".0");
    }
    text
}

/// printf's `%.{precision}g` for finite values.
fn format_general(n: f64, precision: usize) -> String {
    // The exponent after rounding to `precision` significant digits picks
    // between fixed and scientific notation.
    let scientific = format!("{:.*e}", precision - 1, n);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

// ============================================================================
// String to number
// ============================================================================

enum Numeral {
    Integer(i64),
    Float(f64),
}

/// Read a numeral the way the runtime coerces strings.
///
/// Surrounding whitespace is allowed. Decimal and hex integers come first;
/// hex integers wrap around, decimal ones that overflow are read as floats.
/// Floats may be decimal or hex (`0x1p4`), but never `inf` or `nan`.
fn parse_numeral(bytes: &[u8]) -> Option<Numeral> {
    let text = std::str::from_utf8(bytes).ok()?;
    let text = text.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'));
    match parse_integer(text) {
        Some(i) => Some(Numeral::Integer(i)),
        None => parse_float(text).map(Numeral::Float),
    }
}

fn split_sign(text: &str) -> (bool, &str) {
    match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    }
}

fn strip_hex_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

fn all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = split_sign(text);
    let magnitude = match strip_hex_prefix(digits) {
        Some(hex) if !hex.is_empty() => hex.chars().try_fold(0i64, |acc, c| {
            Some(acc.wrapping_mul(16).wrapping_add(i64::from(c.to_digit(16)?)))
        })?,
        Some(_) => return None,
        None if all_digits(digits) => {
            let magnitude: u64 = digits.parse().ok()?;
            // 2^63 only fits once negated.
            if negative && magnitude == 1 << 63 {
                return Some(i64::MIN);
            }
            i64::try_from(magnitude).ok()?
        }
        None => return None,
    };
    Some(if negative { magnitude.wrapping_neg() } else { magnitude })
}

fn parse_float(text: &str) -> Option<f64> {
    if text.contains(|c: char| c == 'n' || c == 'N') {
        return None;
    }
    let (negative, body) = split_sign(text);
    let magnitude = match strip_hex_prefix(body) {
        Some(hex) => parse_hex_float(hex)?,
        // `parse` would take a second sign
        None if body.starts_with(|c: char| c == '+' || c == '-') => return None,
        None => body.parse::<f64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Hex digits with an optional point, then an optional binary exponent.
fn parse_hex_float(hex: &str) -> Option<f64> {
    let (mantissa, exponent) = match hex.find(|c: char| c == 'p' || c == 'P') {
        Some(at) => (&hex[..at], Some(&hex[at + 1..])),
        None => (hex, None),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let mut value = 0.0f64;
    for c in whole.chars().chain(fraction.chars()) {
        value = value * 16.0 + f64::from(c.to_digit(16)?);
    }
    let mut scale = -4 * i32::try_from(fraction.len()).ok()?;
    if let Some(exponent) = exponent {
        let (negative, digits) = split_sign(exponent);
        if !all_digits(digits) {
            return None;
        }
        let power: i32 = digits.parse().ok()?;
        scale = scale.saturating_add(if negative { -power } else { power });
    }
    Some(value * 2f64.powi(scale))
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::String(bytes)
    }
}

impl From<HostFunction> for Value {
    fn from(f: HostFunction) -> Self {
        Value::Function(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_conversion() {
        assert_eq!(Value::Integer(-7).to_integer(), Some(-7));
        assert_eq!(Value::Number(4.0).to_integer(), Some(4));
        assert_eq!(Value::Number(4.5).to_integer(), None);
        assert_eq!(Value::Number(9.3e18).to_integer(), None);
        assert_eq!(Value::from(" 12 ").to_integer(), Some(12));
        assert_eq!(Value::from("1e2").to_integer(), Some(100));
        assert_eq!(Value::from("abc").to_integer(), None);
        assert_eq!(Value::Boolean(true).to_integer(), None);
    }

    #[test]
    fn test_numeral_strings() {
        assert_eq!(Value::from("0x10").to_integer(), Some(16));
        assert_eq!(Value::from(" -0XfF\n").to_integer(), Some(-255));
        assert_eq!(Value::from("0xffffffffffffffff").to_integer(), Some(-1));
        assert_eq!(Value::from("+5").to_integer(), Some(5));
        assert_eq!(Value::from("-9223372036854775808").to_integer(), Some(i64::MIN));
        assert_eq!(Value::from("9223372036854775808").to_integer(), None);
        assert_eq!(
            Value::from("9223372036854775808").to_number(),
            Some(9_223_372_036_854_775_808.0)
        );
        assert_eq!(Value::from("0x1p4").to_number(), Some(16.0));
        assert_eq!(Value::from("0x.8").to_number(), Some(0.5));
        assert_eq!(Value::from("-0x1.8P-1").to_number(), Some(-0.75));
        assert_eq!(Value::from(".5").to_number(), Some(0.5));

        for text in ["inf", "-inf", "nan", "infinity", "NaN", "0x", "1 2", "--5", "+-1", "1e", ""] {
            assert_eq!(Value::from(text).to_number(), None, "{text:?}");
            assert_eq!(Value::from(text).to_integer(), None, "{text:?}");
        }
    }

    #[test]
    fn test_number_conversion() {
        assert_eq!(Value::Integer(3).to_number(), Some(3.0));
        assert_eq!(Value::from("0.25").to_number(), Some(0.25));
        assert_eq!(Value::Nil.to_number(), None);
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(Value::Integer(42).to_bytes(), Some(b"42".to_vec()));
        assert_eq!(Value::Number(1.0).to_bytes(), Some(b"1.0".to_vec()));
        assert_eq!(Value::Number(0.5).to_bytes(), Some(b"0.5".to_vec()));
        assert_eq!(Value::Number(f64::INFINITY).to_bytes(), Some(b"inf".to_vec()));
        assert_eq!(Value::Boolean(false).to_bytes(), None);
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(100.0), "100.0");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(1e15), "1e+15");
        assert_eq!(format_number(1e16), "1e+16");
        assert_eq!(format_number(2f64.powi(53)), "9.007199254741e+15");
        assert_eq!(format_number(123456.789), "123456.789");
        assert_eq!(format_number(0.0001), "0.0001");
        assert_eq!(format_number(1e-5), "1e-05");
        assert_eq!(format_number(1.5e-300), "1.5e-300");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_number(f64::NAN), "nan");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::from("").is_truthy());
    }

    #[test]
    fn test_function_identity() {
        let f = HostFunction::new(|_| Ok(0));
        let g = HostFunction::new(|_| Ok(0));
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
        assert_eq!(Value::from(f).kind(), ValueKind::Function);
    }
}
