//! Comparable sort keys with natural ("smart") ordering.
//!
//! A [SortKey] is a sequence of [Token]s compared lexicographically. Numbers sort before text,
//! and the empty sequence (null or an empty string) sorts before everything else. Strings that
//! look like numbers become a single numeric token, other strings are split into alternating
//! digit and non-digit runs, so that `file2` sorts before `file10`.
//!
//! # Examples
//! ```
//! use tb_sort::key::{KeyValue, SortKey};
//!
//! let a = SortKey::new(&KeyValue::from("file2"));
//! let b = SortKey::new(&KeyValue::from("file10"));
//! assert!(a < b);
//! assert_eq!(SortKey::new(&KeyValue::from(" 10 ")), SortKey::new(&KeyValue::from(10i64)));
//! ```

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SortError;

fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*-?[0-9]+\s*$").expect("valid integer pattern"))
}

fn float_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*-?([0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?|\.[0-9]+([eE][-+]?[0-9]+)?)\s*$")
            .expect("valid float pattern")
    })
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([0-9]+)|[^0-9]+").expect("valid token pattern"))
}

/// 2^63, the first float outside the i64 range.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// An integer outside the i64 range, kept as its canonical decimal text: an optional `-`
/// followed by digits without leading zeros.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BigInteger(String);

impl BigInteger {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_negative(&self) -> bool {
        self.0.starts_with('-')
    }
}

/// A number as it takes part in a key. All comparisons are exact, also between integers and
/// floats. NaN sorts after every other number.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Number {
    Integer(i64),
    Big(BigInteger),
    Float(#[serde(with = "float_bits")] f64),
}

/// Floats are stored by their bit pattern, so infinities and NaN survive a scratch file and
/// every value reads back exactly.
mod float_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.to_bits())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        u64::deserialize(deserializer).map(f64::from_bits)
    }
}

impl Number {
    /// Parse an optionally negative run of decimal digits without losing precision.
    pub fn from_digits(s: &str) -> Option<Number> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(digits) => (true, digits),
            None => (false, s),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Some(Number::Integer(i));
        }
        let digits = digits.trim_start_matches('0');
        let text = if negative { format!("-{}", digits) } else { digits.to_string() };
        Some(Number::Big(BigInteger(text)))
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Big(big) => big.as_str().parse::<f64>().unwrap_or(f64::NAN),
            Number::Float(f) => *f,
        }
    }

    /// Add two numbers, staying integral while the sum fits into an i64.
    pub fn plus(self, other: Number) -> Number {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a
                .checked_add(b)
                .map(Number::Integer)
                .unwrap_or(Number::Float(a as f64 + b as f64)),
            (a, b) => Number::Float(a.as_f64() + b.as_f64()),
        }
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Big(big) => write!(f, "{}", big.as_str()),
            Number::Float(n) => write!(f, "{}", n),
        }
    }
}

fn split_sign(s: &str) -> (bool, &str) {
    match s.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, s),
    }
}

/// Compare canonical integer texts: sign, then number of digits, then digits.
fn cmp_integer_text(a: &str, b: &str) -> Ordering {
    let magnitude = |a: &str, b: &str| a.len().cmp(&b.len()).then_with(|| a.cmp(b));
    match (split_sign(a), split_sign(b)) {
        ((false, a), (false, b)) => magnitude(a, b),
        ((true, a), (true, b)) => magnitude(b, a),
        ((true, _), (false, _)) => Ordering::Less,
        ((false, _), (true, _)) => Ordering::Greater,
    }
}

fn cmp_integer_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() || f >= I64_LIMIT {
        return Ordering::Less;
    }
    if f < -I64_LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0f64.partial_cmp(&(f - whole)).unwrap_or(Ordering::Equal),
        ordering => ordering,
    }
}

fn cmp_big_float(big: &BigInteger, f: f64) -> Ordering {
    if f.is_nan() || f == f64::INFINITY {
        return Ordering::Less;
    }
    if f == f64::NEG_INFINITY {
        return Ordering::Greater;
    }
    if f.abs() < I64_LIMIT {
        return if big.is_negative() { Ordering::Less } else { Ordering::Greater };
    }
    // beyond 2^63 every float is integral and prints exactly
    cmp_integer_text(big.as_str(), &format!("{:.0}", f))
}

fn cmp_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl Eq for Number {}

impl PartialEq<Self> for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a.cmp(b),
            (Number::Integer(_), Number::Big(b)) => {
                if b.is_negative() { Ordering::Greater } else { Ordering::Less }
            }
            (Number::Big(a), Number::Integer(_)) => {
                if a.is_negative() { Ordering::Less } else { Ordering::Greater }
            }
            (Number::Big(a), Number::Big(b)) => cmp_integer_text(a.as_str(), b.as_str()),
            (Number::Integer(a), Number::Float(b)) => cmp_integer_float(*a, *b),
            (Number::Float(a), Number::Integer(b)) => cmp_integer_float(*b, *a).reverse(),
            (Number::Big(a), Number::Float(b)) => cmp_big_float(a, *b),
            (Number::Float(a), Number::Big(b)) => cmp_big_float(b, *a).reverse(),
            (Number::Float(a), Number::Float(b)) => cmp_floats(*a, *b),
        }
    }
}

/// Parse a string that looks like a number: an integer, a decimal or a number with an
/// exponent, optionally surrounded by whitespace. Integers of any length are exact, decimals
/// become the nearest f64, overflowing to an infinity.
pub fn parse_number(s: &str) -> Option<Number> {
    if integer_pattern().is_match(s) {
        Number::from_digits(s.trim())
    } else if float_pattern().is_match(s) {
        s.trim().parse::<f64>().map(Number::Float).ok()
    } else {
        None
    }
}

/// A single element of a [SortKey]. Numbers sort before text.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Token {
    Number(Number),
    Text(String),
}

/// The values a key can be built from.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyValue {
    Null,
    Number(Number),
    Text(String),
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        KeyValue::Text(s)
    }
}

impl From<i64> for KeyValue {
    fn from(i: i64) -> Self {
        KeyValue::Number(Number::Integer(i))
    }
}

impl From<f64> for KeyValue {
    fn from(n: f64) -> Self {
        KeyValue::Number(Number::Float(n))
    }
}

impl<T: Into<KeyValue>> From<Option<T>> for KeyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(KeyValue::Null)
    }
}

impl TryFrom<&serde_json::Value> for KeyValue {
    type Error = SortError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Ok(KeyValue::Null),
            serde_json::Value::String(s) => Ok(KeyValue::Text(s.clone())),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(KeyValue::Number(Number::Integer(i)))
                } else if n.is_u64() {
                    Number::from_digits(&n.to_string())
                        .map(KeyValue::Number)
                        .ok_or_else(|| SortError::InvalidKey(n.to_string()))
                } else if let Some(f) = n.as_f64() {
                    Ok(KeyValue::Number(Number::Float(f)))
                } else {
                    Err(SortError::InvalidKey(n.to_string()))
                }
            }
            other => Err(SortError::InvalidKey(other.to_string())),
        }
    }
}

/// A totally ordered key in natural order.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SortKey(Vec<Token>);

impl SortKey {
    /// Encode a value. Null and the empty string produce the smallest key.
    pub fn new(value: &KeyValue) -> SortKey {
        match value {
            KeyValue::Null => SortKey(Vec::new()),
            KeyValue::Number(n) => SortKey(vec![Token::Number(n.clone())]),
            KeyValue::Text(s) => match parse_number(s) {
                Some(n) => SortKey(vec![Token::Number(n)]),
                None => SortKey(Self::tokenize(s)),
            },
        }
    }

    /// Encode a JSON value, rejecting booleans, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Result<SortKey, anyhow::Error> {
        let value = KeyValue::try_from(value)?;
        Ok(SortKey::new(&value))
    }

    /// A key comparing the whole string byte-wise, without natural tokenization.
    pub fn lexical(s: &str) -> SortKey {
        if s.is_empty() {
            SortKey(Vec::new())
        } else {
            SortKey(vec![Token::Text(s.to_string())])
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn tokenize(s: &str) -> Vec<Token> {
        token_pattern()
            .captures_iter(s)
            .filter_map(|captures| match captures.get(1) {
                Some(digits) => Number::from_digits(digits.as_str()).map(Token::Number),
                None => captures.get(0).map(|m| Token::Text(m.as_str().to_string())),
            })
            .collect()
    }
}

impl From<Number> for SortKey {
    fn from(n: Number) -> Self {
        SortKey(vec![Token::Number(n)])
    }
}
