//! Validation of caller-supplied block numbers.
//!
//! Block numbers reach the cache from many places: typed integers from Rust callers, JSON
//! numbers or hex quantities from provider payloads, strings typed into a search box. The
//! [`IntoBlockNumber`] trait folds all of them into `Option<u64>`, where `None` marks input the
//! cache must refuse without failing.

use serde_json::Value;

/// Largest integer a JSON consumer using IEEE-754 doubles represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Conversion of caller input into a valid block number.
///
/// Returns `None` for absent, negative, fractional, non-finite or unparsable values.
pub trait IntoBlockNumber {
    /// Returns the block number, or `None` when the input is not a valid block number.
    fn into_block_number(self) -> Option<u64>;
}

impl IntoBlockNumber for u64 {
    fn into_block_number(self) -> Option<u64> {
        Some(self)
    }
}

impl IntoBlockNumber for u32 {
    fn into_block_number(self) -> Option<u64> {
        Some(self.into())
    }
}

impl IntoBlockNumber for usize {
    fn into_block_number(self) -> Option<u64> {
        u64::try_from(self).ok()
    }
}

impl IntoBlockNumber for i64 {
    fn into_block_number(self) -> Option<u64> {
        u64::try_from(self).ok()
    }
}

impl IntoBlockNumber for i32 {
    fn into_block_number(self) -> Option<u64> {
        u64::try_from(self).ok()
    }
}

impl IntoBlockNumber for f64 {
    fn into_block_number(self) -> Option<u64> {
        if !self.is_finite() || self < 0.0 || self.fract() != 0.0 || self > MAX_SAFE_INTEGER as f64
        {
            return None;
        }
        Some(self as u64)
    }
}

impl IntoBlockNumber for &str {
    fn into_block_number(self) -> Option<u64> {
        parse_quantity(self)
    }
}

impl IntoBlockNumber for &String {
    fn into_block_number(self) -> Option<u64> {
        parse_quantity(self)
    }
}

impl IntoBlockNumber for &Value {
    fn into_block_number(self) -> Option<u64> {
        match self {
            Value::Number(number) => number
                .as_u64()
                .or_else(|| number.as_f64().and_then(IntoBlockNumber::into_block_number)),
            Value::String(text) => parse_quantity(text),
            _ => None,
        }
    }
}

impl<T: IntoBlockNumber> IntoBlockNumber for Option<T> {
    fn into_block_number(self) -> Option<u64> {
        self.and_then(IntoBlockNumber::into_block_number)
    }
}

/// Parses a decimal string or a `0x`-prefixed hex quantity.
pub(crate) fn parse_quantity(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some("") => None,
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
