//! Order-preserving byte encoding of primary keys for the in-memory store.
//!
//! Format: `[tag][hash]` or `[tag][hash][tag][range]`, where each component
//! sorts correctly under `memcmp`:
//! - `S`: UTF-8 bytes, escaped-terminator encoded
//! - `N`: sign byte, biased big-endian exponent, then the significant digits
//!   and a terminator; negatives invert everything after the sign byte
//! - `B`: raw bytes, escaped-terminator encoded

use crate::encoding::number::Decimal;
use crate::error::StoreError;
use crate::types::{AttrValue, Item};

pub const TAG_STRING: u8 = 0x01;
pub const TAG_NUMBER: u8 = 0x02;
pub const TAG_BINARY: u8 = 0x03;

/// Key attribute names of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub hash: String,
    pub range: Option<String>,
}

impl KeySchema {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Key attribute names, hash first.
    pub fn attributes(&self) -> Vec<&str> {
        let mut names = vec![self.hash.as_str()];
        names.extend(self.range.as_deref());
        names
    }

    /// Copy just the key attributes out of an item.
    pub fn key_of(&self, item: &Item) -> Result<Item, StoreError> {
        let mut key = Item::new();
        for name in self.attributes() {
            let value = item.get(name).ok_or_else(|| {
                StoreError::Validation(format!("missing key attribute '{name}'"))
            })?;
            key.insert(name.to_string(), value.clone());
        }
        Ok(key)
    }

    /// Encode the key attributes of `item`. Attributes other than the key
    /// are ignored.
    pub fn encode(&self, item: &Item) -> Result<Vec<u8>, StoreError> {
        let mut out = Vec::new();
        for name in self.attributes() {
            let value = item.get(name).ok_or_else(|| {
                StoreError::Validation(format!("missing key attribute '{name}'"))
            })?;
            encode_component(&mut out, name, value)?;
        }
        Ok(out)
    }
}

fn encode_component(out: &mut Vec<u8>, name: &str, value: &AttrValue) -> Result<(), StoreError> {
    match value {
        AttrValue::S(s) => {
            out.push(TAG_STRING);
            encode_binary(out, s.as_bytes());
        }
        AttrValue::N(n) => {
            out.push(TAG_NUMBER);
            out.extend(encode_number(n)?);
        }
        AttrValue::B(b) => {
            out.push(TAG_BINARY);
            encode_binary(out, b);
        }
        other => {
            return Err(StoreError::Validation(format!(
                "key attribute '{name}' must be S, N or B, got {}",
                other.type_tag()
            )));
        }
    }
    Ok(())
}

const NUMBER_NEGATIVE: u8 = 0x40;
const NUMBER_ZERO: u8 = 0x80;
const NUMBER_POSITIVE: u8 = 0xC0;

/// Encode decimal text into bytes that preserve numeric ordering under
/// `memcmp`.
///
/// The encoding is built from the normalized decimal, so numbers that are
/// equal (`1`, `1.0`, `10e-1`) share one key and numbers that differ keep
/// distinct keys at any precision.
pub fn encode_number(text: &str) -> Result<Vec<u8>, StoreError> {
    let value = Decimal::parse(text)
        .map_err(|_| StoreError::Validation(format!("invalid number '{text}'")))?;
    if value.is_zero() {
        return Ok(vec![NUMBER_ZERO]);
    }
    let exponent = i16::try_from(value.exponent())
        .map_err(|_| StoreError::Validation(format!("number '{text}' out of key range")))?;
    let biased = ((exponent as i32) + 0x8000) as u16;

    let mut out = Vec::with_capacity(value.digits().len() + 4);
    if value.is_negative() {
        out.push(NUMBER_NEGATIVE);
        out.extend(biased.to_be_bytes().map(|b| !b));
        out.extend(value.digits().iter().map(|d| !d));
        out.push(0xFF);
    } else {
        out.push(NUMBER_POSITIVE);
        out.extend(biased.to_be_bytes());
        out.extend_from_slice(value.digits());
        out.push(0x00);
    }
    Ok(out)
}

/// Append `data` with every `0x00` escaped as `0x00 0x01`, then a `0x00 0x00`
/// terminator.
pub fn encode_binary(out: &mut Vec<u8>, data: &[u8]) {
    out.reserve(data.len() + 2);
    for &b in data {
        if b == 0x00 {
            out.extend([0x00, 0x01]);
        } else {
            out.push(b);
        }
    }
    out.extend([0x00, 0x00]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(hash: AttrValue, range: Option<AttrValue>) -> Item {
        let mut item = Item::new();
        item.insert("pk".to_string(), hash);
        if let Some(r) = range {
            item.insert("sk".to_string(), r);
        }
        item.insert("other".to_string(), AttrValue::Bool(true));
        item
    }

    fn n(s: &str) -> AttrValue {
        AttrValue::N(s.to_string())
    }

    // -----------------------------------------------------------------------
    // Numbers
    // -----------------------------------------------------------------------

    #[test]
    fn test_number_ordering() {
        let sorted = ["-1e10", "-42", "-0.5", "0", "0.0001", "1", "42", "1e10"];
        for pair in sorted.windows(2) {
            let a = encode_number(pair[0]).unwrap();
            let b = encode_number(pair[1]).unwrap();
            assert!(a < b, "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_negative_zero_normalized() {
        assert_eq!(encode_number("-0").unwrap(), encode_number("0").unwrap());
    }

    #[test]
    fn test_number_ordering_beyond_f64() {
        let sorted = [
            "-10000000000000000001",
            "-9999999999999999999",
            "-1.05",
            "-1",
            "1",
            "1.05",
            "9007199254740992",
            "9007199254740993",
            "9999999999999999999",
            "10000000000000000001",
        ];
        for pair in sorted.windows(2) {
            let a = encode_number(pair[0]).unwrap();
            let b = encode_number(pair[1]).unwrap();
            assert!(a < b, "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_equal_numbers_share_encoding() {
        assert_eq!(encode_number("1.0").unwrap(), encode_number("1").unwrap());
        assert_eq!(encode_number("10e-1").unwrap(), encode_number("1").unwrap());
        assert_eq!(encode_number("-0.50").unwrap(), encode_number("-5e-1").unwrap());
    }

    #[test]
    fn test_number_component_is_self_delimiting() {
        let schema = KeySchema::new("pk").with_range("sk");
        let short = schema.encode(&item(n("1"), Some(n("9")))).unwrap();
        let long = schema.encode(&item(n("1.2"), Some(n("1")))).unwrap();
        assert!(short < long);
    }

    #[test]
    fn test_invalid_number() {
        assert!(matches!(
            encode_number("abc"),
            Err(StoreError::Validation(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Binary
    // -----------------------------------------------------------------------

    #[test]
    fn test_binary_escaping() {
        let mut out = Vec::new();
        encode_binary(&mut out, &[0x42, 0x00, 0xFF]);
        assert_eq!(out, vec![0x42, 0x00, 0x01, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn test_binary_prefix_sorts_first() {
        let mut short = Vec::new();
        encode_binary(&mut short, b"ab");
        let mut long = Vec::new();
        encode_binary(&mut long, b"abc");
        assert!(short < long);
    }

    // -----------------------------------------------------------------------
    // Composite keys
    // -----------------------------------------------------------------------

    #[test]
    fn test_range_orders_within_hash() {
        let schema = KeySchema::new("pk").with_range("sk");
        let a = schema.encode(&item("u".into(), Some(n("2")))).unwrap();
        let b = schema.encode(&item("u".into(), Some(n("10")))).unwrap();
        let c = schema.encode(&item("v".into(), Some(n("1")))).unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_hash_prefix_does_not_interleave() {
        let schema = KeySchema::new("pk").with_range("sk");
        let a = schema.encode(&item("a".into(), Some("z".into()))).unwrap();
        let ab = schema.encode(&item("ab".into(), Some("a".into()))).unwrap();
        assert!(a < ab);
    }

    #[test]
    fn test_non_key_attributes_ignored() {
        let schema = KeySchema::new("pk");
        let mut other = item("u".into(), None);
        other.insert("other".to_string(), AttrValue::Bool(false));
        assert_eq!(
            schema.encode(&item("u".into(), None)).unwrap(),
            schema.encode(&other).unwrap()
        );
    }

    #[test]
    fn test_missing_or_invalid_key() {
        let schema = KeySchema::new("pk").with_range("sk");
        assert!(matches!(
            schema.encode(&item("u".into(), None)),
            Err(StoreError::Validation(_))
        ));
        let schema = KeySchema::new("other");
        assert!(matches!(
            schema.encode(&item("u".into(), None)),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_key_of() {
        let schema = KeySchema::new("pk").with_range("sk");
        let key = schema.key_of(&item("u".into(), Some(n("1")))).unwrap();
        assert_eq!(key.len(), 2);
        assert!(!key.contains_key("other"));
    }
}
