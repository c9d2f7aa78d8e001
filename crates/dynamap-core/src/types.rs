//! Core types: the tagged attribute value, items, keys, cursors and limits.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoding::{Binary, number};
use crate::error::{EncodingError, NumberError};

/// Maximum encoded item size in bytes (400KB, matching DynamoDB).
pub const MAX_ITEM_SIZE: usize = 400 * 1024;

/// Maximum number of keys accepted by one batch delete call.
pub const MAX_BATCH_DELETE: usize = 25;

/// Maximum significant digits of a stored number.
pub const MAX_NUMBER_PRECISION: usize = 38;

/// Largest decimal exponent of a stored number's leading digit.
pub const MAX_NUMBER_EXPONENT: i64 = 125;

/// Smallest decimal exponent of a stored number's leading digit.
pub const MIN_NUMBER_EXPONENT: i64 = -130;

/// Suffix appended to field names to form expression placeholder tokens.
pub const PLACEHOLDER_SUFFIX: &str = "_expr";

/// An item as the store sees it: attribute name to value.
pub type Item = BTreeMap<String, AttrValue>;

/// Every value the store can hold.
///
/// Numbers travel as decimal text so nothing is lost between the store and
/// the native numeric types on either side of the codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "B")]
    B(Vec<u8>),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null,
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "BS")]
    Bs(Vec<Vec<u8>>),
    #[serde(rename = "L")]
    L(Vec<AttrValue>),
    #[serde(rename = "M")]
    M(Item),
}

impl AttrValue {
    /// The store's type descriptor for this value (`S`, `N`, `BOOL`, ...).
    pub fn type_tag(&self) -> &'static str {
        match self {
            AttrValue::S(_) => "S",
            AttrValue::N(_) => "N",
            AttrValue::B(_) => "B",
            AttrValue::Bool(_) => "BOOL",
            AttrValue::Null => "NULL",
            AttrValue::Ss(_) => "SS",
            AttrValue::Ns(_) => "NS",
            AttrValue::Bs(_) => "BS",
            AttrValue::L(_) => "L",
            AttrValue::M(_) => "M",
        }
    }

    /// Whether this value may be used as a hash or range key.
    pub fn is_key_type(&self) -> bool {
        matches!(self, AttrValue::S(_) | AttrValue::N(_) | AttrValue::B(_))
    }

    /// A number value from a float, rejecting values without an exact decimal form.
    pub fn number(value: f64) -> Result<Self, NumberError> {
        number::format_float(value).map(AttrValue::N)
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttrValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttrValue::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_m(&self) -> Option<&Item> {
        match self {
            AttrValue::M(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Size of the value by the store's accounting rules.
    pub fn size(&self) -> usize {
        match self {
            AttrValue::S(s) => s.len(),
            AttrValue::N(n) => number_size(n),
            AttrValue::B(b) => b.len(),
            AttrValue::Bool(_) | AttrValue::Null => 1,
            AttrValue::Ss(ss) => ss.iter().map(String::len).sum(),
            AttrValue::Ns(ns) => ns.iter().map(|n| number_size(n)).sum(),
            AttrValue::Bs(bs) => bs.iter().map(Vec::len).sum(),
            AttrValue::L(items) => 3 + items.iter().map(|v| 1 + v.size()).sum::<usize>(),
            AttrValue::M(map) => 3 + item_size(map) + map.len(),
        }
    }
}

/// Numbers are billed at roughly one byte per two significant digits, plus one.
fn number_size(n: &str) -> usize {
    let digits = n.bytes().filter(u8::is_ascii_digit).count();
    digits.div_ceil(2) + 1
}

/// Encoded size of an item: attribute name bytes plus value sizes.
pub fn item_size(item: &Item) -> usize {
    item.iter().map(|(name, value)| name.len() + value.size()).sum()
}

/// Reject items larger than [`MAX_ITEM_SIZE`].
pub fn validate_item_size(item: &Item) -> Result<(), EncodingError> {
    let actual = item_size(item);
    if actual > MAX_ITEM_SIZE {
        return Err(EncodingError::ItemTooLarge {
            max: MAX_ITEM_SIZE,
            actual,
        });
    }
    Ok(())
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::S(s) => write!(f, "{s:?}"),
            AttrValue::N(n) => f.write_str(n),
            AttrValue::B(b) => write!(f, "<{} bytes>", b.len()),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Null => f.write_str("null"),
            AttrValue::Ss(ss) => write!(f, "{ss:?}"),
            AttrValue::Ns(ns) => write!(f, "[{}]", ns.join(", ")),
            AttrValue::Bs(bs) => write!(f, "<{} binaries>", bs.len()),
            AttrValue::L(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            AttrValue::M(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::S(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::S(s.to_string())
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<Binary> for AttrValue {
    fn from(b: Binary) -> Self {
        AttrValue::B(b.into_inner())
    }
}

impl From<Item> for AttrValue {
    fn from(m: Item) -> Self {
        AttrValue::M(m)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for AttrValue {
                fn from(n: $t) -> Self {
                    AttrValue::N(n.to_string())
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl TryFrom<f64> for AttrValue {
    type Error = NumberError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        AttrValue::number(value)
    }
}

impl TryFrom<f32> for AttrValue {
    type Error = NumberError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        number::format_float32(value).map(AttrValue::N)
    }
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// A primary key value: hash key plus optional range key.
///
/// Attribute names come from the [`Record`](crate::api::Record) type the key
/// is used with.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub hash: AttrValue,
    pub range: Option<AttrValue>,
}

impl Key {
    pub fn new(hash: impl Into<AttrValue>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
        }
    }

    pub fn with_range(mut self, range: impl Into<AttrValue>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Build the key item for a table keyed by `hash_name` and `range_name`.
    pub fn to_item(
        &self,
        hash_name: &str,
        range_name: Option<&str>,
    ) -> Result<Item, EncodingError> {
        let mut item = Item::new();
        check_key_type(hash_name, &self.hash)?;
        item.insert(hash_name.to_string(), self.hash.clone());

        match (range_name, &self.range) {
            (Some(name), Some(value)) => {
                check_key_type(name, value)?;
                item.insert(name.to_string(), value.clone());
            }
            (Some(name), None) => {
                return Err(EncodingError::MissingKeyAttribute(name.to_string()));
            }
            (None, Some(_)) => {
                return Err(EncodingError::UnexpectedRangeKey(hash_name.to_string()));
            }
            (None, None) => {}
        }

        Ok(item)
    }

    /// Extract the key attributes from a full item.
    pub fn from_item(
        item: &Item,
        hash_name: &str,
        range_name: Option<&str>,
    ) -> Result<Self, EncodingError> {
        let hash = item
            .get(hash_name)
            .ok_or_else(|| EncodingError::MissingKeyAttribute(hash_name.to_string()))?;
        check_key_type(hash_name, hash)?;

        let range = match range_name {
            Some(name) => {
                let value = item
                    .get(name)
                    .ok_or_else(|| EncodingError::MissingKeyAttribute(name.to_string()))?;
                check_key_type(name, value)?;
                Some(value.clone())
            }
            None => None,
        };

        Ok(Self {
            hash: hash.clone(),
            range,
        })
    }
}

fn check_key_type(name: &str, value: &AttrValue) -> Result<(), EncodingError> {
    if value.is_key_type() {
        Ok(())
    } else {
        Err(EncodingError::InvalidKeyType {
            name: name.to_string(),
            type_tag: value.type_tag(),
        })
    }
}

macro_rules! impl_key_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Key {
                fn from(hash: $t) -> Self {
                    Key::new(hash)
                }
            }
        )*
    };
}

impl_key_from!(String, &str, i32, i64, u32, u64, Binary);

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Opaque continuation token issued by the store: where a paged read stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor(Item);

impl Cursor {
    pub fn new(last_evaluated_key: Item) -> Self {
        Self(last_evaluated_key)
    }

    /// The store-issued position this cursor resumes after.
    pub fn last_evaluated_key(&self) -> &Item {
        &self.0
    }

    pub fn into_inner(self) -> Item {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_to_item_hash_only() {
        let item = Key::new("alice").to_item("Id", None).unwrap();
        assert_eq!(item.len(), 1);
        assert_eq!(item["Id"], AttrValue::S("alice".to_string()));
    }

    #[test]
    fn test_key_to_item_with_range() {
        let item = Key::new("alice")
            .with_range(7)
            .to_item("Id", Some("Seq"))
            .unwrap();
        assert_eq!(item["Seq"], AttrValue::N("7".to_string()));
    }

    #[test]
    fn test_key_missing_range() {
        let err = Key::new("alice").to_item("Id", Some("Seq")).unwrap_err();
        assert!(matches!(err, EncodingError::MissingKeyAttribute(name) if name == "Seq"));
    }

    #[test]
    fn test_key_unexpected_range() {
        let err = Key::new("alice").with_range(1).to_item("Id", None).unwrap_err();
        assert!(matches!(err, EncodingError::UnexpectedRangeKey(_)));
    }

    #[test]
    fn test_key_rejects_non_scalar() {
        let err = Key::new(true).to_item("Id", None).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::InvalidKeyType { type_tag: "BOOL", .. }
        ));
    }

    #[test]
    fn test_key_from_item() {
        let mut item = Item::new();
        item.insert("Id".to_string(), AttrValue::from("a"));
        item.insert("Seq".to_string(), AttrValue::from(3));
        item.insert("Name".to_string(), AttrValue::from("x"));
        let key = Key::from_item(&item, "Id", Some("Seq")).unwrap();
        assert_eq!(key, Key::new("a").with_range(3));
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(
            AttrValue::try_from(1.5).unwrap(),
            AttrValue::N("1.5".to_string())
        );
        assert!(AttrValue::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_item_size_limit() {
        let mut item = Item::new();
        item.insert("blob".to_string(), AttrValue::B(vec![0; MAX_ITEM_SIZE]));
        assert!(matches!(
            validate_item_size(&item),
            Err(EncodingError::ItemTooLarge { .. })
        ));

        let mut small = Item::new();
        small.insert("Id".to_string(), AttrValue::from("a"));
        assert!(validate_item_size(&small).is_ok());
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(AttrValue::Null.type_tag(), "NULL");
        assert_eq!(AttrValue::Ss(vec![]).type_tag(), "SS");
        assert_eq!(AttrValue::M(Item::new()).type_tag(), "M");
    }
}
