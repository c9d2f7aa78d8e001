use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::encoding;
use crate::error::{DecodingError, EncodingError};
use crate::types::{Item, Key, validate_item_size};

/// An application type stored in a collection.
///
/// Field names (after any `#[serde(rename)]`) are the attribute names. The
/// key attribute names are declared once per type:
///
/// ```
/// use dynamap_core::api::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Reading {
///     #[serde(rename = "Sensor")]
///     sensor: String,
///     #[serde(rename = "At")]
///     at: u64,
///     value: f64,
/// }
///
/// impl Record for Reading {
///     const HASH_KEY: &'static str = "Sensor";
///     const RANGE_KEY: Option<&'static str> = Some("At");
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned {
    /// Attribute name of the hash key.
    const HASH_KEY: &'static str;

    /// Attribute name of the range key, if the collection has one.
    const RANGE_KEY: Option<&'static str> = None;

    /// Encode this record as an item, enforcing the item size limit.
    fn to_item(&self) -> Result<Item, EncodingError> {
        let item = encoding::to_item(self)?;
        validate_item_size(&item)?;
        Ok(item)
    }

    fn from_item(item: Item) -> Result<Self, DecodingError> {
        encoding::from_item(item)
    }

    /// This record's primary key.
    fn key(&self) -> Result<Key, EncodingError> {
        let item = encoding::to_item(self)?;
        Key::from_item(&item, Self::HASH_KEY, Self::RANGE_KEY)
    }

    /// The key attribute names, hash first.
    fn key_attributes() -> Vec<&'static str> {
        let mut names = vec![Self::HASH_KEY];
        names.extend(Self::RANGE_KEY);
        names
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::types::{AttrValue, MAX_ITEM_SIZE};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Event {
        #[serde(rename = "Stream")]
        stream: String,
        #[serde(rename = "Seq")]
        seq: u64,
        body: String,
    }

    impl Record for Event {
        const HASH_KEY: &'static str = "Stream";
        const RANGE_KEY: Option<&'static str> = Some("Seq");
    }

    #[test]
    fn test_key_from_record() {
        let e = Event {
            stream: "s1".to_string(),
            seq: 4,
            body: "hello".to_string(),
        };
        assert_eq!(e.key().unwrap(), Key::new("s1").with_range(4u64));
        assert_eq!(Event::key_attributes(), vec!["Stream", "Seq"]);
    }

    #[test]
    fn test_item_roundtrip() {
        let e = Event {
            stream: "s1".to_string(),
            seq: 4,
            body: "hello".to_string(),
        };
        let item = e.to_item().unwrap();
        assert_eq!(item["body"], AttrValue::from("hello"));
        assert_eq!(Event::from_item(item).unwrap(), e);
    }

    #[test]
    fn test_oversized_record_rejected() {
        let e = Event {
            stream: "s1".to_string(),
            seq: 1,
            body: "x".repeat(MAX_ITEM_SIZE),
        };
        assert!(matches!(
            e.to_item(),
            Err(EncodingError::ItemTooLarge { .. })
        ));
    }
}
