//! Attribute value → record decoding.
//!
//! The inverse of [`super::ser`]: numbers are parsed into exactly the width
//! the target field declares, sets and lists both feed sequences, and keys in
//! the item that the target does not name are ignored.

use std::collections::btree_map;
use std::str::FromStr;
use std::vec;

use serde::de::value::StringDeserializer;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;

use crate::error::DecodingError;
use crate::types::{AttrValue, Item};

/// Decode an attribute value into any deserializable type.
pub fn from_attr<T: DeserializeOwned>(value: AttrValue) -> Result<T, DecodingError> {
    T::deserialize(AttrDeserializer(value))
}

/// Decode an item into a record.
pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T, DecodingError> {
    from_attr(AttrValue::M(item))
}

struct AttrDeserializer(AttrValue);

impl AttrDeserializer {
    fn parse_number<T: FromStr>(self, target: &'static str) -> Result<T, DecodingError> {
        match self.0 {
            AttrValue::N(text) => match text.parse::<T>() {
                Ok(n) => Ok(n),
                Err(_) => Err(DecodingError::InvalidNumber {
                    field: String::new(),
                    value: text,
                    target,
                }),
            },
            other => Err(DecodingError::mismatch("N", other.type_tag())),
        }
    }
}

macro_rules! deserialize_number {
    ($($method:ident => $visit:ident: $t:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
                visitor.$visit(self.parse_number::<$t>(stringify!($t))?)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for AttrDeserializer {
    type Error = DecodingError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        match self.0 {
            AttrValue::S(s) => visitor.visit_string(s),
            AttrValue::N(text) => {
                if let Ok(n) = text.parse::<i64>() {
                    visitor.visit_i64(n)
                } else if let Ok(n) = text.parse::<u64>() {
                    visitor.visit_u64(n)
                } else if let Ok(n) = text.parse::<f64>() {
                    visitor.visit_f64(n)
                } else {
                    Err(DecodingError::InvalidNumber {
                        field: String::new(),
                        value: text,
                        target: "number",
                    })
                }
            }
            AttrValue::B(b) => visitor.visit_byte_buf(b),
            AttrValue::Bool(b) => visitor.visit_bool(b),
            AttrValue::Null => visitor.visit_unit(),
            AttrValue::M(map) => visit_map(map, visitor),
            seq => visit_seq(seq, visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        match self.0 {
            AttrValue::Bool(b) => visitor.visit_bool(b),
            other => Err(DecodingError::mismatch("BOOL", other.type_tag())),
        }
    }

    deserialize_number! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        match self.0 {
            AttrValue::S(s) => visitor.visit_string(s),
            other => Err(DecodingError::mismatch("S", other.type_tag())),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        match self.0 {
            AttrValue::B(b) => visitor.visit_byte_buf(b),
            other => Err(DecodingError::mismatch("B", other.type_tag())),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        match self.0 {
            AttrValue::Null => visitor.visit_none(),
            other => visitor.visit_some(AttrDeserializer(other)),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        match self.0 {
            AttrValue::Null => visitor.visit_unit(),
            other => Err(DecodingError::mismatch("NULL", other.type_tag())),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        match self.0 {
            AttrValue::Null => visit_seq(AttrValue::L(Vec::new()), visitor),
            seq @ (AttrValue::Ss(_) | AttrValue::Ns(_) | AttrValue::Bs(_) | AttrValue::L(_)) => {
                visit_seq(seq, visitor)
            }
            other => Err(DecodingError::mismatch("L", other.type_tag())),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        match self.0 {
            AttrValue::M(map) => visit_map(map, visitor),
            AttrValue::Null => visit_map(Item::new(), visitor),
            other => Err(DecodingError::mismatch("M", other.type_tag())),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        match self.0 {
            AttrValue::S(variant) => visitor.visit_enum(EnumDeserializer {
                variant,
                value: None,
            }),
            AttrValue::M(map) if map.len() == 1 => {
                let mut entries = map.into_iter();
                match entries.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer {
                        variant,
                        value: Some(value),
                    }),
                    None => Err(DecodingError::mismatch("S", "M")),
                }
            }
            other => Err(DecodingError::mismatch("S", other.type_tag())),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        visitor.visit_unit()
    }
}

fn visit_seq<'de, V: Visitor<'de>>(seq: AttrValue, visitor: V) -> Result<V::Value, DecodingError> {
    let items: Vec<AttrValue> = match seq {
        AttrValue::Ss(values) => values.into_iter().map(AttrValue::S).collect(),
        AttrValue::Ns(values) => values.into_iter().map(AttrValue::N).collect(),
        AttrValue::Bs(values) => values.into_iter().map(AttrValue::B).collect(),
        AttrValue::L(values) => values,
        other => return Err(DecodingError::mismatch("L", other.type_tag())),
    };
    let total = items.len();
    let mut access = SeqDeserializer {
        iter: items.into_iter(),
        index: 0,
    };
    let value = visitor.visit_seq(&mut access)?;
    if access.iter.len() > 0 {
        return Err(de::Error::invalid_length(total, &"fewer elements"));
    }
    Ok(value)
}

fn visit_map<'de, V: Visitor<'de>>(map: Item, visitor: V) -> Result<V::Value, DecodingError> {
    visitor.visit_map(MapDeserializer {
        iter: map.into_iter(),
        pending: None,
    })
}

// ---------------------------------------------------------------------------
// Sequence and map access
// ---------------------------------------------------------------------------

struct SeqDeserializer {
    iter: vec::IntoIter<AttrValue>,
    index: usize,
}

impl<'de> SeqAccess<'de> for SeqDeserializer {
    type Error = DecodingError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DecodingError> {
        let Some(value) = self.iter.next() else {
            return Ok(None);
        };
        let index = self.index;
        self.index += 1;
        seed.deserialize(AttrDeserializer(value))
            .map(Some)
            .map_err(|e| e.at(&format!("[{index}]")))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: btree_map::IntoIter<String, AttrValue>,
    pending: Option<(String, AttrValue)>,
}

impl<'de> MapAccess<'de> for MapDeserializer {
    type Error = DecodingError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DecodingError> {
        let Some((key, value)) = self.iter.next() else {
            return Ok(None);
        };
        let decoded = seed
            .deserialize(MapKeyDeserializer(key.clone()))
            .map_err(|e| e.at(&key))?;
        self.pending = Some((key, value));
        Ok(Some(decoded))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, DecodingError> {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| <DecodingError as de::Error>::custom("map value without a key"))?;
        seed.deserialize(AttrDeserializer(value))
            .map_err(|e| e.at(&key))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

// ---------------------------------------------------------------------------
// Map keys: attribute names parsed back into the key type
// ---------------------------------------------------------------------------

struct MapKeyDeserializer(String);

impl MapKeyDeserializer {
    fn parse<T: FromStr>(self, target: &'static str) -> Result<T, DecodingError> {
        match self.0.parse::<T>() {
            Ok(n) => Ok(n),
            Err(_) => Err(DecodingError::InvalidNumber {
                field: String::new(),
                value: self.0,
                target,
            }),
        }
    }
}

macro_rules! deserialize_key_number {
    ($($method:ident => $visit:ident: $t:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
                visitor.$visit(self.parse::<$t>(stringify!($t))?)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for MapKeyDeserializer {
    type Error = DecodingError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodingError> {
        visitor.visit_string(self.0)
    }

    deserialize_key_number! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        let variant: StringDeserializer<DecodingError> = self.0.into_deserializer();
        visitor.visit_enum(variant)
    }

    forward_to_deserialize_any! {
        bool f32 f64 char str string bytes byte_buf option unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

struct EnumDeserializer {
    variant: String,
    value: Option<AttrValue>,
}

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = DecodingError;
    type Variant = VariantDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, VariantDeserializer), DecodingError> {
        let name: StringDeserializer<DecodingError> = self.variant.clone().into_deserializer();
        let decoded = seed.deserialize(name)?;
        Ok((
            decoded,
            VariantDeserializer {
                variant: self.variant,
                value: self.value,
            },
        ))
    }
}

struct VariantDeserializer {
    variant: String,
    value: Option<AttrValue>,
}

impl VariantDeserializer {
    fn payload(self) -> Result<(String, AttrValue), DecodingError> {
        match self.value {
            Some(value) => Ok((self.variant, value)),
            None => Err(DecodingError::mismatch("M", "S")),
        }
    }
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = DecodingError;

    fn unit_variant(self) -> Result<(), DecodingError> {
        match self.value {
            None | Some(AttrValue::Null) => Ok(()),
            Some(other) => Err(DecodingError::mismatch("S", other.type_tag()).at(&self.variant)),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, DecodingError> {
        let (variant, value) = self.payload()?;
        seed.deserialize(AttrDeserializer(value))
            .map_err(|e| e.at(&variant))
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        let (variant, value) = self.payload()?;
        de::Deserializer::deserialize_seq(AttrDeserializer(value), visitor)
            .map_err(|e| e.at(&variant))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodingError> {
        let (variant, value) = self.payload()?;
        de::Deserializer::deserialize_map(AttrDeserializer(value), visitor)
            .map_err(|e| e.at(&variant))
    }
}
