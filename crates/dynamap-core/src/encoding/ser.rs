//! Record → attribute value encoding.
//!
//! [`to_attr`] walks any `Serialize` value and produces the store's tagged
//! representation. Structs and maps become `M`, sequences become a typed set
//! when every element is a distinct `S`, `N` or `B`, and `L` otherwise.

use std::collections::BTreeSet;

use serde::Serialize;
use serde::ser::{self, Impossible};

use crate::encoding::number;
use crate::error::{EncodingError, NumberError};
use crate::types::{AttrValue, Item};

/// Encode any serializable value as an attribute value.
pub fn to_attr<T: Serialize + ?Sized>(value: &T) -> Result<AttrValue, EncodingError> {
    value.serialize(AttrSerializer)
}

/// Encode a record as an item. The value must serialize to a map.
pub fn to_item<T: Serialize + ?Sized>(value: &T) -> Result<Item, EncodingError> {
    match to_attr(value)? {
        AttrValue::M(item) => Ok(item),
        other => Err(EncodingError::NotAMap(other.type_tag())),
    }
}

fn number_value(text: Result<String, NumberError>) -> Result<AttrValue, EncodingError> {
    text.map(AttrValue::N).map_err(|source| EncodingError::Number {
        field: String::new(),
        source,
    })
}

struct AttrSerializer;

impl ser::Serializer for AttrSerializer {
    type Ok = AttrValue;
    type Error = EncodingError;

    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = VariantSerializer<SeqSerializer>;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = VariantSerializer<MapSerializer>;

    fn serialize_bool(self, v: bool) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::N(v.to_string()))
    }

    fn serialize_i16(self, v: i16) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::N(v.to_string()))
    }

    fn serialize_i32(self, v: i32) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::N(v.to_string()))
    }

    fn serialize_i64(self, v: i64) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::N(v.to_string()))
    }

    fn serialize_i128(self, v: i128) -> Result<AttrValue, EncodingError> {
        number_value(number::format_integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::N(v.to_string()))
    }

    fn serialize_u16(self, v: u16) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::N(v.to_string()))
    }

    fn serialize_u32(self, v: u32) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::N(v.to_string()))
    }

    fn serialize_u64(self, v: u64) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::N(v.to_string()))
    }

    fn serialize_u128(self, v: u128) -> Result<AttrValue, EncodingError> {
        number_value(number::format_integer(v))
    }

    fn serialize_f32(self, v: f32) -> Result<AttrValue, EncodingError> {
        number_value(number::format_float32(v))
    }

    fn serialize_f64(self, v: f64) -> Result<AttrValue, EncodingError> {
        number_value(number::format_float(v))
    }

    fn serialize_char(self, v: char) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::S(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::S(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::B(v.to_vec()))
    }

    fn serialize_none(self) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::Null)
    }

    /// `Some(x)` encodes as `x`. An inner value that itself encodes as NULL
    /// (`Some(None)`, `Some(())`) is rejected, since it would read back as
    /// `None`.
    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<AttrValue, EncodingError> {
        match value.serialize(self)? {
            AttrValue::Null => Err(EncodingError::Unsupported {
                field: String::new(),
                type_name: "Some value that encodes as NULL",
            }),
            encoded => Ok(encoded),
        }
    }

    fn serialize_unit(self) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::S(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<AttrValue, EncodingError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<AttrValue, EncodingError> {
        let inner = to_attr(value).map_err(|e| e.at(variant))?;
        let mut map = Item::new();
        map.insert(variant.to_string(), inner);
        Ok(AttrValue::M(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer, EncodingError> {
        Ok(SeqSerializer::new(len.unwrap_or(0), true))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer, EncodingError> {
        Ok(SeqSerializer::new(len, false))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqSerializer, EncodingError> {
        Ok(SeqSerializer::new(len, false))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSerializer<SeqSerializer>, EncodingError> {
        Ok(VariantSerializer {
            variant,
            inner: SeqSerializer::new(len, false),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapSerializer, EncodingError> {
        Ok(MapSerializer::default())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<MapSerializer, EncodingError> {
        Ok(MapSerializer::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantSerializer<MapSerializer>, EncodingError> {
        Ok(VariantSerializer {
            variant,
            inner: MapSerializer::default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

struct SeqSerializer {
    items: Vec<AttrValue>,
    /// Whether a homogeneous scalar sequence may become a typed set.
    as_set: bool,
}

impl SeqSerializer {
    fn new(capacity: usize, as_set: bool) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            as_set,
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodingError> {
        let index = self.items.len();
        let attr = to_attr(value).map_err(|e| e.at(&format!("[{index}]")))?;
        self.items.push(attr);
        Ok(())
    }

    fn finish(self) -> AttrValue {
        if self.as_set {
            into_set(self.items)
        } else {
            AttrValue::L(self.items)
        }
    }
}

/// Collapse a sequence into `SS`/`NS`/`BS` when it is non-empty, all one
/// scalar type and free of duplicates; otherwise keep it as a list.
fn into_set(items: Vec<AttrValue>) -> AttrValue {
    let Some(tag) = items.first().map(AttrValue::type_tag) else {
        return AttrValue::L(items);
    };
    if !matches!(tag, "S" | "N" | "B")
        || items.iter().any(|v| v.type_tag() != tag)
        || !all_distinct(&items)
    {
        return AttrValue::L(items);
    }

    let mut texts = Vec::new();
    let mut binaries = Vec::new();
    for item in items {
        match item {
            AttrValue::S(s) | AttrValue::N(s) => texts.push(s),
            AttrValue::B(b) => binaries.push(b),
            _ => {}
        }
    }
    match tag {
        "S" => AttrValue::Ss(texts),
        "N" => AttrValue::Ns(texts),
        _ => AttrValue::Bs(binaries),
    }
}

fn all_distinct(items: &[AttrValue]) -> bool {
    let mut seen = BTreeSet::new();
    items.iter().all(|v| match v {
        AttrValue::S(s) | AttrValue::N(s) => seen.insert(s.as_bytes()),
        AttrValue::B(b) => seen.insert(b.as_slice()),
        _ => false,
    })
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = AttrValue;
    type Error = EncodingError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodingError> {
        self.push(value)
    }

    fn end(self) -> Result<AttrValue, EncodingError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = AttrValue;
    type Error = EncodingError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodingError> {
        self.push(value)
    }

    fn end(self) -> Result<AttrValue, EncodingError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = AttrValue;
    type Error = EncodingError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodingError> {
        self.push(value)
    }

    fn end(self) -> Result<AttrValue, EncodingError> {
        Ok(self.finish())
    }
}

// ---------------------------------------------------------------------------
// Maps and structs
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MapSerializer {
    map: Item,
    next_key: Option<String>,
}

impl MapSerializer {
    fn insert<T: Serialize + ?Sized>(&mut self, key: String, value: &T) -> Result<(), EncodingError> {
        let attr = to_attr(value).map_err(|e| e.at(&key))?;
        self.map.insert(key, attr);
        Ok(())
    }
}

impl ser::SerializeMap for MapSerializer {
    type Ok = AttrValue;
    type Error = EncodingError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), EncodingError> {
        self.next_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodingError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| <EncodingError as ser::Error>::custom("map value without a key"))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::M(self.map))
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = AttrValue;
    type Error = EncodingError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodingError> {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<AttrValue, EncodingError> {
        Ok(AttrValue::M(self.map))
    }
}

// ---------------------------------------------------------------------------
// Enum variants with data: a single-entry map keyed by the variant name
// ---------------------------------------------------------------------------

struct VariantSerializer<T> {
    variant: &'static str,
    inner: T,
}

impl<T> VariantSerializer<T> {
    fn wrap(variant: &'static str, value: AttrValue) -> AttrValue {
        let mut map = Item::new();
        map.insert(variant.to_string(), value);
        AttrValue::M(map)
    }
}

impl ser::SerializeTupleVariant for VariantSerializer<SeqSerializer> {
    type Ok = AttrValue;
    type Error = EncodingError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodingError> {
        let variant = self.variant;
        self.inner.push(value).map_err(|e| e.at(variant))
    }

    fn end(self) -> Result<AttrValue, EncodingError> {
        Ok(Self::wrap(self.variant, self.inner.finish()))
    }
}

impl ser::SerializeStructVariant for VariantSerializer<MapSerializer> {
    type Ok = AttrValue;
    type Error = EncodingError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodingError> {
        let variant = self.variant;
        self.inner
            .insert(key.to_string(), value)
            .map_err(|e| e.at(variant))
    }

    fn end(self) -> Result<AttrValue, EncodingError> {
        Ok(Self::wrap(self.variant, AttrValue::M(self.inner.map)))
    }
}

// ---------------------------------------------------------------------------
// Map keys: attribute names are strings, so only string-like keys are allowed
// ---------------------------------------------------------------------------

struct MapKeySerializer;

fn unsupported_key(type_name: &'static str) -> EncodingError {
    EncodingError::Unsupported {
        field: String::new(),
        type_name,
    }
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = EncodingError;

    type SerializeSeq = Impossible<String, EncodingError>;
    type SerializeTuple = Impossible<String, EncodingError>;
    type SerializeTupleStruct = Impossible<String, EncodingError>;
    type SerializeTupleVariant = Impossible<String, EncodingError>;
    type SerializeMap = Impossible<String, EncodingError>;
    type SerializeStruct = Impossible<String, EncodingError>;
    type SerializeStructVariant = Impossible<String, EncodingError>;

    fn serialize_bool(self, _v: bool) -> Result<String, EncodingError> {
        Err(unsupported_key("bool map key"))
    }

    fn serialize_i8(self, v: i8) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_i128(self, v: i128) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_u128(self, v: u128) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String, EncodingError> {
        Err(unsupported_key("f32 map key"))
    }

    fn serialize_f64(self, _v: f64) -> Result<String, EncodingError> {
        Err(unsupported_key("f64 map key"))
    }

    fn serialize_char(self, v: char) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, EncodingError> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, EncodingError> {
        Err(unsupported_key("bytes map key"))
    }

    fn serialize_none(self) -> Result<String, EncodingError> {
        Err(unsupported_key("option map key"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<String, EncodingError> {
        Err(unsupported_key("option map key"))
    }

    fn serialize_unit(self) -> Result<String, EncodingError> {
        Err(unsupported_key("unit map key"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, EncodingError> {
        Err(unsupported_key("unit struct map key"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, EncodingError> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, EncodingError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, EncodingError> {
        Err(unsupported_key("enum map key"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, EncodingError> {
        Err(unsupported_key("sequence map key"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, EncodingError> {
        Err(unsupported_key("tuple map key"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, EncodingError> {
        Err(unsupported_key("tuple map key"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, EncodingError> {
        Err(unsupported_key("enum map key"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, EncodingError> {
        Err(unsupported_key("map map key"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, EncodingError> {
        Err(unsupported_key("struct map key"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, EncodingError> {
        Err(unsupported_key("enum map key"))
    }
}
