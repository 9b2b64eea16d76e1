// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Inkbunny client library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Flattening of request structs into form fields.
//!
//! [to_form_values] is a serde [Serializer](ser::Serializer) which turns any struct into an
//! ordered list of `(wire name, value)` pairs, ready to be sent as an
//! `application/x-www-form-urlencoded` or `multipart/form-data` body. The field metadata comes
//! from `#[derive(Serialize)]`:
//!
//! * `#[serde(rename = "...")]` is the wire name,
//! * `#[serde(skip)]` drops a field,
//! * `#[serde(skip_serializing_if = "...")]` omits a field when it is empty,
//! * `#[serde(flatten)]` merges a nested struct or map into the parent without any key prefix.
//!
//! A nested struct or map in a named field is not embedded. It is sent as a single value under
//! the field's name, rendered as JSON text.
//!
//! `Option` carries the partial-update contract of the API: `None` means "leave unchanged" and
//! is never sent, while `Some(value)` is always sent, even when `value` renders as an empty
//! string, because an empty value clears the field on the server. A non-optional field that
//! renders empty is not sent.
//!
//! Leaf values are rendered from the serde data model in this order: raw bytes (must be
//! UTF-8), a `Display` implementation reached through `collect_str`, whatever string the type's
//! own `Serialize` produces, and finally the primitive kind (`true`/`false`, decimal numbers,
//! shortest round-trip floats, comma-joined sequences, enum variant names).

use serde::ser::{self, Impossible, Serialize, SerializeMap};
use snafu::{ResultExt, Snafu};
use std::fmt::Display;
use std::string::FromUtf8Error;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FormError {
    #[snafu(display("form values can only be built from a struct or a map, got {}", kind))]
    UnsupportedRoot { kind: &'static str },
    #[snafu(display("{} cannot be converted to a form value", kind))]
    UnsupportedValue { kind: &'static str },
    #[snafu(display("form value is not valid UTF-8: {}", source))]
    InvalidUtf8 { source: FromUtf8Error },
    #[snafu(display("failed to render field {:?} as JSON: {}", key, source))]
    Json {
        key: String,
        source: serde_json::Error,
    },
    #[snafu(display("{}", message))]
    Custom { message: String },
}

impl ser::Error for FormError {
    fn custom<T: Display>(msg: T) -> Self {
        FormError::Custom {
            message: msg.to_string(),
        }
    }
}

pub type Result<T, E = FormError> = std::result::Result<T, E>;

/// An ordered multi-map of form fields.
///
/// Insertion order is preserved so that encoding the same request twice yields byte-identical
/// bodies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormValues {
    pairs: Vec<(String, String)>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping any existing values for `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Replace all values for `key` with a single value.
    ///
    /// The value takes the position of the first existing entry, or is appended if `key` was
    /// absent.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter().position(|(k, _)| *k == key) {
            Some(first) => {
                self.pairs[first].1 = value;
                let mut index = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = index <= first || *k != key;
                    index += 1;
                    keep
                });
            }
            None => self.pairs.push((key, value)),
        }
    }

    /// The first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Remove every value for `key`, returning how many were removed.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.pairs.len();
        self.pairs.retain(|(k, _)| k != key);
        before - self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode as an `application/x-www-form-urlencoded` body or query string.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for FormValues {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.add(k, v);
        }
    }
}

impl<K: Into<String>, V: Into<String>> std::iter::FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        values.extend(iter);
        values
    }
}

impl IntoIterator for FormValues {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// Serializes as a map with repeated keys, so prebuilt values can be embedded in a request.
impl Serialize for FormValues {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (k, v) in &self.pairs {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Flatten a struct (or a reference, `Option` or map) into ordered form fields.
///
/// Fails if the root is not struct-shaped or a field has no form representation.
pub fn to_form_values<T: ?Sized + Serialize>(value: &T) -> Result<FormValues> {
    let mut values = FormValues::new();
    value.serialize(RootSerializer {
        output: &mut values,
    })?;
    Ok(values)
}

struct RootSerializer<'a> {
    output: &'a mut FormValues,
}

impl RootSerializer<'_> {
    fn unsupported(kind: &'static str) -> Result<()> {
        UnsupportedRootSnafu { kind }.fail()
    }
}

impl<'a> ser::Serializer for RootSerializer<'a> {
    type Ok = ();
    type Error = FormError;
    type SerializeSeq = Impossible<(), FormError>;
    type SerializeTuple = Impossible<(), FormError>;
    type SerializeTupleStruct = Impossible<(), FormError>;
    type SerializeTupleVariant = Impossible<(), FormError>;
    type SerializeMap = MapSerializer<'a>;
    type SerializeStruct = StructSerializer<'a>;
    type SerializeStructVariant = Impossible<(), FormError>;

    fn serialize_bool(self, _v: bool) -> Result<()> {
        Self::unsupported("bool")
    }

    fn serialize_i8(self, _v: i8) -> Result<()> {
        Self::unsupported("integer")
    }

    fn serialize_i16(self, _v: i16) -> Result<()> {
        Self::unsupported("integer")
    }

    fn serialize_i32(self, _v: i32) -> Result<()> {
        Self::unsupported("integer")
    }

    fn serialize_i64(self, _v: i64) -> Result<()> {
        Self::unsupported("integer")
    }

    fn serialize_u8(self, _v: u8) -> Result<()> {
        Self::unsupported("integer")
    }

    fn serialize_u16(self, _v: u16) -> Result<()> {
        Self::unsupported("integer")
    }

    fn serialize_u32(self, _v: u32) -> Result<()> {
        Self::unsupported("integer")
    }

    fn serialize_u64(self, _v: u64) -> Result<()> {
        Self::unsupported("integer")
    }

    fn serialize_f32(self, _v: f32) -> Result<()> {
        Self::unsupported("float")
    }

    fn serialize_f64(self, _v: f64) -> Result<()> {
        Self::unsupported("float")
    }

    fn serialize_char(self, _v: char) -> Result<()> {
        Self::unsupported("char")
    }

    fn serialize_str(self, _v: &str) -> Result<()> {
        Self::unsupported("string")
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<()> {
        Self::unsupported("bytes")
    }

    // A missing root is the same as a struct with nothing to send.
    fn serialize_none(self) -> Result<()> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Self::unsupported("unit")
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        Self::unsupported("enum")
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Self::unsupported("enum")
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        UnsupportedRootSnafu { kind: "sequence" }.fail()
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        UnsupportedRootSnafu { kind: "tuple" }.fail()
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        UnsupportedRootSnafu { kind: "tuple struct" }.fail()
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        UnsupportedRootSnafu { kind: "enum" }.fail()
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(MapSerializer::new(self.output))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(StructSerializer {
            output: self.output,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        UnsupportedRootSnafu { kind: "enum" }.fail()
    }
}

pub(crate) struct StructSerializer<'a> {
    output: &'a mut FormValues,
}

impl ser::SerializeStruct for StructSerializer<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(FieldSerializer::new(key.to_string(), self.output))
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

pub(crate) struct MapSerializer<'a> {
    output: &'a mut FormValues,
    key: Option<String>,
}

impl<'a> MapSerializer<'a> {
    fn new(output: &'a mut FormValues) -> Self {
        Self { output, key: None }
    }
}

impl ser::SerializeMap for MapSerializer<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.key = Some(key.serialize(ValueSerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self.key.take().ok_or_else(|| FormError::Custom {
            message: "map value serialized before its key".into(),
        })?;
        value.serialize(FieldSerializer::new(key, self.output))
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Serializes the value of one field, which is either a leaf or an embedded struct.
struct FieldSerializer<'a> {
    key: String,
    output: &'a mut FormValues,
    // Set once the value has been reached through `Some`.
    explicit: bool,
}

impl<'a> FieldSerializer<'a> {
    fn new(key: String, output: &'a mut FormValues) -> Self {
        Self {
            key,
            output,
            explicit: false,
        }
    }

    fn emit(self, value: String) -> Result<()> {
        if self.explicit || !value.is_empty() {
            self.output.add(self.key, value);
        }
        Ok(())
    }
}

impl<'a> ser::Serializer for FieldSerializer<'a> {
    type Ok = ();
    type Error = FormError;
    type SerializeSeq = JoinSerializer<'a>;
    type SerializeTuple = JoinSerializer<'a>;
    type SerializeTupleStruct = JoinSerializer<'a>;
    type SerializeTupleVariant = Impossible<(), FormError>;
    type SerializeMap = JsonSerializer<'a>;
    type SerializeStruct = JsonSerializer<'a>;
    type SerializeStructVariant = Impossible<(), FormError>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        let value = ValueSerializer.serialize_bool(v)?;
        self.emit(value)
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i64(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i64(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.serialize_i64(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        let value = ValueSerializer.serialize_i64(v)?;
        self.emit(value)
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        let value = ValueSerializer.serialize_i128(v)?;
        self.emit(value)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_u64(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_u64(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_u64(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        let value = ValueSerializer.serialize_u64(v)?;
        self.emit(value)
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        let value = ValueSerializer.serialize_u128(v)?;
        self.emit(value)
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        let value = ValueSerializer.serialize_f32(v)?;
        self.emit(value)
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        let value = ValueSerializer.serialize_f64(v)?;
        self.emit(value)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.emit(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.emit(v.to_string())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        let value = ValueSerializer.serialize_bytes(v)?;
        self.emit(value)
    }

    fn serialize_none(self) -> Result<()> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(FieldSerializer {
            explicit: true,
            ..self
        })
    }

    fn serialize_unit(self) -> Result<()> {
        self.emit(String::new())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.emit(String::new())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.emit(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(JoinSerializer::new(self, len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        Ok(JoinSerializer::new(self, len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(JoinSerializer::new(self, len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        UnsupportedValueSnafu {
            kind: "tuple variant",
        }
        .fail()
    }

    // Flattened fields never get here: serde hands them to the parent's map serializer.
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(JsonSerializer::new(self))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(JsonSerializer::new(self))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        UnsupportedValueSnafu {
            kind: "struct variant",
        }
        .fail()
    }

    fn collect_str<T: ?Sized + Display>(self, value: &T) -> Result<()> {
        self.emit(value.to_string())
    }
}

/// Collects a struct or map field into one JSON object, sent as the field's value.
struct JsonSerializer<'a> {
    field: FieldSerializer<'a>,
    object: serde_json::Map<String, serde_json::Value>,
    key: Option<String>,
}

impl<'a> JsonSerializer<'a> {
    fn new(field: FieldSerializer<'a>) -> Self {
        Self {
            field,
            object: serde_json::Map::new(),
            key: None,
        }
    }

    fn insert<T: ?Sized + Serialize>(&mut self, key: String, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).context(JsonSnafu {
            key: self.field.key.clone(),
        })?;
        self.object.insert(key, value);
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let Self { field, object, .. } = self;
        let text = serde_json::to_string(&object).context(JsonSnafu {
            key: field.key.clone(),
        })?;
        field.emit(text)
    }
}

impl ser::SerializeStruct for JsonSerializer<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeMap for JsonSerializer<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.key = Some(key.serialize(ValueSerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self.key.take().ok_or_else(|| FormError::Custom {
            message: "map value serialized before its key".into(),
        })?;
        self.insert(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Joins the elements of a sequence field with commas.
struct JoinSerializer<'a> {
    field: FieldSerializer<'a>,
    parts: Vec<String>,
}

impl<'a> JoinSerializer<'a> {
    fn new(field: FieldSerializer<'a>, len: usize) -> Self {
        Self {
            field,
            parts: Vec::with_capacity(len),
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.parts.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let joined = self.parts.join(",");
        self.field.emit(joined)
    }
}

impl ser::SerializeSeq for JoinSerializer<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTuple for JoinSerializer<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for JoinSerializer<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Renders a single scalar as a string. Used for map keys and sequence elements.
struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = String;
    type Error = FormError;
    type SerializeSeq = Impossible<String, FormError>;
    type SerializeTuple = Impossible<String, FormError>;
    type SerializeTupleStruct = Impossible<String, FormError>;
    type SerializeTupleVariant = Impossible<String, FormError>;
    type SerializeMap = Impossible<String, FormError>;
    type SerializeStruct = Impossible<String, FormError>;
    type SerializeStructVariant = Impossible<String, FormError>;

    fn serialize_bool(self, v: bool) -> Result<String> {
        Ok(if v { "true" } else { "false" }.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i128(self, v: i128) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u128(self, v: u128) -> Result<String> {
        Ok(v.to_string())
    }

    // `Display` for floats is the shortest representation that round-trips.
    fn serialize_f32(self, v: f32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_f64(self, v: f64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<String> {
        String::from_utf8(v.to_vec()).context(InvalidUtf8Snafu)
    }

    fn serialize_none(self) -> Result<String> {
        Ok(String::new())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Ok(String::new())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Ok(String::new())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        UnsupportedValueSnafu {
            kind: "nested sequence",
        }
        .fail()
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        UnsupportedValueSnafu {
            kind: "nested tuple",
        }
        .fail()
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        UnsupportedValueSnafu {
            kind: "nested tuple struct",
        }
        .fail()
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        UnsupportedValueSnafu {
            kind: "tuple variant",
        }
        .fail()
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        UnsupportedValueSnafu {
            kind: "map inside a sequence",
        }
        .fail()
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        UnsupportedValueSnafu {
            kind: "struct inside a sequence",
        }
        .fail()
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        UnsupportedValueSnafu {
            kind: "struct variant",
        }
        .fail()
    }

    fn collect_str<T: ?Sized + Display>(self, value: &T) -> Result<String> {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::{IntString, PriceString, YesNo};
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Base {
        x: String,
    }

    #[derive(Serialize)]
    struct Outer {
        #[serde(flatten)]
        base: Base,
        y: String,
    }

    #[derive(Serialize)]
    struct Nested {
        base: Base,
        y: String,
    }

    fn pairs(values: &FormValues) -> Vec<(&str, &str)> {
        values.iter().collect()
    }

    #[test]
    fn flattened_structs_merge_without_prefix() {
        let outer = Outer {
            base: Base { x: "a".into() },
            y: "b".into(),
        };
        assert_eq!(
            pairs(&to_form_values(&outer).unwrap()),
            vec![("x", "a"), ("y", "b")]
        );
    }

    #[test]
    fn named_struct_fields_are_single_json_values() {
        let nested = Nested {
            base: Base { x: "a".into() },
            y: "b".into(),
        };
        assert_eq!(
            pairs(&to_form_values(&nested).unwrap()),
            vec![("base", r#"{"x":"a"}"#), ("y", "b")]
        );

        #[derive(Serialize)]
        struct Tagged {
            sid: &'static str,
            #[serde(rename = "ratingsmask")]
            ratings: crate::ratings::Ratings,
        }

        let values = to_form_values(&Tagged {
            sid: "s",
            ratings: crate::ratings::Ratings::parse_mask("11"),
        })
        .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get_all("ratingsmask").count(), 1);
        assert!(!values.contains_key("tag[1]"));
        let mask: serde_json::Value =
            serde_json::from_str(values.get("ratingsmask").unwrap()).unwrap();
        assert_eq!(mask["tag[1]"], "yes");
        assert_eq!(mask["tag[5]"], "no");
    }

    #[derive(Serialize, Default)]
    struct Edit {
        sid: String,
        #[serde(rename = "desc")]
        description: Option<String>,
        title: Option<String>,
        count: Option<i32>,
        scraps: Option<YesNo>,
        #[serde(skip_serializing_if = "YesNo::is_no")]
        notify: YesNo,
        #[serde(skip_serializing_if = "IntString::is_zero")]
        page: IntString,
        #[serde(skip)]
        #[allow(dead_code)]
        secret: String,
        keywords: Option<Vec<String>>,
    }

    #[test]
    fn none_is_omitted_and_some_empty_is_sent() {
        let edit = Edit {
            sid: "s".into(),
            description: Some(String::new()),
            count: Some(0),
            scraps: Some(YesNo::NO),
            secret: "hidden".into(),
            keywords: Some(vec![]),
            ..Edit::default()
        };
        let values = to_form_values(&edit).unwrap();
        assert_eq!(
            pairs(&values),
            vec![
                ("sid", "s"),
                ("desc", ""),
                ("count", "0"),
                ("scraps", "no"),
                ("keywords", ""),
            ]
        );
        assert!(!values.contains_key("title"));
        assert!(!values.contains_key("secret"));
    }

    #[test]
    fn omit_empty_fields_are_dropped_when_zero() {
        let values = to_form_values(&Edit::default()).unwrap();
        assert!(values.is_empty());

        let edit = Edit {
            notify: YesNo::YES,
            page: IntString(2),
            ..Edit::default()
        };
        assert_eq!(
            pairs(&to_form_values(&edit).unwrap()),
            vec![("notify", "yes"), ("page", "2")]
        );
    }

    #[derive(Serialize)]
    #[serde(rename_all = "snake_case")]
    enum Order {
        CreateDatetime,
        Views,
    }

    #[derive(Serialize)]
    struct Kinds {
        flag: bool,
        off: bool,
        small: i8,
        big: u64,
        ratio: f64,
        third: f64,
        letter: char,
        ids: Vec<u32>,
        pair: (u8, &'static str),
        order: Order,
        other: Order,
        price: PriceString,
        text: &'static str,
    }

    #[test]
    fn kind_fallbacks() {
        let kinds = Kinds {
            flag: true,
            off: false,
            small: -3,
            big: u64::MAX,
            ratio: 1.5,
            third: 0.1 + 0.2,
            letter: 'z',
            ids: vec![1, 2, 3],
            pair: (4, "five"),
            order: Order::CreateDatetime,
            other: Order::Views,
            price: PriceString(3.5),
            text: "a b&c",
        };
        let values = to_form_values(&kinds).unwrap();
        assert_eq!(
            pairs(&values),
            vec![
                ("flag", "true"),
                ("off", "false"),
                ("small", "-3"),
                ("big", "18446744073709551615"),
                ("ratio", "1.5"),
                ("third", "0.30000000000000004"),
                ("letter", "z"),
                ("ids", "1,2,3"),
                ("pair", "4,five"),
                ("order", "create_datetime"),
                ("other", "views"),
                ("price", "$3.50"),
                ("text", "a b&c"),
            ]
        );
        assert!(values.encode().ends_with("text=a+b%26c"));
    }

    struct Raw(&'static [u8]);

    impl Serialize for Raw {
        fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_bytes(self.0)
        }
    }

    #[derive(Serialize)]
    struct WithRaw {
        raw: Raw,
    }

    #[test]
    fn bytes_must_be_utf8() {
        let ok = to_form_values(&WithRaw { raw: Raw(b"abc") }).unwrap();
        assert_eq!(ok.get("raw"), Some("abc"));

        let err = to_form_values(&WithRaw {
            raw: Raw(&[0xff, 0xfe]),
        })
        .unwrap_err();
        assert!(matches!(err, FormError::InvalidUtf8 { .. }));
    }

    #[test]
    fn root_must_be_struct_shaped() {
        for err in [
            to_form_values(&5).unwrap_err(),
            to_form_values("text").unwrap_err(),
            to_form_values(&vec![1, 2]).unwrap_err(),
        ] {
            assert!(matches!(err, FormError::UnsupportedRoot { .. }), "{}", err);
        }

        let none: Option<Base> = None;
        assert!(to_form_values(&none).unwrap().is_empty());

        let some = Some(Base { x: "a".into() });
        assert_eq!(to_form_values(&some).unwrap().get("x"), Some("a"));
    }

    #[test]
    fn maps_are_accepted_as_roots() {
        let mut map = BTreeMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        assert_eq!(pairs(&to_form_values(&map).unwrap()), vec![("a", "1"), ("b", "2")]);
    }

    #[derive(Serialize)]
    struct Listing {
        items: Vec<Base>,
    }

    #[test]
    fn sequences_of_structs_are_rejected() {
        let listing = Listing {
            items: vec![Base { x: "a".into() }],
        };
        let err = to_form_values(&listing).unwrap_err();
        assert!(matches!(err, FormError::UnsupportedValue { .. }));
    }

    #[test]
    fn flattening_is_deterministic() {
        let kinds = Edit {
            sid: "s".into(),
            title: Some("t".into()),
            keywords: Some(vec!["a".into(), "b".into()]),
            ..Edit::default()
        };
        let first = to_form_values(&kinds).unwrap().encode();
        let second = to_form_values(&kinds).unwrap().encode();
        assert_eq!(first, second);
        assert_eq!(first, "sid=s&title=t&keywords=a%2Cb");
    }

    #[test]
    fn prebuilt_values_embed_with_repeated_keys() {
        #[derive(Serialize)]
        struct Request {
            sid: &'static str,
            #[serde(flatten)]
            extra: FormValues,
        }

        let extra: FormValues = vec![("k", "1"), ("k", "2")].into_iter().collect();
        let values = to_form_values(&Request { sid: "s", extra }).unwrap();
        assert_eq!(pairs(&values), vec![("sid", "s"), ("k", "1"), ("k", "2")]);
    }

    #[test]
    fn set_replaces_all_values_in_place() {
        let mut values: FormValues = vec![("a", "1"), ("b", "2"), ("a", "3")]
            .into_iter()
            .collect();
        values.set("a", "9");
        assert_eq!(pairs(&values), vec![("a", "9"), ("b", "2")]);
        values.set("c", "4");
        assert_eq!(values.get("c"), Some("4"));
        assert_eq!(values.remove("b"), 1);
        assert_eq!(values.encode(), "a=9&c=4");
        assert_eq!(values.get_all("a").collect::<Vec<_>>(), vec!["9"]);
    }
}
