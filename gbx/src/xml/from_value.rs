// Thanks to https://github.com/belak/serde-xmlrpc/blob/master/src/value/de.rs
//
// MIT License
//
// Copyright (c) 2020 Kaleb Elwert
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use std::collections::btree_map;
use std::fmt::Formatter;

use serde::de::{DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;

use crate::xml::Value;

/// Deserialize a `Value` into a `T`.
/// - structs are built from `Value::Struct`, missing `Option` members become `None`
/// - vectors are built from `Value::Array`
/// - primitives are lifted out of the remaining variants
pub fn from_value<T>(value: &Value) -> Result<T, FromValueError>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer { value }).map_err(|err| FromValueError {
        input: value.clone(),
        error_msg: err.0,
    })
}

#[derive(Debug)]
pub struct FromValueError {
    pub input: Value,
    pub error_msg: String,
}

impl std::fmt::Display for FromValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot deserialize {:?}: {}", self.input, self.error_msg)
    }
}

impl std::error::Error for FromValueError {}

#[derive(Debug)]
struct DeError(String);

impl std::fmt::Display for DeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DeError {}

impl serde::de::Error for DeError {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        DeError(msg.to_string())
    }
}

struct ValueDeserializer<'a> {
    value: &'a Value,
}

impl<'de, 'a> serde::Deserializer<'de> for ValueDeserializer<'a> {
    type Error = DeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, DeError>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Int(v) => visitor.visit_i32(*v),
            Value::Bool(v) => visitor.visit_bool(*v),
            Value::String(v) => visitor.visit_str(v),
            Value::Double(v) => visitor.visit_f64(*v),
            Value::Base64(v) => visitor.visit_bytes(v),
            Value::Struct(members) => visitor.visit_map(StructAccess {
                iter: members.iter(),
                value: None,
            }),
            Value::Array(vs) => visitor.visit_seq(ArrayAccess { iter: vs.iter() }),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, DeError>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, DeError>
    where
        V: Visitor<'de>,
    {
        match self.value.as_bool() {
            Some(b) => visitor.visit_bool(b),
            None => self.deserialize_any(visitor),
        }
    }

    forward_to_deserialize_any!(
        i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    );
}

struct ArrayAccess<'a> {
    iter: std::slice::Iter<'a, Value>,
}

impl<'de, 'a> SeqAccess<'de> for ArrayAccess<'a> {
    type Error = DeError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, DeError>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer { value }).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct StructAccess<'a> {
    iter: btree_map::Iter<'a, String, Value>,
    value: Option<&'a Value>,
}

impl<'de, 'a> MapAccess<'de> for StructAccess<'a> {
    type Error = DeError;

    fn next_key_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, DeError>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                let key = Value::String(key.clone());
                seed.deserialize(ValueDeserializer { value: &key }).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<T>(&mut self, seed: T) -> Result<T::Value, DeError>
    where
        T: DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer { value }),
            None => Err(serde::de::Error::custom("value is missing")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}
