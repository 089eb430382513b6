use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::iter::FromIterator;

pub use from_string::*;
pub use from_value::*;
pub use to_string::*;

mod from_string;
mod from_value;
mod to_string;

/// An XML-RPC method call (`<methodCall>`).
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Value>,
}

impl Call {
    pub fn new(name: &str, args: Vec<Value>) -> Self {
        Call {
            name: name.to_string(),
            args,
        }
    }
}

/// An XML-RPC method response (`<methodResponse>`).
pub type Response = Result<Value, Fault>;

/// An XML-RPC fault (`<fault>`) of a failed method call.
///
/// The game server uses the code `-1000` for a lot of different errors,
/// so specific errors should be matched by their message.
/// Other XML-RPC servers tend to use more meaningful codes.
#[derive(Clone, Debug, PartialEq)]
pub struct Fault {
    pub code: i32,
    pub msg: String,
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fault {}: {}", self.code, self.msg)
    }
}

impl std::error::Error for Fault {}

/// An XML-RPC value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A 32-bit signed integer (`<i4>` or `<int>`).
    Int(i32),

    /// A boolean value (`<boolean>`, 0 == `false`, 1 == `true`).
    Bool(bool),

    /// A string (`<string>`, or a `<value>` without a type tag).
    String(String),

    /// A double-precision IEEE 754 floating point number (`<double>`).
    Double(f64),

    /// Base64-encoded binary data (`<base64>`).
    Base64(Vec<u8>),

    /// A mapping of named values (`<struct>`).
    Struct(BTreeMap<String, Value>),

    /// A list of arbitrary (heterogeneous) values (`<array>`).
    Array(Vec<Value>),
}

impl Value {
    /// The member with the given name, if this is a struct that has one.
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(name),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Some servers send flags as integers, so `0` and `1` are accepted as well.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(vs) => Some(vs),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Base64(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i32::try_from(v).unwrap_or(i32::MAX))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(i32::try_from(v).unwrap_or(i32::MAX))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Base64(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Struct(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(vs: Vec<Value>) -> Self {
        Value::Array(vs)
    }
}

impl From<Vec<i32>> for Value {
    fn from(vs: Vec<i32>) -> Self {
        Value::Array(vs.into_iter().map(Value::Int).collect())
    }
}

impl From<Vec<String>> for Value {
    fn from(vs: Vec<String>) -> Self {
        Value::Array(vs.into_iter().map(Value::String).collect())
    }
}

/// Collect named members into a `Value::Struct`.
impl<K> FromIterator<(K, Value)> for Value
where
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Struct(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}
