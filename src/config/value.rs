//! Values stored under a [`ConfigNode`].
//!
//! Conversion into the tree happens eagerly through the `From` impls here:
//! strings become [`TemplateValue`]s, mappings become [`ConfigNode`]s,
//! sequences are converted element by element, and other scalars are kept
//! as they are.

use std::ops::Index;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value as Json};

use super::ConfigNode;
use crate::template::TemplateValue;

/// Shared result of indexing into something that isn't there.
pub(crate) static NULL: Value = Value::Null;

/// A value held by a [`ConfigNode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Template(TemplateValue),
    List(Vec<Value>),
    Node(ConfigNode),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// The raw string of a template value.
    pub fn as_str(&self) -> Option<&str> {
        self.as_template().map(TemplateValue::raw)
    }

    pub fn as_template(&self) -> Option<&TemplateValue> {
        match self {
            Value::Template(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&ConfigNode> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut ConfigNode> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Looks up `key` if this value is a node.
    ///
    /// Returns `None` for missing keys and for values that aren't nodes, so
    /// lookups can be chained with `and_then` without checking each level.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_node().and_then(|node| node.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.as_node_mut().and_then(|node| node.get_mut(key))
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.as_list().and_then(|items| items.get(index))
    }

    /// Plain structure with templates unwrapped to their raw strings.
    pub fn to_serializable(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => Json::Number(n.clone()),
            Value::Template(t) => Json::String(t.raw().to_owned()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_serializable).collect()),
            Value::Node(node) => node.to_serializable(),
        }
    }
}

impl Index<&str> for Value {
    type Output = Value;

    /// Missing keys, and keys on anything but a node, yield `Value::Null`.
    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        self.get_index(index).unwrap_or(&NULL)
    }
}

impl From<Json> for Value {
    fn from(value: Json) -> Self {
        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n),
            Json::String(s) => Value::Template(TemplateValue::new(s)),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Node(ConfigNode::from_map(map)),
        }
    }
}

impl From<serde_json::Map<String, Json>> for Value {
    fn from(map: serde_json::Map<String, Json>) -> Self {
        Value::Node(ConfigNode::from_map(map))
    }
}

impl From<ConfigNode> for Value {
    fn from(node: ConfigNode) -> Self {
        Value::Node(node)
    }
}

impl From<TemplateValue> for Value {
    fn from(template: TemplateValue) -> Self {
        Value::Template(template)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Template(TemplateValue::new(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Template(TemplateValue::new(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for Value {
    /// Non-finite floats have no plain representation and become `Null`.
    fn from(f: f64) -> Self {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::from(f64::from(f))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

fn eq_str(value: &Value, other: &str) -> bool {
    value.as_str() == Some(other)
}

fn eq_bool(value: &Value, other: bool) -> bool {
    value.as_bool() == Some(other)
}

fn eq_i64(value: &Value, other: i64) -> bool {
    value.as_i64() == Some(other)
}

fn eq_u64(value: &Value, other: u64) -> bool {
    value.as_u64() == Some(other)
}

fn eq_f64(value: &Value, other: f64) -> bool {
    value.as_f64() == Some(other)
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        eq_str(self, other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        eq_str(self, other)
    }
}

impl PartialEq<String> for Value {
    fn eq(&self, other: &String) -> bool {
        eq_str(self, other)
    }
}

impl PartialEq<Value> for str {
    fn eq(&self, other: &Value) -> bool {
        eq_str(other, self)
    }
}

impl PartialEq<Value> for &str {
    fn eq(&self, other: &Value) -> bool {
        eq_str(other, self)
    }
}

impl PartialEq<Value> for String {
    fn eq(&self, other: &Value) -> bool {
        eq_str(other, self)
    }
}

macro_rules! partial_eq_scalar {
    ($eq:ident [$($ty:ty)*]) => {
        $(
            impl PartialEq<$ty> for Value {
                fn eq(&self, other: &$ty) -> bool {
                    $eq(self, *other as _)
                }
            }

            impl PartialEq<$ty> for &Value {
                fn eq(&self, other: &$ty) -> bool {
                    $eq(self, *other as _)
                }
            }

            impl PartialEq<Value> for $ty {
                fn eq(&self, other: &Value) -> bool {
                    $eq(other, *self as _)
                }
            }
        )*
    };
}

partial_eq_scalar!(eq_bool[bool]);
partial_eq_scalar!(eq_i64[i8 i16 i32 i64 isize]);
partial_eq_scalar!(eq_u64[u8 u16 u32 u64 usize]);
partial_eq_scalar!(eq_f64[f32 f64]);

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::Template(t) => t.serialize(serializer),
            Value::List(items) => items.serialize(serializer),
            Value::Node(node) => node.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Json::deserialize(deserializer).map(Value::from)
    }
}
