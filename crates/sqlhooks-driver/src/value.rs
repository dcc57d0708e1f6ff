//! Argument and column values exchanged with drivers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A value bound to a statement parameter or read from a result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
   Null,
   Integer(i64),
   Real(f64),
   Text(String),
   Blob(Vec<u8>),
   Bool(bool),
}

impl Value {
   pub fn is_null(&self) -> bool {
      matches!(self, Value::Null)
   }

   pub fn as_i64(&self) -> Option<i64> {
      match self {
         Value::Integer(v) => Some(*v),
         Value::Bool(v) => Some(i64::from(*v)),
         _ => None,
      }
   }

   pub fn as_f64(&self) -> Option<f64> {
      match self {
         Value::Real(v) => Some(*v),
         Value::Integer(v) => Some(*v as f64),
         _ => None,
      }
   }

   pub fn as_str(&self) -> Option<&str> {
      match self {
         Value::Text(v) => Some(v),
         _ => None,
      }
   }

   pub fn as_bytes(&self) -> Option<&[u8]> {
      match self {
         Value::Blob(v) => Some(v),
         Value::Text(v) => Some(v.as_bytes()),
         _ => None,
      }
   }
}

impl fmt::Display for Value {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Value::Null => f.write_str("NULL"),
         Value::Integer(v) => write!(f, "{v}"),
         Value::Real(v) => write!(f, "{v}"),
         Value::Text(v) => write!(f, "{v}"),
         Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
         Value::Bool(v) => write!(f, "{v}"),
      }
   }
}

macro_rules! impl_from_integer {
   ($($ty:ty),*) => {
      $(
         impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
               Value::Integer(i64::from(v))
            }
         }
      )*
   };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
   fn from(v: f32) -> Self {
      Value::Real(f64::from(v))
   }
}

impl From<f64> for Value {
   fn from(v: f64) -> Self {
      Value::Real(v)
   }
}

impl From<bool> for Value {
   fn from(v: bool) -> Self {
      Value::Bool(v)
   }
}

impl From<&str> for Value {
   fn from(v: &str) -> Self {
      Value::Text(v.to_owned())
   }
}

impl From<String> for Value {
   fn from(v: String) -> Self {
      Value::Text(v)
   }
}

impl From<Vec<u8>> for Value {
   fn from(v: Vec<u8>) -> Self {
      Value::Blob(v)
   }
}

impl From<&[u8]> for Value {
   fn from(v: &[u8]) -> Self {
      Value::Blob(v.to_vec())
   }
}

impl<T: Into<Value>> From<Option<T>> for Value {
   fn from(v: Option<T>) -> Self {
      v.map_or(Value::Null, Into::into)
   }
}

/// A parameter value together with its position and optional name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
   /// Parameter name without any prefix symbol, when bound by name.
   pub name: Option<String>,
   /// 1-based position of the parameter.
   pub ordinal: usize,
   pub value: Value,
}

impl NamedValue {
   pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
      Self {
         name: None,
         ordinal,
         value: value.into(),
      }
   }

   pub fn named(name: impl Into<String>, ordinal: usize, value: impl Into<Value>) -> Self {
      Self {
         name: Some(name.into()),
         ordinal,
         value: value.into(),
      }
   }
}

/// Lifts positional values into named values with 1-based ordinals.
pub fn named_from_values(values: &[Value]) -> Vec<NamedValue> {
   values
      .iter()
      .enumerate()
      .map(|(i, value)| NamedValue::positional(i + 1, value.clone()))
      .collect()
}

/// Lowers named values to positional ones for drivers without named support.
///
/// Fails with [`Error::NamedParameter`] if any argument carries a name.
pub fn named_to_values(args: &[NamedValue]) -> Result<Vec<Value>> {
   args
      .iter()
      .map(|arg| match &arg.name {
         Some(name) => Err(Error::NamedParameter(name.clone())),
         None => Ok(arg.value.clone()),
      })
      .collect()
}

/// Strips names and ordinals, keeping the values in order.
pub fn values_of(args: &[NamedValue]) -> Vec<Value> {
   args.iter().map(|arg| arg.value.clone()).collect()
}

/// Re-attaches names and ordinals from `original` to a rewritten value list.
///
/// Values beyond the original list become positional arguments.
pub fn rebind(original: &[NamedValue], values: Vec<Value>) -> Vec<NamedValue> {
   values
      .into_iter()
      .enumerate()
      .map(|(i, value)| NamedValue {
         name: original.get(i).and_then(|arg| arg.name.clone()),
         ordinal: i + 1,
         value,
      })
      .collect()
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_from_conversions() {
      assert_eq!(Value::from(7i32), Value::Integer(7));
      assert_eq!(Value::from(1.5f64), Value::Real(1.5));
      assert_eq!(Value::from("a"), Value::Text("a".into()));
      assert_eq!(Value::from(vec![1u8, 2]), Value::Blob(vec![1, 2]));
      assert_eq!(Value::from(None::<i64>), Value::Null);
      assert_eq!(Value::from(Some(true)), Value::Bool(true));
   }

   #[test]
   fn test_display() {
      assert_eq!(Value::Null.to_string(), "NULL");
      assert_eq!(Value::Blob(vec![0; 3]).to_string(), "<3 bytes>");
      assert_eq!(Value::Text("x".into()).to_string(), "x");
   }

   #[test]
   fn test_named_from_values_uses_one_based_ordinals() {
      let named = named_from_values(&[Value::from(1), Value::from("b")]);
      assert_eq!(named[0], NamedValue::positional(1, 1));
      assert_eq!(named[1], NamedValue::positional(2, "b"));
   }

   #[test]
   fn test_named_to_values_rejects_names() {
      let args = vec![
         NamedValue::positional(1, 1),
         NamedValue::named("id", 2, 2),
      ];
      assert_eq!(
         named_to_values(&args),
         Err(Error::NamedParameter("id".into()))
      );
   }

   #[test]
   fn test_named_to_values_positional() {
      let args = named_from_values(&[Value::from(1), Value::Null]);
      assert_eq!(
         named_to_values(&args).unwrap(),
         vec![Value::Integer(1), Value::Null]
      );
   }

   #[test]
   fn test_rebind_keeps_names_and_extends() {
      let original = vec![NamedValue::named("a", 1, 1)];
      let rebound = rebind(&original, vec![Value::from(10), Value::from(20)]);

      assert_eq!(rebound[0], NamedValue::named("a", 1, 10));
      assert_eq!(rebound[1], NamedValue::positional(2, 20));
   }

   #[test]
   fn test_value_serializes() {
      let json = serde_json::to_string(&Value::Integer(3)).unwrap();
      assert_eq!(json, r#"{"Integer":3}"#);
   }
}
