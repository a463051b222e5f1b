//! Runtime argument values.

use serde::{Deserialize, Serialize};

/// A runtime argument passed to a generated client method.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Absent optional argument.
	Null,
	/// Boolean argument.
	Bool(bool),
	/// Any integer argument up to `u64::MAX`.
	Int(i128),
	/// Any floating-point argument.
	Float(f64),
	/// String argument.
	Str(String),
	/// Structured argument, usually a request body.
	Json(serde_json::Value),
}

impl Value {
	/// Returns the kind of this value, or `None` for [`Value::Null`].
	pub fn kind(&self) -> Option<ValueKind> {
		match self {
			Self::Null => None,
			Self::Bool(_) => Some(ValueKind::Bool),
			Self::Int(_) => Some(ValueKind::Int),
			Self::Float(_) => Some(ValueKind::Float),
			Self::Str(_) => Some(ValueKind::Str),
			Self::Json(_) => Some(ValueKind::Json),
		}
	}

	/// Returns true for [`Value::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Renders the value the way it appears in a path, query string or header.
	pub fn render(&self) -> String {
		match self {
			Self::Null => String::new(),
			Self::Bool(b) => b.to_string(),
			Self::Int(i) => i.to_string(),
			Self::Float(f) => f.to_string(),
			Self::Str(s) => s.clone(),
			Self::Json(v) => v.to_string(),
		}
	}

}

macro_rules! impl_from_int {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Value {
				fn from(value: $ty) -> Self {
					Self::Int(i128::from(value))
				}
			}
		)*
	};
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<f32> for Value {
	fn from(value: f32) -> Self {
		Self::Float(f64::from(value))
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}

impl From<serde_json::Value> for Value {
	fn from(value: serde_json::Value) -> Self {
		Self::Json(value)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

/// Shape of value a declared parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
	/// `bool`.
	Bool,
	/// Any primitive integer type.
	Int,
	/// `f32` or `f64`.
	Float,
	/// `String` or `&str`.
	Str,
	/// Anything else; serialised as JSON.
	Json,
}

impl ValueKind {
	/// Returns true if `value` can be bound to a parameter of this kind.
	///
	/// Integers widen to floats and every value is acceptable as JSON. `Null`
	/// is never accepted here; optionality is tracked separately.
	pub fn accepts(self, value: &Value) -> bool {
		match (self, value) {
			(_, Value::Null) => false,
			(Self::Json, _) => true,
			(Self::Float, Value::Int(_)) => true,
			(kind, value) => value.kind() == Some(kind),
		}
	}

	/// Short lowercase name for messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Bool => "bool",
			Self::Int => "int",
			Self::Float => "float",
			Self::Str => "string",
			Self::Json => "json",
		}
	}
}
