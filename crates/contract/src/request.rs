//! Structured request descriptions produced by generated clients.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Value;

/// Request verb designated by a method's verb attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
	/// `HEAD`.
	Head,
	/// `OPTIONS`.
	Options,
}

impl Method {
	/// Every verb, in declaration order.
	pub const ALL: [Method; 7] = [
		Self::Get,
		Self::Post,
		Self::Put,
		Self::Patch,
		Self::Delete,
		Self::Head,
		Self::Options,
	];

	/// Upper-case wire name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
			Self::Head => "HEAD",
			Self::Options => "OPTIONS",
		}
	}

	/// Name of the attribute designating this verb (`get`, `post`, ...).
	pub const fn attribute(self) -> &'static str {
		match self {
			Self::Get => "get",
			Self::Post => "post",
			Self::Put => "put",
			Self::Patch => "patch",
			Self::Delete => "delete",
			Self::Head => "head",
			Self::Options => "options",
		}
	}

	/// Name of the enum variant (`Get`, `Post`, ...), as written in generated code.
	pub const fn variant(self) -> &'static str {
		match self {
			Self::Get => "Get",
			Self::Post => "Post",
			Self::Put => "Put",
			Self::Patch => "Patch",
			Self::Delete => "Delete",
			Self::Head => "Head",
			Self::Options => "Options",
		}
	}

	/// Looks up a verb by attribute name.
	pub fn from_attribute(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|m| m.attribute() == name)
	}

	/// Looks up a verb by variant name.
	pub fn from_variant(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|m| m.variant() == name)
	}

	/// Returns true if requests with this verb conventionally carry a body.
	pub const fn allows_body(self) -> bool {
		!matches!(self, Self::Get | Self::Head)
	}
}

impl fmt::Display for Method {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A named runtime value bound into a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
	/// Placeholder, query key or header name.
	pub name: String,
	/// Bound value.
	pub value: Value,
}

/// One request as described by a generated client method.
///
/// The path is kept as the declared template; placeholders are bound through
/// [`RequestDescription::path_params`] and expanded on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescription {
	method: Method,
	path: String,
	path_params: Vec<Binding>,
	query: Vec<Binding>,
	headers: Vec<(String, String)>,
	body: Option<Value>,
}

impl RequestDescription {
	/// Starts a request for `method` against the path template `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			path_params: Vec::new(),
			query: Vec::new(),
			headers: Vec::new(),
			body: None,
		}
	}

	/// Binds a path placeholder.
	#[must_use]
	pub fn path_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.path_params.push(Binding {
			name: name.into(),
			value: value.into(),
		});
		self
	}

	/// Appends a query parameter. `None`/null values are omitted.
	#[must_use]
	pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		let value = value.into();
		if !value.is_null() {
			self.query.push(Binding { name: name.into(), value });
		}
		self
	}

	/// Appends a header. `None`/null values are omitted.
	#[must_use]
	pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		let value = value.into();
		if !value.is_null() {
			self.headers.push((name.into(), value.render()));
		}
		self
	}

	/// Sets the request body.
	#[must_use]
	pub fn body(mut self, value: impl Into<Value>) -> Self {
		self.body = Some(value.into());
		self
	}

	/// Request verb.
	pub fn method(&self) -> Method {
		self.method
	}

	/// Path template as declared (base path included).
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Bound path placeholders, in binding order.
	pub fn path_params(&self) -> &[Binding] {
		&self.path_params
	}

	/// Query parameters, in binding order.
	pub fn query_params(&self) -> &[Binding] {
		&self.query
	}

	/// Headers, static ones first.
	pub fn headers(&self) -> &[(String, String)] {
		&self.headers
	}

	/// Value of the first header named `name`, compared case-insensitively.
	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(n, _)| n.eq_ignore_ascii_case(name))
			.map(|(_, v)| v.as_str())
	}

	/// Request body, if any.
	pub fn body_value(&self) -> Option<&Value> {
		self.body.as_ref()
	}

	/// Expands the path template with the bound placeholders.
	///
	/// Unbound placeholders are left verbatim.
	pub fn expanded_path(&self) -> String {
		let mut out = self.path.clone();
		for binding in &self.path_params {
			out = out.replace(&format!("{{{}}}", binding.name), &binding.value.render());
		}
		out
	}
}
