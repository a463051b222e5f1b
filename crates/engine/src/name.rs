use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

/// Fully-qualified, `::`-separated identity of a contract trait.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterfaceName(String);

impl InterfaceName {
	/// Wraps an already-qualified name such as `users::UsersApi`.
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	/// Joins module segments and the trait identifier.
	pub fn from_segments<I, S>(segments: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let joined = segments.into_iter().map(|s| s.as_ref().to_owned()).collect::<Vec<_>>().join("::");
		Self(joined)
	}

	/// Full name.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Path segments, outermost module first.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.0.split("::")
	}

	/// Trait identifier without its module path.
	pub fn ident(&self) -> &str {
		self.0.rsplit("::").next().unwrap_or(&self.0)
	}
}

impl fmt::Display for InterfaceName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for InterfaceName {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for InterfaceName {
	fn from(value: String) -> Self {
		Self(value)
	}
}

/// Explicit handle naming the generated implementation type of one interface.
///
/// Derived deterministically from the interface identity, so two generations
/// for the same interface agree and implementations of equally named traits in
/// different modules never collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImplementationId(String);

impl ImplementationId {
	/// Derives the implementation identity for `interface`.
	pub fn for_interface(interface: &InterfaceName) -> Self {
		let mut hasher = FxHasher::default();
		interface.as_str().hash(&mut hasher);
		let digest = hasher.finish();
		Self(format!("{}Impl{:08x}", interface.ident(), (digest ^ (digest >> 32)) as u32))
	}

	/// Wraps a type identifier read back from generated code.
	pub fn new(ident: impl Into<String>) -> Self {
		Self(ident.into())
	}

	/// Type identifier of the generated struct.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ImplementationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ident_and_segments() {
		let name = InterfaceName::from_segments(["billing", "v2", "InvoicesApi"]);
		assert_eq!(name.as_str(), "billing::v2::InvoicesApi");
		assert_eq!(name.ident(), "InvoicesApi");
		assert_eq!(name.segments().count(), 3);
	}

	#[test]
	fn implementation_id_is_stable_and_module_sensitive() {
		let a = ImplementationId::for_interface(&"a::Api".into());
		let b = ImplementationId::for_interface(&"b::Api".into());
		assert_eq!(a, ImplementationId::for_interface(&"a::Api".into()));
		assert_ne!(a, b);
		assert!(a.as_str().starts_with("ApiImpl"));
	}
}
