//! Fixture files embedded at build time.

/// Suffix marking a resource as a declaration source unit.
pub const SOURCE_SUFFIX: &str = ".rs";

/// One embedded file, named by its path relative to the crate root
/// (`fixtures/users.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedResource {
	pub name: &'static str,
	pub text: &'static str,
}

include!(concat!(env!("OUT_DIR"), "/embedded_resources.rs"));

/// Every embedded resource whose name ends in `suffix`, in name order.
pub fn discover(suffix: &str) -> impl Iterator<Item = &'static EmbeddedResource> + '_ {
	EMBEDDED_RESOURCES.iter().filter(move |r| r.name.ends_with(suffix))
}

/// Looks up a resource by exact name.
pub fn resource(name: &str) -> Option<&'static EmbeddedResource> {
	EMBEDDED_RESOURCES.iter().find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_source_resources_are_discovered() {
		let sources: Vec<_> = discover(SOURCE_SUFFIX).map(|r| r.name).collect();
		assert!(sources.contains(&"fixtures/users.rs"));
		assert!(sources.iter().all(|name| name.ends_with(".rs")));
		assert!(resource("fixtures/README.md").is_some());
		assert!(!sources.contains(&"fixtures/README.md"));
	}

	#[test]
	fn resources_are_sorted_by_name() {
		let names: Vec<_> = EMBEDDED_RESOURCES.iter().map(|r| r.name).collect();
		let mut sorted = names.clone();
		sorted.sort_unstable();
		assert_eq!(names, sorted);
	}
}
