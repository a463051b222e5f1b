//! The process-wide module table.
//!
//! Loading is irreversible: every load appends a module with a fresh id and
//! nothing is ever removed.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use stubgen_contract::Dispatcher;
use stubgen_engine::{ImplementationId, InterfaceName};
use thiserror::Error;

use crate::image::{CompiledType, HeaderSource, Image, ImageError, RequestOp};
use crate::instance::LoadedImplementation;

static MODULES: LazyLock<RwLock<Vec<Arc<LoadedModule>>>> = LazyLock::new(Default::default);
static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl fmt::Display for ModuleId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "module#{}", self.0)
	}
}

#[derive(Debug, Error)]
pub enum LoadError {
	#[error(transparent)]
	Image(#[from] ImageError),
	#[error("image defines `{0}` more than once")]
	DuplicateType(ImplementationId),
	#[error("`{implementation}::{method}` refers to argument slot {slot} of {arity}")]
	InvalidSlot {
		implementation: ImplementationId,
		method: String,
		slot: usize,
		arity: usize,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
	#[error("no loaded type implements `{interface}`")]
	Missing { interface: InterfaceName },
	#[error("{} types claim `{interface}`: {}", .candidates.len(), join(.candidates))]
	Ambiguous {
		interface: InterfaceName,
		candidates: Vec<ImplementationId>,
	},
	#[error("`{interface}` is implemented by `{found}`, expected `{expected}`")]
	IdMismatch {
		interface: InterfaceName,
		expected: ImplementationId,
		found: ImplementationId,
	},
}

fn join(ids: &[ImplementationId]) -> String {
	ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Decodes `bytes` and appends the image to the module table.
pub fn load(bytes: &[u8]) -> Result<Arc<LoadedModule>, LoadError> {
	let image = Image::from_bytes(bytes)?;
	validate(&image)?;

	let module = Arc::new(LoadedModule {
		id: ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed)),
		image,
	});
	MODULES.write().push(Arc::clone(&module));

	tracing::debug!(
		module = %module.id,
		types = module.image.types.len(),
		bytes = bytes.len(),
		"Loaded image"
	);
	Ok(module)
}

/// Snapshot of every module loaded so far, in load order.
pub fn loaded_modules() -> Vec<Arc<LoadedModule>> {
	MODULES.read().clone()
}

fn validate(image: &Image) -> Result<(), LoadError> {
	let mut seen = BTreeSet::new();
	for ty in &image.types {
		if !seen.insert(&ty.id) {
			return Err(LoadError::DuplicateType(ty.id.clone()));
		}
		for method in &ty.methods {
			let arity = method.params.len();
			let mut slots = method.ops.iter().filter_map(|op| match op {
				RequestOp::PathParam { slot, .. } | RequestOp::Query { slot, .. } | RequestOp::Body { slot } => Some(*slot),
				RequestOp::Header {
					source: HeaderSource::Slot(slot),
					..
				} => Some(*slot),
				RequestOp::Header { .. } => None,
			});
			if let Some(slot) = slots.find(|slot| *slot >= arity) {
				return Err(LoadError::InvalidSlot {
					implementation: ty.id.clone(),
					method: method.name.clone(),
					slot,
					arity,
				});
			}
		}
	}
	Ok(())
}

/// One loaded image.
#[derive(Debug)]
pub struct LoadedModule {
	id: ModuleId,
	image: Image,
}

impl LoadedModule {
	pub fn id(&self) -> ModuleId {
		self.id
	}

	pub fn image(&self) -> &Image {
		&self.image
	}

	/// Finds the single type implementing `interface` and checks it is `implementation`.
	pub fn resolve(
		self: &Arc<Self>,
		implementation: &ImplementationId,
		interface: &InterfaceName,
	) -> Result<TypeHandle, ResolveError> {
		let candidates: Vec<usize> = self
			.image
			.types
			.iter()
			.enumerate()
			.filter(|(_, ty)| &ty.interface == interface)
			.map(|(index, _)| index)
			.collect();

		match candidates.as_slice() {
			[] => Err(ResolveError::Missing {
				interface: interface.clone(),
			}),
			&[index] if self.image.types[index].id == *implementation => Ok(TypeHandle {
				module: Arc::clone(self),
				index,
			}),
			&[index] => Err(ResolveError::IdMismatch {
				interface: interface.clone(),
				expected: implementation.clone(),
				found: self.image.types[index].id.clone(),
			}),
			many => Err(ResolveError::Ambiguous {
				interface: interface.clone(),
				candidates: many.iter().map(|&index| self.image.types[index].id.clone()).collect(),
			}),
		}
	}
}

/// A resolved compiled type, ready to be instantiated.
#[derive(Debug, Clone)]
pub struct TypeHandle {
	module: Arc<LoadedModule>,
	index: usize,
}

impl TypeHandle {
	pub fn module(&self) -> ModuleId {
		self.module.id
	}

	pub fn compiled(&self) -> &CompiledType {
		&self.module.image.types[self.index]
	}

	/// Binds the type to `dispatcher`, its only dependency.
	pub fn instantiate(&self, dispatcher: Arc<dyn Dispatcher>) -> LoadedImplementation {
		LoadedImplementation::new(self.clone(), dispatcher)
	}
}
