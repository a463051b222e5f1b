//! Execution of generated client implementations.
//!
//! Generated units in a [`CompilationContext`](stubgen_engine::CompilationContext)
//! are lowered by [`emit`] into an [`Image`], serialised, and loaded into the
//! process-wide module table with [`load`]. A loaded type is resolved by its
//! explicit implementation id, bound to a dispatcher and invoked by method
//! name.

pub mod emit;
pub mod image;
mod instance;
mod module;

pub use emit::{EmitError, emit};
pub use image::{Image, ImageError};
pub use instance::{CallOutcome, InvokeError, LoadedImplementation};
pub use module::{LoadError, LoadedModule, ModuleId, ResolveError, TypeHandle, load, loaded_modules};
