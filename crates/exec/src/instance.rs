use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use stubgen_contract::{DispatchError, DispatchResult, Dispatcher, RequestDescription, Value, ValueKind};
use stubgen_engine::{ImplementationId, InterfaceName};
use thiserror::Error;

use crate::image::{CompiledMethod, HeaderSource, RequestOp, ReturnKind};
use crate::module::{ModuleId, TypeHandle};

#[derive(Debug, Error)]
pub enum InvokeError {
	#[error("`{interface}` has no method `{method}`")]
	UnknownMethod { interface: InterfaceName, method: String },
	#[error("`{method}` takes {expected} argument(s), {found} given")]
	Arity {
		method: String,
		expected: usize,
		found: usize,
	},
	#[error("argument `{param}` of `{method}` expects {expected}, got {found}")]
	ArgumentKind {
		method: String,
		param: String,
		expected: &'static str,
		found: &'static str,
	},
	#[error(transparent)]
	Dispatch(#[from] DispatchError),
}

/// What a successful call returned.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
	Unit,
	Value(serde_json::Value),
}

impl CallOutcome {
	/// Decodes a value-shaped outcome; a unit outcome decodes from `null`.
	pub fn decode<T: DeserializeOwned>(self) -> DispatchResult<T> {
		match self {
			Self::Unit => stubgen_contract::decode(serde_json::Value::Null),
			Self::Value(value) => stubgen_contract::decode(value),
		}
	}
}

/// A generated implementation bound to its dispatcher.
///
/// Each instance owns its dispatcher handle; instances are never shared
/// between callers.
pub struct LoadedImplementation {
	ty: TypeHandle,
	dispatcher: Arc<dyn Dispatcher>,
}

impl fmt::Debug for LoadedImplementation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LoadedImplementation")
			.field("interface", self.interface())
			.field("implementation", self.implementation())
			.field("module", &self.ty.module())
			.finish_non_exhaustive()
	}
}

impl LoadedImplementation {
	pub(crate) fn new(ty: TypeHandle, dispatcher: Arc<dyn Dispatcher>) -> Self {
		Self { ty, dispatcher }
	}

	pub fn interface(&self) -> &InterfaceName {
		&self.ty.compiled().interface
	}

	pub fn implementation(&self) -> &ImplementationId {
		&self.ty.compiled().id
	}

	pub fn module(&self) -> ModuleId {
		self.ty.module()
	}

	pub fn implements(&self, interface: &InterfaceName) -> bool {
		self.interface() == interface
	}

	/// Method names in declaration order.
	pub fn methods(&self) -> impl Iterator<Item = &str> {
		self.ty.compiled().methods.iter().map(|m| m.name.as_str())
	}

	/// Calls `method` with positional `args`.
	///
	/// `Value::Null` stands for `None` and is only accepted by optional
	/// parameters; null query and header arguments are left out of the request.
	pub fn invoke(&self, method: &str, args: Vec<Value>) -> Result<CallOutcome, InvokeError> {
		let compiled = self.ty.compiled();
		let Some(method) = compiled.methods.iter().find(|m| m.name == method) else {
			return Err(InvokeError::UnknownMethod {
				interface: compiled.interface.clone(),
				method: method.to_owned(),
			});
		};
		check_arguments(method, &args)?;

		let request = build_request(method, &args);
		tracing::trace!(
			interface = %compiled.interface,
			method = %method.name,
			verb = %request.method(),
			path = request.path(),
			"Invoking generated method"
		);

		match method.returns {
			ReturnKind::Unit => {
				self.dispatcher.send(request)?;
				Ok(CallOutcome::Unit)
			}
			ReturnKind::Value { kind, optional } => {
				let value = self.dispatcher.send_for_value(request)?;
				if !(optional && value.is_null()) && !json_matches(kind, &value) {
					return Err(DispatchError::Decode(format!("expected a {} result, got {value}", kind.as_str())).into());
				}
				Ok(CallOutcome::Value(value))
			}
		}
	}
}

fn check_arguments(method: &CompiledMethod, args: &[Value]) -> Result<(), InvokeError> {
	if args.len() != method.params.len() {
		return Err(InvokeError::Arity {
			method: method.name.clone(),
			expected: method.params.len(),
			found: args.len(),
		});
	}
	for (param, arg) in method.params.iter().zip(args) {
		let accepted = if arg.is_null() { param.optional } else { param.kind.accepts(arg) };
		if !accepted {
			return Err(InvokeError::ArgumentKind {
				method: method.name.clone(),
				param: param.name.clone(),
				expected: param.kind.as_str(),
				found: arg.kind().map_or("null", ValueKind::as_str),
			});
		}
	}
	Ok(())
}

fn build_request(method: &CompiledMethod, args: &[Value]) -> RequestDescription {
	let mut request = RequestDescription::new(method.verb, method.path.clone());
	for op in &method.ops {
		request = match op {
			RequestOp::PathParam { name, slot } => request.path_param(name.clone(), args[*slot].clone()),
			RequestOp::Query { name, slot } => request.query(name.clone(), args[*slot].clone()),
			RequestOp::Header {
				name,
				source: HeaderSource::Static(value),
			} => request.header(name.clone(), value.as_str()),
			RequestOp::Header {
				name,
				source: HeaderSource::Slot(slot),
			} => request.header(name.clone(), args[*slot].clone()),
			RequestOp::Body { slot } => request.body(args[*slot].clone()),
		};
	}
	request
}

fn json_matches(kind: ValueKind, value: &serde_json::Value) -> bool {
	match kind {
		ValueKind::Json => true,
		ValueKind::Bool => value.is_boolean(),
		ValueKind::Int => value.is_i64() || value.is_u64(),
		ValueKind::Float => value.is_number(),
		ValueKind::Str => value.is_string(),
	}
}
