//! Mapping of declared Rust types onto runtime value kinds.

use stubgen_contract::ValueKind;
use syn::{GenericArgument, PathArguments, Type};

/// How a declared parameter type is bound at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamType {
	pub kind: ValueKind,
	/// Declared as `Option<_>`; `None` arguments are accepted.
	pub optional: bool,
}

/// Classifies a declared parameter or value-shaped result type.
///
/// Primitive integers, floats, `bool` and string types map onto their own
/// kinds; `Option<T>` marks `T` optional; everything else is bound as JSON.
pub fn classify(ty: &Type) -> ParamType {
	match ty {
		Type::Reference(reference) => classify(&reference.elem),
		Type::Paren(paren) => classify(&paren.elem),
		Type::Group(group) => classify(&group.elem),
		Type::Path(path) if path.qself.is_none() => {
			let Some(last) = path.path.segments.last() else {
				return required(ValueKind::Json);
			};
			if last.ident == "Option"
				&& let Some(inner) = single_type_argument(&last.arguments)
			{
				return ParamType {
					kind: classify(inner).kind,
					optional: true,
				};
			}
			required(primitive_kind(&last.ident.to_string()))
		}
		_ => required(ValueKind::Json),
	}
}

/// Returns the only type argument of `Foo<T>`, if that is its shape.
pub fn single_type_argument(arguments: &PathArguments) -> Option<&Type> {
	let PathArguments::AngleBracketed(args) = arguments else {
		return None;
	};
	let mut types = args.args.iter().filter_map(|arg| match arg {
		GenericArgument::Type(ty) => Some(ty),
		_ => None,
	});
	let first = types.next()?;
	types.next().is_none().then_some(first)
}

fn required(kind: ValueKind) -> ParamType {
	ParamType { kind, optional: false }
}

fn primitive_kind(ident: &str) -> ValueKind {
	match ident {
		"i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128" | "usize" => ValueKind::Int,
		"f32" | "f64" => ValueKind::Float,
		"bool" => ValueKind::Bool,
		"str" | "String" => ValueKind::Str,
		_ => ValueKind::Json,
	}
}
