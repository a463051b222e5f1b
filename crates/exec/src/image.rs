//! Binary images of emitted implementations.
//!
//! Layout: [`MAGIC`], [`SCHEMA_VERSION`] as little-endian `u32`, then the
//! postcard-encoded [`Image`].

use std::mem::size_of;

use serde::{Deserialize, Serialize};
use stubgen_contract::{Method, ValueKind};
use stubgen_engine::{ImplementationId, InterfaceName};
use thiserror::Error;

/// Magic bytes identifying an emitted image.
pub const MAGIC: &[u8; 8] = b"STUBIMG\0";

/// Bumped whenever the payload layout changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Header size in bytes (magic + version).
pub const HEADER_SIZE: usize = MAGIC.len() + size_of::<u32>();

#[derive(Debug, Error)]
pub enum ImageError {
	#[error("image is truncated or does not start with the image magic")]
	BadMagic,
	#[error("image schema version {found} is not supported (expected {expected})")]
	UnsupportedVersion { found: u32, expected: u32 },
	#[error("failed to encode image: {0}")]
	Encode(#[source] postcard::Error),
	#[error("failed to decode image: {0}")]
	Decode(#[source] postcard::Error),
}

/// Every compiled type of one emission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Image {
	pub types: Vec<CompiledType>,
}

/// A generated implementation type, lowered for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledType {
	pub id: ImplementationId,
	/// Interface named by the type's generated-type marker.
	pub interface: InterfaceName,
	pub methods: Vec<CompiledMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledMethod {
	pub name: String,
	pub params: Vec<ParamSlot>,
	pub verb: Method,
	pub path: String,
	/// Builder calls in source order.
	pub ops: Vec<RequestOp>,
	pub returns: ReturnKind,
}

/// A declared parameter; arguments are matched to slots by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSlot {
	pub name: String,
	pub kind: ValueKind,
	pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestOp {
	PathParam { name: String, slot: usize },
	Query { name: String, slot: usize },
	Header { name: String, source: HeaderSource },
	Body { slot: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeaderSource {
	Static(String),
	Slot(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
	Unit,
	/// Decoded result of the given kind; `null` is accepted when optional.
	Value { kind: ValueKind, optional: bool },
}

impl Image {
	/// Serialises the image with its header.
	pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
		let payload = postcard::to_stdvec(self).map_err(ImageError::Encode)?;
		let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
		bytes.extend_from_slice(MAGIC);
		bytes.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
		bytes.extend_from_slice(&payload);
		Ok(bytes)
	}

	/// Validates the header and decodes the payload.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
		if bytes.len() < HEADER_SIZE || &bytes[..MAGIC.len()] != MAGIC {
			return Err(ImageError::BadMagic);
		}
		let mut version = [0; size_of::<u32>()];
		version.copy_from_slice(&bytes[MAGIC.len()..HEADER_SIZE]);
		let found = u32::from_le_bytes(version);
		if found != SCHEMA_VERSION {
			return Err(ImageError::UnsupportedVersion {
				found,
				expected: SCHEMA_VERSION,
			});
		}
		postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(ImageError::Decode)
	}
}
