//! Generic structured-data coder.
//!
//! Record types (declared with [`record!`]) are turned into a [`Tree`] of
//! maps, sequences and scalars and back, driven by a [`Schema`] derived once
//! from the root type. Forward references by name go through a
//! [`TypeRegistry`]; caller-supplied [`Converters`] handle scalars that have
//! no natural text form. The [`text`] module bridges trees to JSON text.
//!
//! Object graphs may contain back references ([`std::sync::Weak`] fields):
//! a field or collection element that points at a record already on the
//! current encode path is left out of the output.
pub mod coder;
pub mod convert;
pub mod decode;
pub mod encode;
pub mod error;
pub mod record;
pub mod registry;
pub mod scalar;
pub mod schema;
pub mod text;
pub mod tree;
pub mod types;
pub mod value;

pub use coder::{Coder, CoderBuilder};
pub use convert::Converters;
pub use error::{
    CoderError, ConstructError, ConvertError, DecodeError, EncodeError, ResolveError, SchemaBuildError,
    TextFormatError,
};
pub use record::{FieldDecl, Fields, Record, RecordType, Reflect};
pub use registry::TypeRegistry;
pub use scalar::{Scalar, ScalarType, ScalarValue};
pub use schema::{FieldDescriptor, FieldKind, RecordSchema, Schema};
pub use tree::{Tree, TreeMap};
pub use types::{TypeRef, Wrapper};
pub use value::FieldType;
