// Raw type declarations, as written on a record's fields.
//
// A `TypeRef` is what a field *says* it is; `schema::resolve` turns it into a
// `FieldKind` the walks can match on.
use std::borrow::Cow;
use std::fmt;

use crate::record::{Record, RecordType};
use crate::scalar::{ScalarType, ScalarValue};

#[derive(Clone, Debug)]
pub enum TypeRef {
    Scalar(ScalarType),
    Record(RecordType),
    /// Forward reference or plain type name, looked up in the
    /// [`TypeRegistry`](crate::TypeRegistry) at schema-build time.
    Named(Cow<'static, str>),
    Generic { wrapper: Wrapper, args: Vec<TypeRef> },
}

impl TypeRef {
    pub fn scalar<T: ScalarValue>() -> Self {
        TypeRef::Scalar(T::scalar_type())
    }

    pub fn record<R: Record>() -> Self {
        TypeRef::Record(RecordType::of::<R>())
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn generic(wrapper: Wrapper, args: Vec<TypeRef>) -> Self {
        TypeRef::Generic { wrapper, args }
    }

    pub fn optional(inner: TypeRef) -> Self {
        Self::generic(Wrapper::Optional, vec![inner])
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::generic(Wrapper::List, vec![inner])
    }

    pub fn set(inner: TypeRef) -> Self {
        Self::generic(Wrapper::Set, vec![inner])
    }

    pub fn deque(inner: TypeRef) -> Self {
        Self::generic(Wrapper::Deque, vec![inner])
    }
}

/// Generic wrappers a declaration can use. Only the single-parameter ones
/// survive resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wrapper {
    Optional,
    Union,
    List,
    Set,
    Deque,
    Map,
    Tuple,
}

impl Wrapper {
    pub fn collection(self) -> Option<CollectionShape> {
        match self {
            Wrapper::List => Some(CollectionShape::List),
            Wrapper::Set => Some(CollectionShape::Set),
            Wrapper::Deque => Some(CollectionShape::Deque),
            _ => None,
        }
    }

    pub fn is_optional(self) -> bool {
        matches!(self, Wrapper::Optional | Wrapper::Union)
    }
}

impl fmt::Display for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Wrapper::Optional => "Optional",
            Wrapper::Union => "Union",
            Wrapper::List => "List",
            Wrapper::Set => "Set",
            Wrapper::Deque => "Deque",
            Wrapper::Map => "Map",
            Wrapper::Tuple => "Tuple",
        };
        f.write_str(name)
    }
}

/// The declared shape of a collection field. Every shape travels as a
/// sequence in the tree; the shape is rebuilt by the field's Rust type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionShape {
    List,
    Set,
    Deque,
}
