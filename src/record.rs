//! Record types: structs with a fixed, ordered set of named, typed fields.
//!
//! [`Reflect`] is the object-safe view the encoder walks; [`Record`] is the
//! static side the schema builder and decoder need. The [`record!`] macro
//! writes both for a plain struct declaration.
//!
//! ```
//! use record_coder::record;
//!
//! record! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Person {
//!         pub name: String,
//!         pub age: u32,
//!         pub friend: Option<Box<Person>> = None,
//!     }
//! }
//! ```
use std::any::{Any, TypeId};
use std::fmt;

use indexmap::IndexMap;

use crate::error::ConstructError;
use crate::types::TypeRef;
use crate::value::{Dynamic, FieldType, FieldValue};

// ------------------------------- Traits ----------------------------------- //

pub trait Reflect: Any + Send + Sync {
    fn record_name(&self) -> &'static str;

    /// Current value of the named field; `None` if the record has no such field.
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

pub trait Record: Reflect + Sized {
    const NAME: &'static str;

    /// Field declarations, in declaration order.
    fn fields() -> Vec<FieldDecl>;

    /// Build an instance from the populated fields. Fields missing from
    /// `fields` take the record's own default.
    fn construct(fields: Fields) -> Result<Self, ConstructError>;
}

/// Identity of a record instance within one object graph.
///
/// The address alone is not enough: a record and its first inline field can
/// share an address.
pub(crate) fn identity(record: &dyn Reflect) -> (usize, TypeId) {
    let addr = std::ptr::from_ref(record).cast::<()>() as usize;
    (addr, Any::type_id(record.as_any()))
}

// ------------------------------ RecordType -------------------------------- //

type ConstructFn = fn(Fields) -> Result<Box<dyn Reflect>, ConstructError>;

/// Runtime handle on a record type. Equality is by type identity.
#[derive(Clone, Copy)]
pub struct RecordType {
    name: &'static str,
    id: TypeId,
    fields: fn() -> Vec<FieldDecl>,
    construct: ConstructFn,
}

impl RecordType {
    pub fn of<R: Record>() -> Self {
        Self {
            name: R::NAME,
            id: TypeId::of::<R>(),
            fields: R::fields,
            construct: construct_boxed::<R>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn declared_fields(&self) -> Vec<FieldDecl> {
        (self.fields)()
    }

    pub fn construct(&self, fields: Fields) -> Result<Box<dyn Reflect>, ConstructError> {
        (self.construct)(fields)
    }
}

fn construct_boxed<R: Record>(fields: Fields) -> Result<Box<dyn Reflect>, ConstructError> {
    R::construct(fields).map(|r| Box::new(r) as Box<dyn Reflect>)
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordType {}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordType({})", self.name)
    }
}

#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub name: &'static str,
    pub ty: TypeRef,
}

impl FieldDecl {
    pub fn new(name: &'static str, ty: TypeRef) -> Self {
        Self { name, ty }
    }
}

// -------------------------------- Fields ---------------------------------- //

/// Decoded field values handed to [`Record::construct`]. Only fields that
/// were actually populated are present.
#[derive(Debug)]
pub struct Fields {
    record: &'static str,
    values: IndexMap<&'static str, Dynamic>,
}

impl Fields {
    pub fn new(record: &'static str) -> Self {
        Self { record, values: IndexMap::new() }
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn insert(&mut self, name: &'static str, value: Dynamic) {
        self.values.insert(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take a field; when it was not populated, fall back to the type's
    /// natural absence (`None` for options) or fail with `MissingField`.
    pub fn take<T: FieldType>(&mut self, name: &'static str) -> Result<T, ConstructError> {
        match self.values.shift_remove(name) {
            Some(value) => T::from_dynamic(value).map_err(|e| e.in_field(name)),
            None => T::absent().ok_or(ConstructError::MissingField {
                record: self.record,
                field: name,
            }),
        }
    }

    pub fn take_or_else<T: FieldType>(
        &mut self,
        name: &'static str,
        default: impl FnOnce() -> T,
    ) -> Result<T, ConstructError> {
        match self.values.shift_remove(name) {
            Some(value) => T::from_dynamic(value).map_err(|e| e.in_field(name)),
            None => Ok(default()),
        }
    }
}

// -------------------------------- Macro ----------------------------------- //

/// Declare a struct and implement [`Reflect`], [`Record`] and
/// [`FieldType`](crate::value::FieldType) for it.
///
/// A field may carry a default (`name: Ty = expr`), used when the field is
/// absent from decoded input.
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $fty:ty $(= $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $fty, )*
        }

        impl $crate::record::Reflect for $name {
            fn record_name(&self) -> &'static str {
                <Self as $crate::record::Record>::NAME
            }

            fn field(&self, name: &str) -> ::std::option::Option<$crate::value::FieldValue<'_>> {
                match name {
                    $( stringify!($field) => ::std::option::Option::Some(
                        $crate::value::FieldType::to_value(&self.$field)
                    ), )*
                    _ => ::std::option::Option::None,
                }
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }

        impl $crate::record::Record for $name {
            const NAME: &'static str = stringify!($name);

            fn fields() -> ::std::vec::Vec<$crate::record::FieldDecl> {
                ::std::vec![
                    $( $crate::record::FieldDecl::new(
                        stringify!($field),
                        <$fty as $crate::value::FieldType>::declared(),
                    ), )*
                ]
            }

            #[allow(unused_mut, unused_variables)]
            fn construct(
                mut fields: $crate::record::Fields,
            ) -> ::std::result::Result<Self, $crate::error::ConstructError> {
                ::std::result::Result::Ok(Self {
                    $( $field: $crate::__take_field!(fields, $field, $fty $(, $default)?), )*
                })
            }
        }

        impl $crate::value::FieldType for $name {
            fn declared() -> $crate::types::TypeRef {
                $crate::types::TypeRef::record::<Self>()
            }

            fn to_value(&self) -> $crate::value::FieldValue<'_> {
                $crate::value::FieldValue::Record($crate::value::RecordRef::Borrowed(self))
            }

            fn from_dynamic(
                value: $crate::value::Dynamic,
            ) -> ::std::result::Result<Self, $crate::error::ConstructError> {
                value.into_record::<Self>()
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __take_field {
    ($fields:ident, $field:ident, $fty:ty) => {
        $fields.take::<$fty>(stringify!($field))?
    };
    ($fields:ident, $field:ident, $fty:ty, $default:expr) => {
        $fields.take_or_else::<$fty>(stringify!($field), || $default)?
    };
}
