//! How Rust field types present themselves to the walks.
//!
//! Encoding reads a borrowed [`FieldValue`]; decoding produces an owned
//! [`Dynamic`] which the field type turns back into itself.
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ConstructError;
use crate::record::{Record, Reflect};
use crate::scalar::Scalar;
use crate::types::TypeRef;

// ------------------------------- Values ----------------------------------- //

pub enum RecordRef<'a> {
    Borrowed(&'a dyn Reflect),
    Shared(Arc<dyn Reflect>),
}

impl RecordRef<'_> {
    pub fn get(&self) -> &dyn Reflect {
        match self {
            RecordRef::Borrowed(r) => *r,
            RecordRef::Shared(r) => r.as_ref(),
        }
    }
}

/// A field's current value as seen by the encoder.
pub enum FieldValue<'a> {
    Null,
    Scalar(Scalar),
    Record(RecordRef<'a>),
    Seq(Vec<FieldValue<'a>>),
}

impl FieldValue<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Scalar(s) => s.type_name(),
            FieldValue::Record(r) => r.get().record_name(),
            FieldValue::Seq(_) => "sequence",
        }
    }
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("Null"),
            FieldValue::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            FieldValue::Record(r) => write!(f, "Record({})", r.get().record_name()),
            FieldValue::Seq(xs) => f.debug_tuple("Seq").field(xs).finish(),
        }
    }
}

/// A decoded value on its way into [`Record::construct`].
pub enum Dynamic {
    Null,
    Scalar(Scalar),
    Record(Box<dyn Reflect>),
    Seq(Vec<Dynamic>),
}

impl Dynamic {
    pub fn kind(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Scalar(s) => s.type_name(),
            Dynamic::Record(r) => r.record_name(),
            Dynamic::Seq(_) => "sequence",
        }
    }

    pub fn into_record<R: Record>(self) -> Result<R, ConstructError> {
        match self {
            Dynamic::Record(r) => {
                let found = r.record_name();
                r.into_any()
                    .downcast::<R>()
                    .map(|r| *r)
                    .map_err(|_| ConstructError::mismatch(R::NAME, found))
            }
            other => Err(ConstructError::mismatch(R::NAME, other.kind())),
        }
    }

    fn into_seq(self) -> Result<Vec<Dynamic>, ConstructError> {
        match self {
            Dynamic::Seq(xs) => Ok(xs),
            other => Err(ConstructError::mismatch("sequence", other.kind())),
        }
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Null => f.write_str("Null"),
            Dynamic::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            Dynamic::Record(r) => write!(f, "Record({})", r.record_name()),
            Dynamic::Seq(xs) => f.debug_tuple("Seq").field(xs).finish(),
        }
    }
}

// ------------------------------ FieldType --------------------------------- //

/// A Rust type usable as a record field.
pub trait FieldType: Sized + 'static {
    /// The raw declaration the schema builder resolves.
    fn declared() -> TypeRef;

    fn to_value(&self) -> FieldValue<'_>;

    fn from_dynamic(value: Dynamic) -> Result<Self, ConstructError>;

    /// Value used when the field was not populated at all.
    fn absent() -> Option<Self> {
        None
    }
}

/// Implement [`FieldType`] for types that already implement
/// [`ScalarValue`](crate::scalar::ScalarValue).
#[doc(hidden)]
#[macro_export]
macro_rules! impl_scalar_field {
    ($($ty:ty),* $(,)?) => {$(
        impl $crate::value::FieldType for $ty {
            fn declared() -> $crate::types::TypeRef {
                $crate::types::TypeRef::scalar::<$ty>()
            }

            fn to_value(&self) -> $crate::value::FieldValue<'_> {
                $crate::value::FieldValue::Scalar($crate::scalar::ScalarValue::to_scalar(self))
            }

            fn from_dynamic(
                value: $crate::value::Dynamic,
            ) -> ::std::result::Result<Self, $crate::error::ConstructError> {
                match value {
                    $crate::value::Dynamic::Scalar(s) => {
                        <$ty as $crate::scalar::ScalarValue>::from_scalar(s)
                    }
                    other => ::std::result::Result::Err($crate::error::ConstructError::mismatch(
                        <$ty as $crate::scalar::ScalarValue>::scalar_type().name(),
                        other.kind(),
                    )),
                }
            }
        }
    )*};
}

impl_scalar_field!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, NaiveDate,
    NaiveDateTime,
);

impl<T: FieldType> FieldType for Option<T> {
    fn declared() -> TypeRef {
        TypeRef::optional(T::declared())
    }

    fn to_value(&self) -> FieldValue<'_> {
        match self {
            Some(v) => v.to_value(),
            None => FieldValue::Null,
        }
    }

    fn from_dynamic(value: Dynamic) -> Result<Self, ConstructError> {
        match value {
            Dynamic::Null => Ok(None),
            other => T::from_dynamic(other).map(Some),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

macro_rules! seq_field {
    ($coll:ident, $ctor:ident $(, $bound:path)?) => {
        impl<T: FieldType $(+ $bound)?> FieldType for $coll<T> {
            fn declared() -> TypeRef {
                TypeRef::$ctor(T::declared())
            }

            fn to_value(&self) -> FieldValue<'_> {
                FieldValue::Seq(self.iter().map(FieldType::to_value).collect())
            }

            fn from_dynamic(value: Dynamic) -> Result<Self, ConstructError> {
                value.into_seq()?.into_iter().map(T::from_dynamic).collect()
            }
        }
    };
}

seq_field!(Vec, list);
seq_field!(VecDeque, deque);
seq_field!(BTreeSet, set, Ord);

impl<T: FieldType> FieldType for Box<T> {
    fn declared() -> TypeRef {
        T::declared()
    }

    fn to_value(&self) -> FieldValue<'_> {
        (**self).to_value()
    }

    fn from_dynamic(value: Dynamic) -> Result<Self, ConstructError> {
        T::from_dynamic(value).map(Box::new)
    }

    fn absent() -> Option<Self> {
        T::absent().map(Box::new)
    }
}

impl<T: FieldType + Send + Sync> FieldType for Arc<T> {
    fn declared() -> TypeRef {
        T::declared()
    }

    fn to_value(&self) -> FieldValue<'_> {
        (**self).to_value()
    }

    fn from_dynamic(value: Dynamic) -> Result<Self, ConstructError> {
        T::from_dynamic(value).map(Arc::new)
    }

    fn absent() -> Option<Self> {
        T::absent().map(Arc::new)
    }
}

/// Back-reference to a record owned elsewhere, typically an ancestor built
/// with [`Arc::new_cyclic`]. Decoding never rebuilds the target; an absent or
/// null value becomes a dangling `Weak`.
impl<R: Record> FieldType for Weak<R> {
    fn declared() -> TypeRef {
        TypeRef::optional(TypeRef::record::<R>())
    }

    fn to_value(&self) -> FieldValue<'_> {
        match self.upgrade() {
            Some(target) => FieldValue::Record(RecordRef::Shared(target)),
            None => FieldValue::Null,
        }
    }

    fn from_dynamic(value: Dynamic) -> Result<Self, ConstructError> {
        match value {
            Dynamic::Null => Ok(Weak::new()),
            other => Err(ConstructError::Custom(format!(
                "cannot rebuild a weak reference to `{}` from data",
                other.kind()
            ))),
        }
    }

    fn absent() -> Option<Self> {
        Some(Weak::new())
    }
}
