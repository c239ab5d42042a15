//! Scalar leaves and the scalar types that fields declare.
//!
//! Every scalar has a runtime type (a `TypeId`). Built-in scalars use the
//! canonical Rust type of their variant (`bool`, `i64`, `f64`, `String`);
//! opaque scalars use the type of the value they carry.
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;

use crate::error::{ConstructError, ConvertError};
use crate::tree::Tree;

// ------------------------------- Scalar ----------------------------------- //

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`; same `int` type as [`Scalar::Int`].
    UInt(u64),
    Float(OrderedFloat<f64>),
    Str(String),
    Opaque(Opaque),
}

impl Scalar {
    pub fn opaque<T: OpaqueValue>(value: T) -> Self {
        Scalar::Opaque(Opaque::new(value))
    }

    pub fn runtime_type(&self) -> TypeId {
        match self {
            Scalar::Bool(_) => TypeId::of::<bool>(),
            Scalar::Int(_) | Scalar::UInt(_) => TypeId::of::<i64>(),
            Scalar::Float(_) => TypeId::of::<f64>(),
            Scalar::Str(_) => TypeId::of::<String>(),
            Scalar::Opaque(o) => o.runtime_type(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) | Scalar::UInt(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "str",
            Scalar::Opaque(o) => o.type_name(),
        }
    }

    /// Borrow the scalar as its runtime type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Scalar::Bool(b) => (b as &dyn Any).downcast_ref(),
            Scalar::Int(i) => (i as &dyn Any).downcast_ref(),
            Scalar::UInt(u) => (u as &dyn Any).downcast_ref(),
            Scalar::Float(f) => (&f.0 as &dyn Any).downcast_ref(),
            Scalar::Str(s) => (s as &dyn Any).downcast_ref(),
            Scalar::Opaque(o) => o.downcast_ref(),
        }
    }
}

// ------------------------------- Opaque ----------------------------------- //

/// Values that can ride inside a [`Scalar::Opaque`].
pub trait OpaqueValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn eq_dyn(&self, other: &dyn OpaqueValue) -> bool;
}

impl<T: Any + fmt::Debug + PartialEq + Send + Sync> OpaqueValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn OpaqueValue) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|o| o == self)
    }
}

#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    value: Arc<dyn OpaqueValue>,
}

impl Opaque {
    pub fn new<T: OpaqueValue>(value: T) -> Self {
        Self {
            type_name: short_type_name(std::any::type_name::<T>()),
            value: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn runtime_type(&self) -> TypeId {
        Any::type_id(self.value.as_any())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.value.eq_dyn(other.value.as_ref())
    }
}

fn short_type_name(path: &'static str) -> &'static str {
    match path.rfind("::") {
        Some(i) if !path.contains('<') => &path[i + 2..],
        _ => path,
    }
}

// ------------------------------ ScalarType -------------------------------- //

/// Direct one-argument conversion of a raw tree value into a scalar type.
pub type CoerceFn = fn(&Tree) -> Result<Scalar, ConvertError>;

/// A declared scalar type: its identity plus its direct coercion.
#[derive(Clone, Copy)]
pub struct ScalarType {
    name: &'static str,
    id: TypeId,
    coerce: CoerceFn,
}

impl ScalarType {
    /// `T` is the runtime type of the scalars this type produces.
    pub fn new<T: Any>(name: &'static str, coerce: CoerceFn) -> Self {
        Self { name, id: TypeId::of::<T>(), coerce }
    }

    pub fn of<T: ScalarValue>() -> Self {
        T::scalar_type()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// True when `scalar` already has exactly this runtime type.
    pub fn accepts(&self, scalar: &Scalar) -> bool {
        scalar.runtime_type() == self.id
    }

    pub fn coerce(&self, raw: &Tree) -> Result<Scalar, ConvertError> {
        (self.coerce)(raw)
    }
}

impl PartialEq for ScalarType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScalarType {}

impl fmt::Debug for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScalarType({})", self.name)
    }
}

// ----------------------------- ScalarValue -------------------------------- //

/// Rust types that map onto a single [`ScalarType`].
pub trait ScalarValue: Sized + 'static {
    fn scalar_type() -> ScalarType;
    fn to_scalar(&self) -> Scalar;
    fn from_scalar(scalar: Scalar) -> Result<Self, ConstructError>;
}

impl ScalarValue for bool {
    fn scalar_type() -> ScalarType {
        ScalarType::new::<bool>("bool", coerce_bool)
    }

    fn to_scalar(&self) -> Scalar {
        Scalar::Bool(*self)
    }

    fn from_scalar(scalar: Scalar) -> Result<Self, ConstructError> {
        match scalar {
            Scalar::Bool(b) => Ok(b),
            other => Err(ConstructError::mismatch("bool", other.type_name())),
        }
    }
}

macro_rules! int_scalar {
    ($($ty:ty),*) => {$(
        impl ScalarValue for $ty {
            fn scalar_type() -> ScalarType {
                ScalarType::new::<i64>("int", coerce_int)
            }

            fn to_scalar(&self) -> Scalar {
                // only u64/usize can exceed i64, and then they are non-negative
                i64::try_from(*self)
                    .map(Scalar::Int)
                    .unwrap_or_else(|_| Scalar::UInt(*self as u64))
            }

            fn from_scalar(scalar: Scalar) -> Result<Self, ConstructError> {
                match scalar {
                    Scalar::Int(i) => <$ty>::try_from(i).map_err(|_| ConstructError::OutOfRange {
                        ty: stringify!($ty),
                        value: i128::from(i),
                    }),
                    Scalar::UInt(u) => <$ty>::try_from(u).map_err(|_| ConstructError::OutOfRange {
                        ty: stringify!($ty),
                        value: i128::from(u),
                    }),
                    other => Err(ConstructError::mismatch("int", other.type_name())),
                }
            }
        }
    )*};
}

int_scalar!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_scalar {
    ($($ty:ty),*) => {$(
        impl ScalarValue for $ty {
            fn scalar_type() -> ScalarType {
                ScalarType::new::<f64>("float", coerce_float)
            }

            fn to_scalar(&self) -> Scalar {
                Scalar::Float(OrderedFloat(f64::from(*self)))
            }

            fn from_scalar(scalar: Scalar) -> Result<Self, ConstructError> {
                match scalar {
                    Scalar::Float(f) => Ok(f.0 as $ty),
                    Scalar::Int(i) => Ok(i as $ty),
                    Scalar::UInt(u) => Ok(u as $ty),
                    other => Err(ConstructError::mismatch("float", other.type_name())),
                }
            }
        }
    )*};
}

float_scalar!(f32, f64);

impl ScalarValue for String {
    fn scalar_type() -> ScalarType {
        ScalarType::new::<String>("str", coerce_str)
    }

    fn to_scalar(&self) -> Scalar {
        Scalar::Str(self.clone())
    }

    fn from_scalar(scalar: Scalar) -> Result<Self, ConstructError> {
        match scalar {
            Scalar::Str(s) => Ok(s),
            other => Err(ConstructError::mismatch("str", other.type_name())),
        }
    }
}

impl ScalarValue for NaiveDate {
    fn scalar_type() -> ScalarType {
        ScalarType::new::<NaiveDate>("date", coerce_date)
    }

    fn to_scalar(&self) -> Scalar {
        Scalar::opaque(*self)
    }

    fn from_scalar(scalar: Scalar) -> Result<Self, ConstructError> {
        take_opaque(scalar, "date")
    }
}

impl ScalarValue for NaiveDateTime {
    fn scalar_type() -> ScalarType {
        ScalarType::new::<NaiveDateTime>("datetime", coerce_datetime)
    }

    fn to_scalar(&self) -> Scalar {
        Scalar::opaque(*self)
    }

    fn from_scalar(scalar: Scalar) -> Result<Self, ConstructError> {
        take_opaque(scalar, "datetime")
    }
}

/// Extract an opaque scalar of type `T`; the inverse of [`Scalar::opaque`].
pub fn take_opaque<T: Any + Clone>(scalar: Scalar, name: &'static str) -> Result<T, ConstructError> {
    match &scalar {
        Scalar::Opaque(o) => o
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ConstructError::mismatch(name, o.type_name())),
        other => Err(ConstructError::mismatch(name, other.type_name())),
    }
}

// ------------------------------ Coercions --------------------------------- //

fn expect_scalar<'t>(raw: &'t Tree, target: &str) -> Result<&'t Scalar, ConvertError> {
    raw.as_scalar()
        .ok_or_else(|| ConvertError::new(format!("cannot convert {} to {target}", raw.kind())))
}

fn unsupported(from: &Scalar, target: &str) -> ConvertError {
    ConvertError::new(format!("cannot convert {} to {target}", from.type_name()))
}

fn coerce_bool(raw: &Tree) -> Result<Scalar, ConvertError> {
    match expect_scalar(raw, "bool")? {
        Scalar::Bool(b) => Ok(Scalar::Bool(*b)),
        Scalar::Int(i) => Ok(Scalar::Bool(*i != 0)),
        Scalar::UInt(_) => Ok(Scalar::Bool(true)),
        Scalar::Str(s) => s.trim().parse().map(Scalar::Bool).map_err(ConvertError::new),
        other => Err(unsupported(other, "bool")),
    }
}

fn coerce_int(raw: &Tree) -> Result<Scalar, ConvertError> {
    match expect_scalar(raw, "int")? {
        Scalar::Int(i) => Ok(Scalar::Int(*i)),
        Scalar::UInt(u) => Ok(Scalar::UInt(*u)),
        Scalar::Bool(b) => Ok(Scalar::Int(i64::from(*b))),
        Scalar::Float(f) => float_to_int(f.0),
        Scalar::Str(s) => s.trim().parse().map(Scalar::Int).map_err(ConvertError::new),
        other => Err(unsupported(other, "int")),
    }
}

// 2^63 and 2^64 are exact in f64; the casts below are in range once checked.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

fn float_to_int(f: f64) -> Result<Scalar, ConvertError> {
    let t = f.trunc();
    if (-I64_BOUND..I64_BOUND).contains(&t) {
        Ok(Scalar::Int(t as i64))
    } else if (0.0..U64_BOUND).contains(&t) {
        Ok(Scalar::UInt(t as u64))
    } else {
        Err(ConvertError::new(format!("float {f} is out of integer range")))
    }
}

fn coerce_float(raw: &Tree) -> Result<Scalar, ConvertError> {
    match expect_scalar(raw, "float")? {
        Scalar::Float(f) => Ok(Scalar::Float(*f)),
        Scalar::Int(i) => Ok(Scalar::Float(OrderedFloat(*i as f64))),
        Scalar::UInt(u) => Ok(Scalar::Float(OrderedFloat(*u as f64))),
        Scalar::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| Scalar::Float(OrderedFloat(f)))
            .map_err(ConvertError::new),
        other => Err(unsupported(other, "float")),
    }
}

fn coerce_str(raw: &Tree) -> Result<Scalar, ConvertError> {
    match expect_scalar(raw, "str")? {
        Scalar::Str(s) => Ok(Scalar::Str(s.clone())),
        Scalar::Bool(b) => Ok(Scalar::Str(b.to_string())),
        Scalar::Int(i) => Ok(Scalar::Str(i.to_string())),
        Scalar::UInt(u) => Ok(Scalar::Str(u.to_string())),
        Scalar::Float(f) => Ok(Scalar::Str(f.0.to_string())),
        other => Err(unsupported(other, "str")),
    }
}

fn coerce_date(raw: &Tree) -> Result<Scalar, ConvertError> {
    match expect_scalar(raw, "date")? {
        Scalar::Str(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Scalar::opaque)
            .map_err(ConvertError::new),
        other => Err(unsupported(other, "date")),
    }
}

fn coerce_datetime(raw: &Tree) -> Result<Scalar, ConvertError> {
    match expect_scalar(raw, "datetime")? {
        Scalar::Str(s) => NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f")
            .map(Scalar::opaque)
            .map_err(ConvertError::new),
        other => Err(unsupported(other, "datetime")),
    }
}

/// Coercion for opaque scalar types that have no direct conversion.
pub fn no_coercion(raw: &Tree) -> Result<Scalar, ConvertError> {
    Err(ConvertError::new(format!(
        "no direct conversion from {}; register a decoder for this type",
        raw.kind()
    )))
}

/// Declare a user type as an opaque scalar usable in record fields.
///
/// ```
/// use record_coder::impl_scalar;
///
/// #[derive(Clone, Debug, PartialEq)]
/// pub struct Money(pub i64);
///
/// impl_scalar!(Money, "money");
/// ```
#[macro_export]
macro_rules! impl_scalar {
    ($ty:ty, $name:literal) => {
        $crate::impl_scalar!($ty, $name, $crate::scalar::no_coercion);
    };
    ($ty:ty, $name:literal, $coerce:expr) => {
        impl $crate::scalar::ScalarValue for $ty {
            fn scalar_type() -> $crate::scalar::ScalarType {
                $crate::scalar::ScalarType::new::<$ty>($name, $coerce)
            }

            fn to_scalar(&self) -> $crate::scalar::Scalar {
                $crate::scalar::Scalar::opaque(::std::clone::Clone::clone(self))
            }

            fn from_scalar(
                scalar: $crate::scalar::Scalar,
            ) -> ::std::result::Result<Self, $crate::error::ConstructError> {
                $crate::scalar::take_opaque::<$ty>(scalar, $name)
            }
        }

        $crate::impl_scalar_field!($ty);
    };
}
