//! The wire-neutral intermediate value: nested maps, sequences and scalars.
//!
//! This is the contract between the encode/decode walks and the text bridge.
//! No record instance ever appears inside a `Tree`.
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::ConvertError;
use crate::scalar::{OpaqueValue, Scalar};

pub type TreeMap = IndexMap<String, Tree>;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Tree {
    #[default]
    Null,
    Scalar(Scalar),
    Seq(Vec<Tree>),
    Map(TreeMap),
}

impl Tree {
    pub fn opaque<T: OpaqueValue>(value: T) -> Self {
        Tree::Scalar(Scalar::opaque(value))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Tree::Null => "null",
            Tree::Scalar(s) => s.type_name(),
            Tree::Seq(_) => "sequence",
            Tree::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Null)
    }

    /// Map lookup; `None` for missing keys and for non-map trees.
    pub fn get(&self, key: &str) -> Option<&Tree> {
        self.as_map().and_then(|m| m.get(key))
    }

    pub fn as_map(&self) -> Option<&TreeMap> {
        match self {
            Tree::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Tree]> {
        match self {
            Tree::Seq(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Tree::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Like [`Tree::as_str`] but with an error suited to converter closures.
    pub fn expect_str(&self) -> Result<&str, ConvertError> {
        self.as_str()
            .ok_or_else(|| ConvertError::new(format!("expected a string, found {}", self.kind())))
    }
}

// ------------------------------ Conversions ------------------------------- //

impl From<Scalar> for Tree {
    fn from(s: Scalar) -> Self {
        Tree::Scalar(s)
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Tree::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Tree {
    fn from(i: i64) -> Self {
        Tree::Scalar(Scalar::Int(i))
    }
}

impl From<i32> for Tree {
    fn from(i: i32) -> Self {
        Tree::Scalar(Scalar::Int(i64::from(i)))
    }
}

impl From<f64> for Tree {
    fn from(f: f64) -> Self {
        Tree::Scalar(Scalar::Float(OrderedFloat(f)))
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::Scalar(Scalar::Str(s.to_owned()))
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Tree::Scalar(Scalar::Str(s))
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(xs: Vec<Tree>) -> Self {
        Tree::Seq(xs)
    }
}

impl From<TreeMap> for Tree {
    fn from(m: TreeMap) -> Self {
        Tree::Map(m)
    }
}

impl<K: Into<String>> FromIterator<(K, Tree)> for Tree {
    fn from_iter<I: IntoIterator<Item = (K, Tree)>>(iter: I) -> Self {
        Tree::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl FromIterator<Tree> for Tree {
    fn from_iter<I: IntoIterator<Item = Tree>>(iter: I) -> Self {
        Tree::Seq(iter.into_iter().collect())
    }
}

// ------------------------------- Serialize -------------------------------- //

/// Writes the tree with any serde format, without converters. Opaque leaves
/// and non-finite floats are errors; use [`crate::text::render`] to apply
/// text encoders.
impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Tree::Null => serializer.serialize_unit(),
            Tree::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Tree::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            Tree::Scalar(Scalar::UInt(u)) => serializer.serialize_u64(*u),
            Tree::Scalar(Scalar::Float(f)) if f.0.is_finite() => serializer.serialize_f64(f.0),
            Tree::Scalar(Scalar::Float(f)) => Err(S::Error::custom(format!("non-finite float {f}"))),
            Tree::Scalar(Scalar::Str(s)) => serializer.serialize_str(s),
            Tree::Scalar(Scalar::Opaque(o)) => Err(S::Error::custom(format!(
                "opaque `{}` value has no serialized form",
                o.type_name()
            ))),
            Tree::Seq(xs) => {
                let mut seq = serializer.serialize_seq(Some(xs.len()))?;
                for x in xs {
                    seq.serialize_element(x)?;
                }
                seq.end()
            }
            Tree::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
