//! The closed type universe a schema is built against.
//!
//! Forward references and string names in field declarations are resolved
//! here by plain map lookup. Nothing is discovered by name at runtime; a type
//! that is not registered is a build error.
use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ResolveError;
use crate::record::{Record, RecordType};
use crate::scalar::{ScalarType, ScalarValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registered {
    Record(RecordType),
    Scalar(ScalarType),
}

impl Registered {
    fn id(&self) -> std::any::TypeId {
        match self {
            Registered::Record(r) => r.id(),
            Registered::Scalar(s) => s.id(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TypeRegistry {
    by_name: HashMap<&'static str, Registered>,
    ambiguous_names: HashSet<&'static str>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
            ambiguous_names: HashSet::new(),
        }
    }

    /// A registry with the built-in scalars: `bool`, `int`, `float`, `str`,
    /// `date` and `datetime`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_scalar(bool::scalar_type());
        registry.register_scalar(i64::scalar_type());
        registry.register_scalar(f64::scalar_type());
        registry.register_scalar(String::scalar_type());
        registry.register_scalar(NaiveDate::scalar_type());
        registry.register_scalar(NaiveDateTime::scalar_type());
        registry
    }

    pub fn register<R: Record>(&mut self) -> &mut Self {
        self.insert(R::NAME, Registered::Record(RecordType::of::<R>()));
        self
    }

    /// Builder-style [`TypeRegistry::register`].
    pub fn with<R: Record>(mut self) -> Self {
        self.register::<R>();
        self
    }

    pub fn register_record(&mut self, ty: RecordType) -> &mut Self {
        self.insert(ty.name(), Registered::Record(ty));
        self
    }

    pub fn register_scalar(&mut self, ty: ScalarType) -> &mut Self {
        self.insert(ty.name(), Registered::Scalar(ty));
        self
    }

    // Re-registering the same type is a no-op; a second, different type under
    // the same name makes the name unusable.
    fn insert(&mut self, name: &'static str, entry: Registered) {
        if self.ambiguous_names.contains(name) {
            return;
        }
        match self.by_name.get(name) {
            Some(existing) if existing.id() == entry.id() => {}
            Some(_) => {
                log::debug!("type name `{name}` registered twice; marking ambiguous");
                self.by_name.remove(name);
                self.ambiguous_names.insert(name);
            }
            None => {
                self.by_name.insert(name, entry);
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Result<Registered, ResolveError> {
        if self.ambiguous_names.contains(name) {
            return Err(ResolveError::AmbiguousName(name.to_owned()));
        }
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ResolveError::UnknownName(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
