//! Schema derivation.
//!
//! Starting from a root record type, discover every record type reachable
//! through its fields (pre-order, depth-first) and resolve each field once
//! into a closed [`FieldKind`]. The encode and decode walks only ever match on
//! these kinds; they never probe types at runtime.
//!
//! A type is inserted as a key before its fields are resolved, so
//! self-referential and mutually-referential types terminate: recursion only
//! happens for types not yet present.
pub mod resolve;

use std::any::TypeId;

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::SchemaBuildError;
use crate::record::{Record, RecordType};
use crate::registry::TypeRegistry;
use crate::scalar::ScalarType;
use crate::types::CollectionShape;

pub use resolve::{Resolved, TypeResolver};

// -------------------------------- Types ----------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Element {
    Scalar(ScalarType),
    Record(RecordType),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarType),
    Record(RecordType),
    Collection { element: Element, shape: CollectionShape },
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: &'static str,
    kind: FieldKind,
    optional: bool,
}

impl FieldDescriptor {
    fn new(name: &'static str, resolved: Resolved) -> Self {
        let kind = match (resolved.collection, resolved.element) {
            (Some(shape), element) => FieldKind::Collection { element, shape },
            (None, Element::Scalar(s)) => FieldKind::Scalar(s),
            (None, Element::Record(r)) => FieldKind::Record(r),
        };
        Self { name, kind, optional: resolved.optional }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, FieldKind::Collection { .. })
    }

    pub fn collection(&self) -> Option<CollectionShape> {
        match self.kind {
            FieldKind::Collection { shape, .. } => Some(shape),
            _ => None,
        }
    }

    /// The declared type, or the element type for collections.
    pub fn element(&self) -> Element {
        match self.kind {
            FieldKind::Scalar(s) => Element::Scalar(s),
            FieldKind::Record(r) => Element::Record(r),
            FieldKind::Collection { element, .. } => element,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecordSchema {
    ty: RecordType,
    fields: IndexMap<&'static str, FieldDescriptor>,
}

impl RecordSchema {
    pub fn ty(&self) -> RecordType {
        self.ty
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// -------------------------------- Schema ---------------------------------- //

#[derive(Clone, Debug)]
pub struct Schema {
    root: RecordType,
    records: IndexMap<TypeId, RecordSchema>,
}

impl Schema {
    pub fn build(root: RecordType, registry: &TypeRegistry) -> Result<Self, SchemaBuildError> {
        let mut builder = Builder {
            resolver: TypeResolver::new(registry),
            records: IndexMap::new(),
        };
        builder.discover(root)?;
        log::debug!("schema for `{}` covers {} record type(s)", root.name(), builder.records.len());
        Ok(Self { root, records: builder.records })
    }

    pub fn for_root<R: Record>(registry: &TypeRegistry) -> Result<Self, SchemaBuildError> {
        Self::build(RecordType::of::<R>(), registry)
    }

    pub fn root(&self) -> RecordType {
        self.root
    }

    pub fn get(&self, id: TypeId) -> Option<&RecordSchema> {
        self.records.get(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&RecordSchema> {
        self.records.values().find(|r| r.ty.name() == name)
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.records.contains_key(&id)
    }

    /// Record schemas in discovery order (pre-order from the root).
    pub fn records(&self) -> impl Iterator<Item = &RecordSchema> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

struct Builder<'r> {
    resolver: TypeResolver<'r>,
    records: IndexMap<TypeId, RecordSchema>,
}

impl Builder<'_> {
    fn discover(&mut self, ty: RecordType) -> Result<(), SchemaBuildError> {
        self.records.insert(ty.id(), RecordSchema { ty, fields: IndexMap::new() });
        log::debug!("registering record type `{}`", ty.name());

        let mut fields = IndexMap::new();
        for decl in ty.declared_fields() {
            let resolved = self.resolver.resolve(&decl.ty).map_err(|source| SchemaBuildError::Field {
                record: ty.name(),
                field: decl.name,
                source,
            })?;
            let descriptor = FieldDescriptor::new(decl.name, resolved);
            log::trace!("{}.{} -> {:?}", ty.name(), decl.name, descriptor.kind());

            let nested = match descriptor.element() {
                Element::Record(r) if !self.records.contains_key(&r.id()) => Some(r),
                _ => None,
            };
            match fields.entry(decl.name) {
                Entry::Occupied(_) => {
                    return Err(SchemaBuildError::DuplicateField { record: ty.name(), field: decl.name });
                }
                Entry::Vacant(slot) => {
                    slot.insert(descriptor);
                }
            }
            if let Some(nested) = nested {
                self.discover(nested)?;
            }
        }

        if let Some(entry) = self.records.get_mut(&ty.id()) {
            entry.fields = fields;
        }
        Ok(())
    }
}
