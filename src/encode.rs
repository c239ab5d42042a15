//! Record → tree.
//!
//! The visited set is created per top-level call and threaded through the
//! recursion, so an [`Encoder`] holds no mutable state and can be shared
//! across threads.
use std::any::{Any, TypeId};
use std::collections::HashSet;

use crate::error::EncodeError;
use crate::record::{Reflect, identity};
use crate::schema::{Element, FieldDescriptor, FieldKind, RecordSchema, Schema};
use crate::tree::{Tree, TreeMap};
use crate::value::FieldValue;

/// Records on the active encode path (ancestors of the record being encoded).
#[derive(Default)]
struct Visited {
    path: HashSet<(usize, TypeId)>,
}

impl Visited {
    fn contains(&self, record: &dyn Reflect) -> bool {
        self.path.contains(&identity(record))
    }

    fn enter(&mut self, record: &dyn Reflect) {
        self.path.insert(identity(record));
    }

    fn leave(&mut self, record: &dyn Reflect) {
        self.path.remove(&identity(record));
    }
}

#[derive(Clone, Copy)]
pub struct Encoder<'s> {
    schema: &'s Schema,
}

impl<'s> Encoder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub fn encode(&self, root: &dyn Reflect) -> Result<Tree, EncodeError> {
        let mut visited = Visited::default();
        self.encode_nested(root, &mut visited)
    }

    fn record_schema(&self, record: &dyn Reflect) -> Result<&'s RecordSchema, EncodeError> {
        self.schema
            .get(Any::type_id(record.as_any()))
            .ok_or(EncodeError::UnknownRecord(record.record_name()))
    }

    fn encode_nested(&self, record: &dyn Reflect, visited: &mut Visited) -> Result<Tree, EncodeError> {
        let schema = self.record_schema(record)?;
        visited.enter(record);
        let out = self.encode_fields(record, schema, visited);
        visited.leave(record);
        out.map(Tree::Map)
    }

    fn encode_fields(
        &self,
        record: &dyn Reflect,
        schema: &RecordSchema,
        visited: &mut Visited,
    ) -> Result<TreeMap, EncodeError> {
        let mut out = TreeMap::with_capacity(schema.len());
        for field in schema.fields() {
            let value = record.field(field.name()).ok_or(EncodeError::MissingField {
                record: record.record_name(),
                field: field.name(),
            })?;

            if is_back_edge(&value, visited) {
                log::debug!("omitting cyclic field `{}.{}`", record.record_name(), field.name());
                continue;
            }

            let tree = match field.kind() {
                FieldKind::Collection { element, .. } => match value {
                    FieldValue::Seq(items) => self.encode_elements(record, field, *element, items, visited)?,
                    FieldValue::Null => Tree::Null,
                    other => return Err(mismatch(record, field, "sequence", &other)),
                },
                FieldKind::Record(_) => match value {
                    FieldValue::Record(nested) => self.encode_nested(nested.get(), visited)?,
                    FieldValue::Null => Tree::Null,
                    other => return Err(mismatch(record, field, "record", &other)),
                },
                // scalars are copied verbatim; text encoders apply only at render time
                FieldKind::Scalar(_) => match value {
                    FieldValue::Scalar(s) => Tree::Scalar(s),
                    FieldValue::Null => Tree::Null,
                    other => return Err(mismatch(record, field, "scalar", &other)),
                },
            };
            out.insert(field.name().to_owned(), tree);
        }
        Ok(out)
    }

    fn encode_elements(
        &self,
        record: &dyn Reflect,
        field: &FieldDescriptor,
        element: Element,
        items: Vec<FieldValue<'_>>,
        visited: &mut Visited,
    ) -> Result<Tree, EncodeError> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if is_back_edge(&item, visited) {
                log::debug!("omitting cyclic element of `{}.{}`", record.record_name(), field.name());
                continue;
            }
            let tree = match (element, item) {
                (_, FieldValue::Null) => Tree::Null,
                (Element::Record(_), FieldValue::Record(nested)) => self.encode_nested(nested.get(), visited)?,
                (Element::Scalar(ty), FieldValue::Scalar(s)) if ty.accepts(&s) => Tree::Scalar(s),
                (Element::Scalar(ty), FieldValue::Scalar(s)) => ty
                    .coerce(&Tree::Scalar(s))
                    .map(Tree::Scalar)
                    .map_err(|source| EncodeError::Conversion {
                        record: record.record_name(),
                        field: field.name(),
                        source,
                    })?,
                (Element::Record(_), other) => return Err(mismatch(record, field, "record", &other)),
                (Element::Scalar(_), other) => return Err(mismatch(record, field, "scalar", &other)),
            };
            out.push(tree);
        }
        Ok(Tree::Seq(out))
    }
}

fn is_back_edge(value: &FieldValue<'_>, visited: &Visited) -> bool {
    match value {
        FieldValue::Record(r) => visited.contains(r.get()),
        _ => false,
    }
}

fn mismatch(
    record: &dyn Reflect,
    field: &FieldDescriptor,
    expected: &'static str,
    found: &FieldValue<'_>,
) -> EncodeError {
    EncodeError::ShapeMismatch {
        record: record.record_name(),
        field: field.name(),
        expected,
        found: found.kind(),
    }
}
