//! Tree → record.
//!
//! For scalar fields exactly one conversion fires, chosen in this order:
//! 1. the (record, field) decoder,
//! 2. the declared-type decoder,
//! 3. the declared type's own coercion.
//!
//! A raw scalar that already has the declared runtime type skips all three.
//! A missing key and an explicit null are both "absent"; absent fields are
//! left out of construction so the record's own default applies.
use crate::convert::Converters;
use crate::error::{ConvertError, DecodeError};
use crate::record::{Fields, Record, RecordType, Reflect};
use crate::scalar::{Scalar, ScalarType};
use crate::schema::{Element, FieldDescriptor, FieldKind, RecordSchema, Schema};
use crate::tree::Tree;
use crate::value::Dynamic;

#[derive(Clone, Copy)]
pub struct Decoder<'c> {
    schema: &'c Schema,
    converters: &'c Converters,
}

impl<'c> Decoder<'c> {
    pub fn new(schema: &'c Schema, converters: &'c Converters) -> Self {
        Self { schema, converters }
    }

    pub fn decode(&self, tree: &Tree, ty: RecordType) -> Result<Box<dyn Reflect>, DecodeError> {
        let schema = self.schema.get(ty.id()).ok_or(DecodeError::UnknownRecord(ty.name()))?;
        self.decode_record(tree, schema)
    }

    pub fn decode_as<R: Record>(&self, tree: &Tree) -> Result<R, DecodeError> {
        let decoded = self.decode(tree, RecordType::of::<R>())?;
        let found = decoded.record_name();
        decoded
            .into_any()
            .downcast::<R>()
            .map(|r| *r)
            .map_err(|_| DecodeError::RootMismatch { expected: R::NAME, found })
    }

    fn decode_record(&self, tree: &Tree, schema: &RecordSchema) -> Result<Box<dyn Reflect>, DecodeError> {
        let ty = schema.ty();
        let map = tree.as_map().ok_or(DecodeError::ExpectedMap {
            record: ty.name(),
            found: tree.kind(),
        })?;

        let mut fields = Fields::new(ty.name());
        for field in schema.fields() {
            let raw = match map.get(field.name()) {
                None | Some(Tree::Null) => continue,
                Some(raw) => raw,
            };
            let value = match field.kind() {
                FieldKind::Collection { element, .. } => self.decode_elements(ty, field, *element, raw)?,
                FieldKind::Record(nested) => Dynamic::Record(self.decode(raw, *nested)?),
                FieldKind::Scalar(declared) => Dynamic::Scalar(
                    self.decode_scalar(ty, field, *declared, raw)
                        .map_err(|source| conversion(ty, field, source))?,
                ),
            };
            fields.insert(field.name(), value);
        }

        ty.construct(fields)
            .map_err(|source| DecodeError::Construct { record: ty.name(), source })
    }

    fn decode_elements(
        &self,
        ty: RecordType,
        field: &FieldDescriptor,
        element: Element,
        raw: &Tree,
    ) -> Result<Dynamic, DecodeError> {
        let items = raw.as_seq().ok_or(DecodeError::ExpectedSeq {
            record: ty.name(),
            field: field.name(),
            found: raw.kind(),
        })?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let value = match (element, item) {
                (_, Tree::Null) => Dynamic::Null,
                (Element::Record(nested), item) => Dynamic::Record(self.decode(item, nested)?),
                (Element::Scalar(declared), item) => {
                    Dynamic::Scalar(coerce(declared, item).map_err(|source| conversion(ty, field, source))?)
                }
            };
            out.push(value);
        }
        Ok(Dynamic::Seq(out))
    }

    fn decode_scalar(
        &self,
        ty: RecordType,
        field: &FieldDescriptor,
        declared: ScalarType,
        raw: &Tree,
    ) -> Result<Scalar, ConvertError> {
        if let Tree::Scalar(s) = raw {
            if declared.accepts(s) {
                return Ok(s.clone());
            }
        }
        if let Some(decode) = self.converters.field_decoder_for(ty.id(), field.name()) {
            log::trace!("{}.{}: field decoder", ty.name(), field.name());
            decode(raw)
        } else if let Some(decode) = self.converters.type_decoder_for(declared.id()) {
            log::trace!("{}.{}: `{}` decoder", ty.name(), field.name(), declared.name());
            decode(raw)
        } else {
            declared.coerce(raw)
        }
    }
}

fn coerce(declared: ScalarType, raw: &Tree) -> Result<Scalar, ConvertError> {
    match raw {
        Tree::Scalar(s) if declared.accepts(s) => Ok(s.clone()),
        _ => declared.coerce(raw),
    }
}

fn conversion(ty: RecordType, field: &FieldDescriptor, source: ConvertError) -> DecodeError {
    DecodeError::Conversion { record: ty.name(), field: field.name(), source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstructError;
    use crate::registry::TypeRegistry;
    use chrono::NaiveDate;
    use serde_json::json;

    crate::record! {
        #[derive(Debug, PartialEq)]
        struct Person {
            name: String,
            age: i64,
            birthday: NaiveDate,
            friend: Option<Box<Person>> = None,
        }
    }

    crate::record! {
        #[derive(Debug, PartialEq)]
        struct Scores {
            values: Vec<f64>,
            best: Option<u8>,
        }
    }

    fn schema<R: Record>() -> Schema {
        Schema::for_root::<R>(&TypeRegistry::new()).unwrap()
    }

    fn tree(v: serde_json::Value) -> Tree {
        Tree::from(v)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn absent_record_field_takes_the_record_default() {
        let schema = schema::<Person>();
        let converters = Converters::new();
        let person: Person = Decoder::new(&schema, &converters)
            .decode_as(&tree(json!({"name": "A", "age": 1, "birthday": "2020-01-01"})))
            .unwrap();
        assert_eq!(person, Person { name: "A".into(), age: 1, birthday: date(2020, 1, 1), friend: None });
    }

    #[test]
    fn nested_records_decode_recursively() {
        let schema = schema::<Person>();
        let converters = Converters::new();
        let input = tree(json!({
            "name": "High Time", "age": 26, "birthday": "1995-04-01",
            "friend": {"name": "All Cats", "age": 26, "birthday": "1995-04-12", "friend": null}
        }));
        let person: Person = Decoder::new(&schema, &converters).decode_as(&input).unwrap();
        let friend = person.friend.unwrap();
        assert_eq!(friend.name, "All Cats");
        assert_eq!(friend.birthday, date(1995, 4, 12));
        assert!(friend.friend.is_none());
    }

    #[test]
    fn field_decoder_beats_type_decoder_beats_coercion() {
        let schema = schema::<Person>();
        let input = tree(json!({"name": "A", "age": 1, "birthday": "x"}));

        let both = Converters::new()
            .type_decoder(|_: &Tree| Ok(date(2000, 1, 1)))
            .field_decoder::<Person, _, _>("birthday", |_: &Tree| Ok(date(1999, 9, 9)));
        let p: Person = Decoder::new(&schema, &both).decode_as(&input).unwrap();
        assert_eq!(p.birthday, date(1999, 9, 9));

        let type_only = Converters::new().type_decoder(|_: &Tree| Ok(date(2000, 1, 1)));
        let p: Person = Decoder::new(&schema, &type_only).decode_as(&input).unwrap();
        assert_eq!(p.birthday, date(2000, 1, 1));

        let none = Converters::new();
        let err = Decoder::new(&schema, &none).decode_as::<Person>(&input).unwrap_err();
        assert!(matches!(err, DecodeError::Conversion { record: "Person", field: "birthday", .. }));
    }

    #[test]
    fn field_decoder_for_another_field_does_not_block_the_type_decoder() {
        let schema = schema::<Person>();
        let converters = Converters::new()
            .field_decoder::<Person, _, _>("name", |_: &Tree| Ok(String::from("renamed")))
            .type_decoder(|_: &Tree| Ok(date(2000, 1, 1)));
        let p: Person = Decoder::new(&schema, &converters)
            .decode_as(&tree(json!({"name": 5, "age": 1, "birthday": "x"})))
            .unwrap();
        assert_eq!(p.name, "renamed");
        assert_eq!(p.birthday, date(2000, 1, 1));
    }

    #[test]
    fn matching_runtime_type_skips_converters() {
        let schema = schema::<Person>();
        let converters = Converters::new()
            .field_decoder::<Person, _, _>("age", |_: &Tree| Err::<i64, _>(ConvertError::new("must not run")));
        let p: Person = Decoder::new(&schema, &converters)
            .decode_as(&tree(json!({"name": "A", "age": 7, "birthday": "2001-02-03"})))
            .unwrap();
        assert_eq!(p.age, 7);
    }

    #[test]
    fn failing_converter_is_not_retried() {
        let schema = schema::<Person>();
        let converters = Converters::new()
            .field_decoder::<Person, _, _>("age", |_: &Tree| Err::<i64, _>(ConvertError::new("boom")));
        let err = Decoder::new(&schema, &converters)
            .decode_as::<Person>(&tree(json!({"name": "A", "age": "7", "birthday": "2001-02-03"})))
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn scalar_collections_use_direct_coercion() {
        let schema = schema::<Scores>();
        let converters = Converters::new();
        let s: Scores = Decoder::new(&schema, &converters)
            .decode_as(&tree(json!({"values": [1, 2.5, "3"], "best": 9})))
            .unwrap();
        assert_eq!(s, Scores { values: vec![1.0, 2.5, 3.0], best: Some(9) });

        let err = Decoder::new(&schema, &converters)
            .decode_as::<Scores>(&tree(json!({"values": {"a": 1}})))
            .unwrap_err();
        assert!(matches!(err, DecodeError::ExpectedSeq { field: "values", found: "map", .. }));
    }

    #[test]
    fn missing_required_scalar_is_a_construction_error() {
        let schema = schema::<Person>();
        let converters = Converters::new();
        let err = Decoder::new(&schema, &converters)
            .decode_as::<Person>(&tree(json!({"name": "A", "birthday": "2020-01-01"})))
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Construct { source: ConstructError::MissingField { field: "age", .. }, .. }
        ));

        let err = Decoder::new(&schema, &converters)
            .decode_as::<Person>(&tree(json!([1, 2])))
            .unwrap_err();
        assert!(matches!(err, DecodeError::ExpectedMap { record: "Person", found: "sequence" }));
    }

    #[test]
    fn out_of_range_integers_fail_construction() {
        let schema = schema::<Scores>();
        let converters = Converters::new();
        let err = Decoder::new(&schema, &converters)
            .decode_as::<Scores>(&tree(json!({"values": [], "best": 300})))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Construct { record: "Scores", .. }));
    }
}
