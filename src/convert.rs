//! Caller-supplied converter tables.
//!
//! Three independent tables, fixed once a coder is built:
//! - text encoders, keyed by the *runtime* type of a scalar leaf, used only
//!   when rendering text;
//! - type decoders, keyed by a field's *declared* scalar type;
//! - field decoders, keyed by (record type, field name).
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConvertError;
use crate::record::Record;
use crate::scalar::{Scalar, ScalarValue};
use crate::tree::Tree;

pub type TextEncoder = Arc<dyn Fn(&Scalar) -> Result<Tree, ConvertError> + Send + Sync>;
pub type ScalarDecoder = Arc<dyn Fn(&Tree) -> Result<Scalar, ConvertError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Converters {
    text_encoders: HashMap<TypeId, TextEncoder>,
    type_decoders: HashMap<TypeId, ScalarDecoder>,
    field_decoders: HashMap<TypeId, HashMap<String, ScalarDecoder>>,
}

impl Converters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render scalars whose runtime type is `T` through `encode`.
    pub fn text_encoder<T, R, F>(mut self, encode: F) -> Self
    where
        T: Any,
        R: Into<Tree>,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        let encoder: TextEncoder = Arc::new(move |scalar: &Scalar| {
            scalar
                .downcast_ref::<T>()
                .map(|v| encode(v).into())
                .ok_or_else(|| ConvertError::new(format!("unexpected {} scalar", scalar.type_name())))
        });
        self.text_encoders.insert(TypeId::of::<T>(), encoder);
        self
    }

    /// Decoder for every field declared as `S` (unless a field decoder wins).
    pub fn type_decoder<S, F>(mut self, decode: F) -> Self
    where
        S: ScalarValue,
        F: Fn(&Tree) -> Result<S, ConvertError> + Send + Sync + 'static,
    {
        let decoder: ScalarDecoder = Arc::new(move |raw: &Tree| decode(raw).map(|v| v.to_scalar()));
        self.type_decoders.insert(S::scalar_type().id(), decoder);
        self
    }

    /// Decoder for one field of record `R`.
    pub fn field_decoder<R, S, F>(mut self, field: &str, decode: F) -> Self
    where
        R: Record,
        S: ScalarValue,
        F: Fn(&Tree) -> Result<S, ConvertError> + Send + Sync + 'static,
    {
        let decoder: ScalarDecoder = Arc::new(move |raw: &Tree| decode(raw).map(|v| v.to_scalar()));
        self.insert_field_decoder(TypeId::of::<R>(), field, decoder);
        self
    }

    pub fn insert_field_decoder(&mut self, record: TypeId, field: &str, decoder: ScalarDecoder) {
        self.field_decoders.entry(record).or_default().insert(field.to_owned(), decoder);
    }

    pub fn text_encoder_for(&self, runtime_type: TypeId) -> Option<&TextEncoder> {
        self.text_encoders.get(&runtime_type)
    }

    pub fn type_decoder_for(&self, declared_type: TypeId) -> Option<&ScalarDecoder> {
        self.type_decoders.get(&declared_type)
    }

    pub fn field_decoder_for(&self, record: TypeId, field: &str) -> Option<&ScalarDecoder> {
        self.field_decoders.get(&record)?.get(field)
    }
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converters")
            .field("text_encoders", &self.text_encoders.len())
            .field("type_decoders", &self.type_decoders.len())
            .field("field_decoders", &self.field_decoders.values().map(HashMap::len).sum::<usize>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    crate::record! {
        struct Holder { when: NaiveDate }
    }

    #[test]
    fn text_encoder_is_keyed_by_runtime_type() {
        let c = Converters::new().text_encoder(|d: &NaiveDate| d.format("%d/%m/%Y").to_string());
        let date = Scalar::opaque(NaiveDate::from_ymd_opt(2021, 2, 3).unwrap());
        let enc = c.text_encoder_for(date.runtime_type()).unwrap();
        assert_eq!(enc(&date).unwrap(), Tree::from("03/02/2021"));
        assert!(c.text_encoder_for(TypeId::of::<i64>()).is_none());
    }

    #[test]
    fn decoders_are_looked_up_by_declared_type_and_field() {
        let c = Converters::new()
            .type_decoder(|raw: &Tree| raw.expect_str().map(str::len).map(|n| n as i64))
            .field_decoder::<Holder, _, _>("when", |raw: &Tree| {
                NaiveDate::parse_from_str(raw.expect_str()?, "%d.%m.%Y").map_err(ConvertError::new)
            });
        let by_type = c.type_decoder_for(TypeId::of::<i64>()).unwrap();
        assert_eq!(by_type(&Tree::from("abcd")).unwrap(), Scalar::Int(4));
        let by_field = c.field_decoder_for(TypeId::of::<Holder>(), "when").unwrap();
        assert_eq!(
            by_field(&Tree::from("01.02.2003")).unwrap(),
            Scalar::opaque(NaiveDate::from_ymd_opt(2003, 2, 1).unwrap())
        );
        assert!(c.field_decoder_for(TypeId::of::<Holder>(), "other").is_none());
    }
}
