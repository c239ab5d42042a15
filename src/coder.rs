//! The facade: one schema and one converter set, fixed at build time, for a
//! root record type `T`.
//!
//! ```
//! use chrono::NaiveDate;
//! use record_coder::{Coder, record};
//!
//! record! {
//!     #[derive(Debug, PartialEq)]
//!     pub struct Person {
//!         pub name: String,
//!         pub age: u32,
//!         pub birthday: NaiveDate,
//!     }
//! }
//!
//! let coder = Coder::<Person>::builder()
//!     .text_encoder(|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
//!     .build()
//!     .unwrap();
//! let person = Person {
//!     name: "High Time".into(),
//!     age: 26,
//!     birthday: NaiveDate::from_ymd_opt(1995, 4, 1).unwrap(),
//! };
//! let text = coder.to_text(&person).unwrap();
//! assert_eq!(text, r#"{"name":"High Time","age":26,"birthday":"1995-04-01"}"#);
//! assert_eq!(coder.from_text(&text).unwrap(), person);
//! ```
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::convert::Converters;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::{CoderError, ConvertError, DecodeError, EncodeError, SchemaBuildError};
use crate::record::{Record, RecordType};
use crate::registry::TypeRegistry;
use crate::scalar::ScalarValue;
use crate::schema::Schema;
use crate::text;
use crate::tree::Tree;

pub struct Coder<T: Record> {
    schema: Schema,
    converters: Converters,
    _root: PhantomData<fn() -> T>,
}

impl<T: Record> Coder<T> {
    /// Coder with the built-in registry and no converters.
    pub fn new() -> Result<Self, SchemaBuildError> {
        Self::builder().build()
    }

    pub fn builder() -> CoderBuilder<T> {
        CoderBuilder::new()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn converters(&self) -> &Converters {
        &self.converters
    }

    // ---- Tree ---- //

    pub fn to_tree(&self, value: &T) -> Result<Tree, EncodeError> {
        Encoder::new(&self.schema).encode(value)
    }

    pub fn from_tree(&self, tree: &Tree) -> Result<T, DecodeError> {
        self.decode_as::<T>(tree)
    }

    /// Decode into any record type the schema reaches, not only the root.
    pub fn decode_as<R: Record>(&self, tree: &Tree) -> Result<R, DecodeError> {
        Decoder::new(&self.schema, &self.converters).decode_as::<R>(tree)
    }

    // ---- Text ---- //

    pub fn to_text(&self, value: &T) -> Result<String, CoderError> {
        let tree = self.to_tree(value)?;
        Ok(text::render(&tree, &self.converters)?)
    }

    pub fn to_text_pretty(&self, value: &T) -> Result<String, CoderError> {
        let tree = self.to_tree(value)?;
        Ok(text::render_pretty(&tree, &self.converters)?)
    }

    pub fn from_text(&self, input: &str) -> Result<T, CoderError> {
        let tree = text::parse(input)?;
        Ok(self.from_tree(&tree)?)
    }
}

impl<T: Record> fmt::Debug for Coder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coder")
            .field("root", &T::NAME)
            .field("records", &self.schema.len())
            .field("converters", &self.converters)
            .finish()
    }
}

// -------------------------------- Builder --------------------------------- //

pub struct CoderBuilder<T: Record> {
    registry: TypeRegistry,
    converters: Converters,
    _root: PhantomData<fn() -> T>,
}

impl<T: Record> CoderBuilder<T> {
    fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            converters: Converters::new(),
            _root: PhantomData,
        }
    }

    /// Names available to forward references. The root type is always added.
    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn text_encoder<S, R, F>(mut self, encode: F) -> Self
    where
        S: Any,
        R: Into<Tree>,
        F: Fn(&S) -> R + Send + Sync + 'static,
    {
        self.converters = self.converters.text_encoder(encode);
        self
    }

    pub fn type_decoder<S, F>(mut self, decode: F) -> Self
    where
        S: ScalarValue,
        F: Fn(&Tree) -> Result<S, ConvertError> + Send + Sync + 'static,
    {
        self.converters = self.converters.type_decoder(decode);
        self
    }

    pub fn field_decoder<R, S, F>(mut self, field: &str, decode: F) -> Self
    where
        R: Record,
        S: ScalarValue,
        F: Fn(&Tree) -> Result<S, ConvertError> + Send + Sync + 'static,
    {
        self.converters = self.converters.field_decoder::<R, S, F>(field, decode);
        self
    }

    /// Replace all converters at once.
    pub fn converters(mut self, converters: Converters) -> Self {
        self.converters = converters;
        self
    }

    pub fn build(mut self) -> Result<Coder<T>, SchemaBuildError> {
        self.registry.register_record(RecordType::of::<T>());
        let schema = Schema::for_root::<T>(&self.registry)?;
        log::debug!("built coder for `{}` ({:?})", T::NAME, self.converters);
        Ok(Coder { schema, converters: self.converters, _root: PhantomData })
    }
}
