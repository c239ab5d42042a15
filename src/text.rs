//! JSON text ↔ [`Tree`].
//!
//! Parsing never consults converters; the decoder applies them later. When
//! rendering, a scalar whose runtime type has a text encoder is rendered from
//! the encoder's output instead, and that output is not encoded again.
use serde_json::{Map, Number, Value};

use crate::convert::Converters;
use crate::error::TextFormatError;
use crate::scalar::Scalar;
use crate::tree::Tree;

// -------------------------------- Parse ----------------------------------- //

/// Parse JSON text, reporting the JSON path of the first error.
pub fn parse(text: &str) -> Result<Tree, TextFormatError> {
    let mut de = serde_json::Deserializer::from_str(text);
    let value = deserialize_with_path(&mut de)?;
    de.end()?;
    Ok(Tree::from(value))
}

fn deserialize_with_path<'de, R>(de: &mut serde_json::Deserializer<R>) -> Result<Value, TextFormatError>
where
    R: serde_json::de::Read<'de>,
{
    serde_path_to_error::deserialize(de).map_err(|err| TextFormatError::Syntax {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::from(b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Tree::from(i),
                (None, Some(u)) => Tree::Scalar(Scalar::UInt(u)),
                (None, None) => Tree::from(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Tree::from(s),
            Value::Array(xs) => Tree::Seq(xs.into_iter().map(Tree::from).collect()),
            Value::Object(m) => Tree::Map(m.into_iter().map(|(k, v)| (k, Tree::from(v))).collect()),
        }
    }
}

// -------------------------------- Render ---------------------------------- //

pub fn render(tree: &Tree, converters: &Converters) -> Result<String, TextFormatError> {
    Ok(serde_json::to_string(&to_json(tree, Some(converters))?)?)
}

pub fn render_pretty(tree: &Tree, converters: &Converters) -> Result<String, TextFormatError> {
    Ok(serde_json::to_string_pretty(&to_json(tree, Some(converters))?)?)
}

/// Convert to a JSON value. `converters` is `None` inside a text encoder's
/// output.
pub fn to_json(tree: &Tree, converters: Option<&Converters>) -> Result<Value, TextFormatError> {
    Ok(match tree {
        Tree::Null => Value::Null,
        Tree::Scalar(s) => scalar_to_json(s, converters)?,
        Tree::Seq(xs) => Value::Array(
            xs.iter()
                .map(|x| to_json(x, converters))
                .collect::<Result<_, _>>()?,
        ),
        Tree::Map(m) => Value::Object(
            m.iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v, converters)?)))
                .collect::<Result<Map<_, _>, TextFormatError>>()?,
        ),
    })
}

fn scalar_to_json(scalar: &Scalar, converters: Option<&Converters>) -> Result<Value, TextFormatError> {
    if let Some(encode) = converters.and_then(|c| c.text_encoder_for(scalar.runtime_type())) {
        let encoded = encode(scalar).map_err(|source| TextFormatError::Encoder {
            type_name: scalar.type_name(),
            source,
        })?;
        return to_json(&encoded, None);
    }
    match scalar {
        Scalar::Bool(b) => Ok(Value::Bool(*b)),
        Scalar::Int(i) => Ok(Value::from(*i)),
        Scalar::UInt(u) => Ok(Value::from(*u)),
        Scalar::Float(f) => Number::from_f64(f.0)
            .map(Value::Number)
            .ok_or(TextFormatError::NonFiniteFloat(f.0)),
        Scalar::Str(s) => Ok(Value::String(s.clone())),
        Scalar::Opaque(o) => Err(TextFormatError::Unrenderable(o.type_name())),
    }
}
