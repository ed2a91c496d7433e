//! Intermediate data structure for values flowing through the compiler:
//! GraphQL mutation input fields on the way in, and RDF terms bound in
//! SPARQL JSON results on the way out.
//!
//! # Examples
//!
//! ```rust
//! use sparqlgrapher::value::Value;
//!
//! let v = Value::Bool(true);
//! ```

use crate::Error;
use std::collections::HashMap;
use std::convert::{TryFrom, TryInto};

/// A value carried by the compiler, independent of whether it came from a
/// GraphQL input object or a SPARQL JSON binding.
#[derive(Clone, Debug)]
pub enum Value {
    Array(Vec<Value>),
    Bool(bool),
    Float64(f64),
    Int64(i64),
    Map(HashMap<String, Value>),
    Null,
    String(String),
    UInt64(u64),
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(oa)) => a == oa,
            (Value::Bool(b), Value::Bool(ob)) => b == ob,
            (Value::Float64(f), Value::Float64(of)) => f == of,
            (Value::Int64(i), Value::Int64(oi)) => i == oi,
            (Value::Map(m), Value::Map(om)) => m == om,
            (Value::Null, Value::Null) => true,
            (Value::String(s), Value::String(os)) => s == os,
            (Value::UInt64(i), Value::UInt64(oi)) => i == oi,
            (_, _) => false,
        }
    }
}

impl Value {
    /// The SPARQL/XSD datatype IRI this value would be serialized with as a
    /// typed literal, or `None` for strings (which are serialized as plain
    /// literals) and container types that have no literal form.
    pub fn xsd_datatype(&self) -> Option<&'static str> {
        match self {
            Value::Bool(_) => Some("http://www.w3.org/2001/XMLSchema#boolean"),
            Value::Int64(_) | Value::UInt64(_) => Some("http://www.w3.org/2001/XMLSchema#integer"),
            Value::Float64(_) => Some("http://www.w3.org/2001/XMLSchema#double"),
            Value::String(_) | Value::Null | Value::Array(_) | Value::Map(_) => None,
        }
    }

    /// The lexical form this value would take inside a SPARQL literal.
    pub fn lexical(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::UInt64(i) => i.to_string(),
            Value::Float64(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            Value::Array(_) | Value::Map(_) => String::new(),
        }
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Value, Error> {
        match value {
            serde_json::Value::Array(a) => Ok(Value::Array(
                a.into_iter()
                    .map(|val| val.try_into())
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int64(i))
                } else if let Some(i) = n.as_u64() {
                    Ok(Value::UInt64(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float64(f))
                } else {
                    Err(Error::ConversionFailed {
                        message: "serde_json::Value::Number could not be converted to Value"
                            .to_string(),
                    })
                }
            }
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Object(m) => Ok(Value::Map(
                m.into_iter()
                    .map(|(k, v)| {
                        let val = v.try_into()?;
                        Ok((k, val))
                    })
                    .collect::<Result<HashMap<String, Value>, Error>>()?,
            )),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<bool, Self::Error> {
        if let Value::Bool(b) = value {
            Ok(b)
        } else {
            Err(Error::ConversionFailed {
                message: format!("{:#?} could not be converted to bool", value),
            })
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<f64, Self::Error> {
        if let Value::Int64(i) = value {
            Ok(i as f64)
        } else if let Value::UInt64(i) = value {
            Ok(i as f64)
        } else if let Value::Float64(f) = value {
            Ok(f)
        } else {
            Err(Error::ConversionFailed {
                message: format!("{:#?} could not be converted to f64", value),
            })
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<String, Self::Error> {
        if let Value::String(s) = value {
            Ok(s)
        } else {
            Err(Error::ConversionFailed {
                message: format!("{:#?} could not be converted to String", value),
            })
        }
    }
}

impl TryFrom<Value> for Vec<Value> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Vec<Value>, Self::Error> {
        if let Value::Array(a) = value {
            Ok(a)
        } else {
            Err(Error::ConversionFailed {
                message: format!("{:#?} could not be converted to Vec<Value>", value),
            })
        }
    }
}

impl TryFrom<Value> for HashMap<String, Value> {
    type Error = Error;

    fn try_from(value: Value) -> Result<HashMap<String, Value>, Self::Error> {
        if let Value::Map(m) = value {
            Ok(m)
        } else {
            Err(Error::ConversionFailed {
                message: format!("{:#?} could not be converted to a map", value),
            })
        }
    }
}

impl TryFrom<Value> for serde_json::Value {
    type Error = Error;

    fn try_from(value: Value) -> Result<serde_json::Value, Error> {
        match value {
            Value::Array(a) => Ok(serde_json::Value::Array(
                a.into_iter()
                    .map(|v| v.try_into())
                    .collect::<Result<Vec<_>, Error>>()?,
            )),
            Value::Bool(b) => Ok(serde_json::Value::Bool(b)),
            Value::Float64(f) => Ok(serde_json::Value::Number(
                serde_json::Number::from_f64(f).ok_or_else(|| Error::ConversionFailed {
                    message: "Value::Float64 could not be converted to serde_json::Number (NaN or infinite)".to_string(),
                })?,
            )),
            Value::Int64(i) => Ok(serde_json::Value::Number(i.into())),
            Value::Map(hm) => Ok(serde_json::Value::Object(
                hm.into_iter()
                    .map(|(k, v)| {
                        let val = v.try_into()?;
                        Ok((k, val))
                    })
                    .collect::<Result<serde_json::Map<String, serde_json::Value>, Error>>()?,
            )),
            Value::Null => Ok(serde_json::Value::Null),
            Value::String(s) => Ok(serde_json::Value::String(s)),
            Value::UInt64(i) => Ok(serde_json::Value::Number(i.into())),
        }
    }
}
