// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Tagged variable tree shared by every Comlink map-interpreter component.
//!
//! A [`Variable`] is either a *primitive* (string, number, boolean,
//! none/absent, byte sequence, or array — arrays are primitive: they replace
//! wholesale on merge rather than being merged element-wise) or a
//! *non-primitive* mapping from string keys to [`Variable`]s. Merging two
//! mappings is recursive and right-biased: [`Variable::merge`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

mod binary;
mod merge;
mod path;
mod serde_impl;

pub use binary::{BinaryData, BinaryDataError};

/// A recursive value in the Comlink variable model.
///
/// Cloning a [`Variable`] is cheap for everything except large [`Variable::Bytes`]
/// payloads and is intentionally shallow for [`Variable::Binary`] (an `Arc` clone).
#[derive(Clone)]
pub enum Variable {
    /// Absent / JSON `null`.
    None,
    /// Boolean primitive.
    Bool(bool),
    /// Numeric primitive. Comlink maps do not distinguish int/float.
    Number(f64),
    /// String primitive.
    String(String),
    /// Raw byte sequence primitive (e.g. a buffered binary response body).
    Bytes(Vec<u8>),
    /// Opaque array primitive — replaced wholesale on merge, never merged
    /// element-wise.
    Array(Vec<Variable>),
    /// Non-primitive mapping from string keys to values.
    Object(BTreeMap<String, Variable>),
    /// A live binary-data handle with `initialize`/`destroy`/`get_all_data`
    /// lifecycle hooks (see [`BinaryData`]). Not serializable — attempting
    /// to do so yields [`VariableError::UnserializableBinary`] rather than
    /// panicking.
    Binary(Arc<dyn BinaryData>),
}

/// Errors produced by [`Variable`] operations.
#[derive(Debug, thiserror::Error)]
pub enum VariableError {
    /// A header/query/path-template value coercion target must be a scalar
    /// (string, number, or boolean) but the value was a mapping, array,
    /// byte sequence, or binary handle.
    #[error("value at '{path}' is not a scalar (string, number, or boolean): {actual}")]
    NotAScalar {
        /// Dotted path to the offending value, for error messages.
        path: String,
        /// Human-readable description of what was found instead.
        actual: &'static str,
    },
    /// Attempted to serialize a live [`Variable::Binary`] handle.
    #[error("cannot serialize a live binary data handle")]
    UnserializableBinary,
}

impl Variable {
    /// Construct an empty non-primitive mapping.
    #[must_use]
    pub fn empty_object() -> Self {
        Variable::Object(BTreeMap::new())
    }

    /// Returns `true` if this value is a primitive (string, number, boolean,
    /// none, bytes, or array) rather than an object mapping.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Variable::Object(_))
    }

    /// Returns a short, human-readable type name (used in error messages).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Variable::None => "none",
            Variable::Bool(_) => "boolean",
            Variable::Number(_) => "number",
            Variable::String(_) => "string",
            Variable::Bytes(_) => "bytes",
            Variable::Array(_) => "array",
            Variable::Object(_) => "object",
            Variable::Binary(_) => "binary",
        }
    }

    /// Coerce this value to a `bool` for [`ConditionAtom`](../comlink_interpreter/index.html) evaluation.
    ///
    /// Follows ordinary truthiness: `None`, `false`, empty string, and the
    /// number `0.0` are falsy; everything else is truthy.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Variable::None => false,
            Variable::Bool(b) => *b,
            Variable::Number(n) => *n != 0.0,
            Variable::String(s) => !s.is_empty(),
            Variable::Bytes(b) => !b.is_empty(),
            Variable::Array(a) => !a.is_empty(),
            Variable::Object(o) => !o.is_empty(),
            Variable::Binary(_) => true,
        }
    }

    /// Coerce this value to a `String` for header/query/path-template
    /// substitution. Only string, number, and boolean scalars are allowed,
    /// matching the HTTP engine's coercion rule (spec §4.2).
    pub fn to_scalar_string(&self, path: &str) -> Result<String, VariableError> {
        match self {
            Variable::String(s) => Ok(s.clone()),
            Variable::Number(n) => Ok(format_number(*n)),
            Variable::Bool(b) => Ok(b.to_string()),
            other => Err(VariableError::NotAScalar {
                path: path.to_string(),
                actual: other.type_name(),
            }),
        }
    }
}

/// Formats a Comlink number the way the HTTP engine needs it serialized:
/// integral values print without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::None => write!(f, "None"),
            Variable::Bool(b) => write!(f, "Bool({b})"),
            Variable::Number(n) => write!(f, "Number({n})"),
            Variable::String(s) => write!(f, "String({s:?})"),
            Variable::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Variable::Array(a) => f.debug_list().entries(a.iter()).finish(),
            Variable::Object(o) => f.debug_map().entries(o.iter()).finish(),
            Variable::Binary(_) => write!(f, "Binary(..)"),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::None => write!(f, ""),
            Variable::Bool(b) => write!(f, "{b}"),
            Variable::Number(n) => write!(f, "{}", format_number(*n)),
            Variable::String(s) => write!(f, "{s}"),
            Variable::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Variable::Array(_) | Variable::Object(_) => {
                write!(f, "{}", serde_json::to_string(self).unwrap_or_default())
            }
            Variable::Binary(_) => write!(f, "<binary>"),
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variable::None, Variable::None) => true,
            (Variable::Bool(a), Variable::Bool(b)) => a == b,
            (Variable::Number(a), Variable::Number(b)) => a == b,
            (Variable::String(a), Variable::String(b)) => a == b,
            (Variable::Bytes(a), Variable::Bytes(b)) => a == b,
            (Variable::Array(a), Variable::Array(b)) => a == b,
            (Variable::Object(a), Variable::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Variable {
    fn from(s: &str) -> Self {
        Variable::String(s.to_string())
    }
}

impl From<String> for Variable {
    fn from(s: String) -> Self {
        Variable::String(s)
    }
}

impl From<f64> for Variable {
    fn from(n: f64) -> Self {
        Variable::Number(n)
    }
}

impl From<bool> for Variable {
    fn from(b: bool) -> Self {
        Variable::Bool(b)
    }
}

impl<V: Into<Variable>> FromIterator<(String, V)> for Variable {
    fn from_iter<T: IntoIterator<Item = (String, V)>>(iter: T) -> Self {
        Variable::Object(iter.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

pub use merge::merge;
pub use path::{get_path, set_path};
