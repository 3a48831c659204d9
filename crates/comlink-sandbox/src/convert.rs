// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conversion between [`Variable`] and `cel_interpreter::Value`.

use std::collections::HashMap;
use std::sync::Arc;

use cel_interpreter::Value as CelValue;
use cel_interpreter::objects::Key as CelKey;
use comlink_variables::Variable;

/// A value could not be converted between the sandbox's scope representation
/// and its result representation.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// A scope value's type has no CEL equivalent.
    #[error("cannot pass a {0} value into the sandbox")]
    UnrepresentableInput(&'static str),
    /// A CEL result value's type has no [`Variable`] equivalent.
    #[error("sandbox produced a value with no variable equivalent: {0}")]
    UnrepresentableOutput(String),
}

pub(crate) fn variable_to_cel(value: &Variable) -> Result<CelValue, ConversionError> {
    Ok(match value {
        Variable::None => CelValue::Null,
        Variable::Bool(b) => CelValue::Bool(*b),
        Variable::Number(n) => CelValue::Float(*n),
        Variable::String(s) => CelValue::String(Arc::new(s.clone())),
        Variable::Bytes(b) => CelValue::Bytes(Arc::new(b.clone())),
        Variable::Array(items) => {
            let converted: Result<Vec<_>, _> = items.iter().map(variable_to_cel).collect();
            CelValue::List(Arc::new(converted?))
        }
        Variable::Object(fields) => {
            let mut map = HashMap::with_capacity(fields.len());
            for (k, v) in fields {
                map.insert(CelKey::String(Arc::new(k.clone())), variable_to_cel(v)?);
            }
            CelValue::Map(cel_interpreter::objects::Map { map: Arc::new(map) })
        }
        Variable::Binary(_) => return Err(ConversionError::UnrepresentableInput("binary")),
    })
}

pub(crate) fn cel_to_variable(value: &CelValue) -> Result<Variable, ConversionError> {
    Ok(match value {
        CelValue::Null => Variable::None,
        CelValue::Bool(b) => Variable::Bool(*b),
        CelValue::Int(i) => Variable::Number(*i as f64),
        CelValue::UInt(u) => Variable::Number(*u as f64),
        CelValue::Float(f) => Variable::Number(*f),
        CelValue::String(s) => Variable::String(s.as_str().to_string()),
        CelValue::Bytes(b) => Variable::Bytes(b.as_ref().clone()),
        CelValue::List(items) => {
            let converted: Result<Vec<_>, _> = items.iter().map(cel_to_variable).collect();
            Variable::Array(converted?)
        }
        CelValue::Map(map) => {
            let mut fields = std::collections::BTreeMap::new();
            for (k, v) in map.map.iter() {
                let key = match k {
                    CelKey::String(s) => s.as_str().to_string(),
                    CelKey::Int(i) => i.to_string(),
                    CelKey::Uint(u) => u.to_string(),
                    CelKey::Bool(b) => b.to_string(),
                };
                fields.insert(key, cel_to_variable(v)?);
            }
            Variable::Object(fields)
        }
        other => return Err(ConversionError::UnrepresentableOutput(format!("{other:?}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_object_with_mixed_fields() {
        let original = Variable::from_iter([
            ("n".to_string(), Variable::Number(1.0)),
            ("s".to_string(), Variable::String("x".into())),
            ("b".to_string(), Variable::Bool(true)),
            ("a".to_string(), Variable::Array(vec![Variable::Number(2.0)])),
        ]);
        let cel = variable_to_cel(&original).unwrap();
        let back = cel_to_variable(&cel).unwrap();
        assert_eq!(original, back);
    }

    #[test]
    fn binary_is_unrepresentable() {
        use comlink_variables::BinaryData;

        #[derive(Debug)]
        struct Empty;
        #[async_trait::async_trait]
        impl BinaryData for Empty {
            async fn initialize(&self) -> Result<(), comlink_variables::BinaryDataError> {
                Ok(())
            }
            async fn destroy(&self) -> Result<(), comlink_variables::BinaryDataError> {
                Ok(())
            }
            async fn get_all_data(&self) -> Result<Vec<u8>, comlink_variables::BinaryDataError> {
                Ok(vec![])
            }
        }

        let value = Variable::Binary(Arc::new(Empty));
        let err = variable_to_cel(&value).unwrap_err();
        assert!(matches!(err, ConversionError::UnrepresentableInput("binary")));
    }
}
