// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hand-written `Serialize`/`Deserialize` for [`crate::Variable`].
//!
//! [`crate::Variable::Binary`] has no wire representation: serializing one
//! fails with a serializer-level custom error (spec §3 — binary data is a
//! runtime handle, not wire data) instead of panicking, and it is never
//! produced during deserialization.

use crate::Variable;
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

impl Serialize for Variable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Variable::None => serializer.serialize_none(),
            Variable::Bool(b) => serializer.serialize_bool(*b),
            Variable::Number(n) => serializer.serialize_f64(*n),
            Variable::String(s) => serializer.serialize_str(s),
            Variable::Bytes(b) => {
                let mut seq = serializer.serialize_seq(Some(b.len()))?;
                for byte in b {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
            Variable::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Variable::Object(map) => {
                let mut ser_map = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    ser_map.serialize_entry(k, v)?;
                }
                ser_map.end()
            }
            Variable::Binary(_) => Err(serde::ser::Error::custom(
                "cannot serialize a live binary data handle",
            )),
        }
    }
}

struct VariableVisitor;

impl<'de> Visitor<'de> for VariableVisitor {
    type Value = Variable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a Comlink variable (null, bool, number, string, array, or object)")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(Variable::None)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(Variable::None)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Variable::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Variable::Number(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Variable::Number(v as f64))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Variable::Number(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Variable::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
        Ok(Variable::String(v))
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Variable::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Variable>()? {
            items.push(item);
        }
        Ok(Variable::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut result = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, Variable>()? {
            result.insert(key, value);
        }
        Ok(Variable::Object(result))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(Variable::Bytes(v.to_vec()))
    }
}

impl<'de> Deserialize<'de> for Variable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(VariableVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_object() {
        let v: Variable = serde_json::from_str(r#"{"a":1,"b":[true,null,"x"]}"#).unwrap();
        let back = serde_json::to_string(&v).unwrap();
        let reparsed: Variable = serde_json::from_str(&back).unwrap();
        assert_eq!(v, reparsed);
    }

    #[test]
    fn binary_fails_to_serialize() {
        use crate::binary::test_support::InMemoryBinary;
        use std::sync::Arc;
        let v = Variable::Binary(Arc::new(InMemoryBinary::new(vec![1, 2, 3])));
        let err = serde_json::to_string(&v).unwrap_err();
        assert!(err.to_string().contains("binary data handle"));
    }

    #[test]
    fn numbers_roundtrip_as_f64() {
        let v: Variable = serde_json::from_str("144").unwrap();
        assert_eq!(v, Variable::Number(144.0));
    }

    #[test]
    fn null_roundtrips_to_none() {
        let v: Variable = serde_json::from_str("null").unwrap();
        assert_eq!(v, Variable::None);
    }
}
