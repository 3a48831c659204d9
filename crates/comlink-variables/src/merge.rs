// SPDX-License-Identifier: MIT OR Apache-2.0
//! Right-biased recursive merge of two [`crate::Variable`] trees.

use crate::Variable;

/// Merge `base` and `overlay`, with `overlay` winning on conflicts.
///
/// Two [`Variable::Object`] mappings are merged key-by-key, recursing into
/// keys present in both. Any other pairing (primitive vs. primitive,
/// primitive vs. object, array vs. anything) replaces `base` wholesale with
/// `overlay` — arrays are primitive values, never merged element-wise (spec
/// §3). This makes `merge` associative: `merge(merge(a, b), c) ==
/// merge(a, merge(b, c))`, because later layers always win regardless of how
/// the chain is grouped.
#[must_use]
pub fn merge(base: &Variable, overlay: &Variable) -> Variable {
    match (base, overlay) {
        (Variable::Object(base_map), Variable::Object(overlay_map)) => {
            let mut result = base_map.clone();
            for (key, overlay_value) in overlay_map {
                match result.get(key) {
                    Some(base_value) => {
                        let merged = merge(base_value, overlay_value);
                        result.insert(key.clone(), merged);
                    }
                    None => {
                        result.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
            Variable::Object(result)
        }
        _ => overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn obj(pairs: &[(&str, Variable)]) -> Variable {
        Variable::Object(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn primitives_replace_wholesale() {
        let a = Variable::Number(1.0);
        let b = Variable::String("x".into());
        assert_eq!(merge(&a, &b), b);
    }

    #[test]
    fn arrays_are_primitive_not_merged() {
        let a = Variable::Array(vec![Variable::Number(1.0)]);
        let b = Variable::Array(vec![Variable::Number(2.0), Variable::Number(3.0)]);
        assert_eq!(merge(&a, &b), b);
    }

    #[test]
    fn objects_merge_recursively_right_biased() {
        let a = obj(&[("a", Variable::Number(1.0)), ("b", obj(&[("x", Variable::Number(1.0))]))]);
        let b = obj(&[("b", obj(&[("y", Variable::Number(2.0))])), ("c", Variable::Number(3.0))]);

        let merged = merge(&a, &b);
        let Variable::Object(map) = merged else { panic!("expected object") };
        assert_eq!(map.get("a"), Some(&Variable::Number(1.0)));
        assert_eq!(map.get("c"), Some(&Variable::Number(3.0)));
        let Some(Variable::Object(b_map)) = map.get("b") else { panic!("expected nested object") };
        assert_eq!(b_map.get("x"), Some(&Variable::Number(1.0)));
        assert_eq!(b_map.get("y"), Some(&Variable::Number(2.0)));
    }

    #[test]
    fn right_biased_leaf_overwrite() {
        let a = obj(&[("a", Variable::Number(1.0))]);
        let b = obj(&[("a", Variable::Number(2.0))]);
        let merged = merge(&a, &b);
        assert_eq!(merged, obj(&[("a", Variable::Number(2.0))]));
    }

    #[test]
    fn merge_is_associative_for_fixed_examples() {
        let a = obj(&[("a", Variable::Number(1.0))]);
        let b = obj(&[("a", Variable::Number(2.0)), ("b", Variable::Bool(true))]);
        let c = obj(&[("b", Variable::Bool(false)), ("c", Variable::String("z".into()))]);

        let left = merge(&merge(&a, &b), &c);
        let right = merge(&a, &merge(&b, &c));
        assert_eq!(left, right);
    }

    #[test]
    fn merge_empty_maps_is_identity() {
        let a = obj(&[("a", Variable::Number(1.0))]);
        let empty = Variable::Object(BTreeMap::new());
        assert_eq!(merge(&a, &empty), a);
    }

    proptest::proptest! {
        #[test]
        fn prop_merge_is_associative(
            a in arb_variable(2),
            b in arb_variable(2),
            c in arb_variable(2),
        ) {
            let left = merge(&merge(&a, &b), &c);
            let right = merge(&a, &merge(&b, &c));
            proptest::prop_assert_eq!(left, right);
        }
    }

    fn arb_variable(depth: u32) -> impl proptest::strategy::Strategy<Value = Variable> {
        use proptest::prelude::*;
        let leaf = prop_oneof![
            Just(Variable::None),
            any::<bool>().prop_map(Variable::Bool),
            any::<i16>().prop_map(|n| Variable::Number(n as f64)),
            "[a-z]{0,4}".prop_map(Variable::String),
        ];
        if depth == 0 {
            leaf.boxed()
        } else {
            let inner = arb_variable(depth - 1);
            prop_oneof![
                leaf,
                proptest::collection::btree_map("[a-c]", inner, 0..3)
                    .prop_map(Variable::Object),
            ]
            .boxed()
        }
    }
}
