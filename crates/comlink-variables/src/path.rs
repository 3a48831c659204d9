// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dotted-key-path indexing and construction for [`crate::Variable`] trees.

use crate::Variable;
use std::collections::BTreeMap;

/// Look up a nested value by key path, e.g. `["a", "b"]` reads `value.a.b`.
///
/// Returns `None` if any intermediate segment is missing or is not an
/// object.
#[must_use]
pub fn get_path<'v>(value: &'v Variable, path: &[&str]) -> Option<&'v Variable> {
    let mut current = value;
    for segment in path {
        match current {
            Variable::Object(map) => current = map.get(*segment)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Build a nested mapping whose leaf at `path` is `value`, e.g. `(["a",
/// "b"], v)` produces `{a: {b: v}}`. Used by `Assignment` evaluation (spec
/// §4.1) to turn a dotted-key assignment into an object shape that can be
/// [`merge`](crate::merge)d into the variable stack.
///
/// An empty path returns `value` itself.
#[must_use]
pub fn set_path(path: &[&str], value: Variable) -> Variable {
    match path.split_first() {
        None => value,
        Some((head, rest)) => {
            let mut map = BTreeMap::new();
            map.insert((*head).to_string(), set_path(rest, value));
            Variable::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_path_builds_nested_object() {
        let v = set_path(&["a", "b"], Variable::Number(12.0));
        assert_eq!(get_path(&v, &["a", "b"]), Some(&Variable::Number(12.0)));
    }

    #[test]
    fn set_path_empty_returns_value() {
        let v = set_path(&[], Variable::String("x".into()));
        assert_eq!(v, Variable::String("x".into()));
    }

    #[test]
    fn get_path_missing_segment_is_none() {
        let v = set_path(&["a"], Variable::Number(1.0));
        assert_eq!(get_path(&v, &["a", "b"]), None);
        assert_eq!(get_path(&v, &["z"]), None);
    }

    #[test]
    fn get_path_through_non_object_is_none() {
        let v = Variable::Number(1.0);
        assert_eq!(get_path(&v, &["a"]), None);
    }
}
