// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synchronous evaluation for the subset of [`Expr`] that can never suspend.
//!
//! `PrimitiveLiteral` and `ObjectLiteral`/`Assignment` subtrees that bottom
//! out in literals have no suspension point (no sandbox call, no HTTP call,
//! no sub-operation dispatch) and so need no `Visitor` frame — they are
//! evaluated with plain recursion, same as any other pure tree-shaped data.
//! [`try_eval_sync`] returns `None` the moment it finds a node that does
//! need a frame, signalling the caller to fall back to the async
//! [`crate::driver`] path for that whole expression.

use crate::ast::{Assignment, Expr};
use comlink_error::CoreError;
use comlink_variables::{Variable, merge, set_path};

/// Evaluate `expr` against `stack` if it contains no suspension point.
///
/// Returns `Ok(None)` (not an error) when `expr` contains a
/// `JessieExpression` or `InlineCall` anywhere in its subtree — the caller
/// must drive that expression through the visitor stack instead.
pub fn try_eval_sync(expr: &Expr, stack: &Variable) -> Result<Option<Variable>, CoreError> {
    match expr {
        Expr::PrimitiveLiteral(json) => Ok(Some(json_to_variable(json))),
        Expr::ObjectLiteral { fields } => try_eval_assignments_sync(fields, stack),
        Expr::Jessie { .. } | Expr::InlineCall(_) => Ok(None),
    }
}

fn try_eval_assignments_sync(
    assignments: &[Assignment],
    stack: &Variable,
) -> Result<Option<Variable>, CoreError> {
    let mut result = Variable::empty_object();
    for assignment in assignments {
        let Some(value) = try_eval_sync(&assignment.value, stack)? else {
            return Ok(None);
        };
        let path_refs: Vec<&str> = assignment.path.iter().map(String::as_str).collect();
        result = merge(&result, &set_path(&path_refs, value));
    }
    Ok(Some(result))
}

fn json_to_variable(value: &serde_json::Value) -> Variable {
    match value {
        serde_json::Value::Null => Variable::None,
        serde_json::Value::Bool(b) => Variable::Bool(*b),
        serde_json::Value::Number(n) => Variable::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Variable::String(s.clone()),
        serde_json::Value::Array(items) => {
            Variable::Array(items.iter().map(json_to_variable).collect())
        }
        serde_json::Value::Object(fields) => Variable::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), json_to_variable(v)))
                .collect(),
        ),
    }
}
