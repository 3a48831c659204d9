// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Restricted expression evaluator backing `JessieExpression` map nodes.
//!
//! The map language embeds small expression snippets (`${...}`-style) that
//! must be evaluated against a scope built from the current variable stack
//! plus `input` and `parameters`, without giving the expression unrestricted
//! host access. [`CelSandbox`] evaluates those snippets as
//! [CEL](https://github.com/google/cel-spec) expressions via `cel-interpreter`
//! — not a byte-for-byte stand-in for the original expression language, but
//! one that satisfies the same contract: bounded, side-effect-free
//! evaluation against an explicit scope.

use std::time::Duration;

use async_trait::async_trait;
use comlink_variables::Variable;

mod convert;

pub use convert::ConversionError;

/// Errors raised while compiling or evaluating a sandboxed expression.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The expression source failed to parse.
    #[error("failed to parse expression: {0}")]
    Parse(String),
    /// The expression parsed but failed during evaluation (missing
    /// variable, type mismatch, division by zero, etc).
    #[error("failed to evaluate expression: {0}")]
    Execution(String),
    /// A scope value could not be represented in the expression language,
    /// or a result value could not be converted back to a [`Variable`].
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// Evaluation did not complete within `sandboxTimeout`.
    #[error("expression evaluation exceeded the sandbox timeout")]
    Timeout,
    /// The sandbox's worker task could not be joined (it panicked).
    #[error("sandbox worker task failed: {0}")]
    WorkerFailed(String),
}

/// A restricted expression evaluator: `evalScript(src, scope) -> value`.
///
/// Implementations must never give the expression access to anything beyond
/// `scope` — no filesystem, network, or process access.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Evaluate `source` against `scope`, returning the resulting value.
    async fn eval_script(
        &self,
        source: &str,
        scope: &Variable,
        timeout: Duration,
    ) -> Result<Variable, SandboxError>;
}

/// [`Sandbox`] implementation backed by `cel-interpreter`.
///
/// Each call compiles `source` fresh (map expressions are short and
/// compilation is cheap relative to the surrounding HTTP round trip) and
/// runs it on a blocking worker thread so a pathological expression cannot
/// stall the async runtime; the caller's `timeout` bounds how long the
/// driver waits for that worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct CelSandbox;

impl CelSandbox {
    /// Construct a new CEL-backed sandbox.
    #[must_use]
    pub fn new() -> Self {
        CelSandbox
    }
}

#[async_trait]
impl Sandbox for CelSandbox {
    async fn eval_script(
        &self,
        source: &str,
        scope: &Variable,
        timeout: Duration,
    ) -> Result<Variable, SandboxError> {
        let source = source.to_string();
        let scope = scope.clone();

        let handle = tokio::task::spawn_blocking(move || evaluate_sync(&source, &scope));

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(SandboxError::WorkerFailed(join_err.to_string())),
            Err(_elapsed) => Err(SandboxError::Timeout),
        }
    }
}

fn evaluate_sync(source: &str, scope: &Variable) -> Result<Variable, SandboxError> {
    use cel_interpreter::{Context, Program};

    let program = Program::compile(source).map_err(|e| SandboxError::Parse(e.to_string()))?;

    let mut context = Context::default();
    let Variable::Object(fields) = scope else {
        return Err(SandboxError::Execution(
            "expression scope must be an object mapping names to values".to_string(),
        ));
    };
    for (name, value) in fields {
        let cel_value = convert::variable_to_cel(value)?;
        context
            .add_variable_from_value(name.clone(), cel_value);
    }

    let result = program
        .execute(&context)
        .map_err(|e| SandboxError::Execution(e.to_string()))?;
    Ok(convert::cel_to_variable(&result)?)
}

/// Build the scope object a `JessieExpression` is evaluated against: the
/// current variable stack, augmented with `input` and `parameters` (spec
/// §4.1).
#[must_use]
pub fn build_scope(stack: &Variable, input: &Variable, parameters: &Variable) -> Variable {
    comlink_variables::merge(
        stack,
        &Variable::from_iter([
            ("input".to_string(), input.clone()),
            ("parameters".to_string(), parameters.clone()),
        ]),
    )
}
