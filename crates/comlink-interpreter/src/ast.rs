// SPDX-License-Identifier: MIT OR Apache-2.0
//! Map AST node types.
//!
//! Tagged sum types over inheritance (per the runtime's design direction):
//! every node kind is a variant of [`MapNode`] rather than a class in an
//! inheritance hierarchy, and the driver dispatches by `match`.

use comlink_error::SourceLocation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dotted key path, e.g. `["a", "b"]` for `a.b`.
pub type KeyPath = Vec<String>;

/// Top-level document: a flat table of named operations plus the profile's
/// entry map definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDocument {
    /// Entry points, one per use-case, keyed by use-case name.
    pub maps: BTreeMap<String, MapDefinition>,
    /// Named operations callable from any map or from other operations.
    pub operations: BTreeMap<String, OperationDefinition>,
}

impl MapDocument {
    /// Look up a named operation, or `None` if it isn't defined.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.operations.get(name)
    }
}

/// A use-case's entry point: a sequence of statements executed against
/// `{input, parameters}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Use-case name this map implements.
    pub name: String,
    /// Statements executed in order.
    pub statements: Vec<Statement>,
}

/// A named, callable operation body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDefinition {
    /// Operation name, used for lookup from [`MapDocument::operation`].
    pub name: String,
    /// Statements executed in order.
    pub statements: Vec<Statement>,
}

/// Any statement that can appear in a map or operation body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Statement {
    /// `set` — conditionally assign one or more dotted paths.
    Set(SetStatement),
    /// A bare named-operation call used for its side effects (HTTP, nested
    /// operations), with optional follow-up statements keyed on outcome.
    Call(CallStatement),
    /// An HTTP request plus its response handlers.
    HttpCall(HttpCallStatement),
    /// `map result` / `map error` — terminate the enclosing definition.
    Outcome(OutcomeStatement),
}

/// `set` statement: conditionally merge assignments into the stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatement {
    /// Optional guard; statement is a no-op when this evaluates falsy.
    pub condition: Option<ConditionAtom>,
    /// Assignments applied in declaration order.
    pub assignments: Vec<Assignment>,
    /// Location in the original map source, for diagnostics only.
    pub source_location: Option<SourceLocation>,
}

/// A single `path = value` assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Dotted key path the value is assigned to.
    pub path: KeyPath,
    /// Expression producing the value.
    pub value: Expr,
}

/// A condition guard, evaluated and coerced to boolean via
/// [`comlink_variables::Variable::truthy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionAtom {
    /// The guard expression.
    pub expr: Box<Expr>,
}

/// An iteration source: `foreach x of <expr>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationAtom {
    /// Name bound to each element while iterating.
    pub iteration_variable: String,
    /// Expression producing an array to iterate.
    pub expr: Box<Expr>,
}

/// Any value-producing expression node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    /// A literal scalar, array, or object built entirely from other
    /// expressions (no HTTP/sandbox involvement).
    PrimitiveLiteral(serde_json::Value),
    /// `{ field: expr, ... }` — merges each field assignment into one
    /// mapping.
    ObjectLiteral {
        /// Field assignments, applied in order (later fields win on
        /// overlapping dotted paths).
        fields: Vec<Assignment>,
    },
    /// A sandboxed expression snippet (`${...}`), evaluated against the
    /// current stack plus `input`/`parameters`.
    Jessie {
        /// Source text handed to the sandbox verbatim.
        source: String,
        /// Location in the original map source, for diagnostics only.
        source_location: Option<SourceLocation>,
    },
    /// An inline (expression-position) call to a named operation.
    InlineCall(InlineCall),
}

/// An inline or statement-position call to a named operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineCall {
    /// Name of the operation to invoke.
    pub operation_name: String,
    /// Optional iteration driving repeated invocation.
    pub iteration: Option<IterationAtom>,
    /// Optional guard; call is skipped (per iteration pass) when falsy.
    pub condition: Option<ConditionAtom>,
    /// Assignments merged into a fresh `args` mapping passed to the
    /// operation.
    pub arguments: Vec<Assignment>,
}

/// A statement-position call: same call shape as [`InlineCall`], plus
/// follow-up statements that observe `{data?, error?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStatement {
    /// The call itself.
    pub call: InlineCall,
    /// Statements run after the call completes, with `outcome` bound on the
    /// stack.
    pub follow_up: Vec<Statement>,
}

/// `call <service> <method> <url>` plus response handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCallStatement {
    /// Name of the service (resolved to a base URL via the service
    /// selector).
    pub service_id: String,
    /// HTTP method.
    pub method: String,
    /// URL path, possibly containing `{name}` path templates.
    pub url: String,
    /// Optional security requirement id declared on the profile/provider.
    pub security: Option<String>,
    /// Request headers/query/body/content-type.
    pub request: Option<HttpRequest>,
    /// Response handlers, tried in declaration order.
    pub response_handlers: Vec<HttpResponseHandler>,
}

/// Request-shaping sub-node of an [`HttpCallStatement`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Header name/value expressions.
    pub headers: Vec<Assignment>,
    /// Query parameter name/value expressions.
    pub query: Vec<Assignment>,
    /// Request body expression, if any.
    pub body: Option<Expr>,
    /// `Content-Type` of the outgoing body.
    pub content_type: Option<String>,
    /// `Content-Language` of the outgoing body.
    pub content_language: Option<String>,
}

/// A single `response <statusCode>? <contentType>? { ... }` handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponseHandler {
    /// Status code this handler matches, or `None` to match any.
    pub status_code: Option<u16>,
    /// Substring the `content-type` response header must contain to match.
    pub content_type: Option<String>,
    /// Substring the `content-language` response header must contain to
    /// match.
    pub content_language: Option<String>,
    /// Statements run when this handler matches.
    pub statements: Vec<Statement>,
}

/// `map result <expr>` / `map error <expr>` — terminates the enclosing
/// definition with a data or error outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeStatement {
    /// Optional guard; statement is a no-op when this evaluates falsy.
    pub condition: Option<ConditionAtom>,
    /// Value expression for the outcome.
    pub value: Expr,
    /// `true` for `map error`, `false` for `map result`.
    pub is_error: bool,
    /// Location in the original map source, for diagnostics only.
    pub source_location: Option<SourceLocation>,
}
