// SPDX-License-Identifier: MIT OR Apache-2.0
//! The interpreter's driver: statement execution and expression evaluation.
//!
//! Every suspension point named in the map language — a `JessieExpression`,
//! an `HttpCallStatement`, an `InlineCall`/`CallStatement` dispatch, the
//! `unhandled-http` hook — is an ordinary `.await`. The few genuinely
//! self-recursive call sites (`eval_expr` evaluating a nested `InlineCall`,
//! `run_statements` recursing into a called operation's body) box their own
//! future so the recursion compiles; nothing here hand-rolls suspend/resume
//! tokens on top of what `async fn` already provides.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use comlink_error::{AstPath, CoreError, PathSegment};
use comlink_sandbox::Sandbox;
use comlink_variables::{Variable, get_path, merge, set_path};
use tracing::debug;

use crate::ast::{
    Assignment, CallStatement, ConditionAtom, Expr, HttpCallStatement, HttpRequest, InlineCall,
    IterationAtom, MapDefinition, MapDocument, OutcomeStatement, SetStatement, Statement,
};
use crate::collaborators::{
    HttpCallResult, HttpCallSpec, HttpExecutor, UnhandledHttpDecision, UnhandledHttpHook,
};
use crate::outcome::Outcome;
use crate::sync_eval::try_eval_sync;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything the interpreter needs to run a [`MapDefinition`] or
/// [`crate::ast::OperationDefinition`] to completion.
pub struct Interpreter<'a> {
    document: &'a MapDocument,
    sandbox: &'a (dyn Sandbox + 'a),
    sandbox_timeout: Duration,
    http: &'a (dyn HttpExecutor + 'a),
    unhandled_http: &'a (dyn UnhandledHttpHook + 'a),
    input: Variable,
    parameters: Variable,
}

impl<'a> Interpreter<'a> {
    /// Construct an interpreter bound to a single `{input, parameters}` run.
    #[must_use]
    pub fn new(
        document: &'a MapDocument,
        sandbox: &'a (dyn Sandbox + 'a),
        sandbox_timeout: Duration,
        http: &'a (dyn HttpExecutor + 'a),
        unhandled_http: &'a (dyn UnhandledHttpHook + 'a),
        input: Variable,
        parameters: Variable,
    ) -> Self {
        Interpreter {
            document,
            sandbox,
            sandbox_timeout,
            http,
            unhandled_http,
            input,
            parameters,
        }
    }

    /// Run `map`'s statements to completion and resolve the final value or
    /// error (spec §4.1's map-level contract).
    pub async fn run_to_completion(&self, map: &MapDefinition) -> Result<Variable, CoreError> {
        debug!(target: "comlink_interpreter.driver", map = %map.name, "running map definition");
        let root = AstPath::root().push(PathSegment::Operation(map.name.clone()));
        let stack = Variable::from_iter([
            ("input".to_string(), self.input.clone()),
            ("parameters".to_string(), self.parameters.clone()),
        ]);
        let (_, outcome, _) = self.run_statements(&map.statements, stack, root).await?;
        match outcome {
            Outcome::Data(value) => Ok(value),
            Outcome::Error {
                value,
                from_http: true,
                status_code,
                ..
            } => Err(CoreError::MappedHttp {
                status_code: status_code.unwrap_or(0),
                properties: variable_to_json(&value),
            }),
            Outcome::Error { value, .. } => Err(CoreError::Mapped {
                properties: variable_to_json(&value),
            }),
        }
    }

    /// Scope a `JessieExpression` is evaluated against: the current stack
    /// augmented with `input`/`parameters` (spec §4.1).
    fn scope_for(&self, stack: &Variable) -> Variable {
        comlink_sandbox::build_scope(stack, &self.input, &self.parameters)
    }

    fn eval_expr<'s>(
        &'s self,
        expr: &'s Expr,
        stack: &'s Variable,
        path: AstPath,
    ) -> BoxFuture<'s, Result<Variable, CoreError>> {
        Box::pin(async move {
            if let Some(value) = try_eval_sync(expr, stack)? {
                return Ok(value);
            }
            match expr {
                Expr::PrimitiveLiteral(_) => {
                    unreachable!("try_eval_sync fully evaluates PrimitiveLiteral")
                }
                Expr::ObjectLiteral { fields } => self.eval_assignments(fields, stack, path).await,
                Expr::Jessie {
                    source,
                    source_location,
                } => {
                    let scope = self.scope_for(stack);
                    self.sandbox
                        .eval_script(source, &scope, self.sandbox_timeout)
                        .await
                        .map_err(|e| CoreError::Jessie {
                            message: e.to_string(),
                            ast_path: path,
                            source_location: *source_location,
                        })
                }
                Expr::InlineCall(call) => self.run_inline_call(call, stack, path).await,
            }
        })
    }

    /// Evaluate a set of `path = value` assignments against `stack` and
    /// merge their results in declaration order into one mapping.
    async fn eval_assignments(
        &self,
        assignments: &[Assignment],
        stack: &Variable,
        path: AstPath,
    ) -> Result<Variable, CoreError> {
        let mut result = Variable::empty_object();
        for (i, assignment) in assignments.iter().enumerate() {
            let value = self
                .eval_expr(
                    &assignment.value,
                    stack,
                    path.clone().push(PathSegment::Index(i)),
                )
                .await?;
            let refs: Vec<&str> = assignment.path.iter().map(String::as_str).collect();
            result = merge(&result, &set_path(&refs, value));
        }
        Ok(result)
    }

    async fn eval_condition(
        &self,
        condition: &Option<ConditionAtom>,
        stack: &Variable,
        path: AstPath,
    ) -> Result<bool, CoreError> {
        match condition {
            None => Ok(true),
            Some(cond) => Ok(self
                .eval_expr(&cond.expr, stack, path.push(PathSegment::Field("condition")))
                .await?
                .truthy()),
        }
    }

    /// Resolve an `InlineCall`/`CallStatement`'s iteration source into the
    /// list of passes to run: a single unit pass with no iteration atom, or
    /// one pass per element of the iterated array.
    async fn iteration_passes(
        &self,
        iteration: &Option<IterationAtom>,
        stack: &Variable,
        path: AstPath,
    ) -> Result<Vec<Variable>, CoreError> {
        match iteration {
            None => Ok(vec![Variable::None]),
            Some(atom) => {
                let value = self
                    .eval_expr(&atom.expr, stack, path.clone().push(PathSegment::Field("iteration")))
                    .await?;
                match value {
                    Variable::Array(items) => Ok(items),
                    other => Err(CoreError::MapAst {
                        message: format!(
                            "iteration source is not an array: {}",
                            other.type_name()
                        ),
                        ast_path: path,
                        source_location: None,
                    }),
                }
            }
        }
    }

    fn pass_stack(&self, stack: &Variable, iteration: &Option<IterationAtom>, value: Variable) -> Variable {
        match iteration {
            None => stack.clone(),
            Some(atom) => merge(
                stack,
                &set_path(&[atom.iteration_variable.as_str()], value),
            ),
        }
    }

    /// `InlineCall` used in expression position: returns the called
    /// operation's data value directly (an array of results when iterated),
    /// and treats an error outcome from the callee as fatal (spec §4.1 — an
    /// inline call cannot observe or recover from the callee's error).
    fn run_inline_call<'s>(
        &'s self,
        call: &'s InlineCall,
        stack: &'s Variable,
        path: AstPath,
    ) -> BoxFuture<'s, Result<Variable, CoreError>> {
        Box::pin(async move {
            let op = self.lookup_operation(&call.operation_name, &path)?;
            let passes = self
                .iteration_passes(&call.iteration, stack, path.clone())
                .await?;
            let iterated = call.iteration.is_some();

            let mut results = Vec::with_capacity(passes.len());
            for (i, iter_value) in passes.into_iter().enumerate() {
                let pass_path = path.clone().push(PathSegment::Index(i));
                let pass_stack = self.pass_stack(stack, &call.iteration, iter_value);

                if !self
                    .eval_condition(&call.condition, &pass_stack, pass_path.clone())
                    .await?
                {
                    continue;
                }

                let args = self
                    .eval_assignments(
                        &call.arguments,
                        &pass_stack,
                        pass_path.clone().push(PathSegment::Field("arguments")),
                    )
                    .await?;
                let call_stack = Variable::from_iter([("args".to_string(), args)]);
                let op_path = pass_path.push(PathSegment::Operation(op.name.clone()));
                let (_, outcome, _) = self.run_statements(&op.statements, call_stack, op_path.clone()).await?;

                match outcome {
                    Outcome::Data(value) => results.push(value),
                    Outcome::Error { value, .. } => {
                        return Err(CoreError::Unexpected {
                            message: format!(
                                "inline call to operation '{}' produced an error outcome: {value}",
                                call.operation_name
                            ),
                            ast_path: op_path,
                            source_location: None,
                        });
                    }
                }
            }

            Ok(if iterated {
                Variable::Array(results)
            } else {
                results.into_iter().next().unwrap_or(Variable::None)
            })
        })
    }

    fn lookup_operation<'s>(
        &'s self,
        name: &str,
        path: &AstPath,
    ) -> Result<&'s crate::ast::OperationDefinition, CoreError> {
        self.document.operation(name).ok_or_else(|| CoreError::MapAst {
            message: format!("operation '{name}' is not defined in this map document"),
            ast_path: path.clone(),
            source_location: None,
        })
    }

    /// Run a statement list in order, threading the variable stack through
    /// and merging each statement's outcome (error dominates) until one
    /// statement terminates the definition (spec §4.1).
    fn run_statements<'s>(
        &'s self,
        statements: &'s [Statement],
        stack: Variable,
        path: AstPath,
    ) -> BoxFuture<'s, Result<(Variable, Outcome, bool), CoreError>> {
        Box::pin(async move {
            let mut stack = stack;
            let mut outcome = Outcome::Data(Variable::None);
            for (i, statement) in statements.iter().enumerate() {
                let stmt_path = path.clone().push(PathSegment::Index(i));
                let (new_stack, stmt_outcome, terminate) =
                    self.exec_statement(statement, stack, stmt_path).await?;
                stack = new_stack;
                if let Some(o) = stmt_outcome {
                    outcome = outcome.merge(o);
                }
                if terminate {
                    return Ok((stack, outcome, true));
                }
            }
            Ok((stack, outcome, false))
        })
    }

    fn exec_statement<'s>(
        &'s self,
        statement: &'s Statement,
        stack: Variable,
        path: AstPath,
    ) -> BoxFuture<'s, Result<(Variable, Option<Outcome>, bool), CoreError>> {
        Box::pin(async move {
            match statement {
                Statement::Set(set) => self.exec_set(set, stack, path).await,
                Statement::Outcome(outcome) => self.exec_outcome(outcome, stack, path).await,
                Statement::Call(call) => self.exec_call_statement(call, stack, path).await,
                Statement::HttpCall(http_call) => self.exec_http_call(http_call, stack, path).await,
            }
        })
    }

    async fn exec_set(
        &self,
        set: &SetStatement,
        mut stack: Variable,
        path: AstPath,
    ) -> Result<(Variable, Option<Outcome>, bool), CoreError> {
        if !self.eval_condition(&set.condition, &stack, path.clone()).await? {
            return Ok((stack, None, false));
        }
        for (i, assignment) in set.assignments.iter().enumerate() {
            let value = self
                .eval_expr(&assignment.value, &stack, path.clone().push(PathSegment::Index(i)))
                .await?;
            let refs: Vec<&str> = assignment.path.iter().map(String::as_str).collect();
            stack = merge(&stack, &set_path(&refs, value));
        }
        Ok((stack, None, false))
    }

    async fn exec_outcome(
        &self,
        stmt: &OutcomeStatement,
        stack: Variable,
        path: AstPath,
    ) -> Result<(Variable, Option<Outcome>, bool), CoreError> {
        if !self.eval_condition(&stmt.condition, &stack, path.clone()).await? {
            return Ok((stack, None, false));
        }
        let value = self
            .eval_expr(&stmt.value, &stack, path.clone().push(PathSegment::Field("value")))
            .await?;
        let outcome = if stmt.is_error {
            Outcome::Error {
                value,
                source_path: path,
                from_http: false,
                status_code: None,
            }
        } else {
            Outcome::Data(value)
        };
        Ok((stack, Some(outcome), true))
    }

    /// `CallStatement` (statement-position call): each pass runs the callee,
    /// binds `{outcome: {data?, error?}}` on the stack, then runs the
    /// follow-up statements against that augmented stack. An error from the
    /// callee breaks the iteration loop early (spec §4.1) but, unlike
    /// [`Self::run_inline_call`], is not itself fatal — the follow-up
    /// statements decide what to do with it.
    async fn exec_call_statement(
        &self,
        call_stmt: &CallStatement,
        stack: Variable,
        path: AstPath,
    ) -> Result<(Variable, Option<Outcome>, bool), CoreError> {
        let call = &call_stmt.call;
        let op = self.lookup_operation(&call.operation_name, &path)?;
        let passes = self
            .iteration_passes(&call.iteration, &stack, path.clone())
            .await?;

        let mut stack = stack;
        let mut combined_outcome: Option<Outcome> = None;
        let mut terminate = false;

        for (i, iter_value) in passes.into_iter().enumerate() {
            let pass_path = path.clone().push(PathSegment::Index(i));
            let pass_stack = self.pass_stack(&stack, &call.iteration, iter_value);

            if !self
                .eval_condition(&call.condition, &pass_stack, pass_path.clone())
                .await?
            {
                continue;
            }

            let args = self
                .eval_assignments(
                    &call.arguments,
                    &pass_stack,
                    pass_path.clone().push(PathSegment::Field("arguments")),
                )
                .await?;
            let call_stack = Variable::from_iter([("args".to_string(), args)]);
            let op_path = pass_path.clone().push(PathSegment::Operation(op.name.clone()));
            let (_, call_outcome, _) = self
                .run_statements(&op.statements, call_stack, op_path)
                .await?;

            let follow_up_stack = merge(
                &pass_stack,
                &Variable::from_iter([("outcome".to_string(), outcome_binding(&call_outcome))]),
            );
            let follow_up_path = pass_path.push(PathSegment::Field("followUp"));
            let (new_stack, fu_outcome, fu_terminate) = self
                .run_statements(&call_stmt.follow_up, follow_up_stack, follow_up_path)
                .await?;

            stack = new_stack;
            combined_outcome = Some(match combined_outcome {
                Some(prev) => prev.merge(fu_outcome),
                None => fu_outcome,
            });
            if fu_terminate {
                terminate = true;
            }
            if call_outcome.is_error() {
                break;
            }
        }

        Ok((stack, combined_outcome, terminate))
    }

    /// `HttpCallStatement`: build the request, issue it, try response
    /// handlers in order, and fall back to the `unhandled-http` hook (or the
    /// default status-based rule) when none matched (spec §4.1).
    async fn exec_http_call(
        &self,
        http_call: &HttpCallStatement,
        stack: Variable,
        path: AstPath,
    ) -> Result<(Variable, Option<Outcome>, bool), CoreError> {
        let accept = compute_accept(http_call);

        loop {
            let spec = self.build_http_spec(http_call, &stack, &accept, path.clone()).await?;
            debug!(
                target: "comlink_interpreter.driver",
                service = %spec.service_id, method = %spec.method, url = %spec.url,
                "issuing http call"
            );
            let result = self.http.execute(spec).await?;
            let response_stack = response_scope(&stack, &result);

            let mut matched_index = None;
            for (i, handler) in http_call.response_handlers.iter().enumerate() {
                if handler_matches(handler, &result) {
                    matched_index = Some(i);
                    break;
                }
            }

            if let Some(i) = matched_index {
                let handler = &http_call.response_handlers[i];
                let handler_path = path
                    .clone()
                    .push(PathSegment::Field("responseHandlers"))
                    .push(PathSegment::Index(i));
                let (_, outcome, terminate) = self
                    .run_statements(&handler.statements, response_stack, handler_path)
                    .await?;
                return Ok((
                    stack,
                    Some(outcome.mark_from_http(result.status_code)),
                    terminate,
                ));
            }

            let decision = self.unhandled_http.decide(&result).await;
            match decision {
                Some(UnhandledHttpDecision::Retry) => continue,
                Some(UnhandledHttpDecision::Continue) | None => {
                    if result.status_code >= 400 {
                        return Err(CoreError::Http {
                            status_code: result.status_code,
                            request_debug: result.request_debug,
                            response_body: Some(result.body.to_string()),
                        });
                    }
                    return Ok((stack, None, false));
                }
            }
        }
    }

    async fn build_http_spec(
        &self,
        http_call: &HttpCallStatement,
        stack: &Variable,
        accept: &str,
        path: AstPath,
    ) -> Result<HttpCallSpec, CoreError> {
        let empty_request = HttpRequest::default();
        let request = http_call.request.as_ref().unwrap_or(&empty_request);

        let headers = self
            .eval_assignments(&request.headers, stack, path.clone().push(PathSegment::Field("headers")))
            .await?;
        let query = self
            .eval_assignments(&request.query, stack, path.clone().push(PathSegment::Field("query")))
            .await?;
        let body = match &request.body {
            Some(expr) => Some(
                self.eval_expr(expr, stack, path.push(PathSegment::Field("body")))
                    .await?,
            ),
            None => None,
        };

        Ok(HttpCallSpec {
            service_id: http_call.service_id.clone(),
            method: http_call.method.clone(),
            url: http_call.url.clone(),
            security: http_call.security.clone(),
            headers: object_fields(headers),
            query: object_fields(query),
            body,
            content_type: request.content_type.clone(),
            content_language: request.content_language.clone(),
            accept: accept.to_string(),
            scope: stack.clone(),
        })
    }
}

fn object_fields(value: Variable) -> BTreeMap<String, Variable> {
    match value {
        Variable::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}

fn outcome_binding(outcome: &Outcome) -> Variable {
    match outcome {
        Outcome::Data(value) => Variable::from_iter([("data".to_string(), value.clone())]),
        Outcome::Error { value, .. } => Variable::from_iter([("error".to_string(), value.clone())]),
    }
}

fn response_scope(stack: &Variable, result: &HttpCallResult) -> Variable {
    let headers = Variable::Object(
        result
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Variable::String(v.clone())))
            .collect(),
    );
    merge(
        stack,
        &Variable::from_iter([
            ("statusCode".to_string(), Variable::Number(f64::from(result.status_code))),
            ("headers".to_string(), headers),
            ("body".to_string(), result.body.clone()),
        ]),
    )
}

fn handler_matches(handler: &crate::ast::HttpResponseHandler, result: &HttpCallResult) -> bool {
    if let Some(status) = handler.status_code {
        if status != result.status_code {
            return false;
        }
    }
    if let Some(content_type) = &handler.content_type {
        let header = result
            .headers
            .get("content-type")
            .map(String::as_str)
            .unwrap_or("");
        if !header.contains(content_type.as_str()) {
            return false;
        }
    }
    if let Some(content_language) = &handler.content_language {
        let header = result
            .headers
            .get("content-language")
            .map(String::as_str)
            .unwrap_or("");
        if !header.contains(content_language.as_str()) {
            return false;
        }
    }
    true
}

/// `Accept` header computed from the declared response handlers: `*/*` if
/// any handler omits its content type, otherwise a deduplicated comma-joined
/// list of the declared content types.
fn compute_accept(http_call: &HttpCallStatement) -> String {
    let mut types = Vec::new();
    for handler in &http_call.response_handlers {
        match &handler.content_type {
            None => return "*/*".to_string(),
            Some(ct) => {
                if !types.contains(ct) {
                    types.push(ct.clone());
                }
            }
        }
    }
    if types.is_empty() {
        "*/*".to_string()
    } else {
        types.join(", ")
    }
}

fn variable_to_json(value: &Variable) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|_| {
        serde_json::json!({ "value": value.to_string() })
    })
}
