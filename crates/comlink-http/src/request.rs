// SPDX-License-Identifier: MIT OR Apache-2.0
//! Request construction: path templating, content-type body serialization,
//! and header/query coercion (spec §4.2).

use std::collections::BTreeMap;

use async_trait::async_trait;
use comlink_error::{AstPath, CoreError};
use comlink_variables::Variable;

/// Injected collaborator resolving a service id to its base URL.
///
/// Implemented concretely by `comlink-runtime` from the bound provider's
/// declared services.
#[async_trait]
pub trait ServiceSelector: Send + Sync {
    /// Resolve `service_id` to a base URL, or `None` if unconfigured.
    async fn base_url(&self, service_id: &str) -> Option<String>;
}

/// [`ServiceSelector`] backed by a fixed map, for tests and single-service
/// setups.
#[derive(Debug, Default, Clone)]
pub struct StaticServiceSelector {
    by_id: BTreeMap<String, String>,
}

impl StaticServiceSelector {
    /// Construct a selector from `(service_id, base_url)` pairs.
    #[must_use]
    pub fn new(services: impl IntoIterator<Item = (String, String)>) -> Self {
        StaticServiceSelector {
            by_id: services.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ServiceSelector for StaticServiceSelector {
    async fn base_url(&self, service_id: &str) -> Option<String> {
        self.by_id.get(service_id).cloned()
    }
}

/// Maps an [`comlink_variables::VariableError`] to the taxonomy the HTTP
/// engine reports structural request-building defects with.
///
/// The profile-input-validation and result-validation kinds don't apply
/// here (those guard the use-case boundary, not a single HTTP call), and
/// spec §7 does not name a distinct kind for "could not build this
/// request" — it is the same class of defect as an otherwise-malformed map
/// document, so it is reported as [`CoreError::MapAst`].
pub fn scalar_coercion_error(
    ast_path: &AstPath,
    field: &str,
    source: comlink_variables::VariableError,
) -> CoreError {
    CoreError::MapAst {
        message: format!("{field}: {source}"),
        ast_path: ast_path.clone(),
        source_location: None,
    }
}

/// Substitutes `{name}` placeholders in `template` with scalar values
/// looked up (in order) from `scope`, `input`, and `parameters`.
///
/// Only string/number/boolean values may fill a path segment; anything
/// else is a structural error (a map cannot template an object or array
/// into a URL path). Every placeholder in the template is checked before
/// any error is raised, so a template with several unresolved
/// placeholders reports all of them, together with the field names that
/// actually were available, in one pass.
pub fn substitute_path_template(
    template: &str,
    scope: &Variable,
    input: &Variable,
    parameters: &Variable,
    ast_path: &AstPath,
) -> Result<String, CoreError> {
    let placeholders = find_placeholders(template, ast_path)?;

    let missing: Vec<&str> = placeholders
        .iter()
        .map(|p| p.name)
        .filter(|name| lookup_scalar(name, scope, input, parameters).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::MapAst {
            message: format!(
                "path template placeholder(s) {} have no value (available: {})",
                missing
                    .iter()
                    .map(|n| format!("'{{{n}}}'"))
                    .collect::<Vec<_>>()
                    .join(", "),
                available_keys_summary(scope, input, parameters),
            ),
            ast_path: ast_path.clone(),
            source_location: None,
        });
    }

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for placeholder in &placeholders {
        out.push_str(&template[cursor..placeholder.start]);
        let value = lookup_scalar(placeholder.name, scope, input, parameters)
            .expect("checked unresolved above");
        let rendered = value
            .to_scalar_string(placeholder.name)
            .map_err(|e| scalar_coercion_error(ast_path, &format!("path segment '{}'", placeholder.name), e))?;
        out.push_str(&urlencoding_path_segment(&rendered));
        cursor = placeholder.end;
    }
    out.push_str(&template[cursor..]);
    Ok(out)
}

/// A `{name}` span found in a path template: `start`/`end` are byte
/// offsets of the whole `{name}` span (inclusive of the braces).
struct Placeholder<'t> {
    name: &'t str,
    start: usize,
    end: usize,
}

fn find_placeholders<'t>(template: &'t str, ast_path: &AstPath) -> Result<Vec<Placeholder<'t>>, CoreError> {
    let mut placeholders = Vec::new();
    let mut search_from = 0;
    while let Some(rel_open) = template[search_from..].find('{') {
        let open = search_from + rel_open;
        let close = template[open..]
            .find('}')
            .map(|rel| open + rel)
            .ok_or_else(|| CoreError::MapAst {
                message: format!("unterminated path template placeholder in '{template}'"),
                ast_path: ast_path.clone(),
                source_location: None,
            })?;
        placeholders.push(Placeholder {
            name: &template[open + 1..close],
            start: open,
            end: close + 1,
        });
        search_from = close + 1;
    }
    Ok(placeholders)
}

fn available_keys_summary(scope: &Variable, input: &Variable, parameters: &Variable) -> String {
    let mut keys = std::collections::BTreeSet::new();
    for source in [scope, input, parameters] {
        if let Variable::Object(fields) = source {
            keys.extend(fields.keys().cloned());
        }
    }
    if keys.is_empty() {
        "none".to_string()
    } else {
        keys.into_iter().collect::<Vec<_>>().join(", ")
    }
}

fn lookup_scalar<'v>(
    name: &str,
    scope: &'v Variable,
    input: &'v Variable,
    parameters: &'v Variable,
) -> Option<&'v Variable> {
    for source in [scope, input, parameters] {
        if let Variable::Object(fields) = source {
            if let Some(value) = fields.get(name) {
                return Some(value);
            }
        }
    }
    None
}

fn urlencoding_path_segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Joins a base URL and a path, collapsing the redundant slash when the
/// base URL ends with one and the path starts with one.
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if let Some(stripped) = path.strip_prefix('/') {
        format!("{base}/{stripped}")
    } else {
        format!("{base}/{path}")
    }
}

/// Coerces a map of `Variable` header/query values to strings, failing on
/// the first non-scalar value encountered.
pub fn coerce_scalar_map(
    values: &BTreeMap<String, Variable>,
    field: &str,
    ast_path: &AstPath,
) -> Result<BTreeMap<String, String>, CoreError> {
    let mut out = BTreeMap::new();
    for (name, value) in values {
        let rendered = value
            .to_scalar_string(name)
            .map_err(|e| scalar_coercion_error(ast_path, &format!("{field} '{name}'"), e))?;
        out.insert(name.clone(), rendered);
    }
    Ok(out)
}

/// A content-type-serialized request body plus the `Content-Type` header
/// value it requires (when the caller didn't declare one explicitly).
#[derive(Debug)]
pub struct SerializedBody {
    /// Wire bytes to send as the request body.
    pub bytes: Vec<u8>,
    /// `Content-Type` to send, if the body's shape implies a default one.
    pub content_type: Option<String>,
}

/// Serializes `body` according to `content_type` (spec §4.2's body
/// serialization rule): JSON/text pass through `serde_json`, and
/// `application/x-www-form-urlencoded` pass through `form_urlencoded`.
/// Any other declared content type is a structural error.
pub fn serialize_body(
    body: &Variable,
    content_type: Option<&str>,
    ast_path: &AstPath,
) -> Result<SerializedBody, CoreError> {
    let declared = content_type.unwrap_or("application/json");
    if declared.starts_with("application/json") || declared.starts_with("text/") {
        let json = variable_to_json(body);
        let bytes = serde_json::to_vec(&json).map_err(|e| CoreError::MapAst {
            message: format!("failed to serialize request body as JSON: {e}"),
            ast_path: ast_path.clone(),
            source_location: None,
        })?;
        return Ok(SerializedBody {
            bytes,
            content_type: content_type.is_none().then(|| "application/json".to_string()),
        });
    }
    if declared.starts_with("application/x-www-form-urlencoded") {
        let fields = match body {
            Variable::Object(fields) => fields,
            _ => {
                return Err(CoreError::MapAst {
                    message: "form-urlencoded body must be an object".to_string(),
                    ast_path: ast_path.clone(),
                    source_location: None,
                })
            }
        };
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            let rendered = value
                .to_scalar_string(key)
                .map_err(|e| scalar_coercion_error(ast_path, &format!("form field '{key}'"), e))?;
            serializer.append_pair(key, &rendered);
        }
        return Ok(SerializedBody {
            bytes: serializer.finish().into_bytes(),
            content_type: None,
        });
    }
    Err(CoreError::MapAst {
        message: format!("unsupported request content type '{declared}'"),
        ast_path: ast_path.clone(),
        source_location: None,
    })
}

/// Converts a [`Variable`] to [`serde_json::Value`] for wire serialization.
/// Live [`Variable::Binary`] handles are not representable and become
/// `null`; callers that need binary bodies send raw bytes separately.
pub fn variable_to_json(value: &Variable) -> serde_json::Value {
    match value {
        Variable::None => serde_json::Value::Null,
        Variable::Bool(b) => serde_json::Value::Bool(*b),
        Variable::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Variable::String(s) => serde_json::Value::String(s.clone()),
        Variable::Bytes(b) => {
            serde_json::Value::String(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b))
        }
        Variable::Array(items) => serde_json::Value::Array(items.iter().map(variable_to_json).collect()),
        Variable::Object(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), variable_to_json(v)))
                .collect(),
        ),
        Variable::Binary(_) => serde_json::Value::Null,
    }
}

/// Parses a raw response body into a [`Variable`] given its `content-type`.
/// JSON decodes into the equivalent `Variable` tree; anything else is kept
/// as a raw UTF-8 string (lossily) or, failing that, raw bytes.
pub fn parse_response_body(bytes: &[u8], content_type: Option<&str>) -> Variable {
    let is_json = content_type
        .map(|ct| ct.starts_with("application/json") || ct.ends_with("+json"))
        .unwrap_or(false);
    if is_json {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
            return json_to_variable(&value);
        }
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Variable::String(text.to_string()),
        Err(_) => Variable::Bytes(bytes.to_vec()),
    }
}

fn json_to_variable(value: &serde_json::Value) -> Variable {
    match value {
        serde_json::Value::Null => Variable::None,
        serde_json::Value::Bool(b) => Variable::Bool(*b),
        serde_json::Value::Number(n) => Variable::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => Variable::String(s.clone()),
        serde_json::Value::Array(items) => Variable::Array(items.iter().map(json_to_variable).collect()),
        serde_json::Value::Object(fields) => {
            Variable::Object(fields.iter().map(|(k, v)| (k.clone(), json_to_variable(v))).collect())
        }
    }
}
