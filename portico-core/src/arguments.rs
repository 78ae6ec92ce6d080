//! Argument resolution.
//!
//! Each declared parameter is resolved independently, trying sources in
//! this order:
//!
//! 1. mapping parameters on non-multipart requests: the flat parameter map
//! 2. multipart file parts by name
//! 3. multipart file sequences (`name` and `name[...]` parts)
//! 4. mapping parameters on multipart requests: raw bytes of every part
//! 5. path variables
//! 6. an explicit request-parameter key
//! 7. sequences, one element per index of `name[i]` keys
//! 8. the session handle, created on demand
//! 9. complex objects, bound from `name.` keys
//! 10. the request parameter carrying the parameter's own name
//!
//! When nothing applies the kind's zero value is used.

use crate::binder::{self, BindError};
use crate::form::{MultipartPayload, UploadedFile};
use crate::kind::FieldKind;
use crate::params::ParameterMap;
use crate::route_registry::{BindingHint, ParameterSpec, RouteDescriptor};
use crate::value::{BoundObject, Value};
use crate::Error;
use portico_session::{SessionHandle, SessionScope};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Per-request sources consulted while resolving arguments
pub struct RequestContext<'a> {
    pub params: &'a ParameterMap,
    pub variables: &'a HashMap<String, String>,
    pub multipart: Option<&'a MultipartPayload>,
    pub session: &'a SessionScope,
    /// Largest sequence any parameter may bind
    pub max_sequence_len: usize,
}

/// Resolve every declared parameter of `route`, in declaration order
pub fn resolve_arguments(
    route: &RouteDescriptor,
    ctx: &RequestContext<'_>,
) -> Result<Arguments, BindError> {
    let mut entries = Vec::with_capacity(route.parameters.len());
    for spec in &route.parameters {
        let value = resolve_parameter(spec, ctx)?;
        trace!(
            route = %route.qualified_name(),
            parameter = %spec.name,
            kind = spec.kind.label(),
            "Resolved argument"
        );
        entries.push((spec.name.clone(), value));
    }
    Ok(Arguments { entries })
}

fn resolve_parameter(spec: &ParameterSpec, ctx: &RequestContext<'_>) -> Result<Value, BindError> {
    let name = spec.name.as_str();
    let kind = &spec.kind;

    match (&spec.hint, kind, ctx.multipart) {
        (BindingHint::RawParameterMap, _, None) => return Ok(parameter_mapping(ctx.params)),
        (_, FieldKind::FilePart, Some(payload)) => {
            if let Some(file) = payload.file(name) {
                return Ok(Value::File(file.clone()));
            }
        }
        (_, FieldKind::Sequence(element), Some(payload)) if **element == FieldKind::FilePart => {
            let files = payload
                .files_for(name)
                .into_iter()
                .map(|f| Value::File(f.clone()))
                .collect();
            return Ok(Value::Sequence(files));
        }
        (BindingHint::RawParameterMap, _, Some(payload)) => {
            let raw = payload
                .raw
                .iter()
                .map(|(k, v)| (k.clone(), Value::Bytes(v.clone())))
                .collect();
            return Ok(Value::Mapping(raw));
        }
        _ => {}
    }

    if let Some(value) = ctx.variables.get(name).and_then(|raw| kind.convert(raw)) {
        return Ok(value);
    }

    if let BindingHint::Query(key) = &spec.hint {
        if let Some(value) = ctx.params.first(key).and_then(|raw| kind.convert(raw)) {
            return Ok(value);
        }
    }

    if let FieldKind::Sequence(element) = kind {
        if let Some(items) = resolve_sequence(name, element, ctx)? {
            return Ok(Value::Sequence(items));
        }
    }

    if spec.hint == BindingHint::SessionHandle {
        return Ok(Value::Session(ctx.session.get_or_create()));
    }

    if let FieldKind::Object(schema) = kind {
        return binder::bind_with_limit(schema, name, ctx.params, ctx.max_sequence_len)
            .map(Value::Object);
    }

    if let Some(value) = ctx.params.first(name).and_then(|raw| kind.convert(raw)) {
        return Ok(value);
    }

    Ok(kind.zero_value())
}

/// Single values unwrapped, repeated values kept as sequences
fn parameter_mapping(params: &ParameterMap) -> Value {
    let entries: BTreeMap<String, Value> = params
        .iter()
        .map(|(key, values)| {
            let value = match values {
                [single] => Value::Text(single.clone()),
                many => Value::Sequence(many.iter().map(|v| Value::Text(v.clone())).collect()),
            };
            (key.to_string(), value)
        })
        .collect();
    Value::Mapping(entries)
}

/// Elements `0..=max` of `name[i]` keys; scalar sequences fall back to the
/// repeated values of `name`
fn resolve_sequence(
    name: &str,
    element: &FieldKind,
    ctx: &RequestContext<'_>,
) -> Result<Option<Vec<Value>>, BindError> {
    let params = ctx.params;
    if let Some(max) = params.max_index(name) {
        BindError::check_index(name, max, ctx.max_sequence_len)?;
        let mut items = Vec::with_capacity(max + 1);
        for index in 0..=max {
            let prefix = format!("{}[{}]", name, index);
            let item = match element {
                FieldKind::Object(schema) => Value::Object(binder::bind_with_limit(
                    schema,
                    &prefix,
                    params,
                    ctx.max_sequence_len,
                )?),
                scalar if scalar.is_scalar() => params
                    .first(&prefix)
                    .and_then(|raw| scalar.convert(raw))
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            };
            items.push(item);
        }
        return Ok(Some(items));
    }

    if element.is_scalar() {
        if let Some(values) = params.values(name) {
            let items = values
                .iter()
                .map(|raw| element.convert(raw).unwrap_or(Value::Null))
                .collect();
            return Ok(Some(items));
        }
    }

    Ok(None)
}

/// Resolved handler arguments, by parameter name in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn real(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn object(&self, name: &str) -> Option<&BoundObject> {
        self.get(name).and_then(Value::as_object)
    }

    pub fn session(&self, name: &str) -> Option<&SessionHandle> {
        self.get(name).and_then(Value::as_session)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.get(name).and_then(Value::as_file)
    }

    pub fn files(&self, name: &str) -> Vec<&UploadedFile> {
        self.get(name)
            .and_then(Value::as_sequence)
            .map(|items| items.iter().filter_map(Value::as_file).collect())
            .unwrap_or_default()
    }

    /// Deserialize an argument through its JSON form
    pub fn deserialize<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error> {
        let value = self.get(name).map(Value::to_json).unwrap_or_default();
        serde_json::from_value(value)
            .map_err(|e| Error::Deserialization(format!("argument `{}`: {}", name, e)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object of every argument, used for the response envelope
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.entries
            .iter()
            .map(|(n, v)| (n.clone(), v.to_json()))
            .collect()
    }
}
