//! Data binder: builds nested object graphs from flat parameter keys.
//!
//! Keys under a prefix use dotted and indexed notation, for example
//! `e.name` or `e.dept[2].name`. Binding runs in two passes. The first
//! computes the length of every sequence from the largest index seen for it
//! ([`sequence_sizes`]). The second walks each key, allocating sequences at
//! that length and instantiating nested objects on first use, then converts
//! the key's first value into the terminal field.
//!
//! Sequence lengths are tracked per full path, so `dept[0].members` and
//! `dept[1].members` are sized independently. An index at or above the
//! length limit is rejected before anything is allocated.

use crate::kind::{FieldKind, ObjectSchema};
use crate::params::ParameterMap;
use crate::value::{BoundObject, Value};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::trace;

/// Longest sequence a request may bind unless configured otherwise
pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 1024;

static INDEXED_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\[(\d+)\]$").expect("indexed segment pattern"));

/// Failure to build an object graph from request keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("`{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("field `{field}` of `{type_name}` is not a sequence")]
    NotASequence { type_name: String, field: String },

    #[error("field `{field}` of `{type_name}` is not an object")]
    NotAnObject { type_name: String, field: String },

    #[error("index {index} of `{path}` is outside a sequence of length {len}")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("index {index} of `{path}` exceeds the sequence limit of {limit}")]
    SequenceTooLong {
        path: String,
        index: usize,
        limit: usize,
    },
}

impl BindError {
    fn unknown(type_name: &str, field: &str) -> Self {
        BindError::UnknownField {
            type_name: type_name.to_string(),
            field: field.to_string(),
        }
    }

    fn not_a_sequence(type_name: &str, field: &str) -> Self {
        BindError::NotASequence {
            type_name: type_name.to_string(),
            field: field.to_string(),
        }
    }

    fn not_an_object(type_name: &str, field: &str) -> Self {
        BindError::NotAnObject {
            type_name: type_name.to_string(),
            field: field.to_string(),
        }
    }

    /// Reject `index` unless it fits below `limit`
    pub(crate) fn check_index(path: &str, index: usize, limit: usize) -> Result<(), Self> {
        if index < limit {
            Ok(())
        } else {
            Err(BindError::SequenceTooLong {
                path: path.to_string(),
                index,
                limit,
            })
        }
    }
}

/// Split `field[index]` into its parts
pub fn parse_indexed(segment: &str) -> Option<(&str, usize)> {
    let captures = INDEXED_SEGMENT.captures(segment)?;
    let field = captures.get(1)?.as_str();
    let index = captures.get(2)?.as_str().parse().ok()?;
    Some((field, index))
}

/// Length of every sequence referenced by `paths`, keyed by its full path.
///
/// For `dept[2].members[0].name` this records `dept -> 3` and
/// `dept[2].members -> 1`. Fails when an index is not below `max_len`.
pub fn sequence_sizes<'a>(
    paths: impl IntoIterator<Item = &'a str>,
    max_len: usize,
) -> Result<HashMap<String, usize>, BindError> {
    let mut sizes: HashMap<String, usize> = HashMap::new();
    for path in paths {
        let mut walked = String::new();
        for segment in path.split('.') {
            if let Some((field, index)) = parse_indexed(segment) {
                let key = join(&walked, field);
                BindError::check_index(&key, index, max_len)?;
                let size = sizes.entry(key).or_insert(0);
                *size = (*size).max(index + 1);
            }
            walked = join(&walked, segment);
        }
    }
    Ok(sizes)
}

/// Bind an instance of `schema` from every key under `prefix.`.
///
/// With no matching keys the result is a default-constructed instance.
/// Sequences are limited to [`DEFAULT_MAX_SEQUENCE_LEN`] elements.
pub fn bind(
    schema: &Arc<ObjectSchema>,
    prefix: &str,
    params: &ParameterMap,
) -> Result<BoundObject, BindError> {
    bind_with_limit(schema, prefix, params, DEFAULT_MAX_SEQUENCE_LEN)
}

/// [`bind`] with an explicit sequence length limit
pub fn bind_with_limit(
    schema: &Arc<ObjectSchema>,
    prefix: &str,
    params: &ParameterMap,
    max_len: usize,
) -> Result<BoundObject, BindError> {
    let entries: Vec<(&str, &[String])> = params.with_prefix(prefix).collect();
    let sizes = sequence_sizes(entries.iter().map(|(path, _)| *path), max_len)?;

    let mut root = schema.instantiate();
    for (path, values) in entries {
        let Some(raw) = values.first() else {
            continue;
        };
        assign(&mut root, path, raw, &sizes)?;
    }

    trace!(type_name = %schema.name, prefix, "Bound object");
    Ok(root)
}

fn assign(
    root: &mut BoundObject,
    path: &str,
    raw: &str,
    sizes: &HashMap<String, usize>,
) -> Result<(), BindError> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut current = root;
    let mut walked = String::new();
    for segment in parents {
        current = descend(current, segment, &walked, sizes)?;
        walked = join(&walked, segment);
    }

    let type_name = current.type_name().to_string();
    match parse_indexed(last) {
        Some((field, index)) => {
            let (kind, slot) = current
                .field_entry_mut(field)
                .ok_or_else(|| BindError::unknown(&type_name, field))?;
            let FieldKind::Sequence(element) = kind else {
                return Err(BindError::not_a_sequence(&type_name, field));
            };
            if !element.is_scalar() {
                return Ok(());
            }
            let key = join(&walked, field);
            let items = allocate(slot, size_for(sizes, &key, index), &type_name, field)?;
            let len = items.len();
            let item = items.get_mut(index).ok_or(BindError::IndexOutOfBounds {
                path: key,
                index,
                len,
            })?;
            if let Some(value) = element.convert(raw) {
                *item = value;
            }
        }
        None => {
            let (kind, slot) = current
                .field_entry_mut(last)
                .ok_or_else(|| BindError::unknown(&type_name, last))?;
            if let Some(value) = kind.convert(raw) {
                *slot = value;
            }
        }
    }
    Ok(())
}

/// Step from `obj` into the object named by `segment`, creating it if needed
fn descend<'a>(
    obj: &'a mut BoundObject,
    segment: &str,
    walked: &str,
    sizes: &HashMap<String, usize>,
) -> Result<&'a mut BoundObject, BindError> {
    let type_name = obj.type_name().to_string();

    let slot = match parse_indexed(segment) {
        Some((field, index)) => {
            let (kind, slot) = obj
                .field_entry_mut(field)
                .ok_or_else(|| BindError::unknown(&type_name, field))?;
            let FieldKind::Sequence(element) = kind else {
                return Err(BindError::not_a_sequence(&type_name, field));
            };
            let FieldKind::Object(schema) = element.as_ref() else {
                return Err(BindError::not_an_object(&type_name, segment));
            };
            let key = join(walked, field);
            let items = allocate(slot, size_for(sizes, &key, index), &type_name, field)?;
            let len = items.len();
            let item = items.get_mut(index).ok_or(BindError::IndexOutOfBounds {
                path: key,
                index,
                len,
            })?;
            if item.is_null() {
                *item = Value::Object(schema.instantiate());
            }
            item
        }
        None => {
            let (kind, slot) = obj
                .field_entry_mut(segment)
                .ok_or_else(|| BindError::unknown(&type_name, segment))?;
            let FieldKind::Object(schema) = kind else {
                return Err(BindError::not_an_object(&type_name, segment));
            };
            if slot.is_null() {
                *slot = Value::Object(schema.instantiate());
            }
            slot
        }
    };

    match slot {
        Value::Object(next) => Ok(next),
        _ => Err(BindError::not_an_object(&type_name, segment)),
    }
}

/// The sequence stored in `slot`, allocated with `size` null elements if absent
fn allocate<'a>(
    slot: &'a mut Value,
    size: usize,
    type_name: &str,
    field: &str,
) -> Result<&'a mut Vec<Value>, BindError> {
    if slot.is_null() {
        *slot = Value::Sequence(vec![Value::Null; size]);
    }
    match slot {
        Value::Sequence(items) => Ok(items),
        _ => Err(BindError::not_a_sequence(type_name, field)),
    }
}

fn size_for(sizes: &HashMap<String, usize>, key: &str, index: usize) -> usize {
    sizes.get(key).copied().unwrap_or(index.saturating_add(1))
}

fn join(walked: &str, segment: &str) -> String {
    if walked.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", walked, segment)
    }
}
