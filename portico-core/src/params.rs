//! Flat multi-valued request parameters.

use crate::Error;
use std::collections::BTreeMap;

/// Request parameters keyed by their raw (possibly dotted or indexed) names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` payload
    pub fn from_urlencoded(input: &[u8]) -> Result<Self, Error> {
        let mut params = Self::new();
        params.extend_from_urlencoded(input)?;
        Ok(params)
    }

    /// Append every pair of a url-encoded payload, keeping repeated keys
    pub fn extend_from_urlencoded(&mut self, input: &[u8]) -> Result<(), Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(input)
            .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))?;
        for (key, value) in pairs {
            self.append(key, value);
        }
        Ok(())
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// First value submitted for `key`
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Entries under `prefix.`, with the prefix and dot stripped
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a [String])> + 'a {
        self.entries.iter().filter_map(move |(key, values)| {
            let relative = key.strip_prefix(prefix)?.strip_prefix('.')?;
            Some((relative, values.as_slice()))
        })
    }

    /// Largest `i` among keys shaped `name[i]` or `name[i]...`
    pub fn max_index(&self, name: &str) -> Option<usize> {
        self.entries
            .keys()
            .filter_map(|key| leading_index(key.strip_prefix(name)?))
            .max()
    }
}

/// Parse `[<digits>]` at the start of `rest`
pub(crate) fn leading_index(rest: &str) -> Option<usize> {
    let inner = rest.strip_prefix('[')?;
    let close = inner.find(']')?;
    inner[..close].parse().ok()
}
