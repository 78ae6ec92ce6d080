// URL pattern matching

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// One `/`-delimited piece of a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `{name}` placeholder
    Variable(String),
}

/// Outcome of matching a path against a pattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub is_match: bool,
    pub is_dynamic: bool,
    pub variables: HashMap<String, String>,
}

impl MatchResult {
    fn miss(is_dynamic: bool) -> Self {
        Self {
            is_match: false,
            is_dynamic,
            variables: HashMap::new(),
        }
    }
}

/// Parsed mapping pattern such as `/user/{id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    raw: String,
    segments: Vec<Segment>,
    dynamic: bool,
}

impl UrlPattern {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments: Vec<Segment> = split_segments(&raw)
            .into_iter()
            .map(|segment| match variable_name(segment) {
                Some(name) => Segment::Variable(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        let dynamic = segments.iter().any(|s| matches!(s, Segment::Variable(_)));
        Self {
            raw,
            segments,
            dynamic,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern has at least one `{...}` segment
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Variable names in pattern order
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match `path` against this pattern.
    ///
    /// A static pattern also matches a path with exactly one extra trailing
    /// segment (`/user` matches `/user/45`), yielding no variables.
    ///
    /// `path` is split while still percent-encoded, so `%2F` never separates
    /// segments. Each segment is decoded afterwards.
    pub fn matches(&self, path: &str) -> MatchResult {
        let path_segments: Vec<Cow<'_, str>> =
            split_segments(path).into_iter().map(decode_segment).collect();

        if !self.dynamic && self.segments.len() + 1 == path_segments.len() {
            let prefix_equal = self
                .segments
                .iter()
                .zip(&path_segments)
                .all(|(seg, part)| matches!(seg, Segment::Literal(lit) if lit == &**part));
            if prefix_equal {
                return MatchResult {
                    is_match: true,
                    is_dynamic: false,
                    variables: HashMap::new(),
                };
            }
        }

        if self.segments.len() != path_segments.len() {
            return MatchResult::miss(self.dynamic);
        }

        let mut variables = HashMap::new();
        for (segment, part) in self.segments.iter().zip(&path_segments) {
            match segment {
                Segment::Variable(name) if !part.is_empty() => {
                    variables.insert(name.clone(), part.to_string());
                }
                Segment::Literal(lit) if lit == &**part => {}
                _ => return MatchResult::miss(self.dynamic),
            }
        }

        MatchResult {
            is_match: true,
            is_dynamic: self.dynamic,
            variables,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Match a raw pattern string against a path
pub fn match_path(pattern: &str, path: &str) -> MatchResult {
    UrlPattern::parse(pattern).matches(path)
}

/// Drop one trailing `/`, then split on `/`
fn split_segments(input: &str) -> Vec<&str> {
    input.strip_suffix('/').unwrap_or(input).split('/').collect()
}

/// Percent-decode one segment; invalid UTF-8 leaves it as received
fn decode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

fn variable_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_path_static() {
        let result = match_path("/users", "/users");
        assert!(result.is_match);
        assert!(!result.is_dynamic);
        assert!(result.variables.is_empty());

        assert!(!match_path("/users", "/posts").is_match);
    }

    #[test]
    fn test_match_path_with_variable() {
        let result = match_path("/user/{id}", "/user/45");
        assert!(result.is_match);
        assert!(result.is_dynamic);
        assert_eq!(result.variables.get("id"), Some(&"45".to_string()));
    }

    #[test]
    fn test_match_path_multiple_variables() {
        let result = match_path("/users/{id}/posts/{post_id}", "/users/1/posts/99");
        assert!(result.is_match);
        assert_eq!(result.variables.len(), 2);
        assert_eq!(result.variables["id"], "1");
        assert_eq!(result.variables["post_id"], "99");
    }

    #[test]
    fn test_legacy_prefix_match() {
        let result = match_path("/user", "/user/45");
        assert!(result.is_match);
        assert!(!result.is_dynamic);
        assert!(result.variables.is_empty());

        // Only one extra segment is tolerated
        assert!(!match_path("/user", "/user/45/edit").is_match);
        // The prefix must be literal
        assert!(!match_path("/user", "/users/45").is_match);
    }

    #[test]
    fn test_dynamic_pattern_never_uses_legacy_rule() {
        assert!(!match_path("/user/{id}", "/user/45/edit").is_match);
    }

    #[test]
    fn test_variable_requires_segment() {
        assert!(!match_path("/user/{id}", "/user").is_match);
        assert!(!match_path("/user/{id}", "/user/").is_match);
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        assert!(match_path("/users/", "/users").is_match);
        assert!(match_path("/users", "/users/").is_match);
        assert_eq!(match_path("/user/{id}/", "/user/7").variables["id"], "7");
    }

    #[test]
    fn test_root_pattern() {
        assert!(match_path("/", "/").is_match);
        // Legacy rule: the root pattern also matches any single segment
        assert!(match_path("/", "/anything").is_match);
        assert!(!match_path("/", "/a/b").is_match);
    }

    #[test]
    fn test_pattern_introspection() {
        let pattern = UrlPattern::parse("/teams/{team}/members/{member}");
        assert!(pattern.is_dynamic());
        assert_eq!(pattern.variable_names().collect::<Vec<_>>(), ["team", "member"]);
        assert_eq!(pattern.to_string(), "/teams/{team}/members/{member}");
        assert!(!UrlPattern::parse("/static").is_dynamic());
    }

    #[test]
    fn test_encoded_slash_stays_in_segment() {
        let result = match_path("/files/{name}", "/files/a%2Fb");
        assert!(result.is_match);
        assert_eq!(result.variables["name"], "a/b");

        assert!(!match_path("/files/{dir}/{name}", "/files/a%2Fb").is_match);
        // A decoded slash must not turn this into a legacy prefix match
        assert!(!match_path("/files/a", "/files/a%2Fb").is_match);
    }

    #[test]
    fn test_segments_are_decoded_after_split() {
        assert_eq!(match_path("/docs/{title}", "/docs/my%20doc").variables["title"], "my doc");
        assert!(match_path("/my docs", "/my%20docs").is_match);
        // Undecodable bytes are kept as sent
        assert_eq!(match_path("/raw/{v}", "/raw/%FF").variables["v"], "%FF");
    }
}
