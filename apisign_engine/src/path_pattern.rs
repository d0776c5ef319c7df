//! Permission entries are either literal paths or simple patterns:
//!
//! * `{name}` matches exactly one non-empty path segment,
//! * `*` matches any run of characters inside one segment,
//! * `**` matches any number of whole segments, including none.
//!
//! A literal comparison is always tried first, so a permission for `/api/orders/{id}` matches the route template
//! `/api/orders/{id}` even though the template itself looks like a pattern.
//!
//! Patterns are compiled once per process and kept in a shared cache, since every permission check goes through
//! [`matches_any`].
use std::{collections::HashMap, sync::RwLock};

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

/// Compiled patterns by source text. Patterns that fail to compile are stored as `None`.
static COMPILED: Lazy<RwLock<HashMap<String, Option<PathPattern>>>> = Lazy::new(Default::default);

#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    matcher: Option<Regex>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, regex::Error> {
        let matcher = if is_literal(pattern) { None } else { Some(Regex::new(&pattern_to_regex(pattern))?) };
        Ok(Self { source: pattern.to_string(), matcher })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.source == path || self.matcher.as_ref().map(|re| re.is_match(path)).unwrap_or(false)
    }
}

fn is_literal(pattern: &str) -> bool {
    !pattern.contains(['*', '{'])
}

fn pattern_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut rest = pattern;
    while let Some(c) = rest.chars().next() {
        if let Some(r) = rest.strip_prefix("/**") {
            out.push_str("(?:/.*)?");
            rest = r;
        } else if let Some(r) = rest.strip_prefix("**") {
            out.push_str(".*");
            rest = r;
        } else if let Some(r) = rest.strip_prefix('*') {
            out.push_str("[^/]*");
            rest = r;
        } else if let (Some(r), Some(end)) = (rest.strip_prefix('{'), rest.find('}')) {
            out.push_str("[^/]+");
            rest = &r[end..];
        } else {
            out.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4])));
            rest = &rest[c.len_utf8()..];
        }
    }
    out.push('$');
    out
}

/// The cached compilation of `pattern`, compiling it on first use.
fn compiled(pattern: &str) -> Option<PathPattern> {
    if let Some(hit) = COMPILED.read().ok().and_then(|cache| cache.get(pattern).cloned()) {
        return hit;
    }
    let parsed = PathPattern::parse(pattern)
        .map_err(|e| warn!("🔐️ Ignoring invalid permission pattern '{pattern}'. {e}"))
        .ok();
    if let Ok(mut cache) = COMPILED.write() {
        cache.insert(pattern.to_string(), parsed.clone());
    }
    parsed
}

/// True if `path` matches any of `patterns`. Entries that fail to compile are logged and skipped.
pub fn matches_any<S: AsRef<str>>(patterns: &[S], path: &str) -> bool {
    patterns.iter().any(|p| {
        let p = p.as_ref();
        p == path || (!is_literal(p) && compiled(p).map(|pattern| pattern.matches(path)).unwrap_or(false))
    })
}
