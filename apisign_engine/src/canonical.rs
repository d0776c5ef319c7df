//! # Canonical strings
//!
//! Signatures and dynamic salts are digests over a deterministic, delimiter-free concatenation of fields. Both sides
//! of the exchange must build exactly the same string, so nothing in here is configurable.
//!
//! Signature canonical form: `params ++ appCode ++ secret ++ apiPath ++ timestamp`, where `params` is empty unless
//! parameter-inclusive signing is in use.
//!
//! Dynamic salt canonical form: `appCode ++ apiPath ++ fixedSalt ++ issuedAt`.
//!
//! The parameter fragment is built from a [`SignParams`] map. Keys are sorted in ascending code-point order (which is
//! also byte order for UTF-8 strings, so a `BTreeMap<String, _>` gives us this for free) and each entry is rendered as
//! the key followed by each of its values.
use std::collections::{btree_map, BTreeMap};

use apisign_common::EpochMillis;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    /// Multi-valued query parameters and JSON arrays. Order of appearance is preserved.
    Multi(Vec<String>),
}

impl ParamValue {
    fn render_into(&self, out: &mut String) {
        match self {
            ParamValue::Single(v) => out.push_str(v),
            ParamValue::Multi(values) => values.iter().for_each(|v| out.push_str(v)),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Multi(values)
    }
}

/// The request parameters that take part in a parameter-inclusive signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignParams {
    params: BTreeMap<String, ParamValue>,
}

impl SignParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing anything already stored under `key`.
    pub fn insert<K: Into<String>, V: Into<ParamValue>>(&mut self, key: K, value: V) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Adds `value` to the values for `key`. A second value for the same key turns the entry into a
    /// [`ParamValue::Multi`].
    pub fn append<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        let value = value.into();
        match self.params.entry(key.into()) {
            btree_map::Entry::Vacant(e) => {
                e.insert(ParamValue::Single(value));
            },
            btree_map::Entry::Occupied(mut e) => {
                let values = match std::mem::replace(e.get_mut(), ParamValue::Multi(Vec::new())) {
                    ParamValue::Single(first) => vec![first, value],
                    ParamValue::Multi(mut values) => {
                        values.push(value);
                        values
                    },
                };
                e.insert(ParamValue::Multi(values));
            },
        }
        self
    }

    pub fn with<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.params.iter()
    }

    /// Builds the parameter set from a JSON value.
    ///
    /// Only objects carry parameters; anything else gives an empty set. Strings are taken without quotes, numbers and
    /// booleans by their JSON text, arrays become multi-valued entries, nested objects are rendered as compact JSON
    /// and `null` entries are dropped.
    pub fn from_json(value: &Value) -> Self {
        let mut result = Self::new();
        if let Value::Object(map) = value {
            for (key, v) in map {
                match v {
                    Value::Null => continue,
                    Value::Array(items) => {
                        let values = items.iter().filter_map(json_scalar_text).collect::<Vec<String>>();
                        result.insert(key.as_str(), ParamValue::Multi(values));
                    },
                    other => {
                        if let Some(text) = json_scalar_text(other) {
                            result.insert(key.as_str(), text);
                        }
                    },
                }
            }
        }
        result
    }

    /// Parses a request body into a parameter set. Empty (or whitespace-only) bodies give an empty set.
    pub fn from_json_bytes(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        let value = serde_json::from_slice::<Value>(body)?;
        Ok(Self::from_json(&value))
    }

    /// Decodes an `application/x-www-form-urlencoded` query string. Repeated keys keep every value in order.
    pub fn from_query(query: &str) -> Self {
        let mut result = Self::new();
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            result.append(key.into_owned(), value.into_owned());
        }
        result
    }

    /// The sorted `key ++ value...` fragment that is prepended to the signature canonical string.
    pub fn canonical_fragment(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.params {
            out.push_str(key);
            value.render_into(&mut out);
        }
        out
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for SignParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut result = Self::new();
        for (k, v) in iter {
            result.insert(k, v);
        }
        result
    }
}

fn json_scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Builds the string that is hashed to produce a request signature.
pub fn build_canonical_string(
    app_code: &str,
    secret: &str,
    api_path: &str,
    timestamp: EpochMillis,
    params: Option<&SignParams>,
) -> String {
    let prefix = params.map(SignParams::canonical_fragment).unwrap_or_default();
    format!("{prefix}{app_code}{secret}{api_path}{timestamp}")
}

/// Builds the string that is hashed to produce a dynamic salt.
pub fn build_salt_string(app_code: &str, api_path: &str, fixed_salt: &str, issued_at: EpochMillis) -> String {
    format!("{app_code}{api_path}{fixed_salt}{issued_at}")
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_string_without_params() {
        let s = build_canonical_string("ios1", "s3cr3t", "/api/sign/submit-test", 1_700_000_000_000, None);
        assert_eq!(s, "ios1s3cr3t/api/sign/submit-test1700000000000");
    }

    #[test]
    fn params_are_prepended_in_key_order() {
        let params = SignParams::new().with("name", "bob").with("age", "42").with("Zed", "z");
        let s = build_canonical_string("ios1", "k", "/p", 5, Some(&params));
        // Upper case sorts before lower case
        assert_eq!(s, "Zedzage42namebobios1k/p5");
    }

    #[test]
    fn empty_params_render_nothing() {
        let s = build_canonical_string("a", "b", "/c", 1, Some(&SignParams::new()));
        assert_eq!(s, "ab/c1");
    }

    #[test]
    fn insertion_order_is_irrelevant() {
        let a = SignParams::from_iter([("b", "2"), ("a", "1"), ("c", "3")]);
        let b = SignParams::from_iter([("c", "3"), ("a", "1"), ("b", "2")]);
        assert_eq!(a.canonical_fragment(), b.canonical_fragment());
        assert_eq!(a.canonical_fragment(), "a1b2c3");
    }

    #[test]
    fn json_rendering() {
        let body = json!({
            "name": "widget",
            "qty": 3,
            "price": 1.5,
            "urgent": true,
            "tags": ["a", "b", 7],
            "meta": {"k": "v"},
            "missing": null
        });
        let params = SignParams::from_json(&body);
        assert_eq!(params.len(), 6);
        assert!(params.get("missing").is_none());
        assert_eq!(params.get("tags"), Some(&ParamValue::Multi(vec!["a".into(), "b".into(), "7".into()])));
        assert_eq!(params.canonical_fragment(), r#"meta{"k":"v"}namewidgetprice1.5qty3tagsab7urgenttrue"#);
    }

    #[test]
    fn non_object_bodies_have_no_params() {
        assert!(SignParams::from_json(&json!([1, 2, 3])).is_empty());
        assert!(SignParams::from_json(&json!("text")).is_empty());
        assert!(SignParams::from_json_bytes(b"").unwrap().is_empty());
        assert!(SignParams::from_json_bytes(b"  \n").unwrap().is_empty());
        assert!(SignParams::from_json_bytes(b"{not json").is_err());
    }

    #[test]
    fn query_strings_keep_repeated_keys() {
        let params = SignParams::from_query("?b=2&a=hello%20world&b=1&c=x+y");
        assert_eq!(params.get("a"), Some(&ParamValue::Single("hello world".into())));
        assert_eq!(params.get("b"), Some(&ParamValue::Multi(vec!["2".into(), "1".into()])));
        assert_eq!(params.canonical_fragment(), "ahello worldb21cx y");
    }

    #[test]
    fn salt_string_field_order() {
        assert_eq!(build_salt_string("ios1", "/p", "fixed", 9), "ios1/pfixed9");
    }
}
