//! Directive registry.
//!
//! A directive turns a single-key fixture object such as `{"$oid": true}`
//! into a tree value, usually a [`Pattern`]. The registry is filled once
//! while a harness is being built and is read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::SnapError;
use crate::model::Value;
use crate::pattern::{Pattern, PatternType};

/// Conversion from a directive payload to a tree value.
pub type DirectiveFn = dyn Fn(&JsonValue) -> Result<Value, String> + Send + Sync;

/// A named fixture decoding rule.
#[derive(Clone)]
pub struct Directive {
    name: String,
    decode: Arc<DirectiveFn>,
}

impl Directive {
    pub fn new<F>(name: impl Into<String>, decode: F) -> Self
    where
        F: Fn(&JsonValue) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(decode),
        }
    }

    /// Directive producing a [`Pattern<T>`] with the standard payload rules:
    ///
    /// - `true`: wildcard, with `synthesize()` as its placeholder value
    /// - `false`: rejected
    /// - a string: exact value parsed with `parse`
    /// - anything else: rejected
    pub fn pattern<T, P, S>(name: impl Into<String>, parse: P, synthesize: S) -> Self
    where
        T: PatternType,
        P: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
        S: Fn() -> T + Send + Sync + 'static,
    {
        let name = name.into();
        let marker = format!("${}", name);
        Self::new(name, move |payload| match payload {
            JsonValue::Bool(true) => Ok(Value::from(Pattern::any(synthesize()))),
            JsonValue::Bool(false) => Err(format!(
                "{} bool must be true to indicate wildcard",
                marker
            )),
            JsonValue::String(s) => parse(s.as_str()).map(|v| Value::from(Pattern::value(v))),
            other => Err(format!(
                "invalid {} payload type {}",
                marker,
                json_kind(other)
            )),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The object key that triggers this directive, e.g. `$oid`.
    pub fn marker(&self) -> String {
        format!("${}", self.name)
    }

    pub fn decode(&self, payload: &JsonValue) -> Result<Value, String> {
        (self.decode)(payload)
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive").field("name", &self.name).finish()
    }
}

/// Set of directives known to a decoder.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    directives: BTreeMap<String, Directive>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive. Names are unique.
    pub fn register(&mut self, directive: Directive) -> Result<(), SnapError> {
        if self.directives.contains_key(directive.name()) {
            return Err(SnapError::DuplicateDirective {
                name: directive.name().to_string(),
            });
        }
        log::debug!("Registered directive {}", directive.marker());
        self.directives.insert(directive.name().to_string(), directive);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Directive> {
        self.directives.get(name)
    }

    /// Look up the directive for an object key like `$oid`.
    pub fn for_marker(&self, key: &str) -> Option<&Directive> {
        key.strip_prefix('$').and_then(|name| self.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.directives.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

/// Kind name of a raw fixture value.
pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper() -> Directive {
        Directive::pattern::<String, _, _>(
            "upper",
            |s| {
                if s.chars().all(|c| c.is_ascii_uppercase()) {
                    Ok(s.to_string())
                } else {
                    Err(format!("{:?} is not upper case", s))
                }
            },
            || "PLACEHOLDER".to_string(),
        )
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = Registry::new();
        registry.register(upper()).unwrap();

        let err = registry.register(upper()).unwrap_err();
        assert_eq!(err.error_type(), "duplicate_directive");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_for_marker_requires_dollar_prefix() {
        let mut registry = Registry::new();
        registry.register(upper()).unwrap();

        assert!(registry.for_marker("$upper").is_some());
        assert!(registry.for_marker("upper").is_none());
        assert!(registry.for_marker("$lower").is_none());
    }

    #[test]
    fn test_pattern_directive_true_is_wildcard() {
        let value = upper().decode(&json!(true)).unwrap();
        let pattern = value.as_pattern().unwrap();
        assert!(pattern.is_wildcard());
        assert_eq!(pattern.unwrap_value(), Value::from("PLACEHOLDER"));
    }

    #[test]
    fn test_pattern_directive_string_is_exact() {
        let value = upper().decode(&json!("ABC")).unwrap();
        assert_eq!(value, Value::from(Pattern::value("ABC".to_string())));

        let err = upper().decode(&json!("abc")).unwrap_err();
        assert!(err.contains("not upper case"));
    }

    #[test]
    fn test_pattern_directive_rejects_other_payloads() {
        let err = upper().decode(&json!(false)).unwrap_err();
        assert_eq!(err, "$upper bool must be true to indicate wildcard");

        let err = upper().decode(&json!(12)).unwrap_err();
        assert_eq!(err, "invalid $upper payload type number");
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = Registry::new();
        registry
            .register(Directive::new("b", |_| Ok(Value::Null)))
            .unwrap();
        registry
            .register(Directive::new("a", |_| Ok(Value::Null)))
            .unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
