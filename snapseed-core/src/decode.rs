//! Fixture decoding: JSON or YAML text into an ordered [`Document`].
//!
//! Both formats are parsed into a `serde_json::Value` tree first (with
//! `preserve_order`, so object keys keep their declaration order) and then
//! converted, expanding registered directives on the way.

use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::model::{Document, Entry, Value};
use crate::registry::{json_kind, Registry};

/// Largest nesting depth the decoder honours. The JSON and YAML parsers
/// stop at 128 levels on their own.
pub const MAX_SUPPORTED_DEPTH: usize = 100;

/// Default maximum nesting depth accepted by the decoder.
pub const DEFAULT_MAX_DEPTH: usize = MAX_SUPPORTED_DEPTH;

/// Fixture file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    Json,
    Yaml,
}

impl FixtureFormat {
    /// File extensions recognized as fixtures (compared case-insensitively).
    pub const EXTENSIONS: &'static [&'static str] = &["json", "yaml", "yml"];

    /// Pick the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(FixtureFormat::Json),
            "yaml" | "yml" => Some(FixtureFormat::Yaml),
            _ => None,
        }
    }
}

/// Decoder limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum nesting depth of objects and arrays.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Why a fixture could not be decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("root must be an object, found {0}")]
    RootNotObject(&'static str),

    #[error("directive ${name}: {message}")]
    Directive { name: String, message: String },

    #[error("maximum nesting depth ({0}) exceeded")]
    MaxDepthExceeded(usize),

    #[error("number {0} cannot be represented")]
    InvalidNumber(String),
}

/// Decode fixture text in the given format.
///
/// `options.max_depth` is clamped to [`MAX_SUPPORTED_DEPTH`].
pub fn decode_str(
    format: FixtureFormat,
    text: &str,
    registry: &Registry,
    options: &DecodeOptions,
) -> Result<Document, DecodeError> {
    let options = DecodeOptions {
        max_depth: options.max_depth.min(MAX_SUPPORTED_DEPTH),
    };
    let raw: JsonValue = match format {
        FixtureFormat::Json => {
            serde_json::from_str(text).map_err(|e| parse_error(e.to_string(), &options))?
        }
        FixtureFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string(), &options))?
        }
    };
    from_json_value(raw, registry, &options)
}

/// Parser errors, with the parsers' own recursion limit reported as a depth
/// error.
fn parse_error(message: String, options: &DecodeOptions) -> DecodeError {
    if message.starts_with("recursion limit exceeded") {
        DecodeError::MaxDepthExceeded(options.max_depth)
    } else {
        DecodeError::Syntax(message)
    }
}

/// Convert an already-parsed tree. The root must be an object.
pub fn from_json_value(
    raw: JsonValue,
    registry: &Registry,
    options: &DecodeOptions,
) -> Result<Document, DecodeError> {
    let decoder = Decoder { registry, options };
    match raw {
        JsonValue::Object(map) => decoder.object(map, 1),
        other => Err(DecodeError::RootNotObject(json_kind(&other))),
    }
}

struct Decoder<'a> {
    registry: &'a Registry,
    options: &'a DecodeOptions,
}

impl Decoder<'_> {
    fn object(&self, map: Map<String, JsonValue>, depth: usize) -> Result<Document, DecodeError> {
        self.check_depth(depth)?;
        let mut doc = Document::with_capacity(map.len());
        for (key, value) in map {
            let value = self.value(value, depth)?;
            doc.push_entry(Entry { key, value });
        }
        Ok(doc)
    }

    fn value(&self, value: JsonValue, depth: usize) -> Result<Value, DecodeError> {
        match value {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Bool(b)),
            JsonValue::Number(n) => number(&n),
            JsonValue::String(s) => Ok(Value::String(s)),
            JsonValue::Array(items) => {
                self.check_depth(depth + 1)?;
                let items = items
                    .into_iter()
                    .map(|item| self.value(item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::from(items))
            }
            JsonValue::Object(map) => {
                if let Some(value) = self.directive(&map)? {
                    return Ok(value);
                }
                Ok(Value::from(self.object(map, depth + 1)?))
            }
        }
    }

    /// Expand `{"$name": payload}` when `name` is registered.
    fn directive(&self, map: &Map<String, JsonValue>) -> Result<Option<Value>, DecodeError> {
        if map.len() != 1 {
            return Ok(None);
        }
        let Some((key, payload)) = map.iter().next() else {
            return Ok(None);
        };
        let Some(directive) = self.registry.for_marker(key) else {
            return Ok(None);
        };
        directive
            .decode(payload)
            .map(Some)
            .map_err(|message| DecodeError::Directive {
                name: directive.name().to_string(),
                message,
            })
    }

    fn check_depth(&self, depth: usize) -> Result<(), DecodeError> {
        if depth > self.options.max_depth {
            return Err(DecodeError::MaxDepthExceeded(self.options.max_depth));
        }
        Ok(())
    }
}

fn number(n: &serde_json::Number) -> Result<Value, DecodeError> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| DecodeError::InvalidNumber(n.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use crate::registry::Directive;
    use crate::{arr, doc};

    fn decode_json(text: &str) -> Result<Document, DecodeError> {
        decode_str(FixtureFormat::Json, text, &Registry::new(), &DecodeOptions::default())
    }

    fn with_any() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(Directive::pattern::<String, _, _>(
                "any",
                |s| Ok(s.to_string()),
                String::new,
            ))
            .unwrap();
        registry
    }

    #[test]
    fn test_keys_keep_declaration_order() {
        let doc = decode_json(r#"{"zeta": 1, "alpha": 2, "mid": {"b": 1, "a": 2}}"#).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);

        let mid = doc.get("mid").and_then(Value::as_document).unwrap();
        assert_eq!(mid.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_numbers() {
        let doc =
            decode_json(r#"{"i": 3, "f": 2.5, "neg": -7, "big": 18446744073709551615}"#).unwrap();
        assert_eq!(doc.get("i"), Some(&Value::Int(3)));
        assert_eq!(doc.get("f"), Some(&Value::Float(2.5)));
        assert_eq!(doc.get("neg"), Some(&Value::Int(-7)));
        assert!(matches!(doc.get("big"), Some(Value::Float(_))));
    }

    #[test]
    fn test_nested_arrays_and_documents() {
        let doc =
            decode_json(r#"{"users": [{"name": "a"}, {"name": "b", "tags": [1, null]}]}"#)
                .unwrap();
        let expected = doc! {
            "users" => arr![
                doc! { "name" => "a" },
                doc! { "name" => "b", "tags" => arr![1, Value::Null] },
            ],
        };
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_root_must_be_object() {
        assert_eq!(decode_json("[1, 2]").unwrap_err(), DecodeError::RootNotObject("array"));
        assert_eq!(decode_json("3").unwrap_err(), DecodeError::RootNotObject("number"));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(decode_json("{\"a\": ").unwrap_err(), DecodeError::Syntax(_)));
    }

    #[test]
    fn test_registered_directive_is_expanded() {
        let doc = decode_str(
            FixtureFormat::Json,
            r#"{"x": {"$any": true}, "y": {"$any": "v"}}"#,
            &with_any(),
            &DecodeOptions::default(),
        )
        .unwrap();

        assert!(doc.get("x").and_then(Value::as_pattern).unwrap().is_wildcard());
        assert_eq!(doc.get("y"), Some(&Value::from(Pattern::value("v".to_string()))));
    }

    #[test]
    fn test_unregistered_marker_stays_plain() {
        let doc = decode_json(r#"{"x": {"$other": true}}"#).unwrap();
        let x = doc.get("x").and_then(Value::as_document).unwrap();
        assert_eq!(x.get("$other"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_marker_with_sibling_keys_stays_plain() {
        let doc = decode_str(
            FixtureFormat::Json,
            r#"{"x": {"$any": true, "other": 1}}"#,
            &with_any(),
            &DecodeOptions::default(),
        )
        .unwrap();
        assert!(doc.get("x").and_then(Value::as_document).is_some());
    }

    #[test]
    fn test_directive_error_names_directive() {
        let err = decode_str(
            FixtureFormat::Json,
            r#"{"x": {"$any": false}}"#,
            &with_any(),
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "directive $any: $any bool must be true to indicate wildcard"
        );
    }

    #[test]
    fn test_max_depth() {
        let options = DecodeOptions { max_depth: 3 };
        let registry = Registry::new();

        let ok = r#"{"a": {"b": {"c": 1}}}"#;
        assert!(decode_str(FixtureFormat::Json, ok, &registry, &options).is_ok());

        let too_deep = r#"{"a": {"b": {"c": {"d": 1}}}}"#;
        assert_eq!(
            decode_str(FixtureFormat::Json, too_deep, &registry, &options).unwrap_err(),
            DecodeError::MaxDepthExceeded(3)
        );

        let deep_array = r#"{"a": [[[1]]]}"#;
        assert!(decode_str(FixtureFormat::Json, deep_array, &registry, &options).is_err());
    }

    fn nested_json(levels: usize) -> String {
        format!("{}1{}", r#"{"a":"#.repeat(levels), "}".repeat(levels))
    }

    fn nested_yaml(levels: usize) -> String {
        let mut text = String::new();
        for level in 0..levels - 1 {
            text.push_str(&"  ".repeat(level));
            text.push_str("a:\n");
        }
        text.push_str(&"  ".repeat(levels - 1));
        text.push_str("a: 1\n");
        text
    }

    #[test]
    fn test_depth_at_supported_limit() {
        let registry = Registry::new();
        let options = DecodeOptions::default();

        let json = nested_json(MAX_SUPPORTED_DEPTH);
        assert!(decode_str(FixtureFormat::Json, &json, &registry, &options).is_ok());
        let yaml = nested_yaml(MAX_SUPPORTED_DEPTH);
        assert!(decode_str(FixtureFormat::Yaml, &yaml, &registry, &options).is_ok());

        let json = nested_json(MAX_SUPPORTED_DEPTH + 1);
        assert_eq!(
            decode_str(FixtureFormat::Json, &json, &registry, &options).unwrap_err(),
            DecodeError::MaxDepthExceeded(MAX_SUPPORTED_DEPTH)
        );
    }

    #[test]
    fn test_deeper_than_parser_limit_is_a_depth_error() {
        let registry = Registry::new();
        let options = DecodeOptions { max_depth: 300 };

        let json = nested_json(150);
        assert_eq!(
            decode_str(FixtureFormat::Json, &json, &registry, &options).unwrap_err(),
            DecodeError::MaxDepthExceeded(MAX_SUPPORTED_DEPTH)
        );

        let yaml = nested_yaml(150);
        assert_eq!(
            decode_str(FixtureFormat::Yaml, &yaml, &registry, &options).unwrap_err(),
            DecodeError::MaxDepthExceeded(MAX_SUPPORTED_DEPTH)
        );
    }

    #[test]
    fn test_yaml_keeps_order() {
        let text = "users:\n  - name: b\n    age: 3\n  - name: a\ncount: 2\n";
        let doc = decode_str(
            FixtureFormat::Yaml,
            text,
            &Registry::new(),
            &DecodeOptions::default(),
        )
        .unwrap();

        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["users", "count"]);
        let expected = doc! {
            "users" => arr![doc! { "name" => "b", "age" => 3 }, doc! { "name" => "a" }],
            "count" => 2,
        };
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(FixtureFormat::from_path(Path::new("a.JSON")), Some(FixtureFormat::Json));
        assert_eq!(FixtureFormat::from_path(Path::new("a.yml")), Some(FixtureFormat::Yaml));
        assert_eq!(FixtureFormat::from_path(Path::new("a.Yaml")), Some(FixtureFormat::Yaml));
        assert_eq!(FixtureFormat::from_path(Path::new("a.txt")), None);
        assert_eq!(FixtureFormat::from_path(Path::new("json")), None);
    }
}
