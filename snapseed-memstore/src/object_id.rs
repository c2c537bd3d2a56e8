//! Record identifiers (12 bytes, 24 hex chars).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snapseed_core::{Directive, PatternType, Value};

/// Byte length of an ObjectId.
pub const OBJECT_ID_LEN: usize = 12;

/// Record identifier.
///
/// Layout: 4-byte big-endian creation time in seconds, followed by 8 random
/// bytes. Rendered as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Generate a fresh id stamped with the current time.
    pub fn new() -> Self {
        let seconds = Utc::now().timestamp() as u32;
        let random = uuid::Uuid::new_v4();

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&random.as_bytes()[..8]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Creation time encoded in the first four bytes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let seconds = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        DateTime::from_timestamp(i64::from(seconds), 0).unwrap_or_default()
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse from 24 hex characters (either case).
    pub fn parse(s: &str) -> Result<Self, String> {
        if s.len() != OBJECT_ID_LEN * 2 {
            return Err(format!(
                "Invalid ObjectId length: expected {}, got {}",
                OBJECT_ID_LEN * 2,
                s.len()
            ));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid hex characters in ObjectId: {}", s));
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|e| format!("Invalid ObjectId {}: {}", s, e))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse(s)
    }
}

// Serialized as its hex string
impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::String(id.to_hex())
    }
}

impl PatternType for ObjectId {
    const TYPE_NAME: &'static str = "ObjectId";

    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| ObjectId::parse(s).ok())
    }
}

/// The `$oid` fixture directive.
///
/// `{"$oid": true}` matches any stored id, `{"$oid": "<24 hex>"}` matches
/// exactly that id.
pub fn oid_directive() -> Directive {
    Directive::pattern::<ObjectId, _, _>("oid", ObjectId::parse, ObjectId::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapseed_core::Pattern;

    #[test]
    fn test_new_ids_are_unique() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex_round_trip() {
        let id = ObjectId::new();
        let hex = id.to_string();
        assert_eq!(hex.len(), 24);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex.parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ObjectId::parse("short").is_err());
        assert!(ObjectId::parse(&"g".repeat(24)).is_err());
        assert!(ObjectId::parse(&"a".repeat(25)).is_err());
    }

    #[test]
    fn test_parse_accepts_upper_case() {
        let id = ObjectId::parse("5F1D7C2E9A3B4C5D6E7F8091").unwrap();
        assert_eq!(id.to_string(), "5f1d7c2e9a3b4c5d6e7f8091");
    }

    #[test]
    fn test_timestamp_is_recent() {
        let id = ObjectId::new();
        let age = Utc::now() - id.timestamp();
        assert!(age.num_seconds() < 5);
    }

    #[test]
    fn test_timestamp_from_bytes() {
        let id = ObjectId::from_bytes([0, 0, 0, 60, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(id.timestamp().timestamp(), 60);
    }

    #[test]
    fn test_serde_round_trip() {
        let id = ObjectId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_pattern_type_accepts_hex_strings_only() {
        let hex = "5f1d7c2e9a3b4c5d6e7f8091";
        assert!(ObjectId::from_value(&Value::from(hex)).is_some());
        assert!(ObjectId::from_value(&Value::from("not-an-id")).is_none());
        assert!(ObjectId::from_value(&Value::Int(1)).is_none());
    }

    #[test]
    fn test_directive_payloads() {
        let directive = oid_directive();
        assert_eq!(directive.marker(), "$oid");

        let wildcard = directive.decode(&serde_json::json!(true)).unwrap();
        assert!(wildcard.as_pattern().unwrap().is_wildcard());

        let hex = "5f1d7c2e9a3b4c5d6e7f8091";
        let exact = directive.decode(&serde_json::json!(hex)).unwrap();
        assert_eq!(exact, Value::from(Pattern::value(ObjectId::parse(hex).unwrap())));

        let err = directive.decode(&serde_json::json!(false)).unwrap_err();
        assert!(err.contains("must be true to indicate wildcard"));

        let err = directive.decode(&serde_json::json!(12)).unwrap_err();
        assert_eq!(err, "invalid $oid payload type number");

        assert!(directive.decode(&serde_json::json!("xyz")).is_err());
    }
}
