//! Cache key codec
//!
//! Keys are derived from `<entity>:<operation>:<json-args>`. Object keys in the
//! arguments are sorted recursively before serialization, so structurally equal
//! arguments always map to the same key regardless of insertion order.
//!
//! The default transform lower-cases the whole string and base64url-encodes it
//! without padding. Lower-casing means string arguments that differ only in
//! case share a key.

use crate::errors::CacheError;
use crate::options::KeySanitizer;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Default key transform: lower-case, then base64url without padding.
/// Empty input is returned as is.
///
/// # Warning
///
/// The argument JSON is lower-cased too, so `{"email":"Bob@x.com"}` and
/// `{"email":"bob@x.com"}` share a cache entry. Against a case-sensitive
/// store, supply a [`KeySanitizer`] that preserves case.
pub fn default_sanitize_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    URL_SAFE_NO_PAD.encode(key.to_lowercase())
}

/// Inverse of [`default_sanitize_key`], `None` when `key` was not produced by it
pub fn decode_default_key(key: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(key.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok()
}

/// Recursively sort object keys
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Collapse runs of whitespace so formatting differences in raw SQL share a key
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Encodes (operation, arguments) pairs for one entity
#[derive(Clone)]
pub struct CacheKeyCodec {
    entity: String,
    sanitizer: Option<KeySanitizer>,
}

impl Debug for CacheKeyCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheKeyCodec")
            .field("entity", &self.entity)
            .field("has_sanitizer", &self.sanitizer.is_some())
            .finish()
    }
}

impl CacheKeyCodec {
    pub fn new(entity: &str, sanitizer: Option<KeySanitizer>) -> Self {
        Self {
            entity: entity.to_lowercase(),
            sanitizer,
        }
    }

    /// Lower-cased entity name
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Unsanitized `<entity>:<operation>:<json>` form
    pub fn plain_key<A>(&self, operation: &str, args: &A) -> Result<String, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let encoding_error = |source| CacheError::KeyEncoding {
            operation: operation.to_string(),
            source,
        };

        let value = serde_json::to_value(args).map_err(encoding_error)?;
        let json = serde_json::to_string(&canonicalize(value)).map_err(encoding_error)?;

        Ok(format!(
            "{}:{}:{}",
            self.entity,
            operation.to_lowercase(),
            json
        ))
    }

    /// Encode an operation invocation into a backend key
    pub fn encode<A>(&self, operation: &str, args: &A) -> Result<String, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let plain = self.plain_key(operation, args)?;
        Ok(self.sanitize(&plain))
    }

    /// Apply the custom sanitizer, falling back to the default transform
    pub fn sanitize(&self, plain: &str) -> String {
        if let Some(sanitizer) = &self.sanitizer {
            if let Some(custom) = sanitizer(plain).filter(|s| !s.is_empty()) {
                return custom;
            }
        }
        default_sanitize_key(plain)
    }

    /// Best-effort recovery of the plain form. Under a custom sanitizer only keys
    /// that fell back to the default transform decode; the rest are opaque.
    pub fn decode(&self, key: &str) -> String {
        match decode_default_key(key) {
            Some(plain)
                if self.sanitizer.is_none() || plain.starts_with(&format!("{}:", self.entity)) =>
            {
                plain
            }
            _ => key.to_string(),
        }
    }

    /// Whether `key` was produced for `operation` on this entity
    pub fn matches_operation(&self, key: &str, operation: &str) -> bool {
        let prefix = format!("{}:{}:", self.entity, operation.to_lowercase());
        self.has_plain_prefix(key, &prefix)
    }

    /// Whether `key` lives in this entity's namespace
    pub fn belongs_to_entity(&self, key: &str) -> bool {
        let prefix = format!("{}:", self.entity);
        self.has_plain_prefix(key, &prefix)
    }

    /// Prefix test on the plain form. Opaque keys are also compared against
    /// the prefix as the custom sanitizer renders it.
    fn has_plain_prefix(&self, key: &str, prefix: &str) -> bool {
        let decoded = self.decode(key);
        if decoded.starts_with(prefix) {
            return true;
        }
        match &self.sanitizer {
            Some(sanitizer) if decoded == key => sanitizer(prefix)
                .filter(|rendered| !rendered.is_empty())
                .is_some_and(|rendered| key.starts_with(&rendered)),
            _ => false,
        }
    }
}
