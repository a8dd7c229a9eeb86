//! Plain-data HTTP building blocks shared by the adapter and transports.
//!
//! # Design
//! Request bodies and decoded response payloads are tagged variants decided
//! by whoever produces them (the caller for bodies, the transport for
//! payloads), so nothing downstream inspects runtime types. Header
//! containers are reached through the `HeaderView` capability, which lets a
//! transport hand back its own native header type.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Read-only view over a header container.
///
/// Only keys the container reports through `keys` and confirms with `has`
/// are ever copied out of it.
pub trait HeaderView: fmt::Debug + Send + Sync {
    /// Every header name the container knows about.
    fn keys(&self) -> Vec<String>;

    /// Whether a value is present for `key`.
    fn has(&self, key: &str) -> bool;

    /// The value for `key`, if present.
    fn get(&self, key: &str) -> Option<String>;
}

/// String-to-string header mapping.
///
/// Holds one entry per header name; keys keep the casing of the latest
/// insert. Lookups that must honor HTTP's case-insensitive names go through
/// the `*_ignore_case` methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any entry whose name differs only by
    /// case. The new casing wins.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.remove_ignore_case(&key);
        self.0.insert(key, value.into());
    }

    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Remove every entry whose name matches `key` regardless of case.
    /// Returns true if anything was removed.
    pub fn remove_ignore_case(&mut self, key: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|k, _| !k.eq_ignore_ascii_case(key));
        self.0.len() != before
    }

    pub fn contains_ignore_case(&self, key: &str) -> bool {
        self.get_ignore_case(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl HeaderView for Headers {
    fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (key, value) in iter {
            headers.insert(key, value);
        }
        headers
    }
}

/// One field of a multipart form upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        filename: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                filename: filename.into(),
                content_type,
                bytes,
            },
        }
    }
}

/// Request payload, tagged by the caller.
///
/// `MultipartForm` bodies require the transport to pick its own
/// boundary-qualified content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Raw(Vec<u8>),
    MultipartForm(Vec<FormField>),
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::MultipartForm(_))
    }
}

/// Response payload as decoded by the transport. The adapter passes it
/// through untouched.
///
/// Serialized externally tagged so every variant reads back as itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseData {
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
    Empty,
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }
}
