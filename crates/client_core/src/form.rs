//! Browser-style form payloads and extraction of the declared fields.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File { filename: String, bytes: Vec<u8> },
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File { .. } => None,
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Text(value)
    }
}

/// Read-only key/value accessor over a submitted form.
pub trait FormSource {
    /// First value submitted under `key`, if any.
    fn get(&self, key: &str) -> Option<FormValue>;
}

/// Ordered, multi-valued form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FormValue>,
    {
        let mut form = Self::new();
        for (key, value) in pairs {
            form.append(key, value);
        }
        form
    }

    /// Parses an `application/x-www-form-urlencoded` body.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(body).map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<FormValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FormSource for FormData {
    fn get(&self, key: &str) -> Option<FormValue> {
        self.get_all(key).next().cloned()
    }
}

impl FormSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<FormValue> {
        HashMap::get(self, key).cloned().map(FormValue::Text)
    }
}

impl FormSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<FormValue> {
        BTreeMap::get(self, key).cloned().map(FormValue::Text)
    }
}

/// Text value of every declared key, in declaration order.
///
/// Total over the declared keys: anything absent or not text reads as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawPayload(IndexMap<String, String>);

impl RawPayload {
    pub fn extract<S, K>(source: &S, keys: &[K]) -> Self
    where
        S: FormSource + ?Sized,
        K: AsRef<str>,
    {
        Self(
            keys.iter()
                .map(|key| {
                    let key = key.as_ref();
                    (key.to_string(), form_text(source, key))
                })
                .collect(),
        )
    }

    /// `None` only for keys that were never declared.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawPayload {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

pub fn form_text<S: FormSource + ?Sized>(source: &S, key: &str) -> String {
    match source.get(key) {
        Some(FormValue::Text(text)) => text,
        _ => String::new(),
    }
}
