//! Declarative validation of a [`RawPayload`].
//!
//! A [`Schema`] either accepts the payload, producing its output type, or
//! rejects it with an ordered list of [`ValidationIssue`]s. Two concrete
//! schemas are provided: [`RecordSchema`] yields a loose string dictionary,
//! [`TypedSchema`] deserializes that dictionary into a typed record.

use std::{fmt, marker::PhantomData};

use chrono::DateTime;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::form::RawPayload;

/// Path used for issues that are not attributable to a single field.
pub const FORM_PATH: &str = "form";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn at(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: vec![key.into()],
            message: message.into(),
        }
    }

    pub fn form(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    /// Dot-joined path, or [`FORM_PATH`] when the path is empty.
    pub fn path_key(&self) -> String {
        if self.path.is_empty() {
            FORM_PATH.to_string()
        } else {
            self.path.join(".")
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path_key(), self.message)
    }
}

pub trait Schema: Send + Sync {
    type Output: Send;

    fn validate(&self, payload: &RawPayload) -> Result<Self::Output, Vec<ValidationIssue>>;
}

#[derive(Clone, Copy)]
struct Predicate(fn(&str) -> bool);

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

#[derive(Debug, Clone)]
enum Step {
    Trim,
    MinLength { min: usize, message: String },
    MaxLength { max: usize, message: String },
    OneOf { allowed: Vec<String>, message: String },
    Rfc3339 { message: String },
    Check { predicate: Predicate, message: String },
}

impl Step {
    fn apply(&self, value: String) -> Result<String, String> {
        match self {
            Step::Trim => Ok(value.trim().to_string()),
            Step::MinLength { min, message } if value.chars().count() < *min => {
                Err(message.clone())
            }
            Step::MaxLength { max, message } if value.chars().count() > *max => {
                Err(message.clone())
            }
            Step::OneOf { allowed, message } if !allowed.iter().any(|a| *a == value) => {
                Err(message.clone())
            }
            Step::Rfc3339 { message } if DateTime::parse_from_rfc3339(&value).is_err() => {
                Err(message.clone())
            }
            Step::Check { predicate, message } if !(predicate.0)(&value) => Err(message.clone()),
            _ => Ok(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
    /// Optional, and an empty value counts as absent.
    OmitBlank,
}

/// Pipeline of transforms and checks for one field.
///
/// Steps run in the order they were added; the first failing check ends the
/// pipeline for that field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    key: String,
    presence: Presence,
    steps: Vec<Step>,
}

pub fn field(key: impl Into<String>) -> FieldSchema {
    FieldSchema {
        key: key.into(),
        presence: Presence::Required,
        steps: Vec::new(),
    }
}

impl FieldSchema {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn omit_blank(mut self) -> Self {
        self.presence = Presence::OmitBlank;
        self
    }

    pub fn trim(self) -> Self {
        self.step(Step::Trim)
    }

    pub fn min_length(self, min: usize, message: impl Into<String>) -> Self {
        self.step(Step::MinLength {
            min,
            message: message.into(),
        })
    }

    pub fn max_length(self, max: usize, message: impl Into<String>) -> Self {
        self.step(Step::MaxLength {
            max,
            message: message.into(),
        })
    }

    pub fn one_of<I, S>(self, allowed: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step(Step::OneOf {
            allowed: allowed.into_iter().map(Into::into).collect(),
            message: message.into(),
        })
    }

    pub fn rfc3339(self, message: impl Into<String>) -> Self {
        self.step(Step::Rfc3339 {
            message: message.into(),
        })
    }

    pub fn check(self, predicate: fn(&str) -> bool, message: impl Into<String>) -> Self {
        self.step(Step::Check {
            predicate: Predicate(predicate),
            message: message.into(),
        })
    }

    fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// `Ok(None)` means the field is left out of the output.
    fn run(&self, payload: &RawPayload) -> Result<Option<String>, ValidationIssue> {
        let raw = match (payload.get(&self.key), self.presence) {
            (None, Presence::Required) => {
                return Err(ValidationIssue::at(
                    &self.key,
                    format!("{} is required", self.key),
                ))
            }
            (None, _) => return Ok(None),
            (Some(raw), Presence::OmitBlank) if raw.trim().is_empty() => return Ok(None),
            (Some(raw), _) => raw.to_string(),
        };

        self.steps
            .iter()
            .try_fold(raw, |value, step| step.apply(value))
            .map(Some)
            .map_err(|message| ValidationIssue::at(&self.key, message))
    }
}

/// Object of field pipelines producing a string dictionary.
#[derive(Debug, Clone, Default)]
pub struct RecordSchema {
    fields: Vec<FieldSchema>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldSchema::key)
    }
}

impl Schema for RecordSchema {
    type Output = IndexMap<String, String>;

    fn validate(&self, payload: &RawPayload) -> Result<Self::Output, Vec<ValidationIssue>> {
        let mut output = IndexMap::with_capacity(self.fields.len());
        let mut issues = Vec::new();

        for field in &self.fields {
            match field.run(payload) {
                Ok(Some(value)) => {
                    output.insert(field.key.clone(), value);
                }
                Ok(None) => {}
                Err(issue) => issues.push(issue),
            }
        }

        if issues.is_empty() {
            Ok(output)
        } else {
            Err(issues)
        }
    }
}

/// [`RecordSchema`] followed by deserialization into `T`.
///
/// Record keys must match `T`'s serialized field names. A value the record
/// accepts but `T` cannot hold is reported at [`FORM_PATH`].
pub struct TypedSchema<T> {
    record: RecordSchema,
    _output: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    pub fn new(record: RecordSchema) -> Self {
        Self {
            record,
            _output: PhantomData,
        }
    }

    pub fn record(&self) -> &RecordSchema {
        &self.record
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema")
            .field("record", &self.record)
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Send,
{
    type Output = T;

    fn validate(&self, payload: &RawPayload) -> Result<T, Vec<ValidationIssue>> {
        let record = self.record.validate(payload)?;
        let object = record
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::from_value(Value::Object(object))
            .map_err(|error| vec![ValidationIssue::form(error.to_string())])
    }
}

#[cfg(test)]
#[path = "tests/schema_tests.rs"]
mod tests;
