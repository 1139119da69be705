//! Server-side half of a form submission: extract, validate, then run the
//! side effect, folding every outcome into an [`ActionState`].

use std::{any::Any, future::Future, panic::AssertUnwindSafe};

use futures::FutureExt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    form::{FormSource, RawPayload},
    schema::{Schema, ValidationIssue, FORM_PATH},
};

pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred while processing the request";

/// Error message per path, in the order the paths were first reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repeated path keeps its position and takes the newer message.
    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.insert(path.into(), message.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn first(&self) -> Option<(&str, &str)> {
        self.0.first().map(|(k, v)| (k.as_str(), v.as_str()))
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

impl FromIterator<ValidationIssue> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = ValidationIssue>>(iter: I) -> Self {
        let mut errors = Self::new();
        for issue in iter {
            errors.insert(issue.path_key(), issue.message);
        }
        errors
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut errors = Self::new();
        for (path, message) in iter {
            errors.insert(path, message);
        }
        errors
    }
}

/// Outcome of one form action, exchanged with the submission controller.
///
/// `Failure` always carries at least one entry. On the wire this is the
/// familiar `{}` / `{"ok":true}` / `{"errors":{...}}` shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireState", into = "WireState")]
pub enum ActionState {
    #[default]
    Unresolved,
    Success,
    Failure(FieldErrors),
}

impl ActionState {
    pub fn form_error(message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(FORM_PATH, message);
        ActionState::Failure(errors)
    }

    pub fn from_issues(issues: impl IntoIterator<Item = ValidationIssue>) -> Self {
        let errors: FieldErrors = issues.into_iter().collect();
        if errors.is_empty() {
            return ActionState::form_error("Invalid input");
        }
        ActionState::Failure(errors)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ActionState::Success)
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            ActionState::Failure(errors) if !errors.is_empty() => Some(errors),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ok: Option<bool>,
}

impl From<WireState> for ActionState {
    fn from(wire: WireState) -> Self {
        match wire {
            WireState {
                errors: Some(errors),
                ..
            } if !errors.is_empty() => ActionState::Failure(errors),
            WireState { ok: Some(true), .. } => ActionState::Success,
            _ => ActionState::Unresolved,
        }
    }
}

impl From<ActionState> for WireState {
    fn from(state: ActionState) -> Self {
        match state {
            ActionState::Unresolved => WireState::default(),
            ActionState::Success => WireState {
                errors: None,
                ok: Some(true),
            },
            ActionState::Failure(errors) => WireState {
                errors: Some(errors),
                ok: None,
            },
        }
    }
}

/// Runs one form action and never fails.
///
/// Reads exactly `keys` from `source`, validates them with `schema`, and only
/// on success awaits `operation`. Validation issues become per-path errors.
/// An `Err` or panic from validation or `operation` is logged and replaced
/// by `{"form": default_error_message}`; the operation's own value is dropped.
pub async fn execute<Src, K, S, F, Fut, R>(
    source: &Src,
    keys: &[K],
    schema: &S,
    operation: F,
    default_error_message: &str,
) -> ActionState
where
    Src: FormSource + ?Sized,
    K: AsRef<str>,
    S: Schema + ?Sized,
    F: FnOnce(S::Output) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
{
    let outcome = AssertUnwindSafe(validate_then_run(source, keys, schema, operation))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(state)) => state,
        Ok(Err(err)) => {
            error!(error = %format!("{err:#}"), "form action failed");
            ActionState::form_error(default_error_message)
        }
        Err(panic) => {
            error!(panic = %panic_message(panic.as_ref()), "form action panicked");
            ActionState::form_error(default_error_message)
        }
    }
}

async fn validate_then_run<Src, K, S, F, Fut, R>(
    source: &Src,
    keys: &[K],
    schema: &S,
    operation: F,
) -> anyhow::Result<ActionState>
where
    Src: FormSource + ?Sized,
    K: AsRef<str>,
    S: Schema + ?Sized,
    F: FnOnce(S::Output) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
{
    let payload = RawPayload::extract(source, keys);
    let data = match schema.validate(&payload) {
        Ok(data) => data,
        Err(issues) => {
            debug!(issues = issues.len(), "form payload rejected");
            return Ok(ActionState::from_issues(issues));
        }
    };

    operation(data).await?;
    Ok(ActionState::Success)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
#[path = "tests/action_tests.rs"]
mod tests;
