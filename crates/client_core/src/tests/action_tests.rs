use super::*;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use anyhow::anyhow;
use indexmap::IndexMap;

use crate::{
    form::FormData,
    schema::{field, RecordSchema},
};

const KEYS: [&str; 2] = ["title", "description"];
const REQUIRED: &str = "Please enter a title";
const FAILED: &str = "Failed to create todo";

fn title_schema() -> RecordSchema {
    RecordSchema::new()
        .with(field("title").trim().min_length(1, REQUIRED))
        .with(field("description").optional())
}

#[derive(Clone, Default)]
struct Spy {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<IndexMap<String, String>>>>,
}

impl Spy {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, data: IndexMap<String, String>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().expect("lock").push(data);
    }
}

#[tokio::test]
async fn valid_payload_runs_operation_with_trimmed_data() {
    let spy = Spy::default();
    let form = FormData::from_pairs([("title", "  Buy milk  "), ("description", "")]);

    let state = execute(
        &form,
        &KEYS,
        &title_schema(),
        |data| {
            let spy = spy.clone();
            async move {
                spy.record(data);
                Ok::<_, anyhow::Error>("created")
            }
        },
        FAILED,
    )
    .await;

    assert_eq!(state, ActionState::Success);
    assert!(state.is_ok());
    assert!(state.errors().is_none());
    assert_eq!(spy.calls(), 1);
    let seen = spy.seen.lock().expect("lock");
    assert_eq!(seen[0].get("title").map(String::as_str), Some("Buy milk"));
    assert_eq!(seen[0].get("description").map(String::as_str), Some(""));
}

#[tokio::test]
async fn invalid_payload_never_reaches_operation() {
    let spy = Spy::default();
    let form = FormData::from_pairs([("title", ""), ("description", "x")]);

    let state = execute(
        &form,
        &KEYS,
        &title_schema(),
        |data| {
            let spy = spy.clone();
            async move {
                spy.record(data);
                Ok::<_, anyhow::Error>(())
            }
        },
        FAILED,
    )
    .await;

    let errors = state.errors().expect("failure");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.get("title"), Some(REQUIRED));
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn missing_declared_key_is_validated_as_empty_string() {
    let spy = Spy::default();
    let form = FormData::from_pairs([("description", "only this")]);

    let state = execute(
        &form,
        &KEYS,
        &title_schema(),
        |data| {
            let spy = spy.clone();
            async move {
                spy.record(data);
                Ok::<_, anyhow::Error>(())
            }
        },
        FAILED,
    )
    .await;

    assert_eq!(state.errors().and_then(|e| e.get("title")), Some(REQUIRED));
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn operation_error_collapses_to_default_form_message() {
    let form = FormData::from_pairs([("title", "Buy milk")]);

    for cause in ["API 500: database is locked", "connection refused", ""] {
        let state = execute(
            &form,
            &KEYS,
            &title_schema(),
            |_| async move { Err::<(), _>(anyhow!(cause.to_string())) },
            FAILED,
        )
        .await;

        let expected: FieldErrors = [("form", FAILED)].into_iter().collect();
        assert_eq!(state, ActionState::Failure(expected));
    }
}

#[tokio::test]
async fn panicking_operation_is_contained() {
    let form = FormData::from_pairs([("title", "Buy milk")]);

    let state = execute(
        &form,
        &KEYS,
        &title_schema(),
        |_| async move {
            if true {
                panic!("generated client bug");
            }
            Ok::<_, anyhow::Error>(())
        },
        FAILED,
    )
    .await;

    assert_eq!(state.errors().and_then(|e| e.get("form")), Some(FAILED));
}

#[test]
fn later_issue_for_same_path_overwrites_in_place() {
    let state = ActionState::from_issues([
        ValidationIssue::at("title", "first"),
        ValidationIssue::form("whole form"),
        ValidationIssue::at("title", "second"),
    ]);
    let errors = state.errors().expect("failure");
    let entries: Vec<_> = errors.iter().collect();
    assert_eq!(entries, vec![("title", "second"), ("form", "whole form")]);
}

#[test]
fn empty_issue_list_still_yields_non_empty_failure() {
    let state = ActionState::from_issues(Vec::new());
    assert_eq!(state.errors().map(FieldErrors::len), Some(1));
}

#[test]
fn wire_shape_matches_form_state_json() {
    assert_eq!(
        serde_json::to_value(ActionState::Unresolved).expect("json"),
        serde_json::json!({})
    );
    assert_eq!(
        serde_json::to_value(ActionState::Success).expect("json"),
        serde_json::json!({ "ok": true })
    );
    assert_eq!(
        serde_json::to_value(ActionState::form_error("nope")).expect("json"),
        serde_json::json!({ "errors": { "form": "nope" } })
    );

    let decoded: ActionState =
        serde_json::from_str(r#"{"errors":{},"ok":false}"#).expect("decode");
    assert_eq!(decoded, ActionState::Unresolved);
    let decoded: ActionState =
        serde_json::from_str(r#"{"errors":{"title":"t"},"ok":true}"#).expect("decode");
    assert!(decoded.errors().is_some());
}
