//! Client-side half of a form submission.
//!
//! A [`SubmissionController`] owns one action slot: it runs a bound
//! [`FormAction`] when triggered, exposes the pending/error/data snapshot to
//! the view, and turns state changes into one-shot lifecycle callbacks.
//!
//! Triggers are not serialized. Overlapping submissions run concurrently and
//! whichever resolves last is the state the view sees, even if it was
//! triggered first.
//!
//! Each trigger is spawned as its own task. A current-thread runtime starts
//! them in trigger order; a multi-thread runtime may start two back-to-back
//! triggers in either order.

use std::{panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::{
    action::{ActionState, FieldErrors, DEFAULT_ERROR_MESSAGE},
    form::FormData,
    schema::FORM_PATH,
};

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// A form action as seen from the view: previous state and a form in, new state out.
#[async_trait]
pub trait FormAction: Send + Sync + 'static {
    /// Field keys in form order; used to pick the headline error.
    fn declared_keys(&self) -> &[&str];

    async fn call(&self, previous: Arc<ActionState>, form: FormData) -> ActionState;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionError {
    pub message: String,
    pub errors: FieldErrors,
}

impl SubmissionError {
    /// `None` unless `state` carries errors.
    ///
    /// The headline message is the first declared key with an error, then the
    /// form-level error, then whatever was reported first.
    pub fn from_state<K: AsRef<str>>(state: &ActionState, declared_keys: &[K]) -> Option<Self> {
        let errors = state.errors()?;
        let message = declared_keys
            .iter()
            .map(|key| AsRef::<str>::as_ref(key))
            .chain([FORM_PATH])
            .find_map(|path| errors.get(path))
            .or_else(|| errors.first().map(|(_, message)| message))
            .filter(|message| !message.is_empty())
            .unwrap_or(GENERIC_ERROR_MESSAGE);

        Some(Self {
            message: message.to_string(),
            errors: errors.clone(),
        })
    }
}

type Callback = Box<dyn FnMut() + Send>;
type ErrorCallback = Box<dyn FnMut(&SubmissionError) + Send>;

#[derive(Default)]
pub struct LifecycleCallbacks {
    on_pending: Option<Callback>,
    on_success: Option<Callback>,
    on_error: Option<ErrorCallback>,
}

impl LifecycleCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_pending(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_pending = Some(Box::new(callback));
        self
    }

    pub fn on_success(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnMut(&SubmissionError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Pending,
    Success,
    Error,
}

/// Fires at most one callback per observed change.
///
/// Changes are detected by `Arc` identity of the state plus the pending flag,
/// so re-observing the same state value is a no-op.
pub struct LifecycleDispatcher {
    callbacks: LifecycleCallbacks,
    declared_keys: Vec<String>,
    previous: Arc<ActionState>,
    was_pending: bool,
}

impl LifecycleDispatcher {
    pub fn new<K: AsRef<str>>(
        callbacks: LifecycleCallbacks,
        declared_keys: &[K],
        initial: Arc<ActionState>,
    ) -> Self {
        Self {
            callbacks,
            declared_keys: declared_keys.iter().map(|k| k.as_ref().to_string()).collect(),
            previous: initial,
            was_pending: false,
        }
    }

    /// Returns the callback kind that fired, if any.
    pub fn observe(&mut self, state: &Arc<ActionState>, is_pending: bool) -> Option<LifecycleEvent> {
        let state_changed = !Arc::ptr_eq(state, &self.previous);
        let pending_started = is_pending && !self.was_pending;
        self.was_pending = is_pending;

        if !state_changed && !pending_started {
            return None;
        }
        self.previous = Arc::clone(state);

        if is_pending {
            if let Some(callback) = self.callbacks.on_pending.as_mut() {
                callback();
                return Some(LifecycleEvent::Pending);
            }
        }
        // Without an onPending handler a state landing mid-flight still reports.
        if !state_changed {
            return None;
        }

        match state.as_ref() {
            ActionState::Success => {
                let callback = self.callbacks.on_success.as_mut()?;
                callback();
                Some(LifecycleEvent::Success)
            }
            ActionState::Failure(_) => {
                let error = SubmissionError::from_state(state, self.declared_keys.as_slice())?;
                let callback = self.callbacks.on_error.as_mut()?;
                callback(&error);
                Some(LifecycleEvent::Error)
            }
            ActionState::Unresolved => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionSnapshot {
    pub is_pending: bool,
    pub error: Option<SubmissionError>,
    pub data: Arc<ActionState>,
}

#[derive(Debug, Clone)]
struct Slot {
    data: Arc<ActionState>,
    in_flight: usize,
}

pub struct SubmissionController<A: FormAction> {
    action: Arc<A>,
    slot: Arc<watch::Sender<Slot>>,
    observer: watch::Receiver<Slot>,
    dispatcher: LifecycleDispatcher,
}

impl<A: FormAction> SubmissionController<A> {
    pub fn bind(action: A, callbacks: LifecycleCallbacks) -> Self {
        let initial = Arc::new(ActionState::Unresolved);
        let dispatcher =
            LifecycleDispatcher::new(callbacks, action.declared_keys(), Arc::clone(&initial));
        let (slot, observer) = watch::channel(Slot {
            data: initial,
            in_flight: 0,
        });

        Self {
            action: Arc::new(action),
            slot: Arc::new(slot),
            observer,
            dispatcher,
        }
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    /// Starts a submission and returns immediately.
    ///
    /// The slot reads as pending before this returns. Must be called from
    /// within a Tokio runtime.
    pub fn trigger(&self, form: FormData) {
        let previous = Arc::clone(&self.slot.borrow().data);
        self.slot.send_modify(|slot| slot.in_flight += 1);

        let slot = Arc::clone(&self.slot);
        let action = Arc::clone(&self.action);
        tokio::spawn(async move {
            let next = AssertUnwindSafe(action.call(previous, form))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!("form action panicked outside the executor");
                    ActionState::form_error(DEFAULT_ERROR_MESSAGE)
                });
            debug!(ok = next.is_ok(), "submission resolved");

            slot.send_modify(|slot| {
                slot.data = Arc::new(next);
                slot.in_flight = slot.in_flight.saturating_sub(1);
            });
        });
    }

    /// Current view state, without dispatching callbacks.
    pub fn snapshot(&self) -> SubmissionSnapshot {
        let (data, is_pending) = {
            let slot = self.observer.borrow();
            (Arc::clone(&slot.data), slot.in_flight > 0)
        };
        let error = SubmissionError::from_state(&data, self.action.declared_keys());
        SubmissionSnapshot {
            is_pending,
            error,
            data,
        }
    }

    /// Current view state, firing whichever lifecycle callback it warrants.
    pub fn render(&mut self) -> SubmissionSnapshot {
        let snapshot = self.snapshot();
        self.dispatcher.observe(&snapshot.data, snapshot.is_pending);
        snapshot
    }

    /// Waits until the slot changes after the last `changed`/`settled` call.
    pub async fn changed(&mut self) {
        // The sender lives as long as `self`, so this cannot report closure.
        let _ = self.observer.changed().await;
    }

    /// Waits until no submission is in flight.
    pub async fn settled(&mut self) {
        let _ = self.observer.wait_for(|slot| slot.in_flight == 0).await;
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
