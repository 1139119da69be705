//! Client side of the todo service: the HTTP API client and the form
//! submission pipeline that drives it.
//!
//! A submission flows one way: a [`FormData`] is handed to a
//! [`SubmissionController`], whose bound [`FormAction`] calls
//! [`action::execute`] to extract and validate the declared fields and, only
//! when they pass, run the remote operation. The resulting [`ActionState`]
//! comes back to the controller, which exposes it to the view and fires the
//! matching lifecycle callback once.

pub mod action;
pub mod error;
pub mod form;
pub mod schema;
pub mod submission;
pub mod todo_api;
pub mod todo_form;
pub mod transport;

pub use action::{execute, ActionState, FieldErrors, DEFAULT_ERROR_MESSAGE};
pub use error::TransportError;
pub use form::{FormData, FormSource, FormValue, RawPayload};
pub use schema::{field, FieldSchema, RecordSchema, Schema, TypedSchema, ValidationIssue};
pub use submission::{
    FormAction, LifecycleCallbacks, LifecycleDispatcher, LifecycleEvent, SubmissionController,
    SubmissionError, SubmissionSnapshot,
};
pub use todo_api::{HttpTodoApi, TodoApi};
pub use todo_form::{todo_schema, AddTodoAction};
pub use transport::ApiTransport;
