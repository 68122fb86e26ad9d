//! Client core for the notes service.
//!
//! # Overview
//! Two layers. The transport client (`NotesClient` + `Transport`, combined in
//! `NotesApi`) turns list/create/update/delete into HTTP calls against
//! `{base_url}/notes`. `NotesStore` drives those calls and publishes the
//! resulting notes, `loading` flag and last error as an observable
//! `NotesState`.
//!
//! # Design
//! - `NotesClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`, and a `Transport` sits between.
//! - Errors stay structured (`ApiError`, wrapped in `StoreError`) all the
//!   way into the state; formatting for display happens last.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod store;
pub mod transport;
pub mod types;

pub use api::NotesApi;
pub use client::NotesClient;
pub use config::{Config, ConfigError};
pub use error::{ApiError, Operation, StoreError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use store::{NotesState, NotesStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{NewNote, Note, UpdateNote};
