//! Error types for the notes client.
//!
//! # Design
//! `ApiError` is the structured failure of a single remote call. It is kept
//! intact through the store layer inside `StoreError`, which pairs it with the
//! operation that failed; only `StoreError`'s `Display` flattens it into the
//! string a UI shows.

use thiserror::Error;

/// Errors returned by the transport, the request builders and the response
/// parsers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response was received (connect, send or read failure).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP error, status: {status}, message: {body}")]
    Remote { status: u16, body: String },

    /// The response body was not valid JSON of the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request: {0}")]
    Serialization(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Remote { status: 404, .. })
    }

    /// Whether the error carries text worth showing on its own.
    pub fn has_detail(&self) -> bool {
        match self {
            ApiError::Remote { body, .. } => !body.trim().is_empty(),
            ApiError::Network(msg) | ApiError::Decode(msg) | ApiError::Serialization(msg) => {
                !msg.trim().is_empty()
            }
        }
    }
}

/// The store operation a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Load,
    Add,
    Edit { id: String },
    Remove { id: String },
}

impl Operation {
    /// Message shown when the underlying error has nothing better to say.
    pub fn fallback_message(&self) -> String {
        match self {
            Operation::Load => "Failed to load notes".to_string(),
            Operation::Add => "Failed to create note".to_string(),
            Operation::Edit { id } => format!("Failed to edit note with id = {id}"),
            Operation::Remove { id } => format!("Failed to delete note with id = {id}"),
        }
    }
}

/// A failed store operation, as published in `NotesState::error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct StoreError {
    pub operation: Operation,
    #[source]
    pub source: ApiError,
}

impl StoreError {
    pub fn new(operation: Operation, source: ApiError) -> Self {
        Self { operation, source }
    }

    /// Human-readable message for display.
    pub fn message(&self) -> String {
        if self.source.has_detail() {
            return self.source.to_string();
        }
        match &self.source {
            ApiError::Remote { status, .. } => {
                format!("{} (HTTP {status})", self.operation.fallback_message())
            }
            _ => self.operation.fallback_message(),
        }
    }
}
