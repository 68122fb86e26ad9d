//! Stateless HTTP request builder and response parser for the notes API.
//!
//! # Design
//! `NotesClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Executing the round-trip is left to a `Transport`, keeping this module
//! deterministic and free of I/O.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{NewNote, Note, UpdateNote};

/// Synchronous, stateless client for the notes API.
#[derive(Debug, Clone)]
pub struct NotesClient {
    base_url: String,
}

/// Create body: the caller's fields plus the client-side creation time.
#[derive(Serialize)]
struct CreateNoteBody<'a> {
    #[serde(flatten)]
    note: &'a NewNote,
    #[serde(rename = "createdAt")]
    created_at: String,
}

impl NotesClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_notes(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/notes", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_create_note(
        &self,
        input: &NewNote,
        created_at: DateTime<Utc>,
    ) -> Result<HttpRequest, ApiError> {
        let payload = CreateNoteBody {
            note: input,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/notes", self.base_url),
            headers: json_headers(),
            body: Some(to_json(&payload)?),
        })
    }

    pub fn build_update_note(&self, id: &str, input: &UpdateNote) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: self.note_path(id),
            headers: json_headers(),
            body: Some(to_json(input)?),
        })
    }

    pub fn build_delete_note(&self, id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.note_path(id),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_list_notes(&self, response: HttpResponse) -> Result<Vec<Note>, ApiError> {
        check_status(&response)?;
        from_json(&response.body)
    }

    pub fn parse_create_note(&self, response: HttpResponse) -> Result<Note, ApiError> {
        check_status(&response)?;
        from_json(&response.body)
    }

    pub fn parse_update_note(&self, response: HttpResponse) -> Result<Note, ApiError> {
        check_status(&response)?;
        from_json(&response.body)
    }

    /// The body of a successful delete is ignored.
    pub fn parse_delete_note(&self, response: HttpResponse) -> Result<bool, ApiError> {
        check_status(&response)?;
        Ok(true)
    }

    fn note_path(&self, id: &str) -> String {
        format!("{}/notes/{}", self.base_url, urlencoding::encode(id))
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Map any non-2xx status to `ApiError::Remote`, keeping the body as text.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Remote {
        status: response.status,
        body: response.body.clone(),
    })
}
