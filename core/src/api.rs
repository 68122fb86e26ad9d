//! The four remote note operations, each a full build/execute/parse round-trip.
//!
//! Every failure is logged here, where the operation is known, and then
//! returned unchanged.

use chrono::Utc;

use crate::client::NotesClient;
use crate::error::ApiError;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{NewNote, Note, UpdateNote};

#[derive(Debug, Clone)]
pub struct NotesApi<T = ReqwestTransport> {
    client: NotesClient,
    transport: T,
}

impl NotesApi<ReqwestTransport> {
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, ReqwestTransport::new())
    }
}

impl<T: Transport> NotesApi<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            client: NotesClient::new(base_url),
            transport,
        }
    }

    pub fn client(&self) -> &NotesClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `GET /notes`.
    pub async fn fetch_notes(&self) -> Result<Vec<Note>, ApiError> {
        let result: Result<Vec<Note>, ApiError> = async {
            let response = self.transport.execute(self.client.build_list_notes()).await?;
            self.client.parse_list_notes(response)
        }
        .await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Error fetching notes");
        }
        result
    }

    /// `POST /notes`, stamping `createdAt` with the current time.
    pub async fn create_note(&self, input: &NewNote) -> Result<Note, ApiError> {
        let result: Result<Note, ApiError> = async {
            let request = self.client.build_create_note(input, Utc::now())?;
            let response = self.transport.execute(request).await?;
            self.client.parse_create_note(response)
        }
        .await;
        if let Err(e) = &result {
            tracing::error!(error = %e, title = %input.title, "Error creating note");
        }
        result
    }

    /// `PUT /notes/{id}` with only the fields set in `input`.
    pub async fn update_note(&self, id: &str, input: &UpdateNote) -> Result<Note, ApiError> {
        let result: Result<Note, ApiError> = async {
            let request = self.client.build_update_note(id, input)?;
            let response = self.transport.execute(request).await?;
            self.client.parse_update_note(response)
        }
        .await;
        if let Err(e) = &result {
            tracing::error!(error = %e, note_id = id, "Error updating note");
        }
        result
    }

    /// `DELETE /notes/{id}`. Returns `true` on any 2xx.
    pub async fn delete_note(&self, id: &str) -> Result<bool, ApiError> {
        let result: Result<bool, ApiError> = async {
            let response = self.transport.execute(self.client.build_delete_note(id)).await?;
            self.client.parse_delete_note(response)
        }
        .await;
        if let Err(e) = &result {
            tracing::error!(error = %e, note_id = id, "Error deleting note");
        }
        result
    }
}
