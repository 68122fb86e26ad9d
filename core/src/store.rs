//! Observable client-side mirror of the notes service.
//!
//! # Design
//! `NotesStore` publishes a `NotesState` snapshot through a
//! `tokio::sync::watch` channel. Every operation has the same shape: raise
//! `loading` and clear `error`, run the remote call, apply the
//! operation-specific change to `notes` on success or record the error on
//! failure, then drop `loading`. `loading` is cleared by a guard, so it also
//! resets when the operation's future is dropped before completing.
//!
//! Notes are held as `Arc<Note>`; an operation only allocates for the notes it
//! actually replaces, and unchanged notes stay pointer-equal across states.
//!
//! Concurrent operations are not serialized. Each mutation is applied when
//! its response arrives, and whichever operation finishes last decides the
//! final `loading` and `error` values.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::NotesApi;
use crate::config::Config;
use crate::error::{ApiError, Operation, StoreError};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{NewNote, Note, UpdateNote};

/// Snapshot of everything a UI renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotesState {
    /// Display order: newest first after a load.
    pub notes: Vec<Arc<Note>>,
    pub loading: bool,
    pub error: Option<StoreError>,
}

pub struct NotesStore<T = ReqwestTransport> {
    api: NotesApi<T>,
    state: watch::Sender<NotesState>,
}

impl NotesStore<ReqwestTransport> {
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, ReqwestTransport::new())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base_url)
    }
}

impl<T: Transport> NotesStore<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        let (state, _) = watch::channel(NotesState::default());
        Self {
            api: NotesApi::with_transport(base_url, transport),
            state,
        }
    }

    pub fn api(&self) -> &NotesApi<T> {
        &self.api
    }

    pub fn subscribe(&self) -> watch::Receiver<NotesState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> NotesState {
        self.state.borrow().clone()
    }

    pub fn notes(&self) -> Vec<Arc<Note>> {
        self.state.borrow().notes.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<StoreError> {
        self.state.borrow().error.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.state.borrow().error.as_ref().map(StoreError::message)
    }

    /// Replace `notes` with the server's list, newest first.
    pub async fn load_notes(&self) -> Result<(), StoreError> {
        let _loading = self.begin();
        let fetched = self
            .api
            .fetch_notes()
            .await
            .map_err(|e| self.fail(Operation::Load, e))?;

        let notes = sort_newest_first(fetched);
        tracing::debug!(count = notes.len(), "notes loaded");
        self.state.send_modify(|state| {
            state.notes = notes.into_iter().map(Arc::new).collect();
        });
        Ok(())
    }

    /// Create a note and put it at the front of `notes`.
    pub async fn add_note(&self, input: &NewNote) -> Result<(), StoreError> {
        let _loading = self.begin();
        let created = self
            .api
            .create_note(input)
            .await
            .map_err(|e| self.fail(Operation::Add, e))?;

        tracing::debug!(note_id = %created.id, "note added");
        self.state.send_modify(|state| state.notes.insert(0, Arc::new(created)));
        Ok(())
    }

    /// Update a note and swap the server's version in at the same position.
    pub async fn edit_note(&self, id: &str, input: &UpdateNote) -> Result<(), StoreError> {
        let _loading = self.begin();
        let updated = self
            .api
            .update_note(id, input)
            .await
            .map_err(|e| self.fail(Operation::Edit { id: id.to_string() }, e))?;

        tracing::debug!(note_id = id, "note edited");
        let updated = Arc::new(updated);
        self.state.send_modify(|state| {
            for note in state.notes.iter_mut().filter(|note| note.id == id) {
                *note = Arc::clone(&updated);
            }
        });
        Ok(())
    }

    /// Delete a note. Removing an id that is not in `notes` is not an error.
    pub async fn remove_note(&self, id: &str) -> Result<(), StoreError> {
        let _loading = self.begin();
        self.api
            .delete_note(id)
            .await
            .map_err(|e| self.fail(Operation::Remove { id: id.to_string() }, e))?;

        tracing::debug!(note_id = id, "note removed");
        self.state.send_modify(|state| state.notes.retain(|note| note.id != id));
        Ok(())
    }

    fn begin(&self) -> LoadingGuard<'_> {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        LoadingGuard { state: &self.state }
    }

    fn fail(&self, operation: Operation, source: ApiError) -> StoreError {
        let err = StoreError::new(operation, source);
        self.state.send_modify(|state| state.error = Some(err.clone()));
        err
    }
}

/// Clears `loading` when dropped.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<NotesState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.loading = false);
    }
}

/// Stable sort, newest `createdAt` first. Offsetless timestamps count as
/// UTC; notes whose timestamp does not parse go last, in server order.
fn sort_newest_first(mut notes: Vec<Note>) -> Vec<Note> {
    notes.sort_by_cached_key(|note| std::cmp::Reverse(note.created_at_timestamp()));
    notes
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::oneshot;

    use super::*;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    const BASE_URL: &str = "http://notes.test";

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn reply(self, status: u16, body: &str) -> Self {
            self.push(status, body);
            self
        }

        fn fail(self, err: ApiError) -> Self {
            self.push_err(err);
            self
        }

        fn push(&self, status: u16, body: &str) {
            self.responses.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            }));
        }

        fn push_err(&self, err: ApiError) {
            self.responses.lock().unwrap().push_back(Err(err));
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        }
    }

    /// Holds the single request open until the test releases it.
    struct GatedTransport {
        gate: Mutex<Option<oneshot::Receiver<HttpResponse>>>,
    }

    impl Transport for GatedTransport {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let gate = self.gate.lock().unwrap().take().expect("gate already used");
            gate.await.map_err(|e| ApiError::Network(e.to_string()))
        }
    }

    fn gated() -> (oneshot::Sender<HttpResponse>, Arc<NotesStore<GatedTransport>>) {
        let (tx, rx) = oneshot::channel();
        let transport = GatedTransport {
            gate: Mutex::new(Some(rx)),
        };
        (tx, Arc::new(NotesStore::with_transport(BASE_URL, transport)))
    }

    fn note_json(id: &str, created_at: &str) -> String {
        format!(r#"{{"id":"{id}","title":"T{id}","content":"c{id}","createdAt":"{created_at}"}}"#)
    }

    fn list_json(notes: &[(&str, &str)]) -> String {
        let items: Vec<String> = notes.iter().map(|(id, ts)| note_json(id, ts)).collect();
        format!("[{}]", items.join(","))
    }

    fn ids(store: &NotesStore<impl Transport>) -> Vec<String> {
        store.notes().iter().map(|note| note.id.clone()).collect()
    }

    async fn loaded(transport: ScriptedTransport, notes: &[(&str, &str)]) -> NotesStore<ScriptedTransport> {
        let store = NotesStore::with_transport(BASE_URL, transport.reply(200, &list_json(notes)));
        store.load_notes().await.unwrap();
        store
    }

    #[tokio::test]
    async fn load_sorts_newest_first_and_keeps_server_order_for_ties() {
        let store = loaded(
            ScriptedTransport::default(),
            &[
                ("a", "2024-01-01T00:00:00Z"),
                ("b", "2024-01-03T00:00:00Z"),
                ("c", "2024-01-02T00:00:00Z"),
                ("d", "2024-01-03T00:00:00Z"),
                ("e", "not a date"),
                ("f", "2024-01-02T01:00:00+01:00"),
            ],
        )
        .await;

        assert_eq!(ids(&store), ["b", "d", "c", "f", "a", "e"]);
        let state = store.state();
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn load_issues_get_on_notes() {
        let store = loaded(ScriptedTransport::default(), &[]).await;
        let requests = store.api().transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].path, "http://notes.test/notes");
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_notes() {
        let store = loaded(ScriptedTransport::default(), &[("1", "2024-01-01T00:00:00Z")]).await;
        let before = store.notes();
        store.api().transport().push(503, "maintenance");

        let err = store.load_notes().await.unwrap_err();
        assert_eq!(err.operation, Operation::Load);
        assert_eq!(store.notes(), before);
        assert_eq!(
            store.error_message().as_deref(),
            Some("HTTP error, status: 503, message: maintenance")
        );
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn add_prepends_without_resorting() {
        let store = loaded(ScriptedTransport::default(), &[("1", "2024-01-01T00:00:00Z")]).await;
        store.api().transport().push(201, &note_json("2", "2023-06-01T00:00:00Z"));

        store.add_note(&NewNote::new("B", "y")).await.unwrap();

        assert_eq!(ids(&store), ["2", "1"]);
        let requests = store.api().transport().requests();
        let body: serde_json::Value =
            serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["title"], "B");
        assert!(body["createdAt"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn edit_replaces_in_place_and_leaves_others_untouched() {
        let store = loaded(
            ScriptedTransport::default(),
            &[
                ("1", "2024-01-03T00:00:00Z"),
                ("2", "2024-01-02T00:00:00Z"),
                ("3", "2024-01-01T00:00:00Z"),
            ],
        )
        .await;
        let before = store.notes();
        store.api().transport().push(
            200,
            r#"{"id":"2","title":"edited","content":"c2","createdAt":"2024-01-02T00:00:00Z"}"#,
        );

        let patch = UpdateNote {
            title: Some("edited".to_string()),
            ..UpdateNote::default()
        };
        store.edit_note("2", &patch).await.unwrap();

        let after = store.notes();
        assert_eq!(ids(&store), ["1", "2", "3"]);
        assert_eq!(after[1].title, "edited");
        assert!(Arc::ptr_eq(&before[0], &after[0]));
        assert!(Arc::ptr_eq(&before[2], &after[2]));
        assert!(!Arc::ptr_eq(&before[1], &after[1]));
    }

    #[tokio::test]
    async fn failed_edit_reports_and_keeps_notes() {
        let store = loaded(ScriptedTransport::default(), &[("1", "2024-01-01T00:00:00Z")]).await;
        let before = store.notes();
        store
            .api()
            .transport()
            .push_err(ApiError::Network("connection refused".to_string()));

        let err = store.edit_note("1", &UpdateNote::default()).await.unwrap_err();
        assert_eq!(err.operation, Operation::Edit { id: "1".to_string() });
        assert_eq!(err.source, ApiError::Network("connection refused".to_string()));
        assert_eq!(store.notes(), before);
        assert_eq!(store.error(), Some(err));
    }

    #[tokio::test]
    async fn remove_drops_matching_note() {
        let store = loaded(
            ScriptedTransport::default(),
            &[("1", "2024-01-02T00:00:00Z"), ("2", "2024-01-01T00:00:00Z")],
        )
        .await;
        store.api().transport().push(204, "");

        store.remove_note("1").await.unwrap();
        assert_eq!(ids(&store), ["2"]);
    }

    #[tokio::test]
    async fn remove_unknown_id_is_a_no_op() {
        let store = loaded(ScriptedTransport::default(), &[("1", "2024-01-01T00:00:00Z")]).await;
        let before = store.notes();
        store.api().transport().push(200, "");

        store.remove_note("missing").await.unwrap();
        assert_eq!(store.notes(), before);
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn remove_not_found_sets_error_and_keeps_notes() {
        let store = loaded(ScriptedTransport::default(), &[("1", "2024-01-01T00:00:00Z")]).await;
        store.api().transport().push(404, "not found");

        store.remove_note("1").await.unwrap_err();
        assert!(store.error_message().unwrap().contains("not found"));
        assert_eq!(ids(&store), ["1"]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn empty_error_body_uses_operation_message() {
        let store = NotesStore::with_transport(BASE_URL, ScriptedTransport::default().reply(500, ""));
        store.remove_note("9").await.unwrap_err();
        assert_eq!(
            store.error_message().as_deref(),
            Some("Failed to delete note with id = 9 (HTTP 500)")
        );
    }

    #[tokio::test]
    async fn next_operation_clears_previous_error() {
        let transport = ScriptedTransport::default()
            .fail(ApiError::Network("offline".to_string()))
            .reply(200, "[]");
        let store = NotesStore::with_transport(BASE_URL, transport);

        store.load_notes().await.unwrap_err();
        assert!(store.error().is_some());

        store.load_notes().await.unwrap();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn decode_failure_is_reported() {
        let store = NotesStore::with_transport(BASE_URL, ScriptedTransport::default().reply(200, "{"));
        let err = store.load_notes().await.unwrap_err();
        assert!(matches!(err.source, ApiError::Decode(_)));
        assert!(store.notes().is_empty());
    }

    #[tokio::test]
    async fn loading_is_true_only_while_request_is_in_flight() {
        let (tx, store) = gated();
        let mut state = store.subscribe();
        assert!(!state.borrow().loading);

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.load_notes().await }
        });

        state.wait_for(|s| s.loading).await.unwrap();
        assert!(store.error().is_none());

        tx.send(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: list_json(&[("1", "2024-01-01T00:00:00Z")]),
        })
        .unwrap();
        task.await.unwrap().unwrap();

        let state = store.state();
        assert!(!state.loading);
        assert_eq!(state.notes.len(), 1);
    }

    #[tokio::test]
    async fn loading_is_cleared_on_failure() {
        let (tx, store) = gated();
        let mut state = store.subscribe();
        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.add_note(&NewNote::new("a", "b")).await }
        });

        state.wait_for(|s| s.loading).await.unwrap();
        drop(tx);

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err.source, ApiError::Network(_)));
        assert!(!store.is_loading());
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn loading_is_cleared_when_operation_is_dropped() {
        let (_tx, store) = gated();
        let mut state = store.subscribe();
        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.load_notes().await }
        });

        state.wait_for(|s| s.loading).await.unwrap();
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!store.is_loading());
        assert!(store.error().is_none());
    }

    #[test]
    fn sort_reads_offsetless_and_date_only_timestamps() {
        let notes: Vec<Note> = serde_json::from_str(&list_json(&[
            ("old", "2024-01-01T00:00:00Z"),
            ("naive", "2024-06-01T00:00:00"),
            ("date_only", "2024-03-01"),
            ("garbage", "soon"),
        ]))
        .unwrap();

        let order: Vec<String> = sort_newest_first(notes)
            .into_iter()
            .map(|note| note.id)
            .collect();
        assert_eq!(order, ["naive", "date_only", "old", "garbage"]);
    }

    #[tokio::test]
    async fn loading_is_true_while_edit_is_in_flight() {
        let (tx, store) = gated();
        let mut state = store.subscribe();
        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move {
                let patch = UpdateNote {
                    title: Some("renamed".to_string()),
                    ..UpdateNote::default()
                };
                store.edit_note("1", &patch).await
            }
        });

        state.wait_for(|s| s.loading).await.unwrap();
        assert!(store.error().is_none());

        tx.send(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: note_json("1", "2024-01-01T00:00:00Z"),
        })
        .unwrap();
        task.await.unwrap().unwrap();

        assert!(!store.is_loading());
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn loading_is_true_while_remove_is_in_flight() {
        let (tx, store) = gated();
        let mut state = store.subscribe();
        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.remove_note("1").await }
        });

        state.wait_for(|s| s.loading).await.unwrap();
        assert!(store.error().is_none());

        tx.send(HttpResponse {
            status: 404,
            headers: Vec::new(),
            body: "not found".to_string(),
        })
        .unwrap();
        let err = task.await.unwrap().unwrap_err();

        assert!(err.source.is_not_found());
        assert!(!store.is_loading());
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn subscribers_are_notified() {
        let store = NotesStore::with_transport(
            BASE_URL,
            ScriptedTransport::default().reply(201, &note_json("1", "2024-01-01T00:00:00Z")),
        );
        let mut state = store.subscribe();

        store.add_note(&NewNote::new("T1", "c1")).await.unwrap();

        assert!(state.has_changed().unwrap());
        let snapshot = state.borrow_and_update();
        assert_eq!(snapshot.notes.len(), 1);
        assert!(!snapshot.loading);
    }
}
