use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const NOT_FOUND_BODY: &str = "note not found";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct CreateNote {
    pub title: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Server-owned keys a request body may not set through `extra`.
const READ_ONLY_FIELDS: [&str; 2] = ["id", "createdAt"];

/// Notes in insertion order.
pub type Db = Arc<RwLock<Vec<Note>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{id}", put(update_note).delete(delete_note))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_notes(State(db): State<Db>) -> Json<Vec<Note>> {
    Json(db.read().await.clone())
}

async fn create_note(
    State(db): State<Db>,
    Json(input): Json<CreateNote>,
) -> (StatusCode, Json<Note>) {
    let note = Note {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        content: input.content,
        created_at: input
            .created_at
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        color: input.color,
        extra: input
            .extra
            .into_iter()
            .filter(|(key, _)| !READ_ONLY_FIELDS.contains(&key.as_str()))
            .collect(),
    };
    tracing::info!(id = %note.id, "note created");
    db.write().await.push(note.clone());
    (StatusCode::CREATED, Json(note))
}

async fn update_note(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateNote>,
) -> Result<Json<Note>, (StatusCode, &'static str)> {
    let mut notes = db.write().await;
    let note = notes
        .iter_mut()
        .find(|note| note.id == id)
        .ok_or((StatusCode::NOT_FOUND, NOT_FOUND_BODY))?;
    if let Some(title) = input.title {
        note.title = title;
    }
    if let Some(content) = input.content {
        note.content = content;
    }
    if let Some(color) = input.color {
        note.color = Some(color);
    }
    for (key, value) in input.extra {
        if !READ_ONLY_FIELDS.contains(&key.as_str()) {
            note.extra.insert(key, value);
        }
    }
    Ok(Json(note.clone()))
}

async fn delete_note(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, &'static str)> {
    let mut notes = db.write().await;
    let before = notes.len();
    notes.retain(|note| note.id != id);
    if notes.len() == before {
        return Err((StatusCode::NOT_FOUND, NOT_FOUND_BODY));
    }
    Ok(StatusCode::NO_CONTENT)
}
