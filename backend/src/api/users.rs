//! Person registration API handlers
//!
//! Contains HTTP request handlers for registering and looking up people.

use crate::api::state::AppState;
use crate::error::AppError;
use crate::registry::{PersonRecord, PhotoUpload, RecordState, RegistrationInput, RegistrationResult};
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Largest page a caller may request from `GET /users`
pub const MAX_PAGE_LIMIT: usize = 500;

/// Record response type
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    /// Record key
    pub key: String,
    /// Full name
    pub name: String,
    /// Phone number or email
    pub contact: String,
    /// Caller-defined category
    pub category: String,
    /// Photo URL, null if no photo was supplied
    pub photo_url: Option<String>,
    /// QR code reference, null while the registration is pending
    pub qr_code_url: Option<String>,
    /// `pending` or `complete`
    pub state: RecordState,
    /// Unix timestamp when the record was created
    pub created_at: i64,
    /// Unix timestamp when the record was last written
    pub updated_at: i64,
}

impl From<PersonRecord> for RecordResponse {
    fn from(record: PersonRecord) -> Self {
        Self {
            state: record.state(),
            key: record.key,
            name: record.name,
            contact: record.contact,
            category: record.category,
            photo_url: record.photo_url,
            qr_code_url: record.qr_code_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Query parameters for `GET /users`
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// Page size (1..=500)
    pub limit: Option<usize>,
    /// Return records with keys after this one
    pub after: Option<String>,
}

fn multipart_error(e: MultipartError, max_photo_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(max_photo_bytes)
    } else {
        AppError::InvalidInput(format!("Malformed multipart body: {}", e.body_text()))
    }
}

/// Parse the registration form
///
/// Fields: `name`, `naturalKey`, `contact`, `category` (text) and `photo`
/// (file). An empty `photo` part counts as no photo.
async fn read_registration_form(
    mut multipart: Multipart,
    max_photo_bytes: usize,
) -> Result<(RegistrationInput, Option<PhotoUpload>), AppError> {
    let mut input = RegistrationInput::default();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_photo_bytes))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "name" | "naturalKey" | "contact" | "category" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_photo_bytes))?;
                match field_name.as_str() {
                    "name" => input.name = text,
                    "naturalKey" => input.natural_key = Some(text),
                    "contact" => input.contact = text,
                    _ => input.category = text,
                }
            }
            "photo" => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_photo_bytes))?;
                if !data.is_empty() {
                    photo = Some(PhotoUpload::new(data.to_vec(), mime_type));
                }
            }
            _ => {
                warn!("Unknown multipart field: {}", field_name);
            }
        }
    }

    Ok((input, photo))
}

/// POST /register - Register a person from a multipart form
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RegistrationResult>, AppError> {
    let max_photo_bytes = state.registration.policy().max_photo_bytes;
    let (input, photo) = read_registration_form(multipart, max_photo_bytes).await?;
    let result = state.registration.register(input, photo).await?;
    Ok(Json(result))
}

/// GET /users/:key - Get a record by key
pub async fn get_user(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RecordResponse>, AppError> {
    let record = state.lookup.get_by_key(&key).await?;
    Ok(Json(RecordResponse::from(record)))
}

/// GET /users - List records, optionally one page at a time
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    let records = if query.limit.is_none() && query.after.is_none() {
        state.lookup.list_all().try_collect::<Vec<_>>().await?
    } else {
        let limit = query.limit.unwrap_or(crate::services::lookup::DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        state
            .lookup
            .list_page(query.after.as_deref(), limit)
            .await?
    };

    Ok(Json(records.into_iter().map(RecordResponse::from).collect()))
}

/// POST /users/:key/complete - Finish a pending registration
pub async fn complete_user(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RegistrationResult>, AppError> {
    let result = state.registration.complete(&key).await?;
    Ok(Json(result))
}
