//! Registry data models
//!
//! Defines the person record and the inputs/outputs of the registration flow.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identifier of a person record (natural key or store-generated)
pub type RecordKey = String;

/// Completion state of a person record
///
/// A record is created without its QR code and patched once the QR code
/// (derived from the record's own key) is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Created, QR code not yet back-filled
    Pending,
    /// QR code set
    Complete,
}

/// A registered person, as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PersonRecord {
    /// Primary key
    pub key: RecordKey,
    /// Full name
    pub name: String,
    /// Phone number or email
    pub contact: String,
    /// Caller-defined category (ticket type, consent flag, ...)
    pub category: String,
    /// Public URL of the uploaded photo, if one was supplied
    pub photo_url: Option<String>,
    /// Renderable QR code image reference, set by the back-fill write
    pub qr_code_url: Option<String>,
    /// When the record was created (Unix timestamp)
    pub created_at: i64,
    /// When the record was last written (Unix timestamp)
    pub updated_at: i64,
}

impl PersonRecord {
    /// Current completion state
    pub fn state(&self) -> RecordState {
        match self.qr_code_url {
            Some(_) => RecordState::Complete,
            None => RecordState::Pending,
        }
    }
}

/// Fields for the first write of a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    /// Natural key; `None` lets the store assign one
    pub key: Option<RecordKey>,
    /// Full name
    pub name: String,
    /// Phone number or email
    pub contact: String,
    /// Caller-defined category
    pub category: String,
    /// Photo URL from the upload step
    pub photo_url: Option<String>,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    /// New photo URL
    pub photo_url: Option<String>,
    /// New QR code reference
    pub qr_code_url: Option<String>,
}

impl RecordPatch {
    /// Patch that only sets the QR code
    pub fn qr_code(url: impl Into<String>) -> Self {
        Self {
            qr_code_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// True if the patch would not change anything
    pub fn is_empty(&self) -> bool {
        self.photo_url.is_none() && self.qr_code_url.is_none()
    }
}

/// Caller-supplied registration fields
///
/// Values are kept as received; presence is checked by the registration
/// service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationInput {
    /// Full name
    pub name: String,
    /// Caller-supplied unique key (e.g. a national ID)
    pub natural_key: Option<String>,
    /// Phone number or email
    pub contact: String,
    /// Caller-defined category
    pub category: String,
}

/// Raw photo bytes with their declared MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    /// Image content
    pub bytes: Vec<u8>,
    /// Declared MIME type (e.g. `image/jpeg`)
    pub mime_type: String,
}

impl PhotoUpload {
    /// Create a new photo upload
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Outcome of a completed registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    /// Key of the registered record
    pub key: RecordKey,
    /// URL encoded into the QR code
    pub lookup_url: String,
    /// Renderable QR code image reference
    pub qr_code_url: String,
}
