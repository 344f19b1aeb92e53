//! Registration service
//!
//! Runs the registration write path: validate, upload the photo, create the
//! record, then derive the QR code from the record's key and back-fill it.
//!
//! The QR code embeds the lookup URL, which embeds the key, so the record has
//! to exist before its QR code can be computed. Registration is therefore two
//! writes with a visible intermediate state:
//!
//! ```text
//!  create ──► PendingRegistration ──(encode + patch)──► RegistrationResult
//! ```
//!
//! If the patch fails the record stays pending. Nothing is rolled back and
//! nothing is retried; `complete` finishes such a record later.

use crate::config::{QrDelivery, RegistrationConfig};
use crate::error::AppError;
use crate::registry::{
    NewPerson, ObjectStore, PhotoUpload, QrEncoder, RecordKey, RecordPatch, RecordStore,
    RegistrationInput, RegistrationResult, StoreError,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Path segment of the public lookup page
pub const LOOKUP_PATH: &str = "usuario";

/// A record that has been created but has no QR code yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRegistration {
    key: RecordKey,
    lookup_url: String,
}

impl PendingRegistration {
    /// Key of the created record
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Lookup URL derived from the key
    pub fn lookup_url(&self) -> &str {
        &self.lookup_url
    }

    /// Consume the pending state once the QR code has been written
    fn complete(self, qr_code_url: String) -> RegistrationResult {
        RegistrationResult {
            key: self.key,
            lookup_url: self.lookup_url,
            qr_code_url,
        }
    }
}

/// Registration orchestrator
///
/// Holds injected collaborator handles; constructed once at startup and
/// shared across requests.
pub struct RegistrationService {
    store: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    qr: Arc<dyn QrEncoder>,
    policy: RegistrationConfig,
}

impl RegistrationService {
    /// Create a new registration service
    pub fn new(
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        qr: Arc<dyn QrEncoder>,
        policy: RegistrationConfig,
    ) -> Self {
        Self {
            store,
            objects,
            qr,
            policy,
        }
    }

    /// Registration policy in effect
    pub fn policy(&self) -> &RegistrationConfig {
        &self.policy
    }

    /// Lookup URL for a key: `{base}/usuario/{key}`
    pub fn lookup_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.policy.public_base_url.trim_end_matches('/'),
            LOOKUP_PATH,
            key
        )
    }

    /// Register a person
    ///
    /// # Arguments
    /// * `input` - Caller-supplied fields
    /// * `photo` - Optional photo bytes with their MIME type
    ///
    /// # Returns
    /// * `Ok(RegistrationResult)` - The record is complete
    /// * `Err(AppError)` - Validation, conflict or collaborator failure. A
    ///   failure after the record was created leaves it pending.
    pub async fn register(
        &self,
        input: RegistrationInput,
        photo: Option<PhotoUpload>,
    ) -> Result<RegistrationResult, AppError> {
        let (person, photo) = self.validate(input, photo)?;

        if let Some(key) = &person.key {
            if self.store.exists(key).await? {
                return Err(AppError::Conflict(key.clone()));
            }
        }

        let mut person = person;
        if let Some(photo) = photo {
            let stored = self.objects.upload(photo.bytes, &photo.mime_type).await?;
            debug!(photo_url = %stored.url, "Uploaded photo");
            person.photo_url = Some(stored.url);
        }

        let pending = self.create(person).await?;
        info!(key = %pending.key(), "Created pending registration");

        let result = self.back_fill_qr(pending).await?;
        info!(key = %result.key, "Registration complete");
        Ok(result)
    }

    /// Finish a pending registration
    ///
    /// Idempotent: a complete record is returned as-is without writes.
    pub async fn complete(&self, key: &str) -> Result<RegistrationResult, AppError> {
        let record = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| AppError::NotFound(key.to_string()))?;

        let lookup_url = self.lookup_url(&record.key);
        if let Some(qr_code_url) = record.qr_code_url {
            return Ok(RegistrationResult {
                key: record.key,
                lookup_url,
                qr_code_url,
            });
        }

        info!(key = %record.key, "Completing pending registration");
        self.back_fill_qr(PendingRegistration {
            key: record.key,
            lookup_url,
        })
        .await
    }

    /// Check required fields and photo constraints, producing the first write
    fn validate(
        &self,
        input: RegistrationInput,
        photo: Option<PhotoUpload>,
    ) -> Result<(NewPerson, Option<PhotoUpload>), AppError> {
        let natural_key = input
            .natural_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let photo = photo.filter(|p| !p.bytes.is_empty());

        let mut missing = Vec::new();
        if input.name.trim().is_empty() {
            missing.push("name".to_string());
        }
        if self.policy.require_natural_key && natural_key.is_none() {
            missing.push("naturalKey".to_string());
        }
        if input.contact.trim().is_empty() {
            missing.push("contact".to_string());
        }
        if input.category.trim().is_empty() {
            missing.push("category".to_string());
        }
        if self.policy.require_photo && photo.is_none() {
            missing.push("photo".to_string());
        }
        if !missing.is_empty() {
            return Err(AppError::MissingFields(missing));
        }

        if let Some(key) = &natural_key {
            validate_key(key)?;
        }

        if let Some(photo) = &photo {
            if !photo.mime_type.starts_with("image/") {
                return Err(AppError::UnsupportedMedia(photo.mime_type.clone()));
            }
            if photo.bytes.len() > self.policy.max_photo_bytes {
                return Err(AppError::PayloadTooLarge(self.policy.max_photo_bytes));
            }
        }

        let person = NewPerson {
            key: natural_key,
            name: input.name.trim().to_string(),
            contact: input.contact.trim().to_string(),
            category: input.category.trim().to_string(),
            photo_url: None,
        };
        Ok((person, photo))
    }

    /// First write
    async fn create(&self, person: NewPerson) -> Result<PendingRegistration, AppError> {
        let key = match self.store.create(person).await {
            Ok(key) => key,
            // Lost the race between `exists` and `create`
            Err(StoreError::AlreadyExists(key)) => {
                warn!(key = %key, "Concurrent registration won the create");
                return Err(AppError::Conflict(key));
            }
            Err(e) => return Err(e.into()),
        };

        let lookup_url = self.lookup_url(&key);
        Ok(PendingRegistration { key, lookup_url })
    }

    /// Second write: encode the lookup URL and patch the QR code in
    async fn back_fill_qr(
        &self,
        pending: PendingRegistration,
    ) -> Result<RegistrationResult, AppError> {
        let image = self.qr.encode(pending.lookup_url())?;

        let qr_code_url = match self.policy.qr_delivery {
            QrDelivery::Inline => image.to_data_uri(),
            QrDelivery::Upload => {
                self.objects
                    .upload(image.bytes, &image.mime_type)
                    .await?
                    .url
            }
        };

        if let Err(e) = self
            .store
            .update(pending.key(), RecordPatch::qr_code(qr_code_url.clone()))
            .await
        {
            warn!(key = %pending.key(), error = %e, "QR back-fill failed, record left pending");
            return Err(e.into());
        }

        Ok(pending.complete(qr_code_url))
    }
}

/// Natural keys end up in URL paths
fn validate_key(key: &str) -> Result<(), AppError> {
    if key.len() > 128 {
        return Err(AppError::InvalidInput(
            "naturalKey must be at most 128 characters".to_string(),
        ));
    }
    if key
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#' | '%'))
    {
        return Err(AppError::InvalidInput(format!(
            "naturalKey contains invalid characters: {}",
            key
        )));
    }
    if key == "." || key == ".." {
        return Err(AppError::InvalidInput(format!(
            "naturalKey cannot be a dot segment: {}",
            key
        )));
    }
    Ok(())
}
