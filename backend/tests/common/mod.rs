//! Common test utilities: in-memory collaborators with call counters and
//! failure switches.

#![allow(dead_code)]

use async_trait::async_trait;
use person_registry_backend::config::{QrDelivery, RegistrationConfig};
use person_registry_backend::registry::{
    EncodeError, NewPerson, ObjectStore, PersonRecord, QrEncoder, QrImage, RecordKey, RecordPatch,
    RecordStore, StoreError, StoredObject, SvgQrEncoder, UploadError,
};
use person_registry_backend::services::{LookupService, RegistrationService};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "http://localhost:3000";

/// Registration policy used by most tests: natural key required, photo optional
pub fn test_policy() -> RegistrationConfig {
    RegistrationConfig {
        public_base_url: BASE_URL.to_string(),
        require_natural_key: true,
        require_photo: false,
        max_photo_bytes: 1024,
        qr_delivery: QrDelivery::Inline,
    }
}

/// Record store backed by a `BTreeMap`
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<RecordKey, PersonRecord>>,
    next_id: AtomicUsize,
    pub exists_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    /// Make `create` fail
    pub fail_create: AtomicBool,
    /// Make `update` fail
    pub fail_update: AtomicBool,
    /// Make `exists` always answer `false`, as if a concurrent writer had
    /// not committed yet
    pub blind_exists: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn writes(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst) + self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.blind_exists.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.records.lock().unwrap().contains_key(key))
    }

    async fn create(&self, person: NewPerson) -> Result<RecordKey, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("create failed".to_string()));
        }

        let key = person.key.unwrap_or_else(|| {
            format!("gen-{:04}", self.next_id.fetch_add(1, Ordering::SeqCst))
        });

        let mut records = self.records.lock().unwrap();
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        records.insert(
            key.clone(),
            PersonRecord {
                key: key.clone(),
                name: person.name,
                contact: person.contact,
                category: person.category,
                photo_url: person.photo_url,
                qr_code_url: None,
                created_at: 1_700_000_000,
                updated_at: 1_700_000_000,
            },
        );
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Option<PersonRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn update(&self, key: &str, patch: RecordPatch) -> Result<(), StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("update failed".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if let Some(photo_url) = patch.photo_url {
            record.photo_url = Some(photo_url);
        }
        if let Some(qr_code_url) = patch.qr_code_url {
            record.qr_code_url = Some(qr_code_url);
        }
        record.updated_at += 1;
        Ok(())
    }

    async fn list_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PersonRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        let lower = match after {
            Some(after) => Bound::Excluded(after.to_string()),
            None => Bound::Unbounded,
        };
        Ok(records
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }
}

/// Object store that hands out sequential URLs
#[derive(Default)]
pub struct FakeObjectStore {
    /// MIME types of successful uploads, in order
    pub uploads: Mutex<Vec<String>>,
    pub upload_calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn upload(&self, _bytes: Vec<u8>, mime_type: &str) -> Result<StoredObject, UploadError> {
        let n = self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(UploadError::Rejected {
                status: 503,
                message: "object store down".to_string(),
            });
        }
        self.uploads.lock().unwrap().push(mime_type.to_string());
        Ok(StoredObject {
            url: format!("https://objects.test/{}", n),
        })
    }
}

/// SVG encoder with a call counter and a failure switch
#[derive(Default)]
pub struct CountingQrEncoder {
    inner: SvgQrEncoder,
    /// Every text passed to `encode`
    pub encoded: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl CountingQrEncoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.encoded.lock().unwrap().len()
    }
}

impl QrEncoder for CountingQrEncoder {
    fn encode(&self, text: &str) -> Result<QrImage, EncodeError> {
        self.encoded.lock().unwrap().push(text.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(EncodeError::Encoding("encoder down".to_string()));
        }
        self.inner.encode(text)
    }
}

/// Services wired to fresh fakes
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub objects: Arc<FakeObjectStore>,
    pub qr: Arc<CountingQrEncoder>,
    pub registration: RegistrationService,
    pub lookup: LookupService,
}

impl Harness {
    pub fn new(policy: RegistrationConfig) -> Self {
        Self::with_page_size(policy, 100)
    }

    pub fn with_page_size(policy: RegistrationConfig, page_size: usize) -> Self {
        let store = InMemoryStore::new();
        let objects = FakeObjectStore::new();
        let qr = CountingQrEncoder::new();
        let registration =
            RegistrationService::new(store.clone(), objects.clone(), qr.clone(), policy);
        let lookup = LookupService::with_page_size(store.clone(), page_size);
        Self {
            store,
            objects,
            qr,
            registration,
            lookup,
        }
    }
}
