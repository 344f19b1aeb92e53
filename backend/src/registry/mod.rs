//! Registry module
//!
//! Person record model and the three collaborators the services depend on:
//! the record store, the object store and the QR encoder.

pub mod models;
pub mod object_store;
pub mod qr;
pub mod store;

pub use models::{
    NewPerson, PersonRecord, PhotoUpload, RecordKey, RecordPatch, RecordState, RegistrationInput,
    RegistrationResult,
};
pub use object_store::{CloudinaryClient, ObjectStore, StoredObject, UploadError};
pub use qr::{EncodeError, QrEncoder, QrImage, SvgQrEncoder};
pub use store::{RecordStore, SqliteRecordStore, StoreError};
