//! Domain models for the diagnosis service.

pub mod image;
pub mod record;

pub use image::ImageUpload;
pub use record::{DiagnosisRecord, QaEntry};
