//! Persisted diagnosis history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generated report together with the follow-up questions asked about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    #[serde(rename = "_id")]
    pub id: String,

    /// The uploaded image, standard base64.
    pub image_base64: String,

    pub report: String,

    /// Follow-up questions in the order they were answered. Append-only.
    #[serde(default)]
    pub qa: Vec<QaEntry>,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl DiagnosisRecord {
    pub fn new(image_base64: String, report: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            image_base64,
            report,
            qa: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

impl QaEntry {
    pub fn new(question: String, answer: String) -> Self {
        Self {
            question,
            answer,
            timestamp: Utc::now(),
        }
    }
}
