use crate::models::{DiagnosisRecord, QaEntry};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: String,
    /// Present when the report was saved to history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

/// Follow-up question. Every field is optional; a missing `report` or
/// `question` is rendered into the prompt as an empty string.
#[derive(Debug, Default, Deserialize)]
pub struct FollowupRequest {
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    /// Record to load the report from and append the Q&A to.
    #[serde(default)]
    pub history_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowupResponse {
    pub answer: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct HistoryListParams {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

impl HistoryListParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }

    pub fn skip(&self) -> u64 {
        self.skip.unwrap_or(0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub id: String,
    pub image_base64: String,
    pub report: String,
    pub qa: Vec<QaEntryResponse>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QaEntryResponse {
    pub question: String,
    pub answer: String,
    pub timestamp: String,
}

impl From<DiagnosisRecord> for RecordResponse {
    fn from(record: DiagnosisRecord) -> Self {
        Self {
            id: record.id,
            image_base64: record.image_base64,
            report: record.report,
            qa: record.qa.into_iter().map(QaEntryResponse::from).collect(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

impl From<QaEntry> for QaEntryResponse {
    fn from(entry: QaEntry) -> Self {
        Self {
            question: entry.question,
            answer: entry.answer,
            timestamp: entry.timestamp.to_rfc3339(),
        }
    }
}
