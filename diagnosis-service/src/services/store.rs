use crate::models::{DiagnosisRecord, QaEntry};
use async_trait::async_trait;
use service_core::error::AppError;
use tokio::sync::RwLock;

/// Persistence for diagnosis records. Records are inserted once; the only
/// mutation afterwards is appending follow-up Q&A.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_record(&self, record: &DiagnosisRecord) -> Result<(), AppError>;

    async fn find_record(&self, id: &str) -> Result<Option<DiagnosisRecord>, AppError>;

    /// Append `entry` to the record's `qa`. Returns false when no record has `id`.
    async fn append_qa(&self, id: &str, entry: &QaEntry) -> Result<bool, AppError>;

    /// Newest first.
    async fn list_records(&self, limit: i64, skip: u64) -> Result<Vec<DiagnosisRecord>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// Process-local store, for tests and single-instance demos.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<DiagnosisRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored, in insertion order.
    pub async fn records(&self) -> Vec<DiagnosisRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_record(&self, record: &DiagnosisRecord) -> Result<(), AppError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn find_record(&self, id: &str) -> Result<Option<DiagnosisRecord>, AppError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn append_qa(&self, id: &str, entry: &QaEntry) -> Result<bool, AppError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.qa.push(entry.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_records(&self, limit: i64, skip: u64) -> Result<Vec<DiagnosisRecord>, AppError> {
        let mut records = self.records.read().await.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records
            .into_iter()
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
