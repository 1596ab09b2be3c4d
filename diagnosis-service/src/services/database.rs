//! MongoDB persistence for diagnosis records.
//!
//! One collection, addressed by `_id`. No secondary indexes.

use super::store::RecordStore;
use crate::models::{DiagnosisRecord, QaEntry};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_document},
    options::FindOptions,
    Client as MongoClient, Collection, Database,
};
use service_core::error::AppError;

const RECORDS_COLLECTION: &str = "diagnosis_records";

#[derive(Clone)]
pub struct DiagnosisDb {
    client: MongoClient,
    db: Database,
}

impl DiagnosisDb {
    /// Build a client for `uri`. The driver connects lazily, so an unreachable
    /// server only shows up on the first operation.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Configuring MongoDB client");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to configure MongoDB client: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        Ok(Self { client, db })
    }

    pub fn records(&self) -> Collection<DiagnosisRecord> {
        self.db.collection(RECORDS_COLLECTION)
    }
}

#[async_trait]
impl RecordStore for DiagnosisDb {
    async fn insert_record(&self, record: &DiagnosisRecord) -> Result<(), AppError> {
        self.records()
            .insert_one(record, None)
            .await
            .map_err(|e| {
                tracing::error!(record_id = %record.id, "Failed to insert diagnosis record: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    async fn find_record(&self, id: &str) -> Result<Option<DiagnosisRecord>, AppError> {
        self.records()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| {
                tracing::error!(record_id = %id, "Failed to find diagnosis record: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })
    }

    async fn append_qa(&self, id: &str, entry: &QaEntry) -> Result<bool, AppError> {
        let entry_doc = to_document(entry).map_err(|e| {
            tracing::error!("Failed to serialize Q&A entry: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;

        let result = self
            .records()
            .update_one(
                doc! { "_id": id },
                doc! { "$push": { "qa": entry_doc } },
                None,
            )
            .await
            .map_err(|e| {
                tracing::error!(record_id = %id, "Failed to append Q&A entry: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        Ok(result.matched_count > 0)
    }

    async fn list_records(&self, limit: i64, skip: u64) -> Result<Vec<DiagnosisRecord>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = self.records().find(doc! {}, options).await.map_err(|e| {
            tracing::error!("Failed to query diagnosis records: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;

        cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to collect diagnosis records: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }
}
