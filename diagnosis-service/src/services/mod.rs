pub mod database;
pub mod gateway;
pub mod metrics;
pub mod prompts;
pub mod providers;
pub mod store;

pub use database::DiagnosisDb;
pub use gateway::InferenceGateway;
pub use metrics::{get_metrics, init_metrics};
pub use store::{InMemoryRecordStore, RecordStore};
