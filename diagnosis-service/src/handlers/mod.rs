pub mod diagnosis;
pub mod health;

pub use diagnosis::{answer_followup, generate_report, get_history_record, list_history};
pub use health::{health_check, metrics_endpoint, readiness_check, root};
