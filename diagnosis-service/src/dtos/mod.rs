pub mod diagnosis;

pub use diagnosis::{
    FollowupRequest, FollowupResponse, HistoryListParams, QaEntryResponse, RecordResponse,
    ReportResponse,
};
