use crate::dtos::{
    FollowupRequest, FollowupResponse, HistoryListParams, RecordResponse, ReportResponse,
};
use crate::models::{DiagnosisRecord, ImageUpload, QaEntry};
use crate::startup::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// Multipart field carrying the image.
const FILE_FIELD: &str = "file";

const NO_IMAGE_UPLOADED: &str = "No image uploaded";
const REPORT_FAILED: &str = "Error generating report";
const FOLLOWUP_FAILED: &str = "Error answering question";

fn no_image_uploaded() -> AppError {
    AppError::BadRequest(anyhow::anyhow!(NO_IMAGE_UPLOADED))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!(e.body_text()))
    } else {
        AppError::BadRequest(anyhow::anyhow!(
            "Failed to read multipart body: {}",
            e.body_text()
        ))
    }
}

/// `POST /api/diagnosis/report`
pub async fn generate_report(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ReportResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Report request is not multipart: {}", e);
        no_image_uploaded()
    })?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(|ct| ct.to_string());
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some(ImageUpload::from_bytes(&data, content_type.as_deref()));
        break;
    }

    let image = upload.ok_or_else(no_image_uploaded)?;

    tracing::info!(
        size = image.size,
        mime_type = %image.mime_type,
        "Report requested"
    );

    let report = state
        .gateway
        .generate_report(&image)
        .await
        .map_err(|e| AppError::upstream(REPORT_FAILED, e))?;

    let history_id = save_report(&state, image.base64, &report).await;

    Ok(Json(ReportResponse { report, history_id }))
}

/// Persist a generated report. Storage failures are logged and swallowed;
/// the caller still gets the report, just without a history id.
async fn save_report(state: &AppState, image_base64: String, report: &str) -> Option<String> {
    let store = state.store.as_ref()?;
    let record = DiagnosisRecord::new(image_base64, report.to_string());

    match store.insert_record(&record).await {
        Ok(()) => {
            tracing::info!(record_id = %record.id, "Diagnosis record saved");
            Some(record.id)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to save diagnosis record");
            None
        }
    }
}

/// `POST /api/diagnosis/followup`
pub async fn answer_followup(
    State(state): State<AppState>,
    payload: Result<Json<FollowupRequest>, JsonRejection>,
) -> Result<Json<FollowupResponse>, AppError> {
    let request = match payload {
        Ok(Json(request)) => request,
        // A body that is not declared as JSON is read as an empty request
        Err(JsonRejection::MissingJsonContentType(e)) => {
            tracing::debug!("Follow-up body is not JSON, using empty fields: {}", e);
            FollowupRequest::default()
        }
        Err(e) => return Err(AppError::BadRequest(anyhow::anyhow!(e.body_text()))),
    };

    let history = match (&request.history_id, &state.store) {
        (Some(id), Some(store)) => {
            let record = store
                .find_record(id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("History not found")))?;
            Some((store.clone(), record))
        }
        (Some(id), None) => {
            tracing::warn!(history_id = %id, "History is disabled, ignoring history_id");
            None
        }
        (None, _) => None,
    };

    let report = request
        .report
        .as_deref()
        .or(history.as_ref().map(|(_, record)| record.report.as_str()))
        .unwrap_or_default();
    let question = request.question.as_deref().unwrap_or_default();

    tracing::info!(
        report_len = report.len(),
        question_len = question.len(),
        history_id = request.history_id.as_deref().unwrap_or("none"),
        "Follow-up requested"
    );

    let answer = state
        .gateway
        .answer_followup(report, question)
        .await
        .map_err(|e| AppError::upstream(FOLLOWUP_FAILED, e))?;

    if let Some((store, record)) = history {
        let entry = QaEntry::new(question.to_string(), answer.clone());
        match store.append_qa(&record.id, &entry).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(record_id = %record.id, "Record vanished before Q&A was saved")
            }
            Err(e) => {
                tracing::error!(record_id = %record.id, error = %e, "Failed to save Q&A entry")
            }
        }
    }

    Ok(Json(FollowupResponse { answer }))
}

/// `GET /api/diagnosis/history`
pub async fn list_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryListParams>, QueryRejection>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    let Query(params) =
        params.map_err(|e| AppError::BadRequest(anyhow::anyhow!(e.body_text())))?;
    params.validate()?;
    let store = state.store.as_ref().ok_or_else(history_disabled)?;

    let records = store.list_records(params.limit(), params.skip()).await?;

    Ok(Json(records.into_iter().map(RecordResponse::from).collect()))
}

/// `GET /api/diagnosis/history/:id`
pub async fn get_history_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, AppError> {
    let store = state.store.as_ref().ok_or_else(history_disabled)?;

    let record = store
        .find_record(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("History not found")))?;

    Ok(Json(RecordResponse::from(record)))
}

fn history_disabled() -> AppError {
    AppError::NotFound(anyhow::anyhow!("History is disabled"))
}
