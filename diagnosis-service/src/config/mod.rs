use crate::services::providers::gemini::{GeminiConfig, GEMINI_API_BASE};
use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_env_parsed, is_production};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Default request body limit (50MB); chest X-rays are routinely several MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct DiagnosisConfig {
    pub common: core_config::Config,
    /// `None` when record history is disabled.
    pub mongodb: Option<MongoConfig>,
    pub gemini: GeminiSettings,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Secret<String>,
    pub api_base: String,
    /// Model used for image reports.
    pub vision_model: String,
    /// Model used for text-only follow-up questions.
    pub text_model: String,
    /// Unset means the upstream call may take as long as it takes.
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_upload_bytes: usize,
}

impl DiagnosisConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = is_production();

        let persist_records: bool =
            get_env_parsed("DIAGNOSIS_PERSIST_RECORDS", Some("true"), is_prod)?;
        let mongodb = if persist_records {
            Some(MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("diagnosis_db"), is_prod)?,
            })
        } else {
            None
        };

        let request_timeout = match env::var("GEMINI_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(raw.trim().parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "GEMINI_REQUEST_TIMEOUT_SECS has an invalid value '{}': {}",
                    raw,
                    e
                ))
            })?)),
            Err(_) => None,
        };

        Ok(DiagnosisConfig {
            common: common_config,
            mongodb,
            gemini: GeminiSettings {
                api_key: Secret::new(get_env("GOOGLE_API_KEY", None, is_prod)?),
                api_base: get_env("GEMINI_API_BASE", Some(GEMINI_API_BASE), is_prod)?,
                vision_model: get_env("GEMINI_VISION_MODEL", Some(DEFAULT_MODEL), is_prod)?,
                text_model: get_env("GEMINI_TEXT_MODEL", Some(DEFAULT_MODEL), is_prod)?,
                request_timeout,
            },
            uploads: UploadConfig {
                max_upload_bytes: get_env_parsed(
                    "DIAGNOSIS_MAX_UPLOAD_BYTES",
                    Some(&DEFAULT_MAX_UPLOAD_BYTES.to_string()),
                    is_prod,
                )?,
            },
        })
    }

    /// Provider settings for the image report model.
    pub fn report_provider_config(&self) -> GeminiConfig {
        self.provider_config(&self.gemini.vision_model)
    }

    /// Provider settings for the follow-up text model.
    pub fn followup_provider_config(&self) -> GeminiConfig {
        self.provider_config(&self.gemini.text_model)
    }

    fn provider_config(&self, model: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini.api_key.clone(),
            api_base: self.gemini.api_base.clone(),
            model: model.to_string(),
            request_timeout: self.gemini.request_timeout,
        }
    }
}
