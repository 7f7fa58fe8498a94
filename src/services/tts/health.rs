use crate::config::TtsSettings;
use crate::services::tts::sovits::SovitsClient;
use reqwest::StatusCode;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::info;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TEXT: &str = "测试";

#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Online,
    /// Reachable, but the probe parameters were refused (HTTP 400).
    Rejected { detail: String },
    Error { status: u16, detail: String },
    Unreachable { addr: String },
    Failed(String),
}

impl HealthStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(
            self,
            HealthStatus::Online | HealthStatus::Rejected { .. } | HealthStatus::Error { .. }
        )
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Online => write!(f, "SoVITS service is online"),
            HealthStatus::Rejected { detail } => write!(
                f,
                "SoVITS service is online but rejected the probe parameters: {}",
                detail
            ),
            HealthStatus::Error { status, detail } => {
                write!(f, "SoVITS service responded with HTTP {}: {}", status, detail)
            }
            HealthStatus::Unreachable { addr } => {
                write!(f, "Cannot connect to SoVITS service at {}", addr)
            }
            HealthStatus::Failed(msg) => write!(f, "Health check failed: {}", msg),
        }
    }
}

impl SovitsClient {
    /// Sends the smallest valid synthesis request and classifies the outcome.
    pub async fn check_health(&self, settings: &TtsSettings) -> HealthStatus {
        let base = settings.api_url.trim_end_matches('/');
        let body = json!({
            "text": PROBE_TEXT,
            "text_lang": settings.text_lang.to_lowercase(),
            "ref_audio_path": settings.ref_audio_path,
            "prompt_lang": settings.prompt_lang.to_lowercase(),
        });

        let result = self
            .http()
            .post(format!("{}/tts", base))
            .json(&body)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        let status = match result {
            Ok(resp) => {
                let code = resp.status();
                if code.is_success() {
                    HealthStatus::Online
                } else {
                    let detail = resp.text().await.unwrap_or_default();
                    if code == StatusCode::BAD_REQUEST {
                        HealthStatus::Rejected { detail }
                    } else {
                        HealthStatus::Error {
                            status: code.as_u16(),
                            detail,
                        }
                    }
                }
            }
            Err(e) if e.is_connect() => HealthStatus::Unreachable {
                addr: base.to_string(),
            },
            Err(e) => HealthStatus::Failed(e.to_string()),
        };

        info!("SoVITS health probe: {}", status);
        status
    }
}
