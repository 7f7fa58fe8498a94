use crate::config::TtsSettings;
use crate::services::tts::error::TtsError;
use reqwest::Client;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub const SWAP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Gpt,
    Sovits,
}

impl ModelKind {
    fn endpoint(&self) -> &'static str {
        match self {
            ModelKind::Gpt => "set_gpt_weights",
            ModelKind::Sovits => "set_sovits_weights",
        }
    }

    pub fn configured_path<'a>(&self, settings: &'a TtsSettings) -> &'a str {
        match self {
            ModelKind::Gpt => &settings.gpt_model_path,
            ModelKind::Sovits => &settings.sovits_model_path,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Gpt => write!(f, "GPT"),
            ModelKind::Sovits => write!(f, "SoVITS"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Path empty or missing on disk.
    Skipped,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub gpt: LoadOutcome,
    pub sovits: LoadOutcome,
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, outcome) in [(ModelKind::Gpt, &self.gpt), (ModelKind::Sovits, &self.sovits)] {
            match outcome {
                LoadOutcome::Skipped => writeln!(f, "{}: skipped (no model file)", kind)?,
                LoadOutcome::Loaded => writeln!(f, "{}: loaded", kind)?,
                LoadOutcome::Failed(e) => writeln!(f, "{}: failed ({})", kind, e)?,
            }
        }
        Ok(())
    }
}

/// Swaps model weights on the inference server.
pub struct ModelManager {
    client: Client,
}

impl ModelManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Loads whichever configured models exist. Failures are logged, never returned,
    /// and one model failing does not stop the other.
    pub async fn load_models(&self, settings: &TtsSettings) -> LoadSummary {
        LoadSummary {
            gpt: self.load_one(ModelKind::Gpt, settings).await,
            sovits: self.load_one(ModelKind::Sovits, settings).await,
        }
    }

    async fn load_one(&self, kind: ModelKind, settings: &TtsSettings) -> LoadOutcome {
        let path = kind.configured_path(settings);
        if path.is_empty() || !Path::new(path).exists() {
            if !path.is_empty() {
                warn!("{} model not found at {}, skipping", kind, path);
            }
            return LoadOutcome::Skipped;
        }

        match self.request_swap(kind, path, settings).await {
            Ok(()) => LoadOutcome::Loaded,
            Err(e) => {
                warn!("Failed to load {} model {}: {}", kind, path, e);
                LoadOutcome::Failed(e.to_string())
            }
        }
    }

    /// Explicit swap requested by a user; errors are returned to the caller.
    pub async fn swap(
        &self,
        kind: ModelKind,
        path: &str,
        settings: &TtsSettings,
    ) -> Result<(), TtsError> {
        if path.is_empty() || !Path::new(path).exists() {
            return Err(TtsError::ModelNotFound(path.into()));
        }
        self.request_swap(kind, path, settings).await
    }

    async fn request_swap(
        &self,
        kind: ModelKind,
        path: &str,
        settings: &TtsSettings,
    ) -> Result<(), TtsError> {
        let base = settings.api_url.trim_end_matches('/');
        let url = format!("{}/{}", base, kind.endpoint());

        let resp = self
            .client
            .get(&url)
            .query(&[("weights_path", path)])
            .timeout(SWAP_TIMEOUT)
            .send()
            .await
            .map_err(|e| TtsError::from_transport(e, base))?;

        if !resp.status().is_success() {
            return Err(TtsError::from_response(resp).await);
        }

        info!("{} weights switched to {}", kind, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use std::path::PathBuf;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model_file(dir: &tempfile::TempDir, name: &str) -> String {
        let p = dir.path().join(name);
        std::fs::write(&p, b"weights").unwrap();
        p.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn loads_both_models() {
        let dir = tempfile::tempdir().unwrap();
        let gpt = model_file(&dir, "voice.ckpt");
        let sovits = model_file(&dir, "voice.pth");

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/set_gpt_weights"))
            .and(query_param("weights_path", gpt.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("success"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/set_sovits_weights"))
            .and(query_param("weights_path", sovits.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("success"))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = test_settings(&server.uri(), PathBuf::from("unused"));
        settings.gpt_model_path = gpt;
        settings.sovits_model_path = sovits;

        let summary = ModelManager::new(Client::new()).load_models(&settings).await;
        assert_eq!(summary.gpt, LoadOutcome::Loaded);
        assert_eq!(summary.sovits, LoadOutcome::Loaded);
    }

    #[tokio::test]
    async fn gpt_failure_does_not_block_sovits() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/set_gpt_weights"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad weights"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/set_sovits_weights"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = test_settings(&server.uri(), PathBuf::from("unused"));
        settings.gpt_model_path = model_file(&dir, "voice.ckpt");
        settings.sovits_model_path = model_file(&dir, "voice.pth");

        let summary = ModelManager::new(Client::new()).load_models(&settings).await;
        assert!(matches!(&summary.gpt, LoadOutcome::Failed(e) if e.contains("bad weights")));
        assert_eq!(summary.sovits, LoadOutcome::Loaded);
    }

    #[tokio::test]
    async fn missing_paths_are_skipped_without_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut settings = test_settings(&server.uri(), PathBuf::from("unused"));
        settings.sovits_model_path = "/definitely/not/here.pth".to_string();

        let summary = ModelManager::new(Client::new()).load_models(&settings).await;
        assert_eq!(summary.gpt, LoadOutcome::Skipped);
        assert_eq!(summary.sovits, LoadOutcome::Skipped);
        assert!(summary.to_string().contains("GPT: skipped"));
    }

    #[tokio::test]
    async fn explicit_swap_reports_missing_file() {
        let settings = test_settings("http://127.0.0.1:9", PathBuf::from("unused"));
        let err = ModelManager::new(Client::new())
            .swap(ModelKind::Gpt, "/nope/model.ckpt", &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::ModelNotFound(_)));
    }
}
