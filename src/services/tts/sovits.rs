use crate::config::TtsSettings;
use crate::services::text::sanitizer::{sanitize, FilterOptions};
use crate::services::tts::error::TtsError;
use crate::services::tts::health::HealthStatus;
use crate::traits::TtsTrait;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

/// Body of `POST /tts`.
#[derive(Debug, Serialize)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub text_lang: String,
    pub ref_audio_path: &'a str,
    pub prompt_text: &'a str,
    pub prompt_lang: String,
    pub text_split_method: &'static str,
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
    pub batch_size: u32,
    pub batch_threshold: f32,
    pub split_bucket: bool,
    pub speed_factor: f32,
    pub seed: i64,
    pub media_type: &'static str,
    pub streaming_mode: bool,
    pub parallel_infer: bool,
    pub repetition_penalty: f32,
    pub sample_steps: u32,
    pub super_sampling: bool,
}

impl<'a> SynthesisRequest<'a> {
    pub fn new(text: &'a str, settings: &'a TtsSettings) -> Self {
        Self {
            text,
            text_lang: settings.text_lang.to_lowercase(),
            ref_audio_path: &settings.ref_audio_path,
            prompt_text: &settings.prompt_text,
            prompt_lang: settings.prompt_lang.to_lowercase(),
            text_split_method: settings.cut_method.as_str(),
            top_k: 5,
            top_p: 1.0,
            temperature: 1.0,
            batch_size: 1,
            batch_threshold: 0.75,
            split_bucket: true,
            speed_factor: 1.0,
            // unseeded
            seed: -1,
            media_type: "wav",
            streaming_mode: false,
            parallel_infer: true,
            repetition_penalty: 1.35,
            sample_steps: 32,
            super_sampling: false,
        }
    }
}

/// Client for a GPT-SoVITS style `api_v2` server.
pub struct SovitsClient {
    client: Client,
}

impl SovitsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    async fn request_audio(
        &self,
        text: &str,
        settings: &TtsSettings,
    ) -> Result<PathBuf, TtsError> {
        let base = settings.api_url.trim_end_matches('/');
        let url = format!("{}/tts", base);
        let body = SynthesisRequest::new(text, settings);

        info!(
            "Requesting SoVITS synthesis at {} ({} chars, {})",
            url,
            text.chars().count(),
            settings.cut_method
        );

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(SYNTHESIS_TIMEOUT)
            .send()
            .await
            .map_err(|e| TtsError::from_transport(e, base))?;

        if !resp.status().is_success() {
            let err = TtsError::from_response(resp).await;
            error!("SoVITS synthesis error: {}", err);
            return Err(err);
        }

        let path = settings.audio_dir.join(audio_file_name());
        let written = save_stream(resp, &path).await?;
        info!("Saved {} bytes of audio to {}", written, path.display());
        Ok(path)
    }
}

/// `<timestamp with millis>-<random>.wav`; the random part keeps same-millisecond calls apart.
fn audio_file_name() -> String {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}.wav", stamp, &id[..8])
}

async fn save_stream(resp: reqwest::Response, path: &Path) -> Result<u64, TtsError> {
    let file_err = |source: std::io::Error| TtsError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::create(path).await.map_err(file_err)?;
    let mut stream = resp.bytes_stream();
    let mut written = 0u64;

    let result: Result<(), TtsError> = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(TtsError::RequestFailed)?;
            file.write_all(&chunk).await.map_err(file_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(file_err)
    }
    .await;

    if let Err(e) = result {
        drop(file);
        if let Err(rm) = tokio::fs::remove_file(path).await {
            warn!("Could not remove partial audio {}: {}", path.display(), rm);
        }
        return Err(e);
    }
    Ok(written)
}

#[async_trait]
impl TtsTrait for SovitsClient {
    async fn synthesize(&self, text: &str, settings: &TtsSettings) -> Result<PathBuf, TtsError> {
        let clean = sanitize(text, FilterOptions::from_settings(settings));
        self.request_audio(&clean, settings).await
    }

    async fn synthesize_raw(
        &self,
        text: &str,
        settings: &TtsSettings,
    ) -> Result<PathBuf, TtsError> {
        if text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }
        self.request_audio(text, settings).await
    }

    async fn probe(&self, settings: &TtsSettings) -> HealthStatus {
        self.check_health(settings).await
    }
}
