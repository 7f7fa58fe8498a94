use anyhow::Context;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ServerConfig, SharedTtsSettings};
use crate::handlers::websocket::WsHost;
use crate::plugin::{
    commands::{register_commands, CommandDeps},
    middleware::AutoConvert,
};
use crate::services::{
    text::policy::SpeechPolicy,
    tts::{models::ModelManager, sovits::SovitsClient},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub settings: SharedTtsSettings,
    pub host: Arc<WsHost>,
    pub auto_convert: Arc<AutoConvert>,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let tts = &config.tts;
        if tts.ref_audio_path.trim().is_empty() {
            anyhow::bail!("tts.ref_audio_path must be set");
        }
        if !Path::new(&tts.ref_audio_path).exists() {
            warn!(
                "Reference audio {} not found locally; the inference server must be able to read it",
                tts.ref_audio_path
            );
        }

        tokio::fs::create_dir_all(&tts.audio_dir)
            .await
            .with_context(|| {
                format!("Failed to create audio directory {}", tts.audio_dir.display())
            })?;

        let policy = SpeechPolicy::from_settings(&config.speech_policy)?;

        let http = Client::new();
        let sovits = Arc::new(SovitsClient::new(http.clone()));
        let models = Arc::new(ModelManager::new(http));
        let settings = SharedTtsSettings::new(tts.clone());

        let summary = models.load_models(&settings.snapshot()).await;
        info!("Startup model load:\n{}", summary.to_string().trim_end());

        let host = Arc::new(WsHost::new());
        let deps = CommandDeps {
            tts: sovits.clone(),
            models,
            settings: settings.clone(),
        };
        register_commands(host.as_ref(), &deps);

        let auto_convert = Arc::new(AutoConvert::new(
            sovits,
            host.clone(),
            settings.clone(),
            policy,
        ));

        Ok(Self {
            config: Arc::new(config),
            settings,
            host,
            auto_convert,
        })
    }
}
