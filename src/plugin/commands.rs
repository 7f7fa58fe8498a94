use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SharedTtsSettings;
use crate::services::text::sanitizer::{sanitize, FilterOptions};
use crate::services::tts::models::{ModelKind, ModelManager};
use crate::traits::{CommandTrait, HostTrait, Reply, Session, TtsTrait};

pub const COMMAND_PREFIX: &str = "sovits";

const MODEL_USAGE: &str = "Usage: sovits.model [status | gpt <path> | sovits <path> | reload]";

/// Shared handles every command needs.
#[derive(Clone)]
pub struct CommandDeps {
    pub tts: Arc<dyn TtsTrait>,
    pub models: Arc<ModelManager>,
    pub settings: SharedTtsSettings,
}

pub fn register_commands(host: &dyn HostTrait, deps: &CommandDeps) {
    host.register_command(
        COMMAND_PREFIX,
        "Synthesize speech from text and play it",
        Arc::new(SpeakCommand { deps: deps.clone() }),
    );
    host.register_command(
        "sovits.raw",
        "Synthesize speech without text filtering",
        Arc::new(RawCommand { deps: deps.clone() }),
    );
    host.register_command(
        "sovits.filter",
        "Preview how text is filtered before synthesis",
        Arc::new(FilterCommand { deps: deps.clone() }),
    );
    host.register_command(
        "sovits.check",
        "Check whether the SoVITS service is reachable",
        Arc::new(CheckCommand { deps: deps.clone() }),
    );
    host.register_command(
        "sovits.model",
        "Inspect, switch or reload GPT/SoVITS models",
        Arc::new(ModelCommand { deps: deps.clone() }),
    );
    info!("Registered SoVITS commands");
}

struct SpeakCommand {
    deps: CommandDeps,
}

#[async_trait]
impl CommandTrait for SpeakCommand {
    async fn execute(&self, _session: &Session, args: &str) -> Reply {
        if args.trim().is_empty() {
            return Reply::text("Please provide the text to synthesize.");
        }
        let settings = self.deps.settings.snapshot();
        match self.deps.tts.synthesize(args, &settings).await {
            Ok(path) => Reply::audio(path),
            Err(e) => {
                warn!("sovits command failed: {}", e);
                Reply::text(format!("Speech synthesis failed: {}", e))
            }
        }
    }
}

struct RawCommand {
    deps: CommandDeps,
}

#[async_trait]
impl CommandTrait for RawCommand {
    async fn execute(&self, _session: &Session, args: &str) -> Reply {
        if args.trim().is_empty() {
            return Reply::text("Please provide the text to synthesize.");
        }
        let settings = self.deps.settings.snapshot();
        match self.deps.tts.synthesize_raw(args, &settings).await {
            Ok(path) => Reply::audio(path),
            Err(e) => Reply::text(format!("Speech synthesis failed: {}", e)),
        }
    }
}

struct FilterCommand {
    deps: CommandDeps,
}

#[async_trait]
impl CommandTrait for FilterCommand {
    async fn execute(&self, _session: &Session, args: &str) -> Reply {
        if args.trim().is_empty() {
            return Reply::text("Please provide the text to filter.");
        }
        let settings = self.deps.settings.snapshot();
        let options = FilterOptions::from_settings(&settings);
        let filtered = sanitize(args, options);
        Reply::text(format!(
            "Original: {}\nFiltered: {}\nBrackets filter: {}, emoji filter: {}",
            args,
            filtered,
            on_off(options.brackets),
            on_off(options.emoji)
        ))
    }
}

struct CheckCommand {
    deps: CommandDeps,
}

#[async_trait]
impl CommandTrait for CheckCommand {
    async fn execute(&self, _session: &Session, _args: &str) -> Reply {
        let settings = self.deps.settings.snapshot();
        let status = self.deps.tts.probe(&settings).await;
        if !status.is_reachable() {
            warn!("SoVITS service check failed: {}", status);
        }
        Reply::text(status.to_string())
    }
}

struct ModelCommand {
    deps: CommandDeps,
}

impl ModelCommand {
    fn status(&self) -> String {
        let settings = self.deps.settings.snapshot();
        let describe = |path: &str| {
            if path.is_empty() {
                "(not set)".to_string()
            } else if Path::new(path).exists() {
                path.to_string()
            } else {
                format!("{} (missing)", path)
            }
        };
        format!(
            "Server: {}\nGPT model: {}\nSoVITS model: {}\nCut method: {}",
            settings.api_url,
            describe(&settings.gpt_model_path),
            describe(&settings.sovits_model_path),
            settings.cut_method
        )
    }

    async fn swap(&self, kind: ModelKind, path: &str) -> String {
        let settings = self.deps.settings.snapshot();
        match self.deps.models.swap(kind, path, &settings).await {
            Ok(()) => {
                self.deps.settings.update(|s| match kind {
                    ModelKind::Gpt => s.gpt_model_path = path.to_string(),
                    ModelKind::Sovits => s.sovits_model_path = path.to_string(),
                });
                format!("{} model switched to {}", kind, path)
            }
            Err(e) => format!("Failed to switch {} model: {}", kind, e),
        }
    }
}

#[async_trait]
impl CommandTrait for ModelCommand {
    async fn execute(&self, _session: &Session, args: &str) -> Reply {
        let args = args.trim();
        let (sub, rest) = args
            .split_once(char::is_whitespace)
            .map(|(s, r)| (s, r.trim()))
            .unwrap_or((args, ""));

        let text = match (sub, rest) {
            ("" | "status", _) => self.status(),
            ("gpt", path) if !path.is_empty() => self.swap(ModelKind::Gpt, path).await,
            ("sovits", path) if !path.is_empty() => self.swap(ModelKind::Sovits, path).await,
            ("reload", _) => {
                let settings = self.deps.settings.snapshot();
                let summary = self.deps.models.load_models(&settings).await;
                format!("Model reload finished:\n{}", summary.to_string().trim_end())
            }
            _ => MODEL_USAGE.to_string(),
        };
        Reply::text(text)
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
