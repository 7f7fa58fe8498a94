use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub tts: TtsSettings,
    #[serde(default)]
    pub speech_policy: SpeechPolicySettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub port: u16,
    pub host: String,
}

/// Options consumed by every synthesis call.
///
/// Held behind [`SharedTtsSettings`]; a running conversion keeps the snapshot
/// it started with even if a model swap replaces the shared value.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TtsSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub ref_audio_path: String,
    #[serde(default)]
    pub prompt_text: String,
    #[serde(default = "default_lang")]
    pub prompt_lang: String,
    #[serde(default = "default_lang")]
    pub text_lang: String,
    #[serde(default)]
    pub auto_convert: bool,
    #[serde(default = "default_auto_convert_delay_ms")]
    pub auto_convert_delay_ms: u64,
    #[serde(default)]
    pub cut_method: CutMethod,
    #[serde(default = "default_true")]
    pub filter_brackets: bool,
    #[serde(default = "default_true")]
    pub filter_emoji: bool,
    #[serde(default)]
    pub gpt_model_path: String,
    #[serde(default)]
    pub sovits_model_path: String,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
}

/// Text segmentation strategy applied by the inference server before synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CutMethod {
    /// No segmentation.
    Cut0,
    /// Every four sentences.
    Cut1,
    /// Every 50 characters.
    Cut2,
    /// On Chinese full stops.
    Cut3,
    /// On English full stops.
    Cut4,
    /// On punctuation.
    #[default]
    Cut5,
}

impl CutMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CutMethod::Cut0 => "cut0",
            CutMethod::Cut1 => "cut1",
            CutMethod::Cut2 => "cut2",
            CutMethod::Cut3 => "cut3",
            CutMethod::Cut4 => "cut4",
            CutMethod::Cut5 => "cut5",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CutMethod::Cut0 => "no split",
            CutMethod::Cut1 => "every four sentences",
            CutMethod::Cut2 => "every 50 characters",
            CutMethod::Cut3 => "Chinese full stop",
            CutMethod::Cut4 => "English full stop",
            CutMethod::Cut5 => "punctuation",
        }
    }
}

impl fmt::Display for CutMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.description())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechPolicySettings {
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    #[serde(default = "default_skip_words")]
    pub skip_words: Vec<String>,
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,
}

impl Default for SpeechPolicySettings {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            skip_words: default_skip_words(),
            skip_patterns: default_skip_patterns(),
        }
    }
}

fn default_api_url() -> String {
    "http://127.0.0.1:9880".to_string()
}

fn default_lang() -> String {
    "zh".to_string()
}

fn default_true() -> bool {
    true
}

fn default_auto_convert_delay_ms() -> u64 {
    1000
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("data/sovits")
}

fn default_min_chars() -> usize {
    2
}

fn default_skip_words() -> Vec<String> {
    [
        "ok", "okay", "k", "yes", "no", "thx", "thanks", "lol", "好", "好的", "嗯", "嗯嗯", "哦",
        "噢", "哈", "哈哈", "哈哈哈", "呵呵", "收到", "谢谢", "是", "否", "对",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect()
}

fn default_skip_patterns() -> Vec<String> {
    [
        // punctuation, symbols and whitespace only
        r"^[\p{P}\p{S}\s]+$",
        // a bare link
        r"^https?://\S+$",
        // slash commands
        r"^/\S*",
        // a single bracketed chunk
        r"(?s)^[\[【(（<《{].*[\]】)）>》}]$",
        // one or two Han characters
        r"^\p{Han}{1,2}$",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl ServerConfig {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("Settings.toml").required(false))
            .add_source(config::Environment::with_prefix("SOVITS").separator("__"));

        builder.build()?.try_deserialize()
    }
}

/// Process-wide handle to the current [`TtsSettings`].
///
/// Readers take an `Arc` snapshot; writers replace the whole value, so a
/// snapshot never changes underneath a conversion.
#[derive(Clone)]
pub struct SharedTtsSettings {
    inner: Arc<RwLock<Arc<TtsSettings>>>,
}

impl SharedTtsSettings {
    pub fn new(settings: TtsSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    pub fn snapshot(&self) -> Arc<TtsSettings> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut TtsSettings)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = TtsSettings::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
pub(crate) fn test_settings(api_url: &str, audio_dir: PathBuf) -> TtsSettings {
    TtsSettings {
        api_url: api_url.to_string(),
        ref_audio_path: "ref/voice.wav".to_string(),
        prompt_text: "今天天气真好".to_string(),
        prompt_lang: "ZH".to_string(),
        text_lang: "ZH".to_string(),
        auto_convert: true,
        auto_convert_delay_ms: 0,
        cut_method: CutMethod::Cut5,
        filter_brackets: true,
        filter_emoji: true,
        gpt_model_path: String::new(),
        sovits_model_path: String::new(),
        audio_dir,
    }
}
