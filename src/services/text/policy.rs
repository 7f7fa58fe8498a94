use anyhow::Context;
use regex::Regex;
use std::collections::HashSet;

use crate::config::SpeechPolicySettings;

/// Decides whether a host reply is worth reading aloud.
pub struct SpeechPolicy {
    min_chars: usize,
    skip_words: HashSet<String>,
    skip_patterns: Vec<Regex>,
}

impl SpeechPolicy {
    pub fn from_settings(settings: &SpeechPolicySettings) -> anyhow::Result<Self> {
        let skip_patterns = settings
            .skip_patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid skip pattern: {}", p)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            min_chars: settings.min_chars,
            skip_words: settings
                .skip_words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .collect(),
            skip_patterns,
        })
    }

    pub fn is_speech_worthy(&self, text: &str) -> bool {
        let text = text.trim();
        if text.chars().count() < self.min_chars.max(1) {
            return false;
        }

        let word = text
            .trim_end_matches(|c: char| c.is_ascii_punctuation() || "。！？，～…".contains(c))
            .to_lowercase();
        if self.skip_words.contains(&word) {
            return false;
        }

        !self.skip_patterns.iter().any(|re| re.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SpeechPolicy {
        SpeechPolicy::from_settings(&SpeechPolicySettings::default()).unwrap()
    }

    #[test]
    fn rejects_noise() {
        let policy = policy();
        for text in [
            "",
            "   ",
            "ok",
            "OK!",
            "呵呵",
            "[test]",
            "好",
            "好的。",
            "https://example.com/page",
            "/help",
            "？？！",
            "（笑）",
            "（旁白：夜深了\n他轻轻推开门）",
            "[系统提示]\n[请稍候]",
            "嗯嗯",
            "x",
        ] {
            assert!(!policy.is_speech_worthy(text), "should reject {text:?}");
        }
    }

    #[test]
    fn accepts_sentences() {
        let policy = policy();
        for text in [
            "今天天气不错",
            "abc",
            "hello there",
            "这个链接 https://example.com 值得一看",
            "[注意] 明天下雨",
            "【注意】\n明天下雨",
        ] {
            assert!(policy.is_speech_worthy(text), "should accept {text:?}");
        }
    }

    #[test]
    fn custom_policy_from_settings() {
        let settings = SpeechPolicySettings {
            min_chars: 5,
            skip_words: vec!["Roger".to_string()],
            skip_patterns: vec![r"^\d+$".to_string()],
        };
        let policy = SpeechPolicy::from_settings(&settings).unwrap();
        assert!(!policy.is_speech_worthy("abcd"));
        assert!(!policy.is_speech_worthy("roger."));
        assert!(!policy.is_speech_worthy("123456"));
        assert!(policy.is_speech_worthy("呵呵呵呵呵"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let settings = SpeechPolicySettings {
            skip_patterns: vec!["(".to_string()],
            ..SpeechPolicySettings::default()
        };
        let err = SpeechPolicy::from_settings(&settings).err().unwrap();
        assert!(err.to_string().contains("Invalid skip pattern"));
    }
}
