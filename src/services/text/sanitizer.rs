use regex::Regex;
use std::sync::LazyLock;

pub const URL_PLACEHOLDER: &str = "链接";
pub const MENTION_PREFIX: &str = "艾特";
pub const EMPTY_PLACEHOLDER: &str = "没有有效的文本内容。";

/// Which optional filters run before the mandatory cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    pub brackets: bool,
    pub emoji: bool,
}

impl FilterOptions {
    pub fn from_settings(settings: &crate::config::TtsSettings) -> Self {
        Self {
            brackets: settings.filter_brackets,
            emoji: settings.filter_emoji,
        }
    }
}

// Ordered: ASCII parens, full-width parens, square, corner, curly, angle, title.
static BRACKETS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)\(.*?\)",
        r"(?s)（.*?）",
        r"(?s)\[.*?\]",
        r"(?s)【.*?】",
        r"(?s)\{.*?\}",
        r"(?s)<.*?>",
        r"(?s)《.*?》",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static bracket pattern"))
    .collect()
});

static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}",
        r"\x{1F300}-\x{1F5FF}",
        r"\x{1F680}-\x{1F6FF}",
        r"\x{1F1E0}-\x{1F1FF}",
        r"\x{2600}-\x{26FF}",
        r"\x{2700}-\x{27BF}",
        r"\x{1F900}-\x{1F9FF}",
        r"\x{1FA70}-\x{1FAFF}",
        r"\x{FE00}-\x{FE0F}",
        "]",
    ))
    .expect("static emoji pattern")
});

static MARKDOWN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_~`|]").expect("static markdown pattern"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("static url pattern"));
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@+(\w+)").expect("static mention pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));
// The regex crate has no backreferences, so one pattern per mark.
static REPEATED_PUNCTUATION: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [("，+", "，"), ("。+", "。"), ("！+", "！"), ("？+", "？")]
        .iter()
        .map(|(p, r)| (Regex::new(p).expect("static punctuation pattern"), *r))
        .collect()
});

/// Turns arbitrary chat text into something the inference server can read aloud.
///
/// Never returns an empty string: if nothing survives, [`EMPTY_PLACEHOLDER`] is returned.
pub fn sanitize(text: &str, options: FilterOptions) -> String {
    let mut out = text.to_string();

    if options.brackets {
        for re in BRACKETS.iter() {
            out = re.replace_all(&out, "").into_owned();
        }
    }

    if options.emoji {
        out = EMOJI.replace_all(&out, "").into_owned();
    }

    out = MARKDOWN.replace_all(&out, "").into_owned();
    out = URL.replace_all(&out, URL_PLACEHOLDER).into_owned();
    out = MENTION
        .replace_all(&out, format!("{}${{1}}", MENTION_PREFIX).as_str())
        .into_owned();
    out = WHITESPACE.replace_all(&out, " ").into_owned();

    for (re, single) in REPEATED_PUNCTUATION.iter() {
        out = re.replace_all(&out, *single).into_owned();
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: FilterOptions = FilterOptions {
        brackets: true,
        emoji: true,
    };
    const NONE: FilterOptions = FilterOptions {
        brackets: false,
        emoji: false,
    };

    #[test]
    fn removes_every_bracket_family_with_contents() {
        let cases = [
            "你好(旁白)世界",
            "你好（旁白）世界",
            "你好[旁白]世界",
            "你好【旁白】世界",
            "你好{旁白}世界",
            "你好<旁白>世界",
            "你好《旁白》世界",
        ];
        for case in cases {
            assert_eq!(sanitize(case, ALL), "你好世界", "case {case}");
        }
    }

    #[test]
    fn brackets_spanning_lines_are_removed() {
        assert_eq!(sanitize("开始(第一行\n第二行)结束", ALL), "开始结束");
    }

    #[test]
    fn unmatched_brackets_are_left_alone() {
        assert_eq!(sanitize("左边(没有闭合", ALL), "左边(没有闭合");
        assert_eq!(sanitize("【标题", ALL), "【标题");
    }

    #[test]
    fn brackets_kept_when_filter_disabled() {
        assert_eq!(sanitize("你好(旁白)", NONE), "你好(旁白)");
    }

    #[test]
    fn emoji_toggle() {
        let text = "早上好😀🚀☀✂🤖🫠";
        assert_eq!(sanitize(text, ALL), "早上好");
        assert_eq!(sanitize(text, NONE), text);
    }

    #[test]
    fn strips_markdown_marks() {
        assert_eq!(sanitize("# **重点** ~~删除~~ `代码` |表格|", NONE), "重点 删除 代码 表格");
    }

    #[test]
    fn replaces_links_and_mentions() {
        assert_eq!(
            sanitize("看看 https://example.com/a?b=1 吧", NONE),
            "看看 链接 吧"
        );
        assert_eq!(sanitize("@小明 你好", NONE), "艾特小明 你好");
    }

    #[test]
    fn collapses_whitespace_and_repeated_punctuation() {
        assert_eq!(
            sanitize("  真的吗？？？   太好了！！！，，好。。 ", NONE),
            "真的吗？ 太好了！，好。"
        );
    }

    #[test]
    fn empty_result_becomes_placeholder() {
        assert_eq!(sanitize("", ALL), EMPTY_PLACEHOLDER);
        assert_eq!(sanitize("(全部是旁白)😀", ALL), EMPTY_PLACEHOLDER);
        assert_eq!(sanitize("  **  ", NONE), EMPTY_PLACEHOLDER);
    }

    proptest! {
        #[test]
        fn never_empty(text in ".{0,64}", brackets: bool, emoji: bool) {
            let out = sanitize(&text, FilterOptions { brackets, emoji });
            prop_assert!(!out.is_empty());
        }

        #[test]
        fn second_pass_changes_nothing(
            text in "[a-z0-9 \n@#*_~()（）\\[\\]【】{}<>《》，。！？😀🚀]{0,48}",
            brackets: bool,
            emoji: bool,
        ) {
            let options = FilterOptions { brackets, emoji };
            let once = sanitize(&text, options);
            prop_assert_eq!(sanitize(&once, options), once);
        }
    }
}
