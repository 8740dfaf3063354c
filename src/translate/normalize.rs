//! Text cleanup for fragments coming out of the upstream stream.
//!
//! chat.z.ai wraps its reasoning in HTML-ish markup (`<details>`, `<summary>`,
//! blockquote prefixes) meant for its own web UI. Everything here is pure: no
//! state, no I/O.

use crate::error::ProxyError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

/// Closing tag of the block the upstream replays at the start of the first
/// answer frame.
pub const DETAILS_END_TAG: &str = "</details>";

/// How `<details>` wrappers are treated. `strip` is the only mode the
/// upstream's markup can be cleaned with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkTagsMode {
    #[default]
    Strip,
}

impl FromStr for ThinkTagsMode {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strip" => Ok(Self::Strip),
            other => Err(ProxyError::config(format!(
                "Unsupported think tags mode '{other}'. Supported modes: strip"
            ))),
        }
    }
}

struct Patterns {
    summary: Regex,
    wrappers: Regex,
    details: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        summary: Regex::new(r"(?s)<summary>.*?</summary>").expect("summary pattern is valid"),
        wrappers: Regex::new(r"</thinking>|<Full>|</Full>").expect("wrapper pattern is valid"),
        details: Regex::new(r"<details[^>]*>|</details>").expect("details pattern is valid"),
    })
}

/// Clean one fragment of upstream text.
///
/// The cleanup pass is repeated until the text stops changing, so
/// `normalize(&normalize(x, m), m) == normalize(x, m)` for every input.
/// Each step only deletes characters, which bounds the loop.
pub fn normalize(text: &str, mode: ThinkTagsMode) -> String {
    let mut current = normalize_pass(text, mode);
    loop {
        let next = normalize_pass(&current, mode);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(text: &str, mode: ThinkTagsMode) -> String {
    if text.is_empty() {
        return String::new();
    }

    let p = patterns();
    let without_summary = p.summary.replace_all(text, "");
    let without_wrappers = p.wrappers.replace_all(&without_summary, "");
    let trimmed = without_wrappers.trim();

    let unwrapped = match mode {
        ThinkTagsMode::Strip => p.details.replace_all(trimmed, ""),
    };

    let unquoted = unwrapped.strip_prefix("> ").unwrap_or(&unwrapped);
    unquoted.replace("\n> ", "\n").trim().to_string()
}

/// Drop the thinking text the upstream replays ahead of the real answer.
///
/// Returns the part after the first `</details>`, or the input unchanged if
/// the tag is absent. Only meant for the first answer frame of a stream.
pub fn strip_replayed_thinking(text: &str) -> &str {
    match text.find(DETAILS_END_TAG) {
        Some(pos) => &text[pos + DETAILS_END_TAG.len()..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(text: &str) -> String {
        normalize(text, ThinkTagsMode::Strip)
    }

    #[test]
    fn test_blockquote_lines_are_unindented() {
        assert_eq!(strip("> step 1\n> step 2"), "step 1\nstep 2");
    }

    #[test]
    fn test_summary_block_removed_across_newlines() {
        let text = "<summary>Thinking\nfor 3s</summary>\n> the idea";
        assert_eq!(strip(text), "the idea");
    }

    #[test]
    fn test_summary_match_is_not_greedy() {
        let text = "<summary>a</summary>keep<summary>b</summary>";
        assert_eq!(strip(text), "keep");
    }

    #[test]
    fn test_wrapper_tokens_removed() {
        assert_eq!(strip("<Full>answer</Full></thinking>"), "answer");
    }

    #[test]
    fn test_details_tags_removed_with_attributes() {
        let text = "<details type=\"reasoning\" done=\"true\" duration=\"2\">\n> hmm\n</details>";
        assert_eq!(strip(text), "hmm");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(strip("Hello, world!"), "Hello, world!");
        assert_eq!(strip(""), "");
        assert_eq!(strip("   "), "");
    }

    #[test]
    fn test_only_leading_marker_needs_space() {
        assert_eq!(strip(">no space"), ">no space");
        assert_eq!(strip("a > b"), "a > b");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "> > nested",
            "<sum<summary>x</summary>mary>y</summary>z",
            "  > \n> > deep\n> > quote ",
            "<details>\n> a\n</details>\n\nb",
            "<details <details>>x",
            "</thi</thinking>nking>tail",
            "> step 1\n> step 2",
            "plain",
        ];
        for input in inputs {
            let once = strip(input);
            assert_eq!(strip(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_strip_replayed_thinking_keeps_suffix() {
        assert_eq!(
            strip_replayed_thinking("filler</details>Hello, world!"),
            "Hello, world!"
        );
    }

    #[test]
    fn test_strip_replayed_thinking_uses_first_tag() {
        assert_eq!(strip_replayed_thinking("a</details>b</details>c"), "b</details>c");
    }

    #[test]
    fn test_strip_replayed_thinking_without_tag() {
        assert_eq!(strip_replayed_thinking("just an answer"), "just an answer");
    }

    #[test]
    fn test_think_tags_mode_parsing() {
        assert_eq!("strip".parse::<ThinkTagsMode>().unwrap(), ThinkTagsMode::Strip);
        assert_eq!(" STRIP ".parse::<ThinkTagsMode>().unwrap(), ThinkTagsMode::Strip);
        assert!("raw".parse::<ThinkTagsMode>().is_err());
    }
}
