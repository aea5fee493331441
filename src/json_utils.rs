use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Remove markdown code fence lines from a model response.
///
/// A line opening a fence (optionally tagged `json`, any case) loses the fence
/// and whatever whitespace follows it; a line holding only a closing fence is
/// dropped. Everything else is kept as is.
pub fn strip_code_fences(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();

        if let Some(rest) = strip_prefix_ignore_case(trimmed, JSON_FENCE) {
            let rest = rest.trim();
            if !rest.is_empty() {
                kept.push(rest);
            }
            continue;
        }
        if trimmed.trim_end() == FENCE {
            continue;
        }
        kept.push(line);
    }

    kept.join("\n")
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Strip fences, then parse the remainder as a JSON array of `T`.
#[instrument(target = "quizgen::json", skip(text), fields(text_len = text.len()))]
pub fn parse_fenced_array<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, serde_json::Error> {
    let cleaned = strip_code_fences(text);
    debug!(target: "quizgen::json", cleaned_len = cleaned.len(), "stripped code fences");
    serde_json::from_str::<Vec<T>>(cleaned.trim())
}
