//! Best-effort decoder for JSON the model was asked to return raw.
//!
//! Grammar: optional leading/trailing Markdown fences (with or without a
//! language tag) around exactly one well-formed JSON value. Anything else,
//! including prose around the JSON, decodes to the type's fallback.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Value returned when a structured model response cannot be decoded.
pub trait StructuredFallback {
    fn fallback() -> Self;
}

/// Removes one fence pair at the ends of the text. Backticks inside the
/// JSON are left alone.
pub fn strip_code_fences(raw: &str) -> String {
    let mut cleaned = raw.trim().to_string();
    if let Ok(re) = Regex::new(r"^```[A-Za-z0-9_+-]*\s*") {
        cleaned = re.replace(&cleaned, "").into_owned();
    }
    if let Ok(re) = Regex::new(r"\s*```$") {
        cleaned = re.replace(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

/// Total: always yields a `T`, never an error.
pub fn parse_structured<T>(raw: &str) -> T
where
    T: DeserializeOwned + StructuredFallback,
{
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<T>(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            log::warn!(
                "Structured output did not decode ({}), using fallback. Raw: {}",
                e,
                raw.chars().take(200).collect::<String>()
            );
            T::fallback()
        }
    }
}

/// Judge output gating a critique-refine loop.
///
/// Accepts the judges' own field names (`is_convinced`, `is_valid`) as
/// aliases for `is_acceptable`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Verdict {
    #[serde(alias = "is_convinced", alias = "is_valid", alias = "isAcceptable")]
    pub is_acceptable: bool,
    pub rationale: String,
}

impl Verdict {
    pub fn accepted(rationale: impl Into<String>) -> Self {
        Verdict {
            is_acceptable: true,
            rationale: rationale.into(),
        }
    }

    pub fn rejected(rationale: impl Into<String>) -> Self {
        Verdict {
            is_acceptable: false,
            rationale: rationale.into(),
        }
    }
}

impl StructuredFallback for Verdict {
    fn fallback() -> Self {
        Verdict::rejected("Invalid format from judge, treated as not acceptable.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_and_without_language_tag() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```javascript\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn any_language_tag_still_yields_the_verdict() {
        for tag in ["JSON", "Json", "javascript", "json5"] {
            let verdict: Verdict = parse_structured(&format!(
                "```{tag}\n{{\"is_valid\": true, \"rationale\": \"specific\"}}\n```"
            ));
            assert_eq!(verdict, Verdict::accepted("specific"), "tag: {tag}");
        }
    }

    #[test]
    fn backticks_inside_values_survive() {
        let verdict: Verdict = parse_structured(
            "```json\n{\"is_convinced\": false, \"rationale\": \"quote `price` less\"}\n```",
        );
        assert_eq!(verdict, Verdict::rejected("quote `price` less"));
    }

    #[test]
    fn parses_fenced_and_unfenced_verdicts() {
        let fenced: Verdict =
            parse_structured("```json\n{\"is_convinced\": true, \"rationale\": \"clear value\"}\n```");
        assert_eq!(fenced, Verdict::accepted("clear value"));

        let plain: Verdict = parse_structured("{\"is_valid\": false, \"rationale\": \"too generic\"}");
        assert_eq!(plain, Verdict::rejected("too generic"));
    }

    #[test]
    fn parser_is_total() {
        let inputs = [
            "",
            "The customer would probably agree.",
            "{\"is_convinced\": true",
            "{\"rationale\": \"missing flag\"}",
            "[1, 2, 3]",
            "```json\n```",
            "Sure! {\"is_valid\": true, \"rationale\": \"ok\"}",
        ];
        for input in inputs {
            let verdict: Verdict = parse_structured(input);
            assert_eq!(verdict, Verdict::fallback(), "input: {input:?}");
        }
    }
}
