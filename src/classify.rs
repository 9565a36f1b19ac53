//! Maps a raw HTTP exchange to a [`ProbeOutcome`].
//!
//! Transport failures are classified by the engine before anything here runs;
//! these functions only see exchanges where a status line was received.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::ProbeOutcome;

/// How the echoed `model` field is compared with the requested identifier.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchRule {
    /// Echoed value must equal the requested identifier.
    Exact,
    /// Exact match, or for `provider/model` identifiers the part after the
    /// first `/` appearing anywhere in the echoed value. Providers commonly
    /// echo dated or versioned names (`gpt-4o-mini-2024-07-18`).
    #[default]
    Lenient,
    /// Both sides are normalized through [`normalize_alias`] before comparing.
    Alias,
}

impl MatchRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Lenient => "lenient",
            Self::Alias => "alias",
        }
    }
}

impl FromStr for MatchRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "lenient" => Ok(Self::Lenient),
            "alias" => Ok(Self::Alias),
            other => Err(format!(
                "unknown match rule '{other}' (expected exact, lenient or alias)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: ProbeOutcome,
    pub actual_model_id: Option<String>,
    pub status_message: String,
}

#[derive(Deserialize)]
struct CompletionEcho {
    model: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Classify a response that arrived with an HTTP status.
pub fn classify_response(
    requested: &str,
    status: u16,
    body: &[u8],
    rule: MatchRule,
) -> Classification {
    if !(200..300).contains(&status) {
        let status_message = match error_message(body) {
            Some(message) => format!("HTTP {status}: {message}"),
            None => format!("HTTP {status}"),
        };
        return Classification {
            outcome: ProbeOutcome::HttpError,
            actual_model_id: None,
            status_message,
        };
    }

    let echo: CompletionEcho = match serde_json::from_slice(body) {
        Ok(echo) => echo,
        Err(e) => {
            return Classification {
                outcome: ProbeOutcome::MalformedResponse,
                actual_model_id: None,
                status_message: format!("Malformed response: {e}"),
            };
        }
    };

    let Some(echoed) = echo.model else {
        return Classification {
            outcome: ProbeOutcome::MalformedResponse,
            actual_model_id: None,
            status_message: "Malformed response: no model field".to_string(),
        };
    };

    if model_matches(requested, &echoed, rule) {
        Classification {
            outcome: ProbeOutcome::Success,
            actual_model_id: Some(echoed),
            status_message: "Success".to_string(),
        }
    } else {
        Classification {
            outcome: ProbeOutcome::WrongModel,
            status_message: format!("Wrong model: {echoed}"),
            actual_model_id: Some(echoed),
        }
    }
}

/// Extract `error.message` from an error body, if it has one.
fn error_message(body: &[u8]) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_slice(body).ok()?;
    envelope
        .error?
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

pub fn model_matches(requested: &str, echoed: &str, rule: MatchRule) -> bool {
    if requested == echoed {
        return true;
    }
    match rule {
        MatchRule::Exact => false,
        MatchRule::Lenient => requested
            .split_once('/')
            .map(|(_, base)| base)
            .filter(|base| !base.is_empty())
            .is_some_and(|base| echoed.contains(base)),
        MatchRule::Alias => {
            let wanted = normalize_alias(requested).unwrap_or(requested);
            if wanted == "gpt-auto" && echoed.contains("gpt") {
                return true;
            }
            let got = normalize_alias(echoed).unwrap_or(echoed);
            wanted == got
        }
    }
}

/// Model ids the alias rule recognizes inside longer, versioned names.
const KNOWN_MODELS: &[&str] = &[
    "o4-mini",
    "o4-mini-high",
    "o4-mini-deep-research",
    "o3-mini",
    "o3-mini-high",
    "o3",
    "o3-pro",
    "o3-deep-research",
    "o1",
    "o1-pro",
    "o1-preview",
    "o1-mini",
    "gpt-4.5",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "gpt-4o",
    "gpt-4o-realtime-preview",
    "gpt-4o-transcribe",
    "gpt-4o-search-preview",
    "gpt-4o-audio-preview",
    "chatgpt-4o-latest",
    "gpt-4o-mini",
    "gpt-4o-mini-tts",
    "gpt-4o-mini-realtime-preview",
    "gpt-4o-mini-transcribe",
    "gpt-4o-mini-search-preview",
    "gpt-4o-mini-audio-preview",
    "gpt-4",
    "gpt-4-turbo",
    "gpt-3.5-turbo",
    "computer-use-preview",
    "codex-mini-latest",
    "gpt-image-1",
    "dall-e-3",
    "dall-e-2",
    "tts-1",
    "tts-1-hd",
    "whisper-1",
    "claude-3-opus",
    "claude-4-opus",
    "claude-3-5-sonnet",
    "claude-3-5-haiku",
    "claude-3-7-sonnet",
    "claude-4-sonnet",
    "deepseek-chat",
    "deepseek-reasoner",
    "gpt-auto",
    "microsoft/WizardLM-2-7B",
    "microsoft/WizardLM-2-8x22B",
];

/// Fallback patterns checked, in order, when no known id is contained.
const SPECIAL_ALIASES: &[(&str, &str)] = &[
    ("gpt-4o-plus", "gpt-4o"),
    ("gpt-4o-2024", "gpt-4o"),
    ("deepseek-r1", "deepseek-reasoner"),
    ("gpt-4-gizmo", "gpt-4-unofficial"),
    ("o1-2024-12-17", "o1-preview"),
    ("Llama-3.1-405B", "meta-llama/Meta-Llama-3.1-405B-Instruct"),
    ("Llama-3.1-70B", "meta-llama/Meta-Llama-3.1-70B-Instruct"),
    ("Llama-3.1-8B", "meta-llama/Meta-Llama-3.1-8B-Instruct"),
    ("Llama-3.3-70B", "meta-llama/Meta-Llama-3.3-70B-Instruct"),
    ("auto", "gpt-auto"),
];

/// Canonical id for a possibly versioned model name.
///
/// The longest known id contained in `model` wins, so `gpt-4o-mini-2024-07-18`
/// maps to `gpt-4o-mini` rather than `gpt-4o`.
pub fn normalize_alias(model: &str) -> Option<&'static str> {
    if model.is_empty() {
        return None;
    }
    if let Some(known) = KNOWN_MODELS
        .iter()
        .filter(|known| model.contains(**known))
        .max_by_key(|known| known.len())
    {
        return Some(*known);
    }
    SPECIAL_ALIASES
        .iter()
        .find(|(pattern, _)| model.contains(pattern))
        .map(|(_, target)| *target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_echo_is_success() {
        let c = classify_response(
            "gpt-4o-mini",
            200,
            br#"{"model":"gpt-4o-mini"}"#,
            MatchRule::Lenient,
        );
        assert_eq!(c.outcome, ProbeOutcome::Success);
        assert_eq!(c.actual_model_id.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn different_echo_is_wrong_model() {
        let c = classify_response(
            "gpt-4o-mini",
            200,
            br#"{"model":"gpt-4o"}"#,
            MatchRule::Lenient,
        );
        assert_eq!(c.outcome, ProbeOutcome::WrongModel);
        assert_eq!(c.actual_model_id.as_deref(), Some("gpt-4o"));
        assert_eq!(c.status_message, "Wrong model: gpt-4o");
    }

    #[test]
    fn namespaced_id_matches_on_unprefixed_substring() {
        assert!(model_matches(
            "openai/gpt-4o-mini",
            "gpt-4o-mini-2024",
            MatchRule::Lenient
        ));
        assert!(!model_matches(
            "openai/gpt-4o-mini",
            "gpt-4o-mini-2024",
            MatchRule::Exact
        ));
    }

    #[test]
    fn unprefixed_id_gets_no_substring_leniency() {
        assert!(!model_matches("gpt-4o", "gpt-4o-2024-08-06", MatchRule::Lenient));
    }

    #[test]
    fn empty_base_after_slash_never_matches() {
        assert!(!model_matches("openai/", "anything", MatchRule::Lenient));
    }

    #[test]
    fn http_error_appends_nested_message() {
        let c = classify_response(
            "m",
            429,
            br#"{"error":{"message":"rate limited"}}"#,
            MatchRule::Lenient,
        );
        assert_eq!(c.outcome, ProbeOutcome::HttpError);
        assert_eq!(c.status_message, "HTTP 429: rate limited");
    }

    #[test]
    fn http_error_without_json_falls_back_to_code() {
        let c = classify_response("m", 502, b"<html>bad gateway</html>", MatchRule::Lenient);
        assert_eq!(c.status_message, "HTTP 502");

        let c = classify_response("m", 400, br#"{"error":"flat string"}"#, MatchRule::Lenient);
        assert_eq!(c.status_message, "HTTP 400");
    }

    #[test]
    fn success_body_without_model_is_malformed() {
        let c = classify_response("m", 200, br#"{"id":"x"}"#, MatchRule::Lenient);
        assert_eq!(c.outcome, ProbeOutcome::MalformedResponse);

        let c = classify_response("m", 200, b"not json", MatchRule::Lenient);
        assert_eq!(c.outcome, ProbeOutcome::MalformedResponse);
    }

    #[test]
    fn alias_normalizes_versioned_names() {
        assert_eq!(normalize_alias("gpt-4o-mini-2024-07-18"), Some("gpt-4o-mini"));
        assert_eq!(normalize_alias("gpt-4o-2024-11-20"), Some("gpt-4o"));
        assert_eq!(normalize_alias("deepseek-r1-distill"), Some("deepseek-reasoner"));
        assert_eq!(normalize_alias("something-else"), None);
        assert!(model_matches(
            "gpt-4o",
            "gpt-4o-2024-11-20",
            MatchRule::Alias
        ));
        assert!(!model_matches("gpt-4o", "gpt-4o-mini", MatchRule::Alias));
    }

    #[test]
    fn gpt_auto_accepts_any_gpt_model() {
        assert!(model_matches("gpt-auto", "gpt-4.1-mini", MatchRule::Alias));
        assert!(!model_matches("gpt-auto", "claude-3-5-haiku", MatchRule::Alias));
    }

    #[test]
    fn match_rule_parses_case_insensitively() {
        assert_eq!("Alias".parse::<MatchRule>(), Ok(MatchRule::Alias));
        assert!("fuzzy".parse::<MatchRule>().is_err());
    }
}
