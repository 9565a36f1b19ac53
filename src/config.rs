use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::classify::MatchRule;
use crate::engine::{DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT, EndpointConfig};
use crate::error::ProbeError;

pub const DEFAULT_PROFILE: &str = "ci";

/// Built-in endpoint settings and default model list.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub name: &'static str,
    pub description: &'static str,
    pub base_url: &'static str,
    /// Environment variable that overrides `base_url`.
    pub base_url_env: &'static str,
    pub api_key_env: &'static str,
    pub prompt: &'static str,
    pub max_tokens: u32,
    pub match_rule: MatchRule,
    pub headers: &'static [(&'static str, &'static str)],
    pub models: &'static [&'static str],
}

const DEEP_ASSISTANT_BASE: &str = "https://api.deep.assistant.run.place/v1";

const CI_MODELS: &[&str] = &[
    "o3-mini",
    "o1-preview",
    "o1-mini",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-3.5-turbo",
    "gpt-auto",
    "claude-3-opus",
    "claude-3-5-sonnet",
    "claude-3-5-haiku",
    "claude-3-7-sonnet",
    "deepseek-chat",
    "deepseek-reasoner",
];

const DEEP_ASSISTANT_MODELS: &[&str] = &[
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
    "gpt-auto",
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
    "meta-llama/Meta-Llama-3.3-70B-Instruct",
    "meta-llama/Llama-3.3-70B-Instruct-Turbo",
    "microsoft/WizardLM-2-7B",
    "microsoft/WizardLM-2-8x22B",
];

const OPENROUTER_MODELS: &[&str] = &[
    // Frontier reasoning
    "openai/gpt-5-pro",
    "openai/gpt-5.1",
    "anthropic/claude-opus-4.5",
    "anthropic/claude-sonnet-4.5",
    "anthropic/claude-haiku-4.5",
    // Coding
    "openai/gpt-5.1-codex",
    "kwaipilot/kat-coder-pro:free",
    // Reasoning
    "deepseek/deepseek-v3.2",
    "google/gemini-3-pro-preview",
    "google/gemini-2.5-flash-preview-09-2025",
    "moonshotai/kimi-k2-thinking",
    // Vision
    "z-ai/glm-4.6v",
    "qwen/qwen3-vl-235b-a22b-instruct",
    "nvidia/nemotron-nano-12b-v2-vl",
    // Open weights
    "mistralai/mistral-large-2512",
    "mistralai/ministral-14b-2512",
    "amazon/nova-2-lite-v1:free",
    "allenai/olmo-3-32b-think:free",
    // Research
    "perplexity/sonar-pro-search",
    "prime-intellect/intellect-3",
    "minimax/minimax-m2",
    "x-ai/grok-4.1-fast",
    // Legacy
    "openai/gpt-4o",
    "openai/gpt-4o-mini",
    "anthropic/claude-3.5-sonnet",
    "anthropic/claude-3-opus",
    "google/gemini-pro",
    "meta-llama/llama-3.3-70b-instruct",
    "deepseek/deepseek-chat",
    "qwen/qwen-2.5-72b-instruct",
];

pub const PROFILES: &[Profile] = &[
    Profile {
        name: "ci",
        description: "Deep.Assistant availability gate for CI",
        base_url: DEEP_ASSISTANT_BASE,
        base_url_env: "OPENAI_API_BASE",
        api_key_env: "OPENAI_API_KEY",
        prompt: "Test",
        max_tokens: 10,
        match_rule: MatchRule::Lenient,
        headers: &[],
        models: CI_MODELS,
    },
    Profile {
        name: "deep-assistant",
        description: "Full Deep.Assistant catalogue with alias-aware matching",
        base_url: DEEP_ASSISTANT_BASE,
        base_url_env: "OPENAI_API_BASE",
        api_key_env: "OPENAI_API_KEY",
        prompt: "hi",
        max_tokens: 20,
        match_rule: MatchRule::Alias,
        headers: &[],
        models: DEEP_ASSISTANT_MODELS,
    },
    Profile {
        name: "openrouter",
        description: "OpenRouter model catalogue",
        base_url: "https://openrouter.ai/api/v1",
        base_url_env: "OPENROUTER_API_BASE",
        api_key_env: "OPENROUTER_API_KEY",
        prompt: "hi",
        max_tokens: 20,
        match_rule: MatchRule::Lenient,
        headers: &[
            ("HTTP-Referer", "https://github.com/link-assistant/api-tester"),
            ("X-Title", "API Tester - OpenRouter Model Checker"),
        ],
        models: OPENROUTER_MODELS,
    },
];

pub fn profile(name: &str) -> Result<&'static Profile, ProbeError> {
    let wanted = name.trim();
    PROFILES
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| ProbeError::UnknownProfile {
            name: wanted.to_string(),
            suggestions: suggest_profiles(wanted),
        })
}

/// Suggest profile names for a failed lookup (substring match either way).
pub fn suggest_profiles(query: &str) -> Vec<String> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return vec![];
    }
    let mut suggestions: Vec<String> = PROFILES
        .iter()
        .map(|p| p.name)
        .filter(|name| name.contains(&q) || q.contains(name))
        .map(str::to_string)
        .collect();
    suggestions.sort();
    suggestions
}

/// Optional settings layered over a profile. Used both for the TOML file
/// and for command-line overrides.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Overrides {
    pub profile: Option<String>,
    pub base_url: Option<String>,
    pub base_url_env: Option<String>,
    pub api_key_env: Option<String>,
    pub prompt: Option<String>,
    pub max_tokens: Option<u32>,
    /// `0` disables the per-request timeout.
    pub timeout_secs: Option<u64>,
    /// `0` disables the overall deadline.
    pub deadline_secs: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub match_rule: Option<MatchRule>,
    pub models: Option<Vec<String>>,
    pub headers: Option<BTreeMap<String, String>>,
}

impl Overrides {
    pub fn load(path: &Path) -> Result<Self, ProbeError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ProbeError> {
        Ok(toml::from_str(text)?)
    }

    /// Fields set in `other` win.
    pub fn merged_with(self, other: Overrides) -> Overrides {
        Overrides {
            profile: other.profile.or(self.profile),
            base_url: other.base_url.or(self.base_url),
            base_url_env: other.base_url_env.or(self.base_url_env),
            api_key_env: other.api_key_env.or(self.api_key_env),
            prompt: other.prompt.or(self.prompt),
            max_tokens: other.max_tokens.or(self.max_tokens),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            deadline_secs: other.deadline_secs.or(self.deadline_secs),
            max_concurrency: other.max_concurrency.or(self.max_concurrency),
            match_rule: other.match_rule.or(self.match_rule),
            models: other.models.or(self.models),
            headers: match (self.headers, other.headers) {
                (Some(mut base), Some(top)) => {
                    base.extend(top);
                    Some(base)
                }
                (base, top) => top.or(base),
            },
        }
    }
}

/// Fully resolved run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub profile: String,
    pub endpoint: EndpointConfig,
    pub api_key_env: String,
    pub models: Vec<String>,
}

impl Config {
    /// Resolve against the process environment.
    ///
    /// Precedence, lowest first: profile, config file, base-url environment
    /// variable, command line.
    pub fn resolve(file: Overrides, cli: Overrides) -> Result<Self, ProbeError> {
        Self::resolve_with_env(file, cli, |var| std::env::var(var).ok())
    }

    pub fn resolve_with_env(
        file: Overrides,
        cli: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProbeError> {
        let profile_name = cli
            .profile
            .clone()
            .or_else(|| file.profile.clone())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let profile = profile(&profile_name)?;

        let cli_base_url = cli.base_url.clone();
        let layered = file.merged_with(cli);

        let base_url_env = layered
            .base_url_env
            .clone()
            .unwrap_or_else(|| profile.base_url_env.to_string());
        let env_base_url = env(&base_url_env).filter(|v| !v.trim().is_empty());

        let base_url = cli_base_url
            .or(env_base_url)
            .or(layered.base_url)
            .unwrap_or_else(|| profile.base_url.to_string());

        let max_tokens = layered.max_tokens.unwrap_or(profile.max_tokens);
        if max_tokens == 0 {
            return Err(ProbeError::Config("max_tokens must be at least 1".to_string()));
        }

        let max_concurrency = layered.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            return Err(ProbeError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        let timeout = match layered.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_TIMEOUT),
        };
        let deadline = layered
            .deadline_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let mut headers: BTreeMap<String, String> = profile
            .headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        headers.extend(layered.headers.unwrap_or_default());

        let models = layered
            .models
            .unwrap_or_else(|| profile.models.iter().map(|m| m.to_string()).collect());

        let endpoint = EndpointConfig {
            base_url,
            prompt: layered.prompt.unwrap_or_else(|| profile.prompt.to_string()),
            max_tokens,
            timeout,
            deadline,
            max_concurrency,
            match_rule: layered.match_rule.unwrap_or(profile.match_rule),
            headers: headers.into_iter().collect(),
        };

        Ok(Config {
            profile: profile.name.to_string(),
            endpoint,
            api_key_env: layered
                .api_key_env
                .unwrap_or_else(|| profile.api_key_env.to_string()),
            models,
        })
    }
}
