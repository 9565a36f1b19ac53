//! Profile resolution and override precedence.

use std::collections::HashMap;
use std::time::Duration;

use modelprobe::classify::MatchRule;
use modelprobe::config::{Config, Overrides, PROFILES, profile};
use modelprobe::engine::DEFAULT_TIMEOUT;
use modelprobe::error::ProbeError;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |var: &str| map.get(var).cloned()
}

fn cli_profile(name: &str) -> Overrides {
    Overrides {
        profile: Some(name.to_string()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Built-in profiles
// ---------------------------------------------------------------------------

#[test]
fn default_profile_is_ci_gate() {
    let config = Config::resolve_with_env(Overrides::default(), Overrides::default(), no_env)
        .unwrap();

    assert_eq!(config.profile, "ci");
    assert_eq!(config.api_key_env, "OPENAI_API_KEY");
    assert_eq!(config.endpoint.base_url, "https://api.deep.assistant.run.place/v1");
    assert_eq!(config.endpoint.prompt, "Test");
    assert_eq!(config.endpoint.max_tokens, 10);
    assert_eq!(config.endpoint.timeout, Some(DEFAULT_TIMEOUT));
    assert_eq!(config.models.len(), 13);
    assert!(config.models.contains(&"deepseek-reasoner".to_string()));
}

#[test]
fn openrouter_profile_sends_identification_headers() {
    let config =
        Config::resolve_with_env(Overrides::default(), cli_profile("openrouter"), no_env)
            .unwrap();

    assert_eq!(config.api_key_env, "OPENROUTER_API_KEY");
    assert_eq!(config.endpoint.base_url, "https://openrouter.ai/api/v1");
    assert_eq!(config.endpoint.match_rule, MatchRule::Lenient);
    let header_names: Vec<&str> = config
        .endpoint
        .headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect();
    assert!(header_names.contains(&"HTTP-Referer"));
    assert!(header_names.contains(&"X-Title"));
    assert!(config.models.iter().all(|m| m.contains('/')));
}

#[test]
fn every_profile_has_unique_models() {
    for p in PROFILES {
        let mut models: Vec<&str> = p.models.to_vec();
        models.sort();
        models.dedup();
        assert_eq!(models.len(), p.models.len(), "duplicate model in {}", p.name);
        assert!(p.max_tokens > 0 && p.max_tokens <= 20);
    }
}

#[test]
fn unknown_profile_suggests_close_names() {
    let err = profile("router").unwrap_err();
    match &err {
        ProbeError::UnknownProfile { name, suggestions } => {
            assert_eq!(name, "router");
            assert_eq!(suggestions, &vec!["openrouter".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.user_message().contains("Did you mean: openrouter"));
}

#[test]
fn profile_lookup_ignores_case() {
    assert_eq!(profile("OpenRouter").unwrap().name, "openrouter");
}

// ---------------------------------------------------------------------------
// Layering
// ---------------------------------------------------------------------------

#[test]
fn file_overrides_profile_and_cli_overrides_file() {
    let file = Overrides::parse(
        r#"
        profile = "deep-assistant"
        prompt = "ping"
        max_tokens = 5
        timeout_secs = 15
        models = ["gpt-4o", "o3-mini"]

        [headers]
        X-Team = "infra"
        "#,
    )
    .unwrap();
    let cli = Overrides {
        max_tokens: Some(12),
        models: Some(vec!["claude-3-opus".to_string()]),
        ..Default::default()
    };

    let config = Config::resolve_with_env(file, cli, no_env).unwrap();

    assert_eq!(config.profile, "deep-assistant");
    assert_eq!(config.endpoint.match_rule, MatchRule::Alias);
    assert_eq!(config.endpoint.prompt, "ping");
    assert_eq!(config.endpoint.max_tokens, 12);
    assert_eq!(config.endpoint.timeout, Some(Duration::from_secs(15)));
    assert_eq!(config.models, vec!["claude-3-opus".to_string()]);
    assert_eq!(
        config.endpoint.headers,
        vec![("X-Team".to_string(), "infra".to_string())]
    );
}

#[test]
fn base_url_env_beats_file_but_not_cli() {
    let file = Overrides {
        base_url: Some("http://from-file/v1".to_string()),
        ..Default::default()
    };
    let env = env_from(&[("OPENAI_API_BASE", "http://from-env/v1")]);

    let config = Config::resolve_with_env(file.clone(), Overrides::default(), &env).unwrap();
    assert_eq!(config.endpoint.base_url, "http://from-env/v1");

    let cli = Overrides {
        base_url: Some("http://from-cli/v1".to_string()),
        ..Default::default()
    };
    let config = Config::resolve_with_env(file, cli, &env).unwrap();
    assert_eq!(config.endpoint.base_url, "http://from-cli/v1");
}

#[test]
fn openrouter_reads_its_own_base_url_variable() {
    let env = env_from(&[
        ("OPENAI_API_BASE", "http://wrong/v1"),
        ("OPENROUTER_API_BASE", "http://proxy/api/v1"),
    ]);
    let config =
        Config::resolve_with_env(Overrides::default(), cli_profile("openrouter"), env).unwrap();
    assert_eq!(config.endpoint.base_url, "http://proxy/api/v1");
}

#[test]
fn zero_timeout_means_unbounded_and_zero_deadline_means_none() {
    let cli = Overrides {
        timeout_secs: Some(0),
        deadline_secs: Some(0),
        ..Default::default()
    };
    let config = Config::resolve_with_env(Overrides::default(), cli, no_env).unwrap();
    assert_eq!(config.endpoint.timeout, None);
    assert_eq!(config.endpoint.deadline, None);

    let cli = Overrides {
        deadline_secs: Some(90),
        ..Default::default()
    };
    let config = Config::resolve_with_env(Overrides::default(), cli, no_env).unwrap();
    assert_eq!(config.endpoint.deadline, Some(Duration::from_secs(90)));
}

#[test]
fn zero_limits_are_rejected() {
    let cli = Overrides {
        max_concurrency: Some(0),
        ..Default::default()
    };
    assert!(matches!(
        Config::resolve_with_env(Overrides::default(), cli, no_env),
        Err(ProbeError::Config(_))
    ));

    let cli = Overrides {
        max_tokens: Some(0),
        ..Default::default()
    };
    assert!(matches!(
        Config::resolve_with_env(Overrides::default(), cli, no_env),
        Err(ProbeError::Config(_))
    ));
}

#[test]
fn config_file_rejects_unknown_keys() {
    let err = Overrides::parse("timeout = 5").unwrap_err();
    assert!(matches!(err, ProbeError::ConfigParse(_)));
}

#[test]
fn config_file_parses_match_rule() {
    let file = Overrides::parse(r#"match_rule = "exact""#).unwrap();
    assert_eq!(file.match_rule, Some(MatchRule::Exact));
}
