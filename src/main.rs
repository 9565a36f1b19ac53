use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use modelprobe::classify::MatchRule;
use modelprobe::config::{Config, Overrides, PROFILES};
use modelprobe::credential::{
    CredentialChain, CredentialProvider, EnvCredential, PromptCredential,
};
use modelprobe::engine::ProbeEngine;
use modelprobe::error::ProbeError;
use modelprobe::report::{self, ReportFormat, github};
use modelprobe::result::ProbeSummary;

/// Exit code for fatal errors (bad config, no credential), as opposed to
/// `1` for "some models are unavailable".
const EXIT_FATAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Check which models answer on an OpenAI-compatible endpoint",
    long_about = None
)]
struct Args {
    /// Models to probe. Replaces the profile's model list.
    models: Vec<String>,

    /// Built-in profile: ci, deep-assistant, openrouter
    #[arg(long, short)]
    profile: Option<String>,

    /// TOML file with overrides for the selected profile
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[arg(long)]
    base_url: Option<String>,

    /// Environment variable holding the API key
    #[arg(long)]
    api_key_env: Option<String>,

    #[arg(long)]
    prompt: Option<String>,

    #[arg(long)]
    max_tokens: Option<u32>,

    /// Per-request timeout in seconds (0 = unbounded)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Cutoff for the whole run in seconds (0 = none)
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Maximum probes in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// How the echoed model name is compared: exact, lenient, alias
    #[arg(long)]
    match_rule: Option<MatchRule>,

    /// Extra request header, repeatable
    #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Report format: console, markdown, json
    #[arg(long, short, default_value = "console")]
    format: ReportFormat,

    /// Never ask for the API key interactively
    #[arg(long)]
    no_prompt: bool,

    /// Print the built-in profiles and exit
    #[arg(long)]
    list_profiles: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            profile: self.profile.clone(),
            base_url: self.base_url.clone(),
            base_url_env: None,
            api_key_env: self.api_key_env.clone(),
            prompt: self.prompt.clone(),
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
            deadline_secs: self.deadline_secs,
            max_concurrency: self.concurrency,
            match_rule: self.match_rule,
            models: (!self.models.is_empty()).then(|| self.models.clone()),
            headers: (!self.headers.is_empty())
                .then(|| self.headers.iter().cloned().collect::<BTreeMap<_, _>>()),
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    load_dotenv();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            let message = match e.downcast_ref::<ProbeError>() {
                Some(probe_err) => probe_err.user_message(),
                None => format!("{e:#}"),
            };
            eprintln!("Error: {message}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// `.env` next to the binary first, then dotenvy's default CWD search.
fn load_dotenv() {
    let beside_binary = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(".env")))
        .filter(|path| path.exists());
    match beside_binary {
        Some(path) => {
            dotenvy::from_path(&path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    if args.list_profiles {
        for p in PROFILES {
            println!(
                "{:<16} {} ({} models, {}, key from {})",
                p.name,
                p.description,
                p.models.len(),
                p.base_url,
                p.api_key_env
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let file = match &args.config {
        Some(path) => Overrides::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Overrides::default(),
    };
    let config = Config::resolve(file, args.overrides())?;
    let engine = ProbeEngine::new(config.endpoint.clone())?;

    let mut chain = CredentialChain::new().with(EnvCredential::new(&config.api_key_env));
    if !args.no_prompt && std::io::stdin().is_terminal() {
        chain = chain.with(PromptCredential::terminal(format!(
            "Enter API key ({}): ",
            config.api_key_env
        )));
    }
    let checked = chain.describe();
    // The prompt blocks on stdin.
    let credential = tokio::task::spawn_blocking(move || chain.credential())
        .await?
        .ok_or(ProbeError::MissingCredential { checked })?;

    eprintln!(
        "Testing {} model(s) with profile '{}'...",
        config.models.len(),
        config.profile
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling pending probes");
            on_interrupt.cancel();
        }
    });

    let results = engine
        .probe_until(&config.models, &credential, cancel)
        .await?;

    println!("{}", report::render(args.format, &results));

    let summary = ProbeSummary::from_results(&results);
    if let Some(path) = github::output_path_from_env()
        && let Err(e) = github::write_outputs(&path, &summary)
    {
        tracing::warn!("failed to write GitHub Actions outputs: {e}");
    }

    if summary.all_available() {
        eprintln!("✓ All models are available!");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "⚠ Warning: {} of {} model(s) unavailable",
            summary.unavailable_count, summary.total
        );
        Ok(ExitCode::FAILURE)
    }
}
