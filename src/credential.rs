//! Credential acquisition strategies.
//!
//! The engine only ever sees a resolved bearer token. Where that token comes
//! from (environment, config, a terminal prompt) is decided by the caller.

use std::io::{BufRead, Write};
use std::sync::Mutex;

/// Source of a bearer credential.
pub trait CredentialProvider: Send + Sync {
    /// Where this provider looks, for error messages ("OPENAI_API_KEY").
    fn describe(&self) -> String;

    /// The credential, or `None` if this source has nothing.
    fn credential(&self) -> Option<String>;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn describe(&self) -> String {
        "credential callback".to_string()
    }

    fn credential(&self) -> Option<String> {
        self()
    }
}

/// Reads an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredential {
    fn describe(&self) -> String {
        self.var.clone()
    }

    fn credential(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// A credential known up front.
#[derive(Clone)]
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticCredential")
            .field(&"[REDACTED]")
            .finish()
    }
}

impl CredentialProvider for StaticCredential {
    fn describe(&self) -> String {
        "static credential".to_string()
    }

    fn credential(&self) -> Option<String> {
        Some(self.0.trim().to_string()).filter(|v| !v.is_empty())
    }
}

/// Asks for the credential interactively. Reads one line from `input`
/// after writing `label` to `output`.
pub struct PromptCredential<R, W> {
    label: String,
    io: Mutex<(R, W)>,
}

impl<R, W> PromptCredential<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(label: impl Into<String>, input: R, output: W) -> Self {
        Self {
            label: label.into(),
            io: Mutex::new((input, output)),
        }
    }
}

impl PromptCredential<std::io::BufReader<std::io::Stdin>, std::io::Stderr> {
    /// Prompt on stderr so stdout stays clean for reports.
    pub fn terminal(label: impl Into<String>) -> Self {
        Self::new(
            label,
            std::io::BufReader::new(std::io::stdin()),
            std::io::stderr(),
        )
    }
}

impl<R, W> CredentialProvider for PromptCredential<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn describe(&self) -> String {
        "interactive prompt".to_string()
    }

    fn credential(&self) -> Option<String> {
        let mut guard = self.io.lock().ok()?;
        let (input, output) = &mut *guard;
        if let Err(e) = write!(output, "{}", self.label).and_then(|_| output.flush()) {
            tracing::warn!("failed to write credential prompt: {e}");
        }
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()).filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("failed to read credential: {e}");
                None
            }
        }
    }
}

/// Tries each provider in order; the first non-empty credential wins.
#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl CredentialProvider for CredentialChain {
    fn describe(&self) -> String {
        if self.providers.is_empty() {
            return "no credential sources".to_string();
        }
        self.providers
            .iter()
            .map(|p| p.describe())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn credential(&self) -> Option<String> {
        self.providers.iter().find_map(|p| p.credential())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_reads_first_line_and_writes_label() {
        let input = std::io::Cursor::new(b"  sk-test  \nignored\n".to_vec());
        let prompt = PromptCredential::new("Enter API key: ", input, Vec::new());
        assert_eq!(prompt.credential().as_deref(), Some("sk-test"));

        let guard = prompt.io.lock().unwrap();
        assert_eq!(String::from_utf8_lossy(&guard.1), "Enter API key: ");
    }

    #[test]
    fn prompt_on_closed_input_yields_nothing() {
        let prompt = PromptCredential::new("key: ", std::io::Cursor::new(Vec::new()), Vec::new());
        assert_eq!(prompt.credential(), None);
    }

    #[test]
    fn chain_skips_empty_sources() {
        let chain = CredentialChain::new()
            .with(|| -> Option<String> { None })
            .with(StaticCredential::new("   "))
            .with(StaticCredential::new("sk-second"));
        assert_eq!(chain.credential().as_deref(), Some("sk-second"));
        assert_eq!(
            chain.describe(),
            "credential callback, static credential, static credential"
        );
    }

    #[test]
    fn missing_env_var_yields_nothing() {
        let provider = EnvCredential::new("MODELPROBE_TEST_SURELY_UNSET_VAR");
        assert_eq!(provider.credential(), None);
        assert_eq!(provider.describe(), "MODELPROBE_TEST_SURELY_UNSET_VAR");
    }

    #[test]
    fn static_credential_debug_is_redacted() {
        let debug = format!("{:?}", StaticCredential::new("sk-secret"));
        assert!(!debug.contains("sk-secret"));
    }
}
