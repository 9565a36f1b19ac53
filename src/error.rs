use thiserror::Error;

/// Fatal errors. Per-probe failures never surface here; they become
/// [`ProbeOutcome`](crate::result::ProbeOutcome) values instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("missing credential (checked {checked})")]
    MissingCredential { checked: String },

    #[error("no models to probe")]
    NoModels,

    #[error("invalid base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("unknown profile: {name}")]
    UnknownProfile {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl ProbeError {
    /// Message for terminal output. Adds profile suggestions when there are any.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownProfile { name, suggestions } => {
                if suggestions.is_empty() {
                    format!("unknown profile: {name}")
                } else {
                    format!(
                        "unknown profile: {name}. Did you mean: {}?",
                        suggestions.join(", ")
                    )
                }
            }
            Self::MissingCredential { checked } => {
                format!("no API key available (checked {checked})")
            }
            other => other.to_string(),
        }
    }
}
