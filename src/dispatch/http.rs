use std::error::Error as _;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::dispatch::{ModelProbeRequest, RawExchange, TransportFailure};
use crate::error::ProbeError;

pub const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024; // 2MB

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared, connection-pooled client bound to one endpoint.
#[derive(Debug)]
pub struct HttpDispatch {
    client: Client,
    endpoint: String,
    extra_headers: HeaderMap,
}

impl HttpDispatch {
    pub fn new(base_url: &str, extra_headers: &[(String, String)]) -> Result<Self, ProbeError> {
        let endpoint = completions_url(base_url)?;

        let mut headers = HeaderMap::new();
        for (name, value) in extra_headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ProbeError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| ProbeError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(16)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            extra_headers: headers,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one probe. Exactly one attempt, no retries.
    pub async fn send(
        &self,
        req: &ModelProbeRequest,
        credential: &str,
        timeout: Option<Duration>,
    ) -> Result<RawExchange, TransportFailure> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .headers(self.extra_headers.clone())
            .header(AUTHORIZATION, format!("Bearer {credential}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&req.body());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_failure(&e, timeout))?;

        let status = response.status().as_u16();

        if response
            .content_length()
            .is_some_and(|len| len > MAX_RESPONSE_BYTES as u64)
        {
            return Err(TransportFailure::Other(format!(
                "response too large: {} bytes (max {MAX_RESPONSE_BYTES})",
                response.content_length().unwrap_or_default()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_failure(&e, timeout))?;

        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(TransportFailure::Other(format!(
                "response too large: {} bytes (max {MAX_RESPONSE_BYTES})",
                bytes.len()
            )));
        }

        Ok(RawExchange {
            status,
            body: bytes.to_vec(),
        })
    }
}

/// `{base_url}/chat/completions`, tolerating a trailing slash on the base.
pub fn completions_url(base_url: &str) -> Result<String, ProbeError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| ProbeError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ProbeError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(format!("{trimmed}/chat/completions"))
}

fn transport_failure(e: &reqwest::Error, timeout: Option<Duration>) -> TransportFailure {
    if e.is_timeout() {
        let message = match timeout {
            Some(t) => format!("request timed out after {}s", t.as_secs_f64()),
            None => format!("request timed out: {}", error_chain(e)),
        };
        TransportFailure::Timeout(message)
    } else {
        TransportFailure::Other(error_chain(e))
    }
}

/// reqwest's top-level message hides the useful part ("connection refused",
/// "dns error") in the source chain.
fn error_chain(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_strips_trailing_slash() {
        assert_eq!(
            completions_url("https://openrouter.ai/api/v1/").unwrap(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn completions_url_rejects_garbage() {
        assert!(matches!(
            completions_url("not a url"),
            Err(ProbeError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            completions_url("ftp://example.com/v1"),
            Err(ProbeError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn bad_header_name_is_rejected() {
        let headers = vec![("bad header".to_string(), "x".to_string())];
        assert!(matches!(
            HttpDispatch::new("http://127.0.0.1:1/v1", &headers),
            Err(ProbeError::InvalidHeader { .. })
        ));
    }
}
