use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::{Id as TaskId, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::classify::{MatchRule, classify_response};
use crate::credential::CredentialProvider;
use crate::dispatch::http::HttpDispatch;
use crate::dispatch::{ModelProbeRequest, RawExchange, TransportFailure};
use crate::error::ProbeError;
use crate::result::{ModelProbeResult, ProbeOutcome};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;
pub const DEFAULT_PROMPT: &str = "hi";
pub const DEFAULT_MAX_TOKENS: u32 = 20;

/// Tasks get this long to wind down after an abort before they are abandoned.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Everything the engine needs to know about the endpoint and the probe shape.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub prompt: String,
    pub max_tokens: u32,
    /// Per-request timeout. `None` = unbounded.
    pub timeout: Option<Duration>,
    /// Cutoff for the whole run. Probes still pending when it fires are
    /// recorded as `Timeout`.
    pub deadline: Option<Duration>,
    pub max_concurrency: usize,
    pub match_rule: MatchRule,
    /// Extra headers sent with every probe (e.g. `HTTP-Referer`, `X-Title`).
    pub headers: Vec<(String, String)>,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Some(DEFAULT_TIMEOUT),
            deadline: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            match_rule: MatchRule::default(),
            headers: Vec::new(),
        }
    }
}

/// Fans out one chat-completion probe per model and gathers the results.
///
/// - every probe is an independent tokio task sharing one pooled client
/// - a semaphore caps the number of probes in flight
/// - one probe failing never affects another; failures become result rows
/// - results come back in input order, one per distinct model id
#[derive(Debug)]
pub struct ProbeEngine {
    http: Arc<HttpDispatch>,
    config: Arc<EndpointConfig>,
}

impl ProbeEngine {
    pub fn new(config: EndpointConfig) -> Result<Self, ProbeError> {
        let http = HttpDispatch::new(&config.base_url, &config.headers)?;
        Ok(Self {
            http: Arc::new(http),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        self.http.endpoint()
    }

    pub async fn probe(
        &self,
        models: &[String],
        credential: &str,
    ) -> Result<Vec<ModelProbeResult>, ProbeError> {
        self.probe_until(models, credential, CancellationToken::new())
            .await
    }

    /// Resolve the credential through `provider`, then probe.
    ///
    /// Providers may block (an interactive prompt does); callers on a busy
    /// runtime should resolve the credential on a blocking thread and call
    /// [`probe`](Self::probe) instead.
    pub async fn probe_with(
        &self,
        models: &[String],
        provider: &dyn CredentialProvider,
    ) -> Result<Vec<ModelProbeResult>, ProbeError> {
        let credential = provider
            .credential()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProbeError::MissingCredential {
                checked: provider.describe(),
            })?;
        self.probe(models, &credential).await
    }

    /// Probe until every model settles, the configured deadline fires, or
    /// `cancel` is triggered. Unfinished probes are recorded as `Timeout`.
    pub async fn probe_until(
        &self,
        models: &[String],
        credential: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<ModelProbeResult>, ProbeError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(ProbeError::MissingCredential {
                checked: "supplied credential".to_string(),
            });
        }

        let targets = dedupe_models(models);
        if targets.is_empty() {
            return Err(ProbeError::NoModels);
        }

        tracing::info!(
            models = targets.len(),
            endpoint = self.http.endpoint(),
            "probing models"
        );

        let run_start = Instant::now();
        let credential: Arc<str> = Arc::from(credential);
        let permits = self.config.max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(permits));

        let mut set = JoinSet::new();
        let mut task_index: HashMap<TaskId, usize> = HashMap::new();

        for (idx, model_id) in targets.iter().enumerate() {
            let http = self.http.clone();
            let config = self.config.clone();
            let credential = credential.clone();
            let semaphore = semaphore.clone();
            let model_id = model_id.clone();

            let abort_handle = set.spawn(async move {
                // Held for the duration of the request; only fails if closed.
                let _permit = semaphore.acquire_owned().await.ok();
                let req = ModelProbeRequest::new(model_id, config.prompt.clone(), config.max_tokens);
                let start = Instant::now();
                let sent = http.send(&req, &credential, config.timeout).await;
                let result = settle(req.model_id, sent, start.elapsed(), config.match_rule);
                (idx, result)
            });
            task_index.insert(abort_handle.id(), idx);
        }

        let mut slots: Vec<Option<ModelProbeResult>> = vec![None; targets.len()];

        let deadline = self.config.deadline;
        let cutoff = async move {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(cutoff);

        let mut stop_reason: Option<String> = None;

        loop {
            tokio::select! {
                biased; // prefer results over cutoff
                joined = set.join_next() => {
                    match joined {
                        Some(joined) => record(joined, &task_index, &targets, &mut slots, run_start),
                        None => break,
                    }
                }
                _ = &mut cutoff => {
                    let secs = deadline.map(|d| d.as_secs_f64()).unwrap_or_default();
                    stop_reason = Some(format!("overall deadline of {secs}s exceeded"));
                    set.abort_all();
                    break;
                }
                _ = cancel.cancelled() => {
                    stop_reason = Some("cancelled before completion".to_string());
                    set.abort_all();
                    break;
                }
            }
        }

        if let Some(ref reason) = stop_reason {
            tracing::warn!(pending = set.len(), "{reason}, aborting pending probes");
            // Probes that finished while the abort was being delivered still count.
            let drained = tokio::time::timeout(DRAIN_GRACE, async {
                while let Some(joined) = set.join_next().await {
                    record(joined, &task_index, &targets, &mut slots, run_start);
                }
            })
            .await;
            if drained.is_err() {
                tracing::warn!("{} probes hung after abort, abandoning drain", set.len());
            }
        }

        let elapsed = run_start.elapsed();
        let results: Vec<ModelProbeResult> = slots
            .into_iter()
            .zip(targets)
            .map(|(slot, model_id)| {
                slot.unwrap_or_else(|| ModelProbeResult {
                    model_id,
                    outcome: ProbeOutcome::Timeout,
                    actual_model_id: None,
                    status_message: format!(
                        "Timeout: {}",
                        stop_reason.as_deref().unwrap_or("probe did not complete")
                    ),
                    response_time_seconds: elapsed.as_secs_f64(),
                    http_status: None,
                })
            })
            .collect();

        let available = results.iter().filter(|r| r.is_available()).count();
        tracing::info!(
            available,
            total = results.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "probe run finished"
        );

        Ok(results)
    }
}

/// Trim, drop blanks and duplicates. First occurrence wins.
pub fn dedupe_models(models: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    models
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .filter(|m| seen.insert(*m))
        .map(str::to_string)
        .collect()
}

fn record(
    joined: Result<(usize, ModelProbeResult), tokio::task::JoinError>,
    task_index: &HashMap<TaskId, usize>,
    targets: &[String],
    slots: &mut [Option<ModelProbeResult>],
    run_start: Instant,
) {
    match joined {
        Ok((idx, result)) => slots[idx] = Some(result),
        Err(join_err) if join_err.is_panic() => {
            tracing::error!("probe task panicked: {join_err}");
            if let Some(&idx) = task_index.get(&join_err.id()) {
                slots[idx] = Some(ModelProbeResult {
                    model_id: targets[idx].clone(),
                    outcome: ProbeOutcome::TransportError,
                    actual_model_id: None,
                    status_message: format!("Error: probe task panicked: {join_err}"),
                    response_time_seconds: run_start.elapsed().as_secs_f64(),
                    http_status: None,
                });
            }
        }
        Err(_) => {} // cancelled by abort_all()
    }
}

fn settle(
    model_id: String,
    sent: Result<RawExchange, TransportFailure>,
    elapsed: Duration,
    rule: MatchRule,
) -> ModelProbeResult {
    let response_time_seconds = elapsed.as_secs_f64();
    let result = match sent {
        Ok(exchange) => {
            let c = classify_response(&model_id, exchange.status, &exchange.body, rule);
            ModelProbeResult {
                model_id,
                outcome: c.outcome,
                actual_model_id: c.actual_model_id,
                status_message: c.status_message,
                response_time_seconds,
                http_status: Some(exchange.status),
            }
        }
        Err(TransportFailure::Timeout(message)) => ModelProbeResult {
            model_id,
            outcome: ProbeOutcome::Timeout,
            actual_model_id: None,
            status_message: format!("Timeout: {message}"),
            response_time_seconds,
            http_status: None,
        },
        Err(TransportFailure::Other(message)) => {
            tracing::warn!(model = %model_id, "probe transport failure: {message}");
            ModelProbeResult {
                model_id,
                outcome: ProbeOutcome::TransportError,
                actual_model_id: None,
                status_message: format!("Error: {message}"),
                response_time_seconds,
                http_status: None,
            }
        }
    };

    tracing::debug!(
        model = %result.model_id,
        outcome = %result.outcome,
        elapsed_ms = elapsed.as_millis() as u64,
        "probe settled"
    );
    result
}
