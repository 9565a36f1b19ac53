use serde::Serialize;

/// How a single probe ended.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The endpoint answered and echoed the requested model.
    Success,
    /// The endpoint answered with a different model than the one requested.
    WrongModel,
    /// Non-2xx status.
    HttpError,
    /// The request, or the overall run deadline, expired.
    Timeout,
    /// Connect, DNS, TLS or body-read failure.
    TransportError,
    /// 2xx body that is not JSON or has no string `model` field.
    MalformedResponse,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::WrongModel => "wrong_model",
            Self::HttpError => "http_error",
            Self::Timeout => "timeout",
            Self::TransportError => "transport_error",
            Self::MalformedResponse => "malformed_response",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The endpoint is reachable but silently routed to another model.
    /// Reported apart from plain unavailability.
    pub fn is_routing_problem(&self) -> bool {
        matches!(self, Self::WrongModel)
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of probing one model. Exactly one is produced per requested model.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelProbeResult {
    pub model_id: String,
    pub outcome: ProbeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_model_id: Option<String>,
    pub status_message: String,
    #[serde(serialize_with = "serialize_finite_f64")]
    pub response_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl ModelProbeResult {
    pub fn is_available(&self) -> bool {
        self.outcome.is_available()
    }
}

/// Aggregate counts over a finished run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProbeSummary {
    pub total: usize,
    pub available_count: usize,
    pub unavailable_count: usize,
    pub wrong_model_count: usize,
    /// Sum of per-probe response times, not wall-clock time of the run.
    #[serde(serialize_with = "serialize_finite_f64")]
    pub total_time_seconds: f64,
}

impl ProbeSummary {
    pub fn from_results(results: &[ModelProbeResult]) -> Self {
        let available_count = results.iter().filter(|r| r.is_available()).count();
        let wrong_model_count = results
            .iter()
            .filter(|r| r.outcome.is_routing_problem())
            .count();
        let total_time_seconds = results
            .iter()
            .map(|r| r.response_time_seconds)
            .filter(|t| t.is_finite())
            .sum();

        Self {
            total: results.len(),
            available_count,
            unavailable_count: results.len() - available_count,
            wrong_model_count,
            total_time_seconds,
        }
    }

    pub fn all_available(&self) -> bool {
        self.unavailable_count == 0
    }
}

/// Successful results ordered fastest first.
pub fn working_by_speed(results: &[ModelProbeResult]) -> Vec<&ModelProbeResult> {
    let mut working: Vec<&ModelProbeResult> =
        results.iter().filter(|r| r.is_available()).collect();
    working.sort_by(|a, b| a.response_time_seconds.total_cmp(&b.response_time_seconds));
    working
}

/// Serialize f64, clamping non-finite values (NaN, Inf) to 0.0.
fn serialize_finite_f64<S: serde::Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(if v.is_finite() { *v } else { 0.0 })
}
