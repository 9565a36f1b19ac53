//! Availability checker for models behind an OpenAI-compatible endpoint.
//!
//! One lightweight chat-completion request per model, issued concurrently,
//! each response classified into a [`ProbeOutcome`](result::ProbeOutcome).

pub mod classify;
pub mod config;
pub mod credential;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod report;
pub mod result;
