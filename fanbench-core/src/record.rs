//! Per-agent result records
//!
//! One [`FanOutRecord`] is assembled for every (prompt, agent) pair once the
//! round has been joined. Records are plain data and are handed straight to a
//! [`RecordSink`](crate::storage::RecordSink).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentIdentity;
use crate::latency::LatencyMetrics;
use crate::outcome::ErrorMeta;
use crate::prompts::Prompt;
use crate::validation::ValidationReport;

/// Everything known about one agent's answer to one prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOutRecord {
    pub run_id: String,
    pub round_id: Uuid,
    pub prompt_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub prompt: String,
    pub agent_key: String,
    pub agent_name: String,
    /// Response text, or `ERROR: ...` for failed calls
    pub response: String,
    pub validation: ValidationReport,
    /// Duration of this agent's call; `None` when it never completed
    pub latency_sec: Option<f64>,
    pub latency_metrics: Option<LatencyMetrics>,
    /// Wall-clock span of the whole round, identical for every record in it
    pub fan_out_latency_sec: f64,
    pub error_meta: ErrorMeta,
    pub timestamp: DateTime<Utc>,
}

impl FanOutRecord {
    /// `true` when the call itself succeeded
    pub fn is_ok(&self) -> bool {
        self.error_meta.ok
    }

    /// `true` when every validator passed
    pub fn passed(&self) -> bool {
        self.validation.overall_passed
    }
}

/// Round-level values shared by every record of one fan-out
#[derive(Debug, Clone)]
pub struct RoundInfo {
    pub round_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub fan_out_latency_sec: f64,
}

impl RoundInfo {
    pub fn new(fan_out_latency_sec: f64) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            fan_out_latency_sec,
        }
    }
}

/// Per-agent values for one record
#[derive(Debug, Clone)]
pub struct AgentSnapshot {
    pub response: String,
    pub validation: ValidationReport,
    pub latency_sec: Option<f64>,
    pub latency_metrics: Option<LatencyMetrics>,
    pub error_meta: ErrorMeta,
}

/// Combine prompt, agent and round values into one record.
pub fn assemble(
    prompt: &Prompt,
    identity: &AgentIdentity,
    round: &RoundInfo,
    snapshot: AgentSnapshot,
) -> FanOutRecord {
    let run_id = format!(
        "bench-{}-{}-{}",
        round.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        prompt.id,
        identity.key
    );

    FanOutRecord {
        run_id,
        round_id: round.round_id,
        prompt_id: prompt.id.clone(),
        tags: prompt.tags.clone(),
        prompt: prompt.prompt.clone(),
        agent_key: identity.key.clone(),
        agent_name: identity.display_name.clone(),
        response: snapshot.response,
        validation: snapshot.validation,
        latency_sec: snapshot.latency_sec,
        latency_metrics: snapshot.latency_metrics,
        fan_out_latency_sec: round.fan_out_latency_sec,
        error_meta: snapshot.error_meta,
        timestamp: round.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationPipeline;

    fn snapshot(response: &str) -> AgentSnapshot {
        let pipeline = ValidationPipeline::default();
        AgentSnapshot {
            response: response.to_string(),
            validation: pipeline.run(&pipeline.context("Hi", Some(response.to_string()), "Stub")),
            latency_sec: None,
            latency_metrics: None,
            error_meta: ErrorMeta::ok(),
        }
    }

    #[test]
    fn test_assemble_copies_identity_and_round() {
        let prompt = Prompt::new("greeting", "Hi").with_tags(["smoke"]);
        let identity = AgentIdentity::new("stub", "Stub");
        let round = RoundInfo::new(0.25);

        let record = assemble(&prompt, &identity, &round, snapshot("Hello there, friend"));

        assert_eq!(record.prompt_id, "greeting");
        assert_eq!(record.tags, vec!["smoke"]);
        assert_eq!(record.agent_key, "stub");
        assert_eq!(record.fan_out_latency_sec, 0.25);
        assert_eq!(record.round_id, round.round_id);
        assert!(record.run_id.starts_with("bench-"));
        assert!(record.run_id.ends_with("-greeting-stub"));
        assert!(record.is_ok());
        assert!(record.passed());
    }

    #[test]
    fn test_null_latency_serializes_as_null() {
        let record = assemble(
            &Prompt::adhoc("Hi"),
            &AgentIdentity::new("stub", "Stub"),
            &RoundInfo::new(1.0),
            snapshot(""),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["latency_sec"].is_null());
        assert_eq!(json["error_meta"]["ok"], true);
        assert_eq!(json["validation"]["passed"], false);
    }
}
