//! Integration tests for the fan-out orchestrator
//!
//! These drive full rounds through the public API with in-test agents that
//! succeed, fail, panic, block their thread, or never finish.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use fanbench_core::prelude::*;

/// Agent answering with fixed text after a configurable delay
struct ScriptedAgent {
    text: String,
    delay_ms: AtomicU64,
    monitor: LatencyTracker,
    error_log: OutcomeLog,
}

impl ScriptedAgent {
    fn new(text: &str, delay: Duration) -> Self {
        Self {
            text: text.to_string(),
            delay_ms: AtomicU64::new(delay.as_millis() as u64),
            monitor: LatencyTracker::new(),
            error_log: OutcomeLog::new(),
        }
    }

    fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn generate(&self, _prompt: &str) -> AgentResult<String> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(self.text.clone())
    }

    fn monitor(&self) -> &LatencyTracker {
        &self.monitor
    }

    fn error_log(&self) -> &OutcomeLog {
        &self.error_log
    }
}

/// Agent that always reports an upstream failure
struct FailingAgent {
    monitor: LatencyTracker,
    error_log: OutcomeLog,
}

impl FailingAgent {
    fn new() -> Self {
        Self {
            monitor: LatencyTracker::new(),
            error_log: OutcomeLog::new(),
        }
    }
}

#[async_trait]
impl Agent for FailingAgent {
    async fn generate(&self, _prompt: &str) -> AgentResult<String> {
        Err(AgentError::Upstream {
            status: 401,
            message: "invalid api key".to_string(),
        })
    }

    fn monitor(&self) -> &LatencyTracker {
        &self.monitor
    }

    fn error_log(&self) -> &OutcomeLog {
        &self.error_log
    }
}

/// Agent whose task panics
struct PanickingAgent {
    monitor: LatencyTracker,
    error_log: OutcomeLog,
}

#[async_trait]
impl Agent for PanickingAgent {
    async fn generate(&self, _prompt: &str) -> AgentResult<String> {
        panic!("agent blew up");
    }

    fn monitor(&self) -> &LatencyTracker {
        &self.monitor
    }

    fn error_log(&self) -> &OutcomeLog {
        &self.error_log
    }
}

/// Agent that blocks its worker thread instead of awaiting
struct BlockingAgent {
    block_for: Duration,
    monitor: LatencyTracker,
    error_log: OutcomeLog,
}

impl BlockingAgent {
    fn new(block_for: Duration) -> Self {
        Self {
            block_for,
            monitor: LatencyTracker::new(),
            error_log: OutcomeLog::new(),
        }
    }
}

#[async_trait]
impl Agent for BlockingAgent {
    async fn generate(&self, _prompt: &str) -> AgentResult<String> {
        std::thread::sleep(self.block_for);
        Ok("finished far too late to count".to_string())
    }

    fn monitor(&self) -> &LatencyTracker {
        &self.monitor
    }

    fn error_log(&self) -> &OutcomeLog {
        &self.error_log
    }
}

fn entry(key: &str, agent: Arc<dyn Agent>) -> RegisteredAgent {
    RegisteredAgent::new(AgentIdentity::new(key, format!("{}-display", key)), agent)
}

fn fan_out(timeout: Duration) -> FanOut {
    FanOut::builder().call_timeout(timeout).build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_timeout_among_three() {
    let agents = vec![
        entry("fast", Arc::new(ScriptedAgent::new("A complete and useful answer", Duration::ZERO))),
        entry("slow", Arc::new(ScriptedAgent::new("never seen", Duration::from_secs(30)))),
        entry("steady", Arc::new(ScriptedAgent::new("Another complete answer", Duration::from_millis(20)))),
    ];

    let records = fan_out(Duration::from_millis(200))
        .run(&Prompt::new("p1", "Hi"), &agents)
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    let keys: Vec<_> = records.iter().map(|r| r.agent_key.as_str()).collect();
    assert_eq!(keys, vec!["fast", "slow", "steady"]);

    let slow = &records[1];
    assert!(!slow.error_meta.ok);
    assert_eq!(slow.error_meta.error_kind.as_deref(), Some("Timeout"));
    assert!(slow.response.starts_with("ERROR: "));
    assert!(slow.latency_sec.is_none());

    assert_eq!(records[0].response, "A complete and useful answer");
    assert_eq!(records[2].response, "Another complete answer");
    assert!(records[0].error_meta.ok && records[2].error_meta.ok);
    assert!(records[0].latency_sec.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_round_shares_one_span() {
    let agents = vec![
        entry("a", Arc::new(ScriptedAgent::new("first answer here", Duration::from_millis(10)))),
        entry("b", Arc::new(ScriptedAgent::new("second answer here", Duration::from_millis(50)))),
        entry("c", Arc::new(FailingAgent::new())),
    ];

    let records = fan_out(Duration::from_secs(5))
        .run(&Prompt::adhoc("Hi"), &agents)
        .await
        .unwrap();

    let span = records[0].fan_out_latency_sec;
    assert!(span >= 0.05);
    assert!(records.iter().all(|r| r.fan_out_latency_sec == span));
    assert!(records.iter().all(|r| r.round_id == records[0].round_id));
    assert!(records.iter().all(|r| r.timestamp == records[0].timestamp));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_output_order_ignores_completion_order() {
    let agents = vec![
        entry("late", Arc::new(ScriptedAgent::new("late answer text", Duration::from_millis(150)))),
        entry("early", Arc::new(ScriptedAgent::new("early answer text", Duration::ZERO))),
    ];

    let records = fan_out(Duration::from_secs(5))
        .run(&Prompt::adhoc("Hi"), &agents)
        .await
        .unwrap();

    assert_eq!(records[0].agent_key, "late");
    assert_eq!(records[0].response, "late answer text");
    assert_eq!(records[1].agent_key, "early");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_calls_run_concurrently() {
    let agents: Vec<_> = (0..4)
        .map(|i| {
            entry(
                &format!("agent{}", i),
                Arc::new(ScriptedAgent::new("a sufficiently long answer", Duration::from_millis(300))),
            )
        })
        .collect();

    let records = fan_out(Duration::from_secs(5))
        .run(&Prompt::adhoc("Hi"), &agents)
        .await
        .unwrap();

    // Sequential execution would take at least 1.2s.
    assert!(records[0].fan_out_latency_sec < 1.0);
    assert!(records.iter().all(|r| r.error_meta.ok));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timeout_bounds_the_round() {
    let agents = vec![entry(
        "stuck",
        Arc::new(ScriptedAgent::new("never", Duration::from_secs(60))),
    )];

    let records = fan_out(Duration::from_millis(100))
        .run(&Prompt::adhoc("Hi"), &agents)
        .await
        .unwrap();

    assert!(records[0].fan_out_latency_sec < 5.0);
    assert_eq!(records[0].error_meta.error_kind.as_deref(), Some("Timeout"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timeout_keeps_previous_latency() {
    let agent = Arc::new(ScriptedAgent::new("quick answer, long enough", Duration::ZERO));
    let agents = vec![entry("flaky", agent.clone())];
    let fan_out = fan_out(Duration::from_millis(100));

    let first = fan_out.run(&Prompt::adhoc("Hi"), &agents).await.unwrap();
    assert!(first[0].error_meta.ok);
    let previous = agent.monitor().last_latency();
    assert!(previous.is_some());
    assert_eq!(agent.monitor().len(), 1);

    agent.set_delay(Duration::from_secs(30));
    let second = fan_out.run(&Prompt::adhoc("Hi"), &agents).await.unwrap();

    assert_eq!(second[0].error_meta.error_kind.as_deref(), Some("Timeout"));
    assert!(second[0].latency_sec.is_none());
    assert_eq!(agent.monitor().last_latency(), previous);
    assert_eq!(agent.monitor().len(), 1);
    assert_eq!(second[0].latency_metrics, first[0].latency_metrics);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_agent_failure_is_isolated() {
    let agents = vec![
        entry("broken", Arc::new(FailingAgent::new())),
        entry("fine", Arc::new(ScriptedAgent::new("a perfectly fine answer", Duration::ZERO))),
    ];

    let records = fan_out(Duration::from_secs(5))
        .run(&Prompt::adhoc("Hi"), &agents)
        .await
        .unwrap();

    let broken = &records[0];
    assert_eq!(broken.response, "ERROR: upstream error (401): invalid api key");
    assert_eq!(broken.error_meta.error_kind.as_deref(), Some("UpstreamError"));
    // Agent-raised failures still complete the call, so latency is recorded.
    assert!(broken.latency_sec.is_some());
    assert!(records[1].error_meta.ok);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_agent_becomes_failure() {
    let agents = vec![
        entry(
            "panics",
            Arc::new(PanickingAgent {
                monitor: LatencyTracker::new(),
                error_log: OutcomeLog::new(),
            }),
        ),
        entry("fine", Arc::new(ScriptedAgent::new("a perfectly fine answer", Duration::ZERO))),
    ];

    let records = fan_out(Duration::from_secs(5))
        .run(&Prompt::adhoc("Hi"), &agents)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].error_meta.error_kind.as_deref(), Some("Panic"));
    assert!(records[0].latency_sec.is_none());
    assert!(records[1].error_meta.ok);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_empty_success_is_ok_but_fails_validation() {
    let agents = vec![entry("quiet", Arc::new(ScriptedAgent::new("", Duration::ZERO)))];

    let records = fan_out(Duration::from_secs(5))
        .run(&Prompt::adhoc("Hi"), &agents)
        .await
        .unwrap();

    let record = &records[0];
    assert!(record.error_meta.ok);
    assert_eq!(record.response, "");
    assert!(!record.validation.overall_passed);
    assert_eq!(record.validation.results.len(), 3);
    assert!(!record.validation.results[0].passed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_blocking_agent_is_abandoned_at_deadline() {
    let blocking = Arc::new(BlockingAgent::new(Duration::from_millis(1500)));
    let agents = vec![
        entry("blocking", blocking.clone()),
        entry("stub", Arc::new(StubAgent::new())),
    ];

    let started = std::time::Instant::now();
    let records = fan_out(Duration::from_millis(100))
        .run(&Prompt::new("greeting", "Hi Open AI"), &agents)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(1000));
    assert!(records[0].fan_out_latency_sec < 1.0);

    let stuck = &records[0];
    assert!(!stuck.error_meta.ok);
    assert_eq!(stuck.error_meta.error_kind.as_deref(), Some("Timeout"));
    assert!(stuck.response.starts_with("ERROR: "));
    assert!(stuck.latency_sec.is_none());

    assert!(records[1].error_meta.ok);
    assert_eq!(records[1].response, "Hi! How can I assist you today?");

    // The abandoned call finishes later but must not leave a latency sample.
    tokio::time::sleep(Duration::from_millis(1700)).await;
    assert!(blocking.monitor().is_empty());
    assert!(blocking.monitor().last_latency().is_none());
}

#[tokio::test]
async fn test_dispatch_rejects_empty_list() {
    let result = dispatch("Hi", &[], Duration::from_secs(1)).await;
    assert!(matches!(result, Err(FanbenchError::NoAgents)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_fan_out_with_stub() {
    let agents = vec![entry("stub", Arc::new(StubAgent::new()))];
    let records = run_fan_out(&Prompt::new("moon", "Can you give me the distance for the moon?"), &agents, Duration::from_secs(1))
        .await
        .unwrap();

    assert!(records[0].error_meta.ok);
    assert_eq!(records[0].response, " ");
    assert!(!records[0].validation.overall_passed);
}
