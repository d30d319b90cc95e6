//! Benchmark summary over many rounds

use std::collections::HashMap;
use std::fmt;

use crate::record::FanOutRecord;

/// Aggregates for one agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSummary {
    pub agent_key: String,
    pub agent_name: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Records whose call itself failed (`ok == false`)
    pub api_errors: usize,
    /// Mean over records with a latency, 0.0 when none had one
    pub avg_latency_sec: f64,
    /// Validator error messages with counts, most frequent first
    pub failure_breakdown: Vec<(String, usize)>,
}

impl AgentSummary {
    /// Integer pass percentage
    pub fn pass_percent(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            100 * self.passed / self.total
        }
    }
}

/// Per-agent summary in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkSummary {
    pub agents: Vec<AgentSummary>,
    /// Where the records were written, shown in the footer
    pub results_path: Option<String>,
}

impl BenchmarkSummary {
    pub fn from_records(records: &[FanOutRecord]) -> Self {
        let mut order: Vec<&str> = Vec::new();
        let mut grouped: HashMap<&str, Vec<&FanOutRecord>> = HashMap::new();

        for record in records {
            let key = record.agent_key.as_str();
            grouped
                .entry(key)
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(record);
        }

        let agents = order
            .into_iter()
            .filter_map(|key| grouped.get(key).map(|group| summarize(group)))
            .collect();

        Self {
            agents,
            results_path: None,
        }
    }

    pub fn with_results_path(mut self, path: impl Into<String>) -> Self {
        self.results_path = Some(path.into());
        self
    }

    pub fn agent(&self, key: &str) -> Option<&AgentSummary> {
        self.agents.iter().find(|a| a.agent_key == key)
    }
}

fn summarize(records: &[&FanOutRecord]) -> AgentSummary {
    let first = records[0];
    let total = records.len();
    let passed = records.iter().filter(|r| r.passed()).count();
    let api_errors = records.iter().filter(|r| !r.is_ok()).count();

    let latencies: Vec<f64> = records.iter().filter_map(|r| r.latency_sec).collect();
    let avg_latency_sec = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<f64>() / latencies.len() as f64
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut seen_order: Vec<&str> = Vec::new();
    for record in records {
        for result in record.validation.failures() {
            if let Some(error) = result.error.as_deref() {
                let count = counts.entry(error).or_insert_with(|| {
                    seen_order.push(error);
                    0
                });
                *count += 1;
            }
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    let mut failure_breakdown: Vec<(String, usize)> = seen_order
        .into_iter()
        .map(|error| (error.to_string(), counts[error]))
        .collect();
    failure_breakdown.sort_by(|a, b| b.1.cmp(&a.1));

    AgentSummary {
        agent_key: first.agent_key.clone(),
        agent_name: first.agent_name.clone(),
        total,
        passed,
        failed: total - passed,
        api_errors,
        avg_latency_sec,
        failure_breakdown,
    }
}

impl fmt::Display for BenchmarkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(62);
        writeln!(f)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "  BENCHMARK SUMMARY")?;
        writeln!(f, "{}", rule)?;

        for agent in &self.agents {
            writeln!(f)?;
            writeln!(f, "  Agent : {}  [{}]", agent.agent_name, agent.agent_key)?;
            writeln!(f, "  -----------------------------------------------")?;
            writeln!(f, "  Prompts run  : {}", agent.total)?;
            writeln!(f, "  Passed       : {}  ({}%)", agent.passed, agent.pass_percent())?;
            writeln!(f, "  Failed       : {}", agent.failed)?;
            writeln!(f, "  API errors   : {}", agent.api_errors)?;
            writeln!(f, "  Avg latency  : {:.3}s", agent.avg_latency_sec)?;

            if !agent.failure_breakdown.is_empty() {
                writeln!(f, "  Failure breakdown:")?;
                for (error, count) in &agent.failure_breakdown {
                    writeln!(f, "    • {}: {}", error, count)?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", rule)?;
        if let Some(path) = &self.results_path {
            writeln!(f, "  Results saved → {}", path)?;
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}
