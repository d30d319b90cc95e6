//! Agent registry built once at startup

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::stub::StubAgent;
use super::{Agent, AgentIdentity, RegisteredAgent};
use crate::config::FanbenchConfig;
use crate::error::{FanbenchError, Result};

#[cfg(feature = "agent-gemini")]
use super::providers::GeminiAgent;

#[cfg(feature = "agent-openrouter")]
use super::providers::OpenRouterAgent;

/// Keys of the built-in agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKey {
    Gemini,
    Stub,
    /// OpenRouter-backed agent, registered under `openai`
    OpenAi,
}

impl AgentKey {
    /// All built-in keys in registration order
    pub const ALL: [AgentKey; 3] = [AgentKey::Gemini, AgentKey::Stub, AgentKey::OpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKey::Gemini => "gemini",
            AgentKey::Stub => "stub",
            AgentKey::OpenAi => "openai",
        }
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKey {
    type Err = FanbenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(AgentKey::Gemini),
            "stub" => Ok(AgentKey::Stub),
            "openai" => Ok(AgentKey::OpenAi),
            other => Err(FanbenchError::UnknownAgent(format!(
                "{} (valid: gemini, openai, stub)",
                other
            ))),
        }
    }
}

/// Ordered collection of agents keyed by identity
#[derive(Debug, Default, Clone)]
pub struct AgentRegistry {
    entries: Vec<RegisteredAgent>,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every built-in agent.
    ///
    /// Agents that cannot be constructed (e.g. missing API key) are skipped
    /// with a warning. The stub agent is always available.
    pub fn build(config: &FanbenchConfig) -> Self {
        let mut registry = Self::new();
        let window = config.harness.latency_window;

        for key in AgentKey::ALL {
            if let Err(e) = registry.register_builtin(key, config, window) {
                tracing::warn!(agent = %key, error = %e, "agent unavailable, skipping");
            }
        }

        tracing::info!(agents = ?registry.keys(), "agent registry built");
        registry
    }

    fn register_builtin(&mut self, key: AgentKey, config: &FanbenchConfig, window: usize) -> Result<()> {
        match key {
            #[cfg(feature = "agent-gemini")]
            AgentKey::Gemini => {
                let agent = GeminiAgent::from_config(&config.agents.gemini, window)
                    .map_err(|e| FanbenchError::Configuration(e.to_string()))?;
                self.register(
                    AgentIdentity::new(key.as_str(), super::providers::gemini::GEMINI_DISPLAY_NAME),
                    Arc::new(agent),
                )
            }

            #[cfg(not(feature = "agent-gemini"))]
            AgentKey::Gemini => Err(FanbenchError::Configuration(
                "Gemini agent requires 'agent-gemini' feature".to_string(),
            )),

            AgentKey::Stub => {
                let mut agent = StubAgent::with_window_size(window);
                if let Some(delay) = config.agents.stub.delay {
                    agent = agent.with_delay(delay);
                }
                self.register(
                    AgentIdentity::new(key.as_str(), config.agents.stub.display_name.clone()),
                    Arc::new(agent),
                )
            }

            #[cfg(feature = "agent-openrouter")]
            AgentKey::OpenAi => {
                let agent = OpenRouterAgent::from_config(&config.agents.openrouter, window)
                    .map_err(|e| FanbenchError::Configuration(e.to_string()))?;
                self.register(
                    AgentIdentity::new(key.as_str(), config.agents.openrouter.model.clone()),
                    Arc::new(agent),
                )
            }

            #[cfg(not(feature = "agent-openrouter"))]
            AgentKey::OpenAi => Err(FanbenchError::Configuration(
                "OpenRouter agent requires 'agent-openrouter' feature".to_string(),
            )),
        }
    }

    /// Register an agent under its identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is already registered.
    pub fn register(&mut self, identity: AgentIdentity, agent: Arc<dyn Agent>) -> Result<()> {
        if self.get(&identity.key).is_some() {
            return Err(FanbenchError::Configuration(format!(
                "agent '{}' is already registered",
                identity.key
            )));
        }
        self.entries.push(RegisteredAgent::new(identity, agent));
        Ok(())
    }

    /// Look up an agent by key
    pub fn get(&self, key: &str) -> Option<&RegisteredAgent> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    /// Whether an agent is registered under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Available agents for `keys`, in the requested order.
    ///
    /// Unavailable keys are skipped with a warning and repeated keys are
    /// dropped, so one agent instance appears at most once per round.
    ///
    /// # Errors
    ///
    /// Returns [`FanbenchError::NoAgents`] when nothing requested is available.
    pub fn select<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<RegisteredAgent>> {
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        let mut selected = Vec::new();

        for key in keys {
            let key = key.as_ref();
            if !seen.insert(key) {
                continue;
            }
            match self.get(key) {
                Some(entry) => selected.push(entry.clone()),
                None => missing.push(key),
            }
        }

        if !missing.is_empty() {
            tracing::warn!(
                agents = ?missing,
                "agent(s) not available, check API keys; skipping"
            );
        }

        if selected.is_empty() {
            return Err(FanbenchError::NoAgents);
        }

        Ok(selected)
    }
}
