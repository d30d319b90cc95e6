//! Network-backed agent implementations

#[cfg(feature = "agent-gemini")]
pub mod gemini;

#[cfg(feature = "agent-gemini")]
pub use gemini::GeminiAgent;

#[cfg(feature = "agent-openrouter")]
pub mod openrouter;

#[cfg(feature = "agent-openrouter")]
pub use openrouter::OpenRouterAgent;

/// Read an error body, falling back to a fixed message when it cannot be read.
#[cfg(any(feature = "agent-gemini", feature = "agent-openrouter"))]
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}
