//! Advisory-AI collaborator interface.
//!
//! The advisor is an opaque text-generation service prompted with a
//! position; it is expected to answer with a JSON suggestion but is not
//! trusted to. Responses are parsed tolerantly and failures degrade to a
//! neutral fallback — advisor trouble is logged, never surfaced as a
//! game-breaking error.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

pub type SuggestFuture = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

/// Opaque move-advice service. Implementations typically wrap a remote
/// text-generation API; the returned string is its raw (untrusted) output.
pub trait Advisor: Send + Sync {
    fn suggest(&self, fen: &str, level: u8) -> SuggestFuture;
}

/// Best-effort suggestion payload the advisory service is asked to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSuggestion {
    pub best_move: String,
    #[serde(default)]
    pub alternative_moves: Vec<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub position_summary: Option<String>,
}

/// Parse raw advisor output. Strips markdown code fences before decoding;
/// returns `None` for anything that does not yield a usable `bestMove`.
pub fn parse_suggestion(raw: &str) -> Option<MoveSuggestion> {
    let cleaned = raw
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();
    let suggestion: MoveSuggestion = serde_json::from_str(&cleaned).ok()?;
    if suggestion.best_move.trim().is_empty() {
        return None;
    }
    Some(suggestion)
}

/// Advisor that is never available. Callers fall back to their neutral
/// default (for the AI opponent, the first legal move).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAdvisor;

impl Advisor for NullAdvisor {
    fn suggest(&self, _fen: &str, _level: u8) -> SuggestFuture {
        Box::pin(async { Err(anyhow::anyhow!("no advisory service configured")) })
    }
}

/// Advisor returning a fixed response, for tests and demos.
#[derive(Debug, Clone)]
pub struct StaticAdvisor {
    raw: String,
}

impl StaticAdvisor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl Advisor for StaticAdvisor {
    fn suggest(&self, _fen: &str, _level: u8) -> SuggestFuture {
        let raw = self.raw.clone();
        Box::pin(async move { Ok(raw) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let raw = r#"{"bestMove": "e2-e4", "alternativeMoves": ["d2-d4"], "hint": "center"}"#;
        let suggestion = parse_suggestion(raw).unwrap();
        assert_eq!(suggestion.best_move, "e2-e4");
        assert_eq!(suggestion.alternative_moves, vec!["d2-d4"]);
        assert_eq!(suggestion.hint.as_deref(), Some("center"));
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"bestMove\": \"g8-f6\"}\n```";
        let suggestion = parse_suggestion(raw).unwrap();
        assert_eq!(suggestion.best_move, "g8-f6");
    }

    #[test]
    fn missing_fields_default() {
        let suggestion = parse_suggestion(r#"{"bestMove": "e2-e4"}"#).unwrap();
        assert!(suggestion.alternative_moves.is_empty());
        assert!(suggestion.hint.is_none());
    }

    #[test]
    fn malformed_output_is_none() {
        assert!(parse_suggestion("I think e4 is a good move!").is_none());
        assert!(parse_suggestion(r#"{"bestMove": ""}"#).is_none());
        assert!(parse_suggestion("").is_none());
    }

    #[tokio::test]
    async fn null_advisor_errors() {
        assert!(NullAdvisor.suggest("8/8 w", 1).await.is_err());
    }

    #[tokio::test]
    async fn static_advisor_echoes() {
        let advisor = StaticAdvisor::new("{\"bestMove\": \"e2-e4\"}");
        let raw = advisor.suggest("whatever", 2).await.unwrap();
        assert!(raw.contains("e2-e4"));
    }
}
