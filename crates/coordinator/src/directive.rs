//! The hand-off directive a swarm worker must emit each turn.
//!
//! The directive comes back from an external reasoning system, so it is
//! validated strictly at the swarm boundary: it either parses into one of
//! the two shapes below or the turn is a typed failure. There is no
//! best-effort text scraping and no JSON repair.

use quantdesk_common::{Message, QuantdeskError, Result};
use serde::{Deserialize, Serialize};

/// What a worker decided at the end of its swarm turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Directive {
    /// The task is complete; `content` is the final answer.
    #[serde(rename = "final")]
    FinalAnswer { content: String },

    /// Pass control to the named worker along with a message for it.
    #[serde(rename = "handoff")]
    HandOff { to: String, content: String },
}

impl Directive {
    /// Parse a worker's output message into a directive.
    ///
    /// Fails with a `Backend` error on anything that is not exactly one of
    /// the two directive shapes.
    pub fn parse(message: &Message) -> Result<Self> {
        let trimmed = message.content.trim();
        serde_json::from_str(trimmed).map_err(|e| {
            QuantdeskError::Backend(format!(
                "Malformed hand-off directive from '{}': {e} (got: {})",
                message.origin.as_deref().unwrap_or("unknown"),
                truncate(trimmed, 120)
            ))
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_final_answer() {
        let msg = Message::from_worker(
            "analyst",
            r#"{"action": "final", "content": "AAPL is holding steady."}"#,
        );
        assert_eq!(
            Directive::parse(&msg).unwrap(),
            Directive::FinalAnswer {
                content: "AAPL is holding steady.".into()
            }
        );
    }

    #[test]
    fn parses_handoff() {
        let msg = Message::from_worker(
            "analyst",
            r#"{"action": "handoff", "to": "charts", "content": "Plot the YTD returns."}"#,
        );
        assert_eq!(
            Directive::parse(&msg).unwrap(),
            Directive::HandOff {
                to: "charts".into(),
                content: "Plot the YTD returns.".into()
            }
        );
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let msg = Message::new("  {\"action\": \"final\", \"content\": \"done\"}\n");
        assert!(Directive::parse(&msg).is_ok());
    }

    #[test]
    fn prose_is_rejected() {
        let msg = Message::from_worker("analyst", "I think we should hand off to charts.");
        let err = Directive::parse(&msg).unwrap_err();
        assert!(matches!(err, QuantdeskError::Backend(_)));
        assert!(err.to_string().contains("analyst"));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let msg = Message::new(r#"{"action": "delegate", "to": "charts", "content": "x"}"#);
        assert!(Directive::parse(&msg).is_err());
    }

    #[test]
    fn fenced_json_is_rejected_not_scraped() {
        let msg = Message::new("```json\n{\"action\": \"final\", \"content\": \"done\"}\n```");
        assert!(Directive::parse(&msg).is_err());
    }

    #[test]
    fn handoff_without_target_is_rejected() {
        let msg = Message::new(r#"{"action": "handoff", "content": "missing target"}"#);
        assert!(Directive::parse(&msg).is_err());
    }
}
