use crate::Command;
use crate::feedback::FeedbackReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Wire-level message kinds exchanged over a session's channel. `Answer` is
/// the only client→server kind; everything else flows server→client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    SessionStart,
    Question,
    Answer,
    Feedback,
    Status,
    Error,
    SessionEnd,
}

/// The protocol envelope: every message in either direction has this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    fn new(kind: MessageType, content: String, session_id: &str) -> Self {
        Self {
            kind,
            content,
            session_id: Some(session_id.to_string()),
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    /// Sent exactly once, immediately after connect.
    pub fn session_start(session_id: &str) -> Self {
        Self::new(MessageType::SessionStart, session_id.to_string(), session_id)
    }

    pub fn question(
        session_id: &str,
        text: String,
        progress: String,
        is_greeting: bool,
        is_follow_up: bool,
    ) -> Self {
        let mut metadata = json!({ "progress": progress });
        if is_greeting {
            metadata["is_greeting"] = json!(true);
        }
        if is_follow_up {
            metadata["is_follow_up"] = json!(true);
        }
        let mut envelope = Self::new(MessageType::Question, text, session_id);
        envelope.metadata = Some(metadata);
        envelope
    }

    pub fn feedback(session_id: &str, report: &FeedbackReport) -> Self {
        let mut envelope = Self::new(MessageType::Feedback, report.render_text(), session_id);
        envelope.metadata = Some(json!({ "feedback": report }));
        envelope
    }

    pub fn status(session_id: &str, text: String) -> Self {
        Self::new(MessageType::Status, text, session_id)
    }

    pub fn error(session_id: Option<&str>, text: String) -> Self {
        Self {
            kind: MessageType::Error,
            content: text,
            session_id: session_id.map(str::to_string),
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    pub fn session_end(session_id: &str, text: String) -> Self {
        Self::new(MessageType::SessionEnd, text, session_id)
    }

    /// Maps a state-machine command to its outbound message.
    pub fn from_command(session_id: &str, command: Command) -> Self {
        match command {
            Command::AskQuestion {
                text,
                progress,
                is_greeting,
                is_follow_up,
            } => Self::question(session_id, text, progress, is_greeting, is_follow_up),
            Command::Status(text) => Self::status(session_id, text),
            Command::DeliverFeedback(report) => Self::feedback(session_id, &report),
            Command::SessionComplete(text) => Self::session_end(session_id, text),
            Command::Reject(text) => Self::error(Some(session_id), text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_metadata_carries_progress_and_flags() {
        let envelope = Envelope::question(
            "abc123",
            "Tell me about yourself".to_string(),
            "1/8".to_string(),
            true,
            false,
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "question");
        assert_eq!(value["session_id"], "abc123");
        assert_eq!(value["metadata"]["progress"], "1/8");
        assert_eq!(value["metadata"]["is_greeting"], true);
        assert!(value["metadata"].get("is_follow_up").is_none());
    }

    #[test]
    fn inbound_answer_parses_without_timestamp_or_metadata() {
        let raw = r#"{"type":"answer","content":"I am a student...","session_id":"abc123"}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.kind, MessageType::Answer);
        assert_eq!(envelope.content, "I am a student...");
        assert_eq!(envelope.session_id.as_deref(), Some("abc123"));
        assert!(envelope.metadata.is_none());
    }

    #[test]
    fn feedback_envelope_wraps_the_structured_report() {
        let report = FeedbackReport {
            overall_assessment: "Good.".to_string(),
            strengths: vec!["clarity".to_string()],
            areas_for_improvement: vec![],
            specific_suggestions: vec![],
            encouragement: "Keep going!".to_string(),
        };
        let envelope = Envelope::feedback("abc123", &report);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "feedback");
        assert_eq!(value["metadata"]["feedback"]["encouragement"], "Keep going!");
        assert!(envelope.content.contains("WORDS OF ENCOURAGEMENT"));
    }
}
