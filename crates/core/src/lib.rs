pub mod feedback;
pub mod judge;
pub mod protocol;
pub mod question;
pub mod session;
pub mod validate;

/// Represents commands that the core logic (`InterviewSession`) issues to the runtime.
///
/// This enum is the primary API for decoupling the session's decision-making
/// from the runtime's execution of side effects (like sending a protocol
/// message over the connection).
#[derive(Debug, Clone)]
pub enum Command {
    /// Ask the candidate a question (first ask, next question, or follow-up).
    AskQuestion {
        text: String,
        /// "n/8" position within the fixed question sequence.
        progress: String,
        is_greeting: bool,
        is_follow_up: bool,
    },
    /// Advisory progress note for the client, no state effect.
    Status(String),
    /// Deliver the synthesized feedback report.
    DeliverFeedback(feedback::FeedbackReport),
    /// Command indicating the session is complete, with a final message.
    SessionComplete(String),
    /// The inbound event was rejected; the session state did not change.
    Reject(String),
}
