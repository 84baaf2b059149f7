use crate::judge::Judge;
use crate::question::Question;
use std::time::Duration;

/// Follow-up used when the judge marks an answer incomplete but supplies no
/// follow-up text of its own.
const DEFAULT_FOLLOW_UP: &str = "Could you tell me more about that?";

/// Outcome of validating one accumulated answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub complete: bool,
    /// Present only when `complete` is false.
    pub follow_up: Option<String>,
}

impl Verdict {
    pub fn complete() -> Self {
        Self {
            complete: true,
            follow_up: None,
        }
    }
}

/// Asks the judge whether `answer` adequately addresses `question`, retrying
/// once on failure/timeout/unparseable output. A second failure falls back
/// to accepting the answer: the session never stalls on an external failure,
/// at the cost of validation strictness.
pub async fn validate_answer<J: Judge + Send + Sync>(
    judge: &J,
    question: &Question,
    answer: &str,
    timeout: Duration,
) -> Verdict {
    for attempt in 0..2 {
        match tokio::time::timeout(timeout, judge.assess_answer(question, answer)).await {
            Ok(Ok(assessment)) => {
                if assessment.is_complete {
                    return Verdict::complete();
                }
                let follow_up = if assessment.follow_up.trim().is_empty() {
                    DEFAULT_FOLLOW_UP.to_string()
                } else {
                    assessment.follow_up
                };
                return Verdict {
                    complete: false,
                    follow_up: Some(follow_up),
                };
            }
            Ok(Err(e)) => {
                tracing::warn!(attempt, question = ?question.id, "Answer validation failed: {e:#}");
            }
            Err(_) => {
                tracing::warn!(attempt, question = ?question.id, "Answer validation timed out after {timeout:?}");
            }
        }
    }
    tracing::warn!(question = ?question.id, "Validation unavailable, accepting the answer as-is");
    Verdict::complete()
}
