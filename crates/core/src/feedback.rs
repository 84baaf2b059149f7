use crate::judge::Judge;
use crate::session::QuestionTranscript;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Structured feedback produced once per session, after the last question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub overall_assessment: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub specific_suggestions: Vec<String>,
    pub encouragement: String,
}

impl FeedbackReport {
    /// Deterministic report used when the judge fails twice: the session
    /// must still reach END and the candidate must still hear something.
    pub fn fallback() -> Self {
        Self {
            overall_assessment: String::new(),
            strengths: Vec::new(),
            areas_for_improvement: Vec::new(),
            specific_suggestions: Vec::new(),
            encouragement: "Thank you for completing the mock interview. Keep practicing and you will continue to improve. Every interview is a learning opportunity!".to_string(),
        }
    }

    /// Renders the report as the spoken-style text carried in the feedback
    /// message's content; the structured report travels in its metadata.
    pub fn render_text(&self) -> String {
        let mut message = format!(
            "Interview complete! Here's your personalized feedback:\n\nOVERALL ASSESSMENT:\n{}\n",
            self.overall_assessment
        );

        message.push_str("\nYOUR STRENGTHS:\n");
        for (i, strength) in self.strengths.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, strength));
        }

        message.push_str("\nAREAS FOR IMPROVEMENT:\n");
        for (i, area) in self.areas_for_improvement.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, area));
        }

        message.push_str("\nSPECIFIC SUGGESTIONS:\n");
        for (i, suggestion) in self.specific_suggestions.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, suggestion));
        }

        message.push_str(&format!("\nWORDS OF ENCOURAGEMENT:\n{}\n", self.encouragement));
        message
    }
}

/// Asks the judge to review the transcript, retrying once on
/// failure/timeout; a second failure yields the fallback report. This call
/// never surfaces an error: feedback synthesis must not strand the session
/// short of END.
pub async fn synthesize_feedback<J: Judge + Send + Sync>(
    judge: &J,
    transcript: &[QuestionTranscript],
    timeout: Duration,
) -> FeedbackReport {
    for attempt in 0..2 {
        match tokio::time::timeout(timeout, judge.review_transcript(transcript)).await {
            Ok(Ok(report)) => return report,
            Ok(Err(e)) => {
                tracing::warn!(attempt, "Feedback synthesis failed: {e:#}");
            }
            Err(_) => {
                tracing::warn!(attempt, "Feedback synthesis timed out after {timeout:?}");
            }
        }
    }
    tracing::warn!("Falling back to the default feedback report");
    FeedbackReport::fallback()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::MockJudge;

    fn sample_report() -> FeedbackReport {
        FeedbackReport {
            overall_assessment: "Solid performance overall.".to_string(),
            strengths: vec!["Clear introduction".to_string()],
            areas_for_improvement: vec!["More concrete examples".to_string()],
            specific_suggestions: vec!["Practice the STAR method".to_string()],
            encouragement: "Keep going!".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_judge_report_on_first_success() {
        let mut judge = MockJudge::new();
        judge
            .expect_review_transcript()
            .returning(|_| Box::pin(async { Ok(sample_report()) }))
            .once();

        let report = synthesize_feedback(&judge, &[], Duration::from_secs(5)).await;
        assert_eq!(report, sample_report());
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let mut judge = MockJudge::new();
        let mut calls = 0;
        judge.expect_review_transcript().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Box::pin(async { Err(anyhow::anyhow!("transient")) })
            } else {
                Box::pin(async { Ok(sample_report()) })
            }
        });

        let report = synthesize_feedback(&judge, &[], Duration::from_secs(5)).await;
        assert_eq!(report, sample_report());
    }

    #[tokio::test]
    async fn two_failures_yield_fallback_with_encouragement() {
        let mut judge = MockJudge::new();
        judge
            .expect_review_transcript()
            .times(2)
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("judge down")) }));

        let report = synthesize_feedback(&judge, &[], Duration::from_secs(5)).await;
        assert!(!report.encouragement.is_empty());
        assert!(report.strengths.is_empty());
        assert!(report.areas_for_improvement.is_empty());
        assert!(report.specific_suggestions.is_empty());
    }

    #[tokio::test]
    async fn timeout_counts_as_a_failed_attempt() {
        let mut judge = MockJudge::new();
        judge.expect_review_transcript().times(2).returning(|_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(sample_report())
            })
        });

        let report = synthesize_feedback(&judge, &[], Duration::from_millis(10)).await;
        assert_eq!(report, FeedbackReport::fallback());
    }
}
