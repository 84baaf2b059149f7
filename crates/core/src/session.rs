use crate::Command;
use crate::feedback::{self, FeedbackReport};
use crate::judge::Judge;
use crate::question::{QUESTION_COUNT, QuestionId, question_at};
use crate::validate;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc::Sender;

/// Follow-up budget per question. Once spent, the session advances no matter
/// what the judge says: the interview keeps moving even when the candidate
/// never fully covers a question.
pub const MAX_FOLLOW_UPS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewState {
    Start,
    Question,
    Validate,
    FollowUp,
    Feedback,
    End,
}

/// One accepted spoken answer, immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub text: String,
    pub is_follow_up: bool,
    pub timestamp: DateTime<Utc>,
}

/// Everything the candidate said for one question, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionTranscript {
    pub question_id: QuestionId,
    pub question_text: String,
    pub answers: Vec<AnswerRecord>,
}

impl QuestionTranscript {
    /// The accumulated answer the validator judges: every answer given for
    /// this question so far, joined in arrival order.
    pub fn combined_answer(&self) -> String {
        self.answers
            .iter()
            .map(|a| a.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One interview attempt. Owned by exactly one connection handler; the
/// registry only hands out identity, never mutates.
pub struct InterviewSession {
    pub session_id: String,
    pub state: InterviewState,
    pub current_question_index: usize,
    pub follow_up_count: u8,
    pub transcript: Vec<QuestionTranscript>,
    pub feedback: Option<FeedbackReport>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    judge_timeout: Duration,
}

impl InterviewSession {
    pub fn new(session_id: String, judge_timeout: Duration) -> Self {
        Self {
            session_id,
            state: InterviewState::Start,
            current_question_index: 0,
            follow_up_count: 0,
            transcript: Vec::new(),
            feedback: None,
            created_at: Utc::now(),
            ended_at: None,
            judge_timeout,
        }
    }

    fn progress(&self) -> String {
        format!("{}/{}", self.current_question_index + 1, QUESTION_COUNT)
    }

    /// Leaves START by asking the greeting question (question 0).
    pub async fn begin(&mut self, command_tx: &Sender<Command>) -> Result<()> {
        debug_assert_eq!(self.state, InterviewState::Start);
        let first = question_at(0).context("Question bank is empty")?;
        command_tx
            .send(Command::AskQuestion {
                text: first.text.to_string(),
                progress: self.progress(),
                is_greeting: true,
                is_follow_up: false,
            })
            .await
            .context("Failed to send greeting question command")?;
        self.state = InterviewState::Question;
        Ok(())
    }

    /// Feeds one answer event through the state machine. Every outcome is
    /// emitted as a `Command`; an `Err` here means only that the runtime
    /// stopped listening on the command channel.
    ///
    /// Rejections (empty text, answer while not waiting for one) leave the
    /// session untouched so the client can retry.
    pub async fn process_answer<J: Judge + Send + Sync>(
        &mut self,
        judge: &J,
        text: &str,
        command_tx: &Sender<Command>,
    ) -> Result<()> {
        let is_follow_up = match self.state {
            InterviewState::Question => false,
            InterviewState::FollowUp => true,
            _ => {
                tracing::debug!(
                    session_id = %self.session_id,
                    state = ?self.state,
                    "Rejecting answer received outside QUESTION/FOLLOW_UP"
                );
                command_tx
                    .send(Command::Reject(
                        "I wasn't expecting an answer right now.".to_string(),
                    ))
                    .await
                    .context("Failed to send rejection command")?;
                return Ok(());
            }
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            command_tx
                .send(Command::Reject(
                    "I didn't catch that. Could you please repeat your answer?".to_string(),
                ))
                .await
                .context("Failed to send rejection command")?;
            return Ok(());
        }

        let question = question_at(self.current_question_index)
            .context("Question index ran past the bank while not in END")?;
        self.record_answer(question.id, question.text, trimmed, is_follow_up);
        self.state = InterviewState::Validate;

        let entry = self
            .transcript
            .last()
            .context("Transcript empty right after recording an answer")?;
        let verdict =
            validate::validate_answer(judge, question, &entry.combined_answer(), self.judge_timeout)
                .await;

        // Forced advance: with the follow-up budget spent, the judge's final
        // "still incomplete" verdict is intentionally discarded.
        if verdict.complete || self.follow_up_count >= MAX_FOLLOW_UPS {
            self.advance(judge, command_tx).await
        } else {
            self.follow_up_count += 1;
            let follow_up = verdict
                .follow_up
                .unwrap_or_else(|| "Could you tell me more about that?".to_string());
            command_tx
                .send(Command::AskQuestion {
                    text: follow_up,
                    progress: self.progress(),
                    is_greeting: false,
                    is_follow_up: true,
                })
                .await
                .context("Failed to send follow-up question command")?;
            self.state = InterviewState::FollowUp;
            Ok(())
        }
    }

    async fn advance<J: Judge + Send + Sync>(
        &mut self,
        judge: &J,
        command_tx: &Sender<Command>,
    ) -> Result<()> {
        self.current_question_index += 1;
        self.follow_up_count = 0;

        if let Some(next) = question_at(self.current_question_index) {
            command_tx
                .send(Command::AskQuestion {
                    text: next.text.to_string(),
                    progress: self.progress(),
                    is_greeting: false,
                    is_follow_up: false,
                })
                .await
                .context("Failed to send next question command")?;
            self.state = InterviewState::Question;
            return Ok(());
        }

        // All questions answered: synthesize feedback and finish.
        self.state = InterviewState::Feedback;
        command_tx
            .send(Command::Status(
                "Generating your personalized feedback...".to_string(),
            ))
            .await
            .context("Failed to send status command")?;

        let report = feedback::synthesize_feedback(judge, &self.transcript, self.judge_timeout).await;
        self.feedback = Some(report.clone());
        command_tx
            .send(Command::DeliverFeedback(report))
            .await
            .context("Failed to send feedback command")?;
        command_tx
            .send(Command::SessionComplete(
                "Interview completed successfully!".to_string(),
            ))
            .await
            .context("Failed to send session complete command")?;

        self.ended_at = Some(Utc::now());
        self.state = InterviewState::End;
        Ok(())
    }

    fn record_answer(
        &mut self,
        question_id: QuestionId,
        question_text: &str,
        text: &str,
        is_follow_up: bool,
    ) {
        let record = AnswerRecord {
            question_id,
            text: text.to_string(),
            is_follow_up,
            timestamp: Utc::now(),
        };
        match self
            .transcript
            .iter_mut()
            .find(|entry| entry.question_id == question_id)
        {
            Some(entry) => entry.answers.push(record),
            None => self.transcript.push(QuestionTranscript {
                question_id,
                question_text: question_text.to_string(),
                answers: vec![record],
            }),
        }
    }

    pub fn is_ended(&self) -> bool {
        self.state == InterviewState::End
    }
}
