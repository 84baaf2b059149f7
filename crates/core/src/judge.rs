use crate::feedback::FeedbackReport;
use crate::question::Question;
use crate::session::QuestionTranscript;
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: String,
}

/// The judge's verdict on a single accumulated answer.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerAssessment {
    pub is_complete: bool,
    #[serde(default)]
    pub missing_points: Vec<String>,
    #[serde(default)]
    pub follow_up: String,
}

// The `Judge` trait defines the contract for the external judgment function:
// any service that can assess a candidate's answer and review a finished
// transcript. The state machine and the retry/fallback policies depend on
// this abstraction rather than a concrete client, so unit tests drive them
// with `mockall`'s `MockJudge` instead of live network calls.
//
// The `#[async_trait]` macro is used because Rust traits do not natively
// support async functions in dyn contexts. `#[cfg_attr(test, automock)]`
// tells `mockall` to generate a mock implementation of this trait, but only
// when compiling for tests.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Judge {
    /// Assess whether `answer` adequately addresses `question`. `answer` is
    /// the concatenation of everything the candidate has said for this
    /// question so far, including follow-up answers.
    async fn assess_answer(&self, question: &Question, answer: &str) -> Result<AnswerAssessment>;

    /// Review the full interview transcript and produce structured feedback.
    async fn review_transcript(&self, transcript: &[QuestionTranscript]) -> Result<FeedbackReport>;
}

/// Judge backed by the OpenAI chat-completions API.
pub struct OpenAiJudge {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiJudge {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    async fn chat(&self, prompt: String, temperature: f64) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" },
            "temperature": temperature
        });

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .json::<LlmResponse>()
            .await?;

        let answer = &resp
            .choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?
            .message
            .content;
        Ok(answer.clone())
    }
}

/// Strips a surrounding markdown code fence, if present. Models sometimes
/// wrap their JSON in ```json fences despite being told not to.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

#[async_trait]
impl Judge for OpenAiJudge {
    async fn assess_answer(&self, question: &Question, answer: &str) -> Result<AnswerAssessment> {
        let coverage_text = if question.expected_coverage.is_empty() {
            String::new()
        } else {
            format!(
                "\nExpected coverage points: {}",
                question.expected_coverage.join(", ")
            )
        };

        let prompt = format!(
            r#"You are evaluating a candidate's answer in a mock interview for vocational training students.

Question: {question}{coverage_text}

Candidate's Answer: {answer}

Evaluate if the answer adequately addresses the question. Consider:
1. Does it cover the main points expected?
2. Is it detailed enough or too vague?
3. If coverage points are listed, are they addressed?

Respond STRICTLY as JSON:
{{
    "is_complete": true|false,
    "missing_points": ["point1", "point2"],
    "follow_up": "A brief, encouraging follow-up question if incomplete, or empty string if complete"
}}

Do NOT add any explanation, just the JSON."#,
            question = question.text,
        );

        let raw = self.chat(prompt, 0.2).await?;
        let assessment: AnswerAssessment = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| anyhow::anyhow!("Failed to parse LLM assessment: {e}: {raw}"))?;
        Ok(assessment)
    }

    async fn review_transcript(&self, transcript: &[QuestionTranscript]) -> Result<FeedbackReport> {
        let mut rendered = String::new();
        for (i, entry) in transcript.iter().enumerate() {
            rendered.push_str(&format!(
                "\nQ{n}: {question}\n\nCandidate's Answer:\n{answer}\n{rule}\n",
                n = i + 1,
                question = entry.question_text,
                answer = entry.combined_answer(),
                rule = "-".repeat(80),
            ));
        }

        let prompt = format!(
            r#"You are an experienced interviewer providing constructive feedback to a vocational training student who just completed a mock interview.

INTERVIEW TRANSCRIPT:
{rendered}

Generate comprehensive, encouraging feedback following these guidelines:

1. OVERALL ASSESSMENT: A brief 2-3 sentence summary of their performance
2. STRENGTHS: Identify 3-4 specific positive aspects you observed
3. AREAS FOR IMPROVEMENT: Point out 2-3 areas where they can improve (be constructive and specific)
4. SPECIFIC SUGGESTIONS: Provide 3-4 actionable tips they can implement
5. ENCOURAGEMENT: End with 1-2 sentences of genuine encouragement

Be supportive and positive in tone, acknowledge their effort, and keep the advice practical and implementable.

Respond STRICTLY as JSON:
{{
    "overall_assessment": "Your overall assessment here",
    "strengths": ["strength1", "strength2", "strength3"],
    "areas_for_improvement": ["area1", "area2", "area3"],
    "specific_suggestions": ["suggestion1", "suggestion2", "suggestion3"],
    "encouragement": "Your encouraging message here"
}}

Do NOT add any explanation, just the JSON."#
        );

        let raw = self.chat(prompt, 0.7).await?;
        let report: FeedbackReport = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| anyhow::anyhow!("Failed to parse LLM feedback: {e}: {raw}"))?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_json() {
        let fenced = "```json\n{\"is_complete\": true}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"is_complete\": true}");
        let bare = "  {\"is_complete\": false} ";
        assert_eq!(strip_code_fences(bare), "{\"is_complete\": false}");
    }

    #[test]
    fn assessment_defaults_for_missing_fields() {
        let parsed: AnswerAssessment = serde_json::from_str(r#"{"is_complete": true}"#).unwrap();
        assert!(parsed.is_complete);
        assert!(parsed.missing_points.is_empty());
        assert!(parsed.follow_up.is_empty());
    }
}
