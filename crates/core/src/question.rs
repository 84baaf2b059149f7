use serde::{Deserialize, Serialize};

/// Identifies one of the eight fixed interview questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionId {
    Introduction,
    Motivation,
    IndustryExperience,
    Learnings,
    StrengthsWeaknesses,
    FutureVision,
    UniqueValue,
    Availability,
}

/// A single interview question. The bank is immutable and its ordering is
/// significant: sessions walk it front to back.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: QuestionId,
    pub text: &'static str,
    /// Points a complete answer is expected to touch. Empty means the judge
    /// decides on overall substance alone.
    pub expected_coverage: &'static [&'static str],
}

pub const QUESTION_COUNT: usize = 8;

static QUESTIONS: [Question; QUESTION_COUNT] = [
    Question {
        id: QuestionId::Introduction,
        text: "Tell me something about yourself (Include your name, family background, educational background, and whether you are an earning member of the family.)",
        expected_coverage: &[
            "name",
            "family background",
            "educational background",
            "earning member status",
        ],
    },
    Question {
        id: QuestionId::Motivation,
        text: "What motivated you to pursue a career in this field?",
        expected_coverage: &[],
    },
    Question {
        id: QuestionId::IndustryExperience,
        text: "How many internships or industrial training programs have you completed so far? (Please include the names, durations, and the departments where you were trained.)",
        expected_coverage: &[
            "number of internships",
            "names of organizations",
            "durations",
            "departments",
        ],
    },
    Question {
        id: QuestionId::Learnings,
        text: "Tell me five things you have learned from the internships",
        expected_coverage: &[],
    },
    Question {
        id: QuestionId::StrengthsWeaknesses,
        text: "Tell me two positive qualities about yourself and two areas where you think you need improvement.",
        expected_coverage: &[],
    },
    Question {
        id: QuestionId::FutureVision,
        text: "Where do you see yourself in five years?",
        expected_coverage: &[],
    },
    Question {
        id: QuestionId::UniqueValue,
        text: "Give me a strong reason why I should hire you and how you are different from other candidates.",
        expected_coverage: &[],
    },
    Question {
        id: QuestionId::Availability,
        text: "Are you available to start work immediately, or do you need time to complete other commitments?",
        expected_coverage: &[],
    },
];

/// The full ordered question bank.
pub fn question_bank() -> &'static [Question] {
    &QUESTIONS
}

/// Question at `index`, or `None` once the sequence is exhausted.
pub fn question_at(index: usize) -> Option<&'static Question> {
    QUESTIONS.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_has_eight_ordered_questions() {
        let bank = question_bank();
        assert_eq!(bank.len(), QUESTION_COUNT);
        assert_eq!(bank[0].id, QuestionId::Introduction);
        assert_eq!(bank[QUESTION_COUNT - 1].id, QuestionId::Availability);
    }

    #[test]
    fn coverage_points_present_where_defined() {
        assert_eq!(question_at(0).unwrap().expected_coverage.len(), 4);
        assert!(question_at(1).unwrap().expected_coverage.is_empty());
        assert!(question_at(QUESTION_COUNT).is_none());
    }
}
