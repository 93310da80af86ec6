use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four parallel test families. Each family lives in its own set of
/// tables; the analytics layer only sees them through this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestFamily {
    Spelling,
    Punctuation,
    Stress,
    Generic,
}

impl TestFamily {
    pub const ALL: [TestFamily; 4] = [
        TestFamily::Spelling,
        TestFamily::Punctuation,
        TestFamily::Stress,
        TestFamily::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TestFamily::Spelling => "spelling",
            TestFamily::Punctuation => "punctuation",
            TestFamily::Stress => "stress",
            TestFamily::Generic => "generic",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "spelling" => Some(TestFamily::Spelling),
            "punctuation" => Some(TestFamily::Punctuation),
            "stress" => Some(TestFamily::Stress),
            "generic" => Some(TestFamily::Generic),
            _ => None,
        }
    }
}

/// Ids are only unique within a family, so every test reference carries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestKey {
    pub family: TestFamily,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestInfo {
    #[serde(flatten)]
    pub key: TestKey,
    pub title: String,
    pub assignment_id: Option<i64>,
    pub teacher_id: i64,
    pub max_attempts: i64,
    pub is_active: bool,
    pub show_hints: bool,
    pub show_answers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInfo {
    pub id: i64,
    pub title: String,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInfo {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub class_id: Option<i64>,
}

/// The family-neutral view of a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRef {
    pub id: i64,
    pub test_id: i64,
    pub order_index: i64,
    pub points: f64,
    /// Short human-readable label rendered by the family adapter.
    pub prompt: String,
}

/// One start-to-(optional)-finish pass at a test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: i64,
    pub test_id: i64,
    pub student_id: i64,
    pub attempt_number: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub grade: Option<i64>,
    pub completed: bool,
}

impl Attempt {
    /// Completed with a completion timestamp. A completed flag without a
    /// timestamp does not qualify.
    pub fn is_finished(&self) -> bool {
        self.completed && self.completed_at.is_some()
    }

    pub fn is_in_progress(&self) -> bool {
        !self.completed
    }

    /// Seconds between start and completion, only when strictly positive.
    pub fn positive_duration_seconds(&self) -> Option<f64> {
        if !self.completed {
            return None;
        }
        let completed_at = self.completed_at?;
        let secs = (completed_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        if secs > 0.0 {
            Some(secs)
        } else {
            None
        }
    }
}

/// The family-neutral view of an answer. `submitted_value` is the literal
/// student input rendered as a string by the family adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub is_correct: bool,
    pub submitted_value: String,
}
