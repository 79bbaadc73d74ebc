use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::timestamps;

/// One timed run of a user through a quiz. `started_at` is set exactly once
/// at creation; `completed_at`, `score`, `passed` and `time_taken` are set
/// exactly once, on the transition out of `InProgress`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    #[serde(with = "timestamps::rfc3339_micros")]
    pub started_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamps::rfc3339_micros_option"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    pub answers: Vec<Answer>,
    /// Percentage score, 0-100.
    pub score: f64,
    pub passed: bool,
    /// Whole seconds between start and completion.
    pub time_taken: i64,
    pub status: AttemptStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
    AutoFailed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Abandoned => "abandoned",
            AttemptStatus::AutoFailed => "auto_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

/// A recorded answer, denormalized with the question and option text as they
/// were at submission time so historic reviews survive later quiz edits.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Answer {
    pub question_id: String,
    pub selected: usize,
    pub question_text: String,
    pub selected_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub order: i32,
}

impl QuizAttempt {
    /// Create a fresh in-progress attempt. Multiple concurrent attempts per
    /// (quiz, user) are allowed; retakes are a feature.
    pub fn start(quiz_id: &str, user_id: &str) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            answers: Vec::new(),
            score: 0.0,
            passed: false,
            time_taken: 0,
            status: AttemptStatus::InProgress,
        }
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.started_at).num_seconds()
    }
}
