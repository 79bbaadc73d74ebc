use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::timestamps;

/// Write-once snapshot of a completed attempt, persisted separately from the
/// attempt itself for fast dashboard and preview reads. Carries the full
/// review list plus any AI feedback and course recommendations that were
/// available at submission time.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AttemptResult {
    pub id: String,
    pub attempt_id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub quiz_title: String,
    pub quiz_topic: String,
    pub score: f64,
    pub passed: bool,
    pub time_taken: i64,
    #[serde(with = "timestamps::rfc3339_micros")]
    pub completed_at: DateTime<Utc>,
    pub correct_answers_count: usize,
    pub incorrect_answers_count: usize,
    pub question_reviews: Vec<QuestionReview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<AiFeedback>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub recommended_courses: Vec<Course>,
    #[serde(with = "timestamps::rfc3339_micros")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub question_text: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub selected_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub order: i32,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AiFeedback {
    pub signal: String,
    pub feedback_message: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Course {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub pic_url: String,
    pub lesson_count: i64,
}

impl AttemptResult {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}
