use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{AiFeedback, Course, QuestionReview, Quiz, QuizQuestionType};

/// Question as shown to a learner mid-attempt: no correct index, no
/// explanation.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionDetail {
    pub id: String,
    pub question_text: String,
    pub question_type: QuizQuestionType,
    pub options: Vec<String>,
    pub order: i32,
}

#[derive(Debug, Serialize)]
pub struct QuizStartResponse {
    pub attempt_id: String,
    pub quiz_id: String,
    pub title: String,
    pub time_limit_minutes: i64,
    pub questions: Vec<QuestionDetail>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct QuizPreviewResponse {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub difficulty_level: String,
    pub number_of_questions: usize,
    pub time_limit_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Quiz> for QuizPreviewResponse {
    fn from(quiz: &Quiz) -> Self {
        QuizPreviewResponse {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            topic: quiz.topic.clone(),
            difficulty_level: quiz.difficulty_level.clone(),
            number_of_questions: quiz.question_count(),
            time_limit_minutes: quiz.time_limit_minutes,
            created_at: quiz.created_at,
        }
    }
}

/// Full graded-submission payload returned from submit and replayed from the
/// stored attempt result on preview.
#[derive(Debug, Clone, Serialize)]
pub struct QuizReviewResponse {
    pub attempt_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub quiz_topic: String,
    pub score: f64,
    pub passed: bool,
    pub time_taken: i64,
    pub completed_at: DateTime<Utc>,
    pub correct_answers_count: usize,
    pub incorrect_answers_count: usize,
    pub question_reviews: Vec<QuestionReview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<AiFeedback>,
    pub recommended_courses: Vec<Course>,
}

#[derive(Debug, Serialize)]
pub struct AttemptedQuizPreviewResponse {
    #[serde(flatten)]
    pub quiz: QuizPreviewResponse,
    pub has_been_attempted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_attempt: Option<QuizReviewResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizCard {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub score: f64,
    pub date_taken: DateTime<Utc>,
    pub time_taken: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMetadata {
    pub current_page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl PaginationMetadata {
    pub fn new(current_page: i64, page_size: i64, total_items: i64) -> Self {
        let total_pages = if total_items > 0 {
            (total_items + page_size - 1) / page_size
        } else {
            0
        };

        PaginationMetadata {
            current_page,
            page_size,
            total_items,
            total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizList {
    pub quizzes: Vec<QuizCard>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_quizzes: usize,
    pub average_score: f64,
    /// Percentage of best attempts with `passed = true`.
    pub success_rate: f64,
    pub drafted_quizzes: usize,
}
