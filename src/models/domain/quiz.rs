use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::{quiz_question::QuizQuestion, timestamps};

/// Quiz metadata, owned by the authoring side. The attempt engine only ever
/// reads it: time limit and passing score feed grading and expiry, title and
/// topic feed the dashboard join.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub difficulty_level: String,
    /// Wall-clock allowance for one attempt, in whole minutes.
    pub time_limit_minutes: i64,
    /// Minimum score (0-100) required for an attempt to pass.
    pub passing_score: f64,
    pub status: QuizStatus,
    pub created_by_user_id: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamps::rfc3339_micros_option"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    DraftStage1,
    Draft,
    Published,
    Archived,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::DraftStage1 => "draft_stage1",
            QuizStatus::Draft => "draft",
            QuizStatus::Published => "published",
            QuizStatus::Archived => "archived",
        }
    }

    /// Statuses the drafts dashboard view treats as "never published".
    pub fn draft_statuses() -> [QuizStatus; 2] {
        [QuizStatus::DraftStage1, QuizStatus::Draft]
    }
}

impl Quiz {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_status_serializes_to_snake_case() {
        let json = serde_json::to_string(&QuizStatus::DraftStage1).expect("status should serialize");
        assert_eq!(json, "\"draft_stage1\"");

        let parsed: QuizStatus =
            serde_json::from_str("\"published\"").expect("status should deserialize");
        assert_eq!(parsed, QuizStatus::Published);
    }

    #[test]
    fn quiz_status_as_str_matches_serde_representation() {
        for status in [
            QuizStatus::DraftStage1,
            QuizStatus::Draft,
            QuizStatus::Published,
            QuizStatus::Archived,
        ] {
            let json = serde_json::to_string(&status).expect("status should serialize");
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
