use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub id: String,
    pub question_text: String,
    pub question_type: QuizQuestionType,
    /// Ordered option texts; `correct_index` points into this list.
    pub options: Vec<String>,
    pub correct_index: usize,
    /// Display position within the quiz, 1-based.
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizQuestionType {
    MultipleChoice,
    TrueFalse,
}

impl QuizQuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizQuestionType::MultipleChoice => "multiple_choice",
            QuizQuestionType::TrueFalse => "true_false",
        }
    }
}

impl QuizQuestion {
    pub fn option_text(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    pub fn correct_answer_text(&self) -> &str {
        self.options
            .get(self.correct_index)
            .map(String::as_str)
            .unwrap_or_default()
    }
}
