use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::Config,
    constants::prompts::QUIZ_FEEDBACK_SYSTEM_PROMPT,
    errors::{AppError, AppResult},
    models::domain::{Answer, Quiz},
};

/// Structured feedback for one graded attempt, as produced by the AI
/// collaborator.
#[derive(Clone, Debug, Deserialize)]
pub struct QuizFeedback {
    pub signal: String,
    pub feedback_message: String,
    #[serde(default)]
    pub detailed_explanations: Vec<QuestionExplanation>,
    #[serde(default)]
    pub recommended_course_ids: Vec<i32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuestionExplanation {
    pub question_order: i32,
    pub explanation: String,
}

/// External AI feedback collaborator. May fail or time out; callers degrade
/// to an error-signal feedback record rather than failing the submission.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn grade_with_feedback(&self, quiz: &Quiz, answers: &[Answer]) -> AppResult<QuizFeedback>;
}

pub struct OpenAiFeedbackService {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiFeedbackService {
    /// Returns `None` when no API key is configured; feedback is then simply
    /// absent from submissions.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.openai_api_key.as_ref()?;
        let client = Client::with_config(
            OpenAIConfig::new().with_api_key(api_key.expose_secret().to_string()),
        );

        Some(Self {
            client,
            model: config.openai_model.clone(),
            timeout: Duration::from_secs(config.feedback_timeout_secs),
        })
    }

    fn build_user_prompt(quiz: &Quiz, answers: &[Answer]) -> String {
        let questions: Vec<_> = quiz
            .questions
            .iter()
            .map(|q| {
                json!({
                    "order": q.order,
                    "question": q.question_text,
                    "options": q.options,
                    "correct_answer": q.correct_answer_text(),
                })
            })
            .collect();

        let graded: Vec<_> = answers
            .iter()
            .map(|a| {
                json!({
                    "order": a.order,
                    "selected_answer": a.selected_answer,
                    "is_correct": a.is_correct,
                })
            })
            .collect();

        json!({
            "quiz_title": quiz.title,
            "quiz_topic": quiz.topic,
            "questions": questions,
            "graded_answers": graded,
        })
        .to_string()
    }

    fn parse_feedback(content: &str) -> AppResult<QuizFeedback> {
        // Models occasionally fence the JSON despite the prompt.
        let trimmed = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        serde_json::from_str(trimmed)
            .map_err(|e| AppError::InternalError(format!("Unparseable feedback payload: {}", e)))
    }
}

#[async_trait]
impl FeedbackProvider for OpenAiFeedbackService {
    async fn grade_with_feedback(&self, quiz: &Quiz, answers: &[Answer]) -> AppResult<QuizFeedback> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(QUIZ_FEEDBACK_SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| AppError::InternalError(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(Self::build_user_prompt(quiz, answers))
                    .build()
                    .map_err(|e| AppError::InternalError(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| AppError::InternalError("AI feedback request timed out".to_string()))?
            .map_err(|e| AppError::InternalError(format!("AI feedback request failed: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::InternalError("AI feedback response had no content".to_string())
            })?;

        Self::parse_feedback(&content)
    }
}
