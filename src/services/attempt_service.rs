use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{
            AiFeedback, AttemptResult, AttemptStatus, Course, QuestionReview, Quiz, QuizAttempt,
        },
        dto::{
            request::SubmitAttemptRequest,
            response::{
                AttemptedQuizPreviewResponse, QuestionDetail, QuizPreviewResponse,
                QuizReviewResponse, QuizStartResponse,
            },
        },
    },
    repositories::{
        AttemptCompletion, AttemptRepository, AttemptResultRepository, CourseCatalog,
        QuizRepository,
    },
    services::{
        feedback_service::{FeedbackProvider, QuizFeedback},
        scoring,
    },
};

/// Orchestrates the attempt state machine: start, submit-and-grade, and the
/// denormalized result snapshot. The only other writer of attempt status is
/// the auto-fail sweep; both go through the repository's conditional
/// transition, which is the sole serialization point per attempt.
pub struct AttemptService {
    attempt_repo: Arc<dyn AttemptRepository>,
    quiz_repo: Arc<dyn QuizRepository>,
    result_repo: Arc<dyn AttemptResultRepository>,
    feedback_provider: Option<Arc<dyn FeedbackProvider>>,
    course_catalog: Option<Arc<dyn CourseCatalog>>,
}

impl AttemptService {
    pub fn new(
        attempt_repo: Arc<dyn AttemptRepository>,
        quiz_repo: Arc<dyn QuizRepository>,
        result_repo: Arc<dyn AttemptResultRepository>,
        feedback_provider: Option<Arc<dyn FeedbackProvider>>,
        course_catalog: Option<Arc<dyn CourseCatalog>>,
    ) -> Self {
        Self {
            attempt_repo,
            quiz_repo,
            result_repo,
            feedback_provider,
            course_catalog,
        }
    }

    async fn get_quiz(&self, quiz_id: &str) -> AppResult<Quiz> {
        self.quiz_repo
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))
    }

    pub async fn preview_quiz(&self, quiz_id: &str) -> AppResult<QuizPreviewResponse> {
        let quiz = self.get_quiz(quiz_id).await?;
        Ok(QuizPreviewResponse::from(&quiz))
    }

    /// Create a fresh in-progress attempt and hand back the questions with
    /// the answer key stripped.
    pub async fn start_attempt(&self, quiz_id: &str, user_id: &str) -> AppResult<QuizStartResponse> {
        let quiz = self.get_quiz(quiz_id).await?;

        let attempt = self
            .attempt_repo
            .create(QuizAttempt::start(quiz_id, user_id))
            .await?;

        log::info!(
            "Started attempt {} for user {} on quiz {}",
            attempt.id,
            user_id,
            quiz_id
        );

        let mut questions: Vec<QuestionDetail> = quiz
            .questions
            .iter()
            .map(|q| QuestionDetail {
                id: q.id.clone(),
                question_text: q.question_text.clone(),
                question_type: q.question_type,
                options: q.options.clone(),
                order: q.order,
            })
            .collect();
        questions.sort_by_key(|q| q.order);

        Ok(QuizStartResponse {
            attempt_id: attempt.id,
            quiz_id: quiz.id,
            title: quiz.title,
            time_limit_minutes: quiz.time_limit_minutes,
            questions,
            started_at: attempt.started_at,
        })
    }

    /// Grade and terminate an attempt. Validation happens before any
    /// mutation; the status transition itself is conditional on the record
    /// still being in progress, so a racing expiry sweep cannot double-grade.
    pub async fn submit_attempt(
        &self,
        attempt_id: &str,
        request: SubmitAttemptRequest,
    ) -> AppResult<QuizReviewResponse> {
        request.validate()?;

        let attempt = self
            .attempt_repo
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id))
            })?;

        if attempt.status.is_terminal() {
            return Err(AppError::AlreadySubmitted(format!(
                "Attempt '{}' is no longer in progress",
                attempt_id
            )));
        }

        let quiz = self.get_quiz(&attempt.quiz_id).await?;

        if let Some(quiz_id) = &request.quiz_id {
            if quiz_id != &quiz.id {
                return Err(AppError::ValidationError(format!(
                    "Quiz id mismatch: attempt belongs to quiz '{}'",
                    quiz.id
                )));
            }
        }

        let selections = Self::validate_answers(&quiz, &request)?;
        let outcome = scoring::grade_submission(&quiz, &selections);

        let now = Utc::now();
        let completion = AttemptCompletion {
            completed_at: now,
            answers: outcome.answers.clone(),
            score: outcome.score,
            passed: outcome.passed,
            time_taken: attempt.elapsed_seconds(now),
            status: AttemptStatus::Completed,
        };

        let transitioned = self
            .attempt_repo
            .complete_if_in_progress(attempt_id, &completion)
            .await?;
        if !transitioned {
            // The expiry sweep got there first.
            return Err(AppError::AlreadySubmitted(format!(
                "Attempt '{}' is no longer in progress",
                attempt_id
            )));
        }

        log::info!(
            "Attempt {} completed with score {:.1} ({} correct, {} incorrect)",
            attempt_id,
            outcome.score,
            outcome.correct_count,
            outcome.incorrect_count
        );

        let feedback = self.fetch_feedback(attempt_id, &quiz, &completion).await;
        let recommended_courses = self.fetch_recommended_courses(attempt_id, &feedback).await;

        let ai_explanations: HashMap<i32, String> = feedback
            .as_ref()
            .map(|f| {
                f.detailed_explanations
                    .iter()
                    .map(|e| (e.question_order, e.explanation.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let question_reviews = Self::build_reviews(&quiz, &completion, &ai_explanations);

        let ai_feedback = feedback.map(|f| AiFeedback {
            signal: f.signal,
            feedback_message: f.feedback_message,
        });

        let response = QuizReviewResponse {
            attempt_id: attempt_id.to_string(),
            quiz_id: quiz.id.clone(),
            quiz_title: quiz.title.clone(),
            quiz_topic: quiz.topic.clone(),
            score: completion.score,
            passed: completion.passed,
            time_taken: completion.time_taken,
            completed_at: completion.completed_at,
            correct_answers_count: outcome.correct_count,
            incorrect_answers_count: outcome.incorrect_count,
            question_reviews: question_reviews.clone(),
            ai_feedback: ai_feedback.clone(),
            recommended_courses: recommended_courses.clone(),
        };

        // Best-effort snapshot: the attempt itself is already durably
        // completed, so a failure here is logged, not surfaced.
        let result = AttemptResult {
            id: AttemptResult::new_id(),
            attempt_id: attempt_id.to_string(),
            quiz_id: quiz.id.clone(),
            user_id: attempt.user_id.clone(),
            quiz_title: quiz.title,
            quiz_topic: quiz.topic,
            score: completion.score,
            passed: completion.passed,
            time_taken: completion.time_taken,
            completed_at: completion.completed_at,
            correct_answers_count: outcome.correct_count,
            incorrect_answers_count: outcome.incorrect_count,
            question_reviews,
            ai_feedback,
            recommended_courses,
            created_at: Utc::now(),
        };
        if let Err(e) = self.result_repo.save(result).await {
            log::error!("Failed to save attempt result for {}: {}", attempt_id, e);
        }

        Ok(response)
    }

    /// Quiz metadata plus, when the user has a stored result, their best
    /// attempt's full review payload.
    pub async fn attempted_quiz_preview(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> AppResult<AttemptedQuizPreviewResponse> {
        let quiz = self.get_quiz(quiz_id).await?;

        let has_been_attempted = self
            .result_repo
            .has_user_attempted_quiz(quiz_id, user_id)
            .await?;

        let best_attempt = if has_been_attempted {
            self.result_repo
                .find_best_by_quiz_and_user(quiz_id, user_id)
                .await?
                .map(Self::review_from_result)
        } else {
            None
        };

        Ok(AttemptedQuizPreviewResponse {
            quiz: QuizPreviewResponse::from(&quiz),
            has_been_attempted,
            best_attempt,
        })
    }

    fn validate_answers(
        quiz: &Quiz,
        request: &SubmitAttemptRequest,
    ) -> AppResult<HashMap<String, usize>> {
        let option_counts: HashMap<&str, usize> = quiz
            .questions
            .iter()
            .map(|q| (q.id.as_str(), q.options.len()))
            .collect();

        let mut selections = HashMap::with_capacity(request.answers.len());
        for answer in &request.answers {
            let Some(&option_count) = option_counts.get(answer.question_id.as_str()) else {
                return Err(AppError::ValidationError(format!(
                    "Question '{}' does not belong to quiz '{}'",
                    answer.question_id, quiz.id
                )));
            };

            if answer.selected >= option_count {
                return Err(AppError::ValidationError(format!(
                    "Selected option {} is out of range for question '{}'",
                    answer.selected, answer.question_id
                )));
            }

            selections.insert(answer.question_id.clone(), answer.selected);
        }

        Ok(selections)
    }

    async fn fetch_feedback(
        &self,
        attempt_id: &str,
        quiz: &Quiz,
        completion: &AttemptCompletion,
    ) -> Option<QuizFeedback> {
        let provider = self.feedback_provider.as_ref()?;

        match provider.grade_with_feedback(quiz, &completion.answers).await {
            Ok(feedback) => Some(feedback),
            Err(e) => {
                log::warn!("AI feedback unavailable for attempt {}: {}", attempt_id, e);
                Some(QuizFeedback {
                    signal: "error".to_string(),
                    feedback_message: format!("AI feedback unavailable: {}", e),
                    detailed_explanations: Vec::new(),
                    recommended_course_ids: Vec::new(),
                })
            }
        }
    }

    async fn fetch_recommended_courses(
        &self,
        attempt_id: &str,
        feedback: &Option<QuizFeedback>,
    ) -> Vec<Course> {
        let Some(feedback) = feedback else {
            return Vec::new();
        };
        if feedback.recommended_course_ids.is_empty() {
            return Vec::new();
        }
        let Some(catalog) = &self.course_catalog else {
            log::debug!(
                "Course recommendations for attempt {} dropped: no catalog configured",
                attempt_id
            );
            return Vec::new();
        };

        match catalog
            .get_courses_by_ids(&feedback.recommended_course_ids)
            .await
        {
            Ok(courses) => courses,
            Err(e) => {
                log::warn!("Course lookup failed for attempt {}: {}", attempt_id, e);
                Vec::new()
            }
        }
    }

    fn build_reviews(
        quiz: &Quiz,
        completion: &AttemptCompletion,
        ai_explanations: &HashMap<i32, String>,
    ) -> Vec<QuestionReview> {
        let questions: HashMap<&str, _> = quiz
            .questions
            .iter()
            .map(|q| (q.id.as_str(), q))
            .collect();

        completion
            .answers
            .iter()
            .map(|answer| {
                let question = questions.get(answer.question_id.as_str());

                // AI explanations are only attached to wrong answers; a
                // correct answer keeps the question's own explanation, if any.
                let explanation = if answer.is_correct {
                    answer.explanation.clone()
                } else {
                    ai_explanations
                        .get(&answer.order)
                        .cloned()
                        .or_else(|| answer.explanation.clone())
                };

                QuestionReview {
                    question_id: answer.question_id.clone(),
                    question_text: answer.question_text.clone(),
                    question_type: question
                        .map(|q| q.question_type.as_str().to_string())
                        .unwrap_or_default(),
                    options: question.map(|q| q.options.clone()).unwrap_or_default(),
                    selected_answer: answer.selected_answer.clone(),
                    correct_answer: answer.correct_answer.clone(),
                    is_correct: answer.is_correct,
                    explanation,
                    order: answer.order,
                }
            })
            .collect()
    }

    fn review_from_result(result: AttemptResult) -> QuizReviewResponse {
        QuizReviewResponse {
            attempt_id: result.attempt_id,
            quiz_id: result.quiz_id,
            quiz_title: result.quiz_title,
            quiz_topic: result.quiz_topic,
            score: result.score,
            passed: result.passed,
            time_taken: result.time_taken,
            completed_at: result.completed_at,
            correct_answers_count: result.correct_answers_count,
            incorrect_answers_count: result.incorrect_answers_count,
            question_reviews: result.question_reviews,
            ai_feedback: result.ai_feedback,
            recommended_courses: result.recommended_courses,
        }
    }
}
