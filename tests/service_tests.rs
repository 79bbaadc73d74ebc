//! Service-level tests against in-memory repository implementations. These
//! exercise the same trait contracts the Mongo implementations satisfy,
//! including the best-attempt reduction and the conditional status
//! transition.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use quiz_attempt_server::errors::{AppError, AppResult};
use quiz_attempt_server::models::domain::{
    Answer, AttemptResult, AttemptStatus, Course, Quiz, QuizAttempt, QuizQuestion,
    QuizQuestionType, QuizStatus,
};
use quiz_attempt_server::models::dto::request::{
    AnswerInput, FilterOptions, SortBy, SortOrder, SubmitAttemptRequest,
};
use quiz_attempt_server::repositories::{
    AttemptCompletion, AttemptRepository, AttemptResultRepository, CourseCatalog, QuizRepository,
};
use quiz_attempt_server::services::feedback_service::{
    FeedbackProvider, QuestionExplanation, QuizFeedback,
};
use quiz_attempt_server::services::{AttemptService, AutoFailService, DashboardService};

// ---------------------------------------------------------------------------
// In-memory repositories
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InMemoryAttemptRepository {
    attempts: RwLock<HashMap<String, QuizAttempt>>,
}

impl InMemoryAttemptRepository {
    /// Mirrors the store-side best-of reduction: highest score wins, ties
    /// broken by later completion, then by attempt id.
    fn beats(challenger: &QuizAttempt, incumbent: &QuizAttempt) -> bool {
        if challenger.score != incumbent.score {
            return challenger.score > incumbent.score;
        }
        if challenger.completed_at != incumbent.completed_at {
            return challenger.completed_at > incumbent.completed_at;
        }
        challenger.id > incumbent.id
    }

    fn best_per_quiz(attempts: &HashMap<String, QuizAttempt>, user_id: &str) -> Vec<QuizAttempt> {
        let mut best: HashMap<String, QuizAttempt> = HashMap::new();
        for attempt in attempts.values() {
            if attempt.user_id != user_id || attempt.status != AttemptStatus::Completed {
                continue;
            }
            match best.get(&attempt.quiz_id) {
                Some(current) if !Self::beats(attempt, current) => {}
                _ => {
                    best.insert(attempt.quiz_id.clone(), attempt.clone());
                }
            }
        }
        best.into_values().collect()
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        self.attempts
            .write()
            .await
            .insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        Ok(self.attempts.read().await.get(id).cloned())
    }

    async fn find_in_progress(&self) -> AppResult<Vec<QuizAttempt>> {
        Ok(self
            .attempts
            .read()
            .await
            .values()
            .filter(|a| a.status == AttemptStatus::InProgress)
            .cloned()
            .collect())
    }

    async fn complete_if_in_progress(
        &self,
        id: &str,
        completion: &AttemptCompletion,
    ) -> AppResult<bool> {
        let mut attempts = self.attempts.write().await;
        match attempts.get_mut(id) {
            Some(attempt) if attempt.status == AttemptStatus::InProgress => {
                attempt.completed_at = Some(completion.completed_at);
                attempt.answers = completion.answers.clone();
                attempt.score = completion.score;
                attempt.passed = completion.passed;
                attempt.time_taken = completion.time_taken;
                attempt.status = completion.status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_best_attempts_paginated(
        &self,
        user_id: &str,
        passed: Option<bool>,
        page: i64,
        page_size: i64,
        sort_by: SortBy,
        sort_order: SortOrder,
    ) -> AppResult<(Vec<QuizAttempt>, i64)> {
        let attempts = self.attempts.read().await;
        let mut winners = Self::best_per_quiz(&attempts, user_id);

        if let Some(passed) = passed {
            winners.retain(|a| a.passed == passed);
        }

        winners.sort_by(|a, b| {
            let primary = match sort_by {
                SortBy::Score => a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal),
                SortBy::CompletedAt | SortBy::Topic => a.completed_at.cmp(&b.completed_at),
            };
            let ordering = primary.then_with(|| a.id.cmp(&b.id));
            match sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = winners.len() as i64;
        let start = ((page - 1) * page_size).max(0) as usize;
        let window = winners
            .into_iter()
            .skip(start)
            .take(page_size.max(0) as usize)
            .collect();

        Ok((window, total))
    }

    async fn find_completed_quiz_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        let mut quiz_ids: Vec<String> = self
            .attempts
            .read()
            .await
            .values()
            .filter(|a| a.user_id == user_id && a.status == AttemptStatus::Completed)
            .map(|a| a.quiz_id.clone())
            .collect();
        quiz_ids.sort();
        quiz_ids.dedup();
        Ok(quiz_ids)
    }
}

#[derive(Default)]
struct InMemoryQuizRepository {
    quizzes: RwLock<HashMap<String, Quiz>>,
}

impl InMemoryQuizRepository {
    async fn insert(&self, quiz: Quiz) {
        self.quizzes.write().await.insert(quiz.id.clone(), quiz);
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(ids.iter().filter_map(|id| quizzes.get(id).cloned()).collect())
    }

    async fn list_by_user_and_statuses(
        &self,
        user_id: &str,
        statuses: &[QuizStatus],
        topic: Option<&str>,
        page: i64,
        page_size: i64,
        sort_order: SortOrder,
    ) -> AppResult<(Vec<Quiz>, i64)> {
        let quizzes = self.quizzes.read().await;
        let mut matching: Vec<Quiz> = quizzes
            .values()
            .filter(|q| q.created_by_user_id == user_id)
            .filter(|q| statuses.contains(&q.status))
            .filter(|q| topic.map_or(true, |t| q.topic == t))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ordering = a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id));
            match sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matching.len() as i64;
        let start = ((page - 1) * page_size).max(0) as usize;
        let window = matching
            .into_iter()
            .skip(start)
            .take(page_size.max(0) as usize)
            .collect();

        Ok((window, total))
    }
}

#[derive(Default)]
struct InMemoryAttemptResultRepository {
    results: RwLock<Vec<AttemptResult>>,
}

#[async_trait]
impl AttemptResultRepository for InMemoryAttemptResultRepository {
    async fn save(&self, result: AttemptResult) -> AppResult<AttemptResult> {
        self.results.write().await.push(result.clone());
        Ok(result)
    }

    async fn find_best_by_quiz_and_user(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> AppResult<Option<AttemptResult>> {
        let results = self.results.read().await;
        let mut candidates: Vec<&AttemptResult> = results
            .iter()
            .filter(|r| r.quiz_id == quiz_id && r.user_id == user_id)
            .collect();
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.completed_at.cmp(&a.completed_at))
        });
        Ok(candidates.first().map(|r| (*r).clone()))
    }

    async fn has_user_attempted_quiz(&self, quiz_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self
            .results
            .read()
            .await
            .iter()
            .any(|r| r.quiz_id == quiz_id && r.user_id == user_id))
    }
}

struct StubCourseCatalog {
    courses: Vec<Course>,
}

#[async_trait]
impl CourseCatalog for StubCourseCatalog {
    async fn get_courses_by_ids(&self, ids: &[i32]) -> AppResult<Vec<Course>> {
        Ok(self
            .courses
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }
}

mockall::mock! {
    FeedbackBackend {}

    #[async_trait]
    impl FeedbackProvider for FeedbackBackend {
        async fn grade_with_feedback(&self, quiz: &Quiz, answers: &[Answer]) -> AppResult<QuizFeedback>;
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Harness {
    attempts: Arc<InMemoryAttemptRepository>,
    quizzes: Arc<InMemoryQuizRepository>,
    results: Arc<InMemoryAttemptResultRepository>,
}

impl Harness {
    fn new() -> Self {
        Harness {
            attempts: Arc::new(InMemoryAttemptRepository::default()),
            quizzes: Arc::new(InMemoryQuizRepository::default()),
            results: Arc::new(InMemoryAttemptResultRepository::default()),
        }
    }

    fn attempt_service(&self) -> AttemptService {
        self.attempt_service_with(None, None)
    }

    fn attempt_service_with(
        &self,
        feedback: Option<Arc<dyn FeedbackProvider>>,
        catalog: Option<Arc<dyn CourseCatalog>>,
    ) -> AttemptService {
        AttemptService::new(
            self.attempts.clone(),
            self.quizzes.clone(),
            self.results.clone(),
            feedback,
            catalog,
        )
    }

    fn dashboard_service(&self) -> DashboardService {
        DashboardService::new(self.attempts.clone(), self.quizzes.clone())
    }

    fn auto_fail_service(&self) -> Arc<AutoFailService> {
        Arc::new(AutoFailService::new(
            self.attempts.clone(),
            self.quizzes.clone(),
        ))
    }
}

fn question(id: &str, order: i32, correct_index: usize) -> QuizQuestion {
    QuizQuestion {
        id: id.to_string(),
        question_text: format!("Question {}", order),
        question_type: QuizQuestionType::MultipleChoice,
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_index,
        order,
        explanation: Some(format!("Option {} is right", correct_index)),
    }
}

fn published_quiz(id: &str, owner: &str, topic: &str) -> Quiz {
    Quiz {
        id: id.to_string(),
        title: format!("{} fundamentals", topic),
        topic: topic.to_string(),
        difficulty_level: "beginner".to_string(),
        time_limit_minutes: 10,
        passing_score: 60.0,
        status: QuizStatus::Published,
        created_by_user_id: owner.to_string(),
        questions: vec![
            question("q1", 1, 0),
            question("q2", 2, 1),
            question("q3", 3, 2),
        ],
        created_at: Some(Utc::now()),
    }
}

fn draft_quiz(id: &str, owner: &str, topic: &str, created_at: DateTime<Utc>) -> Quiz {
    let mut quiz = published_quiz(id, owner, topic);
    quiz.status = QuizStatus::Draft;
    quiz.created_at = Some(created_at);
    quiz
}

fn completed_attempt(
    id: &str,
    quiz_id: &str,
    user_id: &str,
    score: f64,
    passed: bool,
    completed_at: DateTime<Utc>,
) -> QuizAttempt {
    QuizAttempt {
        id: id.to_string(),
        quiz_id: quiz_id.to_string(),
        user_id: user_id.to_string(),
        started_at: completed_at - Duration::minutes(5),
        completed_at: Some(completed_at),
        answers: Vec::new(),
        score,
        passed,
        time_taken: 300,
        status: AttemptStatus::Completed,
    }
}

fn answers(selections: &[(&str, usize)]) -> Vec<AnswerInput> {
    selections
        .iter()
        .map(|(question_id, selected)| AnswerInput {
            question_id: question_id.to_string(),
            selected: *selected,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Attempt lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_grades_and_persists_the_attempt() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    let service = harness.attempt_service();

    let started = service.start_attempt("quiz-1", "learner").await.unwrap();
    assert_eq!(started.questions.len(), 3);
    assert!(started.questions.windows(2).all(|w| w[0].order <= w[1].order));

    // Two of three correct: 66.7, above the 60 passing score.
    let review = service
        .submit_attempt(
            &started.attempt_id,
            SubmitAttemptRequest {
                quiz_id: Some("quiz-1".to_string()),
                answers: answers(&[("q1", 0), ("q2", 1), ("q3", 0)]),
            },
        )
        .await
        .unwrap();

    assert!((review.score - 200.0 / 3.0).abs() < 0.01);
    assert!(review.passed);
    assert_eq!(review.correct_answers_count, 2);
    assert_eq!(review.incorrect_answers_count, 1);
    assert_eq!(review.question_reviews.len(), 3);

    let stored = harness
        .attempts
        .find_by_id(&started.attempt_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, AttemptStatus::Completed);
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.answers.len(), 3);

    // The denormalized snapshot went in too.
    assert!(harness
        .results
        .has_user_attempted_quiz("quiz-1", "learner")
        .await
        .unwrap());
}

#[tokio::test]
async fn unanswered_questions_count_as_incorrect() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    let service = harness.attempt_service();

    let started = service.start_attempt("quiz-1", "learner").await.unwrap();
    let review = service
        .submit_attempt(
            &started.attempt_id,
            SubmitAttemptRequest {
                quiz_id: None,
                answers: answers(&[("q1", 0)]),
            },
        )
        .await
        .unwrap();

    assert_eq!(review.correct_answers_count, 1);
    assert_eq!(review.incorrect_answers_count, 2);
    assert!((review.score - 100.0 / 3.0).abs() < 0.01);
    assert!(!review.passed);
    // Only the answered question appears in the review list.
    assert_eq!(review.question_reviews.len(), 1);
}

#[tokio::test]
async fn double_submit_is_rejected_and_preserves_the_first_grade() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    let service = harness.attempt_service();

    let started = service.start_attempt("quiz-1", "learner").await.unwrap();
    let all_correct = SubmitAttemptRequest {
        quiz_id: None,
        answers: answers(&[("q1", 0), ("q2", 1), ("q3", 2)]),
    };
    let all_wrong = SubmitAttemptRequest {
        quiz_id: None,
        answers: answers(&[("q1", 3), ("q2", 3), ("q3", 3)]),
    };

    service
        .submit_attempt(&started.attempt_id, all_correct)
        .await
        .unwrap();

    let err = service
        .submit_attempt(&started.attempt_id, all_wrong)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadySubmitted(_)));

    let stored = harness
        .attempts
        .find_by_id(&started.attempt_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.score, 100.0);
}

#[tokio::test]
async fn submit_on_unknown_attempt_is_not_found() {
    let harness = Harness::new();
    let service = harness.attempt_service();

    let err = service
        .submit_attempt(
            "no-such-attempt",
            SubmitAttemptRequest {
                quiz_id: None,
                answers: Vec::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn validation_failures_leave_the_attempt_in_progress() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    let service = harness.attempt_service();

    let started = service.start_attempt("quiz-1", "learner").await.unwrap();

    // Foreign question id.
    let err = service
        .submit_attempt(
            &started.attempt_id,
            SubmitAttemptRequest {
                quiz_id: None,
                answers: answers(&[("not-a-question", 0)]),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    // Option index out of range.
    let err = service
        .submit_attempt(
            &started.attempt_id,
            SubmitAttemptRequest {
                quiz_id: None,
                answers: answers(&[("q1", 9)]),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    // Mismatched quiz id cross-check.
    let err = service
        .submit_attempt(
            &started.attempt_id,
            SubmitAttemptRequest {
                quiz_id: Some("some-other-quiz".to_string()),
                answers: answers(&[("q1", 0)]),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let stored = harness
        .attempts
        .find_by_id(&started.attempt_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, AttemptStatus::InProgress);
}

// ---------------------------------------------------------------------------
// Expiry sweep and the submit/sweep race
// ---------------------------------------------------------------------------

async fn create_expired_attempt(harness: &Harness, quiz_id: &str, user_id: &str) -> String {
    let mut attempt = QuizAttempt::start(quiz_id, user_id);
    // 10 minute limit + 30s grace, comfortably exceeded.
    attempt.started_at = Utc::now() - Duration::minutes(12);
    let id = attempt.id.clone();
    harness.attempts.create(attempt).await.unwrap();
    id
}

#[tokio::test]
async fn sweep_force_completes_expired_attempts() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    let attempt_id = create_expired_attempt(&harness, "quiz-1", "learner").await;

    let expired = harness.auto_fail_service().sweep_once().await;
    assert_eq!(expired, 1);

    let stored = harness
        .attempts
        .find_by_id(&attempt_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, AttemptStatus::Completed);
    assert_eq!(stored.score, 0.0);
    assert!(!stored.passed);
    assert!(stored.answers.is_empty());
    assert!(stored.completed_at.is_some());
}

#[tokio::test]
async fn sweep_leaves_fresh_attempts_alone() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    let service = harness.attempt_service();
    let started = service.start_attempt("quiz-1", "learner").await.unwrap();

    let expired = harness.auto_fail_service().sweep_once().await;
    assert_eq!(expired, 0);

    let stored = harness
        .attempts
        .find_by_id(&started.attempt_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, AttemptStatus::InProgress);
}

#[tokio::test]
async fn submit_after_losing_the_race_to_the_sweep_is_rejected() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    let attempt_id = create_expired_attempt(&harness, "quiz-1", "learner").await;

    assert_eq!(harness.auto_fail_service().sweep_once().await, 1);

    let service = harness.attempt_service();
    let err = service
        .submit_attempt(
            &attempt_id,
            SubmitAttemptRequest {
                quiz_id: None,
                answers: answers(&[("q1", 0), ("q2", 1), ("q3", 2)]),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadySubmitted(_)));

    // The zero-score force-completion stands.
    let stored = harness
        .attempts
        .find_by_id(&attempt_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.score, 0.0);
}

#[tokio::test]
async fn sweep_skips_attempts_that_were_submitted_first() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    let attempt_id = create_expired_attempt(&harness, "quiz-1", "learner").await;

    let service = harness.attempt_service();
    let review = service
        .submit_attempt(
            &attempt_id,
            SubmitAttemptRequest {
                quiz_id: None,
                answers: answers(&[("q1", 0), ("q2", 1), ("q3", 2)]),
            },
        )
        .await
        .unwrap();
    assert_eq!(review.score, 100.0);

    let expired = harness.auto_fail_service().sweep_once().await;
    assert_eq!(expired, 0);

    let stored = harness
        .attempts
        .find_by_id(&attempt_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.score, 100.0);
    assert!(stored.passed);
}

#[tokio::test]
async fn auto_fail_service_stop_is_idempotent() {
    let harness = Harness::new();
    let service = harness.auto_fail_service();

    service.start().await;
    service.stop().await;
    // Second stop must be a no-op, not a hang or a panic.
    service.stop().await;
}

// ---------------------------------------------------------------------------
// AI feedback and course recommendations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn feedback_failure_degrades_to_error_signal() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;

    let mut backend = MockFeedbackBackend::new();
    backend
        .expect_grade_with_feedback()
        .returning(|_, _| Err(AppError::InternalError("upstream timeout".to_string())));
    let backend: Arc<dyn FeedbackProvider> = Arc::new(backend);

    let service = harness.attempt_service_with(Some(backend), None);
    let started = service.start_attempt("quiz-1", "learner").await.unwrap();
    let review = service
        .submit_attempt(
            &started.attempt_id,
            SubmitAttemptRequest {
                quiz_id: None,
                answers: answers(&[("q1", 0), ("q2", 1), ("q3", 2)]),
            },
        )
        .await
        .unwrap();

    // The submission itself succeeds; the feedback carries the error signal.
    assert_eq!(review.score, 100.0);
    let feedback = review.ai_feedback.unwrap();
    assert_eq!(feedback.signal, "error");
    assert!(review.recommended_courses.is_empty());
}

#[tokio::test]
async fn feedback_explanations_attach_to_incorrect_answers_only() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;

    let mut backend = MockFeedbackBackend::new();
    backend.expect_grade_with_feedback().returning(|_, _| {
        Ok(QuizFeedback {
            signal: "warning".to_string(),
            feedback_message: "One gap to close".to_string(),
            detailed_explanations: vec![QuestionExplanation {
                question_order: 2,
                explanation: "B was correct because of the second clause".to_string(),
            }],
            recommended_course_ids: vec![7, 99],
        })
    });
    let backend: Arc<dyn FeedbackProvider> = Arc::new(backend);
    let catalog: Arc<dyn CourseCatalog> = Arc::new(StubCourseCatalog {
        courses: vec![Course {
            id: 7,
            name: "Intro to rust".to_string(),
            description: "Basics".to_string(),
            pic_url: String::new(),
            lesson_count: 12,
        }],
    });

    let service = harness.attempt_service_with(Some(backend), Some(catalog));
    let started = service.start_attempt("quiz-1", "learner").await.unwrap();
    // q2 wrong, q1 and q3 right.
    let review = service
        .submit_attempt(
            &started.attempt_id,
            SubmitAttemptRequest {
                quiz_id: None,
                answers: answers(&[("q1", 0), ("q2", 3), ("q3", 2)]),
            },
        )
        .await
        .unwrap();

    let wrong = review
        .question_reviews
        .iter()
        .find(|r| r.order == 2)
        .unwrap();
    assert!(!wrong.is_correct);
    assert_eq!(
        wrong.explanation.as_deref(),
        Some("B was correct because of the second clause")
    );

    let right = review
        .question_reviews
        .iter()
        .find(|r| r.order == 1)
        .unwrap();
    assert!(right.is_correct);
    // Correct answers keep the question's own explanation.
    assert_eq!(right.explanation.as_deref(), Some("Option 0 is right"));

    // Only the catalog-resolvable course id survives.
    assert_eq!(review.recommended_courses.len(), 1);
    assert_eq!(review.recommended_courses[0].id, 7);
}

#[tokio::test]
async fn attempted_preview_replays_the_best_stored_result() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    let service = harness.attempt_service();

    let fresh = service
        .attempted_quiz_preview("quiz-1", "learner")
        .await
        .unwrap();
    assert!(!fresh.has_been_attempted);
    assert!(fresh.best_attempt.is_none());

    for selections in [
        answers(&[("q1", 0), ("q2", 3), ("q3", 3)]),
        answers(&[("q1", 0), ("q2", 1), ("q3", 2)]),
    ] {
        let started = service.start_attempt("quiz-1", "learner").await.unwrap();
        service
            .submit_attempt(
                &started.attempt_id,
                SubmitAttemptRequest {
                    quiz_id: None,
                    answers: selections,
                },
            )
            .await
            .unwrap();
    }

    let preview = service
        .attempted_quiz_preview("quiz-1", "learner")
        .await
        .unwrap();
    assert!(preview.has_been_attempted);
    let best = preview.best_attempt.unwrap();
    assert_eq!(best.score, 100.0);
    assert!(best.passed);
}

// ---------------------------------------------------------------------------
// Dashboard ranking, filtering and pagination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn best_attempt_tie_on_score_goes_to_the_later_completion() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;

    let base = Utc::now() - Duration::hours(3);
    for (id, score, offset_minutes) in [("a-low", 40.0, 0), ("a-early", 90.0, 30), ("a-late", 90.0, 60)]
    {
        harness
            .attempts
            .create(completed_attempt(
                id,
                "quiz-1",
                "learner",
                score,
                true,
                base + Duration::minutes(offset_minutes),
            ))
            .await
            .unwrap();
    }

    let (winners, total) = harness
        .attempts
        .find_best_attempts_paginated("learner", None, 1, 10, SortBy::Score, SortOrder::Desc)
        .await
        .unwrap();

    assert_eq!(total, 1);
    assert_eq!(winners[0].id, "a-late");
}

#[tokio::test]
async fn passed_pages_sum_to_the_total() {
    let harness = Harness::new();
    let base = Utc::now() - Duration::days(1);
    for i in 0..25 {
        let quiz_id = format!("quiz-{:02}", i);
        harness
            .quizzes
            .insert(published_quiz(&quiz_id, "author", "rust"))
            .await;
        harness
            .attempts
            .create(completed_attempt(
                &format!("attempt-{:02}", i),
                &quiz_id,
                "learner",
                80.0,
                true,
                base + Duration::minutes(i),
            ))
            .await
            .unwrap();
    }

    let dashboard = harness.dashboard_service();
    let mut seen = 0;
    for page in 1..=3 {
        let list = dashboard
            .passed_quizzes(
                "learner",
                FilterOptions {
                    page,
                    page_size: 10,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(list.pagination.total_items, 25);
        assert_eq!(list.pagination.total_pages, 3);
        seen += list.quizzes.len();
    }
    assert_eq!(seen, 25);
}

#[tokio::test]
async fn failed_view_only_shows_best_attempts_that_failed() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(published_quiz("quiz-pass", "author", "rust"))
        .await;
    harness
        .quizzes
        .insert(published_quiz("quiz-fail", "author", "go"))
        .await;

    let now = Utc::now();
    // quiz-pass: failed first, then passed; its best attempt passed.
    harness
        .attempts
        .create(completed_attempt("a1", "quiz-pass", "learner", 30.0, false, now - Duration::hours(2)))
        .await
        .unwrap();
    harness
        .attempts
        .create(completed_attempt("a2", "quiz-pass", "learner", 85.0, true, now - Duration::hours(1)))
        .await
        .unwrap();
    // quiz-fail: best attempt failed.
    harness
        .attempts
        .create(completed_attempt("a3", "quiz-fail", "learner", 45.0, false, now))
        .await
        .unwrap();

    let dashboard = harness.dashboard_service();
    let failed = dashboard
        .failed_quizzes("learner", FilterOptions::default())
        .await
        .unwrap();

    assert_eq!(failed.pagination.total_items, 1);
    assert_eq!(failed.quizzes[0].id, "quiz-fail");

    let passed = dashboard
        .passed_quizzes("learner", FilterOptions::default())
        .await
        .unwrap();
    assert_eq!(passed.pagination.total_items, 1);
    assert_eq!(passed.quizzes[0].id, "quiz-pass");
    assert_eq!(passed.quizzes[0].score, 85.0);
}

#[tokio::test]
async fn topic_filter_and_sort_use_the_in_memory_path() {
    let harness = Harness::new();
    let now = Utc::now();
    for (quiz_id, topic, offset) in [
        ("quiz-r", "rust", 0),
        ("quiz-g", "go", 1),
        ("quiz-z", "zig", 2),
    ] {
        harness
            .quizzes
            .insert(published_quiz(quiz_id, "author", topic))
            .await;
        harness
            .attempts
            .create(completed_attempt(
                &format!("attempt-{}", quiz_id),
                quiz_id,
                "learner",
                70.0,
                true,
                now + Duration::minutes(offset),
            ))
            .await
            .unwrap();
    }

    let dashboard = harness.dashboard_service();

    // Case-insensitive topic filter; totals reflect the filtered set.
    let filtered = dashboard
        .passed_quizzes(
            "learner",
            FilterOptions {
                topic: Some("RUST".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(filtered.pagination.total_items, 1);
    assert_eq!(filtered.quizzes[0].topic, "rust");

    // Topic sort ascending: go, rust, zig.
    let sorted = dashboard
        .passed_quizzes(
            "learner",
            FilterOptions {
                sort_by: Some(SortBy::Topic),
                sort_order: Some(SortOrder::Asc),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let topics: Vec<&str> = sorted.quizzes.iter().map(|q| q.topic.as_str()).collect();
    assert_eq!(topics, vec!["go", "rust", "zig"]);
}

#[tokio::test]
async fn drafts_view_excludes_quizzes_already_completed() {
    let harness = Harness::new();
    let now = Utc::now();
    harness
        .quizzes
        .insert(draft_quiz("draft-a", "learner", "rust", now - Duration::hours(2)))
        .await;
    harness
        .quizzes
        .insert(draft_quiz("draft-b", "learner", "go", now - Duration::hours(1)))
        .await;
    // Published quizzes never show up in the drafts view.
    harness
        .quizzes
        .insert(published_quiz("published-c", "learner", "zig"))
        .await;

    // draft-a has been taken to completion, so it drops out.
    harness
        .attempts
        .create(completed_attempt("a1", "draft-a", "learner", 50.0, false, now))
        .await
        .unwrap();

    let dashboard = harness.dashboard_service();
    let drafts = dashboard
        .draft_quizzes("learner", FilterOptions::default())
        .await
        .unwrap();

    assert_eq!(drafts.pagination.total_items, 1);
    assert_eq!(drafts.quizzes[0].id, "draft-b");
}

#[tokio::test]
async fn summary_is_all_zeros_with_no_attempts() {
    let harness = Harness::new();
    harness
        .quizzes
        .insert(draft_quiz("draft-a", "learner", "rust", Utc::now()))
        .await;

    let summary = harness
        .dashboard_service()
        .dashboard_summary("learner")
        .await
        .unwrap();

    assert_eq!(summary.total_quizzes, 0);
    assert_eq!(summary.average_score, 0.0);
    assert_eq!(summary.success_rate, 0.0);
    assert_eq!(summary.drafted_quizzes, 1);
}

#[tokio::test]
async fn summary_aggregates_best_attempts() {
    let harness = Harness::new();
    let now = Utc::now();
    harness
        .quizzes
        .insert(published_quiz("quiz-1", "author", "rust"))
        .await;
    harness
        .quizzes
        .insert(published_quiz("quiz-2", "author", "go"))
        .await;

    // quiz-1 best is the 90, not the 40.
    harness
        .attempts
        .create(completed_attempt("a1", "quiz-1", "learner", 40.0, false, now - Duration::hours(2)))
        .await
        .unwrap();
    harness
        .attempts
        .create(completed_attempt("a2", "quiz-1", "learner", 90.0, true, now - Duration::hours(1)))
        .await
        .unwrap();
    harness
        .attempts
        .create(completed_attempt("a3", "quiz-2", "learner", 50.0, false, now))
        .await
        .unwrap();

    let summary = harness
        .dashboard_service()
        .dashboard_summary("learner")
        .await
        .unwrap();

    assert_eq!(summary.total_quizzes, 2);
    assert!((summary.average_score - 70.0).abs() < f64::EPSILON);
    assert!((summary.success_rate - 50.0).abs() < f64::EPSILON);
    assert_eq!(summary.drafted_quizzes, 0);
}
