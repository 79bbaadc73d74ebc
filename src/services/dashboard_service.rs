use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;

use crate::{
    errors::AppResult,
    models::{
        domain::{Quiz, QuizStatus},
        dto::{
            request::{FilterOptions, SortBy, SortOrder},
            response::{DashboardSummary, PaginationMetadata, QuizCard, QuizList},
        },
    },
    repositories::{AttemptRepository, QuizRepository},
};

/// Upper bound on candidates fetched when sorting or filtering needs the
/// quiz metadata join and pagination must happen in memory.
const JOIN_FETCH_CAP: i64 = 1000;

/// Ranking and pagination over a user's best attempts. Chooses between two
/// strategies per request: push the grouping, best-of reduction, filter,
/// sort and paging down to the store when every key is attempt-native, or
/// fetch a capped superset and join/sort/page in memory when the topic (a
/// quiz-level field) is involved. Callers see one interface either way.
pub struct DashboardService {
    attempt_repo: Arc<dyn AttemptRepository>,
    quiz_repo: Arc<dyn QuizRepository>,
}

impl DashboardService {
    pub fn new(attempt_repo: Arc<dyn AttemptRepository>, quiz_repo: Arc<dyn QuizRepository>) -> Self {
        Self {
            attempt_repo,
            quiz_repo,
        }
    }

    pub async fn passed_quizzes(&self, user_id: &str, options: FilterOptions) -> AppResult<QuizList> {
        self.best_attempt_cards(user_id, Some(true), options).await
    }

    pub async fn failed_quizzes(&self, user_id: &str, options: FilterOptions) -> AppResult<QuizList> {
        self.best_attempt_cards(user_id, Some(false), options).await
    }

    async fn best_attempt_cards(
        &self,
        user_id: &str,
        passed: Option<bool>,
        options: FilterOptions,
    ) -> AppResult<QuizList> {
        let options = options.normalized();

        // Topic lives on the quiz, not the attempt; any topic sort or filter
        // disables push-down paging.
        let needs_join = options.sort_by() == SortBy::Topic || options.topic.is_some();
        let (fetch_page, fetch_size) = if needs_join {
            (1, JOIN_FETCH_CAP)
        } else {
            (options.page, options.page_size)
        };

        let (attempts, store_total) = self
            .attempt_repo
            .find_best_attempts_paginated(
                user_id,
                passed,
                fetch_page,
                fetch_size,
                options.sort_by(),
                options.sort_order(),
            )
            .await?;

        let quiz_ids: Vec<String> = attempts.iter().map(|a| a.quiz_id.clone()).collect();
        let quizzes = self.quiz_repo.find_by_ids(&quiz_ids).await?;
        let quiz_map: HashMap<&str, &Quiz> =
            quizzes.iter().map(|q| (q.id.as_str(), q)).collect();

        let mut cards = Vec::with_capacity(attempts.len());
        for attempt in &attempts {
            let Some(quiz) = quiz_map.get(attempt.quiz_id.as_str()) else {
                // Quiz metadata is gone; nothing to show on the card.
                continue;
            };
            if let Some(topic) = &options.topic {
                if !quiz.topic.eq_ignore_ascii_case(topic) {
                    continue;
                }
            }
            let Some(completed_at) = attempt.completed_at else {
                continue;
            };

            cards.push(QuizCard {
                id: attempt.quiz_id.clone(),
                title: quiz.title.clone(),
                topic: quiz.topic.clone(),
                score: attempt.score,
                date_taken: completed_at,
                time_taken: attempt.time_taken,
            });
        }

        if needs_join && options.sort_by() == SortBy::Topic {
            let order = options.sort_order();
            cards.sort_by(|a, b| {
                let cmp = a.topic.to_lowercase().cmp(&b.topic.to_lowercase());
                match order {
                    SortOrder::Asc => cmp,
                    SortOrder::Desc => cmp.reverse(),
                }
            });
        }

        let (cards, total) = if needs_join {
            let total = cards.len() as i64;
            (
                Self::page_window(cards, options.page, options.page_size),
                total,
            )
        } else {
            (cards, store_total)
        };

        Ok(QuizList {
            quizzes: cards,
            pagination: PaginationMetadata::new(options.page, options.page_size, total),
        })
    }

    /// Draft quizzes the user owns and has never completed. Quiz-native
    /// sorting only; the attempted-set filter runs in memory, and paging
    /// happens after it so page totals stay consistent with what is shown.
    pub async fn draft_quizzes(&self, user_id: &str, options: FilterOptions) -> AppResult<QuizList> {
        let options = options.normalized();

        let (drafts, _) = self
            .quiz_repo
            .list_by_user_and_statuses(
                user_id,
                &QuizStatus::draft_statuses(),
                options.topic.as_deref(),
                1,
                JOIN_FETCH_CAP,
                options.sort_order(),
            )
            .await?;

        let attempted: HashSet<String> = self
            .attempt_repo
            .find_completed_quiz_ids(user_id)
            .await?
            .into_iter()
            .collect();

        let cards: Vec<QuizCard> = drafts
            .iter()
            .filter(|quiz| !attempted.contains(&quiz.id))
            .map(|quiz| QuizCard {
                id: quiz.id.clone(),
                title: quiz.title.clone(),
                topic: quiz.topic.clone(),
                score: 0.0,
                date_taken: quiz.created_at.unwrap_or_else(Utc::now),
                time_taken: 0,
            })
            .collect();

        let total = cards.len() as i64;
        let cards = Self::page_window(cards, options.page, options.page_size);

        Ok(QuizList {
            quizzes: cards,
            pagination: PaginationMetadata::new(options.page, options.page_size, total),
        })
    }

    /// Aggregates over all of the user's best attempts, unpaged and
    /// unfiltered.
    pub async fn dashboard_summary(&self, user_id: &str) -> AppResult<DashboardSummary> {
        let (best_attempts, _) = self
            .attempt_repo
            .find_best_attempts_paginated(
                user_id,
                None,
                1,
                JOIN_FETCH_CAP,
                SortBy::CompletedAt,
                SortOrder::Desc,
            )
            .await?;

        let total_quizzes = best_attempts.len();
        let passed_count = best_attempts.iter().filter(|a| a.passed).count();
        let total_score: f64 = best_attempts.iter().map(|a| a.score).sum();

        let average_score = if total_quizzes > 0 {
            total_score / total_quizzes as f64
        } else {
            0.0
        };
        let success_rate = if total_quizzes > 0 {
            100.0 * passed_count as f64 / total_quizzes as f64
        } else {
            0.0
        };

        let (drafts, _) = self
            .quiz_repo
            .list_by_user_and_statuses(
                user_id,
                &QuizStatus::draft_statuses(),
                None,
                1,
                JOIN_FETCH_CAP,
                SortOrder::Desc,
            )
            .await?;

        let attempted: HashSet<&str> = best_attempts.iter().map(|a| a.quiz_id.as_str()).collect();
        let drafted_quizzes = drafts
            .iter()
            .filter(|quiz| !attempted.contains(quiz.id.as_str()))
            .count();

        Ok(DashboardSummary {
            total_quizzes,
            average_score,
            success_rate,
            drafted_quizzes,
        })
    }

    fn page_window(cards: Vec<QuizCard>, page: i64, page_size: i64) -> Vec<QuizCard> {
        let start = ((page - 1) * page_size).max(0) as usize;
        if start >= cards.len() {
            return Vec::new();
        }
        let end = (start + page_size as usize).min(cards.len());
        cards[start..end].to_vec()
    }
}
