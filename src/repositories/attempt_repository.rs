use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, to_bson, Document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::AppResult,
    models::{
        domain::{timestamps, Answer, AttemptStatus, QuizAttempt},
        dto::request::{SortBy, SortOrder},
    },
};

/// Terminal field set written by the single conditional status transition.
/// Both the submission path and the expiry sweep go through this; whichever
/// matches the `in_progress` precondition first wins.
#[derive(Clone, Debug)]
pub struct AttemptCompletion {
    pub completed_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
    pub score: f64,
    pub passed: bool,
    pub time_taken: i64,
    pub status: AttemptStatus,
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>>;

    /// All in-progress attempts across users and quizzes, for the expiry sweep.
    async fn find_in_progress(&self) -> AppResult<Vec<QuizAttempt>>;

    /// Atomic "update only if still in_progress" transition. Returns `false`
    /// when the precondition no longer holds, i.e. this caller lost the race.
    async fn complete_if_in_progress(
        &self,
        id: &str,
        completion: &AttemptCompletion,
    ) -> AppResult<bool>;

    /// Best completed attempt per quiz for a user: highest score, ties broken
    /// by later completion, then by attempt id. The `passed` filter applies
    /// to the winners, not to the candidate pool. Returns the page plus the
    /// store's total count for that filter.
    async fn find_best_attempts_paginated(
        &self,
        user_id: &str,
        passed: Option<bool>,
        page: i64,
        page_size: i64,
        sort_by: SortBy,
        sort_order: SortOrder,
    ) -> AppResult<(Vec<QuizAttempt>, i64)>;

    /// Quiz ids for which the user has at least one completed attempt.
    async fn find_completed_quiz_ids(&self, user_id: &str) -> AppResult<Vec<String>>;
}

pub struct MongoAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("attempts");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_status_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_status".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(IndexOptions::builder().name("status".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_status_index).await?;
        self.collection.create_index(status_index).await?;

        Ok(())
    }

    /// Pipeline stages shared by the page and count queries: group the user's
    /// completed attempts by quiz, reduce each group to its best attempt,
    /// then apply the pass/fail filter to the winners. The `completed_at`
    /// comparisons here are string comparisons; they are chronological only
    /// because of the fixed-width encoding in [`timestamps`].
    fn best_attempt_stages(user_id: &str, passed: Option<bool>) -> Vec<Document> {
        let this_is_better = doc! {
            "$or": [
                { "$gt": ["$$this.score", "$$value.score"] },
                { "$and": [
                    { "$eq": ["$$this.score", "$$value.score"] },
                    { "$or": [
                        { "$gt": ["$$this.completed_at", "$$value.completed_at"] },
                        { "$and": [
                            { "$eq": ["$$this.completed_at", "$$value.completed_at"] },
                            { "$gt": ["$$this.id", "$$value.id"] },
                        ]},
                    ]},
                ]},
            ]
        };

        let mut stages = vec![
            doc! { "$match": {
                "user_id": user_id,
                "status": AttemptStatus::Completed.as_str(),
            }},
            doc! { "$group": {
                "_id": "$quiz_id",
                "attempts": { "$push": "$$ROOT" },
            }},
            doc! { "$addFields": {
                "best_attempt": {
                    "$reduce": {
                        "input": "$attempts",
                        "initialValue": { "$arrayElemAt": ["$attempts", 0] },
                        "in": {
                            "$cond": {
                                "if": this_is_better,
                                "then": "$$this",
                                "else": "$$value",
                            }
                        },
                    }
                }
            }},
            doc! { "$replaceRoot": { "newRoot": "$best_attempt" } },
        ];

        if let Some(passed) = passed {
            stages.push(doc! { "$match": { "passed": passed } });
        }

        stages
    }

    fn sort_stage(sort_by: SortBy, sort_order: SortOrder) -> Document {
        let direction = match sort_order {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        };

        // Topic is not attempt-native; the query planner in the dashboard
        // service never pushes it down here.
        let key = match sort_by {
            SortBy::Score => "score",
            SortBy::CompletedAt | SortBy::Topic => "completed_at",
        };

        doc! { "$sort": { key: direction, "id": direction } }
    }
}

#[async_trait]
impl AttemptRepository for MongoAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        self.collection.insert_one(&attempt).await?;
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_in_progress(&self) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "status": AttemptStatus::InProgress.as_str() })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn complete_if_in_progress(
        &self,
        id: &str,
        completion: &AttemptCompletion,
    ) -> AppResult<bool> {
        let update = doc! {
            "$set": {
                "completed_at": timestamps::encode(&completion.completed_at),
                "answers": to_bson(&completion.answers)?,
                "score": completion.score,
                "passed": completion.passed,
                "time_taken": completion.time_taken,
                "status": completion.status.as_str(),
            }
        };

        let result = self
            .collection
            .update_one(
                doc! { "id": id, "status": AttemptStatus::InProgress.as_str() },
                update,
            )
            .await?;

        Ok(result.matched_count == 1)
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
        let mut count_pipeline = Self::best_attempt_stages(user_id, passed);
        count_pipeline.push(doc! { "$count": "total" });

        let mut total: i64 = 0;
        let mut count_cursor = self.collection.aggregate(count_pipeline).await?;
        if let Some(count_doc) = count_cursor.try_next().await? {
            total = count_doc
                .get_i32("total")
                .map(i64::from)
                .or_else(|_| count_doc.get_i64("total"))
                .unwrap_or(0);
        }

        let mut pipeline = Self::best_attempt_stages(user_id, passed);
        pipeline.push(Self::sort_stage(sort_by, sort_order));
        pipeline.push(doc! { "$skip": (page - 1) * page_size });
        pipeline.push(doc! { "$limit": page_size });

        let mut cursor = self.collection.aggregate(pipeline).await?;
        let mut attempts = Vec::with_capacity(page_size.max(0) as usize);
        while let Some(document) = cursor.try_next().await? {
            attempts.push(from_document::<QuizAttempt>(document)?);
        }

        Ok((attempts, total))
    }

    async fn find_completed_quiz_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        let pipeline = vec![
            doc! { "$match": {
                "user_id": user_id,
                "status": AttemptStatus::Completed.as_str(),
            }},
            doc! { "$group": { "_id": "$quiz_id" } },
        ];

        let mut cursor = self.collection.aggregate(pipeline).await?;
        let mut quiz_ids = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            if let Ok(id) = document.get_str("_id") {
                quiz_ids.push(id.to_string());
            }
        }

        Ok(quiz_ids)
    }
}
