use async_trait::async_trait;
use mongodb::{
    bson::doc,
    options::{FindOneOptions, IndexOptions},
    Collection, IndexModel,
};

use crate::{db::Database, errors::AppResult, models::domain::AttemptResult};

#[async_trait]
pub trait AttemptResultRepository: Send + Sync {
    /// Results are write-once; there is no update operation.
    async fn save(&self, result: AttemptResult) -> AppResult<AttemptResult>;

    /// Best stored result for a user on a quiz: score desc, then most recent
    /// completion.
    async fn find_best_by_quiz_and_user(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> AppResult<Option<AttemptResult>>;

    async fn has_user_attempted_quiz(&self, quiz_id: &str, user_id: &str) -> AppResult<bool>;
}

pub struct MongoAttemptResultRepository {
    collection: Collection<AttemptResult>,
}

impl MongoAttemptResultRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("attempt_results");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for attempt_results collection");

        let quiz_user_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1, "user_id": 1, "score": -1 })
            .options(
                IndexOptions::builder()
                    .name("quiz_user_score".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(quiz_user_index).await?;

        Ok(())
    }
}

#[async_trait]
impl AttemptResultRepository for MongoAttemptResultRepository {
    async fn save(&self, result: AttemptResult) -> AppResult<AttemptResult> {
        self.collection.insert_one(&result).await?;
        Ok(result)
    }

    async fn find_best_by_quiz_and_user(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> AppResult<Option<AttemptResult>> {
        let options = FindOneOptions::builder()
            .sort(doc! { "score": -1, "completed_at": -1 })
            .build();

        let result = self
            .collection
            .find_one(doc! { "quiz_id": quiz_id, "user_id": user_id })
            .with_options(options)
            .await?;

        Ok(result)
    }

    async fn has_user_attempted_quiz(&self, quiz_id: &str, user_id: &str) -> AppResult<bool> {
        let count = self
            .collection
            .count_documents(doc! { "quiz_id": quiz_id, "user_id": user_id })
            .await?;
        Ok(count > 0)
    }
}
