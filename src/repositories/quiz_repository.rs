use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOptions, IndexOptions},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::AppResult,
    models::{
        domain::{Quiz, QuizStatus},
        dto::request::SortOrder,
    },
};

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;

    /// Batch lookup backing the dashboard metadata join.
    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Quiz>>;

    /// Page of a user's quizzes in any of the given statuses, sorted by
    /// quiz-native fields only.
    async fn list_by_user_and_statuses(
        &self,
        user_id: &str,
        statuses: &[QuizStatus],
        topic: Option<&str>,
        page: i64,
        page_size: i64,
        sort_order: SortOrder,
    ) -> AppResult<(Vec<Quiz>, i64)>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("quizzes");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

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
            .keys(doc! { "created_by_user_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_status".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_status_index).await?;

        Ok(())
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Quiz>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let quizzes = self
            .collection
            .find(doc! { "id": { "$in": ids } })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
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
        let status_names: Vec<&str> = statuses.iter().map(QuizStatus::as_str).collect();
        let mut filter = doc! {
            "created_by_user_id": user_id,
            "status": { "$in": status_names },
        };
        if let Some(topic) = topic {
            filter.insert("topic", topic);
        }

        let total = self.collection.count_documents(filter.clone()).await? as i64;

        let direction = match sort_order {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        };
        let find_options = FindOptions::builder()
            .sort(doc! { "created_at": direction })
            .skip(Some(((page - 1) * page_size).max(0) as u64))
            .limit(Some(page_size))
            .build();

        let quizzes = self
            .collection
            .find(filter)
            .with_options(find_options)
            .await?
            .try_collect()
            .await?;

        Ok((quizzes, total))
    }
}
