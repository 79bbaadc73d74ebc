use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        AttemptRepository, AttemptResultRepository, CourseCatalog, MongoAttemptRepository,
        MongoAttemptResultRepository, MongoQuizRepository, PgCourseRepository, QuizRepository,
    },
    services::{
        AttemptService, AutoFailService, DashboardService, FeedbackProvider, OpenAiFeedbackService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub attempt_service: Arc<AttemptService>,
    pub dashboard_service: Arc<DashboardService>,
    pub auto_fail_service: Arc<AutoFailService>,
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let attempt_repository = Arc::new(MongoAttemptRepository::new(&db));
        attempt_repository.ensure_indexes().await?;
        let attempt_repository: Arc<dyn AttemptRepository> = attempt_repository;

        let quiz_repository = Arc::new(MongoQuizRepository::new(&db));
        quiz_repository.ensure_indexes().await?;
        let quiz_repository: Arc<dyn QuizRepository> = quiz_repository;

        let result_repository = Arc::new(MongoAttemptResultRepository::new(&db));
        result_repository.ensure_indexes().await?;
        let result_repository: Arc<dyn AttemptResultRepository> = result_repository;

        let feedback_provider: Option<Arc<dyn FeedbackProvider>> =
            OpenAiFeedbackService::from_config(&config)
                .map(|service| Arc::new(service) as Arc<dyn FeedbackProvider>);
        if feedback_provider.is_none() {
            log::warn!("OPENAI_API_KEY not set; submissions will carry no AI feedback");
        }

        let course_catalog: Option<Arc<dyn CourseCatalog>> = match &config.content_db_url {
            Some(url) => match PgCourseRepository::connect(url).await {
                Ok(repository) => Some(Arc::new(repository) as Arc<dyn CourseCatalog>),
                Err(e) => {
                    log::warn!(
                        "Course catalog unavailable ({}); continuing without recommendations",
                        e
                    );
                    None
                }
            },
            None => None,
        };

        let attempt_service = Arc::new(AttemptService::new(
            attempt_repository.clone(),
            quiz_repository.clone(),
            result_repository,
            feedback_provider,
            course_catalog,
        ));
        let dashboard_service = Arc::new(DashboardService::new(
            attempt_repository.clone(),
            quiz_repository.clone(),
        ));
        let auto_fail_service = Arc::new(AutoFailService::new(attempt_repository, quiz_repository));

        Ok(Self {
            attempt_service,
            dashboard_service,
            auto_fail_service,
            db,
            config: Arc::new(config),
        })
    }
}
