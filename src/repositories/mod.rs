pub mod attempt_repository;
pub mod attempt_result_repository;
pub mod course_repository;
pub mod quiz_repository;

pub use attempt_repository::{AttemptCompletion, AttemptRepository, MongoAttemptRepository};
pub use attempt_result_repository::{AttemptResultRepository, MongoAttemptResultRepository};
pub use course_repository::{CourseCatalog, PgCourseRepository};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};
