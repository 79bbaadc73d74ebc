pub mod attempt_service;
pub mod auto_fail_service;
pub mod dashboard_service;
pub mod feedback_service;
pub mod scoring;

pub use attempt_service::AttemptService;
pub use auto_fail_service::AutoFailService;
pub use dashboard_service::DashboardService;
pub use feedback_service::{FeedbackProvider, OpenAiFeedbackService, QuizFeedback};
