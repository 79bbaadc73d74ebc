pub mod attempt_handler;
pub mod dashboard_handler;
pub mod health_handler;

use actix_web::web::ServiceConfig;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(health_handler::health_check)
        .service(attempt_handler::preview_quiz)
        .service(attempt_handler::attempted_quiz_preview)
        .service(attempt_handler::start_attempt)
        .service(attempt_handler::submit_attempt)
        .service(dashboard_handler::dashboard_summary)
        .service(dashboard_handler::passed_quizzes)
        .service(dashboard_handler::failed_quizzes)
        .service(dashboard_handler::draft_quizzes);
}
