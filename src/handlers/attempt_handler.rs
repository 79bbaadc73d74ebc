use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState, auth::UserId, errors::AppError,
    models::dto::request::SubmitAttemptRequest,
};

#[get("/api/quizzes/{quiz_id}/preview")]
async fn preview_quiz(
    state: web::Data<AppState>,
    quiz_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let preview = state.attempt_service.preview_quiz(&quiz_id).await?;
    Ok(HttpResponse::Ok().json(preview))
}

#[get("/api/quizzes/{quiz_id}/attempted-preview")]
async fn attempted_quiz_preview(
    state: web::Data<AppState>,
    quiz_id: web::Path<String>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    let preview = state
        .attempt_service
        .attempted_quiz_preview(&quiz_id, &user.0)
        .await?;
    Ok(HttpResponse::Ok().json(preview))
}

#[post("/api/quizzes/{quiz_id}/attempts")]
async fn start_attempt(
    state: web::Data<AppState>,
    quiz_id: web::Path<String>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    let response = state.attempt_service.start_attempt(&quiz_id, &user.0).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/api/attempts/{id}/submit")]
async fn submit_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAttemptRequest>,
    _user: UserId,
) -> Result<HttpResponse, AppError> {
    let review = state
        .attempt_service
        .submit_attempt(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(review))
}
