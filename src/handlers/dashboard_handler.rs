use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState, auth::UserId, errors::AppError, models::dto::request::FilterOptions,
};

#[get("/api/dashboard/summary")]
async fn dashboard_summary(
    state: web::Data<AppState>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    let summary = state.dashboard_service.dashboard_summary(&user.0).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/api/dashboard/passed")]
async fn passed_quizzes(
    state: web::Data<AppState>,
    user: UserId,
    options: web::Query<FilterOptions>,
) -> Result<HttpResponse, AppError> {
    let list = state
        .dashboard_service
        .passed_quizzes(&user.0, options.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(list))
}

#[get("/api/dashboard/failed")]
async fn failed_quizzes(
    state: web::Data<AppState>,
    user: UserId,
    options: web::Query<FilterOptions>,
) -> Result<HttpResponse, AppError> {
    let list = state
        .dashboard_service
        .failed_quizzes(&user.0, options.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(list))
}

#[get("/api/dashboard/drafts")]
async fn draft_quizzes(
    state: web::Data<AppState>,
    user: UserId,
    options: web::Query<FilterOptions>,
) -> Result<HttpResponse, AppError> {
    let list = state
        .dashboard_service
        .draft_quizzes(&user.0, options.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(list))
}
