use actix_web::{get, web, HttpResponse};
use serde_json::json;

use crate::{app_state::AppState, errors::AppResult};

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    state.db.health_check().await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "healthy" })))
}
