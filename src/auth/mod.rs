use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::errors::AppError;

/// Identity extraction is an upstream concern (gateway-verified tokens); the
/// attempt engine only consumes the resolved user id, passed on every request
/// as the `X-User-Id` header.
pub struct UserId(pub String);

impl FromRequest for UserId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get("X-User-Id")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| UserId(value.to_string()))
            .ok_or_else(|| AppError::Unauthorized("Missing X-User-Id header".to_string()));

        ready(user_id)
    }
}
