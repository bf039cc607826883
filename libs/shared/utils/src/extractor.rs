use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequest, Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use http::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Resolves the bearer token into a [`User`] and stores it in request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if !request.headers().contains_key(AUTHORIZATION) {
        return Err(AppError::Auth("Missing authorization header".to_string()));
    }

    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(bearer.token(), &config.jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn extract_user<B>(request: &http::Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

/// The actor id as a registered account id. Tokens issued to not-yet-registered
/// destinations carry a phone number or email as subject and are rejected here.
pub fn actor_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Token subject is not a registered user".to_string()))
}

pub fn require_role(user: &User, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden(format!("{} role required", role)));
    }
    Ok(())
}

/// `Json<T>` whose rejections render as this service's error body.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}
