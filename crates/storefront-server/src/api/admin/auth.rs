//! Back-office sign-in and sign-out

use actix_web::{HttpRequest, HttpResponse, post, web};
use storefront_auth::model::{LoginToken, STAFF_TOKEN_EXPIRE_SECONDS, TokenKind};
use storefront_auth::service::{auth, staff};
use storefront_common::StorefrontError;

use crate::api::{Credentials, audit_staff};
use crate::error::AppError;
use crate::middleware::auth::extract_token;
use crate::model::{ApiResult, AppState};
use crate::{Secured, secured};

pub async fn login(
    data: web::Data<AppState>,
    credentials: web::Json<Credentials>,
) -> Result<HttpResponse, AppError> {
    let member =
        staff::authenticate(data.db(), &credentials.username, &credentials.password).await?;

    let access_token = auth::encode_jwt_token(
        &member.username,
        TokenKind::Staff,
        &data.configuration.token_secret_key(),
        STAFF_TOKEN_EXPIRE_SECONDS,
    )
    .map_err(|e| StorefrontError::InternalError(e.to_string()))?;

    audit_staff(&member.username, "logged in");

    Ok(ApiResult::http_success(LoginToken {
        access_token,
        token_ttl: STAFF_TOKEN_EXPIRE_SECONDS,
        username: member.username,
    }))
}

#[post("/logout")]
pub async fn logout(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let member = secured!(Secured::staff(&req, &data));

    staff::logout(data.db(), &member.username).await?;
    if let Some(token) = extract_token(req.headers(), req.uri().query()) {
        auth::invalidate_token(&token);
    }

    audit_staff(&member.username, "logged out");

    Ok(ApiResult::http_success(true))
}
