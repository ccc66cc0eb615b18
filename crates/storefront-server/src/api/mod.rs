//! HTTP handlers: the shop front under `/api` and the back office under
//! `/api/admin`

use actix_web::cookie::Cookie;
use actix_web::{HttpMessage, HttpRequest, HttpResponseBuilder, Scope, web};
use serde::Deserialize;
use storefront_auth::model::AuthContext;
use storefront_auth::service::customer;
use storefront_common::{AUDIT_TARGET, StorefrontError};
use storefront_core::service::cart::{GUEST_CART_COOKIE, GuestCart, parse_guest_cart};
use storefront_core::service::settings;
use storefront_persistence::entity::users;

use crate::error::AppError;
use crate::middleware::rate_limit::RateLimiter;
use crate::model::AppState;

pub mod admin;
pub mod front;

/// Every API route, admin scope first so `/api/admin` is not swallowed by
/// the front scope.
pub fn routes(login_limiter: RateLimiter) -> Scope {
    web::scope("/api")
        .service(admin::routes(login_limiter.clone()))
        .service(front::routes(login_limiter))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
}

impl PageParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct IdList {
    pub ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TermParam {
    pub term: String,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub fn auth_context(req: &HttpRequest) -> AuthContext {
    req.extensions()
        .get::<AuthContext>()
        .cloned()
        .unwrap_or_default()
}

/// Username of the signed-in customer. A token that does not decode is an
/// error; a missing one or a staff token means a guest.
pub fn customer_name(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let context = auth_context(req);
    if context.jwt_error.is_some() {
        return Err(StorefrontError::AuthError(context.jwt_error_string()).into());
    }
    Ok(context.customer().map(str::to_string))
}

/// The signed-in customer's row, or `AuthError` for guests.
pub async fn current_customer(
    req: &HttpRequest,
    data: &web::Data<AppState>,
) -> Result<users::Model, AppError> {
    let username = customer_name(req)?
        .ok_or_else(|| StorefrontError::AuthError("login required".to_string()))?;

    customer::find_by_username(data.db(), &username)
        .await?
        .ok_or_else(|| StorefrontError::AuthError("account no longer exists".to_string()).into())
}

/// Page size of back-office lists
pub async fn admin_page_size(data: &web::Data<AppState>) -> Result<u64, AppError> {
    Ok(settings::get_settings(data.db()).await?.elements_per_page)
}

/// Guest cart from the cookie, and whether the cookie was corrupt
pub fn guest_cart(req: &HttpRequest) -> (GuestCart, bool) {
    match req.cookie(GUEST_CART_COOKIE) {
        None => (GuestCart::new(), false),
        Some(cookie) => match parse_guest_cart(cookie.value()) {
            Some(cart) => (cart, false),
            None => {
                tracing::debug!(value = %cookie.value(), "Discarding corrupt guest cart cookie");
                (GuestCart::new(), true)
            }
        },
    }
}

pub fn guest_cart_cookie(value: String) -> Cookie<'static> {
    Cookie::build(GUEST_CART_COOKIE, value)
        .path("/")
        .http_only(true)
        .finish()
}

/// Expire the guest cart cookie on `builder`.
pub fn clear_guest_cart(builder: &mut HttpResponseBuilder) {
    let mut cookie = guest_cart_cookie(String::new());
    cookie.make_removal();
    builder.cookie(cookie);
}

/// Record a back-office action in the audit trail.
pub fn audit_staff(username: &str, message: &str) {
    tracing::info!(
        target: AUDIT_TARGET,
        user = %username,
        is_staff = true,
        "Staff {} {}",
        username,
        message
    );
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn test_page_params_default_to_first_page() {
        assert_eq!(PageParams::default().page(), 1);
        assert_eq!(PageParams { page: Some(0) }.page(), 1);
        assert_eq!(PageParams { page: Some(4) }.page(), 4);
    }

    #[test]
    fn test_guest_cart_from_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(GUEST_CART_COOKIE, r#"{"3":2}"#))
            .to_http_request();
        let (cart, corrupt) = guest_cart(&req);
        assert!(!corrupt);
        assert_eq!(cart.get(&3), Some(&2));

        let req = TestRequest::default()
            .cookie(Cookie::new(GUEST_CART_COOKIE, r#"{"3":-2}"#))
            .to_http_request();
        let (cart, corrupt) = guest_cart(&req);
        assert!(corrupt);
        assert!(cart.is_empty());

        let (cart, corrupt) = guest_cart(&TestRequest::default().to_http_request());
        assert!(!corrupt);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_customer_name_without_context() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(customer_name(&req).unwrap(), None);
    }
}
