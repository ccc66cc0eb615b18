// Authentication middleware for Actix-web
// Decodes the request token and stores an AuthContext in the request extensions

use actix_service::forward_ready;
use actix_utils::future::{Ready, ok};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{Method, header::HeaderMap},
    web::Data,
};
use futures::future::LocalBoxFuture;
use storefront_auth::model::{AUTHORIZATION_HEADER, AuthContext, TOKEN_PREFIX};
use storefront_auth::service::auth;

use crate::model::AppState;

const ACCESS_TOKEN: &str = "accessToken";

// Authentication middleware transformer
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthenticationMiddleware { service })
    }
}

pub struct AuthenticationMiddleware<S> {
    service: S,
}

/// Token of a request, looked up in this order:
/// 1. `Authorization: Bearer <token>` header
/// 2. `accessToken` header
/// 3. `accessToken` query parameter
pub fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(header_val) = headers.get(AUTHORIZATION_HEADER)
        && let Ok(s) = header_val.to_str()
        && let Some(token) = s.trim().strip_prefix(TOKEN_PREFIX)
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    if let Some(header_val) = headers.get(ACCESS_TOKEN)
        && let Ok(s) = header_val.to_str()
    {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    if let Some(query) = query {
        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=')
                && key == ACCESS_TOKEN
                && !value.is_empty()
            {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Decode `token` into the context handlers and the `secured!` guard read.
pub fn auth_context(token: Option<String>, secret_key: &str) -> AuthContext {
    let mut auth_context = AuthContext::default();

    if let Some(token) = token {
        auth_context.token_provided = true;

        match auth::decode_jwt_token_cached(&token, secret_key) {
            Ok(token_data) => {
                auth_context.username = token_data.claims.sub;
                auth_context.kind = token_data.claims.kind;
            }
            Err(err) => {
                tracing::debug!(error = %err, "Rejected access token");
                auth_context.jwt_error = Some(err);
            }
        }
    }

    auth_context
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if Method::OPTIONS != *req.method() {
            let token = extract_token(req.headers(), req.uri().query());

            let context = match req.app_data::<Data<AppState>>() {
                Some(app_state) => {
                    auth_context(token, &app_state.configuration.token_secret_key())
                }
                None => {
                    tracing::error!("AppState not found in request app_data");
                    AuthContext::default()
                }
            };

            // Always present so handlers can tell guests from bad tokens
            req.extensions_mut().insert(context);
        }

        let res = self.service.call(req);

        Box::pin(async move { res.await.map(ServiceResponse::map_into_left_body) })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::header::{HeaderName, HeaderValue};
    use base64::Engine;
    use storefront_auth::model::TokenKind;

    use super::*;

    fn secret() -> String {
        base64::engine::general_purpose::STANDARD.encode("storefront-test-secret-key-0123456789")
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_extract_token_priority() {
        let map = headers(&[("authorization", "Bearer abc"), ("accesstoken", "def")]);
        assert_eq!(extract_token(&map, Some("accessToken=ghi")), Some("abc".to_string()));

        let map = headers(&[("accesstoken", "def")]);
        assert_eq!(extract_token(&map, Some("accessToken=ghi")), Some("def".to_string()));

        let map = HeaderMap::new();
        assert_eq!(
            extract_token(&map, Some("page=2&accessToken=ghi")),
            Some("ghi".to_string())
        );
        assert_eq!(extract_token(&map, Some("accessToken=")), None);
        assert_eq!(extract_token(&map, None), None);
    }

    #[test]
    fn test_extract_token_ignores_other_schemes() {
        let map = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_token(&map, None), None);
    }

    #[test]
    fn test_auth_context_from_token() {
        let secret = secret();
        let token = auth::encode_jwt_token("admin", TokenKind::Staff, &secret, 60).unwrap();

        let context = auth_context(Some(token), &secret);
        assert!(context.token_provided);
        assert_eq!(context.staff(), Some("admin"));
        assert_eq!(context.customer(), None);
    }

    #[test]
    fn test_auth_context_with_bad_token() {
        let context = auth_context(Some("not-a-jwt".to_string()), &secret());
        assert!(context.token_provided);
        assert!(context.jwt_error.is_some());
        assert_eq!(context.staff(), None);

        let context = auth_context(None, &secret());
        assert!(!context.token_provided);
    }
}
