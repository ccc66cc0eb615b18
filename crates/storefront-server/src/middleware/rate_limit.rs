// Rate limiting middleware for the login endpoints
// Token bucket per client IP

use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        StatusCode,
        header::{HeaderName, HeaderValue},
    },
};
use dashmap::DashMap;
use serde::Serialize;

/// How often stale buckets are dropped
const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Rate limiter configuration
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Time window duration
    pub window_duration: Duration,
    /// Whether rate limiting is enabled
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_duration: Duration::from_secs(60),
            enabled: true,
        }
    }
}

struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
    max_tokens: u32,
    refill_interval: Duration,
}

impl TokenBucket {
    fn new(max_tokens: u32, refill_interval: Duration) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
            max_tokens,
            refill_interval,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_refill) >= self.refill_interval {
            self.tokens = self.max_tokens;
            self.last_refill = now;
        }
    }
}

/// Buckets shared by every worker
pub struct RateLimiterState {
    buckets: DashMap<String, TokenBucket>,
    config: RateLimitConfig,
}

impl RateLimiterState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    /// Returns whether the request may pass and the tokens left
    fn check_rate_limit(&self, key: &str) -> (bool, u32) {
        if !self.config.enabled {
            return (true, self.config.max_requests);
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| {
            TokenBucket::new(self.config.max_requests, self.config.window_duration)
        });

        let allowed = bucket.try_consume();
        (allowed, bucket.tokens)
    }

    pub fn cleanup(&self) {
        let now = Instant::now();
        self.buckets.retain(|_, bucket| {
            now.duration_since(bucket.last_refill) < self.config.window_duration * 2
        });
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }
}

/// Rate limiting middleware factory. Clones share the same buckets.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<RateLimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(RateLimiterState::new(config)),
        }
    }

    /// Periodically drop buckets that have not been used for two windows.
    pub fn start_cleanup_task(&self) -> tokio::task::JoinHandle<()> {
        let state = self.state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                state.cleanup();
                tracing::debug!(buckets = state.len(), "Rate limiter cleanup completed");
            }
        })
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            state: self.state.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    state: Arc<RateLimiterState>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitError {
    code: i32,
    message: String,
    retry_after: u64,
}

fn header_value(value: u32) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client_ip = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        let (allowed, remaining) = self.state.check_rate_limit(&client_ip);
        let max_requests = self.state.config.max_requests;

        if !allowed {
            let retry_after = self.state.config.window_duration.as_secs();
            tracing::warn!(client_ip = %client_ip, path = %req.path(), "Login rate limit exceeded");

            let response = HttpResponse::build(StatusCode::TOO_MANY_REQUESTS)
                .insert_header(("X-RateLimit-Limit", max_requests.to_string()))
                .insert_header(("X-RateLimit-Remaining", "0"))
                .insert_header(("Retry-After", retry_after.to_string()))
                .json(RateLimitError {
                    code: 429,
                    message: "Too many requests. Please try again later.".to_string(),
                    retry_after,
                });

            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;

            res.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                header_value(max_requests),
            );
            res.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                header_value(remaining),
            );

            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, test, web};

    use super::*;

    #[test]
    fn test_token_bucket() {
        let mut bucket = TokenBucket::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(bucket.try_consume());
        }
        assert!(!bucket.try_consume());
    }

    #[test]
    fn test_token_bucket_refills_after_window() {
        let mut bucket = TokenBucket::new(1, Duration::from_millis(0));
        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
    }

    #[test]
    fn test_rate_limiter_state() {
        let state = RateLimiterState::new(RateLimitConfig {
            max_requests: 3,
            window_duration: Duration::from_secs(60),
            enabled: true,
        });

        for _ in 0..3 {
            assert!(state.check_rate_limit("10.0.0.1").0);
        }
        assert_eq!(state.check_rate_limit("10.0.0.1"), (false, 0));
        assert!(state.check_rate_limit("10.0.0.2").0);
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let state = RateLimiterState::new(RateLimitConfig {
            max_requests: 1,
            window_duration: Duration::from_secs(60),
            enabled: false,
        });

        for _ in 0..10 {
            assert!(state.check_rate_limit("10.0.0.1").0);
        }
        assert_eq!(state.len(), 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_buckets() {
        let state = RateLimiterState::new(RateLimitConfig::default());
        state.check_rate_limit("10.0.0.1");
        state.cleanup();
        assert_eq!(state.len(), 1);
    }

    #[actix_web::test]
    async fn test_middleware_rejects_after_limit() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 2,
            window_duration: Duration::from_secs(60),
            enabled: true,
        });

        let app = test::init_service(
            App::new().service(
                web::resource("/login")
                    .wrap(limiter)
                    .route(web::post().to(HttpResponse::Ok)),
            ),
        )
        .await;

        for remaining in ["1", "0"] {
            let req = test::TestRequest::post().uri("/login").to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(res.headers().get("x-ratelimit-remaining").unwrap(), remaining);
        }

        let req = test::TestRequest::post().uri("/login").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get("retry-after").unwrap(), "60");
    }
}
