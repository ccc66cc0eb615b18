//! JWT token service

use std::sync::LazyLock;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use moka::sync::Cache;

use crate::model::{JwtPayload, TokenKind};

/// Cached token data containing the full payload
#[derive(Clone)]
struct CachedTokenData {
    claims: JwtPayload,
}

/// JWT Token cache to avoid repeated validation of the same token
static TOKEN_CACHE: LazyLock<Cache<String, CachedTokenData>> = LazyLock::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(300))
        .build()
});

/// Decode and validate JWT token with caching
pub fn decode_jwt_token_cached(
    token: &str,
    secret_key: &str,
) -> jsonwebtoken::errors::Result<jsonwebtoken::TokenData<JwtPayload>> {
    if let Some(cached) = TOKEN_CACHE.get(token) {
        let now = chrono::Utc::now().timestamp();
        if cached.claims.exp > now {
            return Ok(jsonwebtoken::TokenData {
                header: jsonwebtoken::Header::default(),
                claims: cached.claims,
            });
        }
        TOKEN_CACHE.invalidate(token);
    }

    let result = decode_jwt_token(token, secret_key)?;

    TOKEN_CACHE.insert(
        token.to_string(),
        CachedTokenData {
            claims: result.claims.clone(),
        },
    );

    Ok(result)
}

/// Decode and validate JWT token without caching
pub fn decode_jwt_token(
    token: &str,
    secret_key: &str,
) -> jsonwebtoken::errors::Result<jsonwebtoken::TokenData<JwtPayload>> {
    let decoding_key = DecodingKey::from_base64_secret(secret_key)?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<JwtPayload>(token, &decoding_key, &validation)
}

/// Invalidate a token from the cache, used on logout
pub fn invalidate_token(token: &str) {
    TOKEN_CACHE.invalidate(token);
}

/// Clear the entire token cache
pub fn clear_token_cache() {
    TOKEN_CACHE.invalidate_all();
}

/// Encode a JWT token
pub fn encode_jwt_token(
    sub: &str,
    kind: TokenKind,
    secret_key: &str,
    expire_seconds: i64,
) -> jsonwebtoken::errors::Result<String> {
    let exp = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::seconds(expire_seconds))
        .unwrap_or_else(chrono::Utc::now)
        .timestamp();

    let payload = JwtPayload {
        sub: sub.to_string(),
        exp,
        kind,
    };

    let header = Header::new(Algorithm::HS256);

    let encoding_key = EncodingKey::from_base64_secret(secret_key)?;
    encode(&header, &payload, &encoding_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "c3RvcmVmcm9udC10ZXN0LXNlY3JldC1rZXktMDEyMzQ1Njc4OQ==";

    #[test]
    fn test_encode_then_decode_keeps_kind() {
        let token = encode_jwt_token("jane", TokenKind::Staff, SECRET, 60).unwrap();
        let data = decode_jwt_token(&token, SECRET).unwrap();
        assert_eq!(data.claims.sub, "jane");
        assert_eq!(data.claims.kind, TokenKind::Staff);
    }
}
