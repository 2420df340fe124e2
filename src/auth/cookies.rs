use std::{convert::Infallible, time::Duration};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{InvalidHeaderValue, COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
};

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// The `refresh_token` cookie, if the request carried a non-empty one.
pub struct RefreshCookie(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for RefreshCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RefreshCookie(read_cookie(&parts.headers, REFRESH_COOKIE_NAME)))
    }
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    // Browsers may send several Cookie headers over HTTP/2.
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            if key.trim() == name {
                let val = val.trim().trim_matches('"');
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

/// Cross-site capable, so `SameSite=None` which browsers only accept with `Secure`.
pub fn refresh_cookie(token: &str, ttl: Duration) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE_NAME}={token}; Path=/; HttpOnly; Secure; SameSite=None; Max-Age={}",
        ttl.as_secs()
    ))
}

pub fn clear_refresh_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "refresh_token=; Path=/; HttpOnly; Secure; SameSite=None; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
    )
}
