use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{ApiError, AppState};
use crate::auth::{AuthError, RequestContext};

/// Name of the cookie carrying the session token.
pub const AUTH_COOKIE: &str = "authToken";

/// Authentication middleware
///
/// Accepts the session token from the `authToken` cookie or a Bearer
/// `Authorization` header and adds a [`RequestContext`] to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let token = token_from_cookie(request.headers()).or_else(|| bearer_token(request.headers()));
    let Some(token) = token else {
        tracing::warn!(path = %request.uri().path(), "Request without token");
        return ApiError::from(AuthError::MissingToken).into_response();
    };

    match state.users.tokens().validate(&token) {
        Ok(claims) => {
            let ctx = RequestContext::from_claims(&claims);
            tracing::debug!(
                trace_id = %ctx.trace_id,
                user_id = %ctx.user_id,
                "Authenticated request"
            );
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(path = %request.uri().path(), "Rejected token");
            ApiError::from(e).into_response()
        }
    }
}

fn token_from_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; authToken=abc.def.ghi; lang=en"),
        );

        assert_eq!(token_from_cookie(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_or_empty_cookie() {
        let mut headers = HeaderMap::new();
        assert!(token_from_cookie(&headers).is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("authToken="));
        assert!(token_from_cookie(&headers).is_none());
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(bearer_token(&headers).is_none());
    }
}
