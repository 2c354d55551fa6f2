use axum::{
    extract::{Request, State},
    http::{header::COOKIE, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use services::auth::{cookie, AuthError, ProviderKey, SessionRecord, SessionStore};
use std::sync::Arc;
use tracing::debug;

/// Session attached to the request once the gate allows it
#[derive(Clone)]
pub struct CurrentSession(pub SessionRecord);

/// State for one provider's access gate
#[derive(Clone)]
pub struct GateState {
    pub sessions: Arc<dyn SessionStore>,
    pub cookie_name: String,
    pub cookie_secret: String,
    pub provider: ProviderKey,
}

/// Access gate for provider-scoped protected content
///
/// The request passes only with a validly signed cookie referencing a live
/// session created by this router's own provider. A session from any other
/// provider is denied exactly like a missing one.
pub async fn provider_gate(
    State(state): State<GateState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, axum::Json<crate::models::ErrorResponse>)> {
    match authorize(&state, request.headers()).await {
        Ok(record) => {
            let mut request = request;
            request.extensions_mut().insert(CurrentSession(record));
            Ok(next.run(request).await)
        }
        Err(err) => {
            debug!(provider = %state.provider, error = %err, "denied access to protected content");
            Err((
                StatusCode::UNAUTHORIZED,
                axum::Json(crate::models::ErrorResponse::new(
                    "Please login to view this page.".to_string(),
                    "unauthorized".to_string(),
                )),
            ))
        }
    }
}

async fn authorize(state: &GateState, headers: &HeaderMap) -> Result<SessionRecord, AuthError> {
    let session_id = session_cookie(headers, &state.cookie_name)
        .and_then(|value| cookie::verify(&value, &state.cookie_secret))
        .ok_or(AuthError::SessionNotFound)?;

    let record = state.sessions.get(&session_id).await?;
    if record.provider != state.provider {
        return Err(AuthError::SessionProviderMismatch);
    }

    Ok(record)
}

/// Extract a cookie value from the request headers
pub(crate) fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_session_cookie_extraction() {
        let headers = headers_with_cookie("theme=dark; sid=token.sig; lang=ja");
        assert_eq!(
            session_cookie(&headers, "sid"),
            Some("token.sig".to_string())
        );
        assert_eq!(session_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_no_cookie_header_yields_none() {
        assert_eq!(session_cookie(&HeaderMap::new(), "sid"), None);
    }
}
