use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use services::auth::{cookie, SessionRecord};
use tracing::{debug, error, info};

use crate::middleware::auth::session_cookie;
use crate::ProviderContext;

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// Initiate a login: redirect to the provider's authorization endpoint
pub async fn login(State(ctx): State<ProviderContext>) -> Result<Redirect, StatusCode> {
    let Some(client) = ctx.app.registry.get(ctx.provider) else {
        error!(provider = %ctx.provider, "provider missing from registry");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    let (auth_url, pending) = client.begin_login();
    // The pending login must be stored before the user leaves for the IdP
    ctx.app.pending.insert(pending).await;

    debug!(provider = %ctx.provider, "redirecting to identity provider");
    Ok(Redirect::to(auth_url.as_str()))
}

/// Handle the provider's authorization callback
///
/// Every failure funnels to the same `loginfail` page and leaves no session
/// behind; only a fully validated identity gets a record and a cookie.
pub async fn callback(
    State(ctx): State<ProviderContext>,
    Query(params): Query<CallbackQuery>,
) -> Response {
    let (Some(code), Some(state)) = (params.code, params.state) else {
        error!(provider = %ctx.provider, "callback missing code or state");
        return Redirect::to("loginfail").into_response();
    };

    // Consume-once lookup; an unknown or replayed state never proceeds
    let Some(pending) = ctx.app.pending.take(&state).await else {
        error!(provider = %ctx.provider, "no pending login for callback state");
        return Redirect::to("loginfail").into_response();
    };

    if pending.provider != ctx.provider {
        error!(provider = %ctx.provider, "pending login belongs to another provider");
        return Redirect::to("loginfail").into_response();
    }

    let Some(client) = ctx.app.registry.get(ctx.provider) else {
        error!(provider = %ctx.provider, "provider missing from registry");
        return Redirect::to("loginfail").into_response();
    };

    let identity = match client.complete_login(&code, &state, &pending).await {
        Ok(identity) => identity,
        Err(e) => {
            error!(provider = %ctx.provider, error = %e, "login failed");
            return Redirect::to("loginfail").into_response();
        }
    };

    let record = ctx.app.sessions.create(identity).await;
    info!(provider = %ctx.provider, subject = %record.identity.subject, "session created");

    let cookie_header = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        ctx.app.session.cookie_name,
        cookie::sign(&record.session_id, &ctx.app.session.cookie_secret),
        ctx.app.session.ttl_secs,
    );

    ([(SET_COOKIE, cookie_header)], Redirect::to("loginsuccess")).into_response()
}

/// Confirmation page shown after a successful login
pub async fn login_success(State(ctx): State<ProviderContext>, headers: HeaderMap) -> Html<String> {
    // Renders for whoever still holds a live session; with the short demo
    // TTL the greeting degrades to anonymous once the session expires
    let display_name = match session_record(&ctx, &headers).await {
        Some(record) => record
            .identity
            .display_name
            .unwrap_or(record.identity.subject),
        None => "unknown user".to_string(),
    };

    Html(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"UTF-8\"><title>login success.</title></head>\n\
         <body>Signed in with {} OIDC as {}. <a href=\"./\">Protected area</a></body>\n\
         </html>",
        ctx.provider.title(),
        display_name
    ))
}

/// Page shown when any step of the login flow fails
pub async fn login_fail(State(ctx): State<ProviderContext>) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"UTF-8\"><title>login failed.</title></head>\n\
         <body>Sign-in with {} failed. <a href=\"/\">Back to top</a></body>\n\
         </html>",
        ctx.provider.title()
    ))
}

/// Logout: destroy the server-side session and clear the cookie
pub async fn logout(State(ctx): State<ProviderContext>, headers: HeaderMap) -> Response {
    if let Some(record) = session_record(&ctx, &headers).await {
        ctx.app.sessions.destroy(&record.session_id).await;
        debug!(provider = %ctx.provider, "session destroyed");
    }

    let cookie_header = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        ctx.app.session.cookie_name
    );
    ([(SET_COOKIE, cookie_header)], Redirect::to("/")).into_response()
}

/// Look up the live session referenced by the request's cookie, if any
async fn session_record(ctx: &ProviderContext, headers: &HeaderMap) -> Option<SessionRecord> {
    let value = session_cookie(headers, &ctx.app.session.cookie_name)?;
    let session_id = cookie::verify(&value, &ctx.app.session.cookie_secret)?;
    ctx.app.sessions.get(&session_id).await.ok()
}

/// Index page with the provider login options
pub async fn index_page() -> Html<&'static str> {
    Html(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>OIDC login demo</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
        }
        .container {
            padding: 3rem;
            border: 1px solid #e2e8f0;
            border-radius: 12px;
            text-align: center;
            max-width: 400px;
            width: 100%;
        }
        h1 { color: #2d3748; margin-bottom: 0.5rem; }
        p { color: #718096; margin-bottom: 2rem; }
        .login-btn {
            display: block;
            padding: 0.75rem 1rem;
            margin: 0.75rem 0;
            border: 1px solid #e2e8f0;
            border-radius: 8px;
            color: #2d3748;
            text-decoration: none;
            font-weight: 500;
        }
        .login-btn:hover { background: #f7fafc; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Welcome</h1>
        <p>Sign in with one of the identity providers</p>

        <a href="/auth-gcp/login" class="login-btn">Continue with GCP</a>
        <a href="/auth-azure/login" class="login-btn">Continue with Azure</a>
        <a href="/auth-yahoo/login" class="login-btn">Continue with Yahoo</a>

    </div>
</body>
</html>"##,
    )
}
