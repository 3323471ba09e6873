//! Cookie → [`DashboardSession`] resolution.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::AppState;

pub const SESSION_COOKIE: &str = "mcp_dashboard_session";

/// Attach the caller's [`crate::dashboard::DashboardSession`] to the request
/// extensions, creating one (and setting the cookie) when needed.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let cookie_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let session = match cookie_id.as_deref().and_then(|id| state.sessions.get(id)) {
        Some(session) => session,
        None => {
            let store = state.sessions.clone();
            tokio::spawn(async move {
                store.reap_idle().await;
            });
            state.sessions.get_or_create(cookie_id.as_deref())
        }
    };
    let fresh = cookie_id.as_deref() != Some(session.id());

    req.extensions_mut().insert(session.clone());
    let response = next.run(req).await;

    if fresh {
        (jar.add(session_cookie(session.id())), response).into_response()
    } else {
        response
    }
}

fn session_cookie(id: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Jar change that makes the browser forget its session.
#[must_use]
pub fn forget(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
