use super::session::{FlashLevel, Session};
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_NOTICE: &str = "Unauthorized user, please Login";

/// Lets the request through only when the session is logged in; otherwise
/// redirects to the login page with a notice.
pub async fn require_login(request: Request, next: Next) -> Response {
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return crate::errors::ServiceError::InternalError(
            "login gate installed without a session layer".into(),
        )
        .into_response();
    };

    if session.is_logged_in().await {
        return next.run(request).await;
    }

    debug!(path = %request.uri().path(), "anonymous request redirected to login");
    session.flash(FlashLevel::Danger, UNAUTHORIZED_NOTICE).await;
    Redirect::to(LOGIN_PATH).into_response()
}

pub trait LoginRouterExt {
    /// Puts every route registered so far behind the login gate
    fn with_login(self) -> Self;
}

impl<S> LoginRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_login(self) -> Self {
        self.layer(axum::middleware::from_fn(require_login))
    }
}
