#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use foodcourt::{
    config::AppConfig,
    db,
    services::{RegisterOutcome, Registration},
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const STAFF_USERNAME: &str = "staff";
pub const STAFF_PASSWORD: &str = "staffpass1";

const BOUNDARY: &str = "----foodcourt-test-boundary";

/// Full application over an in-memory SQLite database and a throwaway upload directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let uploads = tempfile::tempdir().expect("create upload dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "kS9v2Lq8TzR4mW1pXc7bN3yH6dF0gJ5a".to_string(),
            "127.0.0.1".to_string(),
            5000,
            "test".to_string(),
        );
        // One connection, otherwise every pooled connection gets its own empty database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.upload_dir = uploads.path().join("img");
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg).expect("application state");
        let router = foodcourt::app_router(state.clone());

        Self {
            router,
            state,
            uploads,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.uploads.path().join("img")
    }

    pub fn upload_root(&self) -> &Path {
        self.uploads.path()
    }

    /// Creates an account directly through the service layer
    pub async fn create_user(&self, username: &str, password: &str) {
        let outcome = self
            .state
            .accounts
            .register(Registration {
                name: format!("{} name", username),
                email: format!("{}@example.com", username),
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
            .expect("register user");
        assert!(matches!(outcome, RegisterOutcome::Registered(_)));
    }

    /// Logs in through the HTTP form and returns the session cookie
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/login",
                &[("username", username), ("password", password)],
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login should redirect");
        session_cookie(&response).expect("login sets a session cookie")
    }

    /// Session cookie of a freshly created, logged-in staff member
    pub async fn staff_cookie(&self) -> String {
        self.create_user(STAFF_USERNAME, STAFF_PASSWORD).await;
        self.login(STAFF_USERNAME, STAFF_PASSWORD).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response {
        let body = serde_urlencoded::to_string(fields).expect("encode form");
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("request"))
            .await
    }

    /// Posts `multipart/form-data`; each file is `(filename, content)` in field `file`
    pub async fn post_multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &[u8])],
        cookie: Option<&str>,
    ) -> Response {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (filename, content) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("request"))
            .await
    }
}

/// `name=value` part of the session `Set-Cookie` header, if any
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("foodcourt_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Asserts a redirect to `path` and returns the response for further checks
pub fn assert_redirect(response: &Response, path: &str) {
    assert!(
        response.status().is_redirection(),
        "expected redirect to {}, got {}",
        path,
        response.status()
    );
    assert_eq!(location(response).as_deref(), Some(path));
}
