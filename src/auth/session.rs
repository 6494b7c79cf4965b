//! Server-side sessions correlated by a signed cookie.
//!
//! Session state lives in process memory keyed by a random id. The browser
//! only ever holds `<id>.<hex hmac-sha256(id)>`; a cookie whose signature does
//! not verify, or whose id is unknown or idle for longer than the TTL, simply
//! starts a new empty session.

use crate::errors::ServiceError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use cookie::{Cookie, SameSite};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use sha2::Sha256;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

const SESSION_ID_LEN: usize = 32;

/// Bootstrap-style alert category of a flash notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

/// One-shot notice shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    pub logged_in: bool,
    pub username: Option<String>,
    pub flashes: Vec<Flash>,
}

#[derive(Debug)]
struct StoredSession {
    data: SessionData,
    last_seen: Instant,
}

#[derive(Debug, Default)]
struct SessionState {
    id: Option<String>,
    data: SessionData,
    changed: bool,
    cycle: bool,
    /// Came from the store rather than being started by this request
    loaded: bool,
}

/// Per-request handle to the caller's session.
///
/// Inserted into request extensions by [`session_middleware`]; handlers take
/// it as an extractor. Changes are written back once the handler returns.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    fn from_parts(id: Option<String>, data: SessionData) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                loaded: id.is_some(),
                id,
                data,
                changed: false,
                cycle: false,
            })),
        }
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.lock().await.data.logged_in
    }

    pub async fn username(&self) -> Option<String> {
        self.state.lock().await.data.username.clone()
    }

    /// Marks the session authenticated and issues a fresh id for it
    pub async fn log_in(&self, username: &str) {
        let mut state = self.state.lock().await;
        state.data.logged_in = true;
        state.data.username = Some(username.to_string());
        state.changed = true;
        state.cycle = true;
    }

    /// Drops every key, pending flashes included
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.data = SessionData::default();
        state.changed = true;
    }

    pub async fn flash(&self, level: FlashLevel, message: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.data.flashes.push(Flash {
            level,
            message: message.into(),
        });
        state.changed = true;
    }

    pub async fn take_flashes(&self) -> Vec<Flash> {
        let mut state = self.state.lock().await;
        if state.data.flashes.is_empty() {
            return Vec::new();
        }
        state.changed = true;
        std::mem::take(&mut state.data.flashes)
    }

    pub async fn data(&self) -> SessionData {
        self.state.lock().await.data.clone()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ServiceError::InternalError("session layer is not installed".into()))
    }
}

/// In-memory session storage plus the cookie signing key
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, StoredSession>>,
    mac: HmacSha256,
    cookie_name: String,
    ttl: Duration,
    secure: bool,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("cookie_name", &self.cookie_name)
            .field("ttl", &self.ttl)
            .field("secure", &self.secure)
            .field("active", &self.sessions.len())
            .finish()
    }
}

impl SessionStore {
    pub fn new(
        secret: &str,
        cookie_name: impl Into<String>,
        ttl: Duration,
        secure: bool,
    ) -> Result<Self, ServiceError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ServiceError::InternalError(format!("invalid session key: {}", e)))?;
        Ok(Self {
            sessions: Arc::new(DashMap::new()),
            mac,
            cookie_name: cookie_name.into(),
            ttl,
            secure,
        })
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            &config.session_secret,
            config.session_cookie_name.clone(),
            config.session_ttl(),
            config.secure_cookies(),
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn sign(&self, id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Cookie value for a session id
    pub fn signed_value(&self, id: &str) -> String {
        format!("{}.{}", id, self.sign(id))
    }

    /// Returns the session id if the signature checks out
    pub fn verify_value<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (id, signature) = value.split_once('.')?;
        if id.len() != SESSION_ID_LEN || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(id)
    }

    fn new_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect()
    }

    /// Resolves the request cookie into a session, starting a fresh one when needed
    pub fn load(&self, headers: &HeaderMap) -> Session {
        let Some(raw) = self.cookie_from_headers(headers) else {
            return Session::default();
        };
        let Some(id) = self.verify_value(&raw) else {
            warn!("rejected session cookie with a bad signature");
            return Session::default();
        };

        let now = Instant::now();
        let data = match self.sessions.get_mut(id) {
            Some(mut stored) if now.duration_since(stored.last_seen) <= self.ttl => {
                stored.last_seen = now;
                Some(stored.data.clone())
            }
            Some(_) => None,
            None => None,
        };

        match data {
            Some(data) => Session::from_parts(Some(id.to_string()), data),
            None => {
                self.sessions.remove(id);
                debug!("session cookie refers to an unknown or expired session");
                Session::default()
            }
        }
    }

    /// Writes a changed session back and returns the `Set-Cookie` value to emit
    pub async fn commit(&self, session: &Session) -> Option<String> {
        let mut state = session.state.lock().await;
        if !state.changed {
            // Browser expiry tracks activity, like the idle TTL on our side
            return match (&state.id, state.loaded) {
                (Some(id), true) => Some(self.cookie_header(id)),
                _ => None,
            };
        }

        if state.cycle {
            if let Some(old) = state.id.take() {
                self.sessions.remove(&old);
            }
        }
        let id = match &state.id {
            Some(id) => id.clone(),
            None => Self::new_id(),
        };

        self.sessions.insert(
            id.clone(),
            StoredSession {
                data: state.data.clone(),
                last_seen: Instant::now(),
            },
        );
        state.id = Some(id.clone());
        state.changed = false;
        state.cycle = false;
        state.loaded = true;

        Some(self.cookie_header(&id))
    }

    fn cookie_header(&self, id: &str) -> String {
        let max_age = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        Cookie::build((self.cookie_name.as_str(), self.signed_value(id)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(cookie::time::Duration::seconds(max_age))
            .build()
            .to_string()
    }

    fn cookie_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.cookie_name)
            .map(|cookie| cookie.value().to_string())
    }

    /// Removes sessions idle for longer than the TTL
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions
            .retain(|_, stored| now.duration_since(stored.last_seen) <= self.ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn spawn_purge_task(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = store.len(), "purged expired sessions");
                }
            }
        })
    }
}

/// Loads the session before the handler runs and persists it afterwards
pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = store.load(request.headers());
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if let Some(cookie) = store.commit(&session).await {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "could not encode session cookie"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    const SECRET: &str = "kS9v2Lq8TzR4mW1pXc7bN3yH6dF0gJ5a";

    fn store(ttl: Duration) -> SessionStore {
        SessionStore::new(SECRET, "foodcourt_session", ttl, false).unwrap()
    }

    fn cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn signed_values_verify_and_tampering_is_rejected() {
        let store = store(Duration::from_secs(60));
        let id = SessionStore::new_id();
        let value = store.signed_value(&id);
        assert_eq!(store.verify_value(&value), Some(id.as_str()));

        let mut forged = SessionStore::new_id();
        forged.push('.');
        forged.push_str(value.split_once('.').unwrap().1);
        assert_eq!(store.verify_value(&forged), None);
        assert_eq!(store.verify_value("garbage"), None);
    }

    #[test]
    fn other_secret_cannot_forge_cookies() {
        let ours = store(Duration::from_secs(60));
        let theirs =
            SessionStore::new("Zq1w2e3r4t5y6u7i8o9p0aSdFgHjKlXc", "foodcourt_session", Duration::from_secs(60), false)
                .unwrap();
        let value = theirs.signed_value(&SessionStore::new_id());
        assert_eq!(ours.verify_value(&value), None);
    }

    #[tokio::test]
    async fn unchanged_new_session_is_not_stored() {
        let store = store(Duration::from_secs(60));
        let session = store.load(&HeaderMap::new());
        assert!(!session.is_logged_in().await);
        assert!(store.commit(&session).await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn log_in_rotates_the_session_id() {
        let store = store(Duration::from_secs(60));
        let session = Session::default();
        session.flash(FlashLevel::Info, "hello").await;
        let first = store.commit(&session).await.unwrap();

        session.log_in("alice").await;
        let second = store.commit(&session).await.unwrap();

        assert_ne!(cookie_pair(&first), cookie_pair(&second));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn stored_session_cookie_is_reissued_on_every_visit() {
        let store = store(Duration::from_secs(60));
        let session = Session::default();
        session.log_in("alice").await;
        let issued = store.commit(&session).await.unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie_pair(&issued)).unwrap());
        let revisit = store.load(&headers);
        assert!(revisit.is_logged_in().await);

        let refreshed = store.commit(&revisit).await.expect("cookie refreshed");
        assert_eq!(cookie_pair(&refreshed), cookie_pair(&issued));
        assert!(refreshed.contains("Max-Age=60"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn cookie_attributes() {
        let plain = store(Duration::from_secs(90)).cookie_header(&SessionStore::new_id());
        assert!(plain.starts_with("foodcourt_session="));
        for attribute in ["HttpOnly", "SameSite=Lax", "Path=/", "Max-Age=90"] {
            assert!(plain.contains(attribute), "{} missing from {}", attribute, plain);
        }
        assert!(!plain.contains("Secure"));

        let secure = SessionStore::new(SECRET, "foodcourt_session", Duration::from_secs(90), true)
            .unwrap()
            .cookie_header(&SessionStore::new_id());
        assert!(secure.contains("Secure"));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let store = store(Duration::from_secs(60));
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; foodcourt_session=abc.def; lang=az"),
        );
        assert_eq!(store.cookie_from_headers(&headers).as_deref(), Some("abc.def"));
    }

    #[tokio::test]
    async fn expired_sessions_are_purged() {
        let store = store(Duration::ZERO);
        let session = Session::default();
        session.log_in("alice").await;
        store.commit(&session).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
    }

    async fn set_flash(session: Session) -> &'static str {
        session.flash(FlashLevel::Success, "saved").await;
        "ok"
    }

    async fn read_flash(session: Session) -> String {
        session
            .take_flashes()
            .await
            .into_iter()
            .map(|f| format!("{}:{}", f.level, f.message))
            .collect::<Vec<_>>()
            .join(",")
    }

    #[tokio::test]
    async fn flashes_survive_exactly_one_round_trip() {
        let store = store(Duration::from_secs(60));
        let app = Router::new()
            .route("/set", get(set_flash))
            .route("/read", get(read_flash))
            .layer(middleware::from_fn_with_state(store.clone(), session_middleware));

        let response = app
            .clone()
            .oneshot(axum::http::Request::get("/set").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = cookie_pair(&set_cookie);

        let read = |cookie: String| {
            let app = app.clone();
            async move {
                let response = app
                    .oneshot(
                        axum::http::Request::get("/read")
                            .header(header::COOKIE, cookie)
                            .body(Body::empty())
                            .unwrap(),
                    )
                    .await
                    .unwrap();
                let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap();
                String::from_utf8(body.to_vec()).unwrap()
            }
        };

        assert_eq!(read(cookie.clone()).await, "success:saved");
        assert_eq!(read(cookie).await, "");
    }
}
