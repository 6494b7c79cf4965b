//! Server-side page rendering.
//!
//! Templates are compiled into the binary. Every page receives the pending
//! flash notices and the login state of the caller on top of its own context.

use crate::{auth::session::Session, errors::ServiceError};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::{handlebars_helper, Handlebars};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

const PARTIALS: &[(&str, &str)] = &[
    ("header", include_str!("../templates/partials/header.hbs")),
    ("navbar", include_str!("../templates/partials/navbar.hbs")),
    ("messages", include_str!("../templates/partials/messages.hbs")),
    ("footer", include_str!("../templates/partials/footer.hbs")),
    ("field_errors", include_str!("../templates/partials/field_errors.hbs")),
];

const PAGES: &[(&str, &str)] = &[
    ("index", include_str!("../templates/index.hbs")),
    ("charts", include_str!("../templates/charts.hbs")),
    ("appetizers", include_str!("../templates/appetizers.hbs")),
    ("appetizer", include_str!("../templates/appetizer.hbs")),
    ("main_dishes", include_str!("../templates/main_dishes.hbs")),
    ("main_dish", include_str!("../templates/main_dish.hbs")),
    ("register", include_str!("../templates/register.hbs")),
    ("login", include_str!("../templates/login.hbs")),
    ("jumbotron", include_str!("../templates/jumbotron.hbs")),
    ("dashboard", include_str!("../templates/dashboard.hbs")),
    ("add_menu", include_str!("../templates/add_menu.hbs")),
    ("edit_app", include_str!("../templates/edit_app.hbs")),
    ("edit_main", include_str!("../templates/edit_main.hbs")),
    ("error", include_str!("../templates/error.hbs")),
];

/// Percent-encodes `raw` for use as one URL path segment
pub fn encode_path_segment(raw: &str) -> Option<String> {
    let mut url = Url::parse("http://localhost/").ok()?;
    url.path_segments_mut().ok()?.clear().push(raw);
    Some(url.path().trim_start_matches('/').to_string())
}

// `{{path_segment image}}` for stored file names inside URLs
handlebars_helper!(path_segment: |raw: str| encode_path_segment(raw).unwrap_or_default());

#[derive(Clone)]
pub struct Views {
    registry: Arc<Handlebars<'static>>,
}

impl std::fmt::Debug for Views {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Views")
            .field("templates", &self.registry.get_templates().len())
            .finish()
    }
}

impl Views {
    pub fn new() -> Result<Self, ServiceError> {
        let mut registry = Handlebars::new();
        registry.set_dev_mode(false);
        registry.register_helper("path_segment", Box::new(path_segment));

        for (name, source) in PARTIALS {
            registry
                .register_partial(name, *source)
                .map_err(|e| ServiceError::InternalError(format!("partial {}: {}", name, e)))?;
        }
        for (name, source) in PAGES {
            registry
                .register_template_string(name, *source)
                .map_err(|e| ServiceError::InternalError(format!("template {}: {}", name, e)))?;
        }

        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    /// Renders a page without touching any session
    pub fn render_raw(&self, name: &str, context: &Value) -> Result<String, ServiceError> {
        Ok(self.registry.render(name, context)?)
    }

    /// Renders a page for the caller, consuming their pending flash notices
    pub async fn render(
        &self,
        name: &str,
        context: Value,
        session: &Session,
    ) -> Result<Html<String>, ServiceError> {
        let flashes = session.take_flashes().await;
        let flash_count = flashes.len();
        let data = session.data().await;

        let mut context = match context {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        context.insert("flashes".to_string(), json!(flashes));
        context.insert("logged_in".to_string(), json!(data.logged_in));
        context.insert("username".to_string(), json!(data.username));

        debug!(template = name, flashes = flash_count, "rendering page");
        Ok(Html(self.render_raw(name, &Value::Object(context))?))
    }

    /// Same as [`Views::render`] with an explicit status code
    pub async fn render_with_status(
        &self,
        status: StatusCode,
        name: &str,
        context: Value,
        session: &Session,
    ) -> Result<Response, ServiceError> {
        Ok((status, self.render(name, context, session).await?).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::FlashLevel;

    #[test]
    fn every_page_is_registered() {
        let views = Views::new().unwrap();
        for (name, _) in PAGES {
            assert!(views.has_template(name), "{} missing", name);
        }
    }

    #[tokio::test]
    async fn flashes_render_once_and_are_escaped() {
        let views = Views::new().unwrap();
        let session = Session::default();
        session
            .flash(FlashLevel::Success, "<b>Soup</b> is Added")
            .await;

        let first = views.render("index", json!({}), &session).await.unwrap().0;
        assert!(first.contains("&lt;b&gt;Soup&lt;/b&gt; is Added"));
        assert!(first.contains("alert-success"));

        let second = views.render("index", json!({}), &session).await.unwrap().0;
        assert!(!second.contains("is Added"));
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_path_segment("soup.jpg").as_deref(), Some("soup.jpg"));
        assert_eq!(
            encode_path_segment("soup #1.jpg").as_deref(),
            Some("soup%20%231.jpg")
        );
        assert_eq!(encode_path_segment("a?b.jpg").as_deref(), Some("a%3Fb.jpg"));
    }

    #[test]
    fn image_urls_use_encoded_names() {
        let views = Views::new().unwrap();
        let html = views
            .render_raw(
                "appetizer",
                &json!({ "item": { "id": 1, "name": "Soup", "ingredients": "lentils", "price": "5.50", "image": "soup #1.jpg" } }),
            )
            .unwrap();
        assert!(html.contains("src=\"/static/img/soup%20%231.jpg\""));
    }

    #[tokio::test]
    async fn navbar_follows_login_state() {
        let views = Views::new().unwrap();
        let session = Session::default();
        let anonymous = views.render("index", json!({}), &session).await.unwrap().0;
        assert!(anonymous.contains("href=\"/login\""));

        session.log_in("alice").await;
        let logged_in = views.render("index", json!({}), &session).await.unwrap().0;
        assert!(logged_in.contains("href=\"/logout\""));
        assert!(logged_in.contains("alice"));
    }
}
