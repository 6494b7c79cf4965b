//! Foodcourt
//!
//! Restaurant menu management: staff log in, browse the appetizers and main
//! dishes, and add, edit or delete menu items with their pictures.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod forms;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod repositories;
pub mod services;
pub mod tracing;
pub mod views;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::SystemTime};
use tower_http::{services::ServeDir, timeout::TimeoutLayer};

use crate::auth::{session_middleware, LoginRouterExt, SessionStore};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::services::{AccountService, ImageStore, MenuService};
use crate::views::Views;

/// Shared state handed to every handler
#[derive(Clone, Debug)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub views: Views,
    pub sessions: SessionStore,
    pub accounts: AccountService,
    pub menu: MenuService,
    pub images: ImageStore,
    pub started_at: SystemTime,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig) -> Result<Self, ServiceError> {
        let sessions = SessionStore::from_config(&config)?;
        Ok(Self {
            accounts: AccountService::new(db.clone()),
            menu: MenuService::new(db.clone()),
            images: ImageStore::new(config.upload_dir.clone()),
            views: Views::new()?,
            sessions,
            config: Arc::new(config),
            db,
            started_at: SystemTime::now(),
        })
    }
}

/// Pages reachable without logging in
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::pages::index))
        .route(
            "/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route("/logout", get(handlers::auth::logout))
        .route("/jumbotron", get(handlers::pages::jumbotron))
}

/// Everything behind the login gate
fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/charts", get(handlers::pages::charts))
        .route("/dashboard", get(handlers::pages::dashboard))
        .route("/appetizers", get(handlers::menu::appetizers))
        .route("/appetizer/:id", get(handlers::menu::appetizer))
        .route("/main_dishes", get(handlers::menu::main_dishes))
        .route("/main_dish/:id", get(handlers::menu::main_dish))
        .route(
            "/add_menu",
            get(handlers::menu::add_menu_page).post(handlers::menu::add_menu),
        )
        .route(
            "/edit_app/:id",
            get(handlers::menu::edit_app_page).post(handlers::menu::edit_app),
        )
        .route("/delete_app/:id", post(handlers::menu::delete_app))
        .route(
            "/edit_main/:id",
            get(handlers::menu::edit_main_page).post(handlers::menu::edit_main),
        )
        .with_login()
}

fn register_routes(requires_login: bool) -> Router<AppState> {
    let routes = Router::new().route(
        "/register",
        get(handlers::auth::register_page).post(handlers::auth::register),
    );
    if requires_login {
        routes.with_login()
    } else {
        routes
    }
}

/// `/static` assets, with uploaded pictures under `/static/img` wherever they are stored
fn static_routes(config: &AppConfig) -> Router<AppState> {
    let assets = Router::new()
        .nest_service("/img", ServeDir::new(&config.upload_dir))
        .fallback_service(ServeDir::new(&config.static_dir));
    Router::new().nest("/static", assets)
}

/// Builds the complete application router
pub fn app_router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .merge(public_routes())
        .merge(member_routes())
        .merge(register_routes(config.register_requires_login))
        .merge(health::health_routes())
        .merge(static_routes(&config))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(middleware::from_fn(
            middleware_helpers::security_headers_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
        .layer(middleware::from_fn(middleware_helpers::request_id_middleware))
        .with_state(state)
}
