//! Pages without data of their own.

use super::common::PageResult;
use crate::{auth::session::Session, AppState};
use axum::{extract::State, response::IntoResponse};
use serde_json::json;

pub async fn index(State(state): State<AppState>, session: Session) -> PageResult {
    Ok(state
        .views
        .render("index", json!({}), &session)
        .await?
        .into_response())
}

pub async fn charts(State(state): State<AppState>, session: Session) -> PageResult {
    Ok(state
        .views
        .render("charts", json!({}), &session)
        .await?
        .into_response())
}

pub async fn jumbotron(State(state): State<AppState>, session: Session) -> PageResult {
    Ok(state
        .views
        .render("jumbotron", json!({}), &session)
        .await?
        .into_response())
}

pub async fn dashboard(State(state): State<AppState>, session: Session) -> PageResult {
    Ok(state
        .views
        .render("dashboard", json!({}), &session)
        .await?
        .into_response())
}
