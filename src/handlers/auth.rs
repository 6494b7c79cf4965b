//! Registration, login and logout.

use super::common::{redirect_to, PageResult};
use crate::{
    auth::session::{FlashLevel, Session},
    forms::{check, FormErrors, LoginForm, RegisterForm},
    services::{LoginOutcome, RegisterOutcome, Registration},
    AppState,
};
use axum::{extract::State, response::IntoResponse, Form};
use serde_json::json;
use tracing::info;

pub const USERNAME_TAKEN: &str = "That username already exists, please use another!";
pub const REGISTERED: &str = "You are now registered and can log in";
pub const USERNAME_NOT_FOUND: &str = "Username not found!";
pub const INVALID_LOGIN: &str = "Invalid Login!";
pub const LOGGED_OUT: &str = "You are now logged out";

async fn render_register(
    state: &AppState,
    session: &Session,
    form: &RegisterForm,
    errors: &FormErrors,
) -> PageResult {
    Ok(state
        .views
        .render("register", json!({ "form": form, "errors": errors }), session)
        .await?
        .into_response())
}

async fn render_login(
    state: &AppState,
    session: &Session,
    form: &LoginForm,
    error: Option<&str>,
) -> PageResult {
    Ok(state
        .views
        .render("login", json!({ "form": form, "error": error }), session)
        .await?
        .into_response())
}

pub async fn register_page(State(state): State<AppState>, session: Session) -> PageResult {
    render_register(&state, &session, &RegisterForm::default(), &FormErrors::default()).await
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> PageResult {
    if let Err(errors) = check(&form) {
        return render_register(&state, &session, &form, &errors).await;
    }

    let registration = Registration {
        name: form.name.clone(),
        email: form.email.clone(),
        username: form.username.clone(),
        password: form.password.clone(),
    };

    match state.accounts.register(registration).await? {
        RegisterOutcome::UsernameTaken => {
            session.flash(FlashLevel::Info, USERNAME_TAKEN).await;
            render_register(&state, &session, &form, &FormErrors::default()).await
        }
        RegisterOutcome::Registered(_) => {
            session.flash(FlashLevel::Success, REGISTERED).await;
            Ok(redirect_to("/login"))
        }
    }
}

pub async fn login_page(State(state): State<AppState>, session: Session) -> PageResult {
    render_login(&state, &session, &LoginForm::default(), None).await
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> PageResult {
    match state
        .accounts
        .authenticate(&form.username, &form.password)
        .await?
    {
        LoginOutcome::UnknownUser => {
            render_login(&state, &session, &form, Some(USERNAME_NOT_FOUND)).await
        }
        LoginOutcome::InvalidPassword => {
            render_login(&state, &session, &form, Some(INVALID_LOGIN)).await
        }
        LoginOutcome::Authenticated(user) => {
            session.log_in(&user.username).await;
            session
                .flash(
                    FlashLevel::Success,
                    format!("You are now logged in as {}", user.username),
                )
                .await;
            Ok(redirect_to("/dashboard"))
        }
    }
}

/// Always succeeds, with or without an active session
pub async fn logout(session: Session) -> PageResult {
    if let Some(username) = session.username().await {
        info!(%username, "logged out");
    }
    session.clear().await;
    session.flash(FlashLevel::Success, LOGGED_OUT).await;
    Ok(redirect_to("/login"))
}
