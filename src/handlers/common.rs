use crate::{
    auth::session::Session,
    entities::MenuCategory,
    errors::ServiceError,
    AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

/// Result type of every page handler
pub type PageResult = Result<Response, ServiceError>;

/// 303 redirect, so a POST is followed by a GET
pub fn redirect_to(path: &str) -> Response {
    Redirect::to(path).into_response()
}

/// Path ids arrive as text; anything that is not a row id cannot exist
pub fn parse_id(raw: &str, category: MenuCategory) -> Result<i32, ServiceError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ServiceError::NotFound(format!("{} {} not found", category.label(), raw)))
}

/// Renders the page for routes that do not exist
pub async fn not_found(State(state): State<AppState>, session: Session) -> PageResult {
    let status = StatusCode::NOT_FOUND;
    state
        .views
        .render_with_status(
            status,
            "error",
            json!({
                "code": status.as_u16(),
                "reason": status.canonical_reason().unwrap_or("Not Found"),
                "message": "The page you are looking for does not exist.",
            }),
            &session,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_ids_are_not_found() {
        assert_eq!(parse_id(" 7 ", MenuCategory::Appetizers).unwrap(), 7);
        assert!(matches!(
            parse_id("seven", MenuCategory::MainDishes),
            Err(ServiceError::NotFound(_))
        ));
    }
}
