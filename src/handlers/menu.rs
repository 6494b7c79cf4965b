//! Menu listings, detail pages and the add/edit/delete flows.

use super::common::{parse_id, redirect_to, PageResult};
use crate::{
    auth::session::{FlashLevel, Session},
    entities::MenuCategory,
    errors::ServiceError,
    forms::{category_options, check, FormErrors, MenuEditForm, MenuForm, MultipartForm, FILE_FIELD},
    services::{images::StagedImages, ImageStore},
    AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde_json::json;

pub const NO_APPETIZERS: &str = "No Appetizers Found";
pub const NO_MAIN_DISHES: &str = "No Main Dishes are Found";
pub const APPETIZER_DELETED: &str = "Appetizer Deleted!";

async fn listing(
    state: &AppState,
    session: &Session,
    category: MenuCategory,
    empty_message: &str,
) -> PageResult {
    let items = state.menu.list(category).await?;
    let context = if items.is_empty() {
        json!({ "msg": empty_message })
    } else {
        json!({ "items": items })
    };
    Ok(state
        .views
        .render(category.table_name(), context, session)
        .await?
        .into_response())
}

async fn detail(
    state: &AppState,
    session: &Session,
    category: MenuCategory,
    template: &str,
    raw_id: &str,
) -> PageResult {
    let id = parse_id(raw_id, category)?;
    let item = state.menu.get(category, id).await?;
    Ok(state
        .views
        .render(template, json!({ "item": item }), session)
        .await?
        .into_response())
}

pub async fn appetizers(State(state): State<AppState>, session: Session) -> PageResult {
    listing(&state, &session, MenuCategory::Appetizers, NO_APPETIZERS).await
}

pub async fn main_dishes(State(state): State<AppState>, session: Session) -> PageResult {
    listing(&state, &session, MenuCategory::MainDishes, NO_MAIN_DISHES).await
}

pub async fn appetizer(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> PageResult {
    detail(&state, &session, MenuCategory::Appetizers, "appetizer", &id).await
}

pub async fn main_dish(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> PageResult {
    detail(&state, &session, MenuCategory::MainDishes, "main_dish", &id).await
}

/// Checks upload names; a bad one becomes an error on the file input
fn stage_uploads(form: &mut MultipartForm, errors: &mut FormErrors) -> StagedImages {
    match ImageStore::stage(std::mem::take(&mut form.files)) {
        Ok(staged) => staged,
        Err(e) => {
            errors.add(FILE_FIELD, e.to_string());
            StagedImages::default()
        }
    }
}

async fn render_add_menu(
    state: &AppState,
    session: &Session,
    form: &MenuForm,
    errors: &FormErrors,
) -> PageResult {
    Ok(state
        .views
        .render(
            "add_menu",
            json!({
                "form": form,
                "errors": errors,
                "categories": category_options(&form.menu_type),
            }),
            session,
        )
        .await?
        .into_response())
}

pub async fn add_menu_page(State(state): State<AppState>, session: Session) -> PageResult {
    render_add_menu(&state, &session, &MenuForm::default(), &FormErrors::default()).await
}

pub async fn add_menu(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> PageResult {
    let mut submitted = MultipartForm::read(multipart).await?;
    let form = MenuForm::from_fields(&submitted.fields);

    let mut errors = check(&form).err().unwrap_or_default();
    let staged = stage_uploads(&mut submitted, &mut errors);
    if !errors.is_empty() {
        return render_add_menu(&state, &session, &form, &errors).await;
    }

    let image = state.images.save(staged).await?;
    let (category, item) = form.parsed(image)?;
    let name = item.name.clone();
    state.menu.add(category, item).await?;

    session
        .flash(FlashLevel::Success, format!("{} is Added", name))
        .await;
    Ok(redirect_to(category.listing_path().unwrap_or("/dashboard")))
}

async fn render_edit(
    state: &AppState,
    session: &Session,
    template: &str,
    id: i32,
    form: &MenuEditForm,
    errors: &FormErrors,
) -> PageResult {
    Ok(state
        .views
        .render(
            template,
            json!({ "id": id, "form": form, "errors": errors }),
            session,
        )
        .await?
        .into_response())
}

async fn edit_page(
    state: &AppState,
    session: &Session,
    category: MenuCategory,
    template: &str,
    raw_id: &str,
) -> PageResult {
    let id = parse_id(raw_id, category)?;
    let item = state.menu.get(category, id).await?;
    render_edit(
        state,
        session,
        template,
        id,
        &MenuEditForm::from_item(&item),
        &FormErrors::default(),
    )
    .await
}

async fn edit_submit(
    state: &AppState,
    session: &Session,
    category: MenuCategory,
    template: &str,
    raw_id: &str,
    multipart: Multipart,
) -> PageResult {
    let id = parse_id(raw_id, category)?;
    let current = state.menu.get(category, id).await?;

    let mut submitted = MultipartForm::read(multipart).await?;
    let mut form = MenuEditForm::from_fields(&submitted.fields);
    form.image = current.image;

    let mut errors = check(&form).err().unwrap_or_default();
    let staged = stage_uploads(&mut submitted, &mut errors);
    if !errors.is_empty() {
        return render_edit(state, session, template, id, &form, &errors).await;
    }

    let image = state.images.save(staged).await?;
    let updated = state.menu.edit(category, id, form.parsed(image)?).await?;

    session
        .flash(FlashLevel::Success, format!("{} is Updated", updated.name))
        .await;
    let listing = category
        .listing_path()
        .ok_or_else(|| ServiceError::InternalError(format!("{} has no listing", category)))?;
    Ok(redirect_to(listing))
}

pub async fn edit_app_page(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> PageResult {
    edit_page(&state, &session, MenuCategory::Appetizers, "edit_app", &id).await
}

pub async fn edit_app(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    multipart: Multipart,
) -> PageResult {
    edit_submit(&state, &session, MenuCategory::Appetizers, "edit_app", &id, multipart).await
}

pub async fn edit_main_page(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> PageResult {
    edit_page(&state, &session, MenuCategory::MainDishes, "edit_main", &id).await
}

pub async fn edit_main(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    multipart: Multipart,
) -> PageResult {
    edit_submit(&state, &session, MenuCategory::MainDishes, "edit_main", &id, multipart).await
}

/// Appetizers only; main dishes cannot be deleted
pub async fn delete_app(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> PageResult {
    let id = parse_id(&id, MenuCategory::Appetizers)?;
    state.menu.delete(MenuCategory::Appetizers, id).await?;
    session.flash(FlashLevel::Success, APPETIZER_DELETED).await;
    Ok(redirect_to("/appetizers"))
}
