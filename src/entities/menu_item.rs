use rust_decimal::Decimal;
use sea_orm::{DeriveIden, FromQueryResult};
use serde::Serialize;

/// One row of any menu category table
#[derive(Clone, Debug, PartialEq, FromQueryResult, Serialize)]
pub struct MenuItem {
    pub id: i32,
    pub name: String,
    pub ingredients: String,
    pub price: Decimal,
    /// Filename inside the upload directory; may point at a file that no longer exists
    pub image: Option<String>,
}

/// Column names shared by every menu table
#[derive(DeriveIden, Clone, Copy)]
pub enum MenuItemIden {
    Id,
    Name,
    Ingredients,
    Price,
    Image,
}

/// Values written on insert or update
#[derive(Clone, Debug, PartialEq)]
pub struct NewMenuItem {
    pub name: String,
    pub ingredients: String,
    pub price: Decimal,
    pub image: Option<String>,
}
