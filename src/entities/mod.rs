pub mod menu_category;
pub mod menu_item;
pub mod user;

pub use menu_category::MenuCategory;
pub use menu_item::{MenuItem, MenuItemIden, NewMenuItem};
