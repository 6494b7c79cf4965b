pub mod auth;
pub mod common;
pub mod menu;
pub mod pages;

pub use common::{not_found, PageResult};
