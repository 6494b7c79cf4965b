//! The fixed set of menu categories.
//!
//! Each category owns exactly one table. Table names used in dynamic SQL are
//! taken from here and nowhere else, so a request can only ever pick one of
//! these four.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MenuCategory {
    Appetizers,
    MainDishes,
    Desserts,
    Drinks,
}

impl MenuCategory {
    /// Backing table; also the form value of the category selector
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Appetizers => "appetizers",
            Self::MainDishes => "main_dishes",
            Self::Desserts => "desserts",
            Self::Drinks => "drinks",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Appetizers => "Appetizer",
            Self::MainDishes => "Main Dish",
            Self::Desserts => "Dessert",
            Self::Drinks => "Drinks",
        }
    }

    /// Listing page for the category. Desserts and drinks have none.
    pub fn listing_path(self) -> Option<&'static str> {
        match self {
            Self::Appetizers => Some("/appetizers"),
            Self::MainDishes => Some("/main_dishes"),
            Self::Desserts | Self::Drinks => None,
        }
    }

    pub fn all() -> Vec<MenuCategory> {
        Self::iter().collect()
    }
}
