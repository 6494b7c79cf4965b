pub mod accounts;
pub mod images;
pub mod menu;

pub use accounts::{AccountService, LoginOutcome, RegisterOutcome, Registration};
pub use images::{ImageStore, InvalidFileName, StagedImages, Upload};
pub use menu::{MenuEdit, MenuService};
