use crate::db::DatabaseAccess;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod menu_repository;
pub mod user_repository;

pub use menu_repository::MenuRepository;
pub use user_repository::UserRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    access: DatabaseAccess,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            access: DatabaseAccess::new(db),
        }
    }

    /// Timed, logged access to the pool
    pub fn access(&self) -> &DatabaseAccess {
        &self.access
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.access.get_pool()
    }
}
