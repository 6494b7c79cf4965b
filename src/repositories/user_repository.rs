use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;

use crate::entities::user::{
    ActiveModel as UserActiveModel, Column, Entity as User, Model as UserModel,
};
use crate::errors::AppError;

use super::BaseRepository;

/// Fields of a new account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// Repository for user accounts
#[derive(Debug, Clone)]
pub struct UserRepository {
    base: BaseRepository,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a user by exact username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        let username = username.to_string();
        self.base
            .access()
            .execute("users.find_by_username", |db| async move {
                User::find()
                    .filter(Column::Username.eq(username))
                    .one(db)
                    .await
            })
            .await
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    /// Insert a new user
    pub async fn create(&self, user: NewUser) -> Result<UserModel, AppError> {
        let model = UserActiveModel {
            name: Set(user.name),
            email: Set(user.email),
            username: Set(user.username),
            password: Set(user.password_hash),
            register_date: Set(Utc::now()),
            ..Default::default()
        };
        self.base
            .access()
            .execute("users.create", |db| async move { model.insert(db).await })
            .await
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        use sea_orm::PaginatorTrait;
        self.base
            .access()
            .execute("users.count", |db| async move { User::find().count(db).await })
            .await
    }
}
