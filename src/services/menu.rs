use crate::{
    db::DbPool,
    entities::{MenuCategory, MenuItem, NewMenuItem},
    errors::ServiceError,
    repositories::MenuRepository,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

/// Replacement values for an existing item; `image: None` keeps the stored one
#[derive(Debug, Clone)]
pub struct MenuEdit {
    pub name: String,
    pub ingredients: String,
    pub price: Decimal,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MenuService {
    repo: MenuRepository,
}

impl MenuService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            repo: MenuRepository::new(db),
        }
    }

    pub async fn list(&self, category: MenuCategory) -> Result<Vec<MenuItem>, ServiceError> {
        self.repo.list(category).await
    }

    /// Fetches one item, `NotFound` when the id does not exist
    pub async fn get(&self, category: MenuCategory, id: i32) -> Result<MenuItem, ServiceError> {
        self.repo
            .find_by_id(category, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", category.label(), id)))
    }

    #[instrument(skip(self, item), fields(name = %item.name))]
    pub async fn add(&self, category: MenuCategory, item: NewMenuItem) -> Result<i32, ServiceError> {
        let id = self.repo.create(category, item).await?;
        info!(%category, id, "menu item added");
        Ok(id)
    }

    #[instrument(skip(self, edit), fields(name = %edit.name))]
    pub async fn edit(
        &self,
        category: MenuCategory,
        id: i32,
        edit: MenuEdit,
    ) -> Result<MenuItem, ServiceError> {
        let current = self.get(category, id).await?;
        let image = edit.image.or(current.image);

        let changes = NewMenuItem {
            name: edit.name,
            ingredients: edit.ingredients,
            price: edit.price,
            image,
        };
        // MySQL reports zero affected rows when nothing changed, so the count is not checked
        self.repo.update(category, id, changes).await?;
        info!(%category, id, "menu item updated");
        self.get(category, id).await
    }

    /// Unconditional delete; returns how many rows went away
    #[instrument(skip(self))]
    pub async fn delete(&self, category: MenuCategory, id: i32) -> Result<u64, ServiceError> {
        let removed = self.repo.delete(category, id).await?;
        info!(%category, id, removed, "menu item delete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn service() -> MenuService {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        MenuService::new(Arc::new(pool))
    }

    #[tokio::test]
    async fn edit_without_upload_keeps_image() {
        let menu = service().await;
        let id = menu
            .add(
                MenuCategory::MainDishes,
                NewMenuItem {
                    name: "Plov".into(),
                    ingredients: "rice, lamb, carrots".into(),
                    price: dec!(12.50),
                    image: Some("plov.jpg".into()),
                },
            )
            .await
            .unwrap();

        let edited = menu
            .edit(
                MenuCategory::MainDishes,
                id,
                MenuEdit {
                    name: "Shah Plov".into(),
                    ingredients: "rice, lamb, lavash, chestnuts".into(),
                    price: dec!(15.75),
                    image: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.name, "Shah Plov");
        assert_eq!(edited.price, dec!(15.75));
        assert_eq!(edited.image.as_deref(), Some("plov.jpg"));
    }

    #[tokio::test]
    async fn missing_items_are_not_found() {
        let menu = service().await;
        assert_matches!(
            menu.get(MenuCategory::Appetizers, 42).await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            menu.edit(
                MenuCategory::Appetizers,
                42,
                MenuEdit {
                    name: "x".into(),
                    ingredients: "0123456789".into(),
                    price: dec!(1.10),
                    image: None,
                },
            )
            .await,
            Err(ServiceError::NotFound(_))
        );
        assert_eq!(menu.delete(MenuCategory::Appetizers, 42).await.unwrap(), 0);
    }
}
