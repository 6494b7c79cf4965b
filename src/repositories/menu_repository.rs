//! Menu items across the per-category tables.
//!
//! Table names come from [`MenuCategory::table_name`]; every value travels as a
//! bound parameter.

use sea_orm::{
    sea_query::{Alias, Expr, Order, Query},
    ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult,
};
use std::sync::Arc;

use crate::entities::{MenuCategory, MenuItem, MenuItemIden, NewMenuItem};
use crate::errors::AppError;
use crate::repositories::Repository;

use super::BaseRepository;

const PRICE_SCALE: u32 = 2;

#[derive(Debug, Clone)]
pub struct MenuRepository {
    base: BaseRepository,
}

fn table(category: MenuCategory) -> Alias {
    Alias::new(category.table_name())
}

fn normalize(mut item: MenuItem) -> MenuItem {
    item.price.rescale(PRICE_SCALE);
    item
}

impl MenuRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn backend(&self) -> DbBackend {
        self.base.get_db().get_database_backend()
    }

    /// All rows of a category, ordered by name
    pub async fn list(&self, category: MenuCategory) -> Result<Vec<MenuItem>, AppError> {
        let query = Query::select()
            .columns([
                MenuItemIden::Id,
                MenuItemIden::Name,
                MenuItemIden::Ingredients,
                MenuItemIden::Price,
                MenuItemIden::Image,
            ])
            .from(table(category))
            .order_by(MenuItemIden::Name, Order::Asc)
            .order_by(MenuItemIden::Id, Order::Asc)
            .to_owned();
        let stmt = self.backend().build(&query);

        let items = self
            .base
            .access()
            .execute("menu.list", |db| async move {
                MenuItem::find_by_statement(stmt).all(db).await
            })
            .await?;

        Ok(items.into_iter().map(normalize).collect())
    }

    pub async fn find_by_id(
        &self,
        category: MenuCategory,
        id: i32,
    ) -> Result<Option<MenuItem>, AppError> {
        let query = Query::select()
            .columns([
                MenuItemIden::Id,
                MenuItemIden::Name,
                MenuItemIden::Ingredients,
                MenuItemIden::Price,
                MenuItemIden::Image,
            ])
            .from(table(category))
            .and_where(Expr::col(MenuItemIden::Id).eq(id))
            .to_owned();
        let stmt = self.backend().build(&query);

        let item = self
            .base
            .access()
            .execute("menu.find_by_id", |db| async move {
                MenuItem::find_by_statement(stmt).one(db).await
            })
            .await?;

        Ok(item.map(normalize))
    }

    /// Inserts a row and returns its generated id
    pub async fn create(&self, category: MenuCategory, item: NewMenuItem) -> Result<i32, AppError> {
        let backend = self.backend();
        let mut insert = Query::insert();
        insert
            .into_table(table(category))
            .columns([
                MenuItemIden::Name,
                MenuItemIden::Ingredients,
                MenuItemIden::Price,
                MenuItemIden::Image,
            ])
            .values_panic([
                item.name.into(),
                item.ingredients.into(),
                item.price.into(),
                item.image.into(),
            ]);

        if backend == DbBackend::Postgres {
            insert.returning_col(MenuItemIden::Id);
            let stmt = backend.build(&insert);
            let row = self
                .base
                .access()
                .execute("menu.create", |db| async move { db.query_one(stmt).await })
                .await?;
            let id = row
                .map(|row| row.try_get::<i32>("", "id"))
                .transpose()?
                .ok_or_else(|| AppError::InternalError("insert returned no id".into()))?;
            return Ok(id);
        }

        let stmt = backend.build(&insert);
        let result = self
            .base
            .access()
            .execute("menu.create", |db| async move { db.execute(stmt).await })
            .await?;

        i32::try_from(result.last_insert_id())
            .map_err(|_| AppError::InternalError("generated id out of range".into()))
    }

    /// Overwrites every editable column; returns the number of rows touched
    pub async fn update(
        &self,
        category: MenuCategory,
        id: i32,
        item: NewMenuItem,
    ) -> Result<u64, AppError> {
        let query = Query::update()
            .table(table(category))
            .values([
                (MenuItemIden::Name, item.name.into()),
                (MenuItemIden::Ingredients, item.ingredients.into()),
                (MenuItemIden::Price, item.price.into()),
                (MenuItemIden::Image, item.image.into()),
            ])
            .and_where(Expr::col(MenuItemIden::Id).eq(id))
            .to_owned();
        let stmt = self.backend().build(&query);

        let result = self
            .base
            .access()
            .execute("menu.update", |db| async move { db.execute(stmt).await })
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes by id; a missing row is not an error
    pub async fn delete(&self, category: MenuCategory, id: i32) -> Result<u64, AppError> {
        let query = Query::delete()
            .from_table(table(category))
            .and_where(Expr::col(MenuItemIden::Id).eq(id))
            .to_owned();
        let stmt = self.backend().build(&query);

        let result = self
            .base
            .access()
            .execute("menu.delete", |db| async move { db.execute(stmt).await })
            .await?;

        Ok(result.rows_affected())
    }
}
