use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_menu_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Username uniqueness is checked by the registration flow, the index only speeds up lookups
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Users::Name).string_len(100).not_null())
                        .col(ColumnDef::new(Users::Email).string_len(100).not_null())
                        .col(ColumnDef::new(Users::Username).string_len(30).not_null())
                        .col(ColumnDef::new(Users::Password).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Users::RegisterDate)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_username")
                        .table(Users::Table)
                        .col(Users::Username)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        Username,
        Password,
        RegisterDate,
    }
}

mod m20240101_000002_create_menu_tables {
    use crate::entities::MenuCategory;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_menu_tables"
        }
    }

    /// Every menu category lives in its own table with an identical layout
    fn menu_table(category: MenuCategory) -> TableCreateStatement {
        Table::create()
            .table(Alias::new(category.table_name()))
            .if_not_exists()
            .col(
                ColumnDef::new(MenuItem::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(MenuItem::Name).string_len(2000).not_null())
            .col(ColumnDef::new(MenuItem::Ingredients).text().not_null())
            .col(ColumnDef::new(MenuItem::Price).decimal_len(10, 2).not_null())
            .col(ColumnDef::new(MenuItem::Image).string_len(255).null())
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for category in MenuCategory::all() {
                manager.create_table(menu_table(category)).await?;
            }
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for category in MenuCategory::all() {
                manager
                    .drop_table(
                        Table::drop()
                            .table(Alias::new(category.table_name()))
                            .to_owned(),
                    )
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum MenuItem {
        Id,
        Name,
        Ingredients,
        Price,
        Image,
    }
}
