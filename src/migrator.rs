use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_catalog_tables::Migration),
            Box::new(m20240115_000002_create_campaign_tables::Migration),
            Box::new(m20240115_000003_create_customer_tables::Migration),
            Box::new(m20240115_000004_create_order_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240115_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Books::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Books::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Books::Name).string().not_null())
                        .col(ColumnDef::new(Books::Author).string().not_null())
                        .col(ColumnDef::new(Books::Description).text().not_null())
                        .col(ColumnDef::new(Books::MainImageUrl).string().null())
                        .col(
                            ColumnDef::new(Books::Price)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Books::Discount)
                                .small_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Books::PurchaseCount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Books::Score)
                                .small_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Books::Released).date().not_null())
                        .col(ColumnDef::new(Books::Created).date().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_books_created")
                        .table(Books::Table)
                        .col(Books::Created)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Genres::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Genres::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Genres::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BookGenres::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BookGenres::BookId).uuid().not_null())
                        .col(ColumnDef::new(BookGenres::GenreId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(BookGenres::BookId)
                                .col(BookGenres::GenreId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(BookGenres::Table, BookGenres::BookId)
                                .to(Books::Table, Books::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(BookGenres::Table, BookGenres::GenreId)
                                .to(Genres::Table, Genres::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BookFiles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BookFiles::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BookFiles::BookId).uuid().not_null())
                        .col(ColumnDef::new(BookFiles::Format).string_len(10).not_null())
                        .col(ColumnDef::new(BookFiles::ObjectKey).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .from(BookFiles::Table, BookFiles::BookId)
                                .to(Books::Table, Books::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BookFiles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BookGenres::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Genres::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Books::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Books {
        Table,
        Id,
        Name,
        Author,
        Description,
        MainImageUrl,
        Price,
        Discount,
        PurchaseCount,
        Score,
        Released,
        Created,
    }

    #[derive(DeriveIden)]
    pub(super) enum Genres {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    enum BookGenres {
        Table,
        BookId,
        GenreId,
    }

    #[derive(DeriveIden)]
    enum BookFiles {
        Table,
        Id,
        BookId,
        Format,
        ObjectKey,
    }
}

mod m20240115_000002_create_campaign_tables {
    use sea_orm_migration::prelude::*;

    use super::m20240115_000001_create_catalog_tables::{Books, Genres};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000002_create_campaign_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Campaigns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Campaigns::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Campaigns::Name).string().not_null())
                        .col(
                            ColumnDef::new(Campaigns::TargetMode)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Campaigns::DiscountPercent)
                                .small_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Campaigns::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CampaignBooks::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CampaignBooks::CampaignId).uuid().not_null())
                        .col(ColumnDef::new(CampaignBooks::BookId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(CampaignBooks::CampaignId)
                                .col(CampaignBooks::BookId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(CampaignBooks::Table, CampaignBooks::CampaignId)
                                .to(Campaigns::Table, Campaigns::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(CampaignBooks::Table, CampaignBooks::BookId)
                                .to(Books::Table, Books::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CampaignGenres::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CampaignGenres::CampaignId).uuid().not_null())
                        .col(ColumnDef::new(CampaignGenres::GenreId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(CampaignGenres::CampaignId)
                                .col(CampaignGenres::GenreId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(CampaignGenres::Table, CampaignGenres::CampaignId)
                                .to(Campaigns::Table, Campaigns::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(CampaignGenres::Table, CampaignGenres::GenreId)
                                .to(Genres::Table, Genres::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CampaignGenres::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CampaignBooks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Campaigns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Campaigns {
        Table,
        Id,
        Name,
        TargetMode,
        DiscountPercent,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum CampaignBooks {
        Table,
        CampaignId,
        BookId,
    }

    #[derive(DeriveIden)]
    enum CampaignGenres {
        Table,
        CampaignId,
        GenreId,
    }
}

mod m20240115_000003_create_customer_tables {
    use sea_orm_migration::prelude::*;

    use super::m20240115_000001_create_catalog_tables::Books;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000003_create_customer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Customers::DisplayName).string().not_null())
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Favorites::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Favorites::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Favorites::BookId).uuid().not_null())
                        .col(
                            ColumnDef::new(Favorites::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(Favorites::CustomerId)
                                .col(Favorites::BookId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(Favorites::Table, Favorites::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(Favorites::Table, Favorites::BookId)
                                .to(Books::Table, Books::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Reviews::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Reviews::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Reviews::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Reviews::BookId).uuid().not_null())
                        .col(ColumnDef::new(Reviews::Comment).text().not_null())
                        .col(ColumnDef::new(Reviews::Score).small_integer().not_null())
                        .col(
                            ColumnDef::new(Reviews::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(Reviews::Table, Reviews::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(Reviews::Table, Reviews::BookId)
                                .to(Books::Table, Books::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_reviews_book")
                        .table(Reviews::Table)
                        .col(Reviews::BookId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reviews::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Favorites::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Customers {
        Table,
        Id,
        Email,
        DisplayName,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Favorites {
        Table,
        CustomerId,
        BookId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Reviews {
        Table,
        Id,
        CustomerId,
        BookId,
        Comment,
        Score,
        CreatedAt,
    }
}

mod m20240115_000004_create_order_tables {
    use sea_orm_migration::prelude::*;

    use super::m20240115_000001_create_catalog_tables::Books;
    use super::m20240115_000003_create_customer_tables::Customers;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000004_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(Orders::Amount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::PaymentId).string().null())
                        .col(
                            ColumnDef::new(Orders::Closed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Orders::ClosedAt).date().null())
                        .foreign_key(
                            ForeignKey::create()
                                .from(Orders::Table, Orders::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_customer_open")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .col(Orders::Closed)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::BookId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderItems::AddedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(OrderItems::OrderId)
                                .col(OrderItems::BookId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(OrderItems::Table, OrderItems::BookId)
                                .to(Books::Table, Books::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Purchases::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Purchases::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Purchases::BookId).uuid().not_null())
                        .col(
                            ColumnDef::new(Purchases::PurchasedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(Purchases::CustomerId)
                                .col(Purchases::BookId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(Purchases::Table, Purchases::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(Purchases::Table, Purchases::BookId)
                                .to(Books::Table, Books::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Purchases::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        CustomerId,
        Amount,
        PaymentId,
        Closed,
        ClosedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        OrderId,
        BookId,
        AddedAt,
    }

    #[derive(DeriveIden)]
    enum Purchases {
        Table,
        CustomerId,
        BookId,
        PurchasedAt,
    }
}
