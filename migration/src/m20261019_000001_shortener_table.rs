use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 shortener 表
        manager
            .create_table(
                Table::create()
                    .table(Shortener::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shortener::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Shortener::UserId).string().not_null())
                    .col(ColumnDef::new(Shortener::FullUrl).text().not_null())
                    .col(ColumnDef::new(Shortener::ShortUrlKey).string().not_null())
                    .col(
                        ColumnDef::new(Shortener::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // short_url_key 唯一索引，冲突检测依赖它
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("short_url_key_index")
                    .table(Shortener::Table)
                    .col(Shortener::ShortUrlKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 按用户列出链接
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shortener_user_id")
                    .table(Shortener::Table)
                    .col(Shortener::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_shortener_user_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("short_url_key_index").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Shortener::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Shortener {
    #[sea_orm(iden = "shortener")]
    Table,
    Id,
    UserId,
    FullUrl,
    ShortUrlKey,
    IsDeleted,
}
