use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
}

const EMAIL_INDEX: &str = "idx_employees_email_unique";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Employees::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Employees::FirstName).string_len(128).not_null())
                    .col(ColumnDef::new(Employees::LastName).string_len(128).not_null())
                    .col(ColumnDef::new(Employees::Email).string_len(320).not_null())
                    .to_owned(),
            )
            .await?;

        // Closes the check-then-insert window left open by the service.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(EMAIL_INDEX)
                    .table(Employees::Table)
                    .col(Employees::Email)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The email index goes with the table.
        manager
            .drop_table(Table::drop().table(Employees::Table).if_exists().to_owned())
            .await
    }
}
