use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Releases::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Releases::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(Releases::Channel)
              .string()
              .not_null()
              .default("production"),
          )
          .col(
            ColumnDef::new(Releases::Platform)
              .string()
              .not_null()
              .default("all"),
          )
          .col(ColumnDef::new(Releases::BundleVersion).string().not_null())
          .col(ColumnDef::new(Releases::FilePath).string().not_null())
          .col(ColumnDef::new(Releases::Checksum).string().null())
          .col(
            ColumnDef::new(Releases::Mandatory)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(Releases::Enabled)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(Releases::RolloutPercent)
              .integer()
              .not_null()
              .default(100),
          )
          .col(ColumnDef::new(Releases::NativeMinVersion).string().null())
          .col(ColumnDef::new(Releases::NativeMaxVersion).string().null())
          .col(ColumnDef::new(Releases::Metadata).json().not_null())
          .col(ColumnDef::new(Releases::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_releases_lookup")
          .table(Releases::Table)
          .col(Releases::Channel)
          .col(Releases::Platform)
          .col(Releases::Enabled)
          .col(Releases::CreatedAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Releases::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Releases {
  Table,
  Id,
  Channel,
  Platform,
  BundleVersion,
  FilePath,
  Checksum,
  Mandatory,
  Enabled,
  RolloutPercent,
  NativeMinVersion,
  NativeMaxVersion,
  Metadata,
  CreatedAt,
}
