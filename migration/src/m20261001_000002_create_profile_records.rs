// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

use crate::m20261001_000001_create_scrape_jobs::ScrapeJobs;

/// 创建档案记录表
///
/// 每条记录归属于一个抓取作业，作业删除时级联删除。
/// `(job_id, profile_url)` 唯一，作为更新合并的自然键。
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProfileRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProfileRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProfileRecords::JobId).uuid().not_null())
                    .col(ColumnDef::new(ProfileRecords::ProfileUrl).string().not_null())
                    .col(ColumnDef::new(ProfileRecords::SourceSite).string().not_null())
                    .col(ColumnDef::new(ProfileRecords::FullName).string().not_null())
                    .col(ColumnDef::new(ProfileRecords::FirstName).string())
                    .col(ColumnDef::new(ProfileRecords::LastName).string())
                    .col(ColumnDef::new(ProfileRecords::Company).string())
                    .col(ColumnDef::new(ProfileRecords::City).string())
                    .col(ColumnDef::new(ProfileRecords::State).string())
                    .col(ColumnDef::new(ProfileRecords::Phone).string())
                    .col(ColumnDef::new(ProfileRecords::Phones).json().not_null())
                    .col(ColumnDef::new(ProfileRecords::Email).string())
                    .col(ColumnDef::new(ProfileRecords::Emails).json().not_null())
                    .col(ColumnDef::new(ProfileRecords::YearsExperience).integer())
                    .col(ColumnDef::new(ProfileRecords::DealsClosed).integer())
                    .col(ColumnDef::new(ProfileRecords::ReviewCount).integer())
                    .col(ColumnDef::new(ProfileRecords::Extra).json().not_null())
                    .col(
                        ColumnDef::new(ProfileRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProfileRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profile_records_job_id")
                            .from(ProfileRecords::Table, ProfileRecords::JobId)
                            .to(ScrapeJobs::Table, ScrapeJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profile_records_job_url")
                    .table(ProfileRecords::Table)
                    .col(ProfileRecords::JobId)
                    .col(ProfileRecords::ProfileUrl)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProfileRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProfileRecords {
    Table,
    Id,
    JobId,
    ProfileUrl,
    SourceSite,
    FullName,
    FirstName,
    LastName,
    Company,
    City,
    State,
    Phone,
    Phones,
    Email,
    Emails,
    YearsExperience,
    DealsClosed,
    ReviewCount,
    Extra,
    CreatedAt,
    UpdatedAt,
}
