//! 分析相关表
//!
//! - analytics_events: 原始事件
//! - daily_stats: 天级汇总（date 唯一）
//! - user_activities: 会话级活跃度
//! - popular_contents: 每日热门内容得分
//! - search_queries: 搜索记录

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AnalyticsEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnalyticsEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AnalyticsEvents::EventType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AnalyticsEvents::ContentType).string_len(50).null())
                    .col(ColumnDef::new(AnalyticsEvents::ObjectId).big_integer().null())
                    .col(
                        ColumnDef::new(AnalyticsEvents::UserIdentifier)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(AnalyticsEvents::IpAddress).string_len(45).null())
                    .col(
                        ColumnDef::new(AnalyticsEvents::UserAgent)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(AnalyticsEvents::Referer)
                            .string_len(200)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(AnalyticsEvents::EventData)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(AnalyticsEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnalyticsEvents::Processed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_analytics_events_type_created")
                    .table(AnalyticsEvents::Table)
                    .col(AnalyticsEvents::EventType)
                    .col(AnalyticsEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_analytics_events_user_created")
                    .table(AnalyticsEvents::Table)
                    .col(AnalyticsEvents::UserIdentifier)
                    .col(AnalyticsEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DailyStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyStats::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DailyStats::Date).date().not_null().unique_key())
                    .col(counter(DailyStats::CommentsCreated))
                    .col(counter(DailyStats::CommentsLiked))
                    .col(counter(DailyStats::RepliesCreated))
                    .col(counter(DailyStats::FilesUploaded))
                    .col(counter(DailyStats::ImagesUploaded))
                    .col(counter(DailyStats::TextFilesUploaded))
                    .col(counter(DailyStats::NewUsers))
                    .col(counter(DailyStats::UserLogins))
                    .col(counter(DailyStats::PageViews))
                    .col(counter(DailyStats::UniqueVisitors))
                    .col(counter(DailyStats::SearchesPerformed))
                    .col(counter(DailyStats::ErrorsOccurred))
                    .col(
                        ColumnDef::new(DailyStats::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailyStats::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserActivities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserActivities::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserActivities::UserIdentifier)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserActivities::IpAddress).string_len(45).not_null())
                    .col(
                        ColumnDef::new(UserActivities::SessionId)
                            .string_len(40)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(UserActivities::UserAgent)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(UserActivities::SessionStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserActivities::LastActivity)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(counter(UserActivities::SessionDuration))
                    .col(counter(UserActivities::PagesVisited))
                    .col(counter(UserActivities::CommentsPosted))
                    .col(counter(UserActivities::FilesUploaded))
                    .col(counter(UserActivities::LikesGiven))
                    .col(counter(UserActivities::SearchesPerformed))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_activities_session")
                    .table(UserActivities::Table)
                    .col(UserActivities::UserIdentifier)
                    .col(UserActivities::IpAddress)
                    .col(UserActivities::SessionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PopularContents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PopularContents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PopularContents::ContentType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PopularContents::ContentId).big_integer().not_null())
                    .col(
                        ColumnDef::new(PopularContents::ContentTitle)
                            .string_len(200)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(PopularContents::Date).date().not_null())
                    .col(counter(PopularContents::ViewCount))
                    .col(counter(PopularContents::LikeCount))
                    .col(counter(PopularContents::ShareCount))
                    .col(counter(PopularContents::CommentCount))
                    .col(
                        ColumnDef::new(PopularContents::PopularityScore)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_popular_contents_type_id_date")
                    .table(PopularContents::Table)
                    .col(PopularContents::ContentType)
                    .col(PopularContents::ContentId)
                    .col(PopularContents::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SearchQueries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SearchQueries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SearchQueries::Query).string_len(500).not_null())
                    .col(
                        ColumnDef::new(SearchQueries::UserIdentifier)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(SearchQueries::IpAddress).string_len(45).null())
                    .col(counter(SearchQueries::ResultsCount))
                    .col(counter(SearchQueries::ResponseTime))
                    .col(ColumnDef::new(SearchQueries::ClickedResultId).big_integer().null())
                    .col(ColumnDef::new(SearchQueries::ClickedPosition).integer().null())
                    .col(
                        ColumnDef::new(SearchQueries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_search_queries_created_at")
                    .table(SearchQueries::Table)
                    .col(SearchQueries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SearchQueries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PopularContents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserActivities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DailyStats::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AnalyticsEvents::Table).to_owned())
            .await
    }
}

/// 非空、默认 0 的计数列
fn counter<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[derive(DeriveIden)]
enum AnalyticsEvents {
    #[sea_orm(iden = "analytics_events")]
    Table,
    Id,
    EventType,
    ContentType,
    ObjectId,
    UserIdentifier,
    IpAddress,
    UserAgent,
    Referer,
    EventData,
    CreatedAt,
    Processed,
}

#[derive(DeriveIden)]
enum DailyStats {
    #[sea_orm(iden = "daily_stats")]
    Table,
    Id,
    Date,
    CommentsCreated,
    CommentsLiked,
    RepliesCreated,
    FilesUploaded,
    ImagesUploaded,
    TextFilesUploaded,
    NewUsers,
    UserLogins,
    PageViews,
    UniqueVisitors,
    SearchesPerformed,
    ErrorsOccurred,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserActivities {
    #[sea_orm(iden = "user_activities")]
    Table,
    Id,
    UserIdentifier,
    IpAddress,
    SessionId,
    UserAgent,
    SessionStart,
    LastActivity,
    SessionDuration,
    PagesVisited,
    CommentsPosted,
    FilesUploaded,
    LikesGiven,
    SearchesPerformed,
}

#[derive(DeriveIden)]
enum PopularContents {
    #[sea_orm(iden = "popular_contents")]
    Table,
    Id,
    ContentType,
    ContentId,
    ContentTitle,
    Date,
    ViewCount,
    LikeCount,
    ShareCount,
    CommentCount,
    PopularityScore,
}

#[derive(DeriveIden)]
enum SearchQueries {
    #[sea_orm(iden = "search_queries")]
    Table,
    Id,
    Query,
    UserIdentifier,
    IpAddress,
    ResultsCount,
    ResponseTime,
    ClickedResultId,
    ClickedPosition,
    CreatedAt,
}
