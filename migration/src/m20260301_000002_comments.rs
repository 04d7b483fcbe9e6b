//! 评论、点赞与验证码表

use sea_orm_migration::prelude::*;

use crate::m20260301_000001_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comments::UserName).string_len(50).not_null())
                    .col(ColumnDef::new(Comments::Email).string_len(254).not_null())
                    .col(ColumnDef::new(Comments::HomePage).string_len(200).null())
                    .col(ColumnDef::new(Comments::Text).text().not_null())
                    .col(
                        ColumnDef::new(Comments::SanitizedText)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Comments::ParentId).big_integer().null())
                    .col(
                        ColumnDef::new(Comments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Comments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Comments::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(Comments::UserAgent).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Comments::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Comments::IsModerated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Comments::ModeratedBy).big_integer().null())
                    .col(
                        ColumnDef::new(Comments::ModeratedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Comments::LikesCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comments::RepliesCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_parent")
                            .from(Comments::Table, Comments::ParentId)
                            .to(Comments::Table, Comments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_moderated_by")
                            .from(Comments::Table, Comments::ModeratedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // 列表与过滤常用的复合索引
        for (name, cols) in [
            ("idx_comments_created_active", [Comments::CreatedAt, Comments::IsActive]),
            ("idx_comments_parent_created", [Comments::ParentId, Comments::CreatedAt]),
            ("idx_comments_user_created", [Comments::UserName, Comments::CreatedAt]),
            ("idx_comments_email_created", [Comments::Email, Comments::CreatedAt]),
        ] {
            let [first, second] = cols;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Comments::Table)
                        .col(first)
                        .col(second)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(CommentLikes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentLikes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CommentLikes::CommentId).big_integer().not_null())
                    .col(ColumnDef::new(CommentLikes::IpAddress).string_len(45).not_null())
                    .col(
                        ColumnDef::new(CommentLikes::UserAgent)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(CommentLikes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_likes_comment")
                            .from(CommentLikes::Table, CommentLikes::CommentId)
                            .to(Comments::Table, Comments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一 IP 对同一评论只能点赞一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_comment_likes_comment_ip")
                    .table(CommentLikes::Table)
                    .col(CommentLikes::CommentId)
                    .col(CommentLikes::IpAddress)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CaptchaTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CaptchaTokens::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CaptchaTokens::Token)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(CaptchaTokens::Challenge).string_len(100).not_null())
                    .col(ColumnDef::new(CaptchaTokens::Solution).string_len(20).not_null())
                    .col(ColumnDef::new(CaptchaTokens::IpAddress).string_len(45).null())
                    .col(
                        ColumnDef::new(CaptchaTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CaptchaTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CaptchaTokens::UsedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_captcha_tokens_created_at")
                    .table(CaptchaTokens::Table)
                    .col(CaptchaTokens::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CaptchaTokens::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CommentLikes::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
pub(crate) enum Comments {
    #[sea_orm(iden = "comments")]
    Table,
    Id,
    UserName,
    Email,
    HomePage,
    Text,
    SanitizedText,
    ParentId,
    CreatedAt,
    UpdatedAt,
    IpAddress,
    UserAgent,
    IsActive,
    IsModerated,
    ModeratedBy,
    ModeratedAt,
    LikesCount,
    RepliesCount,
}

#[derive(DeriveIden)]
enum CommentLikes {
    #[sea_orm(iden = "comment_likes")]
    Table,
    Id,
    CommentId,
    IpAddress,
    UserAgent,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CaptchaTokens {
    #[sea_orm(iden = "captcha_tokens")]
    Table,
    Id,
    Token,
    Challenge,
    Solution,
    IpAddress,
    CreatedAt,
    ExpiresAt,
    UsedAt,
}
