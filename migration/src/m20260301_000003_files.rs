//! 上传文件及其元数据表

use sea_orm_migration::prelude::*;

use crate::m20260301_000002_comments::Comments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UploadedFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UploadedFiles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UploadedFiles::FilePath).string_len(500).not_null())
                    .col(
                        ColumnDef::new(UploadedFiles::OriginalName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UploadedFiles::FileType).string_len(20).not_null())
                    .col(ColumnDef::new(UploadedFiles::FileSize).big_integer().not_null())
                    .col(
                        ColumnDef::new(UploadedFiles::MimeType)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(UploadedFiles::Checksum).string_len(64).not_null())
                    .col(ColumnDef::new(UploadedFiles::UploadedByIp).string_len(45).null())
                    .col(
                        ColumnDef::new(UploadedFiles::UserAgent)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(UploadedFiles::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(UploadedFiles::ProcessingError)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(UploadedFiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UploadedFiles::ProcessedAt)
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
                    .name("idx_uploaded_files_checksum")
                    .table(UploadedFiles::Table)
                    .col(UploadedFiles::Checksum)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_uploaded_files_status_created")
                    .table(UploadedFiles::Table)
                    .col(UploadedFiles::Status)
                    .col(UploadedFiles::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ImageFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImageFiles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ImageFiles::UploadedFileId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ImageFiles::OriginalWidth).integer().not_null())
                    .col(ColumnDef::new(ImageFiles::OriginalHeight).integer().not_null())
                    .col(ColumnDef::new(ImageFiles::Width).integer().not_null())
                    .col(ColumnDef::new(ImageFiles::Height).integer().not_null())
                    .col(ColumnDef::new(ImageFiles::Format).string_len(10).not_null())
                    .col(
                        ColumnDef::new(ImageFiles::Quality)
                            .integer()
                            .not_null()
                            .default(85),
                    )
                    .col(ColumnDef::new(ImageFiles::ThumbnailPath).string_len(500).null())
                    .col(
                        ColumnDef::new(ImageFiles::HasTransparency)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ImageFiles::ColorMode)
                            .string_len(20)
                            .not_null()
                            .default(""),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_image_files_uploaded_file")
                            .from(ImageFiles::Table, ImageFiles::UploadedFileId)
                            .to(UploadedFiles::Table, UploadedFiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TextFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TextFiles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TextFiles::UploadedFileId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(TextFiles::Encoding)
                            .string_len(50)
                            .not_null()
                            .default("utf-8"),
                    )
                    .col(ColumnDef::new(TextFiles::LineCount).big_integer().not_null())
                    .col(ColumnDef::new(TextFiles::WordCount).big_integer().not_null())
                    .col(ColumnDef::new(TextFiles::CharacterCount).big_integer().not_null())
                    .col(ColumnDef::new(TextFiles::Preview).text().not_null().default(""))
                    .col(
                        ColumnDef::new(TextFiles::IsValidUtf8)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(TextFiles::HasBinaryContent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_text_files_uploaded_file")
                            .from(TextFiles::Table, TextFiles::UploadedFileId)
                            .to(UploadedFiles::Table, UploadedFiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FileUploadLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FileUploadLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FileUploadLogs::UploadedFileId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FileUploadLogs::Level).string_len(10).not_null())
                    .col(ColumnDef::new(FileUploadLogs::Message).text().not_null())
                    .col(
                        ColumnDef::new(FileUploadLogs::Details)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(FileUploadLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_file_upload_logs_uploaded_file")
                            .from(FileUploadLogs::Table, FileUploadLogs::UploadedFileId)
                            .to(UploadedFiles::Table, UploadedFiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CommentFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentFiles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CommentFiles::CommentId).big_integer().not_null())
                    .col(ColumnDef::new(CommentFiles::UploadedFileId).big_integer().null())
                    .col(ColumnDef::new(CommentFiles::FilePath).string_len(500).not_null())
                    .col(ColumnDef::new(CommentFiles::FileType).string_len(10).not_null())
                    .col(
                        ColumnDef::new(CommentFiles::OriginalName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CommentFiles::FileSize).big_integer().not_null())
                    .col(
                        ColumnDef::new(CommentFiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_files_comment")
                            .from(CommentFiles::Table, CommentFiles::CommentId)
                            .to(Comments::Table, Comments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_files_uploaded_file")
                            .from(CommentFiles::Table, CommentFiles::UploadedFileId)
                            .to(UploadedFiles::Table, UploadedFiles::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_comment_files_comment")
                    .table(CommentFiles::Table)
                    .col(CommentFiles::CommentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FileUploadLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TextFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ImageFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UploadedFiles::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum UploadedFiles {
    #[sea_orm(iden = "uploaded_files")]
    Table,
    Id,
    FilePath,
    OriginalName,
    FileType,
    FileSize,
    MimeType,
    Checksum,
    UploadedByIp,
    UserAgent,
    Status,
    ProcessingError,
    CreatedAt,
    ProcessedAt,
}

#[derive(DeriveIden)]
enum ImageFiles {
    #[sea_orm(iden = "image_files")]
    Table,
    Id,
    UploadedFileId,
    OriginalWidth,
    OriginalHeight,
    Width,
    Height,
    Format,
    Quality,
    ThumbnailPath,
    HasTransparency,
    ColorMode,
}

#[derive(DeriveIden)]
enum TextFiles {
    #[sea_orm(iden = "text_files")]
    Table,
    Id,
    UploadedFileId,
    Encoding,
    LineCount,
    WordCount,
    CharacterCount,
    Preview,
    IsValidUtf8,
    HasBinaryContent,
}

#[derive(DeriveIden)]
enum FileUploadLogs {
    #[sea_orm(iden = "file_upload_logs")]
    Table,
    Id,
    UploadedFileId,
    Level,
    Message,
    Details,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CommentFiles {
    #[sea_orm(iden = "comment_files")]
    Table,
    Id,
    CommentId,
    UploadedFileId,
    FilePath,
    FileType,
    OriginalName,
    FileSize,
    CreatedAt,
}
