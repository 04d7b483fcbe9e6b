//! 上传文件及其图片 / 文本元数据、处理日志的数据库操作

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, info};

use super::{SeaOrmStorage, icontains};
use crate::errors::Result;

use migration::entities::{file_upload_log, image_file, text_file, uploaded_file};

pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub file_type: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl FileFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(ref file_type) = self.file_type {
            condition = condition.add(uploaded_file::Column::FileType.eq(file_type.as_str()));
        }
        if let Some(ref status) = self.status {
            condition = condition.add(uploaded_file::Column::Status.eq(status.as_str()));
        }
        if let Some(ref search) = self.search {
            condition = condition.add(icontains(uploaded_file::Column::OriginalName, search));
        }
        condition
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSortField {
    CreatedAt,
    FileSize,
    OriginalName,
}

/// 文件列表排序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOrdering {
    pub field: FileSortField,
    pub descending: bool,
}

impl Default for FileOrdering {
    fn default() -> Self {
        Self {
            field: FileSortField::CreatedAt,
            descending: true,
        }
    }
}

impl FileOrdering {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "created_at" => FileSortField::CreatedAt,
            "file_size" => FileSortField::FileSize,
            "original_name" => FileSortField::OriginalName,
            _ => return Self::default(),
        };
        Self { field, descending }
    }

    fn column(&self) -> uploaded_file::Column {
        match self.field {
            FileSortField::CreatedAt => uploaded_file::Column::CreatedAt,
            FileSortField::FileSize => uploaded_file::Column::FileSize,
            FileSortField::OriginalName => uploaded_file::Column::OriginalName,
        }
    }
}

/// 已完成文件的聚合统计
#[derive(Debug, Clone, Default)]
pub struct FileAggregates {
    pub total_files: u64,
    pub total_size: i64,
    pub files_by_type: BTreeMap<String, i64>,
    pub files_this_week: u64,
    pub average_file_size: f64,
    pub largest: Option<uploaded_file::Model>,
    pub most_recent: Option<uploaded_file::Model>,
}

#[derive(Debug, FromQueryResult)]
struct SizeRow {
    files: i64,
    total: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct TypeCountRow {
    file_type: String,
    files: i64,
}

impl SeaOrmStorage {
    pub async fn find_file(&self, id: i64) -> Result<Option<uploaded_file::Model>> {
        let db = &self.db;
        self.retrying("find_file", || uploaded_file::Entity::find_by_id(id).one(db))
            .await
    }

    /// 只返回处理完成的文件
    pub async fn find_completed_file(&self, id: i64) -> Result<Option<uploaded_file::Model>> {
        Ok(self
            .find_file(id)
            .await?
            .filter(|f| f.status == STATUS_COMPLETED))
    }

    pub async fn find_file_by_checksum(
        &self,
        checksum: &str,
    ) -> Result<Option<uploaded_file::Model>> {
        let db = &self.db;
        let checksum = checksum.to_string();
        self.retrying("find_file_by_checksum", || {
            uploaded_file::Entity::find()
                .filter(uploaded_file::Column::Checksum.eq(checksum.clone()))
                .order_by_asc(uploaded_file::Column::Id)
                .one(db)
        })
        .await
    }

    pub async fn insert_uploaded_file(
        &self,
        model: uploaded_file::ActiveModel,
    ) -> Result<uploaded_file::Model> {
        let db = &self.db;
        let created = self
            .retrying("insert_uploaded_file", || model.clone().insert(db))
            .await?;
        self.invalidate_count_cache();
        Ok(created)
    }

    pub async fn update_uploaded_file(
        &self,
        model: uploaded_file::ActiveModel,
    ) -> Result<uploaded_file::Model> {
        let db = &self.db;
        let updated = self
            .retrying("update_uploaded_file", || model.clone().update(db))
            .await?;
        self.invalidate_count_cache();
        Ok(updated)
    }

    pub async fn insert_image_meta(
        &self,
        model: image_file::ActiveModel,
    ) -> Result<image_file::Model> {
        let db = &self.db;
        self.retrying("insert_image_meta", || model.clone().insert(db))
            .await
    }

    pub async fn insert_text_meta(&self, model: text_file::ActiveModel) -> Result<text_file::Model> {
        let db = &self.db;
        self.retrying("insert_text_meta", || model.clone().insert(db))
            .await
    }

    pub async fn find_image_meta(&self, file_id: i64) -> Result<Option<image_file::Model>> {
        let db = &self.db;
        self.retrying("find_image_meta", || {
            image_file::Entity::find()
                .filter(image_file::Column::UploadedFileId.eq(file_id))
                .one(db)
        })
        .await
    }

    pub async fn find_text_meta(&self, file_id: i64) -> Result<Option<text_file::Model>> {
        let db = &self.db;
        self.retrying("find_text_meta", || {
            text_file::Entity::find()
                .filter(text_file::Column::UploadedFileId.eq(file_id))
                .one(db)
        })
        .await
    }

    /// 追加一条文件处理日志
    pub async fn insert_upload_log(
        &self,
        file_id: i64,
        level: &str,
        message: &str,
        details: &str,
    ) -> Result<()> {
        let db = &self.db;
        let entry = file_upload_log::ActiveModel {
            uploaded_file_id: Set(file_id),
            level: Set(level.to_string()),
            message: Set(message.to_string()),
            details: Set(details.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        self.retrying("insert_upload_log", || entry.clone().insert(db))
            .await?;
        Ok(())
    }

    pub async fn upload_logs_for(&self, file_id: i64) -> Result<Vec<file_upload_log::Model>> {
        let db = &self.db;
        self.retrying("upload_logs_for", || {
            file_upload_log::Entity::find()
                .filter(file_upload_log::Column::UploadedFileId.eq(file_id))
                .order_by_asc(file_upload_log::Column::Id)
                .all(db)
        })
        .await
    }

    /// 已完成文件分页
    pub async fn list_files(
        &self,
        filter: &FileFilter,
        ordering: FileOrdering,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<uploaded_file::Model>, u64)> {
        let db = &self.db;
        let query = uploaded_file::Entity::find()
            .filter(uploaded_file::Column::Status.eq(STATUS_COMPLETED))
            .filter(filter.condition());

        let count_query = query.clone();
        let total = self
            .cached_count(format!("files:{:?}", filter), || async {
                self.retrying("list_files.count", || count_query.clone().count(db))
                    .await
            })
            .await?;

        let ordered = if ordering.descending {
            query.order_by_desc(ordering.column())
        } else {
            query.order_by_asc(ordering.column())
        }
        .order_by_desc(uploaded_file::Column::Id);

        let page_index = page.saturating_sub(1);
        let items = self
            .retrying("list_files.page", || {
                let q = ordered.clone();
                async move { q.paginate(db, page_size.max(1)).fetch_page(page_index).await }
            })
            .await?;

        debug!("Loaded {} files (page {}, total {})", items.len(), page, total);
        Ok((items, total))
    }

    pub async fn file_aggregates(&self, week_ago: DateTime<Utc>) -> Result<FileAggregates> {
        let db = &self.db;
        let completed =
            uploaded_file::Entity::find().filter(uploaded_file::Column::Status.eq(STATUS_COMPLETED));

        let sizes = self
            .retrying("file_aggregates.size", || {
                completed
                    .clone()
                    .select_only()
                    .column_as(uploaded_file::Column::Id.count(), "files")
                    .column_as(uploaded_file::Column::FileSize.sum(), "total")
                    .into_model::<SizeRow>()
                    .one(db)
            })
            .await?;
        let (total_files, total_size) = sizes
            .map(|row| (row.files.max(0) as u64, row.total.unwrap_or(0)))
            .unwrap_or((0, 0));

        let by_type = self
            .retrying("file_aggregates.by_type", || {
                completed
                    .clone()
                    .select_only()
                    .column(uploaded_file::Column::FileType)
                    .column_as(uploaded_file::Column::Id.count(), "files")
                    .group_by(uploaded_file::Column::FileType)
                    .into_model::<TypeCountRow>()
                    .all(db)
            })
            .await?;

        let files_this_week = self
            .retrying("file_aggregates.week", || {
                completed
                    .clone()
                    .filter(uploaded_file::Column::CreatedAt.gte(week_ago))
                    .count(db)
            })
            .await?;

        let largest = self
            .retrying("file_aggregates.largest", || {
                completed
                    .clone()
                    .order_by_desc(uploaded_file::Column::FileSize)
                    .one(db)
            })
            .await?;
        let most_recent = self
            .retrying("file_aggregates.recent", || {
                completed
                    .clone()
                    .order_by_desc(uploaded_file::Column::CreatedAt)
                    .one(db)
            })
            .await?;

        Ok(FileAggregates {
            total_files,
            total_size,
            files_by_type: by_type.into_iter().map(|r| (r.file_type, r.files)).collect(),
            files_this_week,
            average_file_size: if total_files > 0 {
                total_size as f64 / total_files as f64
            } else {
                0.0
            },
            largest,
            most_recent,
        })
    }

    /// 创建时间早于 cutoff 的文件（可选按状态过滤）
    pub async fn files_created_before(
        &self,
        cutoff: DateTime<Utc>,
        status: Option<&str>,
    ) -> Result<Vec<uploaded_file::Model>> {
        let db = &self.db;
        let status = status.map(str::to_string);
        self.retrying("files_created_before", || {
            let mut query =
                uploaded_file::Entity::find().filter(uploaded_file::Column::CreatedAt.lt(cutoff));
            if let Some(ref status) = status {
                query = query.filter(uploaded_file::Column::Status.eq(status.as_str()));
            }
            query.all(db)
        })
        .await
    }

    /// 删除文件记录（图片 / 文本元数据和日志级联删除）
    pub async fn delete_files(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let db = &self.db;
        let ids = ids.to_vec();
        let result = self
            .retrying("delete_files", || {
                uploaded_file::Entity::delete_many()
                    .filter(uploaded_file::Column::Id.is_in(ids.clone()))
                    .exec(db)
            })
            .await?;
        self.invalidate_count_cache();
        info!("Deleted {} file records", result.rows_affected);
        Ok(result.rows_affected)
    }

    /// 已完成文件，用于热门内容汇总
    pub async fn completed_files(&self) -> Result<Vec<uploaded_file::Model>> {
        let db = &self.db;
        self.retrying("completed_files", || {
            uploaded_file::Entity::find()
                .filter(uploaded_file::Column::Status.eq(STATUS_COMPLETED))
                .all(db)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_ordering_parse() {
        assert_eq!(FileOrdering::parse(None), FileOrdering::default());
        assert_eq!(
            FileOrdering::parse(Some("-file_size")),
            FileOrdering {
                field: FileSortField::FileSize,
                descending: true
            }
        );
        assert_eq!(
            FileOrdering::parse(Some("original_name")),
            FileOrdering {
                field: FileSortField::OriginalName,
                descending: false
            }
        );
        assert_eq!(FileOrdering::parse(Some("checksum")), FileOrdering::default());
    }
}
