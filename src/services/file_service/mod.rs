//! File upload service
//!
//! Validates and stores uploads, processes images and text files, serves
//! downloads / thumbnails / previews and cleans up old records.

pub mod processing;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use sea_orm::Set;
use serde::Serialize;
use tracing::{error, info, warn};

use self::processing::{
    ImageLimits, ProcessedImage, TYPE_IMAGE, TYPE_TEXT, TextAnalysis, aspect_ratio, checksum,
    file_type_for, mime_for, orientation,
};
use super::{ClientInfo, IncomingFile, Page};
use crate::analytics::{EventTracker, EventType, NewEvent};
use crate::analytics::rollup::CONTENT_FILE;
use crate::config::{UploadsConfig, get_config};
use crate::errors::{CommentaryError, Result};
use crate::storage::backend::{STATUS_COMPLETED, STATUS_FAILED, STATUS_PROCESSING};
use crate::storage::{FileFilter, FileOrdering, SeaOrmStorage};
use crate::utils::{format_size, truncate_chars};
use migration::entities::{image_file, text_file, uploaded_file};

const STATS_TTL: StdDuration = StdDuration::from_secs(10 * 60);
const USER_AGENT_MAX_CHARS: usize = 500;
pub const MAX_BULK_FILES: usize = 10;
pub const DEFAULT_CLEANUP_DAYS: i64 = 30;
const FAILED_UPLOAD_MAX_AGE_DAYS: i64 = 1;

// ============ 视图类型 ============

pub(crate) fn file_url(id: i64) -> String {
    format!("{}/files/{}/download/", get_config().server.api_prefix, id)
}

fn thumbnail_url(id: i64) -> String {
    format!("{}/files/{}/thumbnail/", get_config().server.api_prefix, id)
}

/// 文件列表项
#[derive(Debug, Clone, Serialize)]
pub struct FileView {
    pub id: i64,
    pub original_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_size_display: String,
    pub mime_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub file_url: String,
}

impl From<&uploaded_file::Model> for FileView {
    fn from(m: &uploaded_file::Model) -> Self {
        Self {
            id: m.id,
            original_name: m.original_name.clone(),
            file_type: m.file_type.clone(),
            file_size: m.file_size,
            file_size_display: format_size(m.file_size),
            mime_type: m.mime_type.clone(),
            status: m.status.clone(),
            created_at: m.created_at,
            processed_at: m.processed_at,
            file_url: file_url(m.id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageDataView {
    pub original_width: i32,
    pub original_height: i32,
    pub width: i32,
    pub height: i32,
    pub format: String,
    pub quality: i32,
    pub thumbnail_url: Option<String>,
    pub has_transparency: bool,
    pub color_mode: String,
    pub aspect_ratio: f64,
    pub orientation: &'static str,
}

impl From<&image_file::Model> for ImageDataView {
    fn from(m: &image_file::Model) -> Self {
        Self {
            original_width: m.original_width,
            original_height: m.original_height,
            width: m.width,
            height: m.height,
            format: m.format.clone(),
            quality: m.quality,
            thumbnail_url: m.thumbnail_path.as_ref().map(|_| thumbnail_url(m.uploaded_file_id)),
            has_transparency: m.has_transparency,
            color_mode: m.color_mode.clone(),
            aspect_ratio: aspect_ratio(m.width, m.height),
            orientation: orientation(m.width, m.height),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextDataView {
    pub encoding: String,
    pub line_count: i64,
    pub word_count: i64,
    pub character_count: i64,
    pub preview: String,
    pub is_valid_utf8: bool,
    pub has_binary_content: bool,
}

impl From<&text_file::Model> for TextDataView {
    fn from(m: &text_file::Model) -> Self {
        Self {
            encoding: m.encoding.clone(),
            line_count: m.line_count,
            word_count: m.word_count,
            character_count: m.character_count,
            preview: m.preview.clone(),
            is_valid_utf8: m.is_valid_utf8,
            has_binary_content: m.has_binary_content,
        }
    }
}

/// 单个文件的上传结果
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub id: i64,
    pub original_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub file_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<ImageDataView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_data: Option<TextDataView>,
    /// 内部使用：存储路径（评论附件需要）
    #[serde(skip)]
    pub file_path: String,
}

impl UploadResult {
    fn new(
        file: &uploaded_file::Model,
        image: Option<&image_file::Model>,
        text: Option<&text_file::Model>,
    ) -> Self {
        Self {
            id: file.id,
            original_name: file.original_name.clone(),
            file_type: file.file_type.clone(),
            file_size: file.file_size,
            status: file.status.clone(),
            created_at: file.created_at,
            file_url: file_url(file.id),
            image_data: image.map(ImageDataView::from),
            text_data: text.map(TextDataView::from),
            file_path: file.file_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkUploadItem {
    pub success: bool,
    pub file: Option<UploadResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkUploadReport {
    pub results: Vec<BulkUploadItem>,
    pub uploaded: usize,
    pub failed: usize,
}

/// 文件详情：基本信息 + 图片 / 文本元数据
#[derive(Debug, Clone, Serialize)]
pub struct FileDetail {
    #[serde(flatten)]
    pub file: FileView,
    pub checksum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageDataView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextDataView>,
}

/// 原始文件内容
#[derive(Debug, Clone)]
pub struct FileContent {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPreview {
    pub preview: String,
    pub encoding: String,
    pub line_count: i64,
    pub word_count: i64,
    pub character_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LargestFile {
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentUpload {
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub total_files: u64,
    pub total_size: i64,
    pub total_size_display: String,
    pub files_by_type: BTreeMap<String, i64>,
    pub files_this_week: u64,
    pub average_file_size: f64,
    pub largest_file: Option<LargestFile>,
    pub most_recent_upload: Option<RecentUpload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupResult {
    pub message: String,
    pub deleted_files: u64,
    pub deleted_failed_uploads: u64,
}

// ============ 服务 ============

pub struct FileService {
    storage: Arc<SeaOrmStorage>,
    tracker: EventTracker,
    uploads: UploadsConfig,
    stats_cache: Cache<(), Arc<FileStats>>,
}

impl FileService {
    pub fn new(storage: Arc<SeaOrmStorage>, tracker: EventTracker, uploads: UploadsConfig) -> Self {
        let stats_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(STATS_TTL)
            .build();
        Self {
            storage,
            tracker,
            uploads,
            stats_cache,
        }
    }

    fn media_root(&self) -> &Path {
        Path::new(&self.uploads.media_root)
    }

    fn absolute(&self, relative: &str) -> PathBuf {
        self.media_root().join(relative)
    }

    /// `uploads/2026/03/01/<uuid>.png`
    fn dated_path(dir: &str, now: DateTime<Utc>, stem: &str, ext: &str) -> String {
        format!("{}/{}/{}.{}", dir, now.format("%Y/%m/%d"), stem, ext)
    }

    async fn write_media(&self, relative: &str, data: &[u8]) -> Result<()> {
        let path = self.absolute(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn remove_media(&self, relative: &str) {
        if relative.is_empty() {
            return;
        }
        let path = self.absolute(relative);
        if let Err(e) = tokio::fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }

    pub fn validate(&self, file: &IncomingFile) -> Result<()> {
        processing::validate_upload(&file.name, file.size(), &self.uploads)
    }

    /// 校验、保存并处理一个上传文件
    ///
    /// 内容重复（MD5 相同）时直接返回已有记录。
    pub async fn process_upload(
        &self,
        file: IncomingFile,
        client: &ClientInfo,
    ) -> Result<UploadResult> {
        self.validate(&file)?;
        let digest = checksum(&file.data);

        if let Some(existing) = self.storage.find_file_by_checksum(&digest).await? {
            info!(
                "Duplicate file detected: {} (original: {})",
                file.name, existing.original_name
            );
            self.log_upload(
                existing.id,
                "info",
                &format!("Duplicate file detected: {}", file.name),
                &existing.original_name,
            )
            .await;
            return self.upload_result(&existing).await;
        }

        let mime = mime_for(&file.name);
        let file_type = file_type_for(mime);
        let ext = processing::extension_of(&file.name).unwrap_or_else(|| "bin".to_string());
        let now = Utc::now();
        let stem = uuid::Uuid::new_v4().simple().to_string();
        let relative = Self::dated_path("uploads", now, &stem, &ext);
        self.write_media(&relative, &file.data).await?;

        let record = self
            .storage
            .insert_uploaded_file(uploaded_file::ActiveModel {
                file_path: Set(relative.clone()),
                original_name: Set(file.name.clone()),
                file_type: Set(file_type.to_string()),
                file_size: Set(file.size() as i64),
                mime_type: Set(mime.unwrap_or_default().to_string()),
                checksum: Set(digest),
                uploaded_by_ip: Set(client.ip.clone()),
                user_agent: Set(truncate_chars(&client.user_agent, USER_AGENT_MAX_CHARS)),
                status: Set(STATUS_PROCESSING.to_string()),
                processing_error: Set(String::new()),
                created_at: Set(now),
                processed_at: Set(None),
                ..Default::default()
            })
            .await?;

        let outcome = match file_type {
            TYPE_IMAGE => self
                .store_image(&record, file.data.clone(), &stem, now)
                .await
                .map(|m| (Some(m), None)),
            TYPE_TEXT => self
                .store_text(&record, &file.data)
                .await
                .map(|m| (None, Some(m))),
            _ => Ok((None, None)),
        };

        let mut active: uploaded_file::ActiveModel = record.clone().into();
        match outcome {
            Ok((image, text)) => {
                if let Some(ref image) = image {
                    info!(
                        "Image processed: {}x{}, thumbnail generated",
                        image.width, image.height
                    );
                }
                if let Some(ref text) = text {
                    info!(
                        "Text file processed: {} lines, {} words",
                        text.line_count, text.word_count
                    );
                }
                active.status = Set(STATUS_COMPLETED.to_string());
                active.processed_at = Set(Some(Utc::now()));
                if let Some(size) = self.stored_size(&record.file_path).await {
                    active.file_size = Set(size);
                }
                let completed = self.storage.update_uploaded_file(active).await?;
                self.log_upload(
                    completed.id,
                    "info",
                    &format!("File processed successfully: {}", completed.original_name),
                    "",
                )
                .await;
                self.stats_cache.invalidate_all();

                let tracked_client = ClientInfo {
                    user_identifier: client.actor(),
                    ..client.clone()
                };
                self.tracker.track(
                    NewEvent::new(EventType::FileUploaded)
                        .with_client(&tracked_client)
                        .with_object(CONTENT_FILE, completed.id)
                        .with_data(serde_json::json!({
                            "file_id": completed.id,
                            "file_type": completed.file_type,
                            "file_size": completed.file_size,
                            "original_name": completed.original_name,
                        })),
                );

                Ok(UploadResult::new(&completed, image.as_ref(), text.as_ref()))
            }
            Err(e) => {
                error!("File processing failed: {}", e);
                active.status = Set(STATUS_FAILED.to_string());
                active.processing_error = Set(e.message().to_string());
                self.storage.update_uploaded_file(active).await?;
                self.log_upload(
                    record.id,
                    "error",
                    &format!("File processing failed: {}", e.message()),
                    "",
                )
                .await;
                Err(e)
            }
        }
    }

    async fn stored_size(&self, relative: &str) -> Option<i64> {
        tokio::fs::metadata(self.absolute(relative))
            .await
            .ok()
            .map(|m| m.len() as i64)
    }

    async fn store_image(
        &self,
        record: &uploaded_file::Model,
        data: bytes::Bytes,
        stem: &str,
        now: DateTime<Utc>,
    ) -> Result<image_file::Model> {
        let limits = ImageLimits::from(&self.uploads);
        let processed: ProcessedImage =
            tokio::task::spawn_blocking(move || processing::process_image(&data, limits))
                .await??;

        if let Some(ref resized) = processed.resized {
            self.write_media(&record.file_path, resized).await?;
        }
        let thumb_path = Self::dated_path(
            "thumbnails",
            now,
            &format!("{}_thumb", stem),
            processed.thumbnail_ext,
        );
        self.write_media(&thumb_path, &processed.thumbnail).await?;

        self.storage
            .insert_image_meta(image_file::ActiveModel {
                uploaded_file_id: Set(record.id),
                original_width: Set(processed.original_width as i32),
                original_height: Set(processed.original_height as i32),
                width: Set(processed.width as i32),
                height: Set(processed.height as i32),
                format: Set(processed.format),
                quality: Set(self.uploads.jpeg_quality as i32),
                thumbnail_path: Set(Some(thumb_path)),
                has_transparency: Set(processed.has_transparency),
                color_mode: Set(processed.color_mode),
                ..Default::default()
            })
            .await
    }

    async fn store_text(
        &self,
        record: &uploaded_file::Model,
        data: &[u8],
    ) -> Result<text_file::Model> {
        let analysis: TextAnalysis = processing::analyze_text(data);
        self.storage
            .insert_text_meta(text_file::ActiveModel {
                uploaded_file_id: Set(record.id),
                encoding: Set(analysis.encoding),
                line_count: Set(analysis.line_count),
                word_count: Set(analysis.word_count),
                character_count: Set(analysis.character_count),
                preview: Set(analysis.preview),
                is_valid_utf8: Set(analysis.is_valid_utf8),
                has_binary_content: Set(analysis.has_binary_content),
                ..Default::default()
            })
            .await
    }

    async fn log_upload(&self, file_id: i64, level: &str, message: &str, details: &str) {
        if let Err(e) = self
            .storage
            .insert_upload_log(file_id, level, message, details)
            .await
        {
            warn!("Failed to write upload log for file {}: {}", file_id, e);
        }
    }

    async fn upload_result(&self, file: &uploaded_file::Model) -> Result<UploadResult> {
        let image = self.storage.find_image_meta(file.id).await?;
        let text = self.storage.find_text_meta(file.id).await?;
        Ok(UploadResult::new(file, image.as_ref(), text.as_ref()))
    }

    /// 批量上传：先整体校验，再逐个处理；单个失败不影响其余文件
    pub async fn process_bulk(
        &self,
        files: Vec<IncomingFile>,
        client: &ClientInfo,
    ) -> Result<BulkUploadReport> {
        if files.is_empty() {
            return Err(CommentaryError::validation("No files were submitted"));
        }
        if files.len() > MAX_BULK_FILES {
            return Err(CommentaryError::validation(format!(
                "Ensure this field has no more than {} elements.",
                MAX_BULK_FILES
            )));
        }
        for file in &files {
            self.validate(file)?;
        }

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let name = file.name.clone();
            match self.process_upload(file, client).await {
                Ok(result) => results.push(BulkUploadItem {
                    success: true,
                    file: Some(result),
                    error: None,
                }),
                Err(e) => {
                    warn!("Bulk upload of {} failed: {}", name, e);
                    results.push(BulkUploadItem {
                        success: false,
                        file: None,
                        error: Some(e.message().to_string()),
                    })
                }
            }
        }

        let uploaded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - uploaded;
        Ok(BulkUploadReport {
            results,
            uploaded,
            failed,
        })
    }

    pub async fn list(
        &self,
        filter: &FileFilter,
        ordering: FileOrdering,
        page: u64,
        page_size: u64,
    ) -> Result<Page<FileView>> {
        let page = page.max(1);
        let (files, count) = self
            .storage
            .list_files(filter, ordering, page, page_size)
            .await?;
        Ok(Page {
            count,
            page,
            page_size,
            results: files.iter().map(FileView::from).collect(),
        })
    }

    async fn completed(&self, id: i64) -> Result<uploaded_file::Model> {
        self.storage
            .find_completed_file(id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("File not found"))
    }

    pub async fn detail(&self, id: i64) -> Result<FileDetail> {
        let file = self.completed(id).await?;
        let image = self.storage.find_image_meta(id).await?;
        let text = self.storage.find_text_meta(id).await?;
        Ok(FileDetail {
            file: FileView::from(&file),
            checksum: file.checksum.clone(),
            image: image.as_ref().map(ImageDataView::from),
            text: text.as_ref().map(TextDataView::from),
        })
    }

    pub async fn download(&self, id: i64) -> Result<FileContent> {
        let file = self.completed(id).await?;
        let body = tokio::fs::read(self.absolute(&file.file_path))
            .await
            .map_err(|_| CommentaryError::not_found("File not found on disk"))?;
        let content_type = if file.mime_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            file.mime_type.clone()
        };
        Ok(FileContent {
            filename: file.original_name,
            content_type,
            body,
        })
    }

    pub async fn thumbnail(&self, id: i64) -> Result<FileContent> {
        let file = self.completed(id).await?;
        if file.file_type != TYPE_IMAGE {
            return Err(CommentaryError::validation("File is not an image"));
        }
        let image = self
            .storage
            .find_image_meta(id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("Image metadata not found"))?;
        let thumb_path = image
            .thumbnail_path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CommentaryError::not_found("Thumbnail not available"))?;
        let body = tokio::fs::read(self.absolute(&thumb_path))
            .await
            .map_err(|_| CommentaryError::not_found("Thumbnail not available"))?;
        let content_type = if thumb_path.ends_with(".png") {
            "image/png"
        } else {
            "image/jpeg"
        };
        Ok(FileContent {
            filename: format!("thumb_{}", file.original_name),
            content_type: content_type.to_string(),
            body,
        })
    }

    pub async fn preview(&self, id: i64) -> Result<TextPreview> {
        let file = self.completed(id).await?;
        if file.file_type != TYPE_TEXT {
            return Err(CommentaryError::validation("File is not a text file"));
        }
        let text = self
            .storage
            .find_text_meta(id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("Text metadata not found"))?;
        Ok(TextPreview {
            preview: text.preview,
            encoding: text.encoding,
            line_count: text.line_count,
            word_count: text.word_count,
            character_count: text.character_count,
        })
    }

    /// 已完成文件统计（缓存 10 分钟）
    pub async fn stats(&self) -> Result<Arc<FileStats>> {
        if let Some(cached) = self.stats_cache.get(&()).await {
            return Ok(cached);
        }
        let agg = self
            .storage
            .file_aggregates(Utc::now() - Duration::days(7))
            .await?;
        let stats = Arc::new(FileStats {
            total_files: agg.total_files,
            total_size: agg.total_size,
            total_size_display: format_size(agg.total_size),
            files_by_type: agg.files_by_type,
            files_this_week: agg.files_this_week,
            average_file_size: (agg.average_file_size * 100.0).round() / 100.0,
            largest_file: agg.largest.map(|f| LargestFile {
                name: f.original_name,
                size: f.file_size,
                file_type: f.file_type,
            }),
            most_recent_upload: agg.most_recent.map(|f| RecentUpload {
                name: f.original_name,
                uploaded_at: f.created_at,
                file_type: f.file_type,
            }),
        });
        self.stats_cache.insert((), stats.clone()).await;
        Ok(stats)
    }

    /// 删除早于 `days` 天的文件，以及 1 天前失败的上传（记录与磁盘文件）
    pub async fn cleanup(&self, days: i64) -> Result<CleanupResult> {
        if days < 1 {
            return Err(CommentaryError::validation("Days must be a positive integer"));
        }
        let now = Utc::now();
        let cutoff = Duration::try_days(days)
            .and_then(|d| now.checked_sub_signed(d))
            .ok_or_else(|| CommentaryError::validation("Days is out of range"))?;

        let old = self.storage.files_created_before(cutoff, None).await?;
        let deleted_files = self.delete_with_media(&old).await?;

        let failed = self
            .storage
            .files_created_before(
                now - Duration::days(FAILED_UPLOAD_MAX_AGE_DAYS),
                Some(STATUS_FAILED),
            )
            .await?;
        let deleted_failed_uploads = self.delete_with_media(&failed).await?;

        self.stats_cache.invalidate_all();
        info!(
            "File cleanup: {} old files, {} failed uploads removed",
            deleted_files, deleted_failed_uploads
        );
        Ok(CleanupResult {
            message: format!("Cleaned up {} old files", deleted_files),
            deleted_files,
            deleted_failed_uploads,
        })
    }

    async fn delete_with_media(&self, files: &[uploaded_file::Model]) -> Result<u64> {
        if files.is_empty() {
            return Ok(0);
        }
        for file in files {
            if let Some(image) = self.storage.find_image_meta(file.id).await?
                && let Some(ref thumb) = image.thumbnail_path
            {
                self.remove_media(thumb).await;
            }
            self.remove_media(&file.file_path).await;
        }
        let ids: Vec<i64> = files.iter().map(|f| f.id).collect();
        self.storage.delete_files(&ids).await
    }

    /// 评论附件：逐个处理，失败只记录日志
    pub async fn attach_uploads(
        &self,
        files: Vec<IncomingFile>,
        client: &ClientInfo,
    ) -> Vec<UploadResult> {
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            let name = file.name.clone();
            match self.process_upload(file, client).await {
                Ok(result) => stored.push(result),
                Err(e) => warn!("Failed to process attachment {}: {}", name, e),
            }
        }
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dated_path_layout() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            FileService::dated_path("uploads", now, "abc", "png"),
            "uploads/2026/03/01/abc.png"
        );
        assert_eq!(
            FileService::dated_path("thumbnails", now, "abc_thumb", "jpg"),
            "thumbnails/2026/03/01/abc_thumb.jpg"
        );
    }

    #[test]
    fn test_image_view_reports_ratio_and_orientation() {
        let meta = image_file::Model {
            id: 1,
            uploaded_file_id: 7,
            original_width: 640,
            original_height: 480,
            width: 320,
            height: 240,
            format: "PNG".into(),
            quality: 85,
            thumbnail_path: Some("thumbnails/x_thumb.jpg".into()),
            has_transparency: false,
            color_mode: "RGB".into(),
        };
        let view = ImageDataView::from(&meta);
        assert_eq!(view.aspect_ratio, 1.33);
        assert_eq!(view.orientation, "landscape");
        assert_eq!(view.thumbnail_url.as_deref(), Some("/api/files/7/thumbnail/"));
    }
}
