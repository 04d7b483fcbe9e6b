//! 评论、点赞、附件与验证码的数据库操作

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, info};

use super::{SeaOrmStorage, icontains, iexact};
use crate::errors::{CommentaryError, Result};

use migration::entities::{captcha_token, comment, comment_file, comment_like};

/// 评论列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub min_likes: Option<i64>,
    pub has_replies: Option<bool>,
    pub has_files: Option<bool>,
    pub text_contains: Option<String>,
    pub search: Option<String>,
}

impl CommentFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(ref name) = self.user_name {
            condition = condition.add(icontains(comment::Column::UserName, name));
        }
        if let Some(ref email) = self.email {
            condition = condition.add(iexact(comment::Column::Email, email));
        }
        if let Some(after) = self.created_after {
            condition = condition.add(comment::Column::CreatedAt.gte(after));
        }
        if let Some(before) = self.created_before {
            condition = condition.add(comment::Column::CreatedAt.lte(before));
        }
        if let Some(min) = self.min_likes {
            condition = condition.add(comment::Column::LikesCount.gte(min));
        }
        match self.has_replies {
            Some(true) => condition = condition.add(comment::Column::RepliesCount.gt(0)),
            Some(false) => condition = condition.add(comment::Column::RepliesCount.eq(0)),
            None => {}
        }
        if let Some(has_files) = self.has_files {
            let with_files = Query::select()
                .column(comment_file::Column::CommentId)
                .from(comment_file::Entity)
                .to_owned();
            condition = if has_files {
                condition.add(comment::Column::Id.in_subquery(with_files))
            } else {
                condition.add(comment::Column::Id.not_in_subquery(with_files))
            };
        }
        if let Some(ref text) = self.text_contains {
            condition = condition.add(icontains(comment::Column::SanitizedText, text));
        }
        if let Some(ref search) = self.search {
            condition = condition.add(
                Condition::any()
                    .add(icontains(comment::Column::UserName, search))
                    .add(icontains(comment::Column::SanitizedText, search)),
            );
        }

        condition
    }
}

/// 评论排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSortField {
    CreatedAt,
    UserName,
    LikesCount,
}

/// 评论排序（`created_at` / `-likes_count` 形式）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentOrdering {
    pub field: CommentSortField,
    pub descending: bool,
}

impl Default for CommentOrdering {
    fn default() -> Self {
        Self {
            field: CommentSortField::CreatedAt,
            descending: true,
        }
    }
}

impl CommentOrdering {
    /// 解析排序参数，未知字段回退到默认的 `-created_at`
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "created_at" => CommentSortField::CreatedAt,
            "user_name" => CommentSortField::UserName,
            "likes_count" => CommentSortField::LikesCount,
            _ => return Self::default(),
        };
        Self { field, descending }
    }

    fn column(&self) -> comment::Column {
        match self.field {
            CommentSortField::CreatedAt => comment::Column::CreatedAt,
            CommentSortField::UserName => comment::Column::UserName,
            CommentSortField::LikesCount => comment::Column::LikesCount,
        }
    }
}

/// 评论汇总统计（不含活跃用户列表）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentStatsRow {
    pub total_comments: u64,
    pub total_replies: u64,
    pub comments_this_week: u64,
    pub average_replies_per_comment: f64,
    pub most_liked_comment_id: Option<i64>,
}

#[derive(Debug, Clone, FromQueryResult, serde::Serialize)]
pub struct UserCommentCountRow {
    pub user_name: String,
    pub comment_count: i64,
}

#[derive(Debug, FromQueryResult)]
struct RepliesSumRow {
    top_level: i64,
    replies: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct FileCountRow {
    comment_id: i64,
    files: i64,
}

impl SeaOrmStorage {
    // ===== 评论查询 =====

    /// 顶层活跃评论分页（COUNT 带缓存）
    pub async fn list_comments(
        &self,
        filter: &CommentFilter,
        ordering: CommentOrdering,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<comment::Model>, u64)> {
        let db = &self.db;
        let query = comment::Entity::find()
            .filter(comment::Column::IsActive.eq(true))
            .filter(comment::Column::ParentId.is_null())
            .filter(filter.condition());

        let cache_key = format!("comments:{:?}", filter);
        let count_query = query.clone();
        let total = self
            .cached_count(cache_key, || async {
                self.retrying("list_comments.count", || count_query.clone().count(db))
                    .await
            })
            .await?;

        let ordered = if ordering.descending {
            query.order_by_desc(ordering.column())
        } else {
            query.order_by_asc(ordering.column())
        }
        .order_by_desc(comment::Column::Id);

        let page_index = page.saturating_sub(1);
        let items = self
            .retrying("list_comments.page", || {
                let q = ordered.clone();
                async move { q.paginate(db, page_size.max(1)).fetch_page(page_index).await }
            })
            .await?;

        debug!("Loaded {} comments (page {}, total {})", items.len(), page, total);
        Ok((items, total))
    }

    pub async fn find_comment(&self, id: i64) -> Result<Option<comment::Model>> {
        let db = &self.db;
        self.retrying("find_comment", || comment::Entity::find_by_id(id).one(db))
            .await
    }

    pub async fn find_active_comment(&self, id: i64) -> Result<Option<comment::Model>> {
        Ok(self.find_comment(id).await?.filter(|c| c.is_active))
    }

    /// 到根评论的父级跳数
    pub async fn comment_depth(&self, comment: &comment::Model) -> Result<u32> {
        let mut depth = 0;
        let mut parent_id = comment.parent_id;
        while let Some(id) = parent_id {
            depth += 1;
            parent_id = match self.find_comment(id).await? {
                Some(parent) => parent.parent_id,
                None => None,
            };
        }
        Ok(depth)
    }

    /// 沿父链向上找到线程根评论
    pub async fn comment_root(&self, comment: &comment::Model) -> Result<comment::Model> {
        let mut current = comment.clone();
        while let Some(id) = current.parent_id {
            match self.find_comment(id).await? {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(current)
    }

    /// 给定父评论的活跃子评论（按创建时间升序）
    pub async fn active_children(&self, parent_ids: &[i64]) -> Result<Vec<comment::Model>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        let db = &self.db;
        let ids = parent_ids.to_vec();
        self.retrying("active_children", || {
            comment::Entity::find()
                .filter(comment::Column::ParentId.is_in(ids.clone()))
                .filter(comment::Column::IsActive.eq(true))
                .order_by_asc(comment::Column::CreatedAt)
                .order_by_asc(comment::Column::Id)
                .all(db)
        })
        .await
    }

    /// 存在活跃回复的评论 ID
    pub async fn ids_with_active_replies(&self, ids: &[i64]) -> Result<HashSet<i64>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let db = &self.db;
        let ids = ids.to_vec();
        let parents: Vec<Option<i64>> = self
            .retrying("ids_with_active_replies", || {
                comment::Entity::find()
                    .select_only()
                    .column(comment::Column::ParentId)
                    .filter(comment::Column::ParentId.is_in(ids.clone()))
                    .filter(comment::Column::IsActive.eq(true))
                    .distinct()
                    .into_tuple::<Option<i64>>()
                    .all(db)
            })
            .await?;
        Ok(parents.into_iter().flatten().collect())
    }

    pub async fn count_recent_comments_by_ip(&self, ip: &str, since: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;
        let ip = ip.to_string();
        self.retrying("count_recent_comments_by_ip", || {
            comment::Entity::find()
                .filter(comment::Column::IpAddress.eq(ip.clone()))
                .filter(comment::Column::CreatedAt.gte(since))
                .count(db)
        })
        .await
    }

    pub async fn trending_comments(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<comment::Model>> {
        let db = &self.db;
        self.retrying("trending_comments", || {
            comment::Entity::find()
                .filter(comment::Column::IsActive.eq(true))
                .filter(comment::Column::CreatedAt.gte(since))
                .order_by_desc(comment::Column::LikesCount)
                .order_by_desc(comment::Column::RepliesCount)
                .order_by_desc(comment::Column::CreatedAt)
                .limit(limit)
                .all(db)
        })
        .await
    }

    /// 全部活跃评论（热门内容汇总用）
    pub async fn active_comments(&self) -> Result<Vec<comment::Model>> {
        let db = &self.db;
        self.retrying("active_comments", || {
            comment::Entity::find()
                .filter(comment::Column::IsActive.eq(true))
                .order_by_asc(comment::Column::Id)
                .all(db)
        })
        .await
    }

    /// 某用户名（不区分大小写）的活跃评论，最新在前
    pub async fn comment_history(&self, user_name: &str, limit: u64) -> Result<Vec<comment::Model>> {
        let db = &self.db;
        let name = user_name.to_string();
        self.retrying("comment_history", || {
            comment::Entity::find()
                .filter(iexact(comment::Column::UserName, &name))
                .filter(comment::Column::IsActive.eq(true))
                .order_by_desc(comment::Column::CreatedAt)
                .limit(limit)
                .all(db)
        })
        .await
    }

    pub async fn comment_stats(&self, week_ago: DateTime<Utc>) -> Result<CommentStatsRow> {
        let db = &self.db;
        let active = comment::Entity::find().filter(comment::Column::IsActive.eq(true));

        let total_comments = self
            .retrying("comment_stats.total", || active.clone().count(db))
            .await?;
        let total_replies = self
            .retrying("comment_stats.replies", || {
                active
                    .clone()
                    .filter(comment::Column::ParentId.is_not_null())
                    .count(db)
            })
            .await?;
        let comments_this_week = self
            .retrying("comment_stats.week", || {
                active
                    .clone()
                    .filter(comment::Column::CreatedAt.gte(week_ago))
                    .count(db)
            })
            .await?;

        let replies = self
            .retrying("comment_stats.average", || {
                active
                    .clone()
                    .filter(comment::Column::ParentId.is_null())
                    .select_only()
                    .column_as(comment::Column::Id.count(), "top_level")
                    .column_as(comment::Column::RepliesCount.sum(), "replies")
                    .into_model::<RepliesSumRow>()
                    .one(db)
            })
            .await?;
        let average_replies_per_comment = match replies {
            Some(row) if row.top_level > 0 => {
                row.replies.unwrap_or(0) as f64 / row.top_level as f64
            }
            _ => 0.0,
        };

        let most_liked_comment_id = self
            .retrying("comment_stats.most_liked", || {
                active
                    .clone()
                    .select_only()
                    .column(comment::Column::Id)
                    .order_by_desc(comment::Column::LikesCount)
                    .order_by_asc(comment::Column::Id)
                    .into_tuple::<i64>()
                    .one(db)
            })
            .await?;

        Ok(CommentStatsRow {
            total_comments,
            total_replies,
            comments_this_week,
            average_replies_per_comment,
            most_liked_comment_id,
        })
    }

    /// 按活跃评论数排名的用户名
    pub async fn most_active_commenters(&self, limit: u64) -> Result<Vec<UserCommentCountRow>> {
        let db = &self.db;
        self.retrying("most_active_commenters", || {
            comment::Entity::find()
                .select_only()
                .column(comment::Column::UserName)
                .column_as(comment::Column::Id.count(), "comment_count")
                .filter(comment::Column::IsActive.eq(true))
                .group_by(comment::Column::UserName)
                .order_by_desc(comment::Column::Id.count())
                .order_by_asc(comment::Column::UserName)
                .limit(limit)
                .into_model::<UserCommentCountRow>()
                .all(db)
        })
        .await
    }

    // ===== 评论写入 =====

    pub async fn insert_comment(&self, model: comment::ActiveModel) -> Result<comment::Model> {
        let db = &self.db;
        let created = self
            .retrying("insert_comment", || model.clone().insert(db))
            .await?;
        self.invalidate_count_cache();
        info!("Comment {} created by '{}'", created.id, created.user_name);
        Ok(created)
    }

    /// 按实际子评论数重算 replies_count
    pub async fn refresh_replies_count(&self, parent_id: i64) -> Result<i64> {
        let db = &self.db;
        let replies = self
            .retrying("refresh_replies_count.count", || {
                comment::Entity::find()
                    .filter(comment::Column::ParentId.eq(parent_id))
                    .count(db)
            })
            .await? as i64;

        self.retrying("refresh_replies_count.update", || {
            comment::Entity::update_many()
                .col_expr(comment::Column::RepliesCount, Expr::value(replies))
                .filter(comment::Column::Id.eq(parent_id))
                .exec(db)
        })
        .await?;
        self.invalidate_count_cache();
        Ok(replies)
    }

    /// 写入点赞；同一 IP 重复点赞返回 Conflict
    pub async fn insert_like(&self, comment_id: i64, ip: &str, user_agent: &str) -> Result<()> {
        let db = &self.db;
        let like = comment_like::ActiveModel {
            comment_id: Set(comment_id),
            ip_address: Set(ip.to_string()),
            user_agent: Set(user_agent.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        self.retrying("insert_like", || like.clone().insert(db))
            .await
            .map(|_| ())
            .map_err(|e| match e {
                CommentaryError::Conflict(_) => {
                    CommentaryError::conflict("You have already liked this comment")
                }
                other => other,
            })
    }

    /// 按点赞记录数重算 likes_count
    pub async fn refresh_likes_count(&self, comment_id: i64) -> Result<i64> {
        let db = &self.db;
        let likes = self
            .retrying("refresh_likes_count.count", || {
                comment_like::Entity::find()
                    .filter(comment_like::Column::CommentId.eq(comment_id))
                    .count(db)
            })
            .await? as i64;

        self.retrying("refresh_likes_count.update", || {
            comment::Entity::update_many()
                .col_expr(comment::Column::LikesCount, Expr::value(likes))
                .filter(comment::Column::Id.eq(comment_id))
                .exec(db)
        })
        .await?;
        // min_likes 过滤的 COUNT 依赖 likes_count
        self.invalidate_count_cache();
        Ok(likes)
    }

    /// 标记为垃圾评论：隐藏并记录审核人
    pub async fn mark_comment_spam(
        &self,
        id: i64,
        moderator_id: Option<i64>,
    ) -> Result<comment::Model> {
        let db = &self.db;
        let existing = self
            .find_comment(id)
            .await?
            .ok_or_else(|| CommentaryError::not_found("Comment not found"))?;

        let now = Utc::now();
        let mut active: comment::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.is_moderated = Set(true);
        active.moderated_by = Set(moderator_id);
        active.moderated_at = Set(Some(now));
        active.updated_at = Set(now);

        let updated = self
            .retrying("mark_comment_spam", || active.clone().update(db))
            .await?;
        self.invalidate_count_cache();
        info!("Comment {} marked as spam", id);
        Ok(updated)
    }

    // ===== 附件 =====

    /// 一组评论的全部附件
    pub async fn files_for_comments(&self, comment_ids: &[i64]) -> Result<Vec<comment_file::Model>> {
        if comment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let db = &self.db;
        let ids = comment_ids.to_vec();
        self.retrying("files_for_comments", || {
            comment_file::Entity::find()
                .filter(comment_file::Column::CommentId.is_in(ids.clone()))
                .order_by_asc(comment_file::Column::Id)
                .all(db)
        })
        .await
    }

    /// 每条评论的附件数量
    pub async fn file_counts_for(&self, comment_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let db = &self.db;
        let ids = comment_ids.to_vec();
        let rows = self
            .retrying("file_counts_for", || {
                comment_file::Entity::find()
                    .select_only()
                    .column(comment_file::Column::CommentId)
                    .column_as(comment_file::Column::Id.count(), "files")
                    .filter(comment_file::Column::CommentId.is_in(ids.clone()))
                    .group_by(comment_file::Column::CommentId)
                    .into_model::<FileCountRow>()
                    .all(db)
            })
            .await?;
        Ok(rows.into_iter().map(|r| (r.comment_id, r.files)).collect())
    }

    pub async fn insert_comment_file(
        &self,
        model: comment_file::ActiveModel,
    ) -> Result<comment_file::Model> {
        let db = &self.db;
        self.retrying("insert_comment_file", || model.clone().insert(db))
            .await
    }

    // ===== 验证码 =====

    pub async fn insert_captcha(
        &self,
        model: captcha_token::ActiveModel,
    ) -> Result<captcha_token::Model> {
        let db = &self.db;
        self.retrying("insert_captcha", || model.clone().insert(db))
            .await
    }

    pub async fn find_captcha(&self, token: &str) -> Result<Option<captcha_token::Model>> {
        let db = &self.db;
        let token = token.to_string();
        self.retrying("find_captcha", || {
            captcha_token::Entity::find()
                .filter(captcha_token::Column::Token.eq(token.clone()))
                .one(db)
        })
        .await
    }

    /// 原子地消费验证码：仅当 used_at 为空时更新，返回是否成功
    pub async fn mark_captcha_used(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let db = &self.db;
        let result = self
            .retrying("mark_captcha_used", || {
                captcha_token::Entity::update_many()
                    .col_expr(captcha_token::Column::UsedAt, Expr::value(at))
                    .filter(captcha_token::Column::Id.eq(id))
                    .filter(captcha_token::Column::UsedAt.is_null())
                    .exec(db)
            })
            .await?;
        Ok(result.rows_affected == 1)
    }

    pub async fn delete_captchas_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;
        let result = self
            .retrying("delete_captchas_created_before", || {
                captcha_token::Entity::delete_many()
                    .filter(captcha_token::Column::CreatedAt.lt(cutoff))
                    .exec(db)
            })
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_parse() {
        assert_eq!(CommentOrdering::parse(None), CommentOrdering::default());
        assert_eq!(
            CommentOrdering::parse(Some("likes_count")),
            CommentOrdering {
                field: CommentSortField::LikesCount,
                descending: false
            }
        );
        assert_eq!(
            CommentOrdering::parse(Some("-user_name")),
            CommentOrdering {
                field: CommentSortField::UserName,
                descending: true
            }
        );
        assert_eq!(
            CommentOrdering::parse(Some("email")),
            CommentOrdering::default()
        );
    }

    #[test]
    fn test_filter_debug_differs_for_cache_key() {
        let a = CommentFilter {
            search: Some("rust".into()),
            ..Default::default()
        };
        let b = CommentFilter::default();
        assert_ne!(format!("{:?}", a), format!("{:?}", b));
    }
}
