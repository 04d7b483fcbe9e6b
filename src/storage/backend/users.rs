//! 用户、偏好设置与用户维度的评论聚合

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::info;

use super::{SeaOrmStorage, icontains, iexact};
use crate::errors::Result;

use migration::entities::{comment, comment_like, user, user_preference};

#[derive(Debug, Clone, FromQueryResult, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct TopCommenterRow {
    pub user_name: String,
    pub comment_count: i64,
    pub total_likes: Option<i64>,
}

/// 某用户名下活跃评论的 ID 子查询
fn active_comment_ids_of(username: &str) -> SelectStatement {
    Query::select()
        .column(comment::Column::Id)
        .from(comment::Entity)
        .and_where(comment::Column::UserName.eq(username))
        .and_where(comment::Column::IsActive.eq(true))
        .to_owned()
}

impl SeaOrmStorage {
    // ===== 用户 =====

    pub async fn find_user(&self, id: i64) -> Result<Option<user::Model>> {
        let db = &self.db;
        self.retrying("find_user", || user::Entity::find_by_id(id).one(db))
            .await
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<user::Model>> {
        let db = &self.db;
        let username = username.to_string();
        self.retrying("find_user_by_username", || {
            user::Entity::find()
                .filter(user::Column::Username.eq(username.clone()))
                .one(db)
        })
        .await
    }

    /// 邮箱是否已被其他用户占用（不区分大小写）
    pub async fn email_taken(&self, email: &str, exclude_user: Option<i64>) -> Result<bool> {
        let db = &self.db;
        let email = email.to_string();
        let count = self
            .retrying("email_taken", || {
                let mut query = user::Entity::find().filter(iexact(user::Column::Email, &email));
                if let Some(id) = exclude_user {
                    query = query.filter(user::Column::Id.ne(id));
                }
                query.count(db)
            })
            .await?;
        Ok(count > 0)
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool> {
        Ok(self.find_user_by_username(username).await?.is_some())
    }

    pub async fn insert_user(&self, model: user::ActiveModel) -> Result<user::Model> {
        let db = &self.db;
        let created = self
            .retrying("insert_user", || model.clone().insert(db))
            .await?;
        info!("User '{}' registered (id={})", created.username, created.id);
        Ok(created)
    }

    pub async fn update_user(&self, model: user::ActiveModel) -> Result<user::Model> {
        let db = &self.db;
        self.retrying("update_user", || model.clone().update(db))
            .await
    }

    pub async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let db = &self.db;
        self.retrying("touch_last_login", || {
            user::Entity::update_many()
                .col_expr(user::Column::LastLogin, Expr::value(Some(at)))
                .filter(user::Column::Id.eq(id))
                .exec(db)
        })
        .await?;
        Ok(())
    }

    /// 写入缓存在用户行上的评论计数
    pub async fn store_user_counters(
        &self,
        id: i64,
        comments_count: i64,
        likes_received: i64,
        last_comment_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let db = &self.db;
        self.retrying("store_user_counters", || {
            user::Entity::update_many()
                .col_expr(user::Column::CommentsCount, Expr::value(comments_count))
                .col_expr(user::Column::LikesReceived, Expr::value(likes_received))
                .col_expr(user::Column::LastCommentAt, Expr::value(last_comment_at))
                .filter(user::Column::Id.eq(id))
                .exec(db)
        })
        .await?;
        Ok(())
    }

    /// 按用户名 / 姓名模糊搜索活跃用户
    pub async fn search_users(&self, query: &str, limit: u64) -> Result<Vec<user::Model>> {
        let db = &self.db;
        let needle = query.to_string();
        self.retrying("search_users", || {
            user::Entity::find()
                .filter(
                    Condition::any()
                        .add(icontains(user::Column::Username, &needle))
                        .add(icontains(user::Column::FirstName, &needle))
                        .add(icontains(user::Column::LastName, &needle)),
                )
                .filter(user::Column::IsActive.eq(true))
                .order_by_asc(user::Column::Username)
                .limit(limit)
                .all(db)
        })
        .await
    }

    // ===== 偏好设置 =====

    pub async fn find_preferences(&self, user_id: i64) -> Result<Option<user_preference::Model>> {
        let db = &self.db;
        self.retrying("find_preferences", || {
            user_preference::Entity::find()
                .filter(user_preference::Column::UserId.eq(user_id))
                .one(db)
        })
        .await
    }

    /// 读取偏好设置，不存在时按默认值创建
    pub async fn get_or_create_preferences(&self, user_id: i64) -> Result<user_preference::Model> {
        if let Some(existing) = self.find_preferences(user_id).await? {
            return Ok(existing);
        }
        let db = &self.db;
        let now = Utc::now();
        let defaults = user_preference::ActiveModel {
            user_id: Set(user_id),
            theme: Set("light".to_string()),
            language: Set("en".to_string()),
            comments_per_page: Set(25),
            email_on_reply: Set(true),
            email_on_like: Set(false),
            email_digest: Set("weekly".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        match self
            .retrying("create_preferences", || defaults.clone().insert(db))
            .await
        {
            Ok(created) => Ok(created),
            // 并发创建时读取对方写入的行
            Err(crate::errors::CommentaryError::Conflict(_)) => self
                .find_preferences(user_id)
                .await?
                .ok_or_else(|| crate::errors::CommentaryError::internal("preferences vanished")),
            Err(e) => Err(e),
        }
    }

    pub async fn update_preferences(
        &self,
        model: user_preference::ActiveModel,
    ) -> Result<user_preference::Model> {
        let db = &self.db;
        self.retrying("update_preferences", || model.clone().update(db))
            .await
    }

    // ===== 用户维度的评论聚合 =====

    pub async fn count_user_comments(&self, username: &str) -> Result<u64> {
        let db = &self.db;
        let username = username.to_string();
        self.retrying("count_user_comments", || {
            comment::Entity::find()
                .filter(comment::Column::UserName.eq(username.clone()))
                .filter(comment::Column::IsActive.eq(true))
                .count(db)
        })
        .await
    }

    /// 用户活跃评论收到的点赞总数
    pub async fn count_likes_received(&self, username: &str) -> Result<u64> {
        let db = &self.db;
        self.retrying("count_likes_received", || {
            comment_like::Entity::find()
                .filter(comment_like::Column::CommentId.in_subquery(active_comment_ids_of(username)))
                .count(db)
        })
        .await
    }

    /// 用户活跃评论收到的活跃回复数
    pub async fn count_replies_received(&self, username: &str) -> Result<u64> {
        let db = &self.db;
        self.retrying("count_replies_received", || {
            comment::Entity::find()
                .filter(comment::Column::IsActive.eq(true))
                .filter(comment::Column::ParentId.in_subquery(active_comment_ids_of(username)))
                .count(db)
        })
        .await
    }

    pub async fn most_liked_comment_of(&self, username: &str) -> Result<Option<comment::Model>> {
        let db = &self.db;
        let username = username.to_string();
        self.retrying("most_liked_comment_of", || {
            comment::Entity::find()
                .filter(comment::Column::UserName.eq(username.clone()))
                .filter(comment::Column::IsActive.eq(true))
                .order_by_desc(comment::Column::LikesCount)
                .order_by_desc(comment::Column::CreatedAt)
                .one(db)
        })
        .await
    }

    pub async fn recent_comments_of(
        &self,
        username: &str,
        limit: u64,
    ) -> Result<Vec<comment::Model>> {
        let db = &self.db;
        let username = username.to_string();
        self.retrying("recent_comments_of", || {
            comment::Entity::find()
                .filter(comment::Column::UserName.eq(username.clone()))
                .filter(comment::Column::IsActive.eq(true))
                .order_by_desc(comment::Column::CreatedAt)
                .limit(limit)
                .all(db)
        })
        .await
    }

    /// 用户最近收到的点赞及对应评论
    pub async fn recent_likes_received(
        &self,
        username: &str,
        limit: u64,
    ) -> Result<Vec<(comment_like::Model, comment::Model)>> {
        let db = &self.db;
        let likes = self
            .retrying("recent_likes_received", || {
                comment_like::Entity::find()
                    .filter(
                        comment_like::Column::CommentId
                            .in_subquery(active_comment_ids_of(username)),
                    )
                    .order_by_desc(comment_like::Column::CreatedAt)
                    .limit(limit)
                    .all(db)
            })
            .await?;
        if likes.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = likes.iter().map(|l| l.comment_id).collect();
        let comments = self
            .retrying("recent_likes_received.comments", || {
                comment::Entity::find()
                    .filter(comment::Column::Id.is_in(ids.clone()))
                    .all(db)
            })
            .await?;

        Ok(likes
            .into_iter()
            .filter_map(|like| {
                comments
                    .iter()
                    .find(|c| c.id == like.comment_id)
                    .cloned()
                    .map(|c| (like, c))
            })
            .collect())
    }

    pub async fn last_comment_at(&self, username: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .recent_comments_of(username, 1)
            .await?
            .into_iter()
            .next()
            .map(|c| c.created_at))
    }

    /// 按时间段统计评论最多的用户名
    pub async fn top_commenters(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u64,
    ) -> Result<Vec<TopCommenterRow>> {
        let db = &self.db;
        self.retrying("top_commenters", || {
            let mut query = comment::Entity::find()
                .select_only()
                .column(comment::Column::UserName)
                .column_as(comment::Column::Id.count(), "comment_count")
                .column_as(comment::Column::LikesCount.sum(), "total_likes")
                .filter(comment::Column::IsActive.eq(true));
            if let Some(since) = since {
                query = query.filter(comment::Column::CreatedAt.gte(since));
            }
            query
                .group_by(comment::Column::UserName)
                .order_by_desc(comment::Column::Id.count())
                .order_by_desc(comment::Column::LikesCount.sum())
                .order_by_asc(comment::Column::UserName)
                .limit(limit)
                .into_model::<TopCommenterRow>()
                .all(db)
        })
        .await
    }
}
