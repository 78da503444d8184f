use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use super::PgStore;
use crate::database::models::{
    Category, ForumCounts, NewPost, NewReply, Post, PostFilter, PostPriority, PostSort, PostStatus,
    PostView, Reply, ReplyView,
};
use crate::database::repository::{DbResult, ForumRepo};
use crate::filter::{like_pattern, PageRequest};

const POST_VIEW_SELECT: &str = "SELECT p.*, u.role AS author_role, \
     NULLIF(btrim(dp.name), '') AS author_name, c.name AS category_name, \
     (SELECT COUNT(*) FROM forum_replies r WHERE r.post_id = p.id) AS replies, \
     (SELECT COUNT(*) FROM forum_post_likes l WHERE l.post_id = p.id) AS likes, \
     p.views_count::BIGINT AS views";

const POST_VIEW_FROM: &str = " FROM forum_posts p \
     JOIN users u ON u.id = p.author_user_id \
     LEFT JOIN doctor_profiles dp ON dp.user_id = p.author_user_id \
     LEFT JOIN forum_categories c ON c.id = p.category_id";

fn filtered<'a>(head: &str, filter: &'a PostFilter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(POST_VIEW_FROM).push(" WHERE 1=1");
    if let Some(category) = filter.category_id {
        qb.push(" AND p.category_id = ").push_bind(category);
    }
    if let Some(keyword) = filter.keyword.as_deref() {
        let pattern = like_pattern(keyword);
        qb.push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND p.priority = ").push_bind(priority.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status.as_str());
    }
    if let Some(tag) = filter.tag.as_deref() {
        qb.push(" AND ").push_bind(tag).push(" = ANY(p.tags)");
    }
    if let Some(official) = filter.has_official_reply {
        qb.push(" AND p.has_official_reply = ").push_bind(official);
    }
    qb
}

#[async_trait]
impl ForumRepo for PgStore {
    async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT * FROM forum_categories ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> DbResult<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>("SELECT * FROM forum_categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(category)
    }

    async fn create_post(&self, new: NewPost) -> DbResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            "INSERT INTO forum_posts (author_user_id, category_id, title, content, tags) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new.author_user_id)
        .bind(new.category_id)
        .bind(new.title)
        .bind(new.content)
        .bind(new.tags)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn find_post(&self, id: i64) -> DbResult<Option<PostView>> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_VIEW_SELECT);
        qb.push(POST_VIEW_FROM).push(" WHERE p.id = ").push_bind(id);
        let post = qb
            .build_query_as::<PostView>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        page: PageRequest,
    ) -> DbResult<(Vec<PostView>, i64)> {
        let total: i64 = filtered("SELECT COUNT(*)", filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = filtered(POST_VIEW_SELECT, filter);
        qb.push(match sort {
            PostSort::Created => " ORDER BY p.created_at DESC, p.id DESC",
            PostSort::LatestReply => {
                " ORDER BY p.last_reply_at DESC NULLS LAST, p.created_at DESC, p.id DESC"
            }
            PostSort::MostLiked => " ORDER BY likes DESC, p.created_at DESC, p.id DESC",
            PostSort::MostReplied => " ORDER BY replies DESC, p.created_at DESC, p.id DESC",
        });
        qb.push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb.build_query_as::<PostView>().fetch_all(&self.pool).await?;

        Ok((items, total))
    }

    async fn increment_post_views(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE forum_posts SET views_count = views_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_post_status(&self, id: i64, status: PostStatus) -> DbResult<()> {
        sqlx::query("UPDATE forum_posts SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_post_priority(&self, id: i64, priority: PostPriority) -> DbResult<()> {
        sqlx::query("UPDATE forum_posts SET priority = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(priority.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch_post_reply(&self, id: i64, at: DateTime<Utc>, official: bool) -> DbResult<()> {
        sqlx::query(
            "UPDATE forum_posts SET last_reply_at = $2, \
                 has_official_reply = has_official_reply OR $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .bind(official)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_post(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM forum_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn forum_counts(&self) -> DbResult<ForumCounts> {
        let counts = sqlx::query_as::<_, ForumCounts>(
            "SELECT COUNT(*) AS total, \
                 COUNT(*) FILTER (WHERE status = 'OPEN') AS open, \
                 COUNT(*) FILTER (WHERE status = 'IN_PROGRESS') AS in_progress, \
                 COUNT(*) FILTER (WHERE status = 'RESOLVED') AS resolved \
             FROM forum_posts",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn create_reply(&self, new: NewReply) -> DbResult<Reply> {
        let reply = sqlx::query_as::<_, Reply>(
            "INSERT INTO forum_replies (post_id, author_user_id, parent_reply_id, content, is_official) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new.post_id)
        .bind(new.author_user_id)
        .bind(new.parent_reply_id)
        .bind(new.content)
        .bind(new.is_official)
        .fetch_one(&self.pool)
        .await?;
        Ok(reply)
    }

    async fn find_reply(&self, id: i64) -> DbResult<Option<Reply>> {
        let reply = sqlx::query_as::<_, Reply>("SELECT * FROM forum_replies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reply)
    }

    async fn list_replies(&self, post_id: i64, page: PageRequest) -> DbResult<(Vec<ReplyView>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM forum_replies WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;

        let items = sqlx::query_as::<_, ReplyView>(
            "SELECT r.*, u.role AS author_role, NULLIF(btrim(dp.name), '') AS author_name \
             FROM forum_replies r \
             JOIN users u ON u.id = r.author_user_id \
             LEFT JOIN doctor_profiles dp ON dp.user_id = r.author_user_id \
             WHERE r.post_id = $1 \
             ORDER BY r.created_at ASC, r.id ASC LIMIT $2 OFFSET $3",
        )
        .bind(post_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    async fn delete_reply(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM forum_replies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM forum_post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            sqlx::query(
                "INSERT INTO forum_post_likes (post_id, user_id) VALUES ($1, $2) \
                 ON CONFLICT (post_id, user_id) DO NOTHING",
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(removed == 0)
    }
}
