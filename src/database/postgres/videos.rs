use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::PgStore;
use crate::database::models::{NewVideo, Video, VideoFilter, VideoOrder, VideoTotals};
use crate::database::repository::{DbResult, VideoRepo};
use crate::filter::{like_pattern, PageRequest};

fn filtered<'a>(head: &str, filter: &'a VideoFilter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(" FROM videos WHERE 1=1");
    if let Some(author) = filter.author_user_id {
        qb.push(" AND author_user_id = ").push_bind(author);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category) = filter.category.as_deref() {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(difficulty) = filter.difficulty {
        qb.push(" AND difficulty = ").push_bind(difficulty.as_str());
    }
    if let Some(keyword) = filter.keyword.as_deref() {
        let pattern = like_pattern(keyword);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR author_snapshot_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb
}

#[async_trait]
impl VideoRepo for PgStore {
    async fn create_video(&self, new: NewVideo) -> DbResult<Video> {
        let video = sqlx::query_as::<_, Video>(
            "INSERT INTO videos \
                 (author_user_id, title, description, category, tags, target_audience, difficulty, \
                  file_name, file_size_bytes, storage_path, status, author_snapshot_name, \
                  author_snapshot_hospital, author_snapshot_title) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING *",
        )
        .bind(new.author_user_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.category)
        .bind(new.tags)
        .bind(new.target_audience)
        .bind(new.difficulty.as_str())
        .bind(new.file_name)
        .bind(new.file_size_bytes)
        .bind(new.storage_path)
        .bind(new.status.as_str())
        .bind(new.author_snapshot_name)
        .bind(new.author_snapshot_hospital)
        .bind(new.author_snapshot_title)
        .fetch_one(&self.pool)
        .await?;
        Ok(video)
    }

    async fn find_video(&self, id: i64) -> DbResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(video)
    }

    async fn list_videos(&self, filter: &VideoFilter, page: PageRequest) -> DbResult<(Vec<Video>, i64)> {
        let total: i64 = filtered("SELECT COUNT(*)", filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = filtered("SELECT *", filter);
        qb.push(match filter.order {
            VideoOrder::CreatedAt => " ORDER BY created_at DESC, id DESC",
            VideoOrder::ViewCount => " ORDER BY view_count DESC, created_at DESC, id DESC",
            VideoOrder::LikeCount => " ORDER BY like_count DESC, created_at DESC, id DESC",
        });
        qb.push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb.build_query_as::<Video>().fetch_all(&self.pool).await?;

        Ok((items, total))
    }

    async fn update_video(&self, video: &Video) -> DbResult<Video> {
        let updated = sqlx::query_as::<_, Video>(
            "UPDATE videos SET title = $2, description = $3, category = $4, tags = $5, \
                 target_audience = $6, difficulty = $7, status = $8, rejection_reason = $9, \
                 updated_at = now() \
             WHERE id = $1 RETURNING *",
        )
        .bind(video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.category)
        .bind(&video.tags)
        .bind(&video.target_audience)
        .bind(video.difficulty.as_str())
        .bind(video.status.as_str())
        .bind(&video.rejection_reason)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_video(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_video_views(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE videos SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn video_totals(&self, author_user_id: i64) -> DbResult<VideoTotals> {
        let totals = sqlx::query_as::<_, VideoTotals>(
            "SELECT COUNT(*) AS video_count, \
                 COALESCE(SUM(view_count), 0)::BIGINT AS total_views, \
                 COALESCE(SUM(like_count), 0)::BIGINT AS total_likes \
             FROM videos WHERE author_user_id = $1",
        )
        .bind(author_user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }
}
