use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::Utc;

use super::{paginate, MemoryStore};
use crate::database::manager::DatabaseError;
use crate::database::models::{NewVideo, Video, VideoFilter, VideoOrder, VideoTotals};
use crate::database::repository::{DbResult, VideoRepo};
use crate::filter::{contains_keyword, PageRequest};

fn matches(video: &Video, filter: &VideoFilter) -> bool {
    if filter.author_user_id.is_some_and(|id| id != video.author_user_id) {
        return false;
    }
    if filter.status.is_some_and(|s| s != video.status) {
        return false;
    }
    if filter.category.as_deref().is_some_and(|c| c != video.category) {
        return false;
    }
    if filter.difficulty.is_some_and(|d| d != video.difficulty) {
        return false;
    }
    match filter.keyword.as_deref() {
        Some(kw) => {
            contains_keyword(Some(&video.title), kw)
                || contains_keyword(Some(&video.description), kw)
                || contains_keyword(Some(&video.author_snapshot_name), kw)
        }
        None => true,
    }
}

#[async_trait]
impl VideoRepo for MemoryStore {
    async fn create_video(&self, new: NewVideo) -> DbResult<Video> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let video = Video {
            id,
            author_user_id: new.author_user_id,
            title: new.title,
            description: new.description,
            category: new.category,
            tags: new.tags,
            target_audience: new.target_audience,
            difficulty: new.difficulty,
            file_name: new.file_name,
            file_size_bytes: new.file_size_bytes,
            storage_path: new.storage_path,
            status: new.status,
            rejection_reason: None,
            author_snapshot_name: new.author_snapshot_name,
            author_snapshot_hospital: new.author_snapshot_hospital,
            author_snapshot_title: new.author_snapshot_title,
            view_count: 0,
            like_count: 0,
            download_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.videos.insert(id, video.clone());
        Ok(video)
    }

    async fn find_video(&self, id: i64) -> DbResult<Option<Video>> {
        Ok(self.tables.read().await.videos.get(&id).cloned())
    }

    async fn list_videos(&self, filter: &VideoFilter, page: PageRequest) -> DbResult<(Vec<Video>, i64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Video> = tables
            .videos
            .values()
            .filter(|v| matches(v, filter))
            .cloned()
            .collect();
        let newest = |v: &Video| Reverse((v.created_at, v.id));
        match filter.order {
            VideoOrder::CreatedAt => rows.sort_by_key(newest),
            VideoOrder::ViewCount => rows.sort_by_key(|v| (Reverse(v.view_count), newest(v))),
            VideoOrder::LikeCount => rows.sort_by_key(|v| (Reverse(v.like_count), newest(v))),
        }
        Ok(paginate(rows, page))
    }

    async fn update_video(&self, video: &Video) -> DbResult<Video> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .videos
            .get_mut(&video.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("video {}", video.id)))?;
        stored.title = video.title.clone();
        stored.description = video.description.clone();
        stored.category = video.category.clone();
        stored.tags = video.tags.clone();
        stored.target_audience = video.target_audience.clone();
        stored.difficulty = video.difficulty;
        stored.status = video.status;
        stored.rejection_reason = video.rejection_reason.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_video(&self, id: i64) -> DbResult<()> {
        self.tables.write().await.videos.remove(&id);
        Ok(())
    }

    async fn increment_video_views(&self, id: i64) -> DbResult<()> {
        if let Some(video) = self.tables.write().await.videos.get_mut(&id) {
            video.view_count += 1;
        }
        Ok(())
    }

    async fn video_totals(&self, author_user_id: i64) -> DbResult<VideoTotals> {
        let tables = self.tables.read().await;
        Ok(tables
            .videos
            .values()
            .filter(|v| v.author_user_id == author_user_id)
            .fold(VideoTotals::default(), |mut totals, v| {
                totals.video_count += 1;
                totals.total_views += v.view_count;
                totals.total_likes += v.like_count;
                totals
            }))
    }
}
