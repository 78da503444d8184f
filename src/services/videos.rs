//! Expert course videos: doctor uploads and the published catalogue.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::validate;
use super::{Ack, ServiceError, ServiceResult};
use crate::auth::Identity;
use crate::authz::OwnershipGuard;
use crate::database::models::{
    Difficulty, NewVideo, Role, Video, VideoFilter, VideoOrder, VideoStatus,
};
use crate::database::repository::{AccountRepo, VideoRepo};
use crate::database::Store;
use crate::filter::{limits, normalize_keyword, Page, PageRequest};
use crate::uploads::{StoredFile, UploadForm, UploadStore};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub q: Option<String>,
    pub order_by: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub target_audience: Option<Vec<String>>,
    pub difficulty: Option<String>,
}

fn order(value: Option<&str>) -> VideoOrder {
    match value.map(str::trim) {
        Some("viewCount") => VideoOrder::ViewCount,
        Some("likeCount") => VideoOrder::LikeCount,
        _ => VideoOrder::CreatedAt,
    }
}

fn filter(query: &VideoQuery) -> ServiceResult<VideoFilter> {
    let difficulty = match query.difficulty.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Some(validate::parse_enum::<Difficulty>("difficulty", v)?),
        None => None,
    };
    Ok(VideoFilter {
        author_user_id: None,
        status: validate::status_filter("status", query.status.as_deref())?,
        category: query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        difficulty,
        keyword: normalize_keyword(query.q.as_deref()),
        order: order(query.order_by.as_deref()),
    })
}

#[derive(Clone)]
pub struct VideoService {
    store: Arc<dyn Store>,
    uploads: UploadStore,
    guard: OwnershipGuard,
}

impl VideoService {
    pub fn new(store: Arc<dyn Store>, uploads: UploadStore, conceal: bool) -> Self {
        Self {
            store,
            uploads,
            guard: OwnershipGuard::new(&[Role::SuperAdmin], conceal),
        }
    }

    /// Store a video from a multipart form whose single file is `file`.
    ///
    /// The uploaded file is removed again when the record cannot be written.
    pub async fn upload(&self, caller: &Identity, form: UploadForm) -> ServiceResult<Video> {
        let paths = form.take_paths();
        match self.insert(caller, &form).await {
            Ok(video) => Ok(video),
            Err(e) => {
                self.uploads.remove_all(paths).await;
                Err(e)
            }
        }
    }

    async fn insert(&self, caller: &Identity, form: &UploadForm) -> ServiceResult<Video> {
        let file: &StoredFile = match form.files.as_slice() {
            [file] => file,
            [] => return Err(ServiceError::invalid("file", "A video file is required")),
            _ => return Err(ServiceError::invalid("file", "Only one video file may be uploaded")),
        };
        let title = validate::text("title", form.text("title").unwrap_or_default(), 1, 150)?;
        let description = validate::text("description", form.text("description").unwrap_or_default(), 1, 5000)?;
        let category = validate::text("category", form.text("category").unwrap_or_default(), 1, 50)?;
        let tags = validate::list("tags", form.all("tags"), 10, 50)?;
        let target_audience = validate::list("targetAudience", form.all("targetAudience"), 10, 50)?;
        let difficulty = match form.text("difficulty").map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => validate::parse_enum("difficulty", v)?,
            None => Difficulty::Beginner,
        };

        let profile = self
            .store
            .find_doctor_profile(caller.id)
            .await?
            .ok_or_else(|| ServiceError::InvalidInput {
                message: "Doctor profile missing, complete profile first".to_string(),
                field: None,
            })?;
        let snapshot = |value: &str, fallback: &str| {
            if value.trim().is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        };

        let video = self
            .store
            .create_video(NewVideo {
                author_user_id: caller.id,
                title,
                description,
                category,
                tags,
                target_audience,
                difficulty,
                file_name: file.original_name.clone(),
                file_size_bytes: file.size as i64,
                storage_path: file.relative_path.clone(),
                status: VideoStatus::Published,
                author_snapshot_name: snapshot(&profile.name, "医生"),
                author_snapshot_hospital: snapshot(&profile.hospital, "医院"),
                author_snapshot_title: snapshot(profile.title.as_deref().unwrap_or_default(), "医师"),
            })
            .await?;
        info!(video = video.id, author = caller.id, bytes = file.size, "Video uploaded");
        Ok(video)
    }

    pub async fn mine(&self, caller: &Identity, query: VideoQuery) -> ServiceResult<Page<Video>> {
        let mut filter = filter(&query)?;
        filter.author_user_id = Some(caller.id);
        self.list(filter, &query).await
    }

    /// Published videos from every author.
    pub async fn courses(&self, query: VideoQuery) -> ServiceResult<Page<Video>> {
        let mut filter = filter(&query)?;
        filter.status = Some(VideoStatus::Published);
        self.list(filter, &query).await
    }

    async fn list(&self, filter: VideoFilter, query: &VideoQuery) -> ServiceResult<Page<Video>> {
        let page = PageRequest::resolve(query.page, query.page_size, limits::VIDEOS);
        let (items, total) = self.store.list_videos(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    /// Published videos are visible to everyone; others only to their author.
    pub async fn get(&self, caller: &Identity, id: i64) -> ServiceResult<Video> {
        let video = self.store.find_video(id).await?;
        match video {
            Some(video) if video.is_published() => Ok(video),
            other => self.guard.authorize(other, caller, "Video"),
        }
    }

    /// Catalogue detail; counts a view.
    pub async fn course_detail(&self, caller: &Identity, id: i64) -> ServiceResult<Video> {
        let mut video = self.course(caller, id).await?;
        self.store.increment_video_views(id).await?;
        video.view_count += 1;
        Ok(video)
    }

    /// Absolute path of the file behind a catalogue entry.
    pub async fn stream_path(&self, caller: &Identity, id: i64) -> ServiceResult<PathBuf> {
        let video = self.course(caller, id).await?;
        let path = self.uploads.absolute(&video.storage_path);
        if tokio::fs::metadata(&path).await.is_err() {
            warn!(video = id, path = %path.display(), "Video file missing on disk");
            return Err(ServiceError::not_found("Video file"));
        }
        Ok(path)
    }

    // Unpublished entries exist in the catalogue only for their author.
    async fn course(&self, caller: &Identity, id: i64) -> ServiceResult<Video> {
        match self.store.find_video(id).await? {
            Some(video) if video.is_published() || video.author_user_id == caller.id => Ok(video),
            _ => Err(ServiceError::not_found("Video")),
        }
    }

    pub async fn update(&self, caller: &Identity, id: i64, patch: VideoPatch) -> ServiceResult<Video> {
        let record = self.store.find_video(id).await?;
        let mut video = self.guard.authorize(record, caller, "Video")?;
        if let Some(title) = patch.title {
            video.title = validate::text("title", &title, 1, 150)?;
        }
        if let Some(description) = patch.description {
            video.description = validate::text("description", &description, 1, 5000)?;
        }
        if let Some(category) = patch.category {
            video.category = validate::text("category", &category, 1, 50)?;
        }
        if let Some(tags) = patch.tags {
            video.tags = validate::list("tags", &tags, 10, 50)?;
        }
        if let Some(audience) = patch.target_audience {
            video.target_audience = validate::list("targetAudience", &audience, 10, 50)?;
        }
        if let Some(difficulty) = patch.difficulty {
            video.difficulty = validate::parse_enum("difficulty", &difficulty)?;
        }
        Ok(self.store.update_video(&video).await?)
    }

    /// Removes the record, then the file best-effort.
    pub async fn delete(&self, caller: &Identity, id: i64) -> ServiceResult<Ack> {
        let record = self.store.find_video(id).await?;
        let video = self.guard.authorize(record, caller, "Video")?;
        self.store.delete_video(id).await?;
        self.uploads.remove(&video.storage_path).await;
        info!(video = id, by = caller.id, "Video deleted");
        Ok(Ack::ok("Video deleted"))
    }
}
