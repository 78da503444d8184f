use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

text_enum!(VideoStatus {
    Uploading => "uploading",
    Processing => "processing",
    Review => "review",
    Published => "published",
    Rejected => "rejected",
});

text_enum!(Difficulty {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub author_user_id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub target_audience: Vec<String>,
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    pub file_name: String,
    pub file_size_bytes: i64,
    #[serde(skip_serializing)]
    pub storage_path: String,
    #[sqlx(try_from = "String")]
    pub status: VideoStatus,
    pub rejection_reason: Option<String>,
    pub author_snapshot_name: String,
    pub author_snapshot_hospital: String,
    pub author_snapshot_title: String,
    pub view_count: i64,
    pub like_count: i64,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn is_published(&self) -> bool {
        self.status == VideoStatus::Published
    }
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub author_user_id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub target_audience: Vec<String>,
    pub difficulty: Difficulty,
    pub file_name: String,
    pub file_size_bytes: i64,
    pub storage_path: String,
    pub status: VideoStatus,
    pub author_snapshot_name: String,
    pub author_snapshot_hospital: String,
    pub author_snapshot_title: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VideoOrder {
    #[default]
    CreatedAt,
    ViewCount,
    LikeCount,
}

#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    pub author_user_id: Option<i64>,
    pub status: Option<VideoStatus>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Matched against title, description and author name.
    pub keyword: Option<String>,
    pub order: VideoOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VideoTotals {
    pub video_count: i64,
    pub total_views: i64,
    pub total_likes: i64,
}
