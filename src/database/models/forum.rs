use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::Role;

text_enum!(PostPriority {
    Low => "LOW",
    Normal => "NORMAL",
    High => "HIGH",
    Urgent => "URGENT",
});

text_enum!(PostStatus {
    Open => "OPEN",
    InProgress => "IN_PROGRESS",
    Resolved => "RESOLVED",
    Closed => "CLOSED",
    Archived => "ARCHIVED",
});

/// Default categories created with the schema.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "训练分享",
    "求助咨询",
    "机构推荐",
    "家庭训练",
    "心情分享",
    "费用讨论",
    "康复经验",
    "医院就诊",
];

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub author_user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[sqlx(try_from = "String")]
    pub priority: PostPriority,
    #[sqlx(try_from = "String")]
    pub status: PostStatus,
    pub views_count: i32,
    pub last_reply_at: Option<DateTime<Utc>>,
    pub has_official_reply: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuthorBrief {
    #[sqlx(rename = "author_user_id")]
    pub id: i64,
    #[sqlx(rename = "author_role", try_from = "String")]
    pub role: Role,
    /// Doctor profile name when the author has one.
    #[sqlx(rename = "author_name")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct PostStats {
    pub replies: i64,
    pub likes: i64,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    #[sqlx(flatten)]
    pub author: AuthorBrief,
    pub category_name: Option<String>,
    #[sqlx(flatten)]
    pub stats: PostStats,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: i64,
    pub post_id: i64,
    pub author_user_id: i64,
    pub parent_reply_id: Option<i64>,
    pub content: String,
    pub is_official: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub reply: Reply,
    #[sqlx(flatten)]
    pub author: AuthorBrief,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub post_id: i64,
    pub author_user_id: i64,
    pub parent_reply_id: Option<i64>,
    pub content: String,
    pub is_official: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostSort {
    #[default]
    Created,
    LatestReply,
    MostLiked,
    MostReplied,
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category_id: Option<i64>,
    /// Matched against title and content.
    pub keyword: Option<String>,
    pub priority: Option<PostPriority>,
    pub status: Option<PostStatus>,
    pub tag: Option<String>,
    pub has_official_reply: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ForumCounts {
    pub total: i64,
    pub open: i64,
    pub in_progress: i64,
    pub resolved: i64,
}
