//! Parent discussion forum and its moderation by hospital staff.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::validate;
use super::{Ack, ServiceError, ServiceResult};
use crate::auth::Identity;
use crate::authz::OwnershipGuard;
use crate::database::models::{
    AuthorBrief, Category, ForumCounts, NewPost, NewReply, PostFilter, PostPriority, PostSort,
    PostStatus, PostView, ReplyView, Role,
};
use crate::database::repository::{AccountRepo, ForumRepo};
use crate::database::Store;
use crate::filter::{limits, normalize_keyword, Page, PageRequest};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub content: String,
    pub parent_reply_id: Option<i64>,
    pub is_official: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostQuery {
    pub category_id: Option<i64>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationQuery {
    pub q: Option<String>,
    pub category_id: Option<i64>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
    pub has_official_reply: Option<bool>,
    pub sort_by: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriorityChange {
    pub priority: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
}

/// Who is replying: parents never post official answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySide {
    Parent,
    Hospital,
}

fn sort_order(value: Option<&str>) -> PostSort {
    match value.map(str::trim) {
        Some("latestReply") => PostSort::LatestReply,
        Some("mostLiked") => PostSort::MostLiked,
        Some("mostReplied") => PostSort::MostReplied,
        _ => PostSort::Created,
    }
}

#[derive(Clone)]
pub struct ForumService {
    store: Arc<dyn Store>,
    own_posts: OwnershipGuard,
    parent_replies: OwnershipGuard,
    hospital_replies: OwnershipGuard,
}

impl ForumService {
    pub fn new(store: Arc<dyn Store>, conceal: bool) -> Self {
        Self {
            store,
            own_posts: OwnershipGuard::owner_only(conceal),
            parent_replies: OwnershipGuard::owner_only(conceal),
            hospital_replies: OwnershipGuard::new(&[Role::SuperAdmin], conceal),
        }
    }

    pub async fn categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn list_posts(&self, query: PostQuery) -> ServiceResult<Page<PostView>> {
        let filter = PostFilter {
            category_id: query.category_id,
            keyword: normalize_keyword(query.q.as_deref()),
            ..Default::default()
        };
        let page = PageRequest::resolve(query.page, query.page_size, limits::FORUM_POSTS);
        let (items, total) = self.store.list_posts(&filter, PostSort::Created, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn moderation_list(&self, query: ModerationQuery) -> ServiceResult<Page<PostView>> {
        let filter = PostFilter {
            category_id: query.category_id,
            keyword: normalize_keyword(query.q.as_deref()),
            priority: validate::status_filter("priority", query.priority.as_deref())?,
            status: validate::status_filter("status", query.status.as_deref())?,
            tag: normalize_keyword(query.tag.as_deref()),
            has_official_reply: query.has_official_reply,
        };
        let page = PageRequest::resolve(query.page, query.page_size, limits::FORUM_POSTS);
        let (items, total) = self
            .store
            .list_posts(&filter, sort_order(query.sort_by.as_deref()), page)
            .await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn create_post(&self, caller: &Identity, request: PostRequest) -> ServiceResult<PostView> {
        let title = validate::text("title", &request.title, 1, 200)?;
        let content = validate::text("content", &request.content, 1, 20_000)?;
        let tags = validate::list("tags", &request.tags, 5, 30)?;
        if let Some(category_id) = request.category_id {
            if self.store.find_category(category_id).await?.is_none() {
                return Err(ServiceError::invalid("categoryId", "Category does not exist"));
            }
        }

        let post = self
            .store
            .create_post(NewPost {
                author_user_id: caller.id,
                category_id: request.category_id,
                title,
                content,
                tags,
            })
            .await?;
        info!(post = post.id, author = caller.id, "Forum post created");
        self.find(post.id).await
    }

    /// Post detail; every read counts as a view.
    pub async fn view_post(&self, id: i64) -> ServiceResult<PostView> {
        self.find(id).await?;
        self.store.increment_post_views(id).await?;
        self.find(id).await
    }

    pub async fn post(&self, id: i64) -> ServiceResult<PostView> {
        self.find(id).await
    }

    pub async fn delete_own_post(&self, caller: &Identity, id: i64) -> ServiceResult<Ack> {
        let post = self.store.find_post(id).await?;
        self.own_posts.authorize(post, caller, "Post")?;
        self.store.delete_post(id).await?;
        info!(post = id, by = caller.id, "Forum post deleted by author");
        Ok(Ack::ok("Post deleted"))
    }

    pub async fn moderate_delete_post(&self, caller: &Identity, id: i64) -> ServiceResult<Ack> {
        self.find(id).await?;
        self.store.delete_post(id).await?;
        info!(post = id, by = caller.id, "Forum post deleted by staff");
        Ok(Ack::ok("Post deleted"))
    }

    pub async fn replies(&self, post_id: i64, query: ReplyQuery) -> ServiceResult<Page<ReplyView>> {
        self.find(post_id).await?;
        let page = PageRequest::resolve(query.page, query.page_size, limits::FORUM_REPLIES);
        let (items, total) = self.store.list_replies(post_id, page).await?;
        Ok(Page::new(items, total, page))
    }

    /// Official replies flag the post and move an OPEN post to IN_PROGRESS.
    pub async fn reply(
        &self,
        caller: &Identity,
        post_id: i64,
        side: ReplySide,
        request: ReplyRequest,
    ) -> ServiceResult<ReplyView> {
        let content = validate::text("content", &request.content, 1, 10_000)?;
        let post = self.find(post_id).await?;
        if let Some(parent_id) = request.parent_reply_id {
            match self.store.find_reply(parent_id).await? {
                Some(parent) if parent.post_id == post_id => {}
                _ => return Err(ServiceError::invalid("parentReplyId", "Reply does not belong to this post")),
            }
        }
        let official = match side {
            ReplySide::Parent => false,
            ReplySide::Hospital => request.is_official.unwrap_or(true),
        };

        let reply = self
            .store
            .create_reply(NewReply {
                post_id,
                author_user_id: caller.id,
                parent_reply_id: request.parent_reply_id,
                content,
                is_official: official,
            })
            .await?;
        self.store.touch_post_reply(post_id, reply.created_at, official).await?;
        if official && post.post.status == PostStatus::Open {
            self.store.set_post_status(post_id, PostStatus::InProgress).await?;
        }
        info!(post = post_id, reply = reply.id, official, "Forum reply added");

        let name = self
            .store
            .find_doctor_profile(caller.id)
            .await?
            .map(|profile| profile.name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(ReplyView {
            reply,
            author: AuthorBrief {
                id: caller.id,
                role: caller.role,
                name,
            },
        })
    }

    pub async fn delete_reply(&self, caller: &Identity, id: i64, side: ReplySide) -> ServiceResult<Ack> {
        let guard = match side {
            ReplySide::Parent => &self.parent_replies,
            ReplySide::Hospital => &self.hospital_replies,
        };
        let reply = self.store.find_reply(id).await?;
        guard.authorize(reply, caller, "Reply")?;
        self.store.delete_reply(id).await?;
        Ok(Ack::ok("Reply deleted"))
    }

    pub async fn toggle_like(&self, caller: &Identity, post_id: i64) -> ServiceResult<LikeOutcome> {
        self.find(post_id).await?;
        let liked = self.store.toggle_like(post_id, caller.id).await?;
        Ok(LikeOutcome { liked })
    }

    /// Free transition between any two statuses.
    pub async fn set_status(&self, caller: &Identity, id: i64, change: StatusChange) -> ServiceResult<PostView> {
        let status: PostStatus = validate::parse_enum("status", &change.status)?;
        self.find(id).await?;
        self.store.set_post_status(id, status).await?;
        info!(post = id, status = %status, by = caller.id, "Forum post status changed");
        self.find(id).await
    }

    /// URGENT is reserved for SUPER_ADMIN.
    pub async fn set_priority(&self, caller: &Identity, id: i64, change: PriorityChange) -> ServiceResult<PostView> {
        let priority: PostPriority = validate::parse_enum("priority", &change.priority)?;
        if priority == PostPriority::Urgent && !caller.is_super_admin() {
            warn!(caller = caller.id, post = id, "URGENT priority refused");
            return Err(ServiceError::Forbidden(
                "Only super admins may set URGENT priority".to_string(),
            ));
        }
        self.find(id).await?;
        self.store.set_post_priority(id, priority).await?;
        self.find(id).await
    }

    pub async fn stats(&self) -> ServiceResult<ForumCounts> {
        Ok(self.store.forum_counts().await?)
    }

    async fn find(&self, id: i64) -> ServiceResult<PostView> {
        self.store
            .find_post(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Post"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn post(title: &str) -> PostRequest {
        PostRequest {
            title: title.into(),
            content: "Any tips for bedtime routines?".into(),
            category_id: None,
            tags: vec!["sleep".into()],
        }
    }

    fn reply(content: &str, official: Option<bool>) -> ReplyRequest {
        ReplyRequest {
            content: content.into(),
            parent_reply_id: None,
            is_official: official,
        }
    }

    #[tokio::test]
    async fn official_reply_moves_open_post_forward() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Fang").await;
        let forum = &ctx.services.forum;
        let created = forum.create_post(&parent, post("Sleep")).await.unwrap();
        assert_eq!(created.post.status, PostStatus::Open);

        let answer = forum
            .reply(&doctor, created.post.id, ReplySide::Hospital, reply("Keep a fixed schedule", None))
            .await
            .unwrap();
        assert!(answer.reply.is_official);
        assert_eq!(answer.author.name.as_deref(), Some("Dr. Fang"));

        let after = forum.post(created.post.id).await.unwrap();
        assert!(after.post.has_official_reply);
        assert_eq!(after.post.status, PostStatus::InProgress);
        assert_eq!(after.stats.replies, 1);
    }

    #[tokio::test]
    async fn parent_replies_are_never_official() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let forum = &ctx.services.forum;
        let created = forum.create_post(&parent, post("Sleep")).await.unwrap();
        let answer = forum
            .reply(&parent, created.post.id, ReplySide::Parent, reply("me too", Some(true)))
            .await
            .unwrap();
        assert!(!answer.reply.is_official);
        let after = forum.post(created.post.id).await.unwrap();
        assert_eq!(after.post.status, PostStatus::Open);
        assert!(!after.post.has_official_reply);
    }

    #[tokio::test]
    async fn only_super_admin_sets_urgent() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Fang").await;
        let admin = ctx.account(Role::SuperAdmin).await;
        let forum = &ctx.services.forum;
        let id = forum.create_post(&parent, post("Help")).await.unwrap().post.id;

        let urgent = PriorityChange { priority: "URGENT".into() };
        assert!(matches!(
            forum.set_priority(&doctor, id, urgent.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        let high = forum.set_priority(&doctor, id, PriorityChange { priority: "HIGH".into() }).await.unwrap();
        assert_eq!(high.post.priority, PostPriority::High);
        let urgent = forum.set_priority(&admin, id, urgent).await.unwrap();
        assert_eq!(urgent.post.priority, PostPriority::Urgent);
    }

    #[tokio::test]
    async fn views_likes_and_validation() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let forum = &ctx.services.forum;
        let id = forum.create_post(&parent, post("Views")).await.unwrap().post.id;

        forum.view_post(id).await.unwrap();
        let viewed = forum.view_post(id).await.unwrap();
        assert_eq!(viewed.post.views_count, 2);

        assert!(forum.toggle_like(&parent, id).await.unwrap().liked);
        assert!(!forum.toggle_like(&parent, id).await.unwrap().liked);

        let mut too_many = post("Tags");
        too_many.tags = (0..6).map(|i| format!("t{}", i)).collect();
        assert!(matches!(
            forum.create_post(&parent, too_many).await,
            Err(ServiceError::InvalidInput { .. })
        ));
        let mut bad_category = post("Category");
        bad_category.category_id = Some(424242);
        assert!(forum.create_post(&parent, bad_category).await.is_err());
    }

    #[tokio::test]
    async fn deletes_respect_authorship() {
        let ctx = TestContext::new();
        let author = ctx.account(Role::Parent).await;
        let other = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Fang").await;
        let admin = ctx.account(Role::SuperAdmin).await;
        let forum = &ctx.services.forum;
        let id = forum.create_post(&author, post("Mine")).await.unwrap().post.id;

        assert!(matches!(
            forum.delete_own_post(&other, id).await,
            Err(ServiceError::Forbidden(_))
        ));

        let answer = forum
            .reply(&doctor, id, ReplySide::Hospital, reply("answer", None))
            .await
            .unwrap();
        let colleague = ctx.doctor("Dr. Liu").await;
        assert!(forum
            .delete_reply(&colleague, answer.reply.id, ReplySide::Hospital)
            .await
            .is_err());
        assert!(forum.delete_reply(&admin, answer.reply.id, ReplySide::Hospital).await.is_ok());

        forum.delete_own_post(&author, id).await.unwrap();
        assert!(matches!(forum.post(id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn moderation_list_filters_and_counts() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Fang").await;
        let forum = &ctx.services.forum;
        let answered = forum.create_post(&parent, post("Answered")).await.unwrap().post.id;
        forum.create_post(&parent, post("Waiting")).await.unwrap();
        forum
            .reply(&doctor, answered, ReplySide::Hospital, reply("ok", None))
            .await
            .unwrap();

        let query = ModerationQuery {
            has_official_reply: Some(false),
            ..Default::default()
        };
        let waiting = forum.moderation_list(query).await.unwrap();
        assert_eq!(waiting.total, 1);
        assert_eq!(waiting.items[0].post.title, "Waiting");

        let stats = forum.stats().await.unwrap();
        assert_eq!((stats.total, stats.open, stats.in_progress), (2, 1, 1));
    }
}
