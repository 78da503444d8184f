use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{paginate, MemoryStore, Tables};
use crate::database::models::{
    Category, ForumCounts, NewPost, NewReply, Post, PostFilter, PostPriority, PostSort, PostStats,
    PostStatus, PostView, Reply, ReplyView,
};
use crate::database::repository::{DbResult, ForumRepo};
use crate::filter::{contains_keyword, PageRequest};

fn post_view(tables: &Tables, post: &Post) -> Option<PostView> {
    Some(PostView {
        author: tables.author_brief(post.author_user_id)?,
        category_name: post
            .category_id
            .and_then(|id| tables.categories.get(&id))
            .map(|c| c.name.clone()),
        stats: PostStats {
            replies: tables.replies.values().filter(|r| r.post_id == post.id).count() as i64,
            likes: tables.likes.iter().filter(|(p, _)| *p == post.id).count() as i64,
            views: post.views_count as i64,
        },
        post: post.clone(),
    })
}

fn matches(post: &Post, filter: &PostFilter) -> bool {
    if filter.category_id.is_some() && post.category_id != filter.category_id {
        return false;
    }
    if filter.priority.is_some_and(|p| p != post.priority) {
        return false;
    }
    if filter.status.is_some_and(|s| s != post.status) {
        return false;
    }
    if let Some(tag) = filter.tag.as_deref() {
        if !post.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if filter.has_official_reply.is_some_and(|v| v != post.has_official_reply) {
        return false;
    }
    match filter.keyword.as_deref() {
        Some(kw) => contains_keyword(Some(&post.title), kw) || contains_keyword(Some(&post.content), kw),
        None => true,
    }
}

fn update_post(tables: &mut Tables, id: i64, apply: impl FnOnce(&mut Post)) {
    if let Some(post) = tables.posts.get_mut(&id) {
        apply(post);
    }
}

#[async_trait]
impl ForumRepo for MemoryStore {
    async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> DbResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn create_post(&self, new: NewPost) -> DbResult<Post> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let post = Post {
            id,
            author_user_id: new.author_user_id,
            category_id: new.category_id,
            title: new.title,
            content: new.content,
            tags: new.tags,
            priority: PostPriority::Normal,
            status: PostStatus::Open,
            views_count: 0,
            last_reply_at: None,
            has_official_reply: false,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: i64) -> DbResult<Option<PostView>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).and_then(|p| post_view(&tables, p)))
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        page: PageRequest,
    ) -> DbResult<(Vec<PostView>, i64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PostView> = tables
            .posts
            .values()
            .filter(|p| matches(p, filter))
            .filter_map(|p| post_view(&tables, p))
            .collect();

        let newest = |v: &PostView| Reverse((v.post.created_at, v.post.id));
        match sort {
            PostSort::Created => rows.sort_by_key(newest),
            // None sorts last, matching NULLS LAST.
            PostSort::LatestReply => rows.sort_by_key(|v| {
                let at = v.post.last_reply_at;
                (at.is_none(), Reverse(at), newest(v))
            }),
            PostSort::MostLiked => rows.sort_by_key(|v| (Reverse(v.stats.likes), newest(v))),
            PostSort::MostReplied => rows.sort_by_key(|v| (Reverse(v.stats.replies), newest(v))),
        }
        Ok(paginate(rows, page))
    }

    async fn increment_post_views(&self, id: i64) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        update_post(&mut tables, id, |post| post.views_count += 1);
        Ok(())
    }

    async fn set_post_status(&self, id: i64, status: PostStatus) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        update_post(&mut tables, id, |post| {
            post.status = status;
            post.updated_at = Utc::now();
        });
        Ok(())
    }

    async fn set_post_priority(&self, id: i64, priority: PostPriority) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        update_post(&mut tables, id, |post| {
            post.priority = priority;
            post.updated_at = Utc::now();
        });
        Ok(())
    }

    async fn touch_post_reply(&self, id: i64, at: DateTime<Utc>, official: bool) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        update_post(&mut tables, id, |post| {
            post.last_reply_at = Some(at);
            post.has_official_reply |= official;
            post.updated_at = Utc::now();
        });
        Ok(())
    }

    async fn delete_post(&self, id: i64) -> DbResult<()> {
        self.tables.write().await.remove_post(id);
        Ok(())
    }

    async fn forum_counts(&self) -> DbResult<ForumCounts> {
        let tables = self.tables.read().await;
        let count = |status: PostStatus| {
            tables.posts.values().filter(|p| p.status == status).count() as i64
        };
        Ok(ForumCounts {
            total: tables.posts.len() as i64,
            open: count(PostStatus::Open),
            in_progress: count(PostStatus::InProgress),
            resolved: count(PostStatus::Resolved),
        })
    }

    async fn create_reply(&self, new: NewReply) -> DbResult<Reply> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let reply = Reply {
            id,
            post_id: new.post_id,
            author_user_id: new.author_user_id,
            parent_reply_id: new.parent_reply_id,
            content: new.content,
            is_official: new.is_official,
            created_at: Utc::now(),
        };
        tables.replies.insert(id, reply.clone());
        Ok(reply)
    }

    async fn find_reply(&self, id: i64) -> DbResult<Option<Reply>> {
        Ok(self.tables.read().await.replies.get(&id).cloned())
    }

    async fn list_replies(&self, post_id: i64, page: PageRequest) -> DbResult<(Vec<ReplyView>, i64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ReplyView> = tables
            .replies
            .values()
            .filter(|r| r.post_id == post_id)
            .filter_map(|r| {
                Some(ReplyView {
                    author: tables.author_brief(r.author_user_id)?,
                    reply: r.clone(),
                })
            })
            .collect();
        rows.sort_by_key(|v| (v.reply.created_at, v.reply.id));
        Ok(paginate(rows, page))
    }

    async fn delete_reply(&self, id: i64) -> DbResult<()> {
        self.tables.write().await.remove_reply(id);
        Ok(())
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.likes.remove(&(post_id, user_id)) {
            return Ok(false);
        }
        tables.likes.insert((post_id, user_id));
        Ok(true)
    }
}
