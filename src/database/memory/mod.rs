//! In-process store with the same observable behaviour as `PgStore`.
//!
//! Selected with `DATABASE_URL=memory`; the integration tests run against it.
//! Each table is a `BTreeMap` keyed by id behind one `RwLock`, so every
//! operation sees a consistent snapshot.

mod accounts;
mod appointments;
mod cases;
mod forum;
mod growth;
mod trainings;
mod videos;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::database::models::forum::DEFAULT_CATEGORIES;
use crate::database::models::*;
use crate::database::repository::{DbResult, StoreHealth};
use crate::filter::PageRequest;

#[derive(Default)]
struct Tables {
    sequence: i64,
    users: BTreeMap<i64, Account>,
    doctor_profiles: BTreeMap<i64, DoctorProfile>,
    appointments: BTreeMap<i64, Appointment>,
    trainings: BTreeMap<i64, Training>,
    bookings: BTreeMap<i64, Booking>,
    cases: BTreeMap<i64, CaseRecord>,
    case_files: BTreeMap<i64, CaseFile>,
    categories: BTreeMap<i64, Category>,
    posts: BTreeMap<i64, Post>,
    replies: BTreeMap<i64, Reply>,
    likes: BTreeSet<(i64, i64)>,
    children: BTreeMap<i64, Child>,
    growth_profiles: BTreeMap<i64, GrowthProfile>,
    health_records: BTreeMap<i64, HealthRecord>,
    videos: BTreeMap<i64, Video>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn doctor_profile(&self, user_id: i64) -> Option<&DoctorProfile> {
        self.doctor_profiles.get(&user_id)
    }

    fn author_brief(&self, user_id: i64) -> Option<AuthorBrief> {
        let account = self.users.get(&user_id)?;
        Some(AuthorBrief {
            id: account.id,
            role: account.role,
            name: self
                .doctor_profile(user_id)
                .map(|p| p.name.trim().to_string())
                .filter(|name| !name.is_empty()),
        })
    }

    // Deletes below follow the ON DELETE rules in schema.sql.

    fn remove_user(&mut self, id: i64) -> bool {
        if self.users.remove(&id).is_none() {
            return false;
        }
        self.doctor_profiles.remove(&id);
        self.appointments
            .retain(|_, a| a.parent_user_id != id && a.doctor_user_id != id);
        self.bookings
            .retain(|_, b| b.parent_user_id != id && b.doctor_user_id != id);
        self.likes.retain(|(_, user)| *user != id);
        self.videos.retain(|_, v| v.author_user_id != id);

        let trainings = ids_where(&self.trainings, |t| t.doctor_user_id == id);
        for training in trainings {
            self.remove_training(training);
        }
        let cases = ids_where(&self.cases, |c| c.doctor_user_id == id);
        for case in cases {
            self.remove_case(case);
        }
        let posts = ids_where(&self.posts, |p| p.author_user_id == id);
        for post in posts {
            self.remove_post(post);
        }
        let replies = ids_where(&self.replies, |r| r.author_user_id == id);
        for reply in replies {
            self.remove_reply(reply);
        }
        let children = ids_where(&self.children, |c| c.parent_user_id == id);
        for child in children {
            self.remove_child(child);
        }
        true
    }

    fn remove_training(&mut self, id: i64) {
        self.trainings.remove(&id);
        self.bookings.retain(|_, b| b.training_id != id);
    }

    fn remove_case(&mut self, id: i64) -> Vec<CaseFile> {
        self.cases.remove(&id);
        let files = ids_where(&self.case_files, |f| f.case_id == id);
        files
            .into_iter()
            .filter_map(|file| self.case_files.remove(&file))
            .collect()
    }

    fn remove_post(&mut self, id: i64) {
        self.posts.remove(&id);
        self.replies.retain(|_, r| r.post_id != id);
        self.likes.retain(|(post, _)| *post != id);
    }

    fn remove_reply(&mut self, id: i64) {
        self.replies.remove(&id);
        for reply in self.replies.values_mut() {
            if reply.parent_reply_id == Some(id) {
                reply.parent_reply_id = None;
            }
        }
    }

    fn remove_child(&mut self, id: i64) {
        self.children.remove(&id);
        self.growth_profiles.remove(&id);
        self.health_records.retain(|_, r| r.child_id != id);
    }
}

fn ids_where<T>(table: &BTreeMap<i64, T>, pred: impl Fn(&T) -> bool) -> Vec<i64> {
    table
        .iter()
        .filter(|(_, row)| pred(row))
        .map(|(id, _)| *id)
        .collect()
}

/// Total count plus the requested window of an already ordered result.
fn paginate<T>(rows: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    (page.slice(rows), total)
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut tables = Tables::default();
        for name in DEFAULT_CATEGORIES {
            let id = tables.next_id();
            tables.categories.insert(
                id,
                Category {
                    id,
                    name: name.to_string(),
                    created_at: Utc::now(),
                },
            );
        }
        Self {
            tables: RwLock::new(tables),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> DbResult<()> {
        let _tables = self.tables.read().await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
