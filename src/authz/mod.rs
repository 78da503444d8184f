//! Record-level ownership checks.
//!
//! Role allowlists are enforced by the router before a service runs; this
//! module answers the second question, whether the caller may touch one
//! particular record.

use tracing::warn;

use crate::auth::Identity;
use crate::database::models::{
    Booking, CaseRecord, Child, Post, PostView, Reply, Role, Training, TrainingView, Video,
};
use crate::services::{ServiceError, ServiceResult};

/// A record with a single owning account.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

pub fn is_owner<R: Owned + ?Sized>(record: &R, caller_id: i64) -> bool {
    record.owner_id() == caller_id
}

/// Resolves a looked-up record against the caller.
///
/// Absent records are `NotFound`. Owners and privileged roles pass. Anyone
/// else gets `Forbidden`, or `NotFound` when foreign records are concealed.
#[derive(Debug, Clone, Copy)]
pub struct OwnershipGuard {
    privileged: &'static [Role],
    conceal: bool,
}

impl OwnershipGuard {
    pub const fn new(privileged: &'static [Role], conceal: bool) -> Self {
        Self { privileged, conceal }
    }

    pub const fn owner_only(conceal: bool) -> Self {
        Self::new(&[], conceal)
    }

    pub fn admits(&self, owner_id: i64, caller: &Identity) -> bool {
        owner_id == caller.id || caller.has_role(self.privileged)
    }

    pub fn authorize<R: Owned>(&self, record: Option<R>, caller: &Identity, what: &str) -> ServiceResult<R> {
        self.authorize_by(record, caller, what, R::owner_id)
    }

    /// Like `authorize`, for records whose owner depends on the caller's side.
    pub fn authorize_by<R>(
        &self,
        record: Option<R>,
        caller: &Identity,
        what: &str,
        owner: impl Fn(&R) -> i64,
    ) -> ServiceResult<R> {
        let record = record.ok_or_else(|| ServiceError::not_found(what))?;
        let owner_id = owner(&record);
        if self.admits(owner_id, caller) {
            return Ok(record);
        }

        warn!(
            caller = caller.id,
            role = %caller.role,
            owner = owner_id,
            resource = what,
            "Ownership check rejected"
        );
        Err(if self.conceal {
            ServiceError::not_found(what)
        } else {
            ServiceError::Forbidden(format!("You do not have access to this {}", what.to_lowercase()))
        })
    }
}

impl Owned for Training {
    fn owner_id(&self) -> i64 {
        self.doctor_user_id
    }
}

impl Owned for TrainingView {
    fn owner_id(&self) -> i64 {
        self.training.doctor_user_id
    }
}

impl Owned for Booking {
    fn owner_id(&self) -> i64 {
        self.parent_user_id
    }
}

impl Owned for CaseRecord {
    fn owner_id(&self) -> i64 {
        self.doctor_user_id
    }
}

impl Owned for Post {
    fn owner_id(&self) -> i64 {
        self.author_user_id
    }
}

impl Owned for PostView {
    fn owner_id(&self) -> i64 {
        self.post.author_user_id
    }
}

impl Owned for Reply {
    fn owner_id(&self) -> i64 {
        self.author_user_id
    }
}

impl Owned for Child {
    fn owner_id(&self) -> i64 {
        self.parent_user_id
    }
}

impl Owned for Video {
    fn owner_id(&self) -> i64 {
        self.author_user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn caller(id: i64, role: Role) -> Identity {
        Identity {
            id,
            role,
            email: None,
            phone: None,
        }
    }

    fn child(parent: i64) -> Child {
        Child {
            id: 1,
            parent_user_id: parent,
            name: "Mia".into(),
            gender: crate::database::models::Gender::Female,
            birth_date: NaiveDate::from_ymd_opt(2019, 5, 1).unwrap(),
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_passes() {
        let guard = OwnershipGuard::owner_only(false);
        assert!(guard.authorize(Some(child(5)), &caller(5, Role::Parent), "Child").is_ok());
        assert!(is_owner(&child(5), 5));
    }

    #[test]
    fn absent_record_is_not_found() {
        let guard = OwnershipGuard::owner_only(false);
        let result = guard.authorize(None::<Child>, &caller(5, Role::Parent), "Child");
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn stranger_is_forbidden_unless_concealed() {
        let stranger = caller(6, Role::Parent);
        let open = OwnershipGuard::owner_only(false);
        assert!(matches!(
            open.authorize(Some(child(5)), &stranger, "Child"),
            Err(ServiceError::Forbidden(_))
        ));

        let concealed = OwnershipGuard::owner_only(true);
        assert!(matches!(
            concealed.authorize(Some(child(5)), &stranger, "Child"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn privileged_roles_bypass_ownership() {
        let guard = OwnershipGuard::new(&[Role::SuperAdmin], false);
        assert!(guard.authorize(Some(child(5)), &caller(1, Role::SuperAdmin), "Child").is_ok());
        assert!(guard.authorize(Some(child(5)), &caller(2, Role::Doctor), "Child").is_err());
    }

    #[test]
    fn authorize_by_uses_the_given_owner() {
        let guard = OwnershipGuard::owner_only(false);
        let record = (10_i64, 20_i64);
        assert!(guard.authorize_by(Some(record), &caller(20, Role::Doctor), "Pair", |r| r.1).is_ok());
        assert!(guard.authorize_by(Some(record), &caller(10, Role::Doctor), "Pair", |r| r.1).is_err());
    }
}
