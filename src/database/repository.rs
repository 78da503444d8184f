//! Storage contracts, one trait per resource family.
//!
//! Services depend on these traits only; `PgStore` and `MemoryStore` both
//! implement all of them and must agree on ordering, filtering and
//! uniqueness conflicts.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::database::manager::DatabaseError;
use crate::database::models::*;
use crate::filter::PageRequest;

pub type DbResult<T> = Result<T, DatabaseError>;

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> DbResult<()>;

    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Fails with `Conflict` when the email or phone is already taken.
    async fn create_account(&self, new: NewAccount) -> DbResult<Account>;
    async fn find_account(&self, id: i64) -> DbResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> DbResult<Option<Account>>;
    async fn find_account_by_phone(&self, phone: &str) -> DbResult<Option<Account>>;
    async fn find_accounts(&self, ids: &[i64]) -> DbResult<Vec<Account>>;
    /// All accounts, newest first, each with its doctor profile if any.
    async fn list_accounts(&self) -> DbResult<Vec<AccountWithProfile>>;
    async fn set_accounts_role(&self, ids: &[i64], role: Role) -> DbResult<u64>;
    async fn set_accounts_enabled(&self, ids: &[i64], enabled: bool) -> DbResult<u64>;
    async fn set_password_hash(&self, id: i64, password_hash: &str) -> DbResult<()>;
    async fn delete_accounts(&self, ids: &[i64]) -> DbResult<u64>;

    async fn find_doctor_profile(&self, user_id: i64) -> DbResult<Option<DoctorProfile>>;
    /// Insert or replace; `Conflict` when the phone belongs to another profile.
    async fn save_doctor_profile(&self, profile: &DoctorProfile) -> DbResult<DoctorProfile>;
    /// Profiles with a name and hospital, newest account first.
    async fn list_doctors(
        &self,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> DbResult<(Vec<DoctorSummary>, i64)>;
}

#[async_trait]
pub trait AppointmentRepo: Send + Sync {
    async fn create_appointment(&self, new: NewAppointment) -> DbResult<Appointment>;
    async fn find_appointment(&self, id: i64) -> DbResult<Option<Appointment>>;
    /// Newest first.
    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<AppointmentView>, i64)>;
    /// `notes: None` leaves the stored notes untouched.
    async fn update_appointment_status(
        &self,
        id: i64,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> DbResult<Option<Appointment>>;
}

#[async_trait]
pub trait TrainingRepo: Send + Sync {
    async fn create_training(&self, new: NewTraining) -> DbResult<Training>;
    async fn find_training(&self, id: i64) -> DbResult<Option<TrainingView>>;
    async fn update_training(&self, training: &Training) -> DbResult<Training>;
    async fn delete_training(&self, id: i64) -> DbResult<()>;
    async fn list_trainings(
        &self,
        filter: &TrainingFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<TrainingView>, i64)>;
    /// Doctors with trainings starting on or after `from`, soonest first.
    async fn upcoming_doctors(&self, from: NaiveDate) -> DbResult<Vec<UpcomingDoctor>>;

    async fn create_booking(&self, new: NewBooking) -> DbResult<Booking>;
    async fn find_booking(&self, id: i64) -> DbResult<Option<Booking>>;
    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<BookingView>, i64)>;
    async fn set_booking_status(&self, id: i64, status: BookingStatus) -> DbResult<Option<Booking>>;
}

#[async_trait]
pub trait CaseRepo: Send + Sync {
    async fn create_case(&self, new: NewCase, files: Vec<NewCaseFile>) -> DbResult<CaseRecord>;
    /// Case with its files, oldest file first.
    async fn find_case(&self, id: i64) -> DbResult<Option<CaseRecord>>;
    async fn list_cases(
        &self,
        doctor_user_id: i64,
        status: Option<CaseStatus>,
        page: PageRequest,
    ) -> DbResult<(Vec<CaseRecord>, i64)>;
    async fn update_case(&self, record: &CaseRecord) -> DbResult<()>;
    async fn add_case_files(&self, case_id: i64, files: Vec<NewCaseFile>) -> DbResult<()>;
    async fn delete_case_file(&self, case_id: i64, file_id: i64) -> DbResult<Option<CaseFile>>;
    /// Removes the case and returns the files it owned.
    async fn delete_case(&self, id: i64) -> DbResult<Vec<CaseFile>>;
}

#[async_trait]
pub trait ForumRepo: Send + Sync {
    async fn list_categories(&self) -> DbResult<Vec<Category>>;
    async fn find_category(&self, id: i64) -> DbResult<Option<Category>>;

    async fn create_post(&self, new: NewPost) -> DbResult<Post>;
    async fn find_post(&self, id: i64) -> DbResult<Option<PostView>>;
    async fn list_posts(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        page: PageRequest,
    ) -> DbResult<(Vec<PostView>, i64)>;
    async fn increment_post_views(&self, id: i64) -> DbResult<()>;
    async fn set_post_status(&self, id: i64, status: PostStatus) -> DbResult<()>;
    async fn set_post_priority(&self, id: i64, priority: PostPriority) -> DbResult<()>;
    /// Records reply activity on the post; `official` also raises `has_official_reply`.
    async fn touch_post_reply(&self, id: i64, at: DateTime<Utc>, official: bool) -> DbResult<()>;
    /// Deletes the post with its replies and likes.
    async fn delete_post(&self, id: i64) -> DbResult<()>;
    async fn forum_counts(&self) -> DbResult<ForumCounts>;

    async fn create_reply(&self, new: NewReply) -> DbResult<Reply>;
    async fn find_reply(&self, id: i64) -> DbResult<Option<Reply>>;
    /// Oldest first.
    async fn list_replies(&self, post_id: i64, page: PageRequest) -> DbResult<(Vec<ReplyView>, i64)>;
    async fn delete_reply(&self, id: i64) -> DbResult<()>;

    /// Returns true when the like now exists.
    async fn toggle_like(&self, post_id: i64, user_id: i64) -> DbResult<bool>;
}

#[async_trait]
pub trait GrowthRepo: Send + Sync {
    /// Creates the child together with an empty growth profile.
    async fn create_child(&self, new: NewChild) -> DbResult<Child>;
    async fn find_child(&self, id: i64) -> DbResult<Option<Child>>;
    /// Oldest first.
    async fn list_children(&self, parent_user_id: i64) -> DbResult<Vec<Child>>;
    async fn update_child(&self, child: &Child) -> DbResult<Child>;
    /// Deletes the child with its profile and health records.
    async fn delete_child(&self, id: i64) -> DbResult<()>;

    async fn find_growth_profile(&self, child_id: i64) -> DbResult<Option<GrowthProfile>>;
    async fn save_growth_profile(&self, profile: &GrowthProfile) -> DbResult<GrowthProfile>;

    async fn create_health_record(&self, new: NewHealthRecord) -> DbResult<HealthRecord>;
    async fn find_health_record(&self, id: i64) -> DbResult<Option<HealthRecord>>;
    /// Most recent date first.
    async fn list_health_records(
        &self,
        child_id: i64,
        page: PageRequest,
    ) -> DbResult<(Vec<HealthRecord>, i64)>;
    async fn update_health_record(&self, record: &HealthRecord) -> DbResult<HealthRecord>;
    async fn delete_health_record(&self, id: i64) -> DbResult<()>;
}

#[async_trait]
pub trait VideoRepo: Send + Sync {
    async fn create_video(&self, new: NewVideo) -> DbResult<Video>;
    async fn find_video(&self, id: i64) -> DbResult<Option<Video>>;
    async fn list_videos(&self, filter: &VideoFilter, page: PageRequest) -> DbResult<(Vec<Video>, i64)>;
    async fn update_video(&self, video: &Video) -> DbResult<Video>;
    async fn delete_video(&self, id: i64) -> DbResult<()>;
    async fn increment_video_views(&self, id: i64) -> DbResult<()>;
    async fn video_totals(&self, author_user_id: i64) -> DbResult<VideoTotals>;
}

/// Everything a full backend provides.
pub trait Store:
    StoreHealth + AccountRepo + AppointmentRepo + TrainingRepo + CaseRepo + ForumRepo + GrowthRepo + VideoRepo
{
}

impl<T> Store for T where
    T: StoreHealth
        + AccountRepo
        + AppointmentRepo
        + TrainingRepo
        + CaseRepo
        + ForumRepo
        + GrowthRepo
        + VideoRepo
{
}
