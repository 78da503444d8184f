//! Doctor-run training sessions and parent bookings against them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use super::appointments::IntakeForm;
use super::validate;
use super::{Ack, Created, ServiceError, ServiceResult};
use crate::auth::Identity;
use crate::authz::OwnershipGuard;
use crate::database::models::{
    Booking, BookingFilter, BookingStatus, BookingView, NewBooking, NewTraining, Role, Training,
    TrainingFilter, TrainingOrder, TrainingType, TrainingView, UpcomingDoctor,
};
use crate::database::repository::TrainingRepo;
use crate::database::Store;
use crate::filter::{limits, normalize_keyword, Page, PageRequest};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub training_type: String,
    pub duration_hours: i32,
    pub max_participants: i32,
    pub start_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub training_type: Option<String>,
    pub duration_hours: Option<i32>,
    pub max_participants: Option<i32>,
    pub start_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub training_type: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub training_id: i64,
    #[serde(flatten)]
    pub intake: IntakeForm,
}

fn start_date(value: &str) -> ServiceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ServiceError::invalid("startDate", "startDate must be an RFC 3339 timestamp"))
}

fn description(value: Option<&str>) -> ServiceResult<Option<String>> {
    validate::optional_text("description", value, 2000)
}

#[derive(Clone)]
pub struct TrainingService {
    store: Arc<dyn Store>,
    trainings: OwnershipGuard,
    bookings: OwnershipGuard,
}

impl TrainingService {
    pub fn new(store: Arc<dyn Store>, conceal: bool) -> Self {
        Self {
            store,
            trainings: OwnershipGuard::new(&[Role::SuperAdmin], conceal),
            bookings: OwnershipGuard::owner_only(conceal),
        }
    }

    pub async fn create(&self, caller: &Identity, request: TrainingRequest) -> ServiceResult<Training> {
        let new = NewTraining {
            doctor_user_id: caller.id,
            title: validate::text("title", &request.title, 1, 200)?,
            description: description(request.description.as_deref())?,
            training_type: validate::parse_enum("type", &request.training_type)?,
            duration_hours: validate::range("durationHours", request.duration_hours, 1, 1000)?,
            max_participants: validate::range("maxParticipants", request.max_participants, 1, 100_000)?,
            start_date: start_date(&request.start_date)?,
        };
        let training = self.store.create_training(new).await?;
        info!(training = training.id, doctor = caller.id, "Training created");
        Ok(training)
    }

    pub async fn mine(&self, caller: &Identity, query: TrainingQuery) -> ServiceResult<Page<TrainingView>> {
        let filter = TrainingFilter {
            doctor_user_id: Some(caller.id),
            keyword: normalize_keyword(query.q.as_deref()),
            training_type: validate::status_filter("type", query.training_type.as_deref())?,
            order: TrainingOrder::Newest,
            ..Default::default()
        };
        let page = PageRequest::resolve(query.page, query.page_size, limits::TRAININGS);
        let (items, total) = self.store.list_trainings(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn get(&self, caller: &Identity, id: i64) -> ServiceResult<TrainingView> {
        let view = self.store.find_training(id).await?;
        self.trainings.authorize(view, caller, "Training")
    }

    pub async fn update(&self, caller: &Identity, id: i64, patch: TrainingPatch) -> ServiceResult<Training> {
        let mut training = self.get(caller, id).await?.training;
        if let Some(title) = patch.title {
            training.title = validate::text("title", &title, 1, 200)?;
        }
        if let Some(text) = patch.description {
            training.description = description(Some(&text))?;
        }
        if let Some(kind) = patch.training_type {
            training.training_type = validate::parse_enum::<TrainingType>("type", &kind)?;
        }
        if let Some(hours) = patch.duration_hours {
            training.duration_hours = validate::range("durationHours", hours, 1, 1000)?;
        }
        if let Some(max) = patch.max_participants {
            training.max_participants = validate::range("maxParticipants", max, 1, 100_000)?;
        }
        if let Some(start) = patch.start_date {
            training.start_date = start_date(&start)?;
        }
        Ok(self.store.update_training(&training).await?)
    }

    pub async fn delete(&self, caller: &Identity, id: i64) -> ServiceResult<Ack> {
        self.get(caller, id).await?;
        self.store.delete_training(id).await?;
        info!(training = id, by = caller.id, "Training deleted");
        Ok(Ack::ok("Training deleted"))
    }

    pub async fn bookings_received(&self, caller: &Identity, query: BookingQuery) -> ServiceResult<Page<BookingView>> {
        let filter = BookingFilter {
            doctor_user_id: Some(caller.id),
            ..Default::default()
        };
        self.list_bookings(filter, query).await
    }

    /// Sessions starting today (UTC) or later, soonest first.
    pub async fn upcoming(&self, query: TrainingQuery) -> ServiceResult<Page<TrainingView>> {
        let filter = TrainingFilter {
            starting_from: Some(Utc::now().date_naive()),
            keyword: normalize_keyword(query.q.as_deref()),
            training_type: validate::status_filter("type", query.training_type.as_deref())?,
            order: TrainingOrder::SoonestStart,
            ..Default::default()
        };
        let page = PageRequest::resolve(query.page, query.page_size, limits::TRAININGS);
        let (items, total) = self.store.list_trainings(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn detail(&self, id: i64) -> ServiceResult<TrainingView> {
        self.store
            .find_training(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Training"))
    }

    pub async fn upcoming_doctors(&self) -> ServiceResult<Vec<UpcomingDoctor>> {
        Ok(self.store.upcoming_doctors(Utc::now().date_naive()).await?)
    }

    pub async fn book(&self, caller: &Identity, request: BookingRequest) -> ServiceResult<Created> {
        let intake = request.intake.validate(1)?;
        let training = self
            .store
            .find_training(request.training_id)
            .await?
            .ok_or_else(|| ServiceError::invalid("trainingId", "Training does not exist"))?
            .training;
        if training.start_date.date_naive() < Utc::now().date_naive() {
            return Err(ServiceError::invalid(
                "trainingId",
                "Training has already started and can no longer be booked",
            ));
        }

        let booking = self
            .store
            .create_booking(NewBooking {
                parent_user_id: caller.id,
                doctor_user_id: training.doctor_user_id,
                training_id: training.id,
                intake,
            })
            .await?;
        info!(booking = booking.id, training = training.id, parent = caller.id, "Training booked");
        Ok(Created::new(booking.id))
    }

    pub async fn my_bookings(&self, caller: &Identity, query: BookingQuery) -> ServiceResult<Page<BookingView>> {
        let filter = BookingFilter {
            parent_user_id: Some(caller.id),
            ..Default::default()
        };
        self.list_bookings(filter, query).await
    }

    pub async fn cancel_booking(&self, caller: &Identity, id: i64) -> ServiceResult<Booking> {
        let booking = self.store.find_booking(id).await?;
        let booking = self.bookings.authorize(booking, caller, "Booking")?;
        if booking.status != BookingStatus::Submitted {
            return Err(ServiceError::invalid("status", "Booking is already canceled"));
        }
        let updated = self
            .store
            .set_booking_status(id, BookingStatus::Canceled)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking"))?;
        info!(booking = id, parent = caller.id, "Booking canceled");
        Ok(updated)
    }

    async fn list_bookings(&self, filter: BookingFilter, query: BookingQuery) -> ServiceResult<Page<BookingView>> {
        let page = PageRequest::resolve(query.page, query.page_size, limits::BOOKINGS);
        let (items, total) = self.store.list_bookings(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }
}
