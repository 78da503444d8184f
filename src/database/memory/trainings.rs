use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{paginate, MemoryStore, Tables};
use crate::database::models::{
    Booking, BookingFilter, BookingStatus, BookingView, NewBooking, NewTraining, Training,
    TrainingFilter, TrainingOrder, TrainingView, UpcomingDoctor,
};
use crate::database::repository::{DbResult, TrainingRepo};
use crate::filter::{contains_keyword, PageRequest};

fn view(tables: &Tables, training: &Training) -> TrainingView {
    let doctor = tables.doctor_profile(training.doctor_user_id);
    TrainingView {
        training: training.clone(),
        doctor_name: doctor.map(|d| d.name.clone()),
        doctor_hospital: doctor.map(|d| d.hospital.clone()),
        doctor_title: doctor.and_then(|d| d.title.clone()),
    }
}

fn matches(view: &TrainingView, filter: &TrainingFilter) -> bool {
    let training = &view.training;
    if filter.doctor_user_id.is_some_and(|id| id != training.doctor_user_id) {
        return false;
    }
    if filter
        .starting_from
        .is_some_and(|from| training.start_date.date_naive() < from)
    {
        return false;
    }
    if filter.training_type.is_some_and(|kind| kind != training.training_type) {
        return false;
    }
    match filter.keyword.as_deref() {
        Some(kw) => {
            contains_keyword(Some(&training.title), kw)
                || contains_keyword(view.doctor_name.as_deref(), kw)
                || contains_keyword(view.doctor_hospital.as_deref(), kw)
        }
        None => true,
    }
}

#[async_trait]
impl TrainingRepo for MemoryStore {
    async fn create_training(&self, new: NewTraining) -> DbResult<Training> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let training = Training {
            id,
            doctor_user_id: new.doctor_user_id,
            title: new.title,
            description: new.description,
            training_type: new.training_type,
            duration_hours: new.duration_hours,
            max_participants: new.max_participants,
            start_date: new.start_date,
            created_at: now,
            updated_at: now,
        };
        tables.trainings.insert(id, training.clone());
        Ok(training)
    }

    async fn find_training(&self, id: i64) -> DbResult<Option<TrainingView>> {
        let tables = self.tables.read().await;
        Ok(tables.trainings.get(&id).map(|t| view(&tables, t)))
    }

    async fn update_training(&self, training: &Training) -> DbResult<Training> {
        let mut tables = self.tables.write().await;
        let mut updated = training.clone();
        updated.updated_at = Utc::now();
        tables.trainings.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_training(&self, id: i64) -> DbResult<()> {
        self.tables.write().await.remove_training(id);
        Ok(())
    }

    async fn list_trainings(
        &self,
        filter: &TrainingFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<TrainingView>, i64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<TrainingView> = tables
            .trainings
            .values()
            .map(|t| view(&tables, t))
            .filter(|v| matches(v, filter))
            .collect();
        match filter.order {
            TrainingOrder::Newest => rows.sort_by(|a, b| {
                (b.training.created_at, b.training.id).cmp(&(a.training.created_at, a.training.id))
            }),
            TrainingOrder::SoonestStart => rows.sort_by(|a, b| {
                (a.training.start_date, a.training.id).cmp(&(b.training.start_date, b.training.id))
            }),
        }
        Ok(paginate(rows, page))
    }

    async fn upcoming_doctors(&self, from: NaiveDate) -> DbResult<Vec<UpcomingDoctor>> {
        let tables = self.tables.read().await;
        let mut grouped: BTreeMap<i64, UpcomingDoctor> = BTreeMap::new();
        for training in tables
            .trainings
            .values()
            .filter(|t| t.start_date.date_naive() >= from)
        {
            grouped
                .entry(training.doctor_user_id)
                .and_modify(|doctor| {
                    doctor.trainings_count += 1;
                    doctor.next_start_at = doctor.next_start_at.min(training.start_date);
                })
                .or_insert_with(|| {
                    let profile = tables.doctor_profile(training.doctor_user_id);
                    UpcomingDoctor {
                        doctor_id: training.doctor_user_id,
                        name: profile.map(|p| p.name.clone()),
                        title: profile.and_then(|p| p.title.clone()),
                        hospital: profile.map(|p| p.hospital.clone()),
                        next_start_at: training.start_date,
                        trainings_count: 1,
                    }
                });
        }

        let mut doctors: Vec<UpcomingDoctor> = grouped.into_values().collect();
        doctors.sort_by(|a, b| (a.next_start_at, a.doctor_id).cmp(&(b.next_start_at, b.doctor_id)));
        Ok(doctors)
    }

    async fn create_booking(&self, new: NewBooking) -> DbResult<Booking> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let booking = Booking {
            id,
            parent_user_id: new.parent_user_id,
            doctor_user_id: new.doctor_user_id,
            training_id: new.training_id,
            status: BookingStatus::Submitted,
            intake: new.intake,
            created_at: Utc::now(),
        };
        tables.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn find_booking(&self, id: i64) -> DbResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<BookingView>, i64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<BookingView> = tables
            .bookings
            .values()
            .filter(|b| filter.parent_user_id.map_or(true, |id| id == b.parent_user_id))
            .filter(|b| filter.doctor_user_id.map_or(true, |id| id == b.doctor_user_id))
            .filter_map(|b| {
                let training = tables.trainings.get(&b.training_id)?;
                Some(BookingView {
                    booking: b.clone(),
                    training_title: training.title.clone(),
                    training_start_date: training.start_date,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (b.booking.created_at, b.booking.id).cmp(&(a.booking.created_at, a.booking.id))
        });
        Ok(paginate(rows, page))
    }

    async fn set_booking_status(&self, id: i64, status: BookingStatus) -> DbResult<Option<Booking>> {
        let mut tables = self.tables.write().await;
        Ok(tables.bookings.get_mut(&id).map(|booking| {
            booking.status = status;
            booking.clone()
        }))
    }
}
