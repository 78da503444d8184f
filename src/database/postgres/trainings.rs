use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};

use super::PgStore;
use crate::database::models::{
    Booking, BookingFilter, BookingStatus, BookingView, NewBooking, NewTraining, Training,
    TrainingFilter, TrainingOrder, TrainingView, UpcomingDoctor,
};
use crate::database::repository::{DbResult, TrainingRepo};
use crate::filter::{like_pattern, PageRequest};

const TRAINING_VIEW_SELECT: &str = "SELECT t.*, dp.name AS doctor_name, \
     dp.hospital AS doctor_hospital, dp.title AS doctor_title";

fn filtered_trainings<'a>(head: &str, filter: &'a TrainingFilter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(
        " FROM trainings t LEFT JOIN doctor_profiles dp ON dp.user_id = t.doctor_user_id \
          WHERE 1=1",
    );
    if let Some(doctor) = filter.doctor_user_id {
        qb.push(" AND t.doctor_user_id = ").push_bind(doctor);
    }
    if let Some(from) = filter.starting_from {
        qb.push(" AND (t.start_date AT TIME ZONE 'UTC')::date >= ")
            .push_bind(from);
    }
    if let Some(kind) = filter.training_type {
        qb.push(" AND t.type = ").push_bind(kind.as_str());
    }
    if let Some(keyword) = filter.keyword.as_deref() {
        let pattern = like_pattern(keyword);
        qb.push(" AND (t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR dp.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR dp.hospital ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb
}

fn filtered_bookings<'a>(head: &str, filter: &'a BookingFilter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(" FROM training_bookings b JOIN trainings t ON t.id = b.training_id WHERE 1=1");
    if let Some(parent) = filter.parent_user_id {
        qb.push(" AND b.parent_user_id = ").push_bind(parent);
    }
    if let Some(doctor) = filter.doctor_user_id {
        qb.push(" AND b.doctor_user_id = ").push_bind(doctor);
    }
    qb
}

#[async_trait]
impl TrainingRepo for PgStore {
    async fn create_training(&self, new: NewTraining) -> DbResult<Training> {
        let training = sqlx::query_as::<_, Training>(
            "INSERT INTO trainings \
                 (doctor_user_id, title, description, type, duration_hours, max_participants, start_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(new.doctor_user_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.training_type.as_str())
        .bind(new.duration_hours)
        .bind(new.max_participants)
        .bind(new.start_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(training)
    }

    async fn find_training(&self, id: i64) -> DbResult<Option<TrainingView>> {
        let mut qb = QueryBuilder::<Postgres>::new(TRAINING_VIEW_SELECT);
        qb.push(
            " FROM trainings t LEFT JOIN doctor_profiles dp ON dp.user_id = t.doctor_user_id \
              WHERE t.id = ",
        )
        .push_bind(id);
        let training = qb
            .build_query_as::<TrainingView>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(training)
    }

    async fn update_training(&self, training: &Training) -> DbResult<Training> {
        let updated = sqlx::query_as::<_, Training>(
            "UPDATE trainings SET title = $2, description = $3, type = $4, duration_hours = $5, \
                 max_participants = $6, start_date = $7, updated_at = now() \
             WHERE id = $1 RETURNING *",
        )
        .bind(training.id)
        .bind(&training.title)
        .bind(&training.description)
        .bind(training.training_type.as_str())
        .bind(training.duration_hours)
        .bind(training.max_participants)
        .bind(training.start_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_training(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM trainings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_trainings(
        &self,
        filter: &TrainingFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<TrainingView>, i64)> {
        let total: i64 = filtered_trainings("SELECT COUNT(*)", filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = filtered_trainings(TRAINING_VIEW_SELECT, filter);
        match filter.order {
            TrainingOrder::Newest => qb.push(" ORDER BY t.created_at DESC, t.id DESC"),
            TrainingOrder::SoonestStart => qb.push(" ORDER BY t.start_date ASC, t.id ASC"),
        };
        qb.push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb
            .build_query_as::<TrainingView>()
            .fetch_all(&self.pool)
            .await?;

        Ok((items, total))
    }

    async fn upcoming_doctors(&self, from: NaiveDate) -> DbResult<Vec<UpcomingDoctor>> {
        let doctors = sqlx::query_as::<_, UpcomingDoctor>(
            "SELECT t.doctor_user_id AS doctor_id, dp.name, dp.title, dp.hospital, \
                 MIN(t.start_date) AS next_start_at, COUNT(*) AS trainings_count \
             FROM trainings t LEFT JOIN doctor_profiles dp ON dp.user_id = t.doctor_user_id \
             WHERE (t.start_date AT TIME ZONE 'UTC')::date >= $1 \
             GROUP BY t.doctor_user_id, dp.name, dp.title, dp.hospital \
             ORDER BY next_start_at ASC, doctor_id ASC",
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        Ok(doctors)
    }

    async fn create_booking(&self, new: NewBooking) -> DbResult<Booking> {
        let intake = new.intake;
        let booking = sqlx::query_as::<_, Booking>(
            "INSERT INTO training_bookings \
                 (parent_user_id, doctor_user_id, training_id, status, child_name, child_age, \
                  child_gender, parent_name, parent_phone, preferred_date, preferred_time, \
                  symptoms, previous_treatment) \
             VALUES ($1, $2, $3, 'submitted', $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING *",
        )
        .bind(new.parent_user_id)
        .bind(new.doctor_user_id)
        .bind(new.training_id)
        .bind(intake.child_name)
        .bind(intake.child_age)
        .bind(intake.child_gender)
        .bind(intake.parent_name)
        .bind(intake.parent_phone)
        .bind(intake.preferred_date)
        .bind(intake.preferred_time)
        .bind(intake.symptoms)
        .bind(intake.previous_treatment)
        .fetch_one(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn find_booking(&self, id: i64) -> DbResult<Option<Booking>> {
        let booking =
            sqlx::query_as::<_, Booking>("SELECT * FROM training_bookings WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(booking)
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<BookingView>, i64)> {
        let total: i64 = filtered_bookings("SELECT COUNT(*)", filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = filtered_bookings(
            "SELECT b.*, t.title AS training_title, t.start_date AS training_start_date",
            filter,
        );
        qb.push(" ORDER BY b.created_at DESC, b.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb
            .build_query_as::<BookingView>()
            .fetch_all(&self.pool)
            .await?;

        Ok((items, total))
    }

    async fn set_booking_status(&self, id: i64, status: BookingStatus) -> DbResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE training_bookings SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }
}
