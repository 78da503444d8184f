use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::PgStore;
use crate::database::models::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentView, NewAppointment,
};
use crate::database::repository::{AppointmentRepo, DbResult};
use crate::filter::{like_pattern, PageRequest};

const VIEW_SELECT: &str = "SELECT a.*, dp.name AS doctor_name, dp.hospital AS doctor_hospital, \
     dp.title AS doctor_title";

fn filtered<'a>(head: &str, filter: &'a AppointmentFilter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(
        " FROM doctor_appointments a \
          LEFT JOIN doctor_profiles dp ON dp.user_id = a.doctor_user_id WHERE 1=1",
    );
    if let Some(parent) = filter.parent_user_id {
        qb.push(" AND a.parent_user_id = ").push_bind(parent);
    }
    if let Some(doctor) = filter.doctor_user_id {
        qb.push(" AND a.doctor_user_id = ").push_bind(doctor);
    }
    if let Some(status) = filter.status {
        qb.push(" AND a.status = ").push_bind(status.as_str());
    }
    if let Some(keyword) = filter.keyword.as_deref() {
        let pattern = like_pattern(keyword);
        qb.push(" AND (a.child_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.parent_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.parent_phone ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.symptoms ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb
}

#[async_trait]
impl AppointmentRepo for PgStore {
    async fn create_appointment(&self, new: NewAppointment) -> DbResult<Appointment> {
        let intake = new.intake;
        let appointment = sqlx::query_as::<_, Appointment>(
            "INSERT INTO doctor_appointments \
                 (parent_user_id, doctor_user_id, child_name, child_age, child_gender, \
                  parent_name, parent_phone, preferred_date, preferred_time, symptoms, \
                  previous_treatment, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending') \
             RETURNING *",
        )
        .bind(new.parent_user_id)
        .bind(new.doctor_user_id)
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
        Ok(appointment)
    }

    async fn find_appointment(&self, id: i64) -> DbResult<Option<Appointment>> {
        let appointment =
            sqlx::query_as::<_, Appointment>("SELECT * FROM doctor_appointments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(appointment)
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<AppointmentView>, i64)> {
        let total: i64 = filtered("SELECT COUNT(*)", filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = filtered(VIEW_SELECT, filter);
        qb.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb
            .build_query_as::<AppointmentView>()
            .fetch_all(&self.pool)
            .await?;

        Ok((items, total))
    }

    async fn update_appointment_status(
        &self,
        id: i64,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> DbResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(
            "UPDATE doctor_appointments SET status = $2, notes = COALESCE($3, notes) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(appointment)
    }
}
