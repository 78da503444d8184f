use async_trait::async_trait;
use chrono::Utc;

use super::{paginate, MemoryStore};
use crate::database::models::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentView, NewAppointment,
};
use crate::database::repository::{AppointmentRepo, DbResult};
use crate::filter::{contains_keyword, PageRequest};

fn matches(appointment: &Appointment, filter: &AppointmentFilter) -> bool {
    if filter.parent_user_id.is_some_and(|id| id != appointment.parent_user_id) {
        return false;
    }
    if filter.doctor_user_id.is_some_and(|id| id != appointment.doctor_user_id) {
        return false;
    }
    if filter.status.is_some_and(|status| status != appointment.status) {
        return false;
    }
    match filter.keyword.as_deref() {
        Some(kw) => {
            let intake = &appointment.intake;
            contains_keyword(Some(&intake.child_name), kw)
                || contains_keyword(Some(&intake.parent_name), kw)
                || contains_keyword(Some(&intake.parent_phone), kw)
                || contains_keyword(intake.symptoms.as_deref(), kw)
        }
        None => true,
    }
}

#[async_trait]
impl AppointmentRepo for MemoryStore {
    async fn create_appointment(&self, new: NewAppointment) -> DbResult<Appointment> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let appointment = Appointment {
            id,
            parent_user_id: new.parent_user_id,
            doctor_user_id: new.doctor_user_id,
            intake: new.intake,
            status: AppointmentStatus::Pending,
            notes: None,
            created_at: Utc::now(),
        };
        tables.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn find_appointment(&self, id: i64) -> DbResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<AppointmentView>, i64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Appointment> = tables
            .appointments
            .values()
            .filter(|a| matches(a, filter))
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let views = rows
            .into_iter()
            .map(|appointment| {
                let doctor = tables.doctor_profile(appointment.doctor_user_id);
                AppointmentView {
                    appointment: appointment.clone(),
                    doctor_name: doctor.map(|d| d.name.clone()),
                    doctor_hospital: doctor.map(|d| d.hospital.clone()),
                    doctor_title: doctor.and_then(|d| d.title.clone()),
                }
            })
            .collect();
        Ok(paginate(views, page))
    }

    async fn update_appointment_status(
        &self,
        id: i64,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> DbResult<Option<Appointment>> {
        let mut tables = self.tables.write().await;
        let Some(appointment) = tables.appointments.get_mut(&id) else {
            return Ok(None);
        };
        appointment.status = status;
        if let Some(notes) = notes {
            appointment.notes = Some(notes.to_string());
        }
        Ok(Some(appointment.clone()))
    }
}
