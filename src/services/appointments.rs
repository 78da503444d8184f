//! Appointment requests from parents and their handling by staff.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use super::validate;
use super::{Created, ServiceError, ServiceResult};
use crate::auth::Identity;
use crate::authz::OwnershipGuard;
use crate::database::models::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentView, ChildIntake, NewAppointment, Role,
};
use crate::database::repository::{AccountRepo, AppointmentRepo};
use crate::database::Store;
use crate::filter::{limits, normalize_keyword, Page, PageLimits, PageRequest};

/// Child and guardian fields shared by appointment and booking forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeForm {
    pub child_name: String,
    pub child_age: i32,
    pub child_gender: String,
    pub parent_name: String,
    pub parent_phone: String,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<String>,
    pub symptoms: Option<String>,
    pub previous_treatment: Option<String>,
}

impl IntakeForm {
    pub fn validate(&self, min_age: i32) -> ServiceResult<ChildIntake> {
        Ok(ChildIntake {
            child_name: validate::text("childName", &self.child_name, 1, 50)?,
            child_age: validate::range("childAge", self.child_age, min_age, 18)?,
            child_gender: validate::text("childGender", &self.child_gender, 1, 10)?,
            parent_name: validate::text("parentName", &self.parent_name, 1, 50)?,
            parent_phone: validate::phone("parentPhone", &self.parent_phone)?,
            preferred_date: self.preferred_date,
            preferred_time: validate::optional_text("preferredTime", self.preferred_time.as_deref(), 50)?,
            symptoms: validate::optional_text("symptoms", self.symptoms.as_deref(), 2000)?,
            previous_treatment: validate::optional_text(
                "previousTreatment",
                self.previous_treatment.as_deref(),
                2000,
            )?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub doctor_id: i64,
    #[serde(flatten)]
    pub intake: IntakeForm,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    pub status: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct AppointmentService {
    store: Arc<dyn Store>,
    parent_side: OwnershipGuard,
    staff_side: OwnershipGuard,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn Store>, conceal: bool) -> Self {
        Self {
            store,
            parent_side: OwnershipGuard::owner_only(conceal),
            staff_side: OwnershipGuard::new(&[Role::SuperAdmin, Role::SchoolAdmin], conceal),
        }
    }

    pub async fn create(&self, caller: &Identity, request: AppointmentRequest) -> ServiceResult<Created> {
        let intake = request.intake.validate(0)?;
        match self.store.find_account(request.doctor_id).await? {
            Some(doctor) if doctor.role == Role::Doctor && doctor.enabled => {}
            _ => return Err(ServiceError::invalid("doctorId", "Doctor does not exist")),
        }

        let appointment = self
            .store
            .create_appointment(NewAppointment {
                parent_user_id: caller.id,
                doctor_user_id: request.doctor_id,
                intake,
            })
            .await?;
        info!(appointment = appointment.id, parent = caller.id, "Appointment requested");
        Ok(Created::new(appointment.id))
    }

    pub async fn mine(&self, caller: &Identity, query: AppointmentQuery) -> ServiceResult<Page<AppointmentView>> {
        let filter = AppointmentFilter {
            parent_user_id: Some(caller.id),
            status: validate::status_filter("status", query.status.as_deref())?,
            keyword: normalize_keyword(query.q.as_deref()),
            ..Default::default()
        };
        self.list(filter, &query, limits::PARENT_APPOINTMENTS).await
    }

    /// Parents may cancel only while the request is still pending.
    pub async fn cancel(&self, caller: &Identity, id: i64, request: CancelRequest) -> ServiceResult<Appointment> {
        let appointment = self.store.find_appointment(id).await?;
        let appointment = self
            .parent_side
            .authorize_by(appointment, caller, "Appointment", |a| a.parent_user_id)?;
        if appointment.status != AppointmentStatus::Pending {
            return Err(ServiceError::invalid(
                "status",
                "Only pending appointments can be cancelled",
            ));
        }

        let reason = validate::optional_text("reason", request.reason.as_deref(), 500)?;
        let updated = self
            .store
            .update_appointment_status(id, AppointmentStatus::Cancelled, reason.as_deref())
            .await?
            .ok_or_else(|| ServiceError::not_found("Appointment"))?;
        info!(appointment = id, parent = caller.id, "Appointment cancelled");
        Ok(updated)
    }

    /// Staff queue. Doctors only ever see their own appointments.
    pub async fn list_for_staff(
        &self,
        caller: &Identity,
        query: AppointmentQuery,
    ) -> ServiceResult<Page<AppointmentView>> {
        let filter = AppointmentFilter {
            doctor_user_id: (caller.role == Role::Doctor).then_some(caller.id),
            status: validate::status_filter("status", query.status.as_deref())?,
            keyword: normalize_keyword(query.q.as_deref()),
            ..Default::default()
        };
        self.list(filter, &query, limits::ADMIN_APPOINTMENTS).await
    }

    /// Any valid status may be set; there is no transition graph.
    pub async fn update_status(&self, caller: &Identity, id: i64, update: StatusUpdate) -> ServiceResult<Appointment> {
        let status: AppointmentStatus = validate::parse_enum("status", &update.status)?;
        let notes = validate::optional_text("notes", update.notes.as_deref(), 2000)?;

        let appointment = self.store.find_appointment(id).await?;
        self.staff_side
            .authorize_by(appointment, caller, "Appointment", |a| a.doctor_user_id)?;

        let updated = self
            .store
            .update_appointment_status(id, status, notes.as_deref())
            .await?
            .ok_or_else(|| ServiceError::not_found("Appointment"))?;
        info!(appointment = id, status = %status, by = caller.id, "Appointment status changed");
        Ok(updated)
    }

    async fn list(
        &self,
        filter: AppointmentFilter,
        query: &AppointmentQuery,
        limits: PageLimits,
    ) -> ServiceResult<Page<AppointmentView>> {
        let page = PageRequest::resolve(query.page, query.page_size, limits);
        let (items, total) = self.store.list_appointments(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_intake, TestContext};

    fn form() -> IntakeForm {
        let intake = sample_intake();
        IntakeForm {
            child_name: intake.child_name,
            child_age: intake.child_age,
            child_gender: intake.child_gender,
            parent_name: intake.parent_name,
            parent_phone: intake.parent_phone,
            preferred_date: None,
            preferred_time: intake.preferred_time,
            symptoms: intake.symptoms,
            previous_treatment: None,
        }
    }

    async fn book(ctx: &TestContext, parent: &Identity, doctor: &Identity) -> i64 {
        ctx.services
            .appointments
            .create(
                parent,
                AppointmentRequest {
                    doctor_id: doctor.id,
                    intake: form(),
                },
            )
            .await
            .unwrap()
            .id
    }

    fn status(value: &str) -> StatusUpdate {
        StatusUpdate {
            status: value.into(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn lifecycle_blocks_cancel_after_confirmation() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Wu").await;
        let id = book(&ctx, &parent, &doctor).await;

        let queue = ctx
            .services
            .appointments
            .list_for_staff(&doctor, AppointmentQuery::default())
            .await
            .unwrap();
        assert_eq!(queue.total, 1);
        assert_eq!(queue.items[0].appointment.status, AppointmentStatus::Pending);
        assert_eq!(queue.items[0].doctor_name.as_deref(), Some("Dr. Wu"));

        ctx.services
            .appointments
            .update_status(&doctor, id, status("confirmed"))
            .await
            .unwrap();
        let cancel = ctx
            .services
            .appointments
            .cancel(&parent, id, CancelRequest::default())
            .await;
        assert!(matches!(cancel, Err(ServiceError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn pending_cancel_stores_reason() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Wu").await;
        let id = book(&ctx, &parent, &doctor).await;

        let cancelled = ctx
            .services
            .appointments
            .cancel(&parent, id, CancelRequest { reason: Some("schedule clash".into()) })
            .await
            .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.notes.as_deref(), Some("schedule clash"));
    }

    #[tokio::test]
    async fn other_doctors_cannot_touch_the_appointment() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Wu").await;
        let other = ctx.doctor("Dr. Ma").await;
        let id = book(&ctx, &parent, &doctor).await;

        let result = ctx.services.appointments.update_status(&other, id, status("rejected")).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
        let unchanged = ctx.store.find_appointment(id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, AppointmentStatus::Pending);

        let queue = ctx
            .services
            .appointments
            .list_for_staff(&other, AppointmentQuery::default())
            .await
            .unwrap();
        assert_eq!(queue.total, 0);

        let school = ctx.account(Role::SchoolAdmin).await;
        assert!(ctx.services.appointments.update_status(&school, id, status("completed")).await.is_ok());
    }

    #[tokio::test]
    async fn concealment_turns_forbidden_into_not_found() {
        let ctx = TestContext::with_config(|c| c.security.conceal_foreign_records = true);
        let parent = ctx.account(Role::Parent).await;
        let stranger = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Wu").await;
        let id = book(&ctx, &parent, &doctor).await;

        let result = ctx
            .services
            .appointments
            .cancel(&stranger, id, CancelRequest::default())
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_validates_intake_and_doctor() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Wu").await;

        let mut bad = form();
        bad.parent_phone = "123".into();
        let result = ctx
            .services
            .appointments
            .create(&parent, AppointmentRequest { doctor_id: doctor.id, intake: bad })
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidInput { .. })));

        let result = ctx
            .services
            .appointments
            .create(&parent, AppointmentRequest { doctor_id: parent.id, intake: form() })
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn parent_listing_filters_and_clamps() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let doctor = ctx.doctor("Dr. Wu").await;
        let first = book(&ctx, &parent, &doctor).await;
        book(&ctx, &parent, &doctor).await;
        ctx.services
            .appointments
            .cancel(&parent, first, CancelRequest::default())
            .await
            .unwrap();

        let pending = ctx
            .services
            .appointments
            .mine(
                &parent,
                AppointmentQuery {
                    status: Some("pending".into()),
                    page_size: Some(500),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.page_size, 100);

        let all = ctx
            .services
            .appointments
            .mine(&parent, AppointmentQuery { status: Some("all".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(all.total, 2);
    }
}
