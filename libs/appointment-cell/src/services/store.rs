use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_database::StoreError;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, SortOrder};

const TABLE: &str = "appointments";

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, StoreError>;
    async fn find_by_doctor_profile(
        &self,
        doctor_profile_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError>;
    async fn find_by_patient(
        &self,
        patient_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError>;
    async fn save(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;
    /// Writes `appointment` only if the stored row still has status `expected`.
    /// Returns `StaleState` when the row moved on since it was read.
    async fn save_if_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<Appointment, StoreError>;
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn build_query(scope: String, filter: &AppointmentFilter) -> String {
        let mut query_parts = vec![scope];

        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }

        match filter.statuses.as_slice() {
            [] => {}
            [status] => query_parts.push(format!("status=eq.{}", status)),
            statuses => {
                let list = statuses
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                query_parts.push(format!("status=in.({})", list));
            }
        }

        if let Some(after) = filter.scheduled_after {
            let timestamp = after.to_rfc3339_opts(SecondsFormat::Secs, true);
            query_parts.push(format!("scheduled_at=gt.{}", urlencoding::encode(&timestamp)));
        }

        query_parts.push(format!("order=scheduled_at.{}", filter.order.as_str()));
        query_parts.join("&")
    }

    async fn find(&self, query: String) -> Result<Vec<Appointment>, StoreError> {
        debug!("Querying appointments: {}", query);
        Ok(self.supabase.select(TABLE, &query).await?)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let row = serde_json::to_value(appointment)?;
        let rows: Vec<Appointment> = self.supabase.insert(TABLE, row).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Insert returned no row".to_string()))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, StoreError> {
        self.find(format!("id=eq.{}", id))
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_doctor_profile(
        &self,
        doctor_profile_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let scope = format!("doctor_profile_id=eq.{}", doctor_profile_id);
        self.find(Self::build_query(scope, filter)).await
    }

    async fn find_by_patient(
        &self,
        patient_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let scope = format!("patient_id=eq.{}", patient_id);
        self.find(Self::build_query(scope, filter)).await
    }

    async fn save(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let patch = serde_json::to_value(appointment)?;
        let rows: Vec<Appointment> = self
            .supabase
            .update(TABLE, &format!("id=eq.{}", appointment.id), patch)
            .await?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn save_if_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let patch = serde_json::to_value(appointment)?;
        let query = format!("id=eq.{}&status=eq.{}", appointment.id, expected);
        let rows: Vec<Appointment> = self.supabase.update(TABLE, &query, patch).await?;

        rows.into_iter().next().ok_or_else(|| {
            warn!(
                "Conditional update of appointment {} matched nothing (expected {})",
                appointment.id, expected
            );
            StoreError::StaleState
        })
    }
}

/// Process-local store used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn find_where<F>(&self, scope: F, filter: &AppointmentFilter) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut found: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| scope(a) && filter.matches(a))
            .cloned()
            .collect();

        found.sort_by_key(|a| a.scheduled_at);
        if filter.order == SortOrder::Descending {
            found.reverse();
        }
        found
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(StoreError::Backend(format!(
                "Duplicate appointment id {}",
                appointment.id
            )));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, StoreError> {
        self.appointments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_doctor_profile(
        &self,
        doctor_profile_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .find_where(|a| a.doctor_profile_id == doctor_profile_id, filter)
            .await)
    }

    async fn find_by_patient(
        &self,
        patient_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.find_where(|a| a.patient_id == patient_id, filter).await)
    }

    async fn save(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;
        let stored = appointments
            .get_mut(&appointment.id)
            .ok_or(StoreError::NotFound)?;
        *stored = appointment.clone();
        Ok(stored.clone())
    }

    async fn save_if_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;
        let stored = appointments
            .get_mut(&appointment.id)
            .ok_or(StoreError::NotFound)?;

        if stored.status != expected {
            return Err(StoreError::StaleState);
        }

        *stored = appointment.clone();
        Ok(stored.clone())
    }
}
