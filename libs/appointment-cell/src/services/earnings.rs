use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::DoctorProfileStore;
use shared_database::StoreError;

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, EarningsBucket,
    EarningsPeriod, EarningsReport, SortOrder,
};
use crate::services::store::AppointmentStore;

/// Read-only earnings view over completed appointments. Every appointment is valued at
/// the doctor's current consultation fee.
pub struct EarningsService {
    store: Arc<dyn AppointmentStore>,
    profiles: Arc<dyn DoctorProfileStore>,
}

impl EarningsService {
    pub fn new(store: Arc<dyn AppointmentStore>, profiles: Arc<dyn DoctorProfileStore>) -> Self {
        Self { store, profiles }
    }

    pub async fn doctor_earnings(
        &self,
        doctor_user_id: Uuid,
        period: EarningsPeriod,
    ) -> Result<EarningsReport, AppointmentError> {
        let profile = self
            .profiles
            .get_by_user_id(doctor_user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AppointmentError::NotFoundOrForbidden("Doctor profile"),
                other => other.into(),
            })?;

        let filter = AppointmentFilter::ordered(SortOrder::Ascending)
            .with_statuses(&[AppointmentStatus::Completed]);
        let completed = self.store.find_by_doctor_profile(profile.id, &filter).await?;

        debug!(
            "Aggregating {} completed appointments for doctor profile {}",
            completed.len(),
            profile.id
        );
        Ok(aggregate(&completed, profile.consultation_fees, period))
    }
}

fn bucket_label(at: DateTime<Utc>, period: EarningsPeriod) -> Option<String> {
    match period {
        EarningsPeriod::Daily => Some(at.format("%Y-%m-%d").to_string()),
        EarningsPeriod::Weekly => {
            let week = at.iso_week();
            Some(format!("{}-{:02}", week.year(), week.week()))
        }
        EarningsPeriod::Monthly => Some(at.format("%Y-%m").to_string()),
        EarningsPeriod::Yearly => Some(at.format("%Y").to_string()),
        EarningsPeriod::All => None,
    }
}

/// Totals over completed appointments and, unless the period is `All`, per-bucket
/// totals ordered by label.
pub fn aggregate(appointments: &[Appointment], fee: f64, period: EarningsPeriod) -> EarningsReport {
    let completed: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .collect();

    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
    for appointment in &completed {
        if let Some(label) = bucket_label(appointment.scheduled_at, period) {
            *buckets.entry(label).or_default() += 1;
        }
    }

    let total_appointments = completed.len() as u64;
    EarningsReport {
        total_earnings: fee * total_appointments as f64,
        total_appointments,
        grouped_data: buckets
            .into_iter()
            .map(|(label, count)| EarningsBucket {
                label,
                total: fee * count as f64,
                count,
            })
            .collect(),
        period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::AppointmentMode;

    fn completed_at(y: i32, m: u32, d: u32) -> Appointment {
        let at = Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap();
        let mut appointment = Appointment::new(Uuid::new_v4(), Uuid::new_v4(), at, AppointmentMode::Online);
        appointment.status = AppointmentStatus::Completed;
        appointment
    }

    #[test]
    fn test_no_completed_appointments_is_zero() {
        let mut pending = completed_at(2024, 1, 1);
        pending.status = AppointmentStatus::Accepted;

        let report = aggregate(&[pending], 500.0, EarningsPeriod::Monthly);
        assert_eq!(report.total_earnings, 0.0);
        assert_eq!(report.total_appointments, 0);
        assert!(report.grouped_data.is_empty());
    }

    #[test]
    fn test_monthly_buckets_are_ordered_by_label() {
        let appointments = vec![
            completed_at(2024, 3, 5),
            completed_at(2024, 1, 20),
            completed_at(2024, 3, 28),
        ];

        let report = aggregate(&appointments, 200.0, EarningsPeriod::Monthly);
        assert_eq!(report.total_earnings, 600.0);
        assert_eq!(report.total_appointments, 3);
        assert_eq!(
            report.grouped_data,
            vec![
                EarningsBucket { label: "2024-01".to_string(), total: 200.0, count: 1 },
                EarningsBucket { label: "2024-03".to_string(), total: 400.0, count: 2 },
            ]
        );
    }

    #[test]
    fn test_weekly_buckets_use_iso_week_year() {
        // 2024-12-30 falls in ISO week 1 of 2025.
        let report = aggregate(&[completed_at(2024, 12, 30)], 100.0, EarningsPeriod::Weekly);
        assert_eq!(report.grouped_data[0].label, "2025-01");
    }

    #[test]
    fn test_all_period_has_no_buckets() {
        let report = aggregate(&[completed_at(2024, 5, 1)], 100.0, EarningsPeriod::All);
        assert_eq!(report.total_appointments, 1);
        assert!(report.grouped_data.is_empty());
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("weekly".parse::<EarningsPeriod>().unwrap(), EarningsPeriod::Weekly);
        assert_eq!("".parse::<EarningsPeriod>().unwrap(), EarningsPeriod::All);
        assert!("hourly".parse::<EarningsPeriod>().is_err());
    }
}
