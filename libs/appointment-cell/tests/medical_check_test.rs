mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use appointment_cell::{
    AppointmentError, AppointmentStatus, CreateMedicalCheckRequest, TestStatus, TestType,
};
use common::{in_days, Clinic};

fn request(appointment_id: Uuid) -> CreateMedicalCheckRequest {
    CreateMedicalCheckRequest {
        appointment_id,
        test_type: TestType::Blood,
        location: "Home collection".to_string(),
    }
}

#[tokio::test]
async fn test_medical_check_lifecycle() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Completed, in_days(-1)).await;
    let checks = &clinic.state.medical_checks;

    let check = checks.create(clinic.doctor.id, request(appointment.id)).await.unwrap();
    assert_eq!(check.status, TestStatus::Pending);

    let early = checks.complete(clinic.doctor.id, check.id).await;
    assert_matches!(early, Err(AppointmentError::InvalidState(_)));

    let scheduled = checks.schedule(clinic.doctor.id, check.id, "Team A").await.unwrap();
    assert_eq!(scheduled.status, TestStatus::Scheduled);
    assert_eq!(scheduled.team_assigned.as_deref(), Some("Team A"));

    let done = checks.complete(clinic.doctor.id, check.id).await.unwrap();
    assert_eq!(done.status, TestStatus::Completed);

    let reported = checks
        .upload_report(clinic.doctor.id, check.id, "https://files.example.com/r1.pdf")
        .await
        .unwrap();
    assert_eq!(reported.status, TestStatus::Reported);
    assert!(reported.report_uploaded);
}

#[tokio::test]
async fn test_one_check_per_appointment() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Accepted, in_days(1)).await;
    let checks = &clinic.state.medical_checks;

    checks.create(clinic.doctor.id, request(appointment.id)).await.unwrap();
    let second = checks.create(clinic.doctor.id, request(appointment.id)).await;
    assert_matches!(second, Err(AppointmentError::InvalidState(_)));
}

#[tokio::test]
async fn test_report_upload_allowed_from_pending_and_requires_url() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Completed, in_days(-1)).await;
    let checks = &clinic.state.medical_checks;
    let check = checks.create(clinic.doctor.id, request(appointment.id)).await.unwrap();

    let empty = checks.upload_report(clinic.doctor.id, check.id, "  ").await;
    assert_matches!(empty, Err(AppointmentError::InvalidInput(_)));

    let reported = checks
        .upload_report(clinic.doctor.id, check.id, "https://files.example.com/r2.pdf")
        .await
        .unwrap();
    assert_eq!(reported.status, TestStatus::Reported);
}

#[tokio::test]
async fn test_other_doctor_cannot_touch_check() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Completed, in_days(-1)).await;
    let checks = &clinic.state.medical_checks;
    let check = checks.create(clinic.doctor.id, request(appointment.id)).await.unwrap();

    let other = doctor_cell::DoctorProfile::new(Uuid::new_v4(), "ENT", "LIC-002", 100.0);
    clinic.profiles.insert(other.clone()).await;

    assert_matches!(
        checks.schedule(other.user_id, check.id, "Team B").await,
        Err(AppointmentError::NotFoundOrForbidden("Medical check"))
    );
    assert_matches!(
        checks.create(other.user_id, request(appointment.id)).await,
        Err(AppointmentError::NotFoundOrForbidden("Appointment"))
    );
}

#[tokio::test]
async fn test_patient_test_history_newest_first() {
    let clinic = Clinic::new().await;
    let first = clinic.seed(AppointmentStatus::Completed, in_days(-9)).await;
    let second = clinic.seed(AppointmentStatus::Completed, in_days(-2)).await;
    let checks = &clinic.state.medical_checks;

    let older = checks.create(clinic.doctor.id, request(first.id)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = checks.create(clinic.doctor.id, request(second.id)).await.unwrap();

    let history = checks.patient_history(clinic.patient.id).await.unwrap();
    assert_eq!(history.iter().map(|c| c.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

    let stranger = checks.patient_history(Uuid::new_v4()).await.unwrap();
    assert!(stranger.is_empty());
}
