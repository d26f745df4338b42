//! Certificate issuance and per-user listing.
//!
//! Certificates are immutable once written: there is no update or delete
//! path, and issuing twice for the same course yields two records.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::models::{
    certificate_key, user_certificates_index, AppState, Certificate, GenerateCertificateRequest,
};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate-certificate", post(generate_certificate))
        .route("/certificates", get(list_certificates))
        .with_state(state)
}

async fn generate_certificate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<GenerateCertificateRequest>,
) -> AppResult<Json<Value>> {
    let missing = || {
        AppError::BadRequest("Missing required fields: courseId, courseName".to_string())
    };
    let course_id = payload.course_id.filter(|c| !c.is_empty()).ok_or_else(missing)?;
    let course_name = payload
        .course_name
        .filter(|c| !c.is_empty())
        .ok_or_else(missing)?;

    let now = Utc::now();
    let certificate = Certificate {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        course_id: course_id.clone(),
        course_name,
        student_name: user.display_name_or("Student"),
        completion_date: payload
            .completion_date
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| now.to_rfc3339()),
        generated_at: now,
        // display number only; the UUID id is the key, so a same-millisecond
        // collision here stays cosmetic
        certificate_number: format!("SW-{}-{}", course_id, now.timestamp_millis()),
    };

    state
        .kv
        .set(
            &certificate_key(&certificate.id),
            serde_json::to_value(&certificate)?,
        )
        .await?;

    state
        .indexes
        .add(&user_certificates_index(&user.id), &certificate.id)
        .await?;

    info!(certificate_id = %certificate.id, course_id = %course_id, "Certificate generated");

    Ok(Json(json!({
        "success": true,
        "certificate": certificate,
        "message": "Certificate generated successfully"
    })))
}

async fn list_certificates(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Value>> {
    let certificate_ids = state
        .indexes
        .ids(&user_certificates_index(&user.id))
        .await?;

    let mut certificates = Vec::new();
    for certificate_id in certificate_ids {
        let Some(value) = state.kv.get(&certificate_key(&certificate_id)).await? else {
            continue;
        };
        let certificate: Certificate = serde_json::from_value(value)?;
        certificates.push(certificate);
    }

    certificates.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));

    Ok(Json(json!({
        "success": true,
        "total": certificates.len(),
        "certificates": certificates
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::testing::{user, StaticVerifier};
    use crate::routes::testing::state_with_auth;

    fn request(course_id: &str, course_name: &str) -> GenerateCertificateRequest {
        GenerateCertificateRequest {
            course_id: Some(course_id.to_string()),
            course_name: Some(course_name.to_string()),
            completion_date: None,
        }
    }

    async fn generate(state: &AppState, caller: &AuthUser, course_id: &str) -> Certificate {
        let response = generate_certificate(
            State(state.clone()),
            caller.clone(),
            Json(request(course_id, "Sprint Mechanics")),
        )
        .await
        .unwrap();
        serde_json::from_value(response.0["certificate"].clone()).unwrap()
    }

    #[tokio::test]
    async fn generating_twice_yields_two_certificates() {
        let state = state_with_auth(StaticVerifier::default());
        let caller = user("u1", "runner@example.com");

        let first = generate(&state, &caller, "course-1").await;
        let second = generate(&state, &caller, "course-1").await;
        assert_ne!(first.id, second.id);

        let response = list_certificates(State(state), caller).await.unwrap();
        assert_eq!(response.0["total"], 2);
        let listed: Vec<Certificate> =
            serde_json::from_value(response.0["certificates"].clone()).unwrap();
        assert!(listed.iter().any(|c| c.id == first.id));
        assert!(listed.iter().any(|c| c.id == second.id));
    }

    #[tokio::test]
    async fn generate_fills_snapshot_fields_and_defaults() {
        let state = state_with_auth(StaticVerifier::default());
        let mut caller = user("u1", "runner@example.com");
        caller.full_name = Some("Amina Diallo".to_string());

        let certificate = generate(&state, &caller, "course-7").await;
        assert_eq!(certificate.user_id, "u1");
        assert_eq!(certificate.student_name, "Amina Diallo");
        assert!(certificate.certificate_number.starts_with("SW-course-7-"));
        assert!(!certificate.completion_date.is_empty());
    }

    #[tokio::test]
    async fn generate_requires_course_id_and_name() {
        let state = state_with_auth(StaticVerifier::default());
        let caller = user("u1", "runner@example.com");

        for payload in [
            GenerateCertificateRequest {
                course_id: None,
                course_name: Some("X".to_string()),
                completion_date: None,
            },
            GenerateCertificateRequest {
                course_id: Some("c1".to_string()),
                course_name: None,
                completion_date: None,
            },
        ] {
            let result =
                generate_certificate(State(state.clone()), caller.clone(), Json(payload)).await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_caller() {
        let state = state_with_auth(StaticVerifier::default());
        let alice = user("u1", "alice@example.com");
        let bob = user("u2", "bob@example.com");

        generate(&state, &alice, "course-1").await;
        generate(&state, &bob, "course-2").await;

        let response = list_certificates(State(state), alice).await.unwrap();
        assert_eq!(response.0["total"], 1);
        let listed: Vec<Certificate> =
            serde_json::from_value(response.0["certificates"].clone()).unwrap();
        assert_eq!(listed[0].course_id, "course-1");
    }
}
