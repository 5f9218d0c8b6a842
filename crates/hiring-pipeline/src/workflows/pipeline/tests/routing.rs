use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::pipeline::memory::{
    InMemoryJobBoard, InMemoryPipelineStore, InMemoryUserDirectory, RecordingNotifier,
};
use crate::workflows::pipeline::router::{transition_handler, PipelineState, TransitionBody};
use crate::workflows::pipeline::stage::Stage;
use crate::workflows::pipeline::transition::TransitionTarget;

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

fn recruiter_json() -> Value {
    json!({
        "user_id": "u-recruiter",
        "name": "Riley Recruiter",
        "company_id": "acme",
    })
}

#[tokio::test]
async fn job_and_application_routes_round_trip() {
    let h = harness();
    let router = h.router(Arc::new(RecordingNotifier::default()));

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/jobs",
            json!({ "company_id": "acme", "title": "Data Analyst", "total_vacancies": 2 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let job = read_json_body(response).await;
    let job_id = job["id"].as_str().expect("job id").to_string();
    assert_eq!(job["status"], json!("active"));
    assert_eq!(job["filled_vacancies"], json!(0));

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/jobs/{job_id}/applications"),
            json!({ "seeker_id": "seeker-uma", "score": 71 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let application = read_json_body(response).await;
    assert_eq!(application["stage"], json!("IN_REVIEW"));
    assert_eq!(application["sub_stage"], json!("PROFILE_REVIEW"));
    let application_id = application["id"].as_str().expect("application id");

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/applications/{application_id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = read_json_body(response).await;
    assert_eq!(fetched["seeker_id"], json!("seeker-uma"));
}

#[tokio::test]
async fn transition_route_reports_outcome_and_dispatch() {
    let h = harness();
    let notifier = Arc::new(RecordingNotifier::default());
    let router = h.router(notifier.clone());
    let job = h.job(1);
    let application = h.apply(&job.id, "seeker-vic");
    h.ready_to_hire(&application.id);

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/applications/{}/transition", application.id),
            json!({ "actor": recruiter_json(), "stage": "HIRED" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json_body(response).await;
    assert_eq!(payload["application"]["stage"], json!("HIRED"));
    assert_eq!(payload["plan"]["kind"], json!("sequential_advance"));
    assert_eq!(payload["job"]["status"], json!("closed"));
    assert_eq!(payload["job"]["closure_type"], json!("AUTO_FILLED"));
    assert_eq!(payload["dispatch"]["delivered"], json!(1));
    assert_eq!(payload["events"][1]["event"], json!("job_auto_closed"));
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn transition_errors_map_to_status_codes() {
    let h = harness();
    let job = h.job(1);
    let application = h.apply(&job.id, "seeker-wes");
    let state = PipelineState {
        service: h.service.clone(),
        dispatcher: Arc::new(h.dispatcher(Arc::new(RecordingNotifier::default()))),
    };

    let call = |application_id: String, actor: crate::workflows::pipeline::Actor, target: TransitionTarget| {
        transition_handler::<
            InMemoryPipelineStore,
            InMemoryJobBoard,
            InMemoryUserDirectory,
            RecordingNotifier,
        >(
            State(state.clone()),
            Path(application_id),
            axum::Json(TransitionBody {
                actor,
                stage: target.stage,
                sub_stage: target.sub_stage,
                reason: target.reason,
            }),
        )
    };

    let response = call(
        "app-missing".to_string(),
        recruiter(),
        TransitionTarget::stage(Stage::Shortlisted),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = call(
        application.id.to_string(),
        recruiter(),
        TransitionTarget::stage(Stage::Offer).with_reason("meh"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("at least 10 characters"));

    let response = call(
        application.id.to_string(),
        outsider(),
        TransitionTarget::stage(Stage::Shortlisted),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn activity_export_and_timeline_routes() {
    let h = harness();
    let router = h.router(Arc::new(RecordingNotifier::default()));
    let job = h.job(1);
    let application = h.apply(&job.id, "seeker-xia");
    h.move_to(&application.id, TransitionTarget::stage(Stage::Shortlisted))
        .expect("advance");

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/applications/{}/activities", application.id),
            json!({
                "actor": recruiter_json(),
                "type": "INTERVIEW_SCHEDULED",
                "title": "Intro call booked",
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/applications/{}/activities", application.id),
            json!({
                "actor": recruiter_json(),
                "type": "SUBSTAGE_CHANGE",
                "title": "Sneaky move",
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .clone()
        .oneshot(
            Request::get(format!("/api/v1/applications/{}/timeline", application.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let days = read_json_body(response).await;
    let entries: Vec<Value> = days
        .as_array()
        .expect("days")
        .iter()
        .flat_map(|day| day["entries"].as_array().cloned().unwrap_or_default())
        .collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1]["type"], json!("STAGE_CHANGE"));

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/applications/{}/activity.csv", application.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok()),
        Some("text/csv; charset=utf-8")
    );
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let csv = String::from_utf8(body.to_vec()).expect("utf8");
    assert_eq!(csv.lines().count(), 4, "header plus three entries");
    assert!(csv.starts_with("id,application_id,type,stage,sub_stage"));
}

#[tokio::test]
async fn comment_routes_validate_and_list() {
    let h = harness();
    let router = h.router(Arc::new(RecordingNotifier::default()));
    let job = h.job(1);
    let application = h.apply(&job.id, "seeker-yan");
    let uri = format!("/api/v1/applications/{}/comments", application.id);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "actor": recruiter_json(), "comment": "" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "actor": recruiter_json(), "comment": "Strong Rust background" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(Request::get(uri.as_str()).body(Body::empty()).expect("request builds"))
        .await
        .expect("route executes");
    let comments = read_json_body(response).await;
    assert_eq!(comments.as_array().map(Vec::len), Some(1));
    assert_eq!(comments[0]["stage"], json!("IN_REVIEW"));
}

#[tokio::test]
async fn missing_job_is_not_found() {
    let h = harness();
    let router = h.router(Arc::new(RecordingNotifier::default()));
    let response = router
        .oneshot(
            Request::get("/api/v1/jobs/job-nope")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registered_candidates_receive_position_filled_mail() {
    let h = harness();
    let notifier = Arc::new(RecordingNotifier::default());
    let router = h.router(notifier.clone());
    let job = h.job(1);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/candidates",
            json!({ "user_id": "seeker-zed", "name": "  Zed  ", "email": "zed@example.com" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let contact = read_json_body(response).await;
    assert_eq!(contact["name"], json!("Zed"));

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/candidates",
            json!({ "user_id": "seeker-yan", "name": "Yan", "email": "not-an-address" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let hired = h.apply(&job.id, "seeker-xia");
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/jobs/{}/applications", job.id),
            json!({ "seeker_id": "seeker-zed" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    h.ready_to_hire(&hired.id);

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/applications/{}/transition", hired.id),
            json!({ "actor": recruiter_json(), "stage": "HIRED" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let filled: Vec<_> = notifier
        .messages()
        .into_iter()
        .filter(|message| message.template.name() == "position_filled")
        .collect();
    assert_eq!(filled.len(), 1);
    assert_eq!(filled[0].email.as_deref(), Some("zed@example.com"));
}
