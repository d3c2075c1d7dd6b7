use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn livez_is_healthy_and_echoes_a_request_id() {
    let app = sm_api::create_router(sm_api::test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/livez")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn employee_is_created_and_read_back() {
    let app = sm_api::create_router(sm_api::test_state());

    let (status, created) = send(
        &app,
        "POST",
        "/employees",
        Some(
            &json!({
                "name": "Anna Smirnova",
                "role": "QA Engineer",
                "grade": "Senior",
                "team": "QA",
                "skills": ["Postman"],
            })
            .to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Anna Smirnova");
    assert_eq!(created["projects"], json!([]));
    let id = created["id"].as_str().unwrap().to_string();

    let (status, found) = send(&app, "GET", &format!("/employees/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, created);

    let (status, listed) = send(&app, "GET", "/employees?grade=Senior", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, listed) = send(&app, "GET", "/employees?grade=Junior", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let app = sm_api::create_router(sm_api::test_state());

    let (status, body) = send(&app, "POST", "/employees", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, _) = send(&app, "GET", "/projects/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/employees",
        Some(&json!({"name": "A", "role": "QA", "grade": "Junior", "team": "QA"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn unknown_records_are_not_found_with_a_json_body() {
    let app = sm_api::create_router(sm_api::test_state());
    let id = Uuid::new_v4();

    let (status, body) = send(&app, "GET", &format!("/requests/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
    assert_eq!(
        body["message"],
        format!("Request with ID \"{id}\" not found")
    );

    let (status, _) = send(&app, "DELETE", &format!("/employees/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/dictionaries/skills", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Dictionary \"skills\" not found");
}
