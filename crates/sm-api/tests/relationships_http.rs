use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sm_common::api::{CreateEmployee, CreateProject, CreateRequest, EmployeeGrade};
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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

async fn create(app: &Router, uri: &str, body: Value) -> String {
    let (status, created) = send(app, "POST", uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created["id"].as_str().unwrap().to_string()
}

async fn employee(app: &Router, name: &str) -> String {
    let input = CreateEmployee::new(name, "QA Engineer", EmployeeGrade::Middle);
    create(app, "/employees", serde_json::to_value(input).unwrap()).await
}

async fn project(app: &Router, name: &str) -> String {
    let input = CreateProject::new(name, "Banking", Utc::now());
    create(app, "/projects", serde_json::to_value(input).unwrap()).await
}

async fn request(app: &Router, name: &str) -> String {
    let input = CreateRequest::new(name, "Senior", "Remote");
    create(app, "/requests", serde_json::to_value(input).unwrap()).await
}

async fn get(app: &Router, uri: &str) -> Value {
    let (status, body) = send(app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn assigning_links_both_sides_and_removal_unlinks_them() {
    let app = sm_api::create_router(sm_api::test_state());
    let e = employee(&app, "Ivan Petrov").await;
    let p = project(&app, "Core Banking").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/employees/{e}/projects"),
        Some(json!({ "projectId": p })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    assert_eq!(get(&app, &format!("/employees/{e}")).await["projects"], json!([p]));
    assert_eq!(get(&app, &format!("/projects/{p}")).await["team"], json!([e]));

    let populated = get(&app, &format!("/projects/{p}?populate=true")).await;
    assert_eq!(populated["team"][0]["name"], "Ivan Petrov");

    let (status, _) = send(&app, "DELETE", &format!("/projects/{p}/employees/{e}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(get(&app, &format!("/employees/{e}")).await["projects"], json!([]));
    assert_eq!(get(&app, &format!("/projects/{p}")).await["team"], json!([]));
}

#[tokio::test]
async fn assigning_a_missing_target_is_not_found() {
    let app = sm_api::create_router(sm_api::test_state());
    let e = employee(&app, "Ivan Petrov").await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/employees/{e}/requests"),
        Some(json!({ "requestId": missing })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        format!("Request with ID \"{missing}\" not found")
    );
    assert_eq!(get(&app, &format!("/employees/{e}")).await["requests"], json!([]));
}

#[tokio::test]
async fn request_moves_between_projects() {
    let app = sm_api::create_router(sm_api::test_state());
    let r = request(&app, "Senior QA for payments").await;
    let first = project(&app, "Payments").await;
    let second = project(&app, "Lending").await;

    for p in [&first, &second] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/requests/{r}/project"),
            Some(json!({ "projectId": p })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(get(&app, &format!("/requests/{r}")).await["project"], json!(second));
    assert_eq!(get(&app, &format!("/projects/{first}")).await["requests"], json!([]));
    assert_eq!(get(&app, &format!("/projects/{second}")).await["requests"], json!([r]));

    let listed = get(&app, &format!("/requests?projectId={second}")).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_an_employee_clears_every_back_reference() {
    let app = sm_api::create_router(sm_api::test_state());
    let e = employee(&app, "Ivan Petrov").await;
    let p = project(&app, "Core Banking").await;
    let r = request(&app, "Automation QA").await;

    send(&app, "POST", &format!("/projects/{p}/employees"), Some(json!({ "employeeId": e }))).await;
    send(&app, "POST", &format!("/requests/{r}/employees"), Some(json!({ "employeeId": e }))).await;

    let (status, _) = send(&app, "DELETE", &format!("/employees/{e}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(get(&app, &format!("/projects/{p}")).await["team"], json!([]));
    assert_eq!(
        get(&app, &format!("/requests/{r}")).await["assignedEmployees"],
        json!([])
    );
}

#[tokio::test]
async fn duplicate_names_conflict() {
    let app = sm_api::create_router(sm_api::test_state());
    employee(&app, "Ivan Petrov").await;

    let input = CreateEmployee::new("Ivan Petrov", "QA Engineer", EmployeeGrade::Junior);
    let (status, body) = send(
        &app,
        "POST",
        "/employees",
        Some(serde_json::to_value(input).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let batch = json!([
        serde_json::to_value(CreateEmployee::new("Olga", "QA", EmployeeGrade::Lead)).unwrap(),
        serde_json::to_value(CreateEmployee::new("Olga", "QA", EmployeeGrade::Lead)).unwrap(),
    ]);
    let (status, _) = send(&app, "POST", "/employees/batch", Some(batch)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let names = get(&app, "/employees?name=olga").await;
    assert_eq!(names, json!([]));
}

#[tokio::test]
async fn search_accepts_a_json_filter() {
    let app = sm_api::create_router(sm_api::test_state());
    let mut input = CreateEmployee::new("Maria Ivanova", "QA Engineer", EmployeeGrade::Senior);
    input.skills = vec!["Playwright".into(), "Jest".into()];
    create(&app, "/employees", serde_json::to_value(input).unwrap()).await;
    employee(&app, "Petr Sidorov").await;

    let (status, found) = send(
        &app,
        "POST",
        "/employees/search",
        Some(json!({ "skills": ["Jest"], "populate": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Maria Ivanova");
}

#[tokio::test]
async fn list_filters_accept_repeated_keys() {
    let app = sm_api::create_router(sm_api::test_state());
    let mut jest = CreateEmployee::new("Maria Ivanova", "QA Engineer", EmployeeGrade::Senior);
    jest.skills = vec!["Jest".into()];
    create(&app, "/employees", serde_json::to_value(jest).unwrap()).await;
    let mut cypress = CreateEmployee::new("Petr Sidorov", "QA Engineer", EmployeeGrade::Senior);
    cypress.skills = vec!["Cypress".into()];
    create(&app, "/employees", serde_json::to_value(cypress).unwrap()).await;
    employee(&app, "Olga Smirnova").await;

    let repeated = get(&app, "/employees?skills=Jest&skills=Cypress").await;
    let joined = get(&app, "/employees?skills=Jest,Cypress").await;
    assert_eq!(repeated.as_array().unwrap().len(), 2);
    assert_eq!(repeated, joined);
}

#[tokio::test]
async fn deleting_a_request_unlinks_employees_and_projects() {
    let app = sm_api::create_router(sm_api::test_state());
    let e = employee(&app, "Ivan Petrov").await;
    let p = project(&app, "Core Banking").await;
    let r = request(&app, "Automation QA").await;

    send(&app, "POST", &format!("/employees/{e}/requests"), Some(json!({ "requestId": r }))).await;
    send(&app, "POST", &format!("/requests/{r}/project"), Some(json!({ "projectId": p }))).await;
    assert_eq!(get(&app, &format!("/projects/{p}")).await["requests"], json!([r]));

    let (status, _) = send(&app, "DELETE", &format!("/requests/{r}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(get(&app, &format!("/employees/{e}")).await["requests"], json!([]));
    assert_eq!(get(&app, &format!("/projects/{p}")).await["requests"], json!([]));
}

#[tokio::test]
async fn patching_a_missing_record_is_not_found() {
    let app = sm_api::create_router(sm_api::test_state());
    employee(&app, "Ivan Petrov").await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/employees/{missing}"),
        Some(json!({ "name": "Ivan Petrov" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}
