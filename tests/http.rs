//! Router-level tests against the in-memory store.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rstest::{fixture, rstest};
use serde_json::{json, Value};
use student_records::{app, AppState, ServerConfig};
use tower::ServiceExt;

#[fixture]
fn router() -> Router {
    app(AppState::in_memory(false), &ServerConfig::default()).unwrap()
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None).await
}

async fn create(router: &Router, body: Value) -> (StatusCode, Value) {
    send(router, Method::POST, "/api/v1/student/create", Some(body)).await
}

fn student(code: &str, first: &str, last: &str, email: &str) -> Value {
    json!({"studentCode": code, "firstName": first, "lastName": last, "email": email})
}

async fn seed(router: &Router, n: usize) {
    for i in 0..n {
        let (status, _) = create(
            router,
            student(&format!("S{i:02}"), &format!("F{i:02}"), "L", &format!("s{i}@x.com")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[rstest]
#[tokio::test]
async fn create_returns_normalised_record(router: Router) {
    let (status, body) = create(
        &router,
        json!({"studentCode": " S1 ", "firstName": "Jane ", "lastName": " Doe", "email": "J@X.com", "phone": " "}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Student created successfully");
    let data = &body["data"];
    assert_eq!(data["studentCode"], "S1");
    assert_eq!(data["firstName"], "Jane");
    assert_eq!(data["lastName"], "Doe");
    assert_eq!(data["email"], "j@x.com");
    assert_eq!(data["phone"], Value::Null);
    assert!(data["id"].is_i64());
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[rstest]
#[tokio::test]
async fn duplicate_code_is_rejected_without_inserting(router: Router) {
    create(&router, student("S1", "Jane", "Doe", "j@x.com")).await;
    let (status, body) = create(&router, student("S1", "John", "Roe", "k@x.com")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Student code already exists");
    let (_, count) = get(&router, "/api/v1/student/count").await;
    assert_eq!(count["data"]["count"], 1);

    // Codes match exactly and case-sensitively.
    let (status, _) = create(&router, student("s1", "John", "Roe", "k@x.com")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[rstest]
#[tokio::test]
async fn duplicate_email_is_compared_lowercased(router: Router) {
    create(&router, student("S1", "Jane", "Doe", "j@x.com")).await;
    let (status, body) = create(&router, student("S2", "John", "Roe", "J@X.COM")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already exists");
}

#[rstest]
#[tokio::test]
async fn missing_field_is_listed(router: Router) {
    let (status, body) = create(&router, json!({"firstName": "Jane", "lastName": "Doe", "email": "j@x.com"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["field"], "studentCode");
    assert_eq!(errors[0]["message"], "Student's code is required");
}

#[rstest]
#[tokio::test]
async fn whitespace_only_field_fails_after_trimming(router: Router) {
    let (status, body) = create(&router, student("S1", "   ", "Doe", "j@x.com")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed: firstName is required");
}

#[rstest]
#[tokio::test]
async fn malformed_json_is_400_envelope(router: Router) {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/student/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], Value::Null);
}

#[rstest]
#[case("/api/v1/student/999", StatusCode::NOT_FOUND)]
#[case("/api/v1/student/abc", StatusCode::BAD_REQUEST)]
#[case("/api/v1/student/code/NOPE", StatusCode::NOT_FOUND)]
#[tokio::test]
async fn lookups_of_missing_records(router: Router, #[case] uri: &str, #[case] expected: StatusCode) {
    let (status, body) = get(&router, uri).await;
    assert_eq!(status, expected);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], Value::Null);
}

#[rstest]
#[tokio::test]
async fn non_numeric_id_reports_field_error(router: Router) {
    let (_, body) = get(&router, "/api/v1/student/abc").await;
    assert_eq!(body["errors"][0]["field"], "id");
    assert_eq!(body["errors"][0]["message"], "Student ID must be a number");
    assert_eq!(body["errors"][0]["value"], "abc");
}

#[rstest]
#[tokio::test]
async fn update_email_uniqueness_excludes_self(router: Router) {
    let (_, a) = create(&router, student("S1", "Jane", "Doe", "j@x.com")).await;
    create(&router, student("S2", "John", "Roe", "k@x.com")).await;
    let id = a["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/student/{id}");

    let (status, body) = send(&router, Method::PUT, &uri, Some(json!({"email": "K@x.com"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already exists");

    let (status, body) = send(
        &router,
        Method::PUT,
        &uri,
        Some(json!({"email": "j@x.com", "lastName": "Smith"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Student updated successfully");
    assert_eq!(body["data"]["lastName"], "Smith");
    assert_eq!(body["data"]["studentCode"], "S1");
}

#[rstest]
#[tokio::test]
async fn update_of_missing_record_is_404(router: Router) {
    let (status, body) = send(&router, Method::PUT, "/api/v1/student/42", Some(json!({"firstName": "X"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Student not found");
}

#[rstest]
#[tokio::test]
async fn snake_case_keys_do_not_reach_the_store(router: Router) {
    let (_, a) = create(&router, student("S1", "Jane", "Doe", "j@x.com")).await;
    let uri = format!("/api/v1/student/{}", a["data"]["id"]);

    let (status, body) = send(&router, Method::PUT, &uri, Some(json!({"first_name": 5}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["firstName"], "Jane");

    let mut extra = student("S2", "John", "Roe", "k@x.com");
    extra["student_code"] = json!(7);
    let (status, body) = create(&router, extra).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["studentCode"], "S2");
}

#[rstest]
#[tokio::test]
async fn delete_removes_record(router: Router) {
    let (status, _) = send(&router, Method::DELETE, "/api/v1/student/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, created) = create(&router, student("S1", "Jane", "Doe", "j@x.com")).await;
    let uri = format!("/api/v1/student/{}", created["data"]["id"]);
    let (status, body) = send(&router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["studentCode"], "S1");
    let (status, _) = get(&router, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn search_matches_any_field_ordered_by_name(router: Router) {
    create(&router, student("S1", "Zoe", "Doe", "zoe@x.com")).await;
    create(&router, student("S2", "Adam", "Smith", "adam.doe@x.com")).await;
    create(&router, student("DOE-3", "Adam", "Brown", "ab@x.com")).await;
    create(&router, student("S4", "Mia", "Lee", "mia@x.com")).await;

    let (status, body) = get(&router, "/api/v1/student/search?q=doe").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<(String, String)> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (s["firstName"].as_str().unwrap().to_string(), s["lastName"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Adam".to_string(), "Brown".to_string()),
            ("Adam".to_string(), "Smith".to_string()),
            ("Zoe".to_string(), "Doe".to_string()),
        ]
    );
}

#[rstest]
#[case("/api/v1/student/search")]
#[case("/api/v1/student/search?q=%20%20")]
#[tokio::test]
async fn search_requires_a_term(router: Router, #[case] uri: &str) {
    let (status, body) = get(&router, uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Search term is required");
}

#[rstest]
#[tokio::test]
async fn second_page_of_twelve(router: Router) {
    seed(&router, 12).await;
    let (status, body) = get(&router, "/api/v1/student/paginated?page=2&limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"]["data"][0]["firstName"], "F05");
    assert_eq!(
        body["data"]["pagination"],
        json!({"page": 2, "limit": 5, "total": 12, "totalPages": 3, "hasNext": true, "hasPrev": true})
    );
}

#[rstest]
#[tokio::test]
async fn empty_store_paginates_to_nothing(router: Router) {
    let (status, body) = get(&router, "/api/v1/student/paginated").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["data"], json!([]));
    assert_eq!(body["data"]["pagination"]["totalPages"], 0);
    assert_eq!(body["data"]["pagination"]["hasNext"], false);
    assert_eq!(body["data"]["pagination"]["hasPrev"], false);
}

#[rstest]
#[tokio::test]
async fn paginated_sorts_and_searches(router: Router) {
    seed(&router, 3).await;
    let (_, body) = get(
        &router,
        "/api/v1/student/paginated?sortBy=firstName&sortOrder=desc&search=f0&limit=2",
    )
    .await;
    let firsts: Vec<&str> = body["data"]["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["firstName"].as_str().unwrap())
        .collect();
    assert_eq!(firsts, vec!["F02", "F01"]);
    assert_eq!(body["data"]["pagination"]["total"], 3);
}

#[rstest]
#[tokio::test]
async fn list_filters_by_field_and_pages(router: Router) {
    seed(&router, 4).await;
    let (_, body) = get(&router, "/api/v1/student/list?studentCode=S02").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["email"], "s2@x.com");

    let (_, body) = get(&router, "/api/v1/student/list?page=2&limit=3").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = get(&router, "/api/v1/student/count?search=s0").await;
    assert_eq!(body["data"]["count"], 4);
}

#[rstest]
#[tokio::test]
async fn bulk_create_counts_and_falls_back_on_store_uniqueness(router: Router) {
    let rows = json!({"data": [student("B1", "A", "B", "a@x.com"), student("B2", "C", "D", "c@x.com")]});
    let (status, body) = send(&router, Method::POST, "/api/v1/student/bulk", Some(rows)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["count"], 2);

    // No pre-check on this path; the store's unique key produces the message.
    let dup = json!([student("B3", "E", "F", "e@x.com"), student("B1", "G", "H", "g@x.com")]);
    let (status, body) = send(&router, Method::POST, "/api/v1/student/bulk", Some(dup)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Student code already exists");
    let (_, count) = get(&router, "/api/v1/student/count").await;
    assert_eq!(count["data"]["count"], 2);

    let (status, body) = send(&router, Method::POST, "/api/v1/student/bulk", Some(json!({"x": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Data must be an array");
}

#[rstest]
#[tokio::test]
async fn health_is_plain_text(router: Router) {
    let req = Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Ok");
}

#[rstest]
#[tokio::test]
async fn ready_and_version_at_root(router: Router) {
    let (status, body) = get(&router, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "memory");
    let (_, body) = get(&router, "/version").await;
    assert_eq!(body["name"], "student-records");
}

#[rstest]
#[tokio::test]
async fn unknown_route_is_404_envelope(router: Router) {
    let (status, body) = get(&router, "/api/v1/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");
}

async fn bulk_with_unstorable_row(expose_errors: bool) -> (StatusCode, Value) {
    let router = app(AppState::in_memory(expose_errors), &ServerConfig::default()).unwrap();
    let rows = json!([{"studentCode": "S1", "firstName": 5, "lastName": "D", "email": "a@x.com"}]);
    send(&router, Method::POST, "/api/v1/student/bulk", Some(rows)).await
}

#[tokio::test]
async fn store_failure_detail_only_when_exposed() {
    let (status, body) = bulk_with_unstorable_row(false).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to create records");

    let (status, body) = bulk_with_unstorable_row(true).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("serialization: "), "{message}");
    assert_ne!(message, "Failed to create records");
}

#[rstest]
#[tokio::test]
async fn wrong_method_is_405_envelope(router: Router) {
    let req = Request::builder()
        .method(Method::DELETE)
        .uri("/api/v1/student/list")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(resp.headers().contains_key(header::ALLOW));
    assert_eq!(
        resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Method Not Allowed");
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn oversized_body_is_413_envelope() {
    let config = ServerConfig {
        body_limit_bytes: 16,
        ..ServerConfig::default()
    };
    let router = app(AppState::in_memory(false), &config).unwrap();
    let payload = student("S1", "Jane", "Doe", "j@x.com").to_string();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/student/create")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[rstest]
#[tokio::test]
async fn undecodable_path_is_400_envelope(router: Router) {
    let (status, body) = get(&router, "/api/v1/student/%FF").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}
