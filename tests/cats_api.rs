use std::sync::Arc;

use catnip::cats::{self, Cat, CatsGateway, CatsService};
use catnip::config::Config;
use catnip::{Method, ROLES_HEADER, Request, Response, Router, StatusCode};
use serde_json::{Value, json};

struct Harness {
    service: Arc<CatsService>,
    router: Router,
}

fn harness() -> Harness {
    let service = Arc::new(CatsService::new());
    let router = cats::router(Arc::clone(&service), &CatsGateway::new(), &Config::default());
    Harness { service, router }
}

fn post(path: &str, body: Value, roles: Option<&str>) -> Request {
    let req = Request::new(Method::POST, path).with_body(body.to_string());
    match roles {
        Some(roles) => req.with_header(ROLES_HEADER, roles),
        None => req,
    }
}

fn body(response: &Response) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

fn cat(name: &str, age: i64) -> Cat {
    Cat { name: name.into(), age }
}

#[tokio::test]
async fn admin_creates_cat_and_list_appends_it() {
    let h = harness();
    h.service.create(cat("Tom", 3));

    let created = h.router
        .dispatch(post("/cats", json!({ "name": "Whiskers", "age": 2 }), Some("admin")))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    assert_eq!(body(&created), json!({ "name": "Whiskers", "age": 2 }));

    let listed = h.router.dispatch(Request::new(Method::GET, "/cats")).await;
    assert_eq!(listed.status_code(), StatusCode::OK);
    assert_eq!(
        body(&listed),
        json!([{ "name": "Tom", "age": 3 }, { "name": "Whiskers", "age": 2 }]),
    );
}

#[tokio::test]
async fn invalid_body_is_400_and_store_untouched() {
    let h = harness();
    let response = h.router
        .dispatch(post("/cats", json!({ "name": 123, "age": "x" }), Some("admin")))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(&response),
        json!({ "statusCode": 400, "message": "Validation failed: name is required" }),
    );
    assert!(h.service.is_empty());
}

#[tokio::test]
async fn missing_age_fails_when_the_handler_decodes() {
    let h = harness();
    let response = h.router.dispatch(post("/cats", json!({ "name": "Tom" }), Some("admin"))).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(h.service.is_empty());
}

#[tokio::test]
async fn malformed_json_is_400() {
    let h = harness();
    let req = Request::new(Method::POST, "/cats")
        .with_header(ROLES_HEADER, "admin")
        .with_body(b"{\"name\":".to_vec());
    let response = h.router.dispatch(req).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response)["message"], "Invalid JSON body");
}

#[tokio::test]
async fn non_admins_are_forbidden() {
    let h = harness();
    for roles in [None, Some("user"), Some("user, editor"), Some("")] {
        let response = h.router
            .dispatch(post("/cats", json!({ "name": "Tom", "age": 3 }), roles))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN, "roles: {roles:?}");
        assert_eq!(body(&response), json!({ "statusCode": 403, "message": "Forbidden resource" }));
    }
    assert!(h.service.is_empty());
}

#[tokio::test]
async fn guard_runs_before_validation() {
    let h = harness();
    let response = h.router.dispatch(post("/cats", json!({ "name": 1 }), None)).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn validation_pipe_route_has_no_role_gate_but_checks_age() {
    let h = harness();

    let created = h.router
        .dispatch(post("/cats/validation-pipe", json!({ "name": "Tom", "age": 3 }), None))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);

    let rejected = h.router
        .dispatch(post("/cats/validation-pipe", json!({ "name": "Tom", "age": "x" }), None))
        .await;
    assert_eq!(rejected.status_code(), StatusCode::BAD_REQUEST);
    let message = body(&rejected)["message"].as_str().unwrap().to_owned();
    assert!(message.starts_with("Validation failed"), "{message}");

    assert_eq!(h.service.find_all(), [cat("Tom", 3)]);
}

#[tokio::test]
async fn find_one_parses_and_bounds_checks_the_id() {
    let h = harness();
    h.service.create(cat("Tom", 3));

    let found = h.router.dispatch(Request::new(Method::GET, "/cats/0")).await;
    assert_eq!(found.status_code(), StatusCode::OK);
    assert_eq!(body(&found), json!({ "name": "Tom", "age": 3 }));

    let not_numeric = h.router.dispatch(Request::new(Method::GET, "/cats/abc")).await;
    assert_eq!(not_numeric.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&not_numeric)["message"], "Validation failed (numeric string is expected)");

    for missing in ["/cats/1", "/cats/-1"] {
        let response = h.router.dispatch(Request::new(Method::GET, missing)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{missing}");
        assert_eq!(body(&response), json!({ "statusCode": 404, "message": "Cat not found" }));
    }
}

#[tokio::test]
async fn docs_describe_every_route() {
    let h = harness();
    let response = h.router.dispatch(Request::new(Method::GET, "/api")).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let doc = body(&response);
    assert_eq!(doc["info"]["title"], "Cats example");
    assert_eq!(doc["paths"]["/cats"]["post"]["x-roles"], json!(["admin"]));
    assert!(doc["paths"]["/cats"]["get"].is_object());
    assert!(doc["paths"]["/cats/validation-pipe"]["post"].is_object());
    assert!(doc["paths"]["/cats/{id}"]["get"].is_object());
    assert!(doc["paths"]["/healthz"]["get"].is_object());
    assert!(doc["paths"].get("/api").is_none());
}

#[tokio::test]
async fn health_probes() {
    let h = harness();
    let live = h.router.dispatch(Request::new(Method::GET, "/healthz")).await;
    assert_eq!(live.body(), b"ok");
    let ready = h.router.dispatch(Request::new(Method::GET, "/readyz")).await;
    assert_eq!(ready.body(), b"ready");
}
