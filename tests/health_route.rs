use mailsweep::routes::health::HealthResponse;
use mailsweep::test_support::{MockProvider, TestRocketBuilder};
use rocket::http::Status;
use std::sync::Arc;

#[test]
fn health_endpoint_returns_ok() {
    let client = TestRocketBuilder::new(Arc::new(MockProvider::new())).blocking_client();

    let response = client.get("/api/v1/health").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let payload: HealthResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.status, "ok");
}

#[test]
fn health_endpoint_needs_no_session() {
    // Deliberately no seeded session: readiness probes are unauthenticated.
    let client = TestRocketBuilder::new(Arc::new(MockProvider::new())).blocking_client();

    let response = client.get("/api/v1/health").dispatch();
    assert_eq!(response.status(), Status::Ok);
}
