use mailsweep::config::JobConfig;
use mailsweep::test_support::{MockProvider, TestRocketBuilder};
use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

async fn submit(client: &Client, ids: &[&str]) -> String {
    let response = client
        .post("/api/v1/messages/delete-job")
        .header(bearer("tok"))
        .json(&serde_json::json!({ "ids": ids, "mode": "trash" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let payload: Value = response.into_json().await.expect("submit JSON");
    payload["jobId"]
        .as_str()
        .expect("jobId in response")
        .to_string()
}

async fn poll_until_terminal(client: &Client, job_id: &str) -> Value {
    for _ in 0..500 {
        let response = client
            .get(format!("/api/v1/jobs/{job_id}"))
            .header(bearer("tok"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let job: Value = response.into_json().await.expect("job JSON");
        match job["status"].as_str() {
            Some("done") | Some("cancelled") => return job,
            _ => tokio::time::sleep(Duration::from_millis(5)).await,
        }
    }
    panic!("job {job_id} never reached a terminal state");
}

#[rocket::async_test]
async fn job_runs_to_done_with_mixed_results() {
    let provider = Arc::new(MockProvider::new().fail_mutating(&["b"]));
    let client = Client::tracked(
        TestRocketBuilder::new(provider.clone())
            .with_session("tok")
            .build(),
    )
    .await
    .expect("valid Rocket instance");

    let job_id = submit(&client, &["a", "b", "c"]).await;
    assert_eq!(job_id, "job-1");

    let job = poll_until_terminal(&client, &job_id).await;
    assert_eq!(job["status"], "done");
    assert_eq!(job["cancelled"], false);
    assert_eq!(job["total"], 3);
    assert_eq!(job["processed"], 3);
    assert!(job["finishedAt"].is_string());

    let results = job["results"].as_array().expect("results array");
    let ids: HashSet<&str> = results.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, HashSet::from(["a", "b", "c"]));
    let failed = results
        .iter()
        .find(|r| r["id"] == "b")
        .expect("result for b");
    assert_eq!(failed["status"], "error");
    assert_eq!(provider.mutate_calls(), 3);
}

#[rocket::async_test]
async fn job_ids_are_monotonic_per_process() {
    let client = Client::tracked(
        TestRocketBuilder::new(Arc::new(MockProvider::new()))
            .with_session("tok")
            .build(),
    )
    .await
    .expect("valid Rocket instance");

    assert_eq!(submit(&client, &["a"]).await, "job-1");
    assert_eq!(submit(&client, &["b"]).await, "job-2");
}

#[rocket::async_test]
async fn cancel_stops_a_running_job_early() {
    let ids: Vec<String> = (0..20).map(|i| format!("m{i}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let provider = Arc::new(MockProvider::new());
    let client = Client::tracked(
        TestRocketBuilder::new(provider.clone())
            .with_session("tok")
            .with_job_config(JobConfig {
                concurrency: 1,
                inter_op_delay: Duration::from_millis(50),
                retention: Duration::from_secs(3600),
                reap_interval: Duration::from_secs(60),
            })
            .build(),
    )
    .await
    .expect("valid Rocket instance");

    let job_id = submit(&client, &id_refs).await;

    let response = client
        .post(format!("/api/v1/jobs/{job_id}/cancel"))
        .header(bearer("tok"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let job = poll_until_terminal(&client, &job_id).await;
    assert_eq!(job["status"], "cancelled");
    assert_eq!(job["cancelled"], true);
    let processed = job["processed"].as_u64().expect("processed count");
    assert!(processed < 20, "cancel should stop the job early");
    // Whatever was recorded stays visible after cancellation.
    assert_eq!(job["results"].as_array().map(Vec::len), Some(processed as usize));
}

#[rocket::async_test]
async fn polling_an_unknown_job_is_not_found() {
    let client = Client::tracked(
        TestRocketBuilder::new(Arc::new(MockProvider::new()))
            .with_session("tok")
            .build(),
    )
    .await
    .expect("valid Rocket instance");

    let response = client
        .get("/api/v1/jobs/job-999")
        .header(bearer("tok"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let payload: Value = response.into_json().await.expect("error JSON");
    assert_eq!(payload["error"], "NotFound");
}

#[rocket::async_test]
async fn cancelling_an_unknown_job_is_not_found() {
    let client = Client::tracked(
        TestRocketBuilder::new(Arc::new(MockProvider::new()))
            .with_session("tok")
            .build(),
    )
    .await
    .expect("valid Rocket instance");

    let response = client
        .post("/api/v1/jobs/job-999/cancel")
        .header(bearer("tok"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn empty_job_submission_is_a_bad_request() {
    let client = Client::tracked(
        TestRocketBuilder::new(Arc::new(MockProvider::new()))
            .with_session("tok")
            .build(),
    )
    .await
    .expect("valid Rocket instance");

    let response = client
        .post("/api/v1/messages/delete-job")
        .header(bearer("tok"))
        .json(&serde_json::json!({ "ids": [], "mode": "trash" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}
