// std
use std::time::{Duration as StdDuration, Instant};
// crates.io
use httpmock::prelude::*;
// self
use rest_pipeline::{_preludet::*, http::{Method, Request}};

const CALL_DELAY: StdDuration = StdDuration::from_millis(150);

#[tokio::test]
async fn burst_completes_in_ceiling_sized_batches() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/foo/channels");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"results\":[]}")
				.delay(CALL_DELAY);
		})
		.await;
	let client = test_client_builder(&server.base_url(), 5)
		.build()
		.expect("Queue-only client should build successfully.");
	let started = Instant::now();
	let mut calls = Vec::new();

	for _ in 0..20 {
		let client = client.clone();

		calls.push(tokio::spawn(async move {
			client.execute(Request::new(Method::Get, "/foo/channels")).await
		}));
	}

	for call in calls {
		let response = call
			.await
			.expect("Burst task should not panic.")
			.expect("Burst call should succeed.");

		assert_eq!(response.status_code, 200);
	}

	let elapsed = started.elapsed();

	// 20 calls through 5 slots is at least ceil(20 / 5) = 4 serial batches.
	assert!(elapsed >= CALL_DELAY * 4, "Burst finished too fast: {elapsed:?}.");
	// And far faster than the 20-batch serial worst case, proving calls ran in
	// parallel up to the ceiling.
	assert!(elapsed < CALL_DELAY * 12, "Burst showed no parallelism: {elapsed:?}.");

	mock.assert_calls_async(20).await;
}

#[tokio::test]
async fn zero_concurrency_is_rejected_at_build_time() {
	let server = MockServer::start_async().await;
	let err = test_client_builder(&server.base_url(), 0)
		.build()
		.expect_err("A zero concurrency ceiling should be rejected.");

	assert!(matches!(err, Error::Config(rest_pipeline::error::ConfigError::ZeroConcurrency)));
}

#[tokio::test]
async fn queue_passes_http_error_statuses_through() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/foo/missing");
			then.status(404)
				.header("content-type", "application/json")
				.body("{\"message\":\"not found\"}");
		})
		.await;
	let client = test_client_builder(&server.base_url(), 2)
		.build()
		.expect("Queue-only client should build successfully.");
	let response = client
		.execute(Request::new(Method::Get, "/foo/missing"))
		.await
		.expect("Non-2xx statuses should come back as responses, not errors.");

	assert_eq!(response.status_code, 404);
	assert_eq!(
		response.body.get("message").and_then(serde_json::Value::as_str),
		Some("not found"),
	);

	mock.assert_async().await;
}
