//! Demonstrates the dispatch queue's concurrency ceiling: 20 simultaneous calls against a slow
//! endpoint complete in ceiling-sized batches instead of all at once.

// std
use std::time::{Duration, Instant};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use rest_pipeline::{
	client::Client,
	http::{Method, Request},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let _slow_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/foo/orders");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"results\":[]}")
				.delay(Duration::from_millis(200));
		})
		.await;
	let client = Client::builder(Url::parse(&server.base_url())?).concurrency(5).build()?;
	let started = Instant::now();
	let mut calls = Vec::new();

	for _ in 0..20 {
		let client = client.clone();

		calls.push(tokio::spawn(async move {
			client.execute(Request::new(Method::Get, "/foo/orders")).await
		}));
	}

	for call in calls {
		call.await??;
	}

	println!(
		"20 calls with a ceiling of 5 and a 200 ms endpoint took {:?} (expected roughly 800 ms).",
		started.elapsed(),
	);

	Ok(())
}
