//! Demonstrates a fully wired client—dispatch queue, client-credentials auth, and the reqwest
//! transport—executing a create-then-fetch round trip against a mock project API.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use rest_pipeline::{
	auth::AuthConfig,
	client::Client,
	http::{Method, Request},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":900}");
		})
		.await;
	let _create_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/foo/channels").header("authorization", "Bearer demo-access");
			then.status(201).header("content-type", "application/json").body(
				"{\"id\":\"demo-channel\",\"key\":\"store-berlin\",\"version\":1,\"roles\":[\"InventorySupply\"]}",
			);
		})
		.await;
	let _fetch_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/foo/channels/demo-channel")
				.header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":\"demo-channel\",\"key\":\"store-berlin\",\"version\":1}");
		})
		.await;
	let host = Url::parse(&server.base_url())?;
	let client = Client::builder(host.clone())
		.auth(AuthConfig::new(host, "foo", "123", "secret"))
		.concurrency(5)
		.build()?;
	let created = client
		.execute(
			Request::new(Method::Post, "/foo/channels")
				.with_body(serde_json::json!({ "key": "store-berlin" })),
		)
		.await?;

	println!("Created channel (status {}): {}.", created.status_code, created.body);

	let fetched = client.execute(Request::new(Method::Get, "/foo/channels/demo-channel")).await?;

	println!("Fetched channel version: {}.", fetched.body["version"]);

	Ok(())
}
