// crates.io
use httpmock::prelude::*;
// self
use rest_pipeline::{
	_preludet::*,
	auth::{AuthConfig, TokenManager},
	error::AuthError,
	http::{Handler, ReqwestTransport},
};

fn build_manager(server: &MockServer) -> TokenManager {
	let token_host =
		Url::parse(&server.base_url()).expect("Mock token host should parse successfully.");
	let transport: Arc<dyn Handler> = Arc::new(
		ReqwestTransport::new(token_host.clone())
			.expect("Token transport should build successfully."),
	);
	let config = AuthConfig::new(token_host, "foo", "123", "secret");

	TokenManager::new(config, transport)
}

#[tokio::test]
async fn exchange_sends_basic_credentials_and_project_scope() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.query_param("grant_type", "client_credentials")
				.query_param("scope", "manage_project:foo")
				// base64("123:secret")
				.header("authorization", "Basic MTIzOnNlY3JldA==");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"wire-token\",\"expires_in\":1800}");
		})
		.await;
	let manager = build_manager(&server);
	let token = manager.get_token().await.expect("Credential exchange should succeed.");

	assert_eq!(token.access_token.expose(), "wire-token");
	assert!(token.is_fresh());

	mock.assert_async().await;
}

#[tokio::test]
async fn concurrent_uncached_fetches_trigger_one_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"singleflight\",\"expires_in\":900}");
		})
		.await;
	let manager = Arc::new(build_manager(&server));
	let (a, b, c, d) = tokio::join!(
		manager.get_token(),
		manager.get_token(),
		manager.get_token(),
		manager.get_token(),
	);

	for token in [a, b, c, d] {
		let token = token.expect("Every concurrent fetch should succeed.");

		assert_eq!(token.access_token.expose(), "singleflight");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn invalidate_forces_a_fresh_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"rotated\",\"expires_in\":1800}");
		})
		.await;
	let manager = build_manager(&server);

	manager.get_token().await.expect("Initial fetch should succeed.");
	manager.get_token().await.expect("Cached fetch should succeed.");

	mock.assert_calls_async(1).await;

	manager.invalidate();
	manager.get_token().await.expect("Post-invalidate fetch should succeed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn rejected_exchange_surfaces_auth_error() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let manager = build_manager(&server);
	let err = manager.get_token().await.expect_err("Rejected credentials should fail.");

	assert!(matches!(err, Error::Auth(AuthError::Exchange { status: Some(401), .. })));

	mock.assert_async().await;
}

#[tokio::test]
async fn extra_scopes_join_the_manage_scope() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.query_param("scope", "manage_project:foo view_orders:foo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"scoped\",\"expires_in\":900}");
		})
		.await;
	let token_host =
		Url::parse(&server.base_url()).expect("Mock token host should parse successfully.");
	let transport: Arc<dyn Handler> = Arc::new(
		ReqwestTransport::new(token_host.clone())
			.expect("Token transport should build successfully."),
	);
	let config =
		AuthConfig::new(token_host, "foo", "123", "secret").with_scopes(["view_orders:foo"]);
	let manager = TokenManager::new(config, transport);

	manager.get_token().await.expect("Scoped exchange should succeed.");

	mock.assert_async().await;
}
