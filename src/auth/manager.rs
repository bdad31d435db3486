//! OAuth 2.0 client-credentials token manager with singleflight refresh.
//!
//! The manager is the sole owner of the cached [`Token`]; the rest of the
//! pipeline only ever sees it as an injected header value. `get_token` moves
//! through {NoToken, Valid, Refreshing}: a fresh cached token is returned
//! without suspension, otherwise exactly one credential exchange runs at a time
//! and every caller queued behind it receives that exchange's outcome—token or
//! error—instead of triggering its own.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::AuthError,
	http::{AUTHORIZATION, Handler, Method, Request, Response},
	obs::{self, CallId, StageKind, StageOutcome, StageSpan},
};

/// Tokens are treated as expired this far before their literal expiry so a
/// token never runs out mid-flight.
pub const EXPIRY_MARGIN: Duration = Duration::seconds(30);

/// Configuration for the client-credentials exchange.
#[derive(Clone, Debug)]
pub struct AuthConfig {
	/// Token endpoint host, e.g. `https://auth.example.com`.
	pub token_host: Url,
	/// Project key the manage scope is derived from.
	pub project_key: String,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: Secret,
	/// Extra scopes requested beyond `manage_project:<project_key>`.
	pub scopes: Vec<String>,
}
impl AuthConfig {
	/// Creates a configuration for the given project and credential pair.
	pub fn new(
		token_host: Url,
		project_key: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			token_host,
			project_key: project_key.into(),
			client_id: client_id.into(),
			client_secret: Secret::new(client_secret),
			scopes: Vec::new(),
		}
	}

	/// Adds extra scopes to request alongside the project manage scope.
	pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.scopes.extend(scopes.into_iter().map(Into::into));

		self
	}

	fn scope_param(&self) -> String {
		let mut scope = format!("manage_project:{}", self.project_key);

		for extra in &self.scopes {
			scope.push(' ');
			scope.push_str(extra);
		}

		scope
	}

	fn basic_credential(&self) -> String {
		let pair = format!("{}:{}", self.client_id, self.client_secret.expose());

		format!("Basic {}", BASE64.encode(pair))
	}
}

/// Issued access token together with its computed expiry instant.
#[derive(Clone, Debug)]
pub struct Token {
	/// Access token secret; exposed to the chain only as a bearer header value.
	pub access_token: Secret,
	/// Expiry instant derived from the endpoint's `expires_in`.
	pub expires_at: OffsetDateTime,
}
impl Token {
	/// Returns `true` while the token is valid at `instant`, margin included.
	pub fn is_fresh_at(&self, instant: OffsetDateTime) -> bool {
		instant + EXPIRY_MARGIN < self.expires_at
	}

	/// Returns `true` while the token is valid right now, margin included.
	pub fn is_fresh(&self) -> bool {
		self.is_fresh_at(OffsetDateTime::now_utc())
	}

	/// Formats the `Authorization` header value carrying this token.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
	access_token: String,
	expires_in: i64,
}

#[derive(Default)]
struct TokenState {
	token: Option<Token>,
	// Bumped after every settled exchange; lets queued callers detect that the
	// refresh they waited on already finished.
	epoch: u64,
	last_error: Option<AuthError>,
}

/// Owns the cached token and serializes refreshes against the token endpoint.
pub struct TokenManager {
	config: AuthConfig,
	transport: Arc<dyn Handler>,
	state: Mutex<TokenState>,
	refresh: AsyncMutex<()>,
}
impl TokenManager {
	/// Creates a manager that performs exchanges over the provided transport.
	///
	/// The transport must already be rooted at [`AuthConfig::token_host`]; the
	/// manager only issues paths against it.
	pub fn new(config: AuthConfig, transport: Arc<dyn Handler>) -> Self {
		Self { config, transport, state: Mutex::new(TokenState::default()), refresh: AsyncMutex::new(()) }
	}

	/// Returns a valid token, performing or awaiting a refresh when needed.
	pub async fn get_token(&self) -> Result<Token> {
		let entered_epoch = {
			let state = self.state.lock();

			if let Some(token) = state.token.as_ref().filter(|token| token.is_fresh()) {
				return Ok(token.clone());
			}

			state.epoch
		};
		// Refreshing: at most one exchange in flight; everyone else queues here.
		let _refreshing = self.refresh.lock().await;

		{
			let state = self.state.lock();

			if let Some(token) = state.token.as_ref().filter(|token| token.is_fresh()) {
				return Ok(token.clone());
			}
			if state.epoch != entered_epoch {
				// The exchange this caller queued behind already settled; share
				// its failure instead of stampeding the endpoint.
				if let Some(err) = state.last_error.clone() {
					return Err(err.into());
				}
			}
		}

		let span = StageSpan::new(StageKind::TokenRefresh, CallId::generate());

		obs::record_stage_outcome(StageKind::TokenRefresh, StageOutcome::Attempt);

		let outcome = span.instrument(self.exchange()).await;
		let mut state = self.state.lock();

		state.epoch += 1;

		match outcome {
			Ok(token) => {
				obs::record_stage_outcome(StageKind::TokenRefresh, StageOutcome::Success);

				state.token = Some(token.clone());
				state.last_error = None;

				Ok(token)
			},
			Err(err) => {
				obs::record_stage_outcome(StageKind::TokenRefresh, StageOutcome::Failure);

				state.token = None;
				state.last_error = Some(err.clone());

				Err(err.into())
			},
		}
	}

	/// Forces the next [`get_token`](Self::get_token) to refresh even if the
	/// cached token has not yet expired; used after the resource server rejects
	/// a request the token should have authorized.
	pub fn invalidate(&self) {
		let mut state = self.state.lock();

		state.token = None;
		state.last_error = None;
	}

	async fn exchange(&self) -> Result<Token, AuthError> {
		let query = form_urlencoded::Serializer::new(String::new())
			.append_pair("grant_type", "client_credentials")
			.append_pair("scope", &self.config.scope_param())
			.finish();
		let request = Request::new(Method::Post, format!("/oauth/token?{query}"))
			.with_header(AUTHORIZATION, self.config.basic_credential());
		let response = self
			.transport
			.send(request)
			.await
			.map_err(|e| AuthError::Exchange { message: e.to_string(), status: None })?;

		if !response.is_success() {
			return Err(AuthError::Exchange {
				message: failure_message(&response),
				status: Some(response.status_code),
			});
		}

		let payload: TokenEndpointResponse = serde_json::from_value(response.body.clone())
			.map_err(|e| AuthError::ResponseParse {
				message: e.to_string(),
				status: response.status_code,
			})?;

		Ok(Token {
			access_token: Secret::new(payload.access_token),
			expires_at: OffsetDateTime::now_utc() + Duration::seconds(payload.expires_in),
		})
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("token_host", &self.config.token_host.as_str())
			.field("project_key", &self.config.project_key)
			.field("client_id", &self.config.client_id)
			.finish()
	}
}

fn failure_message(response: &Response) -> String {
	response
		.body
		.get("error_description")
		.or_else(|| response.body.get("error"))
		.and_then(serde_json::Value::as_str)
		.map(str::to_owned)
		.unwrap_or_else(|| format!("token endpoint returned status {}", response.status_code))
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::http::HandlerFuture;

	struct StubTokenEndpoint {
		calls: AtomicUsize,
		status: u16,
		body: serde_json::Value,
		delay: Option<std::time::Duration>,
	}
	impl StubTokenEndpoint {
		fn issuing(token: &str, expires_in: i64) -> Self {
			Self {
				calls: AtomicUsize::new(0),
				status: 200,
				body: serde_json::json!({ "access_token": token, "expires_in": expires_in }),
				delay: None,
			}
		}

		fn rejecting(status: u16, error: &str) -> Self {
			Self {
				calls: AtomicUsize::new(0),
				status,
				body: serde_json::json!({ "error": error }),
				delay: None,
			}
		}

		fn with_delay(mut self, delay: std::time::Duration) -> Self {
			self.delay = Some(delay);

			self
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl Handler for StubTokenEndpoint {
		fn send(&self, _request: Request) -> HandlerFuture<'_> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				if let Some(delay) = self.delay {
					tokio::time::sleep(delay).await;
				}

				Ok(Response {
					status_code: self.status,
					headers: BTreeMap::new(),
					body: self.body.clone(),
				})
			})
		}
	}

	fn config() -> AuthConfig {
		AuthConfig::new(
			Url::parse("https://auth.example.com").expect("Token host should parse."),
			"foo",
			"123",
			"secret",
		)
	}

	fn manager(endpoint: Arc<StubTokenEndpoint>) -> TokenManager {
		TokenManager::new(config(), endpoint)
	}

	#[test]
	fn scope_param_includes_project_and_extras() {
		let config = config().with_scopes(["view_orders:foo"]);

		assert_eq!(config.scope_param(), "manage_project:foo view_orders:foo");
	}

	#[test]
	fn basic_credential_encodes_pair() {
		// base64("123:secret")
		assert_eq!(config().basic_credential(), "Basic MTIzOnNlY3JldA==");
	}

	#[test]
	fn freshness_applies_expiry_margin() {
		let now = OffsetDateTime::now_utc();
		let token = Token { access_token: Secret::new("t"), expires_at: now + Duration::seconds(20) };

		// Within the 30 s margin, so already considered expired.
		assert!(!token.is_fresh_at(now));

		let token = Token { access_token: Secret::new("t"), expires_at: now + Duration::hours(1) };

		assert!(token.is_fresh_at(now));
	}

	#[tokio::test]
	async fn cached_token_skips_exchange() {
		let endpoint = Arc::new(StubTokenEndpoint::issuing("cached", 1800));
		let manager = manager(endpoint.clone());
		let first = manager.get_token().await.expect("First fetch should succeed.");
		let second = manager.get_token().await.expect("Cached fetch should succeed.");

		assert_eq!(first.access_token.expose(), "cached");
		assert_eq!(second.access_token.expose(), "cached");
		assert_eq!(endpoint.calls(), 1);
	}

	#[tokio::test]
	async fn concurrent_fetches_share_one_exchange() {
		let endpoint = Arc::new(
			StubTokenEndpoint::issuing("shared", 900)
				.with_delay(std::time::Duration::from_millis(50)),
		);
		let manager = Arc::new(manager(endpoint.clone()));
		let (a, b, c) =
			tokio::join!(manager.get_token(), manager.get_token(), manager.get_token());
		let a = a.expect("First concurrent fetch should succeed.");
		let b = b.expect("Second concurrent fetch should succeed.");
		let c = c.expect("Third concurrent fetch should succeed.");

		assert_eq!(a.access_token.expose(), "shared");
		assert_eq!(b.access_token.expose(), "shared");
		assert_eq!(c.access_token.expose(), "shared");
		assert_eq!(endpoint.calls(), 1);
	}

	#[tokio::test]
	async fn queued_callers_share_the_winning_failure() {
		let endpoint = Arc::new(
			StubTokenEndpoint::rejecting(400, "invalid_client")
				.with_delay(std::time::Duration::from_millis(50)),
		);
		let manager = Arc::new(manager(endpoint.clone()));
		let (a, b) = tokio::join!(manager.get_token(), manager.get_token());
		let a = a.expect_err("First fetch should fail.");
		let b = b.expect_err("Queued fetch should receive the shared failure.");

		assert!(matches!(a, Error::Auth(AuthError::Exchange { status: Some(400), .. })));
		assert!(matches!(b, Error::Auth(AuthError::Exchange { status: Some(400), .. })));
		assert_eq!(endpoint.calls(), 1);
	}

	#[tokio::test]
	async fn invalidate_forces_refresh() {
		let endpoint = Arc::new(StubTokenEndpoint::issuing("rotated", 1800));
		let manager = manager(endpoint.clone());

		manager.get_token().await.expect("Initial fetch should succeed.");
		manager.invalidate();
		manager.get_token().await.expect("Post-invalidate fetch should succeed.");

		assert_eq!(endpoint.calls(), 2);
	}

	#[tokio::test]
	async fn near_expiry_token_is_refreshed() {
		// expires_in below the margin, so the cached token is never fresh.
		let endpoint = Arc::new(StubTokenEndpoint::issuing("short-lived", 10));
		let manager = manager(endpoint.clone());

		manager.get_token().await.expect("First fetch should succeed.");
		manager.get_token().await.expect("Second fetch should succeed.");

		assert_eq!(endpoint.calls(), 2);
	}

	#[tokio::test]
	async fn malformed_token_response_maps_to_parse_error() {
		let endpoint = Arc::new(StubTokenEndpoint {
			calls: AtomicUsize::new(0),
			status: 200,
			body: serde_json::json!({ "token": "wrong-shape" }),
			delay: None,
		});
		let err = manager(endpoint).get_token().await.expect_err("Malformed payload should fail.");

		assert!(matches!(err, Error::Auth(AuthError::ResponseParse { status: 200, .. })));
	}
}
