//! Composition root assembling the configured layer chain.

// self
use crate::{
	_prelude::*,
	http::{Handler, Request, Response},
	obs::{self, CallId, StageKind, StageOutcome, StageSpan},
};
#[cfg(feature = "reqwest")]
use crate::{
	auth::{AuthConfig, AuthLayer, TokenManager},
	http::ReqwestTransport,
	queue::DispatchQueue,
};

/// Queue ceiling applied when the builder is not given one.
#[cfg(feature = "reqwest")]
pub const DEFAULT_CONCURRENCY: usize = 20;

/// REST client facade over a fixed layer chain.
///
/// The chain is `DispatchQueue(AuthLayer(Transport))`, or
/// `DispatchQueue(Transport)` when auth is not configured. The client holds no
/// per-request state; it can be cloned and shared freely.
#[derive(Clone)]
pub struct Client {
	chain: Arc<dyn Handler>,
}
impl Client {
	/// Starts a builder for the default reqwest-backed chain.
	#[cfg(feature = "reqwest")]
	pub fn builder(api_host: Url) -> ClientBuilder {
		ClientBuilder::new(api_host)
	}

	/// Wraps an explicitly composed chain (custom transports or extra layers).
	pub fn with_chain(chain: Arc<dyn Handler>) -> Self {
		Self { chain }
	}

	/// Executes one request through the chain; the sole public operation.
	pub async fn execute(&self, request: Request) -> Result<Response> {
		let span = StageSpan::new(StageKind::Execute, CallId::generate());

		obs::record_stage_outcome(StageKind::Execute, StageOutcome::Attempt);

		let result = span.instrument(self.chain.send(request)).await;

		match &result {
			Ok(_) => obs::record_stage_outcome(StageKind::Execute, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(StageKind::Execute, StageOutcome::Failure),
		}

		result
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client").finish_non_exhaustive()
	}
}

/// Builder wiring transport, optional auth, and the dispatch queue together.
#[cfg(feature = "reqwest")]
#[derive(Debug)]
pub struct ClientBuilder {
	api_host: Url,
	auth: Option<AuthConfig>,
	concurrency: usize,
	http_client: Option<ReqwestClient>,
}
#[cfg(feature = "reqwest")]
impl ClientBuilder {
	fn new(api_host: Url) -> Self {
		Self { api_host, auth: None, concurrency: DEFAULT_CONCURRENCY, http_client: None }
	}

	/// Enables the auth layer with the given client-credentials configuration.
	pub fn auth(mut self, config: AuthConfig) -> Self {
		self.auth = Some(config);

		self
	}

	/// Overrides the queue's concurrency ceiling (defaults to
	/// [`DEFAULT_CONCURRENCY`]).
	pub fn concurrency(mut self, ceiling: usize) -> Self {
		self.concurrency = ceiling;

		self
	}

	/// Supplies a custom [`ReqwestClient`]; API and token transports share its
	/// connection pool.
	pub fn http_client(mut self, client: ReqwestClient) -> Self {
		self.http_client = Some(client);

		self
	}

	/// Assembles the chain in its fixed order and returns the client.
	pub fn build(self) -> Result<Client> {
		let http_client = match self.http_client {
			Some(client) => client,
			None => ReqwestClient::builder().build().map_err(crate::error::ConfigError::from)?,
		};
		let transport: Arc<dyn Handler> =
			Arc::new(ReqwestTransport::with_client(self.api_host, http_client.clone()));
		let inner: Arc<dyn Handler> = match self.auth {
			Some(config) => {
				let token_transport: Arc<dyn Handler> = Arc::new(ReqwestTransport::with_client(
					config.token_host.clone(),
					http_client,
				));
				let manager = Arc::new(TokenManager::new(config, token_transport));

				Arc::new(AuthLayer::new(transport, manager))
			},
			None => transport,
		};
		let chain = Arc::new(DispatchQueue::new(inner, self.concurrency)?);

		Ok(Client { chain })
	}
}
