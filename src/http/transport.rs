//! Reqwest-backed leaf transport.
//!
//! The transport sends exactly one HTTP request per [`Handler::send`] call and
//! reports every HTTP status as a normal [`Response`]; only wire-level failures
//! become errors. It keeps no state across calls and never retries.

// crates.io
use reqwest::header::HeaderMap;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	http::{
		ACCEPT, APPLICATION_JSON, CONTENT_TYPE, Handler, HandlerFuture, Method, Request, Response,
	},
};

/// Leaf [`Handler`] that executes requests over a shared [`ReqwestClient`].
///
/// Relative request URIs are resolved against the configured host; absolute
/// URIs pass through unchanged. `Accept` and `Content-Type` default to
/// `application/json` when the request does not set them.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	host: Url,
	client: ReqwestClient,
}
impl ReqwestTransport {
	/// Creates a transport with a freshly built [`ReqwestClient`].
	pub fn new(host: Url) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().build()?;

		Ok(Self::with_client(host, client))
	}

	/// Wraps an existing [`ReqwestClient`], sharing its connection pool.
	pub fn with_client(host: Url, client: ReqwestClient) -> Self {
		Self { host, client }
	}

	fn resolve(&self, uri: &str) -> Result<Url, ConfigError> {
		if uri.starts_with("http://") || uri.starts_with("https://") {
			Url::parse(uri)
		} else {
			self.host.join(uri)
		}
		.map_err(|source| ConfigError::InvalidRequestUri { uri: uri.to_owned(), source })
	}

	async fn dispatch(&self, request: Request) -> Result<Response> {
		let url = self.resolve(&request.uri)?;
		let mut builder = self.client.request(request.method.into(), url);

		for (name, value) in &request.headers {
			builder = builder.header(name, value);
		}
		if !request.has_header(ACCEPT) {
			builder = builder.header(ACCEPT, APPLICATION_JSON);
		}
		if let Some(body) = &request.body {
			if !request.has_header(CONTENT_TYPE) {
				builder = builder.header(CONTENT_TYPE, APPLICATION_JSON);
			}

			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(TransportError::from)?;
		let status = response.status().as_u16();
		let headers = flatten_headers(response.headers());
		let bytes = response.bytes().await.map_err(TransportError::from)?;
		let body = decode_body(&headers, &bytes, status)?;

		Ok(Response { status_code: status, headers, body })
	}
}
impl Handler for ReqwestTransport {
	fn send(&self, request: Request) -> HandlerFuture<'_> {
		Box::pin(self.dispatch(request))
	}
}
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
	headers
		.iter()
		.filter_map(|(name, value)| {
			value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
		})
		.collect()
}

/// Decodes JSON bodies; empty bodies map to [`serde_json::Value::Null`] and
/// non-JSON payloads (proxy error pages and the like) are preserved verbatim as
/// a JSON string instead of failing the call.
fn decode_body(
	headers: &BTreeMap<String, String>,
	bytes: &[u8],
	status: u16,
) -> Result<serde_json::Value, TransportError> {
	if bytes.is_empty() {
		return Ok(serde_json::Value::Null);
	}

	let is_json = headers
		.iter()
		.find(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE))
		.is_none_or(|(_, value)| value.contains("json"));

	if is_json {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| TransportError::BodyDecode { source, status })
	} else {
		Ok(serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()))
	}
}
