//! Request/response data model and the [`Handler`] layer contract.
//!
//! Every pipeline layer implements [`Handler`]; composition is explicit object
//! construction with each layer holding an `Arc<dyn Handler>` reference to the
//! next one. Requests are immutable once submitted—layers that need to attach a
//! header derive a new [`Request`] instead of mutating the caller's value.

#[cfg(feature = "reqwest")] pub mod transport;
#[cfg(feature = "reqwest")] pub use transport::*;

// self
use crate::_prelude::*;

/// `Accept`/`Content-Type` header names used on the wire.
pub const ACCEPT: &str = "Accept";
/// Bearer credential header injected by the auth layer.
pub const AUTHORIZATION: &str = "Authorization";
/// Content type header name.
pub const CONTENT_TYPE: &str = "Content-Type";
/// JSON media type used for request and response bodies.
pub const APPLICATION_JSON: &str = "application/json";

/// Boxed future returned by [`Handler::send`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + 'a + Send>>;

/// Capability-typed layer contract: send one request, settle with one response
/// or one error.
///
/// Implementations must be `Send + Sync + 'static` so chains can be shared
/// across tasks behind a single `Arc` without additional wrappers.
pub trait Handler
where
	Self: 'static + Send + Sync,
{
	/// Sends the request through this layer and whatever it wraps.
	fn send(&self, request: Request) -> HandlerFuture<'_>;
}

/// HTTP methods recognized by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Returns the wire-format method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Declarative request description submitted to [`Client::execute`](crate::client::Client::execute).
///
/// `uri` is either a path resolved against the transport's configured host or an
/// absolute URL that bypasses it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Request {
	/// Request path or absolute URL.
	pub uri: String,
	/// HTTP method.
	pub method: Method,
	/// Request headers.
	pub headers: BTreeMap<String, String>,
	/// Optional JSON payload.
	pub body: Option<serde_json::Value>,
}
impl Request {
	/// Creates a request with no headers and no body.
	pub fn new(method: Method, uri: impl Into<String>) -> Self {
		Self { uri: uri.into(), method, headers: BTreeMap::new(), body: None }
	}

	/// Returns a derived request with the header set, leaving `self` untouched.
	pub fn with_header(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
		let mut derived = self.clone();

		derived.headers.insert(name.into(), value.into());

		derived
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Returns `true` if a header with the given name is present (case-insensitive).
	pub fn has_header(&self, name: &str) -> bool {
		self.headers.keys().any(|key| key.eq_ignore_ascii_case(name))
	}
}

/// Response produced exactly once per accepted request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response {
	/// HTTP status code.
	pub status_code: u16,
	/// Response headers.
	pub headers: BTreeMap<String, String>,
	/// Decoded JSON body; [`serde_json::Value::Null`] when the body was empty.
	pub body: serde_json::Value,
}
impl Response {
	/// Returns `true` for 2xx status codes.
	pub const fn is_success(&self) -> bool {
		self.status_code >= 200 && self.status_code < 300
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn with_header_derives_without_mutating() {
		let original = Request::new(Method::Get, "/foo/channels");
		let derived = original.with_header(AUTHORIZATION, "Bearer token");

		assert!(original.headers.is_empty());
		assert_eq!(derived.headers.get(AUTHORIZATION).map(String::as_str), Some("Bearer token"));
	}

	#[test]
	fn header_lookup_is_case_insensitive() {
		let request = Request::new(Method::Post, "/foo").with_header("content-type", "text/plain");

		assert!(request.has_header(CONTENT_TYPE));
		assert!(!request.has_header(ACCEPT));
	}

	#[test]
	fn success_covers_2xx_only() {
		let mut response =
			Response { status_code: 201, headers: BTreeMap::new(), body: serde_json::Value::Null };

		assert!(response.is_success());

		response.status_code = 404;

		assert!(!response.is_success());
	}
}
