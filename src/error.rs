//! Pipeline-level error types shared across layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical pipeline error exposed by public APIs.
///
/// Non-2xx responses are not errors; they come back as ordinary
/// [`Response`](crate::http::Response) values and status interpretation stays with
/// the caller. The one exception is the auth layer's second consecutive 401,
/// which is elevated to [`AuthError::Unauthorized`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential exchange or authorization failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, malformed payloads).
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Configuration and validation failures raised while assembling the chain.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request URI cannot be resolved against the configured host.
	#[error("Request URI `{uri}` cannot be resolved against the configured host.")]
	InvalidRequestUri {
		/// Offending URI string.
		uri: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Dispatch queue was configured with a zero concurrency ceiling.
	#[error("Concurrency ceiling must be at least 1.")]
	ZeroConcurrency,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, undecodable payloads).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while executing the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Response advertised JSON but the body could not be decoded.
	#[error("Response body could not be decoded as JSON (status {status}).")]
	BodyDecode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the offending response.
		status: u16,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Authentication failures raised by the token manager and auth layer.
///
/// Variants carry owned strings instead of error sources so the singleflight
/// refresh can hand the winner's outcome to every waiter via `Clone`.
#[derive(Clone, Debug, ThisError)]
pub enum AuthError {
	/// Credential exchange against the token endpoint failed.
	#[error("Credential exchange failed: {message}.")]
	Exchange {
		/// Summary of the exchange failure.
		message: String,
		/// HTTP status code returned by the token endpoint, when one was received.
		status: Option<u16>,
	},
	/// Token endpoint returned a payload missing the expected fields.
	#[error("Token endpoint returned a malformed token response: {message}.")]
	ResponseParse {
		/// Summary of the parse failure.
		message: String,
		/// HTTP status code returned by the token endpoint.
		status: u16,
	},
	/// A request failed authorization twice in a row.
	#[error("Request failed authorization twice in a row; credentials are invalid.")]
	Unauthorized,
}
