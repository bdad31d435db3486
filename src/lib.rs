//! Composable async REST client core—FIFO-fair concurrency limiting, singleflight OAuth 2.0
//! client-credentials auth, and layerable transports in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod obs;
pub mod queue;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicU64, Ordering};
	// self
	use crate::{
		auth::AuthConfig,
		client::{Client, ClientBuilder},
	};

	/// Builds a client pointed at a mock API host with the queue ceiling under test.
	pub fn test_client_builder(api_host: &str, concurrency: usize) -> ClientBuilder {
		Client::builder(Url::parse(api_host).expect("Test API host should parse successfully."))
			.concurrency(concurrency)
	}

	/// Builds a fully wired client for tests that exercise the auth layer.
	pub fn build_test_client(api_host: &str, auth: AuthConfig, concurrency: usize) -> Client {
		test_client_builder(api_host, concurrency)
			.auth(auth)
			.build()
			.expect("Test client should build successfully.")
	}

	/// Explicit unique-key generator for round-trip fixtures.
	///
	/// Replaces ad-hoc module-level counters; each sequence owns its own state and
	/// stamps keys with the instant it was created plus a monotonic suffix.
	#[derive(Debug)]
	pub struct KeySequence {
		prefix: String,
		epoch: i64,
		counter: AtomicU64,
	}
	impl KeySequence {
		/// Creates a sequence that prefixes every generated key.
		pub fn new(prefix: impl Into<String>) -> Self {
			Self {
				prefix: prefix.into(),
				epoch: OffsetDateTime::now_utc().unix_timestamp(),
				counter: AtomicU64::new(0),
			}
		}

		/// Returns the next unique key.
		pub fn next_key(&self) -> String {
			let n = self.counter.fetch_add(1, Ordering::Relaxed);

			format!("{}{}_{n}", self.prefix, self.epoch)
		}
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {
	color_eyre as _, httpmock as _, rest_pipeline as _, tokio as _,
};
