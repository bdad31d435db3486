//! Optional observability helpers for pipeline stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `rest_pipeline.stage` with the `stage` and
//!   `id` (correlation) fields.
//! - Enable `metrics` to increment the `rest_pipeline_stage_total` counter for every
//!   attempt/success/failure, publish the `rest_pipeline_queue_depth` gauge, and record the
//!   `rest_pipeline_queue_wait_seconds` histogram.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
	/// A caller-submitted request traveling the full chain.
	Execute,
	/// A credential exchange against the token endpoint.
	TokenRefresh,
}
impl StageKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageKind::Execute => "execute",
			StageKind::TokenRefresh => "token_refresh",
		}
	}
}
impl Display for StageKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry into a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Random per-call correlation identifier attached to spans.
///
/// Each [`Client::execute`](crate::client::Client::execute) generates its own;
/// the generator is explicit state rather than a shared counter so independent
/// clients never coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallId(u64);
impl CallId {
	/// Generates a fresh random identifier.
	pub fn generate() -> Self {
		Self(rand::random())
	}

	/// Returns the raw identifier value.
	pub const fn as_u64(self) -> u64 {
		self.0
	}
}
impl Display for CallId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{:016x}", self.0)
	}
}
