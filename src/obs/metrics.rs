// self
use crate::{
	_prelude::*,
	obs::{StageKind, StageOutcome},
};

/// Records a stage outcome via the global metrics recorder (when enabled).
pub fn record_stage_outcome(kind: StageKind, outcome: StageOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"rest_pipeline_stage_total",
			"stage" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Publishes the number of callers currently waiting for a queue slot.
pub fn record_queue_depth(depth: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::gauge!("rest_pipeline_queue_depth").set(depth as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = depth;
	}
}

/// Records how long a caller waited for admission.
pub fn record_queue_wait(wait: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("rest_pipeline_queue_wait_seconds").record(wait.as_seconds_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = wait;
	}
}
