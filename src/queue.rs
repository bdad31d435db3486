//! FIFO-fair dispatch queue bounding in-flight concurrency.
//!
//! The queue admits at most its configured ceiling of calls into the wrapped
//! layer. Excess callers suspend on a wait list in arrival order; every
//! settlement—success or failure—frees exactly one slot, which is always
//! offered to the oldest waiter first, so no entry can skip the line and no
//! entry can starve. The queue never inspects responses; one caller's failure
//! cannot affect a sibling's outcome.

// std
use std::task::{Context, Poll, Waker};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{Handler, HandlerFuture, Request},
	obs,
};

/// Concurrency-limiting [`Handler`] wrapper.
pub struct DispatchQueue {
	next: Arc<dyn Handler>,
	limit: usize,
	state: Mutex<QueueState>,
}
impl DispatchQueue {
	/// Wraps `next` with a concurrency ceiling; `concurrency` must be at least 1.
	pub fn new(next: Arc<dyn Handler>, concurrency: usize) -> Result<Self, ConfigError> {
		if concurrency == 0 {
			return Err(ConfigError::ZeroConcurrency);
		}

		Ok(Self { next, limit: concurrency, state: Mutex::new(QueueState::default()) })
	}

	/// Configured concurrency ceiling.
	pub const fn concurrency(&self) -> usize {
		self.limit
	}

	/// Number of requests currently inside the wrapped layer.
	pub fn in_flight(&self) -> usize {
		self.state.lock().in_flight
	}

	/// Number of callers waiting for admission.
	pub fn queued(&self) -> usize {
		self.state.lock().waiting.len()
	}

	fn admission(&self) -> Admission<'_> {
		Admission { queue: self, slot: None }
	}

	fn release_slot(&self) {
		let mut state = self.state.lock();

		state.in_flight -= 1;

		// Offer freed capacity to the oldest waiters first.
		while state.in_flight < self.limit {
			let Some(entry) = state.waiting.pop_front() else { break };
			let mut slot = entry.slot.lock();

			if slot.cancelled {
				continue;
			}

			slot.admitted = true;
			state.in_flight += 1;

			obs::record_queue_wait(OffsetDateTime::now_utc() - entry.enqueued_at);

			if let Some(waker) = slot.waker.take() {
				waker.wake();
			}
		}

		obs::record_queue_depth(state.waiting.len());
	}
}
impl Handler for DispatchQueue {
	fn send(&self, request: Request) -> HandlerFuture<'_> {
		Box::pin(async move {
			let _slot = self.admission().await;

			self.next.send(request).await
		})
	}
}
impl Debug for DispatchQueue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DispatchQueue")
			.field("limit", &self.limit)
			.field("in_flight", &self.in_flight())
			.finish()
	}
}

#[derive(Default)]
struct QueueState {
	in_flight: usize,
	waiting: VecDeque<QueueEntry>,
}

/// Waiter bookkeeping owned by the queue from enqueue until admission.
struct QueueEntry {
	slot: Arc<Mutex<WaitSlot>>,
	enqueued_at: OffsetDateTime,
}

#[derive(Default)]
struct WaitSlot {
	admitted: bool,
	consumed: bool,
	cancelled: bool,
	waker: Option<Waker>,
}

/// Future resolving to a [`SlotGuard`] once a slot is granted.
struct Admission<'a> {
	queue: &'a DispatchQueue,
	slot: Option<Arc<Mutex<WaitSlot>>>,
}
impl<'a> Future for Admission<'a> {
	type Output = SlotGuard<'a>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.get_mut();

		if let Some(slot) = &this.slot {
			let mut slot_state = slot.lock();

			if slot_state.admitted {
				slot_state.consumed = true;

				return Poll::Ready(SlotGuard { queue: this.queue });
			}

			slot_state.waker = Some(cx.waker().clone());

			return Poll::Pending;
		}

		let mut state = this.queue.state.lock();

		// Abandoned waiters at the head must not block fresh arrivals.
		while let Some(front) = state.waiting.front() {
			if front.slot.lock().cancelled {
				state.waiting.pop_front();
			} else {
				break;
			}
		}

		if state.in_flight < this.queue.limit && state.waiting.is_empty() {
			state.in_flight += 1;

			return Poll::Ready(SlotGuard { queue: this.queue });
		}

		// Saturated: join the wait list in arrival order and suspend.
		let slot = Arc::new(Mutex::new(WaitSlot {
			waker: Some(cx.waker().clone()),
			..WaitSlot::default()
		}));

		state.waiting.push_back(QueueEntry {
			slot: slot.clone(),
			enqueued_at: OffsetDateTime::now_utc(),
		});
		obs::record_queue_depth(state.waiting.len());
		drop(state);

		this.slot = Some(slot);

		Poll::Pending
	}
}
impl Drop for Admission<'_> {
	fn drop(&mut self) {
		let Some(slot) = self.slot.take() else { return };
		let release = {
			let mut slot_state = slot.lock();

			if slot_state.consumed {
				false
			} else if slot_state.admitted {
				// Granted a slot but dropped before observing it.
				true
			} else {
				slot_state.cancelled = true;

				false
			}
		};

		if release {
			self.queue.release_slot();
		}
	}
}

/// Occupied slot; dropping it on settlement frees the slot and admits the next
/// waiter.
struct SlotGuard<'a> {
	queue: &'a DispatchQueue,
}
impl Drop for SlotGuard<'_> {
	fn drop(&mut self) {
		self.queue.release_slot();
	}
}
