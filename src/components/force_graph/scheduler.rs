//! Frame scheduling seam between the simulator and its host.
//!
//! The simulator never drives itself. When it has work to do it asks its
//! scheduler for a frame; the host calls back into the graph state once per
//! frame. In the browser the scheduler wraps `requestAnimationFrame`, in
//! tests it only records requests so ticks can be stepped by hand.

use std::cell::Cell;
use std::rc::Rc;

/// Source of per-frame callbacks.
pub trait TickScheduler {
	/// Ask for one more frame. Repeated requests before the frame fires coalesce.
	fn request_frame(&mut self);

	/// Drop any pending frame request.
	fn cancel(&mut self);
}

/// Scheduler for headless use: records requests, never fires on its own.
///
/// Clones share state, so a test can keep a handle after moving one into the
/// simulator.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
	pending: Rc<Cell<bool>>,
	requests: Rc<Cell<usize>>,
	cancellations: Rc<Cell<usize>>,
}

impl ManualScheduler {
	/// A scheduler with no frame pending.
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether a frame has been requested since the last [`take`](Self::take).
	pub fn is_pending(&self) -> bool {
		self.pending.get()
	}

	/// Consume the pending request, as a host does when the frame fires.
	pub fn take(&self) -> bool {
		self.pending.replace(false)
	}

	/// Frames requested so far.
	pub fn requests(&self) -> usize {
		self.requests.get()
	}

	/// Cancellations so far.
	pub fn cancellations(&self) -> usize {
		self.cancellations.get()
	}
}

impl TickScheduler for ManualScheduler {
	fn request_frame(&mut self) {
		self.pending.set(true);
		self.requests.set(self.requests.get() + 1);
	}

	fn cancel(&mut self) {
		self.pending.set(false);
		self.cancellations.set(self.cancellations.get() + 1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_observe_the_same_requests() {
		let handle = ManualScheduler::new();
		let mut boxed: Box<dyn TickScheduler> = Box::new(handle.clone());
		boxed.request_frame();
		boxed.request_frame();
		assert!(handle.is_pending());
		assert_eq!(handle.requests(), 2);
		assert!(handle.take());
		assert!(!handle.take());
		boxed.request_frame();
		boxed.cancel();
		assert!(!handle.is_pending());
		assert_eq!(handle.cancellations(), 1);
	}
}
