//! Admission gate bounding concurrent transcriptions.
//!
//! A fixed-capacity permit set built once at startup and shared through the
//! router state. Permits are RAII: dropping an [`AdmissionPermit`] returns the
//! slot, so every exit path of a transcription releases it.
//!
//! Waiters are unbounded and have no timeout. Ordering among waiters is
//! whatever `tokio::sync::Semaphore` provides.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
#[error("admission gate is closed")]
pub struct GateClosed;

struct GateInner {
	semaphore: Arc<Semaphore>,
	capacity: usize,
	waiting: AtomicUsize,
}

#[derive(Clone)]
pub struct AdmissionGate {
	inner: Arc<GateInner>,
}

/// Held for the duration of one transcription
pub struct AdmissionPermit {
	_permit: OwnedSemaphorePermit,
	gate: Arc<GateInner>,
}

impl AdmissionPermit {
	/// Return the slot to the gate
	pub fn release(self) {
		drop(self);
	}
}

impl Drop for AdmissionPermit {
	fn drop(&mut self) {
		// the semaphore permit is returned right after this body runs
		let in_flight = (self.gate.capacity - self.gate.semaphore.available_permits()).saturating_sub(1);
		debug!(in_flight, capacity = self.gate.capacity, "Admission permit released");
	}
}

/// Decrements the waiting counter even when the acquiring future is dropped
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

impl AdmissionGate {
	/// Build a gate with `capacity` permits (at least one)
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			inner: Arc::new(GateInner {
				semaphore: Arc::new(Semaphore::new(capacity)),
				capacity,
				waiting: AtomicUsize::new(0),
			}),
		}
	}

	/// Wait for a free slot
	pub async fn acquire(&self) -> Result<AdmissionPermit, GateClosed> {
		self.inner.waiting.fetch_add(1, Ordering::SeqCst);
		let permit = {
			let _waiting = WaitingGuard(&self.inner.waiting);
			self.inner.semaphore.clone().acquire_owned().await.map_err(|_| GateClosed)?
		};

		debug!(in_flight = self.in_flight(), capacity = self.inner.capacity, "Admission permit acquired");

		Ok(AdmissionPermit {
			_permit: permit,
			gate: self.inner.clone(),
		})
	}

	pub fn capacity(&self) -> usize {
		self.inner.capacity
	}

	/// Permits currently held
	pub fn in_flight(&self) -> usize {
		self.inner.capacity - self.inner.semaphore.available_permits()
	}

	/// Callers suspended in [`AdmissionGate::acquire`]
	pub fn waiting(&self) -> usize {
		self.inner.waiting.load(Ordering::SeqCst)
	}

	/// Reject current and future waiters; held permits stay valid
	pub fn close(&self) {
		self.inner.semaphore.close();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn test_capacity_bounds_permits() {
		let gate = AdmissionGate::new(2);

		let first = gate.acquire().await.unwrap();
		let _second = gate.acquire().await.unwrap();
		assert_eq!(gate.in_flight(), 2);

		let blocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
		assert!(blocked.is_err(), "third acquire should wait");
		assert_eq!(gate.waiting(), 0, "timed out waiter must not stay counted");

		first.release();
		assert_eq!(gate.in_flight(), 1);

		let third = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
		assert!(third.is_ok());
	}

	#[tokio::test]
	async fn test_zero_capacity_is_clamped() {
		let gate = AdmissionGate::new(0);
		assert_eq!(gate.capacity(), 1);
		assert!(gate.acquire().await.is_ok());
	}

	#[tokio::test]
	async fn test_waiter_resumes_after_release() {
		let gate = AdmissionGate::new(1);
		let held = gate.acquire().await.unwrap();

		let waiter_gate = gate.clone();
		let waiter = tokio::spawn(async move {
			let _permit = waiter_gate.acquire().await.unwrap();
		});

		while gate.waiting() == 0 {
			tokio::task::yield_now().await;
		}
		assert_eq!(gate.waiting(), 1);

		drop(held);
		tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
		assert_eq!(gate.in_flight(), 0);
	}

	#[tokio::test]
	async fn test_closed_gate_rejects_waiters() {
		let gate = AdmissionGate::new(1);
		let held = gate.acquire().await.unwrap();
		gate.close();

		assert!(gate.acquire().await.is_err());
		drop(held);
	}
}
