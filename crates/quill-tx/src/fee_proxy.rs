// SPDX-License-Identifier: GPL-3.0

//! Fee-request deduplication.
//!
//! Fee estimation is triggered aggressively by UI code - every amount
//! keystroke, every recipient edit. The proxy collapses repeated requests
//! for the same logical transaction (identified by a caller-chosen reuse
//! key) into one in-flight computation:
//!
//! - a `Loading` entry queues late callers on the single computation;
//! - a successful result is cached and replayed until superseded;
//! - a failed computation evicts the entry entirely, so the next request
//!   starts fresh. Failures are never cached; retry pacing is the caller's
//!   concern.

use crate::{
	factory::CallPopulator,
	fee::FeeEstimate,
	service::ExtrinsicService,
};
use quill_common::Error;
use std::{
	collections::HashMap,
	future::Future,
	sync::{Arc, Mutex},
};
use tokio::sync::oneshot;

/// Receiver for a proxied fee result.
///
/// Resolves with the computation's outcome; yields `Err(RecvError)` only if
/// the owning proxy was dropped mid-computation.
pub type FeeReceiver<T> = oneshot::Receiver<Result<T, Error>>;

enum CacheEntry<T> {
	/// A computation is in flight; completion drains the waiters.
	Loading(Vec<oneshot::Sender<Result<T, Error>>>),
	/// The last successful result, replayed to new callers.
	Loaded(T),
}

/// Deduplicating cache over an arbitrary fee computation.
pub struct FeeProxy<T> {
	entries: Arc<Mutex<HashMap<String, CacheEntry<T>>>>,
}

impl<T> Default for FeeProxy<T> {
	fn default() -> Self {
		Self { entries: Arc::new(Mutex::new(HashMap::new())) }
	}
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: Clone + Send + 'static> FeeProxy<T> {
	/// Create an empty proxy.
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolve the fee for `reuse_identifier`, starting `compute` only if no
	/// result is cached and no computation is already in flight.
	///
	/// Must be called from within a tokio runtime; the computation runs as
	/// a detached task.
	pub fn estimate<F>(&self, reuse_identifier: &str, compute: F) -> FeeReceiver<T>
	where
		F: Future<Output = Result<T, Error>> + Send + 'static,
	{
		let (sender, receiver) = oneshot::channel();
		let mut entries = lock(&self.entries);
		match entries.get_mut(reuse_identifier) {
			Some(CacheEntry::Loaded(value)) => {
				let _ = sender.send(Ok(value.clone()));
			},
			Some(CacheEntry::Loading(waiters)) => {
				waiters.push(sender);
			},
			None => {
				entries.insert(reuse_identifier.to_string(), CacheEntry::Loading(vec![sender]));
				let entries = self.entries.clone();
				let key = reuse_identifier.to_string();
				tokio::spawn(async move {
					let result = compute.await;
					let waiters = {
						let mut entries = lock(&entries);
						let waiters = match entries.remove(&key) {
							Some(CacheEntry::Loading(waiters)) => waiters,
							// Invalidated mid-flight or never present.
							_ => Vec::new(),
						};
						if let Ok(value) = &result {
							entries.insert(key, CacheEntry::Loaded(value.clone()));
						}
						waiters
					};
					for waiter in waiters {
						let _ = waiter.send(result.clone());
					}
				});
			},
		}
		receiver
	}

	/// Drop any cached result or queued computation for the key. Waiters of
	/// an in-flight computation still receive its result.
	pub fn invalidate(&self, reuse_identifier: &str) {
		lock(&self.entries).remove(reuse_identifier);
	}

	/// Whether a successful result is cached for the key.
	pub fn has_cached(&self, reuse_identifier: &str) -> bool {
		matches!(lock(&self.entries).get(reuse_identifier), Some(CacheEntry::Loaded(_)))
	}
}

/// Deduplicating proxy for plain extrinsic fee estimation.
#[derive(Default)]
pub struct TransactionFeeProxy {
	inner: FeeProxy<FeeEstimate>,
}

impl TransactionFeeProxy {
	/// Create an empty proxy.
	pub fn new() -> Self {
		Self::default()
	}

	/// Estimate through `service`, deduplicated on `reuse_identifier`.
	pub fn estimate_fee(
		&self,
		service: Arc<ExtrinsicService>,
		reuse_identifier: &str,
		populate: Arc<dyn CallPopulator>,
	) -> FeeReceiver<FeeEstimate> {
		self.inner
			.estimate(reuse_identifier, async move { service.estimate_fee(populate).await })
	}

	/// Drop the cached result for the key.
	pub fn invalidate(&self, reuse_identifier: &str) {
		self.inner.invalidate(reuse_identifier);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::sync::oneshot as gate;

	#[tokio::test]
	async fn concurrent_requests_share_one_computation() {
		let proxy: FeeProxy<u32> = FeeProxy::new();
		let runs = Arc::new(AtomicUsize::new(0));
		let (release, opened) = gate::channel::<()>();

		let first = {
			let runs = runs.clone();
			proxy.estimate("transfer-100-alice", async move {
				runs.fetch_add(1, Ordering::SeqCst);
				let _ = opened.await;
				Ok(7)
			})
		};
		// Arrives while the first computation is still loading.
		let second = {
			let runs = runs.clone();
			proxy.estimate("transfer-100-alice", async move {
				runs.fetch_add(1, Ordering::SeqCst);
				Ok(999)
			})
		};

		release.send(()).expect("computation is waiting");
		assert_eq!(first.await.expect("proxy alive"), Ok(7));
		assert_eq!(second.await.expect("proxy alive"), Ok(7));
		assert_eq!(runs.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn cached_success_is_replayed() {
		let proxy: FeeProxy<u32> = FeeProxy::new();
		let first = proxy.estimate("key", async { Ok(5) });
		assert_eq!(first.await.expect("proxy alive"), Ok(5));
		assert!(proxy.has_cached("key"));

		let runs = Arc::new(AtomicUsize::new(0));
		let second = {
			let runs = runs.clone();
			proxy.estimate("key", async move {
				runs.fetch_add(1, Ordering::SeqCst);
				Ok(999)
			})
		};
		assert_eq!(second.await.expect("proxy alive"), Ok(5));
		assert_eq!(runs.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn failure_is_not_cached_and_retry_recomputes() {
		let proxy: FeeProxy<u32> = FeeProxy::new();

		let failed = proxy.estimate("key", async {
			Err(Error::ConnectionFailure("ws://node".to_string()))
		});
		assert_eq!(
			failed.await.expect("proxy alive"),
			Err(Error::ConnectionFailure("ws://node".to_string()))
		);
		assert!(!proxy.has_cached("key"));

		// Self-heals: the next request runs a fresh computation.
		let retried = proxy.estimate("key", async { Ok(11) });
		assert_eq!(retried.await.expect("proxy alive"), Ok(11));
		assert!(proxy.has_cached("key"));
	}

	#[tokio::test]
	async fn distinct_keys_do_not_share() {
		let proxy: FeeProxy<u32> = FeeProxy::new();
		let a = proxy.estimate("a", async { Ok(1) });
		let b = proxy.estimate("b", async { Ok(2) });
		assert_eq!(a.await.expect("proxy alive"), Ok(1));
		assert_eq!(b.await.expect("proxy alive"), Ok(2));
	}

	#[tokio::test]
	async fn invalidate_supersedes_cached_result() {
		let proxy: FeeProxy<u32> = FeeProxy::new();
		let first = proxy.estimate("key", async { Ok(5) });
		assert_eq!(first.await.expect("proxy alive"), Ok(5));

		proxy.invalidate("key");
		assert!(!proxy.has_cached("key"));

		let second = proxy.estimate("key", async { Ok(6) });
		assert_eq!(second.await.expect("proxy alive"), Ok(6));
	}
}
