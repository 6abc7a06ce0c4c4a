// SPDX-License-Identifier: GPL-3.0

//! Extrinsic service façade.
//!
//! The surface feature code talks to: single and batch fee estimation,
//! single and batch submission, build-only, and watched submission with a
//! registry of live status subscriptions. Status updates are delivered over
//! a channel owned by the caller; the service never holds a reference back
//! into caller code.

use crate::factory::{CallPopulator, ExtrinsicOperationFactory, FeeResult, SubmitResult};
use futures::{
	StreamExt,
	future::{AbortHandle, Abortable},
};
use quill_common::{Error, Hash, TxSigner, rpc::TransactionStatus};
use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};
use tokio::sync::mpsc;

/// A live watched submission.
///
/// Dropping the receiver stops delivery but not the subscription; call
/// [`ExtrinsicService::cancel_watch`] to tear the subscription down.
pub struct TxSubscription {
	/// Registry identifier of this subscription.
	pub id: u16,
	/// Status updates in arrival order. Closes after a terminal status,
	/// cancellation, or service teardown.
	pub statuses: mpsc::UnboundedReceiver<Result<TransactionStatus, Error>>,
}

#[derive(Default)]
struct WatchRegistry {
	next_id: u16,
	active: HashMap<u16, AbortHandle>,
}

impl WatchRegistry {
	fn allocate(&mut self) -> u16 {
		// Wrapping allocation; skips ids still in use.
		loop {
			let id = self.next_id;
			self.next_id = self.next_id.wrapping_add(1);
			if !self.active.contains_key(&id) {
				return id;
			}
		}
	}
}

/// Façade over [`ExtrinsicOperationFactory`] for feature code.
pub struct ExtrinsicService {
	factory: ExtrinsicOperationFactory,
	watches: Arc<Mutex<WatchRegistry>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ExtrinsicService {
	/// Create the service over a configured factory.
	pub fn new(factory: ExtrinsicOperationFactory) -> Self {
		Self { factory, watches: Arc::new(Mutex::new(WatchRegistry::default())) }
	}

	/// Estimate the fee of a single extrinsic.
	pub async fn estimate_fee(&self, populate: Arc<dyn CallPopulator>) -> FeeResult {
		self.estimate_fee_batch(populate, 1)
			.await
			.into_iter()
			.next()
			.unwrap_or(Err(Error::UnexpectedDependentResult))
	}

	/// Estimate the fees of `n` extrinsics; one result slot per index.
	pub async fn estimate_fee_batch(
		&self,
		populate: Arc<dyn CallPopulator>,
		n: usize,
	) -> Vec<FeeResult> {
		self.factory.estimate_fee(populate, n).await
	}

	/// Sign and submit a single extrinsic, returning its hash.
	pub async fn submit(
		&self,
		populate: Arc<dyn CallPopulator>,
		signer: TxSigner,
	) -> Result<Hash, Error> {
		self.submit_batch(populate, signer, 1)
			.await
			.into_iter()
			.next()
			.unwrap_or(Err(Error::UnexpectedDependentResult))
	}

	/// Sign and submit `n` extrinsics; one result slot per index.
	pub async fn submit_batch(
		&self,
		populate: Arc<dyn CallPopulator>,
		signer: TxSigner,
		n: usize,
	) -> Vec<SubmitResult> {
		self.factory.submit(populate, signer, n).await
	}

	/// Build a single signed extrinsic and return its hex encoding.
	pub async fn build_extrinsic(
		&self,
		populate: Arc<dyn CallPopulator>,
		signer: TxSigner,
	) -> Result<String, Error> {
		self.factory.build_one(populate, signer).await
	}

	/// Sign, submit and watch a single extrinsic.
	///
	/// Once the node has accepted the submission, `keep` is consulted with
	/// the allocated subscription id. Returning `false` cancels the status
	/// stream immediately - the extrinsic stays submitted - and the
	/// returned subscription yields no updates.
	pub async fn submit_and_watch<K>(
		&self,
		populate: Arc<dyn CallPopulator>,
		signer: TxSigner,
		keep: K,
	) -> Result<TxSubscription, Error>
	where
		K: FnOnce(u16) -> bool + Send,
	{
		let extrinsic = self.factory.build_one(populate, signer).await?;
		let stream = self.factory.connection().submit_and_watch_extrinsic(&extrinsic).await?;

		let id = lock(&self.watches).allocate();
		let (sender, receiver) = mpsc::unbounded_channel();

		if !keep(id) {
			// Fire and forget: dropping the stream cancels the RPC
			// subscription, the broadcast itself cannot be undone.
			drop(stream);
			return Ok(TxSubscription { id, statuses: receiver });
		}

		let (abort, registration) = AbortHandle::new_pair();
		let watches = self.watches.clone();
		let forwarder = async move {
			let mut stream = stream;
			while let Some(update) = stream.next().await {
				let terminal = matches!(&update, Ok(status) if status.is_terminal());
				if sender.send(update).is_err() || terminal {
					break;
				}
			}
			lock(&watches).active.remove(&id);
		};
		lock(&self.watches).active.insert(id, abort);
		tokio::spawn(Abortable::new(forwarder, registration));

		Ok(TxSubscription { id, statuses: receiver })
	}

	/// Cancel a watched submission's status subscription.
	///
	/// Idempotent; unknown ids are ignored. The underlying extrinsic is not
	/// un-submitted.
	pub fn cancel_watch(&self, id: u16) {
		if let Some(abort) = lock(&self.watches).active.remove(&id) {
			log::debug!("cancelling extrinsic watch {id}");
			abort.abort();
		}
	}

	/// Number of live watch subscriptions.
	pub fn active_watches(&self) -> usize {
		lock(&self.watches).active.len()
	}
}

impl Drop for ExtrinsicService {
	fn drop(&mut self) {
		for (_, abort) in lock(&self.watches).active.drain() {
			abort.abort();
		}
	}
}

/// Convenience constructor used by feature code that already has the parts.
impl From<ExtrinsicOperationFactory> for ExtrinsicService {
	fn from(factory: ExtrinsicOperationFactory) -> Self {
		Self::new(factory)
	}
}
