// SPDX-License-Identifier: GPL-3.0

//! In-memory doubles for the pipeline's external collaborators.
//!
//! Shared by the test suites of the dependent crates: a configurable
//! [`MockChainRpc`] with per-method call counters and failure injection,
//! and a [`MockRuntimeService`] serving a fixed coder factory.

use crate::{
	AccountId, Hash,
	errors::Error,
	rpc::{ChainRpc, DispatchClass, RuntimeDispatchInfo, TransactionStatus, TxStatusStream, Weight},
	runtime::{CallRegistry, CoderFactory, RuntimeCodingService},
};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::sync::{
	Mutex,
	atomic::{AtomicUsize, Ordering},
};

/// Call counters of a [`MockChainRpc`].
#[derive(Default)]
pub struct CallCounters {
	nonce: AtomicUsize,
	block_hash: AtomicUsize,
	storage: AtomicUsize,
	payment_info: AtomicUsize,
	submit: AtomicUsize,
	watch: AtomicUsize,
}

/// Configurable in-memory [`ChainRpc`].
///
/// Block hashes are derived deterministically from the block number, so
/// tests can predict the hash the pipeline will observe for any height.
pub struct MockChainRpc {
	nonce: Mutex<Result<u32, Error>>,
	finalized_number: Mutex<Result<u32, Error>>,
	storage: Mutex<std::collections::HashMap<Vec<u8>, Vec<u8>>>,
	payment_info: Mutex<Result<RuntimeDispatchInfo, Error>>,
	submit: Mutex<Result<(), Error>>,
	statuses: Mutex<Vec<TransactionStatus>>,
	watch_pending: Mutex<bool>,
	counters: CallCounters,
}

impl Default for MockChainRpc {
	fn default() -> Self {
		Self::new()
	}
}

impl MockChainRpc {
	/// A mock with benign defaults: nonce 0, finalized block 100, an empty
	/// storage, a normal-class dispatch info and an immediately finalized
	/// watch stream.
	pub fn new() -> Self {
		Self {
			nonce: Mutex::new(Ok(0)),
			finalized_number: Mutex::new(Ok(100)),
			storage: Mutex::new(std::collections::HashMap::new()),
			payment_info: Mutex::new(Ok(RuntimeDispatchInfo {
				weight: Weight::from_parts(1_000_000, 0),
				class: DispatchClass::Normal,
				partial_fee: "1000000".to_string(),
			})),
			submit: Mutex::new(Ok(())),
			statuses: Mutex::new(vec![
				TransactionStatus::Ready,
				TransactionStatus::Finalized(Self::block_hash_for(1)),
			]),
			watch_pending: Mutex::new(false),
			counters: CallCounters::default(),
		}
	}

	/// The deterministic hash this mock reports for block `number`.
	pub fn block_hash_for(number: u32) -> Hash {
		Hash::from_low_u64_be(number as u64 + 0xabc0)
	}

	/// Set the base nonce returned for any account.
	pub fn with_nonce(self, nonce: u32) -> Self {
		*lock(&self.nonce) = Ok(nonce);
		self
	}

	/// Fail nonce queries with `error`.
	pub fn with_nonce_error(self, error: Error) -> Self {
		*lock(&self.nonce) = Err(error);
		self
	}

	/// Set the finalized block number.
	pub fn with_finalized_number(self, number: u32) -> Self {
		*lock(&self.finalized_number) = Ok(number);
		self
	}

	/// Fail finalized-head queries with `error`.
	pub fn with_finalized_number_error(self, error: Error) -> Self {
		*lock(&self.finalized_number) = Err(error);
		self
	}

	/// Set the `payment_queryInfo` response.
	pub fn with_payment_info(self, info: RuntimeDispatchInfo) -> Self {
		*lock(&self.payment_info) = Ok(info);
		self
	}

	/// Fail fee queries with `error`.
	pub fn with_payment_info_error(self, error: Error) -> Self {
		*lock(&self.payment_info) = Err(error);
		self
	}

	/// Fail submissions with `error`.
	pub fn with_submit_error(self, error: Error) -> Self {
		*lock(&self.submit) = Err(error);
		self
	}

	/// Store a raw storage value.
	pub fn with_storage(self, key: Vec<u8>, value: Vec<u8>) -> Self {
		lock(&self.storage).insert(key, value);
		self
	}

	/// Set the status updates pushed to watchers.
	pub fn with_statuses(self, statuses: Vec<TransactionStatus>) -> Self {
		*lock(&self.statuses) = statuses;
		self
	}

	/// Make watch streams stay open without ever yielding a status.
	pub fn with_watch_pending(self) -> Self {
		*lock(&self.watch_pending) = true;
		self
	}

	/// Number of nonce queries made.
	pub fn nonce_calls(&self) -> usize {
		self.counters.nonce.load(Ordering::SeqCst)
	}

	/// Number of block-hash queries made.
	pub fn block_hash_calls(&self) -> usize {
		self.counters.block_hash.load(Ordering::SeqCst)
	}

	/// Number of storage reads made.
	pub fn storage_calls(&self) -> usize {
		self.counters.storage.load(Ordering::SeqCst)
	}

	/// Number of fee queries made.
	pub fn payment_info_calls(&self) -> usize {
		self.counters.payment_info.load(Ordering::SeqCst)
	}

	/// Number of submissions made, including watched ones.
	pub fn submit_calls(&self) -> usize {
		self.counters.submit.load(Ordering::SeqCst) + self.counters.watch.load(Ordering::SeqCst)
	}

	/// Number of watched submissions made.
	pub fn watch_calls(&self) -> usize {
		self.counters.watch.load(Ordering::SeqCst)
	}
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ChainRpc for MockChainRpc {
	async fn account_nonce(&self, _account: &AccountId) -> Result<u32, Error> {
		self.counters.nonce.fetch_add(1, Ordering::SeqCst);
		lock(&self.nonce).clone()
	}

	async fn block_hash(&self, number: u32) -> Result<Hash, Error> {
		self.counters.block_hash.fetch_add(1, Ordering::SeqCst);
		Ok(Self::block_hash_for(number))
	}

	async fn finalized_block_number(&self) -> Result<u32, Error> {
		lock(&self.finalized_number).clone()
	}

	async fn storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
		self.counters.storage.fetch_add(1, Ordering::SeqCst);
		Ok(lock(&self.storage).get(key).cloned())
	}

	async fn payment_info(&self, _extrinsic: &str) -> Result<RuntimeDispatchInfo, Error> {
		self.counters.payment_info.fetch_add(1, Ordering::SeqCst);
		lock(&self.payment_info).clone()
	}

	async fn submit_extrinsic(&self, extrinsic: &str) -> Result<Hash, Error> {
		self.counters.submit.fetch_add(1, Ordering::SeqCst);
		lock(&self.submit).clone()?;
		Ok(Hash::from(sp_core::blake2_256(extrinsic.as_bytes())))
	}

	async fn submit_and_watch_extrinsic(&self, _extrinsic: &str) -> Result<TxStatusStream, Error> {
		self.counters.watch.fetch_add(1, Ordering::SeqCst);
		lock(&self.submit).clone()?;
		if *lock(&self.watch_pending) {
			return Ok(stream::pending().boxed());
		}
		let statuses: Vec<_> = lock(&self.statuses).iter().cloned().map(Ok).collect();
		Ok(stream::iter(statuses).boxed())
	}
}

/// [`RuntimeCodingService`] double serving a fixed [`CoderFactory`].
pub struct MockRuntimeService {
	factory: Result<CoderFactory, Error>,
}

impl Default for MockRuntimeService {
	fn default() -> Self {
		Self { factory: Ok(CoderFactory { spec_version: 1000, transaction_version: 4, calls: test_call_registry() }) }
	}
}

impl MockRuntimeService {
	/// Serve the given factory.
	pub fn new(factory: CoderFactory) -> Self {
		Self { factory: Ok(factory) }
	}

	/// Fail every fetch with `error`.
	pub fn failing(error: Error) -> Self {
		Self { factory: Err(error) }
	}
}

#[async_trait]
impl RuntimeCodingService for MockRuntimeService {
	async fn coder_factory(&self) -> Result<CoderFactory, Error> {
		self.factory.clone()
	}
}

/// A call registry with the pallets the pipeline tests exercise.
pub fn test_call_registry() -> CallRegistry {
	let mut registry = CallRegistry::default();
	registry.insert_pallet(
		"Balances",
		5,
		&[("transfer_allow_death", 0), ("transfer_keep_alive", 3)],
	);
	registry.insert_pallet(
		"XcmPallet",
		99,
		&[
			("execute", 3),
			("limited_reserve_transfer_assets", 8),
			("limited_teleport_assets", 9),
		],
	);
	registry.insert_pallet("XTokens", 70, &[("transfer_multiasset", 1)]);
	registry
}
