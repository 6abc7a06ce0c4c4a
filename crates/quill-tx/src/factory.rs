// SPDX-License-Identifier: GPL-3.0

//! Extrinsic operation factory.
//!
//! Composes the chain queries every signed extrinsic needs - account nonce,
//! coder factory, genesis hash and the era sub-graph - into an operation
//! graph, then constructs and signs `n` extrinsics in one pass with
//! `nonce = base + index`. The shared queries run in parallel; the era
//! birth-block hash depends on era resolution and is serialized behind it
//! by the graph.

use crate::{
	builder::{ChainExtension, ExtrinsicBuilder},
	era::EraStrategy,
	fee::{FeeEstimate, apply_tip_correction},
};
use quill_common::{
	AccountId, CryptoScheme, Error, Hash, TxSigner,
	chain::ChainModel,
	ops::{self, OperationHandle},
	rpc::ChainRpc,
	runtime::RuntimeCodingService,
};
use sp_core::bytes::to_hex;
use std::sync::Arc;

/// Per-index call construction.
///
/// Implementations attach the dispatchable call (and any per-index builder
/// adjustments) for the extrinsic at `index` within a batch.
pub trait CallPopulator: Send + Sync {
	/// Attach the call for the extrinsic at `index`.
	fn populate_call(
		&self,
		builder: ExtrinsicBuilder,
		index: usize,
	) -> Result<ExtrinsicBuilder, Error>;
}

impl<F> CallPopulator for F
where
	F: Fn(ExtrinsicBuilder, usize) -> Result<ExtrinsicBuilder, Error> + Send + Sync,
{
	fn populate_call(
		&self,
		builder: ExtrinsicBuilder,
		index: usize,
	) -> Result<ExtrinsicBuilder, Error> {
		self(builder, index)
	}
}

/// One fee-estimation result slot.
pub type FeeResult = Result<FeeEstimate, Error>;
/// One submission result slot.
pub type SubmitResult = Result<Hash, Error>;

/// Builds signed, encoded extrinsics for one account on one chain.
#[derive(Clone)]
pub struct ExtrinsicOperationFactory {
	account: AccountId,
	chain: ChainModel,
	scheme: CryptoScheme,
	runtime: Arc<dyn RuntimeCodingService>,
	extensions: Vec<ChainExtension>,
	rpc: Arc<dyn ChainRpc>,
	era_strategy: EraStrategy,
}

impl ExtrinsicOperationFactory {
	/// Create a factory.
	///
	/// # Arguments
	/// * `account` - The sender account.
	/// * `chain` - The chain the extrinsics target.
	/// * `scheme` - Signature scheme of the sender.
	/// * `runtime` - Coder factory provider for the chain.
	/// * `extensions` - Custom signed extensions, in runtime order.
	/// * `rpc` - The chain connection.
	pub fn new(
		account: AccountId,
		chain: ChainModel,
		scheme: CryptoScheme,
		runtime: Arc<dyn RuntimeCodingService>,
		extensions: Vec<ChainExtension>,
		rpc: Arc<dyn ChainRpc>,
	) -> Self {
		Self {
			account,
			chain,
			scheme,
			runtime,
			extensions,
			rpc,
			era_strategy: EraStrategy::default(),
		}
	}

	/// Override the default mortal era strategy.
	pub fn with_era_strategy(mut self, era_strategy: EraStrategy) -> Self {
		self.era_strategy = era_strategy;
		self
	}

	/// The chain connection this factory operates on.
	pub fn connection(&self) -> Arc<dyn ChainRpc> {
		self.rpc.clone()
	}

	/// Schedule the construction graph for `n` signed extrinsics.
	///
	/// The terminal node resolves to the encoded extrinsics in index order.
	/// Any leaf failure fails the whole batch; a signing failure fails the
	/// batch at the failing index without retry.
	fn build_operation(
		&self,
		populate: Arc<dyn CallPopulator>,
		n: usize,
		signer: TxSigner,
	) -> OperationHandle<Vec<Vec<u8>>> {
		let nonce_op = {
			let rpc = self.rpc.clone();
			let account = self.account.clone();
			ops::spawn(async move { rpc.account_nonce(&account).await })
		};
		let coder_op = {
			let runtime = self.runtime.clone();
			ops::spawn(async move { runtime.coder_factory().await })
		};
		let genesis_op = {
			let rpc = self.rpc.clone();
			ops::spawn(async move { rpc.block_hash(0).await })
		};
		let era_op = {
			let rpc = self.rpc.clone();
			let strategy = self.era_strategy;
			ops::spawn(async move { strategy.resolve(rpc.as_ref()).await })
		};
		let era_hash_op = {
			let rpc = self.rpc.clone();
			let era_op = era_op.clone();
			ops::spawn(async move {
				let resolved = era_op.result().await?;
				rpc.block_hash(resolved.birth_block).await
			})
		};

		let account = self.account.clone();
		let scheme = self.scheme;
		let default_tip = self.chain.default_tip;
		let extensions = self.extensions.clone();
		ops::spawn(async move {
			let base_nonce = nonce_op.result().await?;
			let coder = coder_op.result().await?;
			let genesis_hash = genesis_op.result().await?;
			let resolved_era = era_op.result().await?;
			let era_block_hash = era_hash_op.result().await?;

			log::debug!(
				"building {n} extrinsic(s), base nonce {base_nonce}, spec {}",
				coder.spec_version
			);

			(0..n)
				.map(|index| {
					let mut builder = ExtrinsicBuilder::new(
						coder.spec_version,
						coder.transaction_version,
						genesis_hash,
					)
					.with_era(resolved_era.era, era_block_hash)
					.with_nonce(base_nonce + index as u32)
					.with_address(account.clone(), scheme);

					if let Some(tip) = default_tip {
						builder = builder.with_tip(tip);
					}
					for extension in &extensions {
						builder = builder.adding_extension(extension.clone());
					}

					builder = populate.populate_call(builder, index)?;
					let payload = builder.signing_payload()?;
					let signature = signer.sign(&payload)?;
					builder.build(&signature)
				})
				.collect()
		})
	}

	/// Estimate the fee of `n` extrinsics built by `populate`.
	///
	/// Signs with the deterministic signer - fee estimation never touches
	/// key material. Returns exactly `n` result slots; a failed shared
	/// upstream (nonce, metadata, era) fails every slot with that error.
	pub async fn estimate_fee(&self, populate: Arc<dyn CallPopulator>, n: usize) -> Vec<FeeResult> {
		let signer = match TxSigner::deterministic() {
			Ok(signer) => signer,
			Err(error) => return vec![Err(error); n],
		};
		let build_op = self.build_operation(populate, n, signer);

		let fee_ops: Vec<OperationHandle<FeeEstimate>> = (0..n)
			.map(|index| {
				let build_op = build_op.clone();
				let rpc = self.rpc.clone();
				ops::spawn(async move {
					let extrinsics = build_op.result().await?;
					let bytes = extrinsics
						.get(index)
						.cloned()
						.ok_or(Error::UnexpectedDependentResult)?;
					let info = rpc.payment_info(&to_hex(&bytes, false)).await?;
					FeeEstimate::try_from(apply_tip_correction(info, &bytes))
				})
			})
			.collect();

		let mut results = Vec::with_capacity(n);
		for op in fee_ops {
			results.push(op.result().await);
		}
		results
	}

	/// Build and submit `n` extrinsics signed by `signer`.
	///
	/// Each extrinsic is submitted independently; one rejected submission
	/// does not block the others.
	pub async fn submit(
		&self,
		populate: Arc<dyn CallPopulator>,
		signer: TxSigner,
		n: usize,
	) -> Vec<SubmitResult> {
		let build_op = self.build_operation(populate, n, signer);

		let submit_ops: Vec<OperationHandle<Hash>> = (0..n)
			.map(|index| {
				let build_op = build_op.clone();
				let rpc = self.rpc.clone();
				ops::spawn(async move {
					let extrinsics = build_op.result().await?;
					let bytes = extrinsics
						.get(index)
						.cloned()
						.ok_or(Error::UnexpectedDependentResult)?;
					rpc.submit_extrinsic(&to_hex(&bytes, false)).await
				})
			})
			.collect();

		let mut results = Vec::with_capacity(n);
		for op in submit_ops {
			results.push(op.result().await);
		}
		results
	}

	/// Build a single signed extrinsic and return its hex encoding without
	/// submitting it.
	pub async fn build_one(
		&self,
		populate: Arc<dyn CallPopulator>,
		signer: TxSigner,
	) -> Result<String, Error> {
		let build_op = self.build_operation(populate, 1, signer);
		let extrinsics = build_op.result().await?;
		let bytes = extrinsics.into_iter().next().ok_or(Error::UnexpectedDependentResult)?;
		Ok(to_hex(&bytes, false))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::decode_signed_prelude;
	use quill_common::testing::{MockChainRpc, MockRuntimeService};
	use sp_core::bytes::from_hex;

	fn factory_with(rpc: Arc<MockChainRpc>) -> ExtrinsicOperationFactory {
		let signer = TxSigner::deterministic().expect("dev signer");
		ExtrinsicOperationFactory::new(
			signer.account_id(),
			ChainModel::new("westend", "Westend", true),
			CryptoScheme::Sr25519,
			Arc::new(MockRuntimeService::default()),
			ChainExtension::default_extensions(),
			rpc,
		)
	}

	fn transfer_populator() -> Arc<dyn CallPopulator> {
		Arc::new(|builder: ExtrinsicBuilder, _index: usize| {
			Ok(builder.with_call(vec![5, 0, 7, 7]))
		})
	}

	#[tokio::test]
	async fn batch_uses_strictly_increasing_nonces() {
		let rpc = Arc::new(MockChainRpc::new().with_nonce(42));
		let factory = factory_with(rpc.clone());
		let signer = TxSigner::deterministic().expect("dev signer");

		let built = factory
			.build_operation(transfer_populator(), 3, signer)
			.result()
			.await
			.expect("batch built");

		let nonces: Vec<u32> = built
			.iter()
			.map(|xt| decode_signed_prelude(xt).expect("decodable").nonce)
			.collect();
		assert_eq!(nonces, vec![42, 43, 44]);
		// The shared leaves ran once for the whole batch.
		assert_eq!(rpc.nonce_calls(), 1);
	}

	#[tokio::test]
	async fn estimate_fee_returns_one_slot_per_index() {
		let rpc = Arc::new(MockChainRpc::new());
		let factory = factory_with(rpc.clone());

		let results = factory.estimate_fee(transfer_populator(), 3).await;
		assert_eq!(results.len(), 3);
		for result in results {
			let estimate = result.expect("estimated");
			assert_eq!(estimate.fee, 1_000_000);
		}
		assert_eq!(rpc.payment_info_calls(), 3);
	}

	#[tokio::test]
	async fn shared_upstream_failure_fails_every_slot_identically() {
		let error = Error::ConnectionFailure("ws://node".to_string());
		let rpc = Arc::new(MockChainRpc::new().with_nonce_error(error.clone()));
		let factory = factory_with(rpc);

		let results = factory.estimate_fee(transfer_populator(), 3).await;
		assert_eq!(results.len(), 3);
		for result in results {
			assert_eq!(result, Err(error.clone()));
		}
	}

	#[tokio::test]
	async fn estimate_fee_uses_deterministic_signer() {
		let rpc = Arc::new(MockChainRpc::new());
		let factory = factory_with(rpc.clone());
		let signer = TxSigner::deterministic().expect("dev signer");

		let built = factory
			.build_operation(transfer_populator(), 1, signer.clone())
			.result()
			.await
			.expect("built");
		let decoded = decode_signed_prelude(&built[0]).expect("decodable");
		assert_eq!(decoded.address, signer.account_id());
	}

	#[tokio::test]
	async fn submit_failure_of_one_index_does_not_block_others() {
		// All submissions share one mock outcome, so instead assert the
		// slot-per-index shape under a submission error.
		let error = Error::RpcRequest { method: "author_submitExtrinsic", message: "pool full".to_string() };
		let rpc = Arc::new(MockChainRpc::new().with_submit_error(error.clone()));
		let factory = factory_with(rpc.clone());
		let signer = TxSigner::deterministic().expect("dev signer");

		let results = factory.submit(transfer_populator(), signer, 2).await;
		assert_eq!(results.len(), 2);
		for result in results {
			assert_eq!(result, Err(error.clone()));
		}
		// Both submissions were attempted despite the first failing.
		assert_eq!(rpc.submit_calls(), 2);
	}

	#[tokio::test]
	async fn build_one_returns_decodable_hex() {
		let rpc = Arc::new(MockChainRpc::new().with_nonce(7));
		let factory = factory_with(rpc);
		let signer = TxSigner::deterministic().expect("dev signer");

		let hex = factory.build_one(transfer_populator(), signer).await.expect("built");
		let bytes = from_hex(&hex).expect("valid hex");
		let decoded = decode_signed_prelude(&bytes).expect("decodable");
		assert_eq!(decoded.nonce, 7);
	}

	#[tokio::test]
	async fn populator_error_fails_the_batch() {
		let rpc = Arc::new(MockChainRpc::new());
		let factory = factory_with(rpc);
		let populate: Arc<dyn CallPopulator> =
			Arc::new(|_builder: ExtrinsicBuilder, _index: usize| Err(Error::MissingCall));

		let results = factory.estimate_fee(populate, 2).await;
		for result in results {
			assert_eq!(result, Err(Error::MissingCall));
		}
	}

	#[tokio::test]
	async fn default_tip_is_carried_into_the_extrinsic() {
		let rpc = Arc::new(MockChainRpc::new());
		let signer = TxSigner::deterministic().expect("dev signer");
		let mut chain = ChainModel::new("quartz", "Quartz", false);
		chain.default_tip = Some(500);
		let factory = ExtrinsicOperationFactory::new(
			signer.account_id(),
			chain,
			CryptoScheme::Sr25519,
			Arc::new(MockRuntimeService::default()),
			vec![],
			rpc,
		);

		let built = factory
			.build_operation(transfer_populator(), 1, signer)
			.result()
			.await
			.expect("built");
		let decoded = decode_signed_prelude(&built[0]).expect("decodable");
		assert_eq!(decoded.tip, 500);
	}
}
