// SPDX-License-Identifier: GPL-3.0

//! XCM transfer service.
//!
//! Prices and submits cross-chain transfers. The origin fee is the plain
//! extrinsic fee of the transfer call; the cross-chain fee aggregates the
//! destination hop and, when a third chain custodies the asset, the
//! reserve hop: fees add, weights take the component-wise maximum.

use crate::{
	calls::{self, CallPath},
	config::{FeeMode, XcmFeeInfo, XcmTransfers},
	message::{
		self, VersionedMultiAsset, VersionedMultiAssets, VersionedXcm, WeightLimit, Xcm,
		MultiAssets,
	},
	resolution::XcmTransferParties,
};
use quill_common::{
	AccountId, CryptoScheme, Error, Hash, TxSigner,
	chain::{ChainModel, ChainRegistry},
	rpc::Weight,
	runtime::CoderFactory,
};
use quill_tx::{
	ChainExtension, ExtrinsicBuilder, ExtrinsicOperationFactory,
	factory::CallPopulator,
	fee::FeeEstimate,
};
use std::sync::Arc;

/// Reference weight-per-second used by proportional fee coefficients.
pub const WEIGHT_PER_SECOND: u128 = 1_000_000_000_000;

/// A transfer before weight limits are chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XcmUnweightedTransferRequest {
	/// Resolved parties.
	pub parties: XcmTransferParties,
	/// Transferred amount in the asset's smallest unit.
	pub amount: u128,
}

/// A transfer with its execution weight cap on the remote chains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XcmTransferRequest {
	/// The transfer itself.
	pub unweighted: XcmUnweightedTransferRequest,
	/// Weight cap encoded into the dispatch call.
	pub max_weight: Weight,
}

impl XcmTransferRequest {
	/// Attach a weight cap to an unweighted request.
	pub fn new(unweighted: XcmUnweightedTransferRequest, max_weight: Weight) -> Self {
		Self { unweighted, max_weight }
	}
}

/// Fee and weight of one hop, or of the whole cross-chain leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeWithWeight {
	/// Fee in the chain's smallest unit.
	pub fee: u128,
	/// Execution weight the fee prices.
	pub weight: Weight,
}

impl FeeWithWeight {
	/// Aggregate the destination hop with an optional reserve hop: fees
	/// add, weights take the component-wise maximum. Without a reserve hop
	/// the destination result is returned unchanged.
	pub fn combining(destination: Self, reserve: Option<Self>) -> Self {
		match reserve {
			Some(reserve) => Self {
				fee: destination.fee + reserve.fee,
				weight: destination.weight.max(reserve.weight),
			},
			None => destination,
		}
	}
}

impl From<FeeEstimate> for FeeWithWeight {
	fn from(estimate: FeeEstimate) -> Self {
		Self { fee: estimate.fee, weight: estimate.weight }
	}
}

/// Outcome of a submitted transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XcmSubmitResult {
	/// Hash of the submitted extrinsic.
	pub tx_hash: Hash,
	/// Pallet and call that were dispatched.
	pub call_path: CallPath,
}

/// Fee estimation and submission of cross-chain transfers.
pub struct XcmTransferService {
	registry: Arc<dyn ChainRegistry>,
	sender: AccountId,
	extensions: Vec<ChainExtension>,
}

impl XcmTransferService {
	/// Create the service.
	///
	/// # Arguments
	/// * `registry` - Source of chains, connections and runtime providers.
	/// * `sender` - The wallet account transfers originate from. Fee
	///   estimation works with any account, including a zero placeholder.
	pub fn new(registry: Arc<dyn ChainRegistry>, sender: AccountId) -> Self {
		Self { registry, sender, extensions: ChainExtension::default_extensions() }
	}

	/// Override the custom signed extensions applied on every chain.
	pub fn with_extensions(mut self, extensions: Vec<ChainExtension>) -> Self {
		self.extensions = extensions;
		self
	}

	fn operation_factory(&self, chain: &ChainModel) -> Result<ExtrinsicOperationFactory, Error> {
		let connection = self
			.registry
			.get_connection(&chain.chain_id)
			.ok_or_else(|| Error::ConnectionUnavailable(chain.chain_id.clone()))?;
		let runtime = self
			.registry
			.get_runtime_provider(&chain.chain_id)
			.ok_or_else(|| Error::RuntimeProviderUnavailable(chain.chain_id.clone()))?;
		Ok(ExtrinsicOperationFactory::new(
			self.sender.clone(),
			chain.clone(),
			CryptoScheme::Sr25519,
			runtime,
			self.extensions.clone(),
			connection,
		))
	}

	async fn coder_factory(&self, chain: &ChainModel) -> Result<CoderFactory, Error> {
		self.registry
			.get_runtime_provider(&chain.chain_id)
			.ok_or_else(|| Error::RuntimeProviderUnavailable(chain.chain_id.clone()))?
			.coder_factory()
			.await
	}

	/// Derive the origin-chain dispatch call of a transfer.
	pub async fn transfer_call(
		&self,
		request: &XcmTransferRequest,
		config: &XcmTransfers,
	) -> Result<(Vec<u8>, CallPath), Error> {
		let parties = &request.unweighted.parties;
		let asset_id = &parties.origin.asset_id;
		let destination_chain_id = &parties.destination.chain.chain_id;

		let transfer = config
			.transfer(asset_id, destination_chain_id)
			.ok_or_else(|| Error::NoTransferRoute {
				asset: asset_id.clone(),
				chain: destination_chain_id.clone(),
			})?;
		let reserve_path = config
			.reserve_path(asset_id)
			.ok_or_else(|| Error::NoReserve(asset_id.clone()))?;

		let asset = message::transfer_asset(
			reserve_path,
			&parties.origin.chain,
			&parties.reserve.chain,
			request.unweighted.amount,
		)?;
		let location = message::destination_location(&parties.origin.chain, &parties.destination)?;

		let coder = self.coder_factory(&parties.origin.chain).await?;
		calls::transfer_call(
			&coder.calls,
			transfer.transfer_type,
			VersionedMultiAsset::V3(asset.clone()),
			VersionedMultiAssets::V3(MultiAssets(vec![asset])),
			&location,
			WeightLimit::Limited(request.max_weight),
		)
	}

	/// Fee of dispatching the transfer call on the origin chain, estimated
	/// with the deterministic signer.
	pub async fn estimate_origin_fee(
		&self,
		request: &XcmTransferRequest,
		config: &XcmTransfers,
	) -> Result<FeeWithWeight, Error> {
		let (call, _) = self.transfer_call(request, config).await?;
		let factory = self.operation_factory(&request.unweighted.parties.origin.chain)?;

		let populate: Arc<dyn CallPopulator> = Arc::new(move |builder: ExtrinsicBuilder, _| {
			Ok(builder.with_call(call.clone()))
		});
		let estimate = factory
			.estimate_fee(populate, 1)
			.await
			.into_iter()
			.next()
			.unwrap_or(Err(Error::UnexpectedDependentResult))?;
		Ok(estimate.into())
	}

	/// Fee of one hop according to its configured mode.
	async fn hop_fee(
		&self,
		chain: &ChainModel,
		hop_message: &Xcm,
		fee_info: &XcmFeeInfo,
		base_weight: u64,
	) -> Result<FeeWithWeight, Error> {
		let max_weight = Weight::from_parts(base_weight, 0)
			.saturating_mul(hop_message.instructions_count() as u64);

		match &fee_info.mode {
			FeeMode::Proportional(_) => {
				let coefficient = fee_info.mode.coefficient().unwrap_or(0);
				let fee = coefficient * max_weight.ref_time as u128 / WEIGHT_PER_SECOND;
				Ok(FeeWithWeight { fee, weight: max_weight })
			},
			FeeMode::Standard => {
				let coder = self.coder_factory(chain).await?;
				let (call, _) = calls::execute_call(
					&coder.calls,
					&VersionedXcm::V3(hop_message.clone()),
					max_weight,
				)?;
				let factory = self.operation_factory(chain)?;
				let populate: Arc<dyn CallPopulator> =
					Arc::new(move |builder: ExtrinsicBuilder, _| {
						Ok(builder.with_call(call.clone()))
					});
				let estimate = factory
					.estimate_fee(populate, 1)
					.await
					.into_iter()
					.next()
					.unwrap_or(Err(Error::UnexpectedDependentResult))?;
				Ok(estimate.into())
			},
		}
	}

	/// Destination-hop fee of a transfer.
	pub async fn estimate_destination_fee(
		&self,
		request: &XcmUnweightedTransferRequest,
		config: &XcmTransfers,
	) -> Result<FeeWithWeight, Error> {
		let parties = &request.parties;
		let messages = message::weight_messages(parties, request.amount, config)?;
		let asset_id = &parties.origin.asset_id;
		let destination_chain_id = &parties.destination.chain.chain_id;

		let fee_info = config
			.destination_fee(asset_id, destination_chain_id)
			.ok_or_else(|| Error::NoDestinationFee {
				asset: asset_id.clone(),
				chain: destination_chain_id.clone(),
			})?;
		let base_weight = config
			.base_weight(destination_chain_id)
			.ok_or_else(|| Error::NoBaseWeight(destination_chain_id.clone()))?;

		self.hop_fee(&parties.destination.chain, &messages.destination, fee_info, base_weight)
			.await
	}

	/// Reserve-hop fee of a transfer. Fails with [`Error::NoReserveFee`]
	/// when the route has no reserve hop.
	pub async fn estimate_reserve_fee(
		&self,
		request: &XcmUnweightedTransferRequest,
		config: &XcmTransfers,
	) -> Result<FeeWithWeight, Error> {
		let parties = &request.parties;
		let messages = message::weight_messages(parties, request.amount, config)?;
		let asset_id = &parties.origin.asset_id;

		let reserve_message =
			messages.reserve.ok_or_else(|| Error::NoReserveFee(asset_id.clone()))?;
		let fee_info = config
			.reserve_fee(asset_id)
			.ok_or_else(|| Error::NoReserveFee(asset_id.clone()))?;
		let reserve_chain_id = &parties.reserve.chain.chain_id;
		let base_weight = config
			.base_weight(reserve_chain_id)
			.ok_or_else(|| Error::NoBaseWeight(reserve_chain_id.clone()))?;

		self.hop_fee(&parties.reserve.chain, &reserve_message, fee_info, base_weight).await
	}

	/// Total cross-chain fee: destination hop plus reserve hop when the
	/// asset's reserve is a third chain. The combined weight is the maximum
	/// of the hops.
	pub async fn estimate_cross_chain_fee(
		&self,
		request: &XcmUnweightedTransferRequest,
		config: &XcmTransfers,
	) -> Result<FeeWithWeight, Error> {
		let destination = self.estimate_destination_fee(request, config);

		if request.parties.needs_reserve_hop()
			&& config.reserve_fee(&request.parties.origin.asset_id).is_some()
		{
			let reserve = self.estimate_reserve_fee(request, config);
			let (destination, reserve) = tokio::try_join!(destination, reserve)?;
			Ok(FeeWithWeight::combining(destination, Some(reserve)))
		} else {
			destination.await
		}
	}

	/// Sign and submit the transfer on the origin chain.
	pub async fn submit(
		&self,
		request: &XcmTransferRequest,
		config: &XcmTransfers,
		signer: TxSigner,
	) -> Result<XcmSubmitResult, Error> {
		let (call, call_path) = self.transfer_call(request, config).await?;
		let factory = self.operation_factory(&request.unweighted.parties.origin.chain)?;

		let populate: Arc<dyn CallPopulator> = Arc::new(move |builder: ExtrinsicBuilder, _| {
			Ok(builder.with_call(call.clone()))
		});
		let tx_hash = factory
			.submit(populate, signer, 1)
			.await
			.into_iter()
			.next()
			.unwrap_or(Err(Error::UnexpectedDependentResult))?;

		log::debug!(
			"submitted xcm transfer via {}::{}: {tx_hash:?}",
			call_path.module,
			call_path.call
		);
		Ok(XcmSubmitResult { tx_hash, call_path })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resolution::{
		ChainAsset, XcmTransferDestination, XcmTransferReserve,
	};
	use quill_common::{
		chain::InMemoryChainRegistry,
		rpc::{DispatchClass, RuntimeDispatchInfo},
		testing::{MockChainRpc, MockRuntimeService},
	};

	const CONFIG: &str = r#"{
		"assets": [
			{
				"asset_id": "polkadot-DOT",
				"reserve": { "chain_id": "polkadot", "path": { "type": "absolute" } },
				"reserve_fee": {
					"mode": { "type": "proportional", "value": "25000000000" },
					"instructions": "reserve"
				},
				"transfers": [
					{
						"destination_chain_id": "astar",
						"transfer_type": "xcmpallet",
						"fee": {
							"mode": { "type": "proportional", "value": "50000000000" },
							"instructions": "dest"
						}
					},
					{
						"destination_chain_id": "moonbeam",
						"transfer_type": "xtokens",
						"fee": { "mode": { "type": "standard" }, "instructions": "dest" }
					}
				]
			}
		],
		"chains": [
			{ "chain_id": "astar", "base_weight": 25 },
			{ "chain_id": "moonbeam", "base_weight": 25 },
			{ "chain_id": "polkadot", "base_weight": 30 }
		],
		"instructions": {
			"dest": ["ReserveAssetDeposited", "ClearOrigin", "BuyExecution", "DepositAsset"],
			"reserve": ["WithdrawAsset", "ClearOrigin", "BuyExecution", "DepositReserveAsset"]
		}
	}"#;

	struct Harness {
		service: XcmTransferService,
		origin_rpc: Arc<MockChainRpc>,
		destination_rpc: Arc<MockChainRpc>,
		reserve_rpc: Arc<MockChainRpc>,
	}

	fn harness(origin_id: &str, destination_id: &str) -> Harness {
		let mut registry = InMemoryChainRegistry::new();
		let mut register = |chain_id: &str, is_relay: bool| {
			let rpc = Arc::new(MockChainRpc::new());
			registry.register(
				ChainModel::new(chain_id, chain_id, is_relay),
				rpc.clone(),
				Arc::new(MockRuntimeService::default()),
			);
			rpc
		};
		let polkadot = register("polkadot", true);
		let astar = register("astar", false);
		let moonbeam = register("moonbeam", false);

		let pick = |id: &str| match id {
			"polkadot" => polkadot.clone(),
			"astar" => astar.clone(),
			_ => moonbeam.clone(),
		};
		let origin_rpc = pick(origin_id);
		let destination_rpc = pick(destination_id);
		let reserve_rpc = polkadot.clone();

		let signer = TxSigner::deterministic().expect("dev signer");
		let service = XcmTransferService::new(Arc::new(registry), signer.account_id());
		Harness { service, origin_rpc, destination_rpc, reserve_rpc }
	}

	fn request(origin_id: &str, destination_id: &str, reserve_id: &str) -> XcmUnweightedTransferRequest {
		let parachain_id = |id: &str| match id {
			"astar" => Some(2006u32),
			"moonbeam" => Some(2004),
			_ => None,
		};
		XcmUnweightedTransferRequest {
			parties: XcmTransferParties {
				origin: ChainAsset {
					chain: ChainModel::new(origin_id, origin_id, origin_id == "polkadot"),
					asset_id: "polkadot-DOT".to_string(),
				},
				destination: XcmTransferDestination {
					chain: ChainModel::new(destination_id, destination_id, destination_id == "polkadot"),
					parachain_id: parachain_id(destination_id),
					account_id: AccountId::from([9u8; 32]),
				},
				reserve: XcmTransferReserve {
					chain: ChainModel::new(reserve_id, reserve_id, reserve_id == "polkadot"),
					parachain_id: parachain_id(reserve_id),
				},
			},
			amount: 1_000_000,
		}
	}

	fn config() -> XcmTransfers {
		XcmTransfers::from_json(CONFIG).expect("valid config")
	}

	#[test]
	fn combination_rule_sums_fees_and_maxes_weights() {
		let destination = FeeWithWeight { fee: 5, weight: Weight::from_parts(100, 0) };
		let reserve = FeeWithWeight { fee: 3, weight: Weight::from_parts(140, 0) };

		let combined = FeeWithWeight::combining(destination, Some(reserve));
		assert_eq!(combined, FeeWithWeight { fee: 8, weight: Weight::from_parts(140, 0) });

		assert_eq!(FeeWithWeight::combining(destination, None), destination);
	}

	#[tokio::test]
	async fn proportional_destination_fee_needs_no_rpc() {
		let harness = harness("polkadot", "astar");
		// 4 instructions x base 25 = weight 100; coeff 50e9 * 100 / 1e12 = 5.
		let fee = harness
			.service
			.estimate_destination_fee(&request("polkadot", "astar", "polkadot"), &config())
			.await
			.expect("estimated");

		assert_eq!(fee, FeeWithWeight { fee: 5, weight: Weight::from_parts(100, 0) });
		assert_eq!(harness.destination_rpc.payment_info_calls(), 0);
	}

	#[tokio::test]
	async fn standard_destination_fee_executes_on_chain_estimate() {
		let harness = harness("polkadot", "moonbeam");
		assert_eq!(harness.destination_rpc.payment_info_calls(), 0);
		let fee = harness
			.service
			.estimate_destination_fee(&request("polkadot", "moonbeam", "polkadot"), &config())
			.await
			.expect("estimated");

		assert_eq!(harness.destination_rpc.payment_info_calls(), 1);
		assert_eq!(fee.fee, 1_000_000);
	}

	#[tokio::test]
	async fn cross_chain_fee_without_reserve_hop_is_destination_fee() {
		let harness = harness("polkadot", "astar");
		// Reserve is the origin chain: destination hop only.
		let unweighted = request("polkadot", "astar", "polkadot");
		let cross = harness
			.service
			.estimate_cross_chain_fee(&unweighted, &config())
			.await
			.expect("estimated");
		let destination = harness
			.service
			.estimate_destination_fee(&unweighted, &config())
			.await
			.expect("estimated");

		assert_eq!(cross, destination);
		assert_eq!(harness.reserve_rpc.payment_info_calls(), 0);
	}

	#[tokio::test]
	async fn cross_chain_fee_aggregates_reserve_hop() {
		let harness = harness("astar", "moonbeam");
		// astar -> moonbeam with the relay as reserve: both hops priced.
		// Destination (moonbeam) is standard mode: mock quotes 1e6 fee.
		// Reserve (polkadot): 4 x 30 = weight 120; 25e9 * 120 / 1e12 = 3.
		let cross = harness
			.service
			.estimate_cross_chain_fee(&request("astar", "moonbeam", "polkadot"), &config())
			.await
			.expect("estimated");

		assert_eq!(cross.fee, 1_000_000 + 3);
		assert_eq!(cross.weight, Weight::from_parts(1_000_000, 0).max(Weight::from_parts(120, 0)));
		assert_eq!(harness.destination_rpc.payment_info_calls(), 1);
		assert_eq!(harness.reserve_rpc.payment_info_calls(), 0);
	}

	#[tokio::test]
	async fn origin_fee_is_estimated_on_origin_chain() {
		let harness = harness("polkadot", "astar");
		let weighted = XcmTransferRequest::new(
			request("polkadot", "astar", "polkadot"),
			Weight::from_parts(4_000_000_000, 0),
		);
		let fee = harness
			.service
			.estimate_origin_fee(&weighted, &config())
			.await
			.expect("estimated");

		assert_eq!(fee.fee, 1_000_000);
		assert_eq!(harness.origin_rpc.payment_info_calls(), 1);
	}

	#[tokio::test]
	async fn missing_route_and_fee_configs_surface_named_errors() {
		let harness = harness("polkadot", "astar");
		let unweighted = request("polkadot", "astar", "polkadot");

		let empty = XcmTransfers::default();
		let result = harness.service.estimate_destination_fee(&unweighted, &empty).await;
		assert!(matches!(result, Err(Error::NoTransferRoute { .. })));

		// A config without base weights fails with NoBaseWeight.
		let mut no_weights = config();
		no_weights.chains.clear();
		let result = harness.service.estimate_destination_fee(&unweighted, &no_weights).await;
		assert_eq!(result, Err(Error::NoBaseWeight("astar".to_string())));

		// A route whose reserve leg is unconfigured fails with NoReserveFee.
		let mut no_reserve_fee = config();
		no_reserve_fee.assets[0].reserve_fee = None;
		let result = harness.service.estimate_reserve_fee(&unweighted, &no_reserve_fee).await;
		assert_eq!(result, Err(Error::NoReserveFee("polkadot-DOT".to_string())));
	}

	#[tokio::test]
	async fn submit_returns_hash_and_call_path() {
		let harness = harness("polkadot", "astar");
		let weighted = XcmTransferRequest::new(
			request("polkadot", "astar", "polkadot"),
			Weight::from_parts(4_000_000_000, 0),
		);
		let signer = TxSigner::deterministic().expect("dev signer");

		let result = harness
			.service
			.submit(&weighted, &config(), signer)
			.await
			.expect("submitted");

		assert_eq!(result.call_path.call, "limited_reserve_transfer_assets");
		assert_eq!(harness.origin_rpc.submit_calls(), 1);
	}
}
