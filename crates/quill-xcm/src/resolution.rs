// SPDX-License-Identifier: GPL-3.0

//! XCM transfer-party resolution.
//!
//! Turns "send this asset from here to that account over there" into the
//! fully resolved three-party description the fee and call derivation need:
//! origin, destination and the asset's reserve chain, each with its
//! parachain id where applicable. When the reserve is the destination, the
//! parachain id is fetched once and shared.

use crate::config::XcmTransfers;
use quill_common::{
	AccountId, Error,
	chain::{ChainModel, ChainRegistry},
	ops,
};
use scale::Decode;
use sp_core::twox_128;
use std::sync::Arc;

/// An asset on its origin chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainAsset {
	/// Origin chain.
	pub chain: ChainModel,
	/// Asset identifier as configured in the transfers document.
	pub asset_id: String,
}

/// Destination of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XcmTransferDestination {
	/// Destination chain.
	pub chain: ChainModel,
	/// Parachain id of the destination, none for relay chains.
	pub parachain_id: Option<u32>,
	/// Recipient account on the destination chain.
	pub account_id: AccountId,
}

impl XcmTransferDestination {
	/// The same destination with a different recipient.
	pub fn replacing_account(&self, account_id: AccountId) -> Self {
		Self { chain: self.chain.clone(), parachain_id: self.parachain_id, account_id }
	}
}

/// Reserve of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XcmTransferReserve {
	/// Reserve chain.
	pub chain: ChainModel,
	/// Parachain id of the reserve, none for relay chains.
	pub parachain_id: Option<u32>,
}

/// A fully resolved transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XcmTransferParties {
	/// The transferred asset on its origin chain.
	pub origin: ChainAsset,
	/// Destination chain and recipient.
	pub destination: XcmTransferDestination,
	/// The asset's reserve.
	pub reserve: XcmTransferReserve,
}

impl XcmTransferParties {
	/// Whether moving the asset needs a separate reserve hop, i.e. the
	/// reserve is neither the origin nor the destination.
	pub fn needs_reserve_hop(&self) -> bool {
		self.reserve.chain.chain_id != self.origin.chain.chain_id
			&& self.reserve.chain.chain_id != self.destination.chain.chain_id
	}
}

/// `ParachainInfo.ParachainId` storage key.
fn parachain_id_storage_key() -> Vec<u8> {
	let mut key = twox_128(b"ParachainInfo").to_vec();
	key.extend_from_slice(&twox_128(b"ParachainId"));
	key
}

/// Resolves transfer parties against the chain registry and the static
/// transfer configuration.
pub struct XcmTransferResolutionFactory {
	registry: Arc<dyn ChainRegistry>,
}

impl XcmTransferResolutionFactory {
	/// Create a resolution factory over `registry`.
	pub fn new(registry: Arc<dyn ChainRegistry>) -> Self {
		Self { registry }
	}

	/// Resolve the parties of a transfer.
	///
	/// # Arguments
	/// * `origin_chain_id`, `asset_id` - The transferred asset.
	/// * `destination_chain_id` - Target chain.
	/// * `recipient` - Recipient account on the target chain.
	/// * `config` - The static transfers document.
	pub async fn resolve(
		&self,
		origin_chain_id: &str,
		asset_id: &str,
		destination_chain_id: &str,
		recipient: AccountId,
		config: &XcmTransfers,
	) -> Result<XcmTransferParties, Error> {
		let origin_chain = self.chain(origin_chain_id)?;
		let destination_chain = self.chain(destination_chain_id)?;
		let reserve_chain_id = config
			.reserve_chain(asset_id)
			.ok_or_else(|| Error::NoReserve(asset_id.to_string()))?;
		let reserve_chain = self.chain(reserve_chain_id)?;

		// Both lookups are independent graph nodes; when reserve and
		// destination are the same chain the node is shared, not re-run.
		let destination_op = {
			let registry = self.registry.clone();
			let chain = destination_chain.clone();
			ops::spawn(async move { fetch_parachain_id(registry, chain).await })
		};
		let reserve_op = if reserve_chain.chain_id == destination_chain.chain_id {
			destination_op.clone()
		} else {
			let registry = self.registry.clone();
			let chain = reserve_chain.clone();
			ops::spawn(async move { fetch_parachain_id(registry, chain).await })
		};

		let destination_parachain_id = destination_op.result().await?;
		let reserve_parachain_id = reserve_op.result().await?;

		Ok(XcmTransferParties {
			origin: ChainAsset { chain: origin_chain, asset_id: asset_id.to_string() },
			destination: XcmTransferDestination {
				chain: destination_chain,
				parachain_id: destination_parachain_id,
				account_id: recipient,
			},
			reserve: XcmTransferReserve {
				chain: reserve_chain,
				parachain_id: reserve_parachain_id,
			},
		})
	}

	fn chain(&self, chain_id: &str) -> Result<ChainModel, Error> {
		self.registry
			.get_chain(chain_id)
			.ok_or_else(|| Error::UnknownChain(chain_id.to_string()))
	}
}

async fn fetch_parachain_id(
	registry: Arc<dyn ChainRegistry>,
	chain: ChainModel,
) -> Result<Option<u32>, Error> {
	if chain.is_relaychain {
		return Ok(None);
	}
	let rpc = registry
		.get_connection(&chain.chain_id)
		.ok_or_else(|| Error::ConnectionUnavailable(chain.chain_id.clone()))?;
	let raw = rpc
		.storage(&parachain_id_storage_key())
		.await?
		.ok_or_else(|| Error::Decoding(format!("chain {} has no parachain id", chain.chain_id)))?;
	let parachain_id = u32::decode(&mut raw.as_slice())
		.map_err(|e| Error::Decoding(format!("parachain id: {e}")))?;
	Ok(Some(parachain_id))
}
