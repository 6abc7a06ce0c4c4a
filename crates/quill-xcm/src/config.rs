// SPDX-License-Identifier: GPL-3.0

//! Static XCM transfer configuration.
//!
//! A JSON document, fetched out of band and parsed here, describes every
//! supported route: the reserve chain and reserve location of each asset,
//! the transfer type and fee mode per destination, per-chain base weights
//! and the named instruction lists the weight messages are built from.
//!
//! ```json
//! {
//!   "assets": [
//!     {
//!       "asset_id": "polkadot-DOT",
//!       "reserve": {
//!         "chain_id": "polkadot",
//!         "path": { "type": "absolute", "parachain_id": null }
//!       },
//!       "reserve_fee": { "mode": { "type": "proportional", "value": "1000000000" }, "instructions": "xtokens-reserve" },
//!       "transfers": [
//!         {
//!           "destination_chain_id": "astar",
//!           "transfer_type": "xcmpallet",
//!           "fee": { "mode": { "type": "standard" }, "instructions": "xtokens-dest" }
//!         }
//!       ]
//!     }
//!   ],
//!   "chains": [ { "chain_id": "astar", "base_weight": 200000000 } ],
//!   "instructions": {
//!     "xtokens-dest": ["ReserveAssetDeposited", "ClearOrigin", "BuyExecution", "DepositAsset"]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a transfer is dispatched on the origin chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
	/// `XTokens::transfer_multiasset`.
	XTokens,
	/// `XcmPallet`/`PolkadotXcm` limited reserve transfer.
	XcmPallet,
	/// `XcmPallet`/`PolkadotXcm` limited teleport.
	Teleport,
	/// Present in the document but unknown to this build.
	#[serde(other)]
	Unknown,
}

/// How a hop's fee is computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FeeMode {
	/// `fee = coefficient * weight / WEIGHT_PER_SECOND`, no network call.
	/// The coefficient is kept as a string in the document.
	Proportional(String),
	/// Execute a real fee-estimation extrinsic on the hop's chain.
	Standard,
}

impl FeeMode {
	/// The proportional coefficient; zero when malformed, none for
	/// standard mode.
	pub fn coefficient(&self) -> Option<u128> {
		match self {
			Self::Proportional(value) => Some(value.parse().unwrap_or(0)),
			Self::Standard => None,
		}
	}
}

/// Fee rule of one hop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmFeeInfo {
	/// Fee computation mode.
	pub mode: FeeMode,
	/// Name of the instruction list the hop's weight message is built from.
	pub instructions: String,
}

/// Where an asset's reserve location points, relative to the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
	/// Path is absolute from the relay chain.
	Absolute,
	/// Path is relative to the origin chain.
	Relative,
	/// Path carries its own `parents` value verbatim.
	Concrete,
}

/// Multilocation path of an asset's reserve, as junction components.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservePath {
	/// How the path is anchored.
	#[serde(rename = "type")]
	pub location: LocationType,
	/// `parents` override, only meaningful for concrete paths.
	#[serde(default)]
	pub parents: Option<u8>,
	/// Parachain junction, absent for relay-native assets.
	#[serde(default)]
	pub parachain_id: Option<u32>,
	/// Pallet-instance junction.
	#[serde(default)]
	pub pallet_instance: Option<u8>,
	/// General-key junction, hex encoded.
	#[serde(default)]
	pub general_key: Option<String>,
	/// General-index junction, decimal string.
	#[serde(default)]
	pub general_index: Option<String>,
}

impl Default for LocationType {
	fn default() -> Self {
		Self::Absolute
	}
}

/// Reserve of one asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmAssetReserve {
	/// Chain custodying the asset.
	pub chain_id: String,
	/// Location of the asset from the reserve's perspective.
	pub path: ReservePath,
}

/// One configured destination of an asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmAssetTransfer {
	/// Destination chain.
	pub destination_chain_id: String,
	/// Dispatch flavour on the origin chain.
	pub transfer_type: TransferType,
	/// Destination-hop fee rule.
	pub fee: XcmFeeInfo,
}

/// All configured routes of one origin asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmAssetConfig {
	/// Origin asset identifier, caller-chosen (`<chain>-<symbol>`).
	pub asset_id: String,
	/// The asset's reserve.
	pub reserve: XcmAssetReserve,
	/// Reserve-hop fee rule; absent when no route crosses a third chain.
	#[serde(default)]
	pub reserve_fee: Option<XcmFeeInfo>,
	/// Supported destinations.
	pub transfers: Vec<XcmAssetTransfer>,
}

/// Per-chain weight base.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmChainConfig {
	/// Chain identifier.
	pub chain_id: String,
	/// Weight of a single XCM instruction on this chain (ref-time).
	pub base_weight: u64,
}

/// The parsed transfers document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmTransfers {
	/// Route configuration per origin asset.
	#[serde(default)]
	pub assets: Vec<XcmAssetConfig>,
	/// Base weights per chain.
	#[serde(default)]
	pub chains: Vec<XcmChainConfig>,
	/// Named instruction lists referenced by fee rules.
	#[serde(default)]
	pub instructions: HashMap<String, Vec<String>>,
}

impl XcmTransfers {
	/// Parse the document from JSON.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	fn asset(&self, asset_id: &str) -> Option<&XcmAssetConfig> {
		self.assets.iter().find(|asset| asset.asset_id == asset_id)
	}

	/// The configured transfer from `asset_id` to `destination_chain_id`.
	pub fn transfer(
		&self,
		asset_id: &str,
		destination_chain_id: &str,
	) -> Option<&XcmAssetTransfer> {
		self.asset(asset_id)?
			.transfers
			.iter()
			.find(|transfer| transfer.destination_chain_id == destination_chain_id)
	}

	/// Reserve chain id of the asset.
	pub fn reserve_chain(&self, asset_id: &str) -> Option<&str> {
		self.asset(asset_id).map(|asset| asset.reserve.chain_id.as_str())
	}

	/// Reserve location path of the asset.
	pub fn reserve_path(&self, asset_id: &str) -> Option<&ReservePath> {
		self.asset(asset_id).map(|asset| &asset.reserve.path)
	}

	/// Destination-hop fee rule of a route.
	pub fn destination_fee(
		&self,
		asset_id: &str,
		destination_chain_id: &str,
	) -> Option<&XcmFeeInfo> {
		self.transfer(asset_id, destination_chain_id).map(|transfer| &transfer.fee)
	}

	/// Reserve-hop fee rule of the asset.
	pub fn reserve_fee(&self, asset_id: &str) -> Option<&XcmFeeInfo> {
		self.asset(asset_id)?.reserve_fee.as_ref()
	}

	/// Base per-instruction weight of a chain.
	pub fn base_weight(&self, chain_id: &str) -> Option<u64> {
		self.chains
			.iter()
			.find(|chain| chain.chain_id == chain_id)
			.map(|chain| chain.base_weight)
	}

	/// A named instruction list.
	pub fn instruction_list(&self, name: &str) -> Option<&[String]> {
		self.instructions.get(name).map(|list| list.as_slice())
	}
}
