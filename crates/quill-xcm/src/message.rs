// SPDX-License-Identifier: GPL-3.0

//! XCM v3 wire types and weight-message construction.
//!
//! Only the subset of the v3 vocabulary the transfer flows produce is
//! modelled; codec indices match the protocol so the encodings are accepted
//! verbatim by runtimes. Weight messages mirror what the remote chain will
//! execute and exist to count instructions and to feed `execute`-based fee
//! estimation - they are never sent.

use crate::config::{LocationType, ReservePath, XcmTransfers};
use crate::resolution::{XcmTransferDestination, XcmTransferParties, XcmTransferReserve};
use quill_common::{Error, chain::ChainModel, rpc::Weight};
use scale::{Decode, Encode};

/// Consensus-system discriminator of an account junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum NetworkId {
	#[codec(index = 2)]
	Polkadot,
	#[codec(index = 3)]
	Kusama,
}

/// A single location step.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Junction {
	#[codec(index = 0)]
	Parachain(#[codec(compact)] u32),
	#[codec(index = 1)]
	AccountId32 { network: Option<NetworkId>, id: [u8; 32] },
	#[codec(index = 3)]
	AccountKey20 { network: Option<NetworkId>, key: [u8; 20] },
	#[codec(index = 4)]
	PalletInstance(u8),
	#[codec(index = 5)]
	GeneralIndex(#[codec(compact)] u128),
	#[codec(index = 6)]
	GeneralKey { length: u8, data: [u8; 32] },
}

/// Up to four location steps, as the v3 arity-encoded junction list.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Junctions {
	#[codec(index = 0)]
	Here,
	#[codec(index = 1)]
	X1(Junction),
	#[codec(index = 2)]
	X2(Junction, Junction),
	#[codec(index = 3)]
	X3(Junction, Junction, Junction),
	#[codec(index = 4)]
	X4(Junction, Junction, Junction, Junction),
}

impl Junctions {
	/// Build from a slice; at most four junctions are supported.
	pub fn from_slice(items: &[Junction]) -> Result<Self, Error> {
		let mut items = items.to_vec();
		Ok(match items.len() {
			0 => Self::Here,
			1 => Self::X1(items.remove(0)),
			2 => Self::X2(items.remove(0), items.remove(0)),
			3 => Self::X3(items.remove(0), items.remove(0), items.remove(0)),
			4 => Self::X4(items.remove(0), items.remove(0), items.remove(0), items.remove(0)),
			len => {
				return Err(Error::Decoding(format!("unsupported junction arity {len}")));
			},
		})
	}

	/// Number of steps.
	pub fn len(&self) -> usize {
		match self {
			Self::Here => 0,
			Self::X1(..) => 1,
			Self::X2(..) => 2,
			Self::X3(..) => 3,
			Self::X4(..) => 4,
		}
	}

	/// Whether there are no steps.
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Here)
	}

	fn to_vec(&self) -> Vec<Junction> {
		match self.clone() {
			Self::Here => vec![],
			Self::X1(a) => vec![a],
			Self::X2(a, b) => vec![a, b],
			Self::X3(a, b, c) => vec![a, b, c],
			Self::X4(a, b, c, d) => vec![a, b, c, d],
		}
	}
}

/// A point in the consensus universe.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct MultiLocation {
	/// Number of parent hops before interpreting the interior.
	pub parents: u8,
	/// Interior steps.
	pub interior: Junctions,
}

impl MultiLocation {
	/// Split the trailing account junction off, yielding the chain part and
	/// a beneficiary location relative to that chain.
	///
	/// Used by `XcmPallet` transfers, which take destination and
	/// beneficiary separately where `XTokens` takes one combined location.
	pub fn split_beneficiary(&self) -> Result<(MultiLocation, MultiLocation), Error> {
		let mut junctions = self.interior.to_vec();
		let beneficiary = junctions
			.pop()
			.ok_or_else(|| Error::Decoding("location carries no beneficiary".to_string()))?;
		Ok((
			MultiLocation { parents: self.parents, interior: Junctions::from_slice(&junctions)? },
			MultiLocation { parents: 0, interior: Junctions::X1(beneficiary) },
		))
	}
}

/// Concrete or abstract asset identity.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum AssetId {
	#[codec(index = 0)]
	Concrete(MultiLocation),
	#[codec(index = 1)]
	Abstract([u8; 32]),
}

/// Fungibility of an asset amount.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Fungibility {
	#[codec(index = 0)]
	Fungible(#[codec(compact)] u128),
}

/// A concrete amount of one asset.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct MultiAsset {
	/// Asset identity.
	pub id: AssetId,
	/// Amount.
	pub fun: Fungibility,
}

/// A set of assets.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct MultiAssets(pub Vec<MultiAsset>);

/// Wildcard over assets in holding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum WildMultiAsset {
	#[codec(index = 0)]
	All,
}

/// Definite or wildcard asset filter.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum MultiAssetFilter {
	#[codec(index = 0)]
	Definite(MultiAssets),
	#[codec(index = 1)]
	Wild(WildMultiAsset),
}

/// Execution weight cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum WeightLimit {
	#[codec(index = 0)]
	Unlimited,
	#[codec(index = 1)]
	Limited(Weight),
}

/// The v3 instructions the transfer flows produce.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Instruction {
	#[codec(index = 0)]
	WithdrawAsset(MultiAssets),
	#[codec(index = 1)]
	ReserveAssetDeposited(MultiAssets),
	#[codec(index = 2)]
	ReceiveTeleportedAsset(MultiAssets),
	#[codec(index = 10)]
	ClearOrigin,
	#[codec(index = 13)]
	DepositAsset { assets: MultiAssetFilter, beneficiary: MultiLocation },
	#[codec(index = 14)]
	DepositReserveAsset { assets: MultiAssetFilter, dest: MultiLocation, xcm: Xcm },
	#[codec(index = 19)]
	BuyExecution { fees: MultiAsset, weight_limit: WeightLimit },
}

/// An XCM program.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Xcm(pub Vec<Instruction>);

impl Xcm {
	/// Number of instructions, which scales the hop's weight.
	pub fn instructions_count(&self) -> usize {
		self.0.len()
	}
}

/// Version-wrapped program.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum VersionedXcm {
	#[codec(index = 3)]
	V3(Xcm),
}

/// Version-wrapped location.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum VersionedMultiLocation {
	#[codec(index = 3)]
	V3(MultiLocation),
}

/// Version-wrapped asset.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum VersionedMultiAsset {
	#[codec(index = 3)]
	V3(MultiAsset),
}

/// Version-wrapped asset set.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum VersionedMultiAssets {
	#[codec(index = 3)]
	V3(MultiAssets),
}

/// The weight messages of a transfer: what the destination executes, and
/// what the reserve executes when a third chain custodies the asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XcmWeightMessages {
	/// Destination-hop message.
	pub destination: Xcm,
	/// Reserve-hop message; absent when no reserve fee is configured.
	pub reserve: Option<Xcm>,
}

fn relative_junctions(path: &ReservePath) -> Result<Vec<Junction>, Error> {
	let mut junctions = Vec::new();
	if let Some(pallet_instance) = path.pallet_instance {
		junctions.push(Junction::PalletInstance(pallet_instance));
	}
	if let Some(general_key) = &path.general_key {
		let bytes = hex::decode(general_key.trim_start_matches("0x"))
			.map_err(|e| Error::Decoding(format!("general key: {e}")))?;
		if bytes.len() > 32 {
			return Err(Error::Decoding("general key longer than 32 bytes".to_string()));
		}
		let mut data = [0u8; 32];
		data[..bytes.len()].copy_from_slice(&bytes);
		junctions.push(Junction::GeneralKey { length: bytes.len() as u8, data });
	} else if let Some(general_index) = &path.general_index {
		let index = general_index
			.parse()
			.map_err(|e| Error::Decoding(format!("general index: {e}")))?;
		junctions.push(Junction::GeneralIndex(index));
	}
	Ok(junctions)
}

fn absolute_junctions(path: &ReservePath) -> Result<Vec<Junction>, Error> {
	let mut junctions = relative_junctions(path)?;
	if let Some(parachain_id) = path.parachain_id {
		junctions.insert(0, Junction::Parachain(parachain_id));
	}
	Ok(junctions)
}

/// Location of the transferred asset, anchored according to the configured
/// path type and the origin/reserve relation.
pub fn asset_location(
	path: &ReservePath,
	origin: &ChainModel,
	reserve: &ChainModel,
) -> Result<MultiLocation, Error> {
	let parents = match path.location {
		LocationType::Absolute => {
			if origin.is_relaychain {
				0
			} else {
				1
			}
		},
		LocationType::Relative => {
			if origin.chain_id != reserve.chain_id && !origin.is_relaychain {
				1
			} else {
				0
			}
		},
		LocationType::Concrete => path.parents.unwrap_or(0),
	};

	let junctions = match path.location {
		LocationType::Absolute | LocationType::Concrete => absolute_junctions(path)?,
		LocationType::Relative => {
			if origin.chain_id == reserve.chain_id {
				relative_junctions(path)?
			} else {
				absolute_junctions(path)?
			}
		},
	};

	Ok(MultiLocation { parents, interior: Junctions::from_slice(&junctions)? })
}

/// The transferred amount at its configured reserve location.
pub fn transfer_asset(
	path: &ReservePath,
	origin: &ChainModel,
	reserve: &ChainModel,
	amount: u128,
) -> Result<MultiAsset, Error> {
	Ok(MultiAsset {
		id: AssetId::Concrete(asset_location(path, origin, reserve)?),
		fun: Fungibility::Fungible(amount),
	})
}

/// Full destination location: chain part plus the recipient account.
pub fn destination_location(
	origin: &ChainModel,
	destination: &XcmTransferDestination,
) -> Result<MultiLocation, Error> {
	let account = Junction::AccountId32 { network: None, id: destination.account_id.0 };

	let parents =
		if !origin.is_relaychain && origin.chain_id != destination.chain.chain_id { 1 } else { 0 };

	let junctions = match destination.parachain_id {
		Some(parachain_id) => vec![Junction::Parachain(parachain_id), account],
		None => vec![account],
	};
	Ok(MultiLocation { parents, interior: Junctions::from_slice(&junctions)? })
}

/// Location of the reserve chain as seen from the origin.
pub fn reserve_location(
	origin: &ChainModel,
	reserve: &XcmTransferReserve,
) -> Result<MultiLocation, Error> {
	let parents =
		if !origin.is_relaychain && origin.chain_id != reserve.chain.chain_id { 1 } else { 0 };

	let junctions = match reserve.parachain_id {
		Some(parachain_id) => vec![Junction::Parachain(parachain_id)],
		None => vec![],
	};
	Ok(MultiLocation { parents, interior: Junctions::from_slice(&junctions)? })
}

/// Instantiate a named instruction list into a weight message.
fn weight_message(
	instructions: &[String],
	destination: MultiLocation,
	asset: MultiAsset,
) -> Result<Xcm, Error> {
	let mut message = Vec::with_capacity(instructions.len());
	for instruction in instructions {
		message.push(match instruction.as_str() {
			"WithdrawAsset" => Instruction::WithdrawAsset(MultiAssets(vec![asset.clone()])),
			"ReserveAssetDeposited" =>
				Instruction::ReserveAssetDeposited(MultiAssets(vec![asset.clone()])),
			"ReceiveTeleportedAsset" =>
				Instruction::ReceiveTeleportedAsset(MultiAssets(vec![asset.clone()])),
			"ClearOrigin" => Instruction::ClearOrigin,
			"BuyExecution" => Instruction::BuyExecution {
				fees: asset.clone(),
				weight_limit: WeightLimit::Unlimited,
			},
			"DepositAsset" => Instruction::DepositAsset {
				assets: MultiAssetFilter::Wild(WildMultiAsset::All),
				beneficiary: destination.clone(),
			},
			"DepositReserveAsset" => Instruction::DepositReserveAsset {
				assets: MultiAssetFilter::Wild(WildMultiAsset::All),
				dest: destination.clone(),
				xcm: Xcm::default(),
			},
			other => return Err(Error::UnsupportedInstruction(other.to_string())),
		});
	}
	Ok(Xcm(message))
}

/// Build the weight messages of a resolved transfer.
pub fn weight_messages(
	parties: &XcmTransferParties,
	amount: u128,
	config: &XcmTransfers,
) -> Result<XcmWeightMessages, Error> {
	let asset_id = &parties.origin.asset_id;
	let destination_chain_id = &parties.destination.chain.chain_id;

	let transfer = config
		.transfer(asset_id, destination_chain_id)
		.ok_or_else(|| Error::NoTransferRoute {
			asset: asset_id.clone(),
			chain: destination_chain_id.clone(),
		})?;
	let reserve_path =
		config.reserve_path(asset_id).ok_or_else(|| Error::NoReserve(asset_id.clone()))?;

	let asset =
		transfer_asset(reserve_path, &parties.origin.chain, &parties.reserve.chain, amount)?;

	let destination_instructions = config
		.instruction_list(&transfer.fee.instructions)
		.ok_or_else(|| Error::NoInstructions(transfer.fee.instructions.clone()))?;
	let destination = weight_message(
		destination_instructions,
		destination_location(&parties.origin.chain, &parties.destination)?,
		asset.clone(),
	)?;

	let reserve = match config.reserve_fee(asset_id) {
		Some(reserve_fee) => {
			let reserve_instructions = config
				.instruction_list(&reserve_fee.instructions)
				.ok_or_else(|| Error::NoInstructions(reserve_fee.instructions.clone()))?;
			Some(weight_message(
				reserve_instructions,
				reserve_location(&parties.origin.chain, &parties.reserve)?,
				asset,
			)?)
		},
		None => None,
	};

	Ok(XcmWeightMessages { destination, reserve })
}
