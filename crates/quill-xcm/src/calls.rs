// SPDX-License-Identifier: GPL-3.0

//! Dispatch-call encoding for XCM transfers.
//!
//! Runtimes expose the XCM pallet under different names; the resolver
//! probes the call registry in preference order. Calls are encoded as
//! `(pallet_index, call_index, args...)` opaque bytes for the extrinsic
//! builder.

use crate::{
	config::TransferType,
	message::{
		MultiLocation, VersionedMultiAsset, VersionedMultiAssets, VersionedMultiLocation,
		VersionedXcm, WeightLimit,
	},
};
use quill_common::{Error, rpc::Weight, runtime::CallRegistry};
use scale::Encode;

/// XCM pallet names probed in order.
pub const XCM_MODULE_NAMES: [&str; 2] = ["XcmPallet", "PolkadotXcm"];
/// Pallet dispatching `XTokens`-style transfers.
pub const XTOKENS_MODULE: &str = "XTokens";

/// Pallet and call a transfer dispatches, for downstream matching of
/// events against the submitted extrinsic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallPath {
	/// Pallet name.
	pub module: String,
	/// Call name.
	pub call: String,
}

/// The XCM pallet present in the runtime.
pub fn resolve_xcm_module(calls: &CallRegistry) -> Result<&'static str, Error> {
	XCM_MODULE_NAMES
		.into_iter()
		.find(|name| calls.pallet_index(name).is_some())
		.ok_or(Error::NoXcmModule)
}

fn encoded_call(
	calls: &CallRegistry,
	module: &str,
	call: &str,
	args: Vec<u8>,
) -> Result<(Vec<u8>, CallPath), Error> {
	let (pallet_index, call_index) =
		calls.call_index(module, call).ok_or(Error::NoXcmModule)?;
	let mut bytes = vec![pallet_index, call_index];
	bytes.extend(args);
	Ok((bytes, CallPath { module: module.to_string(), call: call.to_string() }))
}

/// `execute(message, max_weight)` on the runtime's XCM pallet, used for
/// standard-mode fee estimation.
pub fn execute_call(
	calls: &CallRegistry,
	message: &VersionedXcm,
	max_weight: Weight,
) -> Result<(Vec<u8>, CallPath), Error> {
	let module = resolve_xcm_module(calls)?;
	let mut args = message.encode();
	max_weight.encode_to(&mut args);
	encoded_call(calls, module, "execute", args)
}

/// The origin-chain transfer call for a route.
///
/// `location` is the full destination including the beneficiary account;
/// pallet-XCM flavours split it, `XTokens` takes it whole.
pub fn transfer_call(
	calls: &CallRegistry,
	transfer_type: TransferType,
	asset: VersionedMultiAsset,
	assets: VersionedMultiAssets,
	location: &MultiLocation,
	weight_limit: WeightLimit,
) -> Result<(Vec<u8>, CallPath), Error> {
	match transfer_type {
		TransferType::XTokens => {
			let mut args = asset.encode();
			VersionedMultiLocation::V3(location.clone()).encode_to(&mut args);
			weight_limit.encode_to(&mut args);
			encoded_call(calls, XTOKENS_MODULE, "transfer_multiasset", args)
		},
		TransferType::XcmPallet | TransferType::Teleport => {
			let module = resolve_xcm_module(calls)?;
			let call = if transfer_type == TransferType::Teleport {
				"limited_teleport_assets"
			} else {
				"limited_reserve_transfer_assets"
			};
			let (destination, beneficiary) = location.split_beneficiary()?;
			let mut args = VersionedMultiLocation::V3(destination).encode();
			VersionedMultiLocation::V3(beneficiary).encode_to(&mut args);
			assets.encode_to(&mut args);
			// fee_asset_item: the transferred asset pays the fee.
			0u32.encode_to(&mut args);
			weight_limit.encode_to(&mut args);
			encoded_call(calls, module, call, args)
		},
		TransferType::Unknown =>
			Err(Error::UnsupportedTransferType("unknown".to_string())),
	}
}
