// SPDX-License-Identifier: GPL-3.0

//! Fee estimates and tip correction.
//!
//! `payment_queryInfo` quotes the inclusion fee of an extrinsic without its
//! tip. Since the estimated extrinsic already carries the chain's default
//! tip, the quote is corrected by decoding the extrinsic and re-adding the
//! tip it was built with. The correction is best-effort: anything that
//! cannot be parsed leaves the quote untouched rather than failing the
//! estimate.

use crate::builder::decode_signed_prelude;
use quill_common::{
	Error,
	rpc::{DispatchClass, RuntimeDispatchInfo, Weight, parse_fee},
};

/// A priced extrinsic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeEstimate {
	/// Total fee in the chain's smallest unit, tip included.
	pub fee: u128,
	/// Predicted execution weight.
	pub weight: Weight,
	/// Dispatch class of the call.
	pub dispatch_class: DispatchClass,
}

impl TryFrom<RuntimeDispatchInfo> for FeeEstimate {
	type Error = Error;

	fn try_from(info: RuntimeDispatchInfo) -> Result<Self, Error> {
		let fee = parse_fee(&info.partial_fee)
			.ok_or_else(|| Error::InvalidFee(info.partial_fee.clone()))?;
		Ok(Self { fee, weight: info.weight, dispatch_class: info.class })
	}
}

/// Re-add the extrinsic's tip to a raw fee quote.
///
/// Returns the quote unchanged when the extrinsic carries no tip, when the
/// quoted fee is not numeric, or when the extrinsic cannot be decoded.
pub fn apply_tip_correction(info: RuntimeDispatchInfo, extrinsic: &[u8]) -> RuntimeDispatchInfo {
	let Some(base_fee) = parse_fee(&info.partial_fee) else {
		return info;
	};
	let Ok(decoded) = decode_signed_prelude(extrinsic) else {
		return info;
	};
	if decoded.tip == 0 {
		return info;
	}

	RuntimeDispatchInfo {
		partial_fee: base_fee.saturating_add(decoded.tip).to_string(),
		..info
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::{ChainExtension, ExtrinsicBuilder};
	use quill_common::{Hash, TxSigner};

	fn dispatch_info(fee: &str) -> RuntimeDispatchInfo {
		RuntimeDispatchInfo {
			weight: Weight::from_parts(1_000_000, 128),
			class: DispatchClass::Normal,
			partial_fee: fee.to_string(),
		}
	}

	fn extrinsic_with_tip(tip: u128) -> Vec<u8> {
		let signer = TxSigner::deterministic().expect("dev signer");
		let mut builder = ExtrinsicBuilder::new(1000, 4, Hash::repeat_byte(1))
			.with_nonce(3)
			.with_tip(tip)
			.with_address(signer.account_id(), signer.crypto_scheme())
			.with_call(vec![5, 0]);
		for extension in ChainExtension::default_extensions() {
			builder = builder.adding_extension(extension);
		}
		let payload = builder.signing_payload().expect("payload");
		let signature = signer.sign(&payload).expect("signature");
		builder.build(&signature).expect("extrinsic")
	}

	#[test]
	fn correction_adds_exactly_the_tip() {
		let corrected = apply_tip_correction(dispatch_info("1000"), &extrinsic_with_tip(25));
		assert_eq!(corrected.partial_fee, "1025");
	}

	#[test]
	fn correction_without_tip_is_identity() {
		let info = dispatch_info("1000");
		let corrected = apply_tip_correction(info.clone(), &extrinsic_with_tip(0));
		assert_eq!(corrected, info);
	}

	#[test]
	fn malformed_fee_degrades_to_uncorrected() {
		let info = dispatch_info("many tokens");
		let corrected = apply_tip_correction(info.clone(), &extrinsic_with_tip(25));
		assert_eq!(corrected, info);
	}

	#[test]
	fn undecodable_extrinsic_degrades_to_uncorrected() {
		let info = dispatch_info("1000");
		let corrected = apply_tip_correction(info.clone(), &[0xde, 0xad, 0xbe, 0xef]);
		assert_eq!(corrected, info);
	}

	#[test]
	fn estimate_parses_fee_or_rejects() {
		let estimate = FeeEstimate::try_from(dispatch_info("1025")).expect("numeric fee");
		assert_eq!(estimate.fee, 1025);
		assert_eq!(estimate.dispatch_class, DispatchClass::Normal);

		assert!(matches!(
			FeeEstimate::try_from(dispatch_info("many tokens")),
			Err(Error::InvalidFee(_))
		));
	}
}
