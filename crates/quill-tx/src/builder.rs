// SPDX-License-Identifier: GPL-3.0

//! Signed extrinsic assembly.
//!
//! The builder collects everything the signed-extension set of a chain
//! commits to and produces the final v4 extrinsic:
//!
//! - the signing payload is `call ++ extra ++ additional`, hashed with
//!   blake2-256 when longer than 256 bytes;
//! - `extra` is what travels with the extrinsic: era, compact nonce,
//!   compact tip, then every custom extension's extra bytes in configured
//!   order;
//! - `additional` is only signed over: spec version, transaction version,
//!   genesis hash, era birth-block hash, then the custom extensions'
//!   additional bytes.

use quill_common::{AccountId, CryptoScheme, Error, Hash};
use scale::{Compact, Decode, Encode, Input};
use sp_core::blake2_256;
use sp_runtime::generic::Era;

/// Extrinsic format version produced by the builder.
pub const EXTRINSIC_VERSION: u8 = 4;

const SIGNED_BIT: u8 = 0b1000_0000;
/// Payloads longer than this are signed via their blake2-256 hash.
const PAYLOAD_HASH_THRESHOLD: usize = 256;

/// A custom signed extension the chain requires beyond the standard set.
///
/// Extensions contribute raw SCALE bytes: `extra` is carried inside the
/// extrinsic, `additional` only enters the signing payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainExtension {
	/// Extension identifier as named in the runtime.
	pub name: String,
	/// Bytes appended to the extrinsic's signed-extra area.
	pub extra: Vec<u8>,
	/// Bytes appended to the signing payload only.
	pub additional: Vec<u8>,
}

impl ChainExtension {
	/// The `CheckMetadataHash` extension in disabled mode: one mode byte in
	/// extra, an empty hash option in the payload.
	pub fn check_metadata_hash() -> Self {
		Self { name: "CheckMetadataHash".to_string(), extra: vec![0], additional: vec![0] }
	}

	/// The extension set applied when a chain does not configure its own.
	pub fn default_extensions() -> Vec<Self> {
		vec![Self::check_metadata_hash()]
	}
}

/// Builder for one signed extrinsic.
#[derive(Clone, Debug)]
pub struct ExtrinsicBuilder {
	spec_version: u32,
	transaction_version: u32,
	genesis_hash: Hash,
	era: Era,
	era_block_hash: Hash,
	nonce: u32,
	tip: u128,
	address: Option<(AccountId, CryptoScheme)>,
	extensions: Vec<ChainExtension>,
	call: Option<Vec<u8>>,
}

impl ExtrinsicBuilder {
	/// Start a builder for a chain snapshot. The era defaults to immortal,
	/// anchored at the genesis hash, until [`Self::with_era`] is called.
	pub fn new(spec_version: u32, transaction_version: u32, genesis_hash: Hash) -> Self {
		Self {
			spec_version,
			transaction_version,
			genesis_hash,
			era: Era::Immortal,
			era_block_hash: genesis_hash,
			nonce: 0,
			tip: 0,
			address: None,
			extensions: Vec::new(),
			call: None,
		}
	}

	/// Set the mortality era and the hash of its birth block.
	pub fn with_era(mut self, era: Era, block_hash: Hash) -> Self {
		self.era = era;
		self.era_block_hash = block_hash;
		self
	}

	/// Set the account nonce.
	pub fn with_nonce(mut self, nonce: u32) -> Self {
		self.nonce = nonce;
		self
	}

	/// Set the tip, in the chain's smallest unit.
	pub fn with_tip(mut self, tip: u128) -> Self {
		self.tip = tip;
		self
	}

	/// Set the sender.
	pub fn with_address(mut self, account: AccountId, scheme: CryptoScheme) -> Self {
		self.address = Some((account, scheme));
		self
	}

	/// Append a custom signed extension. Order is significant and must match
	/// the runtime's extension order.
	pub fn adding_extension(mut self, extension: ChainExtension) -> Self {
		self.extensions.push(extension);
		self
	}

	/// Attach the SCALE-encoded call.
	pub fn with_call(mut self, call: Vec<u8>) -> Self {
		self.call = Some(call);
		self
	}

	/// The nonce this builder will sign with.
	pub fn nonce(&self) -> u32 {
		self.nonce
	}

	fn extra_bytes(&self) -> Vec<u8> {
		let mut extra = self.era.encode();
		Compact(self.nonce).encode_to(&mut extra);
		Compact(self.tip).encode_to(&mut extra);
		for extension in &self.extensions {
			extra.extend_from_slice(&extension.extra);
		}
		extra
	}

	fn additional_bytes(&self) -> Vec<u8> {
		let mut additional = self.spec_version.encode();
		self.transaction_version.encode_to(&mut additional);
		additional.extend_from_slice(self.genesis_hash.as_bytes());
		additional.extend_from_slice(self.era_block_hash.as_bytes());
		for extension in &self.extensions {
			additional.extend_from_slice(&extension.additional);
		}
		additional
	}

	/// The bytes handed to the signer.
	pub fn signing_payload(&self) -> Result<Vec<u8>, Error> {
		let call = self.call.as_ref().ok_or(Error::MissingCall)?;
		let mut payload = call.clone();
		payload.extend(self.extra_bytes());
		payload.extend(self.additional_bytes());
		if payload.len() > PAYLOAD_HASH_THRESHOLD {
			payload = blake2_256(&payload).to_vec();
		}
		Ok(payload)
	}

	/// Assemble the final extrinsic from the signature over
	/// [`Self::signing_payload`].
	pub fn build(self, signature: &[u8]) -> Result<Vec<u8>, Error> {
		let call = self.call.as_ref().ok_or(Error::MissingCall)?;
		let (account, scheme) = self
			.address
			.as_ref()
			.ok_or_else(|| Error::Signing("no sender address set".to_string()))?;
		if signature.len() != scheme.signature_len() {
			return Err(Error::Signing(format!(
				"signature length {} does not match scheme ({} expected)",
				signature.len(),
				scheme.signature_len()
			)));
		}

		let mut inner = vec![SIGNED_BIT | EXTRINSIC_VERSION];
		// MultiAddress::Id
		inner.push(0);
		inner.extend_from_slice(&account.0);
		// MultiSignature
		inner.push(scheme.signature_variant());
		inner.extend_from_slice(signature);
		inner.extend(self.extra_bytes());
		inner.extend_from_slice(call);

		let mut extrinsic = Compact(inner.len() as u32).encode();
		extrinsic.extend(inner);
		Ok(extrinsic)
	}
}

/// The signed prelude of a decoded extrinsic.
///
/// Only the fields every chain shares are decoded; custom extension bytes
/// and the call are left untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedExtrinsic {
	/// Sender account.
	pub address: AccountId,
	/// Signature scheme used.
	pub scheme: CryptoScheme,
	/// Raw signature bytes.
	pub signature: Vec<u8>,
	/// Mortality era.
	pub era: Era,
	/// Account nonce.
	pub nonce: u32,
	/// Tip, in the chain's smallest unit.
	pub tip: u128,
}

/// Decode the signed prelude of an extrinsic produced by
/// [`ExtrinsicBuilder::build`].
pub fn decode_signed_prelude(bytes: &[u8]) -> Result<DecodedExtrinsic, Error> {
	let input = &mut &bytes[..];

	let declared_len = Compact::<u32>::decode(input)
		.map_err(|e| Error::Decoding(format!("extrinsic length: {e}")))?
		.0 as usize;
	if input.len() < declared_len {
		return Err(Error::Decoding("extrinsic shorter than declared length".to_string()));
	}

	let version = u8::decode(input).map_err(|e| Error::Decoding(format!("version byte: {e}")))?;
	if version != (SIGNED_BIT | EXTRINSIC_VERSION) {
		return Err(Error::Decoding(format!("unsupported extrinsic version byte {version:#04x}")));
	}

	let address_variant =
		u8::decode(input).map_err(|e| Error::Decoding(format!("address variant: {e}")))?;
	if address_variant != 0 {
		return Err(Error::Decoding(format!("unsupported address variant {address_variant}")));
	}
	let account = <[u8; 32]>::decode(input)
		.map_err(|e| Error::Decoding(format!("account id: {e}")))?;

	let signature_variant =
		u8::decode(input).map_err(|e| Error::Decoding(format!("signature variant: {e}")))?;
	let scheme = CryptoScheme::from_signature_variant(signature_variant)
		.ok_or_else(|| Error::Decoding(format!("unknown signature variant {signature_variant}")))?;
	let mut signature = vec![0u8; scheme.signature_len()];
	input
		.read(&mut signature)
		.map_err(|e| Error::Decoding(format!("signature bytes: {e}")))?;

	let era = Era::decode(input).map_err(|e| Error::Decoding(format!("era: {e}")))?;
	let nonce = Compact::<u32>::decode(input)
		.map_err(|e| Error::Decoding(format!("nonce: {e}")))?
		.0;
	let tip = Compact::<u128>::decode(input)
		.map_err(|e| Error::Decoding(format!("tip: {e}")))?
		.0;

	Ok(DecodedExtrinsic { address: AccountId::from(account), scheme, signature, era, nonce, tip })
}

#[cfg(test)]
mod tests {
	use super::*;
	use quill_common::TxSigner;

	fn signed_extrinsic(nonce: u32, tip: u128) -> (Vec<u8>, AccountId) {
		let signer = TxSigner::deterministic().expect("dev signer");
		let mut builder = ExtrinsicBuilder::new(1000, 4, Hash::repeat_byte(0xaa))
			.with_era(Era::mortal(64, 1000), Hash::repeat_byte(0xbb))
			.with_nonce(nonce)
			.with_address(signer.account_id(), signer.crypto_scheme())
			.with_call(vec![5, 0, 1, 2, 3]);
		if tip > 0 {
			builder = builder.with_tip(tip);
		}
		for extension in ChainExtension::default_extensions() {
			builder = builder.adding_extension(extension);
		}
		let payload = builder.signing_payload().expect("payload");
		let signature = signer.sign(&payload).expect("signature");
		(builder.build(&signature).expect("extrinsic"), signer.account_id())
	}

	#[test]
	fn built_extrinsic_roundtrips_through_decoder() {
		let (extrinsic, account) = signed_extrinsic(42, 0);
		let decoded = decode_signed_prelude(&extrinsic).expect("decodable");

		assert_eq!(decoded.address, account);
		assert_eq!(decoded.scheme, CryptoScheme::Sr25519);
		assert_eq!(decoded.nonce, 42);
		assert_eq!(decoded.tip, 0);
		assert_eq!(decoded.era, Era::mortal(64, 1000));
	}

	#[test]
	fn tip_is_visible_in_decoded_prelude() {
		let (extrinsic, _) = signed_extrinsic(0, 12345);
		let decoded = decode_signed_prelude(&extrinsic).expect("decodable");
		assert_eq!(decoded.tip, 12345);
	}

	#[test]
	fn missing_call_is_rejected() {
		let builder = ExtrinsicBuilder::new(1000, 4, Hash::zero());
		assert_eq!(builder.signing_payload(), Err(Error::MissingCall));
	}

	#[test]
	fn missing_address_is_rejected_at_build() {
		let builder = ExtrinsicBuilder::new(1000, 4, Hash::zero()).with_call(vec![0, 0]);
		assert!(matches!(builder.build(&[0u8; 64]), Err(Error::Signing(_))));
	}

	#[test]
	fn wrong_signature_length_is_rejected() {
		let signer = TxSigner::deterministic().expect("dev signer");
		let builder = ExtrinsicBuilder::new(1000, 4, Hash::zero())
			.with_address(signer.account_id(), signer.crypto_scheme())
			.with_call(vec![0, 0]);
		assert!(matches!(builder.build(&[0u8; 63]), Err(Error::Signing(_))));
	}

	#[test]
	fn long_payload_is_hashed_before_signing() {
		let builder = ExtrinsicBuilder::new(1000, 4, Hash::zero()).with_call(vec![0u8; 512]);
		let payload = builder.signing_payload().expect("payload");
		assert_eq!(payload.len(), 32);
	}

	#[test]
	fn short_payload_is_signed_verbatim() {
		let builder = ExtrinsicBuilder::new(1000, 4, Hash::zero()).with_call(vec![0, 0]);
		let payload = builder.signing_payload().expect("payload");
		// call (2) + era (1) + nonce (1) + tip (1) + spec (4) + tx (4) + two hashes (64)
		assert_eq!(payload.len(), 77);
	}

	#[test]
	fn extensions_contribute_to_extra_and_payload() {
		let base = ExtrinsicBuilder::new(1000, 4, Hash::zero()).with_call(vec![0, 0]);
		let extended = base
			.clone()
			.adding_extension(ChainExtension::check_metadata_hash());

		let base_payload = base.signing_payload().expect("payload");
		let extended_payload = extended.signing_payload().expect("payload");
		// One extra byte and one additional byte.
		assert_eq!(extended_payload.len(), base_payload.len() + 2);
	}

	#[test]
	fn truncated_extrinsic_is_rejected() {
		let (mut extrinsic, _) = signed_extrinsic(1, 0);
		extrinsic.truncate(extrinsic.len() - 10);
		assert!(matches!(decode_signed_prelude(&extrinsic), Err(Error::Decoding(_))));
	}

	#[test]
	fn garbage_is_rejected() {
		assert!(matches!(decode_signed_prelude(&[0xff, 0x00, 0x01]), Err(Error::Decoding(_))));
	}
}
