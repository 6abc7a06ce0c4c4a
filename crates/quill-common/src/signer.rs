// SPDX-License-Identifier: GPL-3.0

//! Transaction signers.
//!
//! The signer is always an explicit parameter of the pipeline, never ambient
//! state. Fee estimation uses the [`TxSigner::Deterministic`] variant, which
//! signs with a well-known development key so that no user key material is
//! ever touched to price a transaction; submission uses
//! [`TxSigner::Keystore`] with the caller's keypair.

use crate::{AccountId, errors::Error};
use subxt_signer::{SecretUri, sr25519::Keypair};

/// Secret URI of the development key backing the deterministic signer.
const DETERMINISTIC_SURI: &str = "//Alice";

/// Signature scheme of an account, mapped to its `MultiSignature` variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CryptoScheme {
	Ed25519,
	Sr25519,
	Ecdsa,
}

impl CryptoScheme {
	/// The `MultiSignature` enum variant index used during extrinsic
	/// assembly.
	pub fn signature_variant(self) -> u8 {
		match self {
			Self::Ed25519 => 0,
			Self::Sr25519 => 1,
			Self::Ecdsa => 2,
		}
	}

	/// Scheme for a `MultiSignature` variant index, if known.
	pub fn from_signature_variant(variant: u8) -> Option<Self> {
		match variant {
			0 => Some(Self::Ed25519),
			1 => Some(Self::Sr25519),
			2 => Some(Self::Ecdsa),
			_ => None,
		}
	}

	/// Raw signature length in bytes for this scheme.
	pub fn signature_len(self) -> usize {
		match self {
			Self::Ed25519 | Self::Sr25519 => 64,
			Self::Ecdsa => 65,
		}
	}
}

/// Signing wrapper around an sr25519 keypair.
#[derive(Clone)]
pub enum TxSigner {
	/// Development-key signer used only for fee estimation. Produces
	/// correctly shaped signatures without access to user keys.
	Deterministic(Keypair),
	/// Keystore-backed signer used for real submissions.
	Keystore(Keypair),
}

impl TxSigner {
	/// The deterministic fee-estimation signer.
	pub fn deterministic() -> Result<Self, Error> {
		Ok(Self::Deterministic(keypair_from_suri(DETERMINISTIC_SURI)?))
	}

	/// A keystore-backed signer from an existing keypair.
	pub fn keystore(keypair: Keypair) -> Self {
		Self::Keystore(keypair)
	}

	/// A keystore-backed signer from a secret URI (mnemonic or dev path).
	pub fn from_suri(suri: &str) -> Result<Self, Error> {
		Ok(Self::Keystore(keypair_from_suri(suri)?))
	}

	/// Account id of the signing key.
	pub fn account_id(&self) -> AccountId {
		self.keypair().public_key().to_account_id()
	}

	/// Signature scheme of the signing key.
	pub fn crypto_scheme(&self) -> CryptoScheme {
		CryptoScheme::Sr25519
	}

	/// Sign `payload`, returning the raw signature bytes.
	pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, Error> {
		Ok(self.keypair().sign(payload).0.to_vec())
	}

	fn keypair(&self) -> &Keypair {
		match self {
			Self::Deterministic(keypair) | Self::Keystore(keypair) => keypair,
		}
	}
}

fn keypair_from_suri(suri: &str) -> Result<Keypair, Error> {
	let uri = <SecretUri as std::str::FromStr>::from_str(suri)
		.map_err(|e| Error::Signing(format!("invalid secret uri: {e}")))?;
	Keypair::from_uri(&uri).map_err(|e| Error::Signing(format!("keypair derivation: {e}")))
}
