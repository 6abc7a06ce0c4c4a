// SPDX-License-Identifier: GPL-3.0

//! Runtime coding service.
//!
//! The coder factory is the per-chain snapshot the extrinsic pipeline signs
//! against: spec and transaction version plus the call registry derived
//! from the runtime metadata. It is fetched once per service instance and
//! can be invalidated after a runtime upgrade.

use crate::errors::Error;
use async_trait::async_trait;
use scale::Decode;
use std::collections::HashMap;
use subxt::{
	Metadata, SubstrateConfig,
	backend::{legacy::LegacyRpcMethods, rpc::RpcClient},
};

/// Pallet name -> index mapping with the call names of each pallet,
/// extracted from runtime metadata.
#[derive(Clone, Debug, Default)]
pub struct CallRegistry {
	pallets: HashMap<String, PalletCalls>,
}

#[derive(Clone, Debug)]
struct PalletCalls {
	index: u8,
	calls: HashMap<String, u8>,
}

impl CallRegistry {
	/// Build the registry from decoded runtime metadata.
	pub fn from_metadata(metadata: &Metadata) -> Self {
		let mut pallets = HashMap::new();
		for pallet in metadata.pallets() {
			let calls = pallet
				.call_variants()
				.map(|variants| {
					variants
						.iter()
						.map(|variant| (variant.name.clone(), variant.index))
						.collect()
				})
				.unwrap_or_default();
			pallets
				.insert(pallet.name().to_string(), PalletCalls { index: pallet.index(), calls });
		}
		Self { pallets }
	}

	/// Register a pallet directly. Intended for tests and offline use.
	pub fn insert_pallet(&mut self, name: &str, index: u8, calls: &[(&str, u8)]) {
		let calls = calls.iter().map(|(call, idx)| (call.to_string(), *idx)).collect();
		self.pallets.insert(name.to_string(), PalletCalls { index, calls });
	}

	/// Index of the pallet, if present in the runtime.
	pub fn pallet_index(&self, pallet: &str) -> Option<u8> {
		self.pallets.get(pallet).map(|p| p.index)
	}

	/// `(pallet_index, call_index)` of a dispatchable, if present.
	pub fn call_index(&self, pallet: &str, call: &str) -> Option<(u8, u8)> {
		let entry = self.pallets.get(pallet)?;
		Some((entry.index, *entry.calls.get(call)?))
	}
}

/// Snapshot of the chain's current coding context.
#[derive(Clone, Debug)]
pub struct CoderFactory {
	/// Runtime specification version, part of the signed payload.
	pub spec_version: u32,
	/// Transaction version, part of the signed payload.
	pub transaction_version: u32,
	/// Call registry derived from the current metadata.
	pub calls: CallRegistry,
}

/// Provider of the current [`CoderFactory`] for one chain.
#[async_trait]
pub trait RuntimeCodingService: Send + Sync {
	/// The current coding snapshot, fetching it if necessary.
	async fn coder_factory(&self) -> Result<CoderFactory, Error>;
}

/// [`RuntimeCodingService`] fetching `state_getRuntimeVersion` and
/// `state_getMetadata` over a subxt connection, caching the result.
pub struct SubxtRuntimeService {
	legacy: LegacyRpcMethods<SubstrateConfig>,
	cached: tokio::sync::Mutex<Option<CoderFactory>>,
}

impl SubxtRuntimeService {
	/// Create the service over an established RPC connection.
	pub fn new(client: RpcClient) -> Self {
		Self { legacy: LegacyRpcMethods::new(client), cached: tokio::sync::Mutex::new(None) }
	}

	/// Drop the cached snapshot, forcing a refetch on next use. Call after
	/// observing a runtime upgrade.
	pub async fn invalidate(&self) {
		*self.cached.lock().await = None;
	}

	async fn fetch(&self) -> Result<CoderFactory, Error> {
		let version = self
			.legacy
			.state_get_runtime_version(None)
			.await
			.map_err(|e| Error::RuntimeUnavailable(e.to_string()))?;

		let raw_metadata = self
			.legacy
			.state_get_metadata(None)
			.await
			.map_err(|e| Error::RuntimeUnavailable(e.to_string()))?
			.into_raw();
		let metadata = Metadata::decode(&mut raw_metadata.as_slice())
			.map_err(|e| Error::Decoding(format!("runtime metadata: {e}")))?;

		Ok(CoderFactory {
			spec_version: version.spec_version,
			transaction_version: version.transaction_version,
			calls: CallRegistry::from_metadata(&metadata),
		})
	}
}

#[async_trait]
impl RuntimeCodingService for SubxtRuntimeService {
	async fn coder_factory(&self) -> Result<CoderFactory, Error> {
		let mut cached = self.cached.lock().await;
		if let Some(factory) = cached.as_ref() {
			return Ok(factory.clone());
		}
		let factory = self.fetch().await?;
		*cached = Some(factory.clone());
		Ok(factory)
	}
}
