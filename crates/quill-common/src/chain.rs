// SPDX-License-Identifier: GPL-3.0

//! Chain model and registry.
//!
//! The registry is the pipeline's only source of chains, connections and
//! runtime providers. The pipeline never constructs connections itself; it
//! looks them up per chain id, so feature code controls which endpoints are
//! in use.

use crate::{rpc::ChainRpc, runtime::RuntimeCodingService};
use std::{collections::HashMap, sync::Arc};

/// Chain identifier, caller-chosen (typically the genesis hash hex or a
/// human-readable slug).
pub type ChainId = String;

/// Static description of a chain known to the wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainModel {
	/// Registry identifier of the chain.
	pub chain_id: ChainId,
	/// Human-readable chain name.
	pub name: String,
	/// Whether this chain is a relay chain (relay chains have no parachain
	/// id of their own).
	pub is_relaychain: bool,
	/// SS58 address prefix.
	pub address_prefix: u16,
	/// Tip attached to every extrinsic by default, in the chain's smallest
	/// unit. Most chains configure none.
	pub default_tip: Option<u128>,
}

impl ChainModel {
	/// Create a chain model with no default tip.
	pub fn new(chain_id: impl Into<ChainId>, name: impl Into<String>, is_relaychain: bool) -> Self {
		Self {
			chain_id: chain_id.into(),
			name: name.into(),
			is_relaychain,
			address_prefix: 42,
			default_tip: None,
		}
	}
}

/// Look-up surface for chains, their connections and runtime providers.
pub trait ChainRegistry: Send + Sync {
	/// The chain model for `chain_id`, if known.
	fn get_chain(&self, chain_id: &str) -> Option<ChainModel>;
	/// The live RPC connection for `chain_id`, if available.
	fn get_connection(&self, chain_id: &str) -> Option<Arc<dyn ChainRpc>>;
	/// The runtime coding provider for `chain_id`, if available.
	fn get_runtime_provider(&self, chain_id: &str) -> Option<Arc<dyn RuntimeCodingService>>;
}

struct ChainEntry {
	model: ChainModel,
	connection: Arc<dyn ChainRpc>,
	runtime: Arc<dyn RuntimeCodingService>,
}

/// Map-backed [`ChainRegistry`].
#[derive(Default)]
pub struct InMemoryChainRegistry {
	chains: HashMap<ChainId, ChainEntry>,
}

impl InMemoryChainRegistry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a chain with its connection and runtime provider, replacing
	/// any previous entry for the same id.
	pub fn register(
		&mut self,
		model: ChainModel,
		connection: Arc<dyn ChainRpc>,
		runtime: Arc<dyn RuntimeCodingService>,
	) {
		self.chains
			.insert(model.chain_id.clone(), ChainEntry { model, connection, runtime });
	}
}

impl ChainRegistry for InMemoryChainRegistry {
	fn get_chain(&self, chain_id: &str) -> Option<ChainModel> {
		self.chains.get(chain_id).map(|entry| entry.model.clone())
	}

	fn get_connection(&self, chain_id: &str) -> Option<Arc<dyn ChainRpc>> {
		self.chains.get(chain_id).map(|entry| entry.connection.clone())
	}

	fn get_runtime_provider(&self, chain_id: &str) -> Option<Arc<dyn RuntimeCodingService>> {
		self.chains.get(chain_id).map(|entry| entry.runtime.clone())
	}
}
