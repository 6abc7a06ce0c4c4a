// SPDX-License-Identifier: GPL-3.0

//! Error types for the transaction pipeline.
//!
//! A single enum covers the whole pipeline so that one failure can be cloned
//! to every dependent of a shared operation-graph node. Variants fall into
//! four groups: transient infrastructure failures, the parent-cancelled
//! marker, missing cross-chain configuration, and decoding failures.

use thiserror::Error;

/// Errors produced by the transaction pipeline.
///
/// The enum is `Clone` on purpose: a failed operation-graph node hands the
/// same error to every dependent, and batch operations repeat the shared
/// upstream failure once per result slot.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
	/// Failed to establish a connection to a node.
	#[error("Failed to connect to {0}")]
	ConnectionFailure(String),
	/// An RPC request failed after the connection was established.
	#[error("RPC request `{method}` failed: {message}")]
	RpcRequest {
		/// The RPC method that failed.
		method: &'static str,
		/// The error message describing the failure.
		message: String,
	},
	/// An RPC subscription could not be established or broke down.
	#[error("RPC subscription `{method}` failed: {message}")]
	Subscription {
		/// The RPC subscription method.
		method: &'static str,
		/// The error message describing the failure.
		message: String,
	},
	/// Runtime version or metadata could not be fetched or decoded.
	#[error("Runtime metadata unavailable: {0}")]
	RuntimeUnavailable(String),

	/// An upstream dependency of this operation failed or was cancelled, so
	/// the operation never ran. Distinct from a real failure so callers can
	/// tell "never ran" from "ran and failed".
	#[error("Parent operation was cancelled")]
	ParentCancelled,
	/// A dependency settled with a result shape the dependent cannot use,
	/// e.g. an empty batch where one element was expected.
	#[error("Unexpected dependent result")]
	UnexpectedDependentResult,

	/// The chain is not known to the registry.
	#[error("Unknown chain: {0}")]
	UnknownChain(String),
	/// The registry holds no live connection for the chain.
	#[error("Connection unavailable for chain {0}")]
	ConnectionUnavailable(String),
	/// The registry holds no runtime provider for the chain.
	#[error("Runtime provider unavailable for chain {0}")]
	RuntimeProviderUnavailable(String),

	/// No transfer is configured from the asset to the destination chain.
	#[error("No transfer route configured from asset {asset} to chain {chain}")]
	NoTransferRoute {
		/// Origin asset identifier.
		asset: String,
		/// Destination chain identifier.
		chain: String,
	},
	/// No reserve chain is configured for the asset.
	#[error("No reserve configured for asset {0}")]
	NoReserve(String),
	/// No destination-hop fee is configured for the route.
	#[error("No destination fee configured from asset {asset} to chain {chain}")]
	NoDestinationFee {
		/// Origin asset identifier.
		asset: String,
		/// Destination chain identifier.
		chain: String,
	},
	/// No reserve-hop fee is configured for the asset.
	#[error("No reserve fee configured for asset {0}")]
	NoReserveFee(String),
	/// No base weight is configured for the chain.
	#[error("No base weight configured for chain {0}")]
	NoBaseWeight(String),
	/// A fee configuration references an instruction list that does not exist.
	#[error("No instruction list named {0}")]
	NoInstructions(String),
	/// The runtime exposes no XCM pallet under any known name.
	#[error("No XCM pallet found in runtime")]
	NoXcmModule,
	/// The configured transfer type is not supported.
	#[error("Unsupported transfer type: {0}")]
	UnsupportedTransferType(String),
	/// A configured weight-message instruction is not supported.
	#[error("Unsupported XCM instruction: {0}")]
	UnsupportedInstruction(String),

	/// SCALE or JSON decoding failed.
	#[error("Decoding failed: {0}")]
	Decoding(String),
	/// A fee value could not be parsed as an unsigned integer.
	#[error("Invalid fee value: {0}")]
	InvalidFee(String),
	/// Signing failed or the signer was misconfigured.
	#[error("Signing failed: {0}")]
	Signing(String),
	/// The extrinsic builder was finalized without a call attached.
	#[error("No call attached to extrinsic builder")]
	MissingCall,
}
