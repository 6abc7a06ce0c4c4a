// SPDX-License-Identifier: GPL-3.0

//! Shared foundation for the quill transaction pipeline.
//!
//! Everything here is chain-agnostic plumbing used by the `quill-tx` and
//! `quill-xcm` crates:
//!
//! - [`ops`] - the operation graph primitive every asynchronous pipeline step
//!   is composed from.
//! - [`chain`] - the chain model and the registry through which connections
//!   and runtime providers are looked up.
//! - [`rpc`] - the narrow JSON-RPC surface the pipeline consumes, with a
//!   subxt-backed implementation.
//! - [`runtime`] - the runtime coding service producing the coder factory
//!   (spec/transaction version plus the call registry).
//! - [`signer`] - the transaction signer, with an explicit deterministic
//!   variant for fee estimation.
//! - [`testing`] - in-memory doubles for the traits above, shared by the
//!   test suites of the dependent crates.

pub mod chain;
pub mod errors;
pub mod ops;
pub mod rpc;
pub mod runtime;
pub mod signer;
pub mod testing;

pub use chain::{ChainId, ChainModel, ChainRegistry, InMemoryChainRegistry};
pub use errors::Error;
pub use ops::OperationHandle;
pub use rpc::{
	ChainRpc, DispatchClass, RuntimeDispatchInfo, SubxtRpcClient, TransactionStatus,
	TxStatusStream, Weight,
};
pub use runtime::{CallRegistry, CoderFactory, RuntimeCodingService, SubxtRuntimeService};
pub use signer::{CryptoScheme, TxSigner};

/// Account identifier used across the pipeline.
pub type AccountId = subxt::utils::AccountId32;

/// Block/extrinsic hash type used across the pipeline.
pub type Hash = subxt::config::substrate::H256;
