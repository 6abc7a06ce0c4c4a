// SPDX-License-Identifier: GPL-3.0

//! Cross-chain transfers over XCM.
//!
//! Resolves the three parties of a reserve-based transfer (origin, reserve,
//! destination), derives the dispatch call for the origin chain, and prices
//! the transfer:
//!
//! - the origin fee is an ordinary extrinsic fee for the transfer call,
//!   estimated through `quill-tx` with the deterministic signer;
//! - the cross-chain fee is the sum of the destination-hop and (when the
//!   reserve is a third chain) reserve-hop fees, each computed from the
//!   configured fee mode: `proportional` prices the weight locally,
//!   `standard` executes a real fee estimation carrying an XCM `execute`
//!   call.
//!
//! Static route knowledge - reserve chains, fee modes, base weights,
//! instruction lists - comes from the [`config::XcmTransfers`] document.

pub mod calls;
pub mod config;
pub mod fee_proxy;
pub mod message;
pub mod resolution;
pub mod service;

pub use calls::CallPath;
pub use config::{FeeMode, TransferType, XcmTransfers};
pub use fee_proxy::XcmFeeProxy;
pub use message::{Xcm, XcmWeightMessages};
pub use resolution::{
	ChainAsset, XcmTransferDestination, XcmTransferParties, XcmTransferReserve,
	XcmTransferResolutionFactory,
};
pub use service::{
	FeeWithWeight, XcmSubmitResult, XcmTransferRequest, XcmTransferService,
	XcmUnweightedTransferRequest,
};
