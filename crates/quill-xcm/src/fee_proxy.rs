// SPDX-License-Identifier: GPL-3.0

//! Deduplication proxy for XCM fee requests.
//!
//! The same [`FeeProxy`] cache as plain extrinsic fees, keyed by a
//! caller-chosen identifier derived from the transfer parameters (amount,
//! recipient, direction). Origin and cross-chain estimates are distinct
//! computations and should use distinct keys.

use crate::{
	config::XcmTransfers,
	service::{FeeWithWeight, XcmTransferRequest, XcmTransferService, XcmUnweightedTransferRequest},
};
use quill_tx::fee_proxy::{FeeProxy, FeeReceiver};
use std::sync::Arc;

/// Deduplicating proxy over [`XcmTransferService`] fee estimation.
#[derive(Default)]
pub struct XcmFeeProxy {
	inner: FeeProxy<FeeWithWeight>,
}

impl XcmFeeProxy {
	/// Create an empty proxy.
	pub fn new() -> Self {
		Self::default()
	}

	/// Estimate the origin-chain fee, deduplicated on `reuse_identifier`.
	pub fn estimate_origin_fee(
		&self,
		service: Arc<XcmTransferService>,
		request: XcmTransferRequest,
		config: Arc<XcmTransfers>,
		reuse_identifier: &str,
	) -> FeeReceiver<FeeWithWeight> {
		self.inner.estimate(reuse_identifier, async move {
			service.estimate_origin_fee(&request, &config).await
		})
	}

	/// Estimate the cross-chain fee, deduplicated on `reuse_identifier`.
	pub fn estimate_cross_chain_fee(
		&self,
		service: Arc<XcmTransferService>,
		request: XcmUnweightedTransferRequest,
		config: Arc<XcmTransfers>,
		reuse_identifier: &str,
	) -> FeeReceiver<FeeWithWeight> {
		self.inner.estimate(reuse_identifier, async move {
			service.estimate_cross_chain_fee(&request, &config).await
		})
	}

	/// Drop the cached result for the key.
	pub fn invalidate(&self, reuse_identifier: &str) {
		self.inner.invalidate(reuse_identifier);
	}
}
