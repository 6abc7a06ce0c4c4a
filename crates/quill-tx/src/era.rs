// SPDX-License-Identifier: GPL-3.0

//! Transaction era resolution.
//!
//! A mortal transaction is valid for `period` blocks starting at its birth
//! block; the signed payload commits to the birth block's hash. The era is
//! derived from the finalized chain head so that the birth block is always
//! available on every honest fork.

use quill_common::{Error, rpc::ChainRpc};
use sp_runtime::generic::Era;

/// Mortality window applied when the caller does not choose one.
pub const DEFAULT_MORTAL_PERIOD: u64 = 64;

/// A resolved transaction era together with its birth block number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedEra {
	/// The era committed into the signed payload.
	pub era: Era,
	/// Block number whose hash anchors the mortality window. Zero (genesis)
	/// for immortal transactions.
	pub birth_block: u32,
}

/// How the pipeline derives the era of an extrinsic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EraStrategy {
	/// Immortal transactions, anchored to the genesis hash.
	Immortal,
	/// Mortal transactions valid for `period` blocks. The period is rounded
	/// to a power of two within protocol bounds during resolution.
	Mortal {
		period: u64,
	},
}

impl Default for EraStrategy {
	fn default() -> Self {
		Self::Mortal { period: DEFAULT_MORTAL_PERIOD }
	}
}

impl EraStrategy {
	/// Resolve the era against current chain state.
	///
	/// Mortal eras query the finalized head; immortal eras resolve without
	/// any network traffic.
	pub async fn resolve(&self, rpc: &dyn ChainRpc) -> Result<ResolvedEra, Error> {
		match self {
			Self::Immortal => Ok(ResolvedEra { era: Era::Immortal, birth_block: 0 }),
			Self::Mortal { period } => {
				let current = rpc.finalized_block_number().await? as u64;
				let era = Era::mortal(*period, current);
				Ok(ResolvedEra { era, birth_block: era.birth(current) as u32 })
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use quill_common::testing::MockChainRpc;

	#[tokio::test]
	async fn immortal_resolves_to_genesis_without_rpc() -> Result<(), Error> {
		let rpc = MockChainRpc::new();
		let resolved = EraStrategy::Immortal.resolve(&rpc).await?;
		assert_eq!(resolved, ResolvedEra { era: Era::Immortal, birth_block: 0 });
		assert_eq!(rpc.block_hash_calls(), 0);
		Ok(())
	}

	#[tokio::test]
	async fn mortal_era_birth_is_within_period_of_head() -> Result<(), Error> {
		let rpc = MockChainRpc::new().with_finalized_number(1000);
		let resolved = EraStrategy::Mortal { period: 64 }.resolve(&rpc).await?;

		assert!(resolved.birth_block <= 1000);
		assert!(1000 - resolved.birth_block < 64);
		match resolved.era {
			Era::Mortal(period, phase) => {
				assert_eq!(period, 64);
				assert_eq!(phase, resolved.birth_block as u64 % period);
			},
			Era::Immortal => panic!("expected mortal era"),
		}
		Ok(())
	}

	#[tokio::test]
	async fn odd_period_is_clamped_to_power_of_two() -> Result<(), Error> {
		let rpc = MockChainRpc::new().with_finalized_number(500);
		let resolved = EraStrategy::Mortal { period: 100 }.resolve(&rpc).await?;
		match resolved.era {
			Era::Mortal(period, _) => assert!(period.is_power_of_two()),
			Era::Immortal => panic!("expected mortal era"),
		}
		Ok(())
	}

	#[tokio::test]
	async fn head_failure_propagates() {
		let rpc = MockChainRpc::new().with_finalized_number_error(Error::ConnectionFailure(
			"ws://node".to_string(),
		));
		let result = EraStrategy::default().resolve(&rpc).await;
		assert_eq!(result, Err(Error::ConnectionFailure("ws://node".to_string())));
	}
}
