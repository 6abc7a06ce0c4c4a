// SPDX-License-Identifier: GPL-3.0

//! Chain RPC accessors.
//!
//! The pipeline consumes a deliberately narrow RPC surface - the six calls
//! it actually needs - behind the [`ChainRpc`] trait, with a subxt-backed
//! implementation. Wrapping subxt's [`LegacyRpcMethods`] keeps the call
//! sites insulated from subxt API churn and lets the test suites substitute
//! an in-memory double.
//!
//! Legacy (`chain_*`, `state_*`, `author_*`) RPCs are used rather than the
//! `chainHead_v1_*` spec because they are universally supported and the
//! pipeline only needs request/response plus one push subscription.

use crate::{AccountId, Hash, errors::Error};
use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use scale::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize};
use subxt::{
	SubstrateConfig,
	backend::{legacy::LegacyRpcMethods, rpc::RpcClient},
	ext::subxt_rpcs::rpc_params,
};
use url::Url;

/// RPC method names used by the pipeline.
pub mod methods {
	pub const SYSTEM_ACCOUNT_NEXT_INDEX: &str = "system_accountNextIndex";
	pub const CHAIN_GET_BLOCK_HASH: &str = "chain_getBlockHash";
	pub const CHAIN_GET_FINALIZED_HEAD: &str = "chain_getFinalizedHead";
	pub const CHAIN_GET_HEADER: &str = "chain_getHeader";
	pub const STATE_GET_STORAGE: &str = "state_getStorage";
	pub const PAYMENT_QUERY_INFO: &str = "payment_queryInfo";
	pub const AUTHOR_SUBMIT_EXTRINSIC: &str = "author_submitExtrinsic";
	pub const AUTHOR_SUBMIT_AND_WATCH_EXTRINSIC: &str = "author_submitAndWatchExtrinsic";
	pub const AUTHOR_UNWATCH_EXTRINSIC: &str = "author_unwatchExtrinsic";
}

/// Two-dimensional transaction weight.
///
/// Encodes as two compact integers (the runtime representation) and
/// deserializes from either the modern `{refTime, proofSize}` object or the
/// scalar form still returned by older runtimes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Weight {
	/// Computational time on reference hardware, in picoseconds.
	#[codec(compact)]
	pub ref_time: u64,
	/// Proof-of-validity size in bytes.
	#[codec(compact)]
	pub proof_size: u64,
}

impl Weight {
	/// Weight from its two components.
	pub const fn from_parts(ref_time: u64, proof_size: u64) -> Self {
		Self { ref_time, proof_size }
	}

	/// Component-wise maximum of two weights.
	pub fn max(self, other: Self) -> Self {
		Self {
			ref_time: self.ref_time.max(other.ref_time),
			proof_size: self.proof_size.max(other.proof_size),
		}
	}

	/// Component-wise saturating multiplication by a scalar.
	pub fn saturating_mul(self, scalar: u64) -> Self {
		Self {
			ref_time: self.ref_time.saturating_mul(scalar),
			proof_size: self.proof_size.saturating_mul(scalar),
		}
	}
}

impl<'de> Deserialize<'de> for Weight {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Repr {
			TwoDim {
				#[serde(rename = "refTime")]
				ref_time: u64,
				#[serde(rename = "proofSize", default)]
				proof_size: u64,
			},
			Scalar(u64),
		}

		Ok(match Repr::deserialize(deserializer)? {
			Repr::TwoDim { ref_time, proof_size } => Self { ref_time, proof_size },
			Repr::Scalar(ref_time) => Self { ref_time, proof_size: 0 },
		})
	}
}

/// Dispatch class of a call, as reported by `payment_queryInfo`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchClass {
	Normal,
	Operational,
	Mandatory,
}

/// Raw `payment_queryInfo` response.
///
/// The fee is kept as the string the node returned; it is parsed only at
/// the pipeline edge so that tip correction can degrade gracefully on
/// malformed values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeDispatchInfo {
	/// Predicted execution weight.
	pub weight: Weight,
	/// Dispatch class of the call.
	pub class: DispatchClass,
	/// Inclusion fee in the chain's smallest unit, decimal or 0x-hex.
	pub partial_fee: String,
}

/// Parse a fee string as returned by the node: decimal or 0x-prefixed hex.
pub fn parse_fee(value: &str) -> Option<u128> {
	if let Some(hex_digits) = value.strip_prefix("0x") {
		u128::from_str_radix(hex_digits, 16).ok()
	} else {
		value.parse().ok()
	}
}

/// Status updates pushed by `author_submitAndWatchExtrinsic`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
	Future,
	Ready,
	Broadcast(Vec<String>),
	InBlock(Hash),
	Retracted(Hash),
	FinalityTimeout(Hash),
	Finalized(Hash),
	Usurped(Hash),
	Dropped,
	Invalid,
}

impl TransactionStatus {
	/// Whether no further updates can follow this status.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			Self::Finalized(_) | Self::FinalityTimeout(_) | Self::Usurped(_) | Self::Dropped | Self::Invalid
		)
	}
}

/// Push-status stream of a watched submission.
pub type TxStatusStream = BoxStream<'static, Result<TransactionStatus, Error>>;

/// The RPC surface the pipeline consumes.
#[async_trait]
pub trait ChainRpc: Send + Sync {
	/// Next nonce for `account`, including transactions already in the pool.
	async fn account_nonce(&self, account: &AccountId) -> Result<u32, Error>;
	/// Hash of the block at `number`.
	async fn block_hash(&self, number: u32) -> Result<Hash, Error>;
	/// Number of the latest finalized block.
	async fn finalized_block_number(&self) -> Result<u32, Error>;
	/// Raw storage value under `key` at the best block, if any.
	async fn storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;
	/// Fee/weight prediction for a hex-encoded extrinsic.
	async fn payment_info(&self, extrinsic: &str) -> Result<RuntimeDispatchInfo, Error>;
	/// Submit a hex-encoded extrinsic, returning its hash.
	async fn submit_extrinsic(&self, extrinsic: &str) -> Result<Hash, Error>;
	/// Submit a hex-encoded extrinsic and open its status subscription.
	///
	/// Establishing the subscription is the submission; dropping the stream
	/// cancels the subscription but not the already-broadcast extrinsic.
	async fn submit_and_watch_extrinsic(&self, extrinsic: &str) -> Result<TxStatusStream, Error>;
}

/// Subxt-backed [`ChainRpc`] over a persistent connection.
#[derive(Clone)]
pub struct SubxtRpcClient {
	raw: RpcClient,
	legacy: LegacyRpcMethods<SubstrateConfig>,
	endpoint: Url,
}

impl SubxtRpcClient {
	/// Connect to a node.
	///
	/// # Arguments
	/// * `endpoint` - WebSocket URL of the node's RPC endpoint.
	pub async fn connect(endpoint: &Url) -> Result<Self, Error> {
		let raw = RpcClient::from_url(endpoint.as_str())
			.await
			.map_err(|_| Error::ConnectionFailure(endpoint.to_string()))?;
		let legacy = LegacyRpcMethods::new(raw.clone());
		log::debug!("connected to {endpoint}");
		Ok(Self { raw, legacy, endpoint: endpoint.clone() })
	}

	/// The endpoint this client is connected to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}

#[async_trait]
impl ChainRpc for SubxtRpcClient {
	async fn account_nonce(&self, account: &AccountId) -> Result<u32, Error> {
		let nonce = self.legacy.system_account_next_index(account).await.map_err(|e| {
			Error::RpcRequest {
				method: methods::SYSTEM_ACCOUNT_NEXT_INDEX,
				message: e.to_string(),
			}
		})?;
		Ok(nonce as u32)
	}

	async fn block_hash(&self, number: u32) -> Result<Hash, Error> {
		self.legacy
			.chain_get_block_hash(Some(number.into()))
			.await
			.map_err(|e| Error::RpcRequest {
				method: methods::CHAIN_GET_BLOCK_HASH,
				message: e.to_string(),
			})?
			.ok_or_else(|| Error::RpcRequest {
				method: methods::CHAIN_GET_BLOCK_HASH,
				message: format!("no block at height {number}"),
			})
	}

	async fn finalized_block_number(&self) -> Result<u32, Error> {
		let head = self.legacy.chain_get_finalized_head().await.map_err(|e| {
			Error::RpcRequest { method: methods::CHAIN_GET_FINALIZED_HEAD, message: e.to_string() }
		})?;
		let header = self
			.legacy
			.chain_get_header(Some(head))
			.await
			.map_err(|e| Error::RpcRequest {
				method: methods::CHAIN_GET_HEADER,
				message: e.to_string(),
			})?
			.ok_or_else(|| Error::RpcRequest {
				method: methods::CHAIN_GET_HEADER,
				message: format!("no header for finalized head {head:?}"),
			})?;
		Ok(header.number)
	}

	async fn storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
		self.legacy.state_get_storage(key, None).await.map_err(|e| Error::RpcRequest {
			method: methods::STATE_GET_STORAGE,
			message: e.to_string(),
		})
	}

	async fn payment_info(&self, extrinsic: &str) -> Result<RuntimeDispatchInfo, Error> {
		self.raw
			.request(methods::PAYMENT_QUERY_INFO, rpc_params![extrinsic])
			.await
			.map_err(|e| Error::RpcRequest {
				method: methods::PAYMENT_QUERY_INFO,
				message: e.to_string(),
			})
	}

	async fn submit_extrinsic(&self, extrinsic: &str) -> Result<Hash, Error> {
		self.raw
			.request(methods::AUTHOR_SUBMIT_EXTRINSIC, rpc_params![extrinsic])
			.await
			.map_err(|e| Error::RpcRequest {
				method: methods::AUTHOR_SUBMIT_EXTRINSIC,
				message: e.to_string(),
			})
	}

	async fn submit_and_watch_extrinsic(&self, extrinsic: &str) -> Result<TxStatusStream, Error> {
		let subscription = self
			.raw
			.subscribe::<TransactionStatus>(
				methods::AUTHOR_SUBMIT_AND_WATCH_EXTRINSIC,
				rpc_params![extrinsic],
				methods::AUTHOR_UNWATCH_EXTRINSIC,
			)
			.await
			.map_err(|e| Error::Subscription {
				method: methods::AUTHOR_SUBMIT_AND_WATCH_EXTRINSIC,
				message: e.to_string(),
			})?;

		Ok(subscription
			.map(|update| {
				update.map_err(|e| Error::Subscription {
					method: methods::AUTHOR_SUBMIT_AND_WATCH_EXTRINSIC,
					message: e.to_string(),
				})
			})
			.boxed())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn weight_deserializes_from_two_dim_object() {
		let weight: Weight = serde_json::from_str(r#"{"refTime":7000000,"proofSize":1024}"#)
			.expect("valid weight json");
		assert_eq!(weight, Weight::from_parts(7_000_000, 1024));
	}

	#[test]
	fn weight_deserializes_from_legacy_scalar() {
		let weight: Weight = serde_json::from_str("7000000").expect("valid weight json");
		assert_eq!(weight, Weight::from_parts(7_000_000, 0));
	}

	#[test]
	fn weight_max_is_component_wise() {
		let a = Weight::from_parts(100, 5);
		let b = Weight::from_parts(40, 9);
		assert_eq!(a.max(b), Weight::from_parts(100, 9));
	}

	#[test]
	fn weight_encodes_as_compact_pair() {
		// Both components below 64 encode as a single compact byte each.
		let encoded = Weight::from_parts(4, 0).encode();
		assert_eq!(encoded, vec![4u8 << 2, 0]);
	}

	#[test]
	fn dispatch_info_deserializes_from_node_response() {
		let json = r#"{"weight":{"refTime":155056000,"proofSize":5180},"class":"normal","partialFee":"159154905"}"#;
		let info: RuntimeDispatchInfo = serde_json::from_str(json).expect("valid dispatch info");
		assert_eq!(info.weight, Weight::from_parts(155_056_000, 5180));
		assert_eq!(info.class, DispatchClass::Normal);
		assert_eq!(parse_fee(&info.partial_fee), Some(159_154_905));
	}

	#[test]
	fn parse_fee_accepts_decimal_and_hex() {
		assert_eq!(parse_fee("123"), Some(123));
		assert_eq!(parse_fee("0xff"), Some(255));
		assert_eq!(parse_fee("not-a-fee"), None);
		assert_eq!(parse_fee(""), None);
	}

	#[test]
	fn transaction_status_deserializes_unit_and_tagged_variants() {
		let ready: TransactionStatus = serde_json::from_str(r#""ready""#).expect("valid status");
		assert_eq!(ready, TransactionStatus::Ready);

		let finalized: TransactionStatus = serde_json::from_str(
			r#"{"finalized":"0x0000000000000000000000000000000000000000000000000000000000000001"}"#,
		)
		.expect("valid status");
		assert!(finalized.is_terminal());
	}

	#[test]
	fn non_terminal_statuses_are_not_terminal() {
		assert!(!TransactionStatus::Ready.is_terminal());
		assert!(!TransactionStatus::InBlock(Hash::zero()).is_terminal());
		assert!(TransactionStatus::Dropped.is_terminal());
		assert!(TransactionStatus::Invalid.is_terminal());
	}
}
