// SPDX-License-Identifier: GPL-3.0

//! Extrinsic construction, fee estimation and submission pipeline.
//!
//! The crate turns a caller-supplied call into signed, node-accepted
//! extrinsics and prices them before broadcast:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ExtrinsicService                        │
//! │   estimate_fee · submit · submit_and_watch · cancel_watch    │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 ExtrinsicOperationFactory                    │
//! │  nonce ─┐                                                    │
//! │  coder ─┼─▶ builder per index (nonce = base + index) ─▶ sign │
//! │ genesis ┤                                                    │
//! │   era ──┴─▶ era birth-block hash                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fee results pass through tip correction ([`fee::apply_tip_correction`])
//! and can be deduplicated per logical request with
//! [`fee_proxy::TransactionFeeProxy`].

pub mod builder;
pub mod era;
pub mod factory;
pub mod fee;
pub mod fee_proxy;
pub mod service;

pub use builder::{ChainExtension, DecodedExtrinsic, ExtrinsicBuilder, decode_signed_prelude};
pub use era::{EraStrategy, ResolvedEra};
pub use factory::{CallPopulator, ExtrinsicOperationFactory};
pub use fee::{FeeEstimate, apply_tip_correction};
pub use fee_proxy::{FeeProxy, TransactionFeeProxy};
pub use service::{ExtrinsicService, TxSubscription};
