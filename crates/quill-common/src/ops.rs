// SPDX-License-Identifier: GPL-3.0

//! Operation graph primitive.
//!
//! A pipeline step is a node producing `Result<T, Error>` exactly once. A
//! node declares its dependencies by capturing clones of their
//! [`OperationHandle`]s and awaiting them inside its own future, which makes
//! the dependency graph immutable by construction: edges exist before the
//! node is spawned and cannot be added afterwards.
//!
//! Guarantees:
//!
//! - a node executes at most once, regardless of how many handles await it;
//! - a node only proceeds once every awaited dependency has settled;
//! - a failed dependency hands the same (cloned) error to every dependent;
//! - awaiting a cancelled node yields [`Error::ParentCancelled`] instead of
//!   hanging forever, and cancellation only affects transitive dependents,
//!   never siblings.

use crate::errors::Error;
use futures::{
	FutureExt,
	future::{AbortHandle, Abortable, BoxFuture, Shared},
};
use std::future::Future;

/// Handle to a spawned operation-graph node.
///
/// Cloning the handle does not re-run the node; every clone observes the
/// single settled result.
pub struct OperationHandle<T: Clone> {
	shared: Shared<BoxFuture<'static, Result<T, Error>>>,
	abort: AbortHandle,
}

impl<T: Clone> Clone for OperationHandle<T> {
	fn clone(&self) -> Self {
		Self { shared: self.shared.clone(), abort: self.abort.clone() }
	}
}

/// Schedule a node on the worker pool.
///
/// The node starts immediately and runs even if no handle ever awaits it,
/// matching operation-queue semantics: scheduling is the point of no return.
pub fn spawn<T, F>(future: F) -> OperationHandle<T>
where
	T: Clone + Send + 'static,
	F: Future<Output = Result<T, Error>> + Send + 'static,
{
	let (abort, registration) = AbortHandle::new_pair();
	let task = tokio::spawn(Abortable::new(future, registration));
	let shared = async move {
		match task.await {
			Ok(Ok(result)) => result,
			// Aborted before settling.
			Ok(Err(_)) => Err(Error::ParentCancelled),
			// The task itself died (panicked or was torn down with the runtime).
			Err(_) => Err(Error::ParentCancelled),
		}
	}
	.boxed()
	.shared();

	OperationHandle { shared, abort }
}

impl<T: Clone + Send + 'static> OperationHandle<T> {
	/// A node that settles immediately with `value`, without touching the
	/// worker pool.
	pub fn ready(value: T) -> Self {
		let (abort, _) = AbortHandle::new_pair();
		Self { shared: async move { Ok(value) }.boxed().shared(), abort }
	}

	/// A node that settles immediately with `error`.
	pub fn failed(error: Error) -> Self {
		let (abort, _) = AbortHandle::new_pair();
		Self { shared: async move { Err(error) }.boxed().shared(), abort }
	}

	/// Await the node's settled result.
	///
	/// Returns [`Error::ParentCancelled`] if the node was cancelled before
	/// settling.
	pub async fn result(&self) -> Result<T, Error> {
		self.shared.clone().await
	}

	/// Cancel the node.
	///
	/// Dependents awaiting this node observe [`Error::ParentCancelled`];
	/// nodes that do not depend on it are unaffected. Cancelling an already
	/// settled node has no effect.
	pub fn cancel(&self) {
		self.abort.abort();
	}
}
