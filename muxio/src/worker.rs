//! Caller boundary: merges run on a background task.
//!
//! A merge blocks its task for as long as the external tool runs (sub-second
//! to minutes), so interactive callers spawn it here and await the outcome
//! through a oneshot channel instead of calling [`Muxer::run`] inline.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::debug;

use crate::muxer::{MuxOutcome, MuxRequest, Muxer};

/// Spawn a merge on a background task and receive its terminal outcome.
///
/// Dropping the receiver does not cancel the merge: once started, the
/// request runs to completion. Concurrent spawns are independent; they share
/// no in-process state.
pub fn spawn_merge(muxer: Arc<Muxer>, request: MuxRequest) -> oneshot::Receiver<MuxOutcome> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let outcome = muxer.run(&request).await;
        if tx.send(outcome).is_err() {
            debug!("merge outcome dropped: caller went away");
        }
    });

    rx
}
