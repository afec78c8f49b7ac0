//! Adapter bridging a [`SeenStore`] into `dmesh-crypto`'s
//! [`dmesh_crypto::ReplayCheck`] seam, so [`dmesh_crypto::decrypt`] can be
//! driven directly by a real store without `dmesh-crypto` depending on
//! `dmesh-store`.

use dmesh_proto::{Fingerprint, MessageId, primitives::b64_encode};
use dmesh_crypto::ReplayCheck;

use crate::error::StoreError;
use crate::traits::SeenStore;

/// Wraps any [`SeenStore`] handle to implement [`ReplayCheck`].
#[derive(Clone)]
pub struct StoreReplayCheck<S>(pub S);

impl<S: SeenStore> ReplayCheck for StoreReplayCheck<S> {
    type Error = StoreError;

    fn check_and_mark(&mut self, msg_id: &MessageId, sender_fp: &Fingerprint) -> Result<bool, Self::Error> {
        self.0
            .check_and_mark(&b64_encode(msg_id), &b64_encode(sender_fp))
    }
}
