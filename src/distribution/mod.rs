//! Exchange of day records with peer instances.
//!
//! Peers send each other packed [`DailyRecord`](crate::store::DailyRecord)s.
//! Delivery is best effort: a message that does not decode is dropped and
//! counted, and a record that arrives twice merges to the same result.

pub mod codec;

pub use codec::*;

/// Outbound channel to peer instances.
///
/// Implementations must not block: `broadcast` is called from the update
/// path. Failures are the link's to handle.
pub trait PeerLink: Send + Sync {
    fn broadcast(&self, message: &[u8]);
}
