//! Keyed TTL caching with an injectable time source.
//!
//! Every per-identity cache in the crate (client handles, parsed releases,
//! torrent snapshots) takes its notion of "now" from a [`Clock`] handed in
//! at construction, so tests can drive expiry deterministically.

mod clock;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ttl::TtlCache;
