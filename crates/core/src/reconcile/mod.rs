//! Cross-seed reconciliation.
//!
//! A cross-seed submission is attached to data already held by an exact
//! duplicate, then polled until the client reports a seeding state. Partial
//! matches above the completeness floor are replaced through a scratch
//! directory so the client never overwrites the duplicate's files.

mod error;
mod payload;
mod policy;
mod reconciler;
mod transition;

pub use error::ReconcileError;
pub use payload::{decode_torrent_payload, PayloadError};
pub use policy::RetryPolicy;
pub use reconciler::{CrossSeedOutcome, CrossSeedRequest, OutcomeKind, Reconciler};
pub use transition::{transition, Step};
