//! Title index: torrents grouped by the work they contain.

mod key;
mod snapshot;

pub use key::canonical_key;
pub use snapshot::{Entry, IndexError, TitleIndex, TitleSnapshot};
