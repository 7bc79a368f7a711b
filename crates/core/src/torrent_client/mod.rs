//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait for driving a download
//! client, the qBittorrent Web API binding, and a per-identity handle pool.

mod pool;
mod qbittorrent;
mod types;

pub use pool::{ClientFactory, ClientIdentity, ClientPool, QBittorrentFactory};
pub use qbittorrent::QBittorrentClient;
pub use types::*;
