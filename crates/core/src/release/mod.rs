//! Release names and their structured attributes.
//!
//! A [`Release`] is the parsed form of a free-text media name such as
//! `Show.S01E01.1080p.WEB-DL.DDP5.1-GRP`. Parsing sits behind the
//! [`ReleaseParser`] trait; [`SceneParser`] is the built-in implementation.

mod parser;
mod types;

pub use parser::{ReleaseParser, SceneParser};
pub use types::{normalize, Release};
