//! Comparator chain for two releases of the same work.
//!
//! Each comparator maps a release to an integer rank through a fixed table
//! and prefers the higher rank. The chain is walked in a fixed order and the
//! first comparator with a strict preference decides.

mod rank;

use serde::{Deserialize, Serialize};

use crate::release::{normalize, Release};

/// One quality attribute in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Resolution,
    Hdr,
    Channels,
    Source,
    Audio,
    Extension,
    Language,
    Replacement,
}

/// Comparators walked after resolution, in order.
const CHAIN: [Comparator; 7] = [
    Comparator::Hdr,
    Comparator::Channels,
    Comparator::Source,
    Comparator::Audio,
    Comparator::Extension,
    Comparator::Language,
    Comparator::Replacement,
];

/// Which release of a pair is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Outcome of a chain walk that found a preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub winner: Side,
    pub comparator: Comparator,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Resolution => "resolution",
            Comparator::Hdr => "hdr",
            Comparator::Channels => "channels",
            Comparator::Source => "source",
            Comparator::Audio => "audio",
            Comparator::Extension => "extension",
            Comparator::Language => "language",
            Comparator::Replacement => "replacement",
        }
    }

    /// Status code reported when this comparator rejects a candidate.
    pub fn status_code(&self) -> u16 {
        match self {
            Comparator::Resolution => 201,
            Comparator::Hdr => 202,
            Comparator::Channels => 203,
            Comparator::Source => 204,
            Comparator::Audio => 205,
            Comparator::Extension => 206,
            Comparator::Language => 207,
            Comparator::Replacement => 208,
        }
    }

    pub fn rank(&self, release: &Release) -> i32 {
        match self {
            Comparator::Resolution => rank::resolution(release),
            Comparator::Hdr => rank::hdr(release),
            Comparator::Channels => rank::channels(release),
            Comparator::Source => rank::source(release),
            Comparator::Audio => rank::audio(release),
            Comparator::Extension => rank::extension(release),
            Comparator::Language => rank::language(release),
            Comparator::Replacement => rank::replacement(release),
        }
    }

    /// Some comparators abstain before ranking.
    fn abstains(&self, a: &Release, b: &Release) -> bool {
        match self {
            Comparator::Resolution => a.resolution == b.resolution,
            Comparator::Channels => a.channels == b.channels,
            Comparator::Source => a.source == b.source,
            Comparator::Replacement => normalize(&a.group) != normalize(&b.group),
            _ => false,
        }
    }

    /// The preferred side, or `None` when both rank equal.
    pub fn compare(&self, a: &Release, b: &Release) -> Option<Side> {
        if self.abstains(a, b) {
            return None;
        }
        let (left, right) = (self.rank(a), self.rank(b));
        match left.cmp(&right) {
            std::cmp::Ordering::Greater => Some(Side::Left),
            std::cmp::Ordering::Less => Some(Side::Right),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Walk the chain over `a` and `b`.
///
/// A resolution preference only stands when source does not favour the other
/// side; otherwise it is discarded and the walk continues with HDR.
pub fn walk(a: &Release, b: &Release) -> Option<Verdict> {
    if let Some(side) = Comparator::Resolution.compare(a, b) {
        let contradicted = matches!(Comparator::Source.compare(a, b), Some(s) if s != side);
        if !contradicted {
            return Some(Verdict {
                winner: side,
                comparator: Comparator::Resolution,
            });
        }
    }

    CHAIN.iter().find_map(|comparator| {
        comparator.compare(a, b).map(|winner| Verdict {
            winner,
            comparator: *comparator,
        })
    })
}
