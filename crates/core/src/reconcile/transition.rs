//! Convergence transition table.

use crate::torrent_client::TorrentState;

/// What the convergence loop does after observing the new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Seeding or downloading: re-announce and finish.
    Announce,
    /// Data missing: recheck, then poll again.
    Recheck,
    /// Paused with complete data: resume, then poll again.
    Resume,
    /// Too little data matched: stop.
    Abort,
    /// Paused with most data present: decide from the file listing.
    InspectFiles,
    /// Client is checking: poll again without spending the budget.
    WaitChecking,
    /// Anything else: poll again.
    Continue,
}

/// Pure transition over the observed state and progress.
pub fn transition(state: TorrentState, progress: f64, floor: f64) -> Step {
    match state {
        s if s.is_seeding() || s.is_downloading() => Step::Announce,
        TorrentState::MissingFiles => Step::Recheck,
        TorrentState::PausedUploading => Step::Resume,
        TorrentState::PausedDownloading if progress < floor => Step::Abort,
        TorrentState::PausedDownloading => Step::InspectFiles,
        s if s.is_checking() => Step::WaitChecking,
        _ => Step::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: f64 = 0.8;

    #[test]
    fn test_settled_states_announce() {
        for state in [
            TorrentState::Uploading,
            TorrentState::ForcedUploading,
            TorrentState::StalledUploading,
            TorrentState::Downloading,
            TorrentState::StalledDownloading,
        ] {
            assert_eq!(transition(state, 1.0, FLOOR), Step::Announce, "{:?}", state);
        }
    }

    #[test]
    fn test_paused_download_branches_on_floor() {
        assert_eq!(
            transition(TorrentState::PausedDownloading, 0.75, FLOOR),
            Step::Abort
        );
        assert_eq!(
            transition(TorrentState::PausedDownloading, 0.8, FLOOR),
            Step::InspectFiles
        );
        assert_eq!(
            transition(TorrentState::PausedDownloading, 0.95, FLOOR),
            Step::InspectFiles
        );
    }

    #[test]
    fn test_recovery_states() {
        assert_eq!(transition(TorrentState::MissingFiles, 0.0, FLOOR), Step::Recheck);
        assert_eq!(transition(TorrentState::PausedUploading, 1.0, FLOOR), Step::Resume);
    }

    #[test]
    fn test_checking_states_wait() {
        for state in [
            TorrentState::CheckingDownloading,
            TorrentState::CheckingUploading,
            TorrentState::CheckingResumeData,
            TorrentState::Moving,
        ] {
            assert_eq!(transition(state, 0.5, FLOOR), Step::WaitChecking);
        }
    }

    #[test]
    fn test_other_states_continue() {
        for state in [
            TorrentState::Queued,
            TorrentState::Error,
            TorrentState::MetadataDownloading,
            TorrentState::ForcedDownloading,
            TorrentState::Unknown,
        ] {
            assert_eq!(transition(state, 0.5, FLOOR), Step::Continue);
        }
    }
}
