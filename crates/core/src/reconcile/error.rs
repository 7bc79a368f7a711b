use thiserror::Error;

use crate::torrent_client::{TorrentClientError, TorrentState};

/// Reasons a cross-seed job stops short of convergence.
///
/// Every variant carries a numeric status code. Retryable variants are
/// absorbed by the convergence loop until its budget runs out; the rest end
/// the job immediately.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Not a cross submission: no held release shares the title")]
    NotCrossSubmission,

    #[error("No complete exact duplicate to cross from")]
    NoCompleteMatch,

    #[error("Failed to get categories: {0}")]
    CategoryLookup(#[source] TorrentClientError),

    #[error("Failed to create category {category}: {source}")]
    CategoryCreate {
        category: String,
        #[source]
        source: TorrentClientError,
    },

    #[error("Submission failed after {attempts} attempts: {message}")]
    SubmitFailed { attempts: u32, message: String },

    #[error("Unable to find torrent: {0}")]
    NotFound(String),

    #[error("Rechecking missing files")]
    Rechecking,

    #[error("Unable to resume torrent: {0}")]
    ResumeFailed(#[source] TorrentClientError),

    #[error("Paused after upload, resumed")]
    PausedUp,

    #[error("Name matched, data did not (progress {progress:.3})")]
    DataMismatch { progress: f64 },

    #[error("Unable to get files: {0}")]
    FilesUnavailable(#[source] TorrentClientError),

    #[error("Unable to resume valid cross: {0}")]
    ResumeValidFailed(#[source] TorrentClientError),

    #[error("Unable to delete existing torrent: {0}")]
    DeleteFailed(#[source] TorrentClientError),

    #[error("Failed to resubmit into scratch directory: {0}")]
    ResubmitFailed(String),

    #[error("Failed to change save location: {0}")]
    RelocateFailed(#[source] TorrentClientError),

    #[error("Failed to restore automatic management: {0}")]
    AutoManagementFailed(#[source] TorrentClientError),

    #[error("Failed to recheck: {0}")]
    RecheckFailed(#[source] TorrentClientError),

    #[error("Failed to resume: {0}")]
    FinalResumeFailed(#[source] TorrentClientError),

    #[error("Still checking: {}", .0.as_str())]
    StillChecking(TorrentState),

    #[error("Not converged: {}", .0.as_str())]
    NotConverged(TorrentState),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl ReconcileError {
    /// Status code reported to the caller.
    pub fn code(&self) -> u16 {
        match self {
            ReconcileError::NotCrossSubmission => 420,
            ReconcileError::NoCompleteMatch => 414,
            ReconcileError::CategoryLookup(_) => 496,
            ReconcileError::CategoryCreate { .. } => 495,
            ReconcileError::SubmitFailed { .. } => 490,
            ReconcileError::NotFound(_) => 423,
            ReconcileError::Rechecking => 469,
            ReconcileError::ResumeFailed(_) => 468,
            ReconcileError::PausedUp => 467,
            ReconcileError::DataMismatch { .. } => 466,
            ReconcileError::FilesUnavailable(_) => 465,
            ReconcileError::ResumeValidFailed(_) => 464,
            ReconcileError::DeleteFailed(_) => 463,
            ReconcileError::ResubmitFailed(_) => 450,
            ReconcileError::RelocateFailed(_) => 435,
            ReconcileError::AutoManagementFailed(_) => 433,
            ReconcileError::RecheckFailed(_) => 431,
            ReconcileError::FinalResumeFailed(_) => 429,
            ReconcileError::StillChecking(_) => 412,
            ReconcileError::NotConverged(_) => 410,
            ReconcileError::Unexpected(_) => 415,
        }
    }

    /// Whether the convergence loop may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::NotFound(_)
                | ReconcileError::Rechecking
                | ReconcileError::ResumeFailed(_)
                | ReconcileError::PausedUp
                | ReconcileError::FilesUnavailable(_)
                | ReconcileError::ResumeValidFailed(_)
                | ReconcileError::DeleteFailed(_)
                | ReconcileError::StillChecking(_)
                | ReconcileError::NotConverged(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ReconcileError::DataMismatch { progress: 0.5 }.code(), 466);
        assert_eq!(
            ReconcileError::StillChecking(TorrentState::CheckingUploading).code(),
            412
        );
        assert_eq!(ReconcileError::Unexpected("x".into()).code(), 415);
    }

    #[test]
    fn test_data_mismatch_is_unrecoverable() {
        assert!(!ReconcileError::DataMismatch { progress: 0.75 }.is_retryable());
        assert!(!ReconcileError::RelocateFailed(TorrentClientError::Timeout).is_retryable());
        assert!(ReconcileError::PausedUp.is_retryable());
        assert!(ReconcileError::NotConverged(TorrentState::Queued).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = ReconcileError::NotConverged(TorrentState::Queued);
        assert_eq!(err.to_string(), "Not converged: queued");
    }
}
