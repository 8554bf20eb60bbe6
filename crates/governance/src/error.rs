//! Error types for General Assembly governance

use thiserror::Error;

use icn_core::StorageError;

use crate::types::Identity;

/// Error types for governance operations
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Lookahead, closest-future or elapsed-GA violation
    #[error("Outside of allowed window: {0}")]
    OutOfWindow(String),

    /// Minimum spacing between GAs would be violated
    #[error("Scheduling conflict: {0}")]
    SchedulingConflict(String),

    #[error("Candidate already registered: {0}")]
    AlreadyRegistered(Identity),

    #[error("Registration closed: {0}")]
    RegistrationClosed(String),

    /// No voting slot left in the GA
    #[error("No capacity: {0}")]
    NoCapacity(String),

    #[error("Unknown candidate: {0}")]
    UnknownCandidate(Identity),

    #[error("Quorum not met: {participants} participants, more than {required} required")]
    QuorumNotMet { participants: u64, required: u64 },

    #[error("Majority not met: top candidate has {top_votes} votes, more than {required} required")]
    MajorityNotMet { top_votes: u64, required: u64 },

    /// GA index beyond the number of scheduled GAs
    #[error("Invalid reference: GA index {index} (total scheduled: {total})")]
    InvalidReference { index: usize, total: usize },

    /// Conclusion requested while no candidacy round is open
    #[error("No candidacy round is open")]
    RoundNotOpen,

    /// Proposal is unknown, not approved or carries the wrong action
    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl GovernanceError {
    /// True for the "no slot" outcomes of slot reservation: the GA already
    /// started or is fully booked. Callers must not retry against the same GA.
    pub fn is_no_slot(&self) -> bool {
        matches!(self, Self::NoCapacity(_) | Self::OutOfWindow(_))
    }
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;
