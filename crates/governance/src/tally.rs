//! Conclusion of a delegate election round
//!
//! The round is consumed by the call whatever the outcome, so a second
//! conclusion always observes an empty round. Committing an elected
//! delegate to the access registry is left to the caller.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::candidacy::CandidacyRound;
use crate::error::{GovernanceError, GovernanceResult};
use crate::types::Identity;

/// Why a round produced no delegate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TallyRejection {
    QuorumNotMet { participants: u64, required: u64 },
    MajorityNotMet { top_votes: u64, required: u64 },
}

impl From<TallyRejection> for GovernanceError {
    fn from(rejection: TallyRejection) -> Self {
        match rejection {
            TallyRejection::QuorumNotMet { participants, required } => {
                GovernanceError::QuorumNotMet { participants, required }
            }
            TallyRejection::MajorityNotMet { top_votes, required } => {
                GovernanceError::MajorityNotMet { top_votes, required }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TallyOutcome {
    Rejected(TallyRejection),
    /// A single candidate holds the most votes
    Elected {
        position: usize,
        identity: Identity,
        votes: u64,
    },
    /// Two or more candidates share the most votes and a revote is needed
    Revote {
        tied_positions: Vec<usize>,
        tied: Vec<Identity>,
        votes: u64,
    },
}

impl TallyOutcome {
    pub fn accepted(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    pub fn needs_revote(&self) -> bool {
        matches!(self, Self::Revote { .. })
    }

    /// Winning position, number of tied candidates, or 0 when rejected
    pub fn result(&self) -> usize {
        match self {
            Self::Rejected(_) => 0,
            Self::Elected { position, .. } => *position,
            Self::Revote { tied_positions, .. } => tied_positions.len(),
        }
    }

    /// `(accepted, needs_revote, result)`
    pub fn as_tuple(&self) -> (bool, bool, usize) {
        (self.accepted(), self.needs_revote(), self.result())
    }

    pub fn elected(&self) -> Option<&Identity> {
        match self {
            Self::Elected { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Turn a rejection into the matching error
    pub fn into_result(self) -> GovernanceResult<Self> {
        match self {
            Self::Rejected(rejection) => Err(rejection.into()),
            outcome => Ok(outcome),
        }
    }
}

/// Conclude the delegate vote, leaving `round` empty.
///
/// Rejected when participants do not exceed `min_participants` or the top
/// candidate's votes do not exceed `min_yes_votes`.
pub fn conclude_delegate_voting(
    round: &mut CandidacyRound,
    min_participants: u64,
    min_yes_votes: u64,
) -> TallyOutcome {
    let round = std::mem::take(round);
    let participants = round.total_participants();
    let candidates = round.candidates();

    let mut top_votes = 0;
    let mut tied_positions: Vec<usize> = Vec::new();
    for (position, candidate) in candidates.iter().enumerate() {
        if candidate.votes > top_votes || tied_positions.is_empty() {
            top_votes = candidate.votes;
            tied_positions = vec![position];
        } else if candidate.votes == top_votes {
            tied_positions.push(position);
        }
    }

    let outcome = if participants <= min_participants {
        TallyOutcome::Rejected(TallyRejection::QuorumNotMet {
            participants,
            required: min_participants,
        })
    } else if top_votes <= min_yes_votes {
        TallyOutcome::Rejected(TallyRejection::MajorityNotMet {
            top_votes,
            required: min_yes_votes,
        })
    } else if let [position] = tied_positions[..] {
        TallyOutcome::Elected {
            position,
            identity: candidates[position].identity.clone(),
            votes: top_votes,
        }
    } else {
        TallyOutcome::Revote {
            tied: tied_positions
                .iter()
                .map(|&p| candidates[p].identity.clone())
                .collect(),
            tied_positions,
            votes: top_votes,
        }
    };

    info!(
        "Delegate vote concluded with {} participants: {:?}",
        participants, outcome
    );
    outcome
}
