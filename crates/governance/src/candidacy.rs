//! Candidate registry for the delegate election of one GA
//!
//! A round opens implicitly with the first registration and is consumed by
//! exactly one conclusion (see [`crate::tally`]). It is tied to its GA by
//! start time, which stays fixed while later insertions shift indices. Vote deduplication is the
//! caller's job: every call to [`CandidacyRound::cast_vote`] counts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GovernanceError, GovernanceResult};
use crate::schedule::Schedule;
use crate::types::{Identity, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub identity: Identity,
    pub votes: u64,
}

/// Candidates and tallies of an election in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRound {
    /// Start time of the GA whose delegate election this round belongs to
    pub ga_start: Timestamp,
    candidates: Vec<Candidate>,
    positions: HashMap<Identity, usize>,
    total_participants: u64,
}

impl OpenRound {
    fn new(ga_start: Timestamp) -> Self {
        Self {
            ga_start,
            candidates: Vec::new(),
            positions: HashMap::new(),
            total_participants: 0,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn total_participants(&self) -> u64 {
        self.total_participants
    }

    pub fn position_of(&self, identity: &Identity) -> Option<usize> {
        self.positions.get(identity).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "round", rename_all = "snake_case")]
pub enum CandidacyRound {
    #[default]
    Empty,
    Open(OpenRound),
}

impl CandidacyRound {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Empty => &[],
            Self::Open(round) => round.candidates(),
        }
    }

    pub fn total_participants(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::Open(round) => round.total_participants,
        }
    }

    pub fn ga_start(&self) -> Option<Timestamp> {
        match self {
            Self::Empty => None,
            Self::Open(round) => Some(round.ga_start),
        }
    }

    /// Current schedule index of the round's GA
    pub fn ga_index(&self, schedule: &Schedule) -> Option<usize> {
        self.ga_start().and_then(|start| schedule.index_of_start(start))
    }

    /// Register `identity` for a delegate election.
    ///
    /// An open round keeps accepting candidates until its own GA begins.
    /// Otherwise a new round opens for the next GA after the cursor.
    /// Returns the candidate's position.
    pub fn register(
        &mut self,
        schedule: &Schedule,
        identity: Identity,
        now: Timestamp,
    ) -> GovernanceResult<usize> {
        let ga_start = match self {
            Self::Open(round) => {
                if round.positions.contains_key(&identity) {
                    return Err(GovernanceError::AlreadyRegistered(identity));
                }
                round.ga_start
            }
            Self::Empty => {
                let (_, ga) = schedule.upcoming().ok_or_else(|| {
                    GovernanceError::RegistrationClosed("no upcoming GA is scheduled".to_string())
                })?;
                ga.start_time
            }
        };
        if now >= ga_start {
            return Err(GovernanceError::RegistrationClosed(format!(
                "GA starting at {} has begun",
                ga_start
            )));
        }

        let mut round = match std::mem::take(self) {
            Self::Open(round) => round,
            Self::Empty => {
                info!("Opening candidacy round for the GA starting at {}", ga_start);
                OpenRound::new(ga_start)
            }
        };
        let position = round.candidates.len();
        round.positions.insert(identity.clone(), position);
        round.candidates.push(Candidate {
            identity: identity.clone(),
            votes: 0,
        });
        *self = Self::Open(round);

        info!("Registered candidate {} at position {}", identity, position);
        Ok(position)
    }

    /// Add one vote for `identity`, returning its new count
    pub fn cast_vote(&mut self, identity: &Identity) -> GovernanceResult<u64> {
        let round = match self {
            Self::Open(round) => round,
            Self::Empty => return Err(GovernanceError::UnknownCandidate(identity.clone())),
        };
        let position = round
            .position_of(identity)
            .ok_or_else(|| GovernanceError::UnknownCandidate(identity.clone()))?;

        let candidate = &mut round.candidates[position];
        candidate.votes += 1;
        round.total_participants += 1;
        debug!(
            "Vote for {}: {} votes, {} participants",
            identity, candidate.votes, round.total_participants
        );
        Ok(candidate.votes)
    }
}
