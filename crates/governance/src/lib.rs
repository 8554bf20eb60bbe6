//! Governance module for ICN General Assemblies
//!
//! Schedules regular and extraordinary General Assemblies (GAs), books
//! voting slots inside them, and runs the quorum and majority gated
//! election of a single delegate, with revotes on ties.
//!
//! The building blocks are plain functions and types over an owned
//! [`Schedule`] and [`CandidacyRound`]; [`AssemblyManager`] hosts them
//! behind caller-checked entry points with persistence.

pub mod candidacy;
pub mod clock;
pub mod cursor;
pub mod error;
pub mod manager;
pub mod registry;
pub mod schedule;
pub mod slots;
pub mod tally;
pub mod types;
pub mod validator;

pub use candidacy::{CandidacyRound, Candidate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{GovernanceError, GovernanceResult};
pub use manager::{AssemblyManager, AssemblyState, STATE_PATH};
pub use registry::{
    AccessRegistry, MemoryAccessRegistry, MemoryProposalRegistry, ProposalAction, ProposalRecord,
    ProposalRegistry, StoredAccessRegistry, StoredProposalRegistry,
};
pub use schedule::Schedule;
pub use tally::{TallyOutcome, TallyRejection};
pub use types::{GaCategory, GaRecord, GaWindow, Identity, StatuteHash, Timestamp};
