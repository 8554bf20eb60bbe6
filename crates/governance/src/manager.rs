//! General Assembly manager
//!
//! Hosts the schedule, the statute hash and the candidacy round behind the
//! entry points exposed to governance participants. Every mutating entry
//! point takes the authenticated caller first and checks it before anything
//! else. Mutations are staged on a copy of the state, persisted, and only
//! then installed, so a rejected call changes nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use icn_config::{AssemblyConfig, TimingConfig};
use icn_core::{JsonStorage, Storage};

use crate::candidacy::{CandidacyRound, Candidate};
use crate::clock::Clock;
use crate::error::{GovernanceError, GovernanceResult};
use crate::registry::{AccessRegistry, ProposalRegistry};
use crate::schedule::Schedule;
use crate::tally::{self, TallyOutcome};
use crate::types::{GaCategory, GaWindow, Identity, StatuteHash, Timestamp};
use crate::{cursor, slots, validator};

/// Storage key of the persisted assembly state
pub const STATE_PATH: &str = "assembly/state";

/// Everything that must survive a restart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyState {
    pub schedule: Schedule,
    /// Statute currently in force
    pub statute: StatuteHash,
    pub round: CandidacyRound,
}

pub struct AssemblyManager {
    state: AssemblyState,
    timing: TimingConfig,
    operator: Identity,
    proposal_gateway: Identity,
    access: Arc<dyn AccessRegistry>,
    proposals: Arc<dyn ProposalRegistry>,
    clock: Arc<dyn Clock>,
    storage: Arc<dyn Storage>,
}

impl AssemblyManager {
    /// Create a manager, restoring persisted state from `storage` if present
    pub async fn new(
        config: &AssemblyConfig,
        storage: Arc<dyn Storage>,
        access: Arc<dyn AccessRegistry>,
        proposals: Arc<dyn ProposalRegistry>,
        clock: Arc<dyn Clock>,
    ) -> GovernanceResult<Self> {
        let state = match storage.try_get_json::<AssemblyState>(STATE_PATH).await? {
            Some(state) => {
                info!(
                    "Loaded assembly state: {} GAs scheduled, cursor {:?}",
                    state.schedule.total_scheduled(),
                    state.schedule.cursor()
                );
                state
            }
            None => {
                debug!("No persisted assembly state, starting empty");
                AssemblyState::default()
            }
        };

        Ok(Self {
            state,
            timing: config.timing,
            operator: Identity::new(config.operator.clone()),
            proposal_gateway: Identity::new(config.proposal_gateway.clone()),
            access,
            proposals,
            clock,
            storage,
        })
    }

    fn require_operator(&self, caller: &Identity) -> GovernanceResult<()> {
        if caller != &self.operator {
            warn!("Rejected operator action from {}", caller);
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not the assembly operator",
                caller
            )));
        }
        Ok(())
    }

    fn require_gateway(&self, caller: &Identity) -> GovernanceResult<()> {
        if caller != &self.proposal_gateway {
            warn!("Rejected relayed action from {}", caller);
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not the proposal gateway",
                caller
            )));
        }
        Ok(())
    }

    async fn require_delegate(&self, caller: &Identity) -> GovernanceResult<()> {
        if !self.access.check_is_delegate(caller).await? {
            warn!("Rejected delegate action from {}", caller);
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not the delegate",
                caller
            )));
        }
        Ok(())
    }

    /// Persist `next` and make it the live state
    async fn install(&mut self, next: AssemblyState) -> GovernanceResult<()> {
        self.storage.put_json(STATE_PATH, &next).await?;
        self.state = next;
        Ok(())
    }

    /// Apply `apply` to a copy of the state and install it on success
    async fn commit<T>(
        &mut self,
        apply: impl FnOnce(&mut AssemblyState) -> GovernanceResult<T>,
    ) -> GovernanceResult<T> {
        let mut next = self.state.clone();
        let value = apply(&mut next)?;
        self.install(next).await?;
        Ok(value)
    }

    /// Schedule a regular GA. Only the delegate may do this.
    pub async fn schedule_regular_ga(
        &mut self,
        caller: &Identity,
        time: Timestamp,
        duration: u64,
    ) -> GovernanceResult<usize> {
        self.require_delegate(caller).await?;
        let now = self.clock.now();
        let timing = self.timing;
        self.commit(|state| {
            state
                .schedule
                .insert(time, duration, GaCategory::Regular, now, &timing)
        })
        .await
    }

    /// Schedule the extraordinary GA an approved proposal asks for. Relayed
    /// by the proposal gateway; the start is the proposal's proposed date.
    pub async fn schedule_extraordinary_ga(
        &mut self,
        caller: &Identity,
        proposal_id: &str,
    ) -> GovernanceResult<usize> {
        self.require_gateway(caller)?;
        if !self.proposals.get_proposal_final_result(proposal_id).await? {
            return Err(GovernanceError::InvalidProposal(format!(
                "proposal {} was not approved",
                proposal_id
            )));
        }
        if !self.proposals.check_action_is_successful_ga(proposal_id).await? {
            return Err(GovernanceError::InvalidProposal(format!(
                "proposal {} does not convene a GA",
                proposal_id
            )));
        }
        let time = self.proposals.get_proposal_proposed_date(proposal_id).await?;

        let now = self.clock.now();
        let timing = self.timing;
        let index = self
            .commit(|state| {
                state.schedule.insert(
                    time,
                    timing.extraordinary_ga_duration,
                    GaCategory::Extraordinary,
                    now,
                    &timing,
                )
            })
            .await?;
        info!("Extraordinary GA #{} convened by proposal {}", index, proposal_id);
        Ok(index)
    }

    /// Replace the statute in force with the one carried by an approved
    /// statute proposal. Takes effect for GAs that begin afterwards.
    pub async fn update_statute(
        &mut self,
        caller: &Identity,
        proposal_id: &str,
    ) -> GovernanceResult<StatuteHash> {
        self.require_operator(caller)?;
        if !self.proposals.get_proposal_final_result(proposal_id).await? {
            return Err(GovernanceError::InvalidProposal(format!(
                "proposal {} was not approved",
                proposal_id
            )));
        }
        if !self.proposals.check_action_is_statute(proposal_id).await? {
            return Err(GovernanceError::InvalidProposal(format!(
                "proposal {} does not change the statute",
                proposal_id
            )));
        }
        let statute = self.proposals.get_proposal_statute(proposal_id).await?;

        self.commit(|state| {
            state.statute = statute;
            Ok(())
        })
        .await?;
        info!("Statute updated to {} by proposal {}", statute, proposal_id);
        Ok(statute)
    }

    pub async fn reserve_proposal_slot(
        &mut self,
        caller: &Identity,
        ga_index: usize,
    ) -> GovernanceResult<Timestamp> {
        self.require_gateway(caller)?;
        let now = self.clock.now();
        let timing = self.timing;
        self.commit(|state| slots::reserve_proposal_slot(&mut state.schedule, ga_index, now, &timing))
            .await
    }

    pub async fn reserve_delegate_election_slot(
        &mut self,
        caller: &Identity,
        ga_index: usize,
    ) -> GovernanceResult<Timestamp> {
        self.require_gateway(caller)?;
        // Repeat calls skip the persist
        if let Some(existing) = self.state.schedule.get(ga_index)?.delegate_election_time {
            return Ok(existing);
        }
        let now = self.clock.now();
        let timing = self.timing;
        self.commit(|state| {
            slots::reserve_delegate_election_slot(&mut state.schedule, ga_index, now, &timing)
        })
        .await
    }

    pub async fn register_candidate(
        &mut self,
        caller: &Identity,
        candidate: Identity,
    ) -> GovernanceResult<usize> {
        self.require_gateway(caller)?;
        let now = self.clock.now();
        self.commit(|state| state.round.register(&state.schedule, candidate, now))
            .await
    }

    /// Count one vote. The gateway guarantees one vote per member.
    pub async fn cast_delegate_vote(
        &mut self,
        caller: &Identity,
        candidate: &Identity,
    ) -> GovernanceResult<u64> {
        self.require_gateway(caller)?;
        self.commit(|state| state.round.cast_vote(candidate)).await
    }

    /// Conclude the open delegate election.
    ///
    /// Fails with [`GovernanceError::RoundNotOpen`] when there is nothing to
    /// conclude. The emptied round is persisted first, so the round is gone
    /// in every branch, including a failed delegate commit. An elected
    /// delegate is committed to the access registry before the outcome is
    /// returned.
    pub async fn conclude_delegate_voting(
        &mut self,
        caller: &Identity,
        min_participants: u64,
        min_yes_votes: u64,
    ) -> GovernanceResult<TallyOutcome> {
        self.require_operator(caller)?;
        if !self.state.round.is_open() {
            return Err(GovernanceError::RoundNotOpen);
        }

        let mut next = self.state.clone();
        let outcome =
            tally::conclude_delegate_voting(&mut next.round, min_participants, min_yes_votes);
        self.install(next).await?;

        if let TallyOutcome::Elected { identity, .. } = &outcome {
            if let Err(e) = self.access.set_delegate(identity).await {
                warn!("Round concluded but delegate {} was not committed: {}", identity, e);
                return Err(e);
            }
            info!("Delegate {} elected", identity);
        }
        Ok(outcome)
    }

    /// Make the next GA current if its window has begun. One step per call.
    pub async fn advance_if_elapsed(&mut self) -> GovernanceResult<bool> {
        let now = self.clock.now();
        let mut next = self.state.clone();
        let statute = next.statute;
        if !cursor::advance_if_elapsed(&mut next.schedule, now, &statute) {
            return Ok(false);
        }
        self.install(next).await?;
        Ok(true)
    }

    pub fn ga_window(&self, index: usize) -> GovernanceResult<GaWindow> {
        let record = self.state.schedule.get(index)?;
        Ok(GaWindow::from_record(index, record))
    }

    pub fn is_during_current_ga(&self) -> bool {
        let now = self.clock.now();
        self.state
            .schedule
            .current()
            .is_some_and(|ga| ga.is_in_progress(now))
    }

    /// True while the current GA's delegate election slot is running
    pub fn can_vote_for_delegate_now(&self) -> bool {
        let now = self.clock.now();
        let Some(ga) = self.state.schedule.current() else {
            return false;
        };
        match ga.delegate_election_time {
            Some(start) => {
                ga.is_in_progress(now)
                    && now >= start
                    && now < start.saturating_add(self.timing.voting_duration)
            }
            None => false,
        }
    }

    pub fn can_schedule_at(&self, time: Timestamp, is_extra: bool) -> bool {
        validator::is_valid_scheduling_time(
            time,
            GaCategory::from_extraordinary(is_extra),
            &self.state.schedule,
            self.clock.now(),
            &self.timing,
        )
    }

    pub fn current_ga_index(&self) -> Option<usize> {
        self.state.schedule.cursor()
    }

    pub fn total_scheduled(&self) -> usize {
        self.state.schedule.total_scheduled()
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.state.round.candidates()
    }

    pub fn current_statute(&self) -> StatuteHash {
        self.state.statute
    }

    pub fn state(&self) -> &AssemblyState {
        &self.state
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }
}
