//! Voting slot allocation inside a GA
//!
//! Each GA hands out back-to-back windows from a monotonic watermark that
//! starts at the GA's own start time. A slot occupies `voting_duration`
//! seconds and is followed by `inter_proposal_gap` seconds of pause. The
//! watermark never passes the end of the GA.

use tracing::{debug, info};

use icn_config::TimingConfig;

use crate::error::{GovernanceError, GovernanceResult};
use crate::schedule::Schedule;
use crate::types::{GaRecord, Timestamp};

/// Book a proposal voting slot in GA `ga_index`, returning its start time.
///
/// Fails with a "no slot" error (see [`GovernanceError::is_no_slot`]) when
/// the GA has already started or has no room left.
pub fn reserve_proposal_slot(
    schedule: &mut Schedule,
    ga_index: usize,
    now: Timestamp,
    timing: &TimingConfig,
) -> GovernanceResult<Timestamp> {
    let record = schedule.get_mut(ga_index)?;
    let slot = book(record, now, timing)?;
    debug!("Reserved proposal slot at {} in GA #{}", slot, ga_index);
    Ok(slot)
}

/// Book the delegate election slot of GA `ga_index`.
///
/// Repeated calls return the slot booked first without consuming more
/// capacity.
pub fn reserve_delegate_election_slot(
    schedule: &mut Schedule,
    ga_index: usize,
    now: Timestamp,
    timing: &TimingConfig,
) -> GovernanceResult<Timestamp> {
    let record = schedule.get_mut(ga_index)?;
    if let Some(existing) = record.delegate_election_time {
        return Ok(existing);
    }

    let slot = book(record, now, timing)?;
    record.delegate_election_time = Some(slot);
    info!("Delegate election of GA #{} set for {}", ga_index, slot);
    Ok(slot)
}

fn book(record: &mut GaRecord, now: Timestamp, timing: &TimingConfig) -> GovernanceResult<Timestamp> {
    if record.has_started(now) {
        return Err(GovernanceError::OutOfWindow(format!(
            "GA starting at {} has already started",
            record.start_time
        )));
    }

    let slot = record.current_end_watermark;
    let end = record.end_time();
    if slot.saturating_add(timing.voting_duration) > end {
        return Err(GovernanceError::NoCapacity(format!(
            "GA starting at {} is fully booked",
            record.start_time
        )));
    }

    let advanced = slot
        .saturating_add(timing.voting_duration)
        .saturating_add(timing.inter_proposal_gap);
    record.current_end_watermark = advanced.min(end);
    Ok(slot)
}
