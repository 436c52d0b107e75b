use super::SchedError;
use crate::model::{last_day, Team, TeamId, MIN_BOOKING_DAYS};
use crate::storage::TeamDirectory;
use chrono::NaiveDate;

/// Intervalles fermés : partager un seul jour suffit.
pub(super) fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && b_start <= a_end
}

pub(super) fn validate_hours(start: u8, end: u8) -> Result<(), SchedError> {
    if start >= end || end > 24 {
        return Err(SchedError::InvalidHours { start, end });
    }
    Ok(())
}

/// Au moins un jour, et un dernier jour représentable.
pub(super) fn validate_duration(
    start: NaiveDate,
    duration_days: u32,
) -> Result<NaiveDate, SchedError> {
    if duration_days < MIN_BOOKING_DAYS {
        return Err(SchedError::InvalidDuration(i64::from(duration_days)));
    }
    last_day(start, duration_days).ok_or(SchedError::InvalidDuration(i64::from(duration_days)))
}

/// Équipe réservable : connue, active, différente de la sentinelle.
pub(super) fn bookable_team<D: TeamDirectory + ?Sized>(
    directory: &D,
    team: &TeamId,
) -> Result<Team, SchedError> {
    if team.is_unassigned() {
        return Err(SchedError::UnassignedTeam);
    }
    let found = directory
        .team(team)
        .ok_or_else(|| SchedError::UnknownTeam(team.to_string()))?;
    if !found.active {
        return Err(SchedError::InactiveTeam(team.to_string()));
    }
    Ok(found)
}
