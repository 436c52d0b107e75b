use crate::model::{AssignmentKey, Booking, BookingId, DailyAssignment, EmployeeId, TeamId};
use crate::storage::StoreError;
use chrono::{Duration, NaiveDate};
use std::fmt;
use thiserror::Error;

/// Options de résolution des chevauchements
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub default_start_hour: u8,
    pub default_end_hour: u8,
    /// Nombre maximal de tours commit / re-détection.
    pub max_rounds: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            default_start_hour: 7,
            default_end_hour: 16,
            max_rounds: 5,
        }
    }
}

/// Deux réservations d'une même équipe qui partagent au moins un jour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapPair {
    pub team: TeamId,
    pub booking_a: BookingId,
    pub booking_b: BookingId,
    pub first_shared_day: NaiveDate,
    pub last_shared_day: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanningWarning {
    /// L'équipe n'a aucun membre permanent.
    EmptyRoster(TeamId),
    /// Membre inconnu de l'annuaire, ignoré.
    UnknownMember { team: TeamId, employee: EmployeeId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentFailure {
    pub key: AssignmentKey,
    pub reason: String,
}

/// Résultat d'une auto-affectation. Les échecs partiels sont des données.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentReport {
    pub team: TeamId,
    pub applied: Vec<DailyAssignment>,
    /// Couples (employé, jour) écartés pour cause de congé.
    pub skipped_holidays: Vec<AssignmentKey>,
    pub failures: Vec<AssignmentFailure>,
    pub warnings: Vec<PlanningWarning>,
}

impl AssignmentReport {
    pub fn new(team: TeamId) -> Self {
        Self {
            team,
            applied: Vec::new(),
            skipped_holidays: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.applied.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Résumé lisible, par ex. `3 of 5 assignments succeeded`.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} assignments succeeded",
            self.applied.len(),
            self.attempted()
        )
    }
}

/// Réservation en conflit, annotée pour l'ajustement interactif.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapCandidate {
    pub booking: Booking,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_hour: u8,
    pub end_hour: u8,
}

impl OverlapCandidate {
    pub fn booking_id(&self) -> &BookingId {
        &self.booking.id
    }

    /// Déplace la plage de dates (bornes incluses).
    pub fn reschedule(&mut self, start: NaiveDate, end: NaiveDate) -> Result<(), SchedError> {
        if end < start {
            return Err(SchedError::InvalidRange { start, end });
        }
        self.start_date = start;
        self.end_date = end;
        Ok(())
    }

    /// Décale la plage de `days` jours en gardant sa longueur.
    pub fn shift_days(&mut self, days: i64) -> Result<(), SchedError> {
        let shift = Duration::try_days(days).ok_or(SchedError::InvalidDuration(days))?;
        let moved = self
            .start_date
            .checked_add_signed(shift)
            .zip(self.end_date.checked_add_signed(shift));
        let Some((start, end)) = moved else {
            return Err(SchedError::InvalidDuration(self.duration_days()));
        };
        self.start_date = start;
        self.end_date = end;
        Ok(())
    }

    pub fn set_hours(&mut self, start_hour: u8, end_hour: u8) -> Result<(), SchedError> {
        super::util::validate_hours(start_hour, end_hour)?;
        self.start_hour = start_hour;
        self.end_hour = end_hour;
        Ok(())
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Réservation résultant des ajustements.
    pub fn to_booking(&self) -> Result<Booking, SchedError> {
        if self.end_date < self.start_date {
            return Err(SchedError::InvalidRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        super::util::validate_hours(self.start_hour, self.end_hour)?;
        let duration = u32::try_from(self.duration_days())
            .map_err(|_| SchedError::InvalidDuration(self.duration_days()))?;
        Ok(Booking {
            start: self.start_date,
            duration_days: duration,
            start_hour: Some(self.start_hour),
            end_hour: Some(self.end_hour),
            ..self.booking.clone()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied(BookingId),
    Failed { booking: BookingId, reason: String },
}

impl CommitOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommitOutcome::Applied(_))
    }
}

/// Réservation déplacée dont la ré-affectation a été refusée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingFailure {
    pub booking: BookingId,
    pub reason: String,
}

/// Résultat d'un commit de résolution suivi d'une re-détection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitReport {
    pub outcomes: Vec<CommitOutcome>,
    /// Auto-affectation des réservations déplacées, une par réservation.
    pub assignments: Vec<AssignmentReport>,
    pub unassigned: Vec<BookingFailure>,
    /// Lignes journalières hors de la nouvelle plage, laissées en place.
    pub stale_rows: Vec<AssignmentKey>,
    /// Chevauchements encore présents dans les équipes touchées.
    pub remaining: Vec<Booking>,
}

impl CommitReport {
    pub fn is_clear(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Detected,
    ProposedEdits,
    Committed,
    Resolved,
    /// Plafond de tours atteint avec des conflits restants.
    Exhausted,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionState::Detected => "detected",
            ResolutionState::ProposedEdits => "proposed",
            ResolutionState::Committed => "committed",
            ResolutionState::Resolved => "resolved",
            ResolutionState::Exhausted => "exhausted",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("invalid duration: {0} day(s), must be at least 1")]
    InvalidDuration(i64),
    #[error("invalid date range: {end} is before {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid hours: {start}h-{end}h")]
    InvalidHours { start: u8, end: u8 },
    #[error("unknown team: {0}")]
    UnknownTeam(String),
    #[error("team is inactive: {0}")]
    InactiveTeam(String),
    #[error("bookings without a team cannot be scheduled")]
    UnassignedTeam,
    #[error("unknown employee: {0}")]
    UnknownEmployee(String),
    #[error("unknown booking: {0}")]
    UnknownBooking(String),
    #[error("cannot {action} while resolution is {state}")]
    InvalidTransition {
        action: &'static str,
        state: ResolutionState,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
