mod assignment;
mod overlaps;
mod resolution;
mod types;
mod util;

pub use overlaps::{detect_all_overlaps, detect_overlaps, find_overlap_pairs};
pub use resolution::{propose_resolution, ResolutionSession};
pub use types::{
    AssignmentFailure, AssignmentReport, BookingFailure, CommitOutcome, CommitReport,
    OverlapCandidate,
    OverlapPair, PlanningWarning, ResolutionState, ResolveOptions, SchedError,
};

use crate::model::{
    AssignmentKey, Booking, BookingId, DailyAssignment, Employee, EmployeeId, ProjectId, TeamId,
};
use crate::storage::PlanningStore;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Employé affecté à plusieurs équipes le même jour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleBooking {
    pub employee: EmployeeId,
    pub date: NaiveDate,
    pub teams: Vec<TeamId>,
}

/// Scheduler : service de planification au-dessus d'un magasin.
///
/// Aucun état n'est gardé entre deux appels ; chaque opération relit le
/// magasin avant de décider.
#[derive(Debug, Default)]
pub struct Scheduler<S> {
    store: S,
    opts: ResolveOptions,
}

impl<S> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            opts: ResolveOptions::default(),
        }
    }

    pub fn with_options(store: S, opts: ResolveOptions) -> Self {
        Self { store, opts }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
    pub fn into_inner(self) -> S {
        self.store
    }
    pub fn options(&self) -> ResolveOptions {
        self.opts
    }
}

impl<S: PlanningStore> Scheduler<S> {
    /// Ajoute un membre permanent. `false` si déjà membre.
    pub fn add_member(&mut self, team: &TeamId, employee: &EmployeeId) -> Result<bool, SchedError> {
        util::bookable_team(&self.store, team)?;
        if self.store.employee(employee).is_none() {
            return Err(SchedError::UnknownEmployee(employee.to_string()));
        }
        let added = self.store.add_member(team, employee)?;
        if !added {
            debug!(team = %team, employee = %employee, "already a permanent member");
        }
        Ok(added)
    }

    pub fn remove_member(
        &mut self,
        team: &TeamId,
        employee: &EmployeeId,
    ) -> Result<bool, SchedError> {
        if self.store.team(team).is_none() {
            return Err(SchedError::UnknownTeam(team.to_string()));
        }
        Ok(self.store.remove_member(team, employee)?)
    }

    /// Membres permanents connus de l'annuaire.
    pub fn members(&self, team: &TeamId) -> Result<Vec<Employee>, SchedError> {
        if self.store.team(team).is_none() {
            return Err(SchedError::UnknownTeam(team.to_string()));
        }
        Ok(self
            .store
            .list_members(team)
            .iter()
            .filter_map(|id| self.store.employee(id))
            .collect())
    }

    /// Enregistre une nouvelle réservation et lance l'auto-affectation.
    pub fn book(
        &mut self,
        project: ProjectId,
        team: &TeamId,
        start: NaiveDate,
        duration_days: u32,
    ) -> Result<(Booking, AssignmentReport), SchedError> {
        util::validate_duration(start, duration_days)?;
        util::bookable_team(&self.store, team)?;
        let booking = Booking::new(project, team.clone(), start, duration_days)
            .map_err(|_| SchedError::InvalidDuration(i64::from(duration_days)))?;
        self.store.insert_booking(booking.clone())?;
        info!(booking = %booking.id, team = %team, start = %start, days = duration_days, "booking created");
        let report = self.auto_assign_booking(&booking)?;
        Ok((booking, report))
    }

    /// Change l'équipe ou la plage d'une réservation, puis ré-affecte.
    pub fn rebook(
        &mut self,
        id: &BookingId,
        team: &TeamId,
        start: NaiveDate,
        duration_days: u32,
    ) -> Result<(Booking, AssignmentReport), SchedError> {
        util::validate_duration(start, duration_days)?;
        util::bookable_team(&self.store, team)?;
        let current = self
            .store
            .booking(id)
            .ok_or_else(|| SchedError::UnknownBooking(id.to_string()))?;
        let updated = Booking {
            team: team.clone(),
            start,
            duration_days,
            ..current
        };
        self.store.update_booking(updated.clone())?;
        info!(booking = %id, team = %team, start = %start, days = duration_days, "booking changed");
        let report = self.auto_assign_booking(&updated)?;
        Ok((updated, report))
    }

    /// Ajoute une réservation existante (import) sans auto-affectation.
    ///
    /// Mêmes règles que [`Scheduler::book`], sauf que l'équipe sentinelle est
    /// acceptée.
    pub fn add_booking(&mut self, booking: Booking) -> Result<(), SchedError> {
        util::validate_duration(booking.start, booking.duration_days)?;
        if !booking.team.is_unassigned() {
            util::bookable_team(&self.store, &booking.team)?;
        }
        info!(booking = %booking.id, team = %booking.team, start = %booking.start, "booking added");
        self.store.insert_booking(booking)?;
        Ok(())
    }

    pub fn auto_assign(
        &mut self,
        team: &TeamId,
        start: NaiveDate,
        duration_days: u32,
    ) -> Result<AssignmentReport, SchedError> {
        assignment::auto_assign(&mut self.store, team, start, duration_days)
    }

    pub fn auto_assign_booking(&mut self, booking: &Booking) -> Result<AssignmentReport, SchedError> {
        self.auto_assign(&booking.team, booking.start, booking.duration_days)
    }

    /// Saisie manuelle d'une affectation (upsert par clé).
    pub fn set_availability(
        &mut self,
        employee: &EmployeeId,
        team: &TeamId,
        date: NaiveDate,
        is_available: bool,
        notes: Option<String>,
    ) -> Result<DailyAssignment, SchedError> {
        util::bookable_team(&self.store, team)?;
        if self.store.employee(employee).is_none() {
            return Err(SchedError::UnknownEmployee(employee.to_string()));
        }
        let row = DailyAssignment {
            employee: employee.clone(),
            team: team.clone(),
            date,
            is_available,
            notes,
        };
        Ok(self.store.upsert_assignment(row)?)
    }

    pub fn remove_assignment(&mut self, key: &AssignmentKey) -> Result<bool, SchedError> {
        Ok(self.store.delete_assignment(key)?)
    }

    pub fn assignments(
        &self,
        team: &TeamId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyAssignment>, SchedError> {
        if to < from {
            return Err(SchedError::InvalidRange {
                start: from,
                end: to,
            });
        }
        Ok(self.store.query_assignments(team, from, to))
    }

    pub fn employee_schedule(
        &self,
        employee: &EmployeeId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyAssignment>, SchedError> {
        if to < from {
            return Err(SchedError::InvalidRange {
                start: from,
                end: to,
            });
        }
        Ok(self.store.employee_assignments(employee, from, to))
    }

    /// Employés disponibles pour plus d'une équipe un même jour.
    pub fn double_bookings(&self, from: NaiveDate, to: NaiveDate) -> Vec<DoubleBooking> {
        let mut per_day: BTreeMap<(EmployeeId, NaiveDate), Vec<TeamId>> = BTreeMap::new();
        for a in self
            .store
            .assignments_between(from, to)
            .into_iter()
            .filter(|a| a.is_available)
        {
            per_day.entry((a.employee, a.date)).or_default().push(a.team);
        }
        per_day
            .into_iter()
            .filter(|(_, teams)| teams.len() > 1)
            .map(|((employee, date), teams)| DoubleBooking {
                employee,
                date,
                teams,
            })
            .collect()
    }

    pub fn detect_overlaps(&self, team: &TeamId) -> Vec<Booking> {
        detect_overlaps(team, &self.store.bookings())
    }

    pub fn overlap_pairs(&self, team: &TeamId) -> Vec<OverlapPair> {
        find_overlap_pairs(team, &self.store.bookings())
    }

    pub fn all_overlaps(&self) -> BTreeMap<TeamId, Vec<Booking>> {
        detect_all_overlaps(&self.store.bookings())
    }

    pub fn propose_resolution(&self, conflicts: &[Booking]) -> Vec<OverlapCandidate> {
        propose_resolution(conflicts, self.opts)
    }

    /// Écrit les nouvelles plages ; un résultat par élément.
    ///
    /// Chaque réservation déplacée est ré-affectée sur ses nouveaux jours. Les
    /// lignes des anciens jours sont conservées et listées dans `stale_rows`.
    pub fn commit_resolution(&mut self, resolved: &[OverlapCandidate]) -> CommitReport {
        let before: Vec<Option<Booking>> = resolved
            .iter()
            .map(|c| self.store.booking(c.booking_id()))
            .collect();
        let outcomes = resolution::commit_resolution(&mut self.store, resolved);

        let mut report = CommitReport::default();
        let mut teams = BTreeSet::new();
        for (outcome, old) in outcomes.iter().zip(before) {
            let (CommitOutcome::Applied(id), Some(old)) = (outcome, old) else {
                continue;
            };
            let Some(moved) = self.store.booking(id) else {
                continue;
            };
            teams.insert(moved.team.clone());
            report
                .stale_rows
                .extend(resolution::stale_rows(&self.store, &old, &moved));
            if moved.team.is_unassigned() {
                continue;
            }
            match self.auto_assign_booking(&moved) {
                Ok(assigned) => report.assignments.push(assigned),
                Err(err) => {
                    warn!(booking = %id, error = %err, "moved booking not re-assigned");
                    report.unassigned.push(BookingFailure {
                        booking: id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        report.outcomes = outcomes;
        report.remaining = teams
            .iter()
            .flat_map(|team| self.detect_overlaps(team))
            .collect();
        report
    }

    /// Ouvre une session de résolution pour `team`.
    pub fn start_resolution(&self, team: &TeamId) -> ResolutionSession {
        ResolutionSession::new(team.clone(), self.detect_overlaps(team), self.opts)
    }

    /// Commit des éditions de la session puis re-détection.
    pub fn commit_session(
        &mut self,
        session: &mut ResolutionSession,
    ) -> Result<CommitReport, SchedError> {
        let edits = session.begin_commit()?;
        let mut report = self.commit_resolution(&edits);
        report.remaining = self.detect_overlaps(session.team());
        session.redetected(report.remaining.clone());
        Ok(report)
    }
}
