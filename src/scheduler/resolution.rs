use super::{
    CommitOutcome, OverlapCandidate, ResolutionState, ResolveOptions, SchedError,
};
use crate::model::{AssignmentKey, Booking, TeamId};
use crate::storage::{AssignmentStore, BookingStore};
use tracing::{info, warn};

/// Annote les réservations en conflit avec leurs bornes ajustables.
pub fn propose_resolution(conflicts: &[Booking], opts: ResolveOptions) -> Vec<OverlapCandidate> {
    conflicts
        .iter()
        .map(|b| OverlapCandidate {
            booking: b.clone(),
            start_date: b.start,
            end_date: b.end(),
            start_hour: b.start_hour.unwrap_or(opts.default_start_hour),
            end_hour: b.end_hour.unwrap_or(opts.default_end_hour),
        })
        .collect()
}

/// Enregistre les nouvelles plages, élément par élément.
///
/// Ne re-vérifie pas l'absence de chevauchement : c'est au rappelant de
/// relancer la détection.
pub(super) fn commit_resolution<S: BookingStore>(
    store: &mut S,
    resolved: &[OverlapCandidate],
) -> Vec<CommitOutcome> {
    resolved
        .iter()
        .map(|candidate| {
            let id = candidate.booking_id().clone();
            let outcome = commit_one(store, candidate);
            match outcome {
                Ok(()) => {
                    info!(
                        booking = %id,
                        start = %candidate.start_date,
                        end = %candidate.end_date,
                        "booking rescheduled"
                    );
                    CommitOutcome::Applied(id)
                }
                Err(err) => {
                    warn!(booking = %id, error = %err, "booking reschedule failed");
                    CommitOutcome::Failed {
                        booking: id,
                        reason: err.to_string(),
                    }
                }
            }
        })
        .collect()
}

fn commit_one<S: BookingStore>(store: &mut S, candidate: &OverlapCandidate) -> Result<(), SchedError> {
    let current = store
        .booking(candidate.booking_id())
        .ok_or_else(|| SchedError::UnknownBooking(candidate.booking_id().to_string()))?;
    let updated = Booking {
        team: current.team,
        project: current.project,
        ..candidate.to_booking()?
    };
    store.update_booking(updated)?;
    Ok(())
}

/// Lignes de l'ancienne plage de `old` que plus aucune réservation de
/// l'équipe ne couvre après le déplacement vers `moved`.
pub(super) fn stale_rows<S: BookingStore + AssignmentStore>(
    store: &S,
    old: &Booking,
    moved: &Booking,
) -> Vec<AssignmentKey> {
    let others: Vec<Booking> = store
        .bookings()
        .into_iter()
        .filter(|b| b.team == old.team && b.id != old.id)
        .collect();
    store
        .query_assignments(&old.team, old.start, old.end())
        .into_iter()
        .filter(|row| {
            let covered = (moved.team == old.team && moved.covers(row.date))
                || others.iter().any(|b| b.covers(row.date));
            !covered
        })
        .map(|row| row.key())
        .collect()
}

/// Boucle détection / édition / commit pour une équipe.
///
/// `Detected -> ProposedEdits -> Committed -> Detected | Resolved`, bornée par
/// `ResolveOptions::max_rounds` (état final `Exhausted`).
#[derive(Debug, Clone)]
pub struct ResolutionSession {
    team: TeamId,
    state: ResolutionState,
    round: u32,
    max_rounds: u32,
    opts: ResolveOptions,
    conflicts: Vec<Booking>,
    candidates: Vec<OverlapCandidate>,
}

impl ResolutionSession {
    pub(super) fn new(team: TeamId, conflicts: Vec<Booking>, opts: ResolveOptions) -> Self {
        let state = if conflicts.is_empty() {
            ResolutionState::Resolved
        } else {
            ResolutionState::Detected
        };
        Self {
            team,
            state,
            round: 0,
            max_rounds: opts.max_rounds.max(1),
            opts,
            conflicts,
            candidates: Vec::new(),
        }
    }

    pub fn team(&self) -> &TeamId {
        &self.team
    }
    pub fn state(&self) -> ResolutionState {
        self.state
    }
    /// Nombre de commits déjà effectués.
    pub fn round(&self) -> u32 {
        self.round
    }
    pub fn conflicts(&self) -> &[Booking] {
        &self.conflicts
    }
    pub fn candidates(&self) -> &[OverlapCandidate] {
        &self.candidates
    }
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            ResolutionState::Resolved | ResolutionState::Exhausted
        )
    }

    /// Passe en édition ; les candidats sont à ajuster par le rappelant.
    pub fn propose(&mut self) -> Result<&mut [OverlapCandidate], SchedError> {
        match self.state {
            ResolutionState::Detected => {
                self.candidates = propose_resolution(&self.conflicts, self.opts);
                self.state = ResolutionState::ProposedEdits;
                Ok(self.candidates.as_mut_slice())
            }
            ResolutionState::ProposedEdits => Ok(self.candidates.as_mut_slice()),
            state => Err(SchedError::InvalidTransition {
                action: "propose edits",
                state,
            }),
        }
    }

    /// Abandonne les éditions proposées sans rien écrire.
    pub fn discard(&mut self) {
        if self.state == ResolutionState::ProposedEdits {
            self.candidates.clear();
            self.state = ResolutionState::Detected;
        }
    }

    pub(super) fn begin_commit(&mut self) -> Result<Vec<OverlapCandidate>, SchedError> {
        if self.state != ResolutionState::ProposedEdits {
            return Err(SchedError::InvalidTransition {
                action: "commit",
                state: self.state,
            });
        }
        self.state = ResolutionState::Committed;
        self.round += 1;
        Ok(std::mem::take(&mut self.candidates))
    }

    /// Applique le résultat de la re-détection qui suit un commit.
    pub(super) fn redetected(&mut self, conflicts: Vec<Booking>) {
        self.state = if conflicts.is_empty() {
            ResolutionState::Resolved
        } else if self.round >= self.max_rounds {
            warn!(
                team = %self.team,
                rounds = self.round,
                remaining = conflicts.len(),
                "overlap resolution stopped with conflicts left"
            );
            ResolutionState::Exhausted
        } else {
            ResolutionState::Detected
        };
        self.conflicts = conflicts;
    }
}
