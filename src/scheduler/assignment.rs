use super::{util, AssignmentFailure, AssignmentReport, PlanningWarning, SchedError};
use crate::model::{AssignmentKey, DailyAssignment, EmployeeId, HolidayScope, TeamId};
use crate::storage::PlanningStore;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// Étend une réservation d'équipe en affectations journalières, une par
/// membre permanent et par jour, hors congés.
///
/// Relit l'annuaire et les congés à chaque appel. Un upsert en échec est
/// consigné dans le rapport et n'interrompt pas les suivants.
pub(super) fn auto_assign<S: PlanningStore>(
    store: &mut S,
    team: &TeamId,
    start: NaiveDate,
    duration_days: u32,
) -> Result<AssignmentReport, SchedError> {
    let end = util::validate_duration(start, duration_days)?;
    util::bookable_team(&*store, team)?;

    let mut report = AssignmentReport::new(team.clone());

    let mut members: Vec<EmployeeId> = Vec::new();
    for employee in store.list_members(team) {
        if store.employee(&employee).is_some() {
            members.push(employee);
        } else {
            warn!(team = %team, employee = %employee, "member missing from directory, skipped");
            report.warnings.push(PlanningWarning::UnknownMember {
                team: team.clone(),
                employee,
            });
        }
    }

    if members.is_empty() {
        warn!(team = %team, "team has no permanent members, nothing to assign");
        report.warnings.push(PlanningWarning::EmptyRoster(team.clone()));
        return Ok(report);
    }

    let team_scope = HolidayScope::Team(team.clone());

    for date in start.iter_days().take_while(|d| *d <= end) {
        let team_off = store.is_on_holiday(&team_scope, date);

        for employee in &members {
            let key = AssignmentKey {
                employee: employee.clone(),
                team: team.clone(),
                date,
            };

            if team_off || store.is_on_holiday(&HolidayScope::Employee(employee.clone()), date) {
                debug!(%key, "on holiday, not assigned");
                report.skipped_holidays.push(key);
                continue;
            }

            // garde les notes d'une saisie manuelle existante
            let notes = store.assignment(&key).and_then(|a| a.notes);
            let row = DailyAssignment {
                notes,
                ..DailyAssignment::available(employee.clone(), team.clone(), date)
            };

            match store.upsert_assignment(row) {
                Ok(saved) => report.applied.push(saved),
                Err(err) => {
                    warn!(%key, error = %err, "daily assignment upsert failed");
                    report.failures.push(AssignmentFailure {
                        key,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    info!(
        team = %team,
        start = %start,
        days = duration_days,
        applied = report.applied.len(),
        skipped = report.skipped_holidays.len(),
        failed = report.failures.len(),
        "auto-assignment done"
    );

    Ok(report)
}
