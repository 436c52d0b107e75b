#![forbid(unsafe_code)]
use chrono::{Duration, NaiveDate};
use crewplan::model::{
    AssignmentKey, Booking, BookingId, DailyAssignment, Employee, EmployeeId, Holiday,
    HolidayScope, HolidayStatus, Planning, ProjectId, Role, Team, TeamId,
};
use crewplan::scheduler::{PlanningWarning, SchedError, Scheduler};
use crewplan::storage::{
    AssignmentStore, BookingStore, HolidayRegistry, StoreError, TeamDirectory,
};

fn day(n: i64) -> NaiveDate {
    // jour 1 = lundi 6 janvier 2025
    NaiveDate::from_ymd_opt(2025, 1, 5).unwrap() + Duration::days(n)
}

struct Fixture {
    scheduler: Scheduler<Planning>,
    team: TeamId,
    anna: EmployeeId,
    bram: EmployeeId,
}

fn fixture() -> Fixture {
    let team = Team::new("Team Blue").with_color("#1e40af");
    let anna = Employee::new("Anna", Role::Foreman);
    let bram = Employee::new("Bram", Role::Installer);
    let planning = Planning {
        teams: vec![team.clone()],
        employees: vec![anna.clone(), bram.clone()],
        ..Planning::default()
    };
    let mut scheduler = Scheduler::new(planning);
    scheduler.add_member(&team.id, &anna.id).unwrap();
    scheduler.add_member(&team.id, &bram.id).unwrap();
    Fixture {
        scheduler,
        team: team.id,
        anna: anna.id,
        bram: bram.id,
    }
}

fn days_for(rows: &[DailyAssignment], employee: &EmployeeId) -> Vec<NaiveDate> {
    let mut out: Vec<NaiveDate> = rows
        .iter()
        .filter(|a| &a.employee == employee)
        .map(|a| a.date)
        .collect();
    out.sort();
    out
}

#[test]
fn every_member_gets_every_day() {
    let mut f = fixture();
    let report = f.scheduler.auto_assign(&f.team, day(1), 3).unwrap();
    assert_eq!(report.applied.len(), 6);
    assert!(report.is_complete());
    assert_eq!(report.summary(), "6 of 6 assignments succeeded");

    let rows = f.scheduler.assignments(&f.team, day(1), day(3)).unwrap();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|a| a.is_available));
    assert_eq!(days_for(&rows, &f.anna), vec![day(1), day(2), day(3)]);
}

#[test]
fn assigning_twice_creates_no_duplicates() {
    let mut f = fixture();
    f.scheduler.auto_assign(&f.team, day(1), 5).unwrap();
    let first = f.scheduler.store().assignments.clone();
    f.scheduler.auto_assign(&f.team, day(1), 5).unwrap();
    assert_eq!(f.scheduler.store().assignments, first);
    assert_eq!(first.len(), 10);
}

#[test]
fn member_on_holiday_is_skipped_that_day_only() {
    let mut f = fixture();
    f.scheduler
        .store_mut()
        .holidays
        .push(Holiday::approved_day(HolidayScope::Employee(f.bram.clone()), day(3)));

    let report = f.scheduler.auto_assign(&f.team, day(1), 5).unwrap();
    assert_eq!(report.skipped_holidays.len(), 1);
    assert_eq!(report.skipped_holidays[0].date, day(3));

    let rows = f.scheduler.assignments(&f.team, day(1), day(5)).unwrap();
    assert_eq!(days_for(&rows, &f.bram), vec![day(1), day(2), day(4), day(5)]);
    assert_eq!(days_for(&rows, &f.anna).len(), 5);
}

#[test]
fn pending_holiday_does_not_block() {
    let mut f = fixture();
    let pending = Holiday::new(
        HolidayScope::Employee(f.bram.clone()),
        day(1),
        day(5),
        HolidayStatus::Pending,
    )
    .unwrap();
    f.scheduler.store_mut().holidays.push(pending);
    let report = f.scheduler.auto_assign(&f.team, day(1), 5).unwrap();
    assert_eq!(report.applied.len(), 10);
}

#[test]
fn team_holiday_blocks_all_members() {
    let mut f = fixture();
    let closed = Holiday::new(
        HolidayScope::Team(f.team.clone()),
        day(2),
        day(3),
        HolidayStatus::Approved,
    )
    .unwrap();
    f.scheduler.store_mut().holidays.push(closed);

    let report = f.scheduler.auto_assign(&f.team, day(1), 4).unwrap();
    assert_eq!(report.applied.len(), 4);
    assert_eq!(report.skipped_holidays.len(), 4);
    let rows = f.scheduler.assignments(&f.team, day(1), day(4)).unwrap();
    assert_eq!(days_for(&rows, &f.anna), vec![day(1), day(4)]);
}

#[test]
fn empty_roster_returns_empty_report() {
    let mut f = fixture();
    let empty = Team::new("Team Green");
    let empty_id = empty.id.clone();
    f.scheduler.store_mut().teams.push(empty);

    let report = f.scheduler.auto_assign(&empty_id, day(1), 5).unwrap();
    assert!(report.applied.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(report.warnings, vec![PlanningWarning::EmptyRoster(empty_id)]);
}

#[test]
fn invalid_input_is_rejected_before_any_write() {
    let mut f = fixture();
    assert!(matches!(
        f.scheduler.auto_assign(&f.team, day(1), 0),
        Err(SchedError::InvalidDuration(0))
    ));
    assert!(matches!(
        f.scheduler.auto_assign(&TeamId::new("nope"), day(1), 3),
        Err(SchedError::UnknownTeam(_))
    ));
    assert!(matches!(
        f.scheduler.auto_assign(&TeamId::unassigned(), day(1), 3),
        Err(SchedError::UnassignedTeam)
    ));
    assert!(f.scheduler.store().assignments.is_empty());
}

#[test]
fn duration_past_calendar_end_is_rejected() {
    let mut f = fixture();
    assert!(matches!(
        f.scheduler.auto_assign(&f.team, day(1), u32::MAX),
        Err(SchedError::InvalidDuration(_))
    ));
    assert!(matches!(
        f.scheduler.book(ProjectId::new("forever"), &f.team, day(1), u32::MAX),
        Err(SchedError::InvalidDuration(_))
    ));
    assert!(f.scheduler.store().bookings.is_empty());
    assert!(f.scheduler.store().assignments.is_empty());
}

#[test]
fn oversized_loaded_booking_still_detects_overlaps() {
    let mut f = fixture();
    let (short, _) = f
        .scheduler
        .book(ProjectId::new("short"), &f.team, day(1), 3)
        .unwrap();
    let huge = Booking {
        id: BookingId::new("huge"),
        duration_days: u32::MAX,
        ..short.clone()
    };
    f.scheduler.store_mut().bookings.push(huge);

    let found: Vec<BookingId> = f
        .scheduler
        .detect_overlaps(&f.team)
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(found, vec![short.id, BookingId::new("huge")]);
}

#[test]
fn added_booking_follows_booking_rules() {
    let mut f = fixture();
    let imported = Booking::new(ProjectId::new("kitchen-1"), f.team.clone(), day(1), 2).unwrap();
    f.scheduler.add_booking(imported.clone()).unwrap();
    assert!(f.scheduler.store().assignments.is_empty());
    assert!(matches!(
        f.scheduler.add_booking(imported),
        Err(SchedError::Store(StoreError::Rejected(_)))
    ));

    let loose = Booking::new(ProjectId::new("wardrobe-7"), TeamId::unassigned(), day(2), 1).unwrap();
    f.scheduler.add_booking(loose).unwrap();

    f.scheduler.store_mut().teams[0].active = false;
    let late = Booking::new(ProjectId::new("hall-3"), f.team.clone(), day(4), 1).unwrap();
    assert!(matches!(
        f.scheduler.add_booking(late),
        Err(SchedError::InactiveTeam(_))
    ));
    assert_eq!(f.scheduler.store().bookings.len(), 2);
}

#[test]
fn inactive_team_is_rejected() {
    let mut f = fixture();
    f.scheduler.store_mut().teams[0].active = false;
    assert!(matches!(
        f.scheduler.auto_assign(&f.team, day(1), 2),
        Err(SchedError::InactiveTeam(_))
    ));
}

#[test]
fn manual_notes_survive_auto_assignment() {
    let mut f = fixture();
    f.scheduler
        .set_availability(&f.anna, &f.team, day(2), false, Some("dentist".into()))
        .unwrap();
    f.scheduler.auto_assign(&f.team, day(1), 3).unwrap();

    let key = AssignmentKey {
        employee: f.anna.clone(),
        team: f.team.clone(),
        date: day(2),
    };
    let row = f.scheduler.store().assignment(&key).unwrap();
    assert!(row.is_available);
    assert_eq!(row.notes.as_deref(), Some("dentist"));
    assert_eq!(f.scheduler.store().assignments.len(), 6);
}

#[test]
fn duplicate_membership_is_a_no_op() {
    let mut f = fixture();
    assert!(!f.scheduler.add_member(&f.team, &f.anna).unwrap());
    assert_eq!(f.scheduler.members(&f.team).unwrap().len(), 2);

    assert!(f.scheduler.remove_member(&f.team, &f.anna).unwrap());
    assert!(!f.scheduler.remove_member(&f.team, &f.anna).unwrap());
    let names: Vec<String> = f
        .scheduler
        .members(&f.team)
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["Bram".to_string()]);
}

#[test]
fn unknown_employee_cannot_join() {
    let mut f = fixture();
    assert!(matches!(
        f.scheduler.add_member(&f.team, &EmployeeId::new("ghost")),
        Err(SchedError::UnknownEmployee(_))
    ));
}

#[test]
fn booking_triggers_auto_assignment() {
    let mut f = fixture();
    let (booking, report) = f
        .scheduler
        .book(ProjectId::new("kitchen-42"), &f.team, day(1), 2)
        .unwrap();
    assert_eq!(booking.end(), day(2));
    assert_eq!(report.applied.len(), 4);
    assert_eq!(f.scheduler.store().bookings.len(), 1);

    let (moved, report) = f
        .scheduler
        .rebook(&booking.id, &f.team, day(8), 1)
        .unwrap();
    assert_eq!(moved.start, day(8));
    assert_eq!(report.applied.len(), 2);
    assert_eq!(f.scheduler.store().bookings[0].start, day(8));
}

#[test]
fn removing_an_assignment_deletes_the_row() {
    let mut f = fixture();
    f.scheduler.auto_assign(&f.team, day(1), 1).unwrap();
    let key = AssignmentKey {
        employee: f.anna.clone(),
        team: f.team.clone(),
        date: day(1),
    };
    assert!(f.scheduler.remove_assignment(&key).unwrap());
    assert!(!f.scheduler.remove_assignment(&key).unwrap());
    assert_eq!(f.scheduler.store().assignments.len(), 1);
}

#[test]
fn employee_in_two_teams_same_day_is_reported() {
    let mut f = fixture();
    let green = Team::new("Team Green");
    let green_id = green.id.clone();
    f.scheduler.store_mut().teams.push(green);
    f.scheduler.add_member(&green_id, &f.anna).unwrap();

    f.scheduler.auto_assign(&f.team, day(1), 2).unwrap();
    f.scheduler.auto_assign(&green_id, day(2), 2).unwrap();

    let doubles = f.scheduler.double_bookings(day(1), day(7));
    assert_eq!(doubles.len(), 1);
    assert_eq!(doubles[0].employee, f.anna);
    assert_eq!(doubles[0].date, day(2));

    let schedule = f.scheduler.employee_schedule(&f.anna, day(1), day(7)).unwrap();
    assert_eq!(schedule.len(), 4);
}

/// Magasin qui refuse les écritures d'un jour donné.
struct FlakyStore {
    inner: Planning,
    fail_on: NaiveDate,
}

impl TeamDirectory for FlakyStore {
    fn team(&self, id: &TeamId) -> Option<Team> {
        self.inner.team(id)
    }
    fn employee(&self, id: &EmployeeId) -> Option<Employee> {
        self.inner.employee(id)
    }
    fn list_members(&self, team: &TeamId) -> Vec<EmployeeId> {
        self.inner.list_members(team)
    }
    fn add_member(&mut self, team: &TeamId, employee: &EmployeeId) -> Result<bool, StoreError> {
        self.inner.add_member(team, employee)
    }
    fn remove_member(
        &mut self,
        team: &TeamId,
        employee: &EmployeeId,
    ) -> Result<bool, StoreError> {
        self.inner.remove_member(team, employee)
    }
}

impl HolidayRegistry for FlakyStore {
    fn is_on_holiday(&self, scope: &HolidayScope, date: NaiveDate) -> bool {
        self.inner.is_on_holiday(scope, date)
    }
}

impl BookingStore for FlakyStore {
    fn bookings(&self) -> Vec<Booking> {
        self.inner.bookings()
    }
    fn booking(&self, id: &BookingId) -> Option<Booking> {
        self.inner.booking(id)
    }
    fn insert_booking(&mut self, booking: Booking) -> Result<(), StoreError> {
        self.inner.insert_booking(booking)
    }
    fn update_booking(&mut self, booking: Booking) -> Result<(), StoreError> {
        self.inner.update_booking(booking)
    }
}

impl AssignmentStore for FlakyStore {
    fn upsert_assignment(
        &mut self,
        assignment: DailyAssignment,
    ) -> Result<DailyAssignment, StoreError> {
        if assignment.date == self.fail_on {
            return Err(StoreError::Rejected("connection reset".into()));
        }
        self.inner.upsert_assignment(assignment)
    }
    fn assignment(&self, key: &AssignmentKey) -> Option<DailyAssignment> {
        self.inner.assignment(key)
    }
    fn query_assignments(
        &self,
        team: &TeamId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<DailyAssignment> {
        self.inner.query_assignments(team, from, to)
    }
    fn employee_assignments(
        &self,
        employee: &EmployeeId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<DailyAssignment> {
        self.inner.employee_assignments(employee, from, to)
    }
    fn assignments_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<DailyAssignment> {
        self.inner.assignments_between(from, to)
    }
    fn delete_assignment(&mut self, key: &AssignmentKey) -> Result<bool, StoreError> {
        self.inner.delete_assignment(key)
    }
}

#[test]
fn failed_upserts_are_reported_not_fatal() {
    let f = fixture();
    let team = f.team.clone();
    let store = FlakyStore {
        inner: f.scheduler.into_inner(),
        fail_on: day(2),
    };
    let mut scheduler = Scheduler::new(store);

    let report = scheduler.auto_assign(&team, day(1), 3).unwrap();
    assert_eq!(report.applied.len(), 4);
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.key.date == day(2)));
    assert!(report.failures[0].reason.contains("connection reset"));
    assert!(!report.is_complete());
    assert_eq!(report.summary(), "4 of 6 assignments succeeded");
    assert_eq!(scheduler.store().inner.assignments.len(), 4);
}
