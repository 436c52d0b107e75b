use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Durée minimale d'une réservation, en jours.
pub const MIN_BOOKING_DAYS: u32 = 1;

/// Dernier jour (inclus) d'une plage de `duration_days` jours.
///
/// `None` si la plage sort du calendrier représentable.
pub fn last_day(start: NaiveDate, duration_days: u32) -> Option<NaiveDate> {
    start.checked_add_days(Days::new(u64::from(duration_days.max(MIN_BOOKING_DAYS)) - 1))
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: AsRef<str>>(s: S) -> Self {
                Self(s.as_ref().to_owned())
            }
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifiant fort pour Team
    TeamId
);
string_id!(
    /// Identifiant fort pour Employee
    EmployeeId
);
string_id!(
    /// Identifiant fort pour un projet (chantier)
    ProjectId
);
string_id!(
    /// Identifiant fort pour Booking
    BookingId
);

const UNASSIGNED_TEAM: &str = "unassigned";

impl TeamId {
    /// Équipe sentinelle des réservations sans équipe.
    pub fn unassigned() -> Self {
        Self::new(UNASSIGNED_TEAM)
    }
    pub fn is_unassigned(&self) -> bool {
        self.0 == UNASSIGNED_TEAM
    }
}

/// Équipe de pose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Couleur d'affichage (ignorée par la logique).
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Team {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            id: TeamId::random(),
            name: name.into(),
            color: None,
            active: true,
        }
    }

    pub fn with_color<C: Into<String>>(mut self, color: C) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Rôle d'un employé
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Installer,
    Foreman,
    Custom(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "installer" | "monteur" | "poseur" => Role::Installer,
            "foreman" | "chef" | "voorman" => Role::Foreman,
            other => Role::Custom(other.to_string()),
        }
    }
}

/// Employé (géré à l'extérieur, lecture seule pour le planificateur)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub role: Role,
}

impl Employee {
    pub fn new<N: Into<String>>(name: N, role: Role) -> Self {
        Self {
            id: EmployeeId::random(),
            name: name.into(),
            role,
        }
    }
}

/// Membre permanent d'une équipe. Unique sur (team, employee).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamMembership {
    pub team: TeamId,
    pub employee: EmployeeId,
}

/// Réservation d'une équipe pour un projet, sur `duration_days` jours à partir de `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub project: ProjectId,
    pub team: TeamId,
    pub start: NaiveDate,
    pub duration_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_hour: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_hour: Option<u8>,
}

impl Booking {
    /// Crée une réservation en validant `duration_days >= 1` et un dernier
    /// jour représentable.
    pub fn new(
        project: ProjectId,
        team: TeamId,
        start: NaiveDate,
        duration_days: u32,
    ) -> Result<Self, String> {
        if duration_days < MIN_BOOKING_DAYS {
            return Err("booking duration must be at least one day".to_string());
        }
        if last_day(start, duration_days).is_none() {
            return Err(format!(
                "booking of {duration_days} day(s) from {start} ends past the calendar"
            ));
        }
        Ok(Self {
            id: BookingId::random(),
            project,
            team,
            start,
            duration_days,
            start_hour: None,
            end_hour: None,
        })
    }

    /// Dernier jour couvert (inclus), borné à `NaiveDate::MAX`.
    pub fn end(&self) -> NaiveDate {
        last_day(self.start, self.duration_days).unwrap_or(NaiveDate::MAX)
    }

    /// Jours couverts, du premier au dernier inclus.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        let end = self.end();
        start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end()
    }
}

/// Clé d'unicité d'une affectation journalière.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub employee: EmployeeId,
    pub team: TeamId,
    pub date: NaiveDate,
}

impl fmt::Display for AssignmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.employee, self.team, self.date)
    }
}

/// Affectation d'un employé à une équipe pour un jour donné.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAssignment {
    pub employee: EmployeeId,
    pub team: TeamId,
    pub date: NaiveDate,
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DailyAssignment {
    pub fn available(employee: EmployeeId, team: TeamId, date: NaiveDate) -> Self {
        Self {
            employee,
            team,
            date,
            is_available: true,
            notes: None,
        }
    }

    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            employee: self.employee.clone(),
            team: self.team.clone(),
            date: self.date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolidayScope {
    Team(TeamId),
    Employee(EmployeeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolidayStatus {
    Pending,
    Approved,
    Rejected,
}

/// Demande de congé sur un intervalle de dates inclus [start, end].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub scope: HolidayScope,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub status: HolidayStatus,
}

impl Holiday {
    pub fn new(
        scope: HolidayScope,
        start: NaiveDate,
        end: NaiveDate,
        status: HolidayStatus,
    ) -> Result<Self, String> {
        if end < start {
            return Err("holiday end must not be before start".to_string());
        }
        Ok(Self {
            scope,
            start,
            end,
            status,
        })
    }

    /// Congé approuvé d'un seul jour.
    pub fn approved_day(scope: HolidayScope, date: NaiveDate) -> Self {
        Self {
            scope,
            start: date,
            end: date,
            status: HolidayStatus::Approved,
        }
    }

    /// Seuls les congés approuvés bloquent une affectation.
    pub fn blocks(&self, scope: &HolidayScope, date: NaiveDate) -> bool {
        self.status == HolidayStatus::Approved
            && &self.scope == scope
            && self.start <= date
            && date <= self.end
    }
}

/// Planning complet : annuaire, réservations, congés et affectations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Planning {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub memberships: Vec<TeamMembership>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub assignments: Vec<DailyAssignment>,
}

impl Planning {
    pub fn find_team(&self, id: &TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| &t.id == id)
    }
    pub fn find_team_by_name(&self, name: &str) -> Option<&Team> {
        self.teams
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }
    pub fn find_employee(&self, id: &EmployeeId) -> Option<&Employee> {
        self.employees.iter().find(|e| &e.id == id)
    }
    pub fn find_employee_by_name(&self, name: &str) -> Option<&Employee> {
        self.employees
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name.trim()))
    }
    pub fn find_booking(&self, id: &BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| &b.id == id)
    }
    pub fn find_booking_mut(&mut self, id: &BookingId) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| &b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn booking_rejects_zero_duration() {
        let err = Booking::new(ProjectId::new("p"), TeamId::new("t"), day(1), 0);
        assert!(err.is_err());
    }

    #[test]
    fn booking_end_is_inclusive() {
        let b = Booking::new(ProjectId::new("p"), TeamId::new("t"), day(1), 5).unwrap();
        assert_eq!(b.end(), day(5));
        assert_eq!(b.days().count(), 5);
        assert!(b.covers(day(5)));
        assert!(!b.covers(day(6)));
    }

    #[test]
    fn booking_past_calendar_end_is_rejected() {
        assert!(Booking::new(ProjectId::new("p"), TeamId::new("t"), day(1), u32::MAX).is_err());
        assert_eq!(last_day(NaiveDate::MAX, 2), None);
        assert_eq!(last_day(NaiveDate::MAX, 1), Some(NaiveDate::MAX));
    }

    #[test]
    fn loaded_oversized_booking_saturates() {
        let b = Booking {
            duration_days: u32::MAX,
            ..Booking::new(ProjectId::new("p"), TeamId::new("t"), day(1), 1).unwrap()
        };
        assert_eq!(b.end(), NaiveDate::MAX);
        assert!(b.covers(day(20)));
        assert_eq!(b.days().nth(2), Some(day(3)));
    }

    #[test]
    fn pending_holiday_does_not_block() {
        let scope = HolidayScope::Employee(EmployeeId::new("e"));
        let h = Holiday::new(scope.clone(), day(1), day(3), HolidayStatus::Pending).unwrap();
        assert!(!h.blocks(&scope, day(2)));
        let h = Holiday::approved_day(scope.clone(), day(2));
        assert!(h.blocks(&scope, day(2)));
        assert!(!h.blocks(&scope, day(3)));
    }
}
