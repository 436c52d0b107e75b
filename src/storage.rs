use crate::model::{
    AssignmentKey, Booking, BookingId, DailyAssignment, Employee, EmployeeId, HolidayScope,
    Planning, Team, TeamId, TeamMembership,
};
use anyhow::Context;
use chrono::NaiveDate;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store rejected write: {0}")]
    Rejected(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Annuaire des équipes, employés et membres permanents.
pub trait TeamDirectory {
    fn team(&self, id: &TeamId) -> Option<Team>;
    fn employee(&self, id: &EmployeeId) -> Option<Employee>;
    /// Membres permanents, dans l'ordre d'ajout.
    fn list_members(&self, team: &TeamId) -> Vec<EmployeeId>;
    /// Retourne `false` si le membre existait déjà.
    fn add_member(&mut self, team: &TeamId, employee: &EmployeeId) -> Result<bool, StoreError>;
    /// Retourne `false` si le membre n'existait pas.
    fn remove_member(&mut self, team: &TeamId, employee: &EmployeeId)
        -> Result<bool, StoreError>;
}

/// Registre des congés.
pub trait HolidayRegistry {
    fn is_on_holiday(&self, scope: &HolidayScope, date: NaiveDate) -> bool;
}

/// Source des réservations d'équipes.
pub trait BookingStore {
    fn bookings(&self) -> Vec<Booking>;
    fn booking(&self, id: &BookingId) -> Option<Booking>;
    fn insert_booking(&mut self, booking: Booking) -> Result<(), StoreError>;
    /// Remplace la réservation portant le même id.
    fn update_booking(&mut self, booking: Booking) -> Result<(), StoreError>;
}

/// Persistance des affectations journalières, clé (employee, team, date).
pub trait AssignmentStore {
    /// Insère ou remplace la ligne de même clé.
    fn upsert_assignment(&mut self, assignment: DailyAssignment)
        -> Result<DailyAssignment, StoreError>;
    fn assignment(&self, key: &AssignmentKey) -> Option<DailyAssignment>;
    /// Affectations de `team` entre `from` et `to` inclus.
    fn query_assignments(&self, team: &TeamId, from: NaiveDate, to: NaiveDate)
        -> Vec<DailyAssignment>;
    /// Affectations de `employee`, toutes équipes confondues.
    fn employee_assignments(
        &self,
        employee: &EmployeeId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<DailyAssignment>;
    /// Toutes les affectations entre `from` et `to` inclus.
    fn assignments_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<DailyAssignment>;
    fn delete_assignment(&mut self, key: &AssignmentKey) -> Result<bool, StoreError>;
}

/// Ensemble des collaborateurs dont le planificateur a besoin.
pub trait PlanningStore: TeamDirectory + HolidayRegistry + BookingStore + AssignmentStore {}

impl<T> PlanningStore for T where T: TeamDirectory + HolidayRegistry + BookingStore + AssignmentStore {}

impl TeamDirectory for Planning {
    fn team(&self, id: &TeamId) -> Option<Team> {
        self.find_team(id).cloned()
    }

    fn employee(&self, id: &EmployeeId) -> Option<Employee> {
        self.find_employee(id).cloned()
    }

    fn list_members(&self, team: &TeamId) -> Vec<EmployeeId> {
        self.memberships
            .iter()
            .filter(|m| &m.team == team)
            .map(|m| m.employee.clone())
            .collect()
    }

    fn add_member(&mut self, team: &TeamId, employee: &EmployeeId) -> Result<bool, StoreError> {
        if self
            .memberships
            .iter()
            .any(|m| &m.team == team && &m.employee == employee)
        {
            return Ok(false);
        }
        self.memberships.push(TeamMembership {
            team: team.clone(),
            employee: employee.clone(),
        });
        Ok(true)
    }

    fn remove_member(
        &mut self,
        team: &TeamId,
        employee: &EmployeeId,
    ) -> Result<bool, StoreError> {
        let before = self.memberships.len();
        self.memberships
            .retain(|m| !(&m.team == team && &m.employee == employee));
        Ok(self.memberships.len() != before)
    }
}

impl HolidayRegistry for Planning {
    fn is_on_holiday(&self, scope: &HolidayScope, date: NaiveDate) -> bool {
        self.holidays.iter().any(|h| h.blocks(scope, date))
    }
}

impl BookingStore for Planning {
    fn bookings(&self) -> Vec<Booking> {
        self.bookings.clone()
    }

    fn booking(&self, id: &BookingId) -> Option<Booking> {
        self.find_booking(id).cloned()
    }

    fn insert_booking(&mut self, booking: Booking) -> Result<(), StoreError> {
        if self.find_booking(&booking.id).is_some() {
            return Err(StoreError::Rejected(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        self.bookings.push(booking);
        Ok(())
    }

    fn update_booking(&mut self, booking: Booking) -> Result<(), StoreError> {
        let slot = self
            .find_booking_mut(&booking.id)
            .ok_or_else(|| StoreError::NotFound(booking.id.to_string()))?;
        *slot = booking;
        Ok(())
    }
}

impl AssignmentStore for Planning {
    fn upsert_assignment(
        &mut self,
        assignment: DailyAssignment,
    ) -> Result<DailyAssignment, StoreError> {
        let key = assignment.key();
        match self.assignments.iter_mut().find(|a| a.key() == key) {
            Some(existing) => *existing = assignment.clone(),
            None => self.assignments.push(assignment.clone()),
        }
        Ok(assignment)
    }

    fn assignment(&self, key: &AssignmentKey) -> Option<DailyAssignment> {
        self.assignments.iter().find(|a| &a.key() == key).cloned()
    }

    fn query_assignments(
        &self,
        team: &TeamId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<DailyAssignment> {
        let mut out: Vec<DailyAssignment> = self
            .assignments
            .iter()
            .filter(|a| &a.team == team && from <= a.date && a.date <= to)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.employee.cmp(&b.employee)));
        out
    }

    fn employee_assignments(
        &self,
        employee: &EmployeeId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<DailyAssignment> {
        let mut out: Vec<DailyAssignment> = self
            .assignments
            .iter()
            .filter(|a| &a.employee == employee && from <= a.date && a.date <= to)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.team.cmp(&b.team)));
        out
    }

    fn assignments_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<DailyAssignment> {
        let mut out: Vec<DailyAssignment> = self
            .assignments
            .iter()
            .filter(|a| from <= a.date && a.date <= to)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.key().cmp(&b.key()));
        out
    }

    fn delete_assignment(&mut self, key: &AssignmentKey) -> Result<bool, StoreError> {
        let before = self.assignments.len();
        self.assignments.retain(|a| &a.key() != key);
        Ok(self.assignments.len() != before)
    }
}

pub trait Storage {
    /// Charge un planning depuis un support.
    fn load(&self) -> anyhow::Result<Planning>;
    /// Sauvegarde de manière atomique.
    fn save(&self, planning: &Planning) -> anyhow::Result<()>;
}

pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl Storage for JsonStorage {
    fn load(&self) -> anyhow::Result<Planning> {
        let data =
            fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let planning: Planning =
            serde_json::from_slice(&data).with_context(|| "parsing planning.json")?;
        Ok(planning)
    }

    fn save(&self, planning: &Planning) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(planning)?;
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(parent).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }
}
