#![forbid(unsafe_code)]
//! Crewplan — planification des équipes de pose (menuiserie / agencement).
//!
//! - Réservations d'équipes par projet, en jours entiers.
//! - Détection des chevauchements par équipe, résolution par éditions successives.
//! - Auto-affectation des membres permanents, jour par jour, hors congés.
//! - Fenêtres jour / heure et placement des barres de Gantt.
//! - Stockage fichier (JSON/CSV) ; le cœur ne dépend que de traits de magasin.

pub mod calendar;
pub mod io;
pub mod model;
pub mod position;
pub mod scheduler;
pub mod storage;

pub use calendar::{date_range, week_start, Granularity, TimeRange};
pub use model::{
    AssignmentKey, Booking, BookingId, DailyAssignment, Employee, EmployeeId, Holiday,
    HolidayScope, HolidayStatus, Planning, ProjectId, Role, Team, TeamId, TeamMembership,
};
pub use position::{map_to_position, Position, Span};
pub use scheduler::{
    detect_overlaps, propose_resolution, AssignmentReport, BookingFailure, CommitOutcome,
    CommitReport, OverlapCandidate, ResolutionSession, ResolutionState, ResolveOptions,
    SchedError, Scheduler,
};
pub use storage::{
    AssignmentStore, BookingStore, HolidayRegistry, JsonStorage, PlanningStore, Storage,
    StoreError, TeamDirectory,
};
