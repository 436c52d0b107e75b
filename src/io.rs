use crate::model::{
    Booking, DailyAssignment, Employee, EmployeeId, Holiday, HolidayScope, HolidayStatus,
    Planning, ProjectId, Role, Team, TeamId, TeamMembership,
};
use crate::scheduler::OverlapPair;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Équivalences de couleurs néerlandais / anglais pour les anciens noms d'équipe.
const COLOR_ALIASES: &[(&str, &str)] = &[
    ("groen", "green"),
    ("blauw", "blue"),
    ("rood", "red"),
    ("geel", "yellow"),
    ("oranje", "orange"),
    ("paars", "purple"),
    ("grijs", "grey"),
    ("zwart", "black"),
];

/// Import d'employés depuis CSV: header `name,role`
pub fn import_employees_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Employee>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let name = rec.get(0).context("missing name")?.trim();
        if name.is_empty() {
            bail!("invalid employee row (empty name)");
        }
        let role = rec
            .get(1)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(Role::parse)
            .unwrap_or(Role::Installer);
        out.push(Employee::new(name, role));
    }
    Ok(out)
}

/// Import d'équipes depuis CSV: header `name[,color][,active]`
pub fn import_teams_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Team>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let name = rec.get(0).context("missing name")?.trim();
        if name.is_empty() {
            bail!("invalid team row (empty name)");
        }
        let mut team = Team::new(name);
        if let Some(color) = rec.get(1).map(str::trim).filter(|c| !c.is_empty()) {
            team.color = Some(color.to_string());
        }
        if let Some(flag) = rec.get(2).map(str::trim).filter(|f| !f.is_empty()) {
            team.active =
                parse_bool(flag).with_context(|| format!("invalid active value for team {name}"))?;
        }
        out.push(team);
    }
    Ok(out)
}

/// Import des membres permanents: header `team,employee` (id ou nom)
pub fn import_members_csv<P: AsRef<Path>>(
    path: P,
    planning: &Planning,
) -> anyhow::Result<Vec<TeamMembership>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let team_raw = rec.get(0).context("missing team")?.trim();
        let employee_raw = rec.get(1).context("missing employee")?.trim();
        let team = resolve_team(planning, team_raw)
            .with_context(|| format!("unknown team: {team_raw}"))?;
        let employee = resolve_employee(planning, employee_raw)
            .with_context(|| format!("unknown employee: {employee_raw}"))?;
        out.push(TeamMembership { team, employee });
    }
    Ok(out)
}

/// Import de réservations: header `project,team,start,duration_days`
///
/// Une colonne `team` vide donne l'équipe sentinelle.
pub fn import_bookings_csv<P: AsRef<Path>>(
    path: P,
    planning: &Planning,
) -> anyhow::Result<Vec<Booking>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let project = rec.get(0).context("missing project")?.trim();
        let team_raw = rec.get(1).context("missing team")?.trim();
        let start = rec.get(2).context("missing start")?.trim();
        let duration = rec.get(3).context("missing duration_days")?.trim();

        if project.is_empty() {
            bail!("invalid booking row (empty project)");
        }
        let team = if team_raw.is_empty() {
            TeamId::unassigned()
        } else {
            resolve_team(planning, team_raw)
                .with_context(|| format!("cannot match team name: {team_raw}"))?
        };
        let start = parse_date(start)?;
        let duration: u32 = duration
            .parse()
            .with_context(|| format!("invalid duration for project {project}"))?;
        let booking = Booking::new(ProjectId::new(project), team, start, duration)
            .map_err(anyhow::Error::msg)?;
        out.push(booking);
    }
    Ok(out)
}

/// Import de congés: header `scope,who,start[,end][,status]`
///
/// `scope` vaut `team` ou `employee`; `status` par défaut `approved`.
pub fn import_holidays_csv<P: AsRef<Path>>(
    path: P,
    planning: &Planning,
) -> anyhow::Result<Vec<Holiday>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let scope_raw = rec.get(0).context("missing scope")?.trim();
        let who = rec.get(1).context("missing who")?.trim();
        let start = parse_date(rec.get(2).context("missing start")?.trim())?;
        let end = match rec.get(3).map(str::trim).filter(|e| !e.is_empty()) {
            Some(raw) => parse_date(raw)?,
            None => start,
        };
        let status = match rec.get(4).map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_status(raw)?,
            None => HolidayStatus::Approved,
        };
        let scope = match scope_raw.to_ascii_lowercase().as_str() {
            "team" | "equipe" => HolidayScope::Team(
                resolve_team(planning, who).with_context(|| format!("unknown team: {who}"))?,
            ),
            "employee" | "employe" => HolidayScope::Employee(
                resolve_employee(planning, who)
                    .with_context(|| format!("unknown employee: {who}"))?,
            ),
            other => bail!("invalid holiday scope: {other}"),
        };
        out.push(Holiday::new(scope, start, end, status).map_err(anyhow::Error::msg)?);
    }
    Ok(out)
}

/// Retrouve une équipe par id, par nom, puis par alias de couleur.
///
/// Sert uniquement à migrer d'anciennes données référencées par nom ; un nom
/// ambigu n'est pas résolu.
pub fn resolve_team(planning: &Planning, raw: &str) -> Option<TeamId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(team) = planning.find_team(&TeamId::new(raw)) {
        return Some(team.id.clone());
    }
    if let Some(team) = planning.find_team_by_name(raw) {
        return Some(team.id.clone());
    }

    let lowered = raw.to_lowercase();
    let mut words = vec![lowered.clone()];
    for (nl, en) in COLOR_ALIASES {
        if lowered.contains(nl) {
            words.push((*en).to_string());
        }
        if lowered.contains(en) {
            words.push((*nl).to_string());
        }
    }

    let mut matches = planning.teams.iter().filter(|t| {
        let name = t.name.to_lowercase();
        words.iter().any(|w| name.contains(w.as_str()))
    });
    match (matches.next(), matches.next()) {
        (Some(team), None) => Some(team.id.clone()),
        _ => None,
    }
}

pub fn resolve_employee(planning: &Planning, raw: &str) -> Option<EmployeeId> {
    planning
        .find_employee(&EmployeeId::new(raw))
        .or_else(|| planning.find_employee_by_name(raw))
        .map(|e| e.id.clone())
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "oui" | "ja" => Ok(true),
        "false" | "0" | "no" | "n" | "non" | "nee" => Ok(false),
        _ => bail!("expected boolean"),
    }
}

fn parse_status(s: &str) -> anyhow::Result<HolidayStatus> {
    match s.to_ascii_lowercase().as_str() {
        "approved" | "approuve" => Ok(HolidayStatus::Approved),
        "pending" | "en_attente" => Ok(HolidayStatus::Pending),
        "rejected" | "refuse" => Ok(HolidayStatus::Rejected),
        other => bail!("invalid holiday status: {other}"),
    }
}

pub fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

/// Export JSON du planning (jolie mise en forme)
pub fn export_planning_json<P: AsRef<Path>>(path: P, planning: &Planning) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(planning)?;
    fs::write(path, s)?;
    Ok(())
}

/// Export CSV des affectations: header `date,team,employee,available,notes`
///
/// Les noms sont utilisés quand l'annuaire les connaît.
pub fn write_assignments_csv<W: Write>(
    out: W,
    planning: &Planning,
    rows: &[DailyAssignment],
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_writer(out);
    w.write_record(["date", "team", "employee", "available", "notes"])?;
    for a in rows {
        let team = planning
            .find_team(&a.team)
            .map(|t| t.name.as_str())
            .unwrap_or(a.team.as_str());
        let employee = planning
            .find_employee(&a.employee)
            .map(|e| e.name.as_str())
            .unwrap_or(a.employee.as_str());
        let date = a.date.to_string();
        w.write_record([
            date.as_str(),
            team,
            employee,
            if a.is_available { "yes" } else { "no" },
            a.notes.as_deref().unwrap_or(""),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn export_assignments_csv<P: AsRef<Path>>(
    path: P,
    planning: &Planning,
    rows: &[DailyAssignment],
) -> anyhow::Result<()> {
    let file = fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_assignments_csv(file, planning, rows)
}

/// Rapport CSV des chevauchements: header `team,booking_a,booking_b,first_shared_day,last_shared_day`
pub fn write_overlaps_csv<W: Write>(out: W, pairs: &[OverlapPair]) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_writer(out);
    w.write_record([
        "team",
        "booking_a",
        "booking_b",
        "first_shared_day",
        "last_shared_day",
    ])?;
    for p in pairs {
        let first = p.first_shared_day.to_string();
        let last = p.last_shared_day.to_string();
        w.write_record([
            p.team.as_str(),
            p.booking_a.as_str(),
            p.booking_b.as_str(),
            first.as_str(),
            last.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
