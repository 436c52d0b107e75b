#![forbid(unsafe_code)]
use anyhow::{anyhow, bail, Context, Result};
use crewplan::{
    calendar::{date_range, Granularity},
    io,
    model::{BookingId, EmployeeId, Planning, ProjectId, TeamId},
    position::{map_to_position, Span},
    scheduler::{AssignmentReport, CommitOutcome, Scheduler},
    storage::{JsonStorage, Storage},
};
use clap::{Parser, Subcommand};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de planification des équipes de pose
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du planning
    #[arg(long, global = true, default_value = "planning.json")]
    planning: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Importer des employés depuis un CSV
    ImportEmployees {
        #[arg(long)]
        csv: String,
    },

    /// Importer des équipes depuis un CSV
    ImportTeams {
        #[arg(long)]
        csv: String,
    },

    /// Importer les membres permanents depuis un CSV
    ImportMembers {
        #[arg(long)]
        csv: String,
    },

    /// Importer des réservations depuis un CSV
    ImportBookings {
        #[arg(long)]
        csv: String,
        /// Lancer l'auto-affectation pour chaque réservation importée
        #[arg(long)]
        assign: bool,
    },

    /// Importer des congés depuis un CSV
    ImportHolidays {
        #[arg(long)]
        csv: String,
    },

    /// Ajouter un membre permanent à une équipe
    AddMember {
        #[arg(long)]
        team: String,
        #[arg(long)]
        employee: String,
    },

    /// Retirer un membre permanent d'une équipe
    RemoveMember {
        #[arg(long)]
        team: String,
        #[arg(long)]
        employee: String,
    },

    /// Réserver une équipe pour un projet (avec auto-affectation)
    Book {
        #[arg(long)]
        project: String,
        #[arg(long)]
        team: String,
        /// AAAA-MM-JJ
        #[arg(long)]
        start: String,
        #[arg(long, default_value_t = 1)]
        days: u32,
    },

    /// Affecter les membres permanents d'une équipe sur une période
    Assign {
        #[arg(long)]
        team: String,
        #[arg(long)]
        start: String,
        #[arg(long, default_value_t = 1)]
        days: u32,
    },

    /// Vérifier les chevauchements
    Check {
        /// Limiter à une équipe
        #[arg(long)]
        team: Option<String>,
        /// Export CSV des paires en conflit (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Déplacer une réservation en conflit puis re-vérifier
    Resolve {
        #[arg(long)]
        booking: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        start_hour: Option<u8>,
        #[arg(long)]
        end_hour: Option<u8>,
    },

    /// Afficher la position des réservations sur une fenêtre
    Timeline {
        /// Un jour quelconque de la première semaine
        #[arg(long)]
        week: String,
        #[arg(long, default_value_t = 7)]
        days: i64,
        #[arg(long)]
        hourly: bool,
        #[arg(long, default_value_t = 40.0)]
        width: f64,
    },

    /// Lister et optionnellement exporter les affectations d'une équipe
    Assignments {
        #[arg(long)]
        team: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        out_csv: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let storage = JsonStorage::open(&cli.planning);
    let planning = if storage.exists() {
        storage.load()?
    } else {
        Planning::default()
    };
    let mut scheduler = Scheduler::new(planning);

    let code = match cli.cmd {
        Commands::ImportEmployees { csv } => {
            let employees = io::import_employees_csv(csv)?;
            println!("{} employee(s) imported", employees.len());
            scheduler.store_mut().employees.extend(employees);
            storage.save(scheduler.store())?;
            0
        }
        Commands::ImportTeams { csv } => {
            let teams = io::import_teams_csv(csv)?;
            println!("{} team(s) imported", teams.len());
            scheduler.store_mut().teams.extend(teams);
            storage.save(scheduler.store())?;
            0
        }
        Commands::ImportMembers { csv } => {
            let members = io::import_members_csv(csv, scheduler.store())?;
            let mut added = 0usize;
            for m in &members {
                if scheduler.add_member(&m.team, &m.employee)? {
                    added += 1;
                }
            }
            println!("{added} member(s) added, {} already present", members.len() - added);
            storage.save(scheduler.store())?;
            0
        }
        Commands::ImportBookings { csv, assign } => {
            let bookings = io::import_bookings_csv(csv, scheduler.store())?;
            let mut code = 0;
            for booking in bookings {
                scheduler
                    .add_booking(booking.clone())
                    .with_context(|| format!("importing booking for project {}", booking.project))?;
                if assign && !booking.team.is_unassigned() {
                    let report = scheduler.auto_assign_booking(&booking)?;
                    println!("{} | {}", booking.project, report.summary());
                    if !report.is_complete() {
                        code = 2;
                    }
                }
            }
            storage.save(scheduler.store())?;
            code
        }
        Commands::ImportHolidays { csv } => {
            let holidays = io::import_holidays_csv(csv, scheduler.store())?;
            println!("{} holiday(s) imported", holidays.len());
            scheduler.store_mut().holidays.extend(holidays);
            storage.save(scheduler.store())?;
            0
        }
        Commands::AddMember { team, employee } => {
            let (team, employee) = lookup_member(scheduler.store(), &team, &employee)?;
            if !scheduler.add_member(&team, &employee)? {
                println!("already a member");
            }
            storage.save(scheduler.store())?;
            0
        }
        Commands::RemoveMember { team, employee } => {
            let (team, employee) = lookup_member(scheduler.store(), &team, &employee)?;
            if !scheduler.remove_member(&team, &employee)? {
                println!("not a member");
            }
            storage.save(scheduler.store())?;
            0
        }
        Commands::Book {
            project,
            team,
            start,
            days,
        } => {
            let team = lookup_team(scheduler.store(), &team)?;
            let start = io::parse_date(&start)?;
            let (booking, report) =
                scheduler.book(ProjectId::new(project), &team, start, days)?;
            storage.save(scheduler.store())?;
            println!("{} | {} → {} | {}", booking.id, booking.start, booking.end(), report.summary());
            print_failures(&report);
            if report.is_complete() {
                0
            } else {
                2
            }
        }
        Commands::Assign { team, start, days } => {
            let team = lookup_team(scheduler.store(), &team)?;
            let start = io::parse_date(&start)?;
            let report = scheduler.auto_assign(&team, start, days)?;
            storage.save(scheduler.store())?;
            println!("{}", report.summary());
            print_failures(&report);
            if report.is_complete() {
                0
            } else {
                2
            }
        }
        Commands::Check { team, report } => {
            let teams: Vec<TeamId> = match team {
                Some(raw) => vec![lookup_team(scheduler.store(), &raw)?],
                None => scheduler.all_overlaps().into_keys().collect(),
            };
            let pairs: Vec<_> = teams
                .iter()
                .flat_map(|t| scheduler.overlap_pairs(t))
                .collect();
            if pairs.is_empty() {
                println!("OK: no overlaps");
                0
            } else {
                eprintln!("Found {} overlap(s)", pairs.len());
                for p in &pairs {
                    println!(
                        "{} | {} ↔ {} | {} → {}",
                        p.team, p.booking_a, p.booking_b, p.first_shared_day, p.last_shared_day
                    );
                }
                if let Some(path) = report {
                    let file = std::fs::File::create(path)?;
                    io::write_overlaps_csv(file, &pairs)?;
                }
                // Code 2 = WARNING/INCOMPLETE
                2
            }
        }
        Commands::Resolve {
            booking,
            start,
            end,
            start_hour,
            end_hour,
        } => {
            let id = BookingId::new(booking);
            let team = scheduler
                .store()
                .find_booking(&id)
                .map(|b| b.team.clone())
                .ok_or_else(|| anyhow!("unknown booking: {}", id))?;
            let start = io::parse_date(&start)?;
            let end = io::parse_date(&end)?;

            let conflicts = scheduler.detect_overlaps(&team);
            let Some(target) = conflicts.iter().find(|b| b.id == id) else {
                bail!("booking {} is not in conflict", id);
            };
            let mut edits = scheduler.propose_resolution(std::slice::from_ref(target));
            for candidate in edits.iter_mut() {
                candidate.reschedule(start, end)?;
                if let (Some(sh), Some(eh)) = (start_hour, end_hour) {
                    candidate.set_hours(sh, eh)?;
                }
            }

            let report = scheduler.commit_resolution(&edits);
            storage.save(scheduler.store())?;
            for outcome in &report.outcomes {
                match outcome {
                    CommitOutcome::Applied(b) => println!("applied {b}"),
                    CommitOutcome::Failed { booking, reason } => {
                        eprintln!("failed {booking}: {reason}")
                    }
                }
            }
            for assigned in &report.assignments {
                println!("{}", assigned.summary());
                print_failures(assigned);
            }
            for failure in &report.unassigned {
                eprintln!("not re-assigned {}: {}", failure.booking, failure.reason);
            }
            for key in &report.stale_rows {
                eprintln!("kept outside new range: {key}");
            }

            let complete = report.applied() == report.outcomes.len()
                && report.unassigned.is_empty()
                && report.assignments.iter().all(AssignmentReport::is_complete);
            if report.is_clear() && complete {
                println!("OK: no overlaps for team {team}");
                0
            } else {
                if !report.is_clear() {
                    eprintln!("{} booking(s) still overlapping", report.remaining.len());
                }
                2
            }
        }
        Commands::Timeline {
            week,
            days,
            hourly,
            width,
        } => {
            let granularity = if hourly {
                Granularity::Hour
            } else {
                Granularity::Day
            };
            let range = date_range(io::parse_date(&week)?, days, granularity);
            let planning = scheduler.store();
            let mut bookings = planning.bookings.clone();
            bookings.sort_by(|a, b| a.team.cmp(&b.team).then(a.start.cmp(&b.start)));
            for b in &bookings {
                let team = planning
                    .find_team(&b.team)
                    .map(|t| t.name.as_str())
                    .unwrap_or(b.team.as_str());
                match map_to_position(Span::from(b), &range, width) {
                    Some(pos) => println!(
                        "{} | {} | offset={} length={}",
                        team, b.project, pos.offset, pos.length
                    ),
                    None => println!("{} | {} | hidden", team, b.project),
                }
            }
            0
        }
        Commands::Assignments {
            team,
            from,
            to,
            out_csv,
        } => {
            let team = lookup_team(scheduler.store(), &team)?;
            let from = io::parse_date(&from)?;
            let to = io::parse_date(&to)?;
            let rows = scheduler.assignments(&team, from, to)?;
            match out_csv {
                Some(path) => io::export_assignments_csv(path, scheduler.store(), &rows)?,
                None => io::write_assignments_csv(std::io::stdout(), scheduler.store(), &rows)?,
            }
            let doubles = scheduler.double_bookings(from, to);
            for d in &doubles {
                eprintln!("double booking: {} on {} ({} teams)", d.employee, d.date, d.teams.len());
            }
            0
        }
    };

    std::process::exit(code);
}

/// Id ou nom exact ; les alias de couleur restent réservés aux imports.
fn lookup_team(planning: &Planning, raw: &str) -> Result<TeamId> {
    planning
        .find_team(&TeamId::new(raw.trim()))
        .or_else(|| planning.find_team_by_name(raw))
        .map(|t| t.id.clone())
        .ok_or_else(|| anyhow!("unknown team: {}", raw))
}

fn lookup_member(
    planning: &Planning,
    team: &str,
    employee: &str,
) -> Result<(TeamId, EmployeeId)> {
    let team = lookup_team(planning, team)?;
    let employee =
        io::resolve_employee(planning, employee).ok_or_else(|| anyhow!("unknown employee: {}", employee))?;
    Ok((team, employee))
}

fn print_failures(report: &AssignmentReport) {
    for f in &report.failures {
        eprintln!("failed {}: {}", f.key, f.reason);
    }
    for w in &report.warnings {
        eprintln!("warning: {w:?}");
    }
}
