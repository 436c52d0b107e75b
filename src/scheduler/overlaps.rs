use super::{util, OverlapPair};
use crate::model::{Booking, TeamId};
use std::collections::BTreeMap;

/// Toutes les paires de réservations de `team` qui se chevauchent.
///
/// Balayage O(n²) : une équipe a rarement plus de quelques dizaines de
/// réservations actives. L'équipe sentinelle ne produit jamais de conflit.
pub fn find_overlap_pairs(team: &TeamId, bookings: &[Booking]) -> Vec<OverlapPair> {
    if team.is_unassigned() {
        return Vec::new();
    }

    let team_bookings: Vec<&Booking> = bookings.iter().filter(|b| &b.team == team).collect();
    let mut out = Vec::new();

    for (idx, a) in team_bookings.iter().enumerate() {
        for b in team_bookings.iter().skip(idx + 1) {
            if a.id == b.id {
                continue;
            }
            let (a_end, b_end) = (a.end(), b.end());
            if util::ranges_overlap(a.start, a_end, b.start, b_end) {
                out.push(OverlapPair {
                    team: team.clone(),
                    booking_a: a.id.clone(),
                    booking_b: b.id.clone(),
                    first_shared_day: a.start.max(b.start),
                    last_shared_day: a_end.min(b_end),
                });
            }
        }
    }

    out
}

/// Réservations de `team` en conflit avec au moins une autre, dans l'ordre
/// de première apparition et sans doublon.
pub fn detect_overlaps(team: &TeamId, bookings: &[Booking]) -> Vec<Booking> {
    let pairs = find_overlap_pairs(team, bookings);
    let mut out: Vec<Booking> = Vec::new();
    for booking in bookings.iter().filter(|b| &b.team == team) {
        let conflicting = pairs
            .iter()
            .any(|p| p.booking_a == booking.id || p.booking_b == booking.id);
        if conflicting && !out.iter().any(|seen| seen.id == booking.id) {
            out.push(booking.clone());
        }
    }
    out
}

/// Conflits de toutes les équipes, triés par identifiant d'équipe.
pub fn detect_all_overlaps(bookings: &[Booking]) -> BTreeMap<TeamId, Vec<Booking>> {
    let mut teams: Vec<&TeamId> = bookings.iter().map(|b| &b.team).collect();
    teams.sort();
    teams.dedup();

    teams
        .into_iter()
        .filter_map(|team| {
            let conflicts = detect_overlaps(team, bookings);
            (!conflicts.is_empty()).then(|| (team.clone(), conflicts))
        })
        .collect()
}
